//! Accepted-member roster assembly.

use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{MembershipStatus, ParticipantProfile};
use crate::store::{MemberDirectory, MembershipStore};

/// Public profiles of a listing's seated members: the host first, then
/// accepted members in the order they joined.
///
/// Memberships whose member no longer resolves are left out.
pub async fn build_roster<W: MembershipStore>(
    work: &mut W,
    members: &dyn MemberDirectory,
    listing_id: Uuid,
) -> Result<Vec<ParticipantProfile>, DomainError> {
    let mut seated: Vec<_> = work
        .find_active_by_listing(listing_id)
        .await?
        .into_iter()
        .filter(|m| m.status.holds_slot())
        .collect();
    // stable: keeps join order among accepted members
    seated.sort_by_key(|m| m.status != MembershipStatus::Host);

    let ids: Vec<Uuid> = seated.iter().map(|m| m.member_id).collect();
    let found = members.find_by_ids(&ids).await?;

    Ok(seated
        .iter()
        .filter_map(|membership| {
            found
                .iter()
                .find(|member| member.id == membership.member_id)
                .map(|member| {
                    ParticipantProfile::of(member, membership.status == MembershipStatus::Host)
                })
        })
        .collect())
}
