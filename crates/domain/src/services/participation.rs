//! Participation state machine.
//!
//! Join requests, cancellations, approvals and rejections. Every operation
//! locks the listing row first so capacity checks and counter updates are
//! serialized per listing.

use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    ApprovalOutcome, ApprovalRequest, JoinOutcome, ListingSummary, Member, Membership,
    MembershipStatus, ParticipantProfile, ParticipationFilter, ParticipationState,
};
use crate::services::roster::build_roster;
use crate::store::{complete, ListingStore, MemberDirectory, MembershipStore, PartyStore};

fn record_transition(transition: &'static str) {
    counter!("party_participation_transitions_total", "transition" => transition).increment(1);
}

/// Drives membership transitions and the capacity counter.
pub struct ParticipationService<S: PartyStore> {
    store: Arc<S>,
    members: Arc<dyn MemberDirectory>,
}

impl<S: PartyStore> Clone for ParticipationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            members: self.members.clone(),
        }
    }
}

impl<S: PartyStore> ParticipationService<S> {
    pub fn new(store: Arc<S>, members: Arc<dyn MemberDirectory>) -> Self {
        Self { store, members }
    }

    /// Toggles the member's participation in a listing.
    ///
    /// With no active record a join request is filed. An awaiting or accepted
    /// member leaves, giving back the slot when accepted. Hosts and rejected
    /// members are left unchanged.
    pub async fn request_or_cancel(
        &self,
        listing_id: Uuid,
        member: &Member,
    ) -> Result<JoinOutcome, DomainError> {
        if member.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot join parties"));
        }

        let mut work = self.store.begin().await?;
        let result = toggle(&mut work, listing_id, member.id).await;
        let outcome = complete(work, result).await?;

        match outcome {
            JoinOutcome::Requested => record_transition("requested"),
            JoinOutcome::Cancelled => record_transition("cancelled"),
            _ => {}
        }
        Ok(outcome)
    }

    /// Accepts an awaiting request if a slot is still open.
    pub async fn approve(&self, membership_id: Uuid) -> Result<ApprovalOutcome, DomainError> {
        let mut work = self.store.begin().await?;
        let result = approve_in(&mut work, membership_id).await;
        let outcome = complete(work, result).await?;

        match outcome {
            ApprovalOutcome::Approved => record_transition("approved"),
            ApprovalOutcome::Full => record_transition("full"),
        }
        Ok(outcome)
    }

    /// Declines an awaiting request. Rejecting a rejected record is a no-op.
    /// Accepted and host records answer `InvalidState`; they leave instead.
    pub async fn reject(&self, membership_id: Uuid) -> Result<(), DomainError> {
        let mut work = self.store.begin().await?;
        let result = reject_in(&mut work, membership_id).await;
        complete(work, result).await?;

        record_transition("rejected");
        Ok(())
    }

    /// Fails with `Forbidden` unless `requester_id` hosts the listing the
    /// membership belongs to.
    pub async fn ensure_host_of_membership(
        &self,
        membership_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Membership, DomainError> {
        let mut work = self.store.begin().await?;
        let result: Result<Membership, DomainError> = async {
            let membership = work
                .find_membership(membership_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Participation not found"))?;
            let host = work.find_host_by_listing(membership.listing_id).await?;
            match host {
                Some(host) if host.member_id == requester_id => Ok(membership),
                _ => Err(DomainError::forbidden(
                    "Only the host can decide on participation requests",
                )),
            }
        }
        .await;
        complete(work, result).await
    }

    /// Listings the member participates in without hosting.
    pub async fn participations(
        &self,
        member: &Member,
        filter: ParticipationFilter,
    ) -> Result<Vec<ListingSummary>, DomainError> {
        if member.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot view parties"));
        }

        let mut work = self.store.begin().await?;
        let result: Result<Vec<ListingSummary>, DomainError> = async {
            let memberships: Vec<Membership> = work
                .find_by_member(member.id)
                .await?
                .into_iter()
                .filter(|m| filter.matches(m.status))
                .collect();
            let ids: Vec<Uuid> = memberships.iter().map(|m| m.listing_id).collect();
            let mut listings: HashMap<Uuid, _> = work
                .find_listings_by_ids(&ids)
                .await?
                .into_iter()
                .map(|l| (l.id, l))
                .collect();

            let mut summaries = Vec::with_capacity(memberships.len());
            for membership in memberships {
                let Some(listing) = listings.remove(&membership.listing_id) else {
                    continue;
                };
                let roster = build_roster(&mut work, self.members.as_ref(), listing.id).await?;
                summaries.push(
                    ListingSummary::new(listing, roster)
                        .with_state(ParticipationState::of(Some(membership.status))),
                );
            }
            Ok(summaries)
        }
        .await;
        complete(work, result).await
    }

    /// Awaiting requests on every listing the member hosts.
    pub async fn approval_requests(
        &self,
        host: &Member,
    ) -> Result<Vec<ApprovalRequest>, DomainError> {
        if host.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot view parties"));
        }

        let mut work = self.store.begin().await?;
        let result: Result<Vec<(String, Membership)>, DomainError> = async {
            let hosted: Vec<Uuid> = work
                .find_by_member(host.id)
                .await?
                .into_iter()
                .filter(|m| m.status == MembershipStatus::Host)
                .map(|m| m.listing_id)
                .collect();
            let listings = work.find_listings_by_ids(&hosted).await?;

            let mut awaiting = Vec::new();
            for listing in &listings {
                for membership in work.find_active_by_listing(listing.id).await? {
                    if membership.status == MembershipStatus::Awaiting {
                        awaiting.push((listing.title.clone(), membership));
                    }
                }
            }
            Ok(awaiting)
        }
        .await;
        let awaiting = complete(work, result).await?;

        let ids: Vec<Uuid> = awaiting.iter().map(|(_, m)| m.member_id).collect();
        let requesters = self.members.find_by_ids(&ids).await?;

        let mut requests: Vec<ApprovalRequest> = awaiting
            .into_iter()
            .filter_map(|(title, membership)| {
                requesters
                    .iter()
                    .find(|r| r.id == membership.member_id)
                    .map(|requester| ApprovalRequest {
                        membership_id: membership.id,
                        party_id: membership.listing_id,
                        party_title: title,
                        requester: ParticipantProfile::of(requester, false),
                        requested_at: membership.created_at,
                    })
            })
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }
}

async fn toggle<W: ListingStore + MembershipStore>(
    work: &mut W,
    listing_id: Uuid,
    member_id: Uuid,
) -> Result<JoinOutcome, DomainError> {
    let mut listing = work
        .find_listing_for_update(listing_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Party not found"))?;

    let existing = work
        .find_membership_by_listing_and_member(listing_id, member_id)
        .await?;

    let Some(membership) = existing else {
        let membership = Membership::request(listing_id, member_id);
        work.insert_membership(&membership).await?;
        tracing::info!(
            listing_id = %listing_id,
            membership_id = %membership.id,
            member_id = %member_id,
            "Participation requested"
        );
        return Ok(JoinOutcome::Requested);
    };

    match membership.status {
        MembershipStatus::Host => Ok(JoinOutcome::AlreadyHost),
        MembershipStatus::Rejected => Ok(JoinOutcome::Rejected),
        MembershipStatus::Awaiting => {
            work.soft_delete_membership(membership.id).await?;
            tracing::info!(
                listing_id = %listing_id,
                membership_id = %membership.id,
                member_id = %member_id,
                "Participation request cancelled"
            );
            Ok(JoinOutcome::Cancelled)
        }
        MembershipStatus::Accepted => {
            work.soft_delete_membership(membership.id).await?;
            listing.release();
            work.update_listing(&listing).await?;
            tracing::info!(
                listing_id = %listing_id,
                membership_id = %membership.id,
                member_id = %member_id,
                current_count = listing.current_count,
                "Accepted member left party"
            );
            Ok(JoinOutcome::Cancelled)
        }
    }
}

async fn approve_in<W: ListingStore + MembershipStore>(
    work: &mut W,
    membership_id: Uuid,
) -> Result<ApprovalOutcome, DomainError> {
    let listing_id = work
        .find_membership(membership_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Participation not found"))?
        .listing_id;

    let mut listing = work
        .find_listing_for_update(listing_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Party not found"))?;

    // Re-read under the listing lock; a concurrent cancel may have won.
    let membership = work
        .find_membership(membership_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Participation not found"))?;
    let next = membership.status.approve()?;

    if !listing.admit() {
        tracing::info!(
            listing_id = %listing_id,
            membership_id = %membership_id,
            member_id = %membership.member_id,
            "Approval refused, party is full"
        );
        return Ok(ApprovalOutcome::Full);
    }

    work.update_membership_status(membership_id, next).await?;
    work.update_listing(&listing).await?;

    tracing::info!(
        listing_id = %listing_id,
        membership_id = %membership_id,
        member_id = %membership.member_id,
        current_count = listing.current_count,
        total_count = listing.total_count,
        "Participation approved"
    );
    Ok(ApprovalOutcome::Approved)
}

async fn reject_in<W: ListingStore + MembershipStore>(
    work: &mut W,
    membership_id: Uuid,
) -> Result<(), DomainError> {
    let listing_id = work
        .find_membership(membership_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Participation not found"))?
        .listing_id;

    work.find_listing_for_update(listing_id).await?;

    let membership = work
        .find_membership(membership_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Participation not found"))?;
    let next = membership.status.reject()?;
    if next != membership.status {
        work.update_membership_status(membership_id, next).await?;
    }

    tracing::info!(
        listing_id = %listing_id,
        membership_id = %membership_id,
        member_id = %membership.member_id,
        "Participation rejected"
    );
    Ok(())
}
