//! Listing lifecycle: creation, host edits, deletion and the retirement sweep.
//!
//! Conversation channels live outside the unit of work. Creation opens the
//! channel first and retires it again if the listing cannot be stored;
//! retirement commits the listing and memberships first and then retires the
//! channel on a best-effort basis.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{
    CreateListingRequest, CreateListingResponse, ImageAttachment, Listing, Member, Membership,
    MembershipStatus, UpdateListingRequest,
};
use crate::store::{complete, ChannelService, ListingStore, MembershipStore, PartyStore};

/// Grace window after the scheduled time before a listing is retired.
pub const DEFAULT_GRACE_HOURS: i64 = 4;

/// Maximum listings retired per sweep.
pub const DEFAULT_SWEEP_BATCH_SIZE: i64 = 100;

/// Tuning for the retirement sweep.
#[derive(Debug, Clone, Copy)]
pub struct RetirementPolicy {
    pub grace: Duration,
    pub batch_size: i64,
}

impl Default for RetirementPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::hours(DEFAULT_GRACE_HOURS),
            batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }
}

/// Outcome of one retirement sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Expired listings found by the scan.
    pub scanned: usize,
    pub retired: usize,
    /// Retired listings that had no host membership; their channel was left alone.
    pub orphaned: usize,
    pub channel_failures: usize,
    /// Listings whose retirement failed and will be picked up again.
    pub failed: usize,
    /// True when another sweep was already running.
    pub skipped: bool,
}

/// Outcome of removing a member from every listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub retired_listings: usize,
    pub released_slots: usize,
    pub memberships_removed: u64,
}

/// Clears the single-flight flag when a sweep ends, however it ends.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Creates, edits and retires listings.
pub struct ListingLifecycle<S: PartyStore> {
    store: Arc<S>,
    channels: Arc<dyn ChannelService>,
    policy: RetirementPolicy,
    sweeping: Arc<AtomicBool>,
}

impl<S: PartyStore> Clone for ListingLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            channels: self.channels.clone(),
            policy: self.policy,
            sweeping: self.sweeping.clone(),
        }
    }
}

impl<S: PartyStore> ListingLifecycle<S> {
    pub fn new(store: Arc<S>, channels: Arc<dyn ChannelService>) -> Self {
        Self::with_policy(store, channels, RetirementPolicy::default())
    }

    pub fn with_policy(
        store: Arc<S>,
        channels: Arc<dyn ChannelService>,
        policy: RetirementPolicy,
    ) -> Self {
        Self {
            store,
            channels,
            policy,
            sweeping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn policy(&self) -> RetirementPolicy {
        self.policy
    }

    /// Creates a listing hosted by `creator`, its conversation channel and the
    /// host membership.
    pub async fn create(
        &self,
        request: CreateListingRequest,
        creator: &Member,
    ) -> Result<CreateListingResponse, DomainError> {
        if creator.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot host parties"));
        }
        request.validate()?;
        let image_url = checked_image(request.image.as_ref())?;

        let channel_id = self.channels.create(request.title.trim(), creator.id).await?;

        let listing = Listing::new(&request, creator, image_url);
        let host = Membership::host(listing.id, creator.id, channel_id);

        let stored: Result<(), DomainError> = async {
            let mut work = self.store.begin().await?;
            let result: Result<(), DomainError> = async {
                work.insert_listing(&listing).await?;
                work.insert_membership(&host).await?;
                Ok(())
            }
            .await;
            complete(work, result).await
        }
        .await;

        if let Err(err) = stored {
            // Compensate: the channel was opened outside the unit of work.
            if let Err(channel_err) = self.channels.soft_delete(channel_id).await {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %channel_err,
                    "Failed to retire channel of a party that could not be stored"
                );
            }
            return Err(err);
        }

        tracing::info!(
            listing_id = %listing.id,
            membership_id = %host.id,
            member_id = %creator.id,
            channel_id = %channel_id,
            total_count = listing.total_count,
            "Party created"
        );

        Ok(CreateListingResponse {
            party_id: listing.id,
            channel_id,
        })
    }

    /// Applies a partial update. Only the host may edit a listing.
    pub async fn update(
        &self,
        listing_id: Uuid,
        request: UpdateListingRequest,
        requester: &Member,
    ) -> Result<Listing, DomainError> {
        if requester.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot edit parties"));
        }
        request.validate()?;
        let image_url = checked_image(request.image.as_ref())?;

        let mut work = self.store.begin().await?;
        let result: Result<Listing, DomainError> = async {
            let mut listing = work
                .find_listing_for_update(listing_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Party not found"))?;
            ensure_host(&mut work, listing_id, requester.id).await?;

            listing.apply_update(&request, image_url)?;
            work.update_listing(&listing).await?;
            Ok(listing)
        }
        .await;
        let listing = complete(work, result).await?;

        tracing::info!(
            listing_id = %listing.id,
            member_id = %requester.id,
            recruitment_open = listing.recruitment_open,
            "Party updated"
        );
        Ok(listing)
    }

    /// Retires a listing on the host's request.
    pub async fn delete(&self, listing_id: Uuid, requester: &Member) -> Result<(), DomainError> {
        if requester.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot delete parties"));
        }

        let mut work = self.store.begin().await?;
        let result: Result<Option<Uuid>, DomainError> = async {
            work.find_listing_for_update(listing_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Party not found"))?;
            let host = ensure_host(&mut work, listing_id, requester.id).await?;
            retire_in(&mut work, listing_id).await?;
            Ok(host.channel_id)
        }
        .await;
        let channel_id = complete(work, result).await?;

        counter!("party_listings_retired_total", "reason" => "deleted").increment(1);
        tracing::info!(
            listing_id = %listing_id,
            member_id = %requester.id,
            "Party deleted"
        );

        if let Some(channel_id) = channel_id {
            self.retire_channel(listing_id, channel_id).await;
        }
        Ok(())
    }

    /// Retires every listing scheduled more than the grace window ago.
    pub async fn run_retirement_sweep(&self) -> Result<SweepReport, DomainError> {
        self.run_retirement_sweep_at(Utc::now()).await
    }

    /// Same as [`Self::run_retirement_sweep`] with an explicit clock reading.
    pub async fn run_retirement_sweep_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, DomainError> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("Retirement sweep already running, skipping");
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        }
        let _guard = SweepGuard(&self.sweeping);

        let cutoff = now - self.policy.grace;
        let mut work = self.store.begin().await?;
        let result = work
            .find_listings_scheduled_before(cutoff, self.policy.batch_size)
            .await;
        let expired = complete(work, result).await?;

        let mut report = SweepReport {
            scanned: expired.len(),
            ..SweepReport::default()
        };

        for candidate in expired {
            match self.retire_expired(candidate.id, cutoff).await {
                Ok(None) => {}
                Ok(Some(channel)) => {
                    report.retired += 1;
                    match channel {
                        Some(channel_id) => {
                            if !self.retire_channel(candidate.id, channel_id).await {
                                report.channel_failures += 1;
                            }
                        }
                        None => {
                            report.orphaned += 1;
                            tracing::warn!(
                                listing_id = %candidate.id,
                                "Retired party has no host membership, channel retirement skipped"
                            );
                        }
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        listing_id = %candidate.id,
                        error = %err,
                        retryable = err.is_retryable(),
                        "Failed to retire expired party"
                    );
                }
            }
        }

        counter!("party_listings_retired_total", "reason" => "expired")
            .increment(report.retired as u64);
        tracing::info!(
            scanned = report.scanned,
            retired = report.retired,
            orphaned = report.orphaned,
            channel_failures = report.channel_failures,
            failed = report.failed,
            cutoff = %cutoff,
            "Retirement sweep finished"
        );
        Ok(report)
    }

    /// Removes a member from every listing: hosted listings are retired,
    /// accepted slots are released and remaining records are deleted.
    pub async fn purge_member(&self, member_id: Uuid) -> Result<PurgeReport, DomainError> {
        let mut work = self.store.begin().await?;
        let result: Result<(PurgeReport, Vec<(Uuid, Uuid)>), DomainError> = async {
            let mut memberships = work.find_by_member(member_id).await?;
            // fixed lock order across listings
            memberships.sort_by_key(|m| m.listing_id);

            let mut report = PurgeReport::default();
            let mut channels = Vec::new();
            for membership in memberships {
                match membership.status {
                    MembershipStatus::Host => {
                        if work
                            .find_listing_for_update(membership.listing_id)
                            .await?
                            .is_none()
                        {
                            continue;
                        }
                        retire_in(&mut work, membership.listing_id).await?;
                        report.retired_listings += 1;
                        if let Some(channel_id) = membership.channel_id {
                            channels.push((membership.listing_id, channel_id));
                        }
                    }
                    MembershipStatus::Accepted => {
                        if let Some(mut listing) =
                            work.find_listing_for_update(membership.listing_id).await?
                        {
                            listing.release();
                            work.update_listing(&listing).await?;
                            report.released_slots += 1;
                        }
                    }
                    MembershipStatus::Awaiting | MembershipStatus::Rejected => {}
                }
            }
            report.memberships_removed = work.soft_delete_by_member(member_id).await?;
            Ok((report, channels))
        }
        .await;
        let (report, channels) = complete(work, result).await?;

        counter!("party_listings_retired_total", "reason" => "member_removed")
            .increment(report.retired_listings as u64);
        tracing::info!(
            member_id = %member_id,
            retired_listings = report.retired_listings,
            released_slots = report.released_slots,
            memberships_removed = report.memberships_removed,
            "Member purged from parties"
        );

        for (listing_id, channel_id) in channels {
            self.retire_channel(listing_id, channel_id).await;
        }
        Ok(report)
    }

    /// Retires one expired listing in its own unit of work.
    ///
    /// Returns `None` when the listing no longer qualifies, otherwise the host's
    /// channel if a host membership was found.
    async fn retire_expired(
        &self,
        listing_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Option<Uuid>>, DomainError> {
        let mut work = self.store.begin().await?;
        let result: Result<Option<Option<Uuid>>, DomainError> = async {
            let Some(listing) = work.find_listing_for_update(listing_id).await? else {
                return Ok(None);
            };
            // rescheduled since the scan
            if listing.scheduled_at >= cutoff {
                return Ok(None);
            }
            let host = work.find_host_by_listing(listing_id).await?;
            retire_in(&mut work, listing_id).await?;
            Ok(Some(host.and_then(|h| h.channel_id)))
        }
        .await;
        complete(work, result).await
    }

    /// Returns false when the channel service refused.
    async fn retire_channel(&self, listing_id: Uuid, channel_id: Uuid) -> bool {
        match self.channels.soft_delete(channel_id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    listing_id = %listing_id,
                    channel_id = %channel_id,
                    error = %err,
                    "Failed to retire party channel"
                );
                false
            }
        }
    }
}

fn checked_image(image: Option<&ImageAttachment>) -> Result<Option<String>, DomainError> {
    match image {
        None => Ok(None),
        Some(image) if shared::validation::is_allowed_image_type(&image.content_type) => {
            Ok(Some(image.url.clone()))
        }
        Some(image) => Err(DomainError::UnsupportedMedia(image.content_type.clone())),
    }
}

async fn ensure_host<W: MembershipStore>(
    work: &mut W,
    listing_id: Uuid,
    requester_id: Uuid,
) -> Result<Membership, DomainError> {
    match work.find_host_by_listing(listing_id).await? {
        Some(host) if host.member_id == requester_id => Ok(host),
        _ => Err(DomainError::forbidden("Only the host can change this party")),
    }
}

async fn retire_in<W: ListingStore + MembershipStore>(
    work: &mut W,
    listing_id: Uuid,
) -> Result<(), DomainError> {
    let memberships = work.soft_delete_by_listing(listing_id).await?;
    work.soft_delete_listing(listing_id).await?;
    tracing::debug!(
        listing_id = %listing_id,
        memberships = memberships,
        "Party retired"
    );
    Ok(())
}
