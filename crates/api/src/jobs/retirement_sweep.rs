//! Background job that retires parties past their grace window.

use domain::services::ListingLifecycle;
use domain::store::PartyStore;

use super::scheduler::{Job, JobFrequency};

pub struct RetirementSweepJob<S: PartyStore> {
    lifecycle: ListingLifecycle<S>,
    interval_minutes: u64,
}

impl<S: PartyStore> RetirementSweepJob<S> {
    pub fn new(lifecycle: ListingLifecycle<S>, interval_minutes: u64) -> Self {
        Self {
            lifecycle,
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl<S: PartyStore> Job for RetirementSweepJob<S> {
    fn name(&self) -> &'static str {
        "retirement_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        let report = self
            .lifecycle
            .run_retirement_sweep()
            .await
            .map_err(|e| e.to_string())?;

        if report.failed > 0 {
            return Err(format!(
                "{} of {} expired parties could not be retired",
                report.failed, report.scanned
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::memory::{InMemoryChannelService, InMemoryPartyStore};
    use domain::models::{CreateListingRequest, Member, MemberAuthority};
    use std::sync::Arc;
    use uuid::Uuid;

    fn host() -> Member {
        Member {
            id: Uuid::new_v4(),
            external_id: "kakao_host".into(),
            display_name: "Host".into(),
            profile_image: None,
            authority: MemberAuthority::User,
            latitude: None,
            longitude: None,
        }
    }

    fn request(scheduled_in: Duration) -> CreateListingRequest {
        CreateListingRequest {
            title: "Night hike".into(),
            content: String::new(),
            place_name: None,
            scheduled_at: Utc::now() + scheduled_in,
            total_count: 4,
            latitude: 37.5,
            longitude: 127.0,
            image: None,
        }
    }

    #[test]
    fn test_job_metadata() {
        let store = Arc::new(InMemoryPartyStore::new());
        let lifecycle = ListingLifecycle::new(store, Arc::new(InMemoryChannelService::new()));
        let job = RetirementSweepJob::new(lifecycle, 10);

        assert_eq!(job.name(), "retirement_sweep");
        assert_eq!(job.frequency(), JobFrequency::Minutes(10));
    }

    #[tokio::test]
    async fn test_execute_retires_past_parties() {
        let store = Arc::new(InMemoryPartyStore::new());
        let channels = Arc::new(InMemoryChannelService::new());
        let lifecycle = ListingLifecycle::new(store.clone(), channels.clone());
        let host = host();

        let past = lifecycle
            .create(request(Duration::hours(-5)), &host)
            .await
            .unwrap();
        let upcoming = lifecycle
            .create(request(Duration::hours(2)), &host)
            .await
            .unwrap();

        RetirementSweepJob::new(lifecycle, 10).execute().await.unwrap();

        assert!(store.listing(past.party_id).await.unwrap().is_deleted());
        assert!(!store.listing(upcoming.party_id).await.unwrap().is_deleted());
        assert!(channels
            .channel(past.channel_id)
            .await
            .unwrap()
            .is_deleted());
    }

    #[tokio::test]
    async fn test_execute_reports_storage_outage() {
        let store = Arc::new(InMemoryPartyStore::new());
        store.set_unavailable(true);
        let lifecycle = ListingLifecycle::new(store, Arc::new(InMemoryChannelService::new()));

        let result = RetirementSweepJob::new(lifecycle, 10).execute().await;
        assert!(result.is_err());
    }
}
