//! Common test utilities for integration tests.
//!
//! The router runs over the in-memory ports, so no database is needed.
//! Tokens are minted with the shared HS256 test secret.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use domain::memory::{InMemoryChannelService, InMemoryMemberDirectory, InMemoryPartyStore};
use domain::models::{Member, MemberAuthority};
use fake::faker::name::en::Name;
use fake::Fake;
use partyhub_api::{
    app::{create_app, AppState},
    config::Config,
};
use serde_json::{json, Value};
use shared::jwt::JwtConfig;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Lets tests build a request body without a trailing `None`.
pub const NO_BODY: Option<Value> = None;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryPartyStore>,
    pub members: Arc<InMemoryMemberDirectory>,
    pub channels: Arc<InMemoryChannelService>,
    jwt: JwtConfig,
}

/// A registered member and a valid access token for them.
pub struct TestMember {
    pub member: Member,
    pub token: String,
}

impl TestMember {
    pub fn id(&self) -> Uuid {
        self.member.id
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let config = Config::load_for_test(overrides).expect("Failed to load test config");
        let jwt = config.jwt.verifier().expect("Test config must carry a secret");

        let store = Arc::new(InMemoryPartyStore::new());
        let members = Arc::new(InMemoryMemberDirectory::new());
        let channels = Arc::new(InMemoryChannelService::new());

        let state = AppState::new(config, store.clone(), members.clone(), channels.clone())
            .expect("Failed to build app state");

        Self {
            router: create_app(state),
            store,
            members,
            channels,
            jwt,
        }
    }

    async fn register(&self, authority: MemberAuthority, location: Option<(f64, f64)>) -> TestMember {
        let id = Uuid::new_v4();
        let member = Member {
            id,
            external_id: format!("kakao_{}", id.simple()),
            display_name: Name().fake(),
            profile_image: None,
            authority,
            latitude: location.map(|(lat, _)| lat),
            longitude: location.map(|(_, lon)| lon),
        };
        self.members.insert(member.clone()).await;

        let token = self
            .jwt
            .issue_access_token(&member.external_id, 900)
            .expect("Failed to mint token");
        TestMember { member, token }
    }

    pub async fn member(&self) -> TestMember {
        self.register(MemberAuthority::User, None).await
    }

    pub async fn member_at(&self, latitude: f64, longitude: f64) -> TestMember {
        self.register(MemberAuthority::User, Some((latitude, longitude)))
            .await
    }

    pub async fn blocked_member(&self) -> TestMember {
        self.register(MemberAuthority::Blocked, None).await
    }

    /// A valid token whose subject is not a registered member.
    pub fn stranger_token(&self) -> String {
        self.jwt
            .issue_access_token("kakao_nobody", 900)
            .expect("Failed to mint token")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    /// Sends a JSON request and returns the status with the decoded body
    /// (`Value::Null` for empty bodies).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Creates a party near Seoul City Hall and returns its id.
    pub async fn create_party(&self, host: &TestMember, total_count: i32) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/parties",
                Some(&host.token),
                Some(party_body("Board game night", total_count)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        parse_id(&body["partyId"])
    }

    /// Files a join request and returns the guest's membership id.
    pub async fn join(&self, party_id: Uuid, guest: &TestMember) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/parties/{}/participation", party_id),
                Some(&guest.token),
                NO_BODY,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "REQUESTED");

        self.store
            .memberships_of_listing(party_id)
            .await
            .into_iter()
            .find(|m| m.member_id == guest.id() && m.deleted_at.is_none())
            .expect("join request recorded")
            .id
    }

    pub async fn approve(&self, membership_id: Uuid, host: &TestMember) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/api/v1/participations/{}/approve", membership_id),
            Some(&host.token),
            NO_BODY,
        )
        .await
    }

    pub async fn reject(&self, membership_id: Uuid, host: &TestMember) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/api/v1/participations/{}/reject", membership_id),
            Some(&host.token),
            NO_BODY,
        )
        .await
    }
}

pub const SEOUL_LAT: f64 = 37.5665;
pub const SEOUL_LON: f64 = 126.9780;

pub fn party_body(title: &str, total_count: i32) -> Value {
    json!({
        "title": title,
        "content": "Bring your favourite game",
        "placeName": "City Hall",
        "scheduledAt": (Utc::now() + Duration::days(1)).to_rfc3339(),
        "totalCount": total_count,
        "latitude": SEOUL_LAT,
        "longitude": SEOUL_LON,
    })
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("expected a uuid, got {}", value))
}

pub fn search_uri(radius_km: f64, extra: &str) -> String {
    format!(
        "/api/v1/parties?radius={}&latitude={}&longitude={}{}",
        radius_km, SEOUL_LAT, SEOUL_LON, extra
    )
}
