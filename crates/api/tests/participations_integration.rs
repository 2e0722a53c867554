//! Join requests and host decisions.

mod common;

use axum::http::{Method, StatusCode};
use common::{parse_id, TestApp, NO_BODY};
use domain::models::MembershipStatus;

fn toggle_uri(party_id: uuid::Uuid) -> String {
    format!("/api/v1/parties/{}/participation", party_id)
}

#[tokio::test]
async fn test_request_approve_flow() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/me/approval-requests",
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let requests = body.as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(parse_id(&requests[0]["membershipId"]), membership_id);
    assert_eq!(parse_id(&requests[0]["requester"]["memberId"]), guest.id());
    assert_eq!(requests[0]["partyTitle"], "Board game night");

    let (_, awaiting) = app
        .call(
            Method::GET,
            "/api/v1/me/participations?status=2",
            Some(&guest.token),
            NO_BODY,
        )
        .await;
    assert_eq!(awaiting.as_array().unwrap().len(), 1);
    assert_eq!(awaiting[0]["state"], 2);

    let (status, body) = app.approve(membership_id, &host).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "APPROVED");

    let listing = app.store.listing(party_id).await.unwrap();
    assert_eq!(listing.current_count, 2);
    assert_eq!(
        app.store.membership(membership_id).await.unwrap().status,
        MembershipStatus::Accepted
    );

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/me/participations?status=1",
            Some(&guest.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let accepted = body.as_array().unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(parse_id(&accepted[0]["partyId"]), party_id);
    assert_eq!(accepted[0]["state"], 1);
    assert_eq!(accepted[0]["participants"].as_array().unwrap().len(), 2);

    let (_, pending) = app
        .call(
            Method::GET,
            "/api/v1/me/approval-requests",
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_hosted_parties_are_not_participations() {
    let app = TestApp::new();
    let host = app.member().await;
    app.create_party(&host, 4).await;

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/me/participations",
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/me/participations?status=9",
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_the_host_decides() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let other = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;

    let (status, body) = app.approve(membership_id, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // Guests cannot approve themselves either.
    let (status, _) = app.approve(membership_id, &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.reject(membership_id, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(
        app.store.membership(membership_id).await.unwrap().status,
        MembershipStatus::Awaiting
    );
}

#[tokio::test]
async fn test_blocked_host_cannot_decide() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;

    let mut blocked = host.member.clone();
    blocked.authority = domain::models::MemberAuthority::Blocked;
    app.members.insert(blocked).await;

    let (status, _) = app.approve(membership_id, &host).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approval_stops_at_capacity() {
    let app = TestApp::new();
    let host = app.member().await;
    let first = app.member().await;
    let second = app.member().await;
    let party_id = app.create_party(&host, 2).await;
    let first_id = app.join(party_id, &first).await;
    let second_id = app.join(party_id, &second).await;

    let (_, body) = app.approve(first_id, &host).await;
    assert_eq!(body["outcome"], "APPROVED");
    assert!(!app.store.listing(party_id).await.unwrap().recruitment_open);

    let (status, body) = app.approve(second_id, &host).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "FULL");

    let listing = app.store.listing(party_id).await.unwrap();
    assert_eq!(listing.current_count, 2);
    assert_eq!(
        app.store.membership(second_id).await.unwrap().status,
        MembershipStatus::Awaiting
    );
}

#[tokio::test]
async fn test_leaving_releases_the_slot() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 2).await;
    let membership_id = app.join(party_id, &guest).await;
    app.approve(membership_id, &host).await;

    let (status, body) = app
        .call(Method::POST, &toggle_uri(party_id), Some(&guest.token), NO_BODY)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "CANCELLED");

    let listing = app.store.listing(party_id).await.unwrap();
    assert_eq!(listing.current_count, 1);
    assert!(listing.recruitment_open);
    assert!(app
        .store
        .membership(membership_id)
        .await
        .unwrap()
        .is_deleted());

    // A fresh request is possible after leaving.
    app.join(party_id, &guest).await;
}

#[tokio::test]
async fn test_cancelling_a_pending_request() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;

    let (_, body) = app
        .call(Method::POST, &toggle_uri(party_id), Some(&guest.token), NO_BODY)
        .await;
    assert_eq!(body["outcome"], "CANCELLED");
    assert_eq!(app.store.listing(party_id).await.unwrap().current_count, 1);

    let (status, _) = app.approve(membership_id, &host).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejection_is_sticky() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;

    let (status, body) = app.reject(membership_id, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    // Rejecting again changes nothing.
    let (status, _) = app.reject(membership_id, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.approve(membership_id, &host).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (_, body) = app
        .call(Method::POST, &toggle_uri(party_id), Some(&guest.token), NO_BODY)
        .await;
    assert_eq!(body["outcome"], "REJECTED");

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/parties/{}", party_id),
            Some(&guest.token),
            NO_BODY,
        )
        .await;
    assert_eq!(body["state"], 3);
}

#[tokio::test]
async fn test_accepted_member_cannot_be_rejected() {
    let app = TestApp::new();
    let host = app.member().await;
    let guest = app.member().await;
    let party_id = app.create_party(&host, 4).await;
    let membership_id = app.join(party_id, &guest).await;
    app.approve(membership_id, &host).await;

    let (status, _) = app.reject(membership_id, &host).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.approve(membership_id, &host).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.store.listing(party_id).await.unwrap().current_count, 2);
}

#[tokio::test]
async fn test_host_toggle_is_a_no_op() {
    let app = TestApp::new();
    let host = app.member().await;
    let party_id = app.create_party(&host, 4).await;

    let (status, body) = app
        .call(Method::POST, &toggle_uri(party_id), Some(&host.token), NO_BODY)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "ALREADY_HOST");
    assert_eq!(app.store.memberships_of_listing(party_id).await.len(), 1);
}

#[tokio::test]
async fn test_unknown_targets() {
    let app = TestApp::new();
    let host = app.member().await;

    let (status, _) = app.approve(uuid::Uuid::new_v4(), &host).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            &toggle_uri(uuid::Uuid::new_v4()),
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/participations/not-a-uuid/approve",
            Some(&host.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blocked_member_cannot_join() {
    let app = TestApp::new();
    let host = app.member().await;
    let blocked = app.blocked_member().await;
    let party_id = app.create_party(&host, 4).await;

    let (status, _) = app
        .call(Method::POST, &toggle_uri(party_id), Some(&blocked.token), NO_BODY)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_routes_are_rate_limited() {
    let app = TestApp::with_overrides(&[("security.rate_limit_per_minute", "2")]);
    let member = app.member().await;

    for _ in 0..2 {
        let (status, _) = app
            .call(
                Method::GET,
                "/api/v1/me/hosted-parties",
                Some(&member.token),
                NO_BODY,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/api/v1/me/hosted-parties")
                .header("Authorization", format!("Bearer {}", member.token))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Limits are tracked per member.
    let other = app.member().await;
    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/me/hosted-parties",
            Some(&other.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_leaving_every_party() {
    let app = TestApp::new();
    let member = app.member().await;
    let other_host = app.member().await;
    let hosted = app.create_party(&member, 4).await;
    let joined = app.create_party(&other_host, 4).await;
    let membership_id = app.join(joined, &member).await;
    app.approve(membership_id, &other_host).await;
    assert_eq!(app.store.listing(joined).await.unwrap().current_count, 2);

    let (status, body) = app
        .call(
            Method::DELETE,
            "/api/v1/me/parties",
            Some(&member.token),
            NO_BODY,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retiredListings"], 1);
    assert_eq!(body["releasedSlots"], 1);
    // The host record went with the retired listing.
    assert_eq!(body["membershipsRemoved"], 1);

    assert!(app.store.listing(hosted).await.unwrap().is_deleted());
    let joined_listing = app.store.listing(joined).await.unwrap();
    assert!(!joined_listing.is_deleted());
    assert_eq!(joined_listing.current_count, 1);
    assert!(app
        .store
        .membership(membership_id)
        .await
        .unwrap()
        .is_deleted());
}
