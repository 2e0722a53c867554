use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::services::{ListingLifecycle, ListingQuery, ParticipationService};
use domain::store::{ChannelService, MemberDirectory, PartyStore};
use shared::jwt::{JwtConfig, JwtError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, optional_member_auth, rate_limit_middleware,
    require_member_auth, security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{health, me, participations, parties};

/// Shared handler state, generic over the listing store.
pub struct AppState<S: PartyStore> {
    pub store: Arc<S>,
    pub members: Arc<dyn MemberDirectory>,
    pub participation: ParticipationService<S>,
    pub lifecycle: ListingLifecycle<S>,
    pub query: ListingQuery<S>,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl<S: PartyStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            members: self.members.clone(),
            participation: self.participation.clone(),
            lifecycle: self.lifecycle.clone(),
            query: self.query.clone(),
            config: self.config.clone(),
            jwt: self.jwt.clone(),
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

impl<S: PartyStore> AppState<S> {
    /// Wires the party services over the given ports.
    pub fn new(
        config: Config,
        store: Arc<S>,
        members: Arc<dyn MemberDirectory>,
        channels: Arc<dyn ChannelService>,
    ) -> Result<Self, JwtError> {
        let jwt = Arc::new(config.jwt.verifier()?);
        let rate_limiter =
            RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);

        Ok(Self {
            participation: ParticipationService::new(store.clone(), members.clone()),
            lifecycle: ListingLifecycle::with_policy(
                store.clone(),
                channels,
                config.retirement.policy(),
            ),
            query: ListingQuery::new(store.clone(), members.clone()),
            store,
            members,
            config: Arc::new(config),
            jwt,
            rate_limiter,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = &config.security.cors_origins;
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
    }
}

pub fn create_app<S: PartyStore>(state: AppState<S>) -> Router {
    let config = state.config.clone();

    // Member routes (bearer token, rate limited per member).
    // route_layer runs bottom-up: authentication first, then rate limiting.
    let member_routes = Router::new()
        .route("/api/v1/parties", post(parties::create_party::<S>))
        .route(
            "/api/v1/parties/:party_id",
            get(parties::get_party::<S>)
                .patch(parties::update_party::<S>)
                .delete(parties::delete_party::<S>),
        )
        .route(
            "/api/v1/parties/:party_id/participation",
            post(parties::toggle_participation::<S>),
        )
        .route(
            "/api/v1/participations/:membership_id/approve",
            post(participations::approve::<S>),
        )
        .route(
            "/api/v1/participations/:membership_id/reject",
            post(participations::reject::<S>),
        )
        .route("/api/v1/me/participations", get(me::participations::<S>))
        .route(
            "/api/v1/me/approval-requests",
            get(me::approval_requests::<S>),
        )
        .route("/api/v1/me/hosted-parties", get(me::hosted_parties::<S>))
        .route("/api/v1/me/parties", delete(me::leave_all_parties::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware::<S>,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_member_auth::<S>,
        ));

    // The feed also serves anonymous callers.
    let feed_routes = Router::new()
        .route("/api/v1/parties", get(parties::search_parties::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_member_auth::<S>,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check::<S>))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready::<S>))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(feed_routes)
        .merge(member_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
