//! Subscription management API endpoints

pub mod subscriptions;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::state::AppState;

/// Create the subscription management router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route(
            "/subscriptions/cleanup",
            post(subscriptions::cleanup_subscriptions),
        )
        .route("/subscriptions/{key}", get(subscriptions::get_subscription))
        .route(
            "/subscriptions/{key}",
            put(subscriptions::update_subscription),
        )
        .route(
            "/subscriptions/{key}",
            delete(subscriptions::delete_subscription),
        )
        .route(
            "/subscriptions/{key}/toggle",
            post(subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/{key}/freeze",
            post(subscriptions::freeze_subscription),
        )
        .route(
            "/subscriptions/{key}/unfreeze",
            post(subscriptions::unfreeze_subscription),
        )
}
