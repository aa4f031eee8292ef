use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints available without a credential.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Liveness probe.
        .route("/", get(handlers::health))
        // GET /popular-food-data
        // At most six listings, store order.
        .route("/popular-food-data", get(handlers::get_popular_food))
        // GET /all-food-data
        // Every listing. No pagination.
        .route("/all-food-data", get(handlers::get_all_food))
        // GET /donar-profile/{id}
        // Donor sub-document only; `{donor: null}` for an unknown listing.
        .route("/donar-profile/{id}", get(handlers::get_donor_profile))
}
