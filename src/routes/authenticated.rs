use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here takes an `Identity` argument. The extractor verifies the bearer
/// token before the handler runs and rejects with 401 (no token) or 403 (bad token).
/// Owner-only handlers additionally compare the caller's email with the listing's
/// `donor.email` after reading the listing.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /food-details/{id}
        .route("/food-details/{id}", get(handlers::get_food_details))
        // GET /my-listings
        // Scoped to the caller's verified email.
        .route("/my-listings", get(handlers::get_my_listings))
        // POST /all-food-data
        // Shares its path with the public GET; merged into one method router.
        .route("/all-food-data", post(handlers::create_food))
        // PUT /update-food/{id}  (owner-only)
        .route("/update-food/{id}", put(handlers::update_food))
        // DELETE /delete-food-data/{id}  (owner-only)
        .route("/delete-food-data/{id}", delete(handlers::delete_food))
        // POST/GET /food-requests
        // Requester derived from the credential; the listing feed is scoped to the caller
        // as donor and sorted newest first.
        .route(
            "/food-requests",
            post(handlers::create_food_request).get(handlers::get_food_requests),
        )
}
