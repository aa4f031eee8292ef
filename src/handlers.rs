use crate::{
    AppState,
    auth::Identity,
    error::ApiError,
    lifecycle,
    models::{
        CreatedResponse, DonorProfile, FoodRequest, HealthResponse, Listing, MessageResponse,
        NewFoodRequest,
    },
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use serde_json::{Map, Value};

// --- Public Handlers ---

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Server is running", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "ShareBite Server is Running!".to_string(),
        timestamp: Utc::now(),
    })
}

/// get_popular_food
///
/// [Public Route] Home-page feed of at most six listings.
#[utoipa::path(
    get,
    path = "/popular-food-data",
    responses(
        (status = 200, description = "Up to six listings"),
        (status = 500, description = "Store failure", body = crate::models::ErrorResponse)
    )
)]
pub async fn get_popular_food(
    State(state): State<AppState>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    Ok(Json(lifecycle::list_popular(state.repo.as_ref()).await?))
}

/// get_all_food
///
/// [Public Route] The full listing collection, unpaginated.
#[utoipa::path(
    get,
    path = "/all-food-data",
    responses((status = 200, description = "Every listing"))
)]
pub async fn get_all_food(State(state): State<AppState>) -> Result<Json<Vec<Listing>>, ApiError> {
    Ok(Json(lifecycle::list_all(state.repo.as_ref()).await?))
}

/// get_donor_profile
///
/// [Public Route] The donor sub-document of a listing, or `{"donor": null}` when the
/// listing does not exist.
#[utoipa::path(
    get,
    path = "/donar-profile/{id}",
    params(("id" = String, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Donor or null", body = DonorProfile),
        (status = 400, description = "Malformed ID", body = crate::models::ErrorResponse)
    )
)]
pub async fn get_donor_profile(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DonorProfile>, ApiError> {
    let Path(id) = path?;
    Ok(Json(
        lifecycle::get_donor_profile(state.repo.as_ref(), &id).await?,
    ))
}

// --- Authenticated Handlers ---

/// get_food_details
///
/// [Authenticated Route] A single listing.
#[utoipa::path(
    get,
    path = "/food-details/{id}",
    params(("id" = String, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing"),
        (status = 400, description = "Malformed ID", body = crate::models::ErrorResponse),
        (status = 401, description = "No credential", body = crate::models::ErrorResponse),
        (status = 403, description = "Invalid credential", body = crate::models::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::models::ErrorResponse)
    )
)]
pub async fn get_food_details(
    _caller: Identity,
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Listing>, ApiError> {
    let Path(id) = path?;
    Ok(Json(lifecycle::get_by_id(state.repo.as_ref(), &id).await?))
}

/// get_my_listings
///
/// [Authenticated Route] Listings whose donor email is the caller's verified email.
/// Query parameters are ignored; there is no way to list someone else's food.
#[utoipa::path(
    get,
    path = "/my-listings",
    responses((status = 200, description = "Caller's listings"))
)]
pub async fn get_my_listings(
    caller: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    Ok(Json(
        lifecycle::list_by_owner(state.repo.as_ref(), &caller).await?,
    ))
}

/// create_food
///
/// [Authenticated Route] Adds a listing. The body is stored as sent, minus any `_id`.
#[utoipa::path(
    post,
    path = "/all-food-data",
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing foodName or donor.email", body = crate::models::ErrorResponse)
    )
)]
pub async fn create_food(
    caller: Identity,
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(data) = payload?;
    let id = lifecycle::create_listing(state.repo.as_ref(), data, &caller).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

/// update_food
///
/// [Owner-Only Route] Partial update of a listing. `_id` and `donor` are ignored.
#[utoipa::path(
    put,
    path = "/update-food/{id}",
    params(("id" = String, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 403, description = "Not Owner", body = crate::models::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::models::ErrorResponse)
    )
)]
pub async fn update_food(
    caller: Identity,
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = path?;
    let Json(body) = payload?;
    lifecycle::update_listing(state.repo.as_ref(), &id, body, &caller).await?;
    Ok(Json(MessageResponse::ok("Food updated")))
}

/// delete_food
///
/// [Owner-Only Route] Removes a listing.
#[utoipa::path(
    delete,
    path = "/delete-food-data/{id}",
    params(("id" = String, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not Owner", body = crate::models::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::models::ErrorResponse)
    )
)]
pub async fn delete_food(
    caller: Identity,
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = path?;
    lifecycle::delete_listing(state.repo.as_ref(), &id, &caller).await?;
    Ok(Json(MessageResponse::ok("Food deleted")))
}

/// create_food_request
///
/// [Authenticated Route] Requests a listing. Requester name and email are taken from the
/// verified credential, whatever the body says.
#[utoipa::path(
    post,
    path = "/food-requests",
    request_body = NewFoodRequest,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing foodId or donorEmail", body = crate::models::ErrorResponse)
    )
)]
pub async fn create_food_request(
    caller: Identity,
    State(state): State<AppState>,
    payload: Result<Json<NewFoodRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(data) = payload?;
    let id = lifecycle::create_request(state.repo.as_ref(), data, &caller).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

/// get_food_requests
///
/// [Authenticated Route] Requests addressed to the caller as donor, newest first.
#[utoipa::path(
    get,
    path = "/food-requests",
    responses((status = 200, description = "Incoming requests", body = [FoodRequest]))
)]
pub async fn get_food_requests(
    caller: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<FoodRequest>>, ApiError> {
    Ok(Json(
        lifecycle::list_requests_for_donor(state.repo.as_ref(), &caller).await?,
    ))
}

/// Structured 404 for unknown paths.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Structured 405 for known paths hit with a method they do not serve.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".to_string())
}
