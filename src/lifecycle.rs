//! Listing and food-request lifecycle rules.
//!
//! Each operation is one or two store calls wrapped in validation and the access policy.
//! Owner-only operations read the record, check existence, then ownership, then write;
//! the read and the write are not atomic.

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    auth::Identity,
    error::ApiError,
    models::{
        DonorProfile, FoodRequest, Listing, ListingPatch, NewFoodRequest, POPULAR_LIMIT,
        RequestStatus,
    },
    policy::{AccessLevel, Denial, authorize},
    repository::Repository,
};

/// Parses an externally supplied identifier. Malformed ids never reach the store.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation("Invalid ID"))
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map.iter().any(|(k, v)| k.contains('\0') || contains_nul(v)),
        _ => false,
    }
}

fn nul_rejected() -> ApiError {
    ApiError::validation("Text must not contain NUL characters")
}

/// Postgres text and JSONB cannot hold U+0000, so such input is a client error rather
/// than a store failure.
fn reject_nul(document: &Map<String, Value>) -> Result<(), ApiError> {
    if document
        .iter()
        .any(|(key, value)| key.contains('\0') || contains_nul(value))
    {
        return Err(nul_rejected());
    }
    Ok(())
}

fn require_owner(listing: &Listing, caller: &Identity, action: &str) -> Result<(), ApiError> {
    authorize(AccessLevel::OwnerOnly, Some(caller), listing.donor_email()).map_err(|denial| {
        if denial == Denial::NotOwner {
            tracing::warn!(
                listing_id = listing.id().unwrap_or_default(),
                caller = %caller.email,
                action,
                "ownership check failed"
            );
        }
        denial.into_api_error(action)
    })
}

// --- Listings ---

/// Stores a new listing and returns its server-assigned id.
///
/// `foodName` and `donor.email` must be non-empty strings. A client-supplied `_id` is
/// discarded; every other field is stored exactly as sent.
pub async fn create_listing(
    repo: &dyn Repository,
    mut data: Map<String, Value>,
    caller: &Identity,
) -> Result<Uuid, ApiError> {
    let has_name = non_empty(data.get("foodName")).is_some();
    let has_donor_email = non_empty(data.get("donor").and_then(|d| d.get("email"))).is_some();
    if !has_name || !has_donor_email {
        return Err(ApiError::validation("Food name and donor email required"));
    }

    data.remove("_id");
    reject_nul(&data)?;

    let id = Uuid::new_v4();
    repo.insert_listing(id, data).await?;

    tracing::info!(listing_id = %id, caller = %caller.email, "listing created");
    Ok(id)
}

/// Home-page feed: at most six listings in store order. Not sorted by freshness.
pub async fn list_popular(repo: &dyn Repository) -> Result<Vec<Listing>, ApiError> {
    Ok(repo.find_listings(Some(POPULAR_LIMIT)).await?)
}

/// The whole collection, unpaginated.
pub async fn list_all(repo: &dyn Repository) -> Result<Vec<Listing>, ApiError> {
    Ok(repo.find_listings(None).await?)
}

pub async fn get_by_id(repo: &dyn Repository, raw_id: &str) -> Result<Listing, ApiError> {
    let id = parse_id(raw_id)?;
    repo.find_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Food not found"))
}

/// Only the `donor` sub-document is exposed. An unknown listing is `{donor: null}`.
pub async fn get_donor_profile(
    repo: &dyn Repository,
    raw_id: &str,
) -> Result<DonorProfile, ApiError> {
    let id = parse_id(raw_id)?;
    let donor = repo
        .find_listing(id)
        .await?
        .and_then(|listing| listing.donor().cloned());

    Ok(DonorProfile { donor })
}

/// Listings owned by the caller. Scoped by the verified email only.
pub async fn list_by_owner(
    repo: &dyn Repository,
    caller: &Identity,
) -> Result<Vec<Listing>, ApiError> {
    Ok(repo.find_listings_by_donor(&caller.email).await?)
}

/// Applies `body` to an owned listing.
///
/// Order of checks: id format, existence, ownership. `_id` and `donor` are stripped from
/// the patch, so the owner can never change. A patch with nothing left is a no-op.
pub async fn update_listing(
    repo: &dyn Repository,
    raw_id: &str,
    body: Map<String, Value>,
    caller: &Identity,
) -> Result<(), ApiError> {
    let id = parse_id(raw_id)?;
    let existing = repo
        .find_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Food not found"))?;
    require_owner(&existing, caller, "update")?;

    let patch = ListingPatch::from_body(body);
    if patch.is_empty() {
        tracing::debug!(listing_id = %id, "empty patch, nothing to update");
        return Ok(());
    }
    reject_nul(patch.fields())?;

    // The listing may have been deleted since the ownership read.
    if !repo.update_listing(id, patch).await? {
        return Err(ApiError::not_found("Food not found"));
    }

    tracing::info!(listing_id = %id, caller = %caller.email, "listing updated");
    Ok(())
}

/// Deletes an owned listing. Same sequencing as [`update_listing`].
pub async fn delete_listing(
    repo: &dyn Repository,
    raw_id: &str,
    caller: &Identity,
) -> Result<(), ApiError> {
    let id = parse_id(raw_id)?;
    let existing = repo
        .find_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Food not found"))?;
    require_owner(&existing, caller, "delete")?;

    if !repo.delete_listing(id).await? {
        return Err(ApiError::not_found("Food not found"));
    }

    tracing::info!(listing_id = %id, caller = %caller.email, "listing deleted");
    Ok(())
}

// --- Food Requests ---

/// Records a claim on a listing and returns its id.
///
/// Requester fields always come from `caller`, `requestDate` is the server clock and the
/// status starts at `pending`. The referenced listing is not looked up.
pub async fn create_request(
    repo: &dyn Repository,
    data: NewFoodRequest,
    caller: &Identity,
) -> Result<Uuid, ApiError> {
    let (Some(raw_food_id), Some(donor_email)) = (
        data.food_id.filter(|s| !s.trim().is_empty()),
        data.donor_email.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(ApiError::validation("Food ID and donor email required"));
    };

    let food_id =
        Uuid::parse_str(raw_food_id.trim()).map_err(|_| ApiError::validation("Invalid food ID"))?;

    let texts = [
        Some(&donor_email),
        data.food_name.as_ref(),
        data.food_image.as_ref(),
        data.expiry_date.as_ref(),
        data.donor_name.as_ref(),
    ];
    if texts.into_iter().flatten().any(|text| text.contains('\0')) {
        return Err(nul_rejected());
    }

    let request = FoodRequest {
        id: Uuid::new_v4(),
        food_id,
        food_name: data.food_name,
        food_image: data.food_image,
        expiry_date: data.expiry_date,
        donor_email,
        donor_name: data.donor_name,
        requester_email: caller.email.clone(),
        requester_name: caller.name.clone(),
        request_date: Utc::now(),
        status: RequestStatus::Pending,
    };
    let id = request.id;

    repo.insert_request(request).await?;

    tracing::info!(request_id = %id, %food_id, requester = %caller.email, "food request created");
    Ok(id)
}

/// Requests addressed to the caller as donor, newest first.
pub async fn list_requests_for_donor(
    repo: &dyn Repository,
    caller: &Identity,
) -> Result<Vec<FoodRequest>, ApiError> {
    Ok(repo.find_requests_by_donor(&caller.email).await?)
}
