use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Upper bound on the number of listings returned by the home-page feed.
pub const POPULAR_LIMIT: i64 = 6;

// --- Listing Documents ---

/// Listing
///
/// A food-donation record as stored in the `listings` collection. Listings are freeform
/// JSON documents: apart from `_id`, `foodName` and `donor.email` nothing is interpreted
/// by the server, and whatever the donor submitted is returned verbatim.
///
/// The owner of a listing is `donor.email`. It is fixed at creation; see [`ListingPatch`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(Map<String, Value>);

impl Listing {
    /// Builds the public view of a stored document, stamping the server-assigned id.
    pub fn from_document(id: Uuid, mut document: Map<String, Value>) -> Self {
        document.insert("_id".to_string(), Value::String(id.to_string()));
        Self(document)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    pub fn food_name(&self) -> Option<&str> {
        self.0.get("foodName").and_then(Value::as_str)
    }

    /// The `donor` sub-document, if the listing has one.
    pub fn donor(&self) -> Option<&Value> {
        self.0.get("donor")
    }

    /// The owning donor's email. Ownership checks compare against this value.
    pub fn donor_email(&self) -> Option<&str> {
        self.donor()
            .and_then(|donor| donor.get("email"))
            .and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn into_document(self) -> Map<String, Value> {
        self.0
    }
}

/// ListingPatch
///
/// A partial listing update with every ownership-bearing key removed. The only way to
/// build one is [`ListingPatch::from_body`], so a patch can never carry `_id` or any
/// part of `donor` into the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPatch(Map<String, Value>);

impl ListingPatch {
    pub fn from_body(mut body: Map<String, Value>) -> Self {
        body.retain(|key, _| {
            key != "_id" && key != "donor" && !key.starts_with("donor.")
        });
        Self(body)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// DonorProfile
///
/// Response for the public donor lookup. Only the `donor` sub-document leaves the server;
/// an unknown listing yields `{"donor": null}` rather than a 404.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DonorProfile {
    #[schema(value_type = Object, nullable)]
    pub donor: Option<Value>,
}

// --- Food Requests ---

/// RequestStatus
///
/// Lifecycle marker of a food request. Only `Pending` is ever written; the other states
/// exist so stored records written by other tools still deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// FoodRequest
///
/// A claim on a listing, stored in the `food_requests` table. Requester fields always
/// come from the verified caller, and `requestDate` is stamped by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FoodRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub food_id: Uuid,
    pub food_name: Option<String>,
    pub food_image: Option<String>,
    pub expiry_date: Option<String>,
    pub donor_email: String,
    pub donor_name: Option<String>,
    pub requester_email: String,
    pub requester_name: String,
    #[ts(type = "string")]
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
}

/// NewFoodRequest
///
/// Input payload for `POST /food-requests`. Requester fields are not part of the payload;
/// if a client sends them anyway they are silently dropped during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewFoodRequest {
    pub food_id: Option<String>,
    pub food_name: Option<String>,
    pub food_image: Option<String>,
    pub expiry_date: Option<String>,
    pub donor_email: Option<String>,
    pub donor_name: Option<String>,
}

// --- Response Envelopes ---

/// Returned by every create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatedResponse {
    pub success: bool,
    pub inserted_id: Uuid,
}

impl CreatedResponse {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            success: true,
            inserted_id,
        }
    }
}

/// Returned by update and delete.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub message: String,
}

/// Liveness probe payload for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    pub message: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}
