use crate::models::{FoodRequest, Listing, ListingPatch, RequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, types::Json};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// StoreError
///
/// Failure of the backing store. Surfaces to clients as a generic 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("stored record {id} is unreadable: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// Persistence contract for listings and food requests. Handlers and lifecycle rules only
/// see this trait, so tests swap in [`MemoryRepository`] without touching a database.
///
/// Every method is a single store call. There are no cross-call transactions: the
/// read-then-write sequence of an owner-only update is two independent calls.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Listings ---
    async fn insert_listing(&self, id: Uuid, document: Map<String, Value>) -> Result<(), StoreError>;
    // Natural (insertion) order. `None` means the whole collection.
    async fn find_listings(&self, limit: Option<i64>) -> Result<Vec<Listing>, StoreError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
    async fn find_listings_by_donor(&self, email: &str) -> Result<Vec<Listing>, StoreError>;
    // Shallow top-level merge. Returns false when no listing matched.
    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> Result<bool, StoreError>;
    // Returns false when no listing matched.
    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Food Requests ---
    async fn insert_request(&self, request: FoodRequest) -> Result<(), StoreError>;
    // Most recent `request_date` first.
    async fn find_requests_by_donor(&self, email: &str) -> Result<Vec<FoodRequest>, StoreError>;

    // --- Lifecycle ---
    /// Round-trips to the store. Used at startup.
    async fn ping(&self) -> Result<(), StoreError>;
    /// Creates missing tables. Only called in `Env::Local`.
    async fn ensure_schema(&self) -> Result<(), StoreError>;
}

/// RepositoryState
///
/// The shared handle stored in the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const CREATE_LISTINGS: &str = r#"
    CREATE TABLE IF NOT EXISTS listings (
        id UUID PRIMARY KEY,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_FOOD_REQUESTS: &str = r#"
    CREATE TABLE IF NOT EXISTS food_requests (
        id UUID PRIMARY KEY,
        food_id UUID NOT NULL,
        food_name TEXT,
        food_image TEXT,
        expiry_date TEXT,
        donor_email TEXT NOT NULL,
        donor_name TEXT,
        requester_email TEXT NOT NULL,
        requester_name TEXT NOT NULL,
        request_date TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL
    )
"#;

#[derive(FromRow)]
struct ListingRow {
    id: Uuid,
    doc: Json<Map<String, Value>>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Listing::from_document(row.id, row.doc.0)
    }
}

#[derive(FromRow)]
struct FoodRequestRow {
    id: Uuid,
    food_id: Uuid,
    food_name: Option<String>,
    food_image: Option<String>,
    expiry_date: Option<String>,
    donor_email: String,
    donor_name: Option<String>,
    requester_email: String,
    requester_name: String,
    request_date: DateTime<Utc>,
    status: String,
}

impl TryFrom<FoodRequestRow> for FoodRequest {
    type Error = StoreError;

    fn try_from(row: FoodRequestRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|reason| StoreError::Corrupt { id: row.id, reason })?;

        Ok(FoodRequest {
            id: row.id,
            food_id: row.food_id,
            food_name: row.food_name,
            food_image: row.food_image,
            expiry_date: row.expiry_date,
            donor_email: row.donor_email,
            donor_name: row.donor_name,
            requester_email: row.requester_email,
            requester_name: row.requester_name,
            request_date: row.request_date,
            status,
        })
    }
}

/// PostgresRepository
///
/// Document-style persistence on Postgres: listings live in a JSONB column so arbitrary
/// donor-supplied fields round-trip untouched; food requests have a fixed shape and get
/// ordinary columns.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert_listing(&self, id: Uuid, document: Map<String, Value>) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO listings (id, doc) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(document))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `LIMIT NULL` is "no limit" in Postgres, so one statement serves both feeds.
    async fn find_listings(&self, limit: Option<i64>) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT id, doc FROM listings ORDER BY created_at ASC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let row = sqlx::query_as::<_, ListingRow>("SELECT id, doc FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Listing::from))
    }

    async fn find_listings_by_donor(&self, email: &str) -> Result<Vec<Listing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"SELECT id, doc FROM listings
               WHERE doc->'donor'->>'email' = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE listings SET doc = doc || $2 WHERE id = $1")
            .bind(id)
            .bind(Json(patch.into_fields()))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_request(&self, request: FoodRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO food_requests
               (id, food_id, food_name, food_image, expiry_date, donor_email, donor_name,
                requester_email, requester_name, request_date, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(request.id)
        .bind(request.food_id)
        .bind(request.food_name)
        .bind(request.food_image)
        .bind(request.expiry_date)
        .bind(request.donor_email)
        .bind(request.donor_name)
        .bind(request.requester_email)
        .bind(request.requester_name)
        .bind(request.request_date)
        .bind(request.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_requests_by_donor(&self, email: &str) -> Result<Vec<FoodRequest>, StoreError> {
        let rows = sqlx::query_as::<_, FoodRequestRow>(
            r#"SELECT id, food_id, food_name, food_image, expiry_date, donor_email, donor_name,
                      requester_email, requester_name, request_date, status
               FROM food_requests
               WHERE donor_email = $1
               ORDER BY request_date DESC"#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FoodRequest::try_from).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_LISTINGS).execute(&self.pool).await?;
        sqlx::query(CREATE_FOOD_REQUESTS).execute(&self.pool).await?;
        Ok(())
    }
}

// --- In-Memory ---

/// MemoryRepository
///
/// An in-process store with the same observable semantics as [`PostgresRepository`]:
/// insertion order for listings, shallow merge on update, newest-first request feeds.
/// Used by the test suites; `new_failing` simulates an unreachable store.
#[derive(Default)]
pub struct MemoryRepository {
    listings: RwLock<Vec<(Uuid, Map<String, Value>)>>,
    requests: RwLock<Vec<FoodRequest>>,
    /// When true, every operation returns `StoreError::Unavailable`.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Unavailable(
                "memory store configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_listing(&self, id: Uuid, document: Map<String, Value>) -> Result<(), StoreError> {
        self.check()?;
        self.listings.write().await.push((id, document));
        Ok(())
    }

    async fn find_listings(&self, limit: Option<i64>) -> Result<Vec<Listing>, StoreError> {
        self.check()?;
        let listings = self.listings.read().await;
        let take = limit
            .map(|l| usize::try_from(l).unwrap_or(0))
            .unwrap_or(listings.len());

        Ok(listings
            .iter()
            .take(take)
            .map(|(id, doc)| Listing::from_document(*id, doc.clone()))
            .collect())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        self.check()?;
        Ok(self
            .listings
            .read()
            .await
            .iter()
            .find(|(listing_id, _)| *listing_id == id)
            .map(|(id, doc)| Listing::from_document(*id, doc.clone())))
    }

    async fn find_listings_by_donor(&self, email: &str) -> Result<Vec<Listing>, StoreError> {
        self.check()?;
        Ok(self
            .listings
            .read()
            .await
            .iter()
            .map(|(id, doc)| Listing::from_document(*id, doc.clone()))
            .filter(|listing| listing.donor_email() == Some(email))
            .collect())
    }

    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> Result<bool, StoreError> {
        self.check()?;
        let mut listings = self.listings.write().await;
        match listings.iter_mut().find(|(listing_id, _)| *listing_id == id) {
            Some((_, doc)) => {
                doc.extend(patch.into_fields());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_listing(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut listings = self.listings.write().await;
        let before = listings.len();
        listings.retain(|(listing_id, _)| *listing_id != id);
        Ok(listings.len() < before)
    }

    async fn insert_request(&self, request: FoodRequest) -> Result<(), StoreError> {
        self.check()?;
        self.requests.write().await.push(request);
        Ok(())
    }

    async fn find_requests_by_donor(&self, email: &str) -> Result<Vec<FoodRequest>, StoreError> {
        self.check()?;
        let mut matching: Vec<FoodRequest> = self
            .requests
            .read()
            .await
            .iter()
            .filter(|request| request.donor_email == email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(matching)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        // No-op in memory.
        self.check()
    }
}
