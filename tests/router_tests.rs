use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use sharebite_server::{
    AppState, MemoryRepository, create_router,
    auth::{Claims, JwtVerifier},
    repository::Repository,
};
use std::{sync::Arc, time::SystemTime};
use tower::util::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "router-test-secret";

fn state_with(repo: MemoryRepository) -> AppState {
    AppState {
        repo: Arc::new(repo),
        verifier: Arc::new(JwtVerifier::new(TEST_JWT_SECRET)),
    }
}

fn bearer(email: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: "router-user".to_string(),
        email: Some(email.to_string()),
        name: None,
        iat: now,
        exp: now + 600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_popular_feed_is_capped_at_six() {
    let repo = MemoryRepository::new();
    for i in 0..9 {
        let doc = json!({ "foodName": format!("Dish {}", i), "donor": { "email": "a@x.com" } });
        repo.insert_listing(Uuid::new_v4(), doc.as_object().unwrap().clone())
            .await
            .unwrap();
    }
    let app = create_router(state_with(repo));

    let popular = app
        .clone()
        .oneshot(Request::get("/popular-food-data").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(popular.status(), StatusCode::OK);
    let popular = body_json(popular).await;

    let all = app
        .oneshot(Request::get("/all-food-data").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let all = body_json(all).await;

    let popular = popular.as_array().unwrap();
    let all = all.as_array().unwrap();
    assert_eq!(popular.len(), 6);
    assert_eq!(all.len(), 9);
    assert!(popular.iter().all(|listing| all.contains(listing)));
}

#[tokio::test]
async fn test_store_failure_is_structured_500() {
    let app = create_router(state_with(MemoryRepository::new_failing()));

    let response = app
        .oneshot(Request::get("/all-food-data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_unknown_route_is_structured_404() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(Request::get("/no-such-route").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Route not found");
}

#[tokio::test]
async fn test_non_utf8_path_id_is_structured_validation_error() {
    let app = create_router(state_with(MemoryRepository::new()));

    let public = app
        .clone()
        .oneshot(Request::get("/donar-profile/%FF").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(public.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(public).await["message"], "Invalid ID");

    let owner_only = app
        .oneshot(
            Request::delete("/delete-food-data/%FF")
                .header(header::AUTHORIZATION, bearer("a@x.com"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(owner_only.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(owner_only).await["message"], "Invalid ID");
}

#[tokio::test]
async fn test_unsupported_method_is_structured_405() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::patch("/all-food-data")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["message"], "Method not allowed");
}

#[tokio::test]
async fn test_non_json_body_is_validation_error() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::post("/all-food-data")
                .header(header::AUTHORIZATION, bearer("a@x.com"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("[1, 2, 3]"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());
}

#[tokio::test]
async fn test_missing_content_type_is_validation_error() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::post("/food-requests")
                .header(header::AUTHORIZATION, bearer("a@x.com"))
                .body(Body::from(r#"{"foodId":"x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_on_missing_listing_is_not_found_for_any_caller() {
    let app = create_router(state_with(MemoryRepository::new()));
    let id = Uuid::new_v4();

    for caller in ["a@x.com", "b@x.com"] {
        let response = app
            .clone()
            .oneshot(
                Request::put(format!("/update-food/{}", id))
                    .header(header::AUTHORIZATION, bearer(caller))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"foodName":"Rye"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::get("/my-listings")
                .header(header::AUTHORIZATION, "Basic YTpi")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Unauthorized: No token");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_router(state_with(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/update-food/{id}"].is_object());
}
