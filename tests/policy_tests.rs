use axum::http::StatusCode;
use sharebite_server::{
    ApiError,
    auth::Identity,
    policy::{AccessLevel, Denial, authorize},
};

fn caller(email: &str) -> Identity {
    Identity {
        id: format!("uid-{}", email),
        email: email.to_string(),
        name: "Caller".to_string(),
    }
}

#[test]
fn test_public_allows_anyone() {
    assert_eq!(authorize(AccessLevel::Public, None, None), Ok(()));
    assert_eq!(
        authorize(AccessLevel::Public, Some(&caller("a@x.com")), Some("b@x.com")),
        Ok(())
    );
}

#[test]
fn test_authenticated_requires_identity() {
    assert_eq!(
        authorize(AccessLevel::Authenticated, None, None),
        Err(Denial::Unauthenticated)
    );
    assert_eq!(
        authorize(AccessLevel::Authenticated, Some(&caller("a@x.com")), None),
        Ok(())
    );
}

#[test]
fn test_owner_only_matches_donor_email() {
    let a = caller("a@x.com");

    assert_eq!(
        authorize(AccessLevel::OwnerOnly, Some(&a), Some("a@x.com")),
        Ok(())
    );
    assert_eq!(
        authorize(AccessLevel::OwnerOnly, Some(&a), Some("b@x.com")),
        Err(Denial::NotOwner)
    );
}

#[test]
fn test_owner_only_without_caller_is_unauthenticated_not_forbidden() {
    assert_eq!(
        authorize(AccessLevel::OwnerOnly, None, Some("a@x.com")),
        Err(Denial::Unauthenticated)
    );
}

#[test]
fn test_owner_only_denies_record_without_owner() {
    assert_eq!(
        authorize(AccessLevel::OwnerOnly, Some(&caller("a@x.com")), None),
        Err(Denial::NotOwner)
    );
}

#[test]
fn test_owner_email_comparison_is_exact() {
    assert_eq!(
        authorize(AccessLevel::OwnerOnly, Some(&caller("a@x.com")), Some("A@x.com")),
        Err(Denial::NotOwner)
    );
}

#[test]
fn test_denials_map_to_distinct_statuses() {
    let unauthenticated: ApiError = Denial::Unauthenticated.into_api_error("update");
    let not_owner: ApiError = Denial::NotOwner.into_api_error("update");

    assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unauthenticated.to_string(), "Unauthorized: No token");
    assert_eq!(not_owner.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(not_owner.to_string(), "You can only update your own food");
}

#[test]
fn test_not_owner_message_names_the_action() {
    let err = Denial::NotOwner.into_api_error("delete");

    assert_eq!(err.to_string(), "You can only delete your own food");
}
