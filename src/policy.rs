use crate::{
    auth::{AuthError, Identity},
    error::ApiError,
};

/// AccessLevel
///
/// What a route demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// No identity required.
    Public,
    /// Any verified caller.
    Authenticated,
    /// A verified caller whose email equals the resource's `donor.email`.
    OwnerOnly,
}

/// Denial
///
/// Why [`authorize`] refused. Kept distinct so the response can tell "log in" apart from
/// "not yours".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    NotOwner,
}

impl Denial {
    /// The client-facing error for this denial. `action` names the refused operation
    /// ("update", "delete") and only appears in the not-owner message.
    pub fn into_api_error(self, action: &str) -> ApiError {
        match self {
            Denial::Unauthenticated => AuthError::MissingToken.into(),
            Denial::NotOwner => {
                ApiError::forbidden(format!("You can only {} your own food", action))
            }
        }
    }
}

/// authorize
///
/// Decides whether `caller` may proceed at `level`. For `OwnerOnly`, `owner_email` must be
/// read from the stored record before calling; a record with no owner email is never
/// writable.
pub fn authorize(
    level: AccessLevel,
    caller: Option<&Identity>,
    owner_email: Option<&str>,
) -> Result<(), Denial> {
    match level {
        AccessLevel::Public => Ok(()),
        AccessLevel::Authenticated => caller.map(|_| ()).ok_or(Denial::Unauthenticated),
        AccessLevel::OwnerOnly => {
            let caller = caller.ok_or(Denial::Unauthenticated)?;
            match owner_email {
                Some(owner) if owner == caller.email => Ok(()),
                _ => Err(Denial::NotOwner),
            }
        }
    }
}
