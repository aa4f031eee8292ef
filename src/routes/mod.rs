/// Router Module Index
///
/// Routes are split by the access level they demand. Owner-only routes live with the
/// authenticated ones: the caller must be verified before the ownership check can read
/// the listing.

/// Routes open to anonymous callers.
pub mod public;

/// Routes whose handlers take an `Identity`, so every request is verified first.
pub mod authenticated;
