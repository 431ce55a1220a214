//! Service layer for subscription records.
//! - Separates business rules from data access.
//! - Reuses validation, filters and entity definitions from the `models` crate.
//! - Exposes one error type per domain so the HTTP layer maps failures in one place.

pub mod subscription;
#[cfg(test)]
pub mod test_support;
