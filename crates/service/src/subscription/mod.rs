//! Subscription module: domain, repository, service.
//!
//! The service owns validation and the optimistic-concurrency protocol;
//! repositories only persist and query.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::SubscriptionService;
