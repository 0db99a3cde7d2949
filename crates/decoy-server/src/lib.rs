//! Decoy: an HTTP mock server driven by request expectations.
//!
//! Expectations pair a request pattern ([`predicate::HttpRequest`]) with an
//! action (respond, forward or callback) and a [`expectation::Times`] limit.
//! They are registered through the admin API and matched against live traffic
//! on the mock listener.

pub mod admin_api;
pub mod config;
pub mod expectation;
pub mod metrics;
pub mod predicate;
pub mod serialization;
pub mod server;
