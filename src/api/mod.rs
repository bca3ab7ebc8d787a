//! REST API client module for the backend service.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend, plus the per-area service traits the stores are written
//! against so tests can substitute in-memory fakes.
//!
//! The API uses bearer token authentication obtained through the login
//! endpoint, and wraps every payload in a `{"success", "result"}`
//! envelope.

pub mod backend;
pub mod client;
pub mod envelope;
pub mod error;

pub use backend::{
    AccountApi, AuthApi, CategoryApi, OrderUpdate, OverviewApi, ProfileApi, RateApi, TagApi,
    TemplateApi, TransactionApi,
};
pub use client::ApiClient;
pub use envelope::Envelope;
pub use error::ApiError;
