//! ledgercache - the client-side state layer of a personal finance app.
//!
//! This crate keeps server-fetched data (accounts, categories, tags,
//! templates, exchange rates, overview totals, the user profile) in typed
//! in-memory stores that sit between UI components and the REST API. Each
//! store serves reads from its cache while valid, mirrors acknowledged
//! writes locally, and invalidates itself whenever an operation's local
//! effect cannot be determined, so the next read refetches.
//!
//! The pieces fit together like this: [`api::ApiClient`] speaks the
//! envelope protocol over HTTP and implements the per-area traits in
//! [`api`]; [`stores::Stores`] owns every cache and the cross-store
//! rules; [`storage`] persists the exchange-rate snapshot between runs;
//! [`config`] locates the API and the local storage directory.

pub mod api;
pub mod config;
pub mod models;
pub mod storage;
pub mod stores;
