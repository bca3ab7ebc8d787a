//! Data models for backend API entities.
//!
//! This module contains all the data structures exchanged with the
//! server, including:
//!
//! - `Account`: money accounts with minor-unit balances
//! - `Category`, `CategoryType`: two-level category trees per type
//! - `Tag`: free-form transaction labels
//! - `Template`, `TemplateType`: transaction prefills per type
//! - `Transaction`, `TransactionType`: money movements
//! - `OverviewPeriod`, `WindowAmounts`: overview request/response rows
//! - `RatesPayload`: exchange rate tables
//! - `UserProfile`, `SessionInfo`: the signed-in user and their sessions
//!
//! Everything arrives as camelCase JSON and every cached model derives
//! `PartialEq` so forced refreshes can detect structurally unchanged
//! payloads.

pub mod account;
pub mod category;
pub mod overview;
pub mod profile;
pub mod rates;
pub mod tag;
pub mod template;
pub mod transaction;

pub use account::{Account, AccountUpdate, NewAccount};
pub use category::{Category, CategoryType, CategoryUpdate, NewCategory};
pub use overview::{CurrencyAmounts, OverviewPeriod, WindowAmounts};
pub use profile::{LoginResponse, ProfileUpdate, SessionInfo, TwoFactorSetup, UserProfile};
pub use rates::RatesPayload;
pub use tag::{NewTag, Tag, TagUpdate};
pub use template::{NewTemplate, Template, TemplateType, TemplateUpdate};
pub use transaction::{NewTransaction, Transaction, TransactionType, TransactionUpdate};
