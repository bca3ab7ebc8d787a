//! Service boundary traits.
//!
//! Each store drives the backend through a narrow per-area trait instead
//! of the concrete HTTP client, so cache behavior can be exercised with
//! small in-memory fakes. [`crate::api::ApiClient`] implements all of them
//! against the real REST API.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    Account, AccountUpdate, Category, CategoryUpdate, LoginResponse, NewAccount, NewCategory,
    NewTag, NewTemplate, NewTransaction, OverviewPeriod, ProfileUpdate, RatesPayload, SessionInfo,
    Tag, TagUpdate, Template, TemplateType, TemplateUpdate, Transaction, TransactionUpdate,
    TwoFactorSetup, UserProfile, WindowAmounts,
};

use super::ApiError;

/// One entry of a reorder payload: an id and its new zero-based position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdate {
    pub id: i64,
    #[serde(rename = "displayOrder")]
    pub display_order: u32,
}

#[async_trait]
pub trait AccountApi {
    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError>;
    async fn create_account(&self, new: &NewAccount) -> Result<Account, ApiError>;
    async fn update_account(&self, update: &AccountUpdate) -> Result<Account, ApiError>;
    async fn set_account_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError>;
    async fn reorder_accounts(&self, order: &[OrderUpdate]) -> Result<(), ApiError>;
    async fn delete_account(&self, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait CategoryApi {
    /// Full category forest: root categories with their subcategories
    /// embedded, all types mixed.
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, new: &NewCategory) -> Result<Category, ApiError>;
    async fn update_category(&self, update: &CategoryUpdate) -> Result<Category, ApiError>;
    async fn set_category_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError>;
    async fn reorder_categories(&self, order: &[OrderUpdate]) -> Result<(), ApiError>;
    async fn delete_category(&self, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait TagApi {
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;
    async fn create_tag(&self, new: &NewTag) -> Result<Tag, ApiError>;
    async fn update_tag(&self, update: &TagUpdate) -> Result<Tag, ApiError>;
    async fn set_tag_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError>;
    async fn reorder_tags(&self, order: &[OrderUpdate]) -> Result<(), ApiError>;
    async fn delete_tag(&self, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait TemplateApi {
    /// Templates of one type only; each type is cached independently.
    async fn list_templates(&self, template_type: TemplateType) -> Result<Vec<Template>, ApiError>;
    async fn create_template(&self, new: &NewTemplate) -> Result<Template, ApiError>;
    async fn update_template(&self, update: &TemplateUpdate) -> Result<Template, ApiError>;
    async fn set_template_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError>;
    async fn reorder_templates(&self, order: &[OrderUpdate]) -> Result<(), ApiError>;
    async fn delete_template(&self, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait TransactionApi {
    async fn list_transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        account_id: Option<i64>,
    ) -> Result<Vec<Transaction>, ApiError>;
    async fn get_transaction(&self, id: i64) -> Result<Transaction, ApiError>;
    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction, ApiError>;
    async fn update_transaction(&self, update: &TransactionUpdate)
        -> Result<Transaction, ApiError>;
    async fn delete_transaction(&self, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
pub trait OverviewApi {
    /// Income/expense totals per currency for each requested window. The
    /// server echoes each period's key so rows can be matched back.
    async fn fetch_overview(&self, periods: &[OverviewPeriod])
        -> Result<Vec<WindowAmounts>, ApiError>;
}

#[async_trait]
pub trait RateApi {
    async fn fetch_rates(&self) -> Result<RatesPayload, ApiError>;
}

#[async_trait]
pub trait ProfileApi {
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError>;
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError>;
    async fn revoke_session(&self, id: i64) -> Result<(), ApiError>;
    async fn two_factor_enable(&self) -> Result<TwoFactorSetup, ApiError>;
    async fn two_factor_confirm(&self, code: &str) -> Result<(), ApiError>;
    async fn two_factor_disable(&self, code: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AuthApi {
    /// Exchange credentials (and a TOTP code when two-factor is enabled)
    /// for a bearer token and the user's profile.
    async fn login(
        &self,
        email: &str,
        password: &str,
        otp: Option<&str>,
    ) -> Result<LoginResponse, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
}
