//! HTTP client for the backend REST API.
//!
//! This module provides the `ApiClient` struct implementing every service
//! boundary trait against the real server. All endpoints speak the
//! `{"success": ..., "result": ...}` envelope decoded in [`super::envelope`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;

use crate::models::{
    Account, AccountUpdate, Category, CategoryUpdate, LoginResponse, NewAccount, NewCategory,
    NewTag, NewTemplate, NewTransaction, OverviewPeriod, ProfileUpdate, RatesPayload, SessionInfo,
    Tag, TagUpdate, Template, TemplateType, TemplateUpdate, Transaction, TransactionUpdate,
    TwoFactorSetup, UserProfile, WindowAmounts,
};

use super::backend::{
    AccountApi, AuthApi, CategoryApi, OrderUpdate, OverviewApi, ProfileApi, RateApi, TagApi,
    TemplateApi, TransactionApi,
};
use super::envelope::Envelope;
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token, returning the client to its logged-out state
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// This is more efficient than creating a new client for each request.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                    ApiError::InvalidResponse(format!("Token is not header-safe: {}", e))
                })?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            // Rate limited - signal to retry
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request and decode the standard response envelope, retrying
    /// with exponential backoff while the server rate-limits us.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    let envelope: Envelope<T> = serde_json::from_str(&text)
                        .map_err(|e| ApiError::MalformedEnvelope(format!("{}: {}", path, e)))?;
                    return envelope.into_result();
                }
                None => {
                    // Rate limited
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    /// Write endpoints acknowledge with `result: true/false`. A false
    /// result means the server declined the operation without a message.
    async fn request_ack(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(), ApiError> {
        let done: bool = self.request(method, path, body).await?;
        if done {
            Ok(())
        } else {
            Err(ApiError::Rejected { message: None })
        }
    }

    fn transactions_path(from: NaiveDate, to: NaiveDate, account_id: Option<i64>) -> String {
        let mut path = format!("transactions?from={}&to={}", from, to);
        if let Some(account_id) = account_id {
            path.push_str(&format!("&accountId={}", account_id));
        }
        path
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[async_trait]
impl AccountApi for ApiClient {
    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.request(Method::GET, "accounts", None).await
    }

    async fn create_account(&self, new: &NewAccount) -> Result<Account, ApiError> {
        let body = json!({
            "title": new.title,
            "currency": new.currency,
            "icon": new.icon,
        });
        self.request(Method::POST, "accounts", Some(&body)).await
    }

    async fn update_account(&self, update: &AccountUpdate) -> Result<Account, ApiError> {
        let body = json!({
            "title": update.title,
            "icon": update.icon,
        });
        self.request(Method::PUT, &format!("accounts/{}", update.id), Some(&body))
            .await
    }

    async fn set_account_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError> {
        let body = json!({ "hidden": hidden });
        self.request_ack(
            Method::POST,
            &format!("accounts/{}/visibility", id),
            Some(&body),
        )
        .await
    }

    async fn reorder_accounts(&self, order: &[OrderUpdate]) -> Result<(), ApiError> {
        let body = json!({ "order": order });
        self.request_ack(Method::POST, "accounts/reorder", Some(&body))
            .await
    }

    async fn delete_account(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("accounts/{}", id), None)
            .await
    }
}

// ============================================================================
// Categories
// ============================================================================

#[async_trait]
impl CategoryApi for ApiClient {
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.request(Method::GET, "categories", None).await
    }

    async fn create_category(&self, new: &NewCategory) -> Result<Category, ApiError> {
        let body = json!({
            "title": new.title,
            "type": new.category_type,
            "parentId": new.parent_id,
            "icon": new.icon,
        });
        self.request(Method::POST, "categories", Some(&body)).await
    }

    async fn update_category(&self, update: &CategoryUpdate) -> Result<Category, ApiError> {
        let body = json!({
            "title": update.title,
            "parentId": update.parent_id,
            "icon": update.icon,
        });
        self.request(
            Method::PUT,
            &format!("categories/{}", update.id),
            Some(&body),
        )
        .await
    }

    async fn set_category_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError> {
        let body = json!({ "hidden": hidden });
        self.request_ack(
            Method::POST,
            &format!("categories/{}/visibility", id),
            Some(&body),
        )
        .await
    }

    async fn reorder_categories(&self, order: &[OrderUpdate]) -> Result<(), ApiError> {
        let body = json!({ "order": order });
        self.request_ack(Method::POST, "categories/reorder", Some(&body))
            .await
    }

    async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("categories/{}", id), None)
            .await
    }
}

// ============================================================================
// Tags
// ============================================================================

#[async_trait]
impl TagApi for ApiClient {
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.request(Method::GET, "tags", None).await
    }

    async fn create_tag(&self, new: &NewTag) -> Result<Tag, ApiError> {
        let body = json!({ "title": new.title });
        self.request(Method::POST, "tags", Some(&body)).await
    }

    async fn update_tag(&self, update: &TagUpdate) -> Result<Tag, ApiError> {
        let body = json!({ "title": update.title });
        self.request(Method::PUT, &format!("tags/{}", update.id), Some(&body))
            .await
    }

    async fn set_tag_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError> {
        let body = json!({ "hidden": hidden });
        self.request_ack(Method::POST, &format!("tags/{}/visibility", id), Some(&body))
            .await
    }

    async fn reorder_tags(&self, order: &[OrderUpdate]) -> Result<(), ApiError> {
        let body = json!({ "order": order });
        self.request_ack(Method::POST, "tags/reorder", Some(&body))
            .await
    }

    async fn delete_tag(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("tags/{}", id), None)
            .await
    }
}

// ============================================================================
// Templates
// ============================================================================

#[async_trait]
impl TemplateApi for ApiClient {
    async fn list_templates(&self, template_type: TemplateType) -> Result<Vec<Template>, ApiError> {
        self.request(
            Method::GET,
            &format!("templates?type={}", template_type.as_str()),
            None,
        )
        .await
    }

    async fn create_template(&self, new: &NewTemplate) -> Result<Template, ApiError> {
        let body = json!({
            "title": new.title,
            "type": new.template_type,
            "accountId": new.account_id,
            "categoryId": new.category_id,
            "amount": new.amount,
            "comment": new.comment,
        });
        self.request(Method::POST, "templates", Some(&body)).await
    }

    async fn update_template(&self, update: &TemplateUpdate) -> Result<Template, ApiError> {
        let body = json!({
            "title": update.title,
            "type": update.template_type,
            "accountId": update.account_id,
            "categoryId": update.category_id,
            "amount": update.amount,
            "comment": update.comment,
        });
        self.request(
            Method::PUT,
            &format!("templates/{}", update.id),
            Some(&body),
        )
        .await
    }

    async fn set_template_hidden(&self, id: i64, hidden: bool) -> Result<(), ApiError> {
        let body = json!({ "hidden": hidden });
        self.request_ack(
            Method::POST,
            &format!("templates/{}/visibility", id),
            Some(&body),
        )
        .await
    }

    async fn reorder_templates(&self, order: &[OrderUpdate]) -> Result<(), ApiError> {
        let body = json!({ "order": order });
        self.request_ack(Method::POST, "templates/reorder", Some(&body))
            .await
    }

    async fn delete_template(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("templates/{}", id), None)
            .await
    }
}

// ============================================================================
// Transactions
// ============================================================================

#[async_trait]
impl TransactionApi for ApiClient {
    async fn list_transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        account_id: Option<i64>,
    ) -> Result<Vec<Transaction>, ApiError> {
        let path = Self::transactions_path(from, to, account_id);
        self.request(Method::GET, &path, None).await
    }

    async fn get_transaction(&self, id: i64) -> Result<Transaction, ApiError> {
        self.request(Method::GET, &format!("transactions/{}", id), None)
            .await
    }

    async fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction, ApiError> {
        let body = json!({
            "type": new.transaction_type,
            "accountId": new.account_id,
            "dstAccountId": new.dst_account_id,
            "categoryId": new.category_id,
            "tagIds": new.tag_ids,
            "amount": new.amount,
            "dstAmount": new.dst_amount,
            "date": new.date,
            "comment": new.comment,
        });
        self.request(Method::POST, "transactions", Some(&body)).await
    }

    async fn update_transaction(
        &self,
        update: &TransactionUpdate,
    ) -> Result<Transaction, ApiError> {
        let body = json!({
            "type": update.transaction_type,
            "accountId": update.account_id,
            "dstAccountId": update.dst_account_id,
            "categoryId": update.category_id,
            "tagIds": update.tag_ids,
            "amount": update.amount,
            "dstAmount": update.dst_amount,
            "date": update.date,
            "comment": update.comment,
        });
        self.request(
            Method::PUT,
            &format!("transactions/{}", update.id),
            Some(&body),
        )
        .await
    }

    async fn delete_transaction(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("transactions/{}", id), None)
            .await
    }
}

// ============================================================================
// Overview and rates
// ============================================================================

#[async_trait]
impl OverviewApi for ApiClient {
    async fn fetch_overview(
        &self,
        periods: &[OverviewPeriod],
    ) -> Result<Vec<WindowAmounts>, ApiError> {
        let body = json!({ "periods": periods });
        self.request(Method::POST, "overview", Some(&body)).await
    }
}

#[async_trait]
impl RateApi for ApiClient {
    async fn fetch_rates(&self) -> Result<RatesPayload, ApiError> {
        self.request(Method::GET, "rates", None).await
    }
}

// ============================================================================
// Profile, sessions, two-factor
// ============================================================================

#[async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.request(Method::GET, "profile", None).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let body = json!({
            "displayName": update.display_name,
            "mainCurrency": update.main_currency,
            "locale": update.locale,
        });
        self.request(Method::PUT, "profile", Some(&body)).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        self.request(Method::GET, "profile/sessions", None).await
    }

    async fn revoke_session(&self, id: i64) -> Result<(), ApiError> {
        self.request_ack(Method::DELETE, &format!("profile/sessions/{}", id), None)
            .await
    }

    async fn two_factor_enable(&self) -> Result<TwoFactorSetup, ApiError> {
        self.request(Method::POST, "profile/totp/enable", None).await
    }

    async fn two_factor_confirm(&self, code: &str) -> Result<(), ApiError> {
        let body = json!({ "code": code });
        self.request_ack(Method::POST, "profile/totp/confirm", Some(&body))
            .await
    }

    async fn two_factor_disable(&self, code: &str) -> Result<(), ApiError> {
        let body = json!({ "code": code });
        self.request_ack(Method::POST, "profile/totp/disable", Some(&body))
            .await
    }
}

// ============================================================================
// Auth
// ============================================================================

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(
        &self,
        email: &str,
        password: &str,
        otp: Option<&str>,
    ) -> Result<LoginResponse, ApiError> {
        let body = json!({
            "email": email,
            "password": password,
            "otp": otp,
        });
        self.request(Method::POST, "auth/login", Some(&body)).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.request_ack(Method::POST, "auth/logout", None).await
    }
}
