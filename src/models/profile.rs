use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user's profile and user-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    /// Currency all overview totals are converted into.
    #[serde(rename = "mainCurrency")]
    pub main_currency: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(rename = "totpEnabled", default)]
    pub two_factor_enabled: bool,
}

/// Editable profile fields sent with an update.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub main_currency: String,
    pub locale: Option<String>,
}

/// One active login session on the account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionInfo {
    pub id: i64,
    #[serde(rename = "userAgent")]
    pub user_agent: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastUsedAt")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// True for the session backing the current token.
    #[serde(default)]
    pub current: bool,
}

/// Secret material returned when two-factor enrollment starts. The
/// enrollment is not active until confirmed with a code.
#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    #[serde(rename = "otpauthUrl")]
    pub otpauth_url: String,
}

/// Payload returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}
