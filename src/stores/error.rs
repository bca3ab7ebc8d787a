use thiserror::Error;

use crate::api::ApiError;

/// Fallback shown when the server did not provide a user-presentable
/// message. Raw status texts and serde errors never reach the user.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum StoreError {
    /// A forced refresh fetched a payload structurally equal to the cache.
    /// Callers usually treat this as "nothing to re-render", not a failure.
    #[error("Already up to date")]
    AlreadyUpToDate,

    #[error("Cannot move the item to that position")]
    InvalidMove,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl StoreError {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, StoreError::AlreadyUpToDate)
    }

    /// Message suitable for direct display. Business-rule rejections keep
    /// the server's wording; everything else collapses to the generic
    /// fallback.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::AlreadyUpToDate | StoreError::InvalidMove => self.to_string(),
            StoreError::Api(e) => e
                .user_message()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
        }
    }
}
