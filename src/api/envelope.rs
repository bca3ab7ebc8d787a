//! Response envelope shared by every backend endpoint.

use serde::Deserialize;

use super::ApiError;

/// Standard response wrapper: `{"success": bool, "result": ..., "error": ...}`.
///
/// `success` and `result` are optional in the wire type so that a missing
/// field surfaces as a malformed envelope instead of a serde type error
/// with no useful context.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the envelope into its payload.
    ///
    /// A `success: false` envelope becomes [`ApiError::Rejected`], carrying
    /// the server's message when one was included. An envelope with no
    /// `success` flag, or a successful one with no `result`, is malformed.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.success {
            None => Err(ApiError::MalformedEnvelope("missing success flag".to_string())),
            Some(false) => Err(ApiError::Rejected { message: self.error }),
            Some(true) => self
                .result
                .ok_or_else(|| ApiError::MalformedEnvelope("missing result payload".to_string())),
        }
    }
}
