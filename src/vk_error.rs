use serde::Deserialize;
use thiserror::Error;

/// `error_code` the API returns when the access token is missing or invalid.
pub const AUTH_FAILED_CODE: i64 = 5;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error_code: i64,
    pub error_msg: String,
}

#[derive(Error, Debug)]
pub enum VkError {
    #[error("Authorization failed: {0}")]
    Auth(String),
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Missing configuration {0}")]
    Config(&'static str),
    #[error("HTTP error {0}")]
    Http(reqwest::Error),
    #[error("Invalid URL {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid response {0}")]
    Json(#[from] serde_json::Error),
}

impl VkError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<reqwest::Error> for VkError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

impl From<ApiErrorBody> for VkError {
    fn from(body: ApiErrorBody) -> Self {
        if body.error_code == AUTH_FAILED_CODE {
            Self::Auth(body.error_msg)
        } else {
            Self::Api {
                code: body.error_code,
                message: body.error_msg,
            }
        }
    }
}
