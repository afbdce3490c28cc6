use std::fmt;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::context::ContextError;
use crate::ratelimit::Rate;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("base URL must have a trailing slash, but {0:?} does not")]
    MissingTrailingSlash(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value: {0:?}")]
    InvalidHeader(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{0}")]
    Cancelled(#[from] ContextError),

    #[error("{0}")]
    Api(Box<ErrorResponse>),

    #[error("{0}")]
    RateLimited(Box<RateLimitError>),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to copy response body: {0}")]
    Io(#[from] std::io::Error),

    #[error("async task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("couldn't find async task {task_id} for {organization}/{project} (HTTP 404)")]
    TaskNotFound {
        task_id: String,
        organization: String,
        project: String,
    },

    #[error("async task {task_id} took too long: still pending after {attempts} polls")]
    TaskTimedOut { task_id: String, attempts: usize },

    #[error("accepted response did not include a task uuid")]
    MissingTaskId,
}

impl ApiError {
    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }

    /// Response metadata for structured and rate-limit errors.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            ApiError::Api(response) => Some(response.as_ref()),
            ApiError::RateLimited(err) => Some(&err.response),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled(_))
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::MissingTrailingSlash(_) => {
                Some("Base URLs look like https://sentry.io/api/ (note the trailing slash)")
            }
            ApiError::Api(response) if response.status == StatusCode::UNAUTHORIZED => {
                Some("Verify the auth token configured for this profile")
            }
            ApiError::Api(response) if response.status == StatusCode::NOT_FOUND => {
                Some("Check the organization and project slugs")
            }
            ApiError::RateLimited(_) => Some("Wait for the rate limit window to reset"),
            ApiError::TaskTimedOut { .. } => {
                Some("The task may still complete; list the resource again later")
            }
            _ => None,
        }
    }
}

/// A non-2xx response, with everything the envelope knew about it.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub rate: Rate,
    pub body: Bytes,
    /// Remote-supplied message, or the trimmed raw body.
    pub detail: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            self.url,
            self.status.as_u16(),
            self.detail
        )
    }
}

/// A 429 response where the server reported an exhausted budget.
#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub rate: Rate,
    pub response: ErrorResponse,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.response)?;
        match self.rate.seconds_until_reset() {
            Some(secs) => write!(f, " [rate reset in {secs}s]"),
            None => Ok(()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
