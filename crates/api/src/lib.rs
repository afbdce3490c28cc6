//! Typed client runtime for the Sentry REST API.
//!
//! [`Client::new_request`] builds a request, [`Client::execute`] sends it and
//! decodes the body into a [`ResponseTarget`], [`Client::bare_do`] sends it
//! without decoding. Every response comes back as a [`Response`] envelope
//! with the pagination cursor and rate limit counters already parsed.

pub mod codec;
pub mod context;
pub mod error;
pub mod pagination;
pub mod ratelimit;
pub mod request;
pub mod resources;
pub mod response;
pub mod target;
pub mod task;

pub use codec::{BoolOrStringList, ErrorPayload, Int64OrString};
pub use context::{CancelHandle, Context, ContextError};
pub use error::{ApiError, ErrorResponse, RateLimitError, Result};
pub use ratelimit::Rate;
pub use request::{add_query, ApiRequest, ListCursorParams, QueryParams};
pub use response::Response;
pub use target::{JsonBody, RawBody, ResponseTarget};
pub use task::{PollPolicy, TaskScope};

pub use reqwest::Method;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://sentry.io/api/";

pub fn default_user_agent() -> String {
    format!("sentry-api-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for a [`Client`]. Nothing here can change once the client
/// is built.
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    base_url: String,
    on_premise: bool,
    token: Option<String>,
    user_agent: String,
    timeout: Option<Duration>,
    poll_policy: PollPolicy,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            on_premise: false,
            token: None,
            user_agent: default_user_agent(),
            timeout: Some(Duration::from_secs(30)),
            poll_policy: PollPolicy::default(),
        }
    }
}

impl ClientBuilder {
    /// Use `base_url` as is. It must end in `/`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.on_premise = false;
        self
    }

    /// Point at a self-hosted install. `https://example.com`,
    /// `https://example.com/api` and `https://example.com/api/` all resolve to
    /// `https://example.com/api/`.
    pub fn on_premise(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.on_premise = true;
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// An empty user agent sends no `User-Agent` header at all.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut base_url = Url::parse(&self.base_url)?;
        if self.on_premise {
            normalize_on_premise(&mut base_url);
        }
        request::ensure_trailing_slash(&base_url)?;

        let mut default_headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::InvalidHeader("Authorization".to_string()))?;
            value.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, value);
        }

        let mut http = reqwest::Client::builder().default_headers(default_headers);
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(Client {
            http: http.build()?,
            base_url,
            user_agent: self.user_agent,
            poll_policy: self.poll_policy,
        })
    }
}

fn normalize_on_premise(url: &mut Url) {
    let mut path = url.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    if !path.ends_with("/api/") {
        path.push_str("api/");
    }
    url.set_path(&path);
}

/// Sentry API client. Cheap to clone and safe to share between tasks.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    user_agent: String,
    poll_policy: PollPolicy,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client for sentry.io authenticated with `token`.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::builder().bearer_token(token).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll_policy
    }

    /// Build a request for `path`, resolved against the base URL, with
    /// `body` encoded as JSON.
    pub fn new_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiRequest> {
        request::build_request(&self.base_url, &self.user_agent, method, path, body)
    }

    /// Send `request` and classify the response without decoding the body.
    ///
    /// A non-2xx status comes back as [`ApiError::Api`] or
    /// [`ApiError::RateLimited`], both of which keep the status, headers and
    /// body. If `ctx` fires before the response arrives, or the transport
    /// fails after `ctx` fired, the context error is returned instead.
    pub async fn bare_do(&self, ctx: &Context, request: ApiRequest) -> Result<Response> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let method = request.method.clone();
        debug!(method = %method, url = %request.url, "Sending request");

        let send = async {
            let response = self.http.execute(request.into_reqwest()).await?;
            Response::from_reqwest(method, response).await
        };

        let response = tokio::select! {
            biased;
            err = ctx.cancelled() => return Err(err.into()),
            result = send => match result {
                Ok(response) => response,
                Err(err) => return Err(ctx.err().map(ApiError::from).unwrap_or(err)),
            },
        };

        response.error_for_status()?;
        Ok(response)
    }

    /// Send `request`, classify the response, then hand the body to `target`.
    pub async fn execute<T>(
        &self,
        ctx: &Context,
        request: ApiRequest,
        target: &mut T,
    ) -> Result<Response>
    where
        T: ResponseTarget + ?Sized,
    {
        let response = self.bare_do(ctx, request).await?;
        target.fill(response.body())?;
        Ok(response)
    }

    /// Send `request` and decode the body into a fresh `T`. An empty body
    /// yields `T::default()`.
    pub async fn send_json<T>(&self, ctx: &Context, request: ApiRequest) -> Result<(T, Response)>
    where
        T: DeserializeOwned + Default,
    {
        let mut value = T::default();
        let response = self.execute(ctx, request, &mut JsonBody(&mut value)).await?;
        Ok((value, response))
    }

    pub async fn get<T: DeserializeOwned + Default>(
        &self,
        ctx: &Context,
        path: &str,
    ) -> Result<(T, Response)> {
        let request = self.new_request(Method::GET, path, None::<&()>)?;
        self.send_json(ctx, request).await
    }

    pub async fn post<T: DeserializeOwned + Default, B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<(T, Response)> {
        let request = self.new_request(Method::POST, path, Some(body))?;
        self.send_json(ctx, request).await
    }

    pub async fn put<T: DeserializeOwned + Default, B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<(T, Response)> {
        let request = self.new_request(Method::PUT, path, Some(body))?;
        self.send_json(ctx, request).await
    }

    pub async fn delete(&self, ctx: &Context, path: &str) -> Result<Response> {
        let request = self.new_request(Method::DELETE, path, None::<&()>)?;
        self.execute(ctx, request, &mut ()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = Client::new("token").unwrap();
        assert_eq!(client.base_url().as_str(), "https://sentry.io/api/");
    }

    #[test]
    fn test_on_premise_base_url_normalization() {
        for base in [
            "https://example.com",
            "https://example.com/",
            "https://example.com/api",
            "https://example.com/api/",
        ] {
            let client = Client::builder().on_premise(base).build().unwrap();
            assert_eq!(client.base_url().as_str(), "https://example.com/api/", "{base}");
        }
    }

    #[test]
    fn test_strict_base_url_requires_trailing_slash() {
        let err = Client::builder()
            .base_url("https://example.com/api")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingTrailingSlash(_)));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_new_request_uses_configured_user_agent() {
        let client = Client::builder().user_agent("custom/1.0").build().unwrap();
        let req = client
            .new_request(Method::GET, "0/organizations/", None::<&()>)
            .unwrap();
        assert_eq!(req.headers.get("user-agent").unwrap(), "custom/1.0");
        assert!(req.headers.get("authorization").is_none());
    }
}
