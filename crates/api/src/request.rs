use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use url::{form_urlencoded, Url};

use crate::error::{ApiError, Result};

/// A fully resolved request, ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub(crate) fn into_reqwest(self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method, self.url);
        *request.headers_mut() = self.headers;
        if let Some(body) = self.body {
            *request.body_mut() = Some(body.into());
        }
        request
    }
}

pub(crate) fn ensure_trailing_slash(base_url: &Url) -> Result<()> {
    if base_url.path().ends_with('/') {
        Ok(())
    } else {
        Err(ApiError::MissingTrailingSlash(base_url.to_string()))
    }
}

/// Resolve `path` against `base_url` and encode `body` as JSON.
///
/// `path` follows URL reference resolution: `0/projects/` lands under the
/// base path, `/0/projects/` replaces it.
pub fn build_request<B: Serialize + ?Sized>(
    base_url: &Url,
    user_agent: &str,
    method: Method,
    path: &str,
    body: Option<&B>,
) -> Result<ApiRequest> {
    ensure_trailing_slash(base_url)?;
    let url = base_url.join(path)?;

    let mut headers = HeaderMap::new();
    let body = match body {
        Some(body) => {
            // serde_json never HTML-escapes, so `<`, `>` and `&` in search
            // syntax reach the server untouched.
            let encoded = serde_json::to_vec(body).map_err(ApiError::Encode)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Some(Bytes::from(encoded))
        }
        None => None,
    };

    if !user_agent.is_empty() {
        let value = HeaderValue::from_str(user_agent)
            .map_err(|_| ApiError::InvalidHeader(user_agent.to_string()))?;
        headers.insert(USER_AGENT, value);
    }

    Ok(ApiRequest {
        method,
        url,
        headers,
        body,
    })
}

/// Types that render themselves as URL query parameters.
pub trait QueryParams {
    fn append_to(&self, query: &mut form_urlencoded::Serializer<'_, String>);
}

/// Cursor parameter shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCursorParams {
    /// A cursor, as given in the Link header. If set, the listing continues
    /// from it.
    pub cursor: Option<String>,
}

impl ListCursorParams {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
        }
    }
}

impl QueryParams for ListCursorParams {
    fn append_to(&self, query: &mut form_urlencoded::Serializer<'_, String>) {
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            query.append_pair("cursor", cursor);
        }
    }
}

/// Replace the query string of `path` with `params`. `None` leaves the path
/// untouched.
pub fn add_query<P: QueryParams + ?Sized>(path: &str, params: Option<&P>) -> String {
    let Some(params) = params else {
        return path.to_string();
    };

    let base = path.split_once('?').map_or(path, |(base, _)| base);
    let mut query = form_urlencoded::Serializer::new(String::new());
    params.append_to(&mut query);
    let query = query.finish();

    if query.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{query}")
    }
}
