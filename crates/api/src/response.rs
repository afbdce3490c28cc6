use std::collections::HashMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::codec::ErrorPayload;
use crate::error::{ApiError, ErrorResponse, RateLimitError, Result};
use crate::ratelimit::{budget_exhausted, Rate};

/// A Sentry API response with pagination and rate limit state decoded.
///
/// The body is fully buffered, so it can be read any number of times, even
/// after classification turned the response into an error.
#[derive(Debug, Clone)]
pub struct Response {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Set when another page exists. Feed it back through
    /// [`ListCursorParams`](crate::ListCursorParams) to fetch it.
    pub cursor: Option<String>,
    pub rate: Rate,
    body: Bytes,
}

impl Response {
    pub fn new(method: Method, url: Url, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let cursor = next_cursor(&headers);
        if let Some(cursor) = &cursor {
            debug!(%url, cursor, "Found next page cursor");
        }
        let rate = Rate::from_headers(&headers);

        Self {
            method,
            url,
            status,
            headers,
            cursor,
            rate,
            body,
        }
    }

    pub(crate) async fn from_reqwest(method: Method, response: reqwest::Response) -> Result<Self> {
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(method, url, status, headers, body))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn has_next_page(&self) -> bool {
        self.cursor.is_some()
    }

    /// Classify the response: `Ok` for 2xx, otherwise a structured or
    /// rate-limit error carrying the response metadata.
    pub fn error_for_status(&self) -> Result<()> {
        if self.status.is_success() {
            return Ok(());
        }

        let detail = match ErrorPayload::from_slice(&self.body).detail() {
            Some(detail) => detail.to_string(),
            None => String::from_utf8_lossy(&self.body).trim().to_string(),
        };

        let response = ErrorResponse {
            method: self.method.clone(),
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            rate: self.rate,
            body: self.body.clone(),
            detail,
        };

        if self.status == StatusCode::TOO_MANY_REQUESTS && budget_exhausted(&self.headers) {
            return Err(ApiError::RateLimited(Box::new(RateLimitError {
                rate: self.rate,
                response,
            })));
        }

        Err(ApiError::Api(Box::new(response)))
    }
}

/// One entry of an RFC 8288 `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub uri: String,
    pub rel: String,
    pub extra: HashMap<String, String>,
}

/// Parse every `Link` header value into its entries.
pub fn parse_links(headers: &HeaderMap) -> Vec<Link> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_link_header)
        .collect()
}

pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let params = &after[end + 1..];
        let cut = find_unquoted(params, ',').unwrap_or(params.len());
        let (params, remainder) = params.split_at(cut);

        let mut link = Link {
            uri: after[..end].trim().to_string(),
            ..Default::default()
        };
        for param in split_unquoted(params, ';') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"').to_string();
            if key == "rel" {
                link.rel = value;
            } else {
                link.extra.insert(key, value);
            }
        }

        links.push(link);
        rest = remainder;
    }

    links
}

fn find_unquoted(value: &str, separator: char) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ch if ch == separator && !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

fn split_unquoted(mut value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    while let Some(idx) = find_unquoted(value, separator) {
        parts.push(&value[..idx]);
        value = &value[idx + separator.len_utf8()..];
    }
    parts.push(value);
    parts
}

/// The cursor of the `next` link, but only when the server says it has
/// results.
fn next_cursor(headers: &HeaderMap) -> Option<String> {
    parse_links(headers)
        .into_iter()
        .find(|link| link.rel == "next")
        .filter(|link| link.extra.get("results").map(String::as_str) == Some("true"))
        .and_then(|mut link| link.extra.remove("cursor"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{HEADER_RATE_CONCURRENT_REMAINING, HEADER_RATE_REMAINING};
    use reqwest::header::{HeaderName, HeaderValue};

    const MEMBERS_URL: &str = "https://sentry.io/api/0/organizations/acme/members/";

    fn response(status: u16, headers: &[(&str, &str)], body: &'static [u8]) -> Response {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        Response::new(
            Method::GET,
            Url::parse(MEMBERS_URL).unwrap(),
            StatusCode::from_u16(status).unwrap(),
            map,
            Bytes::from_static(body),
        )
    }

    fn link_header(next_results: &str) -> String {
        format!(
            "<{MEMBERS_URL}?&cursor=100:-1:1>; rel=\"previous\"; results=\"false\"; cursor=\"100:-1:1\", \
             <{MEMBERS_URL}?&cursor=100:1:0>; rel=\"next\"; results=\"{next_results}\"; cursor=\"100:1:0\""
        )
    }

    #[test]
    fn test_cursor_from_next_link_with_results() {
        let resp = response(200, &[("Link", link_header("true").as_str())], b"[]");
        assert_eq!(resp.cursor.as_deref(), Some("100:1:0"));
        assert!(resp.has_next_page());
    }

    #[test]
    fn test_no_cursor_when_next_has_no_results() {
        let resp = response(200, &[("Link", link_header("false").as_str())], b"[]");
        assert_eq!(resp.cursor, None);
    }

    #[test]
    fn test_no_cursor_without_link_header() {
        let resp = response(200, &[], b"[]");
        assert_eq!(resp.cursor, None);
    }

    #[test]
    fn test_parse_link_header_entries() {
        let links = parse_link_header(&link_header("true"));
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].rel, "previous");
        assert_eq!(links[0].uri, format!("{MEMBERS_URL}?&cursor=100:-1:1"));
        assert_eq!(links[1].extra.get("cursor").unwrap(), "100:1:0");
        assert_eq!(links[1].extra.get("results").unwrap(), "true");
    }

    #[test]
    fn test_quoted_separators_stay_inside_attribute_values() {
        let links = parse_link_header(
            "<https://sentry.io/a>; rel=\"next\"; results=\"true\"; cursor=\"0;1,2\", \
             <https://sentry.io/b>; rel=\"previous\"",
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].extra.get("cursor").unwrap(), "0;1,2");
        assert_eq!(links[0].extra.get("results").unwrap(), "true");
        assert_eq!(links[1].rel, "previous");
    }

    #[test]
    fn test_success_statuses_pass_classification() {
        assert!(response(200, &[], b"").error_for_status().is_ok());
        assert!(response(204, &[], b"").error_for_status().is_ok());
        assert!(response(299, &[], b"").error_for_status().is_ok());
    }

    #[test]
    fn test_detail_is_extracted_from_error_body() {
        let err = response(404, &[], br#"{"detail":"not found"}"#)
            .error_for_status()
            .unwrap_err();

        let resp = err.response().unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.detail, "not found");
        assert!(err.to_string().contains("not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_raw_body_is_detail_when_not_json() {
        let err = response(502, &[], b"  upstream timed out \n")
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.response().unwrap().detail, "upstream timed out");
    }

    #[test]
    fn test_non_detail_json_body_is_kept_verbatim() {
        let body = br#"{"slug":["taken"],"name":["required"]}"#;
        let err = response(400, &[], body).error_for_status().unwrap_err();
        assert_eq!(
            err.response().unwrap().detail,
            r#"{"slug":["taken"],"name":["required"]}"#
        );

        let err = response(500, &[], b" \"oops\"\n").error_for_status().unwrap_err();
        assert_eq!(err.response().unwrap().detail, r#""oops""#);
    }

    #[test]
    fn test_rate_limit_error_when_budget_exhausted() {
        let err = response(429, &[(HEADER_RATE_REMAINING, "0")], br#"{"detail":"slow down"}"#)
            .error_for_status()
            .unwrap_err();
        assert!(err.is_rate_limited());

        let err = response(
            429,
            &[(HEADER_RATE_CONCURRENT_REMAINING, "0")],
            br#"{"detail":"slow down"}"#,
        )
        .error_for_status()
        .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_429_without_exhausted_counters_is_generic() {
        let err = response(429, &[(HEADER_RATE_REMAINING, "3")], b"busy")
            .error_for_status()
            .unwrap_err();
        assert!(!err.is_rate_limited());
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_body_survives_classification() {
        let resp = response(400, &[], br#"{"name":["required"]}"#);
        let _ = resp.error_for_status();
        assert_eq!(resp.body().as_ref(), br#"{"name":["required"]}"#);
    }
}
