//! Destinations for a response body.
//!
//! [`Client::execute`](crate::Client::execute) hands the buffered body to a
//! [`ResponseTarget`]: `()` discards it, [`RawBody`] copies the bytes into a
//! writer, [`JsonBody`] decodes into a value.

use std::io::Write;

use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{ApiError, Result};

pub trait ResponseTarget {
    fn fill(&mut self, body: &[u8]) -> Result<()>;
}

impl ResponseTarget for () {
    fn fill(&mut self, _body: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Decode the body as JSON into the wrapped value. An empty body leaves the
/// value untouched.
pub struct JsonBody<'a, T>(pub &'a mut T);

impl<T: DeserializeOwned> ResponseTarget for JsonBody<'_, T> {
    fn fill(&mut self, body: &[u8]) -> Result<()> {
        if let Some(value) = decode_json(body)? {
            *self.0 = value;
        }
        Ok(())
    }
}

/// Copy the body verbatim, for binary or opaque payloads.
pub struct RawBody<'a, W>(pub &'a mut W);

impl<W: Write> ResponseTarget for RawBody<'_, W> {
    fn fill(&mut self, body: &[u8]) -> Result<()> {
        self.0.write_all(body)?;
        Ok(())
    }
}

/// `None` for a body with nothing but whitespace in it.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|err| {
        error!("Failed to parse JSON response: {}", err);
        ApiError::Decode(err)
    })
}
