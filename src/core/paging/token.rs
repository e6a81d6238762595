//! Continuation token decoding
//!
//! The store hands back its next-page cursor in a wrapped, encoded form. A
//! [`TokenDecoder`] turns that raw value into the [`ContinuationToken`] the
//! next query embeds. Decoding lives behind a trait so the transform can be
//! replaced without touching the pagination loop, and a decode failure is a
//! hard error rather than a silent pass-through.

use super::page::ContinuationToken;
use percent_encoding::percent_decode_str;

/// Turns a store-supplied raw cursor into a reusable token
pub trait TokenDecoder: Send + Sync {
    /// Decode a raw cursor
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the raw value is malformed.
    fn decode(&self, raw: &str) -> Result<ContinuationToken, String>;
}

/// Uses the raw value as the token unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl TokenDecoder for PassthroughDecoder {
    fn decode(&self, raw: &str) -> Result<ContinuationToken, String> {
        if raw.is_empty() {
            return Err("continuation token is empty".to_string());
        }
        Ok(ContinuationToken::new(raw))
    }
}

/// Decoder for paging-cookie annotations
///
/// The annotation is a small XML element whose `pagingcookie` attribute holds
/// the real cursor, percent-encoded twice:
///
/// ```text
/// <cookie pagenumber="2" pagingcookie="%253ccookie%2520page%253d%25221%2522%253e..." istracking="False" />
/// ```
///
/// Decoding extracts the attribute value and applies two strict UTF-8
/// percent-decodes. Anything else (missing attribute, empty value, invalid
/// UTF-8) is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PagingCookieDecoder;

const COOKIE_ATTRIBUTE: &str = "pagingcookie=\"";

impl PagingCookieDecoder {
    fn extract_attribute(raw: &str) -> Result<&str, String> {
        let start = raw
            .find(COOKIE_ATTRIBUTE)
            .map(|i| i + COOKIE_ATTRIBUTE.len())
            .ok_or_else(|| "paging cookie annotation has no pagingcookie attribute".to_string())?;

        let len = raw[start..]
            .find('"')
            .ok_or_else(|| "pagingcookie attribute is not terminated".to_string())?;

        let value = &raw[start..start + len];
        if value.is_empty() {
            return Err("pagingcookie attribute is empty".to_string());
        }
        Ok(value)
    }

    fn percent_decode(input: &str) -> Result<String, String> {
        percent_decode_str(input)
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|e| format!("paging cookie is not valid UTF-8 after decoding: {e}"))
    }
}

impl TokenDecoder for PagingCookieDecoder {
    fn decode(&self, raw: &str) -> Result<ContinuationToken, String> {
        let encoded = Self::extract_attribute(raw)?;
        let once = Self::percent_decode(encoded)?;
        let twice = Self::percent_decode(&once)?;

        if twice.trim().is_empty() {
            return Err("paging cookie decoded to an empty value".to_string());
        }

        Ok(ContinuationToken::new(twice))
    }
}
