//! Request path normalization.

use std::fmt;

use percent_encoding::percent_decode_str;

/// A percent-decoded request path. Used only for rule matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath(String);

impl RequestPath {
    /// Decode the path component of a URI. Invalid UTF-8 is replaced lossily.
    pub fn from_uri_path(raw: &str) -> Self {
        Self(percent_decode_str(raw).decode_utf8_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
