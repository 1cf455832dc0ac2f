use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::HeaderValue;

/// Sakura Cloud API key pair.
///
/// `Debug` prints neither half of the pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey {
    token: String,
    secret: String,
}

impl AccessKey {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// `Basic base64(token:secret)`, flagged sensitive so reqwest and hyper
    /// keep it out of their debug output.
    pub fn authorization_header(&self) -> HeaderValue {
        let encoded = BASE64.encode(format!("{}:{}", self.token, self.secret));
        // base64 output is plain ASCII, always a valid header value
        let mut value = HeaderValue::try_from(format!("Basic {encoded}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        value.set_sensitive(true);
        value
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("token", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}
