//! Opaque markers for resuming a read where a previous one stopped.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wire::Item;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Invalid token payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The backend's last evaluated key, wrapped so callers can hand it back
/// unchanged to resume a listing or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(Item);

impl ContinuationToken {
    pub fn new(key: Item) -> Self {
        Self(key)
    }

    pub fn as_item(&self) -> &Item {
        &self.0
    }

    pub fn into_item(self) -> Item {
        self.0
    }

    /// Encodes the token as URL-safe text, suitable for query strings.
    pub fn encode(&self) -> Result<String, TokenError> {
        let json = serde_json::to_vec(&self.0)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Parses text produced by [`ContinuationToken::encode`].
    pub fn decode(text: &str) -> Result<Self, TokenError> {
        let json = URL_SAFE_NO_PAD.decode(text)?;
        Ok(Self(serde_json::from_slice(&json)?))
    }
}

impl From<Item> for ContinuationToken {
    fn from(key: Item) -> Self {
        Self(key)
    }
}
