//! # Identity Verification
//!
//! Maps a bearer token to a verified user id.
//!
//! Account credentials live with an external identity provider; the server
//! only needs the `token -> user id` mapping. `TokenTable` reads that mapping
//! from a TOML file:
//!
//! ```toml
//! [[tokens]]
//! token = "s3cr3t-token-for-ana"
//! user = "ana"
//! ```

use audioly_core::{SocialError, UserId};
use serde::Deserialize;
use std::path::Path;
use subtle::ConstantTimeEq;

/// Verifies a bearer token and returns the identity it belongs to.
pub trait IdentityVerifier: Send + Sync {
    /// Returns `SocialError::Unauthorized` for unknown tokens.
    fn verify(&self, token: &str) -> Result<UserId, SocialError>;
}

#[derive(Debug, Clone, Deserialize)]
struct TokenEntry {
    token: String,
    user: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenFile {
    #[serde(default)]
    tokens: Vec<TokenEntry>,
}

/// Static token table.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    entries: Vec<(Vec<u8>, UserId)>,
}

/// Compare two byte strings in constant time with respect to their contents.
///
/// Both sides are padded to the same length so the comparison always runs
/// over the same number of bytes.
fn tokens_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

impl TokenTable {
    /// Build a table from `(token, user)` pairs. Empty tokens are ignored.
    pub fn from_pairs<I, T, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(token, user)| (token.into(), user.into()))
            .filter(|(token, _)| !token.is_empty())
            .map(|(token, user)| (token.into_bytes(), UserId::new(user)))
            .collect();
        Self { entries }
    }

    /// Parse a TOML token table.
    pub fn from_toml(text: &str) -> Result<Self, SocialError> {
        let file: TokenFile = toml::from_str(text)
            .map_err(|e| SocialError::InvalidInput(format!("tokens file: {}", e)))?;
        Ok(Self::from_pairs(
            file.tokens.into_iter().map(|entry| (entry.token, entry.user)),
        ))
    }

    /// Read a TOML token table from disk.
    pub fn from_file(path: &Path) -> Result<Self, SocialError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SocialError::InvalidInput(format!(
                "cannot read tokens file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityVerifier for TokenTable {
    fn verify(&self, token: &str) -> Result<UserId, SocialError> {
        let provided = token.as_bytes();
        // Every entry is compared so the time taken does not depend on which
        // entry (if any) matches.
        let mut found = None;
        for (expected, user) in &self.entries {
            if tokens_match(provided, expected) && found.is_none() {
                found = Some(user.clone());
            }
        }
        found.ok_or(SocialError::Unauthorized)
    }
}
