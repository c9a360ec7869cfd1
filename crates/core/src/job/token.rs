//! Opaque job identifiers.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of random bytes in a token (256 bits).
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("job token must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("job token must be lowercase hex")]
    InvalidCharacters,
}

/// Random job identifier.
///
/// Used both as the progress topic key and as the job's directory name, so
/// parsing only accepts the exact shape [`JobToken::generate`] produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobToken(String);

impl JobToken {
    /// Generates a fresh token from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Validates a client-supplied token.
    pub fn parse(value: &str) -> Result<Self, TokenError> {
        let expected = TOKEN_BYTES * 2;
        if value.len() != expected {
            return Err(TokenError::InvalidLength {
                expected,
                actual: value.len(),
            });
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(TokenError::InvalidCharacters);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobToken> for String {
    fn from(token: JobToken) -> Self {
        token.0
    }
}

impl AsRef<std::path::Path> for JobToken {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
