//! Anti-forgery token lifecycle.
//!
//! One token per session, minted lazily on first use and stable until the
//! session itself is invalidated. Verification of submitted tokens happens in
//! the mutating request handlers, not here.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use storegate_core::Session;

/// Token length in raw bytes (hex-encoded to twice this many characters).
pub const TOKEN_BYTES: usize = 32;

/// A session anti-forgery token (hex-encoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrfError {
    /// Both secure random sources failed. There is no acceptable weaker
    /// fallback: no token means no safe mutation path, so the request fails.
    #[error("no secure randomness available: {0}")]
    EntropyUnavailable(String),
}

/// Return the session's token, minting one if it does not exist yet.
pub fn get_or_create_token(session: &mut Session) -> Result<CsrfToken, CsrfError> {
    if let Some(existing) = session.csrf_token() {
        return Ok(CsrfToken(existing.to_owned()));
    }

    let token = hex::encode(random_bytes()?);
    session.set_csrf_token(token.clone());
    Ok(CsrfToken(token))
}

/// Fill from the OS entropy source; if that fails, fall back to the thread
/// CSPRNG (reseeded ChaCha). Both are cryptographically secure — a
/// non-crypto RNG is never an acceptable tier.
fn random_bytes() -> Result<[u8; TOKEN_BYTES], CsrfError> {
    let mut buf = [0u8; TOKEN_BYTES];

    if OsRng.try_fill_bytes(&mut buf).is_ok() {
        return Ok(buf);
    }

    rand::thread_rng()
        .try_fill_bytes(&mut buf)
        .map_err(|e| CsrfError::EntropyUnavailable(e.to_string()))?;
    Ok(buf)
}
