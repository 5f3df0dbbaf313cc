//! Session identifier type and generators.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Random bytes per identifier (192 bits of entropy).
pub const ID_BYTES: usize = 24;

/// Length of the encoded identifier.
pub const ID_LEN: usize = ID_BYTES / 3 * 4;

/// Opaque identifier of a server-side session.
///
/// Identifiers are [`ID_BYTES`] random bytes encoded as unpadded URL-safe
/// base64, giving a fixed [`ID_LEN`]-character string that is safe to put in
/// a cookie value without quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Encode raw random bytes into an identifier.
    pub fn from_bytes(bytes: &[u8; ID_BYTES]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parse an identifier presented by a client.
    ///
    /// Returns `None` for anything that could not have been issued by a
    /// generator: wrong length or characters outside the base64url alphabet.
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(value.to_string()))
    }

    /// Borrow the encoded identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh session identifiers.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier. Uniqueness against live sessions is
    /// enforced by the store, not the generator.
    fn generate(&self) -> SessionId;
}

/// Generator backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> SessionId {
        let mut bytes = [0u8; ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        SessionId::from_bytes(&bytes)
    }
}

/// Deterministic generator for tests.
///
/// Two generators built from the same seed yield the same sequence.
#[derive(Debug)]
pub struct SeededIdGenerator {
    rng: Mutex<StdRng>,
}

impl SeededIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdGenerator for SeededIdGenerator {
    fn generate(&self) -> SessionId {
        let mut bytes = [0u8; ID_BYTES];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        SessionId::from_bytes(&bytes)
    }
}
