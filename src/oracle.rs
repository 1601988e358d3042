//! Hash oracles
//!
//! An oracle is a pure digest function. Workers call it concurrently from
//! their own threads, so implementations must be stateless (or at least free
//! of shared mutable state).

use crate::error::{Error, Result};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Fixed-width upper-case hexadecimal digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a user-supplied target, checking it against the oracle's width
    ///
    /// Case is normalized so `c22b…` and `C22B…` name the same target.
    pub fn parse(hex: &str, width: usize) -> Result<Self> {
        let hex = hex.trim();
        if hex.len() != width {
            return Err(Error::InvalidFingerprint {
                expected: width,
                actual: hex.len(),
            });
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfig(format!(
                "target '{hex}' contains non-hexadecimal characters"
            )));
        }
        Ok(Self(hex.to_ascii_uppercase()))
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    /// Hex digits of the fingerprint
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pure, deterministic digest function
pub trait HashOracle: Send + Sync {
    /// Digest a candidate password
    fn digest(&self, candidate: &str) -> Fingerprint;

    /// Number of hex digits in every fingerprint this oracle produces
    fn width(&self) -> usize;
}

/// SHA-1 oracle (40 hex digits)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Oracle;

impl HashOracle for Sha1Oracle {
    fn digest(&self, candidate: &str) -> Fingerprint {
        Fingerprint::from_bytes(&Sha1::digest(candidate.as_bytes()))
    }

    fn width(&self) -> usize {
        40
    }
}

/// SHA-256 oracle (64 hex digits)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Oracle;

impl HashOracle for Sha256Oracle {
    fn digest(&self, candidate: &str) -> Fingerprint {
        Fingerprint::from_bytes(&Sha256::digest(candidate.as_bytes()))
    }

    fn width(&self) -> usize {
        64
    }
}

/// Digest scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// SHA-1
    #[default]
    Sha1,
    /// SHA-256
    Sha256,
}

impl Algorithm {
    /// Shared oracle instance for this scheme
    pub fn oracle(self) -> Arc<dyn HashOracle> {
        match self {
            Algorithm::Sha1 => Arc::new(Sha1Oracle),
            Algorithm::Sha256 => Arc::new(Sha256Oracle),
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Algorithm::Sha1),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            other => Err(Error::InvalidConfig(format!("unknown algorithm '{other}'"))),
        }
    }
}
