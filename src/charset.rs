//! Candidate alphabets

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

const NUMERIC: &str = "0123456789";
const ALPHA: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Character class selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// Decimal digits
    Numeric,
    /// Lower then upper case ASCII letters
    Alpha,
    /// Letters followed by digits
    #[default]
    Alphanumeric,
}

impl Charset {
    /// Resolve a selector, falling back to alphanumeric for anything unknown
    pub fn from_selector(selector: Option<&str>) -> Self {
        selector
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Build the alphabet for this class
    pub fn alphabet(self) -> Alphabet {
        let chars = match self {
            Charset::Numeric => NUMERIC,
            Charset::Alpha => ALPHA,
            Charset::Alphanumeric => ALPHANUMERIC,
        };
        Alphabet {
            symbols: chars.chars().collect(),
        }
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(Charset::Numeric),
            "alpha" => Ok(Charset::Alpha),
            "alphanumeric" | "alphanum" => Ok(Charset::Alphanumeric),
            other => Err(Error::InvalidConfig(format!("unknown charset '{other}'"))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Charset::Numeric => "numeric",
            Charset::Alpha => "alpha",
            Charset::Alphanumeric => "alphanumeric",
        };
        f.write_str(name)
    }
}

/// Ordered set of distinct characters a candidate may use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from an explicit character list
    ///
    /// Order is preserved and becomes the enumeration order. Duplicates and
    /// empty alphabets are rejected.
    pub fn new(chars: &str) -> Result<Self> {
        let mut symbols: Vec<char> = Vec::with_capacity(chars.len());
        for c in chars.chars() {
            if symbols.contains(&c) {
                return Err(Error::InvalidConfig(format!(
                    "alphabet contains '{c}' more than once"
                )));
            }
            symbols.push(c);
        }
        if symbols.is_empty() {
            return Err(Error::InvalidConfig("alphabet is empty".to_string()));
        }
        Ok(Self { symbols })
    }

    /// Number of characters (A)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always false for a constructed alphabet
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Characters in enumeration order
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}
