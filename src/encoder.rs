//! Key encoder
//!
//! Re-encodes the debug representation of a key column into the fixed-width
//! hex the Masstree loader expects. Integers are masked to their width and
//! written most significant byte first; varchar bytes are copied as-is.

use crate::trace::{KeyField, KeyType};

// Varchar representation: [<len>]"<bytes>"
const VARCHAR_LEN_OPEN: u8 = b'[';
const VARCHAR_LEN_CLOSE: u8 = b']';
const VARCHAR_QUOTE: u8 = b'"';
const MAX_VARCHAR_LEN_DIGITS: usize = 2;

/// Reason a key column could not be encoded
///
/// `Display` renders the marker written into the output in place of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Column type the loader has no encoding for
    UnsupportedType { name: String },
    /// Key column with an invalid schema type (informational)
    InvalidType,
    /// Varchar length field wider than two digits
    VarcharTooLong,
    /// Representation does not parse for its declared type
    Malformed { name: String },
}

impl KeyError {
    /// Notes are informational, everything else is an error marker
    pub fn is_note(&self) -> bool {
        matches!(self, KeyError::InvalidType)
    }
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::UnsupportedType { name } => write!(f, "ERROR: UNKNOWN TYPE {}", name),
            KeyError::InvalidType => write!(f, "NOTE: TYPE INVALID"),
            KeyError::VarcharTooLong => write!(f, "ERROR: varchar TOO LONG"),
            KeyError::Malformed { name } => write!(f, "ERROR: MALFORMED KEY {}", name),
        }
    }
}

impl std::error::Error for KeyError {}

/// Encodes key columns to lowercase hex
pub struct KeyEncoder {
    // Stateless; every column is encoded on its own
}

impl KeyEncoder {
    /// Create a new key encoder
    pub fn new() -> Self {
        Self {}
    }

    /// Encode one key column
    pub fn encode(&self, field: &KeyField<'_>) -> Result<String, KeyError> {
        match &field.key_type {
            KeyType::TinyInt => {
                let value = Self::parse_integer(field)?;
                Ok(hex::encode([value as u8]))
            }
            KeyType::SmallInt => {
                let value = Self::parse_integer(field)?;
                Ok(hex::encode((value as u16).to_be_bytes()))
            }
            KeyType::Integer => {
                let value = Self::parse_integer(field)?;
                Ok(hex::encode((value as u32).to_be_bytes()))
            }
            KeyType::Varchar => Self::encode_varchar(field.repr),
            KeyType::Invalid => Err(KeyError::InvalidType),
            other => Err(KeyError::UnsupportedType {
                name: other.name().to_string(),
            }),
        }
    }

    /// Parse a signed decimal integer; narrowing casts do the byte masking
    fn parse_integer(field: &KeyField<'_>) -> Result<i64, KeyError> {
        std::str::from_utf8(field.repr)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| KeyError::Malformed {
                name: field.key_type.name().to_string(),
            })
    }

    /// Encode `[<len>]"<bytes>"...` as the hex of exactly `len` bytes
    fn encode_varchar(repr: &[u8]) -> Result<String, KeyError> {
        let malformed = || KeyError::Malformed {
            name: KeyType::Varchar.name().to_string(),
        };

        let body = repr.strip_prefix(&[VARCHAR_LEN_OPEN]).ok_or_else(malformed)?;
        let close = body
            .iter()
            .position(|&b| b == VARCHAR_LEN_CLOSE)
            .ok_or_else(malformed)?;

        let digits = &body[..close];
        if digits.len() > MAX_VARCHAR_LEN_DIGITS {
            return Err(KeyError::VarcharTooLong);
        }
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(malformed());
        }
        let len = digits
            .iter()
            .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));

        let rest = &body[close + 1..];
        let rest = rest.strip_prefix(&[VARCHAR_QUOTE]).unwrap_or(rest);
        // A value containing a newline is cut short by the line split
        let bytes = rest.get(..len).ok_or_else(malformed)?;

        Ok(hex::encode(bytes))
    }
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new()
    }
}
