//! Trace line model
//!
//! The index wrapper writes one fragment per line, `<head>\t<payload>`.
//! Lines are kept as raw bytes: varchar keys are copied verbatim and need
//! not be valid UTF-8.

use std::borrow::Cow;

// Tag prefixes (first 3 bytes of a line)
pub const TAG_LEN: usize = 3;
pub const CMD_TAG: &[u8] = b"CMD";
pub const KEY_TAG: &[u8] = b"KEY";
pub const VALUE_TAG: &[u8] = b"VAL";
pub const ARG_TAG: &[u8] = b"ARG";
pub const TABLE_TAG: &[u8] = b"Tab";

/// Separator between the key type name and its debug representation
pub const TYPE_SEPARATOR: &[u8] = b"::";
/// Prefix the producer puts in front of tuple addresses
pub const ADDRESS_PREFIX: &[u8] = b"0x";

/// Role of a trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `CMD` - operation verb
    Command,
    /// `KEY` - typed key column
    Key,
    /// `VALUE` - tuple address
    Value,
    /// `ARG` - argument label (unsupported)
    Argument,
    /// `TableIndexWrapper` - start of an index session
    Table,
    /// Anything else
    Unknown,
}

impl Tag {
    /// Classify a line by its first 3 bytes
    pub fn classify(line: &[u8]) -> Self {
        match line.get(..TAG_LEN) {
            Some(CMD_TAG) => Tag::Command,
            Some(KEY_TAG) => Tag::Key,
            Some(VALUE_TAG) => Tag::Value,
            Some(ARG_TAG) => Tag::Argument,
            Some(TABLE_TAG) => Tag::Table,
            _ => Tag::Unknown,
        }
    }
}

/// A borrowed, classified trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine<'a> {
    pub tag: Tag,
    /// Everything after the first tab (empty if the line has none)
    pub payload: &'a [u8],
}

impl<'a> TraceLine<'a> {
    pub fn parse(line: &'a [u8]) -> Self {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = match line.iter().position(|&b| b == b'\t') {
            Some(tab) => &line[tab + 1..],
            None => &[][..],
        };

        Self {
            tag: Tag::classify(line),
            payload,
        }
    }
}

/// Operation verb of a `CMD` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    AddEntry,
    DeleteEntry,
    MoveToKey,
    MoveToKeyOrGreater,
    MoveToGreaterThanKey,
    NextValue,
    NextValueAtKey,
    /// Any verb without a record form (`replaceEntry`, `exists`, ...)
    Other(Cow<'a, str>),
}

impl<'a> Command<'a> {
    pub fn parse(payload: &'a [u8]) -> Self {
        match payload {
            b"addEntry" => Command::AddEntry,
            b"deleteEntry" => Command::DeleteEntry,
            b"moveToKey" => Command::MoveToKey,
            b"moveToKeyOrGreater" => Command::MoveToKeyOrGreater,
            b"moveToGreaterThanKey" => Command::MoveToGreaterThanKey,
            b"nextValue" => Command::NextValue,
            b"nextValueAtKey" => Command::NextValueAtKey,
            other => Command::Other(String::from_utf8_lossy(other)),
        }
    }
}

/// Declared column type of a `KEY` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType<'a> {
    TinyInt,
    SmallInt,
    Integer,
    Varchar,
    Varbinary,
    BigInt,
    Double,
    Timestamp,
    Decimal,
    Boolean,
    Address,
    Null,
    /// Key column whose schema type is invalid (`KEY\tINVALID`)
    Invalid,
    Unknown(Cow<'a, str>),
}

impl<'a> KeyType<'a> {
    pub fn parse(name: &'a [u8]) -> Self {
        match name {
            b"tinyint" => KeyType::TinyInt,
            b"smallint" => KeyType::SmallInt,
            b"int" | b"integer" => KeyType::Integer,
            b"varchar" => KeyType::Varchar,
            b"varbinary" => KeyType::Varbinary,
            b"bigint" => KeyType::BigInt,
            b"double" => KeyType::Double,
            b"timestamp" => KeyType::Timestamp,
            b"decimal" => KeyType::Decimal,
            b"boolean" => KeyType::Boolean,
            b"address" => KeyType::Address,
            b"NULL" => KeyType::Null,
            b"INVALID" => KeyType::Invalid,
            other => KeyType::Unknown(String::from_utf8_lossy(other)),
        }
    }

    /// Type name as written in markers
    pub fn name(&self) -> &str {
        match self {
            KeyType::TinyInt => "tinyint",
            KeyType::SmallInt => "smallint",
            KeyType::Integer => "integer",
            KeyType::Varchar => "varchar",
            KeyType::Varbinary => "varbinary",
            KeyType::BigInt => "bigint",
            KeyType::Double => "double",
            KeyType::Timestamp => "timestamp",
            KeyType::Decimal => "decimal",
            KeyType::Boolean => "boolean",
            KeyType::Address => "address",
            KeyType::Null => "NULL",
            KeyType::Invalid => "INVALID",
            KeyType::Unknown(name) => name.as_ref(),
        }
    }
}

/// Payload of a `KEY` line: `<typename>::<repr>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField<'a> {
    pub key_type: KeyType<'a>,
    pub repr: &'a [u8],
}

impl<'a> KeyField<'a> {
    pub fn parse(payload: &'a [u8]) -> Self {
        let (name, repr) = match find_subslice(payload, TYPE_SEPARATOR) {
            Some(pos) => (&payload[..pos], &payload[pos + TYPE_SEPARATOR.len()..]),
            None => (payload, &payload[payload.len()..]),
        };

        Self {
            key_type: KeyType::parse(name),
            repr,
        }
    }
}

/// Value field text for a `VALUE` payload (address without its `0x`)
pub fn value_text(payload: &[u8]) -> &[u8] {
    payload.strip_prefix(ADDRESS_PREFIX).unwrap_or(payload)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_prefix() {
        assert_eq!(Tag::classify(b"CMD\taddEntry"), Tag::Command);
        assert_eq!(Tag::classify(b"KEY\ttinyint::1"), Tag::Key);
        assert_eq!(Tag::classify(b"VALUE\t0x1234"), Tag::Value);
        assert_eq!(Tag::classify(b"ARG\tlhs"), Tag::Argument);
        assert_eq!(Tag::classify(b"TableIndexWrapper\tidx"), Tag::Table);
        assert_eq!(Tag::classify(b"ensureCapacity"), Tag::Unknown);
        assert_eq!(Tag::classify(b"CM"), Tag::Unknown);
        assert_eq!(Tag::classify(b""), Tag::Unknown);
    }

    #[test]
    fn test_trace_line_payload() {
        let line = TraceLine::parse(b"CMD\tmoveToKey\r");
        assert_eq!(line.tag, Tag::Command);
        assert_eq!(line.payload, b"moveToKey");

        let bare = TraceLine::parse(b"ensureCapacity");
        assert_eq!(bare.tag, Tag::Unknown);
        assert!(bare.payload.is_empty());
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse(b"addEntry"), Command::AddEntry);
        assert_eq!(Command::parse(b"nextValueAtKey"), Command::NextValueAtKey);
        assert_eq!(
            Command::parse(b"replaceEntry"),
            Command::Other(Cow::Borrowed("replaceEntry"))
        );
    }

    #[test]
    fn test_key_field_parse() {
        let field = KeyField::parse(b"smallint::300");
        assert_eq!(field.key_type, KeyType::SmallInt);
        assert_eq!(field.repr, b"300");

        let varchar = KeyField::parse(b"varchar::[3]\"a::b\"");
        assert_eq!(varchar.key_type, KeyType::Varchar);
        assert_eq!(varchar.repr, b"[3]\"a::b\"");

        let invalid = KeyField::parse(b"INVALID");
        assert_eq!(invalid.key_type, KeyType::Invalid);
        assert!(invalid.repr.is_empty());
    }

    #[test]
    fn test_key_type_names() {
        assert_eq!(KeyType::parse(b"int"), KeyType::Integer);
        assert_eq!(KeyType::parse(b"integer").name(), "integer");
        assert_eq!(KeyType::parse(b"geography").name(), "geography");
    }

    #[test]
    fn test_value_text_strips_address_prefix() {
        assert_eq!(value_text(b"0x7f3a10"), b"7f3a10");
        assert_eq!(value_text(b"hello"), b"hello");
    }
}
