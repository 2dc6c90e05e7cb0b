//! # mt-transcode
//!
//! Converts index operation traces into input for the Masstree benchmark
//! loader.
//!
//! ## Trace Format
//!
//! The index wrapper logs every call as tagged lines:
//!
//! ```text
//! TableIndexWrapper	ORDERS_PK
//! CMD	addEntry
//! KEY	tinyint::65
//! VALUE	0x55d0c8a0
//! ```
//!
//! ## Loader Format
//!
//! One record per operation, fields separated by tabs. Each record is
//! introduced by the newline in front of its verb:
//!
//! ```text
//! BEGIN	BEGIN	BEGIN
//! PUT	41	55d0c8a0
//! ```
//!
//! Keys are written as fixed-width big-endian hex (`tinyint`, `smallint`,
//! `integer`) or as the hex of their raw bytes (`varchar`). Anything the
//! loader cannot take is replaced by an inline `ERROR: ...` or `NOTE: ...`
//! marker and conversion carries on.
//!
//! ## Scans
//!
//! `moveToKeyOrGreater` / `moveToGreaterThanKey` start a `SCAN` and
//! `moveToKey` starts a `GET`. The first `nextValue` (or `nextValueAtKey`)
//! after them belongs to that record; later ones each open a `NEXT`
//! (or `NVAL`) record.

pub mod config;
pub mod encoder;
pub mod trace;
pub mod transcoder;

pub use config::OutputConfig;
pub use encoder::{KeyEncoder, KeyError};
pub use trace::{Command, KeyField, KeyType, Tag, TraceLine};
pub use transcoder::{TranscodeStats, Transcoder};
