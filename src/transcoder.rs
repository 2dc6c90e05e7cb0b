//! Trace transcoder
//!
//! Single pass over a trace: every line is classified, encoded and appended
//! to one output buffer. A record starts with the newline written by its
//! verb, so the output begins with an empty line.

use crate::encoder::{KeyEncoder, KeyError};
use crate::trace::{value_text, Command, KeyField, Tag, TraceLine};
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::Path;

// Record prefixes
const PUT: &[u8] = b"\nPUT\t";
const DEL: &[u8] = b"\nDEL\t";
const GET: &[u8] = b"\nGET\t";
const SCAN: &[u8] = b"\nSCAN\t";
const NEXT: &[u8] = b"\nNEXT\t";
const NVAL: &[u8] = b"\nNVAL\t";
const BEGIN: &[u8] = b"BEGIN\tBEGIN\tBEGIN";

const FIELD_SEPARATOR: u8 = b'\t';

// Inline markers
const UNHANDLED_CMD: &[u8] = b"ERROR: UNHANDLED CMD: ";
const UNKNOWN_TAG_ARG: &[u8] = b"\nERROR: UNKNOWN TAG ARG\n";
const UNKNOWN_TAG: &[u8] = b"\nERROR: UNKNOWN TAG\n";

/// Counts gathered over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Input lines seen
    pub lines: usize,
    /// Record prefixes written
    pub records: usize,
    /// `ERROR:` markers written
    pub errors: usize,
    /// `NOTE:` markers written
    pub notes: usize,
}

/// Converts trace lines into Masstree loader records
pub struct Transcoder {
    encoder: KeyEncoder,
    /// `nextValue` calls since the last `moveToKeyOrGreater`/`moveToGreaterThanKey`
    scan_count: u32,
    /// `nextValueAtKey` calls since the last `moveToKey`
    scan_value_count: u32,
    stats: TranscodeStats,
}

impl Transcoder {
    /// Create a transcoder with fresh counters
    pub fn new() -> Self {
        Self {
            encoder: KeyEncoder::new(),
            scan_count: 0,
            scan_value_count: 0,
            stats: TranscodeStats::default(),
        }
    }

    /// Counts for everything transcoded so far
    pub fn stats(&self) -> TranscodeStats {
        self.stats
    }

    /// Transcode a whole trace held in memory
    pub fn transcode(&mut self, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(input.len());
        for line in Self::lines(input) {
            self.transcode_line(line, &mut output);
        }
        output
    }

    /// Transcode one line, appending its output
    pub fn transcode_line(&mut self, line: &[u8], out: &mut Vec<u8>) {
        self.stats.lines += 1;
        let line = TraceLine::parse(line);

        match line.tag {
            Tag::Command => self.command(Command::parse(line.payload), out),
            Tag::Key => self.key(&KeyField::parse(line.payload), out),
            Tag::Value => {
                out.push(FIELD_SEPARATOR);
                out.extend_from_slice(value_text(line.payload));
            }
            Tag::Argument => {
                debug!("ARG line at {} is not supported", self.stats.lines);
                self.stats.errors += 1;
                out.extend_from_slice(UNKNOWN_TAG_ARG);
            }
            Tag::Table => out.extend_from_slice(BEGIN),
            Tag::Unknown => {
                debug!("unknown tag at line {}", self.stats.lines);
                self.stats.errors += 1;
                out.extend_from_slice(UNKNOWN_TAG);
            }
        }
    }

    fn command(&mut self, command: Command<'_>, out: &mut Vec<u8>) {
        let prefix = match command {
            Command::AddEntry => PUT,
            Command::DeleteEntry => DEL,
            Command::MoveToKey => {
                self.scan_value_count = 0;
                GET
            }
            Command::MoveToKeyOrGreater | Command::MoveToGreaterThanKey => {
                self.scan_count = 0;
                SCAN
            }
            Command::NextValueAtKey => {
                self.scan_value_count += 1;
                // First advance continues the GET record
                if self.scan_value_count <= 1 {
                    return;
                }
                NVAL
            }
            Command::NextValue => {
                self.scan_count += 1;
                if self.scan_count <= 1 {
                    return;
                }
                NEXT
            }
            Command::Other(verb) => {
                debug!("unhandled command {} at line {}", verb, self.stats.lines);
                self.stats.errors += 1;
                out.extend_from_slice(UNHANDLED_CMD);
                out.extend_from_slice(verb.as_bytes());
                return;
            }
        };

        self.stats.records += 1;
        out.extend_from_slice(prefix);
    }

    fn key(&mut self, field: &KeyField<'_>, out: &mut Vec<u8>) {
        match self.encoder.encode(field) {
            Ok(hex) => out.extend_from_slice(hex.as_bytes()),
            Err(err) => self.marker(&err, out),
        }
    }

    fn marker(&mut self, err: &KeyError, out: &mut Vec<u8>) {
        debug!("{} at line {}", err, self.stats.lines);
        if err.is_note() {
            self.stats.notes += 1;
        } else {
            self.stats.errors += 1;
        }
        out.push(b'\n');
        out.extend_from_slice(err.to_string().as_bytes());
        out.push(b'\n');
    }

    /// Transcode `input` and write the result to `writer` in one go
    pub fn transcode_to_writer<W: Write>(&mut self, input: &[u8], mut writer: W) -> Result<()> {
        let output = self.transcode(input);
        writer.write_all(&output)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a trace file and write its transcoding to `output`
    pub fn transcode_file(&mut self, input: &Path, output: &Path) -> Result<TranscodeStats> {
        let data = fs::read(input)
            .with_context(|| format!("Failed to read trace: {}", input.display()))?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let before = self.stats;
        let file = fs::File::create(output)
            .with_context(|| format!("Failed to create: {}", output.display()))?;
        self.transcode_to_writer(&data, file)
            .with_context(|| format!("Failed to write: {}", output.display()))?;

        let stats = TranscodeStats {
            lines: self.stats.lines - before.lines,
            records: self.stats.records - before.records,
            errors: self.stats.errors - before.errors,
            notes: self.stats.notes - before.notes,
        };
        info!(
            "{} -> {}: {} lines, {} records, {} errors, {} notes",
            input.display(),
            output.display(),
            stats.lines,
            stats.records,
            stats.errors,
            stats.notes
        );
        Ok(stats)
    }

    /// Split on `\n`; a final newline does not start another line, but a
    /// lone `\n` is one blank line
    fn lines(input: &[u8]) -> impl Iterator<Item = &[u8]> {
        let empty = input.is_empty();
        let input = input.strip_suffix(b"\n").unwrap_or(input);
        input.split(|&b| b == b'\n').filter(move |_| !empty)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> String {
        let output = Transcoder::new().transcode(input.as_bytes());
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_put_record() {
        let output = run("CMD\taddEntry\nKEY\ttinyint::65\nVALUE\thello\n");
        assert_eq!(output, "\nPUT\t41\thello");
    }

    #[test]
    fn test_put_with_address_value() {
        let output = run("CMD\taddEntry\nKEY\tinteger::1\nVALUE\t0x55d0c8a0\n");
        assert_eq!(output, "\nPUT\t00000001\t55d0c8a0");
    }

    #[test]
    fn test_consecutive_puts() {
        let output = run("CMD\taddEntry\nCMD\taddEntry\n");
        assert_eq!(output, "\nPUT\t\nPUT\t");
    }

    #[test]
    fn test_delete_and_get() {
        let output = run("CMD\tdeleteEntry\nKEY\tsmallint::1\nCMD\tmoveToKey\nKEY\tsmallint::2\n");
        assert_eq!(output, "\nDEL\t0001\nGET\t0002");
    }

    #[test]
    fn test_next_skips_first_advance() {
        let output = run("CMD\tmoveToKeyOrGreater\nKEY\ttinyint::1\nCMD\tnextValue\n");
        assert_eq!(output, "\nSCAN\t01");

        let output = run(
            "CMD\tmoveToKeyOrGreater\nKEY\ttinyint::1\nCMD\tnextValue\nCMD\tnextValue\nCMD\tnextValue\n",
        );
        assert_eq!(output, "\nSCAN\t01\nNEXT\t\nNEXT\t");
    }

    #[test]
    fn test_scan_resets_counter() {
        let output = run(
            "CMD\tmoveToGreaterThanKey\nCMD\tnextValue\nCMD\tnextValue\n\
             CMD\tmoveToKeyOrGreater\nCMD\tnextValue\n",
        );
        assert_eq!(output, "\nSCAN\t\nNEXT\t\nSCAN\t");
    }

    #[test]
    fn test_nval_follows_get() {
        let output = run("CMD\tmoveToKey\nCMD\tnextValueAtKey\nCMD\tnextValueAtKey\n");
        assert_eq!(output, "\nGET\t\nNVAL\t");
    }

    #[test]
    fn test_move_to_key_does_not_reset_scan_counter() {
        let output = run(
            "CMD\tmoveToKeyOrGreater\nCMD\tnextValue\nCMD\tmoveToKey\nCMD\tnextValue\n",
        );
        assert_eq!(output, "\nSCAN\t\nGET\t\nNEXT\t");
    }

    #[test]
    fn test_unhandled_command() {
        let output = run("CMD\treplaceEntry\n");
        assert_eq!(output, "ERROR: UNHANDLED CMD: replaceEntry");
    }

    #[test]
    fn test_unsupported_key_continues() {
        let output = run("CMD\taddEntry\nKEY\tbigint::5\nVALUE\t0x10\n");
        assert_eq!(output, "\nPUT\t\nERROR: UNKNOWN TYPE bigint\n\t10");
    }

    #[test]
    fn test_tags() {
        assert_eq!(run("TableIndexWrapper\tidx\n"), "BEGIN\tBEGIN\tBEGIN");
        assert_eq!(run("ARG\tlhs\n"), "\nERROR: UNKNOWN TAG ARG\n");
        assert_eq!(run("ensureCapacity\n"), "\nERROR: UNKNOWN TAG\n");
    }

    #[test]
    fn test_invalid_key_note() {
        assert_eq!(run("KEY\tINVALID\n"), "\nNOTE: TYPE INVALID\n");
    }

    #[test]
    fn test_stats() {
        let mut transcoder = Transcoder::new();
        transcoder.transcode(
            b"TableIndexWrapper\tidx\nCMD\taddEntry\nKEY\tdouble::1.0\nKEY\tINVALID\nCMD\texists\n",
        );
        let stats = transcoder.stats();
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.notes, 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(""), "");
        assert_eq!(Transcoder::new().stats(), TranscodeStats::default());
    }

    #[test]
    fn test_blank_lines_are_unknown_tags() {
        assert_eq!(run("\n"), "\nERROR: UNKNOWN TAG\n");
        assert_eq!(run("CMD\taddEntry\n\n"), "\nPUT\t\nERROR: UNKNOWN TAG\n");
    }

    #[test]
    fn test_truncated_varchar_is_marked() {
        let output = run("CMD\taddEntry\nKEY\tvarchar::[5]\"ab\ncd\"\nVALUE\t0x10\n");
        assert_eq!(
            output,
            "\nPUT\t\nERROR: MALFORMED KEY varchar\n\nERROR: UNKNOWN TAG\n\t10"
        );
    }

    #[test]
    fn test_crlf_lines() {
        assert_eq!(run("CMD\taddEntry\r\nKEY\ttinyint::16\r\n"), "\nPUT\t10");
    }

    #[test]
    fn test_last_line_without_newline() {
        assert_eq!(run("CMD\taddEntry\nKEY\ttinyint::16"), "\nPUT\t10");
    }
}
