//! RESP blockette parsing (spec.md §4.3) and channel assembly (spec.md §4.4).
//!
//! [`blockettes`] turns runs of same-numbered data lines into typed
//! [`crate::model::Blockette`] payloads; [`assembler`] drives a [`crate::lexer::LineReader`]
//! across a whole channel and hands the result to [`crate::validate`].

pub mod assembler;
pub mod blockettes;

use crate::error::{RespError, Result};
use crate::lexer::{LineReader, RawLine};

pub(crate) fn parse_f64(tok: &str) -> Result<f64> {
    tok.trim()
        .parse::<f64>()
        .map_err(|_| RespError::ImproperDataType(format!("expected a number, found '{tok}'")))
}

pub(crate) fn parse_u32(tok: &str) -> Result<u32> {
    tok.trim()
        .parse::<u32>()
        .map_err(|_| RespError::ImproperDataType(format!("expected an integer, found '{tok}'")))
}

pub(crate) fn parse_u16(tok: &str) -> Result<u16> {
    tok.trim()
        .parse::<u16>()
        .map_err(|_| RespError::ImproperDataType(format!("expected an integer, found '{tok}'")))
}

/// A run of contiguous raw lines sharing one blockette number, indexed by
/// field number for convenient scalar/row access. RESP groups a blockette
/// instance's fields into one contiguous run (stage boundaries always
/// interleave a different blockette number between two same-numbered runs),
/// so collecting contiguous lines is equivalent to collecting one instance.
pub(crate) struct Block<'a> {
    blkt_no: u16,
    by_fld: Vec<(&'a str, &'a [String])>,
}

impl<'a> Block<'a> {
    /// Consume every contiguous line whose blockette number is `blkt_no`.
    pub(crate) fn collect(reader: &mut LineReader<'a>, blkt_no: u16) -> Option<Self> {
        let mut by_fld = Vec::new();
        while let Some(line) = reader.try_expect_blkt(blkt_no) {
            by_fld.push((line.fld_no.as_str(), line.fields.as_slice()));
        }
        if by_fld.is_empty() {
            None
        } else {
            Some(Block { blkt_no, by_fld })
        }
    }

    /// The single row for `fld_no`, required to appear exactly once.
    pub(crate) fn scalar(&self, fld_no: &str) -> Result<&'a [String]> {
        self.by_fld
            .iter()
            .find(|(f, _)| *f == fld_no)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                RespError::UnexpectedEof(format!(
                    "B{:02}F{fld_no} not present in this blockette",
                    self.blkt_no
                ))
            })
    }

    /// Every row recorded for `fld_no`, in source order (for repeated
    /// row groups such as zero/pole/coefficient tables).
    pub(crate) fn rows(&self, fld_no: &str) -> Vec<&'a [String]> {
        self.by_fld
            .iter()
            .filter(|(f, _)| *f == fld_no)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Sum every occurrence of `fld_no`, parsed as an integer count. A
    /// blockette instance that was merged from two continuation runs
    /// (same stage, same blockette number, back to back) repeats its count
    /// field once per run; the row count it actually declares is their sum,
    /// not just the first one.
    pub(crate) fn sum_u32(&self, fld_no: &str) -> Result<u32> {
        self.by_fld
            .iter()
            .filter(|(f, _)| *f == fld_no)
            .map(|(_, v)| parse_u32(&field0(v)?))
            .sum()
    }

    pub(crate) fn scalar_f64(&self, fld_no: &str) -> Result<f64> {
        parse_f64(&field0(self.scalar(fld_no)?)?)
    }

    pub(crate) fn scalar_u32(&self, fld_no: &str) -> Result<u32> {
        parse_u32(&field0(self.scalar(fld_no)?)?)
    }

    pub(crate) fn scalar_str(&self, fld_no: &str) -> Result<&'a str> {
        Ok(field0(self.scalar(fld_no)?)?)
    }
}

fn field0(fields: &[String]) -> Result<&str> {
    fields
        .first()
        .map(|s| s.as_str())
        .ok_or_else(|| RespError::UnexpectedEof("expected a field value, found none".into()))
}

/// Drop the leading row-index column row parsers don't need, then parse the
/// rest as `f64`s.
pub(crate) fn row_values(row: &[String]) -> Result<Vec<f64>> {
    row.iter()
        .skip(1)
        .map(|s| parse_f64(s))
        .collect::<Result<Vec<f64>>>()
}

pub(crate) fn line_no_hint(line: &RawLine) -> usize {
    line.line_no
}
