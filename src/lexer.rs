//! Lexer / field reader (spec.md §4.1).
//!
//! A RESP file is read as a sequence of *data lines*, each carrying a
//! `(blockette_no, field_no)` prefix and one or more whitespace-delimited
//! fields. Blank and comment (`#`) lines are skipped transparently during
//! tokenization, so [`Lines`] only ever yields data lines.
//!
//! The whole input is tokenized up front into a `Vec<RawLine>` (the scan is
//! bounded by one channel's worth of text and buffering it keeps the
//! peek/expect/pushback contract trivial to implement correctly — see
//! SPEC_FULL.md §4.1). Reading a line ahead to detect the end of a stage is
//! then just *not advancing* the read cursor, rather than a true pushback.

use crate::error::{RespError, Result};

/// One tokenized RESP data line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub blkt_no: u16,
    /// Field number, e.g. `"09"` or `"10-13"` for a ranged sub-field line.
    pub fld_no: String,
    pub fields: Vec<String>,
    /// 1-based source line number, for diagnostics.
    pub line_no: usize,
}

/// Split input text into logical lines, tolerating CR, LF, and CRLF endings.
/// `\r\n` produces an empty string between the `\r` and `\n` split points;
/// a spurious blank line is harmless since blanks are skipped downstream.
fn split_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r']).collect()
}

/// Parse the `Bxx` `Fyy(-zz)?` prefix token. Returns `None` if `tok` doesn't
/// start with `B` followed by two digits.
fn parse_prefix(tok: &str) -> Result<Option<(u16, String)>> {
    let bytes = tok.as_bytes();
    if bytes.is_empty() || bytes[0] != b'B' {
        return Ok(None);
    }
    if tok.len() < 3 || !tok[1..3].bytes().all(|b| b.is_ascii_digit()) {
        return Err(RespError::UndefinedPrefix(tok.to_string()));
    }
    let blkt_no: u16 = tok[1..3]
        .parse()
        .map_err(|_| RespError::UndefinedPrefix(tok.to_string()))?;
    let rest = &tok[3..];
    if rest.is_empty() || rest.as_bytes()[0] != b'F' {
        return Err(RespError::UndefinedPrefix(tok.to_string()));
    }
    let rest = &rest[1..];
    // `rest` is now e.g. "09" or "10-13".
    let valid = match rest.split_once('-') {
        Some((a, b)) => {
            a.len() == 2
                && b.len() == 2
                && a.bytes().all(|c| c.is_ascii_digit())
                && b.bytes().all(|c| c.is_ascii_digit())
        }
        None => rest.len() == 2 && rest.bytes().all(|c| c.is_ascii_digit()),
    };
    if !valid {
        return Err(RespError::UndefinedPrefix(tok.to_string()));
    }
    Ok(Some((blkt_no, rest.to_string())))
}

/// Tokenize one non-blank, non-comment line into a [`RawLine`].
fn tokenize(line: &str, line_no: usize) -> Result<Option<RawLine>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = trimmed.split_whitespace();
    let prefix_tok = match tokens.next() {
        Some(t) => t,
        None => return Ok(None),
    };
    let (blkt_no, fld_no) = match parse_prefix(prefix_tok)? {
        Some(p) => p,
        None => return Ok(None),
    };

    let rest: Vec<&str> = tokens.collect();
    // Find the separator-bearing label token (contains ':'); everything after
    // it is field data. Content trailing the ':' within the same token (rare,
    // e.g. "Value:123") becomes the first field.
    let mut sep_idx = None;
    let mut inline_tail: Option<&str> = None;
    for (i, tok) in rest.iter().enumerate() {
        if let Some(pos) = tok.find(':') {
            sep_idx = Some(i);
            let tail = &tok[pos + 1..];
            if !tail.is_empty() {
                inline_tail = Some(tail);
            }
            break;
        }
    }
    let sep_idx = match sep_idx {
        Some(i) => i,
        None => {
            return Err(RespError::UndefinedSeparator(line.to_string()));
        }
    };

    let mut fields: Vec<String> = Vec::new();
    if let Some(tail) = inline_tail {
        fields.push(tail.to_string());
    }
    fields.extend(rest[sep_idx + 1..].iter().map(|s| s.to_string()));

    Ok(Some(RawLine {
        blkt_no,
        fld_no,
        fields,
        line_no,
    }))
}

/// Tokenize a whole RESP document into its data lines, in order.
pub fn tokenize_all(text: &str) -> Result<Vec<RawLine>> {
    let mut out = Vec::new();
    for (i, raw) in split_lines(text).into_iter().enumerate() {
        if let Some(rl) = tokenize(raw, i + 1)? {
            out.push(rl);
        }
    }
    Ok(out)
}

/// Cursor-based reader over a slice of already-tokenized [`RawLine`]s,
/// implementing the peek/expect/try_expect contract of spec.md §4.1.
pub struct LineReader<'a> {
    lines: &'a [RawLine],
    pos: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(lines: &'a [RawLine]) -> Self {
        LineReader { lines, pos: 0 }
    }

    /// Non-destructive look at the next line's prefix.
    pub fn peek_prefix(&self) -> Option<(u16, &str)> {
        self.lines
            .get(self.pos)
            .map(|l| (l.blkt_no, l.fld_no.as_str()))
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Consume the next line, requiring it to match `(blkt_no, fld_no)`.
    pub fn expect(&mut self, blkt_no: u16, fld_no: &str) -> Result<&'a [String]> {
        match self.lines.get(self.pos) {
            Some(l) if l.blkt_no == blkt_no && l.fld_no == fld_no => {
                self.pos += 1;
                Ok(&l.fields)
            }
            Some(l) => Err(RespError::ParseError(format!(
                "line {}: expected B{:02}F{} but found B{:02}F{}",
                l.line_no, blkt_no, fld_no, l.blkt_no, l.fld_no
            ))),
            None => Err(RespError::UnexpectedEof(format!(
                "expected B{blkt_no:02}F{fld_no}"
            ))),
        }
    }

    /// Non-failing variant of [`Self::expect`]: returns `None` (without
    /// consuming) if the next line doesn't match.
    pub fn try_expect(&mut self, blkt_no: u16, fld_no: &str) -> Option<&'a [String]> {
        match self.lines.get(self.pos) {
            Some(l) if l.blkt_no == blkt_no && l.fld_no == fld_no => {
                self.pos += 1;
                Some(&l.fields)
            }
            _ => None,
        }
    }

    /// Consume the next line regardless of its prefix, e.g. for a blockette
    /// whose field number varies by blockette kind (dictionary vs. per-channel).
    pub fn expect_blkt(&mut self, blkt_no: u16) -> Result<&'a RawLine> {
        match self.lines.get(self.pos) {
            Some(l) if l.blkt_no == blkt_no => {
                self.pos += 1;
                Ok(l)
            }
            Some(l) => Err(RespError::ParseError(format!(
                "line {}: expected blockette B{:02} but found B{:02}",
                l.line_no, blkt_no, l.blkt_no
            ))),
            None => Err(RespError::UnexpectedEof(format!("expected B{blkt_no:02}"))),
        }
    }

    pub fn try_expect_blkt(&mut self, blkt_no: u16) -> Option<&'a RawLine> {
        match self.lines.get(self.pos) {
            Some(l) if l.blkt_no == blkt_no => {
                self.pos += 1;
                Some(l)
            }
            _ => None,
        }
    }

    /// Advance the cursor until the next line carries `blkt_no` or the input
    /// is exhausted. Used to resynchronize after a recoverable per-channel
    /// parse failure (spec.md §4.4's skip-to-next-B050 recovery). If the
    /// cursor is already sitting on a `blkt_no` line, that line is skipped
    /// first so the search always makes forward progress onto the *next*
    /// occurrence, rather than stalling in place.
    pub fn skip_until(&mut self, blkt_no: u16) {
        if self.lines.get(self.pos).is_some_and(|l| l.blkt_no == blkt_no) {
            self.pos += 1;
        }
        while let Some(l) = self.lines.get(self.pos) {
            if l.blkt_no == blkt_no {
                break;
            }
            self.pos += 1;
        }
    }
}
