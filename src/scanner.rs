// this_file: src/scanner.rs

//! A byte-level streaming parser that advances over canonical JSON bytes
//! and, at every natural stopping point, reports the current structural
//! [`Location`].
//!
//! A state enum plus a context stack, advanced one token at a time,
//! specialized to bytes the crate already knows are valid canonical JSON
//! rather than arbitrary user input, and to reporting *locations* rather
//! than building a value tree.
//!
//! A scanner's public contract reports a stop at every completed value
//! (scalar, or a container's closing bracket) and at the document's
//! completion; comma and colon consumption are internal bookkeeping
//! folded into advancing toward the next such stop, since no leaf is
//! required to end exactly at a bare separator.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::path::{JsonPath, Location};

/// What kind of byte the scanner expects next.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expect {
    /// A value (scalar or container open). `close_ok` is true only
    /// immediately after `[`, permitting an empty array's `]`.
    Value { close_ok: bool },
    /// An object key. `close_ok` is true only immediately after `{`,
    /// permitting an empty object's `}`.
    Key { close_ok: bool },
    /// A `:` between an object key and its value.
    Colon,
    /// A value has just completed; expect `,` or the enclosing close.
    CommaOrClose,
}

/// The outcome of one [`Scanner::advance_to_next_location`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A value stop was consumed: `location` names the value that just
    /// completed (or [`Location::end_of_document`] if the whole document
    /// just finished), and `offset` is the byte offset just past it.
    Stop { location: Location, offset: usize },
    /// The buffer was exhausted before another stop could be reached.
    /// Not necessarily an error — the caller may append more bytes and
    /// scan again.
    EndOfInput,
}

/// A resumable, cheaply cloneable cursor over canonical JSON bytes.
///
/// State is exactly `(buffer, offset, path)` plus the small amount of
/// parse-state (`expect`) needed to resume correctly; see
/// [`Scanner::from_beginning`] and [`Scanner::from_middle`].
#[derive(Debug, Clone)]
pub struct Scanner {
    buffer: Bytes,
    offset: usize,
    path: JsonPath,
    expect: Expect,
}

impl Scanner {
    /// A scanner positioned at the start of a document: empty path,
    /// offset zero, expecting a value.
    pub fn from_beginning(buffer: Bytes) -> Self {
        Scanner { buffer, offset: 0, path: JsonPath::root(), expect: Expect::Value { close_ok: false } }
    }

    /// A scanner resuming mid-document, seeded with the path of the value
    /// that ended exactly at this buffer's start (used after a chunk
    /// cut). Cut points only ever occur immediately after a value
    /// completes, so the resumed scanner always expects a separator or
    /// the enclosing close next.
    pub fn from_middle(buffer: Bytes, path: JsonPath) -> Self {
        Scanner { buffer, offset: 0, path, expect: Expect::CommaOrClose }
    }

    /// A scanner positioned just inside an existing container, before its
    /// first child has been scanned — the state a cursor lands in when a
    /// splice inserts a new first member. `slot` is the path of the child
    /// slot about to be filled (`Index(0)` for an array, a key
    /// placeholder for an object); `is_object` selects whether a key or
    /// a value is expected next.
    pub fn from_container_start(buffer: Bytes, slot: JsonPath, is_object: bool) -> Self {
        let expect = if is_object {
            Expect::Key { close_ok: true }
        } else {
            Expect::Value { close_ok: true }
        };
        Scanner { buffer, offset: 0, path: slot, expect }
    }

    /// The path most recently reported by a stop (or the seed path, if no
    /// stop has been reported yet).
    pub fn current_path(&self) -> &JsonPath {
        &self.path
    }

    /// Current byte offset into the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.offset..]
    }

    /// `true` iff the offset has reached the end of the buffer.
    pub fn at_end_of_chunk(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    /// `true` iff no sibling has yet been emitted at the current
    /// container — used by the chunker to decide whether a splice needs
    /// a leading comma.
    pub fn first_element_or_end_of_empty_value(&self) -> bool {
        matches!(
            self.expect,
            Expect::Value { close_ok: true } | Expect::Key { close_ok: true }
        )
    }

    /// `true` iff the scanner's current container is an object (the next
    /// structural member, if any, needs a `"key":` prefix).
    pub fn in_object(&self) -> bool {
        matches!(self.expect, Expect::Key { .. }) || self.path.last_is_key()
    }

    /// The full underlying buffer, including bytes already consumed
    /// (before `offset`) — used by [`crate::chunker::JsonChunker`] to
    /// slice out a completed leaf's bytes and to grow the buffer in
    /// place as more input arrives.
    pub(crate) fn full_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Replace the underlying buffer without touching `offset`, `path`,
    /// or `expect` — valid only when the new buffer's first
    /// `self.offset` bytes are unchanged from the old one (i.e. bytes
    /// were only appended, never rewritten).
    pub(crate) fn set_buffer(&mut self, buffer: Bytes) {
        self.buffer = buffer;
    }

    /// Drop every byte from `offset` onward, leaving a scanner whose
    /// buffer ends exactly where parsing had reached — used when seeding
    /// a chunker from a cursor positioned mid-leaf: the discarded bytes
    /// belong to the old tree and are re-read from the cursor itself,
    /// not duplicated here.
    pub(crate) fn truncate_to_offset(&mut self) {
        self.buffer = self.buffer.slice(..self.offset);
    }

    /// Advance the offset by `n` bytes without re-scanning. Only safe to
    /// call when the caller has guaranteed the skipped bytes contain no
    /// value stop; does not change `expect` or `path`, so callers that
    /// skip structural bytes (a synthesized comma, or a `"key":` prefix)
    /// must also call [`Scanner::note_comma_inserted`] /
    /// [`Scanner::note_key_inserted`] as appropriate.
    pub fn skip_bytes(&mut self, n: usize) {
        self.offset += n;
    }

    /// Record that a comma separator was synthesized and injected ahead
    /// of the cursor (not scanned from the buffer), transitioning
    /// `expect` exactly as a scanned comma would.
    pub fn note_comma_inserted(&mut self) -> Result<()> {
        self.consume_comma()
    }

    /// Record that an object key (and its following colon) was
    /// synthesized and injected ahead of the cursor, transitioning
    /// `expect` exactly as a scanned `"key":` would.
    pub fn note_key_inserted(&mut self, key: String) -> Result<()> {
        match self.expect {
            Expect::Key { .. } => {
                self.path.set_last_key(key);
                self.expect = Expect::Value { close_ok: false };
                Ok(())
            }
            _ => Err(Error::PreconditionViolation(
                "note_key_inserted called while not expecting an object key".to_string(),
            )),
        }
    }

    /// If the scanner is sitting right at a pending `,` separator (not a
    /// closing bracket), consume exactly that comma byte and its
    /// bookkeeping, landing on `Key`/`Value` for the sibling that
    /// follows. A no-op otherwise — no separator pending (a container's
    /// first child) or the next byte is a close, which this never
    /// consumes.
    pub(crate) fn consume_leading_comma_if_pending(&mut self) -> Result<()> {
        if !matches!(self.expect, Expect::CommaOrClose) {
            return Ok(());
        }
        self.skip_ws();
        if self.peek() == Some(b',') {
            self.offset += 1;
            self.consume_comma()?;
        }
        Ok(())
    }

    fn consume_comma(&mut self) -> Result<()> {
        match &self.expect {
            Expect::CommaOrClose if !self.path.is_root() => {
                if self.path.last_is_key() {
                    self.expect = Expect::Key { close_ok: false };
                } else {
                    self.path.increment_last_index();
                    self.expect = Expect::Value { close_ok: false };
                }
                Ok(())
            }
            _ => Err(Error::PreconditionViolation(
                "comma inserted while not expecting a separator".to_string(),
            )),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.buffer.get(self.offset).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn fail(&self, message: impl Into<String>) -> Error {
        Error::Parse { offset: self.offset, message: message.into() }
    }

    /// Advance forward exactly to the point a value is about to start —
    /// consuming any intervening separators, keys, colons, and container
    /// closes, but not the value itself. A close bubbles the scanner out
    /// to its enclosing container and the walk continues from there (a
    /// sibling of an ancestor may still hold another value); `false` is
    /// returned only once the buffer is genuinely exhausted with no value
    /// left to advance to at any level.
    ///
    /// Used by [`crate::cursor::JsonCursor`] to stop precisely at a
    /// splice point for a replace or delete: ordinary
    /// [`Scanner::advance_to_next_location`] only ever stops at value
    /// *completions*, which is one step too late for those two modes.
    pub fn advance_to_next_value_start(&mut self) -> Result<bool> {
        loop {
            self.skip_ws();
            match self.expect.clone() {
                Expect::Value { .. } => return Ok(true),
                Expect::Key { close_ok } => match self.step_key(close_ok)? {
                    None => continue,
                    Some(ScanOutcome::EndOfInput) => return Ok(false),
                    Some(ScanOutcome::Stop { .. }) => continue,
                },
                Expect::Colon => match self.peek() {
                    None => return Ok(false),
                    Some(b':') => {
                        self.offset += 1;
                        self.expect = Expect::Value { close_ok: false };
                    }
                    Some(other) => {
                        return Err(self.fail(format!("expected ':', found '{}'", other as char)))
                    }
                },
                Expect::CommaOrClose => match self.step_comma_or_close()? {
                    None => continue,
                    Some(ScanOutcome::EndOfInput) => return Ok(false),
                    Some(ScanOutcome::Stop { .. }) => continue,
                },
            }
        }
    }

    /// Consume the opening bracket of the container this scanner is
    /// sitting just before, for a caller that already knows the value
    /// here is a container it needs to descend into (target path lookup)
    /// rather than a value it should skip whole. Only valid while
    /// `Expect::Value` is current and the next byte is `{` or `[`;
    /// otherwise a precondition violation (the caller asked to descend
    /// into something that is not a container).
    pub fn open_container_for_descent(&mut self) -> Result<()> {
        if !matches!(self.expect, Expect::Value { .. }) {
            return Err(Error::PreconditionViolation(
                "open_container_for_descent called while not expecting a value".to_string(),
            ));
        }
        match self.peek() {
            Some(b'{') => {
                self.offset += 1;
                self.path.push_key_placeholder();
                self.expect = Expect::Key { close_ok: true };
                Ok(())
            }
            Some(b'[') => {
                self.offset += 1;
                self.path.push_index(0);
                self.expect = Expect::Value { close_ok: true };
                Ok(())
            }
            _ => Err(Error::PreconditionViolation(
                "open_container_for_descent: value at this position is not a container".to_string(),
            )),
        }
    }

    /// Parse forward, consuming exactly one value stop: a scalar, the
    /// closing of a container, or the document's completion. Internally
    /// also consumes any opening brackets, commas, keys, and colons
    /// needed to reach that stop.
    pub fn advance_to_next_location(&mut self) -> Result<ScanOutcome> {
        loop {
            self.skip_ws();
            match self.expect.clone() {
                Expect::Value { close_ok } => {
                    let Some(stop) = self.step_value(close_ok)? else { continue };
                    return Ok(stop);
                }
                Expect::Key { close_ok } => {
                    let Some(stop) = self.step_key(close_ok)? else { continue };
                    return Ok(stop);
                }
                Expect::Colon => {
                    match self.peek() {
                        None => return Ok(ScanOutcome::EndOfInput),
                        Some(b':') => {
                            self.offset += 1;
                            self.expect = Expect::Value { close_ok: false };
                        }
                        Some(other) => {
                            return Err(self.fail(format!("expected ':', found '{}'", other as char)))
                        }
                    }
                }
                Expect::CommaOrClose => {
                    let Some(stop) = self.step_comma_or_close()? else { continue };
                    return Ok(stop);
                }
            }
        }
    }

    /// Returns `Some(stop)` if this step produced a stop (including
    /// `EndOfInput`), `None` if it only advanced bookkeeping state and the
    /// loop should continue.
    fn step_value(&mut self, close_ok: bool) -> Result<Option<ScanOutcome>> {
        let Some(c) = self.peek() else { return Ok(Some(ScanOutcome::EndOfInput)) };
        match c {
            b'{' => {
                self.offset += 1;
                self.path.push_key_placeholder();
                self.expect = Expect::Key { close_ok: true };
                Ok(None)
            }
            b'[' => {
                self.offset += 1;
                self.path.push_index(0);
                self.expect = Expect::Value { close_ok: true };
                Ok(None)
            }
            b']' if close_ok => {
                self.offset += 1;
                self.path.pop();
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b'"' => {
                self.skip_string()?;
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b't' => {
                self.expect_literal("true")?;
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b'f' => {
                self.expect_literal("false")?;
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b'n' => {
                self.expect_literal("null")?;
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b'-' | b'0'..=b'9' => {
                self.skip_number()?;
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            other => Err(self.fail(format!("unexpected character '{}' while expecting a value", other as char))),
        }
    }

    fn step_key(&mut self, close_ok: bool) -> Result<Option<ScanOutcome>> {
        let Some(c) = self.peek() else { return Ok(Some(ScanOutcome::EndOfInput)) };
        match c {
            b'}' if close_ok => {
                self.offset += 1;
                self.path.pop();
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b'"' => {
                let key = self.read_string_content()?;
                self.path.set_last_key(key);
                self.expect = Expect::Colon;
                Ok(None)
            }
            other => Err(self.fail(format!("unexpected character '{}' while expecting an object key", other as char))),
        }
    }

    fn step_comma_or_close(&mut self) -> Result<Option<ScanOutcome>> {
        if self.path.is_root() {
            self.skip_ws();
            return match self.peek() {
                None => Ok(Some(ScanOutcome::EndOfInput)),
                Some(_) => Err(self.fail("trailing bytes after a complete document")),
            };
        }
        let Some(c) = self.peek() else { return Ok(Some(ScanOutcome::EndOfInput)) };
        let in_object = self.path.last_is_key();
        match c {
            b',' => {
                self.offset += 1;
                self.consume_comma()?;
                Ok(None)
            }
            b'}' if in_object => {
                self.offset += 1;
                self.path.pop();
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            b']' if !in_object => {
                self.offset += 1;
                self.path.pop();
                self.expect = Expect::CommaOrClose;
                Ok(Some(self.make_stop()))
            }
            other => Err(self.fail(format!(
                "unexpected character '{}' while expecting ',' or a closing bracket",
                other as char
            ))),
        }
    }

    fn make_stop(&self) -> ScanOutcome {
        let location = if self.path.is_root() {
            Location::end_of_document()
        } else {
            Location::end_of_value(self.path.clone())
        };
        ScanOutcome::Stop { location, offset: self.offset }
    }

    fn expect_literal(&mut self, literal: &str) -> Result<()> {
        let bytes = literal.as_bytes();
        if self.offset + bytes.len() > self.buffer.len() {
            return Err(self.fail(format!("truncated literal, expected '{literal}'")));
        }
        if &self.buffer[self.offset..self.offset + bytes.len()] != bytes {
            return Err(self.fail(format!("expected literal '{literal}'")));
        }
        self.offset += bytes.len();
        Ok(())
    }

    fn skip_number(&mut self) -> Result<()> {
        let start = self.offset;
        if self.peek() == Some(b'-') {
            self.offset += 1;
        }
        let int_start = self.offset;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.offset += 1;
        }
        if self.offset == int_start {
            return Err(self.fail("invalid number: missing integer digits"));
        }
        if self.peek() == Some(b'.') {
            self.offset += 1;
            let frac_start = self.offset;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.offset += 1;
            }
            if self.offset == frac_start {
                return Err(self.fail("invalid number: missing fractional digits"));
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.offset += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.offset += 1;
            }
            let exp_start = self.offset;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.offset += 1;
            }
            if self.offset == exp_start {
                return Err(self.fail("invalid number: missing exponent digits"));
            }
        }
        debug_assert!(self.offset > start);
        Ok(())
    }

    fn skip_string(&mut self) -> Result<()> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.offset += 1;
        loop {
            match self.peek() {
                None => return Err(self.fail("unterminated string literal")),
                Some(b'"') => {
                    self.offset += 1;
                    return Ok(());
                }
                Some(b'\\') => {
                    self.offset += 1;
                    self.skip_escape()?;
                }
                Some(_) => self.offset += 1,
            }
        }
    }

    fn skip_escape(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                self.offset += 1;
                Ok(())
            }
            Some(b'u') => {
                self.offset += 1;
                for _ in 0..4 {
                    match self.peek() {
                        Some(c) if c.is_ascii_hexdigit() => self.offset += 1,
                        _ => return Err(self.fail("invalid unicode escape")),
                    }
                }
                Ok(())
            }
            Some(other) => Err(self.fail(format!("invalid escape sequence '\\{}'", other as char))),
            None => Err(self.fail("unterminated escape sequence")),
        }
    }

    /// Read a quoted string starting at the offset and return its
    /// unescaped content, leaving the offset just past the closing quote.
    fn read_string_content(&mut self) -> Result<String> {
        let start = self.offset;
        self.skip_string()?;
        let raw = &self.buffer[start + 1..self.offset - 1];
        unescape(raw).map_err(|message| self.fail(message))
    }
}

fn unescape(raw: &[u8]) -> std::result::Result<String, String> {
    let s = std::str::from_utf8(raw).map_err(|_| "invalid utf-8 in string".to_string())?;
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err("invalid unicode escape".to_string());
                }
                let code = u32::from_str_radix(&hex, 16).map_err(|_| "invalid unicode escape".to_string())?;
                out.push(char::from_u32(code).ok_or_else(|| "invalid unicode code point".to_string())?);
            }
            Some(other) => return Err(format!("invalid escape sequence \\{other}")),
            None => return Err("incomplete escape sequence".to_string()),
        }
    }
    Ok(out)
}
