//! Tokenizer driven by the language's anchored multi-pattern DFA.
//!
//! The DFA is stepped one byte at a time so that every pattern matching at a
//! position is seen, and the winner is picked here: longest match, then
//! literal over regex, then lowest pattern index. Skip patterns become the
//! padding of the following token.

use regex_automata::Anchored;
use regex_automata::dfa::Automaton;
use regex_automata::util::primitives::StateID;
use thicket_core::{Language, LexOutput, Point, Range, SYMBOL_END, SYMBOL_ERROR, SymbolId};

use crate::length::Length;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InputEncoding {
    #[default]
    Utf8,
    /// Little-endian UTF-16 code units; offsets and columns count bytes.
    Utf16,
}

/// Byte source read by the lexer.
pub(crate) trait Source {
    /// Bytes starting at `byte`; an empty slice marks the end of the document.
    fn chunk(&mut self, byte: usize, point: Point) -> &[u8];
}

pub(crate) struct SliceSource<'a>(pub &'a [u8]);

impl Source for SliceSource<'_> {
    fn chunk(&mut self, byte: usize, _point: Point) -> &[u8] {
        self.0.get(byte..).unwrap_or(&[])
    }
}

/// Pull reader that keeps the last chunk it was handed.
pub(crate) struct CallbackSource<'f, F, T> {
    callback: &'f mut F,
    cached: Option<T>,
    cached_start: usize,
}

impl<'f, F, T> CallbackSource<'f, F, T> {
    pub fn new(callback: &'f mut F) -> Self {
        Self {
            callback,
            cached: None,
            cached_start: 0,
        }
    }
}

impl<F, T> Source for CallbackSource<'_, F, T>
where
    F: FnMut(usize, Point) -> T,
    T: AsRef<[u8]>,
{
    fn chunk(&mut self, byte: usize, point: Point) -> &[u8] {
        let hit = match &self.cached {
            Some(chunk) => {
                byte >= self.cached_start && byte < self.cached_start + chunk.as_ref().len()
            }
            None => false,
        };
        if !hit {
            self.cached = Some((self.callback)(byte, point));
            self.cached_start = byte;
        }
        match &self.cached {
            Some(chunk) => &chunk.as_ref()[byte - self.cached_start..],
            None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    /// A terminal, `SYMBOL_END` at end of input, or `SYMBOL_ERROR` for unlexable text.
    pub symbol: SymbolId,
    pub padding: Length,
    pub size: Length,
    pub lookahead_bytes: usize,
}

#[derive(Clone, Copy)]
struct Char {
    utf8: [u8; 4],
    utf8_len: usize,
    /// Width in the source encoding.
    width: usize,
    newline: bool,
}

#[derive(Clone, Copy)]
struct Candidate {
    end: Length,
    pattern: usize,
    literal: bool,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        (self.end.bytes, self.literal, std::cmp::Reverse(self.pattern))
            > (other.end.bytes, other.literal, std::cmp::Reverse(other.pattern))
    }
}

struct Scan {
    best: Option<Candidate>,
    /// One past the last byte examined.
    scanned_end: usize,
}

pub(crate) struct Lexer<'a> {
    source: &'a mut dyn Source,
    language: &'a Language,
    encoding: InputEncoding,
    ranges: &'a [Range],
}

impl<'a> Lexer<'a> {
    pub fn new(
        source: &'a mut dyn Source,
        language: &'a Language,
        encoding: InputEncoding,
        ranges: &'a [Range],
    ) -> Self {
        Self {
            source,
            language,
            encoding,
            ranges,
        }
    }

    /// Lexes the next token at `start`. `accept` filters terminal symbols;
    /// skip patterns are always allowed.
    pub fn lex(&mut self, start: Length, accept: &dyn Fn(SymbolId) -> bool) -> Token {
        let mut pos = start;
        let mut scanned_end = start.bytes;

        loop {
            let Some(limit) = self.enter_range(&mut pos) else {
                return self.end_token(start, pos, scanned_end);
            };
            let immediate_ok = pos.bytes == start.bytes;
            let scan = self.scan(pos, limit, accept, immediate_ok);
            scanned_end = scanned_end.max(scan.scanned_end);

            match scan.best {
                Some(best) => match self.output(best.pattern) {
                    LexOutput::Skip if best.end.bytes > pos.bytes => pos = best.end,
                    LexOutput::Skip => return self.error_token(start, pos, limit, accept),
                    LexOutput::Token(symbol) => {
                        return Token {
                            symbol,
                            padding: pos - start,
                            size: best.end - pos,
                            lookahead_bytes: lookahead(scanned_end, best.end.bytes),
                        };
                    }
                },
                None if self.read_char(pos, limit).is_none() => {
                    return self.end_token(start, pos, scanned_end);
                }
                None => return self.error_token(start, pos, limit, accept),
            }
        }
    }

    fn output(&self, pattern: usize) -> LexOutput {
        self.language
            .lex_pattern(pattern)
            .map_or(LexOutput::Skip, |p| p.output)
    }

    fn end_token(&self, start: Length, pos: Length, scanned_end: usize) -> Token {
        Token {
            symbol: SYMBOL_END,
            padding: pos - start,
            size: Length::ZERO,
            lookahead_bytes: lookahead(scanned_end, pos.bytes),
        }
    }

    /// Consumes characters until some pattern matches again.
    fn error_token(
        &mut self,
        start: Length,
        error_start: Length,
        limit: usize,
        accept: &dyn Fn(SymbolId) -> bool,
    ) -> Token {
        let mut pos = error_start;
        let mut scanned_end = pos.bytes;
        while let Some(ch) = self.read_char(pos, limit) {
            pos = advance(pos, &ch);
            let scan = self.scan(pos, limit, accept, false);
            scanned_end = scanned_end.max(scan.scanned_end);
            if scan.best.is_some_and(|b| b.end.bytes > pos.bytes) {
                break;
            }
        }
        Token {
            symbol: SYMBOL_ERROR,
            padding: error_start - start,
            size: pos - error_start,
            lookahead_bytes: lookahead(scanned_end, pos.bytes),
        }
    }

    /// Moves `pos` into the next included range; returns that range's end.
    fn enter_range(&self, pos: &mut Length) -> Option<usize> {
        for range in self.ranges {
            if range.end_byte <= pos.bytes {
                continue;
            }
            if range.start_byte > pos.bytes {
                *pos = Length::new(range.start_byte, range.start_point);
            }
            if range.end_byte > pos.bytes {
                return Some(range.end_byte);
            }
        }
        None
    }

    fn scan(
        &mut self,
        start: Length,
        limit: usize,
        accept: &dyn Fn(SymbolId) -> bool,
        immediate_ok: bool,
    ) -> Scan {
        let language = self.language;
        let dfa = language.lex_dfa();
        let input = regex_automata::Input::new(&[] as &[u8]).anchored(Anchored::Yes);
        let Ok(mut state) = dfa.start_state_forward(&input) else {
            return Scan {
                best: None,
                scanned_end: start.bytes,
            };
        };

        let mut best: Option<Candidate> = None;
        let mut record = |state: StateID, end: Length| {
            for i in 0..dfa.match_len(state) {
                let pattern = dfa.match_pattern(state, i).as_usize();
                let Some(info) = language.lex_pattern(pattern) else {
                    continue;
                };
                let allowed = match info.output {
                    LexOutput::Skip => true,
                    LexOutput::Token(symbol) => (immediate_ok || !info.immediate) && accept(symbol),
                };
                if !allowed {
                    continue;
                }
                let candidate = Candidate {
                    end,
                    pattern,
                    literal: info.literal,
                };
                if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        };

        let mut pos = start;
        loop {
            let Some(ch) = self.read_char(pos, limit) else {
                state = dfa.next_eoi_state(state);
                if dfa.is_match_state(state) {
                    record(state, pos);
                }
                return Scan {
                    best,
                    scanned_end: pos.bytes,
                };
            };
            for (i, &byte) in ch.utf8[..ch.utf8_len].iter().enumerate() {
                state = dfa.next_state(state, byte);
                // Matches are reported one byte late.
                if i == 0 && dfa.is_match_state(state) {
                    record(state, pos);
                }
                if dfa.is_dead_state(state) {
                    return Scan {
                        best,
                        scanned_end: pos.bytes + ch.width,
                    };
                }
            }
            pos = advance(pos, &ch);
        }
    }

    fn byte_at(&mut self, byte: usize, point: Point) -> Option<u8> {
        self.source.chunk(byte, point).first().copied()
    }

    fn read_char(&mut self, pos: Length, limit: usize) -> Option<Char> {
        if pos.bytes >= limit {
            return None;
        }
        match self.encoding {
            InputEncoding::Utf8 => self.read_utf8(pos, limit),
            InputEncoding::Utf16 => self.read_utf16(pos, limit),
        }
    }

    fn read_utf8(&mut self, pos: Length, limit: usize) -> Option<Char> {
        let lead = self.byte_at(pos.bytes, pos.extent)?;
        let expected = match lead {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        };
        let mut utf8 = [lead, 0, 0, 0];
        let mut len = 1;
        while len < expected && pos.bytes + len < limit {
            match self.byte_at(pos.bytes + len, pos.extent) {
                Some(b) if b & 0xc0 == 0x80 => {
                    utf8[len] = b;
                    len += 1;
                }
                _ => break,
            }
        }
        if len < expected {
            len = 1;
        }
        Some(Char {
            utf8,
            utf8_len: len,
            width: len,
            newline: lead == b'\n',
        })
    }

    fn read_utf16(&mut self, pos: Length, limit: usize) -> Option<Char> {
        let unit = |lexer: &mut Self, at: usize| -> Option<u16> {
            if at + 2 > limit {
                return None;
            }
            let lo = lexer.byte_at(at, pos.extent)?;
            let hi = lexer.byte_at(at + 1, pos.extent)?;
            Some(u16::from_le_bytes([lo, hi]))
        };
        let first = unit(self, pos.bytes)?;
        let mut width = 2;
        let decoded = if (0xd800..0xdc00).contains(&first) {
            match unit(self, pos.bytes + 2) {
                Some(second) if (0xdc00..0xe000).contains(&second) => {
                    width = 4;
                    char::decode_utf16([first, second]).next()
                }
                _ => None,
            }
        } else {
            char::decode_utf16([first]).next()
        };
        let ch = decoded.and_then(Result::ok).unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut utf8 = [0u8; 4];
        let utf8_len = ch.encode_utf8(&mut utf8).len();
        Some(Char {
            utf8,
            utf8_len,
            width,
            newline: ch == '\n',
        })
    }
}

fn advance(pos: Length, ch: &Char) -> Length {
    let extent = if ch.newline {
        Point::new(pos.extent.row + 1, 0)
    } else {
        Point::new(pos.extent.row, pos.extent.column + ch.width)
    };
    Length::new(pos.bytes + ch.width, extent)
}

/// Lookahead past `end`, covering an insertion right after the last examined byte.
fn lookahead(scanned_end: usize, end: usize) -> usize {
    (scanned_end + 1).saturating_sub(end).max(1)
}
