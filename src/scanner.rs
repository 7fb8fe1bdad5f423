//! Splits raw template text into typed blocks and tokenizes code tags.
//!
//! Tag shape is strict: `{% statement %}` and `{= expression =}`, with
//! exactly one space after the opening marker and one before the closing
//! marker. Anything that does not match degrades to literal text; a tag
//! whose content fails tokenization is kept as a skipped Comment block so
//! its source span stays consumed. Scanning never fails.

use tracing::debug;

use crate::config::{MAX_IDENT_LEN, MAX_STRING_LEN, TAG_CLOSE, TAG_CODE, TAG_ECHO, TAG_OPEN};
use crate::errors::Diagnostics;
use crate::program::{Block, BlockKind, Program};
use crate::token::{keyword, single_token, Token, TokenKind};

/// Scan template text into a block sequence. Deterministic: identical input
/// yields identical blocks and identical diagnostics.
pub fn scan(content: &str, diags: &mut Diagnostics) -> Program {
    let mut scanner = Scanner::new(content);
    let mut program = Program::default();

    while !scanner.at_end() {
        let mut block = if scanner.peek() == Some(TAG_OPEN) {
            scanner.code_block(diags)
        } else {
            scanner.text_block(false)
        };

        if matches!(block.kind, BlockKind::Code | BlockKind::Echo) {
            match tokenize(&block.raw, block.line, diags) {
                Some(tokens) => block.tokens = tokens,
                None => block.kind = BlockKind::Comment,
            }
        }
        program.push(block);
    }

    debug!(blocks = program.len(), hash = program.hash64(), "scanned template");
    program
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.at(self.pos)
    }

    fn at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Literal text up to the next tag opener or end of line. A line feed
    /// always closes the block, so output granularity is line-bounded.
    /// `force` marks a tag opener that failed validation and is re-absorbed
    /// as the first character of this block.
    fn text_block(&mut self, force: bool) -> Block {
        let start = self.pos;
        let line = self.line;
        let mut cur = self.pos + usize::from(force);
        let mut blank = !force;
        let mut ends_with_newline = false;
        let mut echo_follows = false;

        while let Some(c) = self.at(cur) {
            if c == TAG_OPEN {
                echo_follows = self.at(cur + 1) == Some(TAG_ECHO);
                break;
            }
            if c == b'\n' {
                self.line += 1;
                ends_with_newline = true;
                cur += 1;
                break;
            }
            if c != b' ' && c != b'\t' && c != b'\r' {
                blank = false;
            }
            cur += 1;
        }

        // Whitespace-only lines are compacted to at most their newline,
        // unless the next block is an echo tag whose indentation matters.
        let raw = if blank && !echo_follows {
            if ends_with_newline { "\n".to_string() } else { String::new() }
        } else {
            self.src[start..cur].to_string()
        };

        self.pos = cur;
        Block::text(start, cur, line, raw)
    }

    /// A `{` that might open a tag. Validates the marker and the mandatory
    /// spaces, finds the matching closer, and otherwise falls back to
    /// forced literal text starting at the `{`.
    fn code_block(&mut self, diags: &mut Diagnostics) -> Block {
        let open = self.pos;
        let line = self.line;

        let (kind, marker) = match self.at(open + 1) {
            Some(TAG_CODE) => (BlockKind::Code, TAG_CODE),
            Some(TAG_ECHO) => (BlockKind::Echo, TAG_ECHO),
            _ => return self.text_block(true),
        };
        if self.at(open + 2) != Some(b' ') {
            return self.text_block(true);
        }

        let content_start = open + 3;
        let mut cur = content_start;
        let mut close = None;
        while let Some(c) = self.at(cur) {
            if c == b'\n' {
                self.line += 1;
            }
            if c == TAG_CLOSE {
                let m = self.bytes[cur - 1];
                if m == marker && self.bytes[cur - 2] == b' ' {
                    close = Some(cur);
                    break;
                }
                if m == TAG_CODE || m == TAG_ECHO {
                    diags.log(
                        self.line,
                        format!("malformed tag, expected closing ` {}}}`", marker as char),
                    );
                    self.line = line;
                    return self.text_block(true);
                }
            }
            cur += 1;
        }

        // Input ended without a well-formed closer.
        let Some(close) = close else {
            self.line = line;
            return self.text_block(true);
        };

        let content = if close >= content_start + 2 {
            &self.src[content_start..close - 2]
        } else {
            ""
        };
        // Echo is sugar for a print statement.
        let raw = match kind {
            BlockKind::Echo => format!("print {content}"),
            _ => content.to_string(),
        };

        self.pos = close + 1;
        // A statement tag swallows the line feed that follows it, so
        // structural lines do not leak blank lines into the output.
        if kind == BlockKind::Code && self.peek() == Some(b'\n') {
            self.pos += 1;
            self.line += 1;
        }

        Block {
            kind,
            start: open,
            end: self.pos,
            line,
            raw,
            tokens: Vec::new(),
        }
    }
}

/// Tokenize the isolated content of a code/echo tag. Returns `None` on an
/// illegal character or oversized literal; the caller reclassifies the
/// block as Comment.
fn tokenize(data: &str, line: u32, diags: &mut Diagnostics) -> Option<Vec<Token>> {
    let bytes = data.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if let Some(kind) = single_token(c) {
            tokens.push(Token::bare(kind));
            pos += 1;
            continue;
        }

        match c {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,

            b'"' => {
                let start = pos + 1;
                let mut cur = start;
                while cur < bytes.len() && bytes[cur] != b'"' {
                    cur += 1;
                }
                if cur >= bytes.len() {
                    diags.log(line, "expected closing `\"`");
                    return None;
                }
                if cur - start > MAX_STRING_LEN {
                    diags.log(line, format!("string literal exceeds {MAX_STRING_LEN} bytes"));
                    return None;
                }
                tokens.push(Token::with_text(TokenKind::Str, &data[start..cur]));
                pos = cur + 1;
            }

            b'0'..=b'9' => {
                let mut value: u64 = 0;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    let digit = u64::from(bytes[pos] - b'0');
                    if value > (i32::MAX as u64 - digit) / 10 {
                        diags.log(line, "numeric literals are limited to 32 bits");
                        return None;
                    }
                    value = value * 10 + digit;
                    pos += 1;
                }
                tokens.push(Token::with_text(TokenKind::Number, value.to_string()));
            }

            c if c.is_ascii_alphabetic() => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                    if pos - start > MAX_IDENT_LEN {
                        diags.log(line, format!("identifier exceeds {MAX_IDENT_LEN} bytes"));
                        return None;
                    }
                }
                let text = &data[start..pos];
                match keyword(text) {
                    Some(kind) => tokens.push(Token::bare(kind)),
                    None => tokens.push(Token::with_text(TokenKind::Identifier, text)),
                }
            }

            other => {
                diags.log(line, format!("unexpected character `{}`", other as char));
                return None;
            }
        }
    }

    Some(tokens)
}
