use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::token::Token;

/// What the interpreter should do with a scanned block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Literal output.
    Text,
    /// A `{% ... %}` statement.
    Code,
    /// A `{= ... =}` tag, desugared to a `print` statement.
    Echo,
    /// A block the scanner rejected; skipped, never executed.
    Comment,
}

/// One scanned unit of a template. Text blocks carry their literal output in
/// `raw` and no tokens; code/echo blocks carry the tokenized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Byte range of the block in the source, including the tag delimiters.
    pub start: usize,
    pub end: usize,
    /// Source line the block starts on, for diagnostics.
    pub line: u32,
    pub raw: String,
    pub tokens: Vec<Token>,
}

impl Block {
    pub fn text(start: usize, end: usize, line: u32, raw: String) -> Self {
        Self {
            kind: BlockKind::Text,
            start,
            end,
            line,
            raw,
            tokens: Vec::new(),
        }
    }

    pub fn hash64(&self) -> u64 {
        let mut hasher = FxHasher::default();
        (self.kind as u8).hash(&mut hasher);
        self.raw.hash(&mut hasher);
        let mut sum = hasher.finish();
        for token in &self.tokens {
            sum = sum.wrapping_add(token.hash64());
        }
        sum
    }
}

/// The ordered, resizable block sequence the interpreter walks, plus a
/// content hash maintained as the wrapping sum of per-block hashes. The hash
/// keys the inclusion cache, so it must track every append, splice, and
/// removal.
#[derive(Debug, Clone, Default)]
pub struct Program {
    blocks: Vec<Block>,
    hash: u64,
}

impl Program {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn hash64(&self) -> u64 {
        self.hash
    }

    pub fn push(&mut self, block: Block) {
        self.hash = self.hash.wrapping_add(block.hash64());
        self.blocks.push(block);
    }

    /// Replace the single block at `at` with `replacement`, shifting
    /// everything after it. Postcondition: `len = old_len - 1 + replacement.len()`;
    /// indices greater than `at` move by `replacement.len() - 1`. Open cache
    /// ranges are renumbered by the caller.
    pub fn splice(&mut self, at: usize, replacement: Vec<Block>) {
        if at >= self.blocks.len() {
            return;
        }
        self.hash = self.hash.wrapping_sub(self.blocks[at].hash64());
        for block in &replacement {
            self.hash = self.hash.wrapping_add(block.hash64());
        }
        self.blocks.splice(at..=at, replacement);
    }

    /// Remove the block at `at`; indices past it shift down by one.
    pub fn remove(&mut self, at: usize) {
        if at >= self.blocks.len() {
            return;
        }
        self.hash = self.hash.wrapping_sub(self.blocks[at].hash64());
        self.blocks.remove(at);
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    fn code(raw: &str) -> Block {
        Block {
            kind: BlockKind::Code,
            start: 0,
            end: raw.len(),
            line: 1,
            raw: raw.to_string(),
            tokens: vec![Token::with_text(TokenKind::Identifier, raw)],
        }
    }

    #[test]
    fn hash_tracks_push_splice_and_remove() {
        let mut program = Program::default();
        program.push(code("a"));
        let one = program.hash64();
        program.push(code("b"));
        assert_ne!(program.hash64(), one);

        program.remove(1);
        assert_eq!(program.hash64(), one);

        program.splice(0, vec![code("b"), code("c")]);
        assert_eq!(program.len(), 2);
        assert_ne!(program.hash64(), one);
    }

    #[test]
    fn splice_preserves_following_blocks() {
        let mut program = Program::default();
        program.push(code("a"));
        program.push(code("tail"));
        program.splice(0, vec![code("x"), code("y")]);
        assert_eq!(program.len(), 3);
        assert_eq!(program.get(2).unwrap().raw, "tail");
    }
}
