use std::path::PathBuf;

use thiserror::Error;

/// One logged diagnostic: a message plus the source line it originated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub message: String,
    pub line: u32,
}

/// Append-only diagnostic side channel. No scan or render condition is
/// fatal; everything recoverable lands here and the render still returns
/// output. Embedders can inspect the first, last, or nth message, or
/// iterate all of them.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diag>,
}

impl Diagnostics {
    pub fn log(&mut self, line: u32, message: impl Into<String>) {
        self.entries.push(Diag {
            message: message.into(),
            line,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, n: usize) -> Option<&Diag> {
        self.entries.get(n)
    }

    pub fn first(&self) -> Option<&Diag> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Diag> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diag> {
        self.entries.iter()
    }

    /// True if any message contains `needle`; test convenience.
    pub fn any_contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }
}

/// Errors at the engine boundary (template loading). Everything inside a
/// render stays on the [`Diagnostics`] channel instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0:?} is not a readable template directory")]
    BadDirectory(PathBuf),

    #[error("failed to read template `{name}`")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
