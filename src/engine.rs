//! Rendering facade: owns a prepared program, a template directory, and
//! the diagnostics accumulated across scans and renders.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Diagnostics, EngineError};
use crate::interp::Interp;
use crate::program::Program;
use crate::scanner::scan;
use crate::value::UserMap;

/// Source of sub-template content for `insert`.
pub trait TemplateLoader {
    fn load(&self, name: &str) -> io::Result<String>;
}

/// Loads templates as files relative to a root directory.
#[derive(Debug, Clone, Default)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateLoader for DirLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name))
    }
}

/// A reusable renderer. Prepare a template once, render it any number of
/// times with different seed data; diagnostics accumulate until queried.
#[derive(Debug, Default)]
pub struct Engine {
    loader: DirLoader,
    program: Program,
    diags: Diagnostics,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that `insert` resolves template names against.
    pub fn set_template_directory(&mut self, dir: impl Into<PathBuf>) -> Result<(), EngineError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(EngineError::BadDirectory(dir));
        }
        self.loader = DirLoader::new(dir);
        Ok(())
    }

    /// Read and scan the named template from the template directory.
    pub fn prepare_template(&mut self, name: &str) -> Result<(), EngineError> {
        let content = self.loader.load(name).map_err(|source| EngineError::Read {
            name: name.to_string(),
            source,
        })?;
        self.prepare_source(&content);
        Ok(())
    }

    /// Scan template text given directly.
    pub fn prepare_source(&mut self, content: &str) {
        self.program = scan(content, &mut self.diags);
        debug!(blocks = self.program.len(), "template prepared");
    }

    /// Render the prepared template against `seed`. The prepared program
    /// is kept intact; inclusion splicing happens on a working copy.
    pub fn render(&mut self, seed: UserMap) -> String {
        let mut working = self.program.clone();
        let mut interp = Interp::with_loader(&mut self.diags, &self.loader);
        interp.run(&mut working, seed)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    pub fn clear_diagnostics(&mut self) {
        self.diags = Diagnostics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directory_is_rejected() {
        let mut engine = Engine::new();
        let err = engine.set_template_directory("/definitely/not/a/real/dir");
        assert!(matches!(err, Err(EngineError::BadDirectory(_))));
    }

    #[test]
    fn missing_template_is_a_read_error() {
        let mut engine = Engine::new();
        let err = engine.prepare_template("nope.tpl");
        assert!(matches!(err, Err(EngineError::Read { .. })));
    }

    #[test]
    fn render_reuses_the_prepared_program() {
        let mut engine = Engine::new();
        engine.prepare_source("{= w =}!");
        let mut seed = UserMap::default();
        seed.insert("w".to_string(), "hi".into());
        assert_eq!(engine.render(seed.clone()), "hi!");
        assert_eq!(engine.render(seed), "hi!");
    }
}
