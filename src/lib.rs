//! A small template engine with statement and expression tags.
//!
//! Templates mix literal text with two tag forms, each requiring a single
//! space inside its markers:
//!
//! - `{% statement %}` — control flow and inclusion: `if` / `elif` /
//!   `else` / `endif`, `for` / `endfor` (over lists, maps, or
//!   `range(start, end, step)`), `print expr`, and `insert "name.tpl"`.
//! - `{= expression =}` — shorthand for `{% print expression %}`.
//!
//! Expressions work over unsigned 64-bit numbers (wrapping arithmetic,
//! rendered as signed), strings, and booleans, with `+ - * / %`, the named
//! comparisons `eq ne lt le gt ge`, `and` / `or` / `not`, parentheses, and
//! `container[index]` lookups into seeded lists and maps.
//!
//! Nothing is fatal at render time: malformed tags fall back to literal
//! text, failed statements are skipped, and every problem is recorded as a
//! line-tagged [`Diag`] while rendering carries on. A missing value prints
//! as `<null>`.
//!
//! The quick way in is [`render`]; [`Engine`] adds template-directory
//! inclusion and render reuse.
//!
//! ```
//! use weft::{render, UserMap};
//!
//! let mut seed = UserMap::default();
//! seed.insert("name".to_string(), "world".into());
//! let (out, diags) = render("hello {= name =}", seed);
//! assert_eq!(out, "hello world");
//! assert!(diags.is_empty());
//! ```

mod config;
mod engine;
mod env;
mod errors;
mod interp;
mod program;
mod scanner;
mod stack;
mod token;
mod value;

pub use engine::{DirLoader, Engine, TemplateLoader};
pub use errors::{Diag, Diagnostics, EngineError};
pub use interp::Interp;
pub use program::{Block, BlockKind, Program};
pub use scanner::scan;
pub use value::{Number, UserMap, UserValue, Value};

/// Scan and render `source` in one shot, without inclusion support.
pub fn render(source: &str, seed: UserMap) -> (String, Diagnostics) {
    let mut diags = Diagnostics::default();
    let mut program = scan(source, &mut diags);
    let out = Interp::new(&mut diags).run(&mut program, seed);
    (out, diags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let (out, diags) = render("no tags here\n", UserMap::default());
        assert_eq!(out, "no tags here\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn expression_tag_prints() {
        let (out, diags) = render("{= 1 + 2 =}", UserMap::default());
        assert_eq!(out, "3");
        assert!(diags.is_empty());
    }

    #[test]
    fn undefined_name_prints_null() {
        let (out, diags) = render("{= missing =}", UserMap::default());
        assert_eq!(out, "<null>");
        assert_eq!(diags.len(), 1);
    }
}
