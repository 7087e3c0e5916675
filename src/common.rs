//! Common definitions that are shared between different parts of the compiler.

// Use sorted sets and maps for consistent output
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// Identifiers: function names, global names, string/constant labels, block labels.
///
/// Interned so that comparisons and hashing are pointer-cheap and so that the
/// same spelling always refers to the same `Id` across a module.
pub type Id = internment::Intern<String>;

/// Build an [`Id`] from anything that can be turned into a `String`.
pub fn id(s: impl Into<String>) -> Id {
    internment::Intern::new(s.into())
}

/// A source position, when the surrounding AST node carries one.
///
/// Lexing and parsing are external collaborators; this crate only threads
/// positions through for diagnostics, it never produces them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
