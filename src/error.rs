//! Error taxonomy for the compiler back end.
//!
//! Builder misuse (a malformed LIR construction request) is a compiler defect,
//! not a user-facing error: those paths panic at the call site and are never
//! turned into a [`CompileError`]. Everything a user's program can trigger —
//! unresolved names, bad argument counts, unsupported targets, an
//! uncolourable interference graph — flows through this enum instead.

use crate::common::{Id, Pos};

/// A user-facing compilation error, tagged with the pipeline stage that
/// raised it so the driver can report it without re-deriving context.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{pos}: unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: Id, pos: Pos },

    #[error("{pos}: duplicate declaration of `{name}` in the same scope")]
    DuplicateDeclaration { name: Id, pos: Pos },

    #[error("{pos}: call to `{callee}` expects {expected} argument(s), got {actual}")]
    ArgumentCountMismatch {
        callee: Id,
        expected: usize,
        actual: usize,
        pos: Pos,
    },

    #[error("{pos}: operator `{op}` is not defined for operand types {lhs:?} and {rhs:?}")]
    OperatorTypeMismatch {
        op: String,
        lhs: crate::middle::ir::DataType,
        rhs: crate::middle::ir::DataType,
        pos: Pos,
    },

    #[error("continue statement outside of any loop")]
    ContinueOutsideLoop { pos: Pos },

    #[error("control falls off the end of a branch whose sibling already returned")]
    UnreachableAfterReturn { pos: Pos },

    #[error("target {0:?} is not implemented by this backend")]
    UnsupportedTarget(crate::config::TargetArch),

    #[error("function `{0}` requires a construct not yet lowered by this backend: {1}")]
    UnsupportedFeature(Id, &'static str),

    #[error("register allocation for `{0}` needs a spill, which this allocator does not implement")]
    SpillRequired(Id),

    #[error("function `{0}` could not be coloured within the retry budget")]
    GraphUncolourable(Id),
}
