//! Block (component D): an ordered list of instruction ids terminated by
//! exactly one terminator.
//!
//! The instructions themselves live in the owning [`super::Function`]'s
//! flat value arena (§3, §9) so that an operand defined in one block can be
//! referenced from another — the language's only cross-block live state is
//! in memory variables, but the `Declare`/`Param`/`Global` *handles* used to
//! address that memory are themselves ordinary values created once and
//! read from any block (§4.F). All construction happens through
//! `Function`'s builder methods; this type only holds the resulting shape.

use crate::types::{ArithOp, DataType};

use super::BlockId;

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub instructions: Vec<super::ValueId>,
    pub(crate) terminated: bool,
}

impl Block {
    pub(crate) fn new(id: BlockId) -> Self {
        Block {
            id,
            instructions: Vec::new(),
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// The 2×2×12 arithmetic-operator/type compatibility table from §4.D: which
/// operators are legal once both operands have been unified to a common
/// type (either both-int, or with at least one float operand coerced so
/// both sides are float).
pub(crate) fn op_allowed_for(op: ArithOp, both_int: bool) -> bool {
    if op == ArithOp::Not {
        return both_int;
    }
    if both_int {
        true
    } else {
        matches!(op, ArithOp::Add | ArithOp::Sub | ArithOp::Mul | ArithOp::Div | ArithOp::Neg)
    }
}

/// Build the `%d`/`%f`/`%s` format string for a `print` argument list,
/// joined by spaces and terminated by a newline (§4.D).
pub fn print_format_string(arg_types: &[DataType]) -> String {
    let specifiers: Vec<&str> = arg_types
        .iter()
        .map(|t| match t {
            DataType::Int => "%d",
            DataType::Float => "%f",
            DataType::String => "%s",
            DataType::VaList | DataType::Unknown => unreachable!("builder misuse: non-printable print argument type"),
        })
        .collect();
    format!("{}\n", specifiers.join(" "))
}
