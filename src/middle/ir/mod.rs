//! The lightweight IR (LIR): components B–D of §4.
//!
//! The source describes this layer with a polymorphic "value" interface and
//! free-floating owning pointers between blocks, functions, and instructions.
//! Per §9's re-architecture notes, this is instead an arena of [`Value`]s per
//! function, addressed by [`ValueId`], plus an arena of [`Block`]s addressed
//! by [`BlockId`]; module-level entities (functions, globals, strings,
//! constants) are addressed by [`ModuleId`] out of a single counter shared
//! across the module. `ValueId`/`BlockId` spaces restart at zero in every
//! function and never collide with `ModuleId`s because the latter are offset
//! by [`MODULE_ID_BASE`].

mod block;
mod function;
mod lower;
mod module;
mod value;

pub use block::{print_format_string, Block};
pub use function::{Function, Param};
pub use lower::lower_program;
pub use module::{Global, GlobalData, Module};
pub use value::{ConstValue, Value, ValueData};

pub use crate::types::{ArithOp, DataType, InstKind, PhysReg, RegBank, RelOp};

/// Offset at which module-scoped ids start, so they never collide with a
/// function's locally-numbered [`ValueId`]/[`BlockId`] (§3).
pub const MODULE_ID_BASE: u32 = 1 << 20;

/// An id for anything module-scoped: a function, a global, a string
/// literal, or a constant-pool entry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct ModuleId(pub u32);

/// An id for a value (instruction, constant, parameter, declared local,
/// or a use of a global/string) local to one function.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValueId(pub u32);

/// An id for a basic block local to one function. The entry block is
/// always id 0 (the first block created by [`Function::create_block`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct BlockId(pub u32);
