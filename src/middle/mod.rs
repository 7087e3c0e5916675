//! The middle end: the lightweight IR, its construction from an AST, and
//! the liveness analysis that feeds register allocation.

pub mod ir;
pub mod liveness;
pub mod printer;

pub use ir::lower_program;
