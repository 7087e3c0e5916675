//! The abstract syntax tree (§6).
//!
//! Lexing, parsing, and syntactic validation are external collaborators:
//! this module only defines the shape of the already-validated tree that
//! they hand to [`crate::middle::lower`]. Each node carries the optional
//! source position the front end attached to it, forwarded into
//! diagnostics but otherwise inert.

use crate::common::{Id, Pos};
use crate::types::{ArithOp, DataType, RelOp};

/// The root of a translation unit: an ordered list of top-level items.
/// Declarations and functions may be interleaved; [`crate::middle::lower`]
/// makes two passes so a function may call one declared later in this list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Item {
    Global(Declaration),
    Function(Function),
}

/// A single typed declaration: a global variable, or a local inside a
/// function body. Only `Int` and `Float` are legal declaration types.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Declaration {
    pub name: Id,
    pub ty: DataType,
    pub pos: Pos,
}

/// An entry of a `TYPED_VARIABLE_LIST` — a function parameter.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TypedParam {
    pub name: Id,
    pub ty: DataType,
    pub pos: Pos,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Function {
    pub name: Id,
    pub params: Vec<TypedParam>,
    pub ret: DataType,
    pub body: Block,
    pub pos: Pos,
}

/// A `BLOCK` node: a lexical scope containing an ordered list of
/// statements.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Stmt {
    /// A local `DECLARATION` nested inside a function body.
    Declaration(Declaration),
    /// `ASSIGNMENT_STATEMENT`.
    Assignment { target: Id, value: Expr, pos: Pos },
    /// `PRINT_STATEMENT`: a comma-separated argument list.
    Print { args: Vec<Expr>, pos: Pos },
    /// `IF_STATEMENT`, with an optional `else` block.
    If {
        cond: Relation,
        then_block: Block,
        else_block: Option<Block>,
        pos: Pos,
    },
    /// `WHILE_STATEMENT`.
    While { cond: Relation, body: Block, pos: Pos },
    /// `RETURN_STATEMENT`. The language requires every function to return a
    /// value of its declared return type.
    Return { value: Expr, pos: Pos },
    /// `continue`, which jumps to the innermost enclosing loop's head.
    Continue { pos: Pos },
    /// `NULL_STATEMENT`: an explicit no-op, e.g. an empty `;`.
    Null,
}

/// A `RELATION`: the guard of an `if` or `while`, always a comparison.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Relation {
    pub op: RelOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Str(String),
    Identifier(Id),
    Unary {
        op: ArithOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    Call {
        callee: Id,
        args: Vec<Expr>,
        pos: Pos,
    },
}
