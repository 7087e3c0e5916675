//! Types and operators (component A).
//!
//! A closed vocabulary shared by the AST, the LIR, and the emitter: data
//! types, arithmetic/relational operators, and instruction-kind tags. Each
//! enum carries a stable textual label used in LIR pretty-printing and in
//! diagnostics, so the label never has to be re-derived from the `Debug`
//! impl (which is free to change).

/// The data types a [`crate::middle::ir::Value`] can carry.
///
/// `Unknown` never appears in a well-formed program; it is a sentinel used
/// only while a value is being constructed (e.g. the destination type of a
/// `Declare` before its first store) and must not reach the emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("string")]
    String,
    #[display("valist")]
    VaList,
    #[display("unknown")]
    Unknown,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }
}

/// Binary and unary arithmetic/bitwise operators.
///
/// `Neg` and `Not` are the unary operators; the boundary between binary and
/// unary is exactly the position of `Neg` in this list, per §4.A.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display, serde::Serialize, serde::Deserialize)]
pub enum ArithOp {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("rem")]
    Rem,
    #[display("lshift")]
    LShift,
    #[display("rshift")]
    RShift,
    #[display("xor")]
    Xor,
    #[display("or")]
    Or,
    #[display("and")]
    And,
    #[display("neg")]
    Neg,
    #[display("not")]
    Not,
}

impl ArithOp {
    /// The unary operators are exactly `Neg` and `Not`; everything before
    /// `Neg` in the enum's declaration order is binary.
    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Neg | ArithOp::Not)
    }
}

/// Relational operators, used only by [`crate::front::ast::Relation`] and by
/// the conditional-branch terminator they lower to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display, serde::Serialize, serde::Deserialize)]
pub enum RelOp {
    #[display("eq")]
    Eq,
    #[display("neq")]
    Neq,
    #[display("lt")]
    LessThan,
    #[display("le")]
    LessThanOrEqual,
    #[display("gt")]
    GreaterThan,
    #[display("ge")]
    GreaterThanOrEqual,
}

impl RelOp {
    /// The relational operator that holds precisely when `self` does not —
    /// used to choose the branch-to-`else` condition in §4.I.
    pub fn inverse(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Neq,
            RelOp::Neq => RelOp::Eq,
            RelOp::LessThan => RelOp::GreaterThanOrEqual,
            RelOp::LessThanOrEqual => RelOp::GreaterThan,
            RelOp::GreaterThan => RelOp::LessThanOrEqual,
            RelOp::GreaterThanOrEqual => RelOp::LessThan,
        }
    }
}

/// Instruction-kind tags (component A), used by the builders in
/// [`crate::middle::ir::block`] to validate operand roles and by the
/// liveness pass to decide `ref`/`def` sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display, serde::Serialize, serde::Deserialize)]
pub enum InstKind {
    #[display("data")]
    DataInstruction,
    #[display("cast")]
    CastInstruction,
    #[display("load")]
    LoadInstruction,
    #[display("store")]
    StoreInstruction,
    #[display("const")]
    Constant,
    #[display("declare")]
    DeclareInstruction,
    #[display("global")]
    Global,
    #[display("param")]
    Param,
    #[display("branch")]
    BranchInstruction,
    #[display("return")]
    ReturnInstruction,
    #[display("call")]
    FunctionCallInstruction,
    #[display("preserve")]
    PreserveInstruction,
    #[display("print")]
    PrintInstruction,
}

/// Which physical-register bank a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display, serde::Serialize, serde::Deserialize)]
pub enum RegBank {
    #[display("int")]
    Int,
    #[display("float")]
    Float,
}

impl From<DataType> for RegBank {
    /// `String` values are addresses and live in the integer bank.
    fn from(ty: DataType) -> RegBank {
        match ty {
            DataType::Float => RegBank::Float,
            _ => RegBank::Int,
        }
    }
}

/// A physical register assigned by the allocator: a bank plus an index into
/// that bank's register file. The emitter (component I) maps `(bank, index)`
/// to the concrete aarch64 register name.
///
/// `is_arg` distinguishes the two disjoint index spaces a `PhysReg` can
/// address: `false` indexes a register-file temporary (x8../v8.., §4.H),
/// `true` indexes an ABI argument/return register (x0-x7/d0-d7, §4.I).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PhysReg {
    pub bank: RegBank,
    pub index: u8,
    pub is_arg: bool,
}

impl PhysReg {
    pub fn new(bank: RegBank, index: u8) -> Self {
        PhysReg { bank, index, is_arg: false }
    }

    /// The `index`-th ABI argument register of `bank` (x0-x7/d0-d7). Also
    /// used for the return-value register, which is argument slot 0.
    pub fn arg(bank: RegBank, index: u8) -> Self {
        PhysReg { bank, index, is_arg: true }
    }
}

impl InstKind {
    /// Whether a value of this kind produces a result that must occupy a
    /// physical register, i.e. it is a valid operand elsewhere (§4.D).
    pub fn is_value_producing(self) -> bool {
        matches!(
            self,
            InstKind::DataInstruction
                | InstKind::CastInstruction
                | InstKind::LoadInstruction
                | InstKind::Constant
                | InstKind::FunctionCallInstruction
                | InstKind::Global
                | InstKind::Param
                | InstKind::DeclareInstruction
        )
    }

    /// Whether register allocation must assign this kind a physical
    /// register (§4.G step 3): a strict subset of value-producing kinds,
    /// excluding the memory-resident `Global`/`Param`/`DeclareInstruction`
    /// operands, which are addressed by frame offset or symbol instead.
    pub fn consumes_physical_register(self) -> bool {
        matches!(
            self,
            InstKind::DataInstruction
                | InstKind::LoadInstruction
                | InstKind::Constant
                | InstKind::CastInstruction
                | InstKind::FunctionCallInstruction
        )
    }
}
