//! The LIR operand abstraction (§3's "Value").

use crate::common::Id;
use crate::types::{ArithOp, DataType, InstKind, PhysReg, RelOp};

use super::{BlockId, ModuleId, ValueId};

/// A materialized constant. Interned into the owning block and mirrored into
/// the module's constant pool (§4.B) for possible data-segment placement.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

impl ConstValue {
    pub fn ty(self) -> DataType {
        match self {
            ConstValue::Int(_) => DataType::Int,
            ConstValue::Float(_) => DataType::Float,
        }
    }

    /// Whether this constant fits a 12-bit signed immediate (§4.I): the
    /// emitter materializes it with `mov` instead of a data-segment entry.
    pub fn fits_immediate(self) -> bool {
        matches!(self, ConstValue::Int(v) if (-2048..=2047).contains(&v))
    }
}

/// A single LIR instruction/operand, one element of a function's value
/// arena. `id`/`name`/`kind`/`ty`/`enabled`/`hw_reg` are the common header
/// every operand carries (§3); `data` is the kind-specific payload.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub name: Id,
    pub kind: InstKind,
    pub ty: DataType,
    /// Suppresses emission without structurally removing the instruction,
    /// so a rewriting pass (e.g. preserve insertion) never has to
    /// renumber or re-link surrounding instructions.
    pub enabled: bool,
    /// Filled in by register allocation; `None` before allocation runs, and
    /// for kinds that never occupy a physical register.
    pub hw_reg: Option<PhysReg>,
    pub data: ValueData,
}

impl Value {
    pub fn operands(&self) -> [Option<ValueId>; 2] {
        self.data.operands()
    }
}

/// The kind-specific payload of a [`Value`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ValueData {
    /// An interned constant (`InstKind::Constant`).
    Constant(ConstValue),
    /// A local variable declared with `create_declare` (`DeclareInstruction`).
    /// `seq` is the declaration order used to compute the stack slot (§4.I).
    Declare { seq: u32 },
    /// A reference to the `index`-th function parameter (`Param`).
    Param { index: u32 },
    /// A use, within this function, of a module-scoped global (`Global`).
    Global { global: ModuleId },
    /// A use, within this function, of a module-scoped string literal.
    /// Distinct from `Global` because its emission materializes an address
    /// (`adrp`/`add`), not a load through one (§4.I).
    StringLit { string: ModuleId },
    /// Binary or unary arithmetic (`DataInstruction`). `rhs` is `None` for
    /// the unary operators `Neg`/`Not`.
    Data {
        op: ArithOp,
        lhs: ValueId,
        rhs: Option<ValueId>,
    },
    /// An implicit widening cast inserted by a builder (`CastInstruction`).
    Cast { from: ValueId, to: DataType },
    /// A load from a `Global`/`Param`/`DeclareInstruction` source
    /// (`LoadInstruction`).
    Load { src: ValueId },
    /// A store into a `Global`/`Param`/`DeclareInstruction` destination
    /// (`StoreInstruction`). Never itself an operand.
    Store { dst: ValueId, src: ValueId },
    /// An unconditional branch (`BranchInstruction`), a terminator.
    Branch { target: BlockId },
    /// A conditional branch (`BranchInstruction`), a terminator. The
    /// relation's subtraction result (`lhs - rhs`) has already been lowered
    /// to a prior `Data` instruction; `cmp` carries the operator and that
    /// instruction's id, compared against zero (§4.E).
    CondBranch {
        op: RelOp,
        cmp: ValueId,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    /// A return, a terminator (`ReturnInstruction`).
    Return { value: ValueId },
    /// A call to a module-scoped function (`FunctionCallInstruction`).
    Call { callee: ModuleId, args: Vec<ValueId> },
    /// A heterogeneous argument bundle used only to lower `printf` calls
    /// (`InstKind` tag reused from `FunctionCallInstruction`'s argument
    /// list; kept as its own variant so liveness's `ref` rule for `VaList`
    /// in §4.F has a concrete node to apply to).
    VaList { contained: Vec<ValueId> },
    /// `print` (`PrintInstruction`): builds a format string from the
    /// argument types, interns it, and is emitted as a variadic call to
    /// `printf` whose arguments are `args` (§4.D, §4.I).
    Print { format: ModuleId, args: Vec<ValueId> },
    /// Rescues a call's return register into a callee-saved register before
    /// a later call can clobber it (`PreserveInstruction`). Inserted by the
    /// register allocator, never by a lowering builder.
    Preserve { src: ValueId },
}

impl ValueData {
    pub fn kind(&self) -> InstKind {
        match self {
            ValueData::Constant(_) => InstKind::Constant,
            ValueData::Declare { .. } => InstKind::DeclareInstruction,
            ValueData::Param { .. } => InstKind::Param,
            ValueData::Global { .. } => InstKind::Global,
            ValueData::StringLit { .. } => InstKind::Global,
            ValueData::Data { .. } => InstKind::DataInstruction,
            ValueData::Cast { .. } => InstKind::CastInstruction,
            ValueData::Load { .. } => InstKind::LoadInstruction,
            ValueData::Store { .. } => InstKind::StoreInstruction,
            ValueData::Branch { .. } | ValueData::CondBranch { .. } => InstKind::BranchInstruction,
            ValueData::Return { .. } => InstKind::ReturnInstruction,
            ValueData::Call { .. } => InstKind::FunctionCallInstruction,
            ValueData::VaList { .. } => InstKind::FunctionCallInstruction,
            ValueData::Print { .. } => InstKind::PrintInstruction,
            ValueData::Preserve { .. } => InstKind::PreserveInstruction,
        }
    }

    /// Whether this value is a terminator: the last instruction of a block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            ValueData::Branch { .. } | ValueData::CondBranch { .. } | ValueData::Return { .. }
        )
    }

    /// `ref(I)` from §4.F: the function-local values this instruction reads.
    /// `Global`/`StringLit` uses and module-level `Call` callees are not
    /// virtual registers, so they never appear here.
    pub fn refs(&self) -> Vec<ValueId> {
        match self {
            ValueData::Data { lhs, rhs, .. } => {
                let mut v = vec![*lhs];
                v.extend(*rhs);
                v
            }
            ValueData::Cast { from, .. } => vec![*from],
            ValueData::Store { dst, src } => vec![*dst, *src],
            ValueData::CondBranch { cmp, .. } => vec![*cmp],
            ValueData::Return { value } => vec![*value],
            ValueData::Call { args, .. } => args.clone(),
            ValueData::VaList { contained } => contained.clone(),
            ValueData::Print { args, .. } => args.clone(),
            ValueData::Preserve { src } => vec![*src],
            ValueData::Load { .. }
            | ValueData::Declare { .. }
            | ValueData::Global { .. }
            | ValueData::StringLit { .. }
            | ValueData::Param { .. }
            | ValueData::Constant(_)
            | ValueData::Branch { .. } => vec![],
        }
    }

    /// `def(I)` from §4.F: the virtual register this instruction writes, if
    /// any.
    pub fn def(&self, id: ValueId) -> Option<ValueId> {
        match self {
            ValueData::Data { .. }
            | ValueData::Load { .. }
            | ValueData::Constant(_)
            | ValueData::Cast { .. }
            | ValueData::Call { .. }
            | ValueData::Preserve { .. } => Some(id),
            _ => None,
        }
    }

    fn operands(&self) -> [Option<ValueId>; 2] {
        match self {
            ValueData::Data { lhs, rhs } => [Some(*lhs), *rhs],
            ValueData::Cast { from, .. } => [Some(*from), None],
            ValueData::Load { src } => [Some(*src), None],
            ValueData::Store { dst, src } => [Some(*dst), Some(*src)],
            ValueData::CondBranch { cmp, .. } => [Some(*cmp), None],
            ValueData::Return { value } => [Some(*value), None],
            ValueData::Preserve { src } => [Some(*src), None],
            _ => [None, None],
        }
    }
}
