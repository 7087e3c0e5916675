//! Function & parameter (component C), and the LIR builders (component D).
//!
//! Every builder here assumes it is being driven by [`crate::middle::lower`]
//! over an already-validated tree. A call that violates a structural
//! invariant — wrong operand kind, appending after termination, dividing by
//! a literal zero — is **builder misuse**: a compiler defect, not a user
//! error, and it panics (§7, §9). The one exception is call-site argument
//! count, which depends on the user's source and is surfaced as a
//! [`crate::error::CompileError`] instead.

use crate::common::{Id, Pos};
use crate::error::CompileError;
use crate::types::{ArithOp, DataType, InstKind, RelOp};

use super::block::{op_allowed_for, Block};
use super::value::ConstValue;
use super::{BlockId, ModuleId, Value, ValueData, ValueId};

/// A declared formal parameter, in declaration order (§4.C).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: Id,
    pub ty: DataType,
}

/// A function: an ordered parameter list, a flat value arena shared by
/// every block, an ordered block list (block 0 is always the entry block),
/// and the return type (§4.C). `Int`/`Float` are the only representable
/// return types.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Function {
    /// Module-scoped id, assigned at `create_function` time, used as the
    /// `callee` of a `Call` value (§3).
    pub id: ModuleId,
    pub name: Id,
    pub params: Vec<Param>,
    pub ret_ty: DataType,
    pub blocks: Vec<Block>,
    pub values: Vec<Value>,
    /// Number of `DeclareInstruction`s created so far, used as the next
    /// local's sequence number for stack-slot layout (§4.I).
    pub local_count: u32,
}

impl Function {
    pub fn new(id: ModuleId, name: Id, params: Vec<Param>, ret_ty: DataType) -> Self {
        assert!(matches!(ret_ty, DataType::Int | DataType::Float), "builder misuse: function return type must be int or float");
        Function {
            id,
            name,
            params,
            ret_ty,
            blocks: Vec::new(),
            values: Vec::new(),
            local_count: 0,
        }
    }

    /// Append a fresh, empty block and return its id. The first call
    /// produces the entry block (id 0, §4.C).
    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id));
        id
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn is_terminated(&self, id: BlockId) -> bool {
        self.blocks[id.0 as usize].terminated
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.0 as usize]
    }

    pub fn get_param(&self, index: u32) -> Option<&Param> {
        self.params.get(index as usize)
    }

    pub fn param_index(&self, name: Id) -> Option<u32> {
        self.params.iter().position(|p| p.name == name).map(|i| i as u32)
    }

    /// Reserve the next local sequence number for a new `DeclareInstruction`
    /// (§4.I's stack-slot layout uses this order).
    pub fn next_local_seq(&mut self) -> u32 {
        let seq = self.local_count;
        self.local_count += 1;
        seq
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.values.iter_mut()
    }

    // -- builders -----------------------------------------------------

    fn push(&mut self, at: BlockId, name: impl Into<String>, kind: InstKind, ty: DataType, data: ValueData) -> ValueId {
        assert!(!self.blocks[at.0 as usize].terminated, "builder misuse: append after block termination");
        let id = ValueId(self.values.len() as u32);
        let terminates = data.is_terminator();
        self.values.push(Value {
            id,
            name: crate::common::id(name),
            kind,
            ty,
            enabled: true,
            hw_reg: None,
            data,
        });
        self.blocks[at.0 as usize].instructions.push(id);
        if terminates {
            self.blocks[at.0 as usize].terminated = true;
        }
        id
    }

    fn require_value_producing(&self, id: ValueId) {
        let v = self.value(id);
        assert!(
            v.kind.is_value_producing(),
            "builder misuse: operand {:?} of kind {:?} is not value-producing",
            id,
            v.kind
        );
    }

    /// Build a `const` in block `at`. The caller is also responsible for
    /// mirroring it into the module's constant pool (`Module::intern_constant`),
    /// which `lower` does immediately after.
    pub fn build_const(&mut self, at: BlockId, value: ConstValue) -> ValueId {
        let ty = value.ty();
        self.push(at, format!("%const.{:?}", value), InstKind::Constant, ty, ValueData::Constant(value))
    }

    pub fn build_declare(&mut self, at: BlockId, name: Id, ty: DataType) -> ValueId {
        assert!(matches!(ty, DataType::Int | DataType::Float), "builder misuse: declare type must be int or float");
        let seq = self.next_local_seq();
        self.push(at, name.as_str(), InstKind::DeclareInstruction, ty, ValueData::Declare { seq })
    }

    pub fn build_param_ref(&mut self, at: BlockId, name: Id, ty: DataType, index: u32) -> ValueId {
        self.push(at, name.as_str(), InstKind::Param, ty, ValueData::Param { index })
    }

    pub fn build_global_ref(&mut self, at: BlockId, name: Id, ty: DataType, global: ModuleId) -> ValueId {
        self.push(at, name.as_str(), InstKind::Global, ty, ValueData::Global { global })
    }

    pub fn build_string_ref(&mut self, at: BlockId, string: ModuleId) -> ValueId {
        self.push(at, "%str", InstKind::Global, DataType::String, ValueData::StringLit { string })
    }

    /// An implicit cast, inserted by another builder when operand types
    /// disagree (§4.D).
    fn build_cast(&mut self, at: BlockId, from: ValueId, to: DataType) -> ValueId {
        self.require_value_producing(from);
        self.push(at, "%cast", InstKind::CastInstruction, to, ValueData::Cast { from, to })
    }

    /// Binary or unary arithmetic (§4.D). Unary operators (`Neg`, `Not`)
    /// pass `rhs = None`. Implicit `IntToFloat` casts are inserted when the
    /// two operand types disagree.
    pub fn build_data(&mut self, at: BlockId, op: ArithOp, lhs: ValueId, rhs: Option<ValueId>) -> ValueId {
        self.require_value_producing(lhs);
        if let Some(r) = rhs {
            self.require_value_producing(r);
        }
        assert_eq!(op.is_unary(), rhs.is_none(), "builder misuse: unary/binary operand count mismatch for {op:?}");

        let lhs_ty = self.value(lhs).ty;
        let (lhs, rhs, result_ty) = match rhs {
            None => (lhs, None, lhs_ty),
            Some(r) => {
                let rhs_ty = self.value(r).ty;
                if lhs_ty == rhs_ty {
                    (lhs, Some(r), lhs_ty)
                } else {
                    assert!(
                        lhs_ty.is_numeric() && rhs_ty.is_numeric(),
                        "builder misuse: arithmetic on non-numeric operand"
                    );
                    if lhs_ty == DataType::Int {
                        let cast = self.build_cast(at, lhs, DataType::Float);
                        (cast, Some(r), DataType::Float)
                    } else {
                        let cast = self.build_cast(at, r, DataType::Float);
                        (lhs, Some(cast), DataType::Float)
                    }
                }
            }
        };

        let both_int = result_ty == DataType::Int;
        assert!(op_allowed_for(op, both_int), "builder misuse: operator {op:?} not defined for {result_ty:?} operands");

        if matches!(op, ArithOp::Div | ArithOp::Rem) {
            if let ValueData::Constant(ConstValue::Int(0)) = self.value(rhs.unwrap()).data {
                panic!("builder misuse: division by literal zero");
            }
        }

        self.push(at, format!("%{op}"), InstKind::DataInstruction, result_ty, ValueData::Data { op, lhs, rhs })
    }

    fn dest_kind_ok(&self, id: ValueId) -> bool {
        matches!(self.value(id).kind, InstKind::Global | InstKind::Param | InstKind::DeclareInstruction)
    }

    /// Store `src` into `dst` (§4.D). `dst` must be a `Global`, `Param`, or
    /// `DeclareInstruction`; a type mismatch inserts an implicit cast on
    /// `src`.
    pub fn build_store(&mut self, at: BlockId, dst: ValueId, src: ValueId) -> ValueId {
        self.require_value_producing(src);
        assert!(self.dest_kind_ok(dst), "builder misuse: store destination must be global, param, or declared local");

        let dst_ty = self.value(dst).ty;
        let src_ty = self.value(src).ty;
        let src = if dst_ty == src_ty { src } else { self.build_cast(at, src, dst_ty) };

        self.push(at, "%store", InstKind::StoreInstruction, dst_ty, ValueData::Store { dst, src })
    }

    /// Load from a `Global`, `Param`, or `DeclareInstruction` source.
    pub fn build_load(&mut self, at: BlockId, src: ValueId) -> ValueId {
        assert!(self.dest_kind_ok(src), "builder misuse: load source must be global, param, or declared local");
        let ty = self.value(src).ty;
        self.push(at, "%load", InstKind::LoadInstruction, ty, ValueData::Load { src })
    }

    /// Conditional branch; terminates the block (§4.D). `cmp` is the
    /// subtraction result compared against zero (§4.E).
    pub fn build_cond_branch(&mut self, at: BlockId, op: RelOp, cmp: ValueId, then_blk: BlockId, else_blk: BlockId) -> ValueId {
        self.require_value_producing(cmp);
        self.push(
            at,
            "%br.cond",
            InstKind::BranchInstruction,
            DataType::Unknown,
            ValueData::CondBranch { op, cmp, then_blk, else_blk },
        )
    }

    /// Unconditional branch; terminates the block.
    pub fn build_branch(&mut self, at: BlockId, target: BlockId) -> ValueId {
        self.push(at, "%br", InstKind::BranchInstruction, DataType::Unknown, ValueData::Branch { target })
    }

    /// Return; terminates the block.
    pub fn build_return(&mut self, at: BlockId, value: ValueId) -> ValueId {
        self.require_value_producing(value);
        let ty = self.value(value).ty;
        self.push(at, "%ret", InstKind::ReturnInstruction, ty, ValueData::Return { value })
    }

    /// Call a module-scoped function. Argument-count mismatch is a
    /// user-facing [`CompileError`], not a panic (§7).
    #[allow(clippy::too_many_arguments)]
    pub fn build_call(
        &mut self,
        at: BlockId,
        callee: ModuleId,
        callee_name: Id,
        expected_args: usize,
        ret_ty: DataType,
        args: Vec<ValueId>,
        pos: Pos,
    ) -> Result<ValueId, CompileError> {
        for a in &args {
            self.require_value_producing(*a);
        }
        if args.len() != expected_args {
            return Err(CompileError::ArgumentCountMismatch {
                callee: callee_name,
                expected: expected_args,
                actual: args.len(),
                pos,
            });
        }
        Ok(self.push(at, format!("%call.{callee_name}"), InstKind::FunctionCallInstruction, ret_ty, ValueData::Call { callee, args }))
    }

    /// `print`: the caller has already built the format string and interned
    /// it into the module; this just appends the `PrintInstruction` over
    /// the already-lowered argument values (§4.D).
    pub fn build_print(&mut self, at: BlockId, format: ModuleId, args: Vec<ValueId>) -> ValueId {
        for a in &args {
            self.require_value_producing(*a);
        }
        self.push(at, "%print", InstKind::PrintInstruction, DataType::Int, ValueData::Print { format, args })
    }
}
