//! The aarch64 emitter (component I, §4.I): walks each function's
//! already-allocated LIR and produces textual assembly, plus the implicit
//! `main` and the `.data` section.
//!
//! Everything here assumes liveness and register allocation have already
//! run over every function in the module (every value whose kind consumes a
//! physical register has `hw_reg.is_some()`); this module never allocates
//! registers itself.

pub mod writer;

use crate::common::{Id, Map};
use crate::config::CompileConfig;
use crate::error::CompileError;
use crate::middle::ir::{BlockId, ConstValue, DataType, Function, Module, ModuleId, RelOp, ValueData, ValueId};
use crate::types::{ArithOp, PhysReg, RegBank};

use super::regfile::RegisterFile;
use writer::AsmWriter;

const WORD: i64 = 8;

fn round_up_16(v: i64) -> i64 {
    (v + 15) / 16 * 16
}

/// A function's stack-frame layout (§4.I): every parameter and local gets a
/// fixed negative-from-FP slot, assigned once up front regardless of
/// whether the parameter arrived in a register or on the caller's stack —
/// the prologue copies both into this uniform area.
struct Frame {
    size: i64,
    nparams: i64,
}

impl Frame {
    fn compute(func: &Function) -> Frame {
        let nparams = func.params.len() as i64;
        let nlocals = func.local_count as i64;
        let size = round_up_16(WORD * (nparams + nlocals + 2));
        Frame { size, nparams }
    }

    fn param_offset(&self, index: u32) -> i64 {
        -(WORD * (index as i64 + 3))
    }

    fn local_offset(&self, seq: u32) -> i64 {
        -(WORD * (seq as i64 + 3 + self.nparams))
    }

    /// Offset, from this frame's own FP, of the `ov`-th (0-based) overflow
    /// argument of `bank` in a CALL this function is *receiving* — i.e.
    /// where the caller left it before `bl`. Ints fill first, floats after,
    /// matching `plan_overflow_offset` at call sites (an implementation
    /// choice; the source material under-specifies this interleaving — see
    /// DESIGN.md).
    fn incoming_overflow_offset(&self, bank: RegBank, ov: i64, total_int_overflow: i64) -> i64 {
        let base = match bank {
            RegBank::Int => ov,
            RegBank::Float => total_int_overflow + ov,
        };
        base * WORD - self.size
    }
}

fn block_label(func: &Function, block: BlockId) -> String {
    format!(".L{}_{}", func.name, block.0)
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

struct Labels {
    consts: Map<ModuleId, String>,
    strings: Map<ModuleId, String>,
}

impl Labels {
    /// The data-segment label for a constant already interned by `lower`
    /// (every constant reaching emission was interned at construction time,
    /// §4.B), looked up by value rather than by id since a `Value` only
    /// carries the `ConstValue`, not the module id it was interned under.
    fn const_label(&self, module: &Module, cv: ConstValue) -> String {
        let id = module.constant_id(cv).expect("constant was not interned during lowering");
        self.consts[&id].clone()
    }
}

fn build_labels(module: &Module) -> Labels {
    let mut consts = Map::new();
    for (i, (id, _)) in module.constants_in_order().enumerate() {
        consts.insert(id, format!("_CONST_{i}"));
    }
    let mut strings = Map::new();
    for (i, (id, _)) in module.string_literals_in_order().enumerate() {
        strings.insert(id, format!("_STR_{i}"));
    }
    Labels { consts, strings }
}

/// Entry point: emit a whole module, including the implicit `main` that
/// dispatches to `entry`, as one assembly file.
pub fn emit_module(module: &Module, entry: Id, config: &CompileConfig) -> Result<String, CompileError> {
    let entry_func = module.get_function(entry).expect("driver resolved entry function name before calling the emitter");
    let labels = build_labels(module);
    let regfile = RegisterFile;

    let mut w = AsmWriter::new();
    w.directive(".arch armv8-a");
    w.directive(format!(".file \"{}\"", basename(&config.source_path)));
    w.directive(".text");
    w.directive(".global main");
    w.directive(".type main, %function");
    w.blank();

    let argc_err = emit_main(&mut w, &regfile, entry_func);

    for func in module.functions_in_order() {
        w.blank();
        emit_function(&mut w, module, &regfile, &labels, func);
    }

    w.blank();
    emit_data_section(&mut w, module, &labels, &argc_err);

    Ok(w.into_string())
}

// -- function bodies -----------------------------------------------------

fn reg(regfile: &RegisterFile, hw: Option<PhysReg>) -> &'static str {
    regfile.name_of(hw.expect("value must be allocated a register before emission"))
}

fn emit_function(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, labels: &Labels, func: &Function) {
    let frame = Frame::compute(func);

    w.directive(format!(".global {}", func.name));
    w.directive(format!(".type {}, %function", func.name));
    w.label(func.name);

    w.instr(format!("sub sp, sp, #{}", frame.size));
    w.instr(format!("stp x29, x30, [sp, #{}]", frame.size - 16));
    w.instr(format!("add x29, sp, #{}", frame.size));

    emit_param_spills(w, regfile, func, &frame);

    for block in func.blocks() {
        w.label(block_label(func, block.id));
        for &id in &block.instructions {
            emit_value(w, module, regfile, func, &frame, labels, id);
        }
    }
}

fn global_symbol_name(module: &Module, global: ModuleId) -> Id {
    module.global_name_by_id(global).expect("builder misuse: Global value references an id the module never declared")
}

/// Copy every parameter into its frame slot: register-passed parameters are
/// spilled directly; stack-passed ones are loaded from the caller's
/// overflow area first (§4.I).
fn emit_param_spills(w: &mut AsmWriter, regfile: &RegisterFile, func: &Function, frame: &Frame) {
    let total_int = func.params.iter().filter(|p| RegBank::from(p.ty) == RegBank::Int).count() as i64;
    let mut next_int = 0i64;
    let mut next_float = 0i64;

    for (index, param) in func.params.iter().enumerate() {
        let offset = frame.param_offset(index as u32);
        let bank = RegBank::from(param.ty);
        let bank_index = match bank {
            RegBank::Int => {
                let i = next_int;
                next_int += 1;
                i
            }
            RegBank::Float => {
                let i = next_float;
                next_float += 1;
                i
            }
        };

        if bank_index < 8 {
            let src = match bank {
                RegBank::Int => regfile.int_arg(bank_index as u8),
                RegBank::Float => regfile.float_arg(bank_index as u8),
            };
            let op = if bank == RegBank::Float { "str" } else { "str" };
            w.instr(format!("{op} {src}, [x29, #{offset}]"));
        } else {
            let ov = bank_index - 8;
            let overflow_at = frame.incoming_overflow_offset(bank, ov, (total_int - 8).max(0));
            let scratch = regfile.int_addr_scratch();
            w.instr(format!("ldr {scratch}, [x29, #{overflow_at}]"));
            w.instr(format!("str {scratch}, [x29, #{offset}]"));
        }
    }
}

fn emit_value(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, func: &Function, frame: &Frame, labels: &Labels, id: ValueId) {
    let v = func.value(id);
    let dst = v.hw_reg;

    match &v.data {
        ValueData::Declare { .. } | ValueData::Param { .. } | ValueData::Global { .. } | ValueData::StringLit { .. } | ValueData::VaList { .. } => {
            // Addressing handles only; nothing to emit for the handle
            // itself, its uses (`Load`/`Store`) carry the addressing mode.
        }

        ValueData::Constant(cv) => emit_constant(w, module, regfile, labels, reg(regfile, dst), *cv),

        ValueData::Data { op, lhs, rhs } => emit_data(w, regfile, func, reg(regfile, dst), *op, *lhs, *rhs),

        ValueData::Cast { from, to } => {
            let src = reg(regfile, func.value(*from).hw_reg);
            let dst = reg(regfile, dst);
            match to {
                DataType::Float => w.instr(format!("scvtf {dst}, {src}")),
                DataType::Int => w.instr(format!("fcvtzs {dst}, {src}")),
                _ => unreachable!("builder misuse: cast to non-numeric type"),
            }
        }

        ValueData::Load { src } => emit_load(w, module, regfile, func, frame, labels, reg(regfile, dst), *src),

        ValueData::Store { dst: target, src } => emit_store(w, module, regfile, func, frame, *target, *src),

        ValueData::Branch { target } => w.instr(format!("b {}", block_label(func, *target))),

        ValueData::CondBranch { op, cmp, then_blk: _, else_blk } => {
            let cmp_val = func.value(*cmp);
            let cmp_reg = reg(regfile, cmp_val.hw_reg);
            if cmp_val.ty == DataType::Float {
                w.instr(format!("fcmp {cmp_reg}, #0.0"));
            } else {
                w.instr(format!("cmp {cmp_reg}, #0"));
            }
            w.instr(format!("{} {}", inverse_branch_mnemonic(*op), block_label(func, *else_blk)));
        }

        ValueData::Return { value } => emit_return(w, regfile, func, frame, *value),

        ValueData::Call { callee, args } => emit_call(w, module, regfile, func, dst, *callee, args),

        ValueData::Print { format, args } => emit_print(w, module, regfile, func, labels, *format, args),

        ValueData::Preserve { src } => {
            let src_reg = reg(regfile, func.value(*src).hw_reg);
            let dst_reg = reg(regfile, dst);
            if v.ty == DataType::Float {
                w.instr(format!("fmov {dst_reg}, {src_reg}"));
            } else {
                w.instr(format!("mov {dst_reg}, {src_reg}"));
            }
        }
    }
}

fn emit_constant(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, labels: &Labels, dst: &str, cv: ConstValue) {
    if cv.fits_immediate() {
        if let ConstValue::Int(v) = cv {
            w.instr(format!("mov {dst}, #{v}"));
            return;
        }
    }
    let label = labels.const_label(module, cv);
    let scratch = regfile.int_spill_scratch();
    w.instr(format!("adrp {scratch}, {label}"));
    w.instr(format!("ldr {dst}, [{scratch}, :lo12:{label}]"));
}

fn emit_data(w: &mut AsmWriter, regfile: &RegisterFile, func: &Function, dst: &str, op: ArithOp, lhs: ValueId, rhs: Option<ValueId>) {
    let lhs_val = func.value(lhs);
    let lhs_reg = reg(regfile, lhs_val.hw_reg);
    let is_float = lhs_val.ty == DataType::Float;

    if let Some(rhs) = rhs {
        let rhs_reg = reg(regfile, func.value(rhs).hw_reg);
        if is_float {
            let mnemonic = match op {
                ArithOp::Add => "fadd",
                ArithOp::Sub => "fsub",
                ArithOp::Mul => "fmul",
                ArithOp::Div => "fdiv",
                _ => unreachable!("builder misuse: non-float operator on float operands"),
            };
            w.instr(format!("{mnemonic} {dst}, {lhs_reg}, {rhs_reg}"));
        } else {
            match op {
                ArithOp::Add => w.instr(format!("add {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Sub => w.instr(format!("sub {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Mul => w.instr(format!("mul {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Div => w.instr(format!("sdiv {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Rem => {
                    w.instr(format!("udiv {dst}, {lhs_reg}, {rhs_reg}"));
                    w.instr(format!("msub {dst}, {dst}, {rhs_reg}, {lhs_reg}"));
                }
                ArithOp::LShift => w.instr(format!("lsl {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::RShift => w.instr(format!("lsr {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Xor => w.instr(format!("eor {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Or => w.instr(format!("orr {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::And => w.instr(format!("and {dst}, {lhs_reg}, {rhs_reg}")),
                ArithOp::Neg | ArithOp::Not => unreachable!("builder misuse: unary operator with two operands"),
            }
        }
    } else if is_float {
        w.instr(format!("fneg {dst}, {lhs_reg}"));
    } else {
        match op {
            ArithOp::Neg => w.instr(format!("neg {dst}, {lhs_reg}")),
            ArithOp::Not => w.instr(format!("mvn {dst}, {lhs_reg}")),
            _ => unreachable!("builder misuse: binary operator with one operand"),
        }
    }
}

fn inverse_branch_mnemonic(op: RelOp) -> &'static str {
    match op {
        RelOp::Eq => "b.ne",
        RelOp::Neq => "b.eq",
        RelOp::LessThan => "b.ge",
        RelOp::LessThanOrEqual => "b.gt",
        RelOp::GreaterThan => "b.le",
        RelOp::GreaterThanOrEqual => "b.lt",
    }
}

fn emit_load(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, func: &Function, frame: &Frame, labels: &Labels, dst: &str, src: ValueId) {
    match &func.value(src).data {
        ValueData::Declare { seq } => w.instr(format!("ldr {dst}, [x29, #{}]", frame.local_offset(*seq))),
        ValueData::Param { index } => w.instr(format!("ldr {dst}, [x29, #{}]", frame.param_offset(*index))),
        ValueData::Global { global } => {
            let name = global_symbol_name(module, *global);
            w.instr(format!("adrp x0, {name}"));
            w.instr(format!("ldr {dst}, [x0, :lo12:{name}]"));
        }
        ValueData::StringLit { string } => {
            let label = &labels.strings[string];
            w.instr(format!("adrp {dst}, {label}"));
            w.instr(format!("add {dst}, {dst}, :lo12:{label}"));
        }
        other => unreachable!("builder misuse: load source is not an addressable handle: {other:?}"),
    }
}

fn emit_store(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, func: &Function, frame: &Frame, target: ValueId, src: ValueId) {
    let src_reg = reg(regfile, func.value(src).hw_reg);
    match &func.value(target).data {
        ValueData::Declare { seq } => w.instr(format!("str {src_reg}, [x29, #{}]", frame.local_offset(*seq))),
        ValueData::Param { index } => w.instr(format!("str {src_reg}, [x29, #{}]", frame.param_offset(*index))),
        ValueData::Global { global } => {
            let name = global_symbol_name(module, *global);
            let scratch = regfile.int_spill_scratch();
            w.instr(format!("adrp {scratch}, {name}"));
            w.instr(format!("str {src_reg}, [{scratch}, :lo12:{name}]"));
        }
        other => unreachable!("builder misuse: store destination is not storable: {other:?}"),
    }
}

fn emit_return(w: &mut AsmWriter, regfile: &RegisterFile, func: &Function, frame: &Frame, value: ValueId) {
    let val = func.value(value);
    let bank = RegBank::from(func.ret_ty);
    let want = PhysReg::arg(bank, 0);
    let have = val.hw_reg.expect("return operand must be allocated");

    if val.ty != func.ret_ty {
        let src = reg(regfile, Some(have));
        let dst_name = regfile.name_of(want);
        match func.ret_ty {
            DataType::Float => w.instr(format!("scvtf {dst_name}, {src}")),
            DataType::Int => w.instr(format!("fcvtzs {dst_name}, {src}")),
            _ => unreachable!("builder misuse: non-numeric return type"),
        }
    } else if have != want {
        let src = reg(regfile, Some(have));
        let dst_name = regfile.name_of(want);
        if bank == RegBank::Float {
            w.instr(format!("fmov {dst_name}, {src}"));
        } else {
            w.instr(format!("mov {dst_name}, {src}"));
        }
    }

    w.instr(format!("ldp x29, x30, [sp, #{}]", frame.size - 16));
    w.instr(format!("add sp, sp, #{}", frame.size));
    w.instr("ret");
}

// -- calls and variadic printf ------------------------------------------

/// Where one argument's value comes from, before it is moved into its
/// final register or stack slot (§4.I's function-call lowering).
enum ArgSource {
    /// A value already produced in `func`'s arena.
    Value(ValueId),
    /// A symbol whose address must be materialized (`adrp`/`add`) — used
    /// for `print`'s format string.
    Address(String),
    /// A value already sitting at a frame offset from the *current*
    /// function's FP — used only by the implicit `main`, whose parsed
    /// arguments live in ordinary stack slots rather than LIR values.
    Slot(i64),
}

struct ArgPlan {
    source: ArgSource,
    /// The target bank at the call site, after any int/float cast §4.I
    /// step 3 requires.
    bank: RegBank,
}

enum ArgDest {
    Reg(PhysReg),
    Stack(i64),
}

/// §4.I's function-call lowering, steps 1-5 and 7 (step 6, preserving a
/// call's result across a later call, is the caller's job once the result
/// returns — see `emit_call`).
fn emit_call_sequence(w: &mut AsmWriter, regfile: &RegisterFile, func: &Function, plans: &[ArgPlan], label: &str) {
    let ni = plans.iter().filter(|p| p.bank == RegBank::Int).count() as i64;
    let nf = plans.iter().filter(|p| p.bank == RegBank::Float).count() as i64;
    let overflow_ni = (ni - 8).max(0);
    let overflow_nf = (nf - 8).max(0);
    let stack_bytes = round_up_16((overflow_ni + overflow_nf) * WORD);

    if stack_bytes > 0 {
        w.instr(format!("sub sp, sp, #{stack_bytes}"));
    }

    let mut next_int = 0i64;
    let mut next_float = 0i64;
    let mut assigned: Vec<(&ArgPlan, ArgDest)> = Vec::with_capacity(plans.len());
    for plan in plans {
        let (idx, bank) = match plan.bank {
            RegBank::Int => {
                let i = next_int;
                next_int += 1;
                (i, RegBank::Int)
            }
            RegBank::Float => {
                let i = next_float;
                next_float += 1;
                (i, RegBank::Float)
            }
        };
        let dest = if idx < 8 {
            ArgDest::Reg(PhysReg::arg(bank, idx as u8))
        } else {
            let ov = idx - 8;
            let word_index = match bank {
                RegBank::Int => ov,
                RegBank::Float => overflow_ni + ov,
            };
            ArgDest::Stack(word_index * WORD)
        };
        assigned.push((plan, dest));
    }

    // Step 4: the first argument of each bank doubles as cast scratch for
    // every other argument, so it must be moved into place last.
    let (deferred, rest): (Vec<_>, Vec<_>) = assigned.into_iter().partition(|(_, dest)| matches!(dest, ArgDest::Reg(r) if r.index == 0));

    for (plan, dest) in rest.into_iter().chain(deferred.into_iter()) {
        emit_one_arg(w, regfile, func, plan, &dest);
    }

    w.instr(format!("bl {label}"));

    if stack_bytes > 0 {
        w.instr(format!("add sp, sp, #{stack_bytes}"));
    }
}

fn emit_one_arg(w: &mut AsmWriter, regfile: &RegisterFile, func: &Function, plan: &ArgPlan, dest: &ArgDest) {
    match &plan.source {
        ArgSource::Value(id) => {
            let v = func.value(*id);
            let src_bank = RegBank::from(v.ty);
            let src_name = reg(regfile, v.hw_reg);
            match dest {
                ArgDest::Reg(r) => emit_move_or_cast(w, src_bank, plan.bank, src_name, regfile.name_of(*r)),
                ArgDest::Stack(off) => {
                    let scratch = overflow_scratch(regfile, plan.bank);
                    emit_move_or_cast(w, src_bank, plan.bank, src_name, scratch);
                    w.instr(format!("str {scratch}, [sp, #{off}]"));
                }
            }
        }
        ArgSource::Address(label) => match dest {
            ArgDest::Reg(r) => {
                let dst_name = regfile.name_of(*r);
                w.instr(format!("adrp {dst_name}, {label}"));
                w.instr(format!("add {dst_name}, {dst_name}, :lo12:{label}"));
            }
            ArgDest::Stack(off) => {
                let scratch = regfile.int_addr_scratch();
                w.instr(format!("adrp {scratch}, {label}"));
                w.instr(format!("add {scratch}, {scratch}, :lo12:{label}"));
                w.instr(format!("str {scratch}, [sp, #{off}]"));
            }
        },
        ArgSource::Slot(offset) => match dest {
            ArgDest::Reg(r) => {
                let dst_name = regfile.name_of(*r);
                w.instr(format!("ldr {dst_name}, [x29, #{offset}]"));
            }
            ArgDest::Stack(off) => {
                let scratch = overflow_scratch(regfile, plan.bank);
                w.instr(format!("ldr {scratch}, [x29, #{offset}]"));
                w.instr(format!("str {scratch}, [sp, #{off}]"));
            }
        },
    }
}

fn overflow_scratch(regfile: &RegisterFile, bank: RegBank) -> &'static str {
    match bank {
        RegBank::Int => regfile.int_addr_scratch(),
        RegBank::Float => regfile.float_spill_scratch(),
    }
}

fn emit_move_or_cast(w: &mut AsmWriter, src_bank: RegBank, dst_bank: RegBank, src_name: &str, dst_name: &str) {
    if src_bank == dst_bank {
        if dst_bank == RegBank::Float {
            w.instr(format!("fmov {dst_name}, {src_name}"));
        } else {
            w.instr(format!("mov {dst_name}, {src_name}"));
        }
    } else if dst_bank == RegBank::Int {
        w.instr(format!("fcvtzs {dst_name}, {src_name}"));
    } else {
        w.instr(format!("scvtf {dst_name}, {src_name}"));
    }
}

fn emit_call(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, func: &Function, dst: Option<PhysReg>, callee: ModuleId, args: &[ValueId]) {
    let callee_name = module.function_name_by_id(callee).expect("builder misuse: Call references an id the module never declared");
    let callee_func = module.get_function(callee_name).expect("function table and id index disagree");

    let plans: Vec<ArgPlan> = args
        .iter()
        .zip(callee_func.params.iter())
        .map(|(a, p)| ArgPlan { source: ArgSource::Value(*a), bank: RegBank::from(p.ty) })
        .collect();
    emit_call_sequence(w, regfile, func, &plans, callee_name.as_str());

    let ret_bank = RegBank::from(callee_func.ret_ty);
    let want = PhysReg::arg(ret_bank, 0);
    if let Some(have) = dst {
        if have != want {
            emit_move_or_cast(w, ret_bank, ret_bank, regfile.name_of(want), regfile.name_of(have));
        }
    }
}

fn emit_print(w: &mut AsmWriter, module: &Module, regfile: &RegisterFile, func: &Function, labels: &Labels, format: ModuleId, args: &[ValueId]) {
    let _ = module;
    let mut plans = vec![ArgPlan { source: ArgSource::Address(labels.strings[&format].clone()), bank: RegBank::Int }];
    plans.extend(args.iter().map(|a| ArgPlan { source: ArgSource::Value(*a), bank: RegBank::from(func.value(*a).ty) }));
    emit_call_sequence(w, regfile, func, &plans, "printf");
}

// -- implicit main --------------------------------------------------------

/// An out-of-band `.data` entry the implicit `main` needs but that doesn't
/// belong to the module's own string/constant pools (it's assembled purely
/// from `entry`'s parameter count, at emission time).
struct ArgcErrEntry {
    label: &'static str,
    text: String,
}

/// Generates `main`: argument-count check, per-parameter `atoi`/`atof`
/// parsing, dispatch to `entry`, and an int-casting exit (§4.I).
fn emit_main(w: &mut AsmWriter, regfile: &RegisterFile, entry: &Function) -> ArgcErrEntry {
    let nparams = entry.params.len() as i64;
    // Locals, in order: argc, argv, then one parsed-argument slot per
    // parameter. Reuses the function frame formula with zero declared
    // parameters of its own.
    let nlocals = 2 + nparams;
    let size = round_up_16(WORD * (nlocals + 2));
    let argc_off = -(WORD * 3);
    let argv_off = -(WORD * 4);
    let param_slot = |i: i64| -(WORD * (i + 5));

    w.label("main");
    w.instr(format!("sub sp, sp, #{size}"));
    w.instr(format!("stp x29, x30, [sp, #{}]", size - 16));
    w.instr(format!("add x29, sp, #{size}"));

    w.instr(format!("str x0, [x29, #{argc_off}]"));
    w.instr(format!("str x1, [x29, #{argv_off}]"));

    let expected = nparams + 1;
    w.instr(format!("ldr x0, [x29, #{argc_off}]"));
    w.instr(format!("cmp x0, #{expected}"));
    w.instr("b.eq .Lmain_argc_ok");

    w.instr(format!("ldr x1, [x29, #{argc_off}]"));
    w.instr("adrp x0, _argc_err_fmt");
    w.instr("add x0, x0, :lo12:_argc_err_fmt");
    w.instr("bl printf");
    w.instr("mov x0, #1");
    w.instr("bl exit");
    w.label(".Lmain_argc_ok");

    for (i, param) in entry.params.iter().enumerate() {
        let i = i as i64;
        let slot = param_slot(i);
        w.instr(format!("ldr x9, [x29, #{argv_off}]"));
        w.instr(format!("ldr x0, [x9, #{}]", (i + 1) * WORD));
        match param.ty {
            DataType::Int => {
                w.instr("bl atoi");
                w.instr(format!("str x0, [x29, #{slot}]"));
            }
            DataType::Float => {
                w.instr("bl atof");
                w.instr(format!("str d0, [x29, #{slot}]"));
            }
            other => unreachable!("builder misuse: non-numeric entry parameter type {other:?}"),
        }
    }

    let plans: Vec<ArgPlan> = entry
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| ArgPlan { source: ArgSource::Slot(param_slot(i as i64)), bank: RegBank::from(p.ty) })
        .collect();
    emit_call_sequence(w, regfile, entry, &plans, entry.name.as_str());

    if entry.ret_ty == DataType::Float {
        w.instr("fcvtzs x0, d0");
    }

    w.instr(format!("ldp x29, x30, [sp, #{}]", size - 16));
    w.instr(format!("add sp, sp, #{size}"));
    w.instr("ret");

    ArgcErrEntry {
        label: "_argc_err_fmt",
        text: format!("Argument error: expected {nparams} arguments, got %d\n"),
    }
}

// -- data section -----------------------------------------------------------

fn emit_data_section(w: &mut AsmWriter, module: &Module, labels: &Labels, argc_err: &ArgcErrEntry) {
    w.directive(".data");

    for global in module.globals_in_order() {
        w.label(global.name);
        w.directive("    .xword 0x0");
    }

    for (id, text) in module.string_literals_in_order() {
        w.label(&labels.strings[&id]);
        w.directive(format!("    .asciz \"{}\"", escape(text)));
    }

    for (id, cv) in module.constants_in_order() {
        let label = &labels.consts[&id];
        let hex = match cv {
            ConstValue::Int(v) => format!("{:#x}", v as u64),
            ConstValue::Float(v) => format!("{:#x}", v.to_bits()),
        };
        w.label(label);
        w.directive(format!("    .xword {hex}"));
    }

    w.label(argc_err.label);
    w.directive(format!("    .asciz \"{}\"", escape(&argc_err.text)));

    w.label("_printf_fmt_int");
    w.directive("    .asciz \"%d\"");
    w.label("_printf_fmt_float");
    w.directive("    .asciz \"%f\"");
    w.label("_printf_fmt_string");
    w.directive("    .asciz \"%s\"");
    w.label("_printf_fmt_newline");
    w.directive("    .asciz \"\\n\"");
}

/// Escape `text` for embedding in a `.asciz` directive: backslashes and
/// quotes first (so the escapes just introduced aren't themselves
/// re-escaped), then control characters the assembler expects as two-char
/// escapes rather than raw bytes.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}
