//! Register allocation (component G, §4.G): Chaitin-style simplify/select
//! over the RIG built by [`crate::middle::liveness`].
//!
//! No spilling is implemented. A node that cannot be coloured within the
//! register file's capacity fails the whole function with
//! [`CompileError::SpillRequired`]; a RIG that cannot be fully simplified
//! within the retry budget fails with [`CompileError::GraphUncolourable`].

use crate::common::Set;
use crate::error::CompileError;
use crate::middle::ir::{Function, ValueData, ValueId};
use crate::middle::liveness::{self, Liveness};
use crate::types::{PhysReg, RegBank};

use super::regfile::RegisterFile;

/// §4.G step 2's retry budget: the number of simplify rounds that may pass
/// without disabling every remaining node before giving up.
const RETRY_BUDGET: usize = 128;

/// Allocate physical registers for every value in `func` that needs one,
/// writing the result into each [`crate::middle::ir::Value::hw_reg`].
pub fn allocate(func: &mut Function) -> Result<(), CompileError> {
    let liveness = liveness::analyze(func);
    let rig = liveness::build_rig(func, &liveness);
    let regfile = RegisterFile;

    let order = simplify(func, &rig)?;
    select(func, &rig, &regfile, order)?;
    Ok(())
}

/// §4.G step 2: repeatedly disable every enabled node whose enabled-degree
/// is below its bank's threshold, pushing it onto a stack, until the graph
/// is empty. Returns the stack in disable order (so `select` pops it back
/// in the reverse, i.e. colouring-safe, order).
fn simplify(func: &Function, rig: &crate::common::Map<ValueId, Set<ValueId>>) -> Result<Vec<ValueId>, CompileError> {
    let regfile = RegisterFile;
    let mut enabled: Set<ValueId> = rig.keys().copied().collect();
    let mut stack = Vec::with_capacity(enabled.len());
    let mut stale_rounds = 0;

    while !enabled.is_empty() {
        let mut pushed_this_round = false;
        let candidates: Vec<ValueId> = enabled.iter().copied().collect();

        for id in candidates {
            if !enabled.contains(&id) {
                continue;
            }
            let bank = RegBank::from(func.value(id).ty);
            let k = match bank {
                RegBank::Int => regfile.k_i(),
                RegBank::Float => regfile.k_f(),
            };
            let degree = rig[&id].iter().filter(|n| enabled.contains(n)).count();
            if degree < k {
                enabled.remove(&id);
                stack.push(id);
                pushed_this_round = true;
            }
        }

        if pushed_this_round {
            stale_rounds = 0;
            continue;
        }

        stale_rounds += 1;
        if stale_rounds > RETRY_BUDGET {
            return Err(CompileError::GraphUncolourable(func.name));
        }
        // The graph is too dense for any node to qualify outright (every
        // enabled node still has >= K enabled neighbours): force the
        // minimum-degree node off the graph so the loop can keep making
        // progress, the standard Chaitin "optimistic" move. It may still
        // fail to colour once `select` runs; that failure surfaces as
        // `SpillRequired`, not here.
        if let Some(&victim) = enabled.iter().min_by_key(|id| rig[id].iter().filter(|n| enabled.contains(n)).count()) {
            enabled.remove(&victim);
            stack.push(victim);
        }
    }

    Ok(stack)
}

/// §4.G step 3: pop the simplify stack and colour each node against its
/// already-coloured neighbours.
fn select(
    func: &mut Function,
    rig: &crate::common::Map<ValueId, Set<ValueId>>,
    regfile: &RegisterFile,
    mut stack: Vec<ValueId>,
) -> Result<(), CompileError> {
    let return_operands = return_operand_ids(func);

    while let Some(id) = stack.pop() {
        let v = func.value(id);
        if !v.kind.consumes_physical_register() {
            continue;
        }
        let bank = RegBank::from(v.ty);

        if return_operands.contains(&id) {
            func.value_mut(id).hw_reg = Some(PhysReg::arg(bank, 0));
            continue;
        }

        let excluded: Set<PhysReg> = rig
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|n| func.value(*n).hw_reg)
            .collect();

        let assigned = match bank {
            RegBank::Int => regfile.next_temp_i_excluding(&excluded),
            RegBank::Float => regfile.next_temp_f_excluding(&excluded),
        };

        match assigned {
            Some(reg) => func.value_mut(id).hw_reg = Some(reg),
            None => return Err(CompileError::SpillRequired(func.name)),
        }
    }

    Ok(())
}

/// The values directly returned by a `return` statement in `func`, across
/// every block. Pre-coloured to register 0 of their bank (x0/d0) so the
/// emitter's "move the return value into r0/d0 if it isn't already there"
/// step (§4.I) is a no-op in the common case.
fn return_operand_ids(func: &Function) -> Set<ValueId> {
    func.values()
        .filter_map(|v| match &v.data {
            ValueData::Return { value } => Some(*value),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id;
    use crate::middle::ir::{ConstValue, DataType, ModuleId, Param};
    use crate::types::ArithOp;

    #[test]
    fn simple_chain_colours_without_spilling() {
        let mut func = Function::new(ModuleId(0), id("f"), vec![], DataType::Int);
        let entry = func.create_block();
        let a = func.build_const(entry, ConstValue::Int(1));
        let b = func.build_const(entry, ConstValue::Int(2));
        let sum = func.build_data(entry, ArithOp::Add, a, Some(b));
        func.build_return(entry, sum);

        allocate(&mut func).expect("small function must colour");

        assert!(func.value(a).hw_reg.is_some());
        assert!(func.value(b).hw_reg.is_some());
        assert_ne!(func.value(a).hw_reg, func.value(b).hw_reg, "a and b interfere and must not share a register");

        let sum_reg = func.value(sum).hw_reg.expect("sum must be coloured");
        assert_eq!(sum_reg, PhysReg::arg(RegBank::Int, 0), "the returned value is pre-coloured to x0");
    }

    /// A `Param` handle is addressed by stack offset at emission time
    /// (`Frame::param_offset`), never by a colour of its own; only a
    /// `Load` reading through it gets coloured, exactly like a local.
    #[test]
    fn params_are_loaded_and_their_consumer_is_coloured() {
        let params = vec![
            Param { name: id("x"), ty: DataType::Int },
            Param { name: id("y"), ty: DataType::Int },
        ];
        let mut func = Function::new(ModuleId(0), id("f"), params, DataType::Int);
        let entry = func.create_block();
        let x = func.build_param_ref(entry, id("x"), DataType::Int, 0);
        let y = func.build_param_ref(entry, id("y"), DataType::Int, 1);
        let load_x = func.build_load(entry, x);
        let load_y = func.build_load(entry, y);
        let sum = func.build_data(entry, ArithOp::Add, load_x, Some(load_y));
        func.build_return(entry, sum);

        allocate(&mut func).unwrap();

        assert_eq!(func.value(x).hw_reg, None, "a Param handle is never coloured, only a Load through it is");
        assert_eq!(func.value(y).hw_reg, None);
        assert!(func.value(load_x).hw_reg.is_some());
        assert_eq!(func.value(sum).hw_reg, Some(PhysReg::arg(RegBank::Int, 0)), "the returned value is pre-coloured to x0");
    }
}
