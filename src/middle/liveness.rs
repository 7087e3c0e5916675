//! Liveness analysis (component F, §4.F).
//!
//! A single backward pass over the function's whole instruction stream,
//! not per-block in/out sets iterated to a fixpoint: the source language
//! carries all cross-block state through memory (`Declare`/`Global`/`Param`
//! loads and stores), so no virtual register is ever live across a block
//! boundary. If a test ever needs the fixpoint form, that is the place to
//! extend this.

use crate::common::Set;
use crate::middle::ir::{Function, RegBank, Value, ValueId};

/// One function instruction, wrapped with the set of other instructions
/// simultaneously live immediately after it executes (`Dep(I)`, §4.F).
/// This is exactly `I`'s row of the register-interference graph.
#[derive(Clone, Debug)]
pub struct LiveNode {
    pub value: ValueId,
    pub bank: RegBank,
    pub interferes_with: Set<ValueId>,
}

#[derive(Clone, Debug, Default)]
pub struct Liveness {
    /// In function program order: blocks in creation order, instructions
    /// within a block in builder order.
    pub nodes: Vec<LiveNode>,
}

impl Liveness {
    pub fn node(&self, id: ValueId) -> Option<&LiveNode> {
        self.nodes.iter().find(|n| n.value == id)
    }
}

/// Run the backward pass described in §4.F over `func`.
pub fn analyze(func: &Function) -> Liveness {
    let order: Vec<ValueId> = func.blocks().flat_map(|b| b.instructions.iter().copied()).collect();

    let mut live: Set<ValueId> = Set::new();
    let mut deps: Vec<(ValueId, Set<ValueId>)> = Vec::with_capacity(order.len());

    for &id in order.iter().rev() {
        let val: &Value = func.value(id);
        for r in val.data.refs() {
            live.insert(r);
        }
        if let Some(d) = val.data.def(id) {
            live.remove(&d);
        }
        deps.push((id, live.clone()));
    }
    deps.reverse();

    let nodes = deps
        .into_iter()
        .map(|(id, interferes_with)| LiveNode {
            value: id,
            bank: RegBank::from(func.value(id).ty),
            interferes_with,
        })
        .collect();

    Liveness { nodes }
}

/// The register-interference graph (RIG): symmetric adjacency over every
/// value that actually occupies a physical register (§4.G step 3 skips the
/// rest). An edge `(a, b)` means `a` and `b` are simultaneously live at some
/// program point and so cannot share a register.
pub fn build_rig(func: &Function, liveness: &Liveness) -> crate::common::Map<ValueId, Set<ValueId>> {
    let mut rig: crate::common::Map<ValueId, Set<ValueId>> = crate::common::Map::new();
    for node in &liveness.nodes {
        let v = func.value(node.value);
        if !v.kind.consumes_physical_register() {
            continue;
        }
        rig.entry(node.value).or_default();
        for &other in &node.interferes_with {
            if !func.value(other).kind.consumes_physical_register() {
                continue;
            }
            rig.entry(node.value).or_default().insert(other);
            rig.entry(other).or_default().insert(node.value);
        }
    }
    rig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id;
    use crate::middle::ir::{ConstValue, DataType};
    use crate::types::ArithOp;

    #[test]
    fn operands_simultaneously_live_at_their_use_interfere() {
        let mut func = Function::new(crate::middle::ir::ModuleId(0), id("f"), vec![], DataType::Int);
        let entry = func.create_block();
        let a = func.build_const(entry, ConstValue::Int(1));
        let b = func.build_const(entry, ConstValue::Int(2));
        let sum = func.build_data(entry, ArithOp::Add, a, Some(b));
        func.build_return(entry, sum);

        let live = analyze(&func);
        let rig = build_rig(&func, &live);

        assert!(rig[&a].contains(&b), "a and b are both live at sum's computation");
        assert_eq!(rig[&sum].len(), 2, "sum interferes with both of its operands and nothing else");
    }
}
