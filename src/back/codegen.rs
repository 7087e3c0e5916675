//! Pipeline orchestration (§5): lowering, then a per-function worker pool
//! that runs liveness, allocation, and emission, then assembly concatenated
//! back into source-declaration order.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{error, info};

use crate::config::{CompileConfig, TargetArch};
use crate::error::CompileError;
use crate::front::ast;
use crate::middle::ir::{lower_program, Function, Module};

use super::aarch64;
use super::regalloc;

/// Run the whole pipeline over `program`, returning the assembled aarch64
/// source on success or every error collected across every stage.
pub fn compile(program: &ast::Program, entry: crate::common::Id, config: &CompileConfig) -> Result<String, Vec<CompileError>> {
    if config.target_arch != TargetArch::Aarch64 {
        return Err(vec![CompileError::UnsupportedTarget(config.target_arch)]);
    }

    info!(target_arch = %config.target_arch, "building module");
    let mut module = lower_program(program)?;

    let errors = allocate_functions(&mut module, config.thread_count.max(1));
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        return Err(errors);
    }

    aarch64::emit_module(&module, entry, config).map_err(|e| vec![e])
}

/// §5's data-parallel worker pool: every function gets its own mutex so
/// workers never contend on each other's state, only on the shared queue
/// that hands out work.
fn allocate_functions(module: &mut Module, thread_count: usize) -> Vec<CompileError> {
    let names: Vec<crate::common::Id> = module.functions_in_order().map(|f| f.name).collect();
    let slots: Vec<Mutex<Function>> = names.iter().map(|n| Mutex::new(module.functions[n].clone())).collect();
    let queue = Mutex::new((0..slots.len()).collect::<VecDeque<usize>>());
    let errors = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..thread_count {
            scope.spawn(|| loop {
                let idx = {
                    let mut q = queue.lock().expect("work queue poisoned");
                    q.pop_front()
                };
                let Some(idx) = idx else { break };
                let mut func = slots[idx].lock().expect("function slot poisoned");
                info!(function = %func.name, "allocating registers");
                if let Err(e) = regalloc::allocate(&mut *func) {
                    errors.lock().expect("error list poisoned").push(e);
                }
            });
        }
    });

    for (name, slot) in names.into_iter().zip(slots) {
        let func = slot.into_inner().expect("function slot poisoned");
        module.functions.insert(name, func);
    }

    errors.into_inner().expect("error list poisoned")
}
