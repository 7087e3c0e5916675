//! The RISC-V target (§4, §6): recognized by [`crate::config::TargetArch`]
//! so a user's `--target riscv32`/`--target riscv64` selection fails
//! cleanly with [`CompileError::UnsupportedTarget`] instead of a generic
//! parse error. No code generator is implemented; RISC-V's fused
//! register-allocation-and-codegen design doesn't fit the separate
//! allocator/emitter split the aarch64 target uses (component G, component
//! I), so there is nothing here to share with it.

use crate::config::{CompileConfig, TargetArch};
use crate::error::CompileError;

pub fn emit_module(config: &CompileConfig) -> Result<String, CompileError> {
    Err(CompileError::UnsupportedTarget(config.target_arch))
}
