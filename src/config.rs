//! The configuration surface (§6): how a compilation run is parametrized,
//! independent of the `clap` driver that usually builds it.

/// Which backend should consume the lowered module.
///
/// Only [`TargetArch::Aarch64`] is implemented; the others are recognized so
/// that a user's `--target` selection fails cleanly with
/// [`crate::error::CompileError::UnsupportedTarget`] instead of a generic
/// parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    Aarch64,
    Riscv32,
    Riscv64,
}

impl std::fmt::Display for TargetArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetArch::Aarch64 => "aarch64",
            TargetArch::Riscv32 => "riscv32",
            TargetArch::Riscv64 => "riscv64",
        };
        write!(f, "{s}")
    }
}

/// The `{ source_path, thread_count, target_arch }` record from §6.
#[derive(Clone, Debug)]
pub struct CompileConfig {
    pub source_path: String,
    pub thread_count: usize,
    pub target_arch: TargetArch,
}

impl CompileConfig {
    pub fn new(source_path: impl Into<String>, thread_count: usize, target_arch: TargetArch) -> Self {
        CompileConfig {
            source_path: source_path.into(),
            thread_count: thread_count.max(1),
            target_arch,
        }
    }
}
