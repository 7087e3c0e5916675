//! The compiler driver binary (§4.J): reads a JSON AST fixture, drives the
//! pipeline, and writes assembly (or an earlier-stage dump) to stdout or a
//! file.
//!
//! Run with `--help` for more info.

use std::io::Write as _;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use smallang::back;
use smallang::common::id;
use smallang::config::{CompileConfig, TargetArch};
use smallang::front::ast;
use smallang::middle::{liveness, lower_program, printer};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// The JSON AST fixture to compile.
    file: String,

    /// Which pipeline stage to print.
    #[arg(value_enum, short, long, default_value_t = DumpStage::Asm)]
    emit: DumpStage,

    /// Where to write the result; stdout if omitted.
    #[arg(short, long)]
    out: Option<String>,

    /// Target architecture; only `aarch64` is implemented.
    #[arg(long, default_value_t = TargetArch::Aarch64, value_enum)]
    target: TargetArch,

    /// Worker pool size for the per-function allocation stage.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Name of the function to dispatch to from the implicit `main`;
    /// defaults to the first function declared in the source.
    #[arg(long)]
    entry: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum DumpStage {
    /// The lowered LIR, pretty-printed.
    Lir,
    /// The per-function register-interference graph.
    Rig,
    /// The emitted aarch64 assembly (default).
    Asm,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let input = match std::fs::read_to_string(&args.file) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("could not read `{}`: {e}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let program: ast::Program = match serde_json::from_str(&input) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("could not parse `{}` as an AST fixture: {e}", args.file);
            return ExitCode::FAILURE;
        }
    };

    let entry_name = match &args.entry {
        Some(name) => id(name.as_str()),
        None => match first_function_name(&program) {
            Some(name) => name,
            None => {
                tracing::error!("program declares no functions to use as an entry point");
                return ExitCode::FAILURE;
            }
        },
    };

    let config = CompileConfig::new(args.file.clone(), args.threads, args.target);

    let output = match args.emit {
        DumpStage::Lir => lower_program(&program).map(|module| printer::print_module(&module)),
        DumpStage::Rig => lower_program(&program).map(|module| dump_rig(&module)),
        DumpStage::Asm => back::compile(&program, entry_name, &config),
    };

    let text = match output {
        Ok(text) => text,
        Err(errors) => {
            for e in &errors {
                tracing::error!("{e}");
            }
            return ExitCode::FAILURE;
        }
    };

    match args.out {
        Some(path) => {
            if let Err(e) = std::fs::File::create(&path).and_then(|mut f| f.write_all(text.as_bytes())) {
                tracing::error!("could not write `{path}`: {e}");
                return ExitCode::FAILURE;
            }
        }
        None => println!("{text}"),
    }

    ExitCode::SUCCESS
}

fn first_function_name(program: &ast::Program) -> Option<smallang::common::Id> {
    program.items.iter().find_map(|item| match item {
        ast::Item::Function(f) => Some(f.name),
        ast::Item::Global(_) => None,
    })
}

fn dump_rig(module: &smallang::middle::ir::Module) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for func in module.functions_in_order() {
        let _ = writeln!(out, "fn {}:", func.name);
        let live = liveness::analyze(func);
        let rig = liveness::build_rig(func, &live);
        for node in &live.nodes {
            let neighbours: Vec<String> = rig.get(&node.value).into_iter().flatten().map(|n| format!("%{}", n.0)).collect();
            let _ = writeln!(out, "  %{} ({}) interferes: [{}]", node.value.0, node.bank, neighbours.join(", "));
        }
    }
    out
}
