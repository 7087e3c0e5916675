//! LIR pretty-printer, used by `--emit=lir` and by the round-trip tests
//! (§8's "lowering then pretty-printing yields an isomorphic module").

use std::fmt::Write;

use crate::middle::ir::{Module, Value, ValueData};

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for global in module.globals_in_order() {
        let _ = writeln!(out, "global {} : {}", global.name, global.ty());
    }
    for func in module.functions_in_order() {
        let params: Vec<String> = func.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
        let _ = writeln!(out, "\nfn {}({}) -> {} {{", func.name, params.join(", "), func.ret_ty);
        for block in func.blocks() {
            let _ = writeln!(out, "  b{}:", block.id.0);
            for &id in &block.instructions {
                let v = func.value(id);
                let _ = writeln!(out, "    {}", print_value(v));
            }
        }
        let _ = writeln!(out, "}}");
    }
    out
}

fn print_value(v: &Value) -> String {
    let prefix = format!("%{} {} = {}", v.id.0, v.name, v.kind);
    match &v.data {
        ValueData::Constant(c) => format!("{prefix} {c:?}"),
        ValueData::Declare { seq } => format!("{prefix} seq={seq}"),
        ValueData::Param { index } => format!("{prefix} #{index}"),
        ValueData::Global { global } => format!("{prefix} @{}", global.0),
        ValueData::StringLit { string } => format!("{prefix} @{}", string.0),
        ValueData::Data { op, lhs, rhs } => match rhs {
            Some(r) => format!("{prefix} {op} %{} %{}", lhs.0, r.0),
            None => format!("{prefix} {op} %{}", lhs.0),
        },
        ValueData::Cast { from, to } => format!("{prefix} %{} as {to}", from.0),
        ValueData::Load { src } => format!("{prefix} [%{}]", src.0),
        ValueData::Store { dst, src } => format!("{prefix} [%{}] <- %{}", dst.0, src.0),
        ValueData::Branch { target } => format!("{prefix} b{}", target.0),
        ValueData::CondBranch { op, cmp, then_blk, else_blk } => {
            format!("{prefix} {op} %{} ? b{} : b{}", cmp.0, then_blk.0, else_blk.0)
        }
        ValueData::Return { value } => format!("{prefix} %{}", value.0),
        ValueData::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|a| format!("%{}", a.0)).collect();
            format!("{prefix} @{}({})", callee.0, args.join(", "))
        }
        ValueData::VaList { contained } => {
            let args: Vec<String> = contained.iter().map(|a| format!("%{}", a.0)).collect();
            format!("{prefix} <{}>", args.join(", "))
        }
        ValueData::Print { format, args } => {
            let args: Vec<String> = args.iter().map(|a| format!("%{}", a.0)).collect();
            format!("{prefix} @{}({})", format.0, args.join(", "))
        }
        ValueData::Preserve { src } => format!("{prefix} %{}", src.0),
    }
}
