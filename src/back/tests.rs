//! End-to-end pipeline tests (§8's scenarios 1-4 and 6), built as
//! [`ast::Program`] fixtures directly rather than through a text parser.

use crate::common::id;
use crate::config::{CompileConfig, TargetArch};
use crate::front::ast::*;
use crate::types::{ArithOp, DataType, RelOp};

use super::compile;

fn pos() -> crate::common::Pos {
    crate::common::Pos::default()
}

fn config() -> CompileConfig {
    CompileConfig::new("fixture.small", 2, TargetArch::Aarch64)
}

/// `def id(x: int): int { return x }`
fn identity_program() -> Program {
    Program {
        items: vec![Item::Function(Function {
            name: id("id"),
            params: vec![TypedParam { name: id("x"), ty: DataType::Int, pos: pos() }],
            ret: DataType::Int,
            body: Block {
                stmts: vec![Stmt::Return { value: Expr::Identifier(id("x")), pos: pos() }],
            },
            pos: pos(),
        })],
    }
}

#[test]
fn identity_function_emits_aligned_prologue_and_param_move() {
    let program = identity_program();
    let asm = compile(&program, id("id"), &config()).expect("identity function must compile");

    assert!(asm.contains("sub sp, sp, #32"), "frame size must be 16-aligned for one param: {asm}");
    assert!(asm.contains("stp x29, x30, [sp, #16]"));
    assert!(asm.contains(".global main"));
    assert!(asm.contains("id:"));
}

/// `def f(a: float, b: float): float { return a + b }`
fn float_add_program() -> Program {
    Program {
        items: vec![Item::Function(Function {
            name: id("f"),
            params: vec![
                TypedParam { name: id("a"), ty: DataType::Float, pos: pos() },
                TypedParam { name: id("b"), ty: DataType::Float, pos: pos() },
            ],
            ret: DataType::Float,
            body: Block {
                stmts: vec![Stmt::Return {
                    value: Expr::Binary {
                        op: ArithOp::Add,
                        lhs: Box::new(Expr::Identifier(id("a"))),
                        rhs: Box::new(Expr::Identifier(id("b"))),
                        pos: pos(),
                    },
                    pos: pos(),
                }],
            },
            pos: pos(),
        })],
    }
}

#[test]
fn float_addition_emits_fadd_and_casts_on_exit() {
    let program = float_add_program();
    let asm = compile(&program, id("f"), &config()).expect("float addition must compile");

    assert!(asm.contains("fadd"), "{asm}");
    assert!(asm.contains("fcvtzs"), "implicit main must truncate-cast the float result: {asm}");
}

/// `def tri(n: int): int { s: int; s = 0; while (n > 0) { s = s + n; n = n - 1; } return s; }`
fn while_loop_program() -> Program {
    Program {
        items: vec![Item::Function(Function {
            name: id("tri"),
            params: vec![TypedParam { name: id("n"), ty: DataType::Int, pos: pos() }],
            ret: DataType::Int,
            body: Block {
                stmts: vec![
                    Stmt::Declaration(Declaration { name: id("s"), ty: DataType::Int, pos: pos() }),
                    Stmt::Assignment { target: id("s"), value: Expr::Integer(0), pos: pos() },
                    Stmt::While {
                        cond: Relation { op: RelOp::GreaterThan, lhs: Expr::Identifier(id("n")), rhs: Expr::Integer(0), pos: pos() },
                        body: Block {
                            stmts: vec![
                                Stmt::Assignment {
                                    target: id("s"),
                                    value: Expr::Binary {
                                        op: ArithOp::Add,
                                        lhs: Box::new(Expr::Identifier(id("s"))),
                                        rhs: Box::new(Expr::Identifier(id("n"))),
                                        pos: pos(),
                                    },
                                    pos: pos(),
                                },
                                Stmt::Assignment {
                                    target: id("n"),
                                    value: Expr::Binary {
                                        op: ArithOp::Sub,
                                        lhs: Box::new(Expr::Identifier(id("n"))),
                                        rhs: Box::new(Expr::Integer(1)),
                                        pos: pos(),
                                    },
                                    pos: pos(),
                                },
                            ],
                        },
                        pos: pos(),
                    },
                    Stmt::Return { value: Expr::Identifier(id("s")), pos: pos() },
                ],
            },
            pos: pos(),
        })],
    }
}

#[test]
fn while_loop_inverts_condition_and_loops_back() {
    let program = while_loop_program();
    let asm = compile(&program, id("tri"), &config()).expect("while loop must compile");

    assert!(asm.contains("cmp"));
    assert!(asm.contains("b.le"), "`n > 0`'s inverse is `b.le`: {asm}");
    assert!(asm.contains("b .L"), "the loop body must branch back to the head: {asm}");
}

/// A function taking two parameters, to exercise the implicit `main`'s
/// argument-count mismatch path.
fn two_param_program() -> Program {
    Program {
        items: vec![Item::Function(Function {
            name: id("add2"),
            params: vec![
                TypedParam { name: id("x"), ty: DataType::Int, pos: pos() },
                TypedParam { name: id("y"), ty: DataType::Int, pos: pos() },
            ],
            ret: DataType::Int,
            body: Block {
                stmts: vec![Stmt::Return {
                    value: Expr::Binary {
                        op: ArithOp::Add,
                        lhs: Box::new(Expr::Identifier(id("x"))),
                        rhs: Box::new(Expr::Identifier(id("y"))),
                        pos: pos(),
                    },
                    pos: pos(),
                }],
            },
            pos: pos(),
        })],
    }
}

#[test]
fn argc_mismatch_message_names_the_expected_count() {
    let program = two_param_program();
    let asm = compile(&program, id("add2"), &config()).expect("two-parameter function must compile");

    assert!(asm.contains("Argument error: expected 2 arguments, got %d"), "{asm}");
    assert!(asm.contains("bl exit"));
}

#[test]
fn riscv_target_is_cleanly_unsupported() {
    let program = identity_program();
    let config = CompileConfig::new("fixture.small", 1, TargetArch::Riscv64);
    let errs = compile(&program, id("id"), &config).expect_err("riscv64 must be rejected");
    assert!(matches!(errs[0], crate::error::CompileError::UnsupportedTarget(TargetArch::Riscv64)));
}

/// A nine-integer-argument call site, to exercise overflow stack placement.
fn nine_args_program() -> Program {
    let callee = Function {
        name: id("sum9"),
        params: (0..9).map(|i| TypedParam { name: id(format!("p{i}")), ty: DataType::Int, pos: pos() }).collect(),
        ret: DataType::Int,
        body: Block {
            stmts: vec![Stmt::Return { value: Expr::Identifier(id("p0")), pos: pos() }],
        },
        pos: pos(),
    };
    let caller = Function {
        name: id("caller"),
        params: vec![],
        ret: DataType::Int,
        body: Block {
            stmts: vec![Stmt::Return {
                value: Expr::Call {
                    callee: id("sum9"),
                    args: (0..9).map(|i| Expr::Integer(i)).collect(),
                    pos: pos(),
                },
                pos: pos(),
            }],
        },
        pos: pos(),
    };
    Program {
        items: vec![Item::Function(callee), Item::Function(caller)],
    }
}

#[test]
fn ninth_integer_argument_spills_to_a_rounded_stack_slot() {
    let program = nine_args_program();
    let asm = compile(&program, id("caller"), &config()).expect("nine-argument call site must compile");

    assert!(asm.contains("sub sp, sp, #16"), "one overflow word rounds up to 16: {asm}");
    assert!(asm.contains("str x8, [sp, #0]"), "{asm}");
    assert!(asm.contains("add sp, sp, #16"));
}
