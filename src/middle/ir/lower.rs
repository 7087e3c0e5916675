//! Tree → LIR lowering (component E, §4.E).
//!
//! Lowering a function body never aborts on the first error: it keeps
//! building with a placeholder value so the rest of the function is still
//! checked, and reports every error it collected once the body is done
//! (§7's collection policy). Builder misuse (a malformed request this
//! lowerer itself would be responsible for) still panics — see
//! [`super::function`].

use std::collections::HashMap;

use crate::common::{Id, Pos};
use crate::error::CompileError;
use crate::front::ast;
use crate::types::{ArithOp, DataType};

use super::{BlockId, ConstValue, Function, Module, ModuleId, Param, ValueId};

/// Lower a whole translation unit into a [`Module`]. Top-level items are
/// processed in two passes — headers, then bodies — so a function may call
/// one declared later in the source (§4.E).
pub fn lower_program(program: &ast::Program) -> Result<Module, Vec<CompileError>> {
    let mut module = Module::new();

    for item in &program.items {
        match item {
            ast::Item::Global(decl) => match decl.ty {
                DataType::Int => {
                    module.create_global_int(decl.name.to_string(), 0);
                }
                DataType::Float => {
                    module.create_global_float(decl.name.to_string(), 0.0);
                }
                other => panic!("builder misuse: global `{}` declared with non-scalar type {other:?}", decl.name),
            },
            ast::Item::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| Param { name: p.name, ty: p.ty })
                    .collect();
                module.create_function(f.name.to_string(), params, f.ret);
            }
        }
    }

    let mut errors = Vec::new();
    for item in &program.items {
        let ast::Item::Function(f) = item else { continue };
        let mut func = module
            .functions
            .remove(&f.name)
            .expect("builder misuse: function header missing for body lowering");
        let mut lowerer = Lowerer::new(&mut module, &mut func);
        lowerer.lower_function(f);
        errors.extend(lowerer.errors);
        module.functions.insert(f.name, func);
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(errors)
    }
}

enum Place {
    Local(ValueId),
    Param(u32),
    Global(ModuleId, DataType),
}

struct Lowerer<'m> {
    module: &'m mut Module,
    func: &'m mut Function,
    scopes: Vec<HashMap<Id, ValueId>>,
    global_handles: HashMap<Id, ValueId>,
    param_handles: HashMap<u32, ValueId>,
    continue_stack: Vec<BlockId>,
    errors: Vec<CompileError>,
    cur: BlockId,
}

impl<'m> Lowerer<'m> {
    fn new(module: &'m mut Module, func: &'m mut Function) -> Self {
        let entry = func.create_block();
        Lowerer {
            module,
            func,
            scopes: vec![HashMap::new()],
            global_handles: HashMap::new(),
            param_handles: HashMap::new(),
            continue_stack: Vec::new(),
            errors: Vec::new(),
            cur: entry,
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare_local(&mut self, name: Id, ty: DataType, pos: Pos) -> ValueId {
        if self.scopes.last().unwrap().contains_key(&name) {
            self.errors.push(CompileError::DuplicateDeclaration { name, pos });
        }
        let handle = self.func.build_declare(self.cur, name, ty);
        self.scopes.last_mut().unwrap().insert(name, handle);
        handle
    }

    fn resolve(&mut self, name: Id) -> Option<Place> {
        for scope in self.scopes.iter().rev() {
            if let Some(&v) = scope.get(&name) {
                return Some(Place::Local(v));
            }
        }
        if let Some(idx) = self.func.param_index(name) {
            return Some(Place::Param(idx));
        }
        if let Some(g) = self.module.get_global(name) {
            return Some(Place::Global(g.id, g.ty()));
        }
        None
    }

    fn param_handle(&mut self, index: u32) -> ValueId {
        if let Some(&v) = self.param_handles.get(&index) {
            return v;
        }
        let p = self.func.get_param(index).expect("builder misuse: param index out of range").clone();
        let handle = self.func.build_param_ref(self.func.entry(), p.name, p.ty, index);
        self.param_handles.insert(index, handle);
        handle
    }

    fn global_handle(&mut self, gid: ModuleId, name: Id, ty: DataType) -> ValueId {
        if let Some(&v) = self.global_handles.get(&name) {
            return v;
        }
        let handle = self.func.build_global_ref(self.cur, name, ty, gid);
        self.global_handles.insert(name, handle);
        handle
    }

    /// A zero-valued placeholder used to keep lowering a block after a user
    /// error, so later statements in the same function still get checked.
    fn placeholder(&mut self, ty: DataType) -> ValueId {
        match ty {
            DataType::Float => self.func.build_const(self.cur, ConstValue::Float(0.0)),
            _ => self.func.build_const(self.cur, ConstValue::Int(0)),
        }
    }

    fn lower_function(&mut self, f: &ast::Function) {
        for (i, p) in f.params.iter().enumerate() {
            let handle = self.param_handle(i as u32);
            self.scopes.last_mut().unwrap().insert(p.name, handle);
        }
        self.lower_block(&f.body);
        if !self.func.is_terminated(self.cur) {
            // A well-formed function always ends in `return` (§6); if control
            // falls through, synthesize one from a zero placeholder rather
            // than leave an unterminated block, which would panic at emission.
            let zero = self.placeholder(self.func.ret_ty);
            self.func.build_return(self.cur, zero);
        }
    }

    fn lower_block(&mut self, block: &ast::Block) {
        self.push_scope();
        for stmt in &block.stmts {
            if self.func.is_terminated(self.cur) {
                self.errors.push(CompileError::UnreachableAfterReturn { pos: Pos::default() });
                break;
            }
            self.lower_stmt(stmt);
        }
        self.pop_scope();
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::Null => {}
            ast::Stmt::Declaration(decl) => {
                self.declare_local(decl.name, decl.ty, decl.pos);
            }
            ast::Stmt::Assignment { target, value, pos } => {
                let v = self.lower_expr(value);
                self.store(*target, v, *pos);
            }
            ast::Stmt::Print { args, pos: _ } => {
                let values: Vec<ValueId> = args.iter().map(|a| self.lower_expr(a)).collect();
                let tys: Vec<DataType> = values.iter().map(|v| self.func.value(*v).ty).collect();
                let text = super::print_format_string(&tys);
                let fmt = self.module.intern_string(text);
                self.func.build_print(self.cur, fmt, values);
            }
            ast::Stmt::Return { value, pos: _ } => {
                let v = self.lower_expr(value);
                self.func.build_return(self.cur, v);
            }
            ast::Stmt::Continue { pos } => {
                if let Some(&head) = self.continue_stack.last() {
                    self.func.build_branch(self.cur, head);
                } else {
                    self.errors.push(CompileError::ContinueOutsideLoop { pos: *pos });
                }
            }
            ast::Stmt::If { cond, then_block, else_block, pos } => {
                self.lower_if(cond, then_block, else_block.as_ref(), *pos);
            }
            ast::Stmt::While { cond, body, pos } => {
                self.lower_while(cond, body, *pos);
            }
        }
    }

    fn store(&mut self, target: Id, value: ValueId, pos: Pos) {
        match self.resolve(target) {
            Some(Place::Local(handle)) => {
                self.func.build_store(self.cur, handle, value);
            }
            Some(Place::Param(idx)) => {
                let handle = self.param_handle(idx);
                self.func.build_store(self.cur, handle, value);
            }
            Some(Place::Global(gid, ty)) => {
                let handle = self.global_handle(gid, target, ty);
                self.func.build_store(self.cur, handle, value);
            }
            // An unresolved store target is a silent no-op under the
            // source language's behaviour, not a reported error (§4.E).
            None => {}
        }
        let _ = pos;
    }

    fn load(&mut self, name: Id, pos: Pos) -> ValueId {
        match self.resolve(name) {
            Some(Place::Local(handle)) => self.func.build_load(self.cur, handle),
            Some(Place::Param(idx)) => {
                let handle = self.param_handle(idx);
                self.func.build_load(self.cur, handle)
            }
            Some(Place::Global(gid, ty)) => {
                let handle = self.global_handle(gid, name, ty);
                self.func.build_load(self.cur, handle)
            }
            None => {
                self.errors.push(CompileError::UnresolvedIdentifier { name, pos });
                self.placeholder(DataType::Int)
            }
        }
    }

    fn lower_if(&mut self, cond: &ast::Relation, then_block: &ast::Block, else_block: Option<&ast::Block>, _pos: Pos) {
        let then_blk = self.func.create_block();
        match else_block {
            None => {
                let converge = self.func.create_block();
                self.lower_relation(cond, then_blk, converge);

                self.cur = then_blk;
                self.lower_block(then_block);
                if !self.func.is_terminated(self.cur) {
                    self.func.build_branch(self.cur, converge);
                }

                self.cur = converge;
            }
            Some(else_ast) => {
                let else_blk = self.func.create_block();
                self.lower_relation(cond, then_blk, else_blk);

                self.cur = then_blk;
                self.lower_block(then_block);
                let then_terminated = self.func.is_terminated(self.cur);
                let then_end = self.cur;

                self.cur = else_blk;
                self.lower_block(else_ast);
                let else_terminated = self.func.is_terminated(self.cur);
                let else_end = self.cur;

                if then_terminated && else_terminated {
                    // Both arms returned: no converge block, no insertion
                    // point remains. A later statement attempting to append
                    // is reported by `lower_block`'s own check.
                    self.cur = else_end;
                } else {
                    let converge = self.func.create_block();
                    if !then_terminated {
                        self.func.build_branch(then_end, converge);
                    }
                    if !else_terminated {
                        self.func.build_branch(else_end, converge);
                    }
                    self.cur = converge;
                }
            }
        }
    }

    fn lower_while(&mut self, cond: &ast::Relation, body: &ast::Block, _pos: Pos) {
        let head = self.func.create_block();
        let body_blk = self.func.create_block();
        let after = self.func.create_block();

        self.func.build_branch(self.cur, head);

        self.cur = head;
        self.lower_relation(cond, body_blk, after);

        self.continue_stack.push(head);
        self.cur = body_blk;
        self.lower_block(body);
        if !self.func.is_terminated(self.cur) {
            self.func.build_branch(self.cur, head);
        }
        self.continue_stack.pop();

        self.cur = after;
    }

    /// Lower `cond`'s operands, emit the subtraction, and branch on it
    /// (§4.E): `then_blk` on the relation holding, `else_blk` otherwise.
    fn lower_relation(&mut self, cond: &ast::Relation, then_blk: BlockId, else_blk: BlockId) {
        let lhs = self.lower_expr(&cond.lhs);
        let rhs = self.lower_expr(&cond.rhs);
        let cmp = self.func.build_data(self.cur, ArithOp::Sub, lhs, Some(rhs));
        self.func.build_cond_branch(self.cur, cond.op, cmp, then_blk, else_blk);
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> ValueId {
        match expr {
            ast::Expr::Integer(v) => {
                self.module.intern_constant(ConstValue::Int(*v));
                self.func.build_const(self.cur, ConstValue::Int(*v))
            }
            ast::Expr::Float(v) => {
                self.module.intern_constant(ConstValue::Float(*v));
                self.func.build_const(self.cur, ConstValue::Float(*v))
            }
            ast::Expr::Str(s) => {
                let sid = self.module.create_global_string(s.clone());
                self.func.build_string_ref(self.cur, sid)
            }
            ast::Expr::Identifier(name) => self.load(*name, Pos::default()),
            // Unary `-` desugars to `0 - operand`; unary `~` desugars to
            // `~0 ^ operand` (§4.E). Neither reaches the builder as a
            // standalone unary op.
            ast::Expr::Unary { op, operand, pos } => {
                let v = self.lower_expr(operand);
                let ty = self.func.value(v).ty;
                match op {
                    ArithOp::Neg if ty.is_numeric() => {
                        let zero = if ty == DataType::Float {
                            self.func.build_const(self.cur, ConstValue::Float(0.0))
                        } else {
                            self.func.build_const(self.cur, ConstValue::Int(0))
                        };
                        self.func.build_data(self.cur, ArithOp::Sub, zero, Some(v))
                    }
                    ArithOp::Not if ty == DataType::Int => {
                        let neg_one = self.func.build_const(self.cur, ConstValue::Int(-1));
                        self.func.build_data(self.cur, ArithOp::Xor, neg_one, Some(v))
                    }
                    _ => {
                        self.errors.push(CompileError::OperatorTypeMismatch {
                            op: op.to_string(),
                            lhs: ty,
                            rhs: ty,
                            pos: *pos,
                        });
                        self.placeholder(ty)
                    }
                }
            }
            ast::Expr::Binary { op, lhs, rhs, pos } => {
                let l = self.lower_expr(lhs);
                let r = self.lower_expr(rhs);
                if self.check_binary_types(*op, l, r, *pos) {
                    self.func.build_data(self.cur, *op, l, Some(r))
                } else {
                    self.placeholder(DataType::Int)
                }
            }
            ast::Expr::Call { callee, args, pos } => self.lower_call(*callee, args, *pos),
        }
    }

    /// Mirrors `build_data`'s compatibility table ahead of calling it, so a
    /// type mismatch is reported as a [`CompileError`] instead of reaching
    /// the builder's panic path.
    fn check_binary_types(&mut self, op: ArithOp, lhs: ValueId, rhs: ValueId, pos: Pos) -> bool {
        let lty = self.func.value(lhs).ty;
        let rty = self.func.value(rhs).ty;
        let both_int = lty == DataType::Int && rty == DataType::Int;
        let ok = if op == ArithOp::Not {
            both_int
        } else if both_int {
            true
        } else {
            lty.is_numeric() && rty.is_numeric() && matches!(op, ArithOp::Add | ArithOp::Sub | ArithOp::Mul | ArithOp::Div)
        };
        if !ok {
            self.errors.push(CompileError::OperatorTypeMismatch {
                op: op.to_string(),
                lhs: lty,
                rhs: rty,
                pos,
            });
        }
        ok
    }

    fn lower_call(&mut self, callee: Id, args: &[ast::Expr], pos: Pos) -> ValueId {
        let arg_values: Vec<ValueId> = args.iter().map(|a| self.lower_expr(a)).collect();

        let (callee_id, expected, ret_ty) = if callee == self.func.name {
            (self.func.id, self.func.params.len(), self.func.ret_ty)
        } else if let Some(target) = self.module.get_function(callee) {
            (target.id, target.params.len(), target.ret_ty)
        } else {
            self.errors.push(CompileError::UnresolvedIdentifier { name: callee, pos });
            return self.placeholder(DataType::Int);
        };

        match self.func.build_call(self.cur, callee_id, callee, expected, ret_ty, arg_values, pos) {
            Ok(v) => v,
            Err(e) => {
                self.errors.push(e);
                self.placeholder(ret_ty)
            }
        }
    }
}
