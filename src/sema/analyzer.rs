// src/sema/analyzer.rs
//
// Type checking and name resolution. The analyzer owns the type arena,
// annotates every expression with a canonical TypeId (in a side table keyed
// by NodeId), binds identifiers to what they name, and splices ImplicitCast
// nodes into the tree. Cast insertion is the only structural edit it makes.

use rustc_hash::FxHashMap;

use crate::errors::SemanticError;
use crate::frontend::ast::*;
use crate::frontend::{Builtin, Interner, Span, Symbol};
use crate::sema::scope::{ScopeKind, ScopeStack, Variable};
use crate::sema::types::{BuiltinType, InternedType, TypeArena, TypeId, TypeIdVec};

/// What an identifier expression resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A local variable or parameter
    Local,
    /// A module-level function
    Function,
    /// A builtin call target
    Builtin(Builtin),
}

/// The product of a successful analysis: the (cast-annotated) AST plus the
/// side tables the code generator consumes.
#[derive(Debug)]
pub struct AnalyzedFile {
    pub file: File,
    pub arena: TypeArena,
    pub expr_types: FxHashMap<NodeId, TypeId>,
    pub resolutions: FxHashMap<NodeId, Resolution>,
    pub functions: FxHashMap<Symbol, TypeId>,
    pub structs: FxHashMap<Symbol, TypeId>,
    /// Pre-computed results of constant builtins (sizeOf, offsetOf),
    /// keyed by the call expression
    pub call_constants: FxHashMap<NodeId, u64>,
}

pub struct Analyzer<'a> {
    pub(crate) interner: &'a Interner,
    pub(crate) arena: TypeArena,
    pub(crate) scopes: ScopeStack,
    pub(crate) functions: FxHashMap<Symbol, TypeId>,
    pub(crate) structs: FxHashMap<Symbol, TypeId>,
    pub(crate) expr_types: FxHashMap<NodeId, TypeId>,
    pub(crate) resolutions: FxHashMap<NodeId, Resolution>,
    pub(crate) call_constants: FxHashMap<NodeId, u64>,
    pub(crate) errors: Vec<SemanticError>,
    pub(crate) current_ret: Option<TypeId>,
    next_node_id: u32,
}

impl<'a> Analyzer<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            arena: TypeArena::new(),
            scopes: ScopeStack::new(),
            functions: FxHashMap::default(),
            structs: FxHashMap::default(),
            expr_types: FxHashMap::default(),
            resolutions: FxHashMap::default(),
            call_constants: FxHashMap::default(),
            errors: Vec::new(),
            current_ret: None,
            next_node_id: 0,
        }
    }

    pub fn analyze(mut self, mut file: File) -> Result<AnalyzedFile, Vec<SemanticError>> {
        self.next_node_id = file.node_count;

        // First pass: struct types, in declaration order
        for decl in &file.decls {
            if let Decl::Struct(s) = decl {
                if self.structs.contains_key(&s.name) {
                    self.error(SemanticError::Redeclaration {
                        name: self.interner.resolve(s.name).to_string(),
                        span: s.span.into(),
                    });
                    continue;
                }
                let mut fields: smallvec::SmallVec<[(Symbol, TypeId); 4]> =
                    smallvec::SmallVec::new();
                for field in &s.ty.fields {
                    let ty = self.resolve_type_repr(&field.ty);
                    fields.push((field.name, ty));
                }
                let ty = self.arena.struct_of(Some(s.name), fields);
                self.structs.insert(s.name, ty);
            }
        }

        // Second pass: function signatures
        for decl in &file.decls {
            if let Decl::Function(f) = decl {
                if self.functions.contains_key(&f.name) {
                    self.error(SemanticError::Redeclaration {
                        name: self.interner.resolve(f.name).to_string(),
                        span: f.span.into(),
                    });
                    continue;
                }
                let ty = self.resolve_signature(&f.func.sig);
                self.functions.insert(f.name, ty);
            }
        }

        // Third pass: function bodies
        let mut decls = std::mem::take(&mut file.decls);
        for decl in &mut decls {
            if let Decl::Function(f) = decl {
                self.check_function(f);
            }
        }
        file.decls = decls;
        file.node_count = self.next_node_id;

        if self.errors.is_empty() {
            Ok(AnalyzedFile {
                file,
                arena: self.arena,
                expr_types: self.expr_types,
                resolutions: self.resolutions,
                functions: self.functions,
                structs: self.structs,
                call_constants: self.call_constants,
            })
        } else {
            Err(self.errors)
        }
    }

    pub(crate) fn error(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        self.arena.display(ty, self.interner)
    }

    fn mint_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    // ========================================================================
    // Type representation resolution
    // ========================================================================

    pub(crate) fn resolve_type_repr(&mut self, repr: &TypeRepr) -> TypeId {
        match repr {
            TypeRepr::Name(sym, span) => self.resolve_type_name(*sym, *span),
            TypeRepr::Pointer(p) => {
                let base = self.resolve_type_repr(&p.base);
                self.arena.pointer_to(base)
            }
            TypeRepr::Array(a) => {
                let elem = self.resolve_type_repr(&a.elem);
                let len = match &a.len {
                    None => None,
                    Some(expr) => match &expr.kind {
                        ExprKind::Literal(Literal::Int(n)) if *n >= 0 => Some(*n as u64),
                        _ => {
                            self.error(SemanticError::InvalidArrayLength {
                                span: expr.span.into(),
                            });
                            return self.arena.invalid();
                        }
                    },
                };
                self.arena.array_of(len, elem)
            }
            TypeRepr::Map(m) => {
                let key = self.resolve_type_repr(&m.key);
                let value = self.resolve_type_repr(&m.value);
                self.arena.map_of(key, value)
            }
            TypeRepr::Function(f) => self.resolve_signature(f),
            TypeRepr::Struct(s) => {
                let mut fields: smallvec::SmallVec<[(Symbol, TypeId); 4]> =
                    smallvec::SmallVec::new();
                for field in &s.fields {
                    let ty = self.resolve_type_repr(&field.ty);
                    fields.push((field.name, ty));
                }
                self.arena.struct_of(None, fields)
            }
        }
    }

    fn resolve_signature(&mut self, sig: &FunctionTypeRepr) -> TypeId {
        let mut params = TypeIdVec::new();
        for param in &sig.params {
            params.push(self.resolve_type_repr(&param.ty));
        }
        let ret = self.resolve_type_repr(&sig.ret);
        self.arena.function(params, ret)
    }

    pub(crate) fn resolve_type_name(&mut self, sym: Symbol, span: Span) -> TypeId {
        let name = self.interner.resolve(sym);
        let ty = match name {
            "nil" => self.arena.nil(),
            "bool" => self.arena.bool(),
            "int8" => self.arena.i8(),
            "int16" => self.arena.i16(),
            "int32" => self.arena.i32(),
            "int64" => self.arena.i64(),
            "uint8" => self.arena.u8(),
            "uint16" => self.arena.u16(),
            "uint32" => self.arena.u32(),
            "uint64" => self.arena.u64(),
            "float32" => self.arena.f32(),
            "float64" => self.arena.f64(),
            "string" => self.arena.string(),
            _ => {
                if let Some(&builtin) = BuiltinType::ALL.iter().find(|b| b.name() == name) {
                    self.arena.builtin(builtin)
                } else if let Some(&ty) = self.structs.get(&sym) {
                    ty
                } else {
                    self.error(SemanticError::UnknownType {
                        name: name.to_string(),
                        span: span.into(),
                    });
                    self.arena.invalid()
                }
            }
        };
        ty
    }

    /// Resolve an expression used in type position (`@sizeOf(int64)`,
    /// the `*T` first operand of `@ptrCast`).
    pub(crate) fn resolve_type_expr(&mut self, expr: &Expr) -> Option<TypeId> {
        match &expr.kind {
            ExprKind::Identifier(sym) => {
                let ty = self.resolve_type_name(*sym, expr.span);
                (!self.arena.is_invalid(ty)).then_some(ty)
            }
            ExprKind::Unary(u) if u.op == UnaryOp::Deref => {
                let base = self.resolve_type_expr(&u.operand)?;
                Some(self.arena.pointer_to(base))
            }
            _ => None,
        }
    }

    // ========================================================================
    // Declarations and statements
    // ========================================================================

    fn check_function(&mut self, decl: &mut FunctionDecl) {
        self.scopes.push(ScopeKind::Function);

        let mut ret = self.arena.nil();
        if let Some(&fn_ty) = self.functions.get(&decl.name) {
            if let InternedType::Function { ret: r, .. } = self.arena.get(fn_ty) {
                ret = *r;
            }
        }

        for param in &decl.func.sig.params {
            let ty = self.resolve_type_repr(&param.ty);
            if self.scopes.lookup_local(param.name).is_some() {
                self.error(SemanticError::Redeclaration {
                    name: self.interner.resolve(param.name).to_string(),
                    span: param.span.into(),
                });
            }
            self.scopes.declare(
                param.name,
                Variable {
                    ty,
                    decl_span: param.span,
                },
            );
        }

        self.current_ret = Some(ret);
        self.check_block(&mut decl.func.body, ScopeKind::Block);
        self.current_ret = None;

        self.scopes.pop();
    }

    fn check_block(&mut self, block: &mut Block, kind: ScopeKind) {
        self.scopes.push(kind);
        for stmt in &mut block.stmts {
            self.check_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.check_var_decl(decl),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Block(block) => self.check_block(block, ScopeKind::Block),
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::If(if_stmt) => {
                let cond_ty = self.check_expr(&mut if_stmt.cond);
                self.coerce_condition(&mut if_stmt.cond, cond_ty);
                self.check_block(&mut if_stmt.then_block, ScopeKind::Block);
                if let Some(else_stmt) = &mut if_stmt.else_stmt {
                    self.check_stmt(else_stmt);
                }
            }
            Stmt::For(for_stmt) => {
                self.scopes.push(ScopeKind::Loop);
                if let Some(init) = &mut for_stmt.init {
                    self.check_stmt(init);
                }
                if let Some(cond) = &mut for_stmt.cond {
                    let cond_ty = self.check_expr(cond);
                    self.coerce_condition(cond, cond_ty);
                }
                if let Some(next) = &mut for_stmt.next {
                    self.check_stmt(next);
                }
                self.check_block(&mut for_stmt.body, ScopeKind::Block);
                self.scopes.pop();
            }
            Stmt::ForIn(for_in) => self.check_for_in(for_in),
            Stmt::Return(ret) => self.check_return(ret),
        }
    }

    fn check_var_decl(&mut self, decl: &mut VariableDecl) {
        let declared = decl.ty.as_ref().map(|repr| {
            let repr = repr.clone();
            self.resolve_type_repr(&repr)
        });

        let init_ty = decl.init.as_mut().map(|init| self.check_expr_raw(init));

        let var_ty = match (declared, init_ty) {
            (Some(ty), Some(init_ty)) => {
                if let Some(init) = &mut decl.init {
                    self.coerce_assign(init, init_ty, ty);
                }
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(init_ty)) => init_ty,
            (None, None) => self.arena.invalid(),
        };

        if self.scopes.lookup_local(decl.name).is_some() {
            self.error(SemanticError::Redeclaration {
                name: self.interner.resolve(decl.name).to_string(),
                span: decl.span.into(),
            });
            return;
        }
        self.scopes.declare(
            decl.name,
            Variable {
                ty: var_ty,
                decl_span: decl.span,
            },
        );
    }

    fn check_assign(&mut self, assign: &mut AssignStmt) {
        let dest_ty = self.check_expr(&mut assign.dest);
        if !self.is_lvalue(&assign.dest) {
            self.error(SemanticError::NotAssignable {
                span: assign.dest.span.into(),
            });
            return;
        }
        let src_ty = self.check_expr(&mut assign.src);
        if self.arena.is_invalid(dest_ty) || self.arena.is_invalid(src_ty) {
            return;
        }
        self.coerce_assign(&mut assign.src, src_ty, dest_ty);
    }

    fn check_for_in(&mut self, for_in: &mut ForInStmt) {
        let iter_ty = self.check_expr(&mut for_in.iterable);

        let target_ty = match self.arena.pointee(iter_ty).and_then(|p| self.arena.as_builtin(p)) {
            Some(BuiltinType::TableVectorIterator) => {
                let vpi = self.arena.builtin(BuiltinType::VectorProjectionIterator);
                self.arena.pointer_to(vpi)
            }
            Some(BuiltinType::HashTableEntry) => iter_ty,
            _ => {
                if !self.arena.is_invalid(iter_ty) {
                    self.error(SemanticError::NotIterable {
                        name: self.type_name(iter_ty),
                        span: for_in.iterable.span.into(),
                    });
                }
                self.arena.invalid()
            }
        };

        self.scopes.push(ScopeKind::Loop);
        self.scopes.declare(
            for_in.target,
            Variable {
                ty: target_ty,
                decl_span: for_in.target_span,
            },
        );
        self.check_block(&mut for_in.body, ScopeKind::Block);
        self.scopes.pop();
    }

    fn check_return(&mut self, ret: &mut ReturnStmt) {
        let expected = self.current_ret.unwrap_or_else(|| self.arena.nil());
        match &mut ret.value {
            Some(value) => {
                let found = self.check_expr(value);
                if self.arena.is_invalid(found) {
                    return;
                }
                if self.arena.is_nil(expected) {
                    self.error(SemanticError::ReturnTypeMismatch {
                        expected: "nil".to_string(),
                        found: self.type_name(found),
                        span: value.span.into(),
                    });
                    return;
                }
                if !self.try_coerce(value, found, expected) {
                    self.error(SemanticError::ReturnTypeMismatch {
                        expected: self.type_name(expected),
                        found: self.type_name(found),
                        span: value.span.into(),
                    });
                }
            }
            None => {
                if !self.arena.is_nil(expected) {
                    self.error(SemanticError::MissingReturnValue {
                        expected: self.type_name(expected),
                        span: ret.span.into(),
                    });
                }
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Check an expression and record its type
    pub(crate) fn check_expr(&mut self, expr: &mut Expr) -> TypeId {
        let ty = self.check_expr_raw(expr);
        ty
    }

    fn check_expr_raw(&mut self, expr: &mut Expr) -> TypeId {
        let ty = match &mut expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Nil => {
                    let nil = self.arena.nil();
                    self.arena.pointer_to(nil)
                }
                Literal::Bool(_) => self.arena.bool(),
                Literal::Int(_) => self.arena.i32(),
                Literal::Float(_) => self.arena.f32(),
                Literal::Str(_) => self.arena.string(),
            },
            ExprKind::Identifier(sym) => {
                let sym = *sym;
                if let Some(var) = self.scopes.lookup(sym) {
                    let ty = var.ty;
                    self.resolutions.insert(expr.id, Resolution::Local);
                    ty
                } else if let Some(&fn_ty) = self.functions.get(&sym) {
                    self.resolutions.insert(expr.id, Resolution::Function);
                    fn_ty
                } else {
                    self.error(SemanticError::UndeclaredIdentifier {
                        name: self.interner.resolve(sym).to_string(),
                        span: expr.span.into(),
                    });
                    self.arena.invalid()
                }
            }
            ExprKind::Unary(_) => self.check_unary(expr),
            ExprKind::Binary(_) => self.check_binary(expr),
            ExprKind::Comparison(_) => self.check_comparison(expr),
            ExprKind::Call(_) => self.check_call(expr),
            ExprKind::Index(_) => self.check_index(expr),
            ExprKind::Member(_) => self.check_member(expr),
            ExprKind::FunctionLit(_) => self.arena.invalid(),
            ExprKind::ImplicitCast(_) => {
                // Casts are only inserted by this analyzer, already typed
                return *self.expr_types.get(&expr.id).unwrap_or(&self.arena.invalid());
            }
            ExprKind::Bad => self.arena.invalid(),
        };

        if !self.arena.is_invalid(ty) {
            self.expr_types.insert(expr.id, ty);
        }
        ty
    }

    fn check_unary(&mut self, expr: &mut Expr) -> TypeId {
        let ExprKind::Unary(unary) = &mut expr.kind else {
            unreachable!()
        };
        let op = unary.op;
        let operand_ty = self.check_expr_raw(&mut unary.operand);
        if self.arena.is_invalid(operand_ty) {
            return operand_ty;
        }

        match op {
            UnaryOp::Not => {
                let ExprKind::Unary(unary) = &mut expr.kind else {
                    unreachable!()
                };
                if self.arena.is_sql_boolean(operand_ty) {
                    let bool_ty = self.arena.bool();
                    self.insert_cast(&mut unary.operand, CastKind::SqlBoolToBool, bool_ty);
                    return bool_ty;
                }
                if !self.arena.is_bool(operand_ty) {
                    self.error(SemanticError::InvalidOperandType {
                        op: "!".to_string(),
                        ty: self.type_name(operand_ty),
                        span: expr.span.into(),
                    });
                    return self.arena.invalid();
                }
                self.arena.bool()
            }
            UnaryOp::Neg => {
                if !self.arena.is_arithmetic(operand_ty) {
                    self.error(SemanticError::InvalidOperandType {
                        op: "-".to_string(),
                        ty: self.type_name(operand_ty),
                        span: expr.span.into(),
                    });
                    return self.arena.invalid();
                }
                operand_ty
            }
            UnaryOp::BitNot => {
                if !self.arena.is_integer(operand_ty) {
                    self.error(SemanticError::InvalidOperandType {
                        op: "~".to_string(),
                        ty: self.type_name(operand_ty),
                        span: expr.span.into(),
                    });
                    return self.arena.invalid();
                }
                operand_ty
            }
            UnaryOp::Deref => match self.arena.pointee(operand_ty) {
                Some(pointee) if !self.arena.is_nil(pointee) => pointee,
                _ => {
                    self.error(SemanticError::NotAPointer {
                        ty: self.type_name(operand_ty),
                        span: expr.span.into(),
                    });
                    self.arena.invalid()
                }
            },
            UnaryOp::AddrOf => {
                let ExprKind::Unary(unary) = &expr.kind else {
                    unreachable!()
                };
                if !self.is_lvalue(&unary.operand) {
                    self.error(SemanticError::NotAssignable {
                        span: unary.operand.span.into(),
                    });
                    return self.arena.invalid();
                }
                self.arena.pointer_to(operand_ty)
            }
        }
    }

    fn check_binary(&mut self, expr: &mut Expr) -> TypeId {
        let ExprKind::Binary(binary) = &mut expr.kind else {
            unreachable!()
        };
        let op = binary.op;
        let left_ty = self.check_expr_raw(&mut binary.left);
        let right_ty = self.check_expr_raw(&mut binary.right);
        if self.arena.is_invalid(left_ty) || self.arena.is_invalid(right_ty) {
            return self.arena.invalid();
        }
        let span = expr.span;

        match op {
            BinaryOp::And | BinaryOp::Or => {
                let ExprKind::Binary(binary) = &mut expr.kind else {
                    unreachable!()
                };
                let lt = left_ty;
                let rt = right_ty;
                let bool_ty = self.arena.bool();
                for (slot, ty) in [(&mut binary.left, lt), (&mut binary.right, rt)] {
                    if self.arena.is_sql_boolean(ty) {
                        self.insert_cast(slot, CastKind::SqlBoolToBool, bool_ty);
                    } else if !self.arena.is_bool(ty) {
                        self.error(SemanticError::InvalidOperandType {
                            op: if op == BinaryOp::And { "and" } else { "or" }.to_string(),
                            ty: self.type_name(ty),
                            span: slot.span.into(),
                        });
                        return self.arena.invalid();
                    }
                }
                bool_ty
            }
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => {
                if !self.arena.is_integer(left_ty) || !self.arena.is_integer(right_ty) {
                    let bad = if self.arena.is_integer(left_ty) {
                        right_ty
                    } else {
                        left_ty
                    };
                    self.error(SemanticError::InvalidOperandType {
                        op: binary_op_name(op).to_string(),
                        ty: self.type_name(bad),
                        span: span.into(),
                    });
                    return self.arena.invalid();
                }
                let ExprKind::Binary(binary) = &mut expr.kind else {
                    unreachable!()
                };
                let (left, right) = (&mut binary.left, &mut binary.right);
                Self::unify_arithmetic_impl(
                    &mut self.arena,
                    &mut self.expr_types,
                    &mut self.errors,
                    &mut self.next_node_id,
                    self.interner,
                    left,
                    right,
                    left_ty,
                    right_ty,
                    span,
                )
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                let ExprKind::Binary(binary) = &mut expr.kind else {
                    unreachable!()
                };
                let (left, right) = (&mut binary.left, &mut binary.right);
                Self::unify_arithmetic_impl(
                    &mut self.arena,
                    &mut self.expr_types,
                    &mut self.errors,
                    &mut self.next_node_id,
                    self.interner,
                    left,
                    right,
                    left_ty,
                    right_ty,
                    span,
                )
            }
        }
    }

    fn check_comparison(&mut self, expr: &mut Expr) -> TypeId {
        let ExprKind::Comparison(cmp) = &mut expr.kind else {
            unreachable!()
        };
        let op = cmp.op;
        let left_ty = self.check_expr_raw(&mut cmp.left);
        let right_ty = self.check_expr_raw(&mut cmp.right);
        if self.arena.is_invalid(left_ty) || self.arena.is_invalid(right_ty) {
            return self.arena.invalid();
        }
        let span = expr.span;

        // Pointer comparisons: equality only, matching pointees or nil
        if self.arena.is_pointer(left_ty) || self.arena.is_pointer(right_ty) {
            let compatible = left_ty == right_ty
                || self.arena.is_nil_pointer(left_ty)
                || self.arena.is_nil_pointer(right_ty);
            if !compatible
                || !matches!(op, CompareOp::Eq | CompareOp::Ne)
                || !self.arena.is_pointer(left_ty)
                || !self.arena.is_pointer(right_ty)
            {
                self.error(SemanticError::IncomparablePointers {
                    left: self.type_name(left_ty),
                    right: self.type_name(right_ty),
                    span: span.into(),
                });
                return self.arena.invalid();
            }
            return self.arena.bool();
        }

        // Booleans: equality only
        if self.arena.is_bool(left_ty) && self.arena.is_bool(right_ty) {
            if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                self.error(SemanticError::InvalidOperandType {
                    op: compare_op_name(op).to_string(),
                    ty: "bool".to_string(),
                    span: span.into(),
                });
                return self.arena.invalid();
            }
            return self.arena.bool();
        }

        let ExprKind::Comparison(cmp) = &mut expr.kind else {
            unreachable!()
        };
        let (left, right) = (&mut cmp.left, &mut cmp.right);
        let common = Self::unify_arithmetic_impl(
            &mut self.arena,
            &mut self.expr_types,
            &mut self.errors,
            &mut self.next_node_id,
            self.interner,
            left,
            right,
            left_ty,
            right_ty,
            span,
        );
        if self.arena.is_invalid(common) {
            return common;
        }
        if self.arena.is_sql_value(common) {
            self.arena.builtin(BuiltinType::Boolean)
        } else {
            self.arena.bool()
        }
    }

    fn check_call(&mut self, expr: &mut Expr) -> TypeId {
        let span = expr.span;
        let expr_id = expr.id;
        let ExprKind::Call(call) = &mut expr.kind else {
            unreachable!()
        };

        if call.kind == CallKind::Builtin {
            return self.check_builtin_call(expr_id, call, span);
        }

        let ExprKind::Identifier(callee_sym) = &call.callee.kind else {
            self.error(SemanticError::NotCallable {
                ty: "expression".to_string(),
                span: call.callee.span.into(),
            });
            return self.arena.invalid();
        };
        let callee_sym = *callee_sym;

        let Some(&fn_ty) = self.functions.get(&callee_sym) else {
            // A local with this name is not callable; anything else is
            // undeclared
            if self.scopes.lookup(callee_sym).is_some() {
                let ty = self.scopes.lookup(callee_sym).unwrap().ty;
                self.error(SemanticError::NotCallable {
                    ty: self.type_name(ty),
                    span: call.callee.span.into(),
                });
            } else {
                self.error(SemanticError::UndeclaredIdentifier {
                    name: self.interner.resolve(callee_sym).to_string(),
                    span: call.callee.span.into(),
                });
            }
            return self.arena.invalid();
        };

        self.resolutions.insert(call.callee.id, Resolution::Function);
        self.expr_types.insert(call.callee.id, fn_ty);

        let InternedType::Function { params, ret } = self.arena.get(fn_ty) else {
            unreachable!("function table holds function types");
        };
        let params: Vec<TypeId> = params.to_vec();
        let ret = *ret;

        if call.args.len() != params.len() {
            self.error(SemanticError::WrongArgumentCount {
                expected: params.len(),
                found: call.args.len(),
                span: span.into(),
            });
            return self.arena.invalid();
        }

        let ExprKind::Call(call) = &mut expr.kind else {
            unreachable!()
        };
        let mut args = std::mem::take(&mut call.args);
        for (arg, &param_ty) in args.iter_mut().zip(params.iter()) {
            let arg_ty = self.check_expr_raw(arg);
            if self.arena.is_invalid(arg_ty) {
                continue;
            }
            self.coerce_assign(arg, arg_ty, param_ty);
        }
        let ExprKind::Call(call) = &mut expr.kind else {
            unreachable!()
        };
        call.args = args;

        ret
    }

    fn check_index(&mut self, expr: &mut Expr) -> TypeId {
        let span = expr.span;
        let ExprKind::Index(index) = &mut expr.kind else {
            unreachable!()
        };
        let obj_ty = self.check_expr_raw(&mut index.object);
        let idx_ty = self.check_expr_raw(&mut index.index);
        if self.arena.is_invalid(obj_ty) || self.arena.is_invalid(idx_ty) {
            return self.arena.invalid();
        }

        // Arrays may be accessed directly or through a pointer
        let container = self.arena.pointee(obj_ty).unwrap_or(obj_ty);
        match self.arena.get(container).clone() {
            InternedType::Array { elem, .. } => {
                if !self.arena.is_integer(idx_ty) {
                    self.error(SemanticError::NonIntegerIndex {
                        found: self.type_name(idx_ty),
                        span: span.into(),
                    });
                    return self.arena.invalid();
                }
                elem
            }
            InternedType::Map { key, value } => {
                if idx_ty != key {
                    self.error(SemanticError::TypeMismatch {
                        expected: self.type_name(key),
                        found: self.type_name(idx_ty),
                        span: span.into(),
                    });
                    return self.arena.invalid();
                }
                value
            }
            _ => {
                self.error(SemanticError::NotIndexable {
                    ty: self.type_name(obj_ty),
                    span: span.into(),
                });
                self.arena.invalid()
            }
        }
    }

    fn check_member(&mut self, expr: &mut Expr) -> TypeId {
        let span = expr.span;
        let ExprKind::Member(member) = &mut expr.kind else {
            unreachable!()
        };
        let member_sym = member.member;
        let obj_ty = self.check_expr_raw(&mut member.object);
        if self.arena.is_invalid(obj_ty) {
            return obj_ty;
        }

        // Sugared arrow: one level of pointer is looked through
        let struct_ty = self.arena.pointee(obj_ty).unwrap_or(obj_ty);
        if !matches!(self.arena.get(struct_ty), InternedType::Struct { .. }) {
            self.error(SemanticError::NotAStruct {
                ty: self.type_name(obj_ty),
                span: span.into(),
            });
            return self.arena.invalid();
        }

        match self.arena.field_offset(struct_ty, member_sym) {
            Some((field_ty, _)) => field_ty,
            None => {
                self.error(SemanticError::FieldNotFound {
                    ty: self.type_name(struct_ty),
                    field: self.interner.resolve(member_sym).to_string(),
                    span: span.into(),
                });
                self.arena.invalid()
            }
        }
    }

    // ========================================================================
    // Implicit conversions
    // ========================================================================

    pub(crate) fn insert_cast(&mut self, slot: &mut Expr, kind: CastKind, target: TypeId) {
        let span = slot.span;
        let inner = std::mem::replace(
            slot,
            Expr {
                id: NodeId(u32::MAX),
                kind: ExprKind::Bad,
                span,
            },
        );
        let id = self.mint_node_id();
        *slot = Expr {
            id,
            kind: ExprKind::ImplicitCast(Box::new(ImplicitCastExpr {
                cast: kind,
                operand: inner,
            })),
            span,
        };
        self.expr_types.insert(id, target);
    }

    /// Coerce a condition expression to primitive bool
    pub(crate) fn coerce_condition(&mut self, expr: &mut Expr, ty: TypeId) {
        if self.arena.is_invalid(ty) || self.arena.is_bool(ty) {
            return;
        }
        if self.arena.is_sql_boolean(ty) {
            let bool_ty = self.arena.bool();
            self.insert_cast(expr, CastKind::SqlBoolToBool, bool_ty);
            return;
        }
        self.error(SemanticError::ConditionNotBool {
            found: self.type_name(ty),
            span: expr.span.into(),
        });
    }

    /// Try the assignment conversion table; true if `slot` now has type `to`
    pub(crate) fn try_coerce(&mut self, slot: &mut Expr, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        let Some(kind) = self.assign_cast_kind(from, to) else {
            return false;
        };
        self.insert_cast(slot, kind, to);
        true
    }

    pub(crate) fn coerce_assign(&mut self, slot: &mut Expr, from: TypeId, to: TypeId) {
        if self.arena.is_invalid(from) || self.arena.is_invalid(to) {
            return;
        }
        if !self.try_coerce(slot, from, to) {
            self.error(SemanticError::AssignmentMismatch {
                dest: self.type_name(to),
                src: self.type_name(from),
                span: slot.span.into(),
            });
        }
    }

    /// The assignment conversion table. Arithmetic narrowing is allowed here
    /// (unlike binary operand normalization, which only widens).
    fn assign_cast_kind(&mut self, from: TypeId, to: TypeId) -> Option<CastKind> {
        let arena = &self.arena;

        if arena.is_integer(from) && arena.is_integer(to) {
            return Some(CastKind::IntegralCast);
        }
        if arena.is_integer(from) && arena.is_float(to) {
            return Some(CastKind::IntToFloat);
        }
        if arena.is_float(from) && arena.is_integer(to) {
            return Some(CastKind::FloatToInt);
        }
        if let Some(to_builtin) = arena.as_builtin(to) {
            match to_builtin {
                BuiltinType::Integer if arena.is_integer(from) => {
                    return Some(CastKind::IntToSqlInt);
                }
                BuiltinType::Real if arena.is_integer(from) => {
                    return Some(CastKind::IntToSqlDecimal);
                }
                BuiltinType::Real if arena.is_float(from) => {
                    return Some(CastKind::FloatToSqlReal);
                }
                BuiltinType::Real if arena.as_builtin(from) == Some(BuiltinType::Integer) => {
                    return Some(CastKind::SqlIntToSqlReal);
                }
                _ => {}
            }
        }
        if arena.is_sql_boolean(from) && arena.is_bool(to) {
            return Some(CastKind::SqlBoolToBool);
        }
        // nil is assignable to any pointer
        if arena.is_nil_pointer(from) && arena.is_pointer(to) {
            return Some(CastKind::BitCast);
        }
        // *[N]T decays to [*]T
        if let (Some(from_pointee), InternedType::Array { len: None, elem }) =
            (arena.pointee(from), arena.get(to))
        {
            if let InternedType::Array {
                len: Some(_),
                elem: from_elem,
            } = arena.get(from_pointee)
            {
                if from_elem == elem {
                    return Some(CastKind::BitCast);
                }
            }
        }
        None
    }

    /// Normalize the operands of a binary arithmetic or comparison
    /// expression to a common type, inserting casts. Returns the common
    /// type, or invalid after reporting an error.
    #[allow(clippy::too_many_arguments)]
    fn unify_arithmetic_impl(
        arena: &mut TypeArena,
        expr_types: &mut FxHashMap<NodeId, TypeId>,
        errors: &mut Vec<SemanticError>,
        next_node_id: &mut u32,
        interner: &Interner,
        left: &mut Expr,
        right: &mut Expr,
        left_ty: TypeId,
        right_ty: TypeId,
        span: Span,
    ) -> TypeId {
        let mut cast = |slot: &mut Expr, kind: CastKind, target: TypeId| {
            let slot_span = slot.span;
            let inner = std::mem::replace(
                slot,
                Expr {
                    id: NodeId(u32::MAX),
                    kind: ExprKind::Bad,
                    span: slot_span,
                },
            );
            let id = NodeId(*next_node_id);
            *next_node_id += 1;
            *slot = Expr {
                id,
                kind: ExprKind::ImplicitCast(Box::new(ImplicitCastExpr {
                    cast: kind,
                    operand: inner,
                })),
                span: slot_span,
            };
            expr_types.insert(id, target);
        };

        if left_ty == right_ty && (arena.is_arithmetic(left_ty) || arena.is_sql_value(left_ty)) {
            return left_ty;
        }

        // integer <-> integer: widen the narrower operand; on equal widths
        // with mixed signedness the left operand's type wins
        if arena.is_integer(left_ty) && arena.is_integer(right_ty) {
            let (lw, rw) = (arena.int_width(left_ty), arena.int_width(right_ty));
            let target = if rw > lw { right_ty } else { left_ty };
            if left_ty != target {
                cast(left, CastKind::IntegralCast, target);
            }
            if right_ty != target {
                cast(right, CastKind::IntegralCast, target);
            }
            return target;
        }

        // integer <-> float: arithmetic widens to the float
        if arena.is_integer(left_ty) && arena.is_float(right_ty) {
            cast(left, CastKind::IntToFloat, right_ty);
            return right_ty;
        }
        if arena.is_float(left_ty) && arena.is_integer(right_ty) {
            cast(right, CastKind::IntToFloat, left_ty);
            return left_ty;
        }

        // SQL value mixes
        let sql_int = arena.builtin(BuiltinType::Integer);
        let sql_real = arena.builtin(BuiltinType::Real);
        for (a, a_ty, b_ty) in [
            (&mut *left, left_ty, right_ty),
            (&mut *right, right_ty, left_ty),
        ] {
            if b_ty == sql_int && arena.is_integer(a_ty) {
                cast(a, CastKind::IntToSqlInt, sql_int);
                return sql_int;
            }
            if b_ty == sql_real && arena.is_integer(a_ty) {
                cast(a, CastKind::IntToSqlDecimal, sql_real);
                return sql_real;
            }
            if b_ty == sql_real && arena.is_float(a_ty) {
                cast(a, CastKind::FloatToSqlReal, sql_real);
                return sql_real;
            }
            if b_ty == sql_real && a_ty == sql_int {
                cast(a, CastKind::SqlIntToSqlReal, sql_real);
                return sql_real;
            }
        }

        errors.push(SemanticError::MismatchedOperands {
            left: arena.display(left_ty, interner),
            right: arena.display(right_ty, interner),
            span: span.into(),
        });
        arena.invalid()
    }

    pub(crate) fn is_lvalue(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Identifier(_) => {
                self.resolutions.get(&expr.id) == Some(&Resolution::Local)
            }
            ExprKind::Member(_) | ExprKind::Index(_) => true,
            ExprKind::Unary(u) => u.op == UnaryOp::Deref,
            _ => false,
        }
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

fn compare_op_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;

    fn analyze(source: &str) -> Result<AnalyzedFile, Vec<SemanticError>> {
        let mut parser = Parser::new(source);
        let file = parser.parse_file();
        let (interner, errors) = parser.into_parts();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        Analyzer::new(&interner).analyze(file)
    }

    fn count_casts(file: &File) -> usize {
        struct CastCounter(usize);
        impl crate::frontend::visit::Visitor for CastCounter {
            fn visit_expr(&mut self, expr: &Expr) {
                if matches!(expr.kind, ExprKind::ImplicitCast(_)) {
                    self.0 += 1;
                }
                crate::frontend::visit::walk_expr(self, expr);
            }
        }
        let mut counter = CastCounter(0);
        crate::frontend::visit::walk_file(&mut counter, file);
        counter.0
    }

    #[test]
    fn every_expression_is_typed() {
        let analyzed =
            analyze("fun main() -> int32 { var x: int32 = 2; return x * 3 + 1 }").unwrap();
        struct Checker<'a> {
            types: &'a FxHashMap<NodeId, TypeId>,
        }
        impl crate::frontend::visit::Visitor for Checker<'_> {
            fn visit_expr(&mut self, expr: &Expr) {
                assert!(
                    self.types.contains_key(&expr.id),
                    "expression without a type: {:?}",
                    expr
                );
                crate::frontend::visit::walk_expr(self, expr);
            }
        }
        let mut checker = Checker {
            types: &analyzed.expr_types,
        };
        crate::frontend::visit::walk_file(&mut checker, &analyzed.file);
    }

    #[test]
    fn narrowing_assignment_inserts_integral_cast() {
        let analyzed =
            analyze("fun main() -> int8 { var x: int32 = 258; var y: int8 = x; return y }")
                .unwrap();
        assert_eq!(count_casts(&analyzed.file), 1);
    }

    #[test]
    fn mixed_sql_arithmetic_inserts_one_cast() {
        let analyzed = analyze(
            "fun main() -> Integer { var a: Integer = @intToSql(7); var x: int32 = 3; return a + x }",
        )
        .unwrap();
        // exactly one IntToSqlInt on the primitive operand
        struct Finder(usize);
        impl crate::frontend::visit::Visitor for Finder {
            fn visit_expr(&mut self, expr: &Expr) {
                if let ExprKind::ImplicitCast(c) = &expr.kind {
                    if c.cast == CastKind::IntToSqlInt {
                        self.0 += 1;
                    }
                }
                crate::frontend::visit::walk_expr(self, expr);
            }
        }
        let mut finder = Finder(0);
        crate::frontend::visit::walk_file(&mut finder, &analyzed.file);
        assert_eq!(finder.0, 1);
    }

    #[test]
    fn condition_must_be_bool() {
        let errors = analyze("fun f() { if (1) { } }").unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::ConditionNotBool { .. }
        ));
    }

    #[test]
    fn undeclared_identifier_is_reported() {
        let errors = analyze("fun f() -> int32 { return missing }").unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::UndeclaredIdentifier { .. }
        ));
    }

    #[test]
    fn redeclaration_in_same_scope_is_reported() {
        let errors = analyze("fun f() { var x: int32 = 1; var x: int32 = 2 }").unwrap_err();
        assert!(matches!(errors[0], SemanticError::Redeclaration { .. }));
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        assert!(analyze("fun f() { var x: int32 = 1; { var x: int64 = 2 } }").is_ok());
    }

    #[test]
    fn pointer_comparison_requires_matching_pointee() {
        let source = "fun f(a: *int32, b: *int64) -> bool { return a == b }";
        let errors = analyze(source).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::IncomparablePointers { .. }
        ));
    }

    #[test]
    fn pointer_nil_comparison_is_allowed() {
        assert!(analyze("fun f(a: *int32) -> bool { return a == nil }").is_ok());
    }

    #[test]
    fn pointer_ordering_is_rejected() {
        let errors = analyze("fun f(a: *int32, b: *int32) -> bool { return a < b }").unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::IncomparablePointers { .. }
        ));
    }

    #[test]
    fn struct_member_access() {
        let source = "struct Row { a: int32; b: int64 }
                      fun f(r: *Row) -> int64 { return r.b }";
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn unknown_field_is_reported() {
        let source = "struct Row { a: int32 }
                      fun f(r: *Row) -> int32 { return r.missing }";
        let errors = analyze(source).unwrap_err();
        assert!(matches!(errors[0], SemanticError::FieldNotFound { .. }));
    }

    #[test]
    fn call_arity_is_checked() {
        let source = "fun g(x: int32) -> int32 { return x }
                      fun f() -> int32 { return g(1, 2) }";
        let errors = analyze(source).unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::WrongArgumentCount { .. }
        ));
    }

    #[test]
    fn sql_comparison_produces_sql_boolean() {
        let analyzed = analyze(
            "fun f() -> bool { var a: Integer = @intToSql(1); var b: Integer = @intToSql(2); \
             if (a < b) { return true }; return false }",
        )
        .unwrap();
        // The comparison feeds an if condition, so a SqlBoolToBool cast
        // must appear
        struct Finder(bool);
        impl crate::frontend::visit::Visitor for Finder {
            fn visit_expr(&mut self, expr: &Expr) {
                if let ExprKind::ImplicitCast(c) = &expr.kind {
                    if c.cast == CastKind::SqlBoolToBool {
                        self.0 = true;
                    }
                }
                crate::frontend::visit::walk_expr(self, expr);
            }
        }
        let mut finder = Finder(false);
        crate::frontend::visit::walk_file(&mut finder, &analyzed.file);
        assert!(finder.0);
    }

    #[test]
    fn negative_array_length_is_reported() {
        let errors = analyze("fun f() { var a: [0 - 1]int32 }").unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::InvalidArrayLength { .. }
        ));
    }
}
