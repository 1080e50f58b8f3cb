// src/bytecode/generator.rs
//
// Lowers a type-checked AST into bytecode. Walks each function body,
// building its frame (parameters first, then named locals and expression
// temporaries, all naturally aligned) and emitting instructions into the
// module-wide stream. Every expression lowers into a destination local;
// l-values lower into a local whose pointer-read yields the target address.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::bytecode::emitter::BytecodeEmitter;
use crate::bytecode::function_info::{FunctionId, FunctionInfo};
use crate::bytecode::module::BytecodeModule;
use crate::bytecode::opcodes::Bytecode;
use crate::bytecode::operands::LocalVar;
use crate::frontend::ast::*;
use crate::frontend::{Builtin, Interner, Symbol};
use crate::sema::analyzer::{AnalyzedFile, Resolution};
use crate::sema::types::{BuiltinType, InternedType, PrimitiveType, TypeId};

/// Errors surfaced while lowering. Anything else a malformed tree could
/// trigger is a compiler bug and panics.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("unknown table '{name}'")]
    UnknownTable { name: String },
}

pub struct BytecodeGenerator<'a> {
    analyzed: &'a mut AnalyzedFile,
    interner: &'a Interner,
    emitter: BytecodeEmitter,
    functions: Vec<FunctionInfo>,
    func_ids: FxHashMap<Symbol, FunctionId>,
    strings: Vec<String>,
    string_ids: FxHashMap<String, u32>,

    // Per-function state
    current: FunctionInfo,
    scopes: Vec<FxHashMap<Symbol, LocalVar>>,
    /// The hidden return-slot pointer parameter, for value-returning
    /// functions
    return_slot: Option<LocalVar>,
    temp_count: u32,
}

impl<'a> BytecodeGenerator<'a> {
    pub fn generate(
        analyzed: &'a mut AnalyzedFile,
        interner: &'a Interner,
    ) -> Result<BytecodeModule, CodegenError> {
        let mut generator = Self {
            analyzed,
            interner,
            emitter: BytecodeEmitter::new(),
            functions: Vec::new(),
            func_ids: FxHashMap::default(),
            strings: Vec::new(),
            string_ids: FxHashMap::default(),
            current: FunctionInfo::new(0, ""),
            scopes: Vec::new(),
            return_slot: None,
            temp_count: 0,
        };

        // Assign ids up front so forward calls resolve
        let mut decls = std::mem::take(&mut generator.analyzed.file.decls);
        for decl in &decls {
            if let Decl::Function(f) = decl {
                let id = generator.func_ids.len() as FunctionId;
                generator.func_ids.insert(f.name, id);
            }
        }

        for decl in &mut decls {
            if let Decl::Function(f) = decl {
                generator.gen_function(f)?;
            }
        }
        generator.analyzed.file.decls = decls;

        let code = generator.emitter.finish();
        Ok(BytecodeModule::new(
            code,
            generator.functions,
            generator.strings,
        ))
    }

    // ========================================================================
    // Shared lookups
    // ========================================================================

    fn ty(&self, expr: &Expr) -> TypeId {
        *self
            .analyzed
            .expr_types
            .get(&expr.id)
            .unwrap_or_else(|| panic!("untyped expression survived sema: {:?}", expr.span))
    }

    fn size_of(&self, ty: TypeId) -> u32 {
        self.analyzed.arena.size_of(ty)
    }

    fn align_of(&self, ty: TypeId) -> u32 {
        self.analyzed.arena.align_of(ty)
    }

    fn primitive_of(&self, ty: TypeId) -> PrimitiveType {
        match self.analyzed.arena.get(ty) {
            InternedType::Primitive(p) => *p,
            other => panic!("expected a primitive type, found {:?}", other),
        }
    }

    fn new_temp(&mut self, ty: TypeId) -> LocalVar {
        self.temp_count += 1;
        let name = format!("tmp{}", self.temp_count);
        let (size, align) = (self.size_of(ty), self.align_of(ty));
        self.current.new_local(name, ty, size, align)
    }

    fn lookup_var(&self, sym: Symbol) -> LocalVar {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&sym))
            .copied()
            .unwrap_or_else(|| panic!("unresolved identifier survived sema"))
    }

    fn declare_var(&mut self, sym: Symbol, ty: TypeId) -> LocalVar {
        let name = self.interner.resolve(sym).to_string();
        let (size, align) = (self.size_of(ty), self.align_of(ty));
        let local = self.current.new_local(name, ty, size, align);
        self.scopes
            .last_mut()
            .expect("generator scope stack is never empty")
            .insert(sym, local);
        local
    }

    fn string_index(&mut self, s: &str) -> u32 {
        if let Some(&idx) = self.string_ids.get(s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), idx);
        idx
    }

    fn function_id_of(&self, expr: &Expr) -> FunctionId {
        let ExprKind::Identifier(sym) = &expr.kind else {
            panic!("callback argument is not a function name");
        };
        self.func_ids[sym]
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn gen_function(&mut self, decl: &FunctionDecl) -> Result<(), CodegenError> {
        let id = self.func_ids[&decl.name];
        let name = self.interner.resolve(decl.name).to_string();
        self.current = FunctionInfo::new(id, name);
        self.scopes.clear();
        self.scopes.push(FxHashMap::default());
        self.temp_count = 0;

        let fn_ty = self.analyzed.functions[&decl.name];
        let InternedType::Function { params, ret } = self.analyzed.arena.get(fn_ty) else {
            unreachable!("function declarations carry function types");
        };
        let (param_tys, ret_ty): (Vec<TypeId>, TypeId) = (params.to_vec(), *ret);

        // Value-returning functions receive a pointer to the caller's
        // return slot as a synthetic first parameter
        self.return_slot = if self.analyzed.arena.is_nil(ret_ty) {
            None
        } else {
            let ptr_ty = self.analyzed.arena.pointer_to(ret_ty);
            Some(self.current.new_param("hiddenRv", ptr_ty, 8, 8))
        };

        for (param, &ty) in decl.func.sig.params.iter().zip(param_tys.iter()) {
            let name = self.interner.resolve(param.name).to_string();
            let (size, align) = (self.size_of(ty), self.align_of(ty));
            let local = self.current.new_param(name, ty, size, align);
            self.scopes.last_mut().unwrap().insert(param.name, local);
        }

        let start = self.emitter.position();
        self.gen_block(&decl.func.body)?;
        // A trailing Return is harmless when the body already returned on
        // every path
        self.emitter.emit_op(Bytecode::Return);
        let end = self.emitter.position();

        let mut info = std::mem::replace(&mut self.current, FunctionInfo::new(0, ""));
        info.bytecode_offset = start;
        info.bytecode_end = end;
        self.functions.push(info);
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn gen_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        self.scopes.push(FxHashMap::default());
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Decl(decl) => {
                let ty = match (&decl.ty, &decl.init) {
                    (Some(_), _) | (None, Some(_)) => {
                        // The declared/inferred type was recorded by sema on
                        // the initializer or resolved again here
                        self.var_decl_type(decl)
                    }
                    (None, None) => unreachable!("sema rejects untyped var"),
                };
                let local = self.declare_var(decl.name, ty);
                if let Some(init) = &decl.init {
                    let src = self.visit_value(init)?;
                    self.store_into(local.as_address(), src, ty);
                }
                Ok(())
            }
            Stmt::Assign(assign) => {
                let dest = self.visit_lvalue(&assign.dest)?;
                let src = self.visit_value(&assign.src)?;
                self.store_into(dest, src, self.ty(&assign.dest));
                Ok(())
            }
            Stmt::Block(block) => self.gen_block(block),
            Stmt::Expr(expr) => {
                self.visit_value(expr)?;
                Ok(())
            }
            Stmt::If(if_stmt) => self.gen_if(if_stmt),
            Stmt::For(for_stmt) => self.gen_for(for_stmt),
            Stmt::ForIn(for_in) => self.gen_for_in(for_in),
            Stmt::Return(ret) => self.gen_return(ret),
        }
    }

    /// The variable's type: the initializer's result type when inferred,
    /// otherwise the declared type resolved during sema. Both paths land on
    /// the initializer expression's recorded type or the declared repr.
    fn var_decl_type(&mut self, decl: &VariableDecl) -> TypeId {
        if let Some(init) = &decl.init {
            // After cast insertion the initializer's type IS the variable's
            return self.ty(init);
        }
        let repr = decl.ty.as_ref().expect("checked by caller");
        self.resolve_repr_type(repr)
    }

    /// Re-resolve a type representation against the sema tables. Only
    /// reached for declarations without initializers, whose reprs sema has
    /// already validated.
    fn resolve_repr_type(&mut self, repr: &TypeRepr) -> TypeId {
        match repr {
            TypeRepr::Name(sym, _) => {
                let name = self.interner.resolve(*sym);
                match name {
                    "nil" => self.analyzed.arena.nil(),
                    "bool" => self.analyzed.arena.bool(),
                    "int8" => self.analyzed.arena.i8(),
                    "int16" => self.analyzed.arena.i16(),
                    "int32" => self.analyzed.arena.i32(),
                    "int64" => self.analyzed.arena.i64(),
                    "uint8" => self.analyzed.arena.u8(),
                    "uint16" => self.analyzed.arena.u16(),
                    "uint32" => self.analyzed.arena.u32(),
                    "uint64" => self.analyzed.arena.u64(),
                    "float32" => self.analyzed.arena.f32(),
                    "float64" => self.analyzed.arena.f64(),
                    "string" => self.analyzed.arena.string(),
                    _ => {
                        if let Some(&b) = BuiltinType::ALL.iter().find(|b| b.name() == name) {
                            self.analyzed.arena.builtin(b)
                        } else {
                            self.analyzed.structs[sym]
                        }
                    }
                }
            }
            TypeRepr::Pointer(p) => {
                let base = self.resolve_repr_type(&p.base);
                self.analyzed.arena.pointer_to(base)
            }
            TypeRepr::Array(a) => {
                let elem = self.resolve_repr_type(&a.elem);
                let len = a.len.as_ref().map(|e| match &e.kind {
                    ExprKind::Literal(Literal::Int(n)) => *n as u64,
                    _ => unreachable!("sema validated array lengths"),
                });
                self.analyzed.arena.array_of(len, elem)
            }
            TypeRepr::Map(m) => {
                let key = self.resolve_repr_type(&m.key);
                let value = self.resolve_repr_type(&m.value);
                self.analyzed.arena.map_of(key, value)
            }
            TypeRepr::Function(f) => {
                let params: Vec<TypeId> =
                    f.params.iter().map(|p| self.resolve_repr_type(&p.ty)).collect();
                let ret = self.resolve_repr_type(&f.ret);
                self.analyzed.arena.function(params, ret)
            }
            TypeRepr::Struct(s) => {
                let mut fields: smallvec::SmallVec<[(Symbol, TypeId); 4]> =
                    smallvec::SmallVec::new();
                for field in &s.fields {
                    let ty = self.resolve_repr_type(&field.ty);
                    fields.push((field.name, ty));
                }
                self.analyzed.arena.struct_of(None, fields)
            }
        }
    }

    fn gen_if(&mut self, if_stmt: &IfStmt) -> Result<(), CodegenError> {
        let cond = self.visit_value(&if_stmt.cond)?;
        let else_label = self.emitter.new_label();
        self.emitter
            .emit_cond_jump(Bytecode::JumpIfFalse, cond, else_label);
        self.gen_block(&if_stmt.then_block)?;

        match &if_stmt.else_stmt {
            Some(else_stmt) => {
                let end_label = self.emitter.new_label();
                self.emitter.emit_jump(end_label);
                self.emitter.bind_label(else_label);
                self.gen_stmt(else_stmt)?;
                self.emitter.bind_label(end_label);
            }
            None => {
                self.emitter.bind_label(else_label);
            }
        }
        Ok(())
    }

    fn gen_for(&mut self, for_stmt: &ForStmt) -> Result<(), CodegenError> {
        self.scopes.push(FxHashMap::default());
        if let Some(init) = &for_stmt.init {
            self.gen_stmt(init)?;
        }
        let top = self.emitter.new_label();
        let end = self.emitter.new_label();
        self.emitter.bind_label(top);
        if let Some(cond) = &for_stmt.cond {
            let cond_local = self.visit_value(cond)?;
            self.emitter
                .emit_cond_jump(Bytecode::JumpIfFalse, cond_local, end);
        }
        self.gen_block(&for_stmt.body)?;
        if let Some(next) = &for_stmt.next {
            self.gen_stmt(next)?;
        }
        self.emitter.emit_jump(top);
        self.emitter.bind_label(end);
        self.scopes.pop();
        Ok(())
    }

    /// Row loops lower to the iterator-builtin pair chosen from the
    /// iterable's type: table iterators advance block by block; hash table
    /// entry chains walk the same-hash links.
    fn gen_for_in(&mut self, for_in: &ForInStmt) -> Result<(), CodegenError> {
        let iter_ty = self.ty(&for_in.iterable);
        let pointee = self
            .analyzed
            .arena
            .pointee(iter_ty)
            .and_then(|p| self.analyzed.arena.as_builtin(p));

        self.scopes.push(FxHashMap::default());
        match pointee {
            Some(BuiltinType::TableVectorIterator) => {
                let tvi = self.visit_value(&for_in.iterable)?;
                let vpi_builtin = self
                    .analyzed
                    .arena
                    .builtin(BuiltinType::VectorProjectionIterator);
                let vpi_ptr_ty = self.analyzed.arena.pointer_to(vpi_builtin);
                let target = self.declare_var(for_in.target, vpi_ptr_ty);
                let has_more = {
                    let bool_ty = self.analyzed.arena.bool();
                    self.new_temp(bool_ty)
                };

                let top = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.bind_label(top);
                self.emitter
                    .emit_unary(Bytecode::TableVectorIteratorNext, has_more.as_address(), tvi);
                self.emitter
                    .emit_cond_jump(Bytecode::JumpIfFalse, has_more, end);
                self.emitter.emit_unary(
                    Bytecode::TableVectorIteratorGetVPI,
                    target.as_address(),
                    tvi,
                );
                self.gen_block(&for_in.body)?;
                self.emitter.emit_jump(top);
                self.emitter.bind_label(end);
            }
            Some(BuiltinType::HashTableEntry) => {
                let head = self.visit_value(&for_in.iterable)?;
                let target = self.declare_var(for_in.target, iter_ty);
                self.store_into(target.as_address(), head, iter_ty);
                let has_more = {
                    let bool_ty = self.analyzed.arena.bool();
                    self.new_temp(bool_ty)
                };

                let top = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.emitter.bind_label(top);
                self.emitter
                    .emit_unary(Bytecode::IsNotNullPtr, has_more.as_address(), target);
                self.emitter
                    .emit_cond_jump(Bytecode::JumpIfFalse, has_more, end);
                self.gen_block(&for_in.body)?;
                self.emitter
                    .emit_unary(Bytecode::HashTableEntryGetNext, target.as_address(), target);
                self.emitter.emit_jump(top);
                self.emitter.bind_label(end);
            }
            _ => unreachable!("sema validated the iterable"),
        }
        self.scopes.pop();
        Ok(())
    }

    fn gen_return(&mut self, ret: &ReturnStmt) -> Result<(), CodegenError> {
        if let Some(value) = &ret.value {
            let src = self.visit_value(value)?;
            let slot = self.return_slot.expect("sema checked the return");
            self.store_into(slot, src, self.ty(value));
        }
        self.emitter.emit_op(Bytecode::Return);
        Ok(())
    }

    // ========================================================================
    // Stores
    // ========================================================================

    /// Store `src` through the target address `dest` (a local whose
    /// pointer-read yields the destination)
    fn store_into(&mut self, dest: LocalVar, src: LocalVar, ty: TypeId) {
        match self.size_of(ty) {
            1 => self.emitter.emit_unary(Bytecode::Assign1, dest, src),
            2 => self.emitter.emit_unary(Bytecode::Assign2, dest, src),
            4 => self.emitter.emit_unary(Bytecode::Assign4, dest, src),
            8 => self.emitter.emit_unary(Bytecode::Assign8, dest, src),
            n => {
                self.emitter.emit_op(Bytecode::DerefN);
                self.emitter.emit_local(dest);
                self.emitter.emit_local(src.as_address());
                self.emitter.emit_uimm4(n);
            }
        }
    }

    // ========================================================================
    // L-values
    // ========================================================================

    /// Lower an l-value to a local whose pointer-read yields the address of
    /// the target: identifiers in address mode, everything else a temp
    /// holding a computed pointer.
    fn visit_lvalue(&mut self, expr: &Expr) -> Result<LocalVar, CodegenError> {
        match &expr.kind {
            ExprKind::Identifier(sym) => Ok(self.lookup_var(*sym).as_address()),
            ExprKind::Unary(unary) if unary.op == UnaryOp::Deref => {
                self.visit_value(&unary.operand)
            }
            ExprKind::Member(member) => self.member_address(expr, member),
            ExprKind::Index(index) => self.index_address(expr, index),
            _ => unreachable!("sema validated assignability"),
        }
    }

    /// base + constant field offset
    fn member_address(
        &mut self,
        _expr: &Expr,
        member: &MemberExpr,
    ) -> Result<LocalVar, CodegenError> {
        let obj_ty = self.ty(&member.object);
        let (struct_ty, base) = if self.analyzed.arena.is_pointer(obj_ty) {
            (
                self.analyzed.arena.pointee(obj_ty).unwrap(),
                self.visit_value(&member.object)?,
            )
        } else {
            (obj_ty, self.visit_lvalue(&member.object)?)
        };
        let (field_ty, offset) = self
            .analyzed
            .arena
            .field_offset(struct_ty, member.member)
            .expect("sema checked the field");
        let ptr_ty = self.analyzed.arena.pointer_to(field_ty);
        let dest = self.new_temp(ptr_ty);
        self.emitter.emit_op(Bytecode::Lea);
        self.emitter.emit_local(dest.as_address());
        self.emitter.emit_local(base);
        self.emitter.emit_uimm4(offset);
        Ok(dest)
    }

    /// base + index * element size
    fn index_address(
        &mut self,
        _expr: &Expr,
        index: &IndexExpr,
    ) -> Result<LocalVar, CodegenError> {
        let obj_ty = self.ty(&index.object);
        let container = self.analyzed.arena.pointee(obj_ty).unwrap_or(obj_ty);
        let InternedType::Array { elem, .. } = self.analyzed.arena.get(container) else {
            // Maps are a front-end-only type surface with no runtime form
            panic!("only array indexing has a runtime lowering");
        };
        let elem = *elem;
        let elem_size = self.size_of(elem);

        let base = if self.analyzed.arena.is_pointer(obj_ty) {
            self.visit_value(&index.object)?
        } else {
            self.visit_lvalue(&index.object)?
        };
        let idx = self.visit_value(&index.index)?;
        let ptr_ty = self.analyzed.arena.pointer_to(elem);
        let dest = self.new_temp(ptr_ty);
        self.emitter.emit_op(Bytecode::LeaScaled);
        self.emitter.emit_local(dest.as_address());
        self.emitter.emit_local(base);
        self.emitter.emit_local(idx);
        self.emitter.emit_uimm4(elem_size);
        self.emitter.emit_uimm4(0);
        Ok(dest)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn visit_value(&mut self, expr: &Expr) -> Result<LocalVar, CodegenError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(self.gen_literal(expr, lit)),
            ExprKind::Identifier(sym) => Ok(self.lookup_var(*sym)),
            ExprKind::Unary(unary) => self.gen_unary(expr, unary),
            ExprKind::Binary(binary) => self.gen_binary(expr, binary),
            ExprKind::Comparison(cmp) => self.gen_comparison(expr, cmp),
            ExprKind::ImplicitCast(cast) => self.gen_cast(expr, cast),
            ExprKind::Call(call) => self.gen_call(expr, call),
            ExprKind::Member(_) | ExprKind::Index(_) => {
                let ty = self.ty(expr);
                let addr = self.visit_lvalue(expr)?;
                let dest = self.new_temp(ty);
                self.load_through(dest, addr, ty);
                Ok(dest)
            }
            ExprKind::FunctionLit(_) | ExprKind::Bad => {
                unreachable!("not reachable after a clean sema pass")
            }
        }
    }

    fn load_through(&mut self, dest: LocalVar, addr: LocalVar, ty: TypeId) {
        match self.size_of(ty) {
            1 => self.emitter.emit_unary(Bytecode::Deref1, dest.as_address(), addr),
            2 => self.emitter.emit_unary(Bytecode::Deref2, dest.as_address(), addr),
            4 => self.emitter.emit_unary(Bytecode::Deref4, dest.as_address(), addr),
            8 => self.emitter.emit_unary(Bytecode::Deref8, dest.as_address(), addr),
            n => {
                self.emitter.emit_op(Bytecode::DerefN);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(addr);
                self.emitter.emit_uimm4(n);
            }
        }
    }

    fn gen_literal(&mut self, expr: &Expr, lit: &Literal) -> LocalVar {
        let ty = self.ty(expr);
        let dest = self.new_temp(ty);
        match lit {
            Literal::Int(v) => {
                self.emitter.emit_op(Bytecode::AssignImm4);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_imm4(*v);
            }
            Literal::Float(v) => {
                self.emitter.emit_op(Bytecode::AssignImm4);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_imm4(v.to_bits() as i32);
            }
            Literal::Bool(v) => {
                self.emitter.emit_op(Bytecode::AssignImm1);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_imm1(*v as i8);
            }
            Literal::Nil => {
                self.emitter.emit_op(Bytecode::AssignImm8);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_imm8(0);
            }
            Literal::Str(sym) => {
                let idx = self.string_index(&self.interner.resolve(*sym).to_string());
                self.emitter.emit_op(Bytecode::AssignString);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_uimm4(idx);
            }
        }
        dest
    }

    fn gen_unary(&mut self, expr: &Expr, unary: &UnaryExpr) -> Result<LocalVar, CodegenError> {
        match unary.op {
            UnaryOp::Not => {
                let src = self.visit_value(&unary.operand)?;
                let dest = self.new_temp(self.ty(expr));
                self.emitter.emit_unary(Bytecode::Not, dest.as_address(), src);
                Ok(dest)
            }
            UnaryOp::Neg => {
                let src = self.visit_value(&unary.operand)?;
                let ty = self.ty(expr);
                let dest = self.new_temp(ty);
                let op = match self.primitive_of(ty) {
                    PrimitiveType::F32 => Bytecode::NegF32,
                    PrimitiveType::F64 => Bytecode::NegF64,
                    p => int_op_variant(&NEG_INT, p),
                };
                self.emitter.emit_unary(op, dest.as_address(), src);
                Ok(dest)
            }
            UnaryOp::BitNot => {
                let src = self.visit_value(&unary.operand)?;
                let ty = self.ty(expr);
                let dest = self.new_temp(ty);
                let op = int_op_variant(&BIT_NEG_INT, self.primitive_of(ty));
                self.emitter.emit_unary(op, dest.as_address(), src);
                Ok(dest)
            }
            UnaryOp::Deref => {
                let addr = self.visit_value(&unary.operand)?;
                let ty = self.ty(expr);
                let dest = self.new_temp(ty);
                self.load_through(dest, addr, ty);
                Ok(dest)
            }
            UnaryOp::AddrOf => self.visit_lvalue(&unary.operand),
        }
    }

    fn gen_binary(&mut self, expr: &Expr, binary: &BinaryExpr) -> Result<LocalVar, CodegenError> {
        let ty = self.ty(expr);

        // Logical operators short-circuit
        if matches!(binary.op, BinaryOp::And | BinaryOp::Or) {
            let dest = self.new_temp(ty);
            let left = self.visit_value(&binary.left)?;
            self.emitter.emit_unary(Bytecode::Assign1, dest.as_address(), left);
            let end = self.emitter.new_label();
            let jump = if binary.op == BinaryOp::And {
                Bytecode::JumpIfFalse
            } else {
                Bytecode::JumpIfTrue
            };
            self.emitter.emit_cond_jump(jump, dest, end);
            let right = self.visit_value(&binary.right)?;
            self.emitter.emit_unary(Bytecode::Assign1, dest.as_address(), right);
            self.emitter.bind_label(end);
            return Ok(dest);
        }

        let left = self.visit_value(&binary.left)?;
        let right = self.visit_value(&binary.right)?;
        let dest = self.new_temp(ty);

        if let Some(builtin) = self.analyzed.arena.as_builtin(ty) {
            // SQL value arithmetic takes value addresses
            let op = sql_arith_opcode(binary.op, builtin);
            self.emitter.emit_binary(
                op,
                dest.as_address(),
                left.as_address(),
                right.as_address(),
            );
            return Ok(dest);
        }

        let op = match self.primitive_of(ty) {
            PrimitiveType::F32 | PrimitiveType::F64 => {
                float_arith_opcode(binary.op, self.primitive_of(ty))
            }
            p => {
                let table = match binary.op {
                    BinaryOp::Add => &ADD_INT,
                    BinaryOp::Sub => &SUB_INT,
                    BinaryOp::Mul => &MUL_INT,
                    BinaryOp::Div => &DIV_INT,
                    BinaryOp::Rem => &REM_INT,
                    BinaryOp::BitAnd => &BIT_AND_INT,
                    BinaryOp::BitOr => &BIT_OR_INT,
                    BinaryOp::BitXor => &BIT_XOR_INT,
                    BinaryOp::Shl => &SHL_INT,
                    BinaryOp::Shr => &SHR_INT,
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                };
                int_op_variant(table, p)
            }
        };
        self.emitter.emit_binary(op, dest.as_address(), left, right);
        Ok(dest)
    }

    fn gen_comparison(
        &mut self,
        expr: &Expr,
        cmp: &ComparisonExpr,
    ) -> Result<LocalVar, CodegenError> {
        let left_ty = self.ty(&cmp.left);
        let right_ty = self.ty(&cmp.right);
        let result_ty = self.ty(expr);

        // Pointer comparisons; nil tests become null-pointer checks
        if self.analyzed.arena.is_pointer(left_ty) && self.analyzed.arena.is_pointer(right_ty) {
            let dest = self.new_temp(result_ty);
            let left_nil = self.analyzed.arena.is_nil_pointer(left_ty);
            let right_nil = self.analyzed.arena.is_nil_pointer(right_ty);
            if left_nil || right_nil {
                let probe = if left_nil { &cmp.right } else { &cmp.left };
                let ptr = self.visit_value(probe)?;
                let op = match cmp.op {
                    CompareOp::Eq => Bytecode::IsNullPtr,
                    CompareOp::Ne => Bytecode::IsNotNullPtr,
                    _ => unreachable!("sema allows equality only"),
                };
                self.emitter.emit_unary(op, dest.as_address(), ptr);
                return Ok(dest);
            }
            let left = self.visit_value(&cmp.left)?;
            let right = self.visit_value(&cmp.right)?;
            let op = match cmp.op {
                CompareOp::Eq => Bytecode::EqualU64,
                CompareOp::Ne => Bytecode::NotEqualU64,
                _ => unreachable!("sema allows equality only"),
            };
            self.emitter.emit_binary(op, dest.as_address(), left, right);
            return Ok(dest);
        }

        let left = self.visit_value(&cmp.left)?;
        let right = self.visit_value(&cmp.right)?;
        let dest = self.new_temp(result_ty);

        // SQL comparisons produce SQL Booleans through their own opcodes
        if let Some(builtin) = self.analyzed.arena.as_builtin(left_ty) {
            let op = sql_compare_opcode(cmp.op, builtin);
            self.emitter.emit_binary(
                op,
                dest.as_address(),
                left.as_address(),
                right.as_address(),
            );
            return Ok(dest);
        }

        let op = match self.primitive_of(left_ty) {
            PrimitiveType::F32 | PrimitiveType::F64 => {
                float_compare_opcode(cmp.op, self.primitive_of(left_ty))
            }
            PrimitiveType::Bool => match cmp.op {
                CompareOp::Eq => Bytecode::EqualU8,
                CompareOp::Ne => Bytecode::NotEqualU8,
                _ => unreachable!("sema allows equality only"),
            },
            p => {
                let table = match cmp.op {
                    CompareOp::Eq => &EQ_INT,
                    CompareOp::Ne => &NE_INT,
                    CompareOp::Lt => &LT_INT,
                    CompareOp::Le => &LE_INT,
                    CompareOp::Gt => &GT_INT,
                    CompareOp::Ge => &GE_INT,
                };
                int_op_variant(table, p)
            }
        };
        self.emitter.emit_binary(op, dest.as_address(), left, right);
        Ok(dest)
    }

    // ========================================================================
    // Implicit casts
    // ========================================================================

    fn gen_cast(
        &mut self,
        expr: &Expr,
        cast: &ImplicitCastExpr,
    ) -> Result<LocalVar, CodegenError> {
        let src_ty = self.ty(&cast.operand);
        let dst_ty = self.ty(expr);
        let src = self.visit_value(&cast.operand)?;

        match cast.cast {
            CastKind::BitCast => Ok(src), // reuse the source storage
            CastKind::IntegralCast => Ok(self.integral_cast(src, src_ty, dst_ty)),
            CastKind::IntToFloat => {
                let wide = self.widen_to_i64(src, src_ty);
                let dest = self.new_temp(dst_ty);
                let op = match self.primitive_of(dst_ty) {
                    PrimitiveType::F32 => Bytecode::I64ToF32,
                    _ => Bytecode::I64ToF64,
                };
                self.emitter.emit_unary(op, dest.as_address(), wide);
                Ok(dest)
            }
            CastKind::FloatToInt => {
                let i64_ty = self.analyzed.arena.i64();
                let wide = self.new_temp(i64_ty);
                let op = match self.primitive_of(src_ty) {
                    PrimitiveType::F32 => Bytecode::F32ToI64,
                    _ => Bytecode::F64ToI64,
                };
                self.emitter.emit_unary(op, wide.as_address(), src);
                Ok(self.integral_cast(wide, i64_ty, dst_ty))
            }
            CastKind::SqlBoolToBool => {
                let dest = self.new_temp(dst_ty);
                self.emitter
                    .emit_unary(Bytecode::ForceBoolTruth, dest.as_address(), src.as_address());
                Ok(dest)
            }
            CastKind::IntToSqlInt => {
                let wide = self.widen_to_i64(src, src_ty);
                let dest = self.new_temp(dst_ty);
                self.emitter
                    .emit_unary(Bytecode::InitInteger, dest.as_address(), wide);
                Ok(dest)
            }
            CastKind::IntToSqlDecimal => {
                let wide = self.widen_to_i64(src, src_ty);
                let f64_ty = self.analyzed.arena.f64();
                let double = self.new_temp(f64_ty);
                self.emitter
                    .emit_unary(Bytecode::I64ToF64, double.as_address(), wide);
                let dest = self.new_temp(dst_ty);
                self.emitter
                    .emit_unary(Bytecode::InitReal, dest.as_address(), double);
                Ok(dest)
            }
            CastKind::FloatToSqlReal => {
                let double = if self.primitive_of(src_ty) == PrimitiveType::F32 {
                    let f64_ty = self.analyzed.arena.f64();
                    let wide = self.new_temp(f64_ty);
                    self.emitter
                        .emit_unary(Bytecode::F32ToF64, wide.as_address(), src);
                    wide
                } else {
                    src
                };
                let dest = self.new_temp(dst_ty);
                self.emitter
                    .emit_unary(Bytecode::InitReal, dest.as_address(), double);
                Ok(dest)
            }
            CastKind::SqlIntToSqlReal => {
                let dest = self.new_temp(dst_ty);
                self.emitter
                    .emit_unary(Bytecode::IntegerToReal, dest.as_address(), src.as_address());
                Ok(dest)
            }
        }
    }

    /// Truncation reads the low bytes; widening goes through a 64-bit
    /// sign/zero extension
    fn integral_cast(&mut self, src: LocalVar, src_ty: TypeId, dst_ty: TypeId) -> LocalVar {
        let src_width = self.analyzed.arena.int_width(src_ty);
        let dst_width = self.analyzed.arena.int_width(dst_ty);
        if src_width == dst_width {
            return src;
        }
        if src_width > dst_width {
            let dest = self.new_temp(dst_ty);
            let op = match dst_width {
                1 => Bytecode::Assign1,
                2 => Bytecode::Assign2,
                4 => Bytecode::Assign4,
                _ => Bytecode::Assign8,
            };
            self.emitter.emit_unary(op, dest.as_address(), src);
            return dest;
        }
        let wide = self.widen_to_i64(src, src_ty);
        if dst_width == 8 {
            // Reinterpret the 64-bit temp as the destination type
            return wide;
        }
        let dest = self.new_temp(dst_ty);
        let op = match dst_width {
            1 => Bytecode::Assign1,
            2 => Bytecode::Assign2,
            _ => Bytecode::Assign4,
        };
        self.emitter.emit_unary(op, dest.as_address(), wide);
        dest
    }

    fn widen_to_i64(&mut self, src: LocalVar, src_ty: TypeId) -> LocalVar {
        if self.analyzed.arena.int_width(src_ty) == 8 {
            return src;
        }
        let op = match self.primitive_of(src_ty) {
            PrimitiveType::I8 => Bytecode::SignExtendI8,
            PrimitiveType::I16 => Bytecode::SignExtendI16,
            PrimitiveType::I32 => Bytecode::SignExtendI32,
            PrimitiveType::U8 => Bytecode::ZeroExtendU8,
            PrimitiveType::U16 => Bytecode::ZeroExtendU16,
            PrimitiveType::U32 => Bytecode::ZeroExtendU32,
            other => unreachable!("not an extendable integer: {:?}", other),
        };
        let i64_ty = self.analyzed.arena.i64();
        let dest = self.new_temp(i64_ty);
        self.emitter.emit_unary(op, dest.as_address(), src);
        dest
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn gen_call(&mut self, expr: &Expr, call: &CallExpr) -> Result<LocalVar, CodegenError> {
        if call.kind == CallKind::Builtin {
            return self.gen_builtin_call(expr, call);
        }

        let ExprKind::Identifier(callee) = &call.callee.kind else {
            unreachable!("sema validated callees");
        };
        let func_id = self.func_ids[callee];
        let ret_ty = self.ty(expr);
        let returns_value = !self.analyzed.arena.is_nil(ret_ty);

        let dest = if returns_value {
            Some(self.new_temp(ret_ty))
        } else {
            None
        };

        let mut arg_locals = Vec::with_capacity(call.args.len() + 1);
        if let Some(dest) = dest {
            // The return slot travels as a pointer in the first parameter
            arg_locals.push(dest.as_address());
        }
        for arg in &call.args {
            arg_locals.push(self.visit_value(arg)?);
        }

        self.emitter.emit_op(Bytecode::Call);
        self.emitter.emit_function_id(func_id);
        self.emitter.emit_local_count(arg_locals.len() as u16);
        for local in arg_locals {
            self.emitter.emit_local(local);
        }

        Ok(dest.unwrap_or(LocalVar::value(0)))
    }

    fn gen_builtin_call(
        &mut self,
        expr: &Expr,
        call: &CallExpr,
    ) -> Result<LocalVar, CodegenError> {
        let Some(Resolution::Builtin(builtin)) = self.analyzed.resolutions.get(&call.callee.id)
        else {
            unreachable!("sema resolved builtin callees");
        };
        self.gen_builtin(expr, call, *builtin)
    }
}

/// Which lifecycle operation an aggregator builtin performs
#[derive(Clone, Copy)]
enum AggOp {
    Init,
    Advance,
    Merge,
    Reset,
    GetResult,
}

impl<'a> BytecodeGenerator<'a> {
    // ========================================================================
    // Builtin lowering: small fixed-shape builtins become single dedicated
    // opcodes; runtime builtins become the opcode naming their shim.
    // ========================================================================

    fn gen_builtin(
        &mut self,
        expr: &Expr,
        call: &CallExpr,
        builtin: Builtin,
    ) -> Result<LocalVar, CodegenError> {
        use Builtin::*;
        let ret_ty = self.ty(expr);

        match builtin {
            // ----------------------------------------------------------------
            // Conversions
            // ----------------------------------------------------------------
            IntToSql => {
                let src_ty = self.ty(&call.args[0]);
                let src = self.visit_value(&call.args[0])?;
                let wide = self.widen_to_i64(src, src_ty);
                let dest = self.new_temp(ret_ty);
                self.emitter
                    .emit_unary(Bytecode::InitInteger, dest.as_address(), wide);
                Ok(dest)
            }
            FloatToSql => {
                let src_ty = self.ty(&call.args[0]);
                let src = self.visit_value(&call.args[0])?;
                let double = if self.primitive_of(src_ty) == PrimitiveType::F32 {
                    let f64_ty = self.analyzed.arena.f64();
                    let wide = self.new_temp(f64_ty);
                    self.emitter
                        .emit_unary(Bytecode::F32ToF64, wide.as_address(), src);
                    wide
                } else {
                    src
                };
                let dest = self.new_temp(ret_ty);
                self.emitter
                    .emit_unary(Bytecode::InitReal, dest.as_address(), double);
                Ok(dest)
            }
            BoolToSql => {
                let src = self.visit_value(&call.args[0])?;
                let dest = self.new_temp(ret_ty);
                self.emitter
                    .emit_unary(Bytecode::InitBool, dest.as_address(), src);
                Ok(dest)
            }
            DateToSql => {
                let year = self.visit_value(&call.args[0])?;
                let month = self.visit_value(&call.args[1])?;
                let day = self.visit_value(&call.args[2])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::InitDate);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(year);
                self.emitter.emit_local(month);
                self.emitter.emit_local(day);
                Ok(dest)
            }
            StringToSql => {
                let idx = self.literal_string_index(&call.args[0]);
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::InitString);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_uimm4(idx);
                Ok(dest)
            }
            SqlToBool => {
                let src = self.visit_value(&call.args[0])?;
                let dest = self.new_temp(ret_ty);
                self.emitter
                    .emit_unary(Bytecode::ForceBoolTruth, dest.as_address(), src.as_address());
                Ok(dest)
            }

            // ----------------------------------------------------------------
            // SQL string functions
            // ----------------------------------------------------------------
            Like => {
                let input = self.visit_value(&call.args[0])?;
                let pattern = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_binary(
                    Bytecode::Like,
                    dest.as_address(),
                    input.as_address(),
                    pattern.as_address(),
                );
                Ok(dest)
            }
            Concat => {
                let mut acc = self.visit_value(&call.args[0])?;
                for arg in &call.args[1..] {
                    let next = self.visit_value(arg)?;
                    let dest = self.new_temp(ret_ty);
                    self.emitter.emit_binary(
                        Bytecode::Concat,
                        dest.as_address(),
                        acc.as_address(),
                        next.as_address(),
                    );
                    acc = dest;
                }
                Ok(acc)
            }
            ExtractYear => {
                let date = self.visit_value(&call.args[0])?;
                let dest = self.new_temp(ret_ty);
                self.emitter
                    .emit_unary(Bytecode::ExtractYear, dest.as_address(), date.as_address());
                Ok(dest)
            }

            // ----------------------------------------------------------------
            // Hashing: hash the first value, then fold the rest in
            // ----------------------------------------------------------------
            Hash => {
                let dest = self.new_temp(ret_ty);
                for (i, arg) in call.args.iter().enumerate() {
                    let value = self.visit_value(arg)?;
                    let op = self.hash_opcode(arg);
                    if i == 0 {
                        self.emitter
                            .emit_unary(op, dest.as_address(), value.as_address());
                    } else {
                        let u64_ty = self.analyzed.arena.u64();
                        let partial = self.new_temp(u64_ty);
                        self.emitter
                            .emit_unary(op, partial.as_address(), value.as_address());
                        self.emitter
                            .emit_unary(Bytecode::HashCombine, dest.as_address(), partial);
                    }
                }
                Ok(dest)
            }

            // ----------------------------------------------------------------
            // Execution context
            // ----------------------------------------------------------------
            ExecCtxGetMemoryPool => self.dest_obj(call, ret_ty, Bytecode::ExecutionContextGetMemoryPool),
            ResultBufferAllocRow => self.dest_obj(call, ret_ty, Bytecode::ResultBufferAllocRow),
            ResultBufferFinalize => self.obj_only(call, Bytecode::ResultBufferFinalize),

            // ----------------------------------------------------------------
            // Thread state container
            // ----------------------------------------------------------------
            ThreadStateContainerInit => self.obj_pair(call, Bytecode::ThreadStateContainerInit),
            ThreadStateContainerReset => {
                let tsc = self.visit_value(&call.args[0])?;
                let size = self.visit_value(&call.args[1])?;
                let init_fn = self.function_id_of(&call.args[2]);
                let destroy_fn = self.function_id_of(&call.args[3]);
                let ctx = self.visit_value(&call.args[4])?;
                self.emitter.emit_op(Bytecode::ThreadStateContainerReset);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(size);
                self.emitter.emit_function_id(init_fn);
                self.emitter.emit_function_id(destroy_fn);
                self.emitter.emit_local(ctx);
                Ok(LocalVar::value(0))
            }
            ThreadStateContainerIterate => {
                let tsc = self.visit_value(&call.args[0])?;
                let ctx = self.visit_value(&call.args[1])?;
                let iterate_fn = self.function_id_of(&call.args[2]);
                self.emitter.emit_op(Bytecode::ThreadStateContainerIterate);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(ctx);
                self.emitter.emit_function_id(iterate_fn);
                Ok(LocalVar::value(0))
            }
            ThreadStateContainerFree => self.obj_only(call, Bytecode::ThreadStateContainerFree),

            // ----------------------------------------------------------------
            // Table scans
            // ----------------------------------------------------------------
            TableIterInit => {
                let tvi = self.visit_value(&call.args[0])?;
                let table_id = self.table_id_for(&call.args[1])?;
                self.emitter.emit_op(Bytecode::TableVectorIteratorInit);
                self.emitter.emit_local(tvi);
                self.emitter.emit_uimm2(table_id);
                Ok(LocalVar::value(0))
            }
            TableIterAdvance => self.dest_obj(call, ret_ty, Bytecode::TableVectorIteratorNext),
            TableIterGetVPI => self.dest_obj(call, ret_ty, Bytecode::TableVectorIteratorGetVPI),
            TableIterClose => self.obj_only(call, Bytecode::TableVectorIteratorClose),
            TableIterParallel => {
                let table_id = self.table_id_for(&call.args[0])?;
                let query_state = self.visit_value(&call.args[1])?;
                let tsc = self.visit_value(&call.args[2])?;
                let scan_fn = self.function_id_of(&call.args[3]);
                self.emitter.emit_op(Bytecode::ParallelScanTable);
                self.emitter.emit_uimm2(table_id);
                self.emitter.emit_local(query_state);
                self.emitter.emit_local(tsc);
                self.emitter.emit_function_id(scan_fn);
                Ok(LocalVar::value(0))
            }

            // ----------------------------------------------------------------
            // Vector projection iterator
            // ----------------------------------------------------------------
            VpiIsFiltered => self.dest_obj(call, ret_ty, Bytecode::VpiIsFiltered),
            VpiSelectedRowCount => self.dest_obj(call, ret_ty, Bytecode::VpiGetSelectedRowCount),
            VpiHasNext => self.dest_obj(call, ret_ty, Bytecode::VpiHasNext),
            VpiHasNextFiltered => self.dest_obj(call, ret_ty, Bytecode::VpiHasNextFiltered),
            VpiAdvance => self.obj_only(call, Bytecode::VpiAdvance),
            VpiAdvanceFiltered => self.obj_only(call, Bytecode::VpiAdvanceFiltered),
            VpiSetPosition => self.obj_pair(call, Bytecode::VpiSetPosition),
            VpiSetPositionFiltered => self.obj_pair(call, Bytecode::VpiSetPositionFiltered),
            VpiMatch => self.obj_pair(call, Bytecode::VpiMatch),
            VpiReset => self.obj_only(call, Bytecode::VpiReset),
            VpiResetFiltered => self.obj_only(call, Bytecode::VpiResetFiltered),
            VpiGetSmallInt => self.vpi_get(call, ret_ty, Bytecode::VpiGetSmallInt),
            VpiGetInt => self.vpi_get(call, ret_ty, Bytecode::VpiGetInt),
            VpiGetBigInt => self.vpi_get(call, ret_ty, Bytecode::VpiGetBigInt),
            VpiGetReal => self.vpi_get(call, ret_ty, Bytecode::VpiGetReal),
            VpiGetDouble => self.vpi_get(call, ret_ty, Bytecode::VpiGetDouble),
            VpiGetDate => self.vpi_get(call, ret_ty, Bytecode::VpiGetDate),
            VpiGetString => self.vpi_get(call, ret_ty, Bytecode::VpiGetString),
            VpiSetSmallInt => self.vpi_set(call, Bytecode::VpiSetSmallInt),
            VpiSetInt => self.vpi_set(call, Bytecode::VpiSetInt),
            VpiSetBigInt => self.vpi_set(call, Bytecode::VpiSetBigInt),
            VpiSetReal => self.vpi_set(call, Bytecode::VpiSetReal),
            VpiSetDouble => self.vpi_set(call, Bytecode::VpiSetDouble),
            VpiSetDate => self.vpi_set(call, Bytecode::VpiSetDate),
            VpiSetString => self.vpi_set(call, Bytecode::VpiSetString),

            // ----------------------------------------------------------------
            // Filter manager
            // ----------------------------------------------------------------
            FilterManagerInit => self.obj_only(call, Bytecode::FilterManagerInit),
            FilterManagerInsertFilter => {
                let fm = self.visit_value(&call.args[0])?;
                for arg in &call.args[1..] {
                    let filter_fn = self.function_id_of(arg);
                    self.emitter.emit_op(Bytecode::FilterManagerInsertFilter);
                    self.emitter.emit_local(fm);
                    self.emitter.emit_function_id(filter_fn);
                }
                Ok(LocalVar::value(0))
            }
            FilterManagerFinalize => self.obj_only(call, Bytecode::FilterManagerFinalize),
            FilterManagerRunFilters => self.obj_pair(call, Bytecode::FilterManagerRunFilters),
            FilterManagerFree => self.obj_only(call, Bytecode::FilterManagerFree),

            // ----------------------------------------------------------------
            // Vector filter executor
            // ----------------------------------------------------------------
            VectorFilterExecInit => self.obj_pair(call, Bytecode::VectorFilterExecuteInit),
            VectorFilterExecEqual => self.vector_filter(call, Bytecode::VectorFilterExecuteEqual),
            VectorFilterExecGreaterThan => {
                self.vector_filter(call, Bytecode::VectorFilterExecuteGreaterThan)
            }
            VectorFilterExecGreaterThanEqual => {
                self.vector_filter(call, Bytecode::VectorFilterExecuteGreaterThanEqual)
            }
            VectorFilterExecLessThan => {
                self.vector_filter(call, Bytecode::VectorFilterExecuteLessThan)
            }
            VectorFilterExecLessThanEqual => {
                self.vector_filter(call, Bytecode::VectorFilterExecuteLessThanEqual)
            }
            VectorFilterExecNotEqual => {
                self.vector_filter(call, Bytecode::VectorFilterExecuteNotEqual)
            }
            VectorFilterExecFinish => self.obj_only(call, Bytecode::VectorFilterExecuteFinish),
            VectorFilterExecFree => self.obj_only(call, Bytecode::VectorFilterExecuteFree),

            // ----------------------------------------------------------------
            // Aggregation hash table
            // ----------------------------------------------------------------
            AggHashTableInit => {
                let aht = self.visit_value(&call.args[0])?;
                let pool = self.visit_value(&call.args[1])?;
                let payload = self.visit_value(&call.args[2])?;
                self.emitter.emit_op(Bytecode::AggregationHashTableInit);
                self.emitter.emit_local(aht);
                self.emitter.emit_local(pool);
                self.emitter.emit_local(payload);
                Ok(LocalVar::value(0))
            }
            AggHashTableInsert => {
                let aht = self.visit_value(&call.args[0])?;
                let hash = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::AggregationHashTableInsert);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(aht);
                self.emitter.emit_local(hash);
                Ok(dest)
            }
            AggHashTableLookup => {
                let aht = self.visit_value(&call.args[0])?;
                let hash = self.visit_value(&call.args[1])?;
                let key_eq_fn = self.function_id_of(&call.args[2]);
                let probe = self.visit_value(&call.args[3])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::AggregationHashTableLookup);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(aht);
                self.emitter.emit_local(hash);
                self.emitter.emit_function_id(key_eq_fn);
                self.emitter.emit_local(probe);
                Ok(dest)
            }
            AggHashTableProcessBatch => {
                let aht = self.visit_value(&call.args[0])?;
                let vpi = self.visit_value(&call.args[1])?;
                let fns: Vec<FunctionId> = (2..=5)
                    .map(|i| self.function_id_of(&call.args[i]))
                    .collect();
                let partitioned = self.visit_value(&call.args[6])?;
                self.emitter
                    .emit_op(Bytecode::AggregationHashTableProcessBatch);
                self.emitter.emit_local(aht);
                self.emitter.emit_local(vpi);
                for id in fns {
                    self.emitter.emit_function_id(id);
                }
                self.emitter.emit_local(partitioned);
                Ok(LocalVar::value(0))
            }
            AggHashTableMovePartitions => {
                let aht = self.visit_value(&call.args[0])?;
                let tsc = self.visit_value(&call.args[1])?;
                let offset = self.visit_value(&call.args[2])?;
                let merge_fn = self.function_id_of(&call.args[3]);
                self.emitter
                    .emit_op(Bytecode::AggregationHashTableTransferPartitions);
                self.emitter.emit_local(aht);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(offset);
                self.emitter.emit_function_id(merge_fn);
                Ok(LocalVar::value(0))
            }
            AggHashTableParallelPartitionedScan => {
                let aht = self.visit_value(&call.args[0])?;
                let query_state = self.visit_value(&call.args[1])?;
                let tsc = self.visit_value(&call.args[2])?;
                let scan_fn = self.function_id_of(&call.args[3]);
                self.emitter
                    .emit_op(Bytecode::AggregationHashTableParallelPartitionedScan);
                self.emitter.emit_local(aht);
                self.emitter.emit_local(query_state);
                self.emitter.emit_local(tsc);
                self.emitter.emit_function_id(scan_fn);
                Ok(LocalVar::value(0))
            }
            AggHashTableFree => self.obj_only(call, Bytecode::AggregationHashTableFree),
            AggHashTableIterInit => self.obj_pair(call, Bytecode::AggregationHashTableIteratorInit),
            AggHashTableIterHasNext => {
                self.dest_obj(call, ret_ty, Bytecode::AggregationHashTableIteratorHasNext)
            }
            AggHashTableIterNext => self.obj_only(call, Bytecode::AggregationHashTableIteratorNext),
            AggHashTableIterGetRow => {
                self.dest_obj(call, ret_ty, Bytecode::AggregationHashTableIteratorGetRow)
            }
            AggHashTableIterClose => self.obj_only(call, Bytecode::AggregationHashTableIteratorFree),
            AggPartIterHasNext => {
                self.dest_obj(call, ret_ty, Bytecode::AggregationOverflowPartitionIteratorHasNext)
            }
            AggPartIterNext => {
                self.obj_only(call, Bytecode::AggregationOverflowPartitionIteratorNext)
            }
            AggPartIterGetHash => {
                self.dest_obj(call, ret_ty, Bytecode::AggregationOverflowPartitionIteratorGetHash)
            }
            AggPartIterGetRow => {
                self.dest_obj(call, ret_ty, Bytecode::AggregationOverflowPartitionIteratorGetRow)
            }

            // ----------------------------------------------------------------
            // Aggregators: pick the opcode from the aggregator's type
            // ----------------------------------------------------------------
            AggInit => self.agg_lifecycle(call, AggOp::Init),
            AggAdvance => self.agg_lifecycle(call, AggOp::Advance),
            AggMerge => self.agg_lifecycle(call, AggOp::Merge),
            AggReset => self.agg_lifecycle(call, AggOp::Reset),
            AggResult => {
                let agg_ty = self.ty(&call.args[0]);
                let kind = self.aggregator_kind(agg_ty);
                let agg = self.visit_value(&call.args[0])?;
                let dest = self.new_temp(ret_ty);
                let op = agg_opcode(kind, AggOp::GetResult);
                self.emitter.emit_unary(op, dest.as_address(), agg);
                Ok(dest)
            }

            // ----------------------------------------------------------------
            // Join hash table
            // ----------------------------------------------------------------
            JoinHashTableInit => {
                let jht = self.visit_value(&call.args[0])?;
                let pool = self.visit_value(&call.args[1])?;
                let size = self.visit_value(&call.args[2])?;
                self.emitter.emit_op(Bytecode::JoinHashTableInit);
                self.emitter.emit_local(jht);
                self.emitter.emit_local(pool);
                self.emitter.emit_local(size);
                Ok(LocalVar::value(0))
            }
            JoinHashTableAllocTuple => {
                let jht = self.visit_value(&call.args[0])?;
                let hash = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::JoinHashTableAllocTuple);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(jht);
                self.emitter.emit_local(hash);
                Ok(dest)
            }
            JoinHashTableBuild => self.obj_only(call, Bytecode::JoinHashTableBuild),
            JoinHashTableBuildParallel => {
                let jht = self.visit_value(&call.args[0])?;
                let tsc = self.visit_value(&call.args[1])?;
                let offset = self.visit_value(&call.args[2])?;
                self.emitter.emit_op(Bytecode::JoinHashTableBuildParallel);
                self.emitter.emit_local(jht);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(offset);
                Ok(LocalVar::value(0))
            }
            JoinHashTableLookup => {
                let jht = self.visit_value(&call.args[0])?;
                let hash = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::JoinHashTableLookup);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(jht);
                self.emitter.emit_local(hash);
                Ok(dest)
            }
            JoinHashTableFree => self.obj_only(call, Bytecode::JoinHashTableFree),
            HashTableEntryIterHasNext => {
                self.dest_obj(call, ret_ty, Bytecode::HashTableEntryIterHasNext)
            }
            HashTableEntryIterGetRow => {
                self.dest_obj(call, ret_ty, Bytecode::HashTableEntryIterGetRow)
            }

            // ----------------------------------------------------------------
            // Sorting
            // ----------------------------------------------------------------
            SorterInit => {
                let sorter = self.visit_value(&call.args[0])?;
                let pool = self.visit_value(&call.args[1])?;
                let cmp_fn = self.function_id_of(&call.args[2]);
                let size = self.visit_value(&call.args[3])?;
                self.emitter.emit_op(Bytecode::SorterInit);
                self.emitter.emit_local(sorter);
                self.emitter.emit_local(pool);
                self.emitter.emit_function_id(cmp_fn);
                self.emitter.emit_local(size);
                Ok(LocalVar::value(0))
            }
            SorterInsert => self.dest_obj(call, ret_ty, Bytecode::SorterInsert),
            SorterInsertTopK => {
                let sorter = self.visit_value(&call.args[0])?;
                let k = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::SorterInsertTopK);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(sorter);
                self.emitter.emit_local(k);
                Ok(dest)
            }
            SorterInsertTopKFinish => self.obj_pair(call, Bytecode::SorterInsertTopKFinish),
            SorterSort => self.obj_only(call, Bytecode::SorterSort),
            SorterSortParallel => {
                let sorter = self.visit_value(&call.args[0])?;
                let tsc = self.visit_value(&call.args[1])?;
                let offset = self.visit_value(&call.args[2])?;
                self.emitter.emit_op(Bytecode::SorterSortParallel);
                self.emitter.emit_local(sorter);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(offset);
                Ok(LocalVar::value(0))
            }
            SorterSortTopKParallel => {
                let sorter = self.visit_value(&call.args[0])?;
                let tsc = self.visit_value(&call.args[1])?;
                let offset = self.visit_value(&call.args[2])?;
                let k = self.visit_value(&call.args[3])?;
                self.emitter.emit_op(Bytecode::SorterSortTopKParallel);
                self.emitter.emit_local(sorter);
                self.emitter.emit_local(tsc);
                self.emitter.emit_local(offset);
                self.emitter.emit_local(k);
                Ok(LocalVar::value(0))
            }
            SorterFree => self.obj_only(call, Bytecode::SorterFree),
            SorterIterInit => self.obj_pair(call, Bytecode::SorterIteratorInit),
            SorterIterHasNext => self.dest_obj(call, ret_ty, Bytecode::SorterIteratorHasNext),
            SorterIterNext => self.obj_only(call, Bytecode::SorterIteratorNext),
            SorterIterGetRow => self.dest_obj(call, ret_ty, Bytecode::SorterIteratorGetRow),
            SorterIterClose => self.obj_only(call, Bytecode::SorterIteratorFree),

            // ----------------------------------------------------------------
            // CSV reader
            // ----------------------------------------------------------------
            CsvReaderInit => {
                let dest = self.new_temp(ret_ty);
                let reader = self.visit_value(&call.args[0])?;
                let idx = self.literal_string_index(&call.args[1]);
                self.emitter.emit_op(Bytecode::CsvReaderInit);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_local(reader);
                self.emitter.emit_uimm4(idx);
                Ok(dest)
            }
            CsvReaderAdvance => self.dest_obj(call, ret_ty, Bytecode::CsvReaderAdvance),
            CsvReaderGetField => {
                let reader = self.visit_value(&call.args[0])?;
                let col = self.literal_u32(&call.args[1]);
                let out = self.visit_value(&call.args[2])?;
                self.emitter.emit_op(Bytecode::CsvReaderGetField);
                self.emitter.emit_local(reader);
                self.emitter.emit_uimm4(col);
                self.emitter.emit_local(out);
                Ok(LocalVar::value(0))
            }
            CsvReaderClose => self.obj_only(call, Bytecode::CsvReaderClose),

            // ----------------------------------------------------------------
            // Math
            // ----------------------------------------------------------------
            ACos => self.real_math(call, ret_ty, Bytecode::ACosReal),
            ASin => self.real_math(call, ret_ty, Bytecode::ASinReal),
            ATan => self.real_math(call, ret_ty, Bytecode::ATanReal),
            Cos => self.real_math(call, ret_ty, Bytecode::CosReal),
            Cot => self.real_math(call, ret_ty, Bytecode::CotReal),
            Sin => self.real_math(call, ret_ty, Bytecode::SinReal),
            Tan => self.real_math(call, ret_ty, Bytecode::TanReal),
            Exp => self.real_math(call, ret_ty, Bytecode::ExpReal),
            Sqrt => self.real_math(call, ret_ty, Bytecode::SqrtReal),
            Ceil => self.real_math(call, ret_ty, Bytecode::CeilReal),
            Floor => self.real_math(call, ret_ty, Bytecode::FloorReal),
            Round => self.real_math(call, ret_ty, Bytecode::RoundReal),
            Ln => self.real_math(call, ret_ty, Bytecode::LnReal),
            Log2 => self.real_math(call, ret_ty, Bytecode::Log2Real),
            Log10 => self.real_math(call, ret_ty, Bytecode::Log10Real),
            ATan2 => {
                let left = self.visit_value(&call.args[0])?;
                let right = self.visit_value(&call.args[1])?;
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_binary(
                    Bytecode::ATan2Real,
                    dest.as_address(),
                    left.as_address(),
                    right.as_address(),
                );
                Ok(dest)
            }
            Abs => {
                let op = if self.analyzed.arena.as_builtin(ret_ty) == Some(BuiltinType::Integer) {
                    Bytecode::AbsInteger
                } else {
                    Bytecode::AbsReal
                };
                self.real_math(call, ret_ty, op)
            }

            // ----------------------------------------------------------------
            // Generic
            // ----------------------------------------------------------------
            SizeOf | OffsetOf => {
                let constant = self.analyzed.call_constants[&expr.id];
                let dest = self.new_temp(ret_ty);
                self.emitter.emit_op(Bytecode::AssignImm4);
                self.emitter.emit_local(dest.as_address());
                self.emitter.emit_imm4(constant as i32);
                Ok(dest)
            }
            PtrCast => {
                // Pure reinterpretation; reuse the input's storage
                self.visit_value(&call.args[1])
            }
        }
    }

    // ------------------------------------------------------------------------
    // Small emission helpers shared by the builtin arms
    // ------------------------------------------------------------------------

    /// `op(obj)`
    fn obj_only(&mut self, call: &CallExpr, op: Bytecode) -> Result<LocalVar, CodegenError> {
        let obj = self.visit_value(&call.args[0])?;
        self.emitter.emit_op(op);
        self.emitter.emit_local(obj);
        Ok(LocalVar::value(0))
    }

    /// `op(arg0, arg1)`
    fn obj_pair(&mut self, call: &CallExpr, op: Bytecode) -> Result<LocalVar, CodegenError> {
        let first = self.visit_value(&call.args[0])?;
        let second = self.visit_value(&call.args[1])?;
        self.emitter.emit_op(op);
        self.emitter.emit_local(first);
        self.emitter.emit_local(second);
        Ok(LocalVar::value(0))
    }

    /// `op(dest, obj)` producing a result
    fn dest_obj(
        &mut self,
        call: &CallExpr,
        ret_ty: TypeId,
        op: Bytecode,
    ) -> Result<LocalVar, CodegenError> {
        let obj = self.visit_value(&call.args[0])?;
        let dest = self.new_temp(ret_ty);
        self.emitter.emit_unary(op, dest.as_address(), obj);
        Ok(dest)
    }

    /// `op(dest, vpi, col)` typed column reads
    fn vpi_get(
        &mut self,
        call: &CallExpr,
        ret_ty: TypeId,
        op: Bytecode,
    ) -> Result<LocalVar, CodegenError> {
        let vpi = self.visit_value(&call.args[0])?;
        let col = self.literal_u32(&call.args[1]);
        let dest = self.new_temp(ret_ty);
        self.emitter.emit_op(op);
        self.emitter.emit_local(dest.as_address());
        self.emitter.emit_local(vpi);
        self.emitter.emit_uimm4(col);
        Ok(dest)
    }

    /// `op(vpi, value, col)` typed column writes
    fn vpi_set(&mut self, call: &CallExpr, op: Bytecode) -> Result<LocalVar, CodegenError> {
        let vpi = self.visit_value(&call.args[0])?;
        let value = self.visit_value(&call.args[1])?;
        let col = self.literal_u32(&call.args[2]);
        self.emitter.emit_op(op);
        self.emitter.emit_local(vpi);
        self.emitter.emit_local(value.as_address());
        self.emitter.emit_uimm4(col);
        Ok(LocalVar::value(0))
    }

    /// `op(vfe, col, value)` vectorized compare against a constant
    fn vector_filter(&mut self, call: &CallExpr, op: Bytecode) -> Result<LocalVar, CodegenError> {
        let vfe = self.visit_value(&call.args[0])?;
        let col = self.literal_u32(&call.args[1]);
        let value = self.visit_value(&call.args[2])?;
        self.emitter.emit_op(op);
        self.emitter.emit_local(vfe);
        self.emitter.emit_uimm4(col);
        self.emitter.emit_local(value.as_address());
        Ok(LocalVar::value(0))
    }

    /// `op(dest, input)` over SQL value addresses
    fn real_math(
        &mut self,
        call: &CallExpr,
        ret_ty: TypeId,
        op: Bytecode,
    ) -> Result<LocalVar, CodegenError> {
        let input = self.visit_value(&call.args[0])?;
        let dest = self.new_temp(ret_ty);
        self.emitter.emit_unary(op, dest.as_address(), input.as_address());
        Ok(dest)
    }

    fn agg_lifecycle(&mut self, call: &CallExpr, op: AggOp) -> Result<LocalVar, CodegenError> {
        let agg_ty = self.ty(&call.args[0]);
        let kind = self.aggregator_kind(agg_ty);
        let opcode = agg_opcode(kind, op);
        match op {
            AggOp::Init | AggOp::Reset => {
                let agg = self.visit_value(&call.args[0])?;
                self.emitter.emit_op(opcode);
                self.emitter.emit_local(agg);
            }
            AggOp::Advance | AggOp::Merge => {
                let agg = self.visit_value(&call.args[0])?;
                let other = self.visit_value(&call.args[1])?;
                self.emitter.emit_op(opcode);
                self.emitter.emit_local(agg);
                self.emitter.emit_local(other);
            }
            AggOp::GetResult => unreachable!("handled by the AggResult arm"),
        }
        Ok(LocalVar::value(0))
    }

    fn aggregator_kind(&self, ptr_ty: TypeId) -> BuiltinType {
        self.analyzed
            .arena
            .pointee(ptr_ty)
            .and_then(|p| self.analyzed.arena.as_builtin(p))
            .expect("sema validated the aggregator")
    }

    fn hash_opcode(&self, arg: &Expr) -> Bytecode {
        match self.analyzed.arena.as_builtin(self.ty(arg)) {
            Some(BuiltinType::Integer) => Bytecode::HashInteger,
            Some(BuiltinType::Real) => Bytecode::HashReal,
            Some(BuiltinType::Date) => Bytecode::HashDate,
            Some(BuiltinType::StringVal) => Bytecode::HashString,
            other => unreachable!("not hashable: {:?}", other),
        }
    }

    fn literal_u32(&self, expr: &Expr) -> u32 {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(n)) => *n as u32,
            _ => unreachable!("sema required a constant"),
        }
    }

    fn literal_string_index(&mut self, expr: &Expr) -> u32 {
        match &expr.kind {
            ExprKind::Literal(Literal::Str(sym)) => {
                let s = self.interner.resolve(*sym).to_string();
                self.string_index(&s)
            }
            _ => unreachable!("sema required a string literal"),
        }
    }

    fn table_id_for(&mut self, expr: &Expr) -> Result<u16, CodegenError> {
        let ExprKind::Literal(Literal::Str(sym)) = &expr.kind else {
            unreachable!("sema required a string literal");
        };
        let name = self.interner.resolve(*sym);
        crate::sql::table::table_id_by_name(name).ok_or_else(|| CodegenError::UnknownTable {
            name: name.to_string(),
        })
    }
}

fn agg_opcode(kind: BuiltinType, op: AggOp) -> Bytecode {
    macro_rules! lifecycle {
        ($init:ident, $advance:ident, $merge:ident, $reset:ident, $result:ident) => {
            match op {
                AggOp::Init => B::$init,
                AggOp::Advance => B::$advance,
                AggOp::Merge => B::$merge,
                AggOp::Reset => B::$reset,
                AggOp::GetResult => B::$result,
            }
        };
    }
    match kind {
        BuiltinType::CountAggregate => lifecycle!(
            CountAggregateInit,
            CountAggregateAdvance,
            CountAggregateMerge,
            CountAggregateReset,
            CountAggregateGetResult
        ),
        BuiltinType::CountStarAggregate => lifecycle!(
            CountStarAggregateInit,
            CountStarAggregateAdvance,
            CountStarAggregateMerge,
            CountStarAggregateReset,
            CountStarAggregateGetResult
        ),
        BuiltinType::IntegerSumAggregate => lifecycle!(
            IntegerSumAggregateInit,
            IntegerSumAggregateAdvance,
            IntegerSumAggregateMerge,
            IntegerSumAggregateReset,
            IntegerSumAggregateGetResult
        ),
        BuiltinType::IntegerMinAggregate => lifecycle!(
            IntegerMinAggregateInit,
            IntegerMinAggregateAdvance,
            IntegerMinAggregateMerge,
            IntegerMinAggregateReset,
            IntegerMinAggregateGetResult
        ),
        BuiltinType::IntegerMaxAggregate => lifecycle!(
            IntegerMaxAggregateInit,
            IntegerMaxAggregateAdvance,
            IntegerMaxAggregateMerge,
            IntegerMaxAggregateReset,
            IntegerMaxAggregateGetResult
        ),
        BuiltinType::RealSumAggregate => lifecycle!(
            RealSumAggregateInit,
            RealSumAggregateAdvance,
            RealSumAggregateMerge,
            RealSumAggregateReset,
            RealSumAggregateGetResult
        ),
        BuiltinType::RealMinAggregate => lifecycle!(
            RealMinAggregateInit,
            RealMinAggregateAdvance,
            RealMinAggregateMerge,
            RealMinAggregateReset,
            RealMinAggregateGetResult
        ),
        BuiltinType::RealMaxAggregate => lifecycle!(
            RealMaxAggregateInit,
            RealMaxAggregateAdvance,
            RealMaxAggregateMerge,
            RealMaxAggregateReset,
            RealMaxAggregateGetResult
        ),
        BuiltinType::AvgAggregate => lifecycle!(
            AvgAggregateInit,
            AvgAggregateAdvance,
            AvgAggregateMerge,
            AvgAggregateReset,
            AvgAggregateGetResult
        ),
        other => unreachable!("not an aggregator: {:?}", other),
    }
}

// ============================================================================
// Opcode selection tables, indexed I8 I16 I32 I64 U8 U16 U32 U64
// ============================================================================

use Bytecode as B;

const ADD_INT: [B; 8] = [B::AddI8, B::AddI16, B::AddI32, B::AddI64, B::AddU8, B::AddU16, B::AddU32, B::AddU64];
const SUB_INT: [B; 8] = [B::SubI8, B::SubI16, B::SubI32, B::SubI64, B::SubU8, B::SubU16, B::SubU32, B::SubU64];
const MUL_INT: [B; 8] = [B::MulI8, B::MulI16, B::MulI32, B::MulI64, B::MulU8, B::MulU16, B::MulU32, B::MulU64];
const DIV_INT: [B; 8] = [B::DivI8, B::DivI16, B::DivI32, B::DivI64, B::DivU8, B::DivU16, B::DivU32, B::DivU64];
const REM_INT: [B; 8] = [B::RemI8, B::RemI16, B::RemI32, B::RemI64, B::RemU8, B::RemU16, B::RemU32, B::RemU64];
const BIT_AND_INT: [B; 8] = [B::BitAndI8, B::BitAndI16, B::BitAndI32, B::BitAndI64, B::BitAndU8, B::BitAndU16, B::BitAndU32, B::BitAndU64];
const BIT_OR_INT: [B; 8] = [B::BitOrI8, B::BitOrI16, B::BitOrI32, B::BitOrI64, B::BitOrU8, B::BitOrU16, B::BitOrU32, B::BitOrU64];
const BIT_XOR_INT: [B; 8] = [B::BitXorI8, B::BitXorI16, B::BitXorI32, B::BitXorI64, B::BitXorU8, B::BitXorU16, B::BitXorU32, B::BitXorU64];
const SHL_INT: [B; 8] = [B::ShlI8, B::ShlI16, B::ShlI32, B::ShlI64, B::ShlU8, B::ShlU16, B::ShlU32, B::ShlU64];
const SHR_INT: [B; 8] = [B::ShrI8, B::ShrI16, B::ShrI32, B::ShrI64, B::ShrU8, B::ShrU16, B::ShrU32, B::ShrU64];
const NEG_INT: [B; 8] = [B::NegI8, B::NegI16, B::NegI32, B::NegI64, B::NegU8, B::NegU16, B::NegU32, B::NegU64];
const BIT_NEG_INT: [B; 8] = [B::BitNegI8, B::BitNegI16, B::BitNegI32, B::BitNegI64, B::BitNegU8, B::BitNegU16, B::BitNegU32, B::BitNegU64];
const EQ_INT: [B; 8] = [B::EqualI8, B::EqualI16, B::EqualI32, B::EqualI64, B::EqualU8, B::EqualU16, B::EqualU32, B::EqualU64];
const NE_INT: [B; 8] = [B::NotEqualI8, B::NotEqualI16, B::NotEqualI32, B::NotEqualI64, B::NotEqualU8, B::NotEqualU16, B::NotEqualU32, B::NotEqualU64];
const LT_INT: [B; 8] = [B::LessThanI8, B::LessThanI16, B::LessThanI32, B::LessThanI64, B::LessThanU8, B::LessThanU16, B::LessThanU32, B::LessThanU64];
const LE_INT: [B; 8] = [B::LessThanEqualI8, B::LessThanEqualI16, B::LessThanEqualI32, B::LessThanEqualI64, B::LessThanEqualU8, B::LessThanEqualU16, B::LessThanEqualU32, B::LessThanEqualU64];
const GT_INT: [B; 8] = [B::GreaterThanI8, B::GreaterThanI16, B::GreaterThanI32, B::GreaterThanI64, B::GreaterThanU8, B::GreaterThanU16, B::GreaterThanU32, B::GreaterThanU64];
const GE_INT: [B; 8] = [B::GreaterThanEqualI8, B::GreaterThanEqualI16, B::GreaterThanEqualI32, B::GreaterThanEqualI64, B::GreaterThanEqualU8, B::GreaterThanEqualU16, B::GreaterThanEqualU32, B::GreaterThanEqualU64];

fn int_op_variant(table: &[Bytecode; 8], prim: PrimitiveType) -> Bytecode {
    let index = match prim {
        PrimitiveType::I8 => 0,
        PrimitiveType::I16 => 1,
        PrimitiveType::I32 => 2,
        PrimitiveType::I64 => 3,
        PrimitiveType::U8 => 4,
        PrimitiveType::U16 => 5,
        PrimitiveType::U32 => 6,
        PrimitiveType::U64 => 7,
        other => unreachable!("not an integer type: {:?}", other),
    };
    table[index]
}

fn float_arith_opcode(op: BinaryOp, prim: PrimitiveType) -> Bytecode {
    let is32 = prim == PrimitiveType::F32;
    match op {
        BinaryOp::Add => if is32 { B::AddF32 } else { B::AddF64 },
        BinaryOp::Sub => if is32 { B::SubF32 } else { B::SubF64 },
        BinaryOp::Mul => if is32 { B::MulF32 } else { B::MulF64 },
        BinaryOp::Div => if is32 { B::DivF32 } else { B::DivF64 },
        BinaryOp::Rem => if is32 { B::RemF32 } else { B::RemF64 },
        other => unreachable!("not a float operator: {:?}", other),
    }
}

fn float_compare_opcode(op: CompareOp, prim: PrimitiveType) -> Bytecode {
    let is32 = prim == PrimitiveType::F32;
    match op {
        CompareOp::Eq => if is32 { B::EqualF32 } else { B::EqualF64 },
        CompareOp::Ne => if is32 { B::NotEqualF32 } else { B::NotEqualF64 },
        CompareOp::Lt => if is32 { B::LessThanF32 } else { B::LessThanF64 },
        CompareOp::Le => if is32 { B::LessThanEqualF32 } else { B::LessThanEqualF64 },
        CompareOp::Gt => if is32 { B::GreaterThanF32 } else { B::GreaterThanF64 },
        CompareOp::Ge => if is32 { B::GreaterThanEqualF32 } else { B::GreaterThanEqualF64 },
    }
}

fn sql_arith_opcode(op: BinaryOp, builtin: BuiltinType) -> Bytecode {
    let integer = builtin == BuiltinType::Integer;
    match op {
        BinaryOp::Add => if integer { B::AddInteger } else { B::AddReal },
        BinaryOp::Sub => if integer { B::SubInteger } else { B::SubReal },
        BinaryOp::Mul => if integer { B::MulInteger } else { B::MulReal },
        BinaryOp::Div => if integer { B::DivInteger } else { B::DivReal },
        BinaryOp::Rem => if integer { B::RemInteger } else { B::RemReal },
        other => unreachable!("not a SQL arithmetic operator: {:?}", other),
    }
}

fn sql_compare_opcode(op: CompareOp, builtin: BuiltinType) -> Bytecode {
    match builtin {
        BuiltinType::Integer => match op {
            CompareOp::Eq => B::EqualInteger,
            CompareOp::Ne => B::NotEqualInteger,
            CompareOp::Lt => B::LessThanInteger,
            CompareOp::Le => B::LessThanEqualInteger,
            CompareOp::Gt => B::GreaterThanInteger,
            CompareOp::Ge => B::GreaterThanEqualInteger,
        },
        BuiltinType::Real => match op {
            CompareOp::Eq => B::EqualReal,
            CompareOp::Ne => B::NotEqualReal,
            CompareOp::Lt => B::LessThanReal,
            CompareOp::Le => B::LessThanEqualReal,
            CompareOp::Gt => B::GreaterThanReal,
            CompareOp::Ge => B::GreaterThanEqualReal,
        },
        BuiltinType::Date => match op {
            CompareOp::Eq => B::EqualDate,
            CompareOp::Ne => B::NotEqualDate,
            CompareOp::Lt => B::LessThanDate,
            CompareOp::Le => B::LessThanEqualDate,
            CompareOp::Gt => B::GreaterThanDate,
            CompareOp::Ge => B::GreaterThanEqualDate,
        },
        BuiltinType::StringVal => match op {
            CompareOp::Eq => B::EqualString,
            CompareOp::Ne => B::NotEqualString,
            CompareOp::Lt => B::LessThanString,
            CompareOp::Le => B::LessThanEqualString,
            CompareOp::Gt => B::GreaterThanString,
            CompareOp::Ge => B::GreaterThanEqualString,
        },
        other => unreachable!("not a comparable SQL value: {:?}", other),
    }
}
