// src/sema/builtins.rs
//
// Per-builtin call validation. Every builtin has a fixed signature schema:
// pointers to specific runtime types, primitive kinds, SQL value kinds,
// function references with a particular shape, or a variadic tail of SQL
// values. Validation checks arity and argument types, may inject implicit
// casts (integral widening on hash/top-k parameters, SqlBoolToBool on match
// arguments), and produces the call's result type.

use crate::errors::SemanticError;
use crate::frontend::ast::*;
use crate::frontend::{Builtin, Span};
use crate::sema::analyzer::{Analyzer, Resolution};
use crate::sema::types::{BuiltinType, InternedType, TypeId};

impl<'a> Analyzer<'a> {
    pub(crate) fn check_builtin_call(
        &mut self,
        call_id: NodeId,
        call: &mut CallExpr,
        span: Span,
    ) -> TypeId {
        let ExprKind::Identifier(name_sym) = &call.callee.kind else {
            self.error(SemanticError::NotCallable {
                ty: "expression".to_string(),
                span: call.callee.span.into(),
            });
            return self.arena.invalid();
        };
        let name = self.interner.resolve(*name_sym);
        let Some(builtin) = Builtin::from_name(name) else {
            self.error(SemanticError::UnknownBuiltin {
                name: name.to_string(),
                span: call.callee.span.into(),
            });
            return self.arena.invalid();
        };
        self.resolutions
            .insert(call.callee.id, Resolution::Builtin(builtin));

        use Builtin::*;
        match builtin {
            SizeOf | OffsetOf | PtrCast => self.check_generic_builtin(builtin, call_id, call, span),
            _ => self.check_value_builtin(builtin, call, span),
        }
    }

    // ========================================================================
    // Builtins whose arguments are ordinary value expressions
    // ========================================================================

    fn check_value_builtin(&mut self, b: Builtin, call: &mut CallExpr, span: Span) -> TypeId {
        // Type-check every argument up front; schemas below only inspect
        let arg_tys: Vec<TypeId> = call
            .args
            .iter_mut()
            .map(|arg| self.check_expr(arg))
            .collect();
        if arg_tys.iter().any(|&t| self.arena.is_invalid(t)) {
            return self.arena.invalid();
        }

        use Builtin::*;
        let invalid = self.arena.invalid();
        match b {
            // ----------------------------------------------------------------
            // Primitive <-> SQL conversions
            // ----------------------------------------------------------------
            IntToSql => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if !self.arena.is_integer(arg_tys[0]) {
                    return self.arg_mismatch(b, 0, "an integer", arg_tys[0], call);
                }
                self.arena.builtin(BuiltinType::Integer)
            }
            FloatToSql => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if !self.arena.is_float(arg_tys[0]) {
                    return self.arg_mismatch(b, 0, "a float", arg_tys[0], call);
                }
                self.arena.builtin(BuiltinType::Real)
            }
            BoolToSql => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if !self.arena.is_bool(arg_tys[0]) {
                    return self.arg_mismatch(b, 0, "a bool", arg_tys[0], call);
                }
                self.arena.builtin(BuiltinType::Boolean)
            }
            DateToSql => {
                if !self.arity(b, call, 3, span) {
                    return invalid;
                }
                for i in 0..3 {
                    if !self.arena.is_integer(arg_tys[i]) {
                        return self.arg_mismatch(b, i, "an integer", arg_tys[i], call);
                    }
                    let to = self.arena.i32();
                    self.coerce_assign(&mut call.args[i], arg_tys[i], to);
                }
                self.arena.builtin(BuiltinType::Date)
            }
            StringToSql => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if !self.string_literal_arg(b, call, 0) {
                    return invalid;
                }
                self.arena.builtin(BuiltinType::StringVal)
            }
            SqlToBool => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if !self.arena.is_sql_boolean(arg_tys[0]) {
                    return self.arg_mismatch(b, 0, "Boolean", arg_tys[0], call);
                }
                self.arena.bool()
            }

            // ----------------------------------------------------------------
            // SQL string functions
            // ----------------------------------------------------------------
            Like => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                for i in 0..2 {
                    if self.arena.as_builtin(arg_tys[i]) != Some(BuiltinType::StringVal) {
                        return self.arg_mismatch(b, i, "StringVal", arg_tys[i], call);
                    }
                }
                self.arena.builtin(BuiltinType::Boolean)
            }
            Concat => {
                if !self.arity_at_least(b, call, 2, span) {
                    return invalid;
                }
                for (i, &ty) in arg_tys.iter().enumerate() {
                    if self.arena.as_builtin(ty) != Some(BuiltinType::StringVal) {
                        return self.arg_mismatch(b, i, "StringVal", ty, call);
                    }
                }
                self.arena.builtin(BuiltinType::StringVal)
            }
            ExtractYear => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if self.arena.as_builtin(arg_tys[0]) != Some(BuiltinType::Date) {
                    return self.arg_mismatch(b, 0, "Date", arg_tys[0], call);
                }
                self.arena.builtin(BuiltinType::Integer)
            }

            // ----------------------------------------------------------------
            // Execution context and result buffer
            // ----------------------------------------------------------------
            ExecCtxGetMemoryPool => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ExecutionContext)
                {
                    return invalid;
                }
                let pool = self.arena.builtin(BuiltinType::MemoryPool);
                self.arena.pointer_to(pool)
            }
            ResultBufferAllocRow => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ExecutionContext)
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            ResultBufferFinalize => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ExecutionContext)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Thread state container
            // ----------------------------------------------------------------
            ThreadStateContainerInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ThreadStateContainer)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::MemoryPool)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            ThreadStateContainerReset => {
                if !self.arity(b, call, 5, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ThreadStateContainer)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[1], arg_tys[1], to);
                if !self.callback_arg(b, call, 2, arg_tys[2], 2)
                    || !self.callback_arg(b, call, 3, arg_tys[3], 2)
                    || !self.any_pointer_arg(b, call, 4, arg_tys[4])
                {
                    return invalid;
                }
                self.arena.nil()
            }
            ThreadStateContainerIterate => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ThreadStateContainer)
                    || !self.any_pointer_arg(b, call, 1, arg_tys[1])
                    || !self.callback_arg(b, call, 2, arg_tys[2], 2)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            ThreadStateContainerFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::ThreadStateContainer)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Table scans
            // ----------------------------------------------------------------
            TableIterInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::TableVectorIterator)
                    || !self.string_literal_arg(b, call, 1)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            TableIterAdvance => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::TableVectorIterator)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            TableIterGetVPI => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::TableVectorIterator)
                {
                    return invalid;
                }
                let vpi = self.arena.builtin(BuiltinType::VectorProjectionIterator);
                self.arena.pointer_to(vpi)
            }
            TableIterClose => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::TableVectorIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            TableIterParallel => {
                if !self.arity(b, call, 4, span)
                    || !self.string_literal_arg(b, call, 0)
                    || !self.any_pointer_arg(b, call, 1, arg_tys[1])
                    || !self.ptr_arg(b, call, 2, arg_tys[2], BuiltinType::ThreadStateContainer)
                    || !self.callback_arg(b, call, 3, arg_tys[3], 3)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Vector projection iterator
            // ----------------------------------------------------------------
            VpiIsFiltered | VpiHasNext | VpiHasNextFiltered => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            VpiSelectedRowCount => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                self.arena.u32()
            }
            VpiAdvance | VpiAdvanceFiltered | VpiReset | VpiResetFiltered => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            VpiSetPosition | VpiSetPositionFiltered => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[1], arg_tys[1], to);
                self.arena.nil()
            }
            VpiMatch => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                // A SQL Boolean match value is forced to a primitive bool
                if self.arena.is_sql_boolean(arg_tys[1]) {
                    let to = self.arena.bool();
                    self.insert_cast(&mut call.args[1], CastKind::SqlBoolToBool, to);
                } else if !self.arena.is_bool(arg_tys[1]) {
                    return self.arg_mismatch(b, 1, "bool", arg_tys[1], call);
                }
                self.arena.nil()
            }
            VpiGetSmallInt | VpiGetInt | VpiGetBigInt => {
                if !self.vpi_get_shape(b, call, &arg_tys, span) {
                    return invalid;
                }
                self.arena.builtin(BuiltinType::Integer)
            }
            VpiGetReal | VpiGetDouble => {
                if !self.vpi_get_shape(b, call, &arg_tys, span) {
                    return invalid;
                }
                self.arena.builtin(BuiltinType::Real)
            }
            VpiGetDate => {
                if !self.vpi_get_shape(b, call, &arg_tys, span) {
                    return invalid;
                }
                self.arena.builtin(BuiltinType::Date)
            }
            VpiGetString => {
                if !self.vpi_get_shape(b, call, &arg_tys, span) {
                    return invalid;
                }
                self.arena.builtin(BuiltinType::StringVal)
            }
            VpiSetSmallInt | VpiSetInt | VpiSetBigInt => {
                self.vpi_set_shape(b, call, &arg_tys, BuiltinType::Integer, span)
            }
            VpiSetReal | VpiSetDouble => {
                self.vpi_set_shape(b, call, &arg_tys, BuiltinType::Real, span)
            }
            VpiSetDate => self.vpi_set_shape(b, call, &arg_tys, BuiltinType::Date, span),
            VpiSetString => self.vpi_set_shape(b, call, &arg_tys, BuiltinType::StringVal, span),

            // ----------------------------------------------------------------
            // Hashing
            // ----------------------------------------------------------------
            Hash => {
                if !self.arity_at_least(b, call, 1, span) {
                    return invalid;
                }
                for (i, &ty) in arg_tys.iter().enumerate() {
                    if !self.arena.is_sql_value(ty) {
                        return self.arg_mismatch(b, i, "a SQL value", ty, call);
                    }
                }
                self.arena.u64()
            }

            // ----------------------------------------------------------------
            // Filter manager
            // ----------------------------------------------------------------
            FilterManagerInit | FilterManagerFinalize | FilterManagerFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::FilterManager)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            FilterManagerInsertFilter => {
                if !self.arity_at_least(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::FilterManager)
                {
                    return invalid;
                }
                for i in 1..call.args.len() {
                    if !self.callback_arg(b, call, i, arg_tys[i], 1) {
                        return invalid;
                    }
                }
                self.arena.nil()
            }
            FilterManagerRunFilters => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::FilterManager)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Vector filter executor
            // ----------------------------------------------------------------
            VectorFilterExecInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorFilterExecutor)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            VectorFilterExecEqual
            | VectorFilterExecGreaterThan
            | VectorFilterExecGreaterThanEqual
            | VectorFilterExecLessThan
            | VectorFilterExecLessThanEqual
            | VectorFilterExecNotEqual => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorFilterExecutor)
                    || !self.u32_const_arg(b, call, 1)
                {
                    return invalid;
                }
                if !self.arena.is_sql_value(arg_tys[2]) {
                    return self.arg_mismatch(b, 2, "a SQL value", arg_tys[2], call);
                }
                self.arena.nil()
            }
            VectorFilterExecFinish | VectorFilterExecFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorFilterExecutor)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Aggregation hash table
            // ----------------------------------------------------------------
            AggHashTableInit => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::MemoryPool)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to);
                self.arena.nil()
            }
            AggHashTableInsert => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            AggHashTableLookup => {
                if !self.arity(b, call, 4, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                    || !self.callback_arg(b, call, 2, arg_tys[2], 2)
                    || !self.any_pointer_arg(b, call, 3, arg_tys[3])
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            AggHashTableProcessBatch => {
                if !self.arity(b, call, 7, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::VectorProjectionIterator)
                {
                    return invalid;
                }
                for i in 2..=5 {
                    if !self.function_arg(b, call, i, arg_tys[i]) {
                        return invalid;
                    }
                }
                if !self.arena.is_bool(arg_tys[6]) {
                    return self.arg_mismatch(b, 6, "bool", arg_tys[6], call);
                }
                self.arena.nil()
            }
            AggHashTableMovePartitions => {
                if !self.arity(b, call, 4, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::ThreadStateContainer)
                    || !self.callback_arg(b, call, 3, arg_tys[3], 2)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to);
                self.arena.nil()
            }
            AggHashTableParallelPartitionedScan => {
                if !self.arity(b, call, 4, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                    || !self.any_pointer_arg(b, call, 1, arg_tys[1])
                    || !self.ptr_arg(b, call, 2, arg_tys[2], BuiltinType::ThreadStateContainer)
                    || !self.callback_arg(b, call, 3, arg_tys[3], 3)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            AggHashTableFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AggregationHashTable)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            AggHashTableIterInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AhtIterator)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::AggregationHashTable)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            AggHashTableIterHasNext => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AhtIterator)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            AggHashTableIterNext | AggHashTableIterClose => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AhtIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            AggHashTableIterGetRow => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::AhtIterator)
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            AggPartIterHasNext => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(
                        b,
                        call,
                        0,
                        arg_tys[0],
                        BuiltinType::AhtOverflowPartitionIterator,
                    )
                {
                    return invalid;
                }
                self.arena.bool()
            }
            AggPartIterNext => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(
                        b,
                        call,
                        0,
                        arg_tys[0],
                        BuiltinType::AhtOverflowPartitionIterator,
                    )
                {
                    return invalid;
                }
                self.arena.nil()
            }
            AggPartIterGetHash => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(
                        b,
                        call,
                        0,
                        arg_tys[0],
                        BuiltinType::AhtOverflowPartitionIterator,
                    )
                {
                    return invalid;
                }
                self.arena.u64()
            }
            AggPartIterGetRow => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(
                        b,
                        call,
                        0,
                        arg_tys[0],
                        BuiltinType::AhtOverflowPartitionIterator,
                    )
                {
                    return invalid;
                }
                self.byte_pointer()
            }

            // ----------------------------------------------------------------
            // Aggregators
            // ----------------------------------------------------------------
            AggInit | AggReset => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if self.aggregator_arg(b, call, 0, arg_tys[0]).is_none() {
                    return invalid;
                }
                self.arena.nil()
            }
            AggAdvance => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                if self.aggregator_arg(b, call, 0, arg_tys[0]).is_none() {
                    return invalid;
                }
                let input_ok = match self.arena.pointee(arg_tys[1]) {
                    Some(p) => self.arena.is_sql_value(p),
                    None => false,
                };
                if !input_ok {
                    return self.arg_mismatch(b, 1, "a pointer to a SQL value", arg_tys[1], call);
                }
                self.arena.nil()
            }
            AggMerge => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                let (a, b_kind) = (
                    self.aggregator_arg(b, call, 0, arg_tys[0]),
                    self.aggregator_arg(b, call, 1, arg_tys[1]),
                );
                match (a, b_kind) {
                    (Some(x), Some(y)) if x == y => self.arena.nil(),
                    (Some(_), Some(_)) => {
                        self.arg_mismatch(b, 1, "a matching aggregator", arg_tys[1], call)
                    }
                    _ => invalid,
                }
            }
            AggResult => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                let Some(kind) = self.aggregator_arg(b, call, 0, arg_tys[0]) else {
                    return invalid;
                };
                match kind {
                    BuiltinType::RealSumAggregate
                    | BuiltinType::RealMinAggregate
                    | BuiltinType::RealMaxAggregate
                    | BuiltinType::AvgAggregate => self.arena.builtin(BuiltinType::Real),
                    _ => self.arena.builtin(BuiltinType::Integer),
                }
            }

            // ----------------------------------------------------------------
            // Join hash table
            // ----------------------------------------------------------------
            JoinHashTableInit => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::MemoryPool)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to);
                self.arena.nil()
            }
            JoinHashTableAllocTuple => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            JoinHashTableBuild => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            JoinHashTableBuildParallel => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::ThreadStateContainer)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to);
                self.arena.nil()
            }
            JoinHashTableLookup => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                {
                    return invalid;
                }
                let entry = self.arena.builtin(BuiltinType::HashTableEntry);
                self.arena.pointer_to(entry)
            }
            JoinHashTableFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::JoinHashTable)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            HashTableEntryIterHasNext => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::HashTableEntry)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            HashTableEntryIterGetRow => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::HashTableEntry)
                {
                    return invalid;
                }
                self.byte_pointer()
            }

            // ----------------------------------------------------------------
            // Sorting
            // ----------------------------------------------------------------
            SorterInit => {
                if !self.arity(b, call, 4, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::MemoryPool)
                    || !self.callback_arg(b, call, 2, arg_tys[2], 2)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[3], arg_tys[3], to);
                self.arena.nil()
            }
            SorterInsert => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            SorterInsertTopK => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                {
                    return invalid;
                }
                self.byte_pointer()
            }
            SorterInsertTopKFinish => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                    || !self.hash_arg(b, call, 1, arg_tys[1])
                {
                    return invalid;
                }
                self.arena.nil()
            }
            SorterSort | SorterFree => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            SorterSortParallel => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::ThreadStateContainer)
                {
                    return invalid;
                }
                let to = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to);
                self.arena.nil()
            }
            SorterSortTopKParallel => {
                if !self.arity(b, call, 4, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::Sorter)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::ThreadStateContainer)
                {
                    return invalid;
                }
                let to32 = self.arena.u32();
                self.coerce_assign(&mut call.args[2], arg_tys[2], to32);
                if !self.hash_arg(b, call, 3, arg_tys[3]) {
                    return invalid;
                }
                self.arena.nil()
            }
            SorterIterInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::SorterIterator)
                    || !self.ptr_arg(b, call, 1, arg_tys[1], BuiltinType::Sorter)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            SorterIterHasNext => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::SorterIterator)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            SorterIterNext | SorterIterClose => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::SorterIterator)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            SorterIterGetRow => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::SorterIterator)
                {
                    return invalid;
                }
                self.byte_pointer()
            }

            // ----------------------------------------------------------------
            // CSV reader
            // ----------------------------------------------------------------
            CsvReaderInit => {
                if !self.arity(b, call, 2, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::CsvReader)
                    || !self.string_literal_arg(b, call, 1)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            CsvReaderAdvance => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::CsvReader)
                {
                    return invalid;
                }
                self.arena.bool()
            }
            CsvReaderGetField => {
                if !self.arity(b, call, 3, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::CsvReader)
                    || !self.u32_const_arg(b, call, 1)
                    || !self.ptr_arg(b, call, 2, arg_tys[2], BuiltinType::StringVal)
                {
                    return invalid;
                }
                self.arena.nil()
            }
            CsvReaderClose => {
                if !self.arity(b, call, 1, span)
                    || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::CsvReader)
                {
                    return invalid;
                }
                self.arena.nil()
            }

            // ----------------------------------------------------------------
            // Math on SQL values
            // ----------------------------------------------------------------
            ACos | ASin | ATan | Cos | Cot | Sin | Tan | Exp | Sqrt | Ceil | Floor | Round
            | Ln | Log2 | Log10 => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                if self.arena.as_builtin(arg_tys[0]) != Some(BuiltinType::Real) {
                    return self.arg_mismatch(b, 0, "Real", arg_tys[0], call);
                }
                self.arena.builtin(BuiltinType::Real)
            }
            ATan2 => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                for i in 0..2 {
                    if self.arena.as_builtin(arg_tys[i]) != Some(BuiltinType::Real) {
                        return self.arg_mismatch(b, i, "Real", arg_tys[i], call);
                    }
                }
                self.arena.builtin(BuiltinType::Real)
            }
            Abs => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                match self.arena.as_builtin(arg_tys[0]) {
                    Some(BuiltinType::Integer) | Some(BuiltinType::Real) => arg_tys[0],
                    _ => self.arg_mismatch(b, 0, "Integer or Real", arg_tys[0], call),
                }
            }

            SizeOf | OffsetOf | PtrCast => unreachable!("handled as generic builtins"),
        }
    }

    // ========================================================================
    // Generic builtins with type-expression arguments
    // ========================================================================

    fn check_generic_builtin(
        &mut self,
        b: Builtin,
        call_id: NodeId,
        call: &mut CallExpr,
        span: Span,
    ) -> TypeId {
        let invalid = self.arena.invalid();
        match b {
            Builtin::SizeOf => {
                if !self.arity(b, call, 1, span) {
                    return invalid;
                }
                let arg = call.args[0].clone();
                let Some(ty) = self.resolve_type_expr(&arg) else {
                    self.error(SemanticError::BuiltinArgMismatch {
                        builtin: b.source_name().to_string(),
                        index: 0,
                        expected: "a type".to_string(),
                        found: "an expression".to_string(),
                        span: call.args[0].span.into(),
                    });
                    return invalid;
                };
                self.call_constants
                    .insert(call_id, self.arena.size_of(ty) as u64);
                self.arena.u32()
            }
            Builtin::OffsetOf => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                let arg = call.args[0].clone();
                let Some(ty) = self.resolve_type_expr(&arg) else {
                    self.error(SemanticError::BuiltinArgMismatch {
                        builtin: b.source_name().to_string(),
                        index: 0,
                        expected: "a struct type".to_string(),
                        found: "an expression".to_string(),
                        span: call.args[0].span.into(),
                    });
                    return invalid;
                };
                let ExprKind::Identifier(field) = &call.args[1].kind else {
                    self.error(SemanticError::BuiltinArgMismatch {
                        builtin: b.source_name().to_string(),
                        index: 1,
                        expected: "a field name".to_string(),
                        found: "an expression".to_string(),
                        span: call.args[1].span.into(),
                    });
                    return invalid;
                };
                let Some((_, offset)) = self.arena.field_offset(ty, *field) else {
                    self.error(SemanticError::FieldNotFound {
                        ty: self.type_name(ty),
                        field: self.interner.resolve(*field).to_string(),
                        span: call.args[1].span.into(),
                    });
                    return invalid;
                };
                self.call_constants.insert(call_id, offset as u64);
                self.arena.u32()
            }
            Builtin::PtrCast => {
                if !self.arity(b, call, 2, span) {
                    return invalid;
                }
                // The first operand parses as a unary '*' expression; it is
                // reinterpreted as the target pointer type.
                let arg = call.args[0].clone();
                let target = match self.resolve_type_expr(&arg) {
                    Some(ty) if self.arena.is_pointer(ty) => ty,
                    _ => {
                        self.error(SemanticError::BuiltinArgMismatch {
                            builtin: b.source_name().to_string(),
                            index: 0,
                            expected: "a pointer type".to_string(),
                            found: "an expression".to_string(),
                            span: call.args[0].span.into(),
                        });
                        return invalid;
                    }
                };
                let input_ty = self.check_expr(&mut call.args[1]);
                if self.arena.is_invalid(input_ty) {
                    return invalid;
                }
                if !self.arena.is_pointer(input_ty) {
                    return self.arg_mismatch(b, 1, "a pointer", input_ty, call);
                }
                target
            }
            _ => unreachable!(),
        }
    }

    // ========================================================================
    // Schema helpers
    // ========================================================================

    fn arity(&mut self, b: Builtin, call: &CallExpr, expected: usize, span: Span) -> bool {
        if call.args.len() == expected {
            return true;
        }
        self.error(SemanticError::BuiltinArity {
            builtin: b.source_name().to_string(),
            expected: expected.to_string(),
            found: call.args.len(),
            span: span.into(),
        });
        false
    }

    fn arity_at_least(&mut self, b: Builtin, call: &CallExpr, min: usize, span: Span) -> bool {
        if call.args.len() >= min {
            return true;
        }
        self.error(SemanticError::BuiltinArity {
            builtin: b.source_name().to_string(),
            expected: format!("at least {}", min),
            found: call.args.len(),
            span: span.into(),
        });
        false
    }

    fn arg_mismatch(
        &mut self,
        b: Builtin,
        index: usize,
        expected: &str,
        found: TypeId,
        call: &CallExpr,
    ) -> TypeId {
        self.error(SemanticError::BuiltinArgMismatch {
            builtin: b.source_name().to_string(),
            index,
            expected: expected.to_string(),
            found: self.type_name(found),
            span: call.args[index].span.into(),
        });
        self.arena.invalid()
    }

    /// Argument must be a pointer to the given runtime type
    fn ptr_arg(
        &mut self,
        b: Builtin,
        call: &CallExpr,
        index: usize,
        ty: TypeId,
        expected: BuiltinType,
    ) -> bool {
        if self.arena.pointee(ty).and_then(|p| self.arena.as_builtin(p)) == Some(expected) {
            return true;
        }
        let expected_name = format!("*{}", expected.name());
        self.arg_mismatch(b, index, &expected_name, ty, call);
        false
    }

    fn any_pointer_arg(&mut self, b: Builtin, call: &CallExpr, index: usize, ty: TypeId) -> bool {
        if self.arena.is_pointer(ty) {
            return true;
        }
        self.arg_mismatch(b, index, "a pointer", ty, call);
        false
    }

    /// Argument must name a declared function taking `params` pointer
    /// arguments (a VM callback)
    fn callback_arg(
        &mut self,
        b: Builtin,
        call: &CallExpr,
        index: usize,
        ty: TypeId,
        params: usize,
    ) -> bool {
        let ok = matches!(&call.args[index].kind, ExprKind::Identifier(_))
            && self.resolutions.get(&call.args[index].id) == Some(&Resolution::Function)
            && matches!(
                self.arena.get(ty),
                InternedType::Function { params: p, .. } if p.len() == params
            );
        if ok {
            return true;
        }
        let expected = format!("a function taking {} arguments", params);
        self.arg_mismatch(b, index, &expected, ty, call);
        false
    }

    /// Argument must name any declared function
    fn function_arg(&mut self, b: Builtin, call: &CallExpr, index: usize, ty: TypeId) -> bool {
        let ok = self.resolutions.get(&call.args[index].id) == Some(&Resolution::Function)
            && matches!(self.arena.get(ty), InternedType::Function { .. });
        if ok {
            return true;
        }
        self.arg_mismatch(b, index, "a function", ty, call);
        false
    }

    /// Argument is a 64-bit hash or count; narrower integers widen
    fn hash_arg(&mut self, b: Builtin, call: &mut CallExpr, index: usize, ty: TypeId) -> bool {
        if !self.arena.is_integer(ty) {
            self.arg_mismatch(b, index, "uint64", ty, call);
            return false;
        }
        let to = self.arena.u64();
        if ty != to {
            self.insert_cast(&mut call.args[index], CastKind::IntegralCast, to);
        }
        true
    }

    /// Argument must be a non-negative integer literal (encoded as an
    /// immediate operand)
    fn u32_const_arg(&mut self, b: Builtin, call: &CallExpr, index: usize) -> bool {
        if matches!(
            call.args[index].kind,
            ExprKind::Literal(Literal::Int(n)) if n >= 0
        ) {
            return true;
        }
        self.error(SemanticError::BuiltinArgMismatch {
            builtin: b.source_name().to_string(),
            index,
            expected: "a constant column index".to_string(),
            found: "an expression".to_string(),
            span: call.args[index].span.into(),
        });
        false
    }

    fn string_literal_arg(&mut self, b: Builtin, call: &CallExpr, index: usize) -> bool {
        if matches!(call.args[index].kind, ExprKind::Literal(Literal::Str(_))) {
            return true;
        }
        self.error(SemanticError::BuiltinArgMismatch {
            builtin: b.source_name().to_string(),
            index,
            expected: "a string literal".to_string(),
            found: "an expression".to_string(),
            span: call.args[index].span.into(),
        });
        false
    }

    /// Argument must be a pointer to an aggregator; returns its kind
    fn aggregator_arg(
        &mut self,
        b: Builtin,
        call: &CallExpr,
        index: usize,
        ty: TypeId,
    ) -> Option<BuiltinType> {
        if let Some(kind) = self.arena.pointee(ty).and_then(|p| self.arena.as_builtin(p)) {
            if kind.is_aggregator() {
                return Some(kind);
            }
        }
        self.arg_mismatch(b, index, "a pointer to an aggregator", ty, call);
        None
    }

    fn byte_pointer(&mut self) -> TypeId {
        let u8_ty = self.arena.u8();
        self.arena.pointer_to(u8_ty)
    }

    fn vpi_get_shape(
        &mut self,
        b: Builtin,
        call: &CallExpr,
        arg_tys: &[TypeId],
        span: Span,
    ) -> bool {
        self.arity(b, call, 2, span)
            && self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
            && self.u32_const_arg(b, call, 1)
    }

    fn vpi_set_shape(
        &mut self,
        b: Builtin,
        call: &mut CallExpr,
        arg_tys: &[TypeId],
        value: BuiltinType,
        span: Span,
    ) -> TypeId {
        let invalid = self.arena.invalid();
        if !self.arity(b, call, 3, span)
            || !self.ptr_arg(b, call, 0, arg_tys[0], BuiltinType::VectorProjectionIterator)
        {
            return invalid;
        }
        if self.arena.as_builtin(arg_tys[1]) != Some(value) {
            return self.arg_mismatch(b, 1, value.name(), arg_tys[1], call);
        }
        if !self.u32_const_arg(b, call, 2) {
            return invalid;
        }
        self.arena.nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;
    use crate::sema::analyzer::AnalyzedFile;

    fn analyze(source: &str) -> Result<AnalyzedFile, Vec<SemanticError>> {
        let mut parser = Parser::new(source);
        let file = parser.parse_file();
        let (interner, errors) = parser.into_parts();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        Analyzer::new(&interner).analyze(file)
    }

    #[test]
    fn size_of_produces_u32_constant() {
        let analyzed = analyze("fun f() -> uint32 { return @sizeOf(int64) }").unwrap();
        assert_eq!(analyzed.call_constants.values().next(), Some(&8));
    }

    #[test]
    fn offset_of_computes_field_offset() {
        let analyzed = analyze(
            "struct Row { a: int8; b: int64 }
             fun f() -> uint32 { return @offsetOf(Row, b) }",
        )
        .unwrap();
        assert_eq!(analyzed.call_constants.values().next(), Some(&8));
    }

    #[test]
    fn int_to_sql_returns_integer() {
        assert!(analyze("fun f() -> Integer { return @intToSql(42) }").is_ok());
    }

    #[test]
    fn int_to_sql_rejects_float() {
        let errors = analyze("fun f() -> Integer { return @intToSql(1.5) }").unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::BuiltinArgMismatch { .. }
        ));
    }

    #[test]
    fn unknown_builtin_is_reported() {
        let errors = analyze("fun f() { @noSuchThing() }").unwrap_err();
        assert!(matches!(errors[0], SemanticError::UnknownBuiltin { .. }));
    }

    #[test]
    fn builtin_arity_is_checked() {
        let errors = analyze("fun f() -> Integer { return @intToSql(1, 2) }").unwrap_err();
        assert!(matches!(errors[0], SemanticError::BuiltinArity { .. }));
    }

    #[test]
    fn ptr_cast_produces_target_type() {
        let source = "struct Row { a: int32 }
                      fun f(p: *uint8) -> int32 {
                          var r: *Row = @ptrCast(*Row, p)
                          return r.a
                      }";
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn table_iter_requires_pointer() {
        let errors =
            analyze("fun f(tvi: TableVectorIterator) -> bool { return @tableIterAdvance(tvi) }")
                .unwrap_err();
        assert!(matches!(
            errors[0],
            SemanticError::BuiltinArgMismatch { .. }
        ));
    }

    #[test]
    fn sorter_init_checks_comparator() {
        let source = "fun cmp(a: *uint8, b: *uint8) -> int32 { return 0 }
                      fun f(s: *Sorter, mem: *MemoryPool) {
                          @sorterInit(s, mem, cmp, 8)
                      }";
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn hash_accepts_variadic_sql_values() {
        let source = "fun f() -> uint64 {
                          var a: Integer = @intToSql(1)
                          var b: Integer = @intToSql(2)
                          return @hash(a, b)
                      }";
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn agg_result_type_follows_aggregator_kind() {
        let source = "fun f(agg: *AvgAggregate) -> Real { return @aggResult(agg) }";
        assert!(analyze(source).is_ok());
        let source = "fun f(agg: *CountAggregate) -> Integer { return @aggResult(agg) }";
        assert!(analyze(source).is_ok());
    }
}
