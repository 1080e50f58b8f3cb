// src/bytecode/opcodes.rs
//
// The master list of all bytecode instructions and their operand schemas.
// The list drives the enum, the per-opcode metadata table, and (through
// `Bytecode::ALL`) raw <-> enum conversion. Arithmetic and comparison
// opcodes are specialized per primitive type; SQL and runtime-object
// opcodes name the shim they dispatch to.
//
// Operand order in the schema is the order the operands appear in the
// instruction stream, and handlers must read them in exactly that order.

use crate::bytecode::operands::OperandType;

macro_rules! bytecode_list {
    ($F:ident) => {
        $F! {
            // ----------------------------------------------------------------
            // Primitive integer arithmetic (dest, lhs, rhs)
            // ----------------------------------------------------------------
            (AddI8, Local, Local, Local),
            (AddI16, Local, Local, Local),
            (AddI32, Local, Local, Local),
            (AddI64, Local, Local, Local),
            (AddU8, Local, Local, Local),
            (AddU16, Local, Local, Local),
            (AddU32, Local, Local, Local),
            (AddU64, Local, Local, Local),
            (SubI8, Local, Local, Local),
            (SubI16, Local, Local, Local),
            (SubI32, Local, Local, Local),
            (SubI64, Local, Local, Local),
            (SubU8, Local, Local, Local),
            (SubU16, Local, Local, Local),
            (SubU32, Local, Local, Local),
            (SubU64, Local, Local, Local),
            (MulI8, Local, Local, Local),
            (MulI16, Local, Local, Local),
            (MulI32, Local, Local, Local),
            (MulI64, Local, Local, Local),
            (MulU8, Local, Local, Local),
            (MulU16, Local, Local, Local),
            (MulU32, Local, Local, Local),
            (MulU64, Local, Local, Local),
            (DivI8, Local, Local, Local),
            (DivI16, Local, Local, Local),
            (DivI32, Local, Local, Local),
            (DivI64, Local, Local, Local),
            (DivU8, Local, Local, Local),
            (DivU16, Local, Local, Local),
            (DivU32, Local, Local, Local),
            (DivU64, Local, Local, Local),
            (RemI8, Local, Local, Local),
            (RemI16, Local, Local, Local),
            (RemI32, Local, Local, Local),
            (RemI64, Local, Local, Local),
            (RemU8, Local, Local, Local),
            (RemU16, Local, Local, Local),
            (RemU32, Local, Local, Local),
            (RemU64, Local, Local, Local),
            (BitAndI8, Local, Local, Local),
            (BitAndI16, Local, Local, Local),
            (BitAndI32, Local, Local, Local),
            (BitAndI64, Local, Local, Local),
            (BitAndU8, Local, Local, Local),
            (BitAndU16, Local, Local, Local),
            (BitAndU32, Local, Local, Local),
            (BitAndU64, Local, Local, Local),
            (BitOrI8, Local, Local, Local),
            (BitOrI16, Local, Local, Local),
            (BitOrI32, Local, Local, Local),
            (BitOrI64, Local, Local, Local),
            (BitOrU8, Local, Local, Local),
            (BitOrU16, Local, Local, Local),
            (BitOrU32, Local, Local, Local),
            (BitOrU64, Local, Local, Local),
            (BitXorI8, Local, Local, Local),
            (BitXorI16, Local, Local, Local),
            (BitXorI32, Local, Local, Local),
            (BitXorI64, Local, Local, Local),
            (BitXorU8, Local, Local, Local),
            (BitXorU16, Local, Local, Local),
            (BitXorU32, Local, Local, Local),
            (BitXorU64, Local, Local, Local),
            (ShlI8, Local, Local, Local),
            (ShlI16, Local, Local, Local),
            (ShlI32, Local, Local, Local),
            (ShlI64, Local, Local, Local),
            (ShlU8, Local, Local, Local),
            (ShlU16, Local, Local, Local),
            (ShlU32, Local, Local, Local),
            (ShlU64, Local, Local, Local),
            (ShrI8, Local, Local, Local),
            (ShrI16, Local, Local, Local),
            (ShrI32, Local, Local, Local),
            (ShrI64, Local, Local, Local),
            (ShrU8, Local, Local, Local),
            (ShrU16, Local, Local, Local),
            (ShrU32, Local, Local, Local),
            (ShrU64, Local, Local, Local),
            (NegI8, Local, Local),
            (NegI16, Local, Local),
            (NegI32, Local, Local),
            (NegI64, Local, Local),
            (NegU8, Local, Local),
            (NegU16, Local, Local),
            (NegU32, Local, Local),
            (NegU64, Local, Local),
            (BitNegI8, Local, Local),
            (BitNegI16, Local, Local),
            (BitNegI32, Local, Local),
            (BitNegI64, Local, Local),
            (BitNegU8, Local, Local),
            (BitNegU16, Local, Local),
            (BitNegU32, Local, Local),
            (BitNegU64, Local, Local),

            // ----------------------------------------------------------------
            // Primitive integer comparisons (bool dest, lhs, rhs)
            // ----------------------------------------------------------------
            (EqualI8, Local, Local, Local),
            (EqualI16, Local, Local, Local),
            (EqualI32, Local, Local, Local),
            (EqualI64, Local, Local, Local),
            (EqualU8, Local, Local, Local),
            (EqualU16, Local, Local, Local),
            (EqualU32, Local, Local, Local),
            (EqualU64, Local, Local, Local),
            (NotEqualI8, Local, Local, Local),
            (NotEqualI16, Local, Local, Local),
            (NotEqualI32, Local, Local, Local),
            (NotEqualI64, Local, Local, Local),
            (NotEqualU8, Local, Local, Local),
            (NotEqualU16, Local, Local, Local),
            (NotEqualU32, Local, Local, Local),
            (NotEqualU64, Local, Local, Local),
            (LessThanI8, Local, Local, Local),
            (LessThanI16, Local, Local, Local),
            (LessThanI32, Local, Local, Local),
            (LessThanI64, Local, Local, Local),
            (LessThanU8, Local, Local, Local),
            (LessThanU16, Local, Local, Local),
            (LessThanU32, Local, Local, Local),
            (LessThanU64, Local, Local, Local),
            (LessThanEqualI8, Local, Local, Local),
            (LessThanEqualI16, Local, Local, Local),
            (LessThanEqualI32, Local, Local, Local),
            (LessThanEqualI64, Local, Local, Local),
            (LessThanEqualU8, Local, Local, Local),
            (LessThanEqualU16, Local, Local, Local),
            (LessThanEqualU32, Local, Local, Local),
            (LessThanEqualU64, Local, Local, Local),
            (GreaterThanI8, Local, Local, Local),
            (GreaterThanI16, Local, Local, Local),
            (GreaterThanI32, Local, Local, Local),
            (GreaterThanI64, Local, Local, Local),
            (GreaterThanU8, Local, Local, Local),
            (GreaterThanU16, Local, Local, Local),
            (GreaterThanU32, Local, Local, Local),
            (GreaterThanU64, Local, Local, Local),
            (GreaterThanEqualI8, Local, Local, Local),
            (GreaterThanEqualI16, Local, Local, Local),
            (GreaterThanEqualI32, Local, Local, Local),
            (GreaterThanEqualI64, Local, Local, Local),
            (GreaterThanEqualU8, Local, Local, Local),
            (GreaterThanEqualU16, Local, Local, Local),
            (GreaterThanEqualU32, Local, Local, Local),
            (GreaterThanEqualU64, Local, Local, Local),

            // ----------------------------------------------------------------
            // Primitive float arithmetic and comparisons
            // ----------------------------------------------------------------
            (AddF32, Local, Local, Local),
            (AddF64, Local, Local, Local),
            (SubF32, Local, Local, Local),
            (SubF64, Local, Local, Local),
            (MulF32, Local, Local, Local),
            (MulF64, Local, Local, Local),
            (DivF32, Local, Local, Local),
            (DivF64, Local, Local, Local),
            (RemF32, Local, Local, Local),
            (RemF64, Local, Local, Local),
            (NegF32, Local, Local),
            (NegF64, Local, Local),
            (EqualF32, Local, Local, Local),
            (EqualF64, Local, Local, Local),
            (NotEqualF32, Local, Local, Local),
            (NotEqualF64, Local, Local, Local),
            (LessThanF32, Local, Local, Local),
            (LessThanF64, Local, Local, Local),
            (LessThanEqualF32, Local, Local, Local),
            (LessThanEqualF64, Local, Local, Local),
            (GreaterThanF32, Local, Local, Local),
            (GreaterThanF64, Local, Local, Local),
            (GreaterThanEqualF32, Local, Local, Local),
            (GreaterThanEqualF64, Local, Local, Local),

            // ----------------------------------------------------------------
            // Primitive conversions (sources are widened to 64 bits first)
            // ----------------------------------------------------------------
            (SignExtendI8, Local, Local),
            (SignExtendI16, Local, Local),
            (SignExtendI32, Local, Local),
            (ZeroExtendU8, Local, Local),
            (ZeroExtendU16, Local, Local),
            (ZeroExtendU32, Local, Local),
            (I64ToF32, Local, Local),
            (I64ToF64, Local, Local),
            (F32ToI64, Local, Local),
            (F64ToI64, Local, Local),
            (F32ToF64, Local, Local),
            (F64ToF32, Local, Local),

            // ----------------------------------------------------------------
            // Boolean
            // ----------------------------------------------------------------
            (Not, Local, Local),

            // ----------------------------------------------------------------
            // Branching
            // ----------------------------------------------------------------
            (Jump, JumpOffset),
            (JumpIfTrue, Local, JumpOffset),
            (JumpIfFalse, Local, JumpOffset),

            // ----------------------------------------------------------------
            // Memory and pointers
            // ----------------------------------------------------------------
            (Deref1, Local, Local),
            (Deref2, Local, Local),
            (Deref4, Local, Local),
            (Deref8, Local, Local),
            (DerefN, Local, Local, UImm4),
            (Assign1, Local, Local),
            (Assign2, Local, Local),
            (Assign4, Local, Local),
            (Assign8, Local, Local),
            (AssignImm1, Local, Imm1),
            (AssignImm2, Local, Imm2),
            (AssignImm4, Local, Imm4),
            (AssignImm8, Local, Imm8),
            (AssignString, Local, UImm4),
            (Lea, Local, Local, UImm4),
            (LeaScaled, Local, Local, Local, UImm4, UImm4),
            (IsNullPtr, Local, Local),
            (IsNotNullPtr, Local, Local),

            // ----------------------------------------------------------------
            // Function calls
            // ----------------------------------------------------------------
            (Call, FunctionId, LocalCount),
            (Return),

            // ----------------------------------------------------------------
            // SQL value construction and coercion
            // ----------------------------------------------------------------
            (ForceBoolTruth, Local, Local),
            (InitBool, Local, Local),
            (InitInteger, Local, Local),
            (InitReal, Local, Local),
            (InitDate, Local, Local, Local, Local),
            (InitString, Local, UImm4),
            (IntegerToReal, Local, Local),

            // ----------------------------------------------------------------
            // SQL value arithmetic (dest, left, right; null-propagating)
            // ----------------------------------------------------------------
            (AddInteger, Local, Local, Local),
            (SubInteger, Local, Local, Local),
            (MulInteger, Local, Local, Local),
            (DivInteger, Local, Local, Local),
            (RemInteger, Local, Local, Local),
            (AddReal, Local, Local, Local),
            (SubReal, Local, Local, Local),
            (MulReal, Local, Local, Local),
            (DivReal, Local, Local, Local),
            (RemReal, Local, Local, Local),

            // ----------------------------------------------------------------
            // SQL value comparisons (Boolean dest, left, right)
            // ----------------------------------------------------------------
            (EqualInteger, Local, Local, Local),
            (NotEqualInteger, Local, Local, Local),
            (LessThanInteger, Local, Local, Local),
            (LessThanEqualInteger, Local, Local, Local),
            (GreaterThanInteger, Local, Local, Local),
            (GreaterThanEqualInteger, Local, Local, Local),
            (EqualReal, Local, Local, Local),
            (NotEqualReal, Local, Local, Local),
            (LessThanReal, Local, Local, Local),
            (LessThanEqualReal, Local, Local, Local),
            (GreaterThanReal, Local, Local, Local),
            (GreaterThanEqualReal, Local, Local, Local),
            (EqualDate, Local, Local, Local),
            (NotEqualDate, Local, Local, Local),
            (LessThanDate, Local, Local, Local),
            (LessThanEqualDate, Local, Local, Local),
            (GreaterThanDate, Local, Local, Local),
            (GreaterThanEqualDate, Local, Local, Local),
            (EqualString, Local, Local, Local),
            (NotEqualString, Local, Local, Local),
            (LessThanString, Local, Local, Local),
            (LessThanEqualString, Local, Local, Local),
            (GreaterThanString, Local, Local, Local),
            (GreaterThanEqualString, Local, Local, Local),

            // ----------------------------------------------------------------
            // SQL scalar functions
            // ----------------------------------------------------------------
            (AbsInteger, Local, Local),
            (AbsReal, Local, Local),
            (ACosReal, Local, Local),
            (ASinReal, Local, Local),
            (ATanReal, Local, Local),
            (ATan2Real, Local, Local, Local),
            (CosReal, Local, Local),
            (CotReal, Local, Local),
            (SinReal, Local, Local),
            (TanReal, Local, Local),
            (ExpReal, Local, Local),
            (SqrtReal, Local, Local),
            (CeilReal, Local, Local),
            (FloorReal, Local, Local),
            (RoundReal, Local, Local),
            (LnReal, Local, Local),
            (Log2Real, Local, Local),
            (Log10Real, Local, Local),
            (Like, Local, Local, Local),
            (Concat, Local, Local, Local),
            (ExtractYear, Local, Local),

            // ----------------------------------------------------------------
            // Hashing
            // ----------------------------------------------------------------
            (HashInteger, Local, Local),
            (HashReal, Local, Local),
            (HashDate, Local, Local),
            (HashString, Local, Local),
            (HashCombine, Local, Local),

            // ----------------------------------------------------------------
            // Execution context and result buffer
            // ----------------------------------------------------------------
            (ExecutionContextGetMemoryPool, Local, Local),
            (ResultBufferAllocRow, Local, Local),
            (ResultBufferFinalize, Local),

            // ----------------------------------------------------------------
            // Thread state container
            // ----------------------------------------------------------------
            (ThreadStateContainerInit, Local, Local),
            (ThreadStateContainerReset, Local, Local, FunctionId, FunctionId, Local),
            (ThreadStateContainerIterate, Local, Local, FunctionId),
            (ThreadStateContainerFree, Local),

            // ----------------------------------------------------------------
            // Table vector iterator
            // ----------------------------------------------------------------
            (TableVectorIteratorInit, Local, UImm2),
            (TableVectorIteratorNext, Local, Local),
            (TableVectorIteratorGetVPI, Local, Local),
            (TableVectorIteratorClose, Local),
            (ParallelScanTable, UImm2, Local, Local, FunctionId),

            // ----------------------------------------------------------------
            // Vector projection iterator
            // ----------------------------------------------------------------
            (VpiIsFiltered, Local, Local),
            (VpiGetSelectedRowCount, Local, Local),
            (VpiHasNext, Local, Local),
            (VpiHasNextFiltered, Local, Local),
            (VpiAdvance, Local),
            (VpiAdvanceFiltered, Local),
            (VpiSetPosition, Local, Local),
            (VpiSetPositionFiltered, Local, Local),
            (VpiMatch, Local, Local),
            (VpiReset, Local),
            (VpiResetFiltered, Local),
            (VpiGetSmallInt, Local, Local, UImm4),
            (VpiGetInt, Local, Local, UImm4),
            (VpiGetBigInt, Local, Local, UImm4),
            (VpiGetReal, Local, Local, UImm4),
            (VpiGetDouble, Local, Local, UImm4),
            (VpiGetDate, Local, Local, UImm4),
            (VpiGetString, Local, Local, UImm4),
            (VpiSetSmallInt, Local, Local, UImm4),
            (VpiSetInt, Local, Local, UImm4),
            (VpiSetBigInt, Local, Local, UImm4),
            (VpiSetReal, Local, Local, UImm4),
            (VpiSetDouble, Local, Local, UImm4),
            (VpiSetDate, Local, Local, UImm4),
            (VpiSetString, Local, Local, UImm4),

            // ----------------------------------------------------------------
            // Filter manager
            // ----------------------------------------------------------------
            (FilterManagerInit, Local),
            (FilterManagerInsertFilter, Local, FunctionId),
            (FilterManagerFinalize, Local),
            (FilterManagerRunFilters, Local, Local),
            (FilterManagerFree, Local),

            // ----------------------------------------------------------------
            // Vector filter executor
            // ----------------------------------------------------------------
            (VectorFilterExecuteInit, Local, Local),
            (VectorFilterExecuteEqual, Local, UImm4, Local),
            (VectorFilterExecuteGreaterThan, Local, UImm4, Local),
            (VectorFilterExecuteGreaterThanEqual, Local, UImm4, Local),
            (VectorFilterExecuteLessThan, Local, UImm4, Local),
            (VectorFilterExecuteLessThanEqual, Local, UImm4, Local),
            (VectorFilterExecuteNotEqual, Local, UImm4, Local),
            (VectorFilterExecuteFinish, Local),
            (VectorFilterExecuteFree, Local),

            // ----------------------------------------------------------------
            // Aggregation hash table
            // ----------------------------------------------------------------
            (AggregationHashTableInit, Local, Local, Local),
            (AggregationHashTableInsert, Local, Local, Local),
            (AggregationHashTableLookup, Local, Local, Local, FunctionId, Local),
            (AggregationHashTableProcessBatch, Local, Local, FunctionId, FunctionId, FunctionId, FunctionId, Local),
            (AggregationHashTableTransferPartitions, Local, Local, Local, FunctionId),
            (AggregationHashTableParallelPartitionedScan, Local, Local, Local, FunctionId),
            (AggregationHashTableFree, Local),
            (AggregationHashTableIteratorInit, Local, Local),
            (AggregationHashTableIteratorHasNext, Local, Local),
            (AggregationHashTableIteratorNext, Local),
            (AggregationHashTableIteratorGetRow, Local, Local),
            (AggregationHashTableIteratorFree, Local),
            (AggregationOverflowPartitionIteratorHasNext, Local, Local),
            (AggregationOverflowPartitionIteratorNext, Local),
            (AggregationOverflowPartitionIteratorGetHash, Local, Local),
            (AggregationOverflowPartitionIteratorGetRow, Local, Local),

            // ----------------------------------------------------------------
            // Aggregators (one lifecycle set per aggregator kind)
            // ----------------------------------------------------------------
            (CountAggregateInit, Local),
            (CountAggregateAdvance, Local, Local),
            (CountAggregateMerge, Local, Local),
            (CountAggregateReset, Local),
            (CountAggregateGetResult, Local, Local),
            (CountStarAggregateInit, Local),
            (CountStarAggregateAdvance, Local, Local),
            (CountStarAggregateMerge, Local, Local),
            (CountStarAggregateReset, Local),
            (CountStarAggregateGetResult, Local, Local),
            (IntegerSumAggregateInit, Local),
            (IntegerSumAggregateAdvance, Local, Local),
            (IntegerSumAggregateMerge, Local, Local),
            (IntegerSumAggregateReset, Local),
            (IntegerSumAggregateGetResult, Local, Local),
            (IntegerMinAggregateInit, Local),
            (IntegerMinAggregateAdvance, Local, Local),
            (IntegerMinAggregateMerge, Local, Local),
            (IntegerMinAggregateReset, Local),
            (IntegerMinAggregateGetResult, Local, Local),
            (IntegerMaxAggregateInit, Local),
            (IntegerMaxAggregateAdvance, Local, Local),
            (IntegerMaxAggregateMerge, Local, Local),
            (IntegerMaxAggregateReset, Local),
            (IntegerMaxAggregateGetResult, Local, Local),
            (RealSumAggregateInit, Local),
            (RealSumAggregateAdvance, Local, Local),
            (RealSumAggregateMerge, Local, Local),
            (RealSumAggregateReset, Local),
            (RealSumAggregateGetResult, Local, Local),
            (RealMinAggregateInit, Local),
            (RealMinAggregateAdvance, Local, Local),
            (RealMinAggregateMerge, Local, Local),
            (RealMinAggregateReset, Local),
            (RealMinAggregateGetResult, Local, Local),
            (RealMaxAggregateInit, Local),
            (RealMaxAggregateAdvance, Local, Local),
            (RealMaxAggregateMerge, Local, Local),
            (RealMaxAggregateReset, Local),
            (RealMaxAggregateGetResult, Local, Local),
            (AvgAggregateInit, Local),
            (AvgAggregateAdvance, Local, Local),
            (AvgAggregateMerge, Local, Local),
            (AvgAggregateReset, Local),
            (AvgAggregateGetResult, Local, Local),

            // ----------------------------------------------------------------
            // Join hash table
            // ----------------------------------------------------------------
            (JoinHashTableInit, Local, Local, Local),
            (JoinHashTableAllocTuple, Local, Local, Local),
            (JoinHashTableBuild, Local),
            (JoinHashTableBuildParallel, Local, Local, Local),
            (JoinHashTableLookup, Local, Local, Local),
            (JoinHashTableFree, Local),
            (HashTableEntryIterHasNext, Local, Local),
            (HashTableEntryIterGetRow, Local, Local),
            (HashTableEntryGetNext, Local, Local),

            // ----------------------------------------------------------------
            // Sorting
            // ----------------------------------------------------------------
            (SorterInit, Local, Local, FunctionId, Local),
            (SorterInsert, Local, Local),
            (SorterInsertTopK, Local, Local, Local),
            (SorterInsertTopKFinish, Local, Local),
            (SorterSort, Local),
            (SorterSortParallel, Local, Local, Local),
            (SorterSortTopKParallel, Local, Local, Local, Local),
            (SorterFree, Local),
            (SorterIteratorInit, Local, Local),
            (SorterIteratorHasNext, Local, Local),
            (SorterIteratorNext, Local),
            (SorterIteratorGetRow, Local, Local),
            (SorterIteratorFree, Local),

            // ----------------------------------------------------------------
            // CSV reader
            // ----------------------------------------------------------------
            (CsvReaderInit, Local, Local, UImm4),
            (CsvReaderAdvance, Local, Local),
            (CsvReaderGetField, Local, UImm4, Local),
            (CsvReaderClose, Local),
        }
    };
}

macro_rules! define_bytecodes {
    ($(($name:ident $(, $op:ident)*)),+ $(,)?) => {
        /// The single enumeration of all bytecode instructions
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Bytecode {
            $($name),+
        }

        impl Bytecode {
            pub const ALL: &'static [Bytecode] = &[$(Bytecode::$name),+];
            pub const COUNT: usize = Self::ALL.len();

            /// Convert the 2-byte stream representation back to an opcode
            pub fn from_raw(raw: u16) -> Option<Bytecode> {
                Self::ALL.get(raw as usize).copied()
            }

            /// The 2-byte representation written to the instruction stream
            pub fn raw(self) -> u16 {
                self as u16
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Bytecode::$name => stringify!($name)),+
                }
            }

            /// Operand schema, in stream order
            pub fn operand_types(self) -> &'static [OperandType] {
                match self {
                    $(Bytecode::$name => &[$(OperandType::$op),*]),+
                }
            }
        }
    };
}

bytecode_list!(define_bytecodes);

impl Bytecode {
    pub fn num_operands(self) -> usize {
        self.operand_types().len()
    }

    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Bytecode::Jump | Bytecode::JumpIfTrue | Bytecode::JumpIfFalse
        )
    }

    pub fn is_call(self) -> bool {
        self == Bytecode::Call
    }

    /// Terminal instructions end straight-line execution
    pub fn is_terminal(self) -> bool {
        matches!(self, Bytecode::Jump | Bytecode::Return)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        for &op in Bytecode::ALL {
            assert_eq!(Bytecode::from_raw(op.raw()), Some(op));
        }
        assert_eq!(Bytecode::from_raw(Bytecode::COUNT as u16), None);
    }

    #[test]
    fn opcode_fits_two_bytes() {
        assert!(Bytecode::COUNT <= u16::MAX as usize);
        assert_eq!(std::mem::size_of::<Bytecode>(), 2);
    }

    #[test]
    fn operand_schemas() {
        assert_eq!(
            Bytecode::AddI32.operand_types(),
            &[OperandType::Local, OperandType::Local, OperandType::Local]
        );
        assert_eq!(Bytecode::Jump.operand_types(), &[OperandType::JumpOffset]);
        assert_eq!(
            Bytecode::Call.operand_types(),
            &[OperandType::FunctionId, OperandType::LocalCount]
        );
        assert_eq!(Bytecode::Return.num_operands(), 0);
    }

    #[test]
    fn jump_classification() {
        assert!(Bytecode::Jump.is_jump());
        assert!(Bytecode::JumpIfFalse.is_jump());
        assert!(!Bytecode::AddI32.is_jump());
        assert!(Bytecode::Return.is_terminal());
        assert!(Bytecode::Jump.is_terminal());
        assert!(!Bytecode::JumpIfTrue.is_terminal());
    }
}
