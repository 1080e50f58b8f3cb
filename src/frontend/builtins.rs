// src/frontend/builtins.rs
//! The closed set of builtin functions callable as `@name(...)`.
//!
//! Each entry pairs the enum variant with the name used in source programs.
//! The list drives both the semantic checker (signature validation) and the
//! code generator (opcode selection), so new builtins are added here first.

/// Expands a callback macro with the `Variant => "sourceName"` pairs of
/// every builtin.
macro_rules! builtin_list {
    ($F:ident) => {
        $F! {
            // Primitive <-> SQL conversions
            IntToSql => "intToSql",
            FloatToSql => "floatToSql",
            BoolToSql => "boolToSql",
            DateToSql => "dateToSql",
            StringToSql => "stringToSql",
            SqlToBool => "sqlToBool",

            // SQL string functions
            Like => "like",
            Concat => "concat",
            ExtractYear => "extractYear",

            // Execution context
            ExecCtxGetMemoryPool => "execCtxGetMem",
            ResultBufferAllocRow => "resultBufferAllocRow",
            ResultBufferFinalize => "resultBufferFinalize",

            // Thread state container
            ThreadStateContainerInit => "tlsInit",
            ThreadStateContainerReset => "tlsReset",
            ThreadStateContainerIterate => "tlsIterate",
            ThreadStateContainerFree => "tlsFree",

            // Table scans
            TableIterInit => "tableIterInit",
            TableIterAdvance => "tableIterAdvance",
            TableIterGetVPI => "tableIterGetVPI",
            TableIterClose => "tableIterClose",
            TableIterParallel => "iterateTableParallel",

            // Vector projection iterator
            VpiIsFiltered => "vpiIsFiltered",
            VpiSelectedRowCount => "vpiSelectedRowCount",
            VpiHasNext => "vpiHasNext",
            VpiHasNextFiltered => "vpiHasNextFiltered",
            VpiAdvance => "vpiAdvance",
            VpiAdvanceFiltered => "vpiAdvanceFiltered",
            VpiSetPosition => "vpiSetPosition",
            VpiSetPositionFiltered => "vpiSetPositionFiltered",
            VpiMatch => "vpiMatch",
            VpiReset => "vpiReset",
            VpiResetFiltered => "vpiResetFiltered",
            VpiGetSmallInt => "vpiGetSmallInt",
            VpiGetInt => "vpiGetInt",
            VpiGetBigInt => "vpiGetBigInt",
            VpiGetReal => "vpiGetReal",
            VpiGetDouble => "vpiGetDouble",
            VpiGetDate => "vpiGetDate",
            VpiGetString => "vpiGetString",
            VpiSetSmallInt => "vpiSetSmallInt",
            VpiSetInt => "vpiSetInt",
            VpiSetBigInt => "vpiSetBigInt",
            VpiSetReal => "vpiSetReal",
            VpiSetDouble => "vpiSetDouble",
            VpiSetDate => "vpiSetDate",
            VpiSetString => "vpiSetString",

            // Hashing
            Hash => "hash",

            // Filter manager
            FilterManagerInit => "filterManagerInit",
            FilterManagerInsertFilter => "filterManagerInsertFilter",
            FilterManagerFinalize => "filterManagerFinalize",
            FilterManagerRunFilters => "filtersRun",
            FilterManagerFree => "filterManagerFree",

            // Vector filter executor
            VectorFilterExecInit => "filterExecInit",
            VectorFilterExecEqual => "filterExecEq",
            VectorFilterExecGreaterThan => "filterExecGt",
            VectorFilterExecGreaterThanEqual => "filterExecGe",
            VectorFilterExecLessThan => "filterExecLt",
            VectorFilterExecLessThanEqual => "filterExecLe",
            VectorFilterExecNotEqual => "filterExecNe",
            VectorFilterExecFinish => "filterExecFinish",
            VectorFilterExecFree => "filterExecFree",

            // Aggregation hash table
            AggHashTableInit => "aggHTInit",
            AggHashTableInsert => "aggHTInsert",
            AggHashTableLookup => "aggHTLookup",
            AggHashTableProcessBatch => "aggHTProcessBatch",
            AggHashTableMovePartitions => "aggHTMoveParts",
            AggHashTableParallelPartitionedScan => "aggHTParallelPartScan",
            AggHashTableFree => "aggHTFree",
            AggHashTableIterInit => "aggHTIterInit",
            AggHashTableIterHasNext => "aggHTIterHasNext",
            AggHashTableIterNext => "aggHTIterNext",
            AggHashTableIterGetRow => "aggHTIterGetRow",
            AggHashTableIterClose => "aggHTIterClose",
            AggPartIterHasNext => "aggPartIterHasNext",
            AggPartIterNext => "aggPartIterNext",
            AggPartIterGetHash => "aggPartIterGetHash",
            AggPartIterGetRow => "aggPartIterGetRow",

            // Aggregators
            AggInit => "aggInit",
            AggAdvance => "aggAdvance",
            AggMerge => "aggMerge",
            AggReset => "aggReset",
            AggResult => "aggResult",

            // Join hash table
            JoinHashTableInit => "joinHTInit",
            JoinHashTableAllocTuple => "joinHTAlloc",
            JoinHashTableBuild => "joinHTBuild",
            JoinHashTableBuildParallel => "joinHTBuildParallel",
            JoinHashTableLookup => "joinHTLookup",
            JoinHashTableFree => "joinHTFree",
            HashTableEntryIterHasNext => "htEntryIterHasNext",
            HashTableEntryIterGetRow => "htEntryIterGetRow",

            // Sorting
            SorterInit => "sorterInit",
            SorterInsert => "sorterInsert",
            SorterInsertTopK => "sorterInsertTopK",
            SorterInsertTopKFinish => "sorterInsertTopKFinish",
            SorterSort => "sorterSort",
            SorterSortParallel => "sorterSortParallel",
            SorterSortTopKParallel => "sorterSortTopKParallel",
            SorterFree => "sorterFree",
            SorterIterInit => "sorterIterInit",
            SorterIterHasNext => "sorterIterHasNext",
            SorterIterNext => "sorterIterNext",
            SorterIterGetRow => "sorterIterGetRow",
            SorterIterClose => "sorterIterClose",

            // CSV ingest
            CsvReaderInit => "csvReaderInit",
            CsvReaderAdvance => "csvReaderAdvance",
            CsvReaderGetField => "csvReaderGetField",
            CsvReaderClose => "csvReaderClose",

            // Math on SQL reals
            ACos => "acos",
            ASin => "asin",
            ATan => "atan",
            ATan2 => "atan2",
            Cos => "cos",
            Cot => "cot",
            Sin => "sin",
            Tan => "tan",
            Abs => "abs",
            Exp => "exp",
            Sqrt => "sqrt",
            Ceil => "ceil",
            Floor => "floor",
            Round => "round",
            Ln => "ln",
            Log2 => "log2",
            Log10 => "log10",

            // Generic
            SizeOf => "sizeOf",
            OffsetOf => "offsetOf",
            PtrCast => "ptrCast",
        }
    };
}

macro_rules! define_builtins {
    ($($name:ident => $source:literal),+ $(,)?) => {
        /// An enumeration of all builtin functions
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($name),+
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$name),+];

            /// The name used to call this builtin in source programs
            pub fn source_name(self) -> &'static str {
                match self {
                    $(Builtin::$name => $source),+
                }
            }

            /// Resolve a source-level name to a builtin
            pub fn from_name(name: &str) -> Option<Builtin> {
                match name {
                    $($source => Some(Builtin::$name),)+
                    _ => None,
                }
            }
        }
    };
}

builtin_list!(define_builtins);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for &b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.source_name()), Some(b));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Builtin::from_name("noSuchBuiltin"), None);
    }

    #[test]
    fn source_names_are_unique() {
        let mut names: Vec<_> = Builtin::ALL.iter().map(|b| b.source_name()).collect();
        names.sort_unstable();
        let len = names.len();
        names.dedup();
        assert_eq!(names.len(), len);
    }
}
