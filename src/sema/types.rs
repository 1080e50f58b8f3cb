// src/sema/types.rs
//
// Interned type system using TypeId handles for O(1) equality.
//
// - TypeId: u32 handle to an interned type (Copy, trivial Eq/Hash)
// - TypeArena: per-compilation storage with automatic deduplication
// - InternedType: internal storage using SmallVec for child types
//
// Two structurally identical construction requests always return the same
// TypeId, so type equality everywhere else in the compiler is handle equality.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::frontend::{Interner, Symbol};

/// Handle to a canonical type in the TypeArena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    /// Get the raw index (for debugging)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// SmallVec for type children - inline up to 4 (covers most field lists)
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

/// Primitive machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Nil,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

/// The closed set of nominal SQL/runtime types. Each has a fixed size and
/// alignment taken from the corresponding runtime struct so that frame
/// layout can reserve storage for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Integer,
    Real,
    Date,
    Timestamp,
    StringVal,
    Boolean,
    MemoryPool,
    ExecutionContext,
    ThreadStateContainer,
    TableVectorIterator,
    VectorProjectionIterator,
    VectorProjection,
    TupleIdList,
    FilterManager,
    VectorFilterExecutor,
    AggregationHashTable,
    AhtIterator,
    AhtOverflowPartitionIterator,
    HashTableEntry,
    JoinHashTable,
    Sorter,
    SorterIterator,
    CsvReader,
    CountAggregate,
    CountStarAggregate,
    IntegerSumAggregate,
    IntegerMinAggregate,
    IntegerMaxAggregate,
    RealSumAggregate,
    RealMinAggregate,
    RealMaxAggregate,
    AvgAggregate,
}

impl BuiltinType {
    pub const ALL: &'static [BuiltinType] = &[
        Self::Integer,
        Self::Real,
        Self::Date,
        Self::Timestamp,
        Self::StringVal,
        Self::Boolean,
        Self::MemoryPool,
        Self::ExecutionContext,
        Self::ThreadStateContainer,
        Self::TableVectorIterator,
        Self::VectorProjectionIterator,
        Self::VectorProjection,
        Self::TupleIdList,
        Self::FilterManager,
        Self::VectorFilterExecutor,
        Self::AggregationHashTable,
        Self::AhtIterator,
        Self::AhtOverflowPartitionIterator,
        Self::HashTableEntry,
        Self::JoinHashTable,
        Self::Sorter,
        Self::SorterIterator,
        Self::CsvReader,
        Self::CountAggregate,
        Self::CountStarAggregate,
        Self::IntegerSumAggregate,
        Self::IntegerMinAggregate,
        Self::IntegerMaxAggregate,
        Self::RealSumAggregate,
        Self::RealMinAggregate,
        Self::RealMaxAggregate,
        Self::AvgAggregate,
    ];

    /// The name used in source programs
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Real => "Real",
            Self::Date => "Date",
            Self::Timestamp => "Timestamp",
            Self::StringVal => "StringVal",
            Self::Boolean => "Boolean",
            Self::MemoryPool => "MemoryPool",
            Self::ExecutionContext => "ExecutionContext",
            Self::ThreadStateContainer => "ThreadStateContainer",
            Self::TableVectorIterator => "TableVectorIterator",
            Self::VectorProjectionIterator => "VectorProjectionIterator",
            Self::VectorProjection => "VectorProjection",
            Self::TupleIdList => "TupleIdList",
            Self::FilterManager => "FilterManager",
            Self::VectorFilterExecutor => "VectorFilterExecutor",
            Self::AggregationHashTable => "AggregationHashTable",
            Self::AhtIterator => "AHTIterator",
            Self::AhtOverflowPartitionIterator => "AHTOverflowPartitionIterator",
            Self::HashTableEntry => "HashTableEntry",
            Self::JoinHashTable => "JoinHashTable",
            Self::Sorter => "Sorter",
            Self::SorterIterator => "SorterIterator",
            Self::CsvReader => "CSVReader",
            Self::CountAggregate => "CountAggregate",
            Self::CountStarAggregate => "CountStarAggregate",
            Self::IntegerSumAggregate => "IntegerSumAggregate",
            Self::IntegerMinAggregate => "IntegerMinAggregate",
            Self::IntegerMaxAggregate => "IntegerMaxAggregate",
            Self::RealSumAggregate => "RealSumAggregate",
            Self::RealMinAggregate => "RealMinAggregate",
            Self::RealMaxAggregate => "RealMaxAggregate",
            Self::AvgAggregate => "AvgAggregate",
        }
    }

    /// Storage size of the runtime object, so frames can embed it
    pub fn size(self) -> u32 {
        use crate::sql;
        let size = match self {
            Self::Integer => std::mem::size_of::<sql::Integer>(),
            Self::Real => std::mem::size_of::<sql::Real>(),
            Self::Date => std::mem::size_of::<sql::DateVal>(),
            Self::Timestamp => std::mem::size_of::<sql::TimestampVal>(),
            Self::StringVal => std::mem::size_of::<sql::StringVal>(),
            Self::Boolean => std::mem::size_of::<sql::BoolVal>(),
            Self::MemoryPool => std::mem::size_of::<sql::MemoryPool>(),
            Self::ExecutionContext => std::mem::size_of::<sql::ExecutionContext>(),
            Self::ThreadStateContainer => std::mem::size_of::<sql::ThreadStateContainer>(),
            Self::TableVectorIterator => std::mem::size_of::<sql::TableVectorIterator>(),
            Self::VectorProjectionIterator => {
                std::mem::size_of::<sql::VectorProjectionIterator>()
            }
            Self::VectorProjection => std::mem::size_of::<sql::VectorProjection>(),
            Self::TupleIdList => std::mem::size_of::<sql::TupleIdList>(),
            Self::FilterManager => std::mem::size_of::<sql::FilterManager>(),
            Self::VectorFilterExecutor => std::mem::size_of::<sql::VectorFilterExecutor>(),
            Self::AggregationHashTable => std::mem::size_of::<sql::AggregationHashTable>(),
            Self::AhtIterator => std::mem::size_of::<sql::AhtIterator>(),
            Self::AhtOverflowPartitionIterator => {
                std::mem::size_of::<sql::AhtOverflowPartitionIterator>()
            }
            Self::HashTableEntry => std::mem::size_of::<sql::HashTableEntry>(),
            Self::JoinHashTable => std::mem::size_of::<sql::JoinHashTable>(),
            Self::Sorter => std::mem::size_of::<sql::Sorter>(),
            Self::SorterIterator => std::mem::size_of::<sql::SorterIterator>(),
            Self::CsvReader => std::mem::size_of::<sql::CsvReader>(),
            Self::CountAggregate => std::mem::size_of::<sql::CountAggregate>(),
            Self::CountStarAggregate => std::mem::size_of::<sql::CountStarAggregate>(),
            Self::IntegerSumAggregate => std::mem::size_of::<sql::IntegerSumAggregate>(),
            Self::IntegerMinAggregate => std::mem::size_of::<sql::IntegerMinAggregate>(),
            Self::IntegerMaxAggregate => std::mem::size_of::<sql::IntegerMaxAggregate>(),
            Self::RealSumAggregate => std::mem::size_of::<sql::RealSumAggregate>(),
            Self::RealMinAggregate => std::mem::size_of::<sql::RealMinAggregate>(),
            Self::RealMaxAggregate => std::mem::size_of::<sql::RealMaxAggregate>(),
            Self::AvgAggregate => std::mem::size_of::<sql::AvgAggregate>(),
        };
        size as u32
    }

    /// Alignment of the runtime object
    pub fn align(self) -> u32 {
        use crate::sql;
        let align = match self {
            Self::Integer => std::mem::align_of::<sql::Integer>(),
            Self::Real => std::mem::align_of::<sql::Real>(),
            Self::Date => std::mem::align_of::<sql::DateVal>(),
            Self::Timestamp => std::mem::align_of::<sql::TimestampVal>(),
            Self::StringVal => std::mem::align_of::<sql::StringVal>(),
            Self::Boolean => std::mem::align_of::<sql::BoolVal>(),
            Self::MemoryPool => std::mem::align_of::<sql::MemoryPool>(),
            Self::ExecutionContext => std::mem::align_of::<sql::ExecutionContext>(),
            Self::ThreadStateContainer => std::mem::align_of::<sql::ThreadStateContainer>(),
            Self::TableVectorIterator => std::mem::align_of::<sql::TableVectorIterator>(),
            Self::VectorProjectionIterator => {
                std::mem::align_of::<sql::VectorProjectionIterator>()
            }
            Self::VectorProjection => std::mem::align_of::<sql::VectorProjection>(),
            Self::TupleIdList => std::mem::align_of::<sql::TupleIdList>(),
            Self::FilterManager => std::mem::align_of::<sql::FilterManager>(),
            Self::VectorFilterExecutor => std::mem::align_of::<sql::VectorFilterExecutor>(),
            Self::AggregationHashTable => std::mem::align_of::<sql::AggregationHashTable>(),
            Self::AhtIterator => std::mem::align_of::<sql::AhtIterator>(),
            Self::AhtOverflowPartitionIterator => {
                std::mem::align_of::<sql::AhtOverflowPartitionIterator>()
            }
            Self::HashTableEntry => std::mem::align_of::<sql::HashTableEntry>(),
            Self::JoinHashTable => std::mem::align_of::<sql::JoinHashTable>(),
            Self::Sorter => std::mem::align_of::<sql::Sorter>(),
            Self::SorterIterator => std::mem::align_of::<sql::SorterIterator>(),
            Self::CsvReader => std::mem::align_of::<sql::CsvReader>(),
            Self::CountAggregate => std::mem::align_of::<sql::CountAggregate>(),
            Self::CountStarAggregate => std::mem::align_of::<sql::CountStarAggregate>(),
            Self::IntegerSumAggregate => std::mem::align_of::<sql::IntegerSumAggregate>(),
            Self::IntegerMinAggregate => std::mem::align_of::<sql::IntegerMinAggregate>(),
            Self::IntegerMaxAggregate => std::mem::align_of::<sql::IntegerMaxAggregate>(),
            Self::RealSumAggregate => std::mem::align_of::<sql::RealSumAggregate>(),
            Self::RealMinAggregate => std::mem::align_of::<sql::RealMinAggregate>(),
            Self::RealMaxAggregate => std::mem::align_of::<sql::RealMaxAggregate>(),
            Self::AvgAggregate => std::mem::align_of::<sql::AvgAggregate>(),
        };
        align as u32
    }

    /// True for the nullable SQL value types (as opposed to runtime objects)
    pub fn is_sql_value(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Real | Self::Date | Self::Timestamp | Self::StringVal
                | Self::Boolean
        )
    }

    /// True for the aggregator payload types
    pub fn is_aggregator(self) -> bool {
        matches!(
            self,
            Self::CountAggregate
                | Self::CountStarAggregate
                | Self::IntegerSumAggregate
                | Self::IntegerMinAggregate
                | Self::IntegerMaxAggregate
                | Self::RealSumAggregate
                | Self::RealMinAggregate
                | Self::RealMaxAggregate
                | Self::AvgAggregate
        )
    }
}

/// Internal representation of interned types. Children are TypeIds so the
/// representation is flat and hashable.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum InternedType {
    Invalid,
    Primitive(PrimitiveType),
    /// Source-level string literal type (distinct from StringVal)
    String,
    Pointer(TypeId),
    /// `len == None` is the unknown-length form ("pointer to many")
    Array {
        len: Option<u64>,
        elem: TypeId,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Struct {
        name: Option<Symbol>,
        fields: SmallVec<[(Symbol, TypeId); 4]>,
    },
    Function {
        params: TypeIdVec,
        ret: TypeId,
    },
    Builtin(BuiltinType),
}

/// Pre-interned primitive and common types for O(1) access
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveTypes {
    pub invalid: TypeId,
    pub nil: TypeId,
    pub bool: TypeId,
    pub i8: TypeId,
    pub i16: TypeId,
    pub i32: TypeId,
    pub i64: TypeId,
    pub u8: TypeId,
    pub u16: TypeId,
    pub u32: TypeId,
    pub u64: TypeId,
    pub f32: TypeId,
    pub f64: TypeId,
    pub string: TypeId,
}

/// Per-compilation type arena with automatic interning/deduplication.
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<InternedType>,
    intern_map: HashMap<InternedType, TypeId>,
    pub primitives: PrimitiveTypes,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            types: Vec::new(),
            intern_map: HashMap::new(),
            primitives: PrimitiveTypes {
                invalid: TypeId(0),
                nil: TypeId(0),
                bool: TypeId(0),
                i8: TypeId(0),
                i16: TypeId(0),
                i32: TypeId(0),
                i64: TypeId(0),
                u8: TypeId(0),
                u16: TypeId(0),
                u32: TypeId(0),
                u64: TypeId(0),
                f32: TypeId(0),
                f64: TypeId(0),
                string: TypeId(0),
            },
        };

        // Invalid must be first (index 0) for is_invalid()
        arena.primitives.invalid = arena.intern(InternedType::Invalid);
        debug_assert_eq!(arena.primitives.invalid.0, 0);

        arena.primitives.nil = arena.intern(InternedType::Primitive(PrimitiveType::Nil));
        arena.primitives.bool = arena.intern(InternedType::Primitive(PrimitiveType::Bool));
        arena.primitives.i8 = arena.intern(InternedType::Primitive(PrimitiveType::I8));
        arena.primitives.i16 = arena.intern(InternedType::Primitive(PrimitiveType::I16));
        arena.primitives.i32 = arena.intern(InternedType::Primitive(PrimitiveType::I32));
        arena.primitives.i64 = arena.intern(InternedType::Primitive(PrimitiveType::I64));
        arena.primitives.u8 = arena.intern(InternedType::Primitive(PrimitiveType::U8));
        arena.primitives.u16 = arena.intern(InternedType::Primitive(PrimitiveType::U16));
        arena.primitives.u32 = arena.intern(InternedType::Primitive(PrimitiveType::U32));
        arena.primitives.u64 = arena.intern(InternedType::Primitive(PrimitiveType::U64));
        arena.primitives.f32 = arena.intern(InternedType::Primitive(PrimitiveType::F32));
        arena.primitives.f64 = arena.intern(InternedType::Primitive(PrimitiveType::F64));
        arena.primitives.string = arena.intern(InternedType::String);

        arena
    }

    /// Intern a type, returning the existing TypeId if already interned
    fn intern(&mut self, ty: InternedType) -> TypeId {
        let next_id = TypeId(self.types.len() as u32);
        *self.intern_map.entry(ty.clone()).or_insert_with(|| {
            self.types.push(ty);
            next_id
        })
    }

    /// Get the InternedType for a TypeId
    pub fn get(&self, id: TypeId) -> &InternedType {
        &self.types[id.0 as usize]
    }

    pub fn is_invalid(&self, id: TypeId) -> bool {
        id.0 == 0
    }

    // ========================================================================
    // Primitive accessors
    // ========================================================================

    pub fn invalid(&self) -> TypeId {
        self.primitives.invalid
    }
    pub fn nil(&self) -> TypeId {
        self.primitives.nil
    }
    pub fn bool(&self) -> TypeId {
        self.primitives.bool
    }
    pub fn i8(&self) -> TypeId {
        self.primitives.i8
    }
    pub fn i16(&self) -> TypeId {
        self.primitives.i16
    }
    pub fn i32(&self) -> TypeId {
        self.primitives.i32
    }
    pub fn i64(&self) -> TypeId {
        self.primitives.i64
    }
    pub fn u8(&self) -> TypeId {
        self.primitives.u8
    }
    pub fn u16(&self) -> TypeId {
        self.primitives.u16
    }
    pub fn u32(&self) -> TypeId {
        self.primitives.u32
    }
    pub fn u64(&self) -> TypeId {
        self.primitives.u64
    }
    pub fn f32(&self) -> TypeId {
        self.primitives.f32
    }
    pub fn f64(&self) -> TypeId {
        self.primitives.f64
    }
    pub fn string(&self) -> TypeId {
        self.primitives.string
    }

    // ========================================================================
    // Compound type builders - intern on construction
    // ========================================================================

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        if self.is_invalid(pointee) {
            return self.invalid();
        }
        self.intern(InternedType::Pointer(pointee))
    }

    pub fn array_of(&mut self, len: Option<u64>, elem: TypeId) -> TypeId {
        if self.is_invalid(elem) {
            return self.invalid();
        }
        self.intern(InternedType::Array { len, elem })
    }

    pub fn map_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        if self.is_invalid(key) || self.is_invalid(value) {
            return self.invalid();
        }
        self.intern(InternedType::Map { key, value })
    }

    pub fn function(&mut self, params: impl Into<TypeIdVec>, ret: TypeId) -> TypeId {
        let params = params.into();
        if params.iter().any(|&p| self.is_invalid(p)) || self.is_invalid(ret) {
            return self.invalid();
        }
        self.intern(InternedType::Function { params, ret })
    }

    pub fn struct_of(
        &mut self,
        name: Option<Symbol>,
        fields: impl Into<SmallVec<[(Symbol, TypeId); 4]>>,
    ) -> TypeId {
        let fields = fields.into();
        if fields.iter().any(|&(_, t)| self.is_invalid(t)) {
            return self.invalid();
        }
        self.intern(InternedType::Struct { name, fields })
    }

    pub fn builtin(&mut self, builtin: BuiltinType) -> TypeId {
        self.intern(InternedType::Builtin(builtin))
    }

    // ========================================================================
    // Classification
    // ========================================================================

    pub fn is_bool(&self, id: TypeId) -> bool {
        id == self.primitives.bool
    }

    pub fn is_nil(&self, id: TypeId) -> bool {
        id == self.primitives.nil
    }

    /// The typed nil literal is a pointer to nil, assignable to any pointer
    pub fn is_nil_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id), InternedType::Pointer(p) if self.is_nil(*p))
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            InternedType::Primitive(
                PrimitiveType::I8
                    | PrimitiveType::I16
                    | PrimitiveType::I32
                    | PrimitiveType::I64
                    | PrimitiveType::U8
                    | PrimitiveType::U16
                    | PrimitiveType::U32
                    | PrimitiveType::U64
            )
        )
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            InternedType::Primitive(PrimitiveType::F32 | PrimitiveType::F64)
        )
    }

    pub fn is_arithmetic(&self, id: TypeId) -> bool {
        self.is_integer(id) || self.is_float(id)
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id), InternedType::Pointer(_))
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            InternedType::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_builtin(&self, id: TypeId) -> Option<BuiltinType> {
        match self.get(id) {
            InternedType::Builtin(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_sql_value(&self, id: TypeId) -> bool {
        matches!(self.get(id), InternedType::Builtin(b) if b.is_sql_value())
    }

    pub fn is_sql_boolean(&self, id: TypeId) -> bool {
        matches!(self.get(id), InternedType::Builtin(BuiltinType::Boolean))
    }

    /// Integer width in bytes; zero for non-integers
    pub fn int_width(&self, id: TypeId) -> u32 {
        match self.get(id) {
            InternedType::Primitive(PrimitiveType::I8 | PrimitiveType::U8) => 1,
            InternedType::Primitive(PrimitiveType::I16 | PrimitiveType::U16) => 2,
            InternedType::Primitive(PrimitiveType::I32 | PrimitiveType::U32) => 4,
            InternedType::Primitive(PrimitiveType::I64 | PrimitiveType::U64) => 8,
            _ => 0,
        }
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            InternedType::Primitive(
                PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 | PrimitiveType::I64
            )
        )
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Byte size of a value of this type. Function and unknown-length array
    /// types are unsized and return 0.
    pub fn size_of(&self, id: TypeId) -> u32 {
        match self.get(id) {
            InternedType::Invalid => 0,
            InternedType::Primitive(PrimitiveType::Nil) => 0,
            InternedType::Primitive(PrimitiveType::Bool) => 1,
            InternedType::Primitive(PrimitiveType::I8 | PrimitiveType::U8) => 1,
            InternedType::Primitive(PrimitiveType::I16 | PrimitiveType::U16) => 2,
            InternedType::Primitive(PrimitiveType::I32 | PrimitiveType::U32) => 4,
            InternedType::Primitive(PrimitiveType::I64 | PrimitiveType::U64) => 8,
            InternedType::Primitive(PrimitiveType::F32) => 4,
            InternedType::Primitive(PrimitiveType::F64) => 8,
            InternedType::String => 16, // pointer + length
            InternedType::Pointer(_) => std::mem::size_of::<usize>() as u32,
            InternedType::Array { len, elem } => match len {
                Some(n) => (*n as u32) * self.size_of(*elem),
                None => 0,
            },
            InternedType::Map { .. } => std::mem::size_of::<usize>() as u32,
            InternedType::Struct { fields, .. } => {
                let mut layout = StructLayout::default();
                for &(_, field_ty) in fields {
                    layout.append(self.size_of(field_ty), self.align_of(field_ty));
                }
                layout.finish()
            }
            InternedType::Function { .. } => 0,
            InternedType::Builtin(b) => b.size(),
        }
    }

    pub fn align_of(&self, id: TypeId) -> u32 {
        match self.get(id) {
            InternedType::Invalid => 1,
            InternedType::Primitive(PrimitiveType::Nil) => 1,
            InternedType::String => 8,
            InternedType::Primitive(_) => self.size_of(id).max(1),
            InternedType::Pointer(_) | InternedType::Map { .. } => {
                std::mem::align_of::<usize>() as u32
            }
            InternedType::Array { elem, .. } => self.align_of(*elem),
            InternedType::Struct { fields, .. } => fields
                .iter()
                .map(|&(_, t)| self.align_of(t))
                .max()
                .unwrap_or(1),
            InternedType::Function { .. } => 1,
            InternedType::Builtin(b) => b.align(),
        }
    }

    /// Byte offset of a named struct field, if it exists
    pub fn field_offset(&self, struct_id: TypeId, field: Symbol) -> Option<(TypeId, u32)> {
        let InternedType::Struct { fields, .. } = self.get(struct_id) else {
            return None;
        };
        let mut layout = StructLayout::default();
        for &(name, field_ty) in fields {
            let offset = layout.append(self.size_of(field_ty), self.align_of(field_ty));
            if name == field {
                return Some((field_ty, offset));
            }
        }
        None
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Human-readable type name for diagnostics
    pub fn display(&self, id: TypeId, interner: &Interner) -> String {
        match self.get(id) {
            InternedType::Invalid => "<invalid>".to_string(),
            InternedType::Primitive(p) => p.name().to_string(),
            InternedType::String => "string".to_string(),
            InternedType::Pointer(p) => format!("*{}", self.display(*p, interner)),
            InternedType::Array { len: Some(n), elem } => {
                format!("[{}]{}", n, self.display(*elem, interner))
            }
            InternedType::Array { len: None, elem } => {
                format!("[*]{}", self.display(*elem, interner))
            }
            InternedType::Map { key, value } => format!(
                "map[{}]{}",
                self.display(*key, interner),
                self.display(*value, interner)
            ),
            InternedType::Struct { name: Some(n), .. } => interner.resolve(*n).to_string(),
            InternedType::Struct { name: None, fields } => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|&(name, ty)| {
                        format!("{}: {}", interner.resolve(name), self.display(ty, interner))
                    })
                    .collect();
                format!("struct {{ {} }}", inner.join(", "))
            }
            InternedType::Function { params, ret } => {
                let inner: Vec<String> =
                    params.iter().map(|&p| self.display(p, interner)).collect();
                format!("({}) -> {}", inner.join(", "), self.display(*ret, interner))
            }
            InternedType::Builtin(b) => b.name().to_string(),
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental sequential struct layout with natural alignment
#[derive(Default)]
pub struct StructLayout {
    offset: u32,
    max_align: u32,
}

impl StructLayout {
    /// Append a field, returning its offset
    pub fn append(&mut self, size: u32, align: u32) -> u32 {
        let align = align.max(1);
        self.offset = align_up(self.offset, align);
        let offset = self.offset;
        self.offset += size;
        self.max_align = self.max_align.max(align);
        offset
    }

    /// Total size, padded to the struct's alignment
    pub fn finish(&self) -> u32 {
        align_up(self.offset, self.max_align.max(1))
    }
}

pub fn align_up(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn canonicalization_is_pointer_identity() {
        let mut arena = TypeArena::new();
        let p1 = arena.pointer_to(arena.i32());
        let p2 = arena.pointer_to(arena.i32());
        assert_eq!(p1, p2);

        let pp1 = arena.pointer_to(p1);
        let pp2 = arena.pointer_to(p2);
        assert_eq!(pp1, pp2);

        let q = arena.pointer_to(arena.i64());
        assert_ne!(p1, q);
    }

    #[test]
    fn function_types_canonicalize() {
        let mut arena = TypeArena::new();
        let params1: TypeIdVec = smallvec![arena.i32(), arena.i32()];
        let params2: TypeIdVec = smallvec![arena.i32(), arena.i32()];
        let f1 = arena.function(params1, arena.bool());
        let f2 = arena.function(params2, arena.bool());
        assert_eq!(f1, f2);
    }

    #[test]
    fn builtin_types_canonicalize() {
        let mut arena = TypeArena::new();
        let a = arena.builtin(BuiltinType::AggregationHashTable);
        let b = arena.builtin(BuiltinType::AggregationHashTable);
        assert_eq!(a, b);
        assert_ne!(a, arena.builtin(BuiltinType::JoinHashTable));
    }

    #[test]
    fn struct_layout_aligns_fields() {
        let mut arena = TypeArena::new();
        let (a, b, c) = (Symbol(100), Symbol(101), Symbol(102));
        // struct { a: int8, b: int64, c: int8 }
        let fields: SmallVec<[(Symbol, TypeId); 4]> =
            smallvec![(a, arena.i8()), (b, arena.i64()), (c, arena.i8())];
        let s = arena.struct_of(None, fields);
        assert_eq!(arena.align_of(s), 8);
        assert_eq!(arena.size_of(s), 24);
        assert_eq!(arena.field_offset(s, a).unwrap().1, 0);
        assert_eq!(arena.field_offset(s, b).unwrap().1, 8);
        assert_eq!(arena.field_offset(s, c).unwrap().1, 16);
    }

    #[test]
    fn array_size_scales_by_length() {
        let mut arena = TypeArena::new();
        let arr = arena.array_of(Some(10), arena.i32());
        assert_eq!(arena.size_of(arr), 40);
        let unknown = arena.array_of(None, arena.i32());
        assert_eq!(arena.size_of(unknown), 0);
    }

    #[test]
    fn nil_pointer_detection() {
        let mut arena = TypeArena::new();
        let nil_ptr = arena.pointer_to(arena.nil());
        assert!(arena.is_nil_pointer(nil_ptr));
        let int_ptr = arena.pointer_to(arena.i32());
        assert!(!arena.is_nil_pointer(int_ptr));
    }
}
