// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E2001))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("undeclared identifier '{name}'")]
    #[diagnostic(code(E2002))]
    UndeclaredIdentifier {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("'{name}' is already declared in this scope")]
    #[diagnostic(code(E2003))]
    Redeclaration {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("unknown type '{name}'")]
    #[diagnostic(code(E2004))]
    UnknownType {
        name: String,
        #[label("not a known type")]
        span: SourceSpan,
    },

    #[error("operator '{op}' cannot be applied to {ty}")]
    #[diagnostic(code(E2005))]
    InvalidOperandType {
        op: String,
        ty: String,
        #[label("invalid operand")]
        span: SourceSpan,
    },

    #[error("mismatched operand types {left} and {right}")]
    #[diagnostic(code(E2006))]
    MismatchedOperands {
        left: String,
        right: String,
        #[label("operands must share a common type")]
        span: SourceSpan,
    },

    #[error("cannot call non-function type '{ty}'")]
    #[diagnostic(code(E2007))]
    NotCallable {
        ty: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E2008))]
    WrongArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("condition must be a bool, found {found}")]
    #[diagnostic(code(E2009))]
    ConditionNotBool {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("return type mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(E2010))]
    ReturnTypeMismatch {
        expected: String,
        found: String,
        #[label("does not match the function signature")]
        span: SourceSpan,
    },

    #[error("missing return value in function returning {expected}")]
    #[diagnostic(code(E2011))]
    MissingReturnValue {
        expected: String,
        #[label("return needs a value")]
        span: SourceSpan,
    },

    #[error("cannot assign {src} to {dest}")]
    #[diagnostic(code(E2012))]
    AssignmentMismatch {
        dest: String,
        src: String,
        #[label("incompatible assignment")]
        span: SourceSpan,
    },

    #[error("expression is not assignable")]
    #[diagnostic(code(E2013))]
    NotAssignable {
        #[label("cannot assign to this expression")]
        span: SourceSpan,
    },

    #[error("type '{ty}' has no field '{field}'")]
    #[diagnostic(code(E2014))]
    FieldNotFound {
        ty: String,
        field: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("cannot access member of non-struct type '{ty}'")]
    #[diagnostic(code(E2015))]
    NotAStruct {
        ty: String,
        #[label("expected a struct or pointer to struct")]
        span: SourceSpan,
    },

    #[error("cannot index type '{ty}'")]
    #[diagnostic(code(E2016))]
    NotIndexable {
        ty: String,
        #[label("expected an array or map")]
        span: SourceSpan,
    },

    #[error("array index must be an integer, found {found}")]
    #[diagnostic(code(E2017))]
    NonIntegerIndex {
        found: String,
        #[label("invalid index type")]
        span: SourceSpan,
    },

    #[error("array length must be a non-negative integer constant")]
    #[diagnostic(code(E2018))]
    InvalidArrayLength {
        #[label("invalid length")]
        span: SourceSpan,
    },

    #[error("pointers to {left} and {right} cannot be compared")]
    #[diagnostic(code(E2019), help("pointer comparison requires matching pointee types or nil"))]
    IncomparablePointers {
        left: String,
        right: String,
        #[label("incompatible pointer comparison")]
        span: SourceSpan,
    },

    #[error("cannot dereference non-pointer type '{ty}'")]
    #[diagnostic(code(E2020))]
    NotAPointer {
        ty: String,
        #[label("expected a pointer")]
        span: SourceSpan,
    },

    #[error("unknown builtin '{name}'")]
    #[diagnostic(code(E2021))]
    UnknownBuiltin {
        name: String,
        #[label("no builtin with this name")]
        span: SourceSpan,
    },

    #[error("builtin '{builtin}' expects {expected} for argument {index}, found {found}")]
    #[diagnostic(code(E2022))]
    BuiltinArgMismatch {
        builtin: String,
        index: usize,
        expected: String,
        found: String,
        #[label("invalid argument")]
        span: SourceSpan,
    },

    #[error("builtin '{builtin}' expects {expected} arguments, found {found}")]
    #[diagnostic(code(E2023))]
    BuiltinArity {
        builtin: String,
        expected: String,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("no implicit conversion from {from} to {to}")]
    #[diagnostic(code(E2024))]
    InvalidCast {
        from: String,
        to: String,
        #[label("invalid conversion")]
        span: SourceSpan,
    },

    #[error("'{name}' is not iterable")]
    #[diagnostic(code(E2025), help(
        "row loops iterate over *TableVectorIterator or *JoinHashTable entries"
    ))]
    NotIterable {
        name: String,
        #[label("cannot iterate this value")]
        span: SourceSpan,
    },
}
