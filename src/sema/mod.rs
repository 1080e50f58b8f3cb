// src/sema/mod.rs
//! Semantic analysis: name resolution, type checking, implicit cast
//! insertion, and builtin call validation.

pub mod analyzer;
pub mod builtins;
pub mod scope;
pub mod types;

pub use analyzer::{Analyzer, AnalyzedFile, Resolution};
pub use scope::{Scope, ScopeKind, ScopeStack, Variable};
pub use types::{BuiltinType, InternedType, PrimitiveType, TypeArena, TypeId};
