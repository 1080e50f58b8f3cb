// src/sema/scope.rs

use crate::frontend::{Span, Symbol};
use crate::sema::types::TypeId;
use rustc_hash::FxHashMap;

/// What kind of construct introduced a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    Function,
    Block,
    Loop,
}

#[derive(Debug, Clone, Copy)]
pub struct Variable {
    pub ty: TypeId,
    pub decl_span: Span,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    variables: FxHashMap<Symbol, Variable>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            variables: FxHashMap::default(),
        }
    }
}

/// Lexical stack of scopes. Declaration is local-only; lookup walks outward.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::File)],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the file scope");
        self.scopes.pop();
    }

    /// Declare a variable in the innermost scope. Returns the previous
    /// declaration if the name is already taken in this scope.
    pub fn declare(&mut self, name: Symbol, var: Variable) -> Option<Variable> {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        scope.variables.insert(name, var)
    }

    /// Look up a name in the innermost scope only
    pub fn lookup_local(&self, name: Symbol) -> Option<&Variable> {
        self.scopes
            .last()
            .expect("scope stack is never empty")
            .variables
            .get(&name)
    }

    /// Look up a name walking outward through enclosing scopes
    pub fn lookup(&self, name: Symbol) -> Option<&Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.get(&name))
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(ty: TypeId) -> Variable {
        Variable {
            ty,
            decl_span: Span::default(),
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scopes = ScopeStack::new();
        let arena = crate::sema::types::TypeArena::new();
        let name = Symbol(1);

        scopes.declare(name, var(arena.i32()));
        scopes.push(ScopeKind::Block);
        scopes.declare(name, var(arena.i64()));

        assert_eq!(scopes.lookup(name).unwrap().ty, arena.i64());
        scopes.pop();
        assert_eq!(scopes.lookup(name).unwrap().ty, arena.i32());
    }

    #[test]
    fn redeclaration_in_same_scope_is_detected() {
        let mut scopes = ScopeStack::new();
        let arena = crate::sema::types::TypeArena::new();
        let name = Symbol(1);

        assert!(scopes.declare(name, var(arena.i32())).is_none());
        assert!(scopes.declare(name, var(arena.i32())).is_some());
    }

    #[test]
    fn lookup_local_ignores_outer_scopes() {
        let mut scopes = ScopeStack::new();
        let arena = crate::sema::types::TypeArena::new();
        let name = Symbol(1);

        scopes.declare(name, var(arena.i32()));
        scopes.push(ScopeKind::Function);
        assert!(scopes.lookup_local(name).is_none());
        assert!(scopes.lookup(name).is_some());
    }
}
