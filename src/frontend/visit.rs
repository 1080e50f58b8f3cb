// src/frontend/visit.rs
//! Depth-first AST traversal.
//!
//! Implementors override the hooks they care about and call the `walk_*`
//! functions to recurse. Order is fixed: declarations before their contents,
//! expression children left to right, statements in program order.

use crate::frontend::ast::*;

pub trait Visitor {
    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_file<V: Visitor + ?Sized>(visitor: &mut V, file: &File) {
    for decl in &file.decls {
        visitor.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(visitor: &mut V, decl: &Decl) {
    match decl {
        Decl::Function(f) => walk_block(visitor, &f.func.body),
        Decl::Struct(_) => {}
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Assign(a) => {
            visitor.visit_expr(&a.dest);
            visitor.visit_expr(&a.src);
        }
        Stmt::Block(b) => walk_block(visitor, b),
        Stmt::Decl(d) => {
            if let Some(init) = &d.init {
                visitor.visit_expr(init);
            }
        }
        Stmt::Expr(e) => visitor.visit_expr(e),
        Stmt::For(f) => {
            if let Some(init) = &f.init {
                visitor.visit_stmt(init);
            }
            if let Some(cond) = &f.cond {
                visitor.visit_expr(cond);
            }
            if let Some(next) = &f.next {
                visitor.visit_stmt(next);
            }
            walk_block(visitor, &f.body);
        }
        Stmt::ForIn(f) => {
            visitor.visit_expr(&f.iterable);
            walk_block(visitor, &f.body);
        }
        Stmt::If(i) => {
            visitor.visit_expr(&i.cond);
            walk_block(visitor, &i.then_block);
            if let Some(else_stmt) = &i.else_stmt {
                visitor.visit_stmt(else_stmt);
            }
        }
        Stmt::Return(r) => {
            if let Some(value) = &r.value {
                visitor.visit_expr(value);
            }
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::Bad => {}
        ExprKind::Unary(u) => visitor.visit_expr(&u.operand),
        ExprKind::Binary(b) => {
            visitor.visit_expr(&b.left);
            visitor.visit_expr(&b.right);
        }
        ExprKind::Comparison(c) => {
            visitor.visit_expr(&c.left);
            visitor.visit_expr(&c.right);
        }
        ExprKind::Call(c) => {
            visitor.visit_expr(&c.callee);
            for arg in &c.args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Index(i) => {
            visitor.visit_expr(&i.object);
            visitor.visit_expr(&i.index);
        }
        ExprKind::Member(m) => visitor.visit_expr(&m.object),
        ExprKind::FunctionLit(f) => walk_block(visitor, &f.body),
        ExprKind::ImplicitCast(c) => visitor.visit_expr(&c.operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;

    struct ExprCounter {
        count: usize,
    }

    impl Visitor for ExprCounter {
        fn visit_expr(&mut self, expr: &Expr) {
            self.count += 1;
            walk_expr(self, expr);
        }
    }

    #[test]
    fn visits_every_expression_once() {
        let mut parser = Parser::new("fun f() -> int32 { return 1 + 2 * 3 }");
        let file = parser.parse_file();
        let mut counter = ExprCounter { count: 0 };
        walk_file(&mut counter, &file);
        // 1, 2, 3, (2*3), (1+...)
        assert_eq!(counter.count, 5);
    }
}
