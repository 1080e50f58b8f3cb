// src/frontend/parser.rs

use crate::errors::ParserError;
use crate::frontend::{Interner, Lexer, Span, Token, TokenType, ast::*};

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    next: Token,
    previous: Token,
    interner: Interner,
    next_node_id: u32,
    errors: Vec<ParserError>,
}

/// Marker for an unrecoverable parse within the current declaration; the
/// actual diagnostics accumulate on the parser.
#[derive(Debug)]
struct ParseFailure;

type ParseResult<T> = Result<T, ParseFailure>;

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let next = lexer.next_token();
        Self {
            lexer,
            current,
            next,
            previous: Token::new(TokenType::Eof, "", Span::default()),
            interner: Interner::new(),
            next_node_id: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a whole file. Declarations that fail to parse are skipped with
    /// resynchronization so later errors are still reported.
    pub fn parse_file(&mut self) -> File {
        let start = self.current.span;
        let mut decls = Vec::new();

        while !self.check(TokenType::Eof) {
            match self.declaration() {
                Ok(decl) => decls.push(decl),
                Err(ParseFailure) => self.synchronize(),
            }
        }

        let span = start.merge(self.previous.span);
        File {
            decls,
            span,
            node_count: self.next_node_id,
        }
    }

    /// Tear the parser down into the interner and the accumulated errors.
    pub fn into_parts(self) -> (Interner, Vec<ParserError>) {
        let mut errors = self.errors;
        let mut lexer = self.lexer;
        // Lexical errors sort before parse errors in the report
        let mut all: Vec<ParserError> = Vec::new();
        for lex_err in lexer.take_errors() {
            all.push(ParserError::Lexical(lex_err));
        }
        all.append(&mut errors);
        (self.interner, all)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.lexer.has_errors()
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declaration(&mut self) -> ParseResult<Decl> {
        match self.current.ty {
            TokenType::KwFun => self.function_decl(),
            TokenType::KwStruct => self.struct_decl(),
            _ => {
                self.error(ParserError::UnexpectedToken {
                    token: self.current.ty.as_str().to_string(),
                    span: self.current.span.into(),
                });
                Err(ParseFailure)
            }
        }
    }

    fn function_decl(&mut self) -> ParseResult<Decl> {
        let start = self.current.span;
        self.advance(); // 'fun'

        let name = self.expect_identifier("function name")?;
        let sig = self.function_signature()?;
        let body = self.block()?;
        let span = start.merge(body.span);

        Ok(Decl::Function(FunctionDecl {
            name,
            func: FunctionLit { sig, body },
            span,
        }))
    }

    fn function_signature(&mut self) -> ParseResult<FunctionTypeRepr> {
        let start = self.current.span;
        self.consume(TokenType::LParen, "(")?;

        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                let param_start = self.current.span;
                let name = self.expect_identifier("parameter name")?;
                self.consume(TokenType::Colon, ":")?;
                let ty = self.type_repr()?;
                let span = param_start.merge(ty.span());
                params.push(FieldDecl { name, ty, span });
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen, ")")?;

        // A missing arrow means the function returns nil
        let ret = if self.match_token(TokenType::Arrow) {
            self.type_repr()?
        } else {
            let nil = self.interner.intern("nil");
            TypeRepr::Name(nil, self.previous.span)
        };

        let span = start.merge(self.previous.span);
        Ok(FunctionTypeRepr { params, ret, span })
    }

    fn struct_decl(&mut self) -> ParseResult<Decl> {
        let start = self.current.span;
        self.advance(); // 'struct'

        let name = self.expect_identifier("struct name")?;
        let ty = self.struct_type_repr()?;
        let span = start.merge(self.previous.span);

        Ok(Decl::Struct(StructDecl { name, ty, span }))
    }

    fn struct_type_repr(&mut self) -> ParseResult<StructTypeRepr> {
        let start = self.current.span;
        self.consume(TokenType::LBrace, "{")?;

        let mut fields = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            let field_start = self.current.span;
            let name = self.expect_identifier("field name")?;
            self.consume(TokenType::Colon, ":")?;
            let ty = self.type_repr()?;
            let span = field_start.merge(ty.span());
            fields.push(FieldDecl { name, ty, span });
            self.match_token(TokenType::Semicolon);
        }

        self.consume(TokenType::RBrace, "}")?;
        let span = start.merge(self.previous.span);
        Ok(StructTypeRepr { fields, span })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.current.ty {
            TokenType::KwVar => self.var_decl_stmt(),
            TokenType::KwIf => self.if_stmt(),
            TokenType::KwFor => self.for_stmt(),
            TokenType::KwReturn => self.return_stmt(),
            TokenType::LBrace => Ok(Stmt::Block(self.block()?)),
            _ => self.simple_stmt(),
        }
    }

    fn var_decl_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current.span;
        self.advance(); // 'var'

        let name = self.expect_identifier("variable name")?;
        let ty = if self.match_token(TokenType::Colon) {
            Some(self.type_repr()?)
        } else {
            None
        };
        let init = if self.match_token(TokenType::Eq) {
            Some(self.expression(0)?)
        } else {
            None
        };

        if ty.is_none() && init.is_none() {
            self.error(ParserError::MissingTypeOrInitializer {
                span: start.merge(self.previous.span).into(),
            });
            return Err(ParseFailure);
        }

        let span = start.merge(self.previous.span);
        Ok(Stmt::Decl(Box::new(VariableDecl {
            name,
            ty,
            init,
            span,
        })))
    }

    fn if_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current.span;
        self.advance(); // 'if'

        self.consume(TokenType::LParen, "(")?;
        let cond = self.expression(0)?;
        self.consume(TokenType::RParen, ")")?;
        let then_block = self.block()?;

        let else_stmt = if self.match_token(TokenType::KwElse) {
            if self.check(TokenType::KwIf) {
                Some(Box::new(self.if_stmt()?))
            } else {
                Some(Box::new(Stmt::Block(self.block()?)))
            }
        } else {
            None
        };

        let span = start.merge(self.previous.span);
        Ok(Stmt::If(Box::new(IfStmt {
            cond,
            then_block,
            else_stmt,
            span,
        })))
    }

    /// `for (init; cond; next)`, `for (cond)`, `for (row in iter)`, or `for ()`
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current.span;
        self.advance(); // 'for'
        self.consume(TokenType::LParen, "(")?;

        // Row-iteration form
        if self.check(TokenType::Identifier) && self.next.ty == TokenType::KwIn {
            let target_span = self.current.span;
            let target = self.expect_identifier("loop variable")?;
            self.advance(); // 'in'
            let iterable = self.expression(0)?;
            self.consume(TokenType::RParen, ")")?;
            let body = self.block()?;
            let span = start.merge(body.span);
            return Ok(Stmt::ForIn(Box::new(ForInStmt {
                target,
                target_span,
                iterable,
                body,
                span,
            })));
        }

        let mut init = None;
        let mut cond = None;
        let mut next = None;

        if self.match_token(TokenType::Semicolon) {
            // No init clause
            if !self.check(TokenType::Semicolon) {
                cond = Some(self.expression(0)?);
            }
            self.consume(TokenType::Semicolon, ";")?;
            if !self.check(TokenType::RParen) {
                next = Some(self.simple_or_var_stmt()?);
            }
        } else if !self.check(TokenType::RParen) {
            let first = self.simple_or_var_stmt()?;
            if self.check(TokenType::RParen) {
                // `for (cond)`: the single clause must be a bare condition
                match first {
                    Stmt::Expr(e) => cond = Some(e),
                    other => {
                        self.error(ParserError::ExpectedExpression {
                            token: "statement".to_string(),
                            span: other.span().into(),
                        });
                        return Err(ParseFailure);
                    }
                }
            } else {
                init = Some(first);
                self.consume(TokenType::Semicolon, ";")?;
                if !self.check(TokenType::Semicolon) {
                    cond = Some(self.expression(0)?);
                }
                self.consume(TokenType::Semicolon, ";")?;
                if !self.check(TokenType::RParen) {
                    next = Some(self.simple_or_var_stmt()?);
                }
            }
        }

        self.consume(TokenType::RParen, ")")?;
        let body = self.block()?;
        let span = start.merge(body.span);
        Ok(Stmt::For(Box::new(ForStmt {
            init,
            cond,
            next,
            body,
            span,
        })))
    }

    /// A var declaration, assignment, or expression; used in loop headers
    fn simple_or_var_stmt(&mut self) -> ParseResult<Stmt> {
        if self.check(TokenType::KwVar) {
            self.var_decl_stmt()
        } else {
            self.simple_stmt()
        }
    }

    fn return_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.current.span;
        self.advance(); // 'return'

        let value = if self.check(TokenType::Semicolon)
            || self.check(TokenType::RBrace)
            || self.check(TokenType::Eof)
        {
            None
        } else {
            Some(self.expression(0)?)
        };

        let span = start.merge(self.previous.span);
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    fn simple_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression(0)?;
        if self.match_token(TokenType::Eq) {
            let src = self.expression(0)?;
            let span = expr.span.merge(src.span);
            return Ok(Stmt::Assign(Box::new(AssignStmt {
                dest: expr,
                src,
                span,
            })));
        }
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> ParseResult<Block> {
        let start = self.current.span;
        self.consume(TokenType::LBrace, "{")?;

        let mut stmts = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            stmts.push(self.statement()?);
            // Statement separators are optional before '}'
            self.match_token(TokenType::Semicolon);
        }

        let rbrace = self.current.span;
        self.consume(TokenType::RBrace, "}")?;
        let span = start.merge(rbrace);
        Ok(Block {
            stmts,
            span,
            rbrace,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;

        loop {
            let prec = self.current.ty.precedence();
            if prec == 0 || prec <= min_prec {
                break;
            }
            let op_token = self.current.ty;
            self.advance();
            let right = self.expression(prec)?;
            let span = left.span.merge(right.span);

            let kind = match op_token {
                TokenType::EqEq => self.comparison(CompareOp::Eq, left, right),
                TokenType::BangEq => self.comparison(CompareOp::Ne, left, right),
                TokenType::Lt => self.comparison(CompareOp::Lt, left, right),
                TokenType::LtEq => self.comparison(CompareOp::Le, left, right),
                TokenType::Gt => self.comparison(CompareOp::Gt, left, right),
                TokenType::GtEq => self.comparison(CompareOp::Ge, left, right),
                other => {
                    let op = match other {
                        TokenType::Plus => BinaryOp::Add,
                        TokenType::Minus => BinaryOp::Sub,
                        TokenType::Star => BinaryOp::Mul,
                        TokenType::Slash => BinaryOp::Div,
                        TokenType::Percent => BinaryOp::Rem,
                        TokenType::Ampersand => BinaryOp::BitAnd,
                        TokenType::Pipe => BinaryOp::BitOr,
                        TokenType::Caret => BinaryOp::BitXor,
                        TokenType::LessLess => BinaryOp::Shl,
                        TokenType::GreaterGreater => BinaryOp::Shr,
                        TokenType::KwAnd => BinaryOp::And,
                        TokenType::KwOr => BinaryOp::Or,
                        _ => unreachable!("token with nonzero precedence"),
                    };
                    ExprKind::Binary(Box::new(BinaryExpr { op, left, right }))
                }
            };
            left = self.mk_expr(kind, span);
        }

        Ok(left)
    }

    fn comparison(&mut self, op: CompareOp, left: Expr, right: Expr) -> ExprKind {
        ExprKind::Comparison(Box::new(ComparisonExpr { op, left, right }))
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current.ty {
            TokenType::Bang => Some(UnaryOp::Not),
            TokenType::Minus => Some(UnaryOp::Neg),
            TokenType::Star => Some(UnaryOp::Deref),
            TokenType::Ampersand => Some(UnaryOp::AddrOf),
            TokenType::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };

        if let Some(op) = op {
            let start = self.current.span;
            self.advance();
            let operand = self.unary()?;
            let span = start.merge(operand.span);
            return Ok(self.mk_expr(ExprKind::Unary(Box::new(UnaryExpr { op, operand })), span));
        }

        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            match self.current.ty {
                TokenType::LParen => {
                    self.advance();
                    let args = self.call_args()?;
                    let span = expr.span.merge(self.previous.span);
                    expr = self.mk_expr(
                        ExprKind::Call(Box::new(CallExpr {
                            callee: expr,
                            args,
                            kind: CallKind::Regular,
                        })),
                        span,
                    );
                }
                TokenType::LBracket => {
                    self.advance();
                    let index = self.expression(0)?;
                    self.consume(TokenType::RBracket, "]")?;
                    let span = expr.span.merge(self.previous.span);
                    expr = self.mk_expr(
                        ExprKind::Index(Box::new(IndexExpr {
                            object: expr,
                            index,
                        })),
                        span,
                    );
                }
                TokenType::Dot => {
                    self.advance();
                    let member_span = self.current.span;
                    let member = self.expect_identifier("member name")?;
                    let span = expr.span.merge(member_span);
                    expr = self.mk_expr(
                        ExprKind::Member(Box::new(MemberExpr {
                            object: expr,
                            member,
                            member_span,
                        })),
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn call_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                args.push(self.expression(0)?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen, ")")?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let span = self.current.span;
        match self.current.ty {
            TokenType::IntLiteral => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                match lexeme.parse::<i32>() {
                    Ok(v) => Ok(self.mk_expr(ExprKind::Literal(Literal::Int(v)), span)),
                    Err(_) => {
                        self.error(ParserError::InvalidNumber { span: span.into() });
                        Ok(self.mk_expr(ExprKind::Bad, span))
                    }
                }
            }
            TokenType::FloatLiteral => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                match lexeme.parse::<f32>() {
                    Ok(v) => Ok(self.mk_expr(ExprKind::Literal(Literal::Float(v)), span)),
                    Err(_) => {
                        self.error(ParserError::InvalidNumber { span: span.into() });
                        Ok(self.mk_expr(ExprKind::Bad, span))
                    }
                }
            }
            TokenType::StringLiteral => {
                let sym = self.interner.intern(&self.current.lexeme.clone());
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Str(sym)), span))
            }
            TokenType::KwTrue => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Bool(true)), span))
            }
            TokenType::KwFalse => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Bool(false)), span))
            }
            TokenType::KwNil => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Nil), span))
            }
            TokenType::Identifier => {
                let sym = self.interner.intern(&self.current.lexeme.clone());
                self.advance();
                Ok(self.mk_expr(ExprKind::Identifier(sym), span))
            }
            TokenType::At => {
                self.advance();
                let name_span = self.current.span;
                let name = self.expect_identifier("builtin name")?;
                let callee = self.mk_expr(ExprKind::Identifier(name), name_span);
                self.consume(TokenType::LParen, "(")?;
                let args = self.call_args()?;
                let full = span.merge(self.previous.span);
                Ok(self.mk_expr(
                    ExprKind::Call(Box::new(CallExpr {
                        callee,
                        args,
                        kind: CallKind::Builtin,
                    })),
                    full,
                ))
            }
            TokenType::LParen => {
                self.advance();
                let inner = self.expression(0)?;
                self.consume(TokenType::RParen, ")")?;
                Ok(inner)
            }
            _ => {
                self.error(ParserError::ExpectedExpression {
                    token: self.current.ty.as_str().to_string(),
                    span: self.current.span.into(),
                });
                Err(ParseFailure)
            }
        }
    }

    // ========================================================================
    // Type representations
    // ========================================================================

    fn type_repr(&mut self) -> ParseResult<TypeRepr> {
        let start = self.current.span;
        match self.current.ty {
            TokenType::Star => {
                self.advance();
                let base = self.type_repr()?;
                let span = start.merge(base.span());
                Ok(TypeRepr::Pointer(Box::new(PointerTypeRepr { base, span })))
            }
            TokenType::LBracket => {
                self.advance();
                let len = if self.match_token(TokenType::Star) {
                    None
                } else if self.check(TokenType::RBracket) {
                    None
                } else {
                    Some(self.expression(0)?)
                };
                self.consume(TokenType::RBracket, "]")?;
                let elem = self.type_repr()?;
                let span = start.merge(elem.span());
                Ok(TypeRepr::Array(Box::new(ArrayTypeRepr { len, elem, span })))
            }
            TokenType::KwMap => {
                self.advance();
                self.consume(TokenType::LBracket, "[")?;
                let key = self.type_repr()?;
                self.consume(TokenType::RBracket, "]")?;
                let value = self.type_repr()?;
                let span = start.merge(value.span());
                Ok(TypeRepr::Map(Box::new(MapTypeRepr { key, value, span })))
            }
            TokenType::LParen => Ok(TypeRepr::Function(Box::new(self.function_signature()?))),
            TokenType::KwStruct => {
                self.advance();
                Ok(TypeRepr::Struct(self.struct_type_repr()?))
            }
            TokenType::KwNil => {
                // `nil` doubles as the unit return type
                let sym = self.interner.intern("nil");
                self.advance();
                Ok(TypeRepr::Name(sym, start))
            }
            TokenType::Identifier => {
                let sym = self.interner.intern(&self.current.lexeme.clone());
                self.advance();
                Ok(TypeRepr::Name(sym, start))
            }
            _ => {
                self.error(ParserError::ExpectedType {
                    span: self.current.span.into(),
                });
                Err(ParseFailure)
            }
        }
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        Expr { id, kind, span }
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(
            &mut self.current,
            std::mem::replace(&mut self.next, self.lexer.next_token()),
        );
    }

    fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, ty: TokenType, expected: &str) -> ParseResult<()> {
        if self.check(ty) {
            self.advance();
            return Ok(());
        }
        self.error(ParserError::ExpectedToken {
            expected: expected.to_string(),
            found: self.current.ty.as_str().to_string(),
            span: self.current.span.into(),
        });
        Err(ParseFailure)
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<Symbol> {
        if self.check(TokenType::Identifier) {
            let sym = self.interner.intern(&self.current.lexeme.clone());
            self.advance();
            return Ok(sym);
        }
        self.error(ParserError::ExpectedIdentifier {
            what: what.to_string(),
            span: self.current.span.into(),
        });
        Err(ParseFailure)
    }

    fn error(&mut self, error: ParserError) {
        self.errors.push(error);
    }

    /// Skip tokens until the start of the next top-level declaration
    fn synchronize(&mut self) {
        while !self.check(TokenType::Eof) {
            if self.check(TokenType::KwFun) || self.check(TokenType::KwStruct) {
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (File, Interner, Vec<ParserError>) {
        let mut parser = Parser::new(source);
        let file = parser.parse_file();
        let (interner, errors) = parser.into_parts();
        (file, interner, errors)
    }

    #[test]
    fn parse_simple_function() {
        let (file, interner, errors) = parse(
            "fun main() -> int32 { var x: int32 = 2; var y: int32 = 3; return x * y + 1 }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(file.decls.len(), 1);
        let Decl::Function(f) = &file.decls[0] else {
            panic!("expected function");
        };
        assert_eq!(interner.resolve(f.name), "main");
        assert_eq!(f.func.body.stmts.len(), 3);
    }

    #[test]
    fn parse_builtin_call() {
        let (file, _, errors) = parse("fun f() -> uint32 { return @sizeOf(int64) }");
        assert!(errors.is_empty(), "{:?}", errors);
        let Decl::Function(f) = &file.decls[0] else {
            panic!()
        };
        let Stmt::Return(ret) = &f.func.body.stmts[0] else {
            panic!()
        };
        let ExprKind::Call(call) = &ret.value.as_ref().unwrap().kind else {
            panic!()
        };
        assert_eq!(call.kind, CallKind::Builtin);
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn parse_for_loop_trio() {
        let (file, _, errors) = parse(
            "fun f() -> int32 { var s = 0; for (var i = 1; i <= 10; i = i + 1) { s = s + i }; return s }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let Decl::Function(f) = &file.decls[0] else {
            panic!()
        };
        let Stmt::For(for_stmt) = &f.func.body.stmts[1] else {
            panic!("expected for");
        };
        assert!(for_stmt.init.is_some());
        assert!(for_stmt.cond.is_some());
        assert!(for_stmt.next.is_some());
    }

    #[test]
    fn parse_for_in() {
        let (file, _, errors) = parse("fun f(tvi: *TableVectorIterator) { for (vpi in tvi) { } }");
        assert!(errors.is_empty(), "{:?}", errors);
        let Decl::Function(f) = &file.decls[0] else {
            panic!()
        };
        assert!(matches!(f.func.body.stmts[0], Stmt::ForIn(_)));
    }

    #[test]
    fn parse_struct_decl_and_pointer_types() {
        let (file, _, errors) = parse("struct Row { a: int32; b: *int64 }");
        assert!(errors.is_empty(), "{:?}", errors);
        let Decl::Struct(s) = &file.decls[0] else {
            panic!()
        };
        assert_eq!(s.ty.fields.len(), 2);
        assert!(matches!(s.ty.fields[1].ty, TypeRepr::Pointer(_)));
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let (file, _, errors) = parse("fun f() -> int32 { return 2 * 3 + 1 }");
        assert!(errors.is_empty());
        let Decl::Function(f) = &file.decls[0] else {
            panic!()
        };
        let Stmt::Return(ret) = &f.func.body.stmts[0] else {
            panic!()
        };
        let ExprKind::Binary(add) = &ret.value.as_ref().unwrap().kind else {
            panic!("expected top-level add");
        };
        assert_eq!(add.op, BinaryOp::Add);
        let ExprKind::Binary(mul) = &add.left.kind else {
            panic!("expected mul on the left");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
    }

    #[test]
    fn error_recovery_reports_and_continues() {
        let (file, _, errors) = parse("fun f( { } fun g() -> int32 { return 1 }");
        assert!(!errors.is_empty());
        // g still parses after resync
        assert_eq!(file.decls.len(), 1);
    }

    #[test]
    fn node_ids_are_unique() {
        let (file, _, _) = parse("fun f() -> int32 { return 1 + 2 }");
        let mut seen = std::collections::HashSet::new();
        let Decl::Function(f) = &file.decls[0] else {
            panic!()
        };
        let Stmt::Return(ret) = &f.func.body.stmts[0] else {
            panic!()
        };
        let e = ret.value.as_ref().unwrap();
        let ExprKind::Binary(b) = &e.kind else { panic!() };
        for id in [e.id, b.left.id, b.right.id] {
            assert!(seen.insert(id));
        }
        assert!(file.node_count >= 3);
    }
}
