//! Parser and inline semantic checker for the compiled language.
//!
//! This module provides the [`Parser`] struct, which transforms a token
//! stream into an [`ast::Program`] and type-checks every node as it is
//! built. There is no separate AST-walking pass here: each production
//! validates itself against the live [`SymbolTable`]/[`FunctionTable`] as it
//! parses, matching the error ordering a hand-written recursive-descent
//! checker would produce.
//!
//! # Grammar
//!
//! ```text
//! program       := (func_decl | stmt)*
//! func_decl     := type ID '(' params? ')' block
//! params        := param (',' param)*
//! param         := type ID
//! block         := '{' stmt* '}'
//! stmt          := if_stmt | while_stmt | for_stmt | return_stmt | block
//!                | decl | decl_with_type | assign | expr_stmt
//! if_stmt       := 'if' '(' expr ')' block ('else' block)?
//! while_stmt    := 'while' '(' expr ')' block
//! for_stmt      := 'for' '(' for_init ';' expr ';' assign_no_semi ')' block
//! for_init      := decl_no_semi | decl_with_type_no_semi | assign_no_semi
//! decl          := 'int' ID ('=' expr)? ';'
//! decl_with_type:= ID ID ('=' expr)? ';'
//! assign        := ID '=' expr ';'
//! return_stmt   := 'return' expr? ';'
//! expr_stmt     := func_call ';'
//! ```
//!
//! Function signatures are registered by a single forward-scanning prescan
//! before any statement is parsed, so calls to functions declared later in
//! the file (including mutual recursion) resolve normally.

use crate::ast::{
    BinOpKind, Block, Expr, FuncDecl, Item, NumLit, Param, Program, Stmt, Type, UnaryOpKind,
};
use crate::semantic::{arithmetic_result, assignable, FunctionSig, FunctionTable, SymbolTable};
use crate::token::{Span, Token, TokenKind};

/// Distinguishes a plain grammar violation from a type/scope rule violation.
/// Both are reported the same way externally; the distinction exists so
/// callers (and tests) can tell which phase rejected a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            span,
        }
    }

    fn semantic(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            kind: ParseErrorKind::Semantic,
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.line, self.span.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Scans the full token stream once, registering the signature of every
/// function declaration it finds by the same `(INT | ID) ID LPAREN` pattern
/// the grammar uses to tell a `func_decl` apart from a `stmt`. This does not
/// build any AST; a malformed parameter list here just stops early, and the
/// real parse reports the precise syntax error when it reaches that point.
fn prescan(tokens: &[Token]) -> FunctionTable {
    let mut table = FunctionTable::with_builtins();
    let mut i = 0;

    while i + 2 < tokens.len() {
        let is_type_tok = matches!(tokens[i].kind, TokenKind::Int | TokenKind::Id);
        if is_type_tok && tokens[i + 1].kind == TokenKind::Id && tokens[i + 2].kind == TokenKind::LParen {
            let return_type = Type::from_name(&tokens[i].lexeme);
            let name = tokens[i + 1].lexeme.clone();
            let mut params = Vec::new();
            let mut j = i + 3;

            if tokens.get(j).map(|t| t.kind) != Some(TokenKind::RParen) {
                loop {
                    match tokens.get(j) {
                        Some(t) if matches!(t.kind, TokenKind::Int | TokenKind::Id) => {
                            params.push(Type::from_name(&t.lexeme));
                            j += 1;
                        }
                        _ => break,
                    }
                    if tokens.get(j).map(|t| t.kind) != Some(TokenKind::Id) {
                        break;
                    }
                    j += 1;
                    if tokens.get(j).map(|t| t.kind) == Some(TokenKind::Comma) {
                        j += 1;
                        continue;
                    }
                    break;
                }
            }

            table.register(
                name,
                FunctionSig {
                    return_type,
                    params,
                    variadic: false,
                },
            );
            i = j + 1;
            continue;
        }
        i += 1;
    }

    table
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    functions: FunctionTable,
    symbols: SymbolTable,
    current_return_type: Option<Type>,
}

impl Parser {
    /// Creates a new parser and runs the prescan to populate the function
    /// table before any statement is parsed.
    ///
    /// # Panics
    /// Panics if the token list is empty. The adapter always appends a
    /// trailing `Eof` token, so this only happens if it is bypassed.
    pub fn new(tokens: Vec<Token>) -> Self {
        assert!(!tokens.is_empty(), "token list must not be empty");
        let functions = prescan(&tokens);
        Parser {
            tokens,
            pos: 0,
            functions,
            symbols: SymbolTable::new(),
            current_return_type: None,
        }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();
        while !self.is_eof() {
            if self.looks_like_func_decl() {
                items.push(Item::Func(self.parse_func_decl()?));
            } else {
                items.push(Item::Stmt(self.parse_stmt()?));
            }
        }
        Ok(Program { items })
    }

    // --- cursor -----------------------------------------------------

    fn current(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn is_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.current().clone();
            Err(ParseError::syntax(
                format!("expected {} but found '{}'", what, tok.lexeme),
                tok.span,
            ))
        }
    }

    fn looks_like_func_decl(&self) -> bool {
        let t0 = self.current();
        let is_type = matches!(t0.kind, TokenKind::Int | TokenKind::Id);
        is_type && self.peek_n(1).kind == TokenKind::Id && self.peek_n(2).kind == TokenKind::LParen
    }

    // --- declarations -------------------------------------------------

    fn parse_func_decl(&mut self) -> Result<FuncDecl, ParseError> {
        let type_tok = self.advance();
        let return_type = Type::from_name(&type_tok.lexeme);
        let name_tok = self.expect(TokenKind::Id, "a function name")?;
        self.expect(TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ty_tok = self.advance();
                if !matches!(ty_tok.kind, TokenKind::Int | TokenKind::Id) {
                    return Err(ParseError::syntax(
                        format!("expected a parameter type, found '{}'", ty_tok.lexeme),
                        ty_tok.span,
                    ));
                }
                let pname_tok = self.expect(TokenKind::Id, "a parameter name")?;
                params.push(Param {
                    ty: Type::from_name(&ty_tok.lexeme),
                    name: pname_tok.lexeme,
                });
                if self.check(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        self.symbols.clear();
        for p in &params {
            self.symbols.declare(&p.name, p.ty.clone()).map_err(|_| {
                ParseError::semantic(
                    format!("duplicate parameter name '{}'", p.name),
                    name_tok.span,
                )
            })?;
        }

        let prev_return_type = self.current_return_type.replace(return_type.clone());
        let body = self.parse_block()?;
        self.current_return_type = prev_return_type;
        self.symbols.clear();

        Ok(FuncDecl {
            return_type,
            name: name_tok.lexeme,
            params,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.is_eof() {
                return Err(ParseError::syntax(
                    "unexpected end of input inside a block",
                    self.current().span,
                ));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Block { stmts })
    }

    // --- statements -----------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.check(TokenKind::Int) {
            return self.parse_decl();
        }
        if self.check(TokenKind::Return) || self.current().is_keyword("return") {
            return self.parse_return();
        }
        if self.check(TokenKind::LBrace) {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.current().is_keyword("if") {
            return self.parse_if();
        }
        if self.current().is_keyword("while") {
            return self.parse_while();
        }
        if self.current().is_keyword("for") {
            return self.parse_for();
        }
        if self.check(TokenKind::Id) {
            return match self.peek_n(1).kind {
                TokenKind::Assign => self.parse_assign(),
                TokenKind::Id => self.parse_decl_with_type(),
                TokenKind::LParen => self.parse_expr_stmt(),
                _ => Err(ParseError::syntax(
                    format!("unexpected token '{}' after identifier", self.peek_n(1).lexeme),
                    self.peek_n(1).span,
                )),
            };
        }
        let tok = self.current().clone();
        Err(ParseError::syntax(
            format!("unexpected token '{}' starting a statement", tok.lexeme),
            tok.span,
        ))
    }

    fn parse_decl_core(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Int, "'int'")?;
        let name_tok = self.expect(TokenKind::Id, "a variable name")?;
        let mut init = None;
        if self.check(TokenKind::Assign) {
            self.advance();
            let (expr, ty) = self.parse_expr()?;
            if !assignable(&ty, &Type::Int) {
                return Err(ParseError::semantic(
                    format!("cannot initialize 'int {}' with a value of type {}", name_tok.lexeme, ty),
                    name_tok.span,
                ));
            }
            init = Some(expr);
        }
        self.symbols
            .declare(&name_tok.lexeme, Type::Int)
            .map_err(|_| {
                ParseError::semantic(
                    format!("redeclaration of variable '{}'", name_tok.lexeme),
                    name_tok.span,
                )
            })?;
        Ok(Stmt::Decl {
            name: name_tok.lexeme,
            declared_type: Type::Int,
            init,
        })
    }

    fn parse_decl(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.parse_decl_core()?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(stmt)
    }

    fn parse_decl_with_type_core(&mut self) -> Result<Stmt, ParseError> {
        let type_tok = self.expect(TokenKind::Id, "a type name")?;
        let name_tok = self.expect(TokenKind::Id, "a variable name")?;
        let declared_type = Type::from_name(&type_tok.lexeme);
        let mut init = None;
        if self.check(TokenKind::Assign) {
            self.advance();
            let (expr, ty) = self.parse_expr()?;
            if !assignable(&ty, &declared_type) {
                return Err(ParseError::semantic(
                    format!(
                        "cannot initialize '{} {}' with a value of type {}",
                        declared_type, name_tok.lexeme, ty
                    ),
                    name_tok.span,
                ));
            }
            init = Some(expr);
        }
        self.symbols
            .declare(&name_tok.lexeme, declared_type.clone())
            .map_err(|_| {
                ParseError::semantic(
                    format!("redeclaration of variable '{}'", name_tok.lexeme),
                    name_tok.span,
                )
            })?;
        Ok(Stmt::Decl {
            name: name_tok.lexeme,
            declared_type,
            init,
        })
    }

    fn parse_decl_with_type(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.parse_decl_with_type_core()?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(stmt)
    }

    fn parse_assign_core(&mut self) -> Result<Stmt, ParseError> {
        let name_tok = self.expect(TokenKind::Id, "a variable name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let (expr, ty) = self.parse_expr()?;
        let declared = self.symbols.lookup(&name_tok.lexeme).cloned().ok_or_else(|| {
            ParseError::semantic(
                format!("undeclared variable '{}'", name_tok.lexeme),
                name_tok.span,
            )
        })?;
        if !assignable(&ty, &declared) {
            return Err(ParseError::semantic(
                format!(
                    "cannot assign a value of type {} to '{}' of type {}",
                    ty, name_tok.lexeme, declared
                ),
                name_tok.span,
            ));
        }
        Ok(Stmt::Assign {
            name: name_tok.lexeme,
            expr,
        })
    }

    fn parse_assign(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.parse_assign_core()?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(stmt)
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name_tok = self.expect(TokenKind::Id, "a function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let (call, _ty) = self.parse_call(name_tok.lexeme, name_tok.span)?;
        self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Expr(call))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let ret_tok = self.advance();
        let return_type = self.current_return_type.clone().ok_or_else(|| {
            ParseError::semantic("'return' used outside of a function", ret_tok.span)
        })?;

        if self.check(TokenKind::Semi) {
            self.advance();
            if return_type != Type::Void {
                return Err(ParseError::semantic(
                    format!("function returning {} must return a value", return_type),
                    ret_tok.span,
                ));
            }
            return Ok(Stmt::Return(None));
        }

        let (expr, ty) = self.parse_expr()?;
        if !assignable(&ty, &return_type) {
            return Err(ParseError::semantic(
                format!("return type mismatch: expected {}, found {}", return_type, ty),
                ret_tok.span,
            ));
        }
        self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt::Return(Some(expr)))
    }

    fn check_condition_type(&self, ty: &Type, span: Span) -> Result<(), ParseError> {
        if matches!(ty, Type::Bool | Type::Int | Type::Float) {
            Ok(())
        } else {
            Err(ParseError::semantic(
                format!("condition must be bool, int, or float, found {}", ty),
                span,
            ))
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'if'
        self.expect(TokenKind::LParen, "'('")?;
        let cond_span = self.current().span;
        let (cond, ty) = self.parse_expr()?;
        self.check_condition_type(&ty, cond_span)?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_block = self.parse_block()?;
        let else_block = if self.current().is_keyword("else") {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'while'
        self.expect(TokenKind::LParen, "'('")?;
        let cond_span = self.current().span;
        let (cond, ty) = self.parse_expr()?;
        self.check_condition_type(&ty, cond_span)?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for_init(&mut self) -> Result<Stmt, ParseError> {
        match self.current().kind {
            TokenKind::Int => self.parse_decl_core(),
            TokenKind::Id => match self.peek_n(1).kind {
                TokenKind::Assign => self.parse_assign_core(),
                TokenKind::Id => self.parse_decl_with_type_core(),
                _ => Err(ParseError::syntax(
                    "invalid for-loop initializer",
                    self.current().span,
                )),
            },
            _ => Err(ParseError::syntax(
                "invalid for-loop initializer",
                self.current().span,
            )),
        }
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'for'
        self.expect(TokenKind::LParen, "'('")?;
        let init = self.parse_for_init()?;
        self.expect(TokenKind::Semi, "';'")?;
        let cond_span = self.current().span;
        let (cond, ty) = self.parse_expr()?;
        self.check_condition_type(&ty, cond_span)?;
        self.expect(TokenKind::Semi, "';'")?;
        let step = self.parse_assign_core()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init: Box::new(init),
            cond,
            step: Box::new(step),
            body,
        })
    }

    // --- expressions, with inline type inference ------------------------

    fn parse_expr(&mut self) -> Result<(Expr, Type), ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_logical_and()?;
        while self.check(TokenKind::Or) {
            let op_tok = self.advance();
            let (rhs, rty) = self.parse_logical_and()?;
            if lty != Type::Bool || rty != Type::Bool {
                return Err(ParseError::semantic(
                    format!("operands of '||' must be bool, found {} and {}", lty, rty),
                    op_tok.span,
                ));
            }
            lhs = Expr::Binary(Box::new(lhs), BinOpKind::Or, Box::new(rhs));
            lty = Type::Bool;
        }
        Ok((lhs, lty))
    }

    fn parse_logical_and(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_equality()?;
        while self.check(TokenKind::And) {
            let op_tok = self.advance();
            let (rhs, rty) = self.parse_equality()?;
            if lty != Type::Bool || rty != Type::Bool {
                return Err(ParseError::semantic(
                    format!("operands of '&&' must be bool, found {} and {}", lty, rty),
                    op_tok.span,
                ));
            }
            lhs = Expr::Binary(Box::new(lhs), BinOpKind::And, Box::new(rhs));
            lty = Type::Bool;
        }
        Ok((lhs, lty))
    }

    fn parse_equality(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_relational()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Eq => BinOpKind::Eq,
                TokenKind::Neq => BinOpKind::Neq,
                _ => break,
            };
            let op_tok = self.advance();
            let (rhs, rty) = self.parse_relational()?;
            self.check_comparable(&lty, &rty, op_tok.span)?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
            lty = Type::Bool;
        }
        Ok((lhs, lty))
    }

    fn parse_relational(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinOpKind::Lt,
                TokenKind::Gt => BinOpKind::Gt,
                TokenKind::Le => BinOpKind::Le,
                TokenKind::Ge => BinOpKind::Ge,
                _ => break,
            };
            let op_tok = self.advance();
            let (rhs, rty) = self.parse_additive()?;
            self.check_comparable(&lty, &rty, op_tok.span)?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
            lty = Type::Bool;
        }
        Ok((lhs, lty))
    }

    fn check_comparable(&self, lty: &Type, rty: &Type, span: Span) -> Result<(), ParseError> {
        let ok = (lty.is_numeric() && rty.is_numeric()) || (*lty == Type::String && *rty == Type::String);
        if ok {
            Ok(())
        } else {
            Err(ParseError::semantic(
                format!("cannot compare {} and {}", lty, rty),
                span,
            ))
        }
    }

    fn parse_additive(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_term()?;
        loop {
            match self.current().kind {
                TokenKind::Plus => {
                    let op_tok = self.advance();
                    let (rhs, rty) = self.parse_term()?;
                    let result_ty = if lty.is_numeric() && rty.is_numeric() {
                        arithmetic_result(&lty, &rty)
                    } else if lty == Type::String && rty == Type::String {
                        Type::String
                    } else {
                        return Err(ParseError::semantic(
                            format!("cannot add {} and {}", lty, rty),
                            op_tok.span,
                        ));
                    };
                    lhs = Expr::Binary(Box::new(lhs), BinOpKind::Add, Box::new(rhs));
                    lty = result_ty;
                }
                TokenKind::Minus => {
                    let op_tok = self.advance();
                    let (rhs, rty) = self.parse_term()?;
                    if !(lty.is_numeric() && rty.is_numeric()) {
                        return Err(ParseError::semantic(
                            format!("operands of '-' must be numeric, found {} and {}", lty, rty),
                            op_tok.span,
                        ));
                    }
                    let result_ty = arithmetic_result(&lty, &rty);
                    lhs = Expr::Binary(Box::new(lhs), BinOpKind::Sub, Box::new(rhs));
                    lty = result_ty;
                }
                _ => break,
            }
        }
        Ok((lhs, lty))
    }

    fn parse_term(&mut self) -> Result<(Expr, Type), ParseError> {
        let (mut lhs, mut lty) = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOpKind::Mul,
                TokenKind::Slash => BinOpKind::Div,
                TokenKind::Perc => BinOpKind::Mod,
                _ => break,
            };
            let op_tok = self.advance();
            let (rhs, rty) = self.parse_factor()?;
            if !(lty.is_numeric() && rty.is_numeric()) {
                return Err(ParseError::semantic(
                    format!("operands of arithmetic operators must be numeric, found {} and {}", lty, rty),
                    op_tok.span,
                ));
            }
            let result_ty = arithmetic_result(&lty, &rty);
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
            lty = result_ty;
        }
        Ok((lhs, lty))
    }

    fn parse_factor(&mut self) -> Result<(Expr, Type), ParseError> {
        match self.current().kind {
            TokenKind::Plus | TokenKind::Minus => {
                let op_tok = self.advance();
                let (operand, ty) = self.parse_factor()?;
                if !ty.is_numeric() {
                    return Err(ParseError::semantic(
                        format!("unary '{}' requires a numeric operand, found {}", op_tok.lexeme, ty),
                        op_tok.span,
                    ));
                }
                let kind = if op_tok.kind == TokenKind::Plus {
                    UnaryOpKind::Plus
                } else {
                    UnaryOpKind::Neg
                };
                Ok((Expr::Unary(kind, Box::new(operand)), ty))
            }
            TokenKind::Num => {
                let tok = self.advance();
                match tok.literal {
                    crate::token::Literal::Int(v) => Ok((Expr::Num(NumLit::Int(v)), Type::Int)),
                    crate::token::Literal::Float(v) => Ok((Expr::Num(NumLit::Float(v)), Type::Float)),
                    _ => Err(ParseError::syntax(
                        format!("malformed numeric literal '{}'", tok.lexeme),
                        tok.span,
                    )),
                }
            }
            TokenKind::String => {
                let tok = self.advance();
                match tok.literal {
                    crate::token::Literal::Str(s) => Ok((Expr::String(s), Type::String)),
                    _ => Err(ParseError::syntax(
                        format!("malformed string literal '{}'", tok.lexeme),
                        tok.span,
                    )),
                }
            }
            TokenKind::Id => {
                let name_tok = self.advance();
                if self.check(TokenKind::LParen) {
                    self.advance();
                    self.parse_call(name_tok.lexeme, name_tok.span)
                } else {
                    let ty = self.symbols.lookup(&name_tok.lexeme).cloned().ok_or_else(|| {
                        ParseError::semantic(
                            format!("undeclared variable '{}'", name_tok.lexeme),
                            name_tok.span,
                        )
                    })?;
                    Ok((Expr::Var(name_tok.lexeme), ty))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let (expr, ty) = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok((expr, ty))
            }
            _ => {
                let tok = self.current().clone();
                Err(ParseError::syntax(
                    format!("unexpected token '{}' in expression", tok.lexeme),
                    tok.span,
                ))
            }
        }
    }

    /// Parses a call's argument list and closing `)` (the `(` and callee
    /// name are already consumed) and runs the built-in/arity/type checks.
    fn parse_call(&mut self, name: String, name_span: Span) -> Result<(Expr, Type), ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.build_call(name, name_span, args)
    }

    fn build_call(
        &self,
        name: String,
        name_span: Span,
        args: Vec<(Expr, Type)>,
    ) -> Result<(Expr, Type), ParseError> {
        let sig = self.functions.get(&name).cloned().ok_or_else(|| {
            ParseError::semantic(format!("call to unknown function '{}'", name), name_span)
        })?;

        if name == "printf" {
            if args.is_empty() {
                return Err(ParseError::semantic(
                    "printf requires at least a format string argument",
                    name_span,
                ));
            }
            for (expr, _) in args.iter().skip(1) {
                if !matches!(expr, Expr::Var(_)) {
                    return Err(ParseError::semantic(
                        "printf arguments after the format string must be variable references",
                        name_span,
                    ));
                }
            }
        } else if name == "scanf" {
            if args.is_empty() {
                return Err(ParseError::semantic(
                    "scanf requires at least a format string argument",
                    name_span,
                ));
            }
            for (expr, _) in args.iter() {
                if !matches!(expr, Expr::Var(_)) {
                    return Err(ParseError::semantic(
                        "scanf arguments must be variable references",
                        name_span,
                    ));
                }
            }
        } else if !sig.variadic {
            if args.len() != sig.params.len() {
                return Err(ParseError::semantic(
                    format!(
                        "'{}' expects {} argument(s), found {}",
                        name,
                        sig.params.len(),
                        args.len()
                    ),
                    name_span,
                ));
            }
            for (idx, (_, ty)) in args.iter().enumerate() {
                if !assignable(ty, &sig.params[idx]) {
                    return Err(ParseError::semantic(
                        format!(
                            "argument {} of '{}' expects {}, found {}",
                            idx + 1,
                            name,
                            sig.params[idx],
                            ty
                        ),
                        name_span,
                    ));
                }
            }
        }

        let call_ty = sig.return_type.clone();
        let arg_exprs = args.into_iter().map(|(e, _)| e).collect();
        Ok((Expr::Call(name, arg_exprs), call_ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapt;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Result<Program, ParseError> {
        let raw = Lexer::new(src).tokenize().expect("lex ok");
        let tokens = adapt(raw).expect("adapt ok");
        Parser::new(tokens).parse()
    }

    #[test]
    fn parses_empty_main() {
        let program = parse_src("int main() { return 0; }").unwrap();
        assert_eq!(program.items.len(), 1);
        match &program.items[0] {
            Item::Func(f) => {
                assert_eq!(f.name, "main");
                assert_eq!(f.return_type, Type::Int);
            }
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn forward_reference_resolves_via_prescan() {
        let src = "int main() { return helper(); } int helper() { return 1; }";
        assert!(parse_src(src).is_ok());
    }

    #[test]
    fn redeclaration_is_a_semantic_error() {
        let src = "int main() { int x = 1; int x = 2; return 0; }";
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Semantic);
        assert!(err.message.contains("redeclaration"));
    }

    #[test]
    fn undeclared_variable_is_a_semantic_error() {
        let src = "int main() { return y; }";
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Semantic);
        assert!(err.message.contains("undeclared"));
    }

    #[test]
    fn type_mismatch_on_string_to_int_is_rejected() {
        let src = r#"int main() { int x = "hi"; return 0; }"#;
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Semantic);
    }

    #[test]
    fn assignment_as_a_condition_is_a_syntax_error() {
        let src = "int main() { int x = 0; if (x = 5) { return 0; } return 1; }";
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn int_to_float_widens_on_assignment() {
        let src = "int main() { float x = 1; return 0; }";
        assert!(parse_src(src).is_ok());
    }

    #[test]
    fn if_else_and_while_and_for_parse() {
        let src = "int main() { \
            int i = 0; \
            while (i < 10) { i = i + 1; } \
            for (int j = 0; j < 10; j = j + 1) { i = i + j; } \
            if (i > 0) { return 1; } else { return 0; } \
        }";
        assert!(parse_src(src).is_ok());
    }

    #[test]
    fn printf_requires_variable_refs_after_format_string() {
        let src = r#"int main() { printf("%d", 1); return 0; }"#;
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Semantic);
    }

    #[test]
    fn printf_with_variable_reference_is_accepted() {
        let src = r#"int main() { int x = 1; printf("%d", x); return 0; }"#;
        assert!(parse_src(src).is_ok());
    }

    #[test]
    fn arity_mismatch_is_a_semantic_error() {
        let src = "int add(int a, int b) { return a + b; } int main() { return add(1); }";
        let err = parse_src(src).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Semantic);
        assert!(err.message.contains("expects"));
    }
}
