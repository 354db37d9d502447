//! Symbol table, function table, and semantic error types shared by the
//! parser's inline checks.
//!
//! There is no separate AST-walking pass here: the checks happen
//! synchronously while `parser.rs` builds each node. This module supplies
//! only the data structures and error-construction helpers the parser
//! reaches for as it goes.

use crate::ast::Type;
use crate::token::Span;
use std::collections::HashMap;

/// The kind of semantic error, for structured matching independent of the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    Redeclaration,
    UndeclaredVariable,
    UnknownFunction,
    TypeMismatch,
    Arity,
    InvalidCondition,
    InvalidReturn,
    BuiltinContract,
}

#[derive(Debug, Clone)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, span: Span) -> Self {
        SemanticError {
            kind,
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.line, self.span.column, self.message)
    }
}

impl std::error::Error for SemanticError {}

/// A function's registered signature: its declared return type, ordered
/// parameter types, and whether it accepts a variable number of arguments
/// (true only for the built-ins `printf`/`scanf`).
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub return_type: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

/// The whole-program function table, populated once by the prescan and the
/// built-in registry, then read (never mutated) for the rest of the parse.
#[derive(Debug, Default)]
pub struct FunctionTable {
    funcs: HashMap<String, FunctionSig>,
}

impl FunctionTable {
    /// Seeds the table with `printf`/`scanf`: `(int, [], variadic=true)`.
    pub fn with_builtins() -> Self {
        let mut table = FunctionTable::default();
        table.register(
            "printf",
            FunctionSig {
                return_type: Type::Int,
                params: Vec::new(),
                variadic: true,
            },
        );
        table.register(
            "scanf",
            FunctionSig {
                return_type: Type::Int,
                params: Vec::new(),
                variadic: true,
            },
        );
        table
    }

    pub fn register(&mut self, name: impl Into<String>, sig: FunctionSig) {
        self.funcs.insert(name.into(), sig);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSig> {
        self.funcs.get(name)
    }
}

/// A single function's local variable table: flat (no nested-block
/// scoping), cleared at function entry and exit.
#[derive(Debug, Default)]
pub struct SymbolTable {
    vars: HashMap<String, Type>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn declare(&mut self, name: &str, ty: Type) -> Result<(), ()> {
        if self.vars.contains_key(name) {
            return Err(());
        }
        self.vars.insert(name.to_string(), ty);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.vars.get(name)
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

/// Is `from -> to` an allowed implicit conversion? Only `int -> float`
/// widening is permitted; everywhere else the types must match exactly.
pub fn assignable(from: &Type, to: &Type) -> bool {
    from == to || (*from == Type::Int && *to == Type::Float)
}

/// The result type of applying an arithmetic operator to two numeric
/// operand types: `float` if either operand is `float`, else `int`.
pub fn arithmetic_result(lhs: &Type, rhs: &Type) -> Type {
    if *lhs == Type::Float || *rhs == Type::Float {
        Type::Float
    } else {
        Type::Int
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_variadic_int() {
        let table = FunctionTable::with_builtins();
        let printf = table.get("printf").unwrap();
        assert_eq!(printf.return_type, Type::Int);
        assert!(printf.variadic);
        assert!(table.contains("scanf"));
    }

    #[test]
    fn symbol_table_rejects_redeclaration() {
        let mut table = SymbolTable::new();
        table.declare("x", Type::Int).unwrap();
        assert!(table.declare("x", Type::Float).is_err());
    }

    #[test]
    fn symbol_table_clear_forgets_everything() {
        let mut table = SymbolTable::new();
        table.declare("x", Type::Int).unwrap();
        table.clear();
        assert!(table.lookup("x").is_none());
    }

    #[test]
    fn widening_allows_int_to_float_only() {
        assert!(assignable(&Type::Int, &Type::Float));
        assert!(!assignable(&Type::Float, &Type::Int));
        assert!(assignable(&Type::Int, &Type::Int));
        assert!(!assignable(&Type::Int, &Type::String));
    }

    #[test]
    fn arithmetic_result_widens_to_float() {
        assert_eq!(arithmetic_result(&Type::Int, &Type::Int), Type::Int);
        assert_eq!(arithmetic_result(&Type::Int, &Type::Float), Type::Float);
        assert_eq!(arithmetic_result(&Type::Float, &Type::Float), Type::Float);
    }
}
