//! Stage 2: normalizes the lexer's raw token stream into the parser-visible
//! vocabulary ([`crate::token::Token`]).
//!
//! This is where `int` becomes [`TokenKind::Int`] while every other keyword
//! lexeme (`bool`, `float`, `string`, `void`, `for`, `while`, `if`, `else`,
//! `return`) becomes a plain [`TokenKind::Id`], so the parser recognizes
//! control-flow keywords by lexeme comparison instead of a dedicated token
//! kind. `return` is the one exception with its own kind,
//! [`TokenKind::Return`], which the parser treats as a hint alongside the
//! lexeme check.

use crate::lexer::{RawKind, RawToken};
use crate::token::{Literal, Span, Token, TokenKind};

/// An error raised while adapting raw tokens: an operator or punctuation
/// lexeme the lexer matched but this stage has no mapping for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for AdapterError {}

fn punct_kind(lexeme: &str) -> Option<TokenKind> {
    Some(match lexeme {
        ";" => TokenKind::Semi,
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        "," => TokenKind::Comma,
        _ => return None,
    })
}

fn operator_kind(lexeme: &str) -> Option<TokenKind> {
    Some(match lexeme {
        "==" => TokenKind::Eq,
        "!=" => TokenKind::Neq,
        "<=" => TokenKind::Le,
        ">=" => TokenKind::Ge,
        "&&" => TokenKind::And,
        "||" => TokenKind::Or,
        "++" => TokenKind::Inc,
        "--" => TokenKind::Dec,
        "+=" => TokenKind::PlusEq,
        "-=" => TokenKind::MinusEq,
        "*=" => TokenKind::StarEq,
        "/=" => TokenKind::SlashEq,
        "=" => TokenKind::Assign,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "<" => TokenKind::Lt,
        ">" => TokenKind::Gt,
        "!" => TokenKind::Not,
        "%" => TokenKind::Perc,
        _ => return None,
    })
}

/// Converts the lexer's raw token stream into the parser's token stream,
/// appending a trailing `Eof` token that carries the position of the last
/// real token (or `(1, 1)` when the input produced no tokens at all).
pub fn adapt(raw: Vec<RawToken>) -> Result<Vec<Token>, AdapterError> {
    let mut out = Vec::with_capacity(raw.len() + 1);
    let mut last_span = Span::new(0, 0, 1, 1);

    for tok in raw {
        last_span = tok.span;
        match tok.kind {
            RawKind::Keyword => {
                if tok.lexeme == "int" {
                    out.push(Token::new(TokenKind::Int, tok.lexeme, Literal::None, tok.span));
                } else if tok.lexeme == "return" {
                    out.push(Token::new(
                        TokenKind::Return,
                        tok.lexeme.clone(),
                        Literal::None,
                        tok.span,
                    ));
                } else {
                    out.push(Token::new(TokenKind::Id, tok.lexeme, Literal::None, tok.span));
                }
            }
            RawKind::Identifier => {
                out.push(Token::new(TokenKind::Id, tok.lexeme, Literal::None, tok.span));
            }
            RawKind::Number => {
                let literal = if tok.lexeme.contains('.') {
                    tok.lexeme
                        .parse::<f64>()
                        .map(Literal::Float)
                        .unwrap_or(Literal::None)
                } else {
                    tok.lexeme
                        .parse::<i64>()
                        .map(Literal::Int)
                        .unwrap_or(Literal::None)
                };
                out.push(Token::new(TokenKind::Num, tok.lexeme, literal, tok.span));
            }
            RawKind::Punct => match punct_kind(&tok.lexeme) {
                Some(kind) => out.push(Token::new(kind, tok.lexeme, Literal::None, tok.span)),
                None => {
                    return Err(AdapterError {
                        message: format!("unmapped punctuation: {}", tok.lexeme),
                        line: tok.span.line,
                        column: tok.span.column,
                    });
                }
            },
            RawKind::Operator => match operator_kind(&tok.lexeme) {
                Some(kind) => out.push(Token::new(kind, tok.lexeme, Literal::None, tok.span)),
                None => {
                    return Err(AdapterError {
                        message: format!("unsupported operator: {}", tok.lexeme),
                        line: tok.span.line,
                        column: tok.span.column,
                    });
                }
            },
            RawKind::StringLit => {
                let value = tok.lexeme[1..tok.lexeme.len() - 1].to_string();
                out.push(Token::new(
                    TokenKind::String,
                    tok.lexeme,
                    Literal::Str(value),
                    tok.span,
                ));
            }
        }
    }

    let eof_span = Span::new(last_span.end, last_span.end, last_span.line, last_span.column);
    out.push(Token::new(TokenKind::Eof, "", Literal::None, eof_span));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn adapt_src(src: &str) -> Vec<Token> {
        let raw = Lexer::new(src).tokenize().expect("lex ok");
        adapt(raw).expect("adapt ok")
    }

    #[test]
    fn int_keyword_becomes_int_kind() {
        let toks = adapt_src("int");
        assert_eq!(toks[0].kind, TokenKind::Int);
    }

    #[test]
    fn other_keywords_become_id() {
        for kw in ["bool", "float", "string", "void", "for", "while", "if", "else"] {
            let toks = adapt_src(kw);
            assert_eq!(toks[0].kind, TokenKind::Id, "{kw} should adapt to Id");
            assert!(toks[0].is_keyword(kw));
        }
    }

    #[test]
    fn return_keyword_has_its_own_kind_and_is_still_an_id_lexeme_match() {
        let toks = adapt_src("return");
        assert_eq!(toks[0].kind, TokenKind::Return);
    }

    #[test]
    fn trailing_eof_always_present() {
        let toks = adapt_src("int x;");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn eof_position_on_empty_input_is_one_one() {
        let toks = adapt_src("");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].span.line, 1);
        assert_eq!(toks[0].span.column, 1);
    }

    #[test]
    fn string_literal_strips_quotes_without_unescaping() {
        let toks = adapt_src(r#""hi\n""#);
        assert_eq!(toks[0].literal, Literal::Str("hi\\n".to_string()));
    }

    #[test]
    fn integer_and_float_literals_parsed() {
        let toks = adapt_src("42 3.5");
        assert_eq!(toks[0].literal, Literal::Int(42));
        assert_eq!(toks[1].literal, Literal::Float(3.5));
    }

    #[test]
    fn operators_map_to_fixed_tags() {
        let toks = adapt_src("+ - * / % == != <= >= && || ! =");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Perc,
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }
}
