//! Lexical analysis: source text to a stream of raw, uninterpreted tokens.
//!
//! This is stage 1 of the pipeline. It never produces a [`crate::token::Token`]
//! directly; it only classifies lexemes into the six raw categories from the
//! fixed-priority match order below. [`crate::adapter`] turns these into the
//! parser-visible vocabulary.

use crate::token::Span;

/// The six raw lexical categories, tried in this fixed priority order at
/// every position. Reserved words are matched before identifiers, so a
/// keyword can never be misclassified as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Keyword,
    Identifier,
    Punct,
    Operator,
    Number,
    StringLit,
}

/// A single raw token: a category tag, its exact lexeme, and the position
/// of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub kind: RawKind,
    pub lexeme: String,
    pub span: Span,
}

const KEYWORDS: &[&str] = &[
    "int", "bool", "float", "string", "void", "for", "while", "if", "else", "return",
];

const MULTI_CHAR_OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "++", "--", "+=", "-=", "*=", "/=", "%=", "&&", "||",
];

const SINGLE_CHAR_OPERATORS: &str = "+-*/%<>=!&|";

const PUNCTUATION: &str = ",;(){}";

/// A fatal error raised while scanning. Carries the 1-indexed line/column of
/// the offending position and, for unrecognized characters, a short context
/// snippet to help place the error in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the entire input, returning the raw token stream in source
    /// order. Stops at the first lexical error (unterminated block comment
    /// or unrecognized character).
    pub fn tokenize(&mut self) -> Result<Vec<RawToken>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.is_eof() {
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn current(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance_byte(&mut self) {
        let byte = self.bytes[self.pos];
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if byte & 0xC0 != 0x80 {
            // Not a UTF-8 continuation byte: this byte starts a new column.
            self.column += 1;
        }
    }

    fn advance_str(&mut self, text: &str) {
        for _ in 0..text.len() {
            self.advance_byte();
        }
    }

    /// Consumes comments and horizontal/vertical whitespace until real
    /// content or end of input. The only error this can raise is an
    /// unterminated block comment.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            if self.rest().starts_with("//") {
                while !self.is_eof() && self.current() != Some('\n') {
                    self.advance_byte();
                }
                continue;
            }

            if self.rest().starts_with("/*") {
                let start_line = self.line;
                let start_column = self.column;
                self.advance_str("/*");
                let mut closed = false;
                while !self.is_eof() {
                    if self.rest().starts_with("*/") {
                        self.advance_str("*/");
                        closed = true;
                        break;
                    }
                    self.advance_byte();
                }
                if !closed {
                    return Err(LexError {
                        message: "unterminated block comment".to_string(),
                        line: start_line,
                        column: start_column,
                    });
                }
                continue;
            }

            match self.current() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.advance_byte();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<RawToken, LexError> {
        let start_pos = self.pos;
        let start_line = self.line;
        let start_column = self.column;

        if let Some(lexeme) = self.match_keyword_or_identifier() {
            let kind = if KEYWORDS.contains(&lexeme.as_str()) {
                RawKind::Keyword
            } else {
                RawKind::Identifier
            };
            return Ok(self.finish(kind, lexeme, start_pos, start_line, start_column));
        }

        if let Some(c) = self.current()
            && PUNCTUATION.contains(c)
        {
            self.advance_byte();
            return Ok(self.finish(
                RawKind::Punct,
                c.to_string(),
                start_pos,
                start_line,
                start_column,
            ));
        }

        if let Some(op) = self.match_operator() {
            self.advance_str(&op);
            return Ok(self.finish(RawKind::Operator, op, start_pos, start_line, start_column));
        }

        if let Some(lexeme) = self.match_number() {
            self.advance_str(&lexeme);
            return Ok(self.finish(
                RawKind::Number,
                lexeme,
                start_pos,
                start_line,
                start_column,
            ));
        }

        if let Some(lexeme) = self.match_string_literal() {
            let len = lexeme.len();
            self.advance_str(&lexeme);
            debug_assert_eq!(len, lexeme.len());
            return Ok(self.finish(
                RawKind::StringLit,
                lexeme,
                start_pos,
                start_line,
                start_column,
            ));
        }

        self.error_at_unrecognized(start_line, start_column)
    }

    fn finish(
        &self,
        kind: RawKind,
        lexeme: String,
        start_pos: usize,
        start_line: usize,
        start_column: usize,
    ) -> RawToken {
        let end = start_pos + lexeme.len();
        RawToken {
            kind,
            lexeme,
            span: Span::new(start_pos, end, start_line, start_column),
        }
    }

    fn match_keyword_or_identifier(&self) -> Option<String> {
        let mut chars = self.rest().chars();
        let first = chars.next()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let mut len = first.len_utf8();
        for c in chars {
            if c.is_ascii_alphanumeric() || c == '_' {
                len += c.len_utf8();
            } else {
                break;
            }
        }
        Some(self.rest()[..len].to_string())
    }

    fn match_operator(&self) -> Option<String> {
        for candidate in MULTI_CHAR_OPERATORS {
            if self.rest().starts_with(candidate) {
                return Some((*candidate).to_string());
            }
        }
        let c = self.current()?;
        if SINGLE_CHAR_OPERATORS.contains(c) {
            return Some(c.to_string());
        }
        None
    }

    fn match_number(&self) -> Option<String> {
        let rest = self.rest();
        let mut len = 0;
        let bytes = rest.as_bytes();
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
        if len == 0 {
            return None;
        }
        if len < bytes.len() && bytes[len] == b'.' && len + 1 < bytes.len() && bytes[len + 1].is_ascii_digit()
        {
            len += 1;
            while len < bytes.len() && bytes[len].is_ascii_digit() {
                len += 1;
            }
        }
        Some(rest[..len].to_string())
    }

    /// Matches a double- or single-quoted string literal, including its
    /// delimiters, with backslash-escape support for any `\X` sequence.
    /// Does NOT interpret escapes; that is left to the adapter and the ASM
    /// emitter further down the pipeline.
    fn match_string_literal(&self) -> Option<String> {
        let quote = self.current()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let rest = self.rest();
        let mut chars = rest.char_indices();
        chars.next(); // opening quote
        loop {
            let (idx, c) = chars.next()?;
            if c == '\\' {
                chars.next()?;
            } else if c == quote {
                let end = idx + c.len_utf8();
                return Some(rest[..end].to_string());
            }
        }
    }

    fn error_at_unrecognized<T>(&self, line: usize, column: usize) -> Result<T, LexError> {
        let ch = self.current().unwrap_or('\0');
        let snippet: String = self.rest().chars().take(20).collect();
        Err(LexError {
            message: format!(
                "unexpected character '{}' near \"{}\"",
                ch,
                snippet.replace('\n', "\\n")
            ),
            line,
            column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<RawToken> {
        Lexer::new(src).tokenize().expect("lex should succeed")
    }

    #[test]
    fn skips_line_comments() {
        let toks = lex("int x; // trailing\n");
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn skips_block_comments() {
        let toks = lex("int /* inline */ x;");
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = Lexer::new("/* never closes").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated block comment"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn keyword_precedes_identifier() {
        let toks = lex("return");
        assert_eq!(toks[0].kind, RawKind::Keyword);
        let toks = lex("returner");
        assert_eq!(toks[0].kind, RawKind::Identifier);
    }

    #[test]
    fn multi_char_operator_wins_over_single_char() {
        let toks = lex("<=");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].lexeme, "<=");
    }

    #[test]
    fn number_matches_integer_and_float() {
        let toks = lex("42 3.14");
        assert_eq!(toks[0].lexeme, "42");
        assert_eq!(toks[1].lexeme, "3.14");
    }

    #[test]
    fn string_literal_with_escape() {
        let toks = lex(r#""hi\n""#);
        assert_eq!(toks[0].kind, RawKind::StringLit);
        assert_eq!(toks[0].lexeme, r#""hi\n""#);
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = lex("int\nx;");
        assert_eq!(toks[0].span.line, 1);
        assert_eq!(toks[1].span.line, 2);
        assert_eq!(toks[1].span.column, 1);
    }

    #[test]
    fn unrecognized_character_reports_context() {
        let err = Lexer::new("int x = @bad;").tokenize().unwrap_err();
        assert!(err.message.contains('@'));
    }
}
