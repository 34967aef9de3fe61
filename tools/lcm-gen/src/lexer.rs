// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tokenizer for the LCM type definition language.
//!
//! Whitespace and `//` / `/* */` comments are skipped. `///` doc comment
//! lines accumulate and attach to the next real token.

use crate::error::{CompileError, Result};

/// Token classification. Keywords are recognized after identifier scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Package,
    Struct,
    Const,
    Semicolon,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Equals,
    Dot,
    Identifier,
    IntLiteral,
    HexLiteral,
    FloatLiteral,
    Eof,
}

/// One lexed token with its source text and 1-based position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    /// Accumulated `///` doc comment lines preceding this token.
    pub doc: Option<String>,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    pending_doc: Vec<String>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            pending_doc: Vec::new(),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next()?;
        chars.next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn lex_error(&self, message: String) -> CompileError {
        CompileError::Lex {
            line: self.line,
            column: self.column,
            message,
        }
    }

    /// Skip whitespace and comments, accumulating `///` doc lines.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.next_char();
                }
                Some('/') => match self.peek_second() {
                    Some('/') => {
                        self.next_char();
                        self.next_char();
                        if self.peek_char() == Some('/') {
                            self.next_char();
                            self.read_doc_line();
                        } else {
                            self.skip_line();
                        }
                    }
                    Some('*') => {
                        self.next_char();
                        self.next_char();
                        self.skip_block_comment()?;
                    }
                    _ => return Err(self.lex_error("unrecognized character '/'".to_string())),
                },
                _ => return Ok(()),
            }
        }
    }

    fn read_doc_line(&mut self) {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.next_char();
        }
        let text = &self.input[start..self.pos];
        let line = text.strip_prefix(' ').unwrap_or(text).to_string();
        self.pending_doc.push(line);
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.next_char();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            match self.next_char() {
                Some('*') if self.peek_char() == Some('/') => {
                    self.next_char();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.lex_error("unterminated block comment".to_string())),
            }
        }
    }

    fn take_doc(&mut self) -> Option<String> {
        if self.pending_doc.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending_doc).join("\n"))
    }

    fn make_token(&mut self, kind: TokenKind, text: String, line: u32, column: u32) -> Token {
        Token {
            kind,
            text,
            line,
            column,
            doc: self.take_doc(),
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Scan a numeric literal: decimal integer, `0x` hex, or float with an
    /// optional fraction and exponent. A leading `-` must already have been
    /// validated to precede a digit.
    fn read_number(&mut self) -> Result<(TokenKind, String)> {
        let start = self.pos;

        if self.peek_char() == Some('-') {
            self.next_char();
        }

        if self.peek_char() == Some('0') && matches!(self.peek_second(), Some('x') | Some('X')) {
            self.next_char();
            self.next_char();
            let digits_start = self.pos;
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_hexdigit() {
                    self.next_char();
                } else {
                    break;
                }
            }
            if self.pos == digits_start {
                return Err(self.lex_error("malformed hex literal".to_string()));
            }
            return Ok((TokenKind::HexLiteral, self.input[start..self.pos].to_string()));
        }

        let mut is_float = false;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.next_char();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            is_float = true;
            self.next_char();
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_digit() {
                    self.next_char();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            is_float = true;
            self.next_char();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.next_char();
            }
            let exp_start = self.pos;
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_digit() {
                    self.next_char();
                } else {
                    break;
                }
            }
            if self.pos == exp_start {
                return Err(self.lex_error("malformed float exponent".to_string()));
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        Ok((kind, self.input[start..self.pos].to_string()))
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let line = self.line;
        let column = self.column;

        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof, String::new(), line, column)),
        };

        // Punctuation
        let punct = match ch {
            ';' => Some(TokenKind::Semicolon),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            ',' => Some(TokenKind::Comma),
            '=' => Some(TokenKind::Equals),
            '.' => Some(TokenKind::Dot),
            _ => None,
        };
        if let Some(kind) = punct {
            self.next_char();
            return Ok(self.make_token(kind, ch.to_string(), line, column));
        }

        // Signed or unsigned numeric literal
        if ch.is_ascii_digit()
            || (ch == '-' && self.peek_second().is_some_and(|c| c.is_ascii_digit()))
        {
            let (kind, text) = self.read_number()?;
            return Ok(self.make_token(kind, text, line, column));
        }

        // Identifier or keyword
        if ch.is_ascii_alphabetic() || ch == '_' {
            let ident = self.read_identifier();
            let kind = match ident.as_str() {
                "package" => TokenKind::Package,
                "struct" => TokenKind::Struct,
                "const" => TokenKind::Const,
                _ => TokenKind::Identifier,
            };
            return Ok(self.make_token(kind, ident, line, column));
        }

        Err(self.lex_error(format!("unrecognized character '{}'", ch)))
    }
}

/// Tokenize `source` into a stream terminated by an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("Tokenize should succeed")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_struct_tokens() {
        assert_eq!(
            kinds("struct point_t { double x; }"),
            vec![
                TokenKind::Struct,
                TokenKind::Identifier,
                TokenKind::OpenBrace,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::CloseBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_package_and_dots() {
        assert_eq!(
            kinds("package exlcm.nav;"),
            vec![
                TokenKind::Package,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = tokenize("3 -42 0x1F 0XAB 1.5 -2.25 1e9 2.5e-3").expect("Tokenize should succeed");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::HexLiteral,
                TokenKind::HexLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "-42");
        assert_eq!(tokens[2].text, "0x1F");
        assert_eq!(tokens[7].text, "2.5e-3");
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("// line\nstruct /* block\nspanning */ a {}"),
            vec![
                TokenKind::Struct,
                TokenKind::Identifier,
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_doc_comment_attaches_to_next_token() {
        let tokens = tokenize("/// The position.\n/// In meters.\nstruct pose_t {}")
            .expect("Tokenize should succeed");
        assert_eq!(tokens[0].kind, TokenKind::Struct);
        assert_eq!(
            tokens[0].doc.as_deref(),
            Some("The position.\nIn meters.")
        );
        // Cleared after attachment.
        assert_eq!(tokens[1].doc, None);
    }

    #[test]
    fn test_lex_error_reports_position() {
        let err = tokenize("struct a {\n  @bad\n}").unwrap_err();
        match err {
            CompileError::Lex { line, column, message } => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
                assert!(message.contains('@'));
            }
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize("struct a {} /* dangling").is_err());
    }

    #[test]
    fn test_minus_without_digit_rejected() {
        assert!(tokenize("- x").is_err());
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(tokenize("0x").is_err());
    }
}
