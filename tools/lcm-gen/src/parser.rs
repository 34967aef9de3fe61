// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recursive-descent parser for LCM type definition files.
//!
//! ```text
//! file       := package? struct*
//! package    := 'package' ident ('.' ident)* ';'
//! struct     := 'struct' ident '{' (const | member)* '}'
//! const      := 'const' type ident '=' literal (',' ident '=' literal)* ';'
//! member     := typeRef ident array_dims? ';'
//! typeRef    := ident ('.' ident)*
//! array_dims := ('[' (int_literal | ident) ']')+
//! ```

use crate::ast::{
    is_integer_type, is_primitive, ArrayDim, Constant, DimMode, IdlFile, Member, StructDef,
    TypeRef,
};
use crate::error::{CompileError, Result};
use crate::lexer::{tokenize, Token, TokenKind};
use std::path::Path;

/// Parse `source` into an [`IdlFile`].
pub fn parse_string(source: &str, path: &Path) -> Result<IdlFile> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_file(path)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    package: Option<String>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            package: None,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn parse_error(&self, message: String) -> CompileError {
        let token = self.peek();
        CompileError::Parse {
            line: token.line,
            column: token.column,
            message,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.peek().kind != kind {
            return Err(self.parse_error(format!(
                "expected {}, found '{}'",
                what,
                self.peek().text
            )));
        }
        Ok(self.advance())
    }

    fn parse_file(mut self, path: &Path) -> Result<IdlFile> {
        if self.peek().kind == TokenKind::Package {
            self.parse_package()?;
        }

        let mut structs = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            structs.push(self.parse_struct()?);
        }

        Ok(IdlFile {
            path: path.to_path_buf(),
            package: self.package.clone(),
            structs,
        })
    }

    fn parse_package(&mut self) -> Result<()> {
        self.expect(TokenKind::Package, "'package'")?;
        let mut parts = vec![self.expect(TokenKind::Identifier, "package name")?.text];
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            parts.push(self.expect(TokenKind::Identifier, "package name")?.text);
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        self.package = Some(parts.join("."));
        Ok(())
    }

    fn parse_struct(&mut self) -> Result<StructDef> {
        let struct_token = self.expect(TokenKind::Struct, "'struct'")?;
        let name = self.expect(TokenKind::Identifier, "struct name")?;
        self.expect(TokenKind::OpenBrace, "'{'")?;

        let mut def = StructDef {
            name: TypeRef::user(&name.text, self.package.as_deref()),
            members: Vec::new(),
            constants: Vec::new(),
            doc: struct_token.doc,
        };

        loop {
            match self.peek().kind {
                TokenKind::CloseBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Const => self.parse_constants(&mut def)?,
                TokenKind::Identifier => self.parse_member(&mut def)?,
                _ => {
                    return Err(self.parse_error(format!(
                        "expected member, constant, or '}}', found '{}'",
                        self.peek().text
                    )))
                }
            }
        }

        Ok(def)
    }

    /// `const type a = v, b = v2;` declares one constant per identifier.
    fn parse_constants(&mut self, def: &mut StructDef) -> Result<()> {
        let const_token = self.expect(TokenKind::Const, "'const'")?;
        let ty = self.expect(TokenKind::Identifier, "constant type")?;
        if !is_primitive(&ty.text) || ty.text == "string" || ty.text == "boolean" {
            return Err(self.parse_error(format!(
                "constants must have a numeric primitive type, found '{}'",
                ty.text
            )));
        }

        let mut doc = const_token.doc;
        loop {
            let name = self.expect(TokenKind::Identifier, "constant name")?;
            self.expect(TokenKind::Equals, "'='")?;
            let value = self.parse_literal(&ty.text)?;
            def.constants.push(Constant {
                ty: ty.text.clone(),
                name: name.text,
                value,
                doc: doc.take(),
            });

            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Semicolon => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    return Err(self.parse_error(format!(
                        "expected ',' or ';', found '{}'",
                        self.peek().text
                    )))
                }
            }
        }
    }

    /// Parse and range-check a literal against the declared constant type.
    fn parse_literal(&mut self, ty: &str) -> Result<String> {
        let token = self.advance();
        match token.kind {
            TokenKind::IntLiteral => {
                let value: i64 = token.text.parse().map_err(|_| {
                    self.parse_error(format!("invalid integer literal '{}'", token.text))
                })?;
                if is_integer_type(ty) && !integer_fits(ty, value) {
                    return Err(
                        self.parse_error(format!("literal {} out of range for {}", value, ty))
                    );
                }
                Ok(token.text)
            }
            TokenKind::HexLiteral => {
                if !is_integer_type(ty) {
                    return Err(self.parse_error(format!(
                        "hex literal '{}' requires an integer type",
                        token.text
                    )));
                }
                let digits = token
                    .text
                    .get(2..)
                    .ok_or_else(|| self.parse_error("malformed hex literal".to_string()))?;
                let value = u64::from_str_radix(digits, 16).map_err(|_| {
                    self.parse_error(format!("invalid hex literal '{}'", token.text))
                })?;
                if !hex_fits(ty, value) {
                    return Err(self.parse_error(format!(
                        "literal {} out of range for {}",
                        token.text, ty
                    )));
                }
                Ok(token.text)
            }
            TokenKind::FloatLiteral => {
                if is_integer_type(ty) {
                    return Err(self.parse_error(format!(
                        "float literal '{}' not valid for {}",
                        token.text, ty
                    )));
                }
                Ok(token.text)
            }
            _ => Err(self.parse_error(format!("expected literal, found '{}'", token.text))),
        }
    }

    fn parse_member(&mut self, def: &mut StructDef) -> Result<()> {
        let first = self.expect(TokenKind::Identifier, "type name")?;
        let doc = first.doc.clone();
        let ty = self.parse_type_ref(first)?;
        let name = self.expect(TokenKind::Identifier, "member name")?;

        let mut dims = Vec::new();
        while self.peek().kind == TokenKind::OpenBracket {
            self.advance();
            dims.push(self.parse_dimension(def)?);
            self.expect(TokenKind::CloseBracket, "']'")?;
        }
        self.expect(TokenKind::Semicolon, "';'")?;

        def.members.push(Member {
            ty,
            name: name.text,
            dims,
            doc,
        });
        Ok(())
    }

    /// Resolve one array dimension against the declarations parsed so far.
    fn parse_dimension(&mut self, def: &StructDef) -> Result<ArrayDim> {
        let token = self.advance();
        match token.kind {
            TokenKind::IntLiteral => {
                let value: i64 = token.text.parse().map_err(|_| {
                    self.parse_error(format!("invalid array size '{}'", token.text))
                })?;
                Ok(ArrayDim {
                    mode: DimMode::Const,
                    size: token.text,
                    resolved: u64::try_from(value).ok().filter(|&v| v > 0),
                })
            }
            TokenKind::Identifier => {
                // A previously declared integer constant: substitute its
                // value text, the way the original generator does.
                if let Some(constant) = def
                    .constants
                    .iter()
                    .find(|c| c.name == token.text && is_integer_type(&c.ty))
                {
                    let resolved = parse_constant_value(&constant.value);
                    return Ok(ArrayDim {
                        mode: DimMode::Const,
                        size: constant.value.clone(),
                        resolved,
                    });
                }
                // A previously declared member: variable dimension.
                if def.members.iter().any(|m| m.name == token.text) {
                    return Ok(ArrayDim {
                        mode: DimMode::Var,
                        size: token.text,
                        resolved: None,
                    });
                }
                // Neither: symbolic constant, kept for fingerprinting.
                Ok(ArrayDim {
                    mode: DimMode::Const,
                    size: token.text,
                    resolved: None,
                })
            }
            _ => Err(self.parse_error(format!(
                "expected array size, found '{}'",
                token.text
            ))),
        }
    }

    fn parse_type_ref(&mut self, first: Token) -> Result<TypeRef> {
        if self.peek().kind != TokenKind::Dot {
            if is_primitive(&first.text) {
                return Ok(TypeRef::primitive(&first.text));
            }
            // Unqualified user type: adopt the enclosing package.
            return Ok(TypeRef::user(&first.text, self.package.as_deref()));
        }

        let mut parts = vec![first.text];
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            parts.push(self.expect(TokenKind::Identifier, "type name")?.text);
        }
        let short = parts.last().cloned().unwrap_or_default();
        let package = parts[..parts.len() - 1].join(".");
        Ok(TypeRef::user(&short, Some(&package)))
    }
}

fn integer_fits(ty: &str, value: i64) -> bool {
    match ty {
        "int8_t" => i8::try_from(value).is_ok(),
        "int16_t" => i16::try_from(value).is_ok(),
        "int32_t" => i32::try_from(value).is_ok(),
        "byte" => u8::try_from(value).is_ok(),
        _ => true,
    }
}

fn hex_fits(ty: &str, value: u64) -> bool {
    match ty {
        "int8_t" | "byte" => value <= 0xFF,
        "int16_t" => value <= 0xFFFF,
        "int32_t" => value <= 0xFFFF_FFFF,
        _ => true,
    }
}

fn parse_constant_value(text: &str) -> Option<u64> {
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(digits, 16).ok().filter(|&v| v > 0);
    }
    text.parse::<u64>().ok().filter(|&v| v > 0)
}
