// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rust backend: one generated `.rs` file per struct.
//!
//! Generated types derive structural equality, expose their declared
//! constants, and implement `lcm::LcmMessage` with the statically computed
//! fingerprint. Constant array dimensions map to `[T; N]`, variable
//! dimensions to `Vec<T>`.

use crate::ast::{is_integer_type, ArrayDim, DimMode, IdlFile, Member, StructDef, TypeRef};
use crate::error::{CompileError, Result};
use crate::fingerprint::{fingerprint, TypeRegistry};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Output configuration for the Rust backend.
#[derive(Debug, Clone)]
pub struct RustBackendOptions {
    /// Destination directory; package names become subdirectories.
    pub out_dir: PathBuf,
    /// Create the package directory tree automatically.
    pub make_dirs: bool,
}

impl Default for RustBackendOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            make_dirs: true,
        }
    }
}

/// Generate Rust sources for every struct in `file`.
///
/// Returns the paths written. A struct whose output is already newer than
/// its IDL source is skipped, the way the original tool avoids needless
/// regeneration.
pub fn emit_file(
    file: &IdlFile,
    registry: &TypeRegistry<'_>,
    opts: &RustBackendOptions,
) -> Result<Vec<PathBuf>> {
    validate(file, registry)?;

    let mut written = Vec::new();
    for def in &file.structs {
        let path = struct_output_path(&opts.out_dir, def);
        if opts.make_dirs {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        if !needs_generation(&file.path, &path) {
            continue;
        }
        let source = emit_struct(def, registry)?;
        fs::write(&path, source)?;
        written.push(path);
    }

    // Always refresh the package module file so the emitted tree is usable
    // as a Rust module tree.
    if !file.structs.is_empty() {
        written.push(emit_package_mod(file.package.as_deref(), registry, opts)?);
    }

    Ok(written)
}

fn struct_output_path(out_dir: &Path, def: &StructDef) -> PathBuf {
    let mut path = out_dir.to_path_buf();
    if let Some(package) = &def.name.package {
        for part in package.split('.') {
            path.push(part);
        }
    }
    path.push(format!("{}.rs", def.name.short_name));
    path
}

/// Regeneration check: skip when the output is newer than the source.
fn needs_generation(source: &Path, output: &Path) -> bool {
    let source_time = fs::metadata(source).and_then(|m| m.modified());
    let output_time = fs::metadata(output).and_then(|m| m.modified());
    match (source_time, output_time) {
        (Ok(source_time), Ok(output_time)) => source_time > output_time,
        _ => true,
    }
}

fn emit_package_mod(
    package: Option<&str>,
    registry: &TypeRegistry<'_>,
    opts: &RustBackendOptions,
) -> Result<PathBuf> {
    let mut dir = opts.out_dir.clone();
    if let Some(package) = package {
        for part in package.split('.') {
            dir.push(part);
        }
    }
    let path = dir.join("mod.rs");

    let mut out = String::new();
    out.push_str(FILE_BANNER);
    for def in registry.structs_in_package(package) {
        let _ = writeln!(out, "pub mod {};", def.name.short_name);
        let _ = writeln!(
            out,
            "pub use {}::{};",
            def.name.short_name,
            pascal_case(&def.name.short_name)
        );
    }
    fs::write(&path, out)?;
    Ok(path)
}

/// Post-parse validation: every const dimension resolved positive, every
/// var dimension referring to an earlier scalar integer member, every user
/// type present in the registry.
fn validate(file: &IdlFile, registry: &TypeRegistry<'_>) -> Result<()> {
    for def in &file.structs {
        for (index, member) in def.members.iter().enumerate() {
            if !member.ty.is_primitive() && registry.get(&member.ty.full_name).is_none() {
                return Err(CompileError::Semantic {
                    message: format!(
                        "unresolved type '{}' referenced by '{}.{}'",
                        member.ty.full_name, def.name.full_name, member.name
                    ),
                });
            }
            for dim in &member.dims {
                match dim.mode {
                    DimMode::Const => {
                        if dim.resolved.is_none() {
                            return Err(CompileError::Semantic {
                                message: format!(
                                    "array dimension '{}' of '{}.{}' does not resolve to a positive integer",
                                    dim.size, def.name.full_name, member.name
                                ),
                            });
                        }
                    }
                    DimMode::Var => {
                        let source = def.members[..index].iter().find(|m| m.name == dim.size);
                        let valid = source.is_some_and(|m| {
                            m.dims.is_empty() && is_integer_type(&m.ty.full_name)
                        });
                        if !valid {
                            return Err(CompileError::Semantic {
                                message: format!(
                                    "variable dimension '{}' of '{}.{}' must name an earlier scalar integer member",
                                    dim.size, def.name.full_name, member.name
                                ),
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

const FILE_BANNER: &str = "\
// LCM type definitions
// This file automatically generated by lcm-gen.
// DO NOT MODIFY BY HAND!!!!

";

/// Render the complete generated source for one struct.
pub fn emit_struct(def: &StructDef, registry: &TypeRegistry<'_>) -> Result<String> {
    let type_name = pascal_case(&def.name.short_name);
    let fp = fingerprint(def, registry)?;
    let current_package = def.name.package.as_deref();

    let mut out = String::new();
    out.push_str(FILE_BANNER);
    out.push_str("use lcm::{DecodeBuffer, EncodeBuffer, Error, LcmMessage, Result};\n\n");

    // Struct declaration
    emit_doc(&mut out, 0, def.doc.as_deref());
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    let _ = writeln!(out, "pub struct {} {{", type_name);
    for member in &def.members {
        emit_doc(&mut out, 1, member.doc.as_deref());
        let _ = writeln!(
            out,
            "    pub {}: {},",
            member.name,
            rust_type(member, current_package)
        );
    }
    out.push_str("}\n\n");

    // Inherent impl: constants and the all-members constructor
    let _ = writeln!(out, "impl {} {{", type_name);
    for constant in &def.constants {
        emit_doc(&mut out, 1, constant.doc.as_deref());
        let _ = writeln!(
            out,
            "    pub const {}: {} = {};",
            constant.name,
            rust_primitive(&constant.ty),
            constant_value(constant)
        );
    }
    if !def.constants.is_empty() {
        out.push('\n');
    }
    let params: Vec<String> = def
        .members
        .iter()
        .map(|m| format!("{}: {}", m.name, rust_type(m, current_package)))
        .collect();
    let names: Vec<&str> = def.members.iter().map(|m| m.name.as_str()).collect();
    let _ = writeln!(out, "    pub fn new({}) -> Self {{", params.join(", "));
    if names.is_empty() {
        out.push_str("        Self {}\n");
    } else {
        let _ = writeln!(out, "        Self {{ {} }}", names.join(", "));
    }
    out.push_str("    }\n}\n\n");

    // LcmMessage impl
    let _ = writeln!(out, "impl LcmMessage for {} {{", type_name);
    let _ = writeln!(out, "    const FINGERPRINT: i64 = 0x{:016x}_u64 as i64;\n", fp);

    out.push_str("    fn encode(&self, buf: &mut EncodeBuffer) -> Result<()> {\n");
    out.push_str("        buf.write_i64(Self::FINGERPRINT);\n");
    for member in &def.members {
        emit_encode_member(&mut out, member);
    }
    out.push_str("        Ok(())\n    }\n\n");

    out.push_str("    fn decode(buf: &mut DecodeBuffer<'_>) -> Result<Self> {\n");
    out.push_str("        let fingerprint = buf.read_i64()?;\n");
    out.push_str("        if fingerprint != Self::FINGERPRINT {\n");
    out.push_str("            return Err(Error::FingerprintMismatch {\n");
    out.push_str("                expected: Self::FINGERPRINT,\n");
    out.push_str("                found: fingerprint,\n");
    out.push_str("            });\n");
    out.push_str("        }\n");
    for member in &def.members {
        let expr = decode_expr(&member.ty, &member.dims, 2, current_package);
        let _ = writeln!(out, "        let {} = {};", member.name, expr);
    }
    if names.is_empty() {
        out.push_str("        Ok(Self {})\n");
    } else {
        let _ = writeln!(out, "        Ok(Self {{ {} }})", names.join(", "));
    }
    out.push_str("    }\n}\n");

    Ok(out)
}

fn emit_doc(out: &mut String, indent: usize, doc: Option<&str>) {
    let Some(doc) = doc else { return };
    for line in doc.lines() {
        let pad = "    ".repeat(indent);
        if line.is_empty() {
            let _ = writeln!(out, "{}///", pad);
        } else {
            let _ = writeln!(out, "{}/// {}", pad, line);
        }
    }
}

/// Convert snake_case to PascalCase (e.g. `vector3f_t` -> `Vector3fT`).
pub fn pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

fn rust_primitive(name: &str) -> &'static str {
    match name {
        "int8_t" => "i8",
        "int16_t" => "i16",
        "int32_t" => "i32",
        "int64_t" => "i64",
        "byte" => "u8",
        "float" => "f32",
        "double" => "f64",
        "string" => "String",
        "boolean" => "bool",
        other => unreachable!("not a primitive type: {}", other),
    }
}

/// Module path of a generated user type as seen from another generated
/// file: siblings via `super::`, other packages from the emitted tree root.
fn user_type_path(ty: &TypeRef, current_package: Option<&str>) -> String {
    let type_name = pascal_case(&ty.short_name);
    if ty.package.as_deref() == current_package || ty.package.is_none() {
        return format!("super::{}::{}", ty.short_name, type_name);
    }
    let mut path = String::from("crate");
    if let Some(package) = &ty.package {
        for part in package.split('.') {
            let _ = write!(path, "::{}", part);
        }
    }
    let _ = write!(path, "::{}::{}", ty.short_name, type_name);
    path
}

fn element_type(ty: &TypeRef, current_package: Option<&str>) -> String {
    if ty.is_primitive() {
        rust_primitive(&ty.full_name).to_string()
    } else {
        user_type_path(ty, current_package)
    }
}

/// Rust type of a member: the element type wrapped once per dimension,
/// `[T; N]` for constants and `Vec<T>` for variables, outermost first.
fn rust_type(member: &Member, current_package: Option<&str>) -> String {
    let mut ty = element_type(&member.ty, current_package);
    for dim in member.dims.iter().rev() {
        ty = match (dim.mode, dim.resolved) {
            (DimMode::Const, Some(n)) => format!("[{}; {}]", ty, n),
            _ => format!("Vec<{}>", ty),
        };
    }
    ty
}

fn encode_stmt(ty: &TypeRef, accessor: &str) -> String {
    if !ty.is_primitive() {
        return format!("{}.encode(buf)?;", accessor);
    }
    match ty.full_name.as_str() {
        "byte" => format!("buf.write_u8({});", accessor),
        "int8_t" => format!("buf.write_i8({});", accessor),
        "int16_t" => format!("buf.write_i16({});", accessor),
        "int32_t" => format!("buf.write_i32({});", accessor),
        "int64_t" => format!("buf.write_i64({});", accessor),
        "float" => format!("buf.write_f32({});", accessor),
        "double" => format!("buf.write_f64({});", accessor),
        "string" => format!("buf.write_string(&{})?;", accessor),
        "boolean" => format!("buf.write_bool({});", accessor),
        other => unreachable!("not a primitive type: {}", other),
    }
}

/// Emit the encode statements for one member: row-major loops over every
/// dimension, sizes never written (variable sizes travel in the member
/// they refer to).
fn emit_encode_member(out: &mut String, member: &Member) {
    if member.dims.is_empty() {
        let _ = writeln!(
            out,
            "        {}",
            encode_stmt(&member.ty, &format!("self.{}", member.name))
        );
        return;
    }

    let mut accessor = format!("self.{}", member.name);
    for (level, dim) in member.dims.iter().enumerate() {
        let pad = "    ".repeat(2 + level);
        let bound = match (dim.mode, dim.resolved) {
            (DimMode::Const, Some(n)) => format!("{}usize", n),
            _ => format!("(self.{}.max(0) as usize)", dim.size),
        };
        let _ = writeln!(out, "{}for i{} in 0..{} {{", pad, level, bound);
        let _ = write!(accessor, "[i{}]", level);
    }

    let pad = "    ".repeat(2 + member.dims.len());
    let _ = writeln!(out, "{}{}", pad, encode_stmt(&member.ty, &accessor));

    for level in (0..member.dims.len()).rev() {
        let _ = writeln!(out, "{}}}", "    ".repeat(2 + level));
    }
}

fn scalar_decode_expr(ty: &TypeRef, current_package: Option<&str>) -> String {
    if !ty.is_primitive() {
        return format!("{}::decode(buf)?", user_type_path(ty, current_package));
    }
    match ty.full_name.as_str() {
        "byte" => "buf.read_u8()?".to_string(),
        "int8_t" => "buf.read_i8()?".to_string(),
        "int16_t" => "buf.read_i16()?".to_string(),
        "int32_t" => "buf.read_i32()?".to_string(),
        "int64_t" => "buf.read_i64()?".to_string(),
        "float" => "buf.read_f32()?".to_string(),
        "double" => "buf.read_f64()?".to_string(),
        "string" => "buf.read_string()?".to_string(),
        "boolean" => "buf.read_bool()?".to_string(),
        other => unreachable!("not a primitive type: {}", other),
    }
}

/// Decode expression for a member with `dims` remaining dimensions.
///
/// Constant dimensions build fixed arrays through `lcm::array_from_fn`;
/// variable dimensions read the earlier-decoded count member (in scope as
/// a local of the same name).
fn decode_expr(
    ty: &TypeRef,
    dims: &[ArrayDim],
    indent: usize,
    current_package: Option<&str>,
) -> String {
    let Some((dim, rest)) = dims.split_first() else {
        return scalar_decode_expr(ty, current_package);
    };

    match (dim.mode, dim.resolved) {
        (DimMode::Const, Some(n)) => {
            let inner = decode_expr(ty, rest, indent, current_package);
            format!("lcm::array_from_fn::<_, {}>(|| Ok({}))?", n, inner)
        }
        _ => {
            let inner = decode_expr(ty, rest, indent + 2, current_package);
            let pad = "    ".repeat(indent);
            let body = "    ".repeat(indent + 1);
            let nested = "    ".repeat(indent + 2);
            format!(
                "{{\n{body}let mut items = Vec::new();\n{body}for _ in 0..({size}.max(0) as usize) {{\n{nested}items.push({inner});\n{body}}}\n{body}items\n{pad}}}",
                body = body,
                nested = nested,
                pad = pad,
                size = dim.size,
                inner = inner,
            )
        }
    }
}

fn constant_value(constant: &crate::ast::Constant) -> String {
    let is_float_type = matches!(constant.ty.as_str(), "float" | "double");
    if is_float_type && !constant.value.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return format!("{}.0", constant.value);
    }
    constant.value.clone()
}
