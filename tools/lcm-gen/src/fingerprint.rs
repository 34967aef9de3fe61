// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic 64-bit type fingerprints.
//!
//! The fingerprint must agree bit-for-bit with the LCM implementations in
//! other host languages. Two shift behaviors are load-bearing: the byte
//! mixer uses a signed arithmetic right shift, while the final one-bit
//! rotation is unsigned. Substituting either changes fingerprints for some
//! inputs and breaks cross-language interop.

use crate::ast::{DimMode, IdlFile, StructDef};
use crate::error::{CompileError, Result};
use std::collections::{HashMap, HashSet};

/// Hash accumulator seed.
const HASH_SEED: i64 = 0x1234_5678;

/// Mix one byte-sized value into the accumulator.
///
/// `v >> 55` is an arithmetic shift of the signed value; the add wraps.
pub fn mix_byte(v: i64, c: i64) -> i64 {
    ((v << 8) ^ (v >> 55)).wrapping_add(c)
}

/// Mix a string: its length, then each UTF-16 code unit in order.
pub fn mix_string(v: i64, s: &str) -> i64 {
    let len = s.encode_utf16().count();
    let mut v = mix_byte(v, len as i64);
    for unit in s.encode_utf16() {
        v = mix_byte(v, i64::from(unit));
    }
    v
}

/// Base hash of one struct: members in declaration order, each mixing its
/// name, its primitive type name (user types contribute transitively
/// instead), its dimension count, and per dimension the mode byte and the
/// size expression text.
pub fn base_hash(def: &StructDef) -> i64 {
    let mut v = HASH_SEED;
    for member in &def.members {
        v = mix_string(v, &member.name);
        if member.ty.is_primitive() {
            v = mix_string(v, &member.ty.full_name);
        }
        v = mix_byte(v, member.dims.len() as i64);
        for dim in &member.dims {
            let mode = match dim.mode {
                DimMode::Const => 0,
                DimMode::Var => 1,
            };
            v = mix_byte(v, mode);
            v = mix_string(v, &dim.size);
        }
    }
    v
}

/// Final transformation from a fully-mixed hash to the emitted
/// fingerprint: a one-bit rotation left in unsigned arithmetic.
pub fn rotate(hash: u64) -> u64 {
    hash.rotate_left(1)
}

/// All structs known to one generator invocation, indexed by full dotted
/// name. Fingerprints of structs that contain user types resolve against
/// this registry.
pub struct TypeRegistry<'a> {
    by_name: HashMap<&'a str, &'a StructDef>,
}

impl<'a> TypeRegistry<'a> {
    pub fn new(files: &'a [IdlFile]) -> Self {
        let mut by_name = HashMap::new();
        for file in files {
            for def in &file.structs {
                by_name.insert(def.name.full_name.as_str(), def);
            }
        }
        Self { by_name }
    }

    pub fn get(&self, full_name: &str) -> Option<&'a StructDef> {
        self.by_name.get(full_name).copied()
    }

    pub fn structs_in_package(&self, package: Option<&str>) -> Vec<&'a StructDef> {
        let mut defs: Vec<&StructDef> = self
            .by_name
            .values()
            .filter(|d| d.name.package.as_deref() == package)
            .copied()
            .collect();
        defs.sort_by(|a, b| a.name.short_name.cmp(&b.name.short_name));
        defs
    }
}

/// Compute the emitted fingerprint of `def`.
///
/// The fully-mixed hash is the struct's base hash plus (mod 2^64) the base
/// hash of every distinct user-defined type it transitively contains. The
/// set is structural: each type counts once, and cycles terminate.
///
/// # Errors
///
/// Returns a semantic error when a referenced user type is not present in
/// the registry.
pub fn fingerprint(def: &StructDef, registry: &TypeRegistry<'_>) -> Result<u64> {
    let mut hash = base_hash(def) as u64;

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(&def.name.full_name);
    let mut stack: Vec<&str> = def.user_type_refs().map(|t| t.full_name.as_str()).collect();

    while let Some(full_name) = stack.pop() {
        if !visited.insert(full_name) {
            continue;
        }
        let nested = registry.get(full_name).ok_or_else(|| CompileError::Semantic {
            message: format!(
                "unresolved type '{}' referenced by '{}'",
                full_name, def.name.full_name
            ),
        })?;
        hash = hash.wrapping_add(base_hash(nested) as u64);
        stack.extend(nested.user_type_refs().map(|t| t.full_name.as_str()));
    }

    Ok(rotate(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;
    use std::path::PathBuf;

    fn parse(source: &str) -> IdlFile {
        parse_string(source, &PathBuf::from("test.lcm")).expect("Parse should succeed")
    }

    #[test]
    fn test_point_reference_vector() {
        let files = vec![parse(
            "package p;\nstruct point_t { double x; double y; double z; }",
        )];
        let registry = TypeRegistry::new(&files);
        let fp =
            fingerprint(&files[0].structs[0], &registry).expect("Fingerprint should succeed");
        assert_eq!(fp, 0xae7e_5fba_5eec_a11e);
    }

    #[test]
    fn test_rotation_is_unsigned() {
        // With a set high bit, an arithmetic rotation would smear sign bits.
        assert_eq!(rotate(0x8000_0000_0000_0000), 0x0000_0000_0000_0001);
        assert_eq!(rotate(0x0000_0000_0000_0001), 0x0000_0000_0000_0002);
    }

    #[test]
    fn test_mix_byte_uses_arithmetic_shift() {
        // A negative accumulator must shift in ones from the left.
        let v = -1i64;
        assert_eq!(v >> 55, -1);
        assert_eq!(mix_byte(v, 0), (-256i64) ^ (-1i64));
    }

    #[test]
    fn test_package_does_not_affect_hash() {
        // Only member structure is mixed, so the same struct body hashes
        // identically in any package.
        let a = parse("package p;\nstruct s_t { int32_t v; }");
        let b = parse("package q.deep;\nstruct s_t { int32_t v; }");
        assert_eq!(base_hash(&a.structs[0]), base_hash(&b.structs[0]));
    }

    #[test]
    fn test_member_name_and_type_affect_hash() {
        let a = parse("struct s_t { int32_t v; }");
        let b = parse("struct s_t { int32_t w; }");
        let c = parse("struct s_t { int16_t v; }");
        assert_ne!(base_hash(&a.structs[0]), base_hash(&b.structs[0]));
        assert_ne!(base_hash(&a.structs[0]), base_hash(&c.structs[0]));
    }

    #[test]
    fn test_dimension_mode_affects_hash() {
        // `n` resolves to a member in one case and stays symbolic in the
        // other; mode bytes 1 vs 0 must produce different hashes.
        let var = parse("struct s_t { int32_t n; int8_t d[n]; }");
        let symbolic = parse("struct s_t { int32_t n; int8_t d[m]; }");
        assert_ne!(base_hash(&var.structs[0]), base_hash(&symbolic.structs[0]));
    }

    #[test]
    fn test_nested_types_fold_transitively() {
        let files = vec![parse(
            "package p;\nstruct inner_t { double v; }\nstruct outer_t { inner_t child; }",
        )];
        let registry = TypeRegistry::new(&files);
        let inner = &files[0].structs[0];
        let outer = &files[0].structs[1];

        let expected = rotate((base_hash(outer) as u64).wrapping_add(base_hash(inner) as u64));
        let fp = fingerprint(outer, &registry).expect("Fingerprint should succeed");
        assert_eq!(fp, expected);

        // The nested type's name is not mixed directly; only its structure
        // contributes.
        let renamed = parse("package p;\nstruct inner_t { double v; }\nstruct outer_t { inner_t kid; }");
        assert_ne!(base_hash(outer), base_hash(&renamed.structs[1]));
    }

    #[test]
    fn test_shared_nested_type_counted_once() {
        let files = vec![parse(
            "package p;\n\
             struct leaf_t { double v; }\n\
             struct mid_t { leaf_t l; }\n\
             struct top_t { mid_t m; leaf_t l; }",
        )];
        let registry = TypeRegistry::new(&files);
        let leaf = &files[0].structs[0];
        let mid = &files[0].structs[1];
        let top = &files[0].structs[2];

        let expected = rotate(
            (base_hash(top) as u64)
                .wrapping_add(base_hash(mid) as u64)
                .wrapping_add(base_hash(leaf) as u64),
        );
        let fp = fingerprint(top, &registry).expect("Fingerprint should succeed");
        assert_eq!(fp, expected);
    }

    #[test]
    fn test_unresolved_type_is_semantic_error() {
        let files = vec![parse("package p;\nstruct outer_t { missing_t child; }")];
        let registry = TypeRegistry::new(&files);
        let err = fingerprint(&files[0].structs[0], &registry).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }
}
