// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end tests of the IDL -> Rust pipeline.

use lcm_gen::emit::{emit_file, emit_struct, RustBackendOptions};
use lcm_gen::fingerprint::{fingerprint, rotate, TypeRegistry};
use lcm_gen::parser::parse_string;
use std::path::PathBuf;

const POINT_IDL: &str = "package p;\nstruct point_t { double x; double y; double z; }";

#[test]
fn test_point_fingerprint_matches_reference() {
    let files = vec![parse_string(POINT_IDL, &PathBuf::from("point_t.lcm"))
        .expect("Parse should succeed")];
    let registry = TypeRegistry::new(&files);
    let fp = fingerprint(&files[0].structs[0], &registry).expect("Fingerprint should succeed");
    assert_eq!(fp, 0xae7e_5fba_5eec_a11e);
}

#[test]
fn test_rotation_uses_unsigned_shift() {
    assert_eq!(rotate(0x8000_0000_0000_0000), 0x0000_0000_0000_0001);
}

#[test]
fn test_generated_tree_layout() {
    let dir = tempfile::tempdir().expect("Tempdir should succeed");
    let idl_path = dir.path().join("point_t.lcm");
    std::fs::write(&idl_path, POINT_IDL).expect("Write should succeed");

    let source = std::fs::read_to_string(&idl_path).expect("Read should succeed");
    let files = vec![parse_string(&source, &idl_path).expect("Parse should succeed")];
    let registry = TypeRegistry::new(&files);
    let opts = RustBackendOptions {
        out_dir: dir.path().to_path_buf(),
        make_dirs: true,
    };

    emit_file(&files[0], &registry, &opts).expect("Emit should succeed");

    let generated = std::fs::read_to_string(dir.path().join("p/point_t.rs"))
        .expect("Generated file should exist");
    assert!(generated.contains("This file automatically generated by lcm-gen."));
    assert!(generated.contains("pub struct PointT {"));
    assert!(generated.contains("const FINGERPRINT: i64 = 0xae7e5fba5eeca11e_u64 as i64;"));

    let module = std::fs::read_to_string(dir.path().join("p/mod.rs"))
        .expect("Module file should exist");
    assert!(module.contains("pub mod point_t;"));
}

#[test]
fn test_cross_file_nested_types_resolve() {
    let inner = parse_string(
        "package nav;\nstruct vec_t { double v[3]; }",
        &PathBuf::from("vec_t.lcm"),
    )
    .expect("Parse should succeed");
    let outer = parse_string(
        "package nav;\nstruct pose_t { vec_t position; vec_t velocity; }",
        &PathBuf::from("pose_t.lcm"),
    )
    .expect("Parse should succeed");

    let files = vec![inner, outer];
    let registry = TypeRegistry::new(&files);

    let fp_outer =
        fingerprint(&files[1].structs[0], &registry).expect("Fingerprint should succeed");
    let fp_inner =
        fingerprint(&files[0].structs[0], &registry).expect("Fingerprint should succeed");
    assert_ne!(fp_outer, fp_inner);

    let source = emit_struct(&files[1].structs[0], &registry).expect("Emit should succeed");
    assert!(source.contains("pub position: super::vec_t::VecT,"));
}

#[test]
fn test_scenario_struct_emits_expected_shape() {
    let idl = "struct sample_t {\n\
               \x20 int64_t timestamp;\n\
               \x20 double position[3];\n\
               \x20 string name;\n\
               }";
    let files = vec![parse_string(idl, &PathBuf::from("sample_t.lcm")).expect("Parse should succeed")];
    let registry = TypeRegistry::new(&files);
    let source = emit_struct(&files[0].structs[0], &registry).expect("Emit should succeed");

    assert!(source.contains("pub timestamp: i64,"));
    assert!(source.contains("pub position: [f64; 3],"));
    assert!(source.contains("pub name: String,"));
    assert!(source.contains("buf.write_i64(self.timestamp);"));
    assert!(source.contains("buf.write_string(&self.name)?;"));
    assert!(source.contains("lcm::array_from_fn::<_, 3>(|| Ok(buf.read_f64()?))?"));
}

#[test]
fn test_unresolved_type_blocks_emission() {
    let files = vec![parse_string(
        "package p;\nstruct broken_t { ghost_t g; }",
        &PathBuf::from("broken_t.lcm"),
    )
    .expect("Parse should succeed")];
    let registry = TypeRegistry::new(&files);
    let opts = RustBackendOptions {
        out_dir: PathBuf::from("/nonexistent-should-not-be-touched"),
        make_dirs: false,
    };
    assert!(emit_file(&files[0], &registry, &opts).is_err());
}

#[test]
fn test_parse_errors_carry_positions() {
    let err = parse_string("struct broken_t {\n  int32_t\n}", &PathBuf::from("b.lcm")).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.starts_with("3:"), "got: {}", rendered);
    assert!(rendered.contains("parse error"));
}
