// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the lcm-gen front end
//!
//! Exercises the lexer and parser with arbitrary inputs: malformed source
//! must produce positioned errors, never panics. Files that do parse are
//! pushed on through the fingerprint calculator, which must not panic on
//! any parseable input.

#![no_main]

use lcm_gen::fingerprint::{fingerprint, TypeRegistry};
use lcm_gen::parser::parse_string;
use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Phase 1: lex + parse arbitrary text (must not panic)
    let Ok(file) = parse_string(source, &PathBuf::from("fuzz.lcm")) else {
        return;
    };

    // Phase 2: fingerprint every struct that parsed (must not panic;
    // unresolved types are reported as errors, not crashes)
    let files = vec![file];
    let registry = TypeRegistry::new(&files);
    for def in &files[0].structs {
        let _ = fingerprint(def, &registry);
    }
});
