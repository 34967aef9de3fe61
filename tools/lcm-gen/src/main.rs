// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! lcm-gen - generate Rust message bindings from LCM type definitions.

use anyhow::Context;
use clap::Parser;
use lcm_gen::emit::{emit_file, RustBackendOptions};
use lcm_gen::fingerprint::TypeRegistry;
use lcm_gen::parser::parse_string;
use std::fs;
use std::path::PathBuf;

/// Generate Rust message bindings from LCM type definition files
#[derive(Parser, Debug)]
#[command(name = "lcm-gen")]
#[command(version = "0.1.0")]
#[command(about = "Generate Rust message bindings from LCM type definition files")]
struct Args {
    /// LCM type definition files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Rust file destination directory
    #[arg(long = "rust-path", default_value = ".")]
    rust_path: PathBuf,

    /// Make Rust source directories automatically
    #[arg(long = "rust-mkdir", default_value_t = true, action = clap::ArgAction::Set)]
    rust_mkdir: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let mut failed = false;

    // Parse everything first: fingerprints of nested types resolve across
    // all files named on the command line.
    let mut files = Vec::new();
    for path in &args.files {
        let source = match fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
        {
            Ok(source) => source,
            Err(e) => {
                eprintln!("[ERROR] {:#}", e);
                failed = true;
                continue;
            }
        };
        match parse_string(&source, path) {
            Ok(file) => files.push(file),
            Err(e) => {
                eprintln!("[ERROR] {}: {}", path.display(), e);
                failed = true;
            }
        }
    }

    let registry = TypeRegistry::new(&files);
    let opts = RustBackendOptions {
        out_dir: args.rust_path.clone(),
        make_dirs: args.rust_mkdir,
    };

    let mut generated = 0usize;
    for file in &files {
        match emit_file(file, &registry, &opts) {
            Ok(written) => {
                for path in &written {
                    tracing::info!("generated {}", path.display());
                }
                generated += written.len();
            }
            Err(e) => {
                eprintln!("[ERROR] {}: {}", file.path.display(), e);
                failed = true;
            }
        }
    }

    tracing::info!(
        "{} file(s) generated from {} definition file(s)",
        generated,
        files.len()
    );

    if failed {
        std::process::exit(1);
    }
}
