// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Code generation backends. Rust is the only backend today.

pub mod rust_backend;

pub use rust_backend::{emit_file, emit_struct, RustBackendOptions};
