// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # LCM - Lightweight Communications and Marshalling
//!
//! A pure Rust implementation of the LCM publish/subscribe messaging
//! system over UDP multicast, for low-latency message passing between
//! processes on a local network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lcm::{Lcm, Result};
//!
//! fn main() -> Result<()> {
//!     let lcm = Lcm::new()?;
//!
//!     let _subscription = lcm.subscribe("SENSOR_.*", |channel, payload| {
//!         println!("{}: {} bytes", channel, payload.len());
//!     })?;
//!
//!     lcm.publish("SENSOR_1", &[1, 2, 3, 4, 5])?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                       Application Layer                          |
//! |        Lcm::publish / Lcm::subscribe / generated types           |
//! +------------------------------------------------------------------+
//! |                         Codec Layer                              |
//! |   EncodeBuffer/DecodeBuffer (big-endian) | LcmMessage trait      |
//! +------------------------------------------------------------------+
//! |                       Transport Layer                            |
//! |   UDPM packets (LC02 short / LC03 fragments) | reassembly        |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Lcm`] | Client instance: sockets, receiver thread, subscriptions |
//! | [`Subscription`] | Handle returned by subscribe, used to unsubscribe |
//! | [`LcmMessage`] | Trait implemented by `lcm-gen` generated types |
//! | [`EncodeBuffer`] / [`DecodeBuffer`] | Big-endian wire codec buffers |
//! | [`UdpmConfig`] | Parsed `udpm://` provider URL |
//!
//! Messages carry an 8-byte type fingerprint computed by `lcm-gen` from the
//! IDL definition; `decode` validates it before reading any member.

/// Big-endian wire buffers used by generated message code.
pub mod buffer;
/// The LCM client instance: publish, subscribe, close.
mod client;
/// Error types for the LCM runtime.
pub mod error;
/// The `LcmMessage` trait implemented by generated types.
pub mod message;
/// UDPM packet layouts (short and fragmented framing).
pub mod protocol;
/// Transport provider URL parsing.
pub mod provider;
/// Channel subscriptions and dispatch.
mod subscription;
/// UDPM transport: sockets, fragmentation, reassembly, receive loop.
pub mod transport;

pub use buffer::{DecodeBuffer, EncodeBuffer};
pub use client::Lcm;
pub use error::{Error, Result};
pub use message::{array_from_fn, LcmMessage};
pub use provider::UdpmConfig;
pub use subscription::Subscription;

/// LCM runtime version string.
pub const VERSION: &str = "0.2.0";
