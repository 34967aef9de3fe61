// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the LCM runtime.

use std::io;

/// Errors returned by LCM runtime operations.
///
/// Covers transport configuration, publish-side validation, and the wire
/// codec used by generated message types.
///
/// # Example
///
/// ```rust,no_run
/// use lcm::{Error, Lcm};
///
/// let result = Lcm::with_url("tcp://localhost:7667");
/// match result {
///     Err(Error::InvalidProvider(msg)) => println!("Bad provider: {}", msg),
///     Err(e) => println!("Other error: {}", e),
///     Ok(_) => println!("Connected"),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Provider URL has an unknown scheme or is malformed.
    InvalidProvider(String),

    // ========================================================================
    // Publish Errors
    // ========================================================================
    /// Channel name exceeds 63 bytes or contains non-ASCII bytes.
    ChannelNameTooLong(usize),
    /// Payload would require more than 65535 fragments.
    MessageTooLarge(usize),
    /// Operation on an instance after `close`.
    InstanceClosed,

    // ========================================================================
    // Subscription Errors
    // ========================================================================
    /// Subscription pattern is not a valid regular expression.
    InvalidPattern(String),

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Decoded fingerprint does not match the expected type fingerprint.
    FingerprintMismatch {
        /// Fingerprint declared by the generated type.
        expected: i64,
        /// Fingerprint found at the head of the payload.
        found: i64,
    },
    /// Encoding failed (e.g. string too long for its length prefix).
    Encode {
        /// Buffer offset at which encoding failed.
        offset: usize,
        /// Human-readable failure reason.
        reason: &'static str,
    },
    /// Decoding failed (read past buffer end, invalid length prefix, or
    /// malformed payload).
    Decode {
        /// Buffer offset at which decoding failed.
        offset: usize,
        /// Human-readable failure reason.
        reason: &'static str,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// I/O error with underlying cause.
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidProvider(msg) => write!(f, "Invalid provider URL: {}", msg),
            Error::ChannelNameTooLong(len) => {
                write!(f, "Channel name too long: {} bytes (max 63)", len)
            }
            Error::MessageTooLarge(len) => {
                write!(f, "Message too large: {} bytes exceeds fragment budget", len)
            }
            Error::InstanceClosed => write!(f, "LCM instance is closed"),
            Error::InvalidPattern(msg) => write!(f, "Invalid subscription pattern: {}", msg),
            Error::FingerprintMismatch { expected, found } => write!(
                f,
                "Fingerprint mismatch: expected 0x{:016x}, found 0x{:016x}",
                expected, found
            ),
            Error::Encode { offset, reason } => {
                write!(f, "Encode failed at offset {}: {}", offset, reason)
            }
            Error::Decode { offset, reason } => {
                write!(f, "Decode failed at offset {}: {}", offset, reason)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
