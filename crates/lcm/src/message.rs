// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `LcmMessage` trait implemented by every generated message type.

use crate::buffer::{DecodeBuffer, EncodeBuffer};
use crate::error::{Error, Result};

/// Encode/decode contract implemented by `lcm-gen` generated types.
///
/// An encoded message begins with the type's 64-bit fingerprint (big-endian
/// signed), followed by the members in declaration order. `decode` checks
/// the fingerprint and fails with [`Error::FingerprintMismatch`] on any
/// other value.
pub trait LcmMessage: Sized {
    /// Deterministic 64-bit type fingerprint computed from the IDL.
    const FINGERPRINT: i64;

    /// Encode this value, fingerprint first, into `buf`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a member cannot be represented on the wire (e.g. a
    /// string longer than the u32 length prefix allows).
    fn encode(&self, buf: &mut EncodeBuffer) -> Result<()>;

    /// Decode a value of this type from `buf`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the fingerprint does not match or the payload is
    /// truncated or malformed.
    fn decode(buf: &mut DecodeBuffer<'_>) -> Result<Self>;

    /// Encode into a fresh byte vector, ready for `Lcm::publish`.
    fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = EncodeBuffer::new();
        self.encode(&mut buf)?;
        Ok(buf.into_vec())
    }

    /// Decode from a received payload slice.
    fn decode_from_slice(data: &[u8]) -> Result<Self> {
        let mut buf = DecodeBuffer::new(data);
        Self::decode(&mut buf)
    }
}

/// Build a fixed-size array by invoking `read` exactly `N` times in order.
///
/// Generated decode code uses this for constant array dimensions, where the
/// element type may not be `Copy` (nested messages, strings).
pub fn array_from_fn<T, const N: usize>(mut read: impl FnMut() -> Result<T>) -> Result<[T; N]> {
    let mut items = Vec::with_capacity(N);
    for _ in 0..N {
        items.push(read()?);
    }
    items.try_into().map_err(|_| Error::Decode {
        offset: 0,
        reason: "array length mismatch",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_from_fn_preserves_order() {
        let mut next = 0i32;
        let arr: [i32; 4] = array_from_fn(|| {
            next += 1;
            Ok(next)
        })
        .expect("array_from_fn should succeed");
        assert_eq!(arr, [1, 2, 3, 4]);
    }

    #[test]
    fn test_array_from_fn_propagates_errors() {
        let result: Result<[i32; 2]> = array_from_fn(|| {
            Err(Error::Decode {
                offset: 7,
                reason: "unexpected end of buffer",
            })
        });
        assert!(result.is_err());
    }
}
