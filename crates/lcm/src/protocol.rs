// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDPM packet layouts: short and fragmented message framing.
//!
//! Every packet starts with a 4-byte magic selecting the layout. All
//! multi-byte header fields are big-endian.
//!
//! ```text
//! short:    magic(4) seq(4) channel\0 payload
//! fragment: magic(4) seq(4) total_size(4) offset(4) index(2) count(2)
//!           [channel\0 iff index == 0] chunk
//! ```

use crate::buffer::DecodeBuffer;
use crate::error::{Error, Result};

/// Magic marker for single-packet (short) messages: "LC02".
pub const MAGIC_SHORT: u32 = 0x4c43_3032;
/// Magic marker for fragmented messages: "LC03".
pub const MAGIC_FRAGMENT: u32 = 0x4c43_3033;

/// Maximum channel name length in bytes, not counting the NUL terminator.
pub const MAX_CHANNEL_LENGTH: usize = 63;
/// Largest `channel + NUL + payload` that still fits a short packet.
pub const SHORT_MESSAGE_MAX_SIZE: usize = 65_499;
/// Largest chunk carried by a single fragment packet.
pub const FRAGMENT_MAX_PAYLOAD: usize = 65_487;
/// Maximum number of fragments per logical message.
pub const MAX_FRAGMENTS: usize = 65_535;

/// Size of the short-packet header (magic + sequence).
pub const SHORT_HEADER_SIZE: usize = 8;
/// Size of the fragment-packet header, not counting the fragment-zero channel.
pub const FRAGMENT_HEADER_SIZE: usize = 20;

/// A received datagram, classified by magic and split into header fields.
#[derive(Debug, PartialEq, Eq)]
pub enum Datagram<'a> {
    /// Single-packet message carrying the whole payload.
    Short {
        channel: &'a str,
        payload: &'a [u8],
    },
    /// One slice of a fragmented message.
    Fragment {
        seq: u32,
        total_size: u32,
        offset: u32,
        index: u16,
        count: u16,
        /// Present only on fragment zero.
        channel: Option<&'a str>,
        chunk: &'a [u8],
    },
}

/// Validate a channel name for publishing: at most 63 ASCII bytes.
pub fn validate_channel(channel: &str) -> Result<()> {
    if channel.len() > MAX_CHANNEL_LENGTH || !channel.is_ascii() {
        return Err(Error::ChannelNameTooLong(channel.len()));
    }
    Ok(())
}

/// Number of fragments needed for `payload_len` bytes on `channel`.
///
/// Fragment zero loses `channel + NUL` bytes of its chunk budget.
///
/// # Errors
///
/// Returns [`Error::MessageTooLarge`] when more than 65535 fragments would
/// be required.
pub fn fragment_count(channel_len: usize, payload_len: usize) -> Result<u16> {
    let first_budget = FRAGMENT_MAX_PAYLOAD - (channel_len + 1);
    let count = if payload_len <= first_budget {
        1
    } else {
        1 + (payload_len - first_budget).div_ceil(FRAGMENT_MAX_PAYLOAD)
    };
    if count > MAX_FRAGMENTS {
        return Err(Error::MessageTooLarge(payload_len));
    }
    // count <= 65535 checked above
    Ok(count as u16)
}

/// Encode a short packet: magic, sequence, NUL-terminated channel, payload.
pub fn encode_short(seq: u32, channel: &str, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(SHORT_HEADER_SIZE + channel.len() + 1 + payload.len());
    packet.extend_from_slice(&MAGIC_SHORT.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(channel.as_bytes());
    packet.push(0);
    packet.extend_from_slice(payload);
    packet
}

/// Encode one fragment packet. The channel is included only for fragment
/// zero; callers pass `Some` exactly when `index == 0`.
pub fn encode_fragment(
    seq: u32,
    total_size: u32,
    offset: u32,
    index: u16,
    count: u16,
    channel: Option<&str>,
    chunk: &[u8],
) -> Vec<u8> {
    let channel_len = channel.map_or(0, |c| c.len() + 1);
    let mut packet = Vec::with_capacity(FRAGMENT_HEADER_SIZE + channel_len + chunk.len());
    packet.extend_from_slice(&MAGIC_FRAGMENT.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(&total_size.to_be_bytes());
    packet.extend_from_slice(&offset.to_be_bytes());
    packet.extend_from_slice(&index.to_be_bytes());
    packet.extend_from_slice(&count.to_be_bytes());
    if let Some(channel) = channel {
        packet.extend_from_slice(channel.as_bytes());
        packet.push(0);
    }
    packet.extend_from_slice(chunk);
    packet
}

/// Parse a received datagram. Returns `None` for anything that should be
/// dropped: fewer than 8 bytes, unknown magic, or a malformed header.
pub fn parse_datagram(data: &[u8]) -> Option<Datagram<'_>> {
    if data.len() < SHORT_HEADER_SIZE {
        return None;
    }
    let mut buf = DecodeBuffer::new(data);
    let magic = buf.read_u32().ok()?;
    match magic {
        MAGIC_SHORT => {
            let _seq = buf.read_u32().ok()?;
            let rest = buf.read_bytes(buf.remaining()).ok()?;
            let (channel, payload) = split_channel(rest)?;
            Some(Datagram::Short { channel, payload })
        }
        MAGIC_FRAGMENT => {
            let seq = buf.read_u32().ok()?;
            let total_size = buf.read_u32().ok()?;
            let offset = buf.read_u32().ok()?;
            let index = buf.read_u16().ok()?;
            let count = buf.read_u16().ok()?;
            let rest = buf.read_bytes(buf.remaining()).ok()?;
            let (channel, chunk) = if index == 0 {
                let (channel, chunk) = split_channel(rest)?;
                (Some(channel), chunk)
            } else {
                (None, rest)
            };
            Some(Datagram::Fragment {
                seq,
                total_size,
                offset,
                index,
                count,
                channel,
                chunk,
            })
        }
        _ => None,
    }
}

/// Split a NUL-terminated channel name off the front of `data`.
///
/// The channel must be valid UTF-8 and no longer than the channel limit;
/// anything else makes the whole datagram droppable.
fn split_channel(data: &[u8]) -> Option<(&str, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    if nul > MAX_CHANNEL_LENGTH {
        return None;
    }
    let channel = std::str::from_utf8(&data[..nul]).ok()?;
    Some((channel, &data[nul + 1..]))
}
