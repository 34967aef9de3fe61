// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multicast group membership for the UDPM transport.
//!
//! A UDPM instance listens on exactly one multicast group. Membership is
//! established on the kernel's default interface first, then widened to
//! every other IPv4 interface so multi-homed hosts receive the group no
//! matter which NIC a sender's route picks. `LCM_MULTICAST_IF` pins
//! membership to a single interface instead.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Join `group` and enable local loopback.
///
/// The join on the default interface must succeed; joins on additional
/// interfaces are best-effort (a NIC with no multicast support is
/// skipped).
pub fn join_multicast_group(socket: &UdpSocket, group: Ipv4Addr) -> io::Result<()> {
    if let Some(iface) = interface_override() {
        socket.join_multicast_v4(&group, &iface)?;
        log::debug!("[UDPM] joined {} on LCM_MULTICAST_IF={}", group, iface);
    } else {
        socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        log::debug!("[UDPM] joined {} on the default interface", group);

        for iface in candidate_interfaces() {
            match socket.join_multicast_v4(&group, &iface) {
                Ok(()) => {
                    log::debug!("[UDPM] joined {} on {}", group, iface);
                }
                Err(e) if e.raw_os_error() == Some(98) => {
                    // EADDRINUSE: this address sits on the same physical
                    // NIC the default join already covered.
                }
                Err(e) => {
                    log::debug!(
                        "[UDPM] join of {} on {} failed (non-fatal): {}",
                        group,
                        iface,
                        e
                    );
                }
            }
        }
    }

    socket.set_multicast_loop_v4(true)?;
    log::debug!("[UDPM] multicast loop enabled");
    Ok(())
}

/// Interface pinned by `LCM_MULTICAST_IF`, when set to a parseable IPv4
/// address. An unparseable value is ignored with a warning rather than
/// silently disabling the default membership.
fn interface_override() -> Option<Ipv4Addr> {
    let var = std::env::var("LCM_MULTICAST_IF").ok()?;
    match var.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            log::warn!("[UDPM] ignoring unparseable LCM_MULTICAST_IF='{}'", var);
            None
        }
    }
}

/// Non-loopback IPv4 addresses of the local interfaces.
///
/// Enumeration failure is not fatal: the default-interface membership is
/// already in place, so an empty list just means no widening.
fn candidate_interfaces() -> Vec<Ipv4Addr> {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter_map(|(_name, ip)| match ip {
                IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
                _ => None,
            })
            .collect(),
        Err(e) => {
            log::debug!("[UDPM] interface enumeration failed (non-fatal): {}", e);
            Vec::new()
        }
    }
}
