//! Transport-class policies.
//!
//! The orchestrator only knows the abstract capability: a policy gets one
//! shot at the raw socket before the connect call. Concrete bindings (which
//! interface carries the required path class on this platform) come from
//! the host layer.

use std::io;

use socket2::SockRef;

/// Low-delay TOS bits, the "responsive/interactive" traffic class.
const IPTOS_LOWDELAY: u32 = 0x10;

/// Capability interface restricting the network path of every connection.
pub trait TransportClassPolicy: Send + Sync {
    /// Configure the socket before it connects.
    fn configure(&self, socket: &SockRef<'_>, ipv6: bool) -> io::Result<()>;

    /// Short label used in trace output.
    fn describe(&self) -> &'static str;
}

/// Production policy: responsive traffic class, bound exclusively to the
/// named interface when one is supplied. Binding to a single interface is
/// what prohibits every other interface class.
#[derive(Debug, Clone, Default)]
pub struct CellularOnly {
    /// Interface carrying the required path class (for example `rmnet0`).
    /// `None` leaves interface selection to the platform routing table.
    pub interface: Option<String>,
}

impl TransportClassPolicy for CellularOnly {
    fn configure(&self, socket: &SockRef<'_>, ipv6: bool) -> io::Result<()> {
        set_responsive_class(socket, ipv6)?;
        if let Some(interface) = &self.interface {
            bind_to_interface(socket, interface)?;
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "cellular-only"
    }
}

/// Development/test policy: responsive traffic class only, no interface
/// restriction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl TransportClassPolicy for Unrestricted {
    fn configure(&self, socket: &SockRef<'_>, ipv6: bool) -> io::Result<()> {
        set_responsive_class(socket, ipv6)
    }

    fn describe(&self) -> &'static str {
        "unrestricted"
    }
}

fn set_responsive_class(socket: &SockRef<'_>, ipv6: bool) -> io::Result<()> {
    if ipv6 {
        socket.set_tclass_v6(IPTOS_LOWDELAY)
    } else {
        socket.set_tos_v4(IPTOS_LOWDELAY)
    }
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
fn bind_to_interface(socket: &SockRef<'_>, interface: &str) -> io::Result<()> {
    socket.bind_device(Some(interface.as_bytes()))
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
fn bind_to_interface(_socket: &SockRef<'_>, interface: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot bind to interface {interface} on this platform"),
    ))
}
