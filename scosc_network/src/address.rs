//! Addresses: where replies come from, and where packets go.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::{Deserialize, Serialize};

use scosc_proto::Value;

use crate::client::tcp::TcpLink;

/// Origin of an inbound packet, as reported to the interpreter.
///
/// The host is the IPv4 address in host byte order. [`ReplyAddress::LOCAL`]
/// (`0.0.0.0:0`) marks replies produced by the in-process server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReplyAddress {
    pub host: u32,
    pub port: u16,
}

impl ReplyAddress {
    pub const LOCAL: Self = Self { host: 0, port: 0 };

    #[inline(always)]
    pub const fn new(host: u32, port: u16) -> Self {
        Self { host, port }
    }

    #[inline(always)]
    pub const fn is_local(&self) -> bool {
        self.host == 0 && self.port == 0
    }

    #[inline(always)]
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::from_bits(self.host), self.port)
    }

    /// The `[host, port]` pair handed to interpreter callbacks.
    ///
    /// The host is reinterpreted as a signed 32-bit integer, so addresses above
    /// `127.255.255.255` come out negative.
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::Int(self.host as i32),
            Value::Int(i32::from(self.port)),
        ])
    }
}

impl From<SocketAddrV4> for ReplyAddress {
    #[inline(always)]
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(addr.ip().to_bits(), addr.port())
    }
}

impl TryFrom<SocketAddr> for ReplyAddress {
    type Error = SocketAddr;

    /// Fails (returning the address back) for IPv6 peers.
    fn try_from(addr: SocketAddr) -> Result<Self, Self::Error> {
        match addr {
            SocketAddr::V4(v4) => Ok(v4.into()),
            v6 @ SocketAddr::V6(_) => Err(v6),
        }
    }
}

/// A send destination.
///
/// Destinations start out unconnected: packets go over UDP, or to the in-process
/// server when the host is the sentinel `0`. After a successful
/// [`OscContext::connect`](crate::OscContext::connect) the destination owns a
/// persistent TCP link, and every packet goes over it until it is disconnected or
/// the peer closes it.
#[derive(Debug)]
pub struct Destination {
    addr: SocketAddrV4,
    hostname: Option<String>,
    link: Option<TcpLink>,
}

impl Destination {
    #[inline(always)]
    pub fn new(addr: SocketAddrV4) -> Self {
        Self {
            addr,
            hostname: None,
            link: None,
        }
    }

    /// Destination addressed by its raw host-order integer, as user code stores it.
    #[inline(always)]
    pub fn from_parts(host: u32, port: u16) -> Self {
        Self::new(SocketAddrV4::new(Ipv4Addr::from_bits(host), port))
    }

    /// The in-process server, reachable without any socket.
    #[inline(always)]
    pub fn local(port: u16) -> Self {
        Self::new(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
    }

    /// Attaches the name this destination was resolved from.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    #[inline(always)]
    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    #[inline(always)]
    pub fn host(&self) -> u32 {
        self.addr.ip().to_bits()
    }

    #[inline(always)]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Whether this is the in-process sentinel address.
    #[inline(always)]
    pub fn is_local(&self) -> bool {
        self.addr.ip().is_unspecified()
    }

    /// Returns `true` while a TCP link is attached and its peer hasn't closed it.
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(TcpLink::is_open)
    }

    #[inline(always)]
    pub(crate) fn link(&self) -> Option<&TcpLink> {
        self.link.as_ref()
    }

    #[inline(always)]
    pub(crate) fn attach(&mut self, link: TcpLink) {
        self.link = Some(link);
    }

    #[inline(always)]
    pub(crate) fn detach(&mut self) -> Option<TcpLink> {
        self.link.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reply_address_value() {
        let addr = ReplyAddress::from(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 57110));
        assert_eq!(addr.host, 0x7F00_0001);
        assert_eq!(
            addr.to_value(),
            Value::Array(vec![Value::Int(0x7F00_0001), Value::Int(57110)])
        );

        let high = ReplyAddress::from(SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 1), 1));
        assert_eq!(high.to_value().as_array().unwrap()[0], Value::Int(-1062731775));
    }

    #[test]
    fn test_ipv6_is_rejected() {
        let v6: SocketAddr = "[::1]:57120".parse().unwrap();
        assert_eq!(ReplyAddress::try_from(v6), Err(v6));
    }

    #[test]
    fn test_local_destination() {
        let local = Destination::local(57110);
        assert!(local.is_local());
        assert_eq!(local.host(), 0);
        assert!(!local.is_connected());

        let remote = Destination::from_parts(0x7F00_0001, 57110).with_hostname("localhost");
        assert!(!remote.is_local());
        assert_eq!(remote.addr(), SocketAddrV4::new(Ipv4Addr::LOCALHOST, 57110));
        assert_eq!(remote.hostname(), Some("localhost"));
    }
}
