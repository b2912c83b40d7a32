//! Blocking IPv4 UDP socket handle and the endpoint type keyed by the MAC
//! table.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use nix::sys::socket::{
    AddressFamily, MsgFlags, SockFlag, SockType, SockaddrIn, bind, getsockname, recvfrom, sendto,
    setsockopt, socket, sockopt,
};
use nix::sys::time::{TimeVal, TimeValLike};

use crate::error::UdpError;

/// Default receive bound: large enough for any UDP datagram, so oversized
/// garbage is drained instead of stalling the socket.
pub const DEFAULT_RECV_LEN: usize = 65536;

/// The tunnel address of a remote port: dotted-quad IPv4 host plus UDP
/// port. The default value is invalid and stands for "not yet known".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Endpoint {
            address: address.into(),
            port,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Non-empty address and non-zero port.
    pub fn is_valid(&self) -> bool {
        !self.address.is_empty() && self.port != 0
    }

    fn to_sockaddr(&self) -> Result<SockaddrIn, UdpError> {
        let address: Ipv4Addr = self
            .address
            .parse()
            .map_err(|_| UdpError::AddressResolutionFailed(self.address.clone()))?;
        Ok(SockaddrIn::from(SocketAddrV4::new(address, self.port)))
    }

    fn from_sockaddr(addr: &SockaddrIn) -> Self {
        Endpoint {
            address: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Owned blocking datagram socket.
///
/// Created unbound; a port socket stays that way and lets the kernel pick
/// an ephemeral source port on first send. The fd closes exactly once when
/// the handle drops.
#[derive(Debug)]
pub struct UdpSocket {
    fd: OwnedFd,
    local: Endpoint,
}

impl UdpSocket {
    pub fn create() -> Result<Self, UdpError> {
        let fd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::empty(),
            None,
        )
        .map_err(UdpError::SocketCreationFailed)?;

        Ok(UdpSocket {
            fd,
            local: Endpoint::default(),
        })
    }

    /// Bind to a local address. Port 0 requests an ephemeral port; the port
    /// actually assigned is read back so `local_endpoint` is concrete.
    pub fn bind(&mut self, address: &str, port: u16) -> Result<(), UdpError> {
        if address.is_empty() {
            return Err(UdpError::InvalidEndpoint(Endpoint::new(address, port)));
        }

        let parsed: Ipv4Addr = address
            .parse()
            .map_err(|_| UdpError::AddressResolutionFailed(address.to_string()))?;
        let addr = SockaddrIn::from(SocketAddrV4::new(parsed, port));

        bind(self.fd.as_raw_fd(), &addr).map_err(UdpError::BindFailed)?;

        let bound: SockaddrIn =
            getsockname(self.fd.as_raw_fd()).map_err(UdpError::InvalidSocket)?;
        self.local = Endpoint::new(address, bound.port());

        Ok(())
    }

    /// The bound local endpoint; invalid (default) while unbound.
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.local
    }

    /// Transmit one datagram. The endpoint must be valid and parse as a
    /// dotted quad.
    pub fn send_to(&self, data: &[u8], endpoint: &Endpoint) -> Result<usize, UdpError> {
        if !endpoint.is_valid() {
            return Err(UdpError::InvalidEndpoint(endpoint.clone()));
        }

        let addr = endpoint.to_sockaddr()?;
        sendto(self.fd.as_raw_fd(), data, &addr, MsgFlags::empty()).map_err(UdpError::SendFailed)
    }

    /// Block until one datagram arrives; returns its bytes (at most
    /// `max_len` — pick `max_len` at least [`crate::frame::ETHER_MAX_LEN`]
    /// so frames never truncate) and the sender's endpoint.
    pub fn receive_from(&self, max_len: usize) -> Result<(Vec<u8>, Endpoint), UdpError> {
        let mut buf = vec![0u8; max_len];

        let (len, sender) = recvfrom::<SockaddrIn>(self.fd.as_raw_fd(), &mut buf)
            .map_err(UdpError::ReceiveFailed)?;
        buf.truncate(len);

        let sender = sender
            .map(|addr| Endpoint::from_sockaddr(&addr))
            .unwrap_or_default();

        Ok((buf, sender))
    }

    /// Install `SO_RCVTIMEO` so a blocked receive wakes up periodically and
    /// its loop can observe shutdown. Expiry surfaces as a receive error for
    /// which [`UdpError::is_timeout`] is true.
    pub fn set_receive_timeout(&self, timeout: Duration) -> Result<(), UdpError> {
        let timeval = TimeVal::microseconds(timeout.as_micros().min(i64::MAX as u128) as i64);
        setsockopt(&self.fd, sockopt::ReceiveTimeout, &timeval)
            .map_err(UdpError::InvalidSocket)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_validity() {
        assert!(Endpoint::new("10.0.0.1", 5001).is_valid());
        assert!(!Endpoint::new("", 5001).is_valid());
        assert!(!Endpoint::new("10.0.0.1", 0).is_valid());
        assert!(!Endpoint::default().is_valid());
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(Endpoint::new("127.0.0.1", 8080).to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn bind_resolves_ephemeral_port() {
        let mut socket = UdpSocket::create().unwrap();
        socket.bind("127.0.0.1", 0).unwrap();

        let local = socket.local_endpoint();
        assert_eq!(local.address(), "127.0.0.1");
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn bind_rejects_bad_address() {
        let mut socket = UdpSocket::create().unwrap();
        assert!(matches!(
            socket.bind("999.0.0.1", 0),
            Err(UdpError::AddressResolutionFailed(_))
        ));
        assert!(matches!(
            socket.bind("", 4242),
            Err(UdpError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn loopback_round_trip() {
        let mut receiver = UdpSocket::create().unwrap();
        receiver.bind("127.0.0.1", 0).unwrap();

        // Unbound sender: the kernel assigns the source port on first send
        let sender = UdpSocket::create().unwrap();
        let payload = b"vether datagram";
        let sent = sender
            .send_to(payload, receiver.local_endpoint())
            .unwrap();
        assert_eq!(sent, payload.len());

        let (data, from) = receiver.receive_from(DEFAULT_RECV_LEN).unwrap();
        assert_eq!(data, payload);
        assert_eq!(from.address(), "127.0.0.1");
        assert_ne!(from.port(), 0);
    }

    #[test]
    fn send_rejects_invalid_endpoint() {
        let socket = UdpSocket::create().unwrap();
        assert!(matches!(
            socket.send_to(b"x", &Endpoint::new("", 9000)),
            Err(UdpError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            socket.send_to(b"x", &Endpoint::new("10.0.0.1", 0)),
            Err(UdpError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            socket.send_to(b"x", &Endpoint::new("localhost", 9000)),
            Err(UdpError::AddressResolutionFailed(_))
        ));
    }

    #[test]
    fn receive_timeout_surfaces_as_timeout() {
        let mut socket = UdpSocket::create().unwrap();
        socket.bind("127.0.0.1", 0).unwrap();
        socket
            .set_receive_timeout(Duration::from_millis(50))
            .unwrap();

        let err = socket.receive_from(DEFAULT_RECV_LEN).unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
    }
}
