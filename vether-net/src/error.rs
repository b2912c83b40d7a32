//! Error types for the vether fabric, one enum per subsystem.

use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::udp::Endpoint;

/// TAP device errors.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("failed to open /dev/net/tun: {0}")]
    DeviceOpenFailed(io::Error),

    #[error("ioctl(TUNSETIFF) failed: {0}")]
    IoctlFailed(Errno),

    #[error("failed to read from TAP device: {0}")]
    ReadFailed(io::Error),

    #[error("failed to write to TAP device: {0}")]
    WriteFailed(io::Error),

    #[error("invalid TAP device name: {0:?}")]
    InvalidDevice(String),

    #[error("partial write to TAP device: {written} of {len} bytes")]
    PartialWrite { written: usize, len: usize },
}

/// UDP socket errors.
#[derive(Debug, Error)]
pub enum UdpError {
    #[error("failed to create socket: {0}")]
    SocketCreationFailed(Errno),

    #[error("failed to bind socket: {0}")]
    BindFailed(Errno),

    #[error("failed to send data: {0}")]
    SendFailed(Errno),

    #[error("failed to receive data: {0}")]
    ReceiveFailed(Errno),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(Endpoint),

    #[error("failed to resolve address: {0:?}")]
    AddressResolutionFailed(String),

    #[error("invalid socket: {0}")]
    InvalidSocket(Errno),
}

impl UdpError {
    /// True when a receive returned because its timeout tick elapsed (or a
    /// signal interrupted it), not because the socket failed.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            UdpError::ReceiveFailed(Errno::EAGAIN) | UdpError::ReceiveFailed(Errno::EINTR)
        )
    }
}

/// Switch lifecycle errors. Runtime receive errors are logged, not raised.
#[derive(Debug, Error)]
pub enum VSwitchError {
    #[error("failed to create switch socket: {0}")]
    SocketCreationFailed(UdpError),

    #[error("failed to bind switch socket: {0}")]
    BindFailed(UdpError),

    #[error("switch is already running")]
    AlreadyRunning,

    #[error("switch is not running")]
    NotRunning,
}

/// Port lifecycle errors. Runtime forwarding errors are logged, not raised.
#[derive(Debug, Error)]
pub enum VPortError {
    #[error("failed to create TAP device: {0}")]
    TapDeviceCreationFailed(TapError),

    #[error("failed to create UDP socket: {0}")]
    SocketCreationFailed(UdpError),

    #[error("invalid vswitch endpoint: {0}")]
    InvalidVSwitchEndpoint(Endpoint),

    #[error("port is already running")]
    AlreadyRunning,

    #[error("port is not running")]
    NotRunning,
}
