//! Core of the vether fabric: a set of virtual ports, each bridging a host
//! TAP interface to a central learning switch over UDP.
//!
//! Architecture:
//! - `frame` holds the MAC address type and the Ethernet frame codec
//! - `tap` and `udp` own the blocking OS handles the engines pump
//! - `table` is the shared MAC → endpoint learning table
//! - `switch` runs the receive-learn-forward loop of the central switch
//! - `port` runs the two per-port forwarder workers

pub mod error;
pub mod frame;
pub mod port;
pub mod switch;
pub mod table;
pub mod tap;
pub mod udp;

pub use error::{TapError, UdpError, VPortError, VSwitchError};
pub use frame::{EthernetFrame, MacAddress};
pub use port::VPort;
pub use switch::{SwitchHandle, VSwitch};
pub use table::MacTable;
pub use udp::{Endpoint, UdpSocket};
