//! The central learning switch: receive, learn, forward.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::VSwitchError;
use crate::frame::{ETHERNET_HEADER_LEN, EthernetFrame};
use crate::table::MacTable;
use crate::udp::{DEFAULT_RECV_LEN, Endpoint, UdpSocket};

/// How often a blocked receive wakes up to observe `stop`.
const RECV_TICK: Duration = Duration::from_millis(100);

/// Cloneable handle that stops a running switch from another thread.
#[derive(Clone)]
pub struct SwitchHandle {
    running: Arc<AtomicBool>,
}

impl SwitchHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal the receive loop to exit; it observes the flag within one
    /// receive tick.
    pub fn stop(&self) -> Result<(), VSwitchError> {
        if self.running.swap(false, Ordering::Relaxed) {
            Ok(())
        } else {
            Err(VSwitchError::NotRunning)
        }
    }
}

/// The central learning switch. Owns the bound socket and the MAC table;
/// `start` runs the receive-learn-forward loop on the calling thread until
/// stopped.
pub struct VSwitch {
    socket: UdpSocket,
    table: MacTable,
    port: u16,
    running: Arc<AtomicBool>,
}

impl VSwitch {
    /// Bind `0.0.0.0:port`. Port 0 requests an ephemeral port; `port()`
    /// reports the one actually bound.
    pub fn create(port: u16) -> Result<VSwitch, VSwitchError> {
        let mut socket = UdpSocket::create().map_err(VSwitchError::SocketCreationFailed)?;
        socket
            .bind("0.0.0.0", port)
            .map_err(VSwitchError::BindFailed)?;
        socket
            .set_receive_timeout(RECV_TICK)
            .map_err(VSwitchError::SocketCreationFailed)?;

        let port = socket.local_endpoint().port();

        Ok(VSwitch {
            socket,
            table: MacTable::new(),
            port,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The UDP port the switch is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The live table handle; clones observe the same bindings.
    pub fn table(&self) -> &MacTable {
        &self.table
    }

    pub fn learned_macs(&self) -> usize {
        self.table.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn handle(&self) -> SwitchHandle {
        SwitchHandle {
            running: self.running.clone(),
        }
    }

    /// Run the receive-learn-forward loop. Blocks the caller until `stop`
    /// is observed. Transient receive errors are logged and skipped; only a
    /// second `start` is an error.
    pub fn start(&mut self) -> Result<(), VSwitchError> {
        if self.running.swap(true, Ordering::Relaxed) {
            return Err(VSwitchError::AlreadyRunning);
        }

        info!(port = self.port, "switch listening on 0.0.0.0");

        while self.running.load(Ordering::Relaxed) {
            let (datagram, sender) = match self.socket.receive_from(DEFAULT_RECV_LEN) {
                Ok(received) => received,
                Err(e) if e.is_timeout() => continue,
                Err(e) => {
                    warn!(error = %e, "receive failed");
                    continue;
                }
            };

            self.process_frame(&datagram, sender);
        }

        info!(learned = self.table.len(), "switch stopped");
        Ok(())
    }

    /// Signal the receive loop to exit after its current tick.
    pub fn stop(&self) -> Result<(), VSwitchError> {
        if self.running.swap(false, Ordering::Relaxed) {
            Ok(())
        } else {
            Err(VSwitchError::NotRunning)
        }
    }

    /// Learn the sender binding and forward one datagram. The original
    /// bytes travel verbatim; the decoded frame is only consulted for its
    /// addresses, so trailing padding survives untouched.
    fn process_frame(&self, datagram: &[u8], sender: Endpoint) {
        if datagram.len() < ETHERNET_HEADER_LEN {
            debug!(len = datagram.len(), from = %sender, "runt datagram dropped");
            return;
        }

        let frame = EthernetFrame::parse(datagram);
        let src = frame.src_mac();
        let dst = frame.dst_mac();

        // Most recent sender wins
        if self.table.insert(src, sender.clone()) {
            info!(mac = %src, endpoint = %sender, "learned");
        }

        if let Some(endpoint) = self.table.lookup(&dst) {
            match self.socket.send_to(datagram, &endpoint) {
                Ok(_) => debug!(dst = %dst, to = %endpoint, len = datagram.len(), "forwarded"),
                Err(e) => warn!(dst = %dst, to = %endpoint, error = %e, "forward failed"),
            }
        } else if dst.is_broadcast() {
            // If src == dst the exclusion removes the only binding and the
            // fan-out is empty: a port never hears its own broadcast
            let targets = self.table.endpoints_except(&src);
            let mut failures = 0usize;
            for endpoint in &targets {
                if let Err(e) = self.socket.send_to(datagram, endpoint) {
                    failures += 1;
                    debug!(to = %endpoint, error = %e, "broadcast send failed");
                }
            }
            debug!(src = %src, targets = targets.len(), failures, "broadcast");
        } else {
            debug!(dst = %dst, from = %sender, "unknown unicast dropped");
        }
    }
}
