//! The port forwarder: one TAP interface bridged to the switch over UDP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::VPortError;
use crate::frame::ETHER_MAX_LEN;
use crate::tap::TapDevice;
use crate::udp::{Endpoint, UdpSocket};

/// How often a blocked worker wakes up to observe `stop`.
const IO_TICK: Duration = Duration::from_millis(100);

/// Bridges one TAP interface to the central switch.
///
/// `start` spawns two workers: one pumps frames from the TAP to the switch,
/// the other pumps received datagrams back into the TAP. The TAP fd is read
/// by the first worker and written by the second, and the socket likewise
/// splits into send and receive sides, so neither handle needs a lock.
/// Dropping the port stops and joins both workers before the handles close.
pub struct VPort {
    tap: Arc<TapDevice>,
    socket: Arc<UdpSocket>,
    switch_endpoint: Endpoint,
    device_name: String,
    running: Arc<AtomicBool>,
    tap_to_switch: Option<JoinHandle<()>>,
    switch_to_tap: Option<JoinHandle<()>>,
}

impl VPort {
    /// Validate the switch endpoint, then acquire the TAP interface and an
    /// unbound UDP socket. The endpoint check runs before any OS resource
    /// is touched.
    pub fn create(
        device_name: &str,
        switch_address: &str,
        switch_port: u16,
    ) -> Result<VPort, VPortError> {
        let switch_endpoint = Endpoint::new(switch_address, switch_port);
        if !switch_endpoint.is_valid() {
            return Err(VPortError::InvalidVSwitchEndpoint(switch_endpoint));
        }

        let tap = TapDevice::create(device_name).map_err(VPortError::TapDeviceCreationFailed)?;

        let socket = UdpSocket::create().map_err(VPortError::SocketCreationFailed)?;
        socket
            .set_receive_timeout(IO_TICK)
            .map_err(VPortError::SocketCreationFailed)?;

        let device_name = tap.name().to_string();
        info!(device = %device_name, switch = %switch_endpoint, "port created");

        Ok(VPort {
            tap: Arc::new(tap),
            socket: Arc::new(socket),
            switch_endpoint,
            device_name,
            running: Arc::new(AtomicBool::new(false)),
            tap_to_switch: None,
            switch_to_tap: None,
        })
    }

    /// The TAP interface name the kernel assigned.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn switch_endpoint(&self) -> &Endpoint {
        &self.switch_endpoint
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the two forwarder workers.
    pub fn start(&mut self) -> Result<(), VPortError> {
        if self.running.swap(true, Ordering::Relaxed) {
            return Err(VPortError::AlreadyRunning);
        }

        let tap = self.tap.clone();
        let socket = self.socket.clone();
        let switch_endpoint = self.switch_endpoint.clone();
        let running = self.running.clone();
        let tap_to_switch = thread::Builder::new()
            .name(format!("{}-tx", self.device_name))
            .spawn(move || forward_tap_to_switch(&tap, &socket, &switch_endpoint, &running))
            .expect("failed to spawn tap->switch worker");

        let tap = self.tap.clone();
        let socket = self.socket.clone();
        let running = self.running.clone();
        let switch_to_tap = thread::Builder::new()
            .name(format!("{}-rx", self.device_name))
            .spawn(move || forward_switch_to_tap(&tap, &socket, &running))
            .expect("failed to spawn switch->tap worker");

        self.tap_to_switch = Some(tap_to_switch);
        self.switch_to_tap = Some(switch_to_tap);

        info!(device = %self.device_name, "forwarder workers started");
        Ok(())
    }

    /// Signal both workers to exit; each observes the flag at its next I/O
    /// tick. `join` (or Drop) waits for them.
    pub fn stop(&self) -> Result<(), VPortError> {
        if self.running.swap(false, Ordering::Relaxed) {
            Ok(())
        } else {
            Err(VPortError::NotRunning)
        }
    }

    /// Wait for both workers to finish.
    pub fn join(&mut self) {
        if let Some(worker) = self.tap_to_switch.take() {
            let _ = worker.join();
        }
        if let Some(worker) = self.switch_to_tap.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for VPort {
    fn drop(&mut self) {
        let _ = self.stop();
        self.join();
    }
}

/// Pump frames from the TAP interface to the switch, as read, without
/// reserialization. Runtime errors are logged and the loop continues: the
/// fabric is best-effort, upper layers own retries.
fn forward_tap_to_switch(
    tap: &TapDevice,
    socket: &UdpSocket,
    switch: &Endpoint,
    running: &AtomicBool,
) {
    debug!(device = %tap.name(), "tap->switch forwarder started");

    while running.load(Ordering::Relaxed) {
        match tap.wait_readable(IO_TICK) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(device = %tap.name(), error = %e, "tap poll failed");
                thread::sleep(IO_TICK);
                continue;
            }
        }

        let frame = match tap.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(device = %tap.name(), error = %e, "tap read failed");
                continue;
            }
        };

        match socket.send_to(&frame, switch) {
            Ok(_) => debug!(len = frame.len(), to = %switch, "frame sent to switch"),
            Err(e) => warn!(error = %e, "send to switch failed"),
        }
    }

    debug!(device = %tap.name(), "tap->switch forwarder stopped");
}

/// Pump datagrams from the switch into the TAP interface, unchanged.
fn forward_switch_to_tap(tap: &TapDevice, socket: &UdpSocket, running: &AtomicBool) {
    debug!(device = %tap.name(), "switch->tap forwarder started");

    while running.load(Ordering::Relaxed) {
        let (datagram, _sender) = match socket.receive_from(ETHER_MAX_LEN) {
            Ok(received) => received,
            Err(e) if e.is_timeout() => continue,
            Err(e) => {
                warn!(error = %e, "receive from switch failed");
                thread::sleep(IO_TICK);
                continue;
            }
        };

        match tap.write_frame(&datagram) {
            Ok(_) => debug!(len = datagram.len(), "frame written to tap"),
            Err(e) => warn!(device = %tap.name(), error = %e, "tap write failed"),
        }
    }

    debug!(device = %tap.name(), "switch->tap forwarder stopped");
}
