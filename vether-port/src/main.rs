//! vport: bridges a host TAP interface to a remote vswitch.
//!
//! Creates the TAP device, then forwards Ethernet frames bidirectionally
//! between the interface and the switch until SIGINT/SIGTERM. Creating TAP
//! devices requires elevated privileges on most systems.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::{SigHandler, Signal, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vether_net::error::VPortError;
use vether_net::port::VPort;

#[derive(Parser)]
#[command(name = "vport")]
#[command(about = "TAP-side forwarder for the vether fabric")]
struct Args {
    /// IPv4 address of the vswitch
    switch_ip: String,

    /// UDP port of the vswitch
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    switch_port: u16,

    /// TAP device name (kernel-assigned when omitted)
    tap_device: Option<String>,
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_: i32) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::Handler(handle_signal));
        let _ = signal(Signal::SIGTERM, SigHandler::Handler(handle_signal));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vport=info,vether_net=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    install_signal_handlers();

    let device_name = args.tap_device.as_deref().unwrap_or("");
    let mut vport = match VPort::create(device_name, &args.switch_ip, args.switch_port) {
        Ok(vport) => vport,
        Err(e) => {
            error!(error = %e, "failed to create port");
            if matches!(e, VPortError::TapDeviceCreationFailed(_)) {
                error!("creating TAP devices requires root privileges (CAP_NET_ADMIN); try sudo");
            }
            return Err(e.into());
        }
    };

    info!(
        device = vport.device_name(),
        switch = %vport.switch_endpoint(),
        "starting port"
    );
    vport.start()?;

    while !SHUTDOWN.load(Ordering::Relaxed) && vport.is_running() {
        thread::sleep(Duration::from_millis(200));
    }

    info!("shutting down");
    let _ = vport.stop();
    vport.join();

    info!("shutdown complete");
    Ok(())
}
