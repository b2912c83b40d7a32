//! vswitch: the central learning switch of the vether fabric.
//!
//! Listens on `0.0.0.0:<port>`, learns source-MAC to sender-endpoint
//! bindings from incoming datagrams, and forwards frames to the right
//! ports. Stops cleanly on SIGINT/SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::{SigHandler, Signal, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vether_net::error::VSwitchError;
use vether_net::switch::VSwitch;

#[derive(Parser)]
#[command(name = "vswitch")]
#[command(about = "Central learning switch for the vether fabric")]
struct Args {
    /// UDP port to listen on (0 for an ephemeral port)
    port: u16,
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
        .unwrap_or_else(|_| EnvFilter::new("vswitch=info,vether_net=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    install_signal_handlers();

    let mut vswitch = match VSwitch::create(args.port) {
        Ok(vswitch) => vswitch,
        Err(e) => {
            error!(error = %e, "failed to create switch");
            if matches!(e, VSwitchError::BindFailed(_)) {
                error!(
                    port = args.port,
                    "the port may already be in use; check with lsof -i :<port>"
                );
            }
            return Err(e.into());
        }
    };

    info!(port = vswitch.port(), "starting switch");

    let handle = vswitch.handle();
    let table = vswitch.table().clone();
    let switch_loop = thread::spawn(move || vswitch.start());

    while !SHUTDOWN.load(Ordering::Relaxed) && !switch_loop.is_finished() {
        thread::sleep(Duration::from_millis(200));
    }

    info!("shutting down");
    // Repeat until the loop thread is gone: a signal arriving before the
    // loop raised its running flag would otherwise lose the stop request
    while !switch_loop.is_finished() {
        let _ = handle.stop();
        thread::sleep(Duration::from_millis(50));
    }

    match switch_loop.join() {
        Ok(result) => result?,
        Err(_) => return Err("switch loop panicked".into()),
    }

    info!(learned = table.len(), "shutdown complete");
    Ok(())
}
