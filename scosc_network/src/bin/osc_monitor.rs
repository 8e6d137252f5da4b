//! osc_monitor - listens for OSC traffic and logs every message and bundle.
//!
//! Handy for checking what a synthesis server sends back to the language.
//!
//! ```text
//! osc_monitor [--config <path>]
//! RUST_LOG=debug osc_monitor monitor.toml
//! ```

use std::{env, net::SocketAddrV4, time::Duration};

use scosc_network::{
    CallError, Interpreter, NetworkConfig, OscContext, ReplyAddress, scosc_proto::Value,
};

/// Parse config path from command line arguments.
///
/// Supports `osc_monitor <path>` and `osc_monitor --config <path>` (or `-c`).
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    args.get(1).filter(|a| !a.starts_with('-')).cloned()
}

struct Monitor;

impl Interpreter for Monitor {
    fn on_osc_message(
        &mut self,
        time: f64,
        reply: ReplyAddress,
        message: Value,
    ) -> Result<(), CallError> {
        log::info!("[{time:.3}] {} {message:?}", reply.socket_addr());
        Ok(())
    }

    fn on_osc_bundle(
        &mut self,
        time: f64,
        reply: ReplyAddress,
        elements: Vec<Value>,
    ) -> Result<(), CallError> {
        log::info!("[{time:.3}] {} bundle of {}", reply.socket_addr(), elements.len());
        for element in elements {
            log::info!("    {element:?}");
        }
        Ok(())
    }

    fn on_connection_closed(&mut self, peer: SocketAddrV4) -> Result<(), CallError> {
        log::info!("{peer} closed the connection");
        Ok(())
    }
}

fn main() -> scosc_network::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_config_path() {
        Some(path) => {
            log::info!("Using config: {path}");
            NetworkConfig::load(&path)?
        }
        None => NetworkConfig::default(),
    };

    let (_ctx, dispatcher) = OscContext::start(&config)?;
    let mut monitor = Monitor;

    loop {
        dispatcher.dispatch_next_timeout(&mut monitor, Duration::from_secs(1));
    }
}
