#![allow(dead_code)]

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::{Duration, Instant},
};

use scosc_network::{
    CallError, Dispatcher, Interpreter, NetworkConfig, ReplyAddress, scosc_proto::Value,
};

#[derive(Debug, Default)]
pub struct Recorder {
    pub messages: Vec<(ReplyAddress, Value)>,
    pub bundles: Vec<(f64, ReplyAddress, Vec<Value>)>,
    pub closed: Vec<SocketAddrV4>,
}

impl Interpreter for Recorder {
    fn on_osc_message(
        &mut self,
        _: f64,
        reply: ReplyAddress,
        message: Value,
    ) -> Result<(), CallError> {
        self.messages.push((reply, message));
        Ok(())
    }

    fn on_osc_bundle(
        &mut self,
        time: f64,
        reply: ReplyAddress,
        elements: Vec<Value>,
    ) -> Result<(), CallError> {
        self.bundles.push((time, reply, elements));
        Ok(())
    }

    fn on_connection_closed(&mut self, peer: SocketAddrV4) -> Result<(), CallError> {
        self.closed.push(peer);
        Ok(())
    }
}

impl Recorder {
    /// Dispatches until `done` holds, or panics after two seconds.
    pub fn wait_for(&mut self, dispatcher: &Dispatcher, done: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);

        while !done(self) {
            assert!(Instant::now() < deadline, "timed out, got {self:?}");
            dispatcher.dispatch_next_timeout(self, Duration::from_millis(20));
        }
    }
}

pub fn loopback_config() -> NetworkConfig {
    NetworkConfig {
        bind_address: Ipv4Addr::LOCALHOST,
        udp_port: 0,
        recv_timeout_ms: 10,
        ..Default::default()
    }
}

pub fn v4(addr: SocketAddr) -> SocketAddrV4 {
    match addr {
        SocketAddr::V4(v4) => v4,
        SocketAddr::V6(v6) => panic!("expected an IPv4 address, got {v6}"),
    }
}
