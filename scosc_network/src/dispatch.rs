//! Delivery of inbound packets to the interpreter.
//!
//! Listener threads only queue raw bytes. Decoding and every interpreter callback
//! happen here, on whichever thread owns the [`Dispatcher`], which is expected to be
//! the interpreter's own. Nothing is locked while the interpreter runs.

use core::net::SocketAddrV4;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use scosc_proto::{Packet, Value, decode_packet};
use scosc_utils::ElapsedClock;

use crate::{
    address::ReplyAddress,
    inbound::{Inbound, InboundPacket, InboundReceiver},
};

/// An interpreter callback that failed. The dispatcher logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CallError(pub String);

/// The interpreter-side receivers of OSC traffic.
pub trait Interpreter {
    /// Whether the interpreter can currently run callbacks. Packets arriving while it
    /// isn't are discarded.
    fn is_ready(&self) -> bool {
        true
    }

    /// A message arrived. `time` is the current elapsed time, and `message` is
    /// `[command, args...]` with the command as a symbol.
    fn on_osc_message(
        &mut self,
        time: f64,
        reply: ReplyAddress,
        message: Value,
    ) -> Result<(), CallError>;

    /// A bundle arrived. `time` is the bundle's time tag converted to elapsed time,
    /// and `elements` holds one value per bundle element, in order.
    fn on_osc_bundle(
        &mut self,
        time: f64,
        reply: ReplyAddress,
        elements: Vec<Value>,
    ) -> Result<(), CallError>;

    /// The peer of an outbound TCP link closed it.
    fn on_connection_closed(&mut self, _peer: SocketAddrV4) -> Result<(), CallError> {
        Ok(())
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// The interpreter wasn't ready.
    Skipped,
    /// The packet failed to decode.
    Dropped,
    /// The interpreter callback returned an error.
    Failed(CallError),
}

/// Drains the inbound channel into an [`Interpreter`].
#[derive(Debug)]
pub struct Dispatcher {
    rx: InboundReceiver,
    clock: ElapsedClock,
}

impl Dispatcher {
    #[inline(always)]
    pub fn new(rx: InboundReceiver, clock: ElapsedClock) -> Self {
        Self { rx, clock }
    }

    #[inline(always)]
    pub fn clock(&self) -> &ElapsedClock {
        &self.clock
    }

    /// Dispatches every event currently queued, without blocking. Returns how many
    /// events were taken off the queue.
    pub fn dispatch_pending(&self, interp: &mut (impl Interpreter + ?Sized)) -> usize {
        let mut n = 0;

        for event in self.rx.try_iter() {
            self.dispatch(interp, event);
            n += 1;
        }

        n
    }

    /// Waits up to `timeout` for one event and dispatches it.
    ///
    /// Returns `None` on timeout, or when every producer is gone.
    pub fn dispatch_next_timeout(
        &self,
        interp: &mut (impl Interpreter + ?Sized),
        timeout: Duration,
    ) -> Option<DispatchOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.dispatch(interp, event)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Dispatches a single event.
    pub fn dispatch(
        &self,
        interp: &mut (impl Interpreter + ?Sized),
        event: Inbound,
    ) -> DispatchOutcome {
        if !interp.is_ready() {
            return DispatchOutcome::Skipped;
        }

        let res = match event {
            Inbound::Packet(packet) => match self.deliver(interp, packet) {
                Some(res) => res,
                None => return DispatchOutcome::Dropped,
            },
            Inbound::ConnectionClosed(peer) => interp.on_connection_closed(peer),
        };

        match res {
            Ok(()) => DispatchOutcome::Delivered,
            Err(e) => {
                log::error!("OSC callback failed: {e}");
                DispatchOutcome::Failed(e)
            }
        }
    }

    fn deliver(
        &self,
        interp: &mut (impl Interpreter + ?Sized),
        InboundPacket { data, reply, .. }: InboundPacket,
    ) -> Option<Result<(), CallError>> {
        let packet = decode_packet(&data)
            .inspect_err(|e| {
                log::warn!("Dropping malformed OSC packet from {}: {e}", reply.socket_addr());
            })
            .ok()?;

        Some(match packet {
            Packet::Message(message) => {
                interp.on_osc_message(self.clock.elapsed(), reply, message.into_value())
            }
            Packet::Bundle(bundle) => {
                let time_base = self.clock.time_base();
                let time = bundle.elapsed_time(&time_base);
                interp.on_osc_bundle(time, reply, bundle.into_element_values(&time_base))
            }
        })
    }
}
