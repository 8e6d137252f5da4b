//! The single inbound channel.
//!
//! Every producer (the UDP listener, TCP server connections, TCP link readers and the
//! in-process engine's reply path) pushes owned packets here. Only the interpreter
//! thread consumes them, through a [`Dispatcher`](crate::Dispatcher).

use core::net::SocketAddrV4;

use crossbeam_channel::{Receiver, Sender};

use crate::address::ReplyAddress;

/// How a packet reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    Tcp,
    InProcess,
}

/// A raw packet and the address a reply should go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    pub data: Box<[u8]>,
    pub reply: ReplyAddress,
    pub transport: TransportKind,
}

/// An event for the interpreter thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Packet(InboundPacket),
    /// The peer of an outbound TCP link closed the connection.
    ConnectionClosed(SocketAddrV4),
}

pub type InboundSender = Sender<Inbound>;
pub type InboundReceiver = Receiver<Inbound>;

#[inline(always)]
pub fn channel() -> (InboundSender, InboundReceiver) {
    crossbeam_channel::unbounded()
}

/// Handle through which the in-process engine replies to the language.
///
/// Replies are queued like any network packet, with [`ReplyAddress::LOCAL`], and
/// reach the interpreter at its next dispatch rather than during the send call.
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: InboundSender,
}

impl ReplySink {
    #[inline(always)]
    pub fn new(tx: InboundSender) -> Self {
        Self { tx }
    }

    /// Queues a reply packet. Returns `false` if nobody is listening anymore.
    pub fn reply(&self, packet: &[u8]) -> bool {
        self.tx
            .send(Inbound::Packet(InboundPacket {
                data: packet.into(),
                reply: ReplyAddress::LOCAL,
                transport: TransportKind::InProcess,
            }))
            .is_ok()
    }
}
