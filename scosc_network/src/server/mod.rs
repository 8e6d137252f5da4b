//! Inbound listeners.
//!
//! Listeners run on their own threads and never decode anything: each received
//! packet goes, as raw bytes, to a [`PacketHandler`]. The handler used by
//! [`OscContext`](crate::OscContext) forwards everything to the inbound channel.

use core::net::SocketAddrV4;

use crate::{
    address::ReplyAddress,
    inbound::{Inbound, InboundPacket, InboundSender, TransportKind},
};

pub mod tcp;
pub mod udp;

/// Receives raw packets from a listener thread.
pub trait PacketHandler {
    /// Called on every received packet.
    ///
    /// Returning an error stops the listener that called it.
    fn on_packet(
        &mut self,
        source: SocketAddrV4,
        packet: Box<[u8]>,
        transport: TransportKind,
    ) -> std::io::Result<()>;
}

impl PacketHandler for InboundSender {
    fn on_packet(
        &mut self,
        source: SocketAddrV4,
        data: Box<[u8]>,
        transport: TransportKind,
    ) -> std::io::Result<()> {
        self.send(Inbound::Packet(InboundPacket {
            data,
            reply: ReplyAddress::from(source),
            transport,
        }))
        .map_err(|_| std::io::ErrorKind::BrokenPipe.into())
    }
}
