mod common;

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    time::Duration,
};

use common::{Recorder, loopback_config, v4};
use pretty_assertions::assert_eq;
use scosc_network::{
    Destination, NetworkConfig, OscContext, ReplyAddress, framing::write_framed,
    scosc_proto::{Value, decode_message},
};

fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut len = [0; 4];
    stream.read_exact(&mut len).unwrap();

    let mut packet = vec![0; u32::from_be_bytes(len) as usize];
    stream.read_exact(&mut packet).unwrap();
    packet
}

#[test]
fn connected_destination_uses_framed_tcp() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let server_addr = v4(server.local_addr().unwrap());

    let (ctx, dispatcher) = OscContext::start(&loopback_config()).unwrap();
    let mut dest = Destination::new(server_addr);

    ctx.connect(&mut dest).unwrap();
    assert!(dest.is_connected());
    // connecting twice keeps the existing link
    ctx.connect(&mut dest).unwrap();

    let (mut peer, _) = server.accept().unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    ctx.send_msg(&mut dest, &[Value::symbol("/notify"), Value::Int(1)]).unwrap();

    let packet = read_frame(&mut peer);
    let message = decode_message(&packet).unwrap();
    assert_eq!(message.command, "/notify");
    assert_eq!(message.args, vec![Value::Int(1)]);

    // raw sends skip the length prefix
    ctx.send_raw(&mut dest, &Value::string("hello")).unwrap();
    let mut raw = [0; 5];
    peer.read_exact(&mut raw).unwrap();
    assert_eq!(&raw, b"hello");

    // replies come back through the dispatcher, from the server's address
    write_framed(&mut peer, b"/done\0\0\0,s\0\0/notify\0").unwrap();

    let mut interp = Recorder::default();
    interp.wait_for(&dispatcher, |r| !r.messages.is_empty());
    assert_eq!(
        interp.messages,
        vec![(
            ReplyAddress::from(server_addr),
            Value::Array(vec![Value::symbol("/done"), Value::symbol("/notify")])
        )]
    );

    ctx.disconnect(&mut dest);
    ctx.disconnect(&mut dest);
    assert!(!dest.is_connected());
}

#[test]
fn peer_close_is_reported_and_sends_fall_back_to_udp() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let server_addr = v4(server.local_addr().unwrap());

    let (ctx, dispatcher) = OscContext::start(&loopback_config()).unwrap();
    let mut dest = Destination::new(server_addr);
    ctx.connect(&mut dest).unwrap();

    let (peer, _) = server.accept().unwrap();
    drop(peer);

    let mut interp = Recorder::default();
    interp.wait_for(&dispatcher, |r| !r.closed.is_empty());
    assert_eq!(interp.closed, vec![server_addr]);
    assert!(!dest.is_connected());

    // nothing listens on UDP there, but the datagram still goes out
    ctx.send_msg(&mut dest, &[Value::symbol("/status")]).unwrap();
}

#[test]
fn local_disconnect_is_not_reported_as_a_close() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let (ctx, dispatcher) = OscContext::start(&loopback_config()).unwrap();

    let mut dest = Destination::new(v4(server.local_addr().unwrap()));
    ctx.connect(&mut dest).unwrap();
    let (_peer, _) = server.accept().unwrap();

    // joins the reader, so anything it queued is already in the channel
    ctx.disconnect(&mut dest);

    let mut interp = Recorder::default();
    dispatcher.dispatch_pending(&mut interp);
    assert!(interp.closed.is_empty(), "got {:?}", interp.closed);
    assert!(!dest.is_connected());
}

#[test]
fn connect_failure_is_reported() {
    // bind then drop to get a port nobody listens on
    let addr = v4(TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap());

    let (ctx, _dispatcher) = OscContext::offline(&NetworkConfig::default());
    let mut dest = Destination::new(addr);

    assert!(matches!(
        ctx.connect(&mut dest),
        Err(scosc_network::TransportError::ConnectFailed { .. })
    ));
    assert!(!dest.is_connected());
}

#[test]
fn tcp_listener_accepts_framed_packets() {
    let config = NetworkConfig {
        tcp_port: Some(0),
        ..loopback_config()
    };
    let (ctx, dispatcher) = OscContext::start(&config).unwrap();

    let mut client = TcpStream::connect(ctx.tcp_addr().unwrap()).unwrap();
    let client_addr = v4(client.local_addr().unwrap());

    let mut stream = Vec::new();
    write_framed(&mut stream, b"/a\0\0,i\0\0\0\0\0\x01").unwrap();
    write_framed(&mut stream, b"/b\0\0,i\0\0\0\0\0\x02").unwrap();
    client.write_all(&stream).unwrap();

    let mut interp = Recorder::default();
    interp.wait_for(&dispatcher, |r| r.messages.len() == 2);

    assert_eq!(
        interp.messages,
        vec![
            (
                ReplyAddress::from(client_addr),
                Value::Array(vec![Value::symbol("/a"), Value::Int(1)])
            ),
            (
                ReplyAddress::from(client_addr),
                Value::Array(vec![Value::symbol("/b"), Value::Int(2)])
            ),
        ]
    );
}
