//! The runtime-facing OSC entry points.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::{
    io,
    net::ToSocketAddrs,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use scosc_proto::{ArgumentError, EncodeOptions, Encoder, Value};
use scosc_utils::{ControlsError, ElapsedClock, SharedControls};

use crate::{
    address::Destination,
    client::tcp::TcpLink,
    config::{NetworkConfig, ServerOptions},
    dispatch::Dispatcher,
    engine::{EngineLauncher, SynthEngine},
    error::{EngineError, ResolveError, Result, TransportError},
    inbound::{self, InboundSender, ReplySink},
    server::{tcp::TcpPort, udp::UdpPort},
};

/// Everything the runtime's OSC primitives share: the encoding flag, the clock, the
/// UDP port, the listener threads, the in-process engine and its control array.
///
/// Created together with the [`Dispatcher`] that drains its inbound traffic.
/// Dropping the context stops the listeners.
pub struct OscContext {
    use_doubles: AtomicBool,
    clock: ElapsedClock,
    controls: Arc<SharedControls>,
    engine: Mutex<Option<Box<dyn SynthEngine>>>,
    server_options: ServerOptions,
    udp: Option<Arc<UdpPort>>,
    tcp_addr: Option<SocketAddr>,
    inbound: InboundSender,
    max_frame: usize,
    running: Arc<AtomicBool>,
    listeners: Vec<JoinHandle<io::Result<()>>>,
}

impl core::fmt::Debug for OscContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OscContext")
            .field("use_doubles", &self.use_doubles)
            .field("udp", &self.udp)
            .field("tcp_addr", &self.tcp_addr)
            .field("engine_running", &self.in_process_server_running())
            .finish_non_exhaustive()
    }
}

impl OscContext {
    /// Binds the configured ports and starts listening.
    ///
    /// A UDP port that can't be bound is logged and left out: sending then only
    /// works over TCP links and to the in-process server. A TCP port that can't be
    /// bound is an error.
    pub fn start(config: &NetworkConfig) -> Result<(Self, Dispatcher)> {
        let (mut ctx, dispatcher) = Self::offline(config);

        let bind = |port| SocketAddrV4::new(config.bind_address, port);

        match UdpPort::bind(bind(config.udp_port), config.recv_timeout()) {
            Ok(port) => {
                let port = Arc::new(port);
                log::info!("Listening for OSC on UDP {}", port.local_addr()?);

                let mut handler = ctx.inbound.clone();
                let running = Arc::clone(&ctx.running);
                let listener = Arc::clone(&port);

                ctx.listeners.push(
                    std::thread::Builder::new()
                        .name("osc-udp".into())
                        .spawn(move || listener.listen(&mut handler, &running))?,
                );
                ctx.udp = Some(port);
            }
            Err(e) => log::error!("Could not bind UDP port {}: {e}. No networking.", config.udp_port),
        }

        if let Some(tcp_port) = config.tcp_port {
            let port = TcpPort::bind(bind(tcp_port), config.recv_timeout(), config.max_tcp_frame_bytes)?;
            let addr = port.local_addr()?;
            log::info!("Listening for OSC on TCP {addr}");

            let handler = ctx.inbound.clone();
            let running = Arc::clone(&ctx.running);

            ctx.listeners.push(
                std::thread::Builder::new()
                    .name("osc-tcp".into())
                    .spawn(move || port.listen(&handler, &running))?,
            );
            ctx.tcp_addr = Some(addr);
        }

        Ok((ctx, dispatcher))
    }

    /// A context without any listening socket. Only TCP links and the in-process
    /// server can carry packets.
    pub fn offline(config: &NetworkConfig) -> (Self, Dispatcher) {
        let (tx, rx) = inbound::channel();
        let clock = ElapsedClock::new();

        let ctx = Self {
            use_doubles: AtomicBool::new(config.use_doubles),
            clock: clock.clone(),
            controls: Arc::new(SharedControls::default()),
            engine: Mutex::new(None),
            server_options: config.server,
            udp: None,
            tcp_addr: None,
            inbound: tx,
            max_frame: config.max_tcp_frame_bytes,
            running: Arc::new(AtomicBool::new(true)),
            listeners: Vec::new(),
        };

        (ctx, Dispatcher::new(rx, clock))
    }

    /// Address of the UDP port, if one is bound.
    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.udp.as_ref().and_then(|p| p.local_addr().ok())
    }

    /// Address of the TCP listener, if one is running.
    #[inline(always)]
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    /// The runtime's current elapsed time, in seconds.
    #[inline(always)]
    pub fn elapsed_time(&self) -> f64 {
        self.clock.elapsed()
    }

    #[inline(always)]
    pub fn use_doubles(&self) -> bool {
        self.use_doubles.load(Ordering::Relaxed)
    }

    /// Chooses between `f` and `d` for floating point arguments of subsequently
    /// encoded packets.
    #[inline(always)]
    pub fn set_use_doubles(&self, flag: bool) {
        self.use_doubles.store(flag, Ordering::Relaxed);
    }

    /// An encoder snapshotting the current settings.
    pub fn encoder(&self) -> Encoder {
        Encoder::new(EncodeOptions {
            use_doubles: self.use_doubles(),
            time_base: self.clock.time_base(),
        })
    }

    // ---- connections

    /// Opens a persistent TCP link to `dest`. Does nothing if one is already open.
    pub fn connect(&self, dest: &mut Destination) -> core::result::Result<(), TransportError> {
        if dest.is_connected() {
            return Ok(());
        }

        let link = TcpLink::connect(dest.addr(), self.inbound.clone(), self.max_frame)?;
        dest.attach(link);
        Ok(())
    }

    /// Closes the TCP link of `dest`, if any. Safe to call repeatedly.
    pub fn disconnect(&self, dest: &mut Destination) {
        if let Some(link) = dest.detach() {
            link.close();
        }
    }

    // ---- sending

    /// Encodes `values` as a tagged message and sends it.
    pub fn send_msg(&self, dest: &mut Destination, values: &[Value]) -> Result<()> {
        let packet = self.encoder().encode_message_tagged(values)?;
        self.send(dest, &packet, true)?;
        Ok(())
    }

    /// Encodes `values` as a bundle and sends it.
    ///
    /// A numeric bundle time is taken relative to `thread_seconds`, the sending
    /// thread's logical time.
    pub fn send_bundle(
        &self,
        dest: &mut Destination,
        thread_seconds: f64,
        values: &[Value],
    ) -> Result<()> {
        let packet = self.encode_timed_bundle(thread_seconds, values)?;
        self.send(dest, &packet, true)?;
        Ok(())
    }

    /// Sends the bytes of a blob or string verbatim. Over TCP, no length prefix is
    /// added.
    pub fn send_raw(&self, dest: &mut Destination, value: &Value) -> Result<()> {
        let bytes = match value {
            Value::Blob(b) => b.as_slice(),
            Value::String(s) => s.as_bytes(),
            other => {
                return Err(ArgumentError {
                    expected: "blob or string",
                    found: other.kind(),
                }
                .into());
            }
        };

        self.send(dest, bytes, false)?;
        Ok(())
    }

    /// Routes an encoded packet. Order of preference: the destination's TCP link,
    /// the in-process server (host `0`, only while it runs), the shared UDP port.
    fn send(
        &self,
        dest: &mut Destination,
        bytes: &[u8],
        framed: bool,
    ) -> core::result::Result<(), TransportError> {
        if let Some(link) = dest.link() {
            if link.is_open() {
                let res = if framed {
                    link.send_framed(bytes)
                } else {
                    link.send_unframed(bytes)
                };

                if let Err(TransportError::Closed(_)) = &res {
                    dest.detach();
                }

                return res;
            }

            log::debug!("TCP link to {} was closed, falling back", dest.addr());
            dest.detach();
        }

        if dest.is_local() {
            let engine = self.engine();

            if let Some(engine) = engine.as_deref()
                && engine.is_running()
            {
                engine.deliver(bytes, &ReplySink::new(self.inbound.clone()));
                return Ok(());
            }
        }

        let udp = self.udp.as_ref().ok_or(TransportError::NoRoute(dest.addr()))?;

        udp.send_to(bytes, dest.addr())
            .map_err(|source| TransportError::WriteFailed {
                addr: dest.addr(),
                source,
            })
    }

    // ---- sizes and raw encoding

    /// Size in bytes of the tagged message `values` encodes to.
    pub fn msg_size(&self, values: &[Value]) -> Result<usize> {
        require_non_empty(values)?;
        Ok(self.encoder().encode_message_tagged(values)?.len())
    }

    /// Size in bytes of the bundle `values` encodes to, time in elapsed seconds.
    pub fn bundle_size(&self, values: &[Value]) -> Result<usize> {
        require_non_empty(values)?;
        Ok(self.encoder().encode_bundle(values, true)?.len())
    }

    /// Encodes a message or a bundle, picked by the type of `values[0]`.
    ///
    /// A number or nil starts a bundle, with its time taken as absolute OSC seconds
    /// rather than elapsed time. A symbol or string starts a tagged message.
    pub fn osc_bytes(&self, values: &[Value]) -> Result<Vec<u8>> {
        let encoder = self.encoder();

        match values.first() {
            Some(Value::Nil | Value::Int(_) | Value::Float(_) | Value::Double(_)) => {
                Ok(encoder.encode_bundle(values, false)?)
            }
            Some(Value::Symbol(_) | Value::String(_)) => Ok(encoder.encode_message_tagged(values)?),
            first => Err(ArgumentError {
                expected: "number, nil, symbol or string",
                found: first.map_or("nothing", Value::kind),
            }
            .into()),
        }
    }

    fn encode_timed_bundle(&self, thread_seconds: f64, values: &[Value]) -> Result<Vec<u8>> {
        let encoder = self.encoder();

        let Some((time, elements)) = values.split_first() else {
            return Ok(encoder.encode_bundle(values, true)?);
        };

        // non-numeric times mean "immediately" and aren't shifted
        let Some(time) = time.as_f64() else {
            return Ok(encoder.encode_bundle(values, true)?);
        };

        let mut shifted = Vec::with_capacity(values.len());
        shifted.push(Value::Double(time + thread_seconds));
        shifted.extend_from_slice(elements);

        Ok(encoder.encode_bundle(&shifted, true)?)
    }

    // ---- name resolution

    /// Resolves `name` to its first IPv4 address.
    pub fn host_by_name(name: &str) -> core::result::Result<Ipv4Addr, ResolveError> {
        let addrs = (name, 0)
            .to_socket_addrs()
            .map_err(|source| ResolveError::Lookup {
                host: name.to_owned(),
                source,
            })?;

        addrs
            .into_iter()
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .ok_or_else(|| ResolveError::NoIpv4(name.to_owned()))
    }

    // ---- in-process server

    fn engine(&self) -> MutexGuard<'_, Option<Box<dyn SynthEngine>>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_process_server_running(&self) -> bool {
        self.engine().as_ref().is_some_and(|e| e.is_running())
    }

    /// Boots an in-process server with the configured options. Does nothing if one
    /// is already running.
    pub fn boot_in_process_server(
        &self,
        launcher: &dyn EngineLauncher,
    ) -> core::result::Result<(), EngineError> {
        self.boot_in_process_server_with(launcher, &self.server_options)
    }

    /// Boots an in-process server with explicit options.
    pub fn boot_in_process_server_with(
        &self,
        launcher: &dyn EngineLauncher,
        options: &ServerOptions,
    ) -> core::result::Result<(), EngineError> {
        let mut engine = self.engine();

        if engine.as_ref().is_some_and(|e| e.is_running()) {
            return Ok(());
        }

        *engine = Some(launcher.boot(options, Arc::clone(&self.controls))?);
        log::info!("In-process server booted");
        Ok(())
    }

    /// Asks the in-process server to quit and returns immediately. The shutdown
    /// completes on a background thread.
    pub fn quit_in_process_server(&self) {
        let Some(engine) = self.engine().take() else {
            return;
        };

        let spawned = std::thread::Builder::new()
            .name("osc-engine-quit".into())
            .spawn(move || {
                engine.quit();
                log::info!("In-process server quit");
            });

        if let Err(e) = spawned {
            log::error!("Could not spawn the engine shutdown thread: {e}");
        }
    }

    // ---- shared controls

    /// The shared control array handed to booted engines.
    #[inline(always)]
    pub fn shared_controls(&self) -> &Arc<SharedControls> {
        &self.controls
    }

    /// Replaces the control array with `count` zeroed cells. Non-positive counts
    /// give an empty array. Refused while the in-process server runs.
    pub fn alloc_shared_controls(&self, count: i32) -> core::result::Result<(), ControlsError> {
        if self.in_process_server_running() {
            return Err(ControlsError::EngineRunning);
        }

        self.controls.resize(usize::try_from(count).unwrap_or(0))
    }

    /// Reads a cell. Out-of-range indices read `0.0`.
    pub fn shared_control(&self, index: i32) -> f32 {
        usize::try_from(index).map_or(0., |i| self.controls.get(i))
    }

    /// Writes a cell. Out-of-range indices are ignored.
    pub fn set_shared_control(&self, index: i32, value: f32) {
        if let Ok(i) = usize::try_from(index) {
            self.controls.set(i, value);
        }
    }

    /// Stops the listener threads and waits for them to exit.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);

        for listener in self.listeners.drain(..) {
            match listener.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("OSC listener stopped with an error: {e}"),
                Err(_) => log::error!("OSC listener panicked"),
            }
        }
    }
}

fn require_non_empty(values: &[Value]) -> core::result::Result<(), ArgumentError> {
    if values.is_empty() {
        return Err(ArgumentError {
            expected: "non-empty array",
            found: "empty array",
        });
    }
    Ok(())
}

impl Drop for OscContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
