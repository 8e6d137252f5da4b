mod common;

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use common::Recorder;
use pretty_assertions::assert_eq;
use scosc_network::{
    Destination, EngineError, EngineLauncher, Error, NetworkConfig, OscContext, ReplyAddress,
    ReplySink, ServerOptions, SynthEngine, TransportError,
    scosc_proto::{Value, decode_message},
    scosc_utils::{ControlsError, SharedControls},
};

/// Answers every message with `/done <command>` and mirrors `/c_set` into the
/// shared controls.
struct EchoEngine {
    running: Arc<AtomicBool>,
    controls: Arc<SharedControls>,
}

impl SynthEngine for EchoEngine {
    fn deliver(&self, packet: &[u8], reply: &ReplySink) {
        let Ok(message) = decode_message(packet) else {
            return;
        };

        if let (
            "/c_set",
            [Value::Int(index), Value::Float(value)],
        ) = (message.command.as_str(), message.args.as_slice())
        {
            self.controls.set(*index as usize, *value);
        }

        let mut done = b"/done\0\0\0,s\0\0".to_vec();
        done.extend_from_slice(message.command.as_bytes());
        done.resize((done.len() + 4) & !3, 0);
        reply.reply(&done);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn quit(self: Box<Self>) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Launcher {
    booted: Mutex<Vec<ServerOptions>>,
    running: Arc<AtomicBool>,
}

impl EngineLauncher for Launcher {
    fn boot(
        &self,
        options: &ServerOptions,
        controls: Arc<SharedControls>,
    ) -> Result<Box<dyn SynthEngine>, EngineError> {
        if options.block_size == 0 {
            return Err(EngineError::Options("block size must be positive".into()));
        }

        self.booted.lock().unwrap().push(*options);
        self.running.store(true, Ordering::Relaxed);

        Ok(Box::new(EchoEngine {
            running: Arc::clone(&self.running),
            controls,
        }))
    }
}

#[test]
fn local_destination_reaches_the_engine() {
    let (ctx, dispatcher) = OscContext::offline(&NetworkConfig::default());
    let launcher = Launcher::default();

    ctx.boot_in_process_server(&launcher).unwrap();
    assert!(ctx.in_process_server_running());

    let mut server = Destination::local(57110);
    ctx.send_msg(&mut server, &[Value::symbol("/c_set"), Value::Int(2), Value::Float(0.75)])
        .unwrap();

    // written by the engine, visible to the runtime
    assert_eq!(ctx.shared_control(2), 0.75);

    // the reply is queued, not delivered during the send
    let mut interp = Recorder::default();
    assert_eq!(dispatcher.dispatch_pending(&mut interp), 1);
    assert_eq!(
        interp.messages,
        vec![(
            ReplyAddress::LOCAL,
            Value::Array(vec![Value::symbol("/done"), Value::symbol("/c_set")])
        )]
    );
}

#[test]
fn booting_twice_is_a_no_op() {
    let (ctx, _dispatcher) = OscContext::offline(&NetworkConfig::default());
    let launcher = Launcher::default();

    ctx.boot_in_process_server(&launcher).unwrap();
    ctx.boot_in_process_server(&launcher).unwrap();

    assert_eq!(*launcher.booted.lock().unwrap(), vec![ServerOptions::default()]);
}

#[test]
fn boot_failures_are_returned() {
    let (ctx, _dispatcher) = OscContext::offline(&NetworkConfig::default());
    let options = ServerOptions {
        block_size: 0,
        ..Default::default()
    };

    assert!(matches!(
        ctx.boot_in_process_server_with(&Launcher::default(), &options),
        Err(EngineError::Options(_))
    ));
    assert!(!ctx.in_process_server_running());
}

#[test]
fn controls_are_locked_while_the_engine_runs() {
    let (ctx, _dispatcher) = OscContext::offline(&NetworkConfig::default());
    let launcher = Launcher::default();

    ctx.boot_in_process_server(&launcher).unwrap();
    assert_eq!(ctx.alloc_shared_controls(8), Err(ControlsError::EngineRunning));

    ctx.quit_in_process_server();
    assert!(!ctx.in_process_server_running());

    for _ in 0..200 {
        if !launcher.running.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert!(!launcher.running.load(Ordering::Relaxed));

    ctx.alloc_shared_controls(8).unwrap();
    assert_eq!(ctx.shared_controls().len(), 8);

    // offline context: with the engine gone there is no UDP port to fall back on
    let mut server = Destination::local(57110);
    assert!(matches!(
        ctx.send_msg(&mut server, &[Value::symbol("/status")]),
        Err(Error::Transport(TransportError::NoRoute(_)))
    ));
}
