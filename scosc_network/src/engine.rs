//! The seam between the language runtime and an in-process synthesis engine.
//!
//! The engine itself lives elsewhere. The runtime only needs to boot it, hand it
//! packets addressed to the local sentinel host, and ask it to quit.

use std::sync::Arc;

use scosc_utils::SharedControls;

use crate::{config::ServerOptions, error::EngineError, inbound::ReplySink};

/// A running in-process server.
pub trait SynthEngine: Send {
    /// Handles one OSC packet. Replies go through `reply`, and reach the interpreter
    /// at its next dispatch.
    fn deliver(&self, packet: &[u8], reply: &ReplySink);

    fn is_running(&self) -> bool;

    /// Stops the engine, blocking until it has fully shut down.
    fn quit(self: Box<Self>);
}

/// Creates engines.
pub trait EngineLauncher {
    /// Boots a new engine. `controls` is the shared control array the engine reads
    /// and writes for as long as it runs.
    fn boot(
        &self,
        options: &ServerOptions,
        controls: Arc<SharedControls>,
    ) -> Result<Box<dyn SynthEngine>, EngineError>;
}
