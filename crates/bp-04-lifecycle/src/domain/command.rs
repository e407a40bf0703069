//! Commands processed by a container actor, one at a time.

use tokio::sync::oneshot;

#[derive(Debug)]
pub enum Command {
    /// Run one state machine pass.
    Run,
    HandlerRegistered(String),
    HandlerUnregistered(String),
    /// A satisfiable unit changed state.
    DependencyChanged(String),
    /// The dependency timer armed with this generation expired.
    TimeoutFired(u64),
    /// Tear the container down and acknowledge once finished.
    Destroy(oneshot::Sender<()>),
}
