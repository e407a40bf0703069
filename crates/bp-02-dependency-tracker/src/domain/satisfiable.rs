//! Satisfiable contracts.

use std::sync::Arc;

/// Receives satisfaction changes of started satisfiables.
pub trait SatisfactionListener: Send + Sync {
    fn notify_satisfaction(&self, satisfiable: &dyn Satisfiable);
}

/// A watchable external dependency.
///
/// The name is a stable identity: several components referencing the same
/// dependency node share one satisfiable and it is started once.
pub trait Satisfiable: Send + Sync {
    fn name(&self) -> &str;

    /// Begin watching. Starting an already started unit is a no-op.
    fn start(&self, listener: Arc<dyn SatisfactionListener>);

    /// Stop watching. No listener callback runs after this returns.
    fn stop(&self);

    /// Non-blocking snapshot of the current state.
    fn is_satisfied(&self) -> bool;

    /// Human-readable watch predicate, reported while unsatisfied.
    fn filter(&self) -> String;
}
