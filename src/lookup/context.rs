//! Diagnostic channel back to the host framework.

/// Per-lookup diagnostic seam exposed by the host framework.
///
/// `explain` carries structured "why did this resolve the way it did"
/// messages; the closure keeps message construction lazy so hosts that do
/// not collect explanations pay nothing. Messages must never contain secret
/// values.
pub trait LookupContext: Send + Sync {
    /// Report a diagnostic message for this lookup.
    fn explain(&self, message: &dyn Fn() -> String);
}

/// Context that forwards explanations to the tracing subscriber at debug
/// level. The default when the host has no explanation channel of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingContext;

impl LookupContext for TracingContext {
    fn explain(&self, message: &dyn Fn() -> String) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(message = %message(), "lookup explanation");
        }
    }
}
