use tracing::warn;

use crate::error::DecoratorError;

/// Receives decorator failures caught during message construction.
#[cfg_attr(test, mockall::automock)]
pub trait Diagnostics: Send + Sync {
    /// Called once per failed decorator invocation, after the field has been recorded as absent.
    fn decorator_failed(&self, message_id: i64, field: &str, error: &DecoratorError);
}

/// Default diagnostics sink, emitting a `tracing` warning per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn decorator_failed(&self, message_id: i64, field: &str, error: &DecoratorError) {
        warn!(
            message_id,
            field,
            error = %error,
            "Decorator failed, field recorded as absent"
        );
    }
}
