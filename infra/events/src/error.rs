use std::borrow::Cow;

/// Errors reported by hub and listener operations.
#[relay_derive::relay_error]
pub enum HubError {
    /// The control loop has exited (its cancellation token fired or every hub
    /// handle was dropped), so the request can never be accepted.
    #[error("Hub closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Channel capacities must be greater than zero.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl HubError {
    pub(crate) fn closed(operation: &'static str) -> Self {
        Self::Closed {
            message: "control loop is no longer running".into(),
            context: Some(operation.into()),
        }
    }
}
