/// The unified error type returned by the tool-execution pipeline.
///
/// Filters translate only the errors they own; everything else passes
/// through unwrapped via the `Upstream` variant. User-visible messages
/// never leak stack traces, panic messages, file paths, or query-string
/// secrets — see each variant's `Display` impl.
#[derive(Debug)]
pub enum FilterError {
    /// A call-policy rule (or a policy's default action) denied the call.
    PolicyDenied { message: String },

    /// A call-policy rule (or a policy's default action) requires human
    /// approval before the call may proceed.
    ApprovalRequired,

    /// The tool's service could not be found in the tool manager.
    PolicyMissingContext,

    /// The request's tool inputs could not be serialized for rule matching.
    PolicyArgsUnserializable { message: String },

    /// The circuit breaker for this service is open.
    CircuitBreakerOpen,

    /// The ambient context was cancelled before the call completed.
    ContextCanceled,

    /// The ambient context's deadline passed before the call completed.
    DeadlineExceeded,

    /// An error surfaced by the wrapped executor itself.
    Upstream(Box<dyn std::error::Error + Send + Sync>),
}

impl FilterError {
    pub fn policy_denied(default: bool) -> Self {
        let message = if default {
            "execution denied by default policy".to_string()
        } else {
            "execution denied by policy".to_string()
        };
        FilterError::PolicyDenied { message }
    }

    /// Whether the retry runner should treat this error as transient and
    /// retry it: everything except an open breaker or a context
    /// cancellation/deadline.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            FilterError::CircuitBreakerOpen
                | FilterError::ContextCanceled
                | FilterError::DeadlineExceeded
        )
    }
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::PolicyDenied { message } => write!(f, "{message}"),
            FilterError::ApprovalRequired => write!(f, "execution requires human approval"),
            FilterError::PolicyMissingContext => write!(f, "service info not found"),
            FilterError::PolicyArgsUnserializable { message } => {
                write!(f, "tool arguments could not be serialized: {message}")
            }
            FilterError::CircuitBreakerOpen => write!(f, "circuit breaker is open"),
            FilterError::ContextCanceled => write!(f, "request was cancelled"),
            FilterError::DeadlineExceeded => write!(f, "request deadline exceeded"),
            FilterError::Upstream(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::Upstream(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FilterError {
    fn from(err: std::io::Error) -> Self {
        FilterError::Upstream(Box::new(err))
    }
}

impl From<regex::Error> for FilterError {
    fn from(err: regex::Error) -> Self {
        FilterError::PolicyArgsUnserializable {
            message: err.to_string(),
        }
    }
}
