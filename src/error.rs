/// Broad classification of a failure, so callers can branch without parsing
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero/negative extents or steps, non-finite samples, a zero reference
    /// percentile, or a detuning axis that is not strictly monotonic.
    DegenerateInput,
    /// Detuning and signal lengths differ, or a trace is too short for the
    /// tail regression.
    ShapeMismatch,
    /// A configuration value is outside its valid range.
    InvalidConfig,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::DegenerateInput => "degenerate input",
            ErrorKind::ShapeMismatch => "shape mismatch",
            ErrorKind::InvalidConfig => "invalid config",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn degenerate_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DegenerateInput, message)
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShapeMismatch, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
