use std::fmt;

use serde::Serialize;

/// Structured error type for the compiler. Every variant is fatal to the
/// single call that raised it; nothing in the pipeline retries, because
/// every stage is pure and would reproduce the identical failure.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum CompileError {
    /// Malformed numeric parameter: too few samples, non-positive cycle
    /// count, frequency, or harmonic ratio. A contract violation by the
    /// caller, not a recoverable condition.
    InvalidArgument { message: String },
    /// A resolver received a spec whose discriminator it does not know.
    /// Indicates a template/pattern-library mismatch.
    UnsupportedSpec { what: String, discriminator: String },
    /// Unknown template, preset, or step-id reference. Raised before any
    /// compilation work is produced.
    NotFound { what: String },
    /// The sequence parser hit an out-of-range table index or a
    /// structurally invalid document.
    MalformedSequence { message: String },
    /// Sequence parser found an effect referencing a dedup table entry
    /// that does not exist.
    InvalidIndex { what: String, index: usize },
    /// I/O failure reading or writing a file (CLI and codec surface only).
    IoError { message: String },
    /// XML-level failure from the sequence codec.
    XmlError { message: String },
    /// JSON-level failure loading templates, presets, plans, or fixtures.
    ParseError { message: String },
}

impl CompileError {
    /// Convenience constructor for `InvalidArgument`.
    pub fn invalid(message: impl Into<String>) -> Self {
        CompileError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Convenience constructor for `UnsupportedSpec`.
    pub fn unsupported(what: impl Into<String>, discriminator: impl Into<String>) -> Self {
        CompileError::UnsupportedSpec {
            what: what.into(),
            discriminator: discriminator.into(),
        }
    }

    /// Convenience constructor for `NotFound`.
    pub fn not_found(what: impl Into<String>) -> Self {
        CompileError::NotFound { what: what.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidArgument { message } => {
                write!(f, "invalid argument: {message}")
            }
            CompileError::UnsupportedSpec {
                what,
                discriminator,
            } => write!(f, "unsupported {what} spec: '{discriminator}'"),
            CompileError::NotFound { what } => write!(f, "{what} not found"),
            CompileError::MalformedSequence { message } => {
                write!(f, "malformed sequence: {message}")
            }
            CompileError::InvalidIndex { what, index } => {
                write!(f, "malformed sequence: {what} index {index} out of range")
            }
            CompileError::IoError { message } => write!(f, "I/O error: {message}"),
            CompileError::XmlError { message } => write!(f, "XML error: {message}"),
            CompileError::ParseError { message } => write!(f, "parse error: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::IoError {
            message: e.to_string(),
        }
    }
}

impl From<quick_xml::Error> for CompileError {
    fn from(e: quick_xml::Error) -> Self {
        CompileError::XmlError {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        CompileError::ParseError {
            message: e.to_string(),
        }
    }
}
