//! Error types for the beck engine.

use alloc::string::String;
use core::fmt;

/// Result type alias for beck operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for beck engine operations.
///
/// Every failure is terminal for the stream it occurs on: it is delivered
/// through the error channel and the stream does not resume. There is no
/// silent-drop mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A key selector failed while deriving a key from a value.
    KeySelector {
        message: String,
    },
    /// A filter predicate or equality predicate failed.
    Predicate {
        message: String,
    },
    /// A per-item resource factory failed.
    ResourceFactory {
        message: String,
    },
    /// An upstream stream failed; forwarded after local teardown.
    Upstream {
        message: String,
    },
    /// Operation on a terminated stream or other misuse.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::KeySelector { message } => {
                write!(f, "Key selector failed: {}", message)
            }
            Error::Predicate { message } => {
                write!(f, "Predicate failed: {}", message)
            }
            Error::ResourceFactory { message } => {
                write!(f, "Resource factory failed: {}", message)
            }
            Error::Upstream { message } => {
                write!(f, "Upstream failed: {}", message)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a key selector error.
    pub fn key_selector(message: impl Into<String>) -> Self {
        Error::KeySelector {
            message: message.into(),
        }
    }

    /// Creates a predicate error.
    pub fn predicate(message: impl Into<String>) -> Self {
        Error::Predicate {
            message: message.into(),
        }
    }

    /// Creates a resource factory error.
    pub fn resource_factory(message: impl Into<String>) -> Self {
        Error::ResourceFactory {
            message: message.into(),
        }
    }

    /// Creates an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::key_selector("no id field");
        assert!(err.to_string().contains("Key selector"));

        let err = Error::resource_factory("socket refused");
        assert!(err.to_string().contains("Resource factory"));

        let err = Error::upstream("source dropped");
        assert!(err.to_string().contains("source dropped"));
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::predicate("overflow");
        match err {
            Error::Predicate { message } => assert_eq!(message, "overflow"),
            _ => panic!("Wrong error type"),
        }
    }
}
