//! Error types for the taskgrid binding.
//!
//! Every failure surfaces synchronously to whichever caller drove the
//! registration or invocation; there is no background error channel.

use crate::types::{TaskId, TaskKey};

/// Boxed error type task bodies may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using the taskgrid [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the binding layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task body with this identity is already registered.
    ///
    /// Registration is one-time per identity; registering twice is a
    /// programming error, not a runtime condition to recover from.
    #[error("task '{key}' is already registered")]
    DuplicateRegistration {
        /// Identity that was registered twice.
        key: TaskKey,
    },

    /// A task body produced a return value.
    ///
    /// Return-value propagation to the native runtime is not supported in
    /// this version; the invocation fails before the postamble rather than
    /// silently dropping the value.
    #[error("task '{name}' returned a value; return-value propagation is not supported")]
    UnsupportedReturnValue {
        /// Qualified name of the offending task.
        name: String,
    },

    /// A native entry point reported failure.
    ///
    /// The binding propagates the raw status code without interpreting it
    /// and never retries.
    #[error("native call '{call}' failed with status {code}")]
    NativeCall {
        /// Name of the native entry point that failed.
        call: &'static str,
        /// Raw status code reported by the runtime.
        code: i32,
    },

    /// A task body failed during execution.
    ///
    /// The error propagates out of the adapter without a postamble call, so
    /// the runtime's completion bookkeeping is left inconsistent. This is a
    /// known gap in the completion contract, surfaced rather than hidden.
    #[error("task '{name}' failed during execution")]
    TaskBody {
        /// Qualified name of the failing task.
        name: String,
        /// The body's own error.
        #[source]
        source: BoxError,
    },

    /// Dispatch was requested for a task id the registry never issued.
    #[error("no task registered under id {id}")]
    UnknownTask {
        /// The unrecognized id.
        id: TaskId,
    },
}

impl Error {
    /// Shorthand for a [`Error::NativeCall`] with the given entry point and
    /// status code.
    pub(crate) fn native(call: &'static str, code: i32) -> Self {
        Error::NativeCall { call, code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_task() {
        let err = Error::DuplicateRegistration {
            key: TaskKey::new("mod", "hello"),
        };
        assert_eq!(err.to_string(), "task 'mod.hello' is already registered");
    }

    #[test]
    fn body_errors_expose_their_source() {
        let err = Error::TaskBody {
            name: "mod.hello".into(),
            source: "disk on fire".into(),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "disk on fire");
    }
}
