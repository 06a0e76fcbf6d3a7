//! Per-variant configuration options passed through to the native runtime.

use serde::{Deserialize, Serialize};

/// Scheduling hints attached to a task variant at registration time.
///
/// All three flags default to `false`. They are consumed entirely by the
/// native runtime's scheduler; the binding validates nothing and passes them
/// through verbatim.
///
/// # Examples
///
/// ```rust
/// use taskgrid::TaskConfigOptions;
///
/// let options = TaskConfigOptions::new()
///     .with_leaf(true)
///     .with_idempotent(true);
///
/// assert!(options.leaf);
/// assert!(!options.inner);
/// assert!(options.idempotent);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfigOptions {
    /// The task makes no further sub-task calls.
    pub leaf: bool,

    /// The task only issues deferred sub-task calls and touches no data
    /// directly.
    pub inner: bool,

    /// The task is safe to re-execute after a failure.
    pub idempotent: bool,
}

impl TaskConfigOptions {
    /// Create options with every flag false.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leaf hint (task spawns no sub-tasks).
    pub fn with_leaf(mut self, leaf: bool) -> Self {
        self.leaf = leaf;
        self
    }

    /// Set the inner hint (task only issues deferred sub-task calls).
    pub fn with_inner(mut self, inner: bool) -> Self {
        self.inner = inner;
        self
    }

    /// Set the idempotent hint (safe to re-execute after failure).
    pub fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_all_false() {
        let options = TaskConfigOptions::new();
        assert_eq!(
            options,
            TaskConfigOptions {
                leaf: false,
                inner: false,
                idempotent: false,
            }
        );
    }

    #[test]
    fn builder_sets_individual_flags() {
        let options = TaskConfigOptions::new().with_inner(true);
        assert!(!options.leaf);
        assert!(options.inner);
        assert!(!options.idempotent);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(TaskConfigOptions::new().with_leaf(true)).unwrap();
        assert_eq!(json["leaf"], true);
        assert_eq!(json["inner"], false);
        assert_eq!(json["idempotent"], false);
    }
}
