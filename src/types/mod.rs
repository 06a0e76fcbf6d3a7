//! Core types shared between the registrar, the adapter, and the native
//! boundary: task identities, opaque handles, and variant options.

use std::fmt;

use serde::{Deserialize, Serialize};

mod handles;
mod options;

pub use handles::{
    ConstraintSetHandle, ContextHandle, PhysicalRegion, ProcessorHandle, ProcessorKind,
    RegionArray, RuntimeHandle, TaskDescriptor,
};
pub use options::TaskConfigOptions;

/// Stable identifier for a registered task variant.
///
/// Issued by the native runtime at registration time; the binding requests
/// auto-assignment with [`TaskId::AUTO_GENERATE`] rather than choosing ids
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(
    /// Raw id value issued by the runtime.
    pub u64,
);

impl TaskId {
    /// Sentinel requesting a runtime-generated unique id.
    pub const AUTO_GENERATE: TaskId = TaskId(u64::MAX);
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration identity of a task body: a `(namespace, name)` pair.
///
/// The namespace plays the role a declaring module plays in a dynamic host
/// language. The pair is the registry key, so two bodies with the same key
/// cannot both be registered.
///
/// # Examples
///
/// ```rust
/// use taskgrid::TaskKey;
///
/// let key = TaskKey::new("physics", "advance_cells");
/// assert_eq!(key.qualified_name(), "physics.advance_cells");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    namespace: String,
    name: String,
}

impl TaskKey {
    /// Create a key from a namespace and a task name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The declaring namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The task's own name within its namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted name the variant is registered under in the native task table.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_joins_with_dot() {
        let key = TaskKey::new("mod", "hello");
        assert_eq!(key.qualified_name(), "mod.hello");
        assert_eq!(key.to_string(), "mod.hello");
    }

    #[test]
    fn keys_compare_by_both_parts() {
        assert_eq!(TaskKey::new("a", "b"), TaskKey::new("a", "b"));
        assert_ne!(TaskKey::new("a", "b"), TaskKey::new("a", "c"));
        assert_ne!(TaskKey::new("a", "b"), TaskKey::new("x", "b"));
    }

    #[test]
    fn auto_generate_sentinel_is_all_ones() {
        assert_eq!(TaskId::AUTO_GENERATE.0, u64::MAX);
    }
}
