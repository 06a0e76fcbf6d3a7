//! Opaque handle types for objects owned by the native grid runtime.
//!
//! Every handle in this module is a borrowed view of runtime-owned state.
//! The runtime creates them, the runtime destroys them; the binding never
//! frees a handle and never dereferences one. Handles delivered by the task
//! preamble are valid only until the matching postamble call and must not be
//! retained across invocations.

use std::fmt;

/// Raw word backing every opaque handle.
///
/// The native ABI passes handles as pointers; the binding stores them as a
/// plain word so handle types stay `Send`/`Sync` and can be fabricated by
/// the mock runtime. The `native` FFI layer converts to and from pointers at
/// the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RawHandle(pub(crate) usize);

macro_rules! opaque_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) RawHandle);

        impl $name {
            /// Build a handle from a raw word produced by the native runtime.
            pub const fn from_raw(raw: usize) -> Self {
                Self(RawHandle(raw))
            }

            /// The raw word, for handing back across the native boundary.
            pub const fn as_raw(self) -> usize {
                (self.0).0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), (self.0).0)
            }
        }
    };
}

opaque_handle! {
    /// Descriptor for one task invocation, produced by the preamble.
    ///
    /// Carries the runtime's view of the running task (arguments, futures,
    /// mapping metadata). Valid for the duration of a single invocation.
    TaskDescriptor
}

opaque_handle! {
    /// Handle to a physical region mapped for a task invocation.
    ///
    /// Region order is positionally significant: the runtime assigns meaning
    /// to each index, so the binding preserves preamble order exactly.
    PhysicalRegion
}

opaque_handle! {
    /// Per-invocation execution context handle.
    ContextHandle
}

opaque_handle! {
    /// Handle to the grid runtime instance driving the invocation.
    RuntimeHandle
}

opaque_handle! {
    /// Opaque processor handle identifying where an invocation runs.
    ///
    /// Forwarded verbatim into the preamble; the binding never inspects it.
    ProcessorHandle
}

/// Runtime-owned array of physical region handles, as delivered by the
/// preamble: a base handle plus an element count.
///
/// The binding reads elements by index through
/// [`GridRuntime::region_at`](crate::native::GridRuntime::region_at) and
/// never takes ownership of the array storage.
#[derive(Debug, Clone, Copy)]
pub struct RegionArray {
    pub(crate) base: RawHandle,
    pub(crate) count: u32,
}

impl RegionArray {
    /// Build an array view from the preamble's out-parameters.
    pub fn from_raw(base: usize, count: u32) -> Self {
        Self {
            base: RawHandle(base),
            count,
        }
    }

    /// Number of regions mapped for this invocation.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// True when the invocation mapped no regions.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The raw base word of the native array.
    pub fn base_raw(&self) -> usize {
        self.base.0
    }
}

/// Processor category used in execution constraints.
///
/// The runtime defines the catalog of kinds; the binding only ever asks for
/// the single "host-language-capable" kind via
/// [`GridRuntime::extern_processor_kind`](crate::native::GridRuntime::extern_processor_kind)
/// and passes it back opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorKind(
    /// Raw kind value from the runtime's processor catalog.
    pub u32,
);

/// Handle to a native constraint set (execution or layout).
///
/// Constraint sets follow a create/configure/destroy lifecycle; see
/// [`ConstraintSetGuard`](crate::native::ConstraintSetGuard) for the scoped
/// release the registrar relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintSetHandle(pub(crate) RawHandle);

impl ConstraintSetHandle {
    /// Build a handle from a raw word produced by the native runtime.
    pub const fn from_raw(raw: usize) -> Self {
        Self(RawHandle(raw))
    }

    /// The raw word, for handing back across the native boundary.
    pub const fn as_raw(self) -> usize {
        (self.0).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_round_trip_raw_words() {
        let ctx = ContextHandle::from_raw(0xdead_beef);
        assert_eq!(ctx.as_raw(), 0xdead_beef);
        assert_eq!(ctx, ContextHandle::from_raw(0xdead_beef));
        assert_ne!(ctx, ContextHandle::from_raw(0x1));
    }

    #[test]
    fn region_array_reports_emptiness() {
        assert!(RegionArray::from_raw(0, 0).is_empty());
        let arr = RegionArray::from_raw(0x100, 3);
        assert_eq!(arr.len(), 3);
        assert!(!arr.is_empty());
    }

    #[test]
    fn debug_format_is_hex() {
        let task = TaskDescriptor::from_raw(0xff);
        assert_eq!(format!("{:?}", task), "TaskDescriptor(0xff)");
    }
}
