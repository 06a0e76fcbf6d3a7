//! Boundary with the native grid runtime.
//!
//! The runtime is reached through a fixed C ABI; this module fronts that ABI
//! with the [`GridRuntime`] trait so the rest of the binding is written
//! against a seam instead of raw symbols. Two implementations exist:
//!
//! - [`ffi::NativeGridRuntime`] (feature `native`) calls the real `tg_*`
//!   entry points and links against the native library.
//! - [`mock::MockGridRuntime`] is an in-process stand-in for development and
//!   testing with no native toolchain.
//!
//! The binding performs no interpretation of native status codes beyond
//! propagating them as [`Error::NativeCall`](crate::Error::NativeCall).

use crate::error::Result;
use crate::types::{
    ConstraintSetHandle, ContextHandle, PhysicalRegion, ProcessorHandle, ProcessorKind,
    RegionArray, RuntimeHandle, TaskConfigOptions, TaskDescriptor, TaskId,
};

#[cfg(feature = "native")]
pub mod ffi;
pub mod mock;

/// Everything the task preamble hands back for one invocation.
///
/// All handles are runtime-owned and valid only until the matching
/// postamble; the adapter borrows them for the call's duration and must not
/// retain them.
#[derive(Debug, Clone, Copy)]
pub struct Preamble {
    /// Descriptor for the running task.
    pub task: TaskDescriptor,
    /// The mapped physical regions, base plus count, in runtime order.
    pub regions: RegionArray,
    /// Per-invocation context handle.
    pub context: ContextHandle,
    /// Handle to the runtime instance driving the invocation.
    pub runtime: RuntimeHandle,
}

/// Parameters for one `register_task_variant` call.
///
/// User data is fixed at null/zero-length by the binding and therefore not
/// represented here.
#[derive(Debug, Clone, Copy)]
pub struct VariantRequest<'a> {
    /// Requested task id; [`TaskId::AUTO_GENERATE`] asks the runtime to
    /// assign one.
    pub task_id: TaskId,
    /// Dotted name the variant is registered under.
    pub qualified_name: &'a str,
    /// Whether the variant is broadcast to every runtime instance.
    ///
    /// The binding always registers process-local variants (`false`);
    /// distributed broadcast is the runtime's concern.
    pub global: bool,
    /// The declaring namespace, passed separately for the runtime's host
    /// dispatch tables.
    pub namespace: &'a str,
    /// The task's own name within its namespace.
    pub name: &'a str,
}

/// Call contract of the native grid runtime.
///
/// One method per native entry point the binding uses, with buffers and
/// handles in their Rust renderings. Implementations must be callable from
/// any thread: the runtime invokes tasks on threads of its own choosing.
pub trait GridRuntime: Send + Sync {
    /// Mandatory handshake before any task body runs.
    ///
    /// Hands the serialized argument buffer back to the runtime and receives
    /// the invocation's descriptor, region array, context, and runtime
    /// handles. Nothing from the returned [`Preamble`] may be used before
    /// this call completes, and the call must never be skipped.
    fn task_preamble(&self, args: &[u8], proc: ProcessorHandle) -> Result<Preamble>;

    /// Mandatory completion signal after a task body returns.
    ///
    /// Must be called exactly once per successful invocation with the
    /// runtime and context handles obtained from the preamble. `retval` is
    /// `None` in this version: the postamble is still the sole way the
    /// runtime learns the task finished.
    fn task_postamble(
        &self,
        runtime: RuntimeHandle,
        context: ContextHandle,
        retval: Option<&[u8]>,
    ) -> Result<()>;

    /// Read one element of a runtime-owned region array.
    ///
    /// `index` must be `< array.len()`; the runtime assigns positional
    /// meaning to each slot. This is array indexing, not a native entry
    /// point, so it cannot fail.
    fn region_at(&self, array: RegionArray, index: u32) -> PhysicalRegion;

    /// Register a task variant in the native task table.
    ///
    /// The constraint sets and options are consumed by value semantically;
    /// the caller remains responsible for destroying the sets afterwards.
    fn register_task_variant(
        &self,
        request: &VariantRequest<'_>,
        execution_constraints: ConstraintSetHandle,
        layout_constraints: ConstraintSetHandle,
        options: TaskConfigOptions,
    ) -> Result<TaskId>;

    /// Create an empty execution constraint set.
    fn execution_constraints_create(&self) -> Result<ConstraintSetHandle>;

    /// Restrict an execution constraint set to one processor kind.
    fn execution_constraints_add_processor(
        &self,
        set: ConstraintSetHandle,
        kind: ProcessorKind,
    ) -> Result<()>;

    /// Destroy an execution constraint set.
    fn execution_constraints_destroy(&self, set: ConstraintSetHandle);

    /// Create an empty layout constraint set.
    fn layout_constraints_create(&self) -> Result<ConstraintSetHandle>;

    /// Destroy a layout constraint set.
    fn layout_constraints_destroy(&self, set: ConstraintSetHandle);

    /// The runtime's built-in "host-language-capable" processor kind.
    fn extern_processor_kind(&self) -> ProcessorKind;

    /// Handle to the current runtime instance, used for registration calls.
    fn current_runtime(&self) -> Result<RuntimeHandle>;
}

/// Which destroy entry point a constraint set needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintSetKind {
    Execution,
    Layout,
}

/// Scoped owner of a native constraint set.
///
/// Constraint sets follow a create/configure/destroy lifecycle and the
/// destroy must run even when registration fails in between; the guard ties
/// the destroy call to scope exit.
pub struct ConstraintSetGuard<'rt> {
    runtime: &'rt dyn GridRuntime,
    handle: ConstraintSetHandle,
    kind: ConstraintSetKind,
}

impl<'rt> ConstraintSetGuard<'rt> {
    /// Create an execution constraint set owned by the guard.
    pub fn execution(runtime: &'rt dyn GridRuntime) -> Result<Self> {
        let handle = runtime.execution_constraints_create()?;
        Ok(Self {
            runtime,
            handle,
            kind: ConstraintSetKind::Execution,
        })
    }

    /// Create a layout constraint set owned by the guard.
    pub fn layout(runtime: &'rt dyn GridRuntime) -> Result<Self> {
        let handle = runtime.layout_constraints_create()?;
        Ok(Self {
            runtime,
            handle,
            kind: ConstraintSetKind::Layout,
        })
    }

    /// The underlying native handle.
    pub fn handle(&self) -> ConstraintSetHandle {
        self.handle
    }
}

impl Drop for ConstraintSetGuard<'_> {
    fn drop(&mut self) {
        match self.kind {
            ConstraintSetKind::Execution => self.runtime.execution_constraints_destroy(self.handle),
            ConstraintSetKind::Layout => self.runtime.layout_constraints_destroy(self.handle),
        }
    }
}

impl std::fmt::Debug for ConstraintSetGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSetGuard")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockGridRuntime, NativeCall};
    use super::*;

    #[test]
    fn guard_destroys_on_drop() {
        let runtime = MockGridRuntime::new();
        let handle = {
            let guard = ConstraintSetGuard::execution(&runtime).unwrap();
            guard.handle()
        };
        let calls = runtime.calls();
        assert!(calls.contains(&NativeCall::ExecutionConstraintsCreate { set: handle }));
        assert!(calls.contains(&NativeCall::ExecutionConstraintsDestroy { set: handle }));
    }

    #[test]
    fn layout_guard_uses_layout_destroy() {
        let runtime = MockGridRuntime::new();
        let handle = {
            let guard = ConstraintSetGuard::layout(&runtime).unwrap();
            guard.handle()
        };
        assert!(runtime
            .calls()
            .contains(&NativeCall::LayoutConstraintsDestroy { set: handle }));
    }
}
