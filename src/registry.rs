//! Task registrar: declares task bodies as executable variants in the
//! native task table.
//!
//! The registry is a process-scoped object constructed explicitly at
//! startup; there is no global mutable table. Registration is intended to
//! complete single-threaded before any task executes; entries are permanent
//! for the life of the process (no deregistration exists).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::adapter::{TaskBody, TaskWrapper};
use crate::error::{Error, Result};
use crate::native::{ConstraintSetGuard, GridRuntime, VariantRequest};
use crate::types::{ProcessorHandle, TaskConfigOptions, TaskId, TaskKey};

/// A task that has been registered with the native runtime.
///
/// Returned by [`TaskRegistry::declare_task`]; carries the runtime-issued
/// [`TaskId`] and is itself the invocable the runtime's dispatch mechanism
/// drives. Once issued, a registration is permanent: there is no
/// deregistration and the id never changes.
#[derive(Debug, Clone)]
pub struct RegisteredTask {
    key: TaskKey,
    id: TaskId,
    wrapper: TaskWrapper,
}

impl RegisteredTask {
    /// Identity the task was registered under.
    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    /// Stable id issued by the native runtime.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Run one invocation through the wrapper adapter.
    ///
    /// See [`TaskWrapper::invoke`] for the full invocation contract.
    pub fn invoke(
        &self,
        args: &[u8],
        user_data: Option<&[u8]>,
        proc: ProcessorHandle,
    ) -> Result<()> {
        self.wrapper.invoke(args, user_data, proc)
    }
}

/// Process-scoped mapping from task identity to registered variant.
///
/// Entries are added only by explicit registration and never removed. The
/// interior lock makes the registry shareable across threads, but the
/// intended lifecycle is simpler than that: all registration happens
/// single-threaded at process start, and everything afterwards is reads.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use taskgrid::native::mock::MockGridRuntime;
/// use taskgrid::types::{ContextHandle, PhysicalRegion, RuntimeHandle, TaskDescriptor};
/// use taskgrid::{BodyResult, TaskKey, TaskRegistry};
///
/// let runtime = Arc::new(MockGridRuntime::new());
/// let registry = TaskRegistry::new(runtime);
///
/// let hello = registry.declare_task(
///     TaskKey::new("mod", "hello"),
///     |_task: &TaskDescriptor,
///      _regions: &[PhysicalRegion],
///      _ctx: ContextHandle,
///      _rt: RuntimeHandle|
///      -> BodyResult { Ok(None) },
/// )?;
/// assert_eq!(registry.lookup(hello.key()), Some(hello.id()));
/// # Ok::<(), taskgrid::Error>(())
/// ```
pub struct TaskRegistry {
    runtime: Arc<dyn GridRuntime>,
    entries: RwLock<HashMap<TaskKey, TaskId>>,
    // Dispatch table keyed by the runtime-issued id, resolved at
    // registration time.
    by_id: RwLock<HashMap<TaskId, TaskWrapper>>,
}

impl TaskRegistry {
    /// Create an empty registry bound to one runtime seam.
    pub fn new(runtime: Arc<dyn GridRuntime>) -> Self {
        Self {
            runtime,
            entries: RwLock::new(HashMap::new()),
            by_id: RwLock::new(HashMap::new()),
        }
    }

    /// Register `body` as a task variant with all config flags false.
    ///
    /// The decorator-style entry point: registers the body and returns the
    /// invocable the runtime's dispatch mechanism will drive.
    pub fn declare_task(&self, key: TaskKey, body: impl TaskBody) -> Result<RegisteredTask> {
        self.declare_task_with_options(key, body, TaskConfigOptions::new())
    }

    /// Register `body` with explicit scheduling hints.
    ///
    /// The registration:
    /// - fails fast with [`Error::DuplicateRegistration`] if `key` is
    ///   already present, since double registration is a programming error;
    /// - constrains the variant to the runtime's host-language-capable
    ///   processor kind;
    /// - attaches an empty layout constraint set;
    /// - asks the runtime to auto-assign the task id;
    /// - registers under `key.qualified_name()` with the global flag false
    ///   (process-local, not broadcast to other runtime instances).
    ///
    /// Both constraint sets are destroyed when this function returns,
    /// whether or not registration succeeded.
    pub fn declare_task_with_options(
        &self,
        key: TaskKey,
        body: impl TaskBody,
        options: TaskConfigOptions,
    ) -> Result<RegisteredTask> {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(Error::DuplicateRegistration { key });
        }

        let runtime = &*self.runtime;
        let qualified = key.qualified_name();

        let execution = ConstraintSetGuard::execution(runtime)?;
        runtime
            .execution_constraints_add_processor(execution.handle(), runtime.extern_processor_kind())?;
        // Layout constraints are a known-incomplete area; the set stays
        // empty until the runtime's layout story settles.
        let layout = ConstraintSetGuard::layout(runtime)?;

        let id = runtime.register_task_variant(
            &VariantRequest {
                task_id: TaskId::AUTO_GENERATE,
                qualified_name: &qualified,
                global: false,
                namespace: key.namespace(),
                name: key.name(),
            },
            execution.handle(),
            layout.handle(),
            options,
        )?;
        drop(layout);
        drop(execution);

        let wrapper = TaskWrapper::new(&qualified, Arc::new(body), Arc::clone(&self.runtime));
        entries.insert(key.clone(), id);
        self.by_id.write().insert(id, wrapper.clone());
        debug!(task = %qualified, id = %id, ?options, "task variant registered");

        Ok(RegisteredTask { key, id, wrapper })
    }

    /// Id a task identity was registered under, if any.
    pub fn lookup(&self, key: &TaskKey) -> Option<TaskId> {
        self.entries.read().get(key).copied()
    }

    /// Run one invocation of the task registered under `id`.
    ///
    /// This is the callback-by-identifier path the runtime uses to reach
    /// host bodies: the wrapper was resolved at registration time and is
    /// invoked here by its stable id.
    pub fn dispatch(
        &self,
        id: TaskId,
        args: &[u8],
        user_data: Option<&[u8]>,
        proc: ProcessorHandle,
    ) -> Result<()> {
        let wrapper = self
            .by_id
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownTask { id })?;
        wrapper.invoke(args, user_data, proc)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Identities registered so far, in no particular order.
    pub fn keys(&self) -> Vec<TaskKey> {
        self.entries.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::adapter::BodyResult;
    use crate::native::mock::{MockGridRuntime, NativeCall, MOCK_EXTERN_PROC};
    use crate::types::{ContextHandle, PhysicalRegion, RuntimeHandle, TaskDescriptor};

    use super::*;

    fn noop_body(
        _task: &TaskDescriptor,
        _regions: &[PhysicalRegion],
        _ctx: ContextHandle,
        _rt: RuntimeHandle,
    ) -> BodyResult {
        Ok(None)
    }

    fn registry() -> (Arc<MockGridRuntime>, TaskRegistry) {
        let runtime = Arc::new(MockGridRuntime::new());
        let registry = TaskRegistry::new(runtime.clone());
        (runtime, registry)
    }

    #[test]
    fn registering_twice_fails_fast() {
        let (_runtime, registry) = registry();
        let key = TaskKey::new("mod", "hello");
        registry.declare_task(key.clone(), noop_body).unwrap();
        let err = registry.declare_task(key.clone(), noop_body).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { key: k } if k == key));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn handles_are_distinct_across_registrations() {
        let (_runtime, registry) = registry();
        let a = registry
            .declare_task(TaskKey::new("mod", "a"), noop_body)
            .unwrap();
        let b = registry
            .declare_task(TaskKey::new("mod", "b"), noop_body)
            .unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.lookup(a.key()), Some(a.id()));
        assert_eq!(registry.lookup(b.key()), Some(b.id()));
    }

    #[test]
    fn variant_is_registered_with_expected_shape() {
        let (runtime, registry) = registry();
        let task = registry
            .declare_task(TaskKey::new("physics", "advance"), noop_body)
            .unwrap();

        let variants = runtime.registered_variants();
        assert_eq!(variants.len(), 1);
        let variant = &variants[0];
        assert_eq!(variant.qualified_name, "physics.advance");
        assert_eq!(variant.namespace, "physics");
        assert_eq!(variant.name, "advance");
        assert_eq!(variant.task_id, task.id());
        // Process-local, never broadcast.
        assert!(!variant.global);
        // Only the host-language-capable processor kind.
        assert_eq!(variant.processor_kinds, vec![MOCK_EXTERN_PROC]);
        // All hints default to false.
        assert_eq!(variant.options, TaskConfigOptions::new());
    }

    #[test]
    fn options_pass_through_verbatim() {
        let (runtime, registry) = registry();
        let options = TaskConfigOptions::new().with_leaf(true).with_idempotent(true);
        registry
            .declare_task_with_options(TaskKey::new("mod", "leafy"), noop_body, options)
            .unwrap();
        assert_eq!(runtime.registered_variants()[0].options, options);
    }

    #[test]
    fn constraint_sets_are_destroyed_after_success() {
        let (runtime, registry) = registry();
        registry
            .declare_task(TaskKey::new("mod", "hello"), noop_body)
            .unwrap();
        assert!(!runtime.has_leaked_constraint_sets());

        // Destruction happens after the registration call.
        let calls = runtime.calls();
        let register_at = calls
            .iter()
            .position(|call| matches!(call, NativeCall::RegisterVariant { .. }))
            .unwrap();
        let destroys: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| {
                matches!(
                    call,
                    NativeCall::ExecutionConstraintsDestroy { .. }
                        | NativeCall::LayoutConstraintsDestroy { .. }
                )
            })
            .map(|(index, _)| index)
            .collect();
        assert_eq!(destroys.len(), 2);
        assert!(destroys.iter().all(|&index| index > register_at));
    }

    #[test]
    fn constraint_sets_are_destroyed_when_registration_fails() {
        let (runtime, registry) = registry();
        runtime.fail_next("tg_runtime_register_task_variant", -5);
        let err = registry
            .declare_task(TaskKey::new("mod", "doomed"), noop_body)
            .unwrap_err();
        assert!(matches!(err, Error::NativeCall { code: -5, .. }));
        assert!(!runtime.has_leaked_constraint_sets());
        assert!(registry.is_empty());
    }

    #[test]
    fn native_failure_is_propagated_not_retried() {
        let (runtime, registry) = registry();
        runtime.fail_next("tg_execution_constraint_set_create", -2);
        let err = registry
            .declare_task(TaskKey::new("mod", "hello"), noop_body)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NativeCall {
                call: "tg_execution_constraint_set_create",
                code: -2
            }
        ));
        // A single failure leaves the identity unregistered; retrying is the
        // caller's decision and succeeds cleanly.
        registry
            .declare_task(TaskKey::new("mod", "hello"), noop_body)
            .unwrap();
    }

    #[test]
    fn dispatch_resolves_bodies_by_id() {
        let (runtime, registry) = registry();
        let task = registry
            .declare_task(TaskKey::new("mod", "hello"), noop_body)
            .unwrap();
        runtime.stage_invocation(Vec::new());
        registry
            .dispatch(task.id(), b"", None, ProcessorHandle::from_raw(1))
            .unwrap();
        assert_eq!(runtime.postamble_count(), 1);
    }

    #[test]
    fn dispatch_of_unknown_id_errors() {
        let (_runtime, registry) = registry();
        let err = registry
            .dispatch(TaskId(9999), b"", None, ProcessorHandle::from_raw(1))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTask { id: TaskId(9999) }));
    }
}
