//! Mock grid runtime for development and testing.
//!
//! [`MockGridRuntime`] implements the full [`GridRuntime`] call contract in
//! process, with no native library involved. It records every native call it
//! receives so tests can assert ordering properties (preamble before body,
//! postamble exactly once, constraint sets destroyed after registration).
//! **Never use in production**: it schedules nothing and persists nothing.
//!
//! # Example
//!
//! ```rust
//! use taskgrid::native::mock::MockGridRuntime;
//! use taskgrid::types::PhysicalRegion;
//!
//! let runtime = MockGridRuntime::new();
//! let staged = runtime.stage_invocation(vec![
//!     PhysicalRegion::from_raw(0x10),
//!     PhysicalRegion::from_raw(0x20),
//! ]);
//! assert_eq!(staged.regions.len(), 2);
//! ```

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::{
    ConstraintSetHandle, ContextHandle, PhysicalRegion, ProcessorHandle, ProcessorKind,
    RegionArray, RuntimeHandle, TaskConfigOptions, TaskDescriptor, TaskId,
};

use super::{GridRuntime, Preamble, VariantRequest};

/// Processor kind the mock reports as host-language-capable.
pub const MOCK_EXTERN_PROC: ProcessorKind = ProcessorKind(7);

/// One native call observed by the mock, in the order received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    /// `tg_task_preamble` with the given argument buffer.
    Preamble {
        /// Copy of the serialized argument buffer.
        args: Vec<u8>,
        /// Processor handle forwarded by the adapter.
        proc: ProcessorHandle,
    },
    /// `tg_task_postamble` with the handles and result the adapter passed.
    Postamble {
        /// Runtime handle from the matching preamble.
        runtime: RuntimeHandle,
        /// Context handle from the matching preamble.
        context: ContextHandle,
        /// Result buffer; `None` models null/zero-length.
        retval: Option<Vec<u8>>,
    },
    /// `tg_runtime_register_task_variant`.
    RegisterVariant {
        /// Dotted registration name.
        qualified_name: String,
        /// Id the runtime assigned.
        task_id: TaskId,
    },
    /// `tg_execution_constraint_set_create`.
    ExecutionConstraintsCreate {
        /// Handle that was created.
        set: ConstraintSetHandle,
    },
    /// `tg_execution_constraint_set_add_processor_constraint`.
    ExecutionConstraintsAddProcessor {
        /// Target constraint set.
        set: ConstraintSetHandle,
        /// Processor kind added.
        kind: ProcessorKind,
    },
    /// `tg_execution_constraint_set_destroy`.
    ExecutionConstraintsDestroy {
        /// Handle that was destroyed.
        set: ConstraintSetHandle,
    },
    /// `tg_task_layout_constraint_set_create`.
    LayoutConstraintsCreate {
        /// Handle that was created.
        set: ConstraintSetHandle,
    },
    /// `tg_task_layout_constraint_set_destroy`.
    LayoutConstraintsDestroy {
        /// Handle that was destroyed.
        set: ConstraintSetHandle,
    },
}

/// Snapshot of one variant registered through the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredVariant {
    /// Dotted registration name.
    pub qualified_name: String,
    /// Declaring namespace as passed separately to the runtime.
    pub namespace: String,
    /// Task name within its namespace.
    pub name: String,
    /// Whether the variant asked for broadcast registration.
    pub global: bool,
    /// Id the mock assigned.
    pub task_id: TaskId,
    /// Options passed through at registration.
    pub options: TaskConfigOptions,
    /// Processor kinds present in the execution constraint set at
    /// registration time.
    pub processor_kinds: Vec<ProcessorKind>,
}

#[derive(Default)]
struct Inner {
    next_handle: usize,
    next_task_id: u64,
    staged: VecDeque<Preamble>,
    region_arrays: HashMap<usize, Vec<PhysicalRegion>>,
    constraint_kinds: HashMap<usize, Vec<ProcessorKind>>,
    calls: Vec<NativeCall>,
    registered: Vec<RegisteredVariant>,
    fail_next: Option<(&'static str, i32)>,
}

impl Inner {
    fn fresh_handle(&mut self) -> usize {
        self.next_handle += 0x10;
        self.next_handle
    }

    fn check_fail(&mut self, call: &'static str) -> Result<()> {
        if let Some((target, code)) = self.fail_next {
            if target == call {
                self.fail_next = None;
                return Err(Error::native(call, code));
            }
        }
        Ok(())
    }
}

/// In-process [`GridRuntime`] implementation backed by plain maps.
pub struct MockGridRuntime {
    inner: Mutex<Inner>,
}

impl MockGridRuntime {
    /// Create an empty mock runtime.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_handle: 0x1000,
                next_task_id: 100,
                ..Inner::default()
            }),
        }
    }

    /// Queue an invocation for the next preamble call.
    ///
    /// Returns the [`Preamble`] the runtime will hand to the adapter, so
    /// tests can assert the body saw exactly these handles. Regions are
    /// delivered in the order given here.
    pub fn stage_invocation(&self, regions: Vec<PhysicalRegion>) -> Preamble {
        let mut inner = self.inner.lock();
        let base = inner.fresh_handle();
        let preamble = Preamble {
            task: TaskDescriptor::from_raw(inner.fresh_handle()),
            regions: RegionArray::from_raw(base, regions.len() as u32),
            context: ContextHandle::from_raw(inner.fresh_handle()),
            runtime: RuntimeHandle::from_raw(inner.fresh_handle()),
        };
        inner.region_arrays.insert(base, regions);
        inner.staged.push_back(preamble);
        preamble
    }

    /// Make the next native call named `call` fail with `code`.
    ///
    /// `call` uses the native symbol name, e.g.
    /// `"tg_runtime_register_task_variant"`.
    pub fn fail_next(&self, call: &'static str, code: i32) {
        self.inner.lock().fail_next = Some((call, code));
    }

    /// Every native call observed so far, oldest first.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of postamble calls observed.
    pub fn postamble_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, NativeCall::Postamble { .. }))
            .count()
    }

    /// Variants registered through this mock, oldest first.
    pub fn registered_variants(&self) -> Vec<RegisteredVariant> {
        self.inner.lock().registered.clone()
    }

    /// True if a constraint set created during registration was never
    /// destroyed.
    pub fn has_leaked_constraint_sets(&self) -> bool {
        let inner = self.inner.lock();
        let mut live = 0i64;
        for call in &inner.calls {
            match call {
                NativeCall::ExecutionConstraintsCreate { .. }
                | NativeCall::LayoutConstraintsCreate { .. } => live += 1,
                NativeCall::ExecutionConstraintsDestroy { .. }
                | NativeCall::LayoutConstraintsDestroy { .. } => live -= 1,
                _ => {},
            }
        }
        live != 0
    }
}

impl Default for MockGridRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockGridRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MockGridRuntime")
            .field("calls", &inner.calls.len())
            .field("registered", &inner.registered.len())
            .finish()
    }
}

impl GridRuntime for MockGridRuntime {
    fn task_preamble(&self, args: &[u8], proc: ProcessorHandle) -> Result<Preamble> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_task_preamble")?;
        inner.calls.push(NativeCall::Preamble {
            args: args.to_vec(),
            proc,
        });
        if let Some(staged) = inner.staged.pop_front() {
            return Ok(staged);
        }
        // Nothing staged: fabricate a zero-region invocation.
        let base = inner.fresh_handle();
        inner.region_arrays.insert(base, Vec::new());
        Ok(Preamble {
            task: TaskDescriptor::from_raw(inner.fresh_handle()),
            regions: RegionArray::from_raw(base, 0),
            context: ContextHandle::from_raw(inner.fresh_handle()),
            runtime: RuntimeHandle::from_raw(inner.fresh_handle()),
        })
    }

    fn task_postamble(
        &self,
        runtime: RuntimeHandle,
        context: ContextHandle,
        retval: Option<&[u8]>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_task_postamble")?;
        inner.calls.push(NativeCall::Postamble {
            runtime,
            context,
            retval: retval.map(<[u8]>::to_vec),
        });
        Ok(())
    }

    fn region_at(&self, array: RegionArray, index: u32) -> PhysicalRegion {
        let inner = self.inner.lock();
        let regions = inner
            .region_arrays
            .get(&array.base_raw())
            .expect("region array was not produced by this mock");
        regions[index as usize]
    }

    fn register_task_variant(
        &self,
        request: &VariantRequest<'_>,
        execution_constraints: ConstraintSetHandle,
        _layout_constraints: ConstraintSetHandle,
        options: TaskConfigOptions,
    ) -> Result<TaskId> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_runtime_register_task_variant")?;
        let task_id = if request.task_id == TaskId::AUTO_GENERATE {
            inner.next_task_id += 1;
            TaskId(inner.next_task_id)
        } else {
            request.task_id
        };
        let processor_kinds = inner
            .constraint_kinds
            .get(&execution_constraints.as_raw())
            .cloned()
            .unwrap_or_default();
        inner.calls.push(NativeCall::RegisterVariant {
            qualified_name: request.qualified_name.to_string(),
            task_id,
        });
        inner.registered.push(RegisteredVariant {
            qualified_name: request.qualified_name.to_string(),
            namespace: request.namespace.to_string(),
            name: request.name.to_string(),
            global: request.global,
            task_id,
            options,
            processor_kinds,
        });
        Ok(task_id)
    }

    fn execution_constraints_create(&self) -> Result<ConstraintSetHandle> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_execution_constraint_set_create")?;
        let set = ConstraintSetHandle::from_raw(inner.fresh_handle());
        inner.constraint_kinds.insert(set.as_raw(), Vec::new());
        inner
            .calls
            .push(NativeCall::ExecutionConstraintsCreate { set });
        Ok(set)
    }

    fn execution_constraints_add_processor(
        &self,
        set: ConstraintSetHandle,
        kind: ProcessorKind,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_execution_constraint_set_add_processor_constraint")?;
        inner
            .constraint_kinds
            .entry(set.as_raw())
            .or_default()
            .push(kind);
        inner
            .calls
            .push(NativeCall::ExecutionConstraintsAddProcessor { set, kind });
        Ok(())
    }

    fn execution_constraints_destroy(&self, set: ConstraintSetHandle) {
        let mut inner = self.inner.lock();
        inner.constraint_kinds.remove(&set.as_raw());
        inner
            .calls
            .push(NativeCall::ExecutionConstraintsDestroy { set });
    }

    fn layout_constraints_create(&self) -> Result<ConstraintSetHandle> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_task_layout_constraint_set_create")?;
        let set = ConstraintSetHandle::from_raw(inner.fresh_handle());
        inner.calls.push(NativeCall::LayoutConstraintsCreate { set });
        Ok(set)
    }

    fn layout_constraints_destroy(&self, set: ConstraintSetHandle) {
        self.inner
            .lock()
            .calls
            .push(NativeCall::LayoutConstraintsDestroy { set });
    }

    fn extern_processor_kind(&self) -> ProcessorKind {
        MOCK_EXTERN_PROC
    }

    fn current_runtime(&self) -> Result<RuntimeHandle> {
        let mut inner = self.inner.lock();
        inner.check_fail("tg_runtime_get_runtime")?;
        Ok(RuntimeHandle::from_raw(0x1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstaged_preamble_fabricates_zero_regions() {
        let runtime = MockGridRuntime::new();
        let pre = runtime
            .task_preamble(b"args", ProcessorHandle::from_raw(1))
            .unwrap();
        assert!(pre.regions.is_empty());
    }

    #[test]
    fn staged_preambles_come_back_in_order() {
        let runtime = MockGridRuntime::new();
        let first = runtime.stage_invocation(vec![PhysicalRegion::from_raw(0xa)]);
        let second = runtime.stage_invocation(Vec::new());
        let proc = ProcessorHandle::from_raw(1);
        assert_eq!(runtime.task_preamble(b"", proc).unwrap().task, first.task);
        assert_eq!(runtime.task_preamble(b"", proc).unwrap().task, second.task);
    }

    #[test]
    fn fail_next_hits_only_the_named_call() {
        let runtime = MockGridRuntime::new();
        runtime.fail_next("tg_task_postamble", -3);
        let pre = runtime
            .task_preamble(b"", ProcessorHandle::from_raw(1))
            .unwrap();
        let err = runtime
            .task_postamble(pre.runtime, pre.context, None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NativeCall {
                call: "tg_task_postamble",
                code: -3
            }
        ));
        // Failure injection is one-shot.
        runtime.task_postamble(pre.runtime, pre.context, None).unwrap();
    }

    #[test]
    fn auto_generated_ids_are_distinct() {
        let runtime = MockGridRuntime::new();
        let request = VariantRequest {
            task_id: TaskId::AUTO_GENERATE,
            qualified_name: "m.f",
            global: false,
            namespace: "m",
            name: "f",
        };
        let set = runtime.execution_constraints_create().unwrap();
        let layout = runtime.layout_constraints_create().unwrap();
        let a = runtime
            .register_task_variant(&request, set, layout, TaskConfigOptions::new())
            .unwrap();
        let b = runtime
            .register_task_variant(&request, set, layout, TaskConfigOptions::new())
            .unwrap();
        assert_ne!(a, b);
    }
}
