//! Task wrapper adapter: bridges the runtime's raw invocation convention to
//! a typed Rust callable.
//!
//! The native runtime invokes registered tasks with a serialized argument
//! buffer, opaque user data, and a processor handle. [`TaskWrapper::invoke`]
//! turns that into a call on the original [`TaskBody`], bracketed by the
//! mandatory preamble/postamble handshake.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{BoxError, Error, Result};
use crate::native::GridRuntime;
use crate::types::{ContextHandle, PhysicalRegion, ProcessorHandle, RuntimeHandle, TaskDescriptor};

/// Value a task body hands back.
///
/// Return-value propagation to the runtime is not supported in this
/// version, so only `None` is accepted; `Some` makes the invocation fail
/// with [`Error::UnsupportedReturnValue`] before the postamble. The
/// signature admits a value so the violation is detectable instead of
/// silently ignored.
pub type TaskReturn = Option<Vec<u8>>;

/// Result type task bodies return.
pub type BodyResult = std::result::Result<TaskReturn, BoxError>;

/// A host-supplied callable executed by the native runtime.
///
/// Bodies receive, positionally and in this order: the task descriptor, the
/// mapped physical regions in runtime order, the context handle, and the
/// runtime handle. All four are borrowed for the call's duration; retaining
/// them past the return is a contract violation.
///
/// The runtime may invoke the same body concurrently on many threads or
/// nodes; bodies are `Send + Sync` and their internal thread safety is the
/// host program's responsibility.
///
/// Implemented for any matching closure:
///
/// ```rust
/// use taskgrid::types::{ContextHandle, PhysicalRegion, RuntimeHandle, TaskDescriptor};
/// use taskgrid::{BodyResult, TaskBody};
///
/// fn takes_body(_body: impl TaskBody) {}
///
/// takes_body(
///     |_task: &TaskDescriptor,
///      regions: &[PhysicalRegion],
///      _ctx: ContextHandle,
///      _rt: RuntimeHandle|
///      -> BodyResult {
///         println!("invoked with {} regions", regions.len());
///         Ok(None)
///     },
/// );
/// ```
pub trait TaskBody: Send + Sync + 'static {
    /// Run the task once.
    fn execute(
        &self,
        task: &TaskDescriptor,
        regions: &[PhysicalRegion],
        context: ContextHandle,
        runtime: RuntimeHandle,
    ) -> BodyResult;
}

impl<F> TaskBody for F
where
    F: Fn(&TaskDescriptor, &[PhysicalRegion], ContextHandle, RuntimeHandle) -> BodyResult
        + Send
        + Sync
        + 'static,
{
    fn execute(
        &self,
        task: &TaskDescriptor,
        regions: &[PhysicalRegion],
        context: ContextHandle,
        runtime: RuntimeHandle,
    ) -> BodyResult {
        self(task, regions, context, runtime)
    }
}

/// Adapter wrapping one registered [`TaskBody`].
///
/// Cheap to clone; clones share the body and the runtime seam. The runtime
/// may drive `invoke` from any thread, with any number of invocations in
/// flight at once, each carrying its own independent handles.
#[derive(Clone)]
pub struct TaskWrapper {
    qualified_name: Arc<str>,
    body: Arc<dyn TaskBody>,
    runtime: Arc<dyn GridRuntime>,
}

impl TaskWrapper {
    pub(crate) fn new(
        qualified_name: &str,
        body: Arc<dyn TaskBody>,
        runtime: Arc<dyn GridRuntime>,
    ) -> Self {
        Self {
            qualified_name: Arc::from(qualified_name),
            body,
            runtime,
        }
    }

    /// Dotted name the wrapped task is registered under.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Run one invocation: preamble, body, postamble.
    ///
    /// `args` is the runtime-owned serialized argument buffer, borrowed for
    /// this call and never interpreted or mutated by the adapter. `user_data`
    /// is part of the invocation convention but unused in this version.
    ///
    /// On the success path the postamble runs exactly once, with a null
    /// result and zero length, after the body returns. A body error
    /// propagates *without* a postamble call, leaving the runtime's
    /// completion bookkeeping inconsistent, a known gap in the completion
    /// contract; see [`Error::TaskBody`].
    pub fn invoke(
        &self,
        args: &[u8],
        _user_data: Option<&[u8]>,
        proc: ProcessorHandle,
    ) -> Result<()> {
        trace!(task = %self.qualified_name, arglen = args.len(), "task invocation start");

        // Mandatory handshake; nothing from the invocation may be touched
        // before it completes.
        let pre = self.runtime.task_preamble(args, proc)?;

        // Materialize the region array in index order. The runtime assigns
        // positional meaning to regions, so reordering is forbidden.
        let count = pre.regions.len();
        let mut regions = Vec::with_capacity(count as usize);
        for index in 0..count {
            regions.push(self.runtime.region_at(pre.regions, index));
        }

        let value = self
            .body
            .execute(&pre.task, &regions, pre.context, pre.runtime)
            .map_err(|source| Error::TaskBody {
                name: self.qualified_name.to_string(),
                source,
            })?;

        if value.is_some() {
            return Err(Error::UnsupportedReturnValue {
                name: self.qualified_name.to_string(),
            });
        }

        self.runtime.task_postamble(pre.runtime, pre.context, None)?;
        debug!(task = %self.qualified_name, regions = count, "task invocation complete");
        Ok(())
    }
}

impl std::fmt::Debug for TaskWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskWrapper")
            .field("qualified_name", &self.qualified_name)
            .finish()
    }
}
