//! Real FFI implementation of [`GridRuntime`], linking the native library.
//!
//! Consolidated extern declarations for the `tg_*` entry points plus the
//! [`NativeGridRuntime`] shim that converts between opaque handle words and
//! raw pointers at the boundary. Compiled only with the `native` feature;
//! the resulting binary must link against the grid runtime's shared
//! library.
//!
//! # ABI
//!
//! Everything here is `extern "C"`: the grid runtime exposes a stable C
//! interface regardless of how it was compiled. Preamble and postamble
//! return no status; on internal failure the runtime aborts the process,
//! matching its own completion bookkeeping guarantees. Calls that hand back
//! resources (constraint-set create, variant registration) signal failure
//! with a null handle or a zero task id, which the shim surfaces as
//! [`Error::NativeCall`](crate::Error::NativeCall).

use std::ffi::CString;
use std::os::raw::{c_char, c_uint, c_void};

use crate::error::{Error, Result};
use crate::types::{
    ConstraintSetHandle, ContextHandle, PhysicalRegion, ProcessorHandle, ProcessorKind,
    RegionArray, RuntimeHandle, TaskConfigOptions, TaskDescriptor, TaskId,
};

use super::{GridRuntime, Preamble, VariantRequest};

/// Processor kind value of the runtime's host-language-capable category.
pub const TG_PROC_EXTERN: c_uint = 7;

/// Sentinel task id requesting runtime assignment.
const TG_AUTO_GENERATE_ID: u64 = u64::MAX;

#[repr(C)]
#[derive(Clone, Copy)]
struct TgTaskConfigOptions {
    leaf: bool,
    inner: bool,
    idempotent: bool,
}

impl From<TaskConfigOptions> for TgTaskConfigOptions {
    fn from(options: TaskConfigOptions) -> Self {
        Self {
            leaf: options.leaf,
            inner: options.inner,
            idempotent: options.idempotent,
        }
    }
}

#[link(name = "taskgrid_native")]
extern "C" {
    fn tg_task_preamble(
        data: *const u8,
        datalen: usize,
        proc_: *mut c_void,
        task: *mut *mut c_void,
        regions: *mut *mut c_void,
        num_regions: *mut c_uint,
        ctx: *mut *mut c_void,
        runtime: *mut *mut c_void,
    );

    fn tg_task_postamble(
        runtime: *mut c_void,
        ctx: *mut c_void,
        retval: *const c_void,
        retsize: usize,
    );

    fn tg_runtime_register_task_variant(
        runtime: *mut c_void,
        task_id: u64,
        name: *const c_char,
        global: bool,
        execution_constraints: *mut c_void,
        layout_constraints: *mut c_void,
        options: TgTaskConfigOptions,
        namespace: *const c_char,
        fn_name: *const c_char,
        user_data: *const c_void,
        user_len: usize,
    ) -> u64;

    fn tg_execution_constraint_set_create() -> *mut c_void;

    fn tg_execution_constraint_set_add_processor_constraint(
        set: *mut c_void,
        kind: c_uint,
    ) -> bool;

    fn tg_execution_constraint_set_destroy(set: *mut c_void);

    fn tg_task_layout_constraint_set_create() -> *mut c_void;

    fn tg_task_layout_constraint_set_destroy(set: *mut c_void);

    fn tg_runtime_get_runtime() -> *mut c_void;
}

/// [`GridRuntime`] backed by the real `tg_*` entry points.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeGridRuntime;

impl NativeGridRuntime {
    /// Create the shim. Stateless: every call goes straight to the native
    /// library.
    pub fn new() -> Self {
        Self
    }
}

fn cstring(value: &str, call: &'static str) -> Result<CString> {
    // Interior NULs cannot cross the C boundary.
    CString::new(value).map_err(|_| Error::native(call, -1))
}

impl GridRuntime for NativeGridRuntime {
    fn task_preamble(&self, args: &[u8], proc: ProcessorHandle) -> Result<Preamble> {
        let mut task: *mut c_void = std::ptr::null_mut();
        let mut regions: *mut c_void = std::ptr::null_mut();
        let mut num_regions: c_uint = 0;
        let mut ctx: *mut c_void = std::ptr::null_mut();
        let mut runtime: *mut c_void = std::ptr::null_mut();
        unsafe {
            tg_task_preamble(
                args.as_ptr(),
                args.len(),
                proc.as_raw() as *mut c_void,
                &mut task,
                &mut regions,
                &mut num_regions,
                &mut ctx,
                &mut runtime,
            );
        }
        Ok(Preamble {
            task: TaskDescriptor::from_raw(task as usize),
            regions: RegionArray::from_raw(regions as usize, num_regions),
            context: ContextHandle::from_raw(ctx as usize),
            runtime: RuntimeHandle::from_raw(runtime as usize),
        })
    }

    fn task_postamble(
        &self,
        runtime: RuntimeHandle,
        context: ContextHandle,
        retval: Option<&[u8]>,
    ) -> Result<()> {
        let (ptr, len) = match retval {
            Some(bytes) => (bytes.as_ptr().cast::<c_void>(), bytes.len()),
            None => (std::ptr::null(), 0),
        };
        unsafe {
            tg_task_postamble(
                runtime.as_raw() as *mut c_void,
                context.as_raw() as *mut c_void,
                ptr,
                len,
            );
        }
        Ok(())
    }

    fn region_at(&self, array: RegionArray, index: u32) -> PhysicalRegion {
        // The native array is a contiguous block of handle words.
        let base = array.base_raw() as *const *mut c_void;
        let handle = unsafe { *base.add(index as usize) };
        PhysicalRegion::from_raw(handle as usize)
    }

    fn register_task_variant(
        &self,
        request: &VariantRequest<'_>,
        execution_constraints: ConstraintSetHandle,
        layout_constraints: ConstraintSetHandle,
        options: TaskConfigOptions,
    ) -> Result<TaskId> {
        const CALL: &str = "tg_runtime_register_task_variant";
        let name = cstring(request.qualified_name, CALL)?;
        let namespace = cstring(request.namespace, CALL)?;
        let fn_name = cstring(request.name, CALL)?;
        let requested = if request.task_id == TaskId::AUTO_GENERATE {
            TG_AUTO_GENERATE_ID
        } else {
            request.task_id.0
        };
        let runtime = self.current_runtime()?;
        let id = unsafe {
            tg_runtime_register_task_variant(
                runtime.as_raw() as *mut c_void,
                requested,
                name.as_ptr(),
                request.global,
                execution_constraints.as_raw() as *mut c_void,
                layout_constraints.as_raw() as *mut c_void,
                options.into(),
                namespace.as_ptr(),
                fn_name.as_ptr(),
                std::ptr::null(),
                0,
            )
        };
        if id == 0 {
            return Err(Error::native(CALL, 0));
        }
        Ok(TaskId(id))
    }

    fn execution_constraints_create(&self) -> Result<ConstraintSetHandle> {
        let set = unsafe { tg_execution_constraint_set_create() };
        if set.is_null() {
            return Err(Error::native("tg_execution_constraint_set_create", 0));
        }
        Ok(ConstraintSetHandle::from_raw(set as usize))
    }

    fn execution_constraints_add_processor(
        &self,
        set: ConstraintSetHandle,
        kind: ProcessorKind,
    ) -> Result<()> {
        let ok = unsafe {
            tg_execution_constraint_set_add_processor_constraint(
                set.as_raw() as *mut c_void,
                kind.0 as c_uint,
            )
        };
        if !ok {
            return Err(Error::native(
                "tg_execution_constraint_set_add_processor_constraint",
                0,
            ));
        }
        Ok(())
    }

    fn execution_constraints_destroy(&self, set: ConstraintSetHandle) {
        unsafe { tg_execution_constraint_set_destroy(set.as_raw() as *mut c_void) }
    }

    fn layout_constraints_create(&self) -> Result<ConstraintSetHandle> {
        let set = unsafe { tg_task_layout_constraint_set_create() };
        if set.is_null() {
            return Err(Error::native("tg_task_layout_constraint_set_create", 0));
        }
        Ok(ConstraintSetHandle::from_raw(set as usize))
    }

    fn layout_constraints_destroy(&self, set: ConstraintSetHandle) {
        unsafe { tg_task_layout_constraint_set_destroy(set.as_raw() as *mut c_void) }
    }

    fn extern_processor_kind(&self) -> ProcessorKind {
        ProcessorKind(TG_PROC_EXTERN)
    }

    fn current_runtime(&self) -> Result<RuntimeHandle> {
        let runtime = unsafe { tg_runtime_get_runtime() };
        if runtime.is_null() {
            return Err(Error::native("tg_runtime_get_runtime", 0));
        }
        Ok(RuntimeHandle::from_raw(runtime as usize))
    }
}
