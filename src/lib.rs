//! # taskgrid
//!
//! Rust binding for the grid runtime, a native task-based parallel
//! executor reached over a fixed C interface. The binding lets host
//! programs register Rust callables as *tasks* that the runtime's
//! execution engine invokes, possibly many times, possibly concurrently,
//! across threads or distributed nodes.
//!
//! The binding itself contains no scheduling, no memory management, and no
//! distributed coordination; all of that lives in the native runtime. What
//! it does provide:
//!
//! - **[`TaskRegistry`]** declares a callable as an executable task
//!   variant in the native task table, attaching execution constraints and
//!   config options, and returns a stable [`TaskId`].
//! - **[`TaskWrapper`]** bridges the runtime's raw invocation convention
//!   (serialized argument buffer, opaque processor handle) to the typed
//!   callable, bracketed by the mandatory preamble/postamble handshake.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use taskgrid::native::mock::MockGridRuntime;
//! use taskgrid::types::{ContextHandle, PhysicalRegion, RuntimeHandle, TaskDescriptor};
//! use taskgrid::{BodyResult, TaskKey, TaskRegistry};
//!
//! // Use `native::ffi::NativeGridRuntime` (feature `native`) in a real
//! // deployment; the mock stands in for tests and examples.
//! let runtime = Arc::new(MockGridRuntime::new());
//! let registry = TaskRegistry::new(runtime);
//!
//! let hello = registry.declare_task(
//!     TaskKey::new("demo", "hello"),
//!     |_task: &TaskDescriptor,
//!      _regions: &[PhysicalRegion],
//!      _ctx: ContextHandle,
//!      _rt: RuntimeHandle|
//!      -> BodyResult {
//!         println!("hello from the grid");
//!         Ok(None)
//!     },
//! )?;
//! println!("registered as task {}", hello.id());
//! # Ok::<(), taskgrid::Error>(())
//! ```
//!
//! # Lifecycle
//!
//! Register every task once, single-threaded, at process start; the
//! runtime invokes them afterwards. A task body's identity
//! (`namespace.name`) can be registered exactly once; there is no
//! deregistration. Invocation handles (task descriptor, regions, context,
//! runtime) are fresh per call and must not be retained past the
//! postamble.
//!
//! # Known gaps
//!
//! Return-value propagation is unsupported ([`Error::UnsupportedReturnValue`])
//! and a body failure skips the completion postamble ([`Error::TaskBody`]);
//! both are deliberate surface of the current native completion contract
//! rather than bugs to paper over.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

mod adapter;
mod error;
pub mod native;
mod registry;
pub mod types;

#[cfg(feature = "logging")]
pub mod logging;

pub use adapter::{BodyResult, TaskBody, TaskReturn, TaskWrapper};
pub use error::{BoxError, Error, Result};
pub use registry::{RegisteredTask, TaskRegistry};
pub use types::{TaskConfigOptions, TaskId, TaskKey};
