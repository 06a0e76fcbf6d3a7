//! Registration-protocol tests driven through the public API with the mock
//! grid runtime.

use std::collections::HashSet;
use std::sync::Arc;

use taskgrid::native::mock::{MockGridRuntime, MOCK_EXTERN_PROC};
use taskgrid::types::{ContextHandle, PhysicalRegion, RuntimeHandle, TaskDescriptor};
use taskgrid::{BodyResult, Error, TaskConfigOptions, TaskKey, TaskRegistry};

fn noop(
    _task: &TaskDescriptor,
    _regions: &[PhysicalRegion],
    _ctx: ContextHandle,
    _rt: RuntimeHandle,
) -> BodyResult {
    Ok(None)
}

fn setup() -> (Arc<MockGridRuntime>, TaskRegistry) {
    let runtime = Arc::new(MockGridRuntime::new());
    let registry = TaskRegistry::new(runtime.clone());
    (runtime, registry)
}

#[test]
fn register_then_reregister_mod_hello() {
    let (_runtime, registry) = setup();
    let key = TaskKey::new("mod", "hello");

    let first = registry
        .declare_task_with_options(key.clone(), noop, TaskConfigOptions::new())
        .expect("first registration succeeds");

    let err = registry
        .declare_task(key.clone(), noop)
        .expect_err("second registration must fail");
    assert!(matches!(err, Error::DuplicateRegistration { key: k } if k == key));

    // The first handle survives the failed attempt.
    assert_eq!(registry.lookup(&key), Some(first.id()));
}

#[test]
fn every_registration_yields_a_fresh_handle() {
    let (_runtime, registry) = setup();
    let mut issued = HashSet::new();
    for index in 0..32 {
        let task = registry
            .declare_task(TaskKey::new("bulk", format!("task{index}")), noop)
            .unwrap();
        assert!(issued.insert(task.id()), "handle reissued: {}", task.id());
    }
}

#[test]
fn variant_carries_host_processor_constraint_and_local_visibility() {
    let (runtime, registry) = setup();
    registry
        .declare_task(TaskKey::new("mod", "hello"), noop)
        .unwrap();

    let variant = &runtime.registered_variants()[0];
    assert_eq!(variant.qualified_name, "mod.hello");
    assert_eq!(variant.processor_kinds, vec![MOCK_EXTERN_PROC]);
    assert!(!variant.global);
    assert!(!variant.options.leaf);
    assert!(!variant.options.inner);
    assert!(!variant.options.idempotent);
}

#[test]
fn scheduling_hints_are_forwarded_untouched() {
    let (runtime, registry) = setup();
    registry
        .declare_task_with_options(
            TaskKey::new("mod", "inner"),
            noop,
            TaskConfigOptions::new().with_inner(true),
        )
        .unwrap();
    assert!(runtime.registered_variants()[0].options.inner);
}

#[test]
fn no_constraint_set_outlives_registration() {
    let (runtime, registry) = setup();
    for index in 0..4 {
        registry
            .declare_task(TaskKey::new("mod", format!("t{index}")), noop)
            .unwrap();
    }
    runtime.fail_next("tg_runtime_register_task_variant", -1);
    registry
        .declare_task(TaskKey::new("mod", "failing"), noop)
        .unwrap_err();
    assert!(!runtime.has_leaked_constraint_sets());
}
