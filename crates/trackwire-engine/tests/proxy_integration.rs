//! Integration tests for tracking proxies
//!
//! Covers the write-then-notify contract, pass-through reads, identity of
//! the wrapped instance and the classes that cannot be proxied.

use std::sync::Arc;

use parking_lot::Mutex;
use trackwire_engine::proxy::PROXIED_CAPABILITY;
use trackwire_engine::{
    ClassDefinition, ClassId, ObjectRef, PropertyDefinition, ProxyError, ProxyFactory,
    ProxyOptions, Runtime, RuntimeOptions, SubclassDefinition, TrackingCallback, Value, ValueKind,
    VmError,
};

type Log = Arc<Mutex<Vec<(String, Value)>>>;

fn poco(runtime: &Runtime) -> ClassId {
    runtime
        .define_class(
            ClassDefinition::new("Poco")
                .property(PropertyDefinition::new("Name", ValueKind::Str).default("Default"))
                .property(PropertyDefinition::new("Age", ValueKind::I32)),
        )
        .unwrap()
}

fn setup() -> (Arc<Runtime>, ProxyFactory, ClassId) {
    let runtime = Arc::new(Runtime::default());
    let class = poco(&runtime);
    let factory = ProxyFactory::new(Arc::clone(&runtime));
    (runtime, factory, class)
}

/// Callback recording (property, value read from the wrapped instance)
fn recorder(runtime: &Arc<Runtime>) -> (TrackingCallback, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let runtime = Arc::clone(runtime);
    let callback = TrackingCallback::new(move |target, property| {
        let value = runtime.get_property(target, property).unwrap();
        sink.lock().push((property.to_string(), value));
    });
    (callback, log)
}

// ============================================================================
// Write-then-notify
// ============================================================================

mod notification {
    use super::*;

    #[test]
    fn test_write_sequence() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        assert_eq!(
            runtime.get_property(&proxy, "Name").unwrap(),
            Value::from("Default")
        );
        runtime.set_property(&proxy, "Name", "Test").unwrap();
        runtime.set_property(&proxy, "Name", "Test2").unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                ("Name".to_string(), Value::from("Test")),
                ("Name".to_string(), Value::from("Test2")),
            ]
        );
        assert_eq!(
            runtime.get_property(&instance, "Name").unwrap(),
            Value::from("Test2")
        );
    }

    #[test]
    fn test_reads_do_not_notify() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        for _ in 0..3 {
            runtime.get_property(&proxy, "Name").unwrap();
            runtime.get_property(&proxy, "Age").unwrap();
        }
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_reads_see_writes_made_on_the_instance() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let proxy = factory
            .create_proxy(&instance, TrackingCallback::new(|_, _| {}))
            .unwrap();

        runtime.set_property(&instance, "Age", 30).unwrap();
        assert_eq!(runtime.get_property(&proxy, "Age").unwrap(), Value::from(30));
    }

    #[test]
    fn test_each_property_reported_by_name() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        runtime.set_property(&proxy, "Age", 5).unwrap();
        runtime.set_property(&proxy, "Name", "Ann").unwrap();

        let names: Vec<String> = log.lock().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["Age", "Name"]);
    }

    #[test]
    fn test_callback_receives_wrapped_instance() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();

        let seen: Arc<Mutex<Vec<ObjectRef>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let proxy = factory
            .create_proxy(
                &instance,
                TrackingCallback::new(move |target, _| sink.lock().push(target.clone())),
            )
            .unwrap();
        runtime.set_property(&proxy, "Name", "X").unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ptr_eq(&instance));
        assert!(!seen[0].ptr_eq(&proxy));
    }

    #[test]
    fn test_shared_callback_across_proxies() {
        let (runtime, factory, class) = setup();
        let (callback, log) = recorder(&runtime);
        let a = runtime.instantiate(class, vec![]).unwrap();
        let b = runtime.instantiate(class, vec![]).unwrap();
        let pa = factory.create_proxy(&a, callback.clone()).unwrap();
        let pb = factory.create_proxy(&b, callback).unwrap();

        runtime.set_property(&pa, "Age", 1).unwrap();
        runtime.set_property(&pb, "Age", 2).unwrap();

        assert_eq!(log.lock().len(), 2);
        assert_eq!(runtime.get_property(&a, "Age").unwrap(), Value::from(1));
        assert_eq!(runtime.get_property(&b, "Age").unwrap(), Value::from(2));
    }

    #[test]
    fn test_two_proxies_over_one_instance() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (first, first_log) = recorder(&runtime);
        let (second, second_log) = recorder(&runtime);
        let p1 = factory.create_proxy(&instance, first).unwrap();
        let p2 = factory.create_proxy(&instance, second).unwrap();

        runtime.set_property(&p1, "Name", "one").unwrap();

        assert_eq!(first_log.lock().len(), 1);
        assert!(second_log.lock().is_empty());
        assert_eq!(runtime.get_property(&p2, "Name").unwrap(), Value::from("one"));
    }
}

// ============================================================================
// Identity and typing
// ============================================================================

mod identity {
    use super::*;

    #[test]
    fn test_get_underlying_returns_same_instance() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let proxy = factory
            .create_proxy(&instance, TrackingCallback::new(|_, _| {}))
            .unwrap();

        let underlying = factory.get_underlying(&proxy).unwrap();
        assert!(underlying.ptr_eq(&instance));
        assert_eq!(Value::from(underlying), Value::from(instance));
    }

    #[test]
    fn test_proxy_is_instance_of_source() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let proxy = factory
            .create_proxy(&instance, TrackingCallback::new(|_, _| {}))
            .unwrap();

        assert!(runtime.is_instance_of(&proxy, class));
        assert_ne!(proxy.class_id(), class);

        let wrapper = runtime.class(proxy.class_id()).unwrap();
        assert_eq!(wrapper.name, "TrackingProxyOf_Poco");
        assert!(wrapper.implements(PROXIED_CAPABILITY));
    }

    #[test]
    fn test_get_underlying_rejects_plain_objects() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();

        match factory.get_underlying(&instance) {
            Err(ProxyError::NotAProxy { class }) => assert_eq!(class, "Poco"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_wrapper_name_prefix_from_options() {
        let runtime = Arc::new(Runtime::default());
        let class = poco(&runtime);
        let options = ProxyOptions::from_json(r#"{ "type_name_prefix": "Watched" }"#).unwrap();
        let factory = ProxyFactory::with_options(Arc::clone(&runtime), options);

        let wrapper = factory.wrapper_type(class).unwrap();
        assert_eq!(wrapper.name, "WatchedPoco");
        assert_eq!(runtime.class(wrapper.class_id).unwrap().name, "WatchedPoco");
    }
}

// ============================================================================
// Property shapes
// ============================================================================

mod shapes {
    use super::*;

    #[test]
    fn test_read_only_property_has_no_proxy_setter() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime
            .define_class(
                ClassDefinition::new("Order")
                    .property(PropertyDefinition::new("Id", ValueKind::I32).read_only().default(7)),
            )
            .unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        assert_eq!(runtime.get_property(&proxy, "Id").unwrap(), Value::from(7));
        assert!(matches!(
            runtime.set_property(&proxy, "Id", 8),
            Err(VmError::NotWritable { .. })
        ));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_write_only_property_still_notifies() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime
            .define_class(
                ClassDefinition::new("Login")
                    .property(PropertyDefinition::new("Password", ValueKind::Str).write_only()),
            )
            .unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();

        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        let proxy = factory
            .create_proxy(
                &instance,
                TrackingCallback::new(move |_, name| sink.lock().push(name.to_string())),
            )
            .unwrap();

        runtime.set_property(&proxy, "Password", "hunter2").unwrap();
        assert_eq!(*names.lock(), vec!["Password".to_string()]);
        assert!(matches!(
            runtime.get_property(&proxy, "Password"),
            Err(VmError::NotReadable { .. })
        ));
        assert_eq!(instance.get_field(0).unwrap(), Value::from("hunter2"));
    }

    #[test]
    fn test_non_virtual_property_not_intercepted() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime
            .define_class(
                ClassDefinition::new("Mixed")
                    .property(PropertyDefinition::new("Tracked", ValueKind::I32))
                    .property(PropertyDefinition::new("Fixed", ValueKind::I32).non_virtual()),
            )
            .unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        let wrapper = factory.wrapper_type(class).unwrap();
        assert_eq!(wrapper.skipped, vec!["Fixed".to_string()]);

        // Lands on the proxy's own inherited field
        runtime.set_property(&proxy, "Fixed", 9).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(runtime.get_property(&proxy, "Fixed").unwrap(), Value::from(9));
        assert_eq!(runtime.get_property(&instance, "Fixed").unwrap(), Value::from(0));
    }

    #[test]
    fn test_class_without_properties() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime.define_class(ClassDefinition::new("Marker")).unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();

        let proxy = factory
            .create_proxy(&instance, TrackingCallback::new(|_, _| {}))
            .unwrap();
        assert!(factory.get_underlying(&proxy).unwrap().ptr_eq(&instance));
        assert!(factory.wrapper_type(class).unwrap().intercepted.is_empty());
    }

    #[test]
    fn test_kind_mismatch_rejected_before_write() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        assert!(matches!(
            runtime.set_property(&proxy, "Age", "old"),
            Err(VmError::TypeError(_))
        ));
        assert!(log.lock().is_empty());
        assert_eq!(runtime.get_property(&instance, "Age").unwrap(), Value::from(0));
    }

    #[test]
    fn test_kind_mismatch_through_setter_method_rejected() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        assert!(matches!(
            runtime.invoke(&proxy, "set_Age", vec![Value::from("old")]),
            Err(VmError::TypeError(_))
        ));
        assert!(log.lock().is_empty());
        assert_eq!(runtime.get_property(&instance, "Age").unwrap(), Value::from(0));

        runtime.invoke(&proxy, "set_Age", vec![Value::from(41)]).unwrap();
        assert_eq!(*log.lock(), vec![("Age".to_string(), Value::from(41))]);
    }
}

// ============================================================================
// Unsupported classes
// ============================================================================

mod unsupported {
    use super::*;

    #[test]
    fn test_sealed_class_rejected() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime
            .define_class(
                ClassDefinition::new("Final")
                    .property(PropertyDefinition::new("A", ValueKind::I32))
                    .sealed(),
            )
            .unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let classes_before = runtime.class_count();

        let result = factory.create_proxy(&instance, TrackingCallback::new(|_, _| {}));
        assert!(matches!(result, Err(ProxyError::UnsupportedType { .. })));
        assert_eq!(runtime.class_count(), classes_before);
        assert!(factory.cache().is_empty());
    }

    #[test]
    fn test_no_default_constructor_rejected() {
        let runtime = Arc::new(Runtime::default());
        let class = runtime
            .define_class(
                ClassDefinition::new("Point")
                    .property(PropertyDefinition::new("X", ValueKind::I32))
                    .constructor_arity(1),
            )
            .unwrap();
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![Value::from(1)]).unwrap();

        match factory.create_proxy(&instance, TrackingCallback::new(|_, _| {})) {
            Err(ProxyError::UnsupportedType { class, reason }) => {
                assert_eq!(class, "Point");
                assert!(reason.contains("constructor"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_proxy_of_proxy_rejected() {
        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let proxy = factory
            .create_proxy(&instance, TrackingCallback::new(|_, _| {}))
            .unwrap();

        assert!(matches!(
            factory.create_proxy(&proxy, TrackingCallback::new(|_, _| {})),
            Err(ProxyError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_wrapper_class_cannot_be_subclassed() {
        let (runtime, factory, class) = setup();
        let wrapper = factory.wrapper_type(class).unwrap();
        let classes_before = runtime.class_count();

        assert!(matches!(
            runtime.define_subclass(wrapper.class_id, SubclassDefinition::new("Derived")),
            Err(VmError::SealedClass(name)) if name == wrapper.name
        ));
        assert_eq!(runtime.class_count(), classes_before);
    }
}

// ============================================================================
// Failure propagation
// ============================================================================

mod failures {
    use super::*;

    fn account(runtime: &Runtime) -> ClassId {
        runtime
            .define_class(ClassDefinition::new("Account").property(
                PropertyDefinition::new("Balance", ValueKind::I32).with_setter(
                    |this, field, value| {
                        if value.as_i32().unwrap_or(0) < 0 {
                            return Err(VmError::native("balance cannot be negative"));
                        }
                        this.set_field(field, value)
                    },
                ),
            ))
            .unwrap()
    }

    #[test]
    fn test_failed_write_does_not_notify() {
        let runtime = Arc::new(Runtime::default());
        let class = account(&runtime);
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let (callback, log) = recorder(&runtime);
        let proxy = factory.create_proxy(&instance, callback).unwrap();

        runtime.set_property(&proxy, "Balance", 10).unwrap();
        let err = runtime.set_property(&proxy, "Balance", -5).unwrap_err();

        match err {
            VmError::Native(source) => {
                assert_eq!(source.to_string(), "balance cannot be negative")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            *log.lock(),
            vec![("Balance".to_string(), Value::from(10))]
        );
        assert_eq!(
            runtime.get_property(&instance, "Balance").unwrap(),
            Value::from(10)
        );
    }

    #[test]
    fn test_failed_callback_propagates_after_write() {
        #[derive(Debug)]
        struct Rejected;

        impl std::fmt::Display for Rejected {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("rejected")
            }
        }

        impl std::error::Error for Rejected {}

        let (runtime, factory, class) = setup();
        let instance = runtime.instantiate(class, vec![]).unwrap();
        let proxy = factory
            .create_proxy(
                &instance,
                TrackingCallback::fallible(|_, _| Err(Rejected.into())),
            )
            .unwrap();

        let err = runtime.set_property(&proxy, "Name", "Written").unwrap_err();
        match err {
            VmError::Callback { property, source } => {
                assert_eq!(property, "Name");
                assert!(source.downcast_ref::<Rejected>().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The write-through already happened
        assert_eq!(
            runtime.get_property(&instance, "Name").unwrap(),
            Value::from("Written")
        );
    }

    #[test]
    fn test_reentrant_callback_hits_call_depth_limit() {
        let runtime = Arc::new(Runtime::new(RuntimeOptions {
            max_call_depth: 16,
            ..RuntimeOptions::default()
        }));
        let class = poco(&runtime);
        let factory = ProxyFactory::new(Arc::clone(&runtime));
        let instance = runtime.instantiate(class, vec![]).unwrap();

        // The callback writes back through the proxy it is attached to
        let target: Arc<Mutex<Option<ObjectRef>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&target);
        let rt = Arc::clone(&runtime);
        let proxy = factory
            .create_proxy(
                &instance,
                TrackingCallback::fallible(move |_, property| {
                    let proxy = slot.lock().clone();
                    match proxy {
                        Some(proxy) => Ok(rt.set_property(&proxy, property, "again")?),
                        None => Ok(()),
                    }
                }),
            )
            .unwrap();
        *target.lock() = Some(proxy.clone());

        let err = runtime.set_property(&proxy, "Name", "first").unwrap_err();
        target.lock().take();

        let mut cause: &(dyn std::error::Error + 'static) = &err;
        while let Some(next) = cause.source() {
            cause = next;
        }
        assert!(matches!(
            cause.downcast_ref::<VmError>(),
            Some(VmError::StackOverflow)
        ));
        assert_eq!(
            runtime.get_property(&instance, "Name").unwrap(),
            Value::from("again")
        );
    }
}
