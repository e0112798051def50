//! Proxy factory
//!
//! The public entry point: resolves the wrapper class for an instance's
//! class and constructs proxies bound to `(instance, callback)`.

use std::sync::Arc;

use tracing::trace;

use super::cache::TypeCache;
use super::error::{ProxyError, ProxyResult};
use super::options::ProxyOptions;
use super::type_builder::{
    check_supported, ProxyTypeBuilder, WrapperType, PROXIED_CAPABILITY, UNWRAP_METHOD,
};
use crate::vm::{ClassId, ObjectRef, Runtime, TrackingCallback, Value};

/// Creates change-tracking proxies
///
/// Each factory owns its wrapper type cache; share one factory per runtime
/// to synthesize each wrapper class once.
#[derive(Debug)]
pub struct ProxyFactory {
    runtime: Arc<Runtime>,
    cache: TypeCache,
    options: ProxyOptions,
}

impl ProxyFactory {
    /// Create a factory with default options
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self::with_options(runtime, ProxyOptions::default())
    }

    /// Create a factory with explicit options
    pub fn with_options(runtime: Arc<Runtime>, options: ProxyOptions) -> Self {
        Self {
            runtime,
            cache: TypeCache::new(),
            options,
        }
    }

    /// Wrap `instance` so that every successful property write is reported
    /// to `callback`
    ///
    /// Fails with [`ProxyError::UnsupportedType`] for sealed classes and
    /// classes without a no-argument constructor; no proxy is created then.
    pub fn create_proxy(
        &self,
        instance: &ObjectRef,
        callback: TrackingCallback,
    ) -> ProxyResult<ObjectRef> {
        let wrapper = self.wrapper_type(instance.class_id())?;
        let proxy = self.runtime.instantiate(
            wrapper.class_id,
            vec![Value::Object(instance.clone()), Value::Callback(callback)],
        )?;
        trace!(wrapper = %wrapper.name, wrapped = ?instance, "created tracking proxy");
        Ok(proxy)
    }

    /// Resolve (synthesizing on first use) the wrapper type for `class_id`
    pub fn wrapper_type(&self, class_id: ClassId) -> ProxyResult<Arc<WrapperType>> {
        let source = self.runtime.class(class_id)?;
        check_supported(&source)?;
        self.cache.resolve(class_id, || {
            ProxyTypeBuilder::new(&self.runtime, &self.options).build(&source)
        })
    }

    /// The instance a proxy wraps
    pub fn get_underlying(&self, proxy: &ObjectRef) -> ProxyResult<ObjectRef> {
        let class = self.runtime.class(proxy.class_id())?;
        if !class.implements(PROXIED_CAPABILITY) {
            return Err(ProxyError::NotAProxy {
                class: class.name.clone(),
            });
        }
        let wrapped = self.runtime.invoke(proxy, UNWRAP_METHOD, Vec::new())?;
        Ok(ObjectRef::try_from(wrapped)?)
    }

    /// Whether `object` is a tracking proxy
    pub fn is_proxy(&self, object: &ObjectRef) -> bool {
        self.runtime
            .class(object.class_id())
            .map(|class| class.implements(PROXIED_CAPABILITY))
            .unwrap_or(false)
    }

    /// The wrapper type cache
    pub fn cache(&self) -> &TypeCache {
        &self.cache
    }

    /// The runtime proxies live in
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Synthesis options
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }
}
