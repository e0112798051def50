//! Wrapper class synthesis
//!
//! Given a source class, defines a subclass that:
//! - appends two private slots (wrapped instance, tracking callback)
//! - takes `(wrapped, callback)` in its constructor
//! - exposes the wrapped instance through the `GetProxied` capability
//! - overrides every virtual property with a pass-through getter and an
//!   intercepting setter
//!
//! Non-virtual properties cannot be overridden and are recorded as skipped.

use tracing::debug;
use trackwire_bytecode::{verify_function, Function};

use super::emitter::{Emitter, SlotLayout};
use super::error::{ProxyError, ProxyResult};
use super::options::ProxyOptions;
use crate::vm::{
    getter_name, setter_name, Class, ClassId, FunctionId, Runtime, SubclassDefinition, ValueKind,
};

/// Capability implemented by every wrapper class
pub const PROXIED_CAPABILITY: &str = "GetProxied";

/// Method returning the wrapped instance
pub const UNWRAP_METHOD: &str = "GetProxiedInstance";

/// Name of the slot holding the wrapped instance
pub const WRAPPED_FIELD: &str = "__wrapped";

/// Name of the slot holding the tracking callback
pub const CALLBACK_FIELD: &str = "__callback";

/// A property whose accessors were overridden
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedProperty {
    /// Property name
    pub name: String,
    /// Pass-through getter, if the property is readable
    pub getter: Option<FunctionId>,
    /// Intercepting setter, if the property is writable
    pub setter: Option<FunctionId>,
}

/// Descriptor of a synthesized wrapper class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperType {
    /// Class the wrapper was synthesized for
    pub source_class_id: ClassId,
    /// The wrapper class
    pub class_id: ClassId,
    /// Wrapper class name
    pub name: String,
    /// Private slot positions
    pub layout: SlotLayout,
    /// Vtable slot of the capability accessor
    pub unwrap_slot: usize,
    /// Overridden properties in declaration order
    pub intercepted: Vec<InterceptedProperty>,
    /// Non-virtual properties left as inherited
    pub skipped: Vec<String>,
    /// CRC32 over every emitted body
    pub fingerprint: u32,
}

impl WrapperType {
    /// Whether writes to `property` notify the callback
    pub fn intercepts(&self, property: &str) -> bool {
        self.intercepted
            .iter()
            .any(|p| p.name == property && p.setter.is_some())
    }
}

/// Reject classes that cannot be wrapped by subclassing
pub fn check_supported(class: &Class) -> ProxyResult<()> {
    if class.is_sealed {
        return Err(ProxyError::UnsupportedType {
            class: class.name.clone(),
            reason: "class is sealed".to_string(),
        });
    }
    if !class.has_default_constructor() {
        return Err(ProxyError::UnsupportedType {
            class: class.name.clone(),
            reason: format!(
                "no public no-argument constructor (constructor takes {} arguments)",
                class.constructor_arity
            ),
        });
    }
    Ok(())
}

/// Synthesizes wrapper classes in a runtime
pub struct ProxyTypeBuilder<'a> {
    runtime: &'a Runtime,
    options: &'a ProxyOptions,
}

impl<'a> ProxyTypeBuilder<'a> {
    /// Create a builder
    pub fn new(runtime: &'a Runtime, options: &'a ProxyOptions) -> Self {
        Self { runtime, options }
    }

    /// Define the wrapper class for `source`
    pub fn build(&self, source: &Class) -> ProxyResult<WrapperType> {
        check_supported(source)?;

        let name = self.options.type_name(&source.name);
        let layout = SlotLayout {
            wrapped_field: to_u16(source, source.field_count())?,
            callback_field: to_u16(source, source.field_count() + 1)?,
        };
        let emitter = Emitter::new(layout);
        let mut hasher = crc32fast::Hasher::new();

        let constructor = emitter.constructor(&format!("{}::.ctor", name), to_u32(source, source.id)?);
        let constructor = self.define(source, constructor, &mut hasher)?;
        let unwrap = self.define(source, emitter.unwrap_accessor(UNWRAP_METHOD), &mut hasher)?;

        let mut definition = SubclassDefinition::new(name.clone())
            .field(WRAPPED_FIELD, ValueKind::Object)
            .field(CALLBACK_FIELD, ValueKind::Callback)
            .constructor(constructor, 2)
            .method(UNWRAP_METHOD, unwrap)
            .implements(PROXIED_CAPABILITY)
            .sealed();

        let mut intercepted = Vec::new();
        let mut skipped = Vec::new();
        for property in &source.properties {
            if !property.is_virtual {
                skipped.push(property.name.clone());
                continue;
            }

            let getter = match property.getter {
                Some(slot) => {
                    let method = getter_name(&property.name);
                    let body = emitter.passthrough_getter(&method, to_u32(source, slot)?);
                    let fid = self.define(source, body, &mut hasher)?;
                    definition = definition.method(method, fid);
                    Some(fid)
                }
                None => None,
            };
            let setter = match property.setter {
                Some(slot) => {
                    let method = setter_name(&property.name);
                    let body =
                        emitter.intercepting_setter(&method, to_u32(source, slot)?, &property.name);
                    let fid = self.define(source, body, &mut hasher)?;
                    definition = definition.method(method, fid);
                    Some(fid)
                }
                None => None,
            };

            intercepted.push(InterceptedProperty {
                name: property.name.clone(),
                getter,
                setter,
            });
        }

        let class_id = self
            .runtime
            .define_subclass(source.id, definition)
            .map_err(|e| synthesis(source, e))?;
        let unwrap_slot = self
            .runtime
            .class(class_id)?
            .method(UNWRAP_METHOD)
            .map(|entry| entry.slot)
            .ok_or_else(|| synthesis(source, "capability accessor missing"))?;

        debug!(
            source = %source.name,
            wrapper = %name,
            class_id,
            intercepted = intercepted.len(),
            skipped = skipped.len(),
            "synthesized tracking proxy type"
        );

        Ok(WrapperType {
            source_class_id: source.id,
            class_id,
            name,
            layout,
            unwrap_slot,
            intercepted,
            skipped,
            fingerprint: hasher.finalize(),
        })
    }

    fn define(
        &self,
        source: &Class,
        body: Function,
        hasher: &mut crc32fast::Hasher,
    ) -> ProxyResult<FunctionId> {
        if self.options.verify_bodies {
            verify_function(&body).map_err(|e| synthesis(source, e))?;
        }
        hasher.update(&body.checksum().to_le_bytes());
        self.runtime
            .define_function(body)
            .map_err(|e| synthesis(source, e))
    }
}

fn synthesis(source: &Class, reason: impl ToString) -> ProxyError {
    ProxyError::Synthesis {
        class: source.name.clone(),
        reason: reason.to_string(),
    }
}

fn to_u16(source: &Class, value: usize) -> ProxyResult<u16> {
    u16::try_from(value).map_err(|_| synthesis(source, format!("field index {} exceeds u16", value)))
}

fn to_u32(source: &Class, value: usize) -> ProxyResult<u32> {
    u32::try_from(value).map_err(|_| synthesis(source, format!("operand {} exceeds u32", value)))
}
