//! Body emission for wrapper classes
//!
//! Each body is straight-line code: field loads and stores plus the explicit
//! calls below. Failures raised by the write-through call or the callback
//! propagate to the caller unchanged.

use trackwire_bytecode::{Function, FunctionBuilder};

/// Positions of the two private slots appended to a wrapper class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// Field holding the wrapped instance
    pub wrapped_field: u16,
    /// Field holding the tracking callback
    pub callback_field: u16,
}

/// Emits wrapper bodies for one layout
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    layout: SlotLayout,
}

impl Emitter {
    /// Create an emitter for `layout`
    pub fn new(layout: SlotLayout) -> Self {
        Self { layout }
    }

    /// Slot layout the bodies refer to
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// `(this, wrapped, callback)`: run the base no-argument constructor, then
    /// store `wrapped` and `callback` in that order
    pub fn constructor(&self, name: &str, base_class: u32) -> Function {
        let mut b = FunctionBuilder::new(name, 3);
        b.load_local(0)
            .call_constructor(base_class)
            .load_local(0)
            .load_local(1)
            .store_field(self.layout.wrapped_field)
            .load_local(0)
            .load_local(2)
            .store_field(self.layout.callback_field)
            .ret_void();
        b.build()
    }

    /// `(this)`: return the wrapped instance's getter result
    pub fn passthrough_getter(&self, name: &str, getter_slot: u32) -> Function {
        let mut b = FunctionBuilder::new(name, 1);
        b.load_local(0)
            .load_field(self.layout.wrapped_field)
            .call_method(getter_slot, 0)
            .ret();
        b.build()
    }

    /// `(this, value)`: write through to the wrapped instance, then invoke the
    /// callback with the wrapped instance and `property`
    pub fn intercepting_setter(&self, name: &str, setter_slot: u32, property: &str) -> Function {
        let mut b = FunctionBuilder::new(name, 2);
        b.load_local(0)
            .load_field(self.layout.wrapped_field)
            .load_local(1)
            .call_method(setter_slot, 1)
            .pop()
            .load_local(0)
            .load_field(self.layout.callback_field)
            .load_local(0)
            .load_field(self.layout.wrapped_field)
            .const_str(property)
            .invoke_callback(2)
            .ret_void();
        b.build()
    }

    /// `(this)`: return the wrapped instance
    pub fn unwrap_accessor(&self, name: &str) -> Function {
        let mut b = FunctionBuilder::new(name, 1);
        b.load_local(0).load_field(self.layout.wrapped_field).ret();
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackwire_bytecode::{decode_instructions, verify_function, Opcode};

    fn emitter() -> Emitter {
        Emitter::new(SlotLayout {
            wrapped_field: 2,
            callback_field: 3,
        })
    }

    fn opcodes(function: &Function) -> Vec<Opcode> {
        decode_instructions(&function.code)
            .unwrap()
            .into_iter()
            .map(|i| i.opcode)
            .collect()
    }

    #[test]
    fn test_all_bodies_verify() {
        let e = emitter();
        for body in [
            e.constructor(".ctor", 0),
            e.passthrough_getter("get_Name", 0),
            e.intercepting_setter("set_Name", 1, "Name"),
            e.unwrap_accessor("GetProxiedInstance"),
        ] {
            verify_function(&body).unwrap();
        }
    }

    #[test]
    fn test_setter_writes_before_notifying() {
        let body = emitter().intercepting_setter("set_Name", 1, "Name");
        let ops = opcodes(&body);

        let call = ops.iter().position(|op| *op == Opcode::CallMethod).unwrap();
        let notify = ops.iter().position(|op| *op == Opcode::InvokeCallback).unwrap();
        assert!(call < notify);
        assert_eq!(body.constants.get_string(0), Some("Name"));
    }

    #[test]
    fn test_constructor_stores_wrapped_then_callback() {
        let body = emitter().constructor(".ctor", 5);
        let stores: Vec<u32> = decode_instructions(&body.code)
            .unwrap()
            .into_iter()
            .filter(|i| i.opcode == Opcode::StoreField)
            .map(|i| i.operand)
            .collect();
        assert_eq!(stores, vec![2, 3]);
        assert_eq!(opcodes(&body)[1], Opcode::CallConstructor);
    }

    #[test]
    fn test_getter_is_pure_passthrough() {
        let ops = opcodes(&emitter().passthrough_getter("get_Age", 4));
        assert_eq!(
            ops,
            vec![
                Opcode::LoadLocal0,
                Opcode::LoadField,
                Opcode::CallMethod,
                Opcode::Return
            ]
        );
    }
}
