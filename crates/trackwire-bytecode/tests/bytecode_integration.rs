//! Integration tests for body emission, decoding and verification

use trackwire_bytecode::{
    decode_instructions, verify_function, Function, FunctionBuilder, Opcode, VerifyError,
};

#[test]
fn test_constructor_shaped_body() {
    // base ctor, then this.f2 = arg1, this.f3 = arg2
    let mut b = FunctionBuilder::new(".ctor", 3);
    b.load_local(0)
        .call_constructor(0)
        .load_local(0)
        .load_local(1)
        .store_field(2)
        .load_local(0)
        .load_local(2)
        .store_field(3)
        .ret_void();
    let function = b.build();

    verify_function(&function).expect("constructor body should verify");

    let ops: Vec<Opcode> = decode_instructions(&function.code)
        .unwrap()
        .into_iter()
        .map(|i| i.opcode)
        .collect();
    assert_eq!(
        ops,
        vec![
            Opcode::LoadLocal0,
            Opcode::CallConstructor,
            Opcode::LoadLocal0,
            Opcode::LoadLocal1,
            Opcode::StoreField,
            Opcode::LoadLocal0,
            Opcode::LoadLocal,
            Opcode::StoreField,
            Opcode::ReturnVoid,
        ]
    );
}

#[test]
fn test_decoded_operands() {
    let mut b = FunctionBuilder::new("f", 2);
    b.load_local(0)
        .load_field(9)
        .load_local(1)
        .call_method(4, 1)
        .ret();
    let instrs = decode_instructions(&b.build().code).unwrap();

    assert_eq!(instrs[1].opcode, Opcode::LoadField);
    assert_eq!(instrs[1].operand, 9);
    assert_eq!(instrs[3].opcode, Opcode::CallMethod);
    assert_eq!(instrs[3].operand, 4);
    assert_eq!(instrs[3].arg_count, 1);
}

#[test]
fn test_truncated_body_rejected() {
    let code = vec![Opcode::LoadLocal0 as u8, Opcode::LoadField as u8, 1];
    let function = Function::new("truncated", 1, code);

    assert!(matches!(
        verify_function(&function),
        Err(VerifyError::Decode(_))
    ));
}

#[test]
fn test_callback_needs_receiver() {
    // INVOKE_CALLBACK 2 with only two values on the stack
    let mut b = FunctionBuilder::new("f", 1);
    b.load_local(0).const_str("Name").invoke_callback(2).ret_void();

    assert!(matches!(
        verify_function(&b.build()),
        Err(VerifyError::StackUnderflow(_))
    ));
}
