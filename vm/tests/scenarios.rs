//! End-to-end scenarios built directly from `Instruction` values, so the
//! core VM's test suite never depends on the assembler crate.

use tastier_vm::{BinaryOp, InputQueue, NullaryOp, Outcome, UnaryOp, Vm, VmError, Word};

fn nullary(op: NullaryOp) -> tastier_vm::Instruction {
    tastier_vm::Instruction::nullary(op)
}
fn unary(op: UnaryOp, a: Word) -> tastier_vm::Instruction {
    tastier_vm::Instruction::unary(op, a)
}
fn binary(op: BinaryOp, a: Word, b: Word) -> tastier_vm::Instruction {
    tastier_vm::Instruction::binary(op, a, b)
}

const N: Word = 3;
const ACC: Word = 4;

#[test]
fn echo_positive_sum() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        nullary(Read),          // 0
        unary(StoG, N),         // 1
        unary(LoadG, N),        // 2  [OUTER]
        unary(Const, 0),        // 3
        nullary(Gtr),           // 4
        unary(FJmp, 30),        // 5
        unary(Const, 0),        // 6
        unary(StoG, ACC),       // 7
        unary(Const, 1),        // 8
        unary(StoG, ACC + 1),   // 9  (i)
        unary(LoadG, ACC + 1),  // 10 [INNER]
        unary(LoadG, N),        // 11
        nullary(LssEq),         // 12
        unary(FJmp, 23),        // 13
        unary(LoadG, ACC),      // 14
        unary(LoadG, ACC + 1),  // 15
        nullary(Add),           // 16
        unary(StoG, ACC),       // 17
        unary(LoadG, ACC + 1),  // 18
        unary(Const, 1),        // 19
        nullary(Add),           // 20
        unary(StoG, ACC + 1),   // 21
        unary(Jmp, 10),         // 22
        unary(Const, 0),        // 23 [AFTER_LOOP] dummy
        unary(LoadG, ACC),      // 24
        nullary(Write),         // 25
        nullary(Print),         // 26
        nullary(Read),          // 27
        unary(StoG, N),         // 28
        unary(Jmp, 2),          // 29
        nullary(Halt),          // 30 [END]
    ];

    let input = InputQueue::new([3, 5, 0]);
    let mut vm = Vm::with_input(program, &[], input);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["6".to_string(), "15".to_string()]);
}

#[test]
fn nested_scope_load() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        binary(BinaryOp::Call, 0, 2),  // 0
        nullary(Halt),                 // 1
        unary(Enter, 1),               // 2  [OUTER]
        unary(Const, 7),               // 3
        binary(BinaryOp::Sto, 0, 0),   // 4
        binary(BinaryOp::Call, 0, 8),  // 5
        nullary(Leave),                // 6
        nullary(Ret),                  // 7
        unary(Enter, 0),               // 8  [INNER]
        unary(Const, 0),               // 9  dummy
        binary(BinaryOp::Load, 1, 0),  // 10
        nullary(Write),                // 11
        nullary(Print),                // 12
        nullary(Leave),                // 13
        nullary(Ret),                  // 14
    ];

    let mut vm = Vm::new(program, &[]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["7".to_string()]);
}

#[test]
fn recursive_factorial_via_static_link() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        unary(Const, 5),               // 0
        unary(StoG, N),                // 1
        unary(Const, 1),               // 2
        unary(StoG, ACC),              // 3
        binary(BinaryOp::Call, 0, 10), // 4
        unary(Const, 0),               // 5  dummy
        unary(LoadG, ACC),             // 6
        nullary(Write),                // 7
        nullary(Print),                // 8
        nullary(Halt),                 // 9
        unary(Enter, 1),               // 10 [FACT]
        unary(LoadG, N),                // 11
        binary(BinaryOp::Sto, 0, 0),    // 12
        unary(LoadG, N),                // 13
        unary(Const, 1),                // 14
        nullary(Gtr),                   // 15
        unary(FJmp, 27),                // 16
        unary(LoadG, N),                // 17
        unary(Const, 1),                // 18
        nullary(Sub),                   // 19
        unary(StoG, N),                 // 20
        binary(BinaryOp::Call, 1, 10),  // 21
        unary(LoadG, ACC),               // 22
        binary(BinaryOp::Load, 0, 0),    // 23
        nullary(Mul),                    // 24
        unary(StoG, ACC),                // 25
        unary(Jmp, 31),                  // 26
        unary(LoadG, ACC),               // 27 [BASE]
        binary(BinaryOp::Load, 0, 0),    // 28
        nullary(Mul),                    // 29
        unary(StoG, ACC),                // 30
        nullary(Leave),                  // 31 [END]
        nullary(Ret),                    // 32
    ];

    let mut vm = Vm::new(program, &[]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["120".to_string()]);
}

#[test]
fn two_d_array_round_trip() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        unary(Const, 42),                    // 0  v
        unary(Const, 2),                     // 1  dim0
        unary(Const, 3),                     // 2  dim1
        unary(Const, 1),                     // 3  idx0
        unary(Const, 2),                     // 4  idx1
        binary(BinaryOp::StoArr, 3, 2),      // 5
        unary(Const, 0),                     // 6  dummy
        unary(Const, 1),                     // 7  idx0
        unary(Const, 2),                     // 8  idx1
        unary(Const, 2),                     // 9  dim0
        unary(Const, 3),                     // 10 dim1
        binary(BinaryOp::LoadArr, 3, 2),     // 11
        nullary(Write),                      // 12
        nullary(Print),                      // 13
        nullary(Halt),                        // 14
    ];

    let mut vm = Vm::new(program, &[0; 6]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["42".to_string()]);
}

#[test]
fn array_store_out_of_bounds_faults() {
    let program = vec![
        unary_const(99),
        unary_const(2),
        unary_const(3),
        unary_const(2), // idx0 == dim0, out of bounds
        unary_const(0),
        binary(BinaryOp::StoArr, 3, 2), // pc = 5
    ];

    let mut vm = Vm::new(program, &[0; 6]);
    let err = vm.run().unwrap_err();
    assert_eq!(err, VmError::IndexOutOfBounds { pc: 5 });
}

fn unary_const(v: Word) -> tastier_vm::Instruction {
    unary(UnaryOp::Const, v)
}

#[test]
fn string_print_walks_downward_to_terminator() {
    use NullaryOp::*;
    use UnaryOp::*;

    // Data memory: [terminator, 'i', 'H'], ptr = DATA_BASE + 2 = 5 (first
    // char 'H' at the highest address, walk proceeds downward to 'i' then
    // the terminator at index 0).
    let data = vec![0, b'i' as Word, b'H' as Word];

    let program = vec![
        unary(Const, 0), // 0 dummy
        unary(Const, 5), // 1 ptr
        nullary(WriteS), // 2
        nullary(Print),  // 3
        nullary(Halt),   // 4
    ];

    let mut vm = Vm::new(program, &data);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["Hi".to_string()]);
}

#[test]
fn neg_round_trip_is_identity() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        unary(Const, 0), // 0 dummy
        unary(Const, 5), // 1 v
        nullary(Neg),    // 2
        nullary(Neg),    // 3
        nullary(Write),  // 4
        nullary(Print),  // 5
        nullary(Halt),   // 6
    ];

    let mut vm = Vm::new(program, &[]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["5".to_string()]);
}

#[test]
fn dup_then_add_doubles_the_value() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        unary(Const, 0), // 0 dummy
        unary(Const, 7), // 1 v
        nullary(Dup),    // 2
        nullary(Add),    // 3
        nullary(Write),  // 4
        nullary(Print),  // 5
        nullary(Halt),   // 6
    ];

    let mut vm = Vm::new(program, &[]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["14".to_string()]);
}

#[test]
fn divide_by_zero_faults() {
    let program = vec![unary_const(10), unary_const(0), nullary(NullaryOp::Div)];

    let mut vm = Vm::new(program, &[]);
    let err = vm.run().unwrap_err();
    assert_eq!(err, VmError::DivideByZero { pc: 2 });
}

#[test]
fn relational_ops_produce_boolean_words() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        unary(Const, 0), // 0 dummy
        unary(Const, 3), // 1 b
        unary(Const, 3), // 2 a
        nullary(Equ),    // 3  3 == 3 -> 1
        nullary(Write),  // 4
        nullary(Print),  // 5
        unary(Const, 0), // 6 dummy
        unary(Const, 5), // 7 b
        unary(Const, 3), // 8 a
        nullary(NEqu),   // 9  5 != 3 -> 1
        nullary(Write),  // 10
        nullary(Print),  // 11
        unary(Const, 0), // 12 dummy
        unary(Const, 3), // 13 b
        unary(Const, 5), // 14 a
        nullary(GtrEq),  // 15  3 >= 5 -> 0
        nullary(Write),  // 16
        nullary(Print),  // 17
        nullary(Halt),   // 18
    ];

    let mut vm = Vm::new(program, &[]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(
        vm.output_lines(),
        &["1".to_string(), "1".to_string(), "0".to_string()]
    );
}

#[test]
fn rank1_array_bounds() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        // Store 10 at the lower-bound index (0) of a 4-element array.
        unary(Const, 10),               // 0 v
        unary(Const, 4),                // 1 dim0
        unary(Const, 0),                // 2 idx0
        binary(BinaryOp::StoArr, 3, 1), // 3
        // Store 20 at the upper-bound index (dim0 - 1 = 3).
        unary(Const, 20),               // 4 v
        unary(Const, 4),                // 5 dim0
        unary(Const, 3),                // 6 idx0
        binary(BinaryOp::StoArr, 3, 1), // 7
        // Load and print both.
        unary(Const, 0),                  // 8 dummy
        unary(Const, 0),                  // 9 idx0
        unary(Const, 4),                  // 10 dim0
        binary(BinaryOp::LoadArr, 3, 1),  // 11
        nullary(Write),                   // 12
        nullary(Print),                   // 13
        unary(Const, 0),                  // 14 dummy
        unary(Const, 3),                  // 15 idx0
        unary(Const, 4),                  // 16 dim0
        binary(BinaryOp::LoadArr, 3, 1),  // 17
        nullary(Write),                   // 18
        nullary(Print),                   // 19
        nullary(Halt),                     // 20
    ];

    let mut vm = Vm::new(program, &[0; 4]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["10".to_string(), "20".to_string()]);
}

#[test]
fn rank3_array_bounds() {
    use NullaryOp::*;
    use UnaryOp::*;

    let program = vec![
        // Store 111 at the lower-bound index (0,0,0) of a 2x2x2 array.
        unary(Const, 111),              // 0 v
        unary(Const, 2),                // 1 dim0
        unary(Const, 2),                // 2 dim1
        unary(Const, 2),                // 3 dim2
        unary(Const, 0),                // 4 idx0
        unary(Const, 0),                // 5 idx1
        unary(Const, 0),                // 6 idx2
        binary(BinaryOp::StoArr, 3, 3), // 7
        // Store 222 at the upper-bound index (1,1,1).
        unary(Const, 222),              // 8 v
        unary(Const, 2),                // 9 dim0
        unary(Const, 2),                // 10 dim1
        unary(Const, 2),                // 11 dim2
        unary(Const, 1),                // 12 idx0
        unary(Const, 1),                // 13 idx1
        unary(Const, 1),                // 14 idx2
        binary(BinaryOp::StoArr, 3, 3), // 15
        // Load and print both.
        unary(Const, 0),                 // 16 dummy
        unary(Const, 0),                 // 17 idx0
        unary(Const, 0),                 // 18 idx1
        unary(Const, 0),                 // 19 idx2
        unary(Const, 2),                 // 20 dim0
        unary(Const, 2),                 // 21 dim1
        unary(Const, 2),                 // 22 dim2
        binary(BinaryOp::LoadArr, 3, 3), // 23
        nullary(Write),                  // 24
        nullary(Print),                  // 25
        unary(Const, 0),                 // 26 dummy
        unary(Const, 1),                 // 27 idx0
        unary(Const, 1),                 // 28 idx1
        unary(Const, 1),                 // 29 idx2
        unary(Const, 2),                 // 30 dim0
        unary(Const, 2),                 // 31 dim1
        unary(Const, 2),                 // 32 dim2
        binary(BinaryOp::LoadArr, 3, 3), // 33
        nullary(Write),                  // 34
        nullary(Print),                  // 35
        nullary(Halt),                    // 36
    ];

    let mut vm = Vm::new(program, &[0; 8]);
    assert_eq!(vm.run().unwrap(), Outcome::Halted);
    assert_eq!(vm.output_lines(), &["111".to_string(), "222".to_string()]);
}

#[test]
fn negative_array_index_faults() {
    let program = vec![
        unary_const(-1),                  // 0 idx0
        unary_const(4),                   // 1 dim0
        binary(BinaryOp::LoadArr, 3, 1),  // pc = 2
    ];

    let mut vm = Vm::new(program, &[0; 4]);
    let err = vm.run().unwrap_err();
    assert_eq!(err, VmError::IndexOutOfBounds { pc: 2 });
}
