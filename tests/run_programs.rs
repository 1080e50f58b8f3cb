// tests/run_programs.rs
//! End-to-end tests: compile literal source programs and execute them in
//! the interpreter, checking the returned values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shrew::bytecode::{BytecodeGenerator, BytecodeModule};
use shrew::frontend::Parser;
use shrew::sema::Analyzer;
use shrew::sql::{self, ExecutionContext};
use shrew::vm::{Vm, VmError};

fn compile(source: &str) -> BytecodeModule {
    let mut parser = Parser::new(source);
    let file = parser.parse_file();
    let (interner, errors) = parser.into_parts();
    assert!(errors.is_empty(), "parse errors: {:?}", errors);
    let mut analyzed = Analyzer::new(&interner)
        .analyze(file)
        .unwrap_or_else(|errors| panic!("sema errors: {:?}", errors));
    BytecodeGenerator::generate(&mut analyzed, &interner).expect("codegen")
}

/// Invoke a function passing raw 64-bit parameter words, collecting a
/// returned value of type T through the hidden return slot.
fn invoke_with<T: Copy + Default>(
    module: &BytecodeModule,
    name: &str,
    args: &[u64],
) -> Result<T, VmError> {
    let id = module.function_id_by_name(name).expect("function exists");
    let info = module.function_info_by_id(id).unwrap();

    let mut ret = T::default();
    let mut buffer = vec![0u8; info.params_size() as usize];
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(&mut ret as *mut T as u64);
    words.extend_from_slice(args);

    for (word, param) in words
        .iter()
        .zip(info.locals()[..info.num_params() as usize].iter())
    {
        let size = (param.size as usize).min(8);
        let start = param.offset as usize;
        buffer[start..start + size].copy_from_slice(&word.to_le_bytes()[..size]);
    }

    Vm::invoke(module, id, &buffer)?;
    Ok(ret)
}

fn run<T: Copy + Default>(source: &str) -> T {
    let module = compile(source);
    invoke_with(&module, "main", &[]).expect("execution")
}

#[test]
fn arithmetic_and_return() {
    let result: i32 =
        run("fun main() -> int32 { var x: int32 = 2; var y: int32 = 3; return x * y + 1 }");
    assert_eq!(result, 7);
}

#[test]
fn integer_narrowing_truncates() {
    let result: i8 =
        run("fun main() -> int8 { var x: int32 = 258; var y: int8 = x; return y }");
    assert_eq!(result, 2);
}

#[test]
fn mixed_sql_integer_widening() {
    // The primitive operand is implicitly converted; the SQL sum must hold
    let result: i64 = run(
        "fun main() -> int64 {
             var a: Integer = @intToSql(39)
             var x: int32 = 3
             var s: Integer = a + x
             if (s == @intToSql(42)) { return 1 }
             return 0
         }",
    );
    assert_eq!(result, 1);
}

#[test]
fn loop_with_init_cond_next() {
    let result: i32 = run(
        "fun main() -> int32 {
             var sum: int32 = 0
             for (var i: int32 = 1; i <= 10; i = i + 1) { sum = sum + i }
             return sum
         }",
    );
    assert_eq!(result, 55);
}

#[test]
fn size_of_builtin() {
    let result: u32 = run("fun main() -> uint32 { return @sizeOf(int64) }");
    assert_eq!(result, 8);
}

#[test]
fn if_else_chains() {
    let source = "fun classify(x: int32) -> int32 {
                      if (x < 0) { return 0 - 1 }
                      else if (x == 0) { return 0 }
                      else { return 1 }
                  }
                  fun main() -> int32 { return classify(5) }";
    let module = compile(source);
    let pos: i32 = invoke_with(&module, "classify", &[5i64 as u64]).unwrap();
    let neg: i32 = invoke_with(&module, "classify", &[(-7i64) as u64]).unwrap();
    let zero: i32 = invoke_with(&module, "classify", &[0]).unwrap();
    assert_eq!((neg, zero, pos), (-1, 0, 1));
}

#[test]
fn function_calls_compose() {
    let result: i32 = run(
        "fun square(x: int32) -> int32 { return x * x }
         fun main() -> int32 { return square(3) + square(4) }",
    );
    assert_eq!(result, 25);
}

#[test]
fn recursion_works() {
    let result: i64 = run(
        "fun fib(n: int64) -> int64 {
             if (n < 2) { return n }
             return fib(n - 1) + fib(n - 2)
         }
         fun main() -> int64 { return fib(15) }",
    );
    assert_eq!(result, 610);
}

#[test]
fn struct_fields_and_pointers() {
    let result: i64 = run(
        "struct Row { a: int32; b: int64 }
         fun main() -> int64 {
             var row: Row
             row.a = 5
             row.b = 37
             var p: *Row = &row
             return p.b + 5
         }",
    );
    assert_eq!(result, 42);
}

#[test]
fn offset_of_matches_layout() {
    let result: u32 = run(
        "struct Row { a: int8; b: int64 }
         fun main() -> uint32 { return @offsetOf(Row, b) }",
    );
    assert_eq!(result, 8);
}

#[test]
fn ptr_cast_reinterprets() {
    let result: i64 = run(
        "struct Pair { first: int64; second: int64 }
         fun main() -> int64 {
             var pair: Pair
             pair.first = 11
             pair.second = 31
             var raw: *uint8 = @ptrCast(*uint8, &pair)
             var back: *Pair = @ptrCast(*Pair, raw)
             return back.first + back.second
         }",
    );
    assert_eq!(result, 42);
}

#[test]
fn sql_real_arithmetic() {
    let result: i64 = run(
        "fun main() -> int64 {
             var a: Real = @floatToSql(1.5)
             var b: Real = @floatToSql(2.25)
             var sum: Real = a + b
             if (sum == @floatToSql(3.75)) { return 1 }
             return 0
         }",
    );
    assert_eq!(result, 1);
}

#[test]
fn sql_boolean_drives_branches() {
    // Both outcomes of the SQL comparison steer the primitive branch
    let source = "fun pick(x: int32) -> int32 {
                      var a: Integer = @intToSql(x)
                      var limit: Integer = @intToSql(10)
                      if (a < limit) { return 1 }
                      return 2
                  }
                  fun main() -> int32 { return pick(3) }";
    let module = compile(source);
    let below: i32 = invoke_with(&module, "pick", &[3]).unwrap();
    let above: i32 = invoke_with(&module, "pick", &[30]).unwrap();
    assert_eq!((below, above), (1, 2));
}

#[test]
fn division_by_zero_is_fatal() {
    let module = compile(
        "fun main() -> int32 { var x: int32 = 1; var y: int32 = 0; return x / y }",
    );
    let result: Result<i32, VmError> = invoke_with(&module, "main", &[]);
    assert!(matches!(result, Err(VmError::DivideByZero)));
}

#[test]
fn bitwise_and_shifts() {
    let result: u32 = run(
        "fun main() -> uint32 {
             var x: uint32 = 240
             var y: uint32 = 15
             return ((x | y) & 255) ^ (1 << 8)
         }",
    );
    assert_eq!(result, 255 ^ 256);
}

// S6: every arithmetic opcode for every integer width must agree with the
// host's native semantics on random inputs (divisor never zero).
macro_rules! opcode_agreement {
    ($test:ident, $src_ty:literal, $ty:ty) => {
        #[test]
        fn $test() {
            let source = format!(
                "fun f(a: {ty}, b: {ty}, c: {ty}) -> {ty} {{
                     return (a + b) * a - b / c + a % c
                 }}",
                ty = $src_ty
            );
            let module = compile(&source);
            let mut rng = StdRng::seed_from_u64(0x5eed);
            for _ in 0..200 {
                let a: $ty = rng.gen();
                let b: $ty = rng.gen();
                let mut c: $ty = rng.gen();
                if c == 0 {
                    c = 1;
                }
                let expected = a
                    .wrapping_add(b)
                    .wrapping_mul(a)
                    .wrapping_sub(b.wrapping_div(c))
                    .wrapping_add(a.wrapping_rem(c));
                let actual: $ty = invoke_with(
                    &module,
                    "f",
                    &[a as i64 as u64, b as i64 as u64, c as i64 as u64],
                )
                .unwrap();
                assert_eq!(actual, expected, "a={} b={} c={}", a, b, c);
            }
        }
    };
}

opcode_agreement!(opcode_agreement_i8, "int8", i8);
opcode_agreement!(opcode_agreement_i16, "int16", i16);
opcode_agreement!(opcode_agreement_i32, "int32", i32);
opcode_agreement!(opcode_agreement_i64, "int64", i64);
opcode_agreement!(opcode_agreement_u8, "uint8", u8);
opcode_agreement!(opcode_agreement_u16, "uint16", u16);
opcode_agreement!(opcode_agreement_u32, "uint32", u32);
opcode_agreement!(opcode_agreement_u64, "uint64", u64);

#[test]
fn table_scan_sums_column() {
    let rows = 5000usize;
    let data: Vec<Option<i64>> = (0..rows as i64).map(Some).collect();
    sql::table::register_table(sql::Table::new(
        "scan_sum_table",
        vec![sql::Column::BigInt(data)],
    ));
    let expected = (rows as i64 - 1) * rows as i64 / 2;

    let source = format!(
        "fun main() -> int64 {{
             var tvi: TableVectorIterator
             @tableIterInit(&tvi, \"scan_sum_table\")
             var sum: Integer = @intToSql(0)
             for (vpi in &tvi) {{
                 for (; @vpiHasNext(vpi); @vpiAdvance(vpi)) {{
                     var v: Integer = @vpiGetBigInt(vpi, 0)
                     sum = sum + v
                 }}
                 @vpiReset(vpi)
             }}
             @tableIterClose(&tvi)
             if (sum == @intToSql({expected})) {{ return 1 }}
             return 0
         }}"
    );
    let result: i64 = run(&source);
    assert_eq!(result, 1);
}

#[test]
fn aggregator_lifecycle() {
    let result: i64 = run(
        "fun main() -> int64 {
             var agg: IntegerSumAggregate
             @aggInit(&agg)
             for (var i: int32 = 1; i <= 10; i = i + 1) {
                 var v: Integer = @intToSql(i)
                 @aggAdvance(&agg, &v)
             }
             var result: Integer = @aggResult(&agg)
             if (result == @intToSql(55)) { return 1 }
             return 0
         }",
    );
    assert_eq!(result, 1);
}

#[test]
fn sorter_orders_rows_through_bytecode() {
    let source = "fun cmp(a: *uint8, b: *uint8) -> int32 {
                      var x: *int64 = @ptrCast(*int64, a)
                      var y: *int64 = @ptrCast(*int64, b)
                      if (*x < *y) { return 0 - 1 }
                      if (*x > *y) { return 1 }
                      return 0
                  }
                  fun main(ctx: *ExecutionContext) -> int64 {
                      var mem: *MemoryPool = @execCtxGetMem(ctx)
                      var sorter: Sorter
                      @sorterInit(&sorter, mem, cmp, 8)
                      for (var i: int64 = 32; i > 0; i = i - 1) {
                          var row: *uint8 = @sorterInsert(&sorter)
                          var slot: *int64 = @ptrCast(*int64, row)
                          *slot = i
                      }
                      @sorterSort(&sorter)
                      var iter: SorterIterator
                      @sorterIterInit(&iter, &sorter)
                      var prev: int64 = 0
                      var ordered: int64 = 1
                      for (; @sorterIterHasNext(&iter); @sorterIterNext(&iter)) {
                          var row: *uint8 = @sorterIterGetRow(&iter)
                          var v: *int64 = @ptrCast(*int64, row)
                          if (*v <= prev) { ordered = 0 }
                          prev = *v
                      }
                      @sorterIterClose(&iter)
                      @sorterFree(&sorter)
                      return ordered
                  }";
    let module = compile(source);
    let mut ctx = ExecutionContext::default();
    let result: i64 =
        invoke_with(&module, "main", &[&mut ctx as *mut ExecutionContext as u64]).unwrap();
    assert_eq!(result, 1);
}

#[test]
fn string_like_match() {
    let result: i64 = run(
        "fun main() -> int64 {
             var s: StringVal = @stringToSql(\"columnar engine\")
             var p: StringVal = @stringToSql(\"col%eng_ne\")
             var matched: Boolean = @like(s, p)
             if (@sqlToBool(matched)) { return 1 }
             return 0
         }",
    );
    assert_eq!(result, 1);
}

#[test]
fn float_int_conversions() {
    let result: i32 = run(
        "fun main() -> int32 {
             var f: float32 = 2.5
             var i: int32 = 10
             var mixed: float32 = f * i
             var back: int32 = mixed
             return back
         }",
    );
    assert_eq!(result, 25);
}
