// src/vm/vm.rs
//
// The token-threaded interpreter. The loop fetches a 2-byte opcode,
// advances, and dispatches to the handler arm; each handler reads its
// operands from the stream in schema order, performs its work against the
// activation frame, and falls through to the next fetch. Runtime builtins
// call the shims in crate::sql; callbacks encoded as function ids resolve
// through the module's function table.

use thiserror::Error;
use tracing::{debug, error};

use crate::bytecode::function_info::FunctionId;
use crate::bytecode::module::BytecodeModule;
use crate::bytecode::opcodes::Bytecode;
use crate::bytecode::operands::LocalVar;
use crate::sql;
use crate::sql::runner::FunctionRunner;
use crate::sql::{
    AggregationHashTable, AhtIterator, AhtOverflowPartitionIterator, AvgAggregate, BoolVal,
    CountAggregate, CountStarAggregate, CsvReader, DateVal, ExecutionContext, FilterManager,
    Integer, IntegerMaxAggregate, IntegerMinAggregate, IntegerSumAggregate, JoinHashTable,
    MemoryPool, Real, RealMaxAggregate, RealMinAggregate, RealSumAggregate, Sorter,
    SorterIterator, StringVal, TableVectorIterator, ThreadStateContainer, VectorFilterExecutor,
    VectorProjectionIterator,
};
use crate::vm::frame::Frame;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("division by zero")]
    DivideByZero,

    #[error("unknown function id {0}")]
    UnknownFunction(u16),

    #[error("unknown table id {0}")]
    UnknownTable(u16),

    #[error("malformed bytecode at offset {0}")]
    MalformedBytecode(usize),
}

/// One interpreter activation over a shared, read-only module
pub struct Vm<'m> {
    module: &'m BytecodeModule,
}

/// Lets runtime objects invoke bytecode functions by id (sort comparators,
/// key equality, per-thread init, parallel scan bodies). Each invocation
/// runs in a fresh frame, so workers never share activation state.
pub struct ModuleRunner<'m> {
    module: &'m BytecodeModule,
}

impl<'m> ModuleRunner<'m> {
    pub fn new(module: &'m BytecodeModule) -> Self {
        Self { module }
    }
}

impl FunctionRunner for ModuleRunner<'_> {
    fn run(&self, func_id: u16, args: &[u64]) {
        let Some(info) = self.module.function_info_by_id(func_id) else {
            error!(func_id, "callback refers to an unknown function");
            return;
        };
        let mut frame = Frame::new(info.frame_size());
        for (arg, param) in args.iter().zip(info.locals()[..info.num_params() as usize].iter()) {
            let bytes = arg.to_le_bytes();
            let size = (param.size as usize).min(8);
            let start = param.offset as usize;
            frame.raw_mut()[start..start + size].copy_from_slice(&bytes[..size]);
        }
        let vm = Vm { module: self.module };
        if let Err(err) = vm.interpret(self.module.bytecode_for(info), &mut frame) {
            error!(func_id, %err, "callback terminated abnormally");
        }
    }
}

impl<'m> Vm<'m> {
    /// Execute a function. `args` is the packed parameter region; for
    /// value-returning functions its first 8 bytes are the return-slot
    /// pointer. The activation frame is released on every exit path.
    pub fn invoke(
        module: &'m BytecodeModule,
        func_id: FunctionId,
        args: &[u8],
    ) -> Result<(), VmError> {
        let info = module
            .function_info_by_id(func_id)
            .ok_or(VmError::UnknownFunction(func_id))?;
        debug!(function = %info.name, frame_size = info.frame_size(), "executing");

        let mut frame = Frame::new(info.frame_size());
        let start = info.params_start() as usize;
        let len = args.len().min(info.params_size() as usize);
        frame.raw_mut()[start..start + len].copy_from_slice(&args[..len]);

        let vm = Vm { module };
        vm.interpret(module.bytecode_for(info), &mut frame)
    }

    fn runner(&self) -> ModuleRunner<'m> {
        ModuleRunner {
            module: self.module,
        }
    }

    fn interpret(&self, code: &[u8], frame: &mut Frame) -> Result<(), VmError> {
        let mut ip: usize = 0;

        macro_rules! read_bytes {
            ($ty:ty, $n:expr) => {{
                let v = <$ty>::from_le_bytes(
                    code[ip..ip + $n]
                        .try_into()
                        .map_err(|_| VmError::MalformedBytecode(ip))?,
                );
                ip += $n;
                v
            }};
        }
        macro_rules! rlocal {
            () => {
                LocalVar::decode(read_bytes!(u32, 4))
            };
        }
        macro_rules! rimm1 {
            () => {
                read_bytes!(i8, 1)
            };
        }
        macro_rules! rimm2 {
            () => {
                read_bytes!(i16, 2)
            };
        }
        macro_rules! rimm4 {
            () => {
                read_bytes!(i32, 4)
            };
        }
        macro_rules! rimm8 {
            () => {
                read_bytes!(i64, 8)
            };
        }
        macro_rules! ruimm2 {
            () => {
                read_bytes!(u16, 2)
            };
        }
        macro_rules! ruimm4 {
            () => {
                read_bytes!(u32, 4)
            };
        }

        // dest <- lhs op rhs over one primitive type
        macro_rules! binop {
            ($ty:ty, $f:expr) => {{
                let dest = rlocal!();
                let lhs: $ty = frame.value(rlocal!());
                let rhs: $ty = frame.value(rlocal!());
                let f: fn($ty, $ty) -> $ty = $f;
                frame.store::<$ty>(dest, f(lhs, rhs));
            }};
        }
        // Division and remainder trap on a zero divisor
        macro_rules! divop {
            ($ty:ty, $f:expr) => {{
                let dest = rlocal!();
                let lhs: $ty = frame.value(rlocal!());
                let rhs: $ty = frame.value(rlocal!());
                if rhs == 0 {
                    error!("division by zero");
                    return Err(VmError::DivideByZero);
                }
                let f: fn($ty, $ty) -> $ty = $f;
                frame.store::<$ty>(dest, f(lhs, rhs));
            }};
        }
        macro_rules! unop {
            ($ty:ty, $f:expr) => {{
                let dest = rlocal!();
                let input: $ty = frame.value(rlocal!());
                let f: fn($ty) -> $ty = $f;
                frame.store::<$ty>(dest, f(input));
            }};
        }
        macro_rules! cmpop {
            ($ty:ty, $f:expr) => {{
                let dest = rlocal!();
                let lhs: $ty = frame.value(rlocal!());
                let rhs: $ty = frame.value(rlocal!());
                let f: fn($ty, $ty) -> bool = $f;
                frame.store::<u8>(dest, f(lhs, rhs) as u8);
            }};
        }
        macro_rules! convert {
            ($from:ty, $to:ty) => {{
                let dest = rlocal!();
                let input: $from = frame.value(rlocal!());
                frame.store::<$to>(dest, input as $to);
            }};
        }
        // SQL value operations over value addresses
        macro_rules! sql_binop {
            ($ty:ty, $f:path) => {{
                let dest = frame.ptr(rlocal!()) as *mut $ty;
                let lhs = frame.ptr(rlocal!()) as *const $ty;
                let rhs = frame.ptr(rlocal!()) as *const $ty;
                unsafe { dest.write($f(&*lhs, &*rhs)) };
            }};
        }
        macro_rules! sql_cmp {
            ($ty:ty, $f:path) => {{
                let dest = frame.ptr(rlocal!()) as *mut BoolVal;
                let lhs = frame.ptr(rlocal!()) as *const $ty;
                let rhs = frame.ptr(rlocal!()) as *const $ty;
                unsafe { dest.write($f(&*lhs, &*rhs)) };
            }};
        }
        macro_rules! real_unary {
            ($f:expr) => {{
                let dest = frame.ptr(rlocal!()) as *mut Real;
                let input = frame.ptr(rlocal!()) as *const Real;
                unsafe { dest.write(sql::value::real_unary(&*input, $f)) };
            }};
        }
        macro_rules! hash_op {
            ($ty:ty, $f:path) => {{
                let dest = frame.ptr(rlocal!()) as *mut u64;
                let input = frame.ptr(rlocal!()) as *const $ty;
                unsafe { dest.write($f(&*input)) };
            }};
        }
        // Shim object access
        macro_rules! obj {
            ($ty:ty) => {
                unsafe { &mut *(frame.ptr(rlocal!()) as *mut $ty) }
            };
        }
        macro_rules! agg_unary {
            ($ty:ty, $method:ident) => {{
                let agg = obj!($ty);
                agg.$method();
            }};
        }
        macro_rules! agg_advance {
            ($ty:ty, $input:ty) => {{
                let agg = obj!($ty);
                let input = unsafe { &*(frame.ptr(rlocal!()) as *const $input) };
                agg.advance(input);
            }};
        }
        macro_rules! agg_merge {
            ($ty:ty) => {{
                let agg = obj!($ty);
                let other = unsafe { &*(frame.ptr(rlocal!()) as *const $ty) };
                agg.merge(other);
            }};
        }
        macro_rules! agg_result {
            ($ty:ty, $out:ty) => {{
                let dest = frame.ptr(rlocal!()) as *mut $out;
                let agg = unsafe { &*(frame.ptr(rlocal!()) as *const $ty) };
                unsafe { dest.write(agg.result()) };
            }};
        }

        loop {
            let raw = u16::from_le_bytes(
                code[ip..ip + 2]
                    .try_into()
                    .map_err(|_| VmError::MalformedBytecode(ip))?,
            );
            ip += 2;
            let op = Bytecode::from_raw(raw).ok_or(VmError::MalformedBytecode(ip - 2))?;

            match op {
                // ------------------------------------------------------------
                // Integer arithmetic
                // ------------------------------------------------------------
                Bytecode::AddI8 => binop!(i8, i8::wrapping_add),
                Bytecode::AddI16 => binop!(i16, i16::wrapping_add),
                Bytecode::AddI32 => binop!(i32, i32::wrapping_add),
                Bytecode::AddI64 => binop!(i64, i64::wrapping_add),
                Bytecode::AddU8 => binop!(u8, u8::wrapping_add),
                Bytecode::AddU16 => binop!(u16, u16::wrapping_add),
                Bytecode::AddU32 => binop!(u32, u32::wrapping_add),
                Bytecode::AddU64 => binop!(u64, u64::wrapping_add),
                Bytecode::SubI8 => binop!(i8, i8::wrapping_sub),
                Bytecode::SubI16 => binop!(i16, i16::wrapping_sub),
                Bytecode::SubI32 => binop!(i32, i32::wrapping_sub),
                Bytecode::SubI64 => binop!(i64, i64::wrapping_sub),
                Bytecode::SubU8 => binop!(u8, u8::wrapping_sub),
                Bytecode::SubU16 => binop!(u16, u16::wrapping_sub),
                Bytecode::SubU32 => binop!(u32, u32::wrapping_sub),
                Bytecode::SubU64 => binop!(u64, u64::wrapping_sub),
                Bytecode::MulI8 => binop!(i8, i8::wrapping_mul),
                Bytecode::MulI16 => binop!(i16, i16::wrapping_mul),
                Bytecode::MulI32 => binop!(i32, i32::wrapping_mul),
                Bytecode::MulI64 => binop!(i64, i64::wrapping_mul),
                Bytecode::MulU8 => binop!(u8, u8::wrapping_mul),
                Bytecode::MulU16 => binop!(u16, u16::wrapping_mul),
                Bytecode::MulU32 => binop!(u32, u32::wrapping_mul),
                Bytecode::MulU64 => binop!(u64, u64::wrapping_mul),
                Bytecode::DivI8 => divop!(i8, i8::wrapping_div),
                Bytecode::DivI16 => divop!(i16, i16::wrapping_div),
                Bytecode::DivI32 => divop!(i32, i32::wrapping_div),
                Bytecode::DivI64 => divop!(i64, i64::wrapping_div),
                Bytecode::DivU8 => divop!(u8, u8::wrapping_div),
                Bytecode::DivU16 => divop!(u16, u16::wrapping_div),
                Bytecode::DivU32 => divop!(u32, u32::wrapping_div),
                Bytecode::DivU64 => divop!(u64, u64::wrapping_div),
                Bytecode::RemI8 => divop!(i8, i8::wrapping_rem),
                Bytecode::RemI16 => divop!(i16, i16::wrapping_rem),
                Bytecode::RemI32 => divop!(i32, i32::wrapping_rem),
                Bytecode::RemI64 => divop!(i64, i64::wrapping_rem),
                Bytecode::RemU8 => divop!(u8, u8::wrapping_rem),
                Bytecode::RemU16 => divop!(u16, u16::wrapping_rem),
                Bytecode::RemU32 => divop!(u32, u32::wrapping_rem),
                Bytecode::RemU64 => divop!(u64, u64::wrapping_rem),
                Bytecode::BitAndI8 => binop!(i8, |a, b| a & b),
                Bytecode::BitAndI16 => binop!(i16, |a, b| a & b),
                Bytecode::BitAndI32 => binop!(i32, |a, b| a & b),
                Bytecode::BitAndI64 => binop!(i64, |a, b| a & b),
                Bytecode::BitAndU8 => binop!(u8, |a, b| a & b),
                Bytecode::BitAndU16 => binop!(u16, |a, b| a & b),
                Bytecode::BitAndU32 => binop!(u32, |a, b| a & b),
                Bytecode::BitAndU64 => binop!(u64, |a, b| a & b),
                Bytecode::BitOrI8 => binop!(i8, |a, b| a | b),
                Bytecode::BitOrI16 => binop!(i16, |a, b| a | b),
                Bytecode::BitOrI32 => binop!(i32, |a, b| a | b),
                Bytecode::BitOrI64 => binop!(i64, |a, b| a | b),
                Bytecode::BitOrU8 => binop!(u8, |a, b| a | b),
                Bytecode::BitOrU16 => binop!(u16, |a, b| a | b),
                Bytecode::BitOrU32 => binop!(u32, |a, b| a | b),
                Bytecode::BitOrU64 => binop!(u64, |a, b| a | b),
                Bytecode::BitXorI8 => binop!(i8, |a, b| a ^ b),
                Bytecode::BitXorI16 => binop!(i16, |a, b| a ^ b),
                Bytecode::BitXorI32 => binop!(i32, |a, b| a ^ b),
                Bytecode::BitXorI64 => binop!(i64, |a, b| a ^ b),
                Bytecode::BitXorU8 => binop!(u8, |a, b| a ^ b),
                Bytecode::BitXorU16 => binop!(u16, |a, b| a ^ b),
                Bytecode::BitXorU32 => binop!(u32, |a, b| a ^ b),
                Bytecode::BitXorU64 => binop!(u64, |a, b| a ^ b),
                Bytecode::ShlI8 => binop!(i8, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlI16 => binop!(i16, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlI32 => binop!(i32, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlI64 => binop!(i64, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlU8 => binop!(u8, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlU16 => binop!(u16, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShlU32 => binop!(u32, |a, b| a.wrapping_shl(b)),
                Bytecode::ShlU64 => binop!(u64, |a, b| a.wrapping_shl(b as u32)),
                Bytecode::ShrI8 => binop!(i8, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrI16 => binop!(i16, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrI32 => binop!(i32, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrI64 => binop!(i64, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrU8 => binop!(u8, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrU16 => binop!(u16, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::ShrU32 => binop!(u32, |a, b| a.wrapping_shr(b)),
                Bytecode::ShrU64 => binop!(u64, |a, b| a.wrapping_shr(b as u32)),
                Bytecode::NegI8 => unop!(i8, i8::wrapping_neg),
                Bytecode::NegI16 => unop!(i16, i16::wrapping_neg),
                Bytecode::NegI32 => unop!(i32, i32::wrapping_neg),
                Bytecode::NegI64 => unop!(i64, i64::wrapping_neg),
                Bytecode::NegU8 => unop!(u8, u8::wrapping_neg),
                Bytecode::NegU16 => unop!(u16, u16::wrapping_neg),
                Bytecode::NegU32 => unop!(u32, u32::wrapping_neg),
                Bytecode::NegU64 => unop!(u64, u64::wrapping_neg),
                Bytecode::BitNegI8 => unop!(i8, |a| !a),
                Bytecode::BitNegI16 => unop!(i16, |a| !a),
                Bytecode::BitNegI32 => unop!(i32, |a| !a),
                Bytecode::BitNegI64 => unop!(i64, |a| !a),
                Bytecode::BitNegU8 => unop!(u8, |a| !a),
                Bytecode::BitNegU16 => unop!(u16, |a| !a),
                Bytecode::BitNegU32 => unop!(u32, |a| !a),
                Bytecode::BitNegU64 => unop!(u64, |a| !a),

                // ------------------------------------------------------------
                // Integer comparisons
                // ------------------------------------------------------------
                Bytecode::EqualI8 => cmpop!(i8, |a, b| a == b),
                Bytecode::EqualI16 => cmpop!(i16, |a, b| a == b),
                Bytecode::EqualI32 => cmpop!(i32, |a, b| a == b),
                Bytecode::EqualI64 => cmpop!(i64, |a, b| a == b),
                Bytecode::EqualU8 => cmpop!(u8, |a, b| a == b),
                Bytecode::EqualU16 => cmpop!(u16, |a, b| a == b),
                Bytecode::EqualU32 => cmpop!(u32, |a, b| a == b),
                Bytecode::EqualU64 => cmpop!(u64, |a, b| a == b),
                Bytecode::NotEqualI8 => cmpop!(i8, |a, b| a != b),
                Bytecode::NotEqualI16 => cmpop!(i16, |a, b| a != b),
                Bytecode::NotEqualI32 => cmpop!(i32, |a, b| a != b),
                Bytecode::NotEqualI64 => cmpop!(i64, |a, b| a != b),
                Bytecode::NotEqualU8 => cmpop!(u8, |a, b| a != b),
                Bytecode::NotEqualU16 => cmpop!(u16, |a, b| a != b),
                Bytecode::NotEqualU32 => cmpop!(u32, |a, b| a != b),
                Bytecode::NotEqualU64 => cmpop!(u64, |a, b| a != b),
                Bytecode::LessThanI8 => cmpop!(i8, |a, b| a < b),
                Bytecode::LessThanI16 => cmpop!(i16, |a, b| a < b),
                Bytecode::LessThanI32 => cmpop!(i32, |a, b| a < b),
                Bytecode::LessThanI64 => cmpop!(i64, |a, b| a < b),
                Bytecode::LessThanU8 => cmpop!(u8, |a, b| a < b),
                Bytecode::LessThanU16 => cmpop!(u16, |a, b| a < b),
                Bytecode::LessThanU32 => cmpop!(u32, |a, b| a < b),
                Bytecode::LessThanU64 => cmpop!(u64, |a, b| a < b),
                Bytecode::LessThanEqualI8 => cmpop!(i8, |a, b| a <= b),
                Bytecode::LessThanEqualI16 => cmpop!(i16, |a, b| a <= b),
                Bytecode::LessThanEqualI32 => cmpop!(i32, |a, b| a <= b),
                Bytecode::LessThanEqualI64 => cmpop!(i64, |a, b| a <= b),
                Bytecode::LessThanEqualU8 => cmpop!(u8, |a, b| a <= b),
                Bytecode::LessThanEqualU16 => cmpop!(u16, |a, b| a <= b),
                Bytecode::LessThanEqualU32 => cmpop!(u32, |a, b| a <= b),
                Bytecode::LessThanEqualU64 => cmpop!(u64, |a, b| a <= b),
                Bytecode::GreaterThanI8 => cmpop!(i8, |a, b| a > b),
                Bytecode::GreaterThanI16 => cmpop!(i16, |a, b| a > b),
                Bytecode::GreaterThanI32 => cmpop!(i32, |a, b| a > b),
                Bytecode::GreaterThanI64 => cmpop!(i64, |a, b| a > b),
                Bytecode::GreaterThanU8 => cmpop!(u8, |a, b| a > b),
                Bytecode::GreaterThanU16 => cmpop!(u16, |a, b| a > b),
                Bytecode::GreaterThanU32 => cmpop!(u32, |a, b| a > b),
                Bytecode::GreaterThanU64 => cmpop!(u64, |a, b| a > b),
                Bytecode::GreaterThanEqualI8 => cmpop!(i8, |a, b| a >= b),
                Bytecode::GreaterThanEqualI16 => cmpop!(i16, |a, b| a >= b),
                Bytecode::GreaterThanEqualI32 => cmpop!(i32, |a, b| a >= b),
                Bytecode::GreaterThanEqualI64 => cmpop!(i64, |a, b| a >= b),
                Bytecode::GreaterThanEqualU8 => cmpop!(u8, |a, b| a >= b),
                Bytecode::GreaterThanEqualU16 => cmpop!(u16, |a, b| a >= b),
                Bytecode::GreaterThanEqualU32 => cmpop!(u32, |a, b| a >= b),
                Bytecode::GreaterThanEqualU64 => cmpop!(u64, |a, b| a >= b),

                // ------------------------------------------------------------
                // Float arithmetic and comparisons
                // ------------------------------------------------------------
                Bytecode::AddF32 => binop!(f32, |a, b| a + b),
                Bytecode::AddF64 => binop!(f64, |a, b| a + b),
                Bytecode::SubF32 => binop!(f32, |a, b| a - b),
                Bytecode::SubF64 => binop!(f64, |a, b| a - b),
                Bytecode::MulF32 => binop!(f32, |a, b| a * b),
                Bytecode::MulF64 => binop!(f64, |a, b| a * b),
                Bytecode::DivF32 => binop!(f32, |a, b| a / b),
                Bytecode::DivF64 => binop!(f64, |a, b| a / b),
                Bytecode::RemF32 => binop!(f32, |a, b| a % b),
                Bytecode::RemF64 => binop!(f64, |a, b| a % b),
                Bytecode::NegF32 => unop!(f32, |a| -a),
                Bytecode::NegF64 => unop!(f64, |a| -a),
                Bytecode::EqualF32 => cmpop!(f32, |a, b| a == b),
                Bytecode::EqualF64 => cmpop!(f64, |a, b| a == b),
                Bytecode::NotEqualF32 => cmpop!(f32, |a, b| a != b),
                Bytecode::NotEqualF64 => cmpop!(f64, |a, b| a != b),
                Bytecode::LessThanF32 => cmpop!(f32, |a, b| a < b),
                Bytecode::LessThanF64 => cmpop!(f64, |a, b| a < b),
                Bytecode::LessThanEqualF32 => cmpop!(f32, |a, b| a <= b),
                Bytecode::LessThanEqualF64 => cmpop!(f64, |a, b| a <= b),
                Bytecode::GreaterThanF32 => cmpop!(f32, |a, b| a > b),
                Bytecode::GreaterThanF64 => cmpop!(f64, |a, b| a > b),
                Bytecode::GreaterThanEqualF32 => cmpop!(f32, |a, b| a >= b),
                Bytecode::GreaterThanEqualF64 => cmpop!(f64, |a, b| a >= b),

                // ------------------------------------------------------------
                // Primitive conversions
                // ------------------------------------------------------------
                Bytecode::SignExtendI8 => convert!(i8, i64),
                Bytecode::SignExtendI16 => convert!(i16, i64),
                Bytecode::SignExtendI32 => convert!(i32, i64),
                Bytecode::ZeroExtendU8 => convert!(u8, u64),
                Bytecode::ZeroExtendU16 => convert!(u16, u64),
                Bytecode::ZeroExtendU32 => convert!(u32, u64),
                Bytecode::I64ToF32 => convert!(i64, f32),
                Bytecode::I64ToF64 => convert!(i64, f64),
                Bytecode::F32ToI64 => convert!(f32, i64),
                Bytecode::F64ToI64 => convert!(f64, i64),
                Bytecode::F32ToF64 => convert!(f32, f64),
                Bytecode::F64ToF32 => convert!(f64, f32),

                Bytecode::Not => {
                    let dest = rlocal!();
                    let input: u8 = frame.value(rlocal!());
                    frame.store::<u8>(dest, (input == 0) as u8);
                }

                // ------------------------------------------------------------
                // Branching: deltas are relative to the end of the operand
                // ------------------------------------------------------------
                Bytecode::Jump => {
                    let delta = rimm4!();
                    ip = (ip as i64 + delta as i64) as usize;
                }
                Bytecode::JumpIfTrue => {
                    let cond: u8 = frame.value(rlocal!());
                    let delta = rimm4!();
                    if cond != 0 {
                        ip = (ip as i64 + delta as i64) as usize;
                    }
                }
                Bytecode::JumpIfFalse => {
                    let cond: u8 = frame.value(rlocal!());
                    let delta = rimm4!();
                    if cond == 0 {
                        ip = (ip as i64 + delta as i64) as usize;
                    }
                }

                // ------------------------------------------------------------
                // Memory
                // ------------------------------------------------------------
                Bytecode::Deref1 => {
                    let dest = rlocal!();
                    let src = frame.ptr(rlocal!());
                    frame.store::<u8>(dest, unsafe { (src as *const u8).read_unaligned() });
                }
                Bytecode::Deref2 => {
                    let dest = rlocal!();
                    let src = frame.ptr(rlocal!());
                    frame.store::<u16>(dest, unsafe { (src as *const u16).read_unaligned() });
                }
                Bytecode::Deref4 => {
                    let dest = rlocal!();
                    let src = frame.ptr(rlocal!());
                    frame.store::<u32>(dest, unsafe { (src as *const u32).read_unaligned() });
                }
                Bytecode::Deref8 => {
                    let dest = rlocal!();
                    let src = frame.ptr(rlocal!());
                    frame.store::<u64>(dest, unsafe { (src as *const u64).read_unaligned() });
                }
                Bytecode::DerefN => {
                    let dest = frame.ptr(rlocal!());
                    let src = frame.ptr(rlocal!());
                    let len = ruimm4!() as usize;
                    unsafe { std::ptr::copy_nonoverlapping(src, dest, len) };
                }
                Bytecode::Assign1 => {
                    let dest = rlocal!();
                    let src: u8 = frame.value(rlocal!());
                    frame.store::<u8>(dest, src);
                }
                Bytecode::Assign2 => {
                    let dest = rlocal!();
                    let src: u16 = frame.value(rlocal!());
                    frame.store::<u16>(dest, src);
                }
                Bytecode::Assign4 => {
                    let dest = rlocal!();
                    let src: u32 = frame.value(rlocal!());
                    frame.store::<u32>(dest, src);
                }
                Bytecode::Assign8 => {
                    let dest = rlocal!();
                    let src: u64 = frame.value(rlocal!());
                    frame.store::<u64>(dest, src);
                }
                Bytecode::AssignImm1 => {
                    let dest = rlocal!();
                    let v = rimm1!();
                    frame.store::<i8>(dest, v);
                }
                Bytecode::AssignImm2 => {
                    let dest = rlocal!();
                    let v = rimm2!();
                    frame.store::<i16>(dest, v);
                }
                Bytecode::AssignImm4 => {
                    let dest = rlocal!();
                    let v = rimm4!();
                    frame.store::<i32>(dest, v);
                }
                Bytecode::AssignImm8 => {
                    let dest = rlocal!();
                    let v = rimm8!();
                    frame.store::<i64>(dest, v);
                }
                Bytecode::AssignString => {
                    // Source-level strings are a raw (pointer, length) pair
                    let dest = frame.ptr(rlocal!()) as *mut (usize, usize);
                    let idx = ruimm4!();
                    let s = self.module.string(idx);
                    unsafe { dest.write((s.as_ptr() as usize, s.len())) };
                }
                Bytecode::Lea => {
                    let dest = rlocal!();
                    let base = frame.ptr(rlocal!());
                    let offset = ruimm4!();
                    frame.store::<u64>(dest, base as u64 + offset as u64);
                }
                Bytecode::LeaScaled => {
                    let dest = rlocal!();
                    let base = frame.ptr(rlocal!());
                    let index: u32 = frame.value(rlocal!());
                    let scale = ruimm4!();
                    let offset = ruimm4!();
                    frame.store::<u64>(
                        dest,
                        base as u64 + index as u64 * scale as u64 + offset as u64,
                    );
                }
                Bytecode::IsNullPtr => {
                    let dest = rlocal!();
                    let input = frame.ptr(rlocal!());
                    frame.store::<u8>(dest, input.is_null() as u8);
                }
                Bytecode::IsNotNullPtr => {
                    let dest = rlocal!();
                    let input = frame.ptr(rlocal!());
                    frame.store::<u8>(dest, (!input.is_null()) as u8);
                }

                // ------------------------------------------------------------
                // Calls
                // ------------------------------------------------------------
                Bytecode::Call => {
                    let func_id = ruimm2!();
                    let count = ruimm2!() as usize;
                    let callee = self
                        .module
                        .function_info_by_id(func_id)
                        .ok_or(VmError::UnknownFunction(func_id))?;
                    let mut callee_frame = Frame::new(callee.frame_size());
                    for param in callee.locals()[..count].iter() {
                        let local = rlocal!();
                        match local.mode() {
                            crate::bytecode::operands::AddressMode::Address => {
                                let ptr = frame.ptr(local) as u64;
                                let start = param.offset as usize;
                                callee_frame.raw_mut()[start..start + 8]
                                    .copy_from_slice(&ptr.to_le_bytes());
                            }
                            crate::bytecode::operands::AddressMode::Value => {
                                let size = param.size as usize;
                                let src = frame.ptr(local.as_address());
                                let start = param.offset as usize;
                                unsafe {
                                    std::ptr::copy_nonoverlapping(
                                        src,
                                        callee_frame.raw_mut()[start..].as_mut_ptr(),
                                        size,
                                    );
                                }
                            }
                        }
                    }
                    self.interpret(self.module.bytecode_for(callee), &mut callee_frame)?;
                }
                Bytecode::Return => {
                    return Ok(());
                }

                // ------------------------------------------------------------
                // SQL value construction and coercion
                // ------------------------------------------------------------
                Bytecode::ForceBoolTruth => {
                    let dest = rlocal!();
                    let input = frame.ptr(rlocal!()) as *const BoolVal;
                    frame.store::<u8>(dest, unsafe { (*input).force_truth() } as u8);
                }
                Bytecode::InitBool => {
                    let dest = frame.ptr(rlocal!()) as *mut BoolVal;
                    let v: u8 = frame.value(rlocal!());
                    unsafe { dest.write(BoolVal::new(v != 0)) };
                }
                Bytecode::InitInteger => {
                    let dest = frame.ptr(rlocal!()) as *mut Integer;
                    let v: i64 = frame.value(rlocal!());
                    unsafe { dest.write(Integer::new(v)) };
                }
                Bytecode::InitReal => {
                    let dest = frame.ptr(rlocal!()) as *mut Real;
                    let v: f64 = frame.value(rlocal!());
                    unsafe { dest.write(Real::new(v)) };
                }
                Bytecode::InitDate => {
                    let dest = frame.ptr(rlocal!()) as *mut DateVal;
                    let year: i32 = frame.value(rlocal!());
                    let month: i32 = frame.value(rlocal!());
                    let day: i32 = frame.value(rlocal!());
                    unsafe { dest.write(DateVal::new(year, month, day)) };
                }
                Bytecode::InitString => {
                    let dest = frame.ptr(rlocal!()) as *mut StringVal;
                    let idx = ruimm4!();
                    unsafe { dest.write(StringVal::from_str(self.module.string(idx))) };
                }
                Bytecode::IntegerToReal => {
                    let dest = frame.ptr(rlocal!()) as *mut Real;
                    let input = frame.ptr(rlocal!()) as *const Integer;
                    unsafe { dest.write(sql::value::integer_to_real(&*input)) };
                }

                // ------------------------------------------------------------
                // SQL value arithmetic
                // ------------------------------------------------------------
                Bytecode::AddInteger => sql_binop!(Integer, sql::value::integer_add),
                Bytecode::SubInteger => sql_binop!(Integer, sql::value::integer_sub),
                Bytecode::MulInteger => sql_binop!(Integer, sql::value::integer_mul),
                Bytecode::DivInteger => sql_binop!(Integer, sql::value::integer_div),
                Bytecode::RemInteger => sql_binop!(Integer, sql::value::integer_rem),
                Bytecode::AddReal => sql_binop!(Real, sql::value::real_add),
                Bytecode::SubReal => sql_binop!(Real, sql::value::real_sub),
                Bytecode::MulReal => sql_binop!(Real, sql::value::real_mul),
                Bytecode::DivReal => sql_binop!(Real, sql::value::real_div),
                Bytecode::RemReal => sql_binop!(Real, sql::value::real_rem),

                // ------------------------------------------------------------
                // SQL value comparisons
                // ------------------------------------------------------------
                Bytecode::EqualInteger => sql_cmp!(Integer, sql::value::integer_eq),
                Bytecode::NotEqualInteger => sql_cmp!(Integer, sql::value::integer_ne),
                Bytecode::LessThanInteger => sql_cmp!(Integer, sql::value::integer_lt),
                Bytecode::LessThanEqualInteger => sql_cmp!(Integer, sql::value::integer_le),
                Bytecode::GreaterThanInteger => sql_cmp!(Integer, sql::value::integer_gt),
                Bytecode::GreaterThanEqualInteger => sql_cmp!(Integer, sql::value::integer_ge),
                Bytecode::EqualReal => sql_cmp!(Real, sql::value::real_eq),
                Bytecode::NotEqualReal => sql_cmp!(Real, sql::value::real_ne),
                Bytecode::LessThanReal => sql_cmp!(Real, sql::value::real_lt),
                Bytecode::LessThanEqualReal => sql_cmp!(Real, sql::value::real_le),
                Bytecode::GreaterThanReal => sql_cmp!(Real, sql::value::real_gt),
                Bytecode::GreaterThanEqualReal => sql_cmp!(Real, sql::value::real_ge),
                Bytecode::EqualDate => sql_cmp!(DateVal, sql::value::date_eq),
                Bytecode::NotEqualDate => sql_cmp!(DateVal, sql::value::date_ne),
                Bytecode::LessThanDate => sql_cmp!(DateVal, sql::value::date_lt),
                Bytecode::LessThanEqualDate => sql_cmp!(DateVal, sql::value::date_le),
                Bytecode::GreaterThanDate => sql_cmp!(DateVal, sql::value::date_gt),
                Bytecode::GreaterThanEqualDate => sql_cmp!(DateVal, sql::value::date_ge),
                Bytecode::EqualString => sql_cmp!(StringVal, sql::value::string_eq),
                Bytecode::NotEqualString => sql_cmp!(StringVal, sql::value::string_ne),
                Bytecode::LessThanString => sql_cmp!(StringVal, sql::value::string_lt),
                Bytecode::LessThanEqualString => sql_cmp!(StringVal, sql::value::string_le),
                Bytecode::GreaterThanString => sql_cmp!(StringVal, sql::value::string_gt),
                Bytecode::GreaterThanEqualString => sql_cmp!(StringVal, sql::value::string_ge),

                // ------------------------------------------------------------
                // SQL scalar functions
                // ------------------------------------------------------------
                Bytecode::AbsInteger => {
                    let dest = frame.ptr(rlocal!()) as *mut Integer;
                    let input = frame.ptr(rlocal!()) as *const Integer;
                    unsafe { dest.write(sql::value::integer_abs(&*input)) };
                }
                Bytecode::AbsReal => {
                    let dest = frame.ptr(rlocal!()) as *mut Real;
                    let input = frame.ptr(rlocal!()) as *const Real;
                    unsafe { dest.write(sql::value::real_abs(&*input)) };
                }
                Bytecode::ACosReal => real_unary!(f64::acos),
                Bytecode::ASinReal => real_unary!(f64::asin),
                Bytecode::ATanReal => real_unary!(f64::atan),
                Bytecode::CosReal => real_unary!(f64::cos),
                Bytecode::CotReal => real_unary!(|v| 1.0 / v.tan()),
                Bytecode::SinReal => real_unary!(f64::sin),
                Bytecode::TanReal => real_unary!(f64::tan),
                Bytecode::ExpReal => real_unary!(f64::exp),
                Bytecode::SqrtReal => real_unary!(f64::sqrt),
                Bytecode::CeilReal => real_unary!(f64::ceil),
                Bytecode::FloorReal => real_unary!(f64::floor),
                Bytecode::RoundReal => real_unary!(f64::round),
                Bytecode::LnReal => real_unary!(f64::ln),
                Bytecode::Log2Real => real_unary!(f64::log2),
                Bytecode::Log10Real => real_unary!(f64::log10),
                Bytecode::ATan2Real => {
                    let dest = frame.ptr(rlocal!()) as *mut Real;
                    let left = frame.ptr(rlocal!()) as *const Real;
                    let right = frame.ptr(rlocal!()) as *const Real;
                    unsafe { dest.write(sql::value::real_atan2(&*left, &*right)) };
                }
                Bytecode::Like => {
                    let dest = frame.ptr(rlocal!()) as *mut BoolVal;
                    let input = frame.ptr(rlocal!()) as *const StringVal;
                    let pattern = frame.ptr(rlocal!()) as *const StringVal;
                    unsafe { dest.write(sql::value::like(&*input, &*pattern)) };
                }
                Bytecode::Concat => {
                    let dest = frame.ptr(rlocal!()) as *mut StringVal;
                    let left = frame.ptr(rlocal!()) as *const StringVal;
                    let right = frame.ptr(rlocal!()) as *const StringVal;
                    let result = unsafe { sql::value::concat(&*left, &*right) };
                    unsafe { dest.write(result) };
                }
                Bytecode::ExtractYear => {
                    let dest = frame.ptr(rlocal!()) as *mut Integer;
                    let input = frame.ptr(rlocal!()) as *const DateVal;
                    unsafe { dest.write(sql::value::extract_year(&*input)) };
                }

                // ------------------------------------------------------------
                // Hashing
                // ------------------------------------------------------------
                Bytecode::HashInteger => hash_op!(Integer, sql::hash::hash_integer),
                Bytecode::HashReal => hash_op!(Real, sql::hash::hash_real),
                Bytecode::HashDate => hash_op!(DateVal, sql::hash::hash_date),
                Bytecode::HashString => hash_op!(StringVal, sql::hash::hash_string),
                Bytecode::HashCombine => {
                    let dest = frame.ptr(rlocal!()) as *mut u64;
                    let new_hash: u64 = frame.value(rlocal!());
                    unsafe { dest.write(sql::hash::hash_combine(dest.read(), new_hash)) };
                }

                // ------------------------------------------------------------
                // Execution context
                // ------------------------------------------------------------
                Bytecode::ExecutionContextGetMemoryPool => {
                    let dest = rlocal!();
                    let ctx = obj!(ExecutionContext);
                    frame.store::<u64>(dest, ctx.memory_pool() as *const MemoryPool as u64);
                }
                Bytecode::ResultBufferAllocRow => {
                    let dest = rlocal!();
                    let ctx = obj!(ExecutionContext);
                    let row = ctx.results_mut().alloc_out_row();
                    frame.store::<u64>(dest, row as u64);
                }
                Bytecode::ResultBufferFinalize => {
                    let ctx = obj!(ExecutionContext);
                    ctx.results_mut().finalize();
                }

                // ------------------------------------------------------------
                // Thread state container
                // ------------------------------------------------------------
                Bytecode::ThreadStateContainerInit => {
                    let tsc = frame.ptr(rlocal!()) as *mut ThreadStateContainer;
                    let _pool = frame.ptr(rlocal!());
                    unsafe { tsc.write(ThreadStateContainer::new()) };
                }
                Bytecode::ThreadStateContainerReset => {
                    let tsc = obj!(ThreadStateContainer);
                    let size: u32 = frame.value(rlocal!());
                    let init_fn = ruimm2!();
                    let destroy_fn = ruimm2!();
                    let ctx = frame.ptr(rlocal!());
                    tsc.reset(size, Some(init_fn), Some(destroy_fn), ctx, &self.runner());
                }
                Bytecode::ThreadStateContainerIterate => {
                    let tsc = obj!(ThreadStateContainer);
                    let ctx = frame.ptr(rlocal!());
                    let iterate_fn = ruimm2!();
                    tsc.iterate(ctx, iterate_fn, &self.runner());
                }
                Bytecode::ThreadStateContainerFree => {
                    let tsc = obj!(ThreadStateContainer);
                    tsc.clear(&self.runner());
                    unsafe { std::ptr::drop_in_place(tsc) };
                }

                // ------------------------------------------------------------
                // Table vector iterator
                // ------------------------------------------------------------
                Bytecode::TableVectorIteratorInit => {
                    let iter = frame.ptr(rlocal!()) as *mut TableVectorIterator;
                    let table_id = ruimm2!();
                    let table = sql::table::table_by_id(table_id)
                        .ok_or(VmError::UnknownTable(table_id))?;
                    unsafe { iter.write(TableVectorIterator::new(table)) };
                }
                Bytecode::TableVectorIteratorNext => {
                    let dest = rlocal!();
                    let iter = obj!(TableVectorIterator);
                    frame.store::<u8>(dest, iter.next() as u8);
                }
                Bytecode::TableVectorIteratorGetVPI => {
                    let dest = rlocal!();
                    let iter = obj!(TableVectorIterator);
                    let vpi = iter.vpi_mut() as *mut VectorProjectionIterator;
                    frame.store::<u64>(dest, vpi as u64);
                }
                Bytecode::TableVectorIteratorClose => {
                    let iter = obj!(TableVectorIterator);
                    iter.close();
                    unsafe { std::ptr::drop_in_place(iter) };
                }
                Bytecode::ParallelScanTable => {
                    let table_id = ruimm2!();
                    let query_state = frame.ptr(rlocal!());
                    let tsc = obj!(ThreadStateContainer);
                    let scan_fn = ruimm2!();
                    sql::table::parallel_scan(table_id, query_state, tsc, scan_fn, &self.runner());
                }

                // ------------------------------------------------------------
                // Vector projection iterator
                // ------------------------------------------------------------
                Bytecode::VpiIsFiltered => {
                    let dest = rlocal!();
                    let vpi = obj!(VectorProjectionIterator);
                    frame.store::<u8>(dest, vpi.is_filtered() as u8);
                }
                Bytecode::VpiGetSelectedRowCount => {
                    let dest = rlocal!();
                    let vpi = obj!(VectorProjectionIterator);
                    frame.store::<u32>(dest, vpi.selected_row_count());
                }
                Bytecode::VpiHasNext => {
                    let dest = rlocal!();
                    let vpi = obj!(VectorProjectionIterator);
                    frame.store::<u8>(dest, vpi.has_next() as u8);
                }
                Bytecode::VpiHasNextFiltered => {
                    let dest = rlocal!();
                    let vpi = obj!(VectorProjectionIterator);
                    frame.store::<u8>(dest, vpi.has_next_filtered() as u8);
                }
                Bytecode::VpiAdvance => obj!(VectorProjectionIterator).advance(),
                Bytecode::VpiAdvanceFiltered => obj!(VectorProjectionIterator).advance_filtered(),
                Bytecode::VpiSetPosition => {
                    let vpi = obj!(VectorProjectionIterator);
                    let index: u32 = frame.value(rlocal!());
                    vpi.set_position(index);
                }
                Bytecode::VpiSetPositionFiltered => {
                    let vpi = obj!(VectorProjectionIterator);
                    let index: u32 = frame.value(rlocal!());
                    vpi.set_position_filtered(index);
                }
                Bytecode::VpiMatch => {
                    let vpi = obj!(VectorProjectionIterator);
                    let matched: u8 = frame.value(rlocal!());
                    vpi.tuple_match(matched != 0);
                }
                Bytecode::VpiReset => obj!(VectorProjectionIterator).reset(),
                Bytecode::VpiResetFiltered => obj!(VectorProjectionIterator).reset_filtered(),
                Bytecode::VpiGetSmallInt | Bytecode::VpiGetInt | Bytecode::VpiGetBigInt => {
                    let dest = frame.ptr(rlocal!()) as *mut Integer;
                    let vpi = obj!(VectorProjectionIterator);
                    let col = ruimm4!();
                    unsafe { dest.write(vpi.get_int(col)) };
                }
                Bytecode::VpiGetReal | Bytecode::VpiGetDouble => {
                    let dest = frame.ptr(rlocal!()) as *mut Real;
                    let vpi = obj!(VectorProjectionIterator);
                    let col = ruimm4!();
                    unsafe { dest.write(vpi.get_real(col)) };
                }
                Bytecode::VpiGetDate => {
                    let dest = frame.ptr(rlocal!()) as *mut DateVal;
                    let vpi = obj!(VectorProjectionIterator);
                    let col = ruimm4!();
                    unsafe { dest.write(vpi.get_date(col)) };
                }
                Bytecode::VpiGetString => {
                    let dest = frame.ptr(rlocal!()) as *mut StringVal;
                    let vpi = obj!(VectorProjectionIterator);
                    let col = ruimm4!();
                    unsafe { dest.write(vpi.get_string(col)) };
                }
                Bytecode::VpiSetSmallInt | Bytecode::VpiSetInt | Bytecode::VpiSetBigInt => {
                    let vpi = obj!(VectorProjectionIterator);
                    let value = unsafe { *(frame.ptr(rlocal!()) as *const Integer) };
                    let col = ruimm4!();
                    vpi.set_int(col, value);
                }
                Bytecode::VpiSetReal | Bytecode::VpiSetDouble => {
                    let vpi = obj!(VectorProjectionIterator);
                    let value = unsafe { *(frame.ptr(rlocal!()) as *const Real) };
                    let col = ruimm4!();
                    vpi.set_real(col, value);
                }
                Bytecode::VpiSetDate => {
                    let vpi = obj!(VectorProjectionIterator);
                    let value = unsafe { *(frame.ptr(rlocal!()) as *const DateVal) };
                    let col = ruimm4!();
                    vpi.set_date(col, value);
                }
                Bytecode::VpiSetString => {
                    let vpi = obj!(VectorProjectionIterator);
                    let value = unsafe { *(frame.ptr(rlocal!()) as *const StringVal) };
                    let col = ruimm4!();
                    vpi.set_string(col, value);
                }

                // ------------------------------------------------------------
                // Filter manager
                // ------------------------------------------------------------
                Bytecode::FilterManagerInit => {
                    let fm = frame.ptr(rlocal!()) as *mut FilterManager;
                    unsafe { fm.write(FilterManager::new()) };
                }
                Bytecode::FilterManagerInsertFilter => {
                    let fm = obj!(FilterManager);
                    let filter_fn = ruimm2!();
                    fm.insert_filter(filter_fn);
                }
                Bytecode::FilterManagerFinalize => obj!(FilterManager).finalize(),
                Bytecode::FilterManagerRunFilters => {
                    let fm = obj!(FilterManager);
                    let vpi = frame.ptr(rlocal!()) as *mut VectorProjectionIterator;
                    fm.run_filters(vpi, &self.runner());
                }
                Bytecode::FilterManagerFree => {
                    let fm = obj!(FilterManager);
                    unsafe { std::ptr::drop_in_place(fm) };
                }

                // ------------------------------------------------------------
                // Vector filter executor
                // ------------------------------------------------------------
                Bytecode::VectorFilterExecuteInit => {
                    let vfe = frame.ptr(rlocal!()) as *mut VectorFilterExecutor;
                    let vpi = frame.ptr(rlocal!()) as *mut VectorProjectionIterator;
                    unsafe { vfe.write(VectorFilterExecutor::new(vpi)) };
                }
                Bytecode::VectorFilterExecuteEqual => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_eq(col, value);
                }
                Bytecode::VectorFilterExecuteGreaterThan => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_gt(col, value);
                }
                Bytecode::VectorFilterExecuteGreaterThanEqual => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_ge(col, value);
                }
                Bytecode::VectorFilterExecuteLessThan => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_lt(col, value);
                }
                Bytecode::VectorFilterExecuteLessThanEqual => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_le(col, value);
                }
                Bytecode::VectorFilterExecuteNotEqual => {
                    let vfe = obj!(VectorFilterExecutor);
                    let col = ruimm4!();
                    let value = frame.ptr(rlocal!());
                    vfe.select_ne(col, value);
                }
                Bytecode::VectorFilterExecuteFinish => obj!(VectorFilterExecutor).finish(),
                Bytecode::VectorFilterExecuteFree => {
                    let vfe = obj!(VectorFilterExecutor);
                    unsafe { std::ptr::drop_in_place(vfe) };
                }

                // ------------------------------------------------------------
                // Aggregation hash table
                // ------------------------------------------------------------
                Bytecode::AggregationHashTableInit => {
                    let aht = frame.ptr(rlocal!()) as *mut AggregationHashTable;
                    let _pool = frame.ptr(rlocal!());
                    let payload_size: u32 = frame.value(rlocal!());
                    unsafe { aht.write(AggregationHashTable::new(payload_size)) };
                }
                Bytecode::AggregationHashTableInsert => {
                    let dest = rlocal!();
                    let aht = obj!(AggregationHashTable);
                    let hash: u64 = frame.value(rlocal!());
                    frame.store::<u64>(dest, aht.insert(hash) as u64);
                }
                Bytecode::AggregationHashTableLookup => {
                    let dest = rlocal!();
                    let aht = obj!(AggregationHashTable);
                    let hash: u64 = frame.value(rlocal!());
                    let key_eq_fn = ruimm2!();
                    let probe = frame.ptr(rlocal!());
                    let row = aht.lookup(hash, key_eq_fn, probe, &self.runner());
                    frame.store::<u64>(dest, row as u64);
                }
                Bytecode::AggregationHashTableProcessBatch => {
                    let aht = obj!(AggregationHashTable);
                    let vpi = obj!(VectorProjectionIterator);
                    let hash_fn = ruimm2!();
                    let key_eq_fn = ruimm2!();
                    let init_fn = ruimm2!();
                    let advance_fn = ruimm2!();
                    let partitioned: u8 = frame.value(rlocal!());
                    aht.process_batch(
                        vpi,
                        hash_fn,
                        key_eq_fn,
                        init_fn,
                        advance_fn,
                        partitioned != 0,
                        &self.runner(),
                    );
                }
                Bytecode::AggregationHashTableTransferPartitions => {
                    let aht = obj!(AggregationHashTable);
                    let tsc = obj!(ThreadStateContainer);
                    let offset: u32 = frame.value(rlocal!());
                    let merge_fn = ruimm2!();
                    aht.transfer_partitions(tsc, offset, merge_fn);
                }
                Bytecode::AggregationHashTableParallelPartitionedScan => {
                    let aht = obj!(AggregationHashTable);
                    let query_state = frame.ptr(rlocal!());
                    let tsc = obj!(ThreadStateContainer);
                    let scan_fn = ruimm2!();
                    aht.parallel_scan_partitions(query_state, tsc, scan_fn, &self.runner());
                }
                Bytecode::AggregationHashTableFree => {
                    let aht = obj!(AggregationHashTable);
                    unsafe { std::ptr::drop_in_place(aht) };
                }
                Bytecode::AggregationHashTableIteratorInit => {
                    let iter = frame.ptr(rlocal!()) as *mut AhtIterator;
                    let aht = obj!(AggregationHashTable);
                    unsafe { iter.write(AhtIterator::default()) };
                    unsafe { (*iter).init(aht) };
                }
                Bytecode::AggregationHashTableIteratorHasNext => {
                    let dest = rlocal!();
                    let iter = obj!(AhtIterator);
                    frame.store::<u8>(dest, iter.has_next() as u8);
                }
                Bytecode::AggregationHashTableIteratorNext => obj!(AhtIterator).next(),
                Bytecode::AggregationHashTableIteratorGetRow => {
                    let dest = rlocal!();
                    let iter = obj!(AhtIterator);
                    frame.store::<u64>(dest, iter.row() as u64);
                }
                Bytecode::AggregationHashTableIteratorFree => {
                    let iter = obj!(AhtIterator);
                    unsafe { std::ptr::drop_in_place(iter) };
                }
                Bytecode::AggregationOverflowPartitionIteratorHasNext => {
                    let dest = rlocal!();
                    let iter = obj!(AhtOverflowPartitionIterator);
                    frame.store::<u8>(dest, iter.has_next() as u8);
                }
                Bytecode::AggregationOverflowPartitionIteratorNext => {
                    obj!(AhtOverflowPartitionIterator).next()
                }
                Bytecode::AggregationOverflowPartitionIteratorGetHash => {
                    let dest = rlocal!();
                    let iter = obj!(AhtOverflowPartitionIterator);
                    frame.store::<u64>(dest, iter.hash());
                }
                Bytecode::AggregationOverflowPartitionIteratorGetRow => {
                    let dest = rlocal!();
                    let iter = obj!(AhtOverflowPartitionIterator);
                    frame.store::<u64>(dest, iter.row() as u64);
                }

                // ------------------------------------------------------------
                // Aggregators
                // ------------------------------------------------------------
                Bytecode::CountAggregateInit => agg_unary!(CountAggregate, init),
                Bytecode::CountAggregateAdvance => agg_advance!(CountAggregate, Integer),
                Bytecode::CountAggregateMerge => agg_merge!(CountAggregate),
                Bytecode::CountAggregateReset => agg_unary!(CountAggregate, reset),
                Bytecode::CountAggregateGetResult => agg_result!(CountAggregate, Integer),
                Bytecode::CountStarAggregateInit => agg_unary!(CountStarAggregate, init),
                Bytecode::CountStarAggregateAdvance => {
                    let agg = obj!(CountStarAggregate);
                    let _input = frame.ptr(rlocal!());
                    agg.advance();
                }
                Bytecode::CountStarAggregateMerge => agg_merge!(CountStarAggregate),
                Bytecode::CountStarAggregateReset => agg_unary!(CountStarAggregate, reset),
                Bytecode::CountStarAggregateGetResult => {
                    agg_result!(CountStarAggregate, Integer)
                }
                Bytecode::IntegerSumAggregateInit => agg_unary!(IntegerSumAggregate, init),
                Bytecode::IntegerSumAggregateAdvance => {
                    agg_advance!(IntegerSumAggregate, Integer)
                }
                Bytecode::IntegerSumAggregateMerge => agg_merge!(IntegerSumAggregate),
                Bytecode::IntegerSumAggregateReset => agg_unary!(IntegerSumAggregate, reset),
                Bytecode::IntegerSumAggregateGetResult => {
                    agg_result!(IntegerSumAggregate, Integer)
                }
                Bytecode::IntegerMinAggregateInit => agg_unary!(IntegerMinAggregate, init),
                Bytecode::IntegerMinAggregateAdvance => {
                    agg_advance!(IntegerMinAggregate, Integer)
                }
                Bytecode::IntegerMinAggregateMerge => agg_merge!(IntegerMinAggregate),
                Bytecode::IntegerMinAggregateReset => agg_unary!(IntegerMinAggregate, reset),
                Bytecode::IntegerMinAggregateGetResult => {
                    agg_result!(IntegerMinAggregate, Integer)
                }
                Bytecode::IntegerMaxAggregateInit => agg_unary!(IntegerMaxAggregate, init),
                Bytecode::IntegerMaxAggregateAdvance => {
                    agg_advance!(IntegerMaxAggregate, Integer)
                }
                Bytecode::IntegerMaxAggregateMerge => agg_merge!(IntegerMaxAggregate),
                Bytecode::IntegerMaxAggregateReset => agg_unary!(IntegerMaxAggregate, reset),
                Bytecode::IntegerMaxAggregateGetResult => {
                    agg_result!(IntegerMaxAggregate, Integer)
                }
                Bytecode::RealSumAggregateInit => agg_unary!(RealSumAggregate, init),
                Bytecode::RealSumAggregateAdvance => agg_advance!(RealSumAggregate, Real),
                Bytecode::RealSumAggregateMerge => agg_merge!(RealSumAggregate),
                Bytecode::RealSumAggregateReset => agg_unary!(RealSumAggregate, reset),
                Bytecode::RealSumAggregateGetResult => agg_result!(RealSumAggregate, Real),
                Bytecode::RealMinAggregateInit => agg_unary!(RealMinAggregate, init),
                Bytecode::RealMinAggregateAdvance => agg_advance!(RealMinAggregate, Real),
                Bytecode::RealMinAggregateMerge => agg_merge!(RealMinAggregate),
                Bytecode::RealMinAggregateReset => agg_unary!(RealMinAggregate, reset),
                Bytecode::RealMinAggregateGetResult => agg_result!(RealMinAggregate, Real),
                Bytecode::RealMaxAggregateInit => agg_unary!(RealMaxAggregate, init),
                Bytecode::RealMaxAggregateAdvance => agg_advance!(RealMaxAggregate, Real),
                Bytecode::RealMaxAggregateMerge => agg_merge!(RealMaxAggregate),
                Bytecode::RealMaxAggregateReset => agg_unary!(RealMaxAggregate, reset),
                Bytecode::RealMaxAggregateGetResult => agg_result!(RealMaxAggregate, Real),
                Bytecode::AvgAggregateInit => agg_unary!(AvgAggregate, init),
                Bytecode::AvgAggregateAdvance => {
                    let agg = obj!(AvgAggregate);
                    let input = unsafe { &*(frame.ptr(rlocal!()) as *const Integer) };
                    agg.advance_integer(input);
                }
                Bytecode::AvgAggregateMerge => agg_merge!(AvgAggregate),
                Bytecode::AvgAggregateReset => agg_unary!(AvgAggregate, reset),
                Bytecode::AvgAggregateGetResult => agg_result!(AvgAggregate, Real),

                // ------------------------------------------------------------
                // Join hash table
                // ------------------------------------------------------------
                Bytecode::JoinHashTableInit => {
                    let jht = frame.ptr(rlocal!()) as *mut JoinHashTable;
                    let _pool = frame.ptr(rlocal!());
                    let tuple_size: u32 = frame.value(rlocal!());
                    unsafe { jht.write(JoinHashTable::new(tuple_size)) };
                }
                Bytecode::JoinHashTableAllocTuple => {
                    let dest = rlocal!();
                    let jht = obj!(JoinHashTable);
                    let hash: u64 = frame.value(rlocal!());
                    frame.store::<u64>(dest, jht.alloc_tuple(hash) as u64);
                }
                Bytecode::JoinHashTableBuild => obj!(JoinHashTable).build(),
                Bytecode::JoinHashTableBuildParallel => {
                    let jht = obj!(JoinHashTable);
                    let tsc = obj!(ThreadStateContainer);
                    let offset: u32 = frame.value(rlocal!());
                    jht.build_parallel(tsc, offset, &self.runner());
                }
                Bytecode::JoinHashTableLookup => {
                    let dest = rlocal!();
                    let jht = obj!(JoinHashTable);
                    let hash: u64 = frame.value(rlocal!());
                    frame.store::<u64>(dest, jht.lookup(hash) as u64);
                }
                Bytecode::JoinHashTableFree => {
                    let jht = obj!(JoinHashTable);
                    unsafe { std::ptr::drop_in_place(jht) };
                }
                Bytecode::HashTableEntryIterHasNext => {
                    let dest = rlocal!();
                    let entry = frame.ptr(rlocal!());
                    frame.store::<u8>(dest, (!entry.is_null()) as u8);
                }
                Bytecode::HashTableEntryIterGetRow => {
                    let dest = rlocal!();
                    let entry = frame.ptr(rlocal!()) as *mut sql::HashTableEntry;
                    frame.store::<u64>(dest, sql::HashTableEntry::payload(entry) as u64);
                }
                Bytecode::HashTableEntryGetNext => {
                    let dest = rlocal!();
                    let entry = frame.ptr(rlocal!()) as *mut sql::HashTableEntry;
                    let next = sql::HashTableEntry::next_with_same_hash(entry);
                    frame.store::<u64>(dest, next as u64);
                }

                // ------------------------------------------------------------
                // Sorting
                // ------------------------------------------------------------
                Bytecode::SorterInit => {
                    let sorter = frame.ptr(rlocal!()) as *mut Sorter;
                    let _pool = frame.ptr(rlocal!());
                    let cmp_fn = ruimm2!();
                    let tuple_size: u32 = frame.value(rlocal!());
                    unsafe { sorter.write(Sorter::new(cmp_fn, tuple_size)) };
                }
                Bytecode::SorterInsert => {
                    let dest = rlocal!();
                    let sorter = obj!(Sorter);
                    frame.store::<u64>(dest, sorter.insert() as u64);
                }
                Bytecode::SorterInsertTopK => {
                    let dest = rlocal!();
                    let sorter = obj!(Sorter);
                    let k: u64 = frame.value(rlocal!());
                    frame.store::<u64>(dest, sorter.insert_top_k(k) as u64);
                }
                Bytecode::SorterInsertTopKFinish => {
                    let sorter = obj!(Sorter);
                    let k: u64 = frame.value(rlocal!());
                    sorter.insert_top_k_finish(k, &self.runner());
                }
                Bytecode::SorterSort => {
                    let sorter = obj!(Sorter);
                    sorter.sort(&self.runner());
                }
                Bytecode::SorterSortParallel => {
                    let sorter = obj!(Sorter);
                    let tsc = obj!(ThreadStateContainer);
                    let offset: u32 = frame.value(rlocal!());
                    sorter.sort_parallel(tsc, offset, &self.runner());
                }
                Bytecode::SorterSortTopKParallel => {
                    let sorter = obj!(Sorter);
                    let tsc = obj!(ThreadStateContainer);
                    let offset: u32 = frame.value(rlocal!());
                    let k: u64 = frame.value(rlocal!());
                    sorter.sort_top_k_parallel(tsc, offset, k, &self.runner());
                }
                Bytecode::SorterFree => {
                    let sorter = obj!(Sorter);
                    unsafe { std::ptr::drop_in_place(sorter) };
                }
                Bytecode::SorterIteratorInit => {
                    let iter = frame.ptr(rlocal!()) as *mut SorterIterator;
                    let sorter = frame.ptr(rlocal!()) as *const Sorter;
                    unsafe { iter.write(SorterIterator::default()) };
                    unsafe { (*iter).init(sorter) };
                }
                Bytecode::SorterIteratorHasNext => {
                    let dest = rlocal!();
                    let iter = obj!(SorterIterator);
                    frame.store::<u8>(dest, iter.has_next() as u8);
                }
                Bytecode::SorterIteratorNext => obj!(SorterIterator).next(),
                Bytecode::SorterIteratorGetRow => {
                    let dest = rlocal!();
                    let iter = obj!(SorterIterator);
                    frame.store::<u64>(dest, iter.row() as u64);
                }
                Bytecode::SorterIteratorFree => {
                    let iter = obj!(SorterIterator);
                    unsafe { std::ptr::drop_in_place(iter) };
                }

                // ------------------------------------------------------------
                // CSV reader
                // ------------------------------------------------------------
                Bytecode::CsvReaderInit => {
                    let dest = rlocal!();
                    let reader = frame.ptr(rlocal!()) as *mut CsvReader;
                    let idx = ruimm4!();
                    let path = self.module.string(idx);
                    let (value, ok) = match CsvReader::open(path) {
                        Some(r) => (r, true),
                        None => (CsvReader::default(), false),
                    };
                    unsafe { reader.write(value) };
                    frame.store::<u8>(dest, ok as u8);
                }
                Bytecode::CsvReaderAdvance => {
                    let dest = rlocal!();
                    let reader = obj!(CsvReader);
                    frame.store::<u8>(dest, reader.advance() as u8);
                }
                Bytecode::CsvReaderGetField => {
                    let reader = obj!(CsvReader);
                    let col = ruimm4!();
                    let out = frame.ptr(rlocal!()) as *mut StringVal;
                    unsafe { out.write(reader.field(col)) };
                }
                Bytecode::CsvReaderClose => {
                    let reader = obj!(CsvReader);
                    unsafe { std::ptr::drop_in_place(reader) };
                }
            }
        }
    }
}
