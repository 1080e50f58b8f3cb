// src/bytecode/mod.rs
//! The register bytecode: instruction set, operand encoding, function
//! metadata, emission, and lowering from the type-checked AST.

pub mod emitter;
pub mod function_info;
pub mod generator;
pub mod module;
pub mod opcodes;
pub mod operands;

pub use emitter::{BytecodeEmitter, Label};
pub use function_info::{FunctionId, FunctionInfo, Local};
pub use generator::BytecodeGenerator;
pub use module::BytecodeModule;
pub use opcodes::Bytecode;
pub use operands::{AddressMode, LocalVar, OperandType};
