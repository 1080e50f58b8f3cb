// src/commands/common.rs
//! The shared compile pipeline: parse, analyze, lower. Each phase renders
//! its accumulated diagnostics and stops the pipeline when any exist.

use crate::bytecode::{BytecodeGenerator, BytecodeModule};
use crate::errors::render_to_stderr;
use crate::frontend::{Interner, Parser};
use crate::sema::analyzer::AnalyzedFile;
use crate::sema::types::{PrimitiveType, TypeArena, TypeId};
use crate::sema::{Analyzer, InternedType};
use crate::vm::Vm;

/// A fully compiled program ready to execute
pub struct Compiled {
    pub module: BytecodeModule,
    pub analyzed: AnalyzedFile,
    pub interner: Interner,
}

/// Parse and type check, rendering diagnostics on failure
pub fn parse_and_analyze(source: &str, file: &str) -> Result<(AnalyzedFile, Interner), ()> {
    let mut parser = Parser::new(source);
    let parsed = parser.parse_file();
    let (interner, parse_errors) = parser.into_parts();
    if !parse_errors.is_empty() {
        render_to_stderr(parse_errors, file, source);
        return Err(());
    }

    match Analyzer::new(&interner).analyze(parsed) {
        Ok(analyzed) => Ok((analyzed, interner)),
        Err(errors) => {
            render_to_stderr(errors, file, source);
            Err(())
        }
    }
}

/// Full pipeline: source text to executable module
pub fn compile(source: &str, file: &str) -> Result<Compiled, ()> {
    let (mut analyzed, interner) = parse_and_analyze(source, file)?;
    match BytecodeGenerator::generate(&mut analyzed, &interner) {
        Ok(module) => Ok(Compiled {
            module,
            analyzed,
            interner,
        }),
        Err(err) => {
            eprintln!("error: {}", err);
            Err(())
        }
    }
}

/// Run `main` and print its result (if it returns one)
pub fn execute_main(compiled: &Compiled) -> Result<(), String> {
    let Some(func_id) = compiled.module.function_id_by_name("main") else {
        return Err("no 'main' function found".to_string());
    };

    let main_sym = compiled
        .analyzed
        .functions
        .keys()
        .find(|sym| compiled.interner.resolve(**sym) == "main")
        .copied()
        .expect("main exists in the function table");
    let fn_ty = compiled.analyzed.functions[&main_sym];
    let ret_ty = match compiled.analyzed.arena.get(fn_ty) {
        crate::sema::InternedType::Function { ret, .. } => *ret,
        _ => unreachable!(),
    };

    let arena = &compiled.analyzed.arena;
    if arena.is_nil(ret_ty) {
        Vm::invoke(&compiled.module, func_id, &[]).map_err(|e| e.to_string())?;
        return Ok(());
    }

    // Hand the VM a pointer to an 8-byte return slot
    let mut ret_slot = [0u8; 8];
    let args = (ret_slot.as_mut_ptr() as u64).to_le_bytes();
    Vm::invoke(&compiled.module, func_id, &args).map_err(|e| e.to_string())?;

    println!("{}", format_primitive(arena, ret_ty, &ret_slot));
    Ok(())
}

/// Render the raw bytes of a primitive return slot for display
fn format_primitive(arena: &TypeArena, ty: TypeId, slot: &[u8; 8]) -> String {
    match arena.get(ty) {
        InternedType::Primitive(PrimitiveType::Bool) => (slot[0] != 0).to_string(),
        InternedType::Primitive(PrimitiveType::I8) => (slot[0] as i8).to_string(),
        InternedType::Primitive(PrimitiveType::I16) => {
            i16::from_le_bytes(slot[..2].try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::I32) => {
            i32::from_le_bytes(slot[..4].try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::I64) => {
            i64::from_le_bytes(slot.as_slice().try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::U8) => slot[0].to_string(),
        InternedType::Primitive(PrimitiveType::U16) => {
            u16::from_le_bytes(slot[..2].try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::U32) => {
            u32::from_le_bytes(slot[..4].try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::U64) => {
            u64::from_le_bytes(slot.as_slice().try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::F32) => {
            f32::from_le_bytes(slot[..4].try_into().unwrap()).to_string()
        }
        InternedType::Primitive(PrimitiveType::F64) => {
            f64::from_le_bytes(slot.as_slice().try_into().unwrap()).to_string()
        }
        _ => "<value>".to_string(),
    }
}

pub fn read_stdin() -> std::io::Result<String> {
    use std::io::Read;
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
