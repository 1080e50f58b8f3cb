// src/bytecode/module.rs

use rustc_hash::FxHashMap;

use crate::bytecode::function_info::{FunctionId, FunctionInfo};

/// A compiled module: the flat instruction buffer, per-function frame
/// metadata, the function-name table, and the string pool. Read-only once
/// built; shared by the interpreter, callbacks, and parallel workers.
#[derive(Debug)]
pub struct BytecodeModule {
    code: Vec<u8>,
    functions: Vec<FunctionInfo>,
    functions_by_name: FxHashMap<String, FunctionId>,
    strings: Vec<String>,
}

impl BytecodeModule {
    pub fn new(code: Vec<u8>, functions: Vec<FunctionInfo>, strings: Vec<String>) -> Self {
        let functions_by_name = functions
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect();
        Self {
            code,
            functions,
            functions_by_name,
            strings,
        }
    }

    pub fn function_info_by_id(&self, id: FunctionId) -> Option<&FunctionInfo> {
        self.functions.get(id as usize)
    }

    pub fn function_id_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions_by_name.get(name).copied()
    }

    pub fn functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    /// The instruction bytes of one function
    pub fn bytecode_for(&self, info: &FunctionInfo) -> &[u8] {
        &self.code[info.bytecode_offset..info.bytecode_end]
    }

    pub fn string(&self, index: u32) -> &str {
        &self.strings[index as usize]
    }

    /// Execute a function by id. `args` is the packed parameter buffer laid
    /// out exactly like the callee's parameter region (for a function that
    /// returns a value, the first parameter is the return-slot pointer).
    pub fn invoke(&self, id: FunctionId, args: &[u8]) -> Result<(), crate::vm::VmError> {
        crate::vm::Vm::invoke(self, id, args)
    }
}
