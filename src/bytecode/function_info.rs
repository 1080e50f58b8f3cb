// src/bytecode/function_info.rs

use crate::bytecode::operands::LocalVar;
use crate::sema::types::align_up;
use crate::sema::TypeId;

/// Index of a function within its module
pub type FunctionId = u16;

/// A named slot in a function's frame
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub ty: TypeId,
    pub offset: u32,
    pub size: u32,
    pub align: u32,
}

/// Frame layout and bytecode location for one compiled function.
///
/// Parameters (including the hidden return-value pointer for functions that
/// return a value) occupy a contiguous run at the head of the frame, in
/// declaration order. All locals are naturally aligned; `frame_size` is the
/// number of bytes a caller must allocate for an activation.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub id: FunctionId,
    pub name: String,
    frame_size: u32,
    params_start: u32,
    params_size: u32,
    num_params: u32,
    locals: Vec<Local>,
    /// Start of this function's instructions in the module's byte buffer
    pub bytecode_offset: usize,
    /// One past the last instruction byte
    pub bytecode_end: usize,
}

impl FunctionInfo {
    pub fn new(id: FunctionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            frame_size: 0,
            params_start: 0,
            params_size: 0,
            num_params: 0,
            locals: Vec::new(),
            bytecode_offset: 0,
            bytecode_end: 0,
        }
    }

    /// Allocate a parameter slot. Must be called before any plain locals.
    pub fn new_param(&mut self, name: impl Into<String>, ty: TypeId, size: u32, align: u32) -> LocalVar {
        debug_assert_eq!(
            self.num_params as usize,
            self.locals.len(),
            "parameters must be allocated before locals"
        );
        let var = self.new_local(name, ty, size, align);
        self.num_params += 1;
        self.params_size = self.frame_size - self.params_start;
        var
    }

    /// Allocate a local (or code generator temporary) at the next naturally
    /// aligned frame offset.
    pub fn new_local(&mut self, name: impl Into<String>, ty: TypeId, size: u32, align: u32) -> LocalVar {
        let align = align.max(1);
        let offset = align_up(self.frame_size, align);
        self.locals.push(Local {
            name: name.into(),
            ty,
            offset,
            size,
            align,
        });
        self.frame_size = offset + size;
        LocalVar::value(offset)
    }

    pub fn frame_size(&self) -> u32 {
        // Frames are handed out 8-byte aligned
        align_up(self.frame_size, 8)
    }

    pub fn params_start(&self) -> u32 {
        self.params_start
    }

    pub fn params_size(&self) -> u32 {
        self.params_size
    }

    pub fn num_params(&self) -> u32 {
        self.num_params
    }

    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// Look up a declared local by name (used by tests and the disassembler)
    pub fn local_by_name(&self, name: &str) -> Option<&Local> {
        self.locals.iter().find(|l| l.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::TypeArena;

    #[test]
    fn params_then_locals_layout() {
        let arena = TypeArena::new();
        let mut info = FunctionInfo::new(0, "f");
        let p0 = info.new_param("a", arena.i32(), 4, 4);
        let p1 = info.new_param("b", arena.i64(), 8, 8);
        let l0 = info.new_local("x", arena.i8(), 1, 1);
        let l1 = info.new_local("y", arena.i32(), 4, 4);

        assert_eq!(p0.offset(), 0);
        assert_eq!(p1.offset(), 8); // aligned up from 4
        assert_eq!(l0.offset(), 16);
        assert_eq!(l1.offset(), 20); // aligned up from 17
        assert_eq!(info.num_params(), 2);
        assert_eq!(info.params_size(), 16);
        assert_eq!(info.frame_size(), 24);
    }

    #[test]
    fn every_local_fits_in_frame() {
        let arena = TypeArena::new();
        let mut info = FunctionInfo::new(0, "f");
        info.new_param("a", arena.i16(), 2, 2);
        info.new_local("b", arena.i64(), 8, 8);
        info.new_local("c", arena.bool(), 1, 1);

        for local in info.locals() {
            assert!(local.offset + local.size <= info.frame_size());
            assert_eq!(local.offset % local.align, 0);
        }
    }
}
