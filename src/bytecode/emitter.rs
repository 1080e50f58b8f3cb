// src/bytecode/emitter.rs

use crate::bytecode::function_info::FunctionId;
use crate::bytecode::opcodes::Bytecode;
use crate::bytecode::operands::LocalVar;

/// A forward-referencable position in the instruction stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug, Default)]
struct LabelInfo {
    /// Byte position of the label target, once bound
    position: Option<usize>,
    /// Byte positions of 4-byte jump-offset operands waiting on this label
    fixups: Vec<usize>,
}

/// Appends encoded instructions to the module's flat byte buffer and patches
/// forward jumps when their targets become known.
///
/// Jump operands are signed 4-byte deltas measured so that advancing the
/// instruction pointer past the operand and then adding the delta lands on
/// the target: `target = operand_pos + 4 + delta`.
#[derive(Debug, Default)]
pub struct BytecodeEmitter {
    code: Vec<u8>,
    labels: Vec<LabelInfo>,
}

impl BytecodeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn finish(self) -> Vec<u8> {
        debug_assert!(
            self.labels
                .iter()
                .all(|l| l.position.is_some() && l.fixups.is_empty()),
            "unresolved jump fixups at emitter finish"
        );
        self.code
    }

    // ========================================================================
    // Raw operand emission
    // ========================================================================

    pub fn emit_op(&mut self, op: Bytecode) {
        self.code.extend_from_slice(&op.raw().to_le_bytes());
    }

    pub fn emit_local(&mut self, local: LocalVar) {
        self.code.extend_from_slice(&local.encode().to_le_bytes());
    }

    pub fn emit_imm1(&mut self, value: i8) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_imm2(&mut self, value: i16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_imm4(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_imm8(&mut self, value: i64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_uimm2(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_uimm4(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_function_id(&mut self, id: FunctionId) {
        self.code.extend_from_slice(&id.to_le_bytes());
    }

    pub fn emit_local_count(&mut self, count: u16) {
        self.code.extend_from_slice(&count.to_le_bytes());
    }

    // ========================================================================
    // Common instruction shapes
    // ========================================================================

    /// dest <- op(src) and dest <- op(lhs, rhs) shapes
    pub fn emit_unary(&mut self, op: Bytecode, dest: LocalVar, src: LocalVar) {
        self.emit_op(op);
        self.emit_local(dest);
        self.emit_local(src);
    }

    pub fn emit_binary(&mut self, op: Bytecode, dest: LocalVar, lhs: LocalVar, rhs: LocalVar) {
        self.emit_op(op);
        self.emit_local(dest);
        self.emit_local(lhs);
        self.emit_local(rhs);
    }

    // ========================================================================
    // Labels and jumps
    // ========================================================================

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelInfo::default());
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the current position, patching pending forward jumps
    pub fn bind_label(&mut self, label: Label) {
        let target = self.code.len();
        let info = &mut self.labels[label.0];
        debug_assert!(info.position.is_none(), "label bound twice");
        info.position = Some(target);
        let fixups = std::mem::take(&mut info.fixups);
        for operand_pos in fixups {
            let delta = Self::jump_delta(operand_pos, target);
            self.code[operand_pos..operand_pos + 4].copy_from_slice(&delta.to_le_bytes());
        }
    }

    /// Emit `Jump label`
    pub fn emit_jump(&mut self, label: Label) {
        self.emit_op(Bytecode::Jump);
        self.emit_jump_offset(label);
    }

    /// Emit `JumpIfTrue/JumpIfFalse cond, label`
    pub fn emit_cond_jump(&mut self, op: Bytecode, cond: LocalVar, label: Label) {
        debug_assert!(matches!(op, Bytecode::JumpIfTrue | Bytecode::JumpIfFalse));
        self.emit_op(op);
        self.emit_local(cond);
        self.emit_jump_offset(label);
    }

    fn emit_jump_offset(&mut self, label: Label) {
        let operand_pos = self.code.len();
        match self.labels[label.0].position {
            Some(target) => {
                let delta = Self::jump_delta(operand_pos, target);
                self.code.extend_from_slice(&delta.to_le_bytes());
            }
            None => {
                self.labels[label.0].fixups.push(operand_pos);
                self.code.extend_from_slice(&0i32.to_le_bytes());
            }
        }
    }

    fn jump_delta(operand_pos: usize, target: usize) -> i32 {
        (target as i64 - (operand_pos as i64 + 4)) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::operands::OperandType;

    fn read_i32(code: &[u8], pos: usize) -> i32 {
        i32::from_le_bytes(code[pos..pos + 4].try_into().unwrap())
    }

    #[test]
    fn backward_jump_delta() {
        let mut emitter = BytecodeEmitter::new();
        let top = emitter.new_label();
        emitter.bind_label(top);
        let target = emitter.position();
        emitter.emit_binary(
            Bytecode::AddI32,
            LocalVar::value(0),
            LocalVar::value(4),
            LocalVar::value(8),
        );
        emitter.emit_jump(top);
        let code = emitter.finish();

        // The operand sits right after the 2-byte Jump opcode
        let operand_pos = code.len() - 4;
        let delta = read_i32(&code, operand_pos);
        assert_eq!(operand_pos as i64 + 4 + delta as i64, target as i64);
    }

    #[test]
    fn forward_jump_is_patched() {
        let mut emitter = BytecodeEmitter::new();
        let end = emitter.new_label();
        emitter.emit_cond_jump(Bytecode::JumpIfFalse, LocalVar::value(0), end);
        let operand_pos = emitter.position() - 4;
        emitter.emit_unary(Bytecode::Not, LocalVar::value(0), LocalVar::value(0));
        emitter.bind_label(end);
        let target = emitter.position();
        let code = emitter.finish();

        let delta = read_i32(&code, operand_pos);
        assert_eq!(operand_pos as i64 + 4 + delta as i64, target as i64);
    }

    #[test]
    fn already_bound_label_needs_no_fixup() {
        let mut emitter = BytecodeEmitter::new();
        let top = emitter.new_label();
        emitter.bind_label(top);
        emitter.emit_jump(top);
        let code = emitter.finish();
        let delta = read_i32(&code, 2);
        assert_eq!(delta, -(2 + 4)); // back over opcode + operand
    }

    #[test]
    fn emitted_sizes_follow_schema() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_op(Bytecode::AssignImm4);
        emitter.emit_local(LocalVar::value(0));
        emitter.emit_imm4(7);
        let code = emitter.finish();
        let expected: usize = 2 + Bytecode::AssignImm4
            .operand_types()
            .iter()
            .map(|t| t.size())
            .sum::<usize>();
        assert_eq!(code.len(), expected);
        let _ = OperandType::Imm4;
    }
}
