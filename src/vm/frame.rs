// src/vm/frame.rs

use smallvec::SmallVec;

use crate::bytecode::operands::{AddressMode, LocalVar};

/// Storage kept inline on the host stack before spilling to the heap.
/// Frames at or below this size cost nothing to allocate.
const INLINE_FRAME_SIZE: usize = 4096;

/// An activation frame: exactly `frame_size` zeroed bytes where a
/// function's parameters, locals, and temporaries live. Small frames use
/// the host stack; oversized frames spill to the heap. Storage is released
/// on every exit path when the frame drops.
pub struct Frame {
    data: SmallVec<[u8; INLINE_FRAME_SIZE]>,
}

impl Frame {
    pub fn new(frame_size: u32) -> Self {
        let mut data = SmallVec::new();
        data.resize(frame_size as usize, 0);
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn base(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }

    #[cfg(debug_assertions)]
    fn ensure_in_frame(&self, local: LocalVar) {
        assert!(
            (local.offset() as usize) < self.data.len(),
            "local at offset {} is outside frame of size {}",
            local.offset(),
            self.data.len()
        );
    }

    #[cfg(not(debug_assertions))]
    fn ensure_in_frame(&self, _local: LocalVar) {}

    /// Resolve a local reference to a pointer: in address mode the address
    /// of the slot itself, in value mode the pointer stored in the slot.
    pub fn ptr(&mut self, local: LocalVar) -> *mut u8 {
        self.ensure_in_frame(local);
        let slot = unsafe { self.base().add(local.offset() as usize) };
        match local.mode() {
            AddressMode::Address => slot,
            AddressMode::Value => unsafe { (slot as *const *mut u8).read_unaligned() },
        }
    }

    /// Read a typed value from a local. Address-mode references of pointer
    /// width evaluate to the slot's address, so the same local can feed
    /// pointer-consuming operands.
    pub fn value<T: Copy>(&mut self, local: LocalVar) -> T {
        self.ensure_in_frame(local);
        let slot = unsafe { self.base().add(local.offset() as usize) };
        match local.mode() {
            AddressMode::Value => unsafe { (slot as *const T).read_unaligned() },
            AddressMode::Address => {
                debug_assert_eq!(
                    std::mem::size_of::<T>(),
                    std::mem::size_of::<usize>(),
                    "address-mode locals only widen to pointer-sized values"
                );
                unsafe { std::mem::transmute_copy(&slot) }
            }
        }
    }

    /// Write a typed value into the slot a local reference resolves to
    pub fn store<T: Copy>(&mut self, local: LocalVar, value: T) {
        let dest = self.ptr(local) as *mut T;
        unsafe { dest.write_unaligned(value) };
    }

    /// The raw parameter region, for the caller to fill before dispatch
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_mode_reads_contents() {
        let mut frame = Frame::new(16);
        frame.raw_mut()[0..4].copy_from_slice(&42i32.to_le_bytes());
        let v: i32 = frame.value(LocalVar::value(0));
        assert_eq!(v, 42);
    }

    #[test]
    fn address_mode_yields_slot_address() {
        let mut frame = Frame::new(16);
        let base = frame.base() as usize;
        let addr: u64 = frame.value(LocalVar::address(8));
        assert_eq!(addr, (base + 8) as u64);
        assert_eq!(frame.ptr(LocalVar::address(8)) as usize, base + 8);
    }

    #[test]
    fn value_mode_pointer_indirects() {
        let mut frame = Frame::new(32);
        let mut target = 7i64;
        let target_ptr = &mut target as *mut i64 as u64;
        frame.raw_mut()[0..8].copy_from_slice(&target_ptr.to_le_bytes());
        // A value-mode pointer read returns the stored pointer
        let p = frame.ptr(LocalVar::value(0));
        assert_eq!(p as u64, target_ptr);
    }

    #[test]
    fn store_through_address_mode() {
        let mut frame = Frame::new(16);
        frame.store::<i32>(LocalVar::address(4), 99);
        let v: i32 = frame.value(LocalVar::value(4));
        assert_eq!(v, 99);
    }

    #[test]
    fn frames_are_zeroed() {
        let mut frame = Frame::new(64);
        assert!(frame.raw_mut().iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "outside frame")]
    #[cfg(debug_assertions)]
    fn out_of_bounds_access_panics_in_debug() {
        let mut frame = Frame::new(8);
        let _: i32 = frame.value(LocalVar::value(64));
    }
}
