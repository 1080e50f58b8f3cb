// src/sql/runner.rs

/// How runtime objects call back into user bytecode.
///
/// Builtins that accept user function references (hash, key-equality,
/// aggregate init/advance, merge, scan, sort comparators) receive the
/// function as an id into the module's function table. The VM hands runtime
/// objects an implementation of this trait so they can invoke those ids
/// without knowing anything about bytecode. Implementations must be usable
/// from parallel workers.
pub trait FunctionRunner: Sync {
    /// Invoke a function. Each element of `args` is one parameter value,
    /// in order, widened to 64 bits (callback parameters are pointers or
    /// word-sized scalars). For callbacks that return a value, the first
    /// element is the return-slot pointer, per the calling convention.
    fn run(&self, func_id: u16, args: &[u64]);
}

/// Convenience for callbacks returning a small scalar: invokes `func_id`
/// with a return slot prepended and returns the raw 8-byte result.
pub fn run_with_result(runner: &dyn FunctionRunner, func_id: u16, args: &[u64]) -> u64 {
    let mut result: u64 = 0;
    let mut full: Vec<u64> = Vec::with_capacity(args.len() + 1);
    full.push(&mut result as *mut u64 as u64);
    full.extend_from_slice(args);
    runner.run(func_id, &full);
    result
}
