// src/sql/thread_state.rs

use std::sync::Mutex;
use std::thread::ThreadId;

use crate::sql::runner::FunctionRunner;

/// Per-thread scratch state for parallel operators.
///
/// Each worker thread lazily receives a zeroed slice of `state_size` bytes,
/// initialized by the user-provided init callback. Parallel builtins embed
/// their thread-local objects (sorters, join tables, aggregation tables)
/// inside the slice at known offsets and merge them in a final step.
#[repr(C)]
#[derive(Debug, Default)]
pub struct ThreadStateContainer {
    state_size: u32,
    init_fn: Option<u16>,
    destroy_fn: Option<u16>,
    /// Opaque query-state pointer passed to the callbacks
    ctx: usize,
    states: Mutex<Vec<(ThreadId, Box<[u8]>)>>,
}

impl ThreadStateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all existing states and install a new state shape
    pub fn reset(
        &mut self,
        state_size: u32,
        init_fn: Option<u16>,
        destroy_fn: Option<u16>,
        ctx: *mut u8,
        runner: &dyn FunctionRunner,
    ) {
        self.clear(runner);
        self.state_size = state_size;
        self.init_fn = init_fn;
        self.destroy_fn = destroy_fn;
        self.ctx = ctx as usize;
    }

    /// The calling thread's state, created and initialized on first use
    pub fn access_current_thread_state(&self, runner: &dyn FunctionRunner) -> *mut u8 {
        let id = std::thread::current().id();
        let mut states = self.states.lock().unwrap();
        if let Some((_, state)) = states.iter_mut().find(|(tid, _)| *tid == id) {
            return state.as_mut_ptr();
        }
        let mut state = vec![0u8; self.state_size as usize].into_boxed_slice();
        let ptr = state.as_mut_ptr();
        states.push((id, state));
        drop(states);
        if let Some(init_fn) = self.init_fn {
            runner.run(init_fn, &[self.ctx as u64, ptr as u64]);
        }
        ptr
    }

    /// Visit every thread's state with the given callback
    pub fn iterate(&self, ctx: *mut u8, iterate_fn: u16, runner: &dyn FunctionRunner) {
        for ptr in self.state_pointers() {
            runner.run(iterate_fn, &[ctx as u64, ptr as u64]);
        }
    }

    /// Raw pointers to every live state (used by merge steps)
    pub fn state_pointers(&self) -> Vec<*mut u8> {
        let mut states = self.states.lock().unwrap();
        states.iter_mut().map(|(_, s)| s.as_mut_ptr()).collect()
    }

    pub fn state_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    /// Destroy all states, invoking the destroy callback on each
    pub fn clear(&mut self, runner: &dyn FunctionRunner) {
        let mut states = self.states.lock().unwrap();
        if let Some(destroy_fn) = self.destroy_fn {
            for (_, state) in states.iter_mut() {
                runner.run(destroy_fn, &[self.ctx as u64, state.as_mut_ptr() as u64]);
            }
        }
        states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRunner;
    impl FunctionRunner for NoopRunner {
        fn run(&self, _func_id: u16, _args: &[u64]) {}
    }

    #[test]
    fn state_is_created_once_per_thread() {
        let mut tsc = ThreadStateContainer::new();
        tsc.reset(64, None, None, std::ptr::null_mut(), &NoopRunner);
        let a = tsc.access_current_thread_state(&NoopRunner);
        let b = tsc.access_current_thread_state(&NoopRunner);
        assert_eq!(a, b);
        assert_eq!(tsc.state_count(), 1);
    }

    #[test]
    fn reset_clears_existing_states() {
        let mut tsc = ThreadStateContainer::new();
        tsc.reset(16, None, None, std::ptr::null_mut(), &NoopRunner);
        tsc.access_current_thread_state(&NoopRunner);
        tsc.reset(16, None, None, std::ptr::null_mut(), &NoopRunner);
        assert_eq!(tsc.state_count(), 0);
    }

    #[test]
    fn parallel_workers_get_distinct_states() {
        let mut tsc = ThreadStateContainer::new();
        tsc.reset(32, None, None, std::ptr::null_mut(), &NoopRunner);
        let tsc = &tsc;
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(move || {
                    tsc.access_current_thread_state(&NoopRunner);
                });
            }
        });
        assert!(tsc.state_count() >= 2);
    }
}
