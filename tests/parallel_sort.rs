// tests/parallel_sort.rs
//! Parallel sort merge: values inserted into per-thread sorters must come
//! out of `sort_parallel` as the sorted union of all inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shrew::bytecode::BytecodeGenerator;
use shrew::frontend::Parser;
use shrew::sema::Analyzer;
use shrew::sql::{FunctionRunner, Sorter, ThreadStateContainer};
use shrew::vm::ModuleRunner;

/// The ascending-i64 comparator, compiled from source so the sorter calls
/// back into bytecode exactly as a query plan would.
const COMPARATOR: &str = "fun cmp(a: *uint8, b: *uint8) -> int32 {
                              var x: *int64 = @ptrCast(*int64, a)
                              var y: *int64 = @ptrCast(*int64, b)
                              if (*x < *y) { return 0 - 1 }
                              if (*x > *y) { return 1 }
                              return 0
                          }";

#[test]
fn parallel_sort_merges_thread_local_sorters() {
    let mut parser = Parser::new(COMPARATOR);
    let file = parser.parse_file();
    let (interner, errors) = parser.into_parts();
    assert!(errors.is_empty(), "{:?}", errors);
    let mut analyzed = Analyzer::new(&interner).analyze(file).expect("sema");
    let module = BytecodeGenerator::generate(&mut analyzed, &interner).expect("codegen");
    let cmp_id = module.function_id_by_name("cmp").unwrap();
    let runner = ModuleRunner::new(&module);

    const THREADS: usize = 4;
    const PER_THREAD: usize = 500;

    let mut tsc = ThreadStateContainer::new();
    tsc.reset(
        std::mem::size_of::<Sorter>() as u32,
        None,
        None,
        std::ptr::null_mut(),
        &runner,
    );

    // Every worker embeds a sorter at offset 0 of its thread state and
    // fills it with its own slice of the input
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<Vec<i64>> = (0..THREADS)
        .map(|_| (0..PER_THREAD).map(|_| rng.gen_range(-1000..1000)).collect())
        .collect();

    {
        let tsc = &tsc;
        let runner = &runner;
        std::thread::scope(|scope| {
            for values in &inputs {
                scope.spawn(move || {
                    let state = tsc.access_current_thread_state(runner);
                    let sorter = state as *mut Sorter;
                    unsafe { sorter.write(Sorter::new(cmp_id, 8)) };
                    let sorter = unsafe { &mut *sorter };
                    for &v in values {
                        let row = sorter.insert();
                        unsafe { (row as *mut i64).write(v) };
                    }
                });
            }
        });
    }
    assert_eq!(tsc.state_count(), THREADS);

    let mut merged = Sorter::new(cmp_id, 8);
    merged.sort_parallel(&tsc, 0, &runner);

    let mut expected: Vec<i64> = inputs.into_iter().flatten().collect();
    expected.sort_unstable();

    assert_eq!(merged.tuple_count(), expected.len());
    let actual: Vec<i64> = (0..merged.tuple_count())
        .map(|i| unsafe { *(merged.row_at(i) as *const i64) })
        .collect();
    assert_eq!(actual, expected);
}

struct NoopRunner;
impl FunctionRunner for NoopRunner {
    fn run(&self, _func_id: u16, _args: &[u64]) {}
}

#[test]
fn empty_parallel_sort_is_empty() {
    let mut tsc = ThreadStateContainer::new();
    tsc.reset(
        std::mem::size_of::<Sorter>() as u32,
        None,
        None,
        std::ptr::null_mut(),
        &NoopRunner,
    );
    let mut merged = Sorter::new(0, 8);
    merged.sort_parallel(&tsc, 0, &NoopRunner);
    assert_eq!(merged.tuple_count(), 0);
}
