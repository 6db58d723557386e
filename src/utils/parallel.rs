use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{Result, ShelfError};

pub trait ParallelProcessor {
    /// A pool owned by the caller; `0` threads means one per CPU.
    fn build_thread_pool(threads: usize) -> Result<ThreadPool> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| {
                ShelfError::Configuration(format!("cannot start {threads} worker threads: {e}"))
            })
    }

    /// Maps `items` on `pool`, returning results in input order.
    fn process_chunk<T, R, F>(pool: &ThreadPool, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        pool.install(|| items.par_iter().map(f).collect())
    }
}
