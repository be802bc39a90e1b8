//! Parallel processing utilities

use crate::OligoError;
use rayon::prelude::*;

/// Resolve a thread count, where 0 means every available core
pub fn effective_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

/// Run independent units on a dedicated pool of at most `threads` workers.
///
/// Results come back in input order. If any unit fails, one of the errors
/// is returned and remaining units may be skipped.
pub fn run_bounded<T, R, F>(units: Vec<T>, threads: usize, work: F) -> Result<Vec<R>, OligoError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R, OligoError> + Send + Sync,
{
    let threads = effective_threads(threads).min(units.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("oligoscan-unit-{}", idx))
        .build()
        .map_err(|e| OligoError::Other(format!("Failed to build thread pool: {}", e)))?;

    pool.install(|| units.into_par_iter().map(&work).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_effective_threads() {
        assert!(effective_threads(0) > 0);
        assert_eq!(effective_threads(3), 3);
    }

    #[test]
    fn test_run_bounded_keeps_order() {
        let results = run_bounded((0..20).collect(), 4, |n: u64| Ok(n * n)).unwrap();
        assert_eq!(results[3], 9);
        assert_eq!(results.len(), 20);
    }

    #[test]
    fn test_run_bounded_caps_concurrency() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        run_bounded((0..16).collect::<Vec<u32>>(), 2, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_run_bounded_propagates_error() {
        let result = run_bounded(vec![1, 2, 3], 2, |n: i32| {
            if n == 2 {
                Err(OligoError::Other("unit failed".to_string()))
            } else {
                Ok(n)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_run_bounded_empty() {
        let results: Vec<u8> = run_bounded(Vec::<u8>::new(), 0, Ok).unwrap();
        assert!(results.is_empty());
    }
}
