//! Sequential-or-pooled execution over a work list.
//!
//! Lists shorter than the threshold (by default the rayon pool size) run on the calling
//! thread, everything else on the rayon pool.

use rayon::prelude::*;

pub fn map<T, R, F>(items: &[T], threshold: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if items.len() < threshold {
        items.iter().map(f).collect()
    } else {
        tracing::trace!(
            "running {} items on {} workers",
            items.len(),
            rayon::current_num_threads()
        );
        items.par_iter().map(f).collect()
    }
}

pub fn for_each<T, F>(items: &[T], threshold: usize, f: F)
where
    T: Sync,
    F: Fn(&T) + Sync + Send,
{
    if items.len() < threshold {
        items.iter().for_each(f);
    } else {
        items.par_iter().for_each(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn map_preserves_input_order_in_both_modes() {
        let items: Vec<usize> = (0..64).collect();
        let sequential = map(&items, usize::MAX, |n| n * 2);
        let pooled = map(&items, 1, |n| n * 2);
        assert_eq!(sequential, pooled);
        assert_eq!(pooled[63], 126);
    }

    #[test]
    fn for_each_visits_every_item_once() {
        let items: Vec<usize> = (0..1000).collect();
        let visits = AtomicUsize::new(0);
        for_each(&items, 1, |_| {
            visits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(visits.load(Ordering::Relaxed), 1000);
    }
}
