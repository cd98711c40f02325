//! Bounded fan-out over partitions.
//!
//! Items are dealt round-robin to at most `max_tasks` scoped threads and the
//! results come back in input order. One worker means no threads at all.

use std::thread;

use crate::error::{ExecError, Result};

pub(crate) fn run_parallel<T, R, F>(max_tasks: usize, items: Vec<T>, task: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    let total = items.len();
    let workers = max_tasks.min(total).max(1);
    if workers == 1 {
        return items.into_iter().map(&task).collect();
    }

    let mut lanes: Vec<Vec<(usize, T)>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        lanes[i % workers].push((i, item));
    }

    let task = &task;
    let lane_results: Vec<Result<Vec<(usize, R)>>> = thread::scope(|s| {
        let handles: Vec<_> = lanes
            .into_iter()
            .map(|lane| {
                s.spawn(move || {
                    lane.into_iter()
                        .map(|(i, item)| task(item).map(|r| (i, r)))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(ExecError::Worker("partition worker panicked".into())))
            })
            .collect()
    });

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    for lane in lane_results {
        for (i, r) in lane? {
            slots[i] = Some(r);
        }
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| ExecError::Worker("missing partition result".into())))
        .collect()
}
