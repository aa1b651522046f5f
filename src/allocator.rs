//! Allocator: expands an ordered list of [`AllocationUnit`]s
//! into per-client timelines of [`Slot`]s, padded with [`Slot::Idle`] so
//! every client's row has equal length and join-point indices line up
//! across clients.
//!
//! Sub-tasks of a [`crate::model::Parallel`] group are assigned to clients
//! round-robin: a cursor walks `0..width` (wrapping), and each sub-task
//! claims the next `clients` cursor positions, appending itself to the
//! *end* of whichever row each position names. When a multi-client
//! sub-task's claimed positions wrap back past client 0, the clients it
//! lands on for the second time around end up one column further along
//! than the rest — this is what lets a `Parallel` group whose outer
//! `clients` is *smaller* than the sum of its sub-tasks' client counts
//! still place every sub-task (verified against `driver_test.py`'s
//! `test_considers_number_of_clients_per_subtask` and
//! `test_allocates_more_tasks_than_clients`, both of which exercise this).

use crate::model::{AllocationUnit, Operation, Parallel, Task};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Slot {
    JoinPoint(usize),
    /// A task placed on this client's row, plus the client-local shard
    /// index (`0..task.clients`) this particular row represents — needed
    /// by the scheduler to partition the task's param source correctly,
    /// since a task's shards don't always land on client rows equal to
    /// their shard index (see the round-robin wraparound in
    /// [`place_parallel`]).
    Task(Arc<Task>, u32),
    Idle,
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub clients: u32,
    pub allocations: Vec<Vec<Slot>>,
    pub join_points: Vec<usize>,
    pub operations_per_joinpoint: Vec<HashSet<Operation>>,
}

/// Expands `items` into a full per-client [`Allocation`].
pub fn allocate(items: &[AllocationUnit]) -> Allocation {
    let clients = items
        .iter()
        .map(AllocationUnit::width)
        .max()
        .unwrap_or(1)
        .max(1);
    let mut allocations: Vec<Vec<Slot>> = (0..clients).map(|_| Vec::new()).collect();
    let mut join_points = Vec::new();
    let mut operations_per_joinpoint = Vec::new();

    push_join_point(&mut allocations, &mut join_points);

    for item in items {
        match item {
            AllocationUnit::Task(task) => place_bare_task(&mut allocations, task),
            AllocationUnit::Parallel(parallel) => place_parallel(&mut allocations, parallel),
        }
        push_join_point(&mut allocations, &mut join_points);
        operations_per_joinpoint.push(item.operations());
    }

    Allocation {
        clients,
        allocations,
        join_points,
        operations_per_joinpoint,
    }
}

fn push_join_point(allocations: &mut [Vec<Slot>], join_points: &mut Vec<usize>) {
    let index = allocations[0].len();
    for row in allocations.iter_mut() {
        row.push(Slot::JoinPoint(index));
    }
    join_points.push(index);
}

fn place_bare_task(allocations: &mut [Vec<Slot>], task: &Task) {
    let k = task.clients;
    let task = Arc::new(task.clone());
    for (c, row) in allocations.iter_mut().enumerate() {
        if (c as u32) < k {
            row.push(Slot::Task(Arc::clone(&task), c as u32));
        } else {
            row.push(Slot::Idle);
        }
    }
}

fn place_parallel(allocations: &mut [Vec<Slot>], parallel: &Parallel) {
    let width = parallel.width() as usize;
    let base_len = allocations[0].len();

    // per-client row length reached so far, within this item, relative to
    // `base_len`.
    let mut local_len = vec![0usize; width.max(1)];
    let mut cursor = 0usize;

    for sub_task in &parallel.tasks {
        let shared = Arc::new(sub_task.clone());
        for shard_index in 0..sub_task.clients {
            if width > 0 {
                let c = cursor % width;
                // pad this client's row up to its own current local
                // length before appending the task (only needed if a
                // previous sub-task targeting a *different* client left
                // this one behind, which cannot happen with the
                // round-robin cursor, but keeps the row consistent if
                // `width` grows in the future).
                while allocations[c].len() < base_len + local_len[c] {
                    allocations[c].push(Slot::Idle);
                }
                allocations[c].push(Slot::Task(Arc::clone(&shared), shard_index));
                local_len[c] += 1;
            }
            cursor += 1;
        }
    }

    let columns = local_len.iter().copied().max().unwrap_or(1).max(1);

    // pad every client (including those beyond `width`, and any
    // within-width row that ended up short) to `columns` slots.
    for row in allocations.iter_mut() {
        while row.len() < base_len + columns {
            row.push(Slot::Idle);
        }
    }
}
