// Initial breadth-first generation of a branching tree.
//
// `TreeGrowthJob` is a resumable state machine: each `step()` pops one node
// from a FIFO frontier, spawns its trunk, and either subdivides it (pushing
// the new children) or, at `max_depth`, spawns its terminal. The studio
// calls `step()` once per work tick so a large tree builds up over many
// ticks without stalling the scene.
//
// Nodes can be pruned while the job is still running. The frontier holds
// ids, and an id that is no longer in the tree is skipped.
//
// See also: `tree.rs` for subdivision geometry, `studio.rs` which schedules
// the job.
//
// **Critical constraint: determinism.** Nodes are processed in FIFO order
// and every random draw goes through the caller's `RandomSource`, so the
// same seed yields the same tree.

use crate::config::BranchParams;
use crate::error::GenResult;
use crate::tree::BranchTree;
use crate::types::{NodeId, Progress, Transform};
use crate::visual::VisualHost;
use procart_prng::RandomSource;
use std::collections::VecDeque;

/// Breadth-first initial pass over a `BranchTree`.
#[derive(Clone, Debug)]
pub struct TreeGrowthJob {
    frontier: VecDeque<NodeId>,
    processed: usize,
}

impl TreeGrowthJob {
    /// Start from the tree's root.
    pub fn new(tree: &BranchTree) -> Self {
        Self {
            frontier: VecDeque::from([tree.root()]),
            processed: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Nodes waiting to be spawned.
    pub fn pending(&self) -> usize {
        self.frontier.len()
    }

    /// Nodes spawned so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Spawn one node.
    pub fn step<H, R>(
        &mut self,
        tree: &mut BranchTree,
        host: &mut H,
        rng: &mut R,
    ) -> GenResult<Progress>
    where
        H: VisualHost + ?Sized,
        R: RandomSource + ?Sized,
    {
        while let Some(id) = self.frontier.pop_front() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            let depth = node.depth;
            tree.spawn_trunk(id, host)?;
            if depth < tree.params().max_depth {
                let children = tree.subdivide(id, &*host, rng)?;
                self.frontier.extend(children);
            } else {
                tree.spawn_terminal(id, host)?;
            }
            self.processed += 1;
            break;
        }
        if self.frontier.is_empty() {
            tracing::debug!(nodes = self.processed, "tree generation finished");
            Ok(Progress::Finished)
        } else {
            Ok(Progress::Working)
        }
    }
}

/// Build a complete tree in one call.
pub fn generate_tree<H, R>(
    params: BranchParams,
    root: Transform,
    host: &mut H,
    rng: &mut R,
) -> GenResult<BranchTree>
where
    H: VisualHost + ?Sized,
    R: RandomSource + ?Sized,
{
    let mut tree = BranchTree::new(params, root, &*host)?;
    let mut job = TreeGrowthJob::new(&tree);
    while job.step(&mut tree, host, rng)? == Progress::Working {}
    Ok(tree)
}
