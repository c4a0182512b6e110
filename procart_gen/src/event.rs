// Studio events: the internal work queue and the emitted output events.
//
// Generation and animation are cooperative: nothing runs until the studio
// pops a scheduled event for the current tick. Each event does one unit of
// work and, if more remains, schedules its successor. The queue is a
// min-heap ordered by `(tick, sequence)`, so events on the same tick fire
// in the order they were scheduled.
//
// This file defines two related but distinct concepts:
// - `ScheduledEvent`: internal work items in the priority queue.
// - `StudioEvent`: things that happened, returned from `Studio::step()`.
//
// Each job keeps at most one work item queued, its next unit of work.
// Starting a new job cancels the old job's item with `EventQueue::cancel()`
// before scheduling its own, so an abandoned job never gets another turn.
//
// See also: `studio.rs` for the tick loop, `command.rs` for the inputs.
//
// **Critical constraint: determinism.** The `(tick, sequence)` key gives a
// total order; no event depends on wall-clock time.

use crate::gradient::ColorVariant;
use crate::types::{NodeId, VisualHandle};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// ---------------------------------------------------------------------------
// Internal scheduled events (priority queue)
// ---------------------------------------------------------------------------

/// A unit of work scheduled for a future tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub tick: u64,
    /// Tiebreaker within a tick. Lower values fire first.
    pub sequence: u64,
    pub kind: ScheduledEventKind,
}

/// Kinds of scheduled work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledEventKind {
    /// One row of the current terrain job.
    TerrainWork,
    /// One node of the current tree job.
    TreeWork,
    /// One sway animation step.
    Sway,
}

// Min-heap on (tick, sequence): BinaryHeap is a max-heap, so compare in
// reverse.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority queue of scheduled work, earliest tick first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, tick: u64, kind: ScheduledEventKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent {
            tick,
            sequence,
            kind,
        });
    }

    pub fn peek_tick(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.tick)
    }

    /// Pop the next event if its tick is <= `up_to_tick`.
    pub fn pop_if_ready(&mut self, up_to_tick: u64) -> Option<ScheduledEvent> {
        if self.heap.peek().is_some_and(|e| e.tick <= up_to_tick) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Drop every pending event of `kind`. Returns how many were dropped.
    pub fn cancel(&mut self, kind: ScheduledEventKind) -> usize {
        let before = self.heap.len();
        self.heap.retain(|e| e.kind != kind);
        before - self.heap.len()
    }

    pub fn is_pending(&self, kind: ScheduledEventKind) -> bool {
        self.heap.iter().any(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Output events
// ---------------------------------------------------------------------------

/// Something that happened during `Studio::step()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudioEvent {
    pub tick: u64,
    pub kind: StudioEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StudioEventKind {
    /// A terrain job started; any job still running was abandoned.
    TerrainStarted {
        variant: ColorVariant,
        height_amplitude: f32,
    },
    /// The current terrain job produced a mesh.
    TerrainCompleted { vertices: usize, triangles: usize },
    /// A tree job started; the previous tree was torn down.
    TreeStarted,
    /// The initial tree pass spawned its last node.
    TreeCompleted { nodes: usize },
    /// A terminal was traded for new branches.
    Grew {
        node: NodeId,
        children: Vec<NodeId>,
    },
    /// A subtree was removed, listed post-order.
    Pruned {
        node: NodeId,
        removed: Vec<NodeId>,
    },
    /// A command was refused; studio state is unchanged.
    CommandRejected {
        handle: Option<VisualHandle>,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_by_tick_then_sequence() {
        let mut queue = EventQueue::new();
        queue.schedule(100, ScheduledEventKind::Sway);
        queue.schedule(50, ScheduledEventKind::TreeWork);
        queue.schedule(50, ScheduledEventKind::TerrainWork);

        let first = queue.pop_if_ready(200).unwrap();
        assert_eq!((first.tick, first.sequence), (50, 1));
        assert_eq!(first.kind, ScheduledEventKind::TreeWork);

        let second = queue.pop_if_ready(200).unwrap();
        assert_eq!((second.tick, second.sequence), (50, 2));

        let third = queue.pop_if_ready(200).unwrap();
        assert_eq!(third.kind, ScheduledEventKind::Sway);
        assert!(queue.pop_if_ready(200).is_none());
    }

    #[test]
    fn pop_if_ready_respects_tick_limit() {
        let mut queue = EventQueue::new();
        queue.schedule(10, ScheduledEventKind::Sway);
        assert_eq!(queue.peek_tick(), Some(10));
        assert!(queue.pop_if_ready(9).is_none());
        assert!(queue.pop_if_ready(10).is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_drops_only_matching_kind() {
        let mut queue = EventQueue::new();
        queue.schedule(5, ScheduledEventKind::TerrainWork);
        queue.schedule(5, ScheduledEventKind::Sway);
        queue.schedule(9, ScheduledEventKind::TerrainWork);
        assert_eq!(queue.cancel(ScheduledEventKind::TerrainWork), 2);
        assert!(!queue.is_pending(ScheduledEventKind::TerrainWork));
        assert!(queue.is_pending(ScheduledEventKind::Sway));
        assert_eq!(queue.cancel(ScheduledEventKind::TreeWork), 0);

        // Sequence numbers keep counting after a cancel.
        queue.schedule(5, ScheduledEventKind::TreeWork);
        let first = queue.pop_if_ready(5).unwrap();
        assert_eq!(first.kind, ScheduledEventKind::Sway);
        let second = queue.pop_if_ready(5).unwrap();
        assert_eq!((second.kind, second.sequence), (ScheduledEventKind::TreeWork, 3));
    }

    #[test]
    fn queue_survives_serialization() {
        let mut queue = EventQueue::new();
        queue.schedule(20, ScheduledEventKind::Sway);
        queue.schedule(10, ScheduledEventKind::TerrainWork);
        let json = serde_json::to_string(&queue).unwrap();
        let mut restored: EventQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 2);
        let first = restored.pop_if_ready(100).unwrap();
        assert_eq!(first.kind, ScheduledEventKind::TerrainWork);
    }
}
