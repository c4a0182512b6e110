// Commands that change studio state.
//
// Everything outside the studio (UI buttons, raycast clicks, the CLI)
// changes it only by submitting `StudioCommand`s to `Studio::step()`. A
// command carries the tick it applies at and a `StudioAction`:
// - `RegenerateTerrain`: reroll offsets and amplitude for a color variant
//   and start a fresh terrain job, abandoning any job in flight.
// - `RegenerateTree`: tear down the current tree and start a new
//   breadth-first pass.
// - `GrowTerminal`: subdivide the leaf that owns a terminal visual.
// - `PruneTrunk`: remove the subtree whose root owns a trunk visual.
//
// Selection is by visual handle because that is what a host's picking
// reports. A command naming a stale or wrong-kind handle is rejected with a
// `CommandRejected` event and otherwise ignored.
//
// See also: `studio.rs` for `apply_command()`, `event.rs` for the events
// each command emits.

use crate::gradient::ColorVariant;
use crate::types::VisualHandle;
use serde::{Deserialize, Serialize};

/// An externally issued command, applied at `tick`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudioCommand {
    pub tick: u64,
    pub action: StudioAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StudioAction {
    RegenerateTerrain { variant: ColorVariant },
    RegenerateTree,
    GrowTerminal { handle: VisualHandle },
    PruneTrunk { handle: VisualHandle },
}

impl StudioCommand {
    pub fn new(tick: u64, action: StudioAction) -> Self {
        Self { tick, action }
    }
}
