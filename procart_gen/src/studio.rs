// Studio state and tick loop.
//
// `Studio` is the single owner of everything the two generators touch: the
// config, the PRNG, the noise field, the visual host, the terrain job and
// the last finished mesh, the branch tree and its growth job, and the event
// queue. It is driven the same way from tests, the CLI, or an engine frame
// loop: `step(commands, target_tick)` applies commands and processes
// scheduled work up to `target_tick`, returning the events it produced.
//
// Scheduling (all on one thread):
// - terrain work: one row per `work_interval_ticks` while a job exists;
// - tree work: one node per `work_interval_ticks` while the initial pass
//   runs;
// - sway: one animation step every `sway_interval_ticks`, for the lifetime
//   of the studio.
// Commands at a tick are applied before any scheduled work at that tick, so
// a prune has finished destroying visuals before the next sway reads them.
//
// Regenerating terrain replaces the in-flight job outright. The previously
// finished mesh stays readable from `terrain()` until the new job finishes.
//
// See also: `event.rs` for the queue, `command.rs` for the inputs,
// `terrain.rs` / `tree_gen.rs` / `sway.rs` for the work itself.
//
// **Critical constraint: determinism.** The same seed, config and command
// stream produce the same meshes, trees and events.

use crate::command::{StudioAction, StudioCommand};
use crate::config::StudioConfig;
use crate::error::GenResult;
use crate::event::{EventQueue, ScheduledEventKind, StudioEvent, StudioEventKind};
use crate::gradient::{ColorVariant, Gradient};
use crate::noise_field::PerlinField;
use crate::sway::sway_step;
use crate::terrain::{TerrainJob, TerrainMesh, reroll_for_variant};
use crate::tree::{BranchNode, BranchTree};
use crate::tree_gen::TreeGrowthJob;
use crate::types::{Progress, Transform, VisualHandle};
use crate::visual::{SceneHost, VisualHost};
use procart_prng::ArtRng;
use serde::{Deserialize, Serialize};

/// Terrain job in flight, with the ramp it will color with.
#[derive(Clone, Debug)]
struct ActiveTerrain {
    job: TerrainJob,
    variant: ColorVariant,
    gradient: Gradient,
}

/// A finished terrain mesh and the variant that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedTerrain {
    pub variant: ColorVariant,
    pub mesh: TerrainMesh,
}

/// Result of a `step()` call.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    pub events: Vec<StudioEvent>,
}

/// Serializable view of the studio's output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudioSnapshot {
    pub tick: u64,
    pub terrain: Option<CompletedTerrain>,
    pub nodes: Vec<NodeSnapshot>,
}

/// A tree node with the current host transforms of its visuals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node: BranchNode,
    pub trunk: Option<Transform>,
    pub terminal: Option<Transform>,
}

pub struct Studio<H: VisualHost = SceneHost> {
    tick: u64,
    config: StudioConfig,
    rng: ArtRng,
    noise: PerlinField,
    host: H,
    terrain_job: Option<ActiveTerrain>,
    terrain: Option<CompletedTerrain>,
    tree: BranchTree,
    tree_job: Option<TreeGrowthJob>,
    event_queue: EventQueue,
}

impl Studio<SceneHost> {
    /// Studio backed by an in-memory host whose template scales come from
    /// the config.
    pub fn new(seed: u64, config: StudioConfig) -> GenResult<Self> {
        let host = SceneHost::with_templates(
            config.scene.trunk_template_scale,
            config.scene.terminal_template_scale,
        );
        Self::with_host(seed, config, host)
    }
}

impl<H: VisualHost> Studio<H> {
    /// Create a studio and schedule the initial tree pass and sway.
    ///
    /// No terrain exists until a `RegenerateTerrain` command arrives.
    pub fn with_host(seed: u64, config: StudioConfig, host: H) -> GenResult<Self> {
        config.validate()?;
        let mut rng = ArtRng::new(seed);
        let noise = PerlinField::new(rng.next_seed_u32());
        let tree = BranchTree::new(config.branches.clone(), config.scene.root, &host)?;
        let tree_job = TreeGrowthJob::new(&tree);

        let mut event_queue = EventQueue::new();
        event_queue.schedule(0, ScheduledEventKind::TreeWork);
        event_queue.schedule(config.scene.sway_interval_ticks, ScheduledEventKind::Sway);

        tracing::info!(seed, noise_seed = noise.seed(), "studio created");
        Ok(Self {
            tick: 0,
            config,
            rng,
            noise,
            host,
            terrain_job: None,
            terrain: None,
            tree,
            tree_job: Some(tree_job),
            event_queue,
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tree(&self) -> &BranchTree {
        &self.tree
    }

    /// Last finished terrain, if any.
    pub fn terrain(&self) -> Option<&CompletedTerrain> {
        self.terrain.as_ref()
    }

    pub fn is_terrain_generating(&self) -> bool {
        self.terrain_job.is_some()
    }

    pub fn is_tree_generating(&self) -> bool {
        self.tree_job.is_some()
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        let visual = |h: Option<VisualHandle>| h.and_then(|h| self.host.transform(h));
        StudioSnapshot {
            tick: self.tick,
            terrain: self.terrain.clone(),
            nodes: self
                .tree
                .nodes()
                .map(|node| NodeSnapshot {
                    node: node.clone(),
                    trunk: visual(node.trunk),
                    terminal: visual(node.terminal),
                })
                .collect(),
        }
    }

    /// Advance to `target_tick`, applying `commands` (sorted by tick) and
    /// processing scheduled work along the way.
    pub fn step(&mut self, commands: &[StudioCommand], target_tick: u64) -> StepResult {
        let mut events = Vec::new();
        let mut cmd_idx = 0;

        while self.tick < target_tick {
            // Jump straight to whichever comes first: queued work, the next
            // command, or the target. Ticks in the past count as now.
            let next_tick = [
                self.event_queue.peek_tick(),
                commands.get(cmd_idx).map(|c| c.tick),
            ]
            .into_iter()
            .flatten()
            .fold(target_tick, u64::min);
            self.tick = self.tick.max(next_tick);

            while cmd_idx < commands.len() && commands[cmd_idx].tick <= self.tick {
                let cmd = &commands[cmd_idx];
                cmd_idx += 1;
                self.apply_command(cmd, &mut events);
            }

            while let Some(event) = self.event_queue.pop_if_ready(self.tick) {
                self.process_event(event.kind, &mut events);
            }
        }

        self.tick = target_tick.max(self.tick);
        StepResult { events }
    }

    fn apply_command(&mut self, cmd: &StudioCommand, events: &mut Vec<StudioEvent>) {
        let (handle, outcome) = match &cmd.action {
            StudioAction::RegenerateTerrain { variant } => {
                (None, self.regenerate_terrain(*variant))
            }
            StudioAction::RegenerateTree => (None, self.regenerate_tree()),
            StudioAction::GrowTerminal { handle } => (
                Some(*handle),
                self.tree
                    .grow_terminal(*handle, &mut self.host, &mut self.rng)
                    .map(|(node, children)| StudioEventKind::Grew { node, children }),
            ),
            StudioAction::PruneTrunk { handle } => (
                Some(*handle),
                self.tree
                    .cull_trunk(*handle, &mut self.host)
                    .map(|(node, removed)| StudioEventKind::Pruned { node, removed }),
            ),
        };
        let kind = match outcome {
            Ok(kind) => kind,
            Err(err) => {
                tracing::warn!(tick = self.tick, action = ?cmd.action, %err, "command rejected");
                StudioEventKind::CommandRejected {
                    handle,
                    reason: err.to_string(),
                }
            }
        };
        events.push(StudioEvent {
            tick: self.tick,
            kind,
        });
    }

    fn regenerate_terrain(&mut self, variant: ColorVariant) -> GenResult<StudioEventKind> {
        let params = reroll_for_variant(&self.config.terrain, variant, &mut self.rng);
        let job = TerrainJob::new(params)?;
        let height_amplitude = job.params().height_amplitude;
        if self.event_queue.cancel(ScheduledEventKind::TerrainWork) > 0 {
            tracing::debug!("abandoning in-flight terrain job");
        }
        self.terrain_job = Some(ActiveTerrain {
            job,
            variant,
            gradient: variant.gradient(),
        });
        self.event_queue.schedule(self.tick, ScheduledEventKind::TerrainWork);
        tracing::info!(
            variant = variant.label(),
            height_amplitude,
            "terrain regeneration started"
        );
        Ok(StudioEventKind::TerrainStarted {
            variant,
            height_amplitude,
        })
    }

    fn regenerate_tree(&mut self) -> GenResult<StudioEventKind> {
        let fresh = BranchTree::new(
            self.config.branches.clone(),
            self.config.scene.root,
            &self.host,
        )?;
        let old = std::mem::replace(&mut self.tree, fresh);
        old.teardown(&mut self.host);
        self.tree_job = Some(TreeGrowthJob::new(&self.tree));
        self.event_queue.cancel(ScheduledEventKind::TreeWork);
        self.event_queue.schedule(self.tick, ScheduledEventKind::TreeWork);
        tracing::info!("tree regeneration started");
        Ok(StudioEventKind::TreeStarted)
    }

    fn process_event(&mut self, kind: ScheduledEventKind, events: &mut Vec<StudioEvent>) {
        match kind {
            ScheduledEventKind::TerrainWork => {
                let Some(active) = self.terrain_job.as_mut() else {
                    return;
                };
                if active.job.step(&self.noise, &active.gradient) == Progress::Working {
                    self.event_queue.schedule(
                        self.tick + self.config.scene.work_interval_ticks,
                        ScheduledEventKind::TerrainWork,
                    );
                    return;
                }
                let Some(active) = self.terrain_job.take() else {
                    return;
                };
                if let Some(mesh) = active.job.finish() {
                    tracing::info!(
                        variant = active.variant.label(),
                        vertices = mesh.vertices.len(),
                        "terrain ready"
                    );
                    events.push(StudioEvent {
                        tick: self.tick,
                        kind: StudioEventKind::TerrainCompleted {
                            vertices: mesh.vertices.len(),
                            triangles: mesh.triangle_count(),
                        },
                    });
                    self.terrain = Some(CompletedTerrain {
                        variant: active.variant,
                        mesh,
                    });
                }
            }
            ScheduledEventKind::TreeWork => {
                let Some(job) = self.tree_job.as_mut() else {
                    return;
                };
                match job.step(&mut self.tree, &mut self.host, &mut self.rng) {
                    Ok(Progress::Working) => {
                        self.event_queue.schedule(
                            self.tick + self.config.scene.work_interval_ticks,
                            ScheduledEventKind::TreeWork,
                        );
                    }
                    Ok(Progress::Finished) => {
                        self.tree_job = None;
                        tracing::info!(nodes = self.tree.len(), "tree ready");
                        events.push(StudioEvent {
                            tick: self.tick,
                            kind: StudioEventKind::TreeCompleted {
                                nodes: self.tree.len(),
                            },
                        });
                    }
                    Err(err) => {
                        self.tree_job = None;
                        tracing::warn!(%err, "tree generation stopped");
                    }
                }
            }
            ScheduledEventKind::Sway => {
                let seconds = self.config.scene.seconds_at(self.tick);
                sway_step(&self.tree, &mut self.host, &self.config.sway, seconds);
                self.event_queue.schedule(
                    self.tick + self.config.scene.sway_interval_ticks,
                    ScheduledEventKind::Sway,
                );
            }
        }
    }
}
