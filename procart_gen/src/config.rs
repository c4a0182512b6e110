// Data-driven configuration for both generators.
//
// All tunable parameters live in `StudioConfig`, loaded from JSON at startup
// and never mutated afterwards. It groups four parameter blocks:
// `TerrainParams` (grid size, noise scale and offsets, height amplitude),
// `BranchParams` (depth, branch counts, placement, angles, scale factors),
// `SwayParams` (cosmetic animation) and `SceneParams` (tick timing, root
// placement, visual template scales).
//
// Named presets on `BranchParams` (`classic()`, `bushy()`, `spire()`) give
// different tree silhouettes by tuning the same parameter set.
//
// `validate()` enforces every precondition the generators rely on. The
// generators validate again on entry, so a hand-built config that skips
// `validate()` still fails fast with `GenError::InvalidArgument`.
//
// See also: `terrain.rs` and `tree.rs` which read these parameters,
// `studio.rs` which owns the config.

use crate::error::{GenError, GenResult};
use crate::types::{Transform, look_rotation};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Most children a single subdivision may create.
pub const MAX_BRANCH_COUNT: u32 = 32;

/// Half-open integer range `[min, max_exclusive)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max_exclusive: u32,
}

impl CountRange {
    pub const fn new(min: u32, max_exclusive: u32) -> Self {
        Self { min, max_exclusive }
    }

    /// A range containing only `n`.
    pub const fn exactly(n: u32) -> Self {
        Self::new(n, n + 1)
    }
}

/// Closed float range `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractionRange {
    pub min: f32,
    pub max: f32,
}

impl FractionRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Heightmap grid and noise sampling parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Number of grid cells along X. The mesh has `width + 1` columns of
    /// vertices.
    pub width: u32,
    /// Number of grid cells along Z.
    pub depth: u32,
    /// Noise-space distance between adjacent grid vertices.
    pub scale: f32,
    /// Noise-space offset added to every X sample.
    pub offset_x: f32,
    /// Noise-space offset added to every Z sample.
    pub offset_y: f32,
    /// Multiplier applied to the [0, 1] noise sample before the -1 bias.
    pub height_amplitude: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            width: 100,
            depth: 100,
            scale: 20.0,
            offset_x: 100.0,
            offset_y: 100.0,
            height_amplitude: 10.0,
        }
    }
}

impl TerrainParams {
    pub fn validate(&self) -> GenResult<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GenError::invalid(format!(
                "terrain scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        if !(self.height_amplitude.is_finite() && self.height_amplitude > 0.0) {
            return Err(GenError::invalid(format!(
                "height amplitude must be finite and > 0, got {}",
                self.height_amplitude
            )));
        }
        if !(self.offset_x.is_finite() && self.offset_y.is_finite()) {
            return Err(GenError::invalid("noise offsets must be finite"));
        }
        let verts = (self.width as u64 + 1) * (self.depth as u64 + 1);
        if verts > u32::MAX as u64 {
            return Err(GenError::invalid(format!(
                "grid {}x{} has too many vertices for 32-bit indices",
                self.width, self.depth
            )));
        }
        Ok(())
    }

    /// Vertex count of the mesh these parameters describe.
    pub fn vertex_count(&self) -> usize {
        (self.width as usize + 1) * (self.depth as usize + 1)
    }
}

// ---------------------------------------------------------------------------
// Branching tree
// ---------------------------------------------------------------------------

/// Whose trunk orientation turns a child's local direction vector into a
/// world-space direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionBasis {
    /// The trunk of the node being subdivided.
    SubdividingTrunk,
    /// The trunk of the subdividing node's parent. The root has no parent
    /// trunk and uses its own.
    ParentTrunk,
}

/// Parameters of the recursive branching generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchParams {
    /// Depth at which the initial pass stops subdividing and spawns
    /// terminals instead. The root is depth 0.
    pub max_depth: u32,
    /// Children per subdivision, drawn uniformly from this half-open range.
    pub branch_count: CountRange,
    /// Usable fraction of the parent segment along which children attach.
    pub position_range: FractionRange,
    /// Per-axis multiplier from a parent's trunk scale to its children's.
    pub child_scale: Vec3,
    /// Elevation of child directions out of the parent's local XY plane,
    /// in degrees. Must lie strictly inside (-90, 90).
    pub branch_angle_degrees: f32,
    /// Trunk segment length per unit of trunk `scale.z`.
    pub visual_scale_factor: f32,
    /// Terminal size per unit of node `scale.x`.
    pub leaf_scale_factor: f32,
    pub direction_basis: DirectionBasis,
}

impl Default for BranchParams {
    fn default() -> Self {
        Self::classic()
    }
}

impl BranchParams {
    /// Four evenly spread branches per node, two levels deep.
    pub fn classic() -> Self {
        Self {
            max_depth: 2,
            branch_count: CountRange::exactly(4),
            position_range: FractionRange::new(0.5, 1.0),
            child_scale: Vec3::new(0.5, 0.5, 0.75),
            branch_angle_degrees: 45.0,
            visual_scale_factor: 6.0,
            leaf_scale_factor: 2.0,
            direction_basis: DirectionBasis::SubdividingTrunk,
        }
    }

    /// Dense, irregular crown: 3 to 5 branches spread along most of each
    /// segment.
    pub fn bushy() -> Self {
        Self {
            max_depth: 3,
            branch_count: CountRange::new(3, 6),
            position_range: FractionRange::new(0.3, 1.0),
            child_scale: Vec3::new(0.6, 0.6, 0.7),
            branch_angle_degrees: 30.0,
            ..Self::classic()
        }
    }

    /// Narrow upright form: few branches hugging the parent direction.
    pub fn spire() -> Self {
        Self {
            max_depth: 3,
            branch_count: CountRange::new(2, 4),
            position_range: FractionRange::new(0.7, 1.0),
            child_scale: Vec3::new(0.5, 0.5, 0.85),
            branch_angle_degrees: 70.0,
            ..Self::classic()
        }
    }

    pub fn validate(&self) -> GenResult<()> {
        let bc = self.branch_count;
        if bc.min < 1 || bc.min >= bc.max_exclusive {
            return Err(GenError::invalid(format!(
                "branch count range [{}, {}) must be non-empty with min >= 1",
                bc.min, bc.max_exclusive
            )));
        }
        if bc.max_exclusive > MAX_BRANCH_COUNT + 1 {
            return Err(GenError::invalid(format!(
                "branch count range [{}, {}) exceeds the limit of {MAX_BRANCH_COUNT} branches",
                bc.min, bc.max_exclusive
            )));
        }
        let pr = self.position_range;
        if !(0.0 <= pr.min && pr.min <= pr.max && pr.max <= 1.0) {
            return Err(GenError::invalid(format!(
                "position range [{}, {}] must satisfy 0 <= min <= max <= 1",
                pr.min, pr.max
            )));
        }
        if !(self.child_scale.is_finite() && self.child_scale.min_element() > 0.0) {
            return Err(GenError::invalid(format!(
                "child scale must be finite and positive, got {}",
                self.child_scale
            )));
        }
        if !(self.branch_angle_degrees.is_finite() && self.branch_angle_degrees.abs() < 90.0) {
            return Err(GenError::invalid(format!(
                "branch angle must lie in (-90, 90) degrees, got {}",
                self.branch_angle_degrees
            )));
        }
        for (name, v) in [
            ("visual scale factor", self.visual_scale_factor),
            ("leaf scale factor", self.leaf_scale_factor),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(GenError::invalid(format!(
                    "{name} must be finite and > 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Animation and scene
// ---------------------------------------------------------------------------

/// Cosmetic sway applied to every trunk on each animation tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwayParams {
    pub enabled: bool,
    /// Peak rotation about the trunk's local X axis, in degrees.
    pub amplitude_degrees: f32,
    /// Angular frequency in radians per second of scene time.
    pub frequency: f32,
}

impl Default for SwayParams {
    fn default() -> Self {
        Self {
            enabled: true,
            amplitude_degrees: 40.0,
            frequency: 1.0,
        }
    }
}

/// Scheduling and placement shared by both generators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneParams {
    /// Real-world milliseconds per studio tick.
    pub tick_duration_ms: u32,
    /// Ticks between units of generation work (one terrain row, one tree
    /// node).
    pub work_interval_ticks: u64,
    /// Ticks between sway animation steps.
    pub sway_interval_ticks: u64,
    /// Placement of the tree's root node.
    pub root: Transform,
    /// Base scale of the trunk template; spawned trunks multiply it by the
    /// node scale.
    pub trunk_template_scale: Vec3,
    /// Base scale of the terminal template.
    pub terminal_template_scale: Vec3,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            tick_duration_ms: 20,
            work_interval_ticks: 1,
            sway_interval_ticks: 1,
            // Root trunk grows straight up.
            root: Transform::new(Vec3::ZERO, look_rotation(Vec3::Y), Vec3::ONE),
            trunk_template_scale: Vec3::ONE,
            terminal_template_scale: Vec3::ONE,
        }
    }
}

impl SceneParams {
    pub fn validate(&self) -> GenResult<()> {
        if self.tick_duration_ms == 0 {
            return Err(GenError::invalid("tick duration must be > 0 ms"));
        }
        if self.work_interval_ticks == 0 || self.sway_interval_ticks == 0 {
            return Err(GenError::invalid("tick intervals must be >= 1"));
        }
        let root = &self.root;
        if !(root.position.is_finite() && root.rotation.is_finite()) {
            return Err(GenError::invalid("root transform must be finite"));
        }
        for (name, s) in [
            ("root scale", root.scale),
            ("trunk template scale", self.trunk_template_scale),
            ("terminal template scale", self.terminal_template_scale),
        ] {
            if !(s.is_finite() && s.min_element() > 0.0) {
                return Err(GenError::invalid(format!(
                    "{name} must be finite and positive, got {s}"
                )));
            }
        }
        Ok(())
    }

    /// Seconds of scene time elapsed at `tick`.
    pub fn seconds_at(&self, tick: u64) -> f32 {
        (tick as f64 * self.tick_duration_ms as f64 / 1000.0) as f32
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    pub terrain: TerrainParams,
    pub branches: BranchParams,
    pub sway: SwayParams,
    pub scene: SceneParams,
}

impl StudioConfig {
    pub fn validate(&self) -> GenResult<()> {
        self.terrain.validate()?;
        self.branches.validate()?;
        self.scene.validate()?;
        if !(self.sway.amplitude_degrees.is_finite() && self.sway.frequency.is_finite()) {
            return Err(GenError::invalid("sway parameters must be finite"));
        }
        Ok(())
    }

    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> GenResult<Self> {
        let config: StudioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> GenResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read, parse, and validate a JSON config file.
    pub fn load(path: &Path) -> GenResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_roundtrips() {
        let config = StudioConfig::default();
        config.validate().unwrap();
        let json = config.to_json_pretty().unwrap();
        let restored = StudioConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn presets_are_valid() {
        for preset in [
            BranchParams::classic(),
            BranchParams::bushy(),
            BranchParams::spire(),
        ] {
            preset.validate().unwrap();
        }
    }

    #[test]
    fn spire_hugs_parent_more_than_bushy() {
        assert!(
            BranchParams::spire().branch_angle_degrees > BranchParams::bushy().branch_angle_degrees
        );
    }

    #[test]
    fn rejects_non_positive_scale() {
        let mut terrain = TerrainParams::default();
        terrain.scale = 0.0;
        assert!(matches!(
            terrain.validate(),
            Err(GenError::InvalidArgument(_))
        ));
        terrain.scale = f32::NAN;
        assert!(terrain.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_amplitude() {
        let terrain = TerrainParams {
            height_amplitude: 0.0,
            ..TerrainParams::default()
        };
        assert!(matches!(
            terrain.validate(),
            Err(GenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_sized_grid_is_allowed() {
        let terrain = TerrainParams {
            width: 0,
            depth: 0,
            ..TerrainParams::default()
        };
        terrain.validate().unwrap();
        assert_eq!(terrain.vertex_count(), 1);
    }

    #[test]
    fn rejects_empty_branch_count_range() {
        let params = BranchParams {
            branch_count: CountRange::new(4, 4),
            ..BranchParams::classic()
        };
        assert!(params.validate().is_err());
        let params = BranchParams {
            branch_count: CountRange::new(0, 3),
            ..BranchParams::classic()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_oversized_branch_count_range() {
        let params = BranchParams {
            branch_count: CountRange::new(1, MAX_BRANCH_COUNT + 1),
            ..BranchParams::classic()
        };
        params.validate().unwrap();
        let params = BranchParams {
            branch_count: CountRange::new(1, MAX_BRANCH_COUNT + 2),
            ..BranchParams::classic()
        };
        assert!(matches!(
            params.validate(),
            Err(GenError::InvalidArgument(_))
        ));

        let mut config = StudioConfig::default();
        config.branches.branch_count = CountRange::new(1, 3_000_000_000);
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(
            StudioConfig::from_json(&json),
            Err(GenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_bad_position_range_and_angle() {
        let params = BranchParams {
            position_range: FractionRange::new(0.8, 0.2),
            ..BranchParams::classic()
        };
        assert!(params.validate().is_err());
        let params = BranchParams {
            branch_angle_degrees: 90.0,
            ..BranchParams::classic()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn json_with_invalid_values_is_rejected() {
        let mut config = StudioConfig::default();
        config.scene.tick_duration_ms = 0;
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(
            StudioConfig::from_json(&json),
            Err(GenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            StudioConfig::from_json("{ not json"),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn seconds_at_uses_tick_duration() {
        let scene = SceneParams::default();
        assert!((scene.seconds_at(50) - 1.0).abs() < 1e-6);
    }
}
