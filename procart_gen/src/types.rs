// Core types shared across both generators.
//
// Defines node identifiers for the branching tree, opaque handles to
// host-side visual instances, the `Transform` triple (position, rotation,
// scale) exchanged with the host, and the `Rgba` color written into terrain
// vertex buffers.
//
// Orientation convention: a rotation's *forward* axis is its local +Z and its
// *up* axis is local +Y. `look_rotation()` builds the rotation whose forward
// axis points along a given direction, keeping up as close to world +Y as
// possible.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of a node in a `BranchTree`. Allocated monotonically and never
/// reused within one tree, so a culled id can't alias a newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Opaque handle to a visual instance owned by a `VisualHost`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

impl fmt::Display for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "visual#{}", self.0)
    }
}

/// Which template a visual is instantiated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisualKind {
    /// A branch segment.
    Trunk,
    /// A growth tip at the end of a childless branch.
    Terminal,
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualKind::Trunk => write!(f, "trunk"),
            VisualKind::Terminal => write!(f, "terminal"),
        }
    }
}

/// Outcome of one unit of resumable generation work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// More work remains; call `step` again on a later tick.
    Working,
    /// The job is complete and its output can be taken.
    Finished,
}

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// Placement of an object in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// World-space direction of the local +Z axis.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// End point of a segment that starts at `position`, runs along
    /// `forward()`, and is `scale.z * length_factor` long.
    pub fn tip(&self, length_factor: f32) -> Vec3 {
        self.position + self.forward() * self.scale.z * length_factor
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotation whose forward (+Z) axis points along `forward`.
///
/// Up is kept as close to world +Y as possible. When `forward` is vertical
/// the up hint switches to world +Z. A zero vector yields the identity.
pub fn look_rotation(forward: Vec3) -> Quat {
    let fwd = forward.normalize_or_zero();
    if fwd == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let up_hint = if fwd.cross(Vec3::Y).length_squared() < 1e-8 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let right = up_hint.cross(fwd).normalize();
    let up = fwd.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, fwd)).normalize()
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Linear RGBA color, each channel nominally in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Per-channel linear blend; `t` is not clamped.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}
