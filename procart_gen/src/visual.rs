// Boundary to the host engine's visual objects.
//
// The branching tree never renders anything itself. It asks a `VisualHost`
// to instantiate trunk and terminal visuals, reads their transforms back
// (segment tips are measured from the *visual's* transform, which the host
// may have scaled by its template), repositions them during sway, and
// destroys them on prune.
//
// `SceneHost` is a complete in-memory host: it keeps one template scale per
// `VisualKind`, hands out monotonically increasing handles, and stores each
// visual's current transform. Tests and the CLI use it; an engine
// integration implements `VisualHost` over its own scene graph.

use crate::error::{GenError, GenResult};
use crate::types::{Transform, VisualHandle, VisualKind};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host-side visual instantiation and transform access.
pub trait VisualHost {
    /// Whether a template for `kind` is available.
    fn has_template(&self, kind: VisualKind) -> bool;

    /// Instantiate a visual. The host multiplies `scale` component-wise by
    /// the template's own scale.
    fn spawn(
        &mut self,
        kind: VisualKind,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> GenResult<VisualHandle>;

    /// Destroy a visual. Unknown handles are ignored.
    fn destroy(&mut self, handle: VisualHandle);

    /// Current world transform, or `None` for an unknown handle.
    fn transform(&self, handle: VisualHandle) -> Option<Transform>;

    /// Move and reorient an existing visual; its scale is unchanged.
    fn set_placement(&mut self, handle: VisualHandle, position: Vec3, rotation: Quat);
}

/// One visual stored by `SceneHost`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneVisual {
    pub kind: VisualKind,
    pub transform: Transform,
}

/// In-memory `VisualHost`.
#[derive(Clone, Debug, Default)]
pub struct SceneHost {
    templates: BTreeMap<VisualKind, Vec3>,
    visuals: BTreeMap<VisualHandle, SceneVisual>,
    next_handle: u64,
}

impl SceneHost {
    /// A host with no templates. Spawning fails until templates are
    /// registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with both templates registered.
    pub fn with_templates(trunk_scale: Vec3, terminal_scale: Vec3) -> Self {
        let mut host = Self::new();
        host.register_template(VisualKind::Trunk, trunk_scale);
        host.register_template(VisualKind::Terminal, terminal_scale);
        host
    }

    pub fn register_template(&mut self, kind: VisualKind, scale: Vec3) {
        self.templates.insert(kind, scale);
    }

    pub fn get(&self, handle: VisualHandle) -> Option<&SceneVisual> {
        self.visuals.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// Number of live visuals of one kind.
    pub fn count(&self, kind: VisualKind) -> usize {
        self.visuals.values().filter(|v| v.kind == kind).count()
    }

    /// All live visuals in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (VisualHandle, &SceneVisual)> {
        self.visuals.iter().map(|(h, v)| (*h, v))
    }
}

impl VisualHost for SceneHost {
    fn has_template(&self, kind: VisualKind) -> bool {
        self.templates.contains_key(&kind)
    }

    fn spawn(
        &mut self,
        kind: VisualKind,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> GenResult<VisualHandle> {
        let template = self
            .templates
            .get(&kind)
            .copied()
            .ok_or(GenError::MissingTemplate(kind))?;
        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        self.visuals.insert(
            handle,
            SceneVisual {
                kind,
                transform: Transform::new(position, rotation, template * scale),
            },
        );
        Ok(handle)
    }

    fn destroy(&mut self, handle: VisualHandle) {
        self.visuals.remove(&handle);
    }

    fn transform(&self, handle: VisualHandle) -> Option<Transform> {
        self.visuals.get(&handle).map(|v| v.transform)
    }

    fn set_placement(&mut self, handle: VisualHandle, position: Vec3, rotation: Quat) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.transform.position = position;
            v.transform.rotation = rotation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_applies_template_scale() {
        let mut host = SceneHost::with_templates(Vec3::new(1.0, 1.0, 2.0), Vec3::ONE);
        let h = host
            .spawn(
                VisualKind::Trunk,
                Vec3::X,
                Quat::IDENTITY,
                Vec3::new(0.5, 0.5, 0.5),
            )
            .unwrap();
        let t = host.transform(h).unwrap();
        assert_eq!(t.position, Vec3::X);
        assert_eq!(t.scale, Vec3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn spawn_without_template_fails() {
        let mut host = SceneHost::new();
        host.register_template(VisualKind::Trunk, Vec3::ONE);
        let err = host
            .spawn(VisualKind::Terminal, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
            .unwrap_err();
        assert!(matches!(err, GenError::MissingTemplate(VisualKind::Terminal)));
        assert!(host.is_empty());
    }

    #[test]
    fn handles_are_unique_and_destroy_removes() {
        let mut host = SceneHost::with_templates(Vec3::ONE, Vec3::ONE);
        let a = host
            .spawn(VisualKind::Trunk, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        let b = host
            .spawn(VisualKind::Terminal, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(host.count(VisualKind::Trunk), 1);
        host.destroy(a);
        assert!(host.transform(a).is_none());
        assert_eq!(host.len(), 1);
        // Destroying twice is harmless.
        host.destroy(a);
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn set_placement_keeps_scale() {
        let mut host = SceneHost::with_templates(Vec3::ONE, Vec3::ONE);
        let h = host
            .spawn(VisualKind::Trunk, Vec3::ZERO, Quat::IDENTITY, Vec3::splat(3.0))
            .unwrap();
        let rot = Quat::from_rotation_y(1.0);
        host.set_placement(h, Vec3::Y, rot);
        let t = host.transform(h).unwrap();
        assert_eq!((t.position, t.rotation, t.scale), (Vec3::Y, rot, Vec3::splat(3.0)));
    }
}
