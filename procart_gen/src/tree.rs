// Recursive branching structure: node arena, subdivision, growth, pruning.
//
// A `BranchTree` owns every `BranchNode` in a flat registry keyed by
// `NodeId`. Parent/child links are ids into that registry, so removing a
// subtree never leaves a dangling reference: `cull()` walks the subtree
// post-order, destroys each node's visuals, and deletes each entry from the
// registry and the handle index before unlinking the subtree root from its
// parent.
//
// Geometry of a subdivision (see `child_placements()`):
// - the parent segment runs from the trunk visual's position to
//   `trunk.tip(visual_scale_factor)`;
// - child `i` of `n` sits at fraction `min + (max - min) / n * i` along it;
// - its local direction is `(cos a, sin a, tan branch_angle)` with
//   `a = 360 / n * i` degrees, normalized and rotated into world space by
//   the basis trunk's rotation (see `DirectionBasis`);
// - its scale is the parent trunk's scale times `child_scale`.
//
// Every node that has a trunk and no children carries a terminal visual at
// its tip. Growth trades a node's terminal for a ring of children, each
// spawned with its own trunk and terminal; the old terminal is destroyed
// only once every child has spawned, and a failed spawn removes the partial
// ring instead. When pruning leaves a parent childless, the parent gets a fresh terminal so it can be grown again.
//
// See also: `tree_gen.rs` for the breadth-first initial pass, `sway.rs` for
// the per-tick animation of the spawned visuals, `visual.rs` for the host
// boundary.
//
// **Critical constraint: determinism.** Branch counts are the only random
// draw, one `range_i32` per subdivision, taken from the caller's
// `RandomSource`.

use crate::config::{BranchParams, DirectionBasis};
use crate::error::{GenError, GenResult};
use crate::types::{NodeId, Transform, VisualHandle, VisualKind, look_rotation};
use crate::visual::VisualHost;
use glam::{Quat, Vec3};
use procart_prng::RandomSource;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// One node of the branching structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchNode {
    pub id: NodeId,
    /// 0 for the root, parent depth + 1 otherwise.
    pub depth: u32,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
    pub trunk: Option<VisualHandle>,
    pub terminal: Option<VisualHandle>,
}

impl BranchNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The node's own placement, before any host-side template scaling.
    pub fn base_transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, self.scale)
    }
}

/// Derived placement of one child of a subdivision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildPlacement {
    /// Angular offset around the parent's forward axis, in degrees.
    pub angle_degrees: f32,
    /// Fraction of the parent segment at which the child attaches.
    pub fraction: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Placements of `count` children along `segment` (a trunk visual's
/// transform), with directions rotated by `basis`.
pub fn child_placements(
    segment: &Transform,
    basis: Quat,
    count: u32,
    params: &BranchParams,
) -> Vec<ChildPlacement> {
    if count == 0 {
        return Vec::new();
    }
    let start = segment.position;
    let end = segment.tip(params.visual_scale_factor);
    let angle_step = 360.0 / count as f32;
    let fraction_step = params.position_range.span() / count as f32;
    let elevation = params.branch_angle_degrees.to_radians().tan();

    (0..count)
        .map(|i| {
            let angle_degrees = angle_step * i as f32;
            let fraction = params.position_range.min + fraction_step * i as f32;
            let a = angle_degrees.to_radians();
            let local = Vec3::new(a.cos(), a.sin(), elevation).normalize();
            ChildPlacement {
                angle_degrees,
                fraction,
                position: start.lerp(end, fraction),
                rotation: look_rotation(basis * local),
                scale: segment.scale * params.child_scale,
            }
        })
        .collect()
}

/// Arena of branch nodes plus the handle index used for selection.
#[derive(Clone, Debug)]
pub struct BranchTree {
    params: BranchParams,
    nodes: BTreeMap<NodeId, BranchNode>,
    handle_index: FxHashMap<VisualHandle, NodeId>,
    root: NodeId,
    next_id: u32,
}

impl BranchTree {
    /// Create a tree holding only an unspawned root at `root`.
    ///
    /// Fails with `MissingTemplate` if the host can't instantiate either
    /// visual kind, so generation never stops halfway for that reason.
    pub fn new<H: VisualHost + ?Sized>(
        params: BranchParams,
        root: Transform,
        host: &H,
    ) -> GenResult<Self> {
        params.validate()?;
        for kind in [VisualKind::Trunk, VisualKind::Terminal] {
            if !host.has_template(kind) {
                return Err(GenError::MissingTemplate(kind));
            }
        }
        let root_id = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root_id,
            BranchNode {
                id: root_id,
                depth: 0,
                parent: None,
                children: SmallVec::new(),
                position: root.position,
                scale: root.scale,
                rotation: root.rotation,
                trunk: None,
                terminal: None,
            },
        );
        Ok(Self {
            params,
            nodes,
            handle_index: FxHashMap::default(),
            root: root_id,
            next_id: 1,
        })
    }

    pub fn params(&self) -> &BranchParams {
        &self.params
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&BranchNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order. Ids are allocated at creation, so every
    /// parent precedes its children.
    pub fn nodes(&self) -> impl Iterator<Item = &BranchNode> {
        self.nodes.values()
    }

    /// Terminal handles of every leaf, in node order.
    pub fn terminals(&self) -> Vec<VisualHandle> {
        self.nodes.values().filter_map(|n| n.terminal).collect()
    }

    /// Node owning a trunk or terminal handle.
    pub fn node_for_handle(&self, handle: VisualHandle) -> Option<NodeId> {
        self.handle_index.get(&handle).copied()
    }

    fn node(&self, id: NodeId) -> GenResult<&BranchNode> {
        self.nodes.get(&id).ok_or(GenError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> GenResult<&mut BranchNode> {
        self.nodes.get_mut(&id).ok_or(GenError::UnknownNode(id))
    }

    /// Spawn the node's trunk visual at its own transform. Returns the
    /// existing handle if the trunk is already spawned.
    pub fn spawn_trunk<H: VisualHost + ?Sized>(
        &mut self,
        id: NodeId,
        host: &mut H,
    ) -> GenResult<VisualHandle> {
        let node = self.node(id)?;
        if let Some(handle) = node.trunk {
            return Ok(handle);
        }
        let handle = host.spawn(VisualKind::Trunk, node.position, node.rotation, node.scale)?;
        self.node_mut(id)?.trunk = Some(handle);
        self.handle_index.insert(handle, id);
        Ok(handle)
    }

    /// Spawn a terminal at the tip of a childless node's trunk. Returns the
    /// existing handle if one is already present.
    pub fn spawn_terminal<H: VisualHost + ?Sized>(
        &mut self,
        id: NodeId,
        host: &mut H,
    ) -> GenResult<VisualHandle> {
        let node = self.node(id)?;
        if let Some(handle) = node.terminal {
            return Ok(handle);
        }
        if !node.is_leaf() {
            return Err(GenError::invalid(format!(
                "{id} has children and can't carry a terminal"
            )));
        }
        let trunk = self.trunk_transform(node, &*host)?;
        let tip = trunk.tip(self.params.visual_scale_factor);
        let size = Vec3::splat(node.scale.x * self.params.leaf_scale_factor);
        let handle = host.spawn(VisualKind::Terminal, tip, node.rotation, size)?;
        self.node_mut(id)?.terminal = Some(handle);
        self.handle_index.insert(handle, id);
        Ok(handle)
    }

    fn trunk_transform<H: VisualHost + ?Sized>(
        &self,
        node: &BranchNode,
        host: &H,
    ) -> GenResult<Transform> {
        let handle = node
            .trunk
            .ok_or_else(|| GenError::invalid(format!("{} has no trunk visual", node.id)))?;
        host.transform(handle)
            .ok_or(GenError::UnknownHandle(handle))
    }

    /// Rotation that carries child directions into world space.
    fn direction_basis<H: VisualHost + ?Sized>(
        &self,
        node: &BranchNode,
        own_trunk: &Transform,
        host: &H,
    ) -> Quat {
        match self.params.direction_basis {
            DirectionBasis::SubdividingTrunk => own_trunk.rotation,
            DirectionBasis::ParentTrunk => node
                .parent
                .and_then(|p| self.nodes.get(&p))
                .and_then(|p| p.trunk)
                .and_then(|h| host.transform(h))
                .map_or(own_trunk.rotation, |t| t.rotation),
        }
    }

    /// Create children for a node that has none.
    ///
    /// Returns the new child ids, or an empty list if the node was already
    /// subdivided. Requires the node's trunk to be spawned. The children are
    /// registered but have no visuals yet.
    pub fn subdivide<H, R>(&mut self, id: NodeId, host: &H, rng: &mut R) -> GenResult<Vec<NodeId>>
    where
        H: VisualHost + ?Sized,
        R: RandomSource + ?Sized,
    {
        let node = self.node(id)?;
        if !node.is_leaf() {
            return Ok(Vec::new());
        }
        let trunk = self.trunk_transform(node, host)?;
        let basis = self.direction_basis(node, &trunk, host);
        let depth = node.depth + 1;

        // Validated against MAX_BRANCH_COUNT, so both bounds fit in i32.
        let range = self.params.branch_count;
        let count = rng.range_i32(range.min as i32, range.max_exclusive as i32) as u32;
        let placements = child_placements(&trunk, basis, count, &self.params);

        let mut created = Vec::with_capacity(placements.len());
        for placement in placements {
            let child = NodeId(self.next_id);
            self.next_id += 1;
            self.nodes.insert(
                child,
                BranchNode {
                    id: child,
                    depth,
                    parent: Some(id),
                    children: SmallVec::new(),
                    position: placement.position,
                    scale: placement.scale,
                    rotation: placement.rotation,
                    trunk: None,
                    terminal: None,
                },
            );
            created.push(child);
        }
        self.node_mut(id)?.children.extend(created.iter().copied());
        tracing::debug!(node = %id, children = created.len(), "subdivided");
        Ok(created)
    }

    /// Trade a leaf's terminal for a ring of fully spawned children.
    pub fn grow<H, R>(&mut self, id: NodeId, host: &mut H, rng: &mut R) -> GenResult<Vec<NodeId>>
    where
        H: VisualHost + ?Sized,
        R: RandomSource + ?Sized,
    {
        let node = self.node(id)?;
        if !node.is_leaf() {
            return Err(GenError::invalid(format!("{id} is already subdivided")));
        }
        if node.trunk.is_none() {
            return Err(GenError::invalid(format!("{id} has no trunk visual")));
        }
        let terminal = node.terminal;
        let children = self.subdivide(id, &*host, rng)?;
        if let Err(err) = self.spawn_children(&children, host) {
            self.discard_children(id, &children, host);
            return Err(err);
        }
        if let Some(terminal) = terminal {
            host.destroy(terminal);
            self.handle_index.remove(&terminal);
            self.node_mut(id)?.terminal = None;
        }
        tracing::info!(node = %id, children = children.len(), "grew");
        Ok(children)
    }

    fn spawn_children<H: VisualHost + ?Sized>(
        &mut self,
        children: &[NodeId],
        host: &mut H,
    ) -> GenResult<()> {
        for &child in children {
            self.spawn_trunk(child, host)?;
            self.spawn_terminal(child, host)?;
        }
        Ok(())
    }

    /// Undo a half-finished `grow()`: drop the new leaves and whatever
    /// visuals they got. The parent keeps its terminal.
    fn discard_children<H: VisualHost + ?Sized>(
        &mut self,
        id: NodeId,
        children: &[NodeId],
        host: &mut H,
    ) {
        for child in children {
            if let Some(node) = self.nodes.remove(child) {
                for handle in [node.trunk, node.terminal].into_iter().flatten() {
                    host.destroy(handle);
                    self.handle_index.remove(&handle);
                }
            }
        }
        if let Some(parent) = self.nodes.get_mut(&id) {
            parent.children.clear();
        }
        tracing::warn!(node = %id, "growth rolled back");
    }

    /// `grow()` the node whose terminal is `handle`.
    pub fn grow_terminal<H, R>(
        &mut self,
        handle: VisualHandle,
        host: &mut H,
        rng: &mut R,
    ) -> GenResult<(NodeId, Vec<NodeId>)>
    where
        H: VisualHost + ?Sized,
        R: RandomSource + ?Sized,
    {
        let id = self
            .node_for_handle(handle)
            .ok_or(GenError::UnknownHandle(handle))?;
        if self.node(id)?.terminal != Some(handle) {
            return Err(GenError::invalid(format!("{handle} is not a terminal")));
        }
        let children = self.grow(id, host, rng)?;
        Ok((id, children))
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns the removed ids in post-order (children before parents, the
    /// culled node last). The root can't be culled; use `teardown()`.
    pub fn cull<H: VisualHost + ?Sized>(
        &mut self,
        id: NodeId,
        host: &mut H,
    ) -> GenResult<Vec<NodeId>> {
        if id == self.root {
            return Err(GenError::RootPrune);
        }
        let parent = self.node(id)?.parent;

        let mut removed = Vec::new();
        self.collect_post_order(id, &mut removed);
        for &victim in &removed {
            if let Some(node) = self.nodes.remove(&victim) {
                for handle in [node.trunk, node.terminal].into_iter().flatten() {
                    host.destroy(handle);
                    self.handle_index.remove(&handle);
                }
            }
        }

        if let Some(parent) = parent {
            let parent_node = self.node_mut(parent)?;
            parent_node.children.retain(|c| *c != id);
            if parent_node.is_leaf() && parent_node.trunk.is_some() {
                self.spawn_terminal(parent, host)?;
            }
        }
        tracing::info!(node = %id, removed = removed.len(), "pruned");
        Ok(removed)
    }

    /// `cull()` the node whose trunk is `handle`.
    pub fn cull_trunk<H: VisualHost + ?Sized>(
        &mut self,
        handle: VisualHandle,
        host: &mut H,
    ) -> GenResult<(NodeId, Vec<NodeId>)> {
        let id = self
            .node_for_handle(handle)
            .ok_or(GenError::UnknownHandle(handle))?;
        if self.node(id)?.trunk != Some(handle) {
            return Err(GenError::invalid(format!("{handle} is not a trunk")));
        }
        let removed = self.cull(id, host)?;
        Ok((id, removed))
    }

    fn collect_post_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            for &child in &node.children {
                self.collect_post_order(child, out);
            }
            out.push(id);
        }
    }

    /// Destroy every visual, root included, and drop the tree.
    pub fn teardown<H: VisualHost + ?Sized>(self, host: &mut H) {
        let count = self.nodes.len();
        for node in self.nodes.into_values() {
            for handle in [node.trunk, node.terminal].into_iter().flatten() {
                host.destroy(handle);
            }
        }
        tracing::debug!(nodes = count, "tree torn down");
    }
}
