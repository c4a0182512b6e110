// Per-tick sway animation of a branching tree's visuals.
//
// For every node with a trunk, in id order (parents before children):
// 1. a non-root trunk is moved to
//    `parent_trunk.position + parent_trunk.forward * |node.position - parent.position|`,
//    which keeps it attached to its parent even after the parent swayed;
// 2. its rotation becomes the node's base rotation followed by a rotation
//    about local X of `amplitude * sin(frequency * t + trunk.position.x)`;
// 3. a leaf's terminal is moved to the trunk's new tip.
//
// Only host-side transforms change. Node positions and rotations in the
// tree stay as generated, so sway never feeds back into later subdivisions
// except through the trunk transforms it reads.

use crate::config::SwayParams;
use crate::tree::BranchTree;
use crate::visual::VisualHost;
use glam::Quat;

/// Apply one sway step at scene time `seconds`.
pub fn sway_step<H: VisualHost + ?Sized>(
    tree: &BranchTree,
    host: &mut H,
    params: &SwayParams,
    seconds: f32,
) {
    if !params.enabled {
        return;
    }
    let length_factor = tree.params().visual_scale_factor;
    for node in tree.nodes() {
        let Some(trunk) = node.trunk else {
            continue;
        };
        let Some(current) = host.transform(trunk) else {
            continue;
        };
        let parent_trunk = node
            .parent
            .and_then(|p| tree.get(p))
            .and_then(|p| p.trunk.map(|h| (p, h)))
            .and_then(|(p, h)| host.transform(h).map(|t| (p, t)));
        let position = match parent_trunk {
            Some((parent, t)) => {
                t.position + t.forward() * (node.position - parent.position).length()
            }
            None => current.position,
        };
        let swing = params.amplitude_degrees * (params.frequency * seconds + position.x).sin();
        let rotation = node.rotation * Quat::from_rotation_x(swing.to_radians());
        host.set_placement(trunk, position, rotation);

        if let Some(terminal) = node.terminal {
            if let (Some(moved), Some(tip)) = (host.transform(trunk), host.transform(terminal)) {
                host.set_placement(terminal, moved.tip(length_factor), tip.rotation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BranchParams;
    use crate::tree_gen::generate_tree;
    use crate::types::{Transform, look_rotation};
    use crate::visual::SceneHost;
    use glam::Vec3;
    use procart_prng::ArtRng;

    fn grown() -> (BranchTree, SceneHost) {
        let mut host = SceneHost::with_templates(Vec3::ONE, Vec3::ONE);
        let root = Transform::new(Vec3::ZERO, look_rotation(Vec3::Y), Vec3::ONE);
        let tree =
            generate_tree(BranchParams::classic(), root, &mut host, &mut ArtRng::new(5)).unwrap();
        (tree, host)
    }

    #[test]
    fn children_stay_on_parent_axis() {
        let (tree, mut host) = grown();
        sway_step(&tree, &mut host, &SwayParams::default(), 1.3);
        for node in tree.nodes() {
            let Some(parent) = node.parent.and_then(|p| tree.get(p)) else {
                continue;
            };
            let pt = host.transform(parent.trunk.unwrap()).unwrap();
            let ct = host.transform(node.trunk.unwrap()).unwrap();
            let offset = ct.position - pt.position;
            let expected = (node.position - parent.position).length();
            assert!((offset.length() - expected).abs() < 1e-3);
            assert!((offset - pt.forward() * expected).length() < 1e-3);
        }
    }

    #[test]
    fn terminals_track_trunk_tips() {
        let (tree, mut host) = grown();
        sway_step(&tree, &mut host, &SwayParams::default(), 0.7);
        for node in tree.nodes() {
            if let Some(terminal) = node.terminal {
                let trunk = host.transform(node.trunk.unwrap()).unwrap();
                let tip = host.transform(terminal).unwrap().position;
                assert!((tip - trunk.tip(6.0)).length() < 1e-3);
            }
        }
    }

    #[test]
    fn rotation_is_base_times_local_x_swing() {
        let (tree, mut host) = grown();
        let params = SwayParams::default();
        let t = 2.0;
        sway_step(&tree, &mut host, &params, t);
        let root = tree.get(tree.root()).unwrap();
        let trunk = host.transform(root.trunk.unwrap()).unwrap();
        let swing = (40.0f32 * (t + trunk.position.x).sin()).to_radians();
        let expected = root.rotation * Quat::from_rotation_x(swing);
        assert!(trunk.rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn disabled_sway_leaves_host_untouched() {
        let (tree, mut host) = grown();
        let before: Vec<_> = host.iter().map(|(h, v)| (h, v.clone())).collect();
        let params = SwayParams {
            enabled: false,
            ..SwayParams::default()
        };
        sway_step(&tree, &mut host, &params, 4.0);
        let after: Vec<_> = host.iter().map(|(h, v)| (h, v.clone())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn zero_amplitude_keeps_generated_pose() {
        let (tree, mut host) = grown();
        let params = SwayParams {
            amplitude_degrees: 0.0,
            ..SwayParams::default()
        };
        sway_step(&tree, &mut host, &params, 3.0);
        for node in tree.nodes() {
            let t = host.transform(node.trunk.unwrap()).unwrap();
            assert!((t.position - node.position).length() < 1e-3);
            assert!(t.rotation.angle_between(node.rotation) < 1e-4);
        }
    }
}
