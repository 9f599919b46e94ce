//! A small hierarchy of spheres for the stylus to pick up.
//!
//! Every node stores its transform relative to its parent, so moving an
//! assembly carries its parts along.

use glam::{Quat, Vec3};
use stereo_core::{GrabScene, Pose, RayHit};

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    local_position: Vec3,
    local_rotation: Quat,
    /// Zero for grouping nodes, which the beam passes through.
    radius: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SphereScene {
    nodes: Vec<Node>,
}

impl SphereScene {
    /// An assembly of two parts straddling the stylus beam, plus a loose
    /// ball further out to one side.
    pub fn in_front_of(stylus: &Pose, viewer_scale: f32) -> Self {
        let forward = stylus.direction();
        let up = stylus.rotation() * Vec3::Y;
        let at = |distance: f32| stylus.position() + forward * distance * viewer_scale;

        let mut scene = Self::default();
        let assembly = scene.add(None, at(0.15), stylus.rotation(), 0.0);
        scene.add(Some(assembly), Vec3::ZERO, Quat::IDENTITY, 0.02 * viewer_scale);
        scene.add(
            Some(assembly),
            Vec3::new(0.0, 0.04 * viewer_scale, 0.0),
            Quat::IDENTITY,
            0.015 * viewer_scale,
        );
        let loose = at(0.25) + up * 0.08 * viewer_scale;
        scene.add(None, loose, Quat::IDENTITY, 0.03 * viewer_scale);
        tracing::info!(objects = scene.nodes.len(), "Scene placed in front of the stylus");
        scene
    }

    /// Adds a node whose transform is given relative to `parent`.
    pub fn add(
        &mut self,
        parent: Option<usize>,
        position: Vec3,
        rotation: Quat,
        radius: f32,
    ) -> usize {
        self.nodes.push(Node {
            parent: parent.filter(|&p| p < self.nodes.len()),
            local_position: position,
            local_rotation: rotation,
            radius,
        });
        self.nodes.len() - 1
    }

    fn world(&self, id: usize) -> (Vec3, Quat) {
        let node = &self.nodes[id];
        match node.parent {
            Some(parent) => {
                let (position, rotation) = self.world(parent);
                (
                    position + rotation * node.local_position,
                    rotation * node.local_rotation,
                )
            }
            None => (node.local_position, node.local_rotation),
        }
    }
}

impl GrabScene for SphereScene {
    type ObjectId = usize;

    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit<usize>> {
        let mut closest: Option<RayHit<usize>> = None;
        for (object, node) in self.nodes.iter().enumerate() {
            if node.radius <= 0.0 {
                continue;
            }
            let (center, _) = self.world(object);
            let to_center = center - origin;
            let along = to_center.dot(direction);
            let miss = to_center.length_squared() - along * along;
            let radius_sq = node.radius * node.radius;
            if miss > radius_sq {
                continue;
            }
            let distance = along - (radius_sq - miss).sqrt();
            if distance >= 0.0 && closest.map_or(true, |hit| distance < hit.distance) {
                closest = Some(RayHit { object, distance });
            }
        }
        closest
    }

    fn object_transform(&self, object: usize) -> Option<(Vec3, Quat)> {
        (object < self.nodes.len()).then(|| self.world(object))
    }

    fn set_object_transform(&mut self, object: usize, position: Vec3, rotation: Quat) {
        let Some(parent) = self.nodes.get(object).map(|node| node.parent) else {
            return;
        };
        let (parent_position, parent_rotation) = match parent {
            Some(parent) => self.world(parent),
            None => (Vec3::ZERO, Quat::IDENTITY),
        };
        let to_parent = parent_rotation.inverse();
        let node = &mut self.nodes[object];
        node.local_position = to_parent * (position - parent_position);
        node.local_rotation = (to_parent * rotation).normalize();
    }

    fn root_of(&self, object: usize) -> usize {
        let mut id = object;
        while let Some(parent) = self.nodes.get(id).and_then(|node| node.parent) {
            id = parent;
        }
        id
    }
}
