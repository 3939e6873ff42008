/// Scene graph holding lights and at most one model
use crate::material::{AmbientLight, Color, Lighting, PointLight};
use crate::model::Model;

/// Handle of a node inside a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug)]
pub enum Node {
    Model(Model),
    AmbientLight(AmbientLight),
    PointLight(PointLight),
}

/// Mutable container of visual nodes drawn each frame
pub trait SceneHost {
    fn add(&mut self, node: Node) -> NodeId;
    fn remove(&mut self, id: NodeId) -> Option<Node>;
}

#[derive(Debug)]
pub struct Scene {
    nodes: Vec<(NodeId, Node)>,
    next_id: u64,
    pub background: Color,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
            background,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes().find(|(node_id, _)| *node_id == id).map(|(_, node)| node)
    }

    pub fn models(&self) -> impl Iterator<Item = (NodeId, &Model)> {
        self.nodes().filter_map(|(id, node)| match node {
            Node::Model(model) => Some((id, model)),
            _ => None,
        })
    }

    pub fn model_count(&self) -> usize {
        self.models().count()
    }

    /// Lights currently in the scene
    pub fn lighting(&self) -> Lighting {
        let mut lighting = Lighting::default();
        for (_, node) in self.nodes() {
            match node {
                Node::AmbientLight(light) => lighting.ambient.push(*light),
                Node::PointLight(light) => lighting.points.push(*light),
                Node::Model(_) => {}
            }
        }
        lighting
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Color::from_hex(0xffffff))
    }
}

impl SceneHost for Scene {
    fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(index).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_add_remove() {
        let mut scene = Scene::default();
        let ambient = scene.add(Node::AmbientLight(AmbientLight {
            color: Color::from_hex(0x444444),
        }));
        let point = scene.add(Node::PointLight(PointLight {
            color: Color::from_hex(0xffffff),
            position: Point3::new(0.0, 50.0, 50.0),
            cast_shadow: true,
        }));
        assert_ne!(ambient, point);
        assert_eq!(scene.lighting().points.len(), 1);

        assert!(matches!(scene.remove(ambient), Some(Node::AmbientLight(_))));
        assert!(scene.remove(ambient).is_none());
        assert!(scene.get(point).is_some());
        assert!(scene.lighting().ambient.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = Scene::default();
        let light = Node::AmbientLight(AmbientLight {
            color: Color::from_hex(0x111111),
        });
        let first = scene.add(light);
        scene.remove(first);
        let second = scene.add(Node::AmbientLight(AmbientLight {
            color: Color::from_hex(0x111111),
        }));
        assert_ne!(first, second);
    }
}
