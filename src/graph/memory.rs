//! Headless in-memory scene graph
//!
//! Holds nodes in a flat map keyed by [`NodeId`]. Nothing is rendered; this is
//! the hidden scene used for off-screen preloading and for tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{NodeDesc, NodeId, NodeTransform, SceneError, SceneFactory, SceneGraph, SceneNode};

#[derive(Debug, Default)]
struct SceneState {
    nodes: HashMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneState {
    fn dispose(&mut self, node: NodeId) {
        if let Some(removed) = self.nodes.remove(&node) {
            for child in removed.children {
                self.dispose(child);
            }
        }
    }

    fn visit(&self, id: NodeId, visit: &mut dyn FnMut(NodeId, &SceneNode)) {
        if let Some(node) = self.nodes.get(&id) {
            visit(id, node);
            for child in &node.children {
                self.visit(*child, visit);
            }
        }
    }
}

/// Headless scene graph
#[derive(Debug, Default)]
pub struct MemoryScene {
    state: RwLock<SceneState>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a node, attached or not
    pub fn node(&self, id: NodeId) -> Option<SceneNode> {
        self.state.read().nodes.get(&id).cloned()
    }

    /// Number of nodes alive in the arena, attached or not
    pub fn allocated(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.state.read().roots.clone()
    }
}

impl SceneGraph for MemoryScene {
    fn create_node(&self, desc: NodeDesc) -> NodeId {
        let id = NodeId::new();
        self.state.write().nodes.insert(
            id,
            SceneNode {
                desc,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn add_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError> {
        let mut state = self.state.write();

        let child_node = state
            .nodes
            .get(&child)
            .ok_or(SceneError::UnknownNode(child))?;
        if child_node.parent.is_some() || state.roots.contains(&child) {
            return Err(SceneError::AlreadyAttached(child));
        }

        match parent {
            None => state.roots.push(child),
            Some(parent) => {
                state
                    .nodes
                    .get_mut(&parent)
                    .ok_or(SceneError::UnknownNode(parent))?
                    .children
                    .push(child);
                if let Some(node) = state.nodes.get_mut(&child) {
                    node.parent = Some(parent);
                }
            }
        }
        Ok(())
    }

    fn remove_child(&self, parent: Option<NodeId>, child: NodeId) -> Result<(), SceneError> {
        let mut state = self.state.write();

        match parent {
            None => {
                let index = state
                    .roots
                    .iter()
                    .position(|id| *id == child)
                    .ok_or(SceneError::UnknownNode(child))?;
                state.roots.remove(index);
            }
            Some(parent) => {
                let parent_node = state
                    .nodes
                    .get_mut(&parent)
                    .ok_or(SceneError::UnknownNode(parent))?;
                let index = parent_node
                    .children
                    .iter()
                    .position(|id| *id == child)
                    .ok_or(SceneError::NotAChild { parent, child })?;
                parent_node.children.remove(index);
            }
        }

        state.dispose(child);
        Ok(())
    }

    fn dispose_node(&self, node: NodeId) {
        let mut state = self.state.write();
        let attached = state.roots.contains(&node)
            || state.nodes.get(&node).map_or(false, |n| n.parent.is_some());
        if !attached {
            state.dispose(node);
        }
    }

    fn set_transform(&self, node: NodeId, transform: NodeTransform) -> Result<(), SceneError> {
        self.state
            .write()
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::UnknownNode(node))?
            .desc
            .transform = transform;
        Ok(())
    }

    fn transform(&self, node: NodeId) -> Option<NodeTransform> {
        self.state
            .read()
            .nodes
            .get(&node)
            .map(|n| n.desc.transform)
    }

    fn traverse(&self, visit: &mut dyn FnMut(NodeId, &SceneNode)) {
        let state = self.state.read();
        for root in &state.roots {
            state.visit(*root, visit);
        }
    }
}

/// Factory producing fresh [`MemoryScene`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySceneFactory;

impl SceneFactory for MemorySceneFactory {
    fn create(&self) -> Result<Arc<dyn SceneGraph>, SceneError> {
        Ok(Arc::new(MemoryScene::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_attach_and_traverse() {
        let scene = MemoryScene::new();
        let root = scene.create_node(NodeDesc::group("gallery").with_object_id("0x1"));
        let child = scene.create_node(NodeDesc::group("frame"));

        scene.add_child(None, root).unwrap();
        scene.add_child(Some(root), child).unwrap();

        let mut names = Vec::new();
        scene.traverse(&mut |_, node| names.push(node.desc.name.clone()));
        assert_eq!(names, vec!["gallery", "frame"]);

        assert_eq!(scene.find_by_name("frame"), Some(child));
        assert_eq!(scene.find_by_object_id("0x1"), Some(root));
        assert_eq!(scene.node(child).unwrap().parent, Some(root));
    }

    #[test]
    fn test_detached_nodes_are_not_traversed() {
        let scene = MemoryScene::new();
        let id = scene.create_node(NodeDesc::group("loose"));
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.allocated(), 1);
        assert_eq!(scene.find_by_name("loose"), None);
        assert!(scene.node(id).is_some());
    }

    #[test]
    fn test_remove_disposes_subtree() {
        let scene = MemoryScene::new();
        let root = scene.create_node(NodeDesc::group("root"));
        let child = scene.create_node(NodeDesc::group("child"));
        scene.add_child(None, root).unwrap();
        scene.add_child(Some(root), child).unwrap();

        scene.remove_child(None, root).unwrap();
        assert_eq!(scene.allocated(), 0);
        assert_eq!(
            scene.remove_child(None, root),
            Err(SceneError::UnknownNode(root))
        );
    }

    #[test]
    fn test_dispose_only_touches_detached_nodes() {
        let scene = MemoryScene::new();
        let loose = scene.create_node(NodeDesc::group("loose"));
        let part = scene.create_node(NodeDesc::group("part"));
        scene.add_child(Some(loose), part).unwrap();
        let live = scene.create_node(NodeDesc::group("live"));
        scene.add_child(None, live).unwrap();

        scene.dispose_node(live);
        scene.dispose_node(part);
        assert_eq!(scene.allocated(), 3);

        scene.dispose_node(loose);
        scene.dispose_node(NodeId::new());
        assert_eq!(scene.allocated(), 1);
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn test_double_attach_is_rejected() {
        let scene = MemoryScene::new();
        let node = scene.create_node(NodeDesc::group("n"));
        scene.add_child(None, node).unwrap();
        assert_eq!(
            scene.add_child(None, node),
            Err(SceneError::AlreadyAttached(node))
        );
    }

    #[test]
    fn test_set_transform() {
        let scene = MemoryScene::new();
        let node = scene.create_node(NodeDesc::group("n"));
        let transform = NodeTransform::at(Vec3::new(1.0, 2.0, 3.0)).with_uniform_scale(2.0);
        scene.set_transform(node, transform).unwrap();
        assert_eq!(scene.transform(node), Some(transform));

        let ghost = NodeId::new();
        assert_eq!(
            scene.set_transform(ghost, transform),
            Err(SceneError::UnknownNode(ghost))
        );
    }
}
