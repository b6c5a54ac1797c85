//! Scenes
//!
//! A scene is the set of renderables a view can draw. Entities are stored in
//! a slotmap so handles stay cheap to copy and stale handles fail lookups
//! instead of aliasing a recycled slot.

use slotmap::SlotMap;

use crate::foundation::math::Mat4;
use crate::render::mesh::MeshHandle;

slotmap::new_key_type! {
    /// Handle to an entity added to a scene.
    pub struct EntityKey;
}

/// A single drawable: a GPU mesh with a model transform and base color.
#[derive(Debug, Clone)]
pub struct Renderable {
    /// The engine mesh to draw.
    pub mesh: MeshHandle,
    /// Model-to-world transform.
    pub transform: Mat4,
    /// Base color in linear RGBA.
    pub base_color: [f32; 4],
}

impl Renderable {
    /// Create a renderable with an identity transform and a neutral color.
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            transform: Mat4::identity(),
            base_color: [0.8, 0.8, 0.8, 1.0],
        }
    }

    /// Set the model transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set the base color.
    pub fn with_base_color(mut self, base_color: [f32; 4]) -> Self {
        self.base_color = base_color;
        self
    }
}

/// The set of renderables drawn by a view.
#[derive(Debug, Default)]
pub struct Scene {
    renderables: SlotMap<EntityKey, Renderable>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderable to the scene.
    pub fn add_entity(&mut self, renderable: Renderable) -> EntityKey {
        self.renderables.insert(renderable)
    }

    /// Remove a renderable, returning it if the key was live.
    pub fn remove_entity(&mut self, key: EntityKey) -> Option<Renderable> {
        self.renderables.remove(key)
    }

    /// Mutable access to a renderable.
    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut Renderable> {
        self.renderables.get_mut(key)
    }

    /// Number of renderables in the scene.
    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    /// Whether the scene holds no renderables.
    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityKey, &Renderable)> {
        self.renderables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_handle() -> MeshHandle {
        // A default key is never live; fine for bookkeeping tests.
        MeshHandle::default()
    }

    #[test]
    fn add_and_remove_entities() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());

        let key = scene.add_entity(Renderable::new(mesh_handle()));
        assert_eq!(scene.len(), 1);

        let removed = scene.remove_entity(key);
        assert!(removed.is_some());
        assert!(scene.is_empty());
    }

    #[test]
    fn stale_keys_fail_lookups() {
        let mut scene = Scene::new();
        let key = scene.add_entity(Renderable::new(mesh_handle()));
        scene.remove_entity(key);

        assert!(scene.remove_entity(key).is_none());
        assert!(scene.entity_mut(key).is_none());
    }

    #[test]
    fn builder_style_setters_apply() {
        let transform = Mat4::new_scaling(2.0);
        let renderable = Renderable::new(mesh_handle())
            .with_transform(transform)
            .with_base_color([1.0, 0.0, 0.0, 1.0]);
        assert_eq!(renderable.transform, transform);
        assert_eq!(renderable.base_color, [1.0, 0.0, 0.0, 1.0]);
    }
}
