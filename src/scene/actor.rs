use std::sync::Arc;

use crate::resources::{Aabb, Material, Mesh};

/// Geometry plus the material it is shaded with.
#[derive(Debug, Clone)]
pub struct Model {
    pub mesh: Arc<dyn Mesh>,
    pub material: Material,
}

impl Model {
    #[must_use]
    pub fn new(mesh: Arc<dyn Mesh>, material: Material) -> Self {
        Self { mesh, material }
    }
}

/// A traceable scene object.
///
/// The bounding box is taken from the mesh once on construction; the tracer
/// uses it to reject rays before asking the mesh for a closest hit.
#[derive(Debug, Clone)]
pub struct Actor {
    pub name: String,
    model: Model,
    bounding_box: Aabb,
}

impl Actor {
    #[must_use]
    pub fn new(name: impl Into<String>, mesh: impl Mesh + 'static, material: Material) -> Self {
        Self::from_model(name, Model::new(Arc::new(mesh), material))
    }

    #[must_use]
    pub fn from_model(name: impl Into<String>, model: Model) -> Self {
        let bounding_box = model.mesh.bounding_box();
        Self {
            name: name.into(),
            model,
            bounding_box,
        }
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &dyn Mesh {
        self.model.mesh.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> &Material {
        &self.model.material
    }

    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }
}
