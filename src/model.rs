//! 3D model decoding
//!
//! Turns GLB / glTF bytes into a [`LoadedModel`]: a per-primitive mesh summary
//! plus scene-space bounds, which the materializer uses to fit the model to a
//! uniform display size.

use glam::{Mat4, Vec3};
use thiserror::Error;

/// Type of primitive to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Error type for model loading operations
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("GLTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Model contains no geometry")]
    Empty,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}

/// Summary of one mesh primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitive_type: PrimitiveType,
    pub vertex_count: usize,
    pub index_count: usize,
    pub material_index: Option<usize>,
}

/// Represents a decoded 3D model
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub meshes: Vec<Mesh>,
    pub material_count: usize,
    pub node_count: usize,
    /// Bounds of the default scene with node transforms applied
    pub bounds: Aabb,
    /// Size of the source bytes
    pub byte_size: usize,
}

impl LoadedModel {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertex_count).sum()
    }

    /// Uniform scale that makes the largest extent equal `target`
    pub fn normalization_scale(&self, target: f32) -> f32 {
        let extent = self.bounds.max_extent();
        if extent > f32::EPSILON && extent.is_finite() {
            target / extent
        } else {
            1.0
        }
    }
}

/// Decodes model bytes
#[derive(Debug, Default, Clone)]
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decode bytes tagged with `format` (`glb` or `gltf`)
    pub fn load(&self, data: &[u8], format: &str) -> Result<LoadedModel, ModelError> {
        match format.to_ascii_lowercase().as_str() {
            "glb" | "gltf" => self.load_gltf(data),
            other => Err(ModelError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Decode a GLB container or self-contained glTF JSON
    pub fn load_gltf(&self, data: &[u8]) -> Result<LoadedModel, ModelError> {
        if data.is_empty() {
            return Err(ModelError::LoadError("empty model data".to_string()));
        }

        let (document, buffers, _images) = gltf::import_slice(data)?;

        log::debug!(
            "Parsed glTF with {} meshes and {} materials",
            document.meshes().len(),
            document.materials().len()
        );

        let mut meshes = Vec::new();
        for (mesh_idx, mesh) in document.meshes().enumerate() {
            for (prim_idx, primitive) in mesh.primitives().enumerate() {
                let primitive_type = match primitive.mode() {
                    gltf::mesh::Mode::Points => PrimitiveType::Points,
                    gltf::mesh::Mode::Lines => PrimitiveType::Lines,
                    gltf::mesh::Mode::LineLoop => {
                        log::warn!("Line loop primitive mode is not supported, converting to line strip");
                        PrimitiveType::LineStrip
                    }
                    gltf::mesh::Mode::LineStrip => PrimitiveType::LineStrip,
                    gltf::mesh::Mode::Triangles => PrimitiveType::Triangles,
                    gltf::mesh::Mode::TriangleStrip => PrimitiveType::TriangleStrip,
                    gltf::mesh::Mode::TriangleFan => PrimitiveType::TriangleFan,
                };

                let reader = primitive.reader(|buffer| {
                    buffers.get(buffer.index()).map(|data| data.0.as_slice())
                });

                let vertex_count = reader
                    .read_positions()
                    .ok_or_else(|| {
                        let err =
                            format!("Mesh {mesh_idx} primitive {prim_idx} is missing positions");
                        log::error!("{err}");
                        ModelError::LoadError(err)
                    })?
                    .count();

                let index_count = reader
                    .read_indices()
                    .map(|indices| indices.into_u32().count())
                    .unwrap_or(vertex_count);

                meshes.push(Mesh {
                    name: mesh.name().map(str::to_string),
                    primitive_type,
                    vertex_count,
                    index_count,
                    material_index: primitive.material().index(),
                });
            }
        }

        if meshes.is_empty() {
            return Err(ModelError::Empty);
        }

        let mut bounds = Aabb::empty();
        let roots: Vec<gltf::Node> = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().collect(),
            None => document.nodes().collect(),
        };
        for node in roots {
            extend_bounds(&node, Mat4::IDENTITY, &buffers, &mut bounds);
        }
        if !bounds.is_valid() {
            // Meshes exist but no node instantiates them
            log::debug!("No mesh nodes in scene, using raw primitive bounds");
            for mesh in document.meshes() {
                extend_mesh_bounds(&mesh, Mat4::IDENTITY, &buffers, &mut bounds);
            }
        }
        if !bounds.is_valid() {
            return Err(ModelError::Empty);
        }

        Ok(LoadedModel {
            meshes,
            material_count: document.materials().len(),
            node_count: document.nodes().len(),
            bounds,
            byte_size: data.len(),
        })
    }
}

fn extend_bounds(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Aabb,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        extend_mesh_bounds(&mesh, world, buffers, bounds);
    }
    for child in node.children() {
        extend_bounds(&child, world, buffers, bounds);
    }
}

fn extend_mesh_bounds(
    mesh: &gltf::Mesh,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    bounds: &mut Aabb,
) {
    for primitive in mesh.primitives() {
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        if let Some(positions) = reader.read_positions() {
            for position in positions {
                bounds.extend(world.transform_point3(Vec3::from(position)));
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_triangle_glb() {
        let model = ModelLoader::new().load(&fixtures::triangle_glb(2.0), "glb").unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].name.as_deref(), Some("tri"));
        assert_eq!(model.meshes[0].primitive_type, PrimitiveType::Triangles);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.bounds.max_extent(), 2.0);
        assert_eq!(model.normalization_scale(1.0), 0.5);
    }

    #[test]
    fn test_empty_data_fails() {
        assert!(ModelLoader::new().load(&[], "glb").is_err());
    }

    #[test]
    fn test_garbage_fails() {
        let result = ModelLoader::new().load(b"definitely not a model", "glb");
        assert!(matches!(result, Err(ModelError::Gltf(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ModelLoader::new().load(&fixtures::triangle_glb(1.0), "fbx");
        assert!(matches!(result, Err(ModelError::UnsupportedFormat(f)) if f == "fbx"));
    }
}
