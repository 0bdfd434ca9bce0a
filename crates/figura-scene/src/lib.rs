pub mod bounds;
pub mod graph;
pub mod material;
pub mod math;
pub mod mesh;
pub mod pick;
pub mod skinning;
pub mod transform;

pub use bounds::Aabb;
pub use graph::{Light, LightKind, MeshNode, MeshRole, Node, NodeId, NodeKind, SceneGraph, Skin};
pub use material::{Material, MaterialHandle};
pub use math::{Mat4, Quat, Vec3};
pub use mesh::{GpuMeshId, GpuTextureId, MeshData, Primitive, SkinWeights};
pub use pick::{PickMesh, Ray, ray_intersect_triangle};
pub use transform::Transform;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} is no longer part of the scene")]
    StaleNode(NodeId),
    #[error("the scene root cannot be removed")]
    RootRemoval,
}

pub type Result<T> = std::result::Result<T, SceneError>;
