use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use nalgebra::{Matrix4, Point3, Rotation3};
use russimp::node::Node;
use russimp::scene::{PostProcess, Scene as ImportedScene};
use russimp::Matrix4x4;

use super::HostError;
use crate::scene::{MeshData, ObjectData, Scene, SceneObject};

/// Which axis points up in the source file.
///
/// Turntables spin about +Z, so Y-up content is tipped over onto Z-up on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    fn correction(&self) -> Matrix4<f32> {
        match self {
            UpAxis::Y => Rotation3::from_euler_angles(FRAC_PI_2, 0.0, 0.0).to_homogeneous(),
            UpAxis::Z => Matrix4::identity(),
        }
    }
}

/// Imports a model file into a fresh [`Scene`].
///
/// Every node that references meshes becomes one mesh object. Node transforms
/// are baked into the vertices, so imported objects sit at the origin with an
/// identity transform.
pub(crate) fn load_scene(path: &Path, up_axis: UpAxis) -> Result<Scene, HostError> {
    let import_error = |reason: String| HostError::Import {
        path: path.to_path_buf(),
        reason,
    };
    if !path.exists() {
        return Err(import_error("the file does not exist on disk".to_string()));
    }
    let path_str = path
        .to_str()
        .ok_or_else(|| import_error("the path is not valid UTF-8".to_string()))?;

    let imported = ImportedScene::from_file(
        path_str,
        vec![
            PostProcess::Triangulate,
            PostProcess::JoinIdenticalVertices,
            PostProcess::SortByPrimitiveType,
        ],
    )
    .map_err(|e| import_error(e.to_string()))?;

    let mut scene = Scene::new();
    let correction = up_axis.correction();
    match &imported.root {
        Some(root) => visit(&imported, root, correction, &mut scene),
        None => {
            for (i, source) in imported.meshes.iter().enumerate() {
                let mut mesh = MeshData::default();
                append_mesh(&mut mesh, source, &correction);
                scene.link(SceneObject::new(
                    object_name(&source.name, i),
                    ObjectData::Mesh(mesh),
                ));
            }
        }
    }
    log::debug!("Imported {} objects from {}", scene.len(), path.display());
    Ok(scene)
}

fn visit(imported: &ImportedScene, node: &Node, parent: Matrix4<f32>, scene: &mut Scene) {
    let world = parent * to_matrix(&node.transformation);

    if !node.meshes.is_empty() {
        let mut mesh = MeshData::default();
        for &index in &node.meshes {
            match imported.meshes.get(index as usize) {
                Some(source) => append_mesh(&mut mesh, source, &world),
                None => log::warn!("Node {} references missing mesh {}", node.name, index),
            }
        }
        let name = object_name(&node.name, scene.len());
        scene.link(SceneObject::new(name, ObjectData::Mesh(mesh)));
    }

    for child in node.children.borrow().iter() {
        visit(imported, child, world, scene);
    }
}

fn append_mesh(target: &mut MeshData, source: &russimp::mesh::Mesh, transform: &Matrix4<f32>) {
    let offset = target.vertices.len() as u32;
    target.vertices.extend(
        source
            .vertices
            .iter()
            .map(|v| transform.transform_point(&Point3::new(v.x, v.y, v.z))),
    );
    target.faces.extend(
        source
            .faces
            .iter()
            .filter(|face| face.0.len() == 3)
            .map(|face| [face.0[0] + offset, face.0[1] + offset, face.0[2] + offset]),
    );
}

fn object_name(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("Object.{:03}", index)
    } else {
        name.to_string()
    }
}

/// Assimp matrices are row major.
fn to_matrix(m: &Matrix4x4) -> Matrix4<f32> {
    Matrix4::new(
        m.a1, m.a2, m.a3, m.a4, m.b1, m.b2, m.b3, m.b4, m.c1, m.c2, m.c3, m.c4, m.d1, m.d2, m.d3,
        m.d4,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn y_up_content_is_tipped_onto_z() {
        let up = UpAxis::Y
            .correction()
            .transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(up, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_eq!(UpAxis::Z.correction(), Matrix4::identity());
    }

    #[test]
    fn missing_file_is_an_import_error() {
        let err = load_scene(Path::new("/definitely/not/here.glb"), UpAxis::Y).unwrap_err();
        assert!(matches!(err, HostError::Import { .. }));
    }

    #[test]
    fn unnamed_nodes_get_numbered_names() {
        assert_eq!(object_name("", 7), "Object.007");
        assert_eq!(object_name("Horse", 7), "Horse");
    }
}
