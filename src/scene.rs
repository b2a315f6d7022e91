//! The in-memory scene graph backing [`crate::host::SoftwareHost`].
//!
//! Objects live in a flat arena and refer to each other through [`ObjectId`]
//! handles. Transforms follow the usual Z-up convention: location, XYZ Euler
//! rotation (radians) and scale, composed as `T * R * S` and chained through
//! parents.

use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

/// Handle to an object stored in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Directional light, shining along its local -Z axis.
    Sun,
    /// Rectangular area light, emitting along its local -Z axis.
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    pub kind: LightKind,
    pub energy: f32,
    /// Physical size of the emitter. Ignored for suns.
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Focal length in millimetres
    pub lens: f32,
    /// Sensor width in millimetres
    pub sensor_width: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            lens: 50.0,
            sensor_width: 36.0,
        }
    }
}

impl CameraData {
    /// Full field of view across the sensor, in radians.
    pub fn field_of_view(&self) -> f32 {
        2.0 * (self.sensor_width / (2.0 * self.lens)).atan()
    }
}

/// Triangle soup in object-local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn new(vertices: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// An axis aligned box spanning `min` to `max`, with outward facing triangles.
    pub fn cuboid(min: Point3<f32>, max: Point3<f32>) -> Self {
        let vertices = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        let faces = vec![
            [0, 2, 1],
            [1, 2, 3],
            [4, 5, 6],
            [5, 7, 6],
            [0, 1, 4],
            [1, 5, 4],
            [2, 6, 3],
            [3, 6, 7],
            [0, 4, 2],
            [2, 4, 6],
            [1, 3, 5],
            [3, 7, 5],
        ];
        Self { vertices, faces }
    }

    /// The eight corners of the local bounding box, or `None` for an empty mesh.
    pub fn bound_box(&self) -> Option<[Point3<f32>; 8]> {
        let first = self.vertices.first()?;
        let (min, max) = self
            .vertices
            .iter()
            .fold((first.coords, first.coords), |(lo, hi), v| {
                (lo.inf(&v.coords), hi.sup(&v.coords))
            });
        Some(std::array::from_fn(|i| {
            Point3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Mesh(MeshData),
    Camera(CameraData),
    Light(LightData),
    Empty,
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
    pub location: Vector3<f32>,
    pub rotation_euler: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub parent: Option<ObjectId>,
    pub hide_render: bool,
    pub hide_viewport: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            data,
            location: Vector3::zeros(),
            rotation_euler: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            parent: None,
            hide_render: false,
            hide_viewport: false,
        }
    }

    pub fn with_location(mut self, location: Vector3<f32>) -> Self {
        self.location = location;
        self
    }

    pub fn with_rotation(mut self, rotation_euler: Vector3<f32>) -> Self {
        self.rotation_euler = rotation_euler;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn kind(&self) -> ObjectKind {
        match self.data {
            ObjectData::Mesh(_) => ObjectKind::Mesh,
            ObjectData::Camera(_) => ObjectKind::Camera,
            ObjectData::Light(_) => ObjectKind::Light,
            ObjectData::Empty => ObjectKind::Empty,
        }
    }

    pub fn mesh(&self) -> Option<&MeshData> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Local transform relative to the parent.
    pub fn matrix_basis(&self) -> Matrix4<f32> {
        let rotation = Rotation3::from_euler_angles(
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        );
        Matrix4::new_translation(&self.location)
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    pub active_camera: Option<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object to the scene and hands back its handle.
    pub fn link(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        mesh: MeshData,
        location: Vector3<f32>,
    ) -> ObjectId {
        self.link(SceneObject::new(name, ObjectData::Mesh(mesh)).with_location(location))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object handles in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        (0..self.objects.len()).map(ObjectId)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(ObjectId)
    }

    /// Object-to-world transform, following the parent chain.
    ///
    /// Returns `None` for an unknown handle, a dangling parent or a parent cycle.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Matrix4<f32>> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(cur) = current {
            if hops > self.objects.len() {
                return None;
            }
            let object = self.get(cur)?;
            matrix = object.matrix_basis() * matrix;
            current = object.parent;
            hops += 1;
        }
        Some(matrix)
    }

    /// True when `ancestor` appears in the parent chain of `id` (or is `id`).
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            if hops > self.objects.len() {
                return false;
            }
            current = self.get(cur).and_then(|o| o.parent);
            hops += 1;
        }
        false
    }
}
