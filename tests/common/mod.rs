#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, Point3, Vector3};
use turntable_preview::render::{RenderEngine, RenderSettings};
use turntable_preview::scene::{LightData, MeshData, ObjectId, ObjectKind, Scene};
use turntable_preview::{HostError, SceneHost, SoftwareHost, Visibility};

/// Wraps a [`SoftwareHost`], recording pivot turns and failing chosen frames.
pub struct RecordingHost {
    pub inner: SoftwareHost,
    /// Frame indices (from the output file name) whose render fails.
    pub fail_frames: HashSet<usize>,
    /// Every Z rotation given to an empty, in order.
    pub pivot_angles: Vec<f32>,
    /// Every render attempted, by output path.
    pub render_attempts: Vec<PathBuf>,
}

impl RecordingHost {
    pub fn new(inner: SoftwareHost) -> Self {
        Self {
            inner,
            fail_frames: HashSet::new(),
            pivot_angles: Vec::new(),
            render_attempts: Vec::new(),
        }
    }

    pub fn failing(mut self, frames: &[usize]) -> Self {
        self.fail_frames.extend(frames);
        self
    }
}

impl SceneHost for RecordingHost {
    fn open_scene(&mut self, path: &Path) -> Result<(), HostError> {
        self.inner.open_scene(path)
    }

    fn ensure_object_mode(&mut self) -> Result<(), HostError> {
        self.inner.ensure_object_mode()
    }

    fn objects(&self) -> Vec<ObjectId> {
        self.inner.objects()
    }

    fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.inner.find_object(name)
    }

    fn object_name(&self, id: ObjectId) -> Result<String, HostError> {
        self.inner.object_name(id)
    }

    fn object_kind(&self, id: ObjectId) -> Result<ObjectKind, HostError> {
        self.inner.object_kind(id)
    }

    fn vertex_count(&self, id: ObjectId) -> Result<usize, HostError> {
        self.inner.vertex_count(id)
    }

    fn world_matrix(&self, id: ObjectId) -> Result<Matrix4<f32>, HostError> {
        self.inner.world_matrix(id)
    }

    fn bound_box(&self, id: ObjectId) -> Result<[Point3<f32>; 8], HostError> {
        self.inner.bound_box(id)
    }

    fn create_camera(&mut self, name: &str) -> Result<ObjectId, HostError> {
        self.inner.create_camera(name)
    }

    fn create_empty(&mut self, name: &str) -> Result<ObjectId, HostError> {
        self.inner.create_empty(name)
    }

    fn create_light(&mut self, name: &str, light: LightData) -> Result<ObjectId, HostError> {
        self.inner.create_light(name, light)
    }

    fn set_location(&mut self, id: ObjectId, location: Vector3<f32>) -> Result<(), HostError> {
        self.inner.set_location(id, location)
    }

    fn set_rotation_euler(
        &mut self,
        id: ObjectId,
        rotation: Vector3<f32>,
    ) -> Result<(), HostError> {
        if self.inner.object_kind(id)? == ObjectKind::Empty {
            self.pivot_angles.push(rotation.z);
        }
        self.inner.set_rotation_euler(id, rotation)
    }

    fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> Result<(), HostError> {
        self.inner.set_parent(id, parent)
    }

    fn set_visibility(&mut self, id: ObjectId, visibility: Visibility) -> Result<(), HostError> {
        self.inner.set_visibility(id, visibility)
    }

    fn set_active_camera(&mut self, id: ObjectId) -> Result<(), HostError> {
        self.inner.set_active_camera(id)
    }

    fn supports_engine(&self, engine: RenderEngine) -> bool {
        self.inner.supports_engine(engine)
    }

    fn configure_render(&mut self, settings: &RenderSettings) -> Result<(), HostError> {
        self.inner.configure_render(settings)
    }

    fn render_still(&mut self) -> Result<PathBuf, HostError> {
        let path = self
            .inner
            .render_settings()
            .map(|s| s.filepath.clone())
            .ok_or(HostError::NotConfigured)?;
        self.render_attempts.push(path.clone());
        let index = frame_index(&path);
        if index.is_some_and(|i| self.fail_frames.contains(&i)) {
            return Err(HostError::Io(std::io::Error::other("injected render failure")));
        }
        self.inner.render_still()
    }
}

/// Index parsed back out of a `frame_NNN.png` path.
pub fn frame_index(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("frame_")?
        .parse()
        .ok()
}

pub fn cube(min: [f32; 3], max: [f32; 3]) -> MeshData {
    MeshData::cuboid(Point3::from(min), Point3::from(max))
}

/// A scene of centred cubes, one per half-size given.
pub fn cubes_scene(half_sizes: &[f32]) -> Scene {
    let mut scene = Scene::new();
    for (i, &h) in half_sizes.iter().enumerate() {
        scene.add_mesh(
            format!("Cube.{:03}", i),
            cube([-h, -h, -h], [h, h, h]),
            Vector3::new(i as f32 * 10.0, 0.0, 0.0),
        );
    }
    scene
}

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "turntable_preview_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn png_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}
