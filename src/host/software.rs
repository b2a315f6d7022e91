use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use nalgebra::{Matrix4, Point3, Vector3};

use super::loader::{self, UpAxis};
use super::{HostError, SceneHost, Visibility, raster};
use crate::render::{ColorMode, FileFormat, RenderEngine, RenderSettings};
use crate::scene::{CameraData, LightData, ObjectData, ObjectId, ObjectKind, Scene, SceneObject};

/// A self-contained [`SceneHost`]: an in-memory [`Scene`] filled from model
/// files, drawn by a CPU rasterizer and written out with the `image` crate.
#[derive(Debug, Clone)]
pub struct SoftwareHost {
    scene: Scene,
    engines: Vec<RenderEngine>,
    up_axis: UpAxis,
    settings: Option<RenderSettings>,
}

impl Default for SoftwareHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareHost {
    pub fn new() -> Self {
        Self::from_scene(Scene::new())
    }

    /// Wraps an already built scene, e.g. one assembled in code.
    pub fn from_scene(scene: Scene) -> Self {
        Self {
            scene,
            engines: vec![RenderEngine::EeveeNext, RenderEngine::Eevee],
            up_axis: UpAxis::default(),
            settings: None,
        }
    }

    /// Restricts which render engines this host claims to support.
    ///
    /// Default: both real-time engines
    pub fn with_engines(mut self, engines: Vec<RenderEngine>) -> Self {
        self.engines = engines;
        self
    }

    /// Up axis assumed for files opened through [`SceneHost::open_scene`].
    ///
    /// Default: [`UpAxis::Y`]
    pub fn with_up_axis(mut self, up_axis: UpAxis) -> Self {
        self.up_axis = up_axis;
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The settings the next [`SceneHost::render_still`] will use.
    pub fn render_settings(&self) -> Option<&RenderSettings> {
        self.settings.as_ref()
    }

    fn object(&self, id: ObjectId) -> Result<&SceneObject, HostError> {
        self.scene.get(id).ok_or(HostError::UnknownObject(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject, HostError> {
        self.scene.get_mut(id).ok_or(HostError::UnknownObject(id))
    }

    fn write_image(image: image::RgbaImage, settings: &RenderSettings) -> Result<(), HostError> {
        let path: &Path = &settings.filepath;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let format = match settings.file_format {
            FileFormat::Png => ImageFormat::Png,
        };
        match settings.color_mode {
            ColorMode::Rgba => image.save_with_format(path, format)?,
            ColorMode::Rgb => DynamicImage::ImageRgba8(image)
                .to_rgb8()
                .save_with_format(path, format)?,
        }
        Ok(())
    }
}

impl SceneHost for SoftwareHost {
    fn open_scene(&mut self, path: &Path) -> Result<(), HostError> {
        self.scene = loader::load_scene(path, self.up_axis)?;
        self.settings = None;
        Ok(())
    }

    fn ensure_object_mode(&mut self) -> Result<(), HostError> {
        // There is no edit mode in an in-memory scene
        Ok(())
    }

    fn objects(&self) -> Vec<ObjectId> {
        self.scene.ids().collect()
    }

    fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.scene.find(name)
    }

    fn object_name(&self, id: ObjectId) -> Result<String, HostError> {
        Ok(self.object(id)?.name.clone())
    }

    fn object_kind(&self, id: ObjectId) -> Result<ObjectKind, HostError> {
        Ok(self.object(id)?.kind())
    }

    fn vertex_count(&self, id: ObjectId) -> Result<usize, HostError> {
        let object = self.object(id)?;
        object
            .mesh()
            .map(|mesh| mesh.vertices.len())
            .ok_or_else(|| HostError::NotAMesh(object.name.clone()))
    }

    fn world_matrix(&self, id: ObjectId) -> Result<Matrix4<f32>, HostError> {
        let object = self.object(id)?;
        self.scene
            .world_matrix(id)
            .ok_or_else(|| HostError::BrokenHierarchy(object.name.clone()))
    }

    fn bound_box(&self, id: ObjectId) -> Result<[Point3<f32>; 8], HostError> {
        let object = self.object(id)?;
        let mesh = object
            .mesh()
            .ok_or_else(|| HostError::NotAMesh(object.name.clone()))?;
        mesh.bound_box()
            .ok_or_else(|| HostError::EmptyMesh(object.name.clone()))
    }

    fn create_camera(&mut self, name: &str) -> Result<ObjectId, HostError> {
        Ok(self.scene.link(SceneObject::new(
            name,
            ObjectData::Camera(CameraData::default()),
        )))
    }

    fn create_empty(&mut self, name: &str) -> Result<ObjectId, HostError> {
        Ok(self.scene.link(SceneObject::new(name, ObjectData::Empty)))
    }

    fn create_light(&mut self, name: &str, light: LightData) -> Result<ObjectId, HostError> {
        Ok(self.scene.link(SceneObject::new(name, ObjectData::Light(light))))
    }

    fn set_location(&mut self, id: ObjectId, location: Vector3<f32>) -> Result<(), HostError> {
        self.object_mut(id)?.location = location;
        Ok(())
    }

    fn set_rotation_euler(
        &mut self,
        id: ObjectId,
        rotation: Vector3<f32>,
    ) -> Result<(), HostError> {
        self.object_mut(id)?.rotation_euler = rotation;
        Ok(())
    }

    fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> Result<(), HostError> {
        if let Some(parent) = parent {
            let parent_name = self.object(parent)?.name.clone();
            if self.scene.is_ancestor(id, parent) {
                return Err(HostError::ParentCycle {
                    child: self.object(id)?.name.clone(),
                    parent: parent_name,
                });
            }
        }
        self.object_mut(id)?.parent = parent;
        Ok(())
    }

    fn set_visibility(&mut self, id: ObjectId, visibility: Visibility) -> Result<(), HostError> {
        let object = self.object_mut(id)?;
        object.hide_render = !visibility.render;
        object.hide_viewport = !visibility.viewport;
        Ok(())
    }

    fn set_active_camera(&mut self, id: ObjectId) -> Result<(), HostError> {
        if self.object(id)?.kind() != ObjectKind::Camera {
            return Err(HostError::NoActiveCamera);
        }
        self.scene.active_camera = Some(id);
        Ok(())
    }

    fn supports_engine(&self, engine: RenderEngine) -> bool {
        self.engines.contains(&engine)
    }

    fn configure_render(&mut self, settings: &RenderSettings) -> Result<(), HostError> {
        if !self.supports_engine(settings.engine) {
            return Err(HostError::UnsupportedEngine(settings.engine.name()));
        }
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn render_still(&mut self) -> Result<PathBuf, HostError> {
        let settings = self.settings.as_ref().ok_or(HostError::NotConfigured)?;
        let image = raster::render_frame(&self.scene, settings)?;
        Self::write_image(image, settings)?;
        Ok(settings.filepath.clone())
    }
}
