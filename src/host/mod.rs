//! The seam between turntable sequencing and whatever owns the scene.
//!
//! Everything the turntable needs from a 3D application goes through
//! [`SceneHost`]: scene loading, object queries, object creation, transform
//! edits, visibility and rendering. Objects are always addressed through
//! explicit [`ObjectId`] handles; there is no "active object" state.

pub(crate) mod loader;
pub(crate) mod raster;
mod software;

use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::render::{RenderEngine, RenderSettings};
use crate::scene::{LightData, ObjectId, ObjectKind};

pub use loader::UpAxis;
pub use software::SoftwareHost;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("object [{0}] is not a mesh")]
    NotAMesh(String),
    #[error("object [{0}] has no geometry")]
    EmptyMesh(String),
    #[error("object [{0}] has a broken parent chain")]
    BrokenHierarchy(String),
    #[error("parenting [{child}] to [{parent}] would create a cycle")]
    ParentCycle { child: String, parent: String },
    #[error("failed to import scene [{}]: {reason}", .path.display())]
    Import { path: PathBuf, reason: String },
    #[error("render engine {0} is not available")]
    UnsupportedEngine(&'static str),
    #[error("render settings have not been configured")]
    NotConfigured,
    #[error("scene has no active camera")]
    NoActiveCamera,
    #[error("a {width}x{height} frame is too large to render")]
    FrameTooLarge { width: u32, height: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Render and viewport visibility of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub render: bool,
    pub viewport: bool,
}

impl Visibility {
    pub const VISIBLE: Visibility = Visibility {
        render: true,
        viewport: true,
    };
    pub const HIDDEN: Visibility = Visibility {
        render: false,
        viewport: false,
    };
}

/// Operations a 3D application must expose to be driven as a turntable.
pub trait SceneHost {
    /// Replaces the current scene with the one stored at `path`.
    fn open_scene(&mut self, path: &Path) -> Result<(), HostError>;

    /// Leaves any edit mode so object level edits are allowed.
    fn ensure_object_mode(&mut self) -> Result<(), HostError>;

    /// Every object in the scene, in enumeration order.
    fn objects(&self) -> Vec<ObjectId>;

    fn find_object(&self, name: &str) -> Option<ObjectId>;

    fn object_name(&self, id: ObjectId) -> Result<String, HostError>;

    fn object_kind(&self, id: ObjectId) -> Result<ObjectKind, HostError>;

    /// Number of vertices of a mesh object.
    fn vertex_count(&self, id: ObjectId) -> Result<usize, HostError>;

    /// Object-to-world transform.
    fn world_matrix(&self, id: ObjectId) -> Result<Matrix4<f32>, HostError>;

    /// Corners of the object's local bounding box.
    fn bound_box(&self, id: ObjectId) -> Result<[Point3<f32>; 8], HostError>;

    fn create_camera(&mut self, name: &str) -> Result<ObjectId, HostError>;

    fn create_empty(&mut self, name: &str) -> Result<ObjectId, HostError>;

    fn create_light(&mut self, name: &str, light: LightData) -> Result<ObjectId, HostError>;

    fn set_location(&mut self, id: ObjectId, location: Vector3<f32>) -> Result<(), HostError>;

    /// Sets the XYZ Euler rotation, in radians.
    fn set_rotation_euler(&mut self, id: ObjectId, rotation: Vector3<f32>)
    -> Result<(), HostError>;

    fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> Result<(), HostError>;

    fn set_visibility(&mut self, id: ObjectId, visibility: Visibility) -> Result<(), HostError>;

    fn set_active_camera(&mut self, id: ObjectId) -> Result<(), HostError>;

    /// Feature detection for render engines.
    fn supports_engine(&self, engine: RenderEngine) -> bool;

    fn configure_render(&mut self, settings: &RenderSettings) -> Result<(), HostError>;

    /// Renders the active camera with the configured settings and writes the
    /// image to the configured file path. Blocks until the file is written.
    fn render_still(&mut self) -> Result<PathBuf, HostError>;
}
