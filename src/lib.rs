pub mod cache;
pub mod host;
pub mod render;
pub mod rig;
pub mod scene;
pub mod sequencer;
pub mod survey;
pub mod visibility;
pub(crate) mod utils;

use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use thiserror::Error;

pub use host::{HostError, SceneHost, SoftwareHost, UpAxis, Visibility};
pub use rig::{Rig, RigRole};
pub use sequencer::Frame;
pub use survey::{FeaturedObject, MAX_FEATURED_OBJECTS};

use sequencer::SequenceConfig;

#[derive(Error, Debug)]
pub enum TurntableError {
    #[error("error opening file [{}]: {source}", .path.display())]
    SceneLoad { path: PathBuf, source: HostError },
    #[error("could not create output directory [{}]: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("scene host error: {0}")]
    Host(#[from] HostError),
}

#[derive(Clone, Debug)]
pub struct TurntableBuilder {
    pub output_dir: PathBuf,
    pub frame_count: usize,
    pub resolution: u32,
    pub max_featured: usize,
}

impl TurntableBuilder {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            frame_count: 24,
            resolution: 128,
            max_featured: MAX_FEATURED_OBJECTS,
        }
    }

    /// Total number of frames across all featured objects.
    ///
    /// Default: 24 if function not used
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Side length of the square frames, in pixels.
    ///
    /// Default: 128 if function not used
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution.max(1);
        self
    }

    /// How many of the largest objects get their own turn on the turntable.
    ///
    /// Default: 5 if function not used
    pub fn with_max_featured(mut self, max_featured: usize) -> Self {
        self.max_featured = max_featured.max(1);
        self
    }

    pub fn build(self) -> Turntable {
        Turntable { config: self }
    }
}

/// What a turntable run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub featured: Vec<FeaturedObject>,
    pub frames_per_object: usize,
    pub frames: Vec<Frame>,
}

impl RunSummary {
    /// Frame slots used, failed ones included.
    pub fn attempted(&self) -> usize {
        self.frames.len()
    }

    pub fn written(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| f.rendered)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| !f.rendered)
    }
}

pub struct Turntable {
    config: TurntableBuilder,
}

impl Turntable {
    /// Opens `scene_path` in the host, then renders it with [`Turntable::render`].
    pub fn render_file(
        &self,
        host: &mut dyn SceneHost,
        scene_path: &Path,
    ) -> Result<RunSummary, TurntableError> {
        log::info!("Opening: {}", scene_path.display());
        host.open_scene(scene_path)
            .map_err(|source| TurntableError::SceneLoad {
                path: scene_path.to_path_buf(),
                source,
            })?;
        self.render(host)
    }

    /// Renders turntable frames of the host's current scene into the output
    /// directory.
    ///
    /// The largest objects each get an isolated share of the frame budget. When
    /// no object qualifies the whole scene is turned instead. All objects are
    /// visible again afterwards.
    pub fn render(&self, host: &mut dyn SceneHost) -> Result<RunSummary, TurntableError> {
        let config = &self.config;
        host.ensure_object_mode()?;

        let featured = survey::featured_or_fallback(&*host, config.max_featured);
        let frames_per_object = sequencer::frames_per_object(config.frame_count, featured.len());
        log::info!(
            "Rendering {} objects, {} frames each",
            featured.len(),
            frames_per_object
        );

        // Lights are sized for the largest subject only
        let largest_size = featured[0].size;
        let mut rig = Rig::adopt(&*host);
        rig.setup_lighting(host, largest_size)?;
        let camera = rig.setup_camera(host, largest_size)?;
        let pivot = rig.setup_pivot(host, Vector3::zeros())?;

        std::fs::create_dir_all(&config.output_dir).map_err(|source| {
            TurntableError::OutputDir {
                path: config.output_dir.clone(),
                source,
            }
        })?;

        let frames = sequencer::render_sequence(
            host,
            &featured,
            camera,
            pivot,
            &SequenceConfig {
                output_dir: &config.output_dir,
                frame_count: config.frame_count,
                resolution: config.resolution,
            },
        );

        if let Err(e) = visibility::restore_all(host) {
            log::warn!("Could not restore visibility: {}", e);
        }

        log::info!(
            "Complete: {} frames in {}",
            frames.len(),
            config.output_dir.display()
        );
        Ok(RunSummary {
            featured,
            frames_per_object,
            frames,
        })
    }
}
