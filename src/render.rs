use std::path::{Path, PathBuf};

use crate::host::SceneHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEngine {
    EeveeNext,
    Eevee,
}

impl RenderEngine {
    pub fn name(&self) -> &'static str {
        match self {
            RenderEngine::EeveeNext => "BLENDER_EEVEE_NEXT",
            RenderEngine::Eevee => "BLENDER_EEVEE",
        }
    }

    /// Picks the real-time engine, preferring the newer one when the host has it.
    ///
    /// The older engine is returned unconditionally as the fallback; a host that
    /// has neither rejects it when the settings are applied.
    pub fn select(host: &dyn SceneHost) -> RenderEngine {
        if host.supports_engine(RenderEngine::EeveeNext) {
            RenderEngine::EeveeNext
        } else {
            log::debug!(
                "{} not available, falling back to {}",
                RenderEngine::EeveeNext.name(),
                RenderEngine::Eevee.name()
            );
            RenderEngine::Eevee
        }
    }
}

impl std::fmt::Display for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Png,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub engine: RenderEngine,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
    pub film_transparent: bool,
    pub file_format: FileFormat,
    pub color_mode: ColorMode,
    pub filepath: PathBuf,
    pub samples: Option<u32>,
}

impl RenderSettings {
    /// Sample count used for quick preview quality output.
    pub const PREVIEW_SAMPLES: u32 = 16;

    /// Settings for one turntable frame: square, transparent, RGBA PNG.
    pub fn turntable_frame(
        engine: RenderEngine,
        resolution: u32,
        output_dir: &Path,
        frame: usize,
    ) -> Self {
        Self {
            engine,
            resolution_x: resolution,
            resolution_y: resolution,
            resolution_percentage: 100,
            film_transparent: true,
            file_format: FileFormat::Png,
            color_mode: ColorMode::Rgba,
            filepath: frame_path(output_dir, frame),
            samples: Some(Self::PREVIEW_SAMPLES),
        }
    }

    /// Final image size after the resolution percentage is applied.
    pub fn output_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as u64 * self.resolution_percentage as u64) / 100).max(1) as u32;
        (scale(self.resolution_x), scale(self.resolution_y))
    }
}

/// `<output_dir>/frame_<index:03>.png`
pub fn frame_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("frame_{:03}.png", index))
}
