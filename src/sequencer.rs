//! The frame loop: objects in survey order, an even turn of the pivot per frame.

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;

use crate::host::{HostError, SceneHost};
use crate::render::{RenderEngine, RenderSettings, frame_path};
use crate::rig::position_camera_for_object;
use crate::scene::ObjectId;
use crate::survey::FeaturedObject;
use crate::visibility;

/// One slot of the frame budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub path: PathBuf,
    /// Featured object on screen, `None` for the whole-scene fallback.
    pub object: Option<ObjectId>,
    /// Pivot rotation about Z, in radians.
    pub angle: f32,
    /// False when the render failed and no image was written.
    pub rendered: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceConfig<'a> {
    pub output_dir: &'a Path,
    pub frame_count: usize,
    pub resolution: u32,
}

/// Frames each featured object gets. Integer division, so the total may fall
/// short of `frame_count` when it doesn't divide evenly.
pub fn frames_per_object(frame_count: usize, num_objects: usize) -> usize {
    (frame_count / num_objects.max(1)).max(1)
}

/// Pivot angle for frame `i` of an object's `frames` frame revolution.
pub fn turntable_angle(i: usize, frames: usize) -> f32 {
    TAU * i as f32 / frames as f32
}

fn render_frame(
    host: &mut dyn SceneHost,
    pivot: ObjectId,
    angle: f32,
    settings: &RenderSettings,
) -> Result<PathBuf, HostError> {
    host.set_rotation_euler(pivot, Vector3::new(0.0, 0.0, angle))?;
    host.configure_render(settings)?;
    host.render_still()
}

/// Renders the turntable for every featured object and reports every frame
/// slot used. Stops once `frame_count` slots are used.
///
/// A failed frame is logged and still uses its slot. An object whose camera
/// can't be placed is logged and skipped without using any.
pub fn render_sequence(
    host: &mut dyn SceneHost,
    featured: &[FeaturedObject],
    camera: ObjectId,
    pivot: ObjectId,
    config: &SequenceConfig<'_>,
) -> Vec<Frame> {
    let per_object = frames_per_object(config.frame_count, featured.len());
    let mut frames = Vec::with_capacity(config.frame_count.min(per_object * featured.len()));

    'objects: for (obj_index, entry) in featured.iter().enumerate() {
        if frames.len() >= config.frame_count {
            break;
        }
        log::info!(
            "Object {}/{}: {} (size: {:.2})",
            obj_index + 1,
            featured.len(),
            entry.name,
            entry.size
        );

        if let Some(object) = entry.object {
            if let Err(e) = visibility::isolate(host, object) {
                log::warn!("Could not isolate {}: {}", entry.name, e);
            }
        }
        if let Err(e) = position_camera_for_object(host, camera, pivot, entry.center, entry.size)
        {
            log::warn!("Could not frame {}, skipping it: {}", entry.name, e);
            continue;
        }

        for i in 0..per_object {
            let index = frames.len();
            if index >= config.frame_count {
                break 'objects;
            }
            let angle = turntable_angle(i, per_object);
            let settings = RenderSettings::turntable_frame(
                RenderEngine::select(&*host),
                config.resolution,
                config.output_dir,
                index,
            );
            let rendered = match render_frame(host, pivot, angle, &settings) {
                Ok(_) => {
                    log::info!("  Frame {}/{}", index + 1, config.frame_count);
                    true
                }
                Err(e) => {
                    log::warn!("  Frame {} render failed: {}", index + 1, e);
                    false
                }
            };
            frames.push(Frame {
                index,
                path: frame_path(config.output_dir, index),
                object: entry.object,
                angle,
                rendered,
            });
        }
    }
    frames
}
