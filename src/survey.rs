//! Finds the objects worth putting on the turntable.
//!
//! Sizes are the world-space bounding-box diagonal, floored at [`MIN_SIZE`] so
//! flat or single-point geometry still gets a usable framing distance.

use nalgebra::{Point3, Vector3};

use crate::host::{HostError, SceneHost};
use crate::scene::{ObjectId, ObjectKind};

/// Maximum number of objects featured in one preview.
pub const MAX_FEATURED_OBJECTS: usize = 5;

/// Smallest size a bounds computation reports.
pub const MIN_SIZE: f32 = 0.1;

/// Objects at or below this size are treated as noise.
pub const NOISE_SIZE: f32 = 0.01;

/// Centre and diagonal size of an axis aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vector3<f32>,
    pub size: f32,
}

/// One entry of a survey: an object, or the whole scene when `object` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedObject {
    pub object: Option<ObjectId>,
    pub name: String,
    pub center: Vector3<f32>,
    pub size: f32,
}

/// Component-wise min/max accumulator.
#[derive(Debug, Clone, Copy)]
struct Extent {
    min: Vector3<f32>,
    max: Vector3<f32>,
}

impl Extent {
    fn new() -> Self {
        Self {
            min: Vector3::repeat(f32::INFINITY),
            max: Vector3::repeat(f32::NEG_INFINITY),
        }
    }

    fn include(&mut self, point: Point3<f32>) {
        self.min = self.min.inf(&point.coords);
        self.max = self.max.sup(&point.coords);
    }

    fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    fn bounds(&self) -> Option<Bounds> {
        if self.is_empty() {
            return None;
        }
        Some(Bounds {
            center: (self.min + self.max) / 2.0,
            size: (self.max - self.min).norm().max(MIN_SIZE),
        })
    }
}

fn display_name(host: &dyn SceneHost, id: ObjectId) -> String {
    host.object_name(id).unwrap_or_else(|_| id.to_string())
}

/// Folds the world-space corners of one mesh object into `extent`.
fn include_object(host: &dyn SceneHost, id: ObjectId, extent: &mut Extent) -> Result<(), HostError> {
    let world = host.world_matrix(id)?;
    for corner in host.bound_box(id)? {
        extent.include(world.transform_point(&corner));
    }
    Ok(())
}

fn try_object_bounds(host: &dyn SceneHost, id: ObjectId) -> Result<Option<Bounds>, HostError> {
    if host.object_kind(id)? != ObjectKind::Mesh || host.vertex_count(id)? == 0 {
        return Ok(None);
    }
    let mut extent = Extent::new();
    include_object(host, id, &mut extent)?;
    Ok(extent.bounds())
}

/// World-space bounds of a single mesh object.
///
/// `None` for anything that isn't a mesh with geometry. A host fault is logged
/// and also yields `None`.
pub fn object_bounds(host: &dyn SceneHost, id: ObjectId) -> Option<Bounds> {
    match try_object_bounds(host, id) {
        Ok(bounds) => bounds,
        Err(e) => {
            log::warn!("Could not get bounds for {}: {}", display_name(host, id), e);
            None
        }
    }
}

/// The `max_count` largest mesh objects, largest first.
///
/// Ties keep enumeration order. Objects no bigger than [`NOISE_SIZE`] are skipped.
pub fn largest_objects(host: &dyn SceneHost, max_count: usize) -> Vec<FeaturedObject> {
    let mut found: Vec<FeaturedObject> = host
        .objects()
        .into_iter()
        .filter(|&id| matches!(host.object_kind(id), Ok(ObjectKind::Mesh)))
        .filter_map(|id| {
            let bounds = object_bounds(host, id)?;
            (bounds.size > NOISE_SIZE).then(|| FeaturedObject {
                object: Some(id),
                name: display_name(host, id),
                center: bounds.center,
                size: bounds.size,
            })
        })
        .collect();

    found.sort_by(|a, b| b.size.total_cmp(&a.size));
    log::info!("Found {} mesh objects", found.len());
    found.truncate(max_count);
    for (i, entry) in found.iter().enumerate() {
        log::info!("  {}. {}: size={:.2}", i + 1, entry.name, entry.size);
    }
    found
}

/// Joint bounds of every mesh object in the scene.
///
/// An empty scene (or one whose meshes all fail) reports the unit fallback
/// centred on the origin.
pub fn scene_bounds(host: &dyn SceneHost) -> Bounds {
    let mut extent = Extent::new();
    for id in host.objects() {
        if !matches!(host.object_kind(id), Ok(ObjectKind::Mesh)) {
            continue;
        }
        let mut object_extent = extent;
        match include_object(host, id, &mut object_extent) {
            Ok(()) => extent = object_extent,
            Err(e) => log::warn!("Could not process {}: {}", display_name(host, id), e),
        }
    }
    extent.bounds().unwrap_or(Bounds {
        center: Vector3::zeros(),
        size: 1.0,
    })
}

/// [`largest_objects`], or a single whole-scene entry when nothing qualifies.
/// Never empty.
pub fn featured_or_fallback(host: &dyn SceneHost, max_count: usize) -> Vec<FeaturedObject> {
    let featured = largest_objects(host, max_count);
    if !featured.is_empty() {
        return featured;
    }
    log::info!("No suitable mesh objects found, rendering whole scene");
    let bounds = scene_bounds(host);
    vec![FeaturedObject {
        object: None,
        name: "Scene".to_string(),
        center: bounds.center,
        size: bounds.size,
    }]
}
