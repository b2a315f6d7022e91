//! Camera, pivot and lights for a turntable.
//!
//! The camera hangs off a pivot empty, so orbiting the subject is a single
//! rotation of the pivot about Z.

use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector3};

use crate::host::{HostError, SceneHost};
use crate::scene::{LightData, LightKind, ObjectId};

/// Camera distance as a multiple of the subject size.
pub const DISTANCE_FACTOR: f32 = 2.5;

pub const SUN_ENERGY: f32 = 3.0;
pub const FILL_ENERGY: f32 = 100.0;

/// The objects a turntable rig is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigRole {
    Camera,
    Pivot,
    Sun,
    Fill,
}

impl RigRole {
    pub const ALL: [RigRole; 4] = [RigRole::Camera, RigRole::Pivot, RigRole::Sun, RigRole::Fill];

    /// Reserved object name, used to find a rig left in the scene by an earlier run.
    pub fn object_name(&self) -> &'static str {
        match self {
            RigRole::Camera => "TurntableCamera",
            RigRole::Pivot => "CameraPivot",
            RigRole::Sun => "TurntableSun",
            RigRole::Fill => "TurntableFill",
        }
    }
}

pub fn camera_distance(size: f32) -> f32 {
    size * DISTANCE_FACTOR
}

/// Camera position relative to the pivot: out along +X and raised by half the distance.
pub fn camera_offset(size: f32) -> Vector3<f32> {
    let d = camera_distance(size);
    Vector3::new(d, 0.0, d * 0.5)
}

/// XYZ Euler rotation that points local -Z along `direction`, keeping local +Y
/// as close to world +Z as possible.
pub fn track_to_euler(direction: &Vector3<f32>) -> Vector3<f32> {
    let Some(forward) = direction.try_normalize(1e-9) else {
        return Vector3::zeros();
    };
    // Looking straight up or down leaves roll undefined, borrow +Y instead
    let up = if forward.cross(&Vector3::z()).norm_squared() < 1e-12 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let (x, y, z) = UnitQuaternion::face_towards(&-forward, &up).euler_angles();
    Vector3::new(x, y, z)
}

/// Registry of rig objects keyed by role.
#[derive(Debug, Clone, Default)]
pub struct Rig {
    objects: HashMap<RigRole, ObjectId>,
}

impl Rig {
    /// Starts a registry, adopting any rig objects already in the scene.
    pub fn adopt(host: &dyn SceneHost) -> Self {
        let objects = RigRole::ALL
            .iter()
            .filter_map(|&role| Some((role, host.find_object(role.object_name())?)))
            .collect();
        Self { objects }
    }

    pub fn get(&self, role: RigRole) -> Option<ObjectId> {
        self.objects.get(&role).copied()
    }

    /// Creates the sun and fill lights, sized for a subject of `size`.
    ///
    /// Does nothing when the rig already has a sun.
    pub fn setup_lighting(&mut self, host: &mut dyn SceneHost, size: f32) -> Result<(), HostError> {
        if self.objects.contains_key(&RigRole::Sun) {
            return Ok(());
        }
        let d = camera_distance(size);

        let sun = host.create_light(
            RigRole::Sun.object_name(),
            LightData {
                kind: LightKind::Sun,
                energy: SUN_ENERGY,
                size: 1.0,
            },
        )?;
        host.set_location(sun, Vector3::new(d, d, d * 2.0))?;
        self.objects.insert(RigRole::Sun, sun);

        let fill = host.create_light(
            RigRole::Fill.object_name(),
            LightData {
                kind: LightKind::Area,
                energy: FILL_ENERGY,
                size,
            },
        )?;
        host.set_location(fill, Vector3::new(-d, -d, d))?;
        self.objects.insert(RigRole::Fill, fill);

        log::info!("Lighting created");
        Ok(())
    }

    /// Returns the rig camera, creating it if needed, and makes it the active camera.
    pub fn setup_camera(&mut self, host: &mut dyn SceneHost, size: f32) -> Result<ObjectId, HostError> {
        let camera = match self.get(RigRole::Camera) {
            Some(camera) => camera,
            None => {
                let camera = host.create_camera(RigRole::Camera.object_name())?;
                host.set_location(camera, camera_offset(size))?;
                self.objects.insert(RigRole::Camera, camera);
                camera
            }
        };
        host.set_active_camera(camera)?;
        Ok(camera)
    }

    /// Returns the pivot, creating it at `center` or moving it there with its
    /// rotation cleared.
    pub fn setup_pivot(&mut self, host: &mut dyn SceneHost, center: Vector3<f32>) -> Result<ObjectId, HostError> {
        match self.get(RigRole::Pivot) {
            Some(pivot) => {
                host.set_location(pivot, center)?;
                host.set_rotation_euler(pivot, Vector3::zeros())?;
                Ok(pivot)
            }
            None => {
                let pivot = host.create_empty(RigRole::Pivot.object_name())?;
                host.set_location(pivot, center)?;
                self.objects.insert(RigRole::Pivot, pivot);
                Ok(pivot)
            }
        }
    }
}

/// Frames a subject at `center` of `size`: the pivot moves to the subject, the
/// camera is parented to it at [`camera_offset`] and aimed at the pivot origin.
pub fn position_camera_for_object(
    host: &mut dyn SceneHost,
    camera: ObjectId,
    pivot: ObjectId,
    center: Vector3<f32>,
    size: f32,
) -> Result<(), HostError> {
    host.set_location(pivot, center)?;
    host.set_parent(camera, Some(pivot))?;
    let offset = camera_offset(size);
    host.set_location(camera, offset)?;
    host.set_rotation_euler(camera, track_to_euler(&-offset))?;
    log::debug!("Camera placed {:.2} from {:?}", camera_distance(size), center);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SoftwareHost;
    use crate::scene::{ObjectData, ObjectKind};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3};

    fn rotation(euler: Vector3<f32>) -> Rotation3<f32> {
        Rotation3::from_euler_angles(euler.x, euler.y, euler.z)
    }

    #[test]
    fn track_to_points_minus_z_at_target() {
        let direction = Vector3::new(-5.0, 0.0, -2.5);
        let r = rotation(track_to_euler(&direction));
        assert_relative_eq!(r * -Vector3::z(), direction.normalize(), epsilon = 1e-5);
        // no roll: local X stays horizontal, local Y leans towards world up
        assert_relative_eq!((r * Vector3::x()).z, 0.0, epsilon = 1e-5);
        assert!((r * Vector3::y()).z > 0.0);
    }

    #[test]
    fn track_to_straight_down_is_defined() {
        let r = rotation(track_to_euler(&Vector3::new(0.0, 0.0, -1.0)));
        assert_relative_eq!(r * -Vector3::z(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_eq!(track_to_euler(&Vector3::zeros()), Vector3::zeros());
    }

    #[test]
    fn lighting_is_placed_from_subject_size() {
        let mut host = SoftwareHost::new();
        let mut rig = Rig::adopt(&host);
        rig.setup_lighting(&mut host, 2.0).unwrap();

        let sun = host.scene().get(rig.get(RigRole::Sun).unwrap()).unwrap();
        assert_eq!(sun.location, Vector3::new(5.0, 5.0, 10.0));
        assert!(matches!(sun.data, ObjectData::Light(l) if l.kind == LightKind::Sun && l.energy == 3.0));

        let fill = host.scene().get(rig.get(RigRole::Fill).unwrap()).unwrap();
        assert_eq!(fill.location, Vector3::new(-5.0, -5.0, 5.0));
        assert!(matches!(fill.data, ObjectData::Light(l) if l.kind == LightKind::Area && l.energy == 100.0 && l.size == 2.0));
    }

    #[test]
    fn rerunning_on_a_rigged_scene_does_not_duplicate() {
        let mut host = SoftwareHost::new();
        let mut rig = Rig::adopt(&host);
        rig.setup_lighting(&mut host, 1.0).unwrap();
        rig.setup_camera(&mut host, 1.0).unwrap();
        rig.setup_pivot(&mut host, Vector3::zeros()).unwrap();
        let count = host.scene().len();

        let mut again = Rig::adopt(&host);
        for role in RigRole::ALL {
            assert_eq!(again.get(role), rig.get(role));
        }
        again.setup_lighting(&mut host, 7.0).unwrap();
        again.setup_camera(&mut host, 7.0).unwrap();
        again.setup_pivot(&mut host, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(host.scene().len(), count);
    }

    #[test]
    fn camera_is_created_and_activated() {
        let mut host = SoftwareHost::new();
        let mut rig = Rig::default();
        let camera = rig.setup_camera(&mut host, 2.0).unwrap();
        assert_eq!(host.object_kind(camera).unwrap(), ObjectKind::Camera);
        assert_eq!(host.scene().active_camera, Some(camera));
        assert_eq!(host.scene().get(camera).unwrap().location, Vector3::new(5.0, 0.0, 2.5));
    }

    #[test]
    fn existing_pivot_is_moved_and_reset() {
        let mut host = SoftwareHost::new();
        let mut rig = Rig::default();
        let pivot = rig.setup_pivot(&mut host, Vector3::zeros()).unwrap();
        host.set_rotation_euler(pivot, Vector3::new(0.0, 0.0, 1.0)).unwrap();
        let again = rig.setup_pivot(&mut host, Vector3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(again, pivot);
        let object = host.scene().get(pivot).unwrap();
        assert_eq!(object.location, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(object.rotation_euler, Vector3::zeros());
    }

    #[test]
    fn camera_orbits_with_the_pivot() {
        let mut host = SoftwareHost::new();
        let mut rig = Rig::default();
        let camera = rig.setup_camera(&mut host, 1.0).unwrap();
        let pivot = rig.setup_pivot(&mut host, Vector3::zeros()).unwrap();
        let center = Vector3::new(1.0, 2.0, 3.0);
        position_camera_for_object(&mut host, camera, pivot, center, 2.0).unwrap();

        let world = host.world_matrix(camera).unwrap();
        let eye = world.transform_point(&Point3::origin());
        assert_relative_eq!(eye, Point3::new(6.0, 2.0, 5.5), epsilon = 1e-5);
        let forward = world.transform_vector(&-Vector3::z());
        assert_relative_eq!(forward.normalize(), (Point3::from(center) - eye).normalize(), epsilon = 1e-5);

        host.set_rotation_euler(pivot, Vector3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2)).unwrap();
        let eye = host.world_matrix(camera).unwrap().transform_point(&Point3::origin());
        assert_relative_eq!(eye, Point3::new(1.0, 7.0, 5.5), epsilon = 1e-5);
    }
}
