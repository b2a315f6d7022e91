use crate::host::{HostError, SceneHost, Visibility};
use crate::scene::{ObjectId, ObjectKind};

/// Shows only `current` among the mesh objects. Cameras, lights and empties
/// stay visible.
pub fn isolate(host: &mut dyn SceneHost, current: ObjectId) -> Result<(), HostError> {
    for id in host.objects() {
        let visibility = match host.object_kind(id)? {
            ObjectKind::Mesh if id != current => Visibility::HIDDEN,
            _ => Visibility::VISIBLE,
        };
        host.set_visibility(id, visibility)?;
    }
    Ok(())
}

/// Makes every object visible again. Nothing about earlier hiding is remembered.
pub fn restore_all(host: &mut dyn SceneHost) -> Result<(), HostError> {
    for id in host.objects() {
        host.set_visibility(id, Visibility::VISIBLE)?;
    }
    Ok(())
}
