// The authoritative surveillance world and its single task.
//
// All registry/guard/router mutation happens on one task: each command is
// processed to completion before the next, so the adjustment-lock map is the
// only cross-actor exclusion primitive needed.

use super::types::{CameraCommand, SurveillanceUpdate};
use crate::domain::{
    AdjustmentLocks, CameraRegistry, CameraSnapshot, CameraType, Owner, Rotation, Vec3,
    ViewerRouter,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

pub struct SurveillanceWorld {
    registry: CameraRegistry,
    locks: AdjustmentLocks,
    viewers: ViewerRouter,
}

impl SurveillanceWorld {
    pub fn new() -> Self {
        Self {
            registry: CameraRegistry::new(),
            locks: AdjustmentLocks::new(),
            viewers: ViewerRouter::new(),
        }
    }

    pub fn place(
        &mut self,
        camera_type: CameraType,
        position: Vec3,
        rotation: Rotation,
        owner: u64,
        held: bool,
    ) -> Option<CameraSnapshot> {
        let owner = if held {
            Owner::HeldBy(owner)
        } else {
            Owner::Player(owner)
        };
        self.registry.create(camera_type, position, rotation, owner)
    }

    /// Removes a camera, dropping its lock and any viewer assignments in the
    /// same step so a removed id is never lockable or viewable afterward.
    /// Rejected while another actor holds the adjustment lock.
    pub fn remove(&mut self, camera_id: &str, requester: u64) -> bool {
        if !self.locks.permits(camera_id, requester) {
            return false;
        }
        if !self.registry.remove(camera_id) {
            return false;
        }
        self.locks.release_camera(camera_id);
        self.viewers.clear_camera(camera_id);
        true
    }

    /// Applies a position update if the camera exists and the lock permits
    /// the holder. Last write wins; no reordering reconciliation.
    pub fn move_camera(&mut self, camera_id: &str, holder: u64, position: Vec3) -> bool {
        if !self.locks.permits(camera_id, holder) {
            return false;
        }
        self.registry.update_position(camera_id, position)
    }

    pub fn rotate_camera(&mut self, camera_id: &str, holder: u64, rotation: Rotation) -> bool {
        if !self.locks.permits(camera_id, holder) {
            return false;
        }
        self.registry.update_rotation(camera_id, rotation)
    }

    pub fn acquire_lock(&mut self, camera_id: &str, holder: u64) -> bool {
        // Locks on unknown cameras would linger forever; reject them.
        if !self.registry.contains(camera_id) {
            return false;
        }
        self.locks.acquire(camera_id, holder)
    }

    pub fn release_lock(&mut self, camera_id: &str, holder: u64) {
        self.locks.release(camera_id, holder);
    }

    pub fn set_viewer(&mut self, viewer: u64, camera_id: Option<String>) -> bool {
        let registry = &self.registry;
        self.viewers
            .set_viewer(viewer, camera_id, |id| registry.contains(id))
    }

    pub fn register_external_viewer(&mut self, connection_id: u64, camera_id: String) -> bool {
        let registry = &self.registry;
        self.viewers
            .register_external(connection_id, camera_id, |id| registry.contains(id))
    }

    pub fn unregister_external_viewer(&mut self, connection_id: u64) {
        self.viewers.unregister_external(connection_id);
    }

    /// Disconnect cleanup: three independent, idempotent steps that all run
    /// even when individual ones find nothing to do.
    pub fn disconnect(&mut self, participant: Option<u64>, connection_id: u64) -> Vec<String> {
        let mut removed = Vec::new();
        if let Some(participant) = participant {
            removed = self.registry.cleanup_for_owner(participant);
            for camera_id in &removed {
                self.locks.release_camera(camera_id);
                self.viewers.clear_camera(camera_id);
            }
            let released = self.locks.release_all_for(participant);
            if !released.is_empty() {
                debug!(participant, count = released.len(), "released locks on disconnect");
            }
            self.viewers.clear_viewer(participant);
        }
        self.viewers.unregister_external(connection_id);
        removed
    }

    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut CameraRegistry {
        &mut self.registry
    }

    pub fn locks(&self) -> &AdjustmentLocks {
        &self.locks
    }

    pub fn viewers(&self) -> &ViewerRouter {
        &self.viewers
    }
}

impl Default for SurveillanceWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the authoritative surveillance loop until the command channel closes.
///
/// Commands apply in receipt order; every successful mutation broadcasts a
/// fresh snapshot to all subscribers.
pub async fn surveillance_task(
    mut command_rx: mpsc::Receiver<CameraCommand>,
    update_tx: broadcast::Sender<SurveillanceUpdate>,
) {
    let mut world = SurveillanceWorld::new();
    let mut revision: u64 = 0;

    while let Some(command) = command_rx.recv().await {
        let mutated = apply_command(&mut world, command);
        if mutated {
            revision += 1;
            let _ = update_tx.send(SurveillanceUpdate {
                revision,
                cameras: world.registry().all(),
            });
        }
    }
    info!("command channel closed; surveillance task exiting");
}

/// Applies one command and reports whether the camera set changed in a way
/// clients can observe.
fn apply_command(world: &mut SurveillanceWorld, command: CameraCommand) -> bool {
    match command {
        CameraCommand::Place {
            camera_type,
            position,
            rotation,
            owner,
            held,
            reply,
        } => {
            let created = world.place(camera_type, position, rotation, owner, held);
            let mutated = created.is_some();
            if let Some(camera) = &created {
                info!(camera_id = %camera.id, owner, ?camera_type, "camera placed");
            }
            let _ = reply.send(created);
            mutated
        }
        CameraCommand::Remove {
            camera_id,
            requester,
            reply,
        } => {
            let removed = world.remove(&camera_id, requester);
            if removed {
                info!(%camera_id, requester, "camera removed");
            }
            let _ = reply.send(removed);
            removed
        }
        CameraCommand::Move {
            camera_id,
            holder,
            position,
        } => world.move_camera(&camera_id, holder, position),
        CameraCommand::Rotate {
            camera_id,
            holder,
            rotation,
        } => world.rotate_camera(&camera_id, holder, rotation),
        CameraCommand::AcquireLock {
            camera_id,
            holder,
            reply,
        } => {
            let granted = world.acquire_lock(&camera_id, holder);
            debug!(%camera_id, holder, granted, "lock acquire");
            let _ = reply.send(granted);
            false
        }
        CameraCommand::ReleaseLock { camera_id, holder } => {
            world.release_lock(&camera_id, holder);
            false
        }
        CameraCommand::SetViewer {
            viewer,
            camera_id,
            reply,
        } => {
            let accepted = world.set_viewer(viewer, camera_id);
            let _ = reply.send(accepted);
            false
        }
        CameraCommand::RegisterExternalViewer {
            connection_id,
            camera_id,
            reply,
        } => {
            let accepted = world.register_external_viewer(connection_id, camera_id);
            let _ = reply.send(accepted);
            false
        }
        CameraCommand::UnregisterExternalViewer { connection_id } => {
            world.unregister_external_viewer(connection_id);
            false
        }
        CameraCommand::SetLimits {
            security,
            stream,
            reply,
        } => {
            let limits = world.registry_mut().set_limits(security, stream);
            info!(
                security = limits.security,
                stream = limits.stream,
                "camera limits updated"
            );
            let _ = reply.send(limits);
            false
        }
        CameraCommand::GetStats { reply } => {
            let _ = reply.send(world.registry().stats());
            false
        }
        CameraCommand::Disconnect {
            participant,
            connection_id,
        } => {
            let removed = world.disconnect(participant, connection_id);
            if let Some(participant) = participant {
                info!(
                    participant,
                    removed = removed.len(),
                    "disconnect cleanup complete"
                );
            }
            !removed.is_empty()
        }
    }
}
