// Viewer routing: which camera each actor is currently watching.
//
// Full-resolution feed delivery is gated on these assignments so the server
// never pushes every camera image to every connection.

use std::collections::HashMap;

pub struct ViewerRouter {
    // In-world participants, keyed by participant id.
    viewers: HashMap<u64, String>,
    // External watch-only connections, keyed by connection id. Disjoint
    // namespace: these actors have no in-world identity.
    external: HashMap<u64, String>,
}

impl ViewerRouter {
    pub fn new() -> Self {
        Self {
            viewers: HashMap::new(),
            external: HashMap::new(),
        }
    }

    /// Assigns or clears the camera a participant is watching. Assignment is
    /// validated through `camera_exists`; clearing always succeeds.
    pub fn set_viewer<F>(&mut self, viewer: u64, camera_id: Option<String>, camera_exists: F) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        match camera_id {
            Some(id) => {
                if !camera_exists(&id) {
                    return false;
                }
                self.viewers.insert(viewer, id);
                true
            }
            None => {
                self.viewers.remove(&viewer);
                true
            }
        }
    }

    pub fn viewed_by(&self, viewer: u64) -> Option<&str> {
        self.viewers.get(&viewer).map(String::as_str)
    }

    pub fn is_viewing(&self, viewer: u64) -> bool {
        self.viewers.contains_key(&viewer)
    }

    pub fn clear_viewer(&mut self, viewer: u64) {
        self.viewers.remove(&viewer);
    }

    pub fn register_external<F>(
        &mut self,
        connection_id: u64,
        camera_id: String,
        camera_exists: F,
    ) -> bool
    where
        F: FnOnce(&str) -> bool,
    {
        if !camera_exists(&camera_id) {
            return false;
        }
        self.external.insert(connection_id, camera_id);
        true
    }

    pub fn unregister_external(&mut self, connection_id: u64) {
        self.external.remove(&connection_id);
    }

    pub fn external_target(&self, connection_id: u64) -> Option<&str> {
        self.external.get(&connection_id).map(String::as_str)
    }

    /// Drops every assignment (in-world and external) pointing at a removed
    /// camera so nothing keeps watching a dead id.
    pub fn clear_camera(&mut self, camera_id: &str) {
        self.viewers.retain(|_, id| id != camera_id);
        self.external.retain(|_, id| id != camera_id);
    }
}

impl Default for ViewerRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_camera_exists_then_viewer_assignment_succeeds() {
        let mut router = ViewerRouter::new();
        assert!(router.set_viewer(1, Some("cam_1".to_string()), |_| true));
        assert_eq!(router.viewed_by(1), Some("cam_1"));
        assert!(router.is_viewing(1));
    }

    #[test]
    fn when_camera_is_unknown_then_viewer_assignment_fails() {
        let mut router = ViewerRouter::new();
        assert!(!router.set_viewer(1, Some("cam_9".to_string()), |_| false));
        assert!(!router.is_viewing(1));
    }

    #[test]
    fn when_clearing_then_it_always_succeeds() {
        let mut router = ViewerRouter::new();
        assert!(router.set_viewer(1, None, |_| false));
        router.set_viewer(1, Some("cam_1".to_string()), |_| true);
        assert!(router.set_viewer(1, None, |_| false));
        assert!(!router.is_viewing(1));
    }

    #[test]
    fn when_camera_is_removed_then_all_assignments_pointing_at_it_are_cleared() {
        let mut router = ViewerRouter::new();
        router.set_viewer(1, Some("cam_1".to_string()), |_| true);
        router.set_viewer(2, Some("cam_2".to_string()), |_| true);
        router.register_external(100, "cam_1".to_string(), |_| true);

        router.clear_camera("cam_1");
        assert!(!router.is_viewing(1));
        assert_eq!(router.viewed_by(2), Some("cam_2"));
        assert_eq!(router.external_target(100), None);
    }

    #[test]
    fn when_external_viewer_unregisters_then_in_world_viewers_are_untouched() {
        let mut router = ViewerRouter::new();
        router.set_viewer(1, Some("cam_1".to_string()), |_| true);
        router.register_external(100, "cam_1".to_string(), |_| true);

        router.unregister_external(100);
        assert_eq!(router.external_target(100), None);
        assert_eq!(router.viewed_by(1), Some("cam_1"));
    }

    #[test]
    fn when_ids_collide_across_namespaces_then_they_stay_disjoint() {
        let mut router = ViewerRouter::new();
        router.set_viewer(7, Some("cam_1".to_string()), |_| true);
        router.register_external(7, "cam_2".to_string(), |_| true);

        assert_eq!(router.viewed_by(7), Some("cam_1"));
        assert_eq!(router.external_target(7), Some("cam_2"));
    }
}
