// Exclusive adjustment locks, one holder per camera at most.
//
// The lock is advisory across actor sessions: every mutating request is
// re-validated against this map server-side, a client's belief that it holds
// the lock is never trusted.

use std::collections::HashMap;

pub struct AdjustmentLocks {
    holders: HashMap<String, u64>,
}

impl AdjustmentLocks {
    pub fn new() -> Self {
        Self {
            holders: HashMap::new(),
        }
    }

    /// Acquires the lock for `holder`. Reentrant: succeeds if the holder
    /// already owns it, fails only if someone else does.
    pub fn acquire(&mut self, camera_id: &str, holder: u64) -> bool {
        match self.holders.get(camera_id) {
            Some(current) => *current == holder,
            None => {
                self.holders.insert(camera_id.to_string(), holder);
                true
            }
        }
    }

    /// Releases the lock only if `holder` currently owns it.
    pub fn release(&mut self, camera_id: &str, holder: u64) {
        if self.holders.get(camera_id) == Some(&holder) {
            self.holders.remove(camera_id);
        }
    }

    /// Drops the lock regardless of holder. Used when the camera is removed.
    pub fn release_camera(&mut self, camera_id: &str) {
        self.holders.remove(camera_id);
    }

    pub fn holder_of(&self, camera_id: &str) -> Option<u64> {
        self.holders.get(camera_id).copied()
    }

    /// True when the camera is unlocked or locked by this holder.
    pub fn permits(&self, camera_id: &str, holder: u64) -> bool {
        match self.holders.get(camera_id) {
            Some(current) => *current == holder,
            None => true,
        }
    }

    /// Releases every lock the holder owns and returns exactly that set.
    pub fn release_all_for(&mut self, holder: u64) -> Vec<String> {
        let released: Vec<String> = self
            .holders
            .iter()
            .filter(|(_, h)| **h == holder)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &released {
            self.holders.remove(id);
        }
        released
    }
}

impl Default for AdjustmentLocks {
    fn default() -> Self {
        Self::new()
    }
}
