use std::{
    collections::HashMap,
    sync::Mutex,
};

use raid_memory::RemoteAddress;
use utils_identity::LockedSet;

use crate::sync::lock;

/// Emitted whenever the radar switched to another game world.
/// Every cache bound to the previous world must be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBoundary {
    pub previous_world: Option<RemoteAddress>,
    pub world: Option<RemoteAddress>,
}

pub type SessionBoundaryListener = Box<dyn Fn(&SessionBoundary) + Send + Sync>;

/// State which is only valid within one game world.
#[derive(Default)]
pub struct Session {
    groups: Mutex<HashMap<String, usize>>,
    focus: LockedSet<RemoteAddress>,
}

impl Session {
    pub fn new() -> Self {
        Default::default()
    }

    /// Stable, session local number of a group.
    /// Players without a group do not get a number.
    pub fn group_number(&self, group_id: &str) -> Option<usize> {
        if group_id.is_empty() {
            return None;
        }

        let mut groups = lock(&self.groups);
        let next = groups.len() + 1;
        Some(*groups.entry(group_id.to_string()).or_insert(next))
    }

    pub fn group_count(&self) -> usize {
        lock(&self.groups).len()
    }

    /// Returns true if the entity is focused afterwards.
    pub fn toggle_focus(&self, address: RemoteAddress) -> bool {
        self.focus.toggle(address)
    }

    pub fn is_focused(&self, address: RemoteAddress) -> bool {
        self.focus.contains(&address)
    }

    pub fn focused(&self) -> Vec<RemoteAddress> {
        self.focus.snapshot()
    }

    pub fn reset(&self) {
        lock(&self.groups).clear();
        self.focus.clear();
    }
}
