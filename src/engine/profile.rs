//! Named sets of channels
//!
//! The first profile added becomes current. Switching to a name that does
//! not exist leaves the current profile unchanged.

use tracing::{debug, info};

use super::Channel;

#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub channels: Vec<Channel>,
}

impl Profile {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: Vec<Profile>,
    current: Option<usize>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile, replacing one with the same name
    pub fn add(&mut self, profile: Profile) {
        if let Some(existing) = self.profiles.iter_mut().find(|p| p.name == profile.name) {
            *existing = profile;
            return;
        }
        debug!(profile = %profile.name, "Profile added");
        self.profiles.push(profile);
        if self.current.is_none() {
            self.current = Some(self.profiles.len() - 1);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        let index = self.profiles.iter().position(|p| p.name == name)?;
        let removed = self.profiles.remove(index);
        self.current = match self.current {
            Some(c) if c == index => (!self.profiles.is_empty()).then_some(0),
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        Some(removed)
    }

    /// Make `name` current; returns false and changes nothing if unknown
    pub fn switch(&mut self, name: &str) -> bool {
        match self.profiles.iter().position(|p| p.name == name) {
            Some(index) => {
                info!(profile = name, "Switched profile");
                self.current = Some(index);
                true
            }
            None => {
                debug!(profile = name, "Ignoring switch to unknown profile");
                false
            }
        }
    }

    pub fn current(&self) -> Option<&Profile> {
        self.current.and_then(|i| self.profiles.get(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut Profile> {
        self.current.and_then(|i| self.profiles.get_mut(i))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
