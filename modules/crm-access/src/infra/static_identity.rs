use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::AccessConfig;
use crate::domain::identity::{IdentityError, IdentityStore, Profile};

/// Identity store serving profiles from configuration.
#[derive(Debug, Default)]
pub struct StaticIdentityStore {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl StaticIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        let store = Self::new();
        for (subject, profile) in &config.profiles {
            store.upsert(subject, profile.clone());
        }
        store
    }

    #[must_use]
    pub fn with_profile(self, subject_id: &str, profile: Profile) -> Self {
        self.upsert(subject_id, profile);
        self
    }

    pub fn upsert(&self, subject_id: &str, profile: Profile) {
        self.profiles.write().insert(subject_id.to_owned(), profile);
    }

    pub fn remove(&self, subject_id: &str) -> Option<Profile> {
        self.profiles.write().remove(subject_id)
    }
}

#[async_trait]
impl IdentityStore for StaticIdentityStore {
    async fn load_profile(&self, subject_id: &str) -> Result<Option<Profile>, IdentityError> {
        Ok(self.profiles.read().get(subject_id).cloned())
    }
}
