use crate::error::Result;
use crate::model::{validate_profile, ProfileUpdate, TutorProfile};
use crate::storage::KvStore;

/// Key the profile blob is stored under.
pub const PROFILE_KEY: &str = "tutorProfile";

/// The tutor profile, persisted as one JSON blob.
pub struct ProfileStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> ProfileStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Absent or unreadable data yields the default profile.
    pub fn load(&self) -> TutorProfile {
        match self.store.get(PROFILE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "malformed profile, using default");
                TutorProfile::default()
            }),
            Ok(None) => TutorProfile::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read profile, using default");
                TutorProfile::default()
            }
        }
    }

    /// Validate and persist.
    pub fn save(&self, profile: &TutorProfile) -> Result<()> {
        validate_profile(profile)?;
        let blob = serde_json::to_string(profile)?;
        self.store.put(PROFILE_KEY, &blob)
    }

    /// Apply a form submission to the current profile and save it.
    pub fn update(&self, update: ProfileUpdate) -> Result<TutorProfile> {
        let mut profile = self.load();
        profile.apply(update);
        self.save(&profile)?;
        Ok(profile)
    }
}
