use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AutofillError, Result};
use crate::profile::profile_model::{LegacyProfile, ProfileSource, UserProfile};

pub const EXPORT_FORMAT: &str = "form-autofill-profile";
pub const EXPORT_VERSION: u32 = 1;

/// Name given to the profile a legacy map is upgraded into.
pub const UPGRADED_PROFILE_NAME: &str = "Default";

// ============================================================================
// Store contract
// ============================================================================

/// Persistent home for profiles, the active selection and the enabled flag.
pub trait ProfileStore {
    fn list_profiles(&self) -> Vec<UserProfile>;

    /// `Err(NoActiveProfile)` when the store is empty.
    fn active_profile(&self) -> Result<UserProfile>;

    /// Create a profile seeded with the default categories. The first profile
    /// ever created becomes active.
    fn create_profile(&mut self, name: &str) -> Result<UserProfile>;

    fn update_profile(&mut self, profile: UserProfile) -> Result<()>;

    /// Deleting the active profile makes the first remaining one active.
    fn delete_profile(&mut self, id: &str) -> Result<()>;

    fn set_active(&mut self, id: &str) -> Result<()>;

    fn enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Merge a flat map into the active profile, creating one when none exists.
    fn save_legacy(&mut self, legacy: &LegacyProfile) -> Result<()> {
        let mut profile = match self.active_profile() {
            Ok(p) => p,
            Err(AutofillError::NoActiveProfile) => self.create_profile(UPGRADED_PROFILE_NAME)?,
            Err(e) => return Err(e),
        };
        profile.merge_legacy(legacy);
        self.update_profile(profile)
    }

    /// Store an imported profile under a fresh id and return it.
    fn import_profile(&mut self, json: &str) -> Result<UserProfile> {
        let mut profile = parse_import(json)?;
        let created = self.create_profile(&profile.name)?;
        profile.id = created.id;
        self.update_profile(profile.clone())?;
        Ok(profile)
    }
}

// ============================================================================
// Persisted shape
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub profiles: Vec<UserProfile>,
    #[serde(default)]
    pub active_profile_id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            active_profile_id: None,
            enabled: true,
        }
    }
}

impl StoreData {
    /// Accept the current layout, or a bare flat map from older versions.
    pub fn from_value(value: Value) -> Result<Self> {
        let is_store = value
            .as_object()
            .map(|o| o.contains_key("profiles") || o.contains_key("activeProfileId"))
            .unwrap_or(false);

        if is_store {
            return serde_json::from_value(value).map_err(|e| AutofillError::json("profile store", e));
        }

        match ProfileSource::from_value(value)? {
            ProfileSource::Legacy(map) => {
                info!(keys = map.len(), "upgrading legacy profile");
                let profile = UserProfile::from_legacy(UPGRADED_PROFILE_NAME, &map);
                Ok(Self {
                    active_profile_id: Some(profile.id.clone()),
                    profiles: vec![profile],
                    enabled: true,
                })
            }
            ProfileSource::Categorized(profile) => Ok(Self {
                active_profile_id: Some(profile.id.clone()),
                profiles: vec![profile],
                enabled: true,
            }),
        }
    }

    fn active(&self) -> Result<&UserProfile> {
        let id = self
            .active_profile_id
            .as_deref()
            .ok_or(AutofillError::NoActiveProfile)?;
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or(AutofillError::NoActiveProfile)
    }

    fn create(&mut self, name: &str) -> UserProfile {
        let profile = UserProfile::new(name);
        if self.profiles.is_empty() {
            self.active_profile_id = Some(profile.id.clone());
        }
        self.profiles.push(profile.clone());
        debug!(id = %profile.id, name, "profile created");
        profile
    }

    fn update(&mut self, mut profile: UserProfile) -> Result<()> {
        let slot = self
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| AutofillError::ProfileNotFound(profile.id.clone()))?;
        profile.updated_at = Utc::now();
        *slot = profile;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        if self.profiles.len() == before {
            return Err(AutofillError::ProfileNotFound(id.to_string()));
        }
        if self.active_profile_id.as_deref() == Some(id) {
            self.active_profile_id = self.profiles.first().map(|p| p.id.clone());
        }
        Ok(())
    }

    fn set_active(&mut self, id: &str) -> Result<()> {
        if !self.profiles.iter().any(|p| p.id == id) {
            return Err(AutofillError::ProfileNotFound(id.to_string()));
        }
        self.active_profile_id = Some(id.to_string());
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: StoreData,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `profile` as its only, active profile.
    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            data: StoreData {
                active_profile_id: Some(profile.id.clone()),
                profiles: vec![profile],
                enabled: true,
            },
        }
    }
}

impl ProfileStore for InMemoryStore {
    fn list_profiles(&self) -> Vec<UserProfile> {
        self.data.profiles.clone()
    }

    fn active_profile(&self) -> Result<UserProfile> {
        self.data.active().cloned()
    }

    fn create_profile(&mut self, name: &str) -> Result<UserProfile> {
        Ok(self.data.create(name))
    }

    fn update_profile(&mut self, profile: UserProfile) -> Result<()> {
        self.data.update(profile)
    }

    fn delete_profile(&mut self, id: &str) -> Result<()> {
        self.data.delete(id)
    }

    fn set_active(&mut self, id: &str) -> Result<()> {
        self.data.set_active(id)
    }

    fn enabled(&self) -> bool {
        self.data.enabled
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.data.enabled = enabled;
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store persisted as a single JSON document; every mutation rewrites it.
pub struct JsonFileStore {
    path: PathBuf,
    data: StoreData,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| AutofillError::io(format!("reading {}", path.display()), e))?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                let value: Value = serde_json::from_str(&content)
                    .map_err(|e| AutofillError::json(format!("parsing {}", path.display()), e))?;
                StoreData::from_value(value)?
            }
        } else {
            StoreData::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| AutofillError::io(format!("creating {}", dir.display()), e))?;
        }
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| AutofillError::json("serializing profile store", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| AutofillError::io(format!("writing {}", self.path.display()), e))
    }
}

impl ProfileStore for JsonFileStore {
    fn list_profiles(&self) -> Vec<UserProfile> {
        self.data.profiles.clone()
    }

    fn active_profile(&self) -> Result<UserProfile> {
        self.data.active().cloned()
    }

    fn create_profile(&mut self, name: &str) -> Result<UserProfile> {
        let profile = self.data.create(name);
        self.persist()?;
        Ok(profile)
    }

    fn update_profile(&mut self, profile: UserProfile) -> Result<()> {
        self.data.update(profile)?;
        self.persist()
    }

    fn delete_profile(&mut self, id: &str) -> Result<()> {
        self.data.delete(id)?;
        self.persist()
    }

    fn set_active(&mut self, id: &str) -> Result<()> {
        self.data.set_active(id)?;
        self.persist()
    }

    fn enabled(&self) -> bool {
        self.data.enabled
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.data.enabled = enabled;
        self.persist()
    }
}

// ============================================================================
// Export / import
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileExport {
    pub format: String,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub profile: UserProfile,
}

pub fn export_profile(profile: &UserProfile) -> Result<String> {
    let envelope = ProfileExport {
        format: EXPORT_FORMAT.to_string(),
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        profile: profile.clone(),
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| AutofillError::json("exporting profile", e))
}

/// Accepts the export envelope, a bare categorized profile, or a flat
/// legacy map.
pub fn parse_import(json: &str) -> Result<UserProfile> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| AutofillError::json("parsing import", e))?;

    let inner = match value.get("format").and_then(Value::as_str) {
        Some(EXPORT_FORMAT) => value
            .get("profile")
            .cloned()
            .ok_or_else(|| AutofillError::InvalidProfile("export has no profile".to_string()))?,
        Some(other) => {
            return Err(AutofillError::InvalidProfile(format!(
                "unsupported export format: {}",
                other
            )));
        }
        None => value,
    };

    Ok(ProfileSource::from_value(inner)?.into_categorized("Imported"))
}
