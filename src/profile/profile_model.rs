use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AutofillError;

// ============================================================================
// Categorized profile model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileField {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ProfileField>,
}

/// A named set of personal data grouped into categories.
///
/// Field keys are unique across all categories; `add_field` enforces this at
/// creation time by suffixing colliding keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<ProfileCategory>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Flat key → value profile from before categories existed.
pub type LegacyProfile = IndexMap<String, String>;

pub const IMPORTED_CATEGORY_ID: &str = "imported";

impl UserProfile {
    /// New profile seeded with the default categories and empty values.
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            categories: default_categories(),
            created_at: now,
            updated_at: now,
        }
    }

    /// First field with this key, scanning categories in order.
    pub fn value_for(&self, key: &str) -> Option<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.fields.iter())
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn profile_keys(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| c.fields.iter().map(|f| f.key.clone()))
            .collect()
    }

    pub fn is_key_taken(&self, key: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.fields.iter().any(|f| f.key == key))
    }

    /// Add a field named `display_name` to a category, deriving a key that is
    /// unique across the whole profile. Returns the key, or `None` when the
    /// category does not exist or the name has no usable characters.
    pub fn add_field(&mut self, category_id: &str, display_name: &str) -> Option<String> {
        let base = generate_field_key(display_name);
        if base.is_empty() {
            return None;
        }
        let key = self.unique_key(&base);
        let category = self.categories.iter_mut().find(|c| c.id == category_id)?;
        category.fields.push(ProfileField {
            key: key.clone(),
            value: String::new(),
            label: Some(display_name.trim().to_string()),
        });
        Some(key)
    }

    fn unique_key(&self, base: &str) -> String {
        if !self.is_key_taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.is_key_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> bool {
        let field = self
            .categories
            .iter_mut()
            .flat_map(|c| c.fields.iter_mut())
            .find(|f| f.key == key);
        match field {
            Some(f) => {
                f.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn to_legacy(&self) -> LegacyProfile {
        let mut flat = LegacyProfile::new();
        for field in self.categories.iter().flat_map(|c| c.fields.iter()) {
            flat.entry(field.key.clone())
                .or_insert_with(|| field.value.clone());
        }
        flat
    }

    /// Copy legacy values onto matching keys; keys the profile does not know
    /// yet land in an "Imported" category so nothing is dropped.
    pub fn merge_legacy(&mut self, legacy: &LegacyProfile) {
        for (key, value) in legacy {
            if self.set_value(key, value) {
                continue;
            }
            let category = match self
                .categories
                .iter()
                .position(|c| c.id == IMPORTED_CATEGORY_ID)
            {
                Some(i) => &mut self.categories[i],
                None => {
                    self.categories.push(ProfileCategory {
                        id: IMPORTED_CATEGORY_ID.to_string(),
                        name: "Imported".to_string(),
                        fields: Vec::new(),
                    });
                    let last = self.categories.len() - 1;
                    &mut self.categories[last]
                }
            };
            category.fields.push(ProfileField {
                key: key.clone(),
                value: value.clone(),
                label: Some(key.clone()),
            });
        }
        self.updated_at = Utc::now();
    }

    /// Categorized profile built from a legacy map on top of the defaults.
    pub fn from_legacy(name: &str, legacy: &LegacyProfile) -> Self {
        let mut profile = Self::new(name);
        profile.merge_legacy(legacy);
        profile
    }
}

static NON_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("key pattern is valid"));

/// "First Name" → "first_name".
pub fn generate_field_key(display_name: &str) -> String {
    NON_KEY_CHARS
        .replace_all(&display_name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

pub fn default_categories() -> Vec<ProfileCategory> {
    fn category(id: &str, name: &str, fields: &[(&str, &str)]) -> ProfileCategory {
        ProfileCategory {
            id: id.to_string(),
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(key, label)| ProfileField {
                    key: key.to_string(),
                    value: String::new(),
                    label: Some(label.to_string()),
                })
                .collect(),
        }
    }

    vec![
        category(
            "personal",
            "Personal Information",
            &[
                ("first_name", "First Name"),
                ("last_name", "Last Name"),
                ("email", "Email"),
                ("phone", "Phone"),
            ],
        ),
        category(
            "address",
            "Address",
            &[
                ("addr_line1", "Address Line 1"),
                ("addr_line2", "Address Line 2"),
                ("city", "City"),
                ("state", "State"),
                ("postal_code", "Postal Code"),
                ("country", "Country"),
            ],
        ),
        category(
            "passport",
            "Passport",
            &[
                ("passport_num", "Passport Number"),
                ("passport_country", "Passport Country"),
                ("nationality", "Nationality"),
                ("passport_issue_place", "Place of Issue"),
                ("passport_issue_date", "Issue Date"),
                ("passport_expiry_date", "Expiry Date"),
            ],
        ),
    ]
}

// ============================================================================
// Either shape, detected structurally
// ============================================================================

/// A profile as handed to the fill step: categorized, or a flat legacy map.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSource {
    Categorized(UserProfile),
    Legacy(LegacyProfile),
}

impl ProfileSource {
    /// Objects with neither `categories` nor `id` are legacy maps.
    pub fn from_value(value: Value) -> Result<Self, AutofillError> {
        let Value::Object(map) = value else {
            return Err(AutofillError::InvalidProfile(
                "profile must be a JSON object".to_string(),
            ));
        };

        if map.contains_key("categories") || map.contains_key("id") {
            let profile: UserProfile = serde_json::from_value(Value::Object(map))
                .map_err(|e| AutofillError::json("categorized profile", e))?;
            return Ok(ProfileSource::Categorized(profile));
        }

        let legacy = map
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect();
        Ok(ProfileSource::Legacy(legacy))
    }

    pub fn value_for(&self, key: &str) -> Option<&str> {
        match self {
            ProfileSource::Categorized(profile) => profile.value_for(key),
            ProfileSource::Legacy(map) => map.get(key).map(String::as_str),
        }
    }

    pub fn profile_keys(&self) -> Vec<String> {
        match self {
            ProfileSource::Categorized(profile) => profile.profile_keys(),
            ProfileSource::Legacy(map) => map.keys().cloned().collect(),
        }
    }

    /// Upgrade to the categorized form; categorized input passes through.
    pub fn into_categorized(self, name_if_legacy: &str) -> UserProfile {
        match self {
            ProfileSource::Categorized(profile) => profile,
            ProfileSource::Legacy(map) => UserProfile::from_legacy(name_if_legacy, &map),
        }
    }
}

impl<'de> Deserialize<'de> for ProfileSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ProfileSource::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<UserProfile> for ProfileSource {
    fn from(profile: UserProfile) -> Self {
        ProfileSource::Categorized(profile)
    }
}
