use form_autofill::error::AutofillError;
use form_autofill::profile::profile_model::{
    IMPORTED_CATEGORY_ID, LegacyProfile, ProfileSource, UserProfile, default_categories, generate_field_key,
};
use form_autofill::profile::store::{
    EXPORT_FORMAT, InMemoryStore, JsonFileStore, ProfileStore, export_profile, parse_import,
};

// =========================================================================
// Model
// =========================================================================

#[test]
fn field_keys_are_derived_from_display_names() {
    assert_eq!(generate_field_key("First Name"), "first_name");
    assert_eq!(generate_field_key("  Passport #  "), "passport");
    assert_eq!(generate_field_key("Address -- Line 2"), "address_line_2");
    assert_eq!(generate_field_key("!!!"), "");
}

#[test]
fn new_profiles_get_the_default_categories() {
    let profile = UserProfile::new("Me");
    let ids: Vec<_> = profile.categories.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["personal", "address", "passport"]);
    assert_eq!(profile.categories, default_categories());
    assert!(profile.profile_keys().contains(&"passport_expiry_date".to_string()));
    assert_eq!(profile.value_for("email"), Some(""));
}

#[test]
fn colliding_field_keys_get_a_numeric_suffix() {
    let mut profile = UserProfile::new("Me");
    assert_eq!(profile.add_field("personal", "Email"), Some("email_2".into()));
    assert_eq!(profile.add_field("address", "E-mail"), Some("e_mail".into()));
    assert_eq!(profile.add_field("passport", "email"), Some("email_3".into()));
    assert_eq!(profile.add_field("missing", "Nickname"), None);
    assert_eq!(profile.add_field("personal", "???"), None);

    let keys = profile.profile_keys();
    let mut unique = keys.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(keys.len(), unique.len());
}

#[test]
fn flat_map_is_read_as_legacy() {
    let source: ProfileSource = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
    assert!(matches!(source, ProfileSource::Legacy(_)));
    assert_eq!(source.value_for("email"), Some("a@b.com"));
    assert_eq!(source.value_for("phone"), None);
}

#[test]
fn object_with_id_or_categories_is_categorized() {
    let with_id: ProfileSource =
        serde_json::from_str(r#"{"id":"p1","name":"Work","categories":[]}"#).unwrap();
    assert!(matches!(with_id, ProfileSource::Categorized(_)));

    let with_categories: ProfileSource = serde_json::from_str(
        r#"{"id":"p2","name":"Home","categories":[{"id":"personal","name":"Personal","fields":[{"key":"email","value":"x@y.z"}]}]}"#,
    )
    .unwrap();
    assert_eq!(with_categories.value_for("email"), Some("x@y.z"));
}

#[test]
fn legacy_upgrade_keeps_every_value() {
    let source: ProfileSource =
        serde_json::from_str(r#"{"email":"a@b.com","nickname":"AB","age":42}"#).unwrap();
    let profile = source.into_categorized("Upgraded");

    assert_eq!(profile.name, "Upgraded");
    assert_eq!(profile.value_for("email"), Some("a@b.com"));
    assert_eq!(profile.value_for("nickname"), Some("AB"));
    assert_eq!(profile.value_for("age"), Some("42"));

    let imported = profile
        .categories
        .iter()
        .find(|c| c.id == IMPORTED_CATEGORY_ID)
        .unwrap();
    assert_eq!(imported.fields.len(), 2);
}

#[test]
fn non_object_profile_is_rejected() {
    let err = serde_json::from_str::<ProfileSource>("[1,2,3]").unwrap_err();
    assert!(err.to_string().contains("JSON object"));
}

// =========================================================================
// In-memory store
// =========================================================================

#[test]
fn first_profile_becomes_active() {
    let mut store = InMemoryStore::new();
    assert!(matches!(store.active_profile(), Err(AutofillError::NoActiveProfile)));

    let first = store.create_profile("Home").unwrap();
    let _second = store.create_profile("Work").unwrap();
    assert_eq!(store.active_profile().unwrap().id, first.id);
    assert_eq!(store.list_profiles().len(), 2);
}

#[test]
fn deleting_active_profile_falls_back_to_first_remaining() {
    let mut store = InMemoryStore::new();
    let home = store.create_profile("Home").unwrap();
    let work = store.create_profile("Work").unwrap();
    let travel = store.create_profile("Travel").unwrap();

    store.set_active(&travel.id).unwrap();
    store.delete_profile(&travel.id).unwrap();
    assert_eq!(store.active_profile().unwrap().id, home.id);

    store.delete_profile(&home.id).unwrap();
    assert_eq!(store.active_profile().unwrap().id, work.id);

    store.delete_profile(&work.id).unwrap();
    assert!(matches!(store.active_profile(), Err(AutofillError::NoActiveProfile)));
}

#[test]
fn unknown_ids_are_reported() {
    let mut store = InMemoryStore::new();
    assert!(matches!(store.set_active("nope"), Err(AutofillError::ProfileNotFound(_))));
    assert!(matches!(store.delete_profile("nope"), Err(AutofillError::ProfileNotFound(_))));
    assert!(matches!(
        store.update_profile(UserProfile::new("ghost")),
        Err(AutofillError::ProfileNotFound(_))
    ));
}

#[test]
fn save_legacy_merges_into_active_profile() {
    let mut store = InMemoryStore::new();
    let legacy: LegacyProfile = [("email".to_string(), "a@b.com".to_string())].into_iter().collect();

    // Creates a profile on demand when the store is empty.
    store.save_legacy(&legacy).unwrap();
    let profile = store.active_profile().unwrap();
    assert_eq!(profile.value_for("email"), Some("a@b.com"));
    assert_eq!(profile.to_legacy().get("email").map(String::as_str), Some("a@b.com"));
}

// =========================================================================
// JSON file store
// =========================================================================

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("profiles.json");

    let id = {
        let mut store = JsonFileStore::open(&path).unwrap();
        let mut profile = store.create_profile("Home").unwrap();
        profile.set_value("city", "Lisbon");
        store.update_profile(profile.clone()).unwrap();
        store.set_enabled(false).unwrap();
        profile.id
    };

    let store = JsonFileStore::open(&path).unwrap();
    let active = store.active_profile().unwrap();
    assert_eq!(active.id, id);
    assert_eq!(active.value_for("city"), Some("Lisbon"));
    assert!(!store.enabled());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["activeProfileId"], id.as_str());
}

#[test]
fn file_store_upgrades_legacy_file_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(&path, r#"{"email":"a@b.com","phone":"555"}"#).unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    let active = store.active_profile().unwrap();
    assert_eq!(active.value_for("email"), Some("a@b.com"));
    assert_eq!(active.value_for("phone"), Some("555"));
    assert!(store.enabled());
}

#[test]
fn missing_file_store_starts_empty_and_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("none.json")).unwrap();
    assert!(store.list_profiles().is_empty());
    assert!(store.enabled());
}

#[test]
fn corrupt_file_store_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(JsonFileStore::open(&path), Err(AutofillError::Json { .. })));
}

// =========================================================================
// Export / import
// =========================================================================

#[test]
fn export_envelope_round_trips_through_import() {
    let mut profile = UserProfile::new("Home");
    profile.set_value("email", "a@b.com");

    let json = export_profile(&profile).unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(envelope["format"], EXPORT_FORMAT);
    assert_eq!(envelope["version"], 1);
    assert!(envelope["exportedAt"].is_string());

    let imported = parse_import(&json).unwrap();
    assert_eq!(imported, profile);
}

#[test]
fn import_accepts_flat_legacy_objects() {
    let imported = parse_import(r#"{"first_name":"Ada"}"#).unwrap();
    assert_eq!(imported.value_for("first_name"), Some("Ada"));
}

#[test]
fn import_rejects_foreign_envelopes() {
    let err = parse_import(r#"{"format":"something-else","profile":{}}"#).unwrap_err();
    assert!(matches!(err, AutofillError::InvalidProfile(_)));
}

#[test]
fn imported_profile_gets_a_fresh_id() {
    let original = UserProfile::new("Home");
    let mut store = InMemoryStore::with_profile(original.clone());

    let json = export_profile(&original).unwrap();
    let imported = store.import_profile(&json).unwrap();

    assert_ne!(imported.id, original.id);
    assert_eq!(store.list_profiles().len(), 2);
    assert_eq!(store.active_profile().unwrap().id, original.id);
}
