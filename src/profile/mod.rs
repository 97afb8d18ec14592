//! Named connection profiles with one active selection.
//!
//! Passwords never enter the `profiles` map. Each one lives under its own derived
//! key (`profile_pass<name>`), and the map is written through [`StoredProfile`],
//! a type that has no password field at all.

pub mod error;

pub use error::{ProfileError, ProfileResult};

use crate::store::{Store, keys};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Connection credentials for one queue service
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileValues {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for ProfileValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileValues")
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl ProfileValues {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Persisted shape of a profile: everything except the password
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
}

impl From<&ProfileValues> for StoredProfile {
    fn from(values: &ProfileValues) -> Self {
        Self {
            url: values.url.clone(),
            api_key: values.api_key.clone(),
            username: values.username.clone(),
        }
    }
}

impl StoredProfile {
    fn with_password(self, password: String) -> ProfileValues {
        ProfileValues {
            url: self.url,
            api_key: self.api_key,
            username: self.username,
            password,
        }
    }
}

/// A named profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub values: ProfileValues,
}

/// Profile CRUD on top of the key-value store
#[derive(Clone, Debug)]
pub struct ProfileManager {
    store: Store,
}

impl ProfileManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load(&self) -> BTreeMap<String, StoredProfile> {
        self.load_migrating().await.0
    }

    /// Load the map, also returning passwords that older clients stored inline.
    /// Those are moved to their derived keys by the next save.
    async fn load_migrating(&self) -> (BTreeMap<String, StoredProfile>, Vec<(String, String)>) {
        let Some(value) = self.store.get_raw(keys::PROFILES).await else {
            return (BTreeMap::new(), Vec::new());
        };
        let Value::Object(entries) = value else {
            tracing::warn!("Stored profiles are not a map, ignoring");
            return (BTreeMap::new(), Vec::new());
        };

        let mut profiles = BTreeMap::new();
        let mut inline_passwords = Vec::new();
        for (name, raw) in entries {
            if let Some(Value::String(password)) = raw.get("password") {
                inline_passwords.push((name.clone(), password.clone()));
            }
            match serde_json::from_value::<StoredProfile>(raw) {
                Ok(profile) => {
                    profiles.insert(name, profile);
                }
                Err(e) => tracing::warn!("Skipping unreadable profile '{}': {}", name, e),
            }
        }
        (profiles, inline_passwords)
    }

    /// Persist the map and password changes in one store write
    async fn save(
        &self,
        profiles: &BTreeMap<String, StoredProfile>,
        passwords: Vec<(String, String)>,
        extra: Vec<(String, Value)>,
    ) -> ProfileResult<()> {
        let map = serde_json::to_value(profiles).map_err(|source| {
            crate::store::StoreError::Serialize {
                key: keys::PROFILES.to_string(),
                source,
            }
        })?;

        let mut entries: Vec<(String, Value)> = vec![(keys::PROFILES.to_string(), map)];
        entries.extend(
            passwords
                .into_iter()
                .map(|(name, password)| (keys::profile_password(&name), Value::String(password))),
        );
        entries.extend(extra);

        self.store.set_many(entries).await?;
        Ok(())
    }

    /// Number of stored profiles
    pub async fn count(&self) -> usize {
        self.load().await.len()
    }

    /// Profile names in iteration order
    pub async fn names(&self) -> Vec<String> {
        self.load().await.into_keys().collect()
    }

    /// Whether a profile exists
    pub async fn contains(&self, name: &str) -> bool {
        self.load().await.contains_key(name)
    }

    /// Add a new profile. It becomes active when no stored profile is.
    pub async fn add(&self, name: &str, values: ProfileValues) -> ProfileResult<()> {
        if name.is_empty() {
            return Err(ProfileError::InvalidName);
        }

        let (mut profiles, mut passwords) = self.load_migrating().await;
        if profiles.contains_key(name) {
            return Err(ProfileError::Duplicate(name.to_string()));
        }

        profiles.insert(name.to_string(), StoredProfile::from(&values));
        passwords.push((name.to_string(), values.password));

        let mut extra = Vec::new();
        let active = self.active_name().await;
        if !active.is_some_and(|active| profiles.contains_key(&active)) {
            extra.push((keys::ACTIVE_PROFILE.to_string(), Value::String(name.to_string())));
        }

        self.save(&profiles, passwords, extra).await?;
        tracing::info!("Added profile '{}'", name);
        Ok(())
    }

    /// Replace a profile's values, optionally renaming it
    pub async fn edit(
        &self,
        name: &str,
        values: ProfileValues,
        new_name: &str,
    ) -> ProfileResult<()> {
        if new_name.is_empty() {
            return Err(ProfileError::InvalidName);
        }

        let (mut profiles, mut passwords) = self.load_migrating().await;
        if !profiles.contains_key(name) {
            return Err(ProfileError::Missing(name.to_string()));
        }

        let mut extra = Vec::new();
        if name != new_name {
            if profiles.contains_key(new_name) {
                return Err(ProfileError::RenameConflict(new_name.to_string()));
            }
            profiles.remove(name);

            if self.active_name().await.as_deref() == Some(name) {
                extra.push((
                    keys::ACTIVE_PROFILE.to_string(),
                    Value::String(new_name.to_string()),
                ));
            }
        }

        profiles.insert(new_name.to_string(), StoredProfile::from(&values));
        passwords.retain(|(owner, _)| owner != name && owner != new_name);
        passwords.push((new_name.to_string(), values.password));
        self.save(&profiles, passwords, extra).await?;

        if name != new_name {
            self.store.remove(&keys::profile_password(name)).await?;
            tracing::info!("Renamed profile '{}' to '{}'", name, new_name);
        } else {
            tracing::info!("Updated profile '{}'", name);
        }
        Ok(())
    }

    /// Remove a profile and return the active profile afterwards.
    ///
    /// When the removed profile was active, the first remaining profile is promoted;
    /// when none remain, the active selection is cleared.
    pub async fn remove(&self, name: &str) -> ProfileResult<Option<String>> {
        let (mut profiles, mut passwords) = self.load_migrating().await;
        if profiles.remove(name).is_none() {
            return Err(ProfileError::Missing(name.to_string()));
        }
        passwords.retain(|(owner, _)| owner != name);

        let current = self.active_name().await;
        let active = match current {
            Some(active) if active != name && profiles.contains_key(&active) => Some(active),
            _ => profiles.keys().next().cloned(),
        };

        let active_value = active.clone().map(Value::String).unwrap_or(Value::Null);
        self.save(
            &profiles,
            passwords,
            vec![(keys::ACTIVE_PROFILE.to_string(), active_value)],
        )
        .await?;
        self.store.remove(&keys::profile_password(name)).await?;

        tracing::info!("Removed profile '{}', active is now {:?}", name, active);
        Ok(active)
    }

    /// Look up a profile, joining its password back in
    pub async fn get(&self, name: &str) -> Option<Profile> {
        if name.is_empty() {
            return None;
        }
        let stored = self.load().await.remove(name)?;

        let password = match self.store.get_string(&keys::profile_password(name)).await {
            Some(p) if p != "null" => p,
            _ => String::new(),
        };

        Some(Profile {
            name: name.to_string(),
            values: stored.with_password(password),
        })
    }

    /// Name of the active profile, if one is set
    pub async fn active_name(&self) -> Option<String> {
        self.store
            .get::<String>(keys::ACTIVE_PROFILE)
            .await
            .filter(|name| !name.is_empty())
    }

    /// The active profile, if it is set and still exists
    pub async fn get_active(&self) -> Option<Profile> {
        let name = self.active_name().await?;
        self.get(&name).await
    }

    /// The first profile in iteration order
    pub async fn get_first(&self) -> Option<Profile> {
        let name = self.load().await.into_keys().next()?;
        self.get(&name).await
    }

    /// Make a profile active
    pub async fn set_active(&self, name: &str) -> ProfileResult<()> {
        if !self.contains(name).await {
            return Err(ProfileError::Missing(name.to_string()));
        }
        self.store.set(keys::ACTIVE_PROFILE, name).await?;
        tracing::info!("Active profile set to '{}'", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(url: &str, password: &str) -> ProfileValues {
        ProfileValues {
            url: url.to_string(),
            api_key: "key".to_string(),
            username: "user".to_string(),
            password: password.to_string(),
        }
    }

    fn manager() -> (ProfileManager, Store) {
        let store = Store::in_memory();
        (ProfileManager::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_profile_becomes_active() {
        let (profiles, _) = manager();
        profiles.add("home", values("http://a/", "pw")).await.unwrap();
        profiles.add("work", values("http://b/", "pw")).await.unwrap();

        assert_eq!(profiles.active_name().await, Some("home".to_string()));
        assert_eq!(profiles.count().await, 2);
    }

    #[tokio::test]
    async fn test_add_replaces_stale_active_name() {
        let (profiles, store) = manager();
        store.set(keys::ACTIVE_PROFILE, "ghost").await.unwrap();

        profiles.add("home", values("http://a/", "pw")).await.unwrap();

        assert_eq!(profiles.active_name().await, Some("home".to_string()));
        assert_eq!(profiles.get_active().await.unwrap().name, "home");
    }

    #[tokio::test]
    async fn test_add_duplicate_keeps_original() {
        let (profiles, _) = manager();
        profiles.add("p", values("http://first/", "one")).await.unwrap();

        let err = profiles.add("p", values("http://second/", "two")).await.unwrap_err();

        assert!(matches!(err, ProfileError::Duplicate(ref n) if n == "p"));
        let kept = profiles.get("p").await.unwrap();
        assert_eq!(kept.values, values("http://first/", "one"));
    }

    #[tokio::test]
    async fn test_password_is_stored_apart_from_profile_map() {
        let (profiles, store) = manager();
        profiles.add("home", values("http://a/", "s3cret")).await.unwrap();

        let map = store.get_raw(keys::PROFILES).await.unwrap();
        assert!(map["home"].get("password").is_none());
        assert!(!map.to_string().contains("s3cret"));
        assert_eq!(
            store.get::<String>(&keys::profile_password("home")).await,
            Some("s3cret".to_string())
        );
        assert_eq!(profiles.get("home").await.unwrap().values.password, "s3cret");
    }

    #[tokio::test]
    async fn test_legacy_inline_password_is_migrated_on_save() {
        let (profiles, store) = manager();
        store
            .set(
                keys::PROFILES,
                serde_json::json!({"old": {"url": "http://x/", "password": "inline"}}),
            )
            .await
            .unwrap();

        profiles.add("new", values("http://y/", "")).await.unwrap();

        let map = store.get_raw(keys::PROFILES).await.unwrap();
        assert!(map["old"].get("password").is_none());
        assert_eq!(profiles.get("old").await.unwrap().values.password, "inline");
    }

    #[tokio::test]
    async fn test_null_password_reads_as_empty() {
        let (profiles, store) = manager();
        profiles.add("home", values("http://a/", "")).await.unwrap();
        store.set(&keys::profile_password("home"), "null").await.unwrap();

        assert_eq!(profiles.get("home").await.unwrap().values.password, "");
    }

    #[tokio::test]
    async fn test_edit_rename_onto_existing_fails() {
        let (profiles, _) = manager();
        profiles.add("a", values("http://a/", "pa")).await.unwrap();
        profiles.add("b", values("http://b/", "pb")).await.unwrap();

        let err = profiles
            .edit("a", values("http://changed/", "x"), "b")
            .await
            .unwrap_err();

        assert!(matches!(err, ProfileError::RenameConflict(ref n) if n == "b"));
        assert_eq!(profiles.get("a").await.unwrap().values, values("http://a/", "pa"));
        assert_eq!(profiles.get("b").await.unwrap().values, values("http://b/", "pb"));
    }

    #[tokio::test]
    async fn test_edit_missing_fails() {
        let (profiles, _) = manager();
        let err = profiles
            .edit("ghost", values("http://a/", ""), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::Missing(_)));
        assert_eq!(err.code(), "profile_missing");
    }

    #[tokio::test]
    async fn test_edit_rename_moves_password_and_active() {
        let (profiles, store) = manager();
        profiles.add("a", values("http://a/", "pa")).await.unwrap();

        profiles.edit("a", values("http://a2/", "pa2"), "renamed").await.unwrap();

        assert!(!profiles.contains("a").await);
        assert!(!store.contains(&keys::profile_password("a")).await);
        assert_eq!(profiles.active_name().await, Some("renamed".to_string()));
        assert_eq!(
            profiles.get_active().await.unwrap().values,
            values("http://a2/", "pa2")
        );
    }

    #[tokio::test]
    async fn test_remove_active_promotes_remaining() {
        let (profiles, _) = manager();
        profiles.add("a", values("http://a/", "")).await.unwrap();
        profiles.add("b", values("http://b/", "")).await.unwrap();
        profiles.add("c", values("http://c/", "")).await.unwrap();

        let active = profiles.remove("a").await.unwrap();

        assert_eq!(active, Some("b".to_string()));
        assert_eq!(profiles.active_name().await, Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_remove_inactive_keeps_active() {
        let (profiles, _) = manager();
        profiles.add("a", values("http://a/", "")).await.unwrap();
        profiles.add("b", values("http://b/", "")).await.unwrap();

        assert_eq!(profiles.remove("b").await.unwrap(), Some("a".to_string()));
        assert_eq!(profiles.active_name().await, Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_remove_only_profile_clears_active() {
        let (profiles, store) = manager();
        profiles.add("solo", values("http://a/", "pw")).await.unwrap();

        assert_eq!(profiles.remove("solo").await.unwrap(), None);
        assert_eq!(profiles.active_name().await, None);
        assert!(profiles.get_active().await.is_none());
        assert!(!store.contains(&keys::profile_password("solo")).await);
    }

    #[tokio::test]
    async fn test_remove_missing_fails() {
        let (profiles, _) = manager();
        assert!(matches!(
            profiles.remove("ghost").await,
            Err(ProfileError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_set_active_requires_existing_profile() {
        let (profiles, _) = manager();
        profiles.add("a", values("http://a/", "")).await.unwrap();
        profiles.add("b", values("http://b/", "")).await.unwrap();

        profiles.set_active("b").await.unwrap();
        assert_eq!(profiles.get_active().await.unwrap().name, "b");
        assert!(profiles.set_active("nope").await.is_err());
        assert_eq!(profiles.get_first().await.unwrap().name, "a");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", values("http://a/", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("\"key\""));
    }
}
