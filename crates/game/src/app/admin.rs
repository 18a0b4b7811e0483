use std::fmt;
use std::str::FromStr;

use rhythm_engine::Catalog;
use serde::Serialize;
use tracing::info;

pub(crate) const MAX_DRAFT_CHANGES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigKey {
    Announcement,
    FeaturedLevelId,
    FeaturedTrackId,
    MaintenanceMode,
}

impl ConfigKey {
    pub(crate) const ALL: [ConfigKey; 4] = [
        ConfigKey::Announcement,
        ConfigKey::FeaturedLevelId,
        ConfigKey::FeaturedTrackId,
        ConfigKey::MaintenanceMode,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Announcement => "announcement",
            ConfigKey::FeaturedLevelId => "featured_level_id",
            ConfigKey::FeaturedTrackId => "featured_track_id",
            ConfigKey::MaintenanceMode => "maintenance_mode",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lower = raw.trim().to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = ConfigKey::ALL.iter().map(|key| key.as_str()).collect();
                format!("unknown config key '{raw}' (expected {})", known.join("|"))
            })
    }
}

/// Settings shared by every player once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct GlobalConfigData {
    pub(crate) announcement: String,
    pub(crate) featured_level_id: u32,
    pub(crate) featured_track_id: String,
    pub(crate) maintenance_mode: bool,
}

impl GlobalConfigData {
    pub(crate) fn defaults_for(catalog: &Catalog) -> Self {
        Self {
            announcement: String::new(),
            featured_level_id: catalog.first_level_id(),
            featured_track_id: catalog.first_track_id().to_string(),
            maintenance_mode: false,
        }
    }

    pub(crate) fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::Announcement => self.announcement.clone(),
            ConfigKey::FeaturedLevelId => self.featured_level_id.to_string(),
            ConfigKey::FeaturedTrackId => self.featured_track_id.clone(),
            ConfigKey::MaintenanceMode => self.maintenance_mode.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PublishedConfig {
    pub(crate) version: u32,
    pub(crate) data: GlobalConfigData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DraftChange {
    key: ConfigKey,
    before: GlobalConfigData,
}

/// Draft and published global config plus the admin access gate.
///
/// Changes land in the draft first. Publishing copies the draft over the
/// published config and bumps its version.
#[derive(Debug)]
pub(crate) struct AdminStore {
    access_code: String,
    unlocked: bool,
    defaults: GlobalConfigData,
    draft: GlobalConfigData,
    changes: Vec<DraftChange>,
    published: PublishedConfig,
}

impl AdminStore {
    pub(crate) fn new(catalog: &Catalog, access_code: impl Into<String>) -> Self {
        let defaults = GlobalConfigData::defaults_for(catalog);
        Self {
            access_code: access_code.into(),
            unlocked: false,
            draft: defaults.clone(),
            changes: Vec::new(),
            published: PublishedConfig {
                version: 1,
                data: defaults.clone(),
            },
            defaults,
        }
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub(crate) fn unlock(&mut self, code: &str) -> bool {
        self.unlocked = code.trim() == self.access_code;
        info!(unlocked = self.unlocked, "admin_unlock_attempt");
        self.unlocked
    }

    pub(crate) fn lock(&mut self) {
        self.unlocked = false;
    }

    pub(crate) fn draft(&self) -> &GlobalConfigData {
        &self.draft
    }

    pub(crate) fn draft_change_count(&self) -> usize {
        self.changes.len()
    }

    pub(crate) fn published(&self) -> &PublishedConfig {
        &self.published
    }

    pub(crate) fn maintenance_active(&self) -> bool {
        self.published.data.maintenance_mode
    }

    /// Flips maintenance on the live config without going through the draft.
    pub(crate) fn set_published_maintenance(&mut self, enabled: bool) {
        self.published.data.maintenance_mode = enabled;
        info!(enabled, "admin_maintenance_forced");
    }

    /// Parses and validates `raw` for `key`, then records the change in the draft.
    pub(crate) fn set_draft(
        &mut self,
        catalog: &Catalog,
        key: ConfigKey,
        raw: &str,
    ) -> Result<String, String> {
        let before = self.draft.clone();
        let mut next = self.draft.clone();
        match key {
            ConfigKey::Announcement => {
                next.announcement = raw.trim().to_string();
            }
            ConfigKey::FeaturedLevelId => {
                let level_id = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid level id '{raw}' (expected u32)"))?;
                catalog.level(level_id).map_err(|error| error.to_string())?;
                next.featured_level_id = level_id;
            }
            ConfigKey::FeaturedTrackId => {
                let track = catalog.track(raw.trim()).map_err(|error| error.to_string())?;
                next.featured_track_id = track.id.clone();
            }
            ConfigKey::MaintenanceMode => {
                next.maintenance_mode = parse_flag(raw)?;
            }
        }

        if self.changes.len() == MAX_DRAFT_CHANGES {
            self.changes.remove(0);
        }
        self.changes.push(DraftChange { key, before });
        self.draft = next;
        let value = self.draft.get(key);
        info!(key = key.as_str(), value = value.as_str(), "admin_draft_changed");
        Ok(value)
    }

    /// Reverts the most recent draft change.
    pub(crate) fn undo(&mut self) -> Option<ConfigKey> {
        let change = self.changes.pop()?;
        self.draft = change.before;
        Some(change.key)
    }

    pub(crate) fn reset_draft(&mut self) {
        self.draft = self.defaults.clone();
        self.changes.clear();
    }

    pub(crate) fn publish(&mut self) -> &PublishedConfig {
        self.published.data = self.draft.clone();
        self.published.version += 1;
        self.changes.clear();
        info!(
            version = self.published.version,
            maintenance_mode = self.published.data.maintenance_mode,
            "admin_config_published"
        );
        &self.published
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(format!("invalid flag '{raw}' (expected on|off)")),
    }
}
