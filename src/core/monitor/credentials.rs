use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::core::settings::SettingsStore;

/// Settings keys the credential set is persisted under.
pub const KEYS: [&str; 7] = [
    "minecraft_uuid",
    "minecraft_access_token",
    "minecraft_username",
    "minecraft_game_dir",
    "minecraft_client_id",
    "minecraft_xuid",
    "minecraft_user_type",
];

/// Session credentials of a running, already authenticated game client.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub uuid: String,
    pub access_token: String,
    pub username: String,
    pub game_dir: String,
    pub client_id: String,
    pub xuid: String,
    pub user_type: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uuid", &self.uuid)
            .field("access_token", &"<redacted>")
            .field("username", &self.username)
            .field("game_dir", &self.game_dir)
            .field("client_id", &self.client_id)
            .field("xuid", &self.xuid)
            .field("user_type", &self.user_type)
            .finish()
    }
}

impl Credentials {
    fn values(&self) -> [&str; 7] {
        [
            &self.uuid,
            &self.access_token,
            &self.username,
            &self.game_dir,
            &self.client_id,
            &self.xuid,
            &self.user_type,
        ]
    }

    /// All seven fields present. An empty string means unset.
    pub fn is_complete(&self) -> bool {
        self.values().iter().all(|value| !value.is_empty())
    }

    /// Read the persisted set. `None` unless every key holds a value.
    pub fn load(store: &dyn SettingsStore) -> AppResult<Option<Self>> {
        let get = |key: &str| -> AppResult<String> { Ok(store.get(key)?.unwrap_or_default()) };

        let credentials = Self {
            uuid: get(KEYS[0])?,
            access_token: get(KEYS[1])?,
            username: get(KEYS[2])?,
            game_dir: get(KEYS[3])?,
            client_id: get(KEYS[4])?,
            xuid: get(KEYS[5])?,
            user_type: get(KEYS[6])?,
        };
        Ok(credentials.is_complete().then_some(credentials))
    }

    /// Write all seven keys in one store update.
    pub fn persist(&self, store: &dyn SettingsStore) -> AppResult<()> {
        let entries: Vec<(&str, &str)> = KEYS.into_iter().zip(self.values()).collect();
        store.set_many(&entries)
    }

    /// Build a credential set from a game client's command line. `None`
    /// unless every field is present and non-empty.
    pub fn from_launch_args<S: AsRef<str>>(args: &[S]) -> Option<Self> {
        let mut parsed = parse_launch_args(args);
        let mut take = |key: &str| parsed.remove(key).unwrap_or_default();

        let credentials = Self {
            uuid: take("uuid"),
            access_token: take("accessToken"),
            username: take("username"),
            game_dir: take("gameDir"),
            client_id: take("clientId"),
            xuid: take("xuid"),
            user_type: take("userType"),
        };
        credentials.is_complete().then_some(credentials)
    }
}

/// Overwrite every persisted credential key with the empty string.
pub fn delete_credentials(store: &dyn SettingsStore) -> AppResult<()> {
    let entries: Vec<(&str, &str)> = KEYS.into_iter().map(|key| (key, "")).collect();
    store.set_many(&entries)
}

/// Collect `--key value` pairs. A flag directly followed by another flag
/// has no value and is skipped; later occurrences win.
pub fn parse_launch_args<S: AsRef<str>>(args: &[S]) -> HashMap<String, String> {
    let mut parsed = HashMap::new();
    let mut current_key: Option<&str> = None;

    for arg in args {
        let arg = arg.as_ref();
        if let Some(key) = arg.strip_prefix("--") {
            current_key = Some(key);
        } else if let Some(key) = current_key.take() {
            parsed.insert(key.to_string(), arg.to_string());
        }
    }
    parsed
}
