//! Application settings management

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;

/// Settings for the chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// API key for the completion backend (env: DEEPSEEK_API_KEY)
    pub api_key: Option<String>,
    /// Base URL of the completion backend
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Leave the model's reasoning mode on; off sends reasoning_effort=none
    #[serde(default)]
    pub enable_thinking: bool,
    /// Force the simulated backend regardless of API key (env: STYLUS_SIMULATED)
    #[serde(default)]
    pub use_simulated: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            enable_thinking: false,
            use_simulated: false,
        }
    }
}

/// Settings for the archival record store, reached through the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Base URL of the credential proxy, including the routing prefix
    pub base_url: String,
    /// Record store app (spreadsheet) identifier
    pub base_id: String,
    /// Table identifier within the app
    pub table_id: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/record-api".to_string(),
            base_id: "D6LobZNPoalgEysACHKcGShln6d".to_string(),
            table_id: "tbliAsv53wMBI3yG".to_string(),
        }
    }
}

/// Settings for the credential proxy server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Address the proxy listens on
    pub listen_addr: String,
    /// Upstream platform base URL
    pub upstream_url: String,
    /// Routing prefix stripped from incoming paths
    pub route_prefix: String,
    /// Server-held credential pair for the token exchange
    /// (env: RECORD_APP_ID / RECORD_APP_SECRET)
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            upstream_url: "https://open.feishu.cn".to_string(),
            route_prefix: "/record-api/".to_string(),
            app_id: None,
            app_secret: None,
        }
    }
}

/// Application settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found.
    /// Environment variables override file values.
    pub fn load() -> Self {
        let mut settings = Self::load_file();
        settings.apply_env();
        settings
    }

    fn load_file() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            self.chat.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("DEEPSEEK_BASE_URL") {
            self.chat.base_url = url;
        }
        if let Ok(model) = std::env::var("DEEPSEEK_MODEL") {
            self.chat.model = model;
        }
        if let Ok(flag) = std::env::var("STYLUS_SIMULATED") {
            self.chat.use_simulated = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
        if let Ok(id) = std::env::var("RECORD_APP_ID") {
            self.proxy.app_id = Some(id);
        }
        if let Ok(secret) = std::env::var("RECORD_APP_SECRET") {
            self.proxy.app_secret = Some(secret);
        }
        if let Ok(base) = std::env::var("RECORD_BASE_ID") {
            self.archive.base_id = base;
        }
        if let Ok(table) = std::env::var("RECORD_TABLE_ID") {
            self.archive.table_id = table;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_proxy() {
        let settings = Settings::default();
        assert!(settings.archive.base_url.ends_with("/record-api"));
        assert_eq!(settings.proxy.route_prefix, "/record-api/");
        assert!(settings.proxy.app_id.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chat]
            api_key = "sk-test"
            base_url = "https://example.test"
            model = "deepseek-chat"
            temperature = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(settings.chat.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.chat.temperature, 0.2);
        assert!(!settings.chat.use_simulated);
        // Untouched sections come from defaults
        assert_eq!(settings.proxy.listen_addr, "127.0.0.1:8787");
    }
}
