use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Incoming-webhook URL of the target chat channel. Required.
    pub webhook_url: String,
    /// Only events whose source image matches this pattern are forwarded.
    pub image_regexp: String,
    /// Include node/cluster identity in status and per-event messages.
    pub include_hostname: bool,
    pub username: String,
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            image_regexp: ".*".into(),
            include_hostname: false,
            username: "docker".into(),
            icon_emoji: ":whale:".into(),
            hostname: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("whalehook.toml"))
            .merge(Json::file("whalehook.json"))
            .merge(Env::prefixed("WHALEHOOK_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // In a Docker container, HOSTNAME carries the container's hostname.
        if config.hostname.is_none() {
            config.hostname = std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty());
        }

        if config.webhook_url.is_empty() {
            anyhow::bail!("webhook_url is not configured (set WHALEHOOK_WEBHOOK_URL)");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.image_regexp, ".*");
        assert!(!config.include_hostname);
        assert_eq!(config.username, "docker");
        assert_eq!(config.icon_emoji, ":whale:");
    }
}
