use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    /// Channel whose history is scanned for tracks and links
    pub source_channel_id: u64,
    /// Channel that `cool` forwards the last pick into
    pub forward_channel_id: u64,
    pub database_url: String,
    pub command_prefix: String,
    pub catalog_refresh_secs: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            source_channel_id: env::var("DISCORD_CHANNEL_ID")
                .map_err(|_| anyhow::anyhow!("DISCORD_CHANNEL_ID must be set"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("DISCORD_CHANNEL_ID must be a valid u64"))?,
            forward_channel_id: env::var("DISCORD_FORWARD_CHANNEL_ID")
                .map_err(|_| anyhow::anyhow!("DISCORD_FORWARD_CHANNEL_ID must be set"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("DISCORD_FORWARD_CHANNEL_ID must be a valid u64"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/tracks.db".to_string()),
            command_prefix: env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),
            catalog_refresh_secs: env::var("CATALOG_REFRESH_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("source_channel_id", &self.source_channel_id)
            .field("forward_channel_id", &self.forward_channel_id)
            .field("database_url", &self.database_url)
            .field("command_prefix", &self.command_prefix)
            .field("catalog_refresh_secs", &self.catalog_refresh_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Test missing vars
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("DISCORD_CHANNEL_ID");
        env::remove_var("DISCORD_FORWARD_CHANNEL_ID");
        let result = Config::build();
        assert!(
            result.is_err(),
            "Should fail when required vars are missing"
        );

        // 2. Channel ids must be numeric
        env::set_var("DISCORD_TOKEN", "test_token");
        env::set_var("DISCORD_CHANNEL_ID", "general");
        env::set_var("DISCORD_FORWARD_CHANNEL_ID", "222");
        assert!(Config::build().is_err());

        // 3. Test defaults
        env::set_var("DISCORD_CHANNEL_ID", "111");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.source_channel_id, 111);
        assert_eq!(config.forward_channel_id, 222);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.catalog_refresh_secs, 3600);

        // 4. Test debug redaction
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("DISCORD_CHANNEL_ID");
        env::remove_var("DISCORD_FORWARD_CHANNEL_ID");
    }
}
