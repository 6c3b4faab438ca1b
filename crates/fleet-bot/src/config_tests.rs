#[cfg(test)]
mod tests {
    use crate::aggregate::Deadline;
    use crate::config::{Config, ReadEnv};
    use fleet_types::CommandKind;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    struct InMemoryEnv(HashMap<&'static str, &'static str>);

    impl InMemoryEnv {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Self(pairs.iter().cloned().collect())
        }
    }

    impl ReadEnv for InMemoryEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── from_file ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_file_minimal() {
        let toml = r#"
[discord]
bot_token = "BOT-TOKEN-123"
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.bot_token, "BOT-TOKEN-123");
        assert_eq!(cfg.discord.prefix, "!");
        assert_eq!(cfg.kv.servers, vec!["localhost:4222"]);
        assert_eq!(cfg.pagination.char_budget, 5600);
        assert_eq!(cfg.pagination.max_fields, 23);
        assert_eq!(cfg.pagination.max_fragment_chars, 800);
        assert_eq!(cfg.reaper.interval(), Duration::from_secs(60));
        assert!(cfg.commands.is_empty());
    }

    #[test]
    fn test_from_file_full() {
        let toml = r#"
[discord]
bot_token = "SECRET"
prefix = "?"
documentation_url = "https://docs.example.com"

[discord.colours]
ok = 1
warn = 2

[kv]
servers = ["nats://host1:4222", "nats://host2:4222"]
bucket = "pending_test"
max_age_secs = 900

[services]
game_api_url = "http://game:9000"
game_api_token = "gtok"
guild_service = "fleet-beta"

[pagination]
char_budget = 4000
max_fields = 20

[deadlines]
read_secs = 30
write_secs = 10
fallback_secs = 40

[reaper]
interval_secs = 15

[[commands]]
kind = "ban"
long = "ban"
short = "b"
min_args = 1
max_args = 2
workers = 8
usage = "ban <player> [server_id]"

[confirmations.ban]
base = "ban_reaction"
ttl_secs = 90
reaction = "<:yes:42>"
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();

        assert_eq!(cfg.discord.prefix, "?");
        assert_eq!(cfg.discord.colours.ok, 1);
        assert_eq!(cfg.discord.colours.error, 0xe74c3c);
        assert_eq!(cfg.kv.servers.len(), 2);
        assert_eq!(cfg.kv.bucket, "pending_test");
        assert_eq!(cfg.services.game_api_url, "http://game:9000");
        assert_eq!(cfg.services.guild_config_url, "http://localhost:8081");
        assert_eq!(cfg.pagination.char_budget, 4000);
        assert_eq!(cfg.pagination.max_fragment_chars, 800);
        assert_eq!(cfg.deadlines.read(), Deadline::Fixed(Duration::from_secs(30)));
        assert_eq!(
            cfg.deadlines.write(),
            Deadline::Lazy {
                after_first: Duration::from_secs(10),
                fallback: Duration::from_secs(40),
            }
        );
        assert_eq!(cfg.reaper.interval_secs, 15);

        assert_eq!(cfg.commands.len(), 1);
        assert_eq!(cfg.commands[0].kind, CommandKind::Ban);
        assert_eq!(cfg.commands[0].short.as_deref(), Some("b"));
        assert_eq!(cfg.commands[0].max_args, Some(2));
        assert!(cfg.commands[0].enabled);

        let ban = cfg.confirmation(CommandKind::Ban);
        assert_eq!(ban.base, "ban_reaction");
        assert_eq!(ban.ttl_secs, 90);
        assert_eq!(ban.reaction, "<:yes:42>");
    }

    #[test]
    fn test_confirmation_defaults_per_kind() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        let stop = cfg.confirmation(CommandKind::Stop);
        assert_eq!(stop.base, "stop");
        assert_eq!(stop.ttl(), Duration::from_secs(300));
        assert_eq!(stop.reaction, "✅");
    }

    #[test]
    fn test_from_file_missing_returns_error() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_invalid_toml_returns_error() {
        let f = write_toml("this is not valid toml !!!");
        let result = Config::from_file(f.path().to_str().unwrap());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to parse config file"));
    }

    #[test]
    fn test_from_file_unknown_command_kind_is_rejected() {
        let toml = r#"
[discord]
bot_token = "TOK"

[[commands]]
kind = "reboot"
long = "reboot"
"#;
        let f = write_toml(toml);
        assert!(Config::from_file(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_confirmation_outliving_the_kv_bucket_is_rejected() {
        let toml = r#"
[discord]
bot_token = "TOK"

[kv]
max_age_secs = 3600

[confirmations.ban]
base = "ban_reaction"
ttl_secs = 7200
"#;
        let f = write_toml(toml);
        let err = Config::from_file(f.path().to_str().unwrap()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Invalid config file"));
        assert!(msg.contains("confirmations.ban"));
        assert!(msg.contains("exceeds kv.max_age_secs"));
    }

    #[test]
    fn test_confirmation_at_the_kv_limit_is_accepted() {
        let toml = r#"
[discord]
bot_token = "TOK"

[kv]
max_age_secs = 600

[confirmations.refresh_bans]
base = "refresh_bans_reaction"
ttl_secs = 600
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.confirmation(CommandKind::RefreshBans).ttl_secs, 600);
    }

    #[test]
    fn test_default_ttl_must_fit_the_kv_bucket() {
        let toml = r#"
[discord]
bot_token = "TOK"

[kv]
max_age_secs = 60
"#;
        let f = write_toml(toml);
        let err = Config::from_file(f.path().to_str().unwrap()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("ttl_secs (300) exceeds kv.max_age_secs (60)"));
    }

    // ── from_env ──────────────────────────────────────────────────────────────

    #[test]
    fn test_from_env_missing_token_returns_error() {
        let env = InMemoryEnv::new(&[]);
        let result = Config::from_env_impl(&env);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "env-token-abc"),
            ("NATS_URL", "nats://a:4222, nats://b:4222"),
            ("COMMAND_PREFIX", "$"),
            ("GAME_API_URL", "http://game"),
            ("GUILD_SERVICE", "fleet-x"),
            ("KV_BUCKET", "other"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.bot_token, "env-token-abc");
        assert_eq!(cfg.discord.prefix, "$");
        assert_eq!(cfg.kv.servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(cfg.kv.bucket, "other");
        assert_eq!(cfg.services.game_api_url, "http://game");
        assert_eq!(cfg.services.guild_service, "fleet-x");
    }

    #[test]
    fn test_from_env_defaults() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.prefix, "!");
        assert_eq!(cfg.kv.servers, vec!["localhost:4222"]);
        assert_eq!(cfg.services.guild_service, "fleet");
        assert!(cfg.discord.documentation_url.is_none());
        assert_eq!(cfg.services.request_timeout(), Duration::from_secs(30));
    }
}
