use std::env;

/// Which backend holds the persistent meeting records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingStoreKind {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub trust_forwarded_identity: bool,
    pub admin_role: String,
    pub meeting_store: MeetingStoreKind,
    pub redis_url: String,
    pub join_path_prefix: String,
    pub stun_server: String,
    pub turn_server: Option<String>,
    pub turn_username: Option<String>,
    pub turn_credential: Option<String>,
    pub turn_shared_secret: Option<String>,
    pub turn_credential_ttl_seconds: u64,
    /// Zero disables idle-room expiry.
    pub room_idle_timeout_seconds: u64,
    pub room_reaper_interval_seconds: u64,
    pub long_poll_max_wait_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let meeting_store = match env::var("MEETING_STORE")
            .unwrap_or_else(|_| "redis".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => MeetingStoreKind::Redis,
            "memory" => MeetingStoreKind::Memory,
            other => return Err(ConfigError::InvalidMeetingStore(other.to_string())),
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            trust_forwarded_identity: env::var("TRUST_FORWARDED_IDENTITY")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            admin_role: env::var("ADMIN_ROLE").unwrap_or_else(|_| "admin".to_string()),
            meeting_store,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            join_path_prefix: env::var("JOIN_PATH_PREFIX")
                .unwrap_or_else(|_| "/meeting-room".to_string()),
            stun_server: env::var("STUN_SERVER")
                .unwrap_or_else(|_| "stun:stun.l.google.com:19302".to_string()),
            turn_server: env::var("TURN_SERVER").ok(),
            turn_username: env::var("TURN_USERNAME").ok(),
            turn_credential: env::var("TURN_CREDENTIAL").ok(),
            turn_shared_secret: env::var("TURN_SHARED_SECRET").ok(),
            turn_credential_ttl_seconds: env::var("TURN_CREDENTIAL_TTL_SECONDS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            room_idle_timeout_seconds: env::var("ROOM_IDLE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            room_reaper_interval_seconds: env::var("ROOM_REAPER_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            long_poll_max_wait_ms: env::var("LONG_POLL_MAX_WAIT_MS")
                .unwrap_or_else(|_| "25000".to_string())
                .parse()
                .unwrap_or(25000),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("JWT_SECRET environment variable is required")]
    MissingJwtSecret,
    #[error("Unknown MEETING_STORE backend: {0}")]
    InvalidMeetingStore(String),
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_host: "localhost".to_string(),
        server_port: 8080,
        jwt_secret: "test-secret-key".to_string(),
        jwt_expiry_seconds: 900,
        trust_forwarded_identity: false,
        admin_role: "admin".to_string(),
        meeting_store: MeetingStoreKind::Memory,
        redis_url: "redis://localhost".to_string(),
        join_path_prefix: "/meeting-room/".to_string(),
        stun_server: "stun:stun.l.google.com:19302".to_string(),
        turn_server: None,
        turn_username: None,
        turn_credential: None,
        turn_shared_secret: None,
        turn_credential_ttl_seconds: 86400,
        room_idle_timeout_seconds: 0,
        room_reaper_interval_seconds: 60,
        long_poll_max_wait_ms: 2000,
    }
}
