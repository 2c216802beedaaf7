use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 未设置时使用内存存储，仅供本地开发
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// 未设置时不启用缓存与限流
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub session_cookie_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub sessions_cache_ttl_secs: u64,
    pub reservation_max_retries: usize,
    pub reservation_retry_delay_ms: u64,
    pub line_channel_secret: Option<String>,
    pub line_channel_access_token: Option<String>,
    pub line_api_base: String,
    /// 管理员令牌的 bcrypt 哈希
    pub admin_token_hash: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: get("REDIS_URL"),
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            session_cookie_name: get("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "session_token".to_string()),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 3000)?,
            api_base_uri: normalize_base_uri(get("API_BASE_URI").as_deref().unwrap_or("/api")),
            rate_limit_window_secs: parse_or(&get, "RATE_LIMIT_WINDOW", 60)?,
            rate_limit_requests: parse_or(&get, "RATE_LIMIT_REQUESTS", 100)?,
            sessions_cache_ttl_secs: parse_or(&get, "SESSIONS_CACHE_TTL", 30)?,
            reservation_max_retries: parse_or(&get, "RESERVATION_MAX_RETRIES", 2)?,
            reservation_retry_delay_ms: parse_or(&get, "RESERVATION_RETRY_DELAY_MS", 50)?,
            line_channel_secret: get("LINE_CHANNEL_SECRET"),
            line_channel_access_token: get("LINE_CHANNEL_ACCESS_TOKEN"),
            line_api_base: get("LINE_API_BASE")
                .unwrap_or_else(|| "https://api.line.me".to_string())
                .trim_end_matches('/')
                .to_string(),
            admin_token_hash: get("ADMIN_TOKEN_HASH"),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn sessions_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.sessions_cache_ttl_secs)
    }

    pub fn reservation_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reservation_retry_delay_ms)
    }

    /// LINE webhook 需要同时配置 channel secret 与 access token
    pub fn line_enabled(&self) -> bool {
        self.line_channel_secret.is_some() && self.line_channel_access_token.is_some()
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

// "/api/" -> "/api"，空字符串视为根路径
fn normalize_base_uri(uri: &str) -> String {
    let trimmed = uri.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.session_cookie_name, "session_token");
        assert!(config.database_url.is_none());
        assert!(!config.line_enabled());
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn unparsable_number_names_the_variable() {
        let err = config_from(&[("JWT_SECRET", "s"), ("SERVER_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SERVER_PORT", .. }));
    }

    #[test]
    fn base_uri_is_normalized() {
        let config = config_from(&[("JWT_SECRET", "s"), ("API_BASE_URI", "v1/")]).unwrap();
        assert_eq!(config.api_base_uri, "/v1");
        let root = config_from(&[("JWT_SECRET", "s"), ("API_BASE_URI", "/")]).unwrap();
        assert_eq!(root.api_base_uri, "");
    }
}
