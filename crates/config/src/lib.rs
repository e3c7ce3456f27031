//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 数据库连接
//! - 消息时间戳使用的时区
//! - 登录口令与 JWT
//! - 服务设置
//!
//! 加载顺序：默认值 -> 可选配置文件（`APP_CONFIG_FILE`）-> 环境变量（`APP_*`，`__` 分隔层级）。

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 使用内存存储而不是 SQLite 文件时的数据库地址。
pub const MEMORY_DATABASE_URL: &str = "memory";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// 数据库配置
    #[validate(nested)]
    pub database: DatabaseConfig,
    /// 聊天行为配置
    #[validate(nested)]
    pub chat: ChatConfig,
    /// 登录与令牌配置
    #[validate(nested)]
    pub auth: AuthConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// `sqlite://chat.db?mode=rwc` 或 `memory`
    #[validate(length(min = 1))]
    pub url: String,
    #[validate(range(min = 1))]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

/// 聊天配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatConfig {
    /// 消息时间戳所在时区相对 UTC 的偏移（分钟）。默认 210，即 Asia/Tehran。
    ///
    /// 只支持固定偏移：有夏令时的时区无法用这个字段表达，切换时需要手动改值。
    #[validate(range(min = -840, max = 840))]
    pub utc_offset_minutes: i32,
    /// 每个连接出站队列的容量，队列满的连接会被断开
    #[validate(range(min = 1))]
    pub client_queue_capacity: usize,
}

/// 登录与 JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// 所有用户共用的登录口令
    #[validate(length(min = 1))]
    pub shared_password: String,
    #[validate(length(min = 16))]
    pub jwt_secret: String,
    #[validate(range(min = 1))]
    pub expiration_hours: i64,
}

/// JWT 服务需要的配置子集
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            expiration_hours: auth.expiration_hours,
        }
    }
}

impl Default for AppConfig {
    /// 开发环境默认值，生产环境应通过文件或环境变量覆盖口令和密钥
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "sqlite://chat.db?mode=rwc".into(),
                max_connections: 5,
            },
            chat: ChatConfig {
                utc_offset_minutes: 210,
                client_queue_capacity: 256,
            },
            auth: AuthConfig {
                shared_password: "change-me".into(),
                jwt_secret: "dev-secret-key-not-for-production-use".into(),
                expiration_hours: 24,
            },
        }
    }
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> 环境变量 的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig = fig.merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(fig)
    }

    /// 从任意 figment 提取配置，便于测试组合数据源
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: AppConfig = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 监听地址，`host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 用于日志输出的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut redacted = self.clone();
        redacted.auth.shared_password = "[REDACTED]".into();
        redacted.auth.jwt_secret = "[REDACTED]".into();
        format!("{:?}", redacted)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
