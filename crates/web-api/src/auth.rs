//! JWT 认证模块
//!
//! 所有用户共用一个登录口令。登录成功后签发 JWT，WebSocket 握手时凭令牌确定身份。

use config::{AuthConfig, JwtConfig};
use domain::Username;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// 登录失败时返回给用户的提示
pub const INVALID_CREDENTIALS: &str = "Invalid name or password.";

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户名
    pub sub: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, username: &Username) -> Result<String, ApiError> {
        let exp = chrono::Utc::now() + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            sub: username.as_str().to_owned(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|err| {
            ApiError::internal_server_error(format!("Token generation failed: {}", err))
        })
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| ApiError::unauthorized(format!("Invalid token: {}", err)))
    }
}

/// 登录响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

/// 共享口令登录与令牌校验
pub struct Authenticator {
    shared_password: String,
    jwt: JwtService,
}

impl Authenticator {
    pub fn new(shared_password: impl Into<String>, jwt: JwtService) -> Self {
        Self {
            shared_password: shared_password.into(),
            jwt,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.shared_password.clone(),
            JwtService::new(JwtConfig::from(config)),
        )
    }

    /// 用户名非空且口令匹配时签发令牌
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let username = Username::parse(username)
            .ok()
            .filter(|_| password == self.shared_password)
            .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

        let token = self.jwt.generate_token(&username)?;
        Ok(LoginResponse {
            username: username.into_inner(),
            token,
        })
    }

    /// 从令牌中取出用户名
    pub fn identify(&self, token: &str) -> Result<String, ApiError> {
        self.jwt.verify_token(token).map(|claims| claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn authenticator() -> Authenticator {
        Authenticator::new(
            "Shayan",
            JwtService::new(JwtConfig {
                secret: "unit-test-secret-key".into(),
                expiration_hours: 1,
            }),
        )
    }

    #[test]
    fn login_round_trips_username_through_token() {
        let auth = authenticator();
        let response = auth.login("  alice ", "Shayan").unwrap();
        assert_eq!(response.username, "alice");
        assert_eq!(auth.identify(&response.token).unwrap(), "alice");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let err = authenticator().login("alice", "shayan").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }

    #[test]
    fn blank_username_is_rejected() {
        let err = authenticator().login("   ", "Shayan").unwrap_err();
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = JwtService::new(JwtConfig {
            secret: "a-completely-different-secret".into(),
            expiration_hours: 1,
        });
        let token = other
            .generate_token(&Username::parse("mallory").unwrap())
            .unwrap();
        assert!(authenticator().identify(&token).is_err());
    }
}
