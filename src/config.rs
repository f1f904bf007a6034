use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

/// Attributes of the session cookie that carries the JWT.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool, // false only in local development
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub frontend_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pitchlink".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pitchlink-users".into()),
            ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(15),
        };
        let development = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);
        let cookie = CookieConfig {
            name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "jwt".into()),
            secure: !development,
        };
        let frontend_origin = std::env::var("FRONTEND_ORIGIN").ok().filter(|v| !v.is_empty());
        Ok(Self {
            database_url,
            jwt,
            cookie,
            frontend_origin,
        })
    }

    /// Deterministic configuration for tests: in-process store, insecure cookie.
    pub fn test_default() -> Self {
        Self {
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_days: 15,
            },
            cookie: CookieConfig {
                name: "jwt".into(),
                secure: false,
            },
            frontend_origin: None,
        }
    }
}
