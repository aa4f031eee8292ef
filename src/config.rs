use std::env;

/// Fallback signing secret for local development only.
pub const LOCAL_JWT_SECRET: &str = "sharebite-local-development-secret";

pub const DEFAULT_PORT: u16 = 3000;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and read
/// only by `main` while it wires up the server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string.
    pub db_url: String,
    // Port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    // Runtime environment marker.
    pub env: Env,
    // Which identity provider issues the bearer tokens.
    pub auth: AuthProvider,
}

/// Env
///
/// Local enables development conveniences (pretty logs, schema bootstrap, a fallback
/// signing secret). Production requires every secret to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AuthProvider
///
/// Source of truth for caller identities.
#[derive(Clone, PartialEq, Debug)]
pub enum AuthProvider {
    /// HS256 JWTs signed with a shared secret.
    SharedSecret { secret: String },
    /// Firebase ID tokens for the given project.
    Firebase { project_id: String },
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `DATABASE_URL` is unset, if `AUTH_PROVIDER=firebase` is selected without
    /// `FIREBASE_PROJECT_ID`, or if production runs with shared-secret auth and no
    /// `AUTH_JWT_SECRET`.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").expect("FATAL: DATABASE_URL must be set");

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let auth = match env::var("AUTH_PROVIDER").as_deref() {
            Ok("firebase") => AuthProvider::Firebase {
                project_id: env::var("FIREBASE_PROJECT_ID")
                    .expect("FATAL: FIREBASE_PROJECT_ID required when AUTH_PROVIDER=firebase"),
            },
            _ => {
                let secret = match env {
                    Env::Production => env::var("AUTH_JWT_SECRET")
                        .expect("FATAL: AUTH_JWT_SECRET must be set in production."),
                    Env::Local => env::var("AUTH_JWT_SECRET")
                        .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                };
                AuthProvider::SharedSecret { secret }
            }
        };

        Self {
            db_url,
            port,
            env,
            auth,
        }
    }
}
