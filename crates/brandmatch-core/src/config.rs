use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BRANDMATCH_ENV", "development"))?;

    let bind_addr = or_default("BRANDMATCH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BRANDMATCH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("BRANDMATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BRANDMATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BRANDMATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BRANDMATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let recommender_url = or_default("BRANDMATCH_RECOMMENDER_URL", "http://localhost:8000");
    let recommender_timeout_secs = parse_u64("BRANDMATCH_RECOMMENDER_TIMEOUT_SECS", "120")?;

    let gemini_api_key = lookup("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let gemini_base_url = or_default(
        "BRANDMATCH_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_model = or_default("BRANDMATCH_GEMINI_MODEL", "gemini-1.5-flash");
    let ai_timeout_secs = parse_u64("BRANDMATCH_AI_TIMEOUT_SECS", "60")?;

    let ai_top_p = or_default("BRANDMATCH_AI_TOP_P", "0.95")
        .parse::<f32>()
        .map_err(|e| invalid("BRANDMATCH_AI_TOP_P", e.to_string()))?;
    if !(0.0..=1.0).contains(&ai_top_p) {
        return Err(invalid(
            "BRANDMATCH_AI_TOP_P",
            format!("{ai_top_p} is outside 0.0..=1.0"),
        ));
    }
    let ai_top_k = parse_u32("BRANDMATCH_AI_TOP_K", "40")?;
    let session_idle_secs = parse_u64("BRANDMATCH_SESSION_IDLE_SECS", "1800")?;

    if ai_timeout_secs == 0 || recommender_timeout_secs == 0 {
        let var = if ai_timeout_secs == 0 {
            "BRANDMATCH_AI_TIMEOUT_SECS"
        } else {
            "BRANDMATCH_RECOMMENDER_TIMEOUT_SECS"
        };
        return Err(invalid(var, "timeout must be at least 1 second".to_string()));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        recommender_url,
        recommender_timeout_secs,
        gemini_api_key,
        gemini_base_url,
        gemini_model,
        ai_timeout_secs,
        ai_top_p,
        ai_top_k,
        session_idle_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDMATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
