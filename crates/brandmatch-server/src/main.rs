mod api;
mod middleware;
mod sessions;

use std::sync::Arc;
use std::time::Duration;

use brandmatch_ai::{GeminiClient, GeminiSettings, TextGenerator, UnconfiguredGenerator};
use brandmatch_db::PgContentStore;
use brandmatch_recommend::RecommendationClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    sessions::SessionRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = brandmatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = brandmatch_db::PoolConfig::from_app_config(&config);
    let pool = brandmatch_db::connect_pool(&config.database_url, pool_config).await?;
    brandmatch_db::run_migrations(&pool).await?;

    let recommender =
        RecommendationClient::new(&config.recommender_url, config.recommender_timeout_secs)?;

    let generator: Arc<dyn TextGenerator> = match GeminiSettings::from_app_config(&config) {
        Ok(settings) => {
            let client = GeminiClient::new(settings)?;
            tracing::info!(model = client.model(), "text generation enabled");
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "text generation disabled");
            Arc::new(UnconfiguredGenerator::new(e.to_string()))
        }
    };

    let state = AppState {
        store: Arc::new(PgContentStore::new(pool)),
        recommender: Arc::new(recommender),
        generator,
        sessions: Arc::new(SessionRegistry::with_idle_ttl(Duration::from_secs(
            config.session_idle_secs,
        ))),
        task_timeout: Duration::from_secs(config.ai_timeout_secs.saturating_add(30)),
    };

    let auth = AuthState::from_env(matches!(
        config.env,
        brandmatch_core::Environment::Development
    ))?;
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "brandmatch server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
