use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;
use crate::recognition::{GeminiClient, ImageProcessor, VisionModel};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub processor: Arc<ImageProcessor>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::connect(&config.database_url, config.database_max_connections).await?;

        let model = Arc::new(GeminiClient::new(&config.gemini)?) as Arc<dyn VisionModel>;
        let processor = Arc::new(ImageProcessor::new(model));

        Ok(Self {
            db,
            config,
            processor,
        })
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        processor: Arc<ImageProcessor>,
    ) -> Self {
        Self {
            db,
            config,
            processor,
        }
    }

    /// In-memory database, test JWT settings and the given recognizer models.
    #[cfg(test)]
    pub async fn fake(label: Arc<dyn VisionModel>, visual: Arc<dyn VisionModel>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            gemini: crate::config::GeminiConfig {
                api_key: "fake".into(),
                model: "fake".into(),
                base_url: "http://fake.local".into(),
                timeout_secs: None,
            },
        });

        Self::from_parts(
            db::memory().await,
            config,
            Arc::new(ImageProcessor::with_models(label, visual)),
        )
    }
}
