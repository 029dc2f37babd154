use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::workflow_client::RoadmapGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Rate-limit counters.
    pub redis: RedisClient,
    /// Archive for generated roadmap documentation.
    pub s3: S3Client,
    /// External roadmap generator. `WorkflowClient` in production.
    pub generator: Arc<dyn RoadmapGenerator>,
    pub config: Config,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};

    /// State over `db` and `generator` with the test config. S3 points at an
    /// endpoint nobody listens on, so archiving fails fast and is skipped.
    pub(crate) fn test_state(db: PgPool, generator: Arc<dyn RoadmapGenerator>) -> AppState {
        let config = crate::config::test_config();
        let redis = RedisClient::open(config.redis_url.clone()).unwrap();
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url(&config.s3_endpoint)
            .retry_config(RetryConfig::disabled())
            .build();
        AppState {
            db,
            redis,
            s3: S3Client::from_conf(s3_config),
            generator,
            config,
        }
    }
}
