//! Test helpers for summarize-service integration tests.
//!
//! Spawns the full router on an ephemeral port with an in-memory quota
//! store and a mock provider, so no PostgreSQL or upstream API is needed.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use summarize_service::config::{
    AuthConfig, DatabaseConfig, ModelConfig, OpenAiConfig, SecurityConfig, SummarizeConfig,
};
use summarize_service::models::AccountState;
use summarize_service::services::providers::{ChatProvider, MockChatProvider};
use summarize_service::services::{AccessClaims, InMemoryQuotaStore, QuotaStore, TokenVerifier};
use summarize_service::{build_router, AppState};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-signing-secret-0123456789abcdef";

/// API key placed in the test config; responses must never echo it.
pub const TEST_API_KEY: &str = "sk-test-key-never-echoed";

pub const MOCK_SNIPPETS: &str = "First insight.\n---\nSecond insight.\n---\nThird insight.";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryQuotaStore>,
    pub provider: Arc<MockChatProvider>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_provider(MockChatProvider::respond_with(MOCK_SNIPPETS)).await
    }

    pub async fn spawn_with_provider(provider: MockChatProvider) -> Self {
        let store = Arc::new(InMemoryQuotaStore::new());
        let provider = Arc::new(provider);

        let state = AppState {
            config: test_config(),
            verifier: TokenVerifier::new(TEST_JWT_SECRET),
            store: store.clone() as Arc<dyn QuotaStore>,
            provider: provider.clone() as Arc<dyn ChatProvider>,
        };

        let router = build_router(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let address = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        TestApp {
            address,
            store,
            provider,
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// Seed a subject on the "pro" plan in the current billing period.
    pub fn seed_subject(&self, token_limit: i64, tokens_used: i64) -> Uuid {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        self.store.insert_account(
            user_id,
            AccountState {
                active: true,
                plan_id: Some("pro".to_string()),
                plan_active: true,
                token_limit: Some(token_limit),
                current_period_start: Some(now - Duration::days(1)),
                current_period_end: Some(now + Duration::days(29)),
                tokens_used,
            },
        );
        user_id
    }

    pub fn bearer_token(&self, user_id: Uuid) -> String {
        sign_token(TEST_JWT_SECRET, user_id, Utc::now() + Duration::hours(1))
    }

    pub fn expired_token(&self, user_id: Uuid) -> String {
        // Well beyond the verifier's leeway
        sign_token(TEST_JWT_SECRET, user_id, Utc::now() - Duration::hours(2))
    }
}

pub fn sign_token(secret: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> String {
    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: Some("reader@example.com".to_string()),
        exp: expires_at.timestamp(),
        iat: Some(Utc::now().timestamp()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

fn test_config() -> SummarizeConfig {
    SummarizeConfig {
        common: service_core::config::Config { port: 0 },
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        openai: OpenAiConfig {
            api_key: TEST_API_KEY.to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        models: ModelConfig {
            default_model: "gpt-3.5-turbo".to_string(),
            default_temperature: 0.5,
            default_max_tokens: 500,
            max_completion_tokens: 2000,
        },
        security: SecurityConfig {
            allowed_origins: vec!["*".to_string()],
        },
    }
}
