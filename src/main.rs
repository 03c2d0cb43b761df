use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::SessionService;
use chirpy::configuration::get_configuration;
use chirpy::startup::run;
use chirpy::storage::{AccountRepository, InMemoryStore, PostgresStore, RefreshTokenRepository};
use chirpy::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry();

    tracing::info!("Starting application");

    // 설정 로드 (서명 키가 없으면 시작하지 않음)
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // 저장소 선택
    let (accounts, refresh_tokens): (Arc<dyn AccountRepository>, Arc<dyn RefreshTokenRepository>) =
        if configuration.database.in_memory {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            (store.clone() as Arc<dyn AccountRepository>, store as Arc<dyn RefreshTokenRepository>)
        } else {
            tracing::info!("Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&configuration.database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
                })?;

            tracing::info!("Database connection pool created successfully");
            let store = Arc::new(PostgresStore::new(pool));
            (store.clone() as Arc<dyn AccountRepository>, store as Arc<dyn RefreshTokenRepository>)
        };

    let sessions = SessionService::new(accounts.clone(), refresh_tokens, &configuration.auth);

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, accounts, sessions)?;
    server.await
}
