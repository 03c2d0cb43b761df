//! Integration tests for the chirpy server

use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::SessionService;
use chirpy::configuration::AuthSettings;
use chirpy::startup::run;
use chirpy::storage::InMemoryStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryStore::new());
    let sessions = SessionService::new(store.clone(), store.clone(), &AuthSettings::new("test-secret"));
    let server = run(listener, store, sessions)
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/healthz", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/nope", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
