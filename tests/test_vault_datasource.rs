//! Integration tests for Vault datasources
//!
//! A mock Vault server checks the login, read and revoke-self calls made by
//! the secret-store reader through the datasource registry.

use datasource_core::{
    AuthMethod, Cleanup, DataRegistry, ReaderRegistry, Result, SecretReader, SecretStore,
    SecretStoreConnector, Source, VaultClient, VaultConfig, VaultConnector,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct MockVault {
    address: Url,
    auth: AuthMethod,
}

impl SecretStoreConnector for MockVault {
    fn connect(&self) -> Result<Arc<dyn SecretStore>> {
        let client = VaultClient::new(self.address.clone(), self.auth.clone(), Duration::from_secs(2))?;
        Ok(Arc::new(client))
    }
}

fn registry(server: &MockServer, auth: AuthMethod, specs: &[&str]) -> DataRegistry {
    let cleanup = Arc::new(Cleanup::new());
    let connector = MockVault {
        address: Url::parse(&server.uri()).unwrap(),
        auth,
    };
    let mut readers = ReaderRegistry::new();
    readers.register("vault", SecretReader::new(Arc::new(connector), cleanup.clone()));

    let sources = specs.iter().map(|s| Source::parse(s).unwrap());
    DataRegistry::new(sources, readers, cleanup).unwrap()
}

fn approle() -> AuthMethod {
    AuthMethod::AppRole {
        role_id: "role".to_string(),
        secret_id: "secret".to_string(),
        mount: "approle".to_string(),
    }
}

#[tokio::test]
async fn test_approle_login_read_and_revoke() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({ "role_id": "role", "secret_id": "secret" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "auth": { "client_token": "s.xyz" } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app/db"))
        .and(header("X-Vault-Token", "s.xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "password": "hunter2" } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app/cache"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "password": "swordfish" } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/revoke-self"))
        .and(header("X-Vault-Token", "s.xyz"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = registry(&mock_server, approle(), &["sec=vault:///secret/app"]);

    let db = registry.datasource("sec", &["db"]).await.unwrap();
    assert_eq!(db, json!({ "password": "hunter2" }));
    assert_eq!(
        registry.source("sec").unwrap().media_type().essence(),
        "application/json"
    );

    // cached, no second GET
    registry.datasource("sec", &["db"]).await.unwrap();
    // different argument, same session
    let cache = registry.datasource("sec", &["cache"]).await.unwrap();
    assert_eq!(cache["password"], "swordfish");

    assert!(registry.shutdown().await.is_empty());
}

#[tokio::test]
async fn test_user_token_is_not_revoked() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/foo"))
        .and(header("X-Vault-Token", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "value": "bar" } })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/revoke-self"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let registry = registry(
        &mock_server,
        AuthMethod::Token("root".to_string()),
        &["foo=vault:///secret/foo"],
    );
    let value = registry.datasource::<&str>("foo", &[]).await.unwrap();
    assert_eq!(value["value"], "bar");
    assert!(registry.shutdown().await.is_empty());
}

#[tokio::test]
async fn test_missing_secret() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
        .mount(&mock_server)
        .await;

    let registry = registry(
        &mock_server,
        AuthMethod::Token("root".to_string()),
        &["nope=vault:///secret/nope"],
    );
    let err = registry.read_source::<&str>("nope", &[]).await.unwrap_err();
    assert!(err.is_transport_error());
    assert!(err.to_string().contains("no value found for path /secret/nope"));
}

#[tokio::test]
async fn test_failed_login() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "errors": ["invalid role ID"] })))
        .mount(&mock_server)
        .await;

    let registry = registry(&mock_server, approle(), &["sec=vault:///secret/app"]);
    let err = registry.read_source::<&str>("sec", &[]).await.unwrap_err();
    assert!(err.to_string().contains("invalid role ID"));
    assert!(registry.shutdown().await.is_empty());
}

#[test]
fn test_connector_rejects_bad_address() {
    let connector = VaultConnector::new(VaultConfig {
        address: Some("not a url".to_string()),
        timeout_secs: None,
    });
    assert!(connector.connect().is_err());
}
