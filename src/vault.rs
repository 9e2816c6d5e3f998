//! HashiCorp Vault client backing `vault:` datasources
//!
//! The client talks to the Vault HTTP API directly. The server address comes
//! from the configuration or `VAULT_ADDR`; credentials only ever come from the
//! environment:
//!
//! | Method   | Variables                                                   |
//! |----------|-------------------------------------------------------------|
//! | AppRole  | `VAULT_ROLE_ID`, `VAULT_SECRET_ID`, `VAULT_AUTH_APPROLE_MOUNT` |
//! | GitHub   | `VAULT_AUTH_GITHUB_TOKEN`, `VAULT_AUTH_GITHUB_MOUNT`          |
//! | Userpass | `VAULT_AUTH_USERNAME`, `VAULT_AUTH_PASSWORD`, `VAULT_AUTH_USERPASS_MOUNT` |
//! | Token    | `VAULT_TOKEN`                                               |
//!
//! Methods are tried in that order. Tokens obtained through a login are revoked
//! at shutdown; a `VAULT_TOKEN` supplied by the operator is left alone.

use crate::error::{DataError, Result};
use crate::reader::{Credential, SecretStore, SecretStoreConnector};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Vault settings from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VaultConfig {
    /// Server address, e.g. `https://vault.example.com:8200`; falls back to `VAULT_ADDR`
    #[serde(default)]
    pub address: Option<String>,

    /// Request timeout in seconds (default: 5)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl VaultConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(crate::reader::http::DEFAULT_TIMEOUT)
    }
}

/// How to obtain a Vault token
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    AppRole {
        role_id: String,
        secret_id: String,
        mount: String,
    },
    GitHub {
        token: String,
        mount: String,
    },
    UserPass {
        username: String,
        password: String,
        mount: String,
    },
    Token(String),
}

impl AuthMethod {
    /// Pick an auth method from the process environment
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Pick an auth method from variables provided by `lookup`
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mount = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        if let (Some(role_id), Some(secret_id)) = (var("VAULT_ROLE_ID"), var("VAULT_SECRET_ID")) {
            return Some(AuthMethod::AppRole {
                role_id,
                secret_id,
                mount: mount("VAULT_AUTH_APPROLE_MOUNT", "approle"),
            });
        }
        if let Some(token) = var("VAULT_AUTH_GITHUB_TOKEN") {
            return Some(AuthMethod::GitHub {
                token,
                mount: mount("VAULT_AUTH_GITHUB_MOUNT", "github"),
            });
        }
        if let (Some(username), Some(password)) =
            (var("VAULT_AUTH_USERNAME"), var("VAULT_AUTH_PASSWORD"))
        {
            return Some(AuthMethod::UserPass {
                username,
                password,
                mount: mount("VAULT_AUTH_USERPASS_MOUNT", "userpass"),
            });
        }
        var("VAULT_TOKEN").map(AuthMethod::Token)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::AppRole { .. } => "approle",
            AuthMethod::GitHub { .. } => "github",
            AuthMethod::UserPass { .. } => "userpass",
            AuthMethod::Token(_) => "token",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthMethod::{}", self.name())
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<AuthInfo>,
}

#[derive(Deserialize)]
struct AuthInfo {
    client_token: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    data: Option<Value>,
}

/// Vault HTTP API client
pub struct VaultClient {
    client: Client,
    address: Url,
    auth: AuthMethod,
}

impl VaultClient {
    pub fn new(address: Url, auth: AuthMethod, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::SecretStore(format!("Failed to create Vault client: {}", e)))?;
        Ok(VaultClient {
            client,
            address,
            auth,
        })
    }

    /// Build a client from configuration, filling gaps from the environment
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        let address = config
            .address
            .clone()
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                DataError::SecretStore("no Vault address configured, set VAULT_ADDR".to_string())
            })?;
        let address = Url::parse(&address).map_err(|e| {
            DataError::SecretStore(format!("invalid Vault address '{}': {}", address, e))
        })?;
        let auth = AuthMethod::from_env().ok_or_else(|| {
            DataError::SecretStore("no Vault authentication method available".to_string())
        })?;

        Self::new(address, auth, config.timeout())
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/v1/{}",
            self.address.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw)
            .map_err(|e| DataError::SecretStore(format!("invalid Vault URL '{}': {}", raw, e)))
    }

    async fn login_with(&self, path: &str, body: Value) -> Result<Credential> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| DataError::SecretStore(format!("Vault login at {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            DataError::SecretStore(format!("Failed to read Vault login response: {}", e))
        })?;
        if !status.is_success() {
            warn!("Vault login failed: method={} status={}", self.auth.name(), status);
            return Err(DataError::SecretStore(format!(
                "Vault {} login returned HTTP status {}: {}",
                self.auth.name(),
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed: LoginResponse = serde_json::from_slice(&body).map_err(|e| {
            DataError::SecretStore(format!("Malformed Vault login response: {}", e))
        })?;
        let auth = parsed.auth.ok_or_else(|| {
            DataError::SecretStore("Vault login response carried no token".to_string())
        })?;
        Ok(Credential::new(auth.client_token))
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn login(&self) -> Result<Credential> {
        debug!("Logging in to Vault at {} with {}", self.address, self.auth.name());
        let credential = match &self.auth {
            AuthMethod::Token(token) => Credential::user_supplied(token.clone()),
            AuthMethod::AppRole {
                role_id,
                secret_id,
                mount,
            } => {
                self.login_with(
                    &format!("auth/{}/login", mount),
                    json!({ "role_id": role_id, "secret_id": secret_id }),
                )
                .await?
            }
            AuthMethod::GitHub { token, mount } => {
                self.login_with(&format!("auth/{}/login", mount), json!({ "token": token }))
                    .await?
            }
            AuthMethod::UserPass {
                username,
                password,
                mount,
            } => {
                self.login_with(
                    &format!("auth/{}/login/{}", mount, username),
                    json!({ "password": password }),
                )
                .await?
            }
        };
        info!("Authenticated to Vault at {} with {}", self.address, self.auth.name());
        Ok(credential)
    }

    async fn read(&self, credential: &Credential, path: &str) -> Result<Bytes> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url.clone())
            .header(TOKEN_HEADER, credential.token())
            .send()
            .await
            .map_err(|e| DataError::SecretStore(format!("Vault read of {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            DataError::SecretStore(format!("Failed to read Vault response for {}: {}", path, e))
        })?;
        debug!("Vault read path={} status={}", path, status);

        if status == StatusCode::NOT_FOUND || body.is_empty() {
            return Err(DataError::SecretStore(format!(
                "no value found for path {}",
                path
            )));
        }
        if !status.is_success() {
            return Err(DataError::SecretStore(format!(
                "Vault returned HTTP status {} for {}: {}",
                status.as_u16(),
                path,
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed: SecretResponse = serde_json::from_slice(&body).map_err(|e| {
            DataError::SecretStore(format!("Malformed Vault response for {}: {}", path, e))
        })?;
        let data = parsed
            .data
            .ok_or_else(|| DataError::SecretStore(format!("no value found for path {}", path)))?;
        let encoded = serde_json::to_vec(&data)?;
        Ok(Bytes::from(encoded))
    }

    async fn revoke(&self, credential: &Credential) -> Result<()> {
        if !credential.is_revocable() {
            return Ok(());
        }

        let url = self.endpoint("auth/token/revoke-self")?;
        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, credential.token())
            .send()
            .await
            .map_err(|e| DataError::SecretStore(format!("Vault token revocation failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::SecretStore(format!(
                "Vault token revocation returned HTTP status {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

/// Connects a new [`VaultClient`] for each `vault:` source
#[derive(Debug, Clone, Default)]
pub struct VaultConnector {
    config: VaultConfig,
}

impl VaultConnector {
    pub fn new(config: VaultConfig) -> Self {
        VaultConnector { config }
    }
}

impl SecretStoreConnector for VaultConnector {
    fn connect(&self) -> Result<Arc<dyn SecretStore>> {
        Ok(Arc::new(VaultClient::from_config(&self.config)?))
    }
}
