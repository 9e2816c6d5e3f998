//! Reader for secret-store datasources (`vault:` URLs)

use super::{transport_mismatch, SourceReader, Transport};
use crate::cleanup::{Cleanup, CleanupHook};
use crate::error::Result;
use crate::media_type::{MediaType, JSON};
use crate::source::{escape_path, Source};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// An authentication token obtained from a secret store
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    revocable: bool,
}

impl Credential {
    /// A token obtained by logging in; revoked at shutdown
    pub fn new(token: impl Into<String>) -> Self {
        Credential {
            token: token.into(),
            revocable: true,
        }
    }

    /// A token handed to us by the operator; never revoked
    pub fn user_supplied(token: impl Into<String>) -> Self {
        Credential {
            token: token.into(),
            revocable: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_revocable(&self) -> bool {
        self.revocable
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("revocable", &self.revocable)
            .finish()
    }
}

/// Secret-store capabilities used by the reader
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn login(&self) -> Result<Credential>;

    /// Read the secret at `path`, returned as JSON bytes
    async fn read(&self, credential: &Credential, path: &str) -> Result<Bytes>;

    async fn revoke(&self, credential: &Credential) -> Result<()>;
}

/// Creates a fresh secret-store client for a source
pub trait SecretStoreConnector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn SecretStore>>;
}

/// An authenticated client bound to a source
#[derive(Clone)]
pub struct SecretSession {
    store: Arc<dyn SecretStore>,
    credential: Credential,
}

impl SecretSession {
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

struct RevokeCredential {
    alias: String,
    session: SecretSession,
}

#[async_trait]
impl CleanupHook for RevokeCredential {
    fn name(&self) -> String {
        format!("revoke secret-store token for '{}'", self.alias)
    }

    async fn run(&self) -> Result<()> {
        self.session.store.revoke(&self.session.credential).await?;
        info!("Revoked secret-store token for datasource alias={}", self.alias);
        Ok(())
    }
}

/// SecretReader reads secrets, logging in once per source
///
/// Logins that produce a revocable token register a revocation hook with the
/// shared [`Cleanup`]. The source's media type is always set to
/// `application/json` after a read.
pub struct SecretReader {
    connector: Arc<dyn SecretStoreConnector>,
    cleanup: Arc<Cleanup>,
}

impl SecretReader {
    pub fn new(connector: Arc<dyn SecretStoreConnector>, cleanup: Arc<Cleanup>) -> Self {
        SecretReader { connector, cleanup }
    }

    async fn open_session(&self, source: &Source) -> Result<Transport> {
        let store = self.connector.connect()?;
        let credential = store.login().await?;
        debug!("Logged in to secret store for datasource alias={}", source.alias());

        let session = SecretSession { store, credential };
        if session.credential.is_revocable() {
            self.cleanup.register(RevokeCredential {
                alias: source.alias().to_string(),
                session: session.clone(),
            });
        }
        Ok(Transport::Secret(session))
    }
}

#[async_trait]
impl SourceReader for SecretReader {
    async fn read(&self, source: &Source, args: &[String]) -> Result<Bytes> {
        let transport = source
            .transport()
            .get_or_try_init(|| self.open_session(source))
            .await?;
        let session = match transport {
            Transport::Secret(session) => session,
            other => return Err(transport_mismatch(source, other, "secret")),
        };

        let path = secret_path(source.url(), args);
        debug!("Reading secret alias={} path={}", source.alias(), path);
        let data = session.store.read(&session.credential, &path).await?;

        source.set_media_type(MediaType::new(JSON));
        Ok(data)
    }
}

/// Backend path for a source: the URL path, plus one extra segment when exactly
/// one argument is given
///
/// The argument is appended as literal path text; `?`, `#` and `%` are
/// percent-encoded.
pub fn secret_path(url: &Url, args: &[String]) -> String {
    let path = url.path();
    match args {
        [extra] => format!("{}/{}", path.trim_end_matches('/'), escape_path(extra)),
        _ => path.to_string(),
    }
}
