use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use passport_cri_auth::audit::{AuditSink, TracingAuditSink};
use passport_cri_auth::http::{AuthorizeState, CredentialState, router};
use passport_cri_auth::jar::{JarValidator, JweError, RsaOaepDecrypter};
use passport_cri_auth::logging::COMPONENT_ID;
use passport_cri_auth::oauth::AuthorizationCodeService;
use passport_cri_auth::storage::memory::{
    InMemoryAccessTokenStore, InMemoryAuthorizationCodeStore, InMemoryIdentityCheckStore,
    StaticClientConfig,
};
use passport_cri_auth::token::{CredentialSigner, JwtError};
use passport_cri_auth::CredentialIssuer;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Errors raised while assembling the application.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request decryption key: {0}")]
    DecryptionKey(#[from] JweError),

    #[error("invalid credential signing key: {0}")]
    SigningKey(#[from] JwtError),

    #[error("failed to generate request decryption key: {0}")]
    KeyGeneration(#[from] rsa::Error),
}

/// The assembled router plus handles on the stores it serves from.
///
/// Access tokens and identity check records are written by the upstream
/// check flow; the handles let that flow (or a test) populate them.
pub struct IssuerApp {
    pub router: Router,
    pub access_tokens: Arc<InMemoryAccessTokenStore>,
    pub identity_checks: Arc<InMemoryIdentityCheckStore>,
    pub authorization_codes: Arc<InMemoryAuthorizationCodeStore>,
    /// Public half of the key request objects must be encrypted to.
    pub decryption_public_key: RsaPublicKey,
}

pub fn build_app(cfg: &AppConfig) -> Result<IssuerApp, ServerError> {
    let issuer = &cfg.issuer;

    let decrypter = match issuer.jar.decryption_key_path.as_deref() {
        Some(path) => RsaOaepDecrypter::from_pem(&read_key(path)?)?,
        None => {
            tracing::warn!("no request decryption key configured, generating an ephemeral key");
            RsaOaepDecrypter::new(RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048)?)
        }
    };
    let decryption_public_key = decrypter.public_key();

    let signer = match issuer.credential.signing_key_path.as_deref() {
        Some(path) => CredentialSigner::from_pem(&read_key(path)?, issuer.credential.kid.clone())?,
        None => {
            tracing::warn!("no credential signing key configured, generating an ephemeral key");
            CredentialSigner::generate(issuer.credential.kid.clone())?
        }
    };

    let access_tokens = Arc::new(InMemoryAccessTokenStore::new());
    let identity_checks = Arc::new(InMemoryIdentityCheckStore::new());
    let authorization_codes = Arc::new(InMemoryAuthorizationCodeStore::new());
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);

    let authorize = AuthorizeState {
        validator: Arc::new(JarValidator::new(
            Arc::new(decrypter),
            Arc::new(StaticClientConfig::new(issuer.clone())),
            &issuer.jar,
        )),
        codes: Arc::new(AuthorizationCodeService::new(
            authorization_codes.clone(),
            issuer.auth_code.expiry,
        )),
        audit: audit.clone(),
    };
    let credential = CredentialState {
        issuer: Arc::new(CredentialIssuer::new(
            access_tokens.clone(),
            identity_checks.clone(),
            Arc::new(signer),
            audit,
        )),
    };

    tracing::info!(
        clients = issuer.clients.len(),
        audience = %issuer.audience,
        "Credential issuer configured"
    );

    let router = router(authorize, credential)
        .route(HEALTH_PATH, get(health))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri().path(),
                    http.status_code = tracing::field::Empty,
                )
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("http.status_code", res.status().as_u16());
                    tracing::info!(
                        http.status = %res.status().as_u16(),
                        elapsed_ms = %latency.as_millis(),
                        "request handled"
                    );
                },
            ),
        );

    Ok(IssuerApp {
        router,
        access_tokens,
        identity_checks,
        authorization_codes,
        decryption_public_key,
    })
}

fn read_key(path: &Path) -> Result<String, ServerError> {
    std::fs::read_to_string(path).map_err(|source| ServerError::KeyFile {
        path: path.to_path_buf(),
        source,
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": COMPONENT_ID }))
}

pub struct PassportCriServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> Result<PassportCriServer, ServerError> {
        let app = build_app(&self.config)?;

        Ok(PassportCriServer {
            addr: self.addr,
            app: app.router,
        })
    }
}

impl PassportCriServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
