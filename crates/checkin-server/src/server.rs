// crates/checkin-server/src/server.rs
// ============================================================================
// Module: Check-in Server
// Description: Server assembly and the HTTP listener loop.
// Purpose: Wire configuration, the spreadsheet store, audit sinks, and routes.
// Dependencies: checkin-config, checkin-core, checkin-sheets, axum, tokio
// ============================================================================

//! ## Overview
//! [`CheckinServer`] owns the listen address and the handler state.
//! [`CheckinServer::from_config`] builds the production stack (spreadsheet
//! store, configured audit sink); [`CheckinServer::with_service`] accepts any
//! prebuilt service so tests can serve an in-memory table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use checkin_config::AuditConfig;
use checkin_config::AuditSinkKind;
use checkin_config::CheckinConfig;
use checkin_core::AuditSink;
use checkin_core::CheckinService;
use checkin_core::Clock;
use checkin_core::FileAuditSink;
use checkin_core::NoopAuditSink;
use checkin_core::SharedParticipantStore;
use checkin_core::StderrAuditSink;
use checkin_sheets::SheetsParticipantStore;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::routes::ApiSettings;
use crate::routes::AppState;
use crate::routes::router;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Participant API server.
pub struct CheckinServer {
    /// Listen address.
    bind: SocketAddr,
    /// Handler state shared by all requests.
    state: Arc<AppState>,
}

impl CheckinServer {
    /// Builds the server over the spreadsheet store described by `config`.
    ///
    /// The remote client is built lazily on the first request, so missing
    /// credentials surface as store faults rather than startup failures.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation fails or the audit sink cannot
    /// be opened.
    pub fn from_config(
        config: &CheckinConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.audit)?;
        let service = sheets_service(config, clock, Arc::clone(&audit));
        Self::with_service(config, service, audit)
    }

    /// Builds the server around an existing service.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the bind address is invalid.
    pub fn with_service(
        config: &CheckinConfig,
        service: CheckinService,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let state = Arc::new(AppState::new(service, audit, ApiSettings::from_config(config)));
        Ok(Self {
            bind,
            state,
        })
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the router serving the participant API.
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves on an already-bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_listener<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Builds the participant service over the configured spreadsheet.
#[must_use]
pub fn sheets_service(
    config: &CheckinConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
) -> CheckinService {
    let store = SheetsParticipantStore::new(config.sheets.clone()).with_audit(audit);
    CheckinService::new(
        SharedParticipantStore::from_store(store),
        clock,
        config.service_config(),
    )
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns [`ServerError`] when the file sink has no path or cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    let sink: Arc<dyn AuditSink> = match config.sink {
        AuditSinkKind::Stderr => Arc::new(StderrAuditSink),
        AuditSinkKind::None => Arc::new(NoopAuditSink),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                ServerError::Config("audit.sink = file requires audit.path".to_string())
            })?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log unavailable: {err}")))?;
            Arc::new(sink)
        }
    };
    Ok(sink)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
