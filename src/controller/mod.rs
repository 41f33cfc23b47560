//! Controller side of the channel.
//!
//! The [`Controller`] is an explicit service object: it owns the
//! configuration, the session registry, the metrics and the registrar task,
//! and hands an `Arc` of that state to every request handler. Nothing is
//! process-global.
//!
//! ```text
//!   POST /gate.php ──▶ dispatch::gate ──┬─ handshake ──▶ registrar task ──▶ SessionHandler
//!   (one task per request)              └─ poll ──────▶ Session buffers
//! ```

mod config;
mod dispatch;
mod metrics;
mod registry;
mod session;

pub use config::{ControllerConfig, ControllerConfigFile};
pub use metrics::{ControllerMetrics, MetricsSnapshot};
pub use registry::SessionRegistry;
pub use session::{Session, SessionState, SessionStats, WaitOutcome};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Pending registrations the registrar will queue before handshakes wait.
const REGISTRAR_QUEUE: usize = 64;

/// Receives every newly registered session.
///
/// Calls are serialized: the controller never runs two `on_new_session`
/// callbacks at once. The session is already connected, so the callback
/// may write to it. Returning an error discards the session and fails the
/// handshake. Long-running work belongs on a spawned task.
pub trait SessionHandler: Send + Sync + 'static {
    /// A session has just been registered.
    fn on_new_session(&self, session: Arc<Session>) -> Result<()>;
}

impl<F> SessionHandler for F
where
    F: Fn(Arc<Session>) -> Result<()> + Send + Sync + 'static,
{
    fn on_new_session(&self, session: Arc<Session>) -> Result<()> {
        self(session)
    }
}

struct Registration {
    session: Arc<Session>,
    done: oneshot::Sender<Result<()>>,
}

/// State shared by every request handler.
pub(crate) struct ControllerState {
    pub(crate) config: ControllerConfig,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) metrics: Arc<ControllerMetrics>,
    /// `None` once shutdown has begun
    registrar: RwLock<Option<mpsc::Sender<Registration>>>,
}

impl ControllerState {
    /// Hand a pending session to the registrar and wait for the outcome.
    pub(crate) async fn register(&self, session: Arc<Session>) -> Result<()> {
        let registrar = self.registrar.read().clone().ok_or(Error::ShuttingDown)?;

        let (done, outcome) = oneshot::channel();
        registrar
            .send(Registration { session, done })
            .await
            .map_err(|_| Error::ShuttingDown)?;

        outcome.await.map_err(|_| Error::ShuttingDown)?
    }
}

/// Serializes registry insertion and the new-session callback.
async fn run_registrar(
    mut queue: mpsc::Receiver<Registration>,
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn SessionHandler>,
) {
    while let Some(Registration { session, done }) = queue.recv().await {
        let result = registry.register(Arc::clone(&session)).and_then(|()| {
            handler
                .on_new_session(Arc::clone(&session))
                .map_err(|e| {
                    registry.unregister_session(&session);
                    Error::SessionRejected(e.to_string())
                })
        });

        // The handshake request may have been dropped; the session stays.
        let _ = done.send(result);
    }
    debug!("Registrar stopped");
}

/// The controller service.
pub struct Controller {
    state: Arc<ControllerState>,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Create a controller and start its registrar.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<H: SessionHandler>(config: ControllerConfig, handler: H) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::config("controller requires a running tokio runtime"))?;

        let metrics = Arc::new(ControllerMetrics::new());
        let registry = SessionRegistry::new(
            config.max_sessions,
            config.handshake_grace,
            Arc::clone(&metrics),
        );

        let (registrar, queue) = mpsc::channel(REGISTRAR_QUEUE);
        runtime.spawn(run_registrar(
            queue,
            Arc::clone(&registry),
            Arc::new(handler),
        ));

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            state: Arc::new(ControllerState {
                config,
                registry,
                metrics,
                registrar: RwLock::new(Some(registrar)),
            }),
            shutdown,
        })
    }

    /// The axum router serving the gate path.
    ///
    /// Bodies above `max_body_size` are refused with `413` before they
    /// reach the dispatcher.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.state.config.path, post(dispatch::gate))
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .with_state(Arc::clone(&self.state))
    }

    /// Serve on an already bound listener until [`Controller::shutdown`].
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!("Controller listening on http://{}{}", local, self.state.config.path);

        let mut stop = self.shutdown.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            })
            .await?;

        let closed = self.state.registry.close_all();
        info!(closed, "Controller stopped");
        Ok(())
    }

    /// Bind the configured address and serve.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Stop accepting sessions, close the live ones and let in-flight
    /// requests finish.
    ///
    /// Registrations still queued for the registrar are refused by the
    /// closed registry.
    pub fn shutdown(&self) {
        if self.state.registrar.write().take().is_some() {
            info!("Controller shutting down");
        }
        self.state.registry.close_all();
        self.shutdown.send_replace(true);
    }

    /// Whether [`Controller::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    /// Aggregate counters.
    pub fn metrics(&self) -> &Arc<ControllerMetrics> {
        &self.state.metrics
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.state.config
    }
}
