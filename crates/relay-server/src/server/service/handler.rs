//! HTTP service state and the submission endpoints.
//!
//! This module defines [`RelayService`], the state shared by every handler,
//! and the handlers behind `/`.
//!
//! ## Responsibilities
//!
//! - Own the [`Handoff`] between workers and result streams.
//! - Hand out submission ids.
//! - Spawn one detached worker per accepted submission.
//! - Coordinate graceful shutdown of stream sessions and workers.

use crate::server::{
    config::ServerConfig,
    pool::worker::{Job, offer_answer, run_worker},
    service::pages,
    streaming::{counter::counter, processed::processed},
    telemetry::increment_submissions,
};
use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    response::Html,
    routing::get,
};
use portable_atomic::{AtomicU64, Ordering};
use relay_core::{Answer, Error, Handoff, Submission, describe};
use std::sync::Arc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::Instrument;

/// State shared by every request handler.
///
/// Built once at startup and cloned into each handler through axum's
/// [`State`] extractor. Every field is a cheap handle onto shared state.
#[derive(Clone)]
pub struct RelayService {
    config: ServerConfig,
    handoff: Arc<Handoff<Answer>>,
    next_id: Arc<AtomicU64>,
    shutdown_token: CancellationToken,
    workers: TaskTracker,
}

impl RelayService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            handoff: Arc::new(Handoff::new()),
            next_id: Arc::new(AtomicU64::new(0)),
            shutdown_token: CancellationToken::new(),
            workers: TaskTracker::new(),
        }
    }

    /// Builds the application router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index).post(submit))
            .route("/counter", get(counter))
            .route("/processed", get(processed))
            .nest_service("/dist", ServeDir::new(&self.config.static_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handoff(&self) -> &Handoff<Answer> {
        &self.handoff
    }

    /// Token cancelled when the service starts shutting down. Stream sessions
    /// derive their own tokens from it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Accepts a submission: takes the next id and spawns its worker.
    ///
    /// The worker is detached; callers never wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn accept(&self, submission: Submission) -> Result<u64, Error> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        increment_submissions();

        let job = Job {
            input: submission.input_text,
            id,
        };
        let fut = run_worker(
            job,
            self.config.delay,
            Arc::clone(&self.handoff),
            self.config.handoff_timeout,
            self.shutdown_token.clone(),
        );
        self.workers
            .spawn(fut.instrument(tracing::info_span!("worker", id)));

        Ok(id)
    }

    /// Offers an answer again after the stream that received it went away.
    pub fn reoffer(&self, answer: Answer) {
        let id = answer.id;
        let handoff = Arc::clone(&self.handoff);
        let timeout = self.config.handoff_timeout;
        let shutdown = self.shutdown_token.clone();

        self.workers.spawn(
            async move {
                offer_answer(&handoff, answer, timeout, &shutdown).await;
            }
            .instrument(tracing::info_span!("reoffer", id)),
        );
    }

    /// Stops accepting submissions and ends every open stream session.
    pub fn begin_shutdown(&self) {
        tracing::info!("Refusing new submissions and closing streams");
        self.shutdown_token.cancel();
        self.workers.close();
    }

    /// Waits for in-flight workers, bounded by the configured shutdown
    /// timeout.
    pub async fn drain(&self) {
        tracing::info!("Draining in-flight workers ({} active)", self.workers.len());

        match tokio::time::timeout(self.config.shutdown_timeout, self.workers.wait()).await {
            Ok(()) => tracing::debug!("All workers drained"),
            Err(_) => tracing::warn!(
                "Worker drain timed out ({} still active)",
                self.workers.len()
            ),
        }
    }
}

/// `GET /`
pub async fn index() -> Html<String> {
    Html(pages::index())
}

/// `POST /`
///
/// Renders the acknowledgment with the zero-delay wording right away; the
/// real answer arrives later on `/processed`.
#[tracing::instrument(skip_all)]
pub async fn submit(
    State(service): State<RelayService>,
    form: Result<Form<Submission>, FormRejection>,
) -> Result<Html<String>, Error> {
    let Form(submission) = form.map_err(|e| Error::BadRequest {
        reason: format!("Error parsing form: {e}"),
    })?;

    let question = describe(&submission.input_text, core::time::Duration::ZERO);
    let id = service.accept(submission)?;
    tracing::debug!(id, "Accepted submission");

    Ok(Html(pages::acknowledgment(&question, id)))
}
