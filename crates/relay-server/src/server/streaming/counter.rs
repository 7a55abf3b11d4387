//! Liveness stream behind `GET /counter`.

use super::{Session, event_stream_response};
use crate::server::service::handler::RelayService;
use axum::{extract::State, response::IntoResponse};
use core::time::Duration;
use tracing::Instrument;

/// `GET /counter`
pub async fn counter(State(service): State<RelayService>) -> impl IntoResponse {
    let (session, stream) = Session::open(service.shutdown_token(), 1);

    tokio::spawn(
        tick(session, service.config().counter_interval).instrument(tracing::info_span!("counter")),
    );

    event_stream_response(stream)
}

/// Pushes `<p>counter={i}</p>` once per `interval`, counting from zero,
/// until the session is cancelled or the client stops reading.
pub async fn tick(session: Session, interval: Duration) {
    let mut i: u64 = 0;

    loop {
        tokio::select! {
            () = session.token.cancelled() => {
                tracing::debug!("Client has closed the connection");
                break;
            }
            () = tokio::time::sleep(interval) => {
                if !session.push(format!("<p>counter={i}</p>")).await {
                    tracing::debug!("Client closed");
                    break;
                }
                i += 1;
            }
        }
    }
}
