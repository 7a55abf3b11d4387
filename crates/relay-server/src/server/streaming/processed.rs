//! One-shot result stream behind `GET /processed`.
//!
//! Each request opens a [`Session`] and registers a [`Claim`] on the handoff
//! right away, then races three events:
//!
//! 1. session cancellation (client disconnect or service shutdown),
//! 2. an answer arriving through the claim,
//! 3. the stream deadline (`delay + 1s` after the request started).
//!
//! Whichever settles first decides the outcome. At most one frame is ever
//! written, after which the stream is closed.

use super::{Session, event_stream_response};
use crate::server::{
    service::handler::RelayService,
    telemetry::{
        decrement_streams_inflight, increment_answers_delivered, increment_stream_cancellations,
        increment_stream_timeouts, increment_streams_inflight,
    },
};
use axum::{extract::State, response::IntoResponse};
use relay_core::{Answer, Claim};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Terminal state of a result stream session.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// An answer arrived before the deadline.
    Delivered(Answer),
    /// The deadline passed without an answer.
    TimedOut,
    /// The session was cancelled. `stranded` holds an answer that was handed
    /// over in the same instant and still needs a home.
    Cancelled { stranded: Option<Answer> },
}

/// Races the claim against the deadline and session cancellation.
///
/// Cancellation is checked first so a disconnected client never causes an
/// answer to be consumed for nothing. An answer that completes its transfer
/// at the deadline is still delivered: it has already left the handoff.
pub async fn await_answer(
    mut claim: Claim<Answer>,
    deadline: Instant,
    session: &CancellationToken,
) -> SessionOutcome {
    tokio::select! {
        biased;

        () = session.cancelled() => SessionOutcome::Cancelled {
            stranded: claim.withdraw(),
        },
        res = claim.recv() => match res {
            Ok(answer) => SessionOutcome::Delivered(answer),
            Err(e) => {
                tracing::warn!("Result stream lost its handoff: {e}");
                SessionOutcome::Cancelled { stranded: None }
            }
        },
        () = tokio::time::sleep_until(deadline) => match claim.withdraw() {
            Some(answer) => SessionOutcome::Delivered(answer),
            None => SessionOutcome::TimedOut,
        },
    }
}

/// `GET /processed`
pub async fn processed(State(service): State<RelayService>) -> impl IntoResponse {
    let deadline = Instant::now() + service.config().stream_deadline();
    let claim = service.handoff().claim();
    let (session, stream) = Session::open(service.shutdown_token(), 1);

    tokio::spawn(
        run_session(service, claim, deadline, session)
            .instrument(tracing::info_span!("processed")),
    );

    event_stream_response(stream)
}

async fn run_session(
    service: RelayService,
    claim: Claim<Answer>,
    deadline: Instant,
    session: Session,
) {
    increment_streams_inflight();

    match await_answer(claim, deadline, &session.token).await {
        SessionOutcome::Delivered(answer) => {
            if session.push(answer.fragment()).await {
                tracing::debug!("Delivered answer {}", answer.id);
                increment_answers_delivered();
            } else {
                tracing::debug!("Client left before answer {} was written", answer.id);
                increment_stream_cancellations();
                service.reoffer(answer);
            }
        }
        SessionOutcome::TimedOut => {
            tracing::debug!(
                "Timed out after {:?}",
                service.config().stream_deadline()
            );
            increment_stream_timeouts();
        }
        SessionOutcome::Cancelled { stranded } => {
            tracing::debug!("Client closed");
            increment_stream_cancellations();
            if let Some(answer) = stranded {
                service.reoffer(answer);
            }
        }
    }

    decrement_streams_inflight();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use relay_core::Handoff;
    use std::sync::Arc;

    fn answer(id: u64) -> Answer {
        Answer::new("test", Duration::from_secs(1), id)
    }

    #[tokio::test(start_paused = true)]
    async fn answer_before_deadline_is_delivered() {
        let handoff = Arc::new(Handoff::new());
        let claim = handoff.claim();
        let token = CancellationToken::new();

        let sender = tokio::spawn({
            let handoff = Arc::clone(&handoff);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                handoff.send(answer(0)).await
            }
        });

        let deadline = Instant::now() + Duration::from_secs(2);
        let outcome = await_answer(claim, deadline, &token).await;

        assert_eq!(outcome, SessionOutcome::Delivered(answer(0)));
        sender.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_without_answer_times_out() {
        let handoff = Handoff::<Answer>::new();
        let token = CancellationToken::new();
        let start = Instant::now();

        let outcome = await_answer(
            handoff.claim(),
            start + Duration::from_secs(3),
            &token,
        )
        .await;

        assert_eq!(outcome, SessionOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_session_does_not_hold_on_to_later_answers() {
        let handoff = Arc::new(Handoff::new());
        let token = CancellationToken::new();

        let outcome = await_answer(
            handoff.claim(),
            Instant::now() + Duration::from_secs(1),
            &token,
        )
        .await;
        assert_eq!(outcome, SessionOutcome::TimedOut);

        let mut next = handoff.claim();
        handoff.send(answer(4)).await;
        assert_eq!(next.recv().await.unwrap(), answer(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_over_pending_answer() {
        let handoff = Handoff::<Answer>::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = await_answer(
            handoff.claim(),
            Instant::now() + Duration::from_secs(3),
            &token,
        )
        .await;

        assert_eq!(outcome, SessionOutcome::Cancelled { stranded: None });
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_returns_answer_that_already_arrived() {
        let handoff = Handoff::new();
        let claim = handoff.claim();
        handoff.send(answer(2)).await;

        let token = CancellationToken::new();
        token.cancel();

        let outcome = await_answer(claim, Instant::now() + Duration::from_secs(3), &token).await;
        assert_eq!(
            outcome,
            SessionOutcome::Cancelled {
                stranded: Some(answer(2))
            }
        );
    }
}
