use crate::server::telemetry::increment_answers_dropped;
use core::time::Duration;
use relay_core::{Answer, Handoff};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A single accepted submission waiting to be processed.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: String,
    pub id: u64,
}

/// How an offer on the [`Handoff`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// A result stream took the answer.
    Accepted,
    /// No result stream claimed the answer within the handoff timeout.
    Expired,
    /// The service started shutting down first.
    Shutdown,
}

/// Worker task for one submission.
///
/// Simulates `delay` of work, formats the [`Answer`], then offers it on the
/// handoff with [`offer_answer`]. The simulated delay itself is not
/// cancellable.
///
/// # Arguments
///
/// - `job`: The submission text and its id.
/// - `delay`: Simulated processing time; also reported in the answer text.
/// - `handoff`: Rendezvous shared with result streams.
/// - `offer_timeout`: Upper bound on waiting for a result stream.
/// - `shutdown`: Service shutdown token; abandons the offer when cancelled.
pub async fn run_worker(
    job: Job,
    delay: Duration,
    handoff: Arc<Handoff<Answer>>,
    offer_timeout: Duration,
    shutdown: CancellationToken,
) -> OfferOutcome {
    tokio::time::sleep(delay).await;

    let answer = Answer::new(&job.input, delay, job.id);
    tracing::info!("Processed: {}", answer.text);

    offer_answer(&handoff, answer, offer_timeout, &shutdown).await
}

/// Offers `answer` to the next waiting result stream.
///
/// The offer is bounded: it is abandoned after `timeout` or as soon as the
/// service shuts down, and the answer is dropped. An abandoned offer leaves
/// nothing behind in the handoff.
pub async fn offer_answer(
    handoff: &Handoff<Answer>,
    answer: Answer,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> OfferOutcome {
    let id = answer.id;

    tokio::select! {
        () = handoff.send(answer) => {
            tracing::debug!("Answer {id} handed off");
            OfferOutcome::Accepted
        }
        () = tokio::time::sleep(timeout) => {
            tracing::warn!("No stream claimed answer {id} within {timeout:?}, dropping it");
            increment_answers_dropped();
            OfferOutcome::Expired
        }
        () = shutdown.cancelled() => {
            tracing::debug!("Shutdown while offering answer {id}");
            increment_answers_dropped();
            OfferOutcome::Shutdown
        }
    }
}
