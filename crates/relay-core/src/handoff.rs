//! Unbuffered rendezvous channel between producers and consumers.
//!
//! A [`Handoff`] moves one value at a time from a producer directly into a
//! consumer that is already waiting for it. Nothing is ever buffered inside
//! the channel itself:
//!
//! - [`Handoff::send`] suspends until a consumer is waiting, then transfers
//!   the value to it. Senders are serialized, so while one send is pending
//!   every other sender queues up behind it.
//! - [`Handoff::claim`] registers a consumer. Consumers are paired in arrival
//!   order through [`Claim::recv`].
//!
//! A consumer that gives up before a value reaches it (its [`Claim`] is
//! dropped or withdrawn) is skipped and the value goes to the next waiting
//! consumer. Abandoned consumers are pruned whenever a new one registers, so
//! the waiting queue only ever holds live claims plus the most recently
//! abandoned one. Dropping a pending `send` gives the value back to nobody:
//! the caller decides what an abandoned send means.

use crate::common::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::{Notify, oneshot};

/// Single-slot rendezvous channel.
///
/// Internally, every consumer owns a [`oneshot`] slot and announces it on a
/// queue. A sender pops the oldest announced slot and fills it. Because the
/// value only ever travels from the sender's hands into a consumer's slot,
/// at most one value is in transit at any instant.
pub struct Handoff<T> {
    waiting: Mutex<VecDeque<oneshot::Sender<T>>>,
    arrived: Notify,
    sending: tokio::sync::Mutex<()>,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
            arrived: Notify::new(),
            sending: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers a consumer and returns its claim on the next value.
    ///
    /// The consumer is considered waiting from this point on, even before
    /// [`Claim::recv`] is first polled.
    pub fn claim(&self) -> Claim<T> {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiting = self.waiting.lock();
            waiting.retain(|slot| !slot.is_closed());
            waiting.push_back(tx);
        }
        self.arrived.notify_one();
        Claim { rx }
    }

    /// Transfers `value` to the oldest waiting consumer, suspending until one
    /// exists.
    ///
    /// This future is cancel-safe with respect to the channel: dropping it
    /// while suspended never strands a consumer, and the value is dropped
    /// with the future.
    pub async fn send(&self, mut value: T) {
        let _turn = self.sending.lock().await;

        loop {
            // Registered before looking at the queue so a claim landing in
            // between still wakes us.
            let arrived = self.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            let next = self.waiting.lock().pop_front();
            match next {
                Some(consumer) => match consumer.send(value) {
                    Ok(()) => {
                        tracing::trace!("Handoff paired");
                        return;
                    }
                    Err(returned) => {
                        // The consumer gave up before we reached it.
                        tracing::trace!("Skipping withdrawn consumer");
                        value = returned;
                    }
                },
                None => arrived.await,
            }
        }
    }

    /// Registers a consumer and waits for the next value.
    #[cfg(test)]
    async fn recv(&self) -> Result<T> {
        self.claim().recv().await
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered consumer's claim on the next value sent through a
/// [`Handoff`].
#[must_use = "a claim registers a consumer; drop or withdraw it to give up"]
pub struct Claim<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Claim<T> {
    /// Waits for a sender to hand over a value.
    ///
    /// Cancel-safe: if the future is dropped the claim stays registered and
    /// may be polled again, or withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandoffClosed`] if the [`Handoff`] was dropped while
    /// the claim was waiting, or if called again after a value was already
    /// received.
    pub async fn recv(&mut self) -> Result<T> {
        (&mut self.rx).await.map_err(|_| Error::HandoffClosed)
    }

    /// Unregisters the consumer.
    ///
    /// Returns the value if a sender completed the transfer before the claim
    /// was closed, so a value racing in at the moment of withdrawal is never
    /// silently dropped.
    pub fn withdraw(mut self) -> Option<T> {
        self.rx.close();
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use std::sync::Arc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn send_blocks_without_consumer() {
        let handoff = Handoff::new();
        assert!(timeout(WAIT, handoff.send(1_u32)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn recv_blocks_without_sender() {
        let handoff = Handoff::<u32>::new();
        let mut claim = handoff.claim();
        assert!(timeout(WAIT, claim.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn send_completes_once_consumer_arrives() {
        let handoff = Arc::new(Handoff::new());

        let sender = tokio::spawn({
            let handoff = Arc::clone(&handoff);
            async move { handoff.send(7_u32).await }
        });

        tokio::time::sleep(WAIT).await;
        assert!(!sender.is_finished());

        assert_eq!(handoff.recv().await, Ok(7));
        sender.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn consumers_are_paired_in_arrival_order() {
        let handoff = Handoff::new();
        let mut first = handoff.claim();
        let mut second = handoff.claim();

        handoff.send(1_u32).await;
        handoff.send(2_u32).await;

        assert_eq!(first.recv().await, Ok(1));
        assert_eq!(second.recv().await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn withdrawn_consumer_is_skipped() {
        let handoff = Handoff::new();
        let gone = handoff.claim();
        let mut waiting = handoff.claim();

        assert_eq!(gone.withdraw(), None);
        handoff.send(5_u32).await;

        assert_eq!(waiting.recv().await, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_consumer_is_skipped() {
        let handoff = Handoff::new();
        drop(handoff.claim());
        let mut waiting = handoff.claim();

        handoff.send(5_u32).await;
        assert_eq!(waiting.recv().await, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_returns_value_that_raced_in() {
        let handoff = Handoff::new();
        let claim = handoff.claim();

        handoff.send(9_u32).await;
        assert_eq!(claim.withdraw(), Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_send_leaves_nothing_behind() {
        let handoff = Handoff::new();
        assert!(timeout(WAIT, handoff.send(1_u32)).await.is_err());

        let mut claim = handoff.claim();
        assert!(timeout(WAIT, claim.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_send_holds_back_other_senders() {
        let handoff = Arc::new(Handoff::new());

        let mut senders = Vec::new();
        for value in [1_u32, 2] {
            let handoff = Arc::clone(&handoff);
            senders.push(tokio::spawn(async move { handoff.send(value).await }));
            tokio::task::yield_now().await;
        }

        let got = handoff.recv().await.unwrap();
        tokio::time::sleep(WAIT).await;
        let finished = senders.iter().filter(|s| s.is_finished()).count();
        assert_eq!(finished, 1);

        let other = handoff.recv().await.unwrap();
        assert_ne!(got, other);
        for sender in senders {
            sender.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_claims_do_not_accumulate() {
        let handoff = Handoff::<u32>::new();

        for _ in 0..10_000 {
            assert_eq!(handoff.claim().withdraw(), None);
        }
        assert!(handoff.waiting.lock().len() <= 1);

        for _ in 0..10_000 {
            drop(handoff.claim());
        }
        let mut live = handoff.claim();
        assert_eq!(handoff.waiting.lock().len(), 1);

        handoff.send(3).await;
        assert_eq!(live.recv().await, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn live_claims_survive_pruning() {
        let handoff = Handoff::new();
        let mut first = handoff.claim();
        drop(handoff.claim());
        let mut second = handoff.claim();
        assert_eq!(handoff.waiting.lock().len(), 2);

        handoff.send(1_u32).await;
        handoff.send(2_u32).await;
        assert_eq!(first.recv().await, Ok(1));
        assert_eq!(second.recv().await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handoff_closes_waiting_claims() {
        let handoff = Handoff::<u32>::new();
        let mut claim = handoff.claim();
        drop(handoff);

        assert_eq!(claim.recv().await, Err(Error::HandoffClosed));
    }
}
