//! Typed completion of queued work.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{CobraError, Result};

/// Resolves with the outcome of a statement submitted to an engine's queue.
///
/// Dropping a `Completion` does not cancel the statement; it still runs in
/// submission order, its outcome is just not observed. If the engine goes
/// away before the statement runs the completion resolves to
/// [`CobraError::EngineClosed`].
#[must_use = "the outcome of a queued statement is only observable by awaiting its Completion"]
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    /// A connected sender / completion pair.
    pub(crate) fn channel() -> (oneshot::Sender<Result<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CobraError::EngineClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_delivers_result() {
        let (tx, completion) = Completion::<u64>::channel();
        tx.send(Ok(3)).unwrap();
        assert_eq!(completion.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_dropped_sender_means_engine_closed() {
        let (tx, completion) = Completion::<u64>::channel();
        drop(tx);
        assert!(matches!(completion.await, Err(CobraError::EngineClosed)));
    }
}
