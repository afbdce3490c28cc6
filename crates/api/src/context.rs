//! Per-call cancellation.
//!
//! A [`Context`] is passed to every dispatch. It either never fires
//! ([`Context::background`]), fires when its [`CancelHandle`] is used, or
//! fires once a deadline passes. No task is spawned to drive it; waiting on
//! [`Context::cancelled`] races the watch channel against the deadline timer.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Clone, Debug)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels every clone of the [`Context`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Context {
    pub fn background() -> Self {
        Self {
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        Self::background().child_with_cancel()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// Derive a context that also fires when the returned handle is used.
    ///
    /// A derived context can only carry one cancel channel, so a parent
    /// channel is replaced. Deadlines are kept.
    pub fn child_with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(self.is_cancelled_by_handle());
        (
            Self {
                cancel: Some(rx),
                deadline: self.deadline,
            },
            CancelHandle { tx },
        )
    }

    /// Derive a context whose deadline is the earlier of the parent's and
    /// `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(match self.deadline {
                Some(existing) if existing < deadline => existing,
                _ => deadline,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `None` while the context is live, otherwise why it stopped.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled_by_handle() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> ContextError {
        let handle = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                    if fired {
                        ContextError::Cancelled
                    } else {
                        std::future::pending().await
                    }
                }
                None => std::future::pending().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    ContextError::DeadlineExceeded
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            err = handle => err,
            err = deadline => err,
        }
    }

    /// Sleep for `duration` unless the context fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            err = self.cancelled() => Err(err),
        }
    }

    fn is_cancelled_by_handle(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_fires() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.sleep(Duration::from_millis(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_handle_fires_all_clones() {
        let (ctx, handle) = Context::with_cancel();
        let clone = ctx.clone();
        handle.cancel();

        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
        assert_eq!(clone.cancelled().await, ContextError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let (ctx, handle) = Context::with_cancel();
        let sleeper = ctx.clone();
        let sleep = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), sleep)
            .await
            .expect("sleep should be interrupted")
            .unwrap();
        assert_eq!(result, Err(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_sleep() {
        let ctx = Context::with_timeout(Duration::from_secs(1));
        let result = ctx.sleep(Duration::from_secs(30)).await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_child_timeout_keeps_earlier_deadline() {
        let parent = Context::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
