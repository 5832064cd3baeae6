//! Deadline and cancellation signal
//!
//! A [`Signal`] is handed to an execution by its caller. The execution only
//! observes it; firing it is the business of whoever holds the matching
//! [`Canceler`] (or of the clock, once the deadline passes).

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a signal fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The deadline elapsed
    DeadlineExceeded,
    /// [`Canceler::cancel`] was called
    Canceled,
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupt::DeadlineExceeded => write!(f, "deadline exceeded"),
            Interrupt::Canceled => write!(f, "canceled"),
        }
    }
}

/// Observe-only deadline/cancellation token
///
/// Cheap to clone; all clones observe the same cancel flag.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// The owning side of a [`Signal`]'s cancel flag
///
/// Dropping a `Canceler` does not fire the signal.
#[derive(Debug)]
pub struct Canceler {
    tx: watch::Sender<bool>,
}

impl Canceler {
    /// Fire the signal. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether `cancel` has been called
    pub fn is_canceled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Signal {
    /// A signal that never fires
    pub fn background() -> Self {
        Self::default()
    }

    /// A signal fired only by the returned canceler
    pub fn with_cancel() -> (Self, Canceler) {
        let (tx, rx) = watch::channel(false);
        let signal = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (signal, Canceler { tx })
    }

    /// A signal that fires at `deadline` or when canceled, whichever is first
    pub fn with_deadline(deadline: Instant) -> (Self, Canceler) {
        let (mut signal, canceler) = Self::with_cancel();
        signal.deadline = Some(deadline);
        (signal, canceler)
    }

    /// A signal that fires `timeout` from now or when canceled
    pub fn with_timeout(timeout: Duration) -> (Self, Canceler) {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Derive a signal whose deadline is at most `timeout` from now
    ///
    /// The derived signal still fires when this one is canceled, and keeps
    /// this signal's deadline if that one is earlier.
    pub fn timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline (zero once it has passed)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Non-blocking check of whether the signal has fired
    pub fn err(&self) -> Option<Interrupt> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Interrupt::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Interrupt::DeadlineExceeded);
        }
        None
    }

    /// Resolve once the signal fires
    ///
    /// Explicit cancellation wins when both conditions are already true.
    pub async fn fired(&self) -> Interrupt {
        let canceled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    // Err means every canceler is gone without firing.
                    let orphaned = rx.wait_for(|canceled| *canceled).await.is_err();
                    if orphaned {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = canceled => Interrupt::Canceled,
            _ = expired => Interrupt::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fired() {
        let signal = Signal::background();
        assert!(signal.err().is_none());
        assert!(signal.deadline().is_none());
        assert!(signal.remaining().is_none());
    }

    #[tokio::test]
    async fn test_cancel_fires() {
        let (signal, canceler) = Signal::with_cancel();
        assert!(signal.err().is_none());

        canceler.cancel();
        canceler.cancel();

        assert!(canceler.is_canceled());
        assert_eq!(signal.err(), Some(Interrupt::Canceled));
        assert_eq!(signal.fired().await, Interrupt::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let (signal, _canceler) = Signal::with_timeout(Duration::from_secs(1));
        assert!(signal.err().is_none());

        assert_eq!(signal.fired().await, Interrupt::DeadlineExceeded);
        assert_eq!(signal.err(), Some(Interrupt::DeadlineExceeded));
        assert_eq!(signal.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_canceler_does_not_fire() {
        let (signal, canceler) = Signal::with_timeout(Duration::from_secs(5));
        drop(canceler);

        let fired = tokio::time::timeout(Duration::from_secs(1), signal.fired()).await;
        assert!(fired.is_err(), "signal fired before its deadline");
        assert_eq!(signal.fired().await, Interrupt::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wins_over_elapsed_deadline() {
        let (signal, canceler) = Signal::with_timeout(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceler.cancel();

        assert_eq!(signal.fired().await, Interrupt::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_timeout_keeps_parent_cancel() {
        let (parent, canceler) = Signal::with_cancel();
        let child = parent.timeout(Duration::from_secs(10));
        assert!(child.deadline().is_some());

        canceler.cancel();
        assert_eq!(child.err(), Some(Interrupt::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_timeout_keeps_earlier_deadline() {
        let (parent, _canceler) = Signal::with_timeout(Duration::from_secs(1));
        let child = parent.timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_interrupt_display() {
        assert_eq!(Interrupt::DeadlineExceeded.to_string(), "deadline exceeded");
        assert_eq!(Interrupt::Canceled.to_string(), "canceled");
    }
}
