//! Cancel-and-replace timer for coalescing rapid triggers.
//!
//! A [`DebouncedTrigger`] holds at most one armed timer. Arming it again
//! before the timer fires cancels the earlier one, so a burst of triggers
//! results in a single firing of the last one armed.
//!
//! The trigger only knows about time. What delay to use is decided by the
//! caller (see [`DelayPolicy`](crate::scheduler::DelayPolicy)), and what to do
//! on fire is the future passed to [`arm`](DebouncedTrigger::arm).
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use checkbar_monitor::utils::debounce::DebouncedTrigger;
//!
//! #[tokio::main]
//! async fn main() {
//!     let trigger = DebouncedTrigger::new("refresh");
//!
//!     trigger.arm(Duration::from_millis(100), async { println!("first") });
//!     trigger.arm(Duration::from_millis(100), async { println!("second") });
//!
//!     // Only "second" is printed.
//!     tokio::time::sleep(Duration::from_millis(200)).await;
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug)]
struct Armed {
    generation: u64,
    handle: JoinHandle<()>,
}

/// A single-slot timer with cancel-and-replace semantics.
///
/// The action future is spawned onto its own task once the delay elapses, so
/// cancelling a later timer never interrupts an action that already started.
#[derive(Debug)]
pub struct DebouncedTrigger {
    name: &'static str,
    slot: Arc<Mutex<Option<Armed>>>,
    generation: AtomicU64,
}

impl DebouncedTrigger {
    /// Creates an idle trigger. `name` only appears in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Arms the timer, cancelling any timer that has not fired yet.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let slot = Arc::clone(&self.slot);
        let name = self.name;

        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            trace!(trigger = name, generation = previous.generation, "Cancelling armed timer");
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                // A newer arm or a cancel may have replaced this timer while it
                // waited for the slot.
                let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if !guard.as_ref().is_some_and(|armed| armed.generation == generation) {
                    trace!(trigger = name, generation, "Superseded timer discarded");
                    return;
                }
                *guard = None;
            }

            trace!(trigger = name, generation, "Timer fired");
            tokio::spawn(action);
        });

        *guard = Some(Armed { generation, handle });
        trace!(trigger = name, generation, delay_ms = delay.as_millis(), "Timer armed");
    }

    /// Cancels the armed timer, if any. Returns `true` if one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(armed) => {
                armed.handle.abort();
                trace!(trigger = self.name, generation = armed.generation, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a timer is waiting to fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for DebouncedTrigger {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let trigger = DebouncedTrigger::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        trigger.arm(Duration::from_millis(100), async move {
            let _ = tx.send(1);
        });
        assert!(trigger.is_armed());

        sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err(), "should not fire before the delay");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(rx.try_recv().ok(), Some(1));
        assert!(!trigger.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_pending_timer() {
        let trigger = DebouncedTrigger::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        for value in 1..=3 {
            let tx = tx.clone();
            trigger.arm(Duration::from_millis(100), async move {
                let _ = tx.send(value);
            });
        }

        sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.try_recv().ok(), Some(3));
        assert!(rx.try_recv().is_err(), "only the last timer should fire");
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_resets_the_clock() {
        let trigger = DebouncedTrigger::new("test");
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            trigger.arm(Duration::from_millis(100), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(60)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let trigger = DebouncedTrigger::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);

        trigger.arm(Duration::from_millis(100), async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(trigger.cancel());
        assert!(!trigger.cancel(), "second cancel has nothing to cancel");

        sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_does_not_interrupt_running_action() {
        let trigger = DebouncedTrigger::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first_tx = tx.clone();
        trigger.arm(Duration::from_millis(10), async move {
            sleep(Duration::from_millis(200)).await;
            let _ = first_tx.send("slow");
        });

        sleep(Duration::from_millis(50)).await;
        trigger.arm(Duration::from_millis(10), async move {
            let _ = tx.send("fast");
        });

        sleep(Duration::from_millis(500)).await;
        let mut received = Vec::new();
        while let Ok(value) = rx.try_recv() {
            received.push(value);
        }
        assert_eq!(received, vec!["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_fires_promptly() {
        let trigger = DebouncedTrigger::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        trigger.arm(Duration::ZERO, async move {
            let _ = tx.send(());
        });

        sleep(Duration::from_millis(1)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timer_replaced_while_waiting_for_slot_does_not_fire() {
        let trigger = DebouncedTrigger::new("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);

        trigger.arm(Duration::from_millis(5), async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        {
            // Hold the slot past the deadline so the timer task blocks on it,
            // then swap in a newer generation the way a re-arm does.
            let mut guard = trigger.slot.lock().unwrap();
            std::thread::sleep(Duration::from_millis(50));
            let previous = guard.take().expect("timer should still be armed");
            previous.handle.abort();
            *guard = Some(Armed {
                generation: previous.generation + 1,
                handle: tokio::spawn(async {}),
            });
        }

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(trigger.is_armed(), "newer timer must keep its slot");
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let trigger = DebouncedTrigger::new("test");
            let fired = Arc::clone(&fired);
            trigger.arm(Duration::from_millis(100), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
