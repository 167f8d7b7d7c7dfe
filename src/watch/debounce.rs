//! Debounced refresh scheduling.
//!
//! Bursts of change notifications are collapsed into a single refresh. The
//! scheduler owns a timer thread driven by a command channel: every
//! [`RefreshScheduler::notify`] re-arms a single-shot deadline, and the
//! refresh runs on the timer thread once the deadline passes without
//! another notification.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{Span, debug, warn};

use crate::error::WatchError;

#[derive(Debug)]
enum TimerCmd {
    /// (Re)arm the deadline at `delay` from now.
    Arm,
}

/// Coalesces change signals into at most one refresh per quiet period.
#[derive(Debug)]
pub struct RefreshScheduler {
    name: String,
    closed: Arc<AtomicBool>,
    /// Pending-timer state; `None` once closed. Distinct from any snapshot lock.
    timer: Mutex<Option<Sender<TimerCmd>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Start the timer thread. `refresh` runs on that thread; an `Err` is
    /// logged and the previous state stays published.
    pub fn spawn<F, E>(name: &str, delay: Duration, refresh: F) -> Result<Self, WatchError>
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let (tx, rx) = unbounded::<TimerCmd>();
        let closed = Arc::new(AtomicBool::new(false));
        let span = Span::current();

        let worker = {
            let closed = Arc::clone(&closed);
            thread::Builder::new()
                .name(format!("{name}-refresh"))
                .spawn(move || {
                    let _entered = span.entered();
                    run_timer(rx, delay, &closed, refresh);
                })
                .map_err(|e| WatchError::SpawnFailed {
                    worker: format!("{name} refresh"),
                    reason: e.to_string(),
                })?
        };

        Ok(Self {
            name: name.to_string(),
            closed,
            timer: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Signal that a change was observed. No-op after [`close`](Self::close).
    pub fn notify(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(tx) = self.timer.lock().as_ref() {
            // A send only fails once the timer thread is gone, i.e. after close.
            let _ = tx.send(TimerCmd::Arm);
        }
    }

    /// Cancel any pending refresh and wait for the timer thread to exit.
    ///
    /// A refresh already running when this is called completes before it
    /// returns; none starts afterwards.
    pub fn close(&self) -> Result<(), WatchError> {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender disconnects the timer thread.
        drop(self.timer.lock().take());

        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };
        handle.join().map_err(|_| WatchError::WorkerPanicked {
            worker: format!("{} refresh", self.name),
        })
    }
}

fn run_timer<F, E>(rx: Receiver<TimerCmd>, delay: Duration, closed: &AtomicBool, mut refresh: F)
where
    F: FnMut() -> Result<(), E>,
    E: Display,
{
    let mut deadline: Option<Instant> = None;

    loop {
        let next = match deadline {
            Some(at) => rx.recv_deadline(at),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            Ok(TimerCmd::Arm) => {
                deadline = Some(Instant::now() + delay);
            }
            Err(RecvTimeoutError::Timeout) => {
                deadline = None;
                if closed.load(Ordering::Acquire) {
                    break;
                }
                debug!("debounce window elapsed; refreshing");
                if let Err(e) = refresh() {
                    warn!(error = %e, "refresh failed; keeping previous snapshot");
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("refresh timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread::sleep;

    fn counting(delay: Duration) -> (RefreshScheduler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let scheduler = RefreshScheduler::spawn("test", delay, move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        })
        .unwrap();
        (scheduler, count)
    }

    #[test]
    fn burst_within_delay_collapses_into_one_refresh() {
        let (scheduler, count) = counting(Duration::from_millis(80));

        for _ in 0..10 {
            scheduler.notify();
            sleep(Duration::from_millis(5));
        }
        sleep(Duration::from_millis(300));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.close().unwrap();
    }

    #[test]
    fn spaced_notifications_refresh_once_each() {
        let (scheduler, count) = counting(Duration::from_millis(20));

        for _ in 0..3 {
            scheduler.notify();
            sleep(Duration::from_millis(200));
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
        scheduler.close().unwrap();
    }

    #[test]
    fn zero_delay_refreshes_without_waiting() {
        let (scheduler, count) = counting(Duration::ZERO);

        scheduler.notify();
        sleep(Duration::from_millis(100));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.close().unwrap();
    }

    #[test]
    fn close_cancels_pending_refresh() {
        let (scheduler, count) = counting(Duration::from_millis(100));

        scheduler.notify();
        scheduler.close().unwrap();
        sleep(Duration::from_millis(250));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notify_after_close_is_a_no_op() {
        let (scheduler, count) = counting(Duration::ZERO);

        scheduler.close().unwrap();
        scheduler.notify();
        sleep(Duration::from_millis(50));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        // Second close has nothing left to join.
        assert!(scheduler.close().is_ok());
    }

    #[test]
    fn failed_refresh_is_not_retried() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let scheduler = RefreshScheduler::spawn("failing", Duration::from_millis(10), move || {
            c.fetch_add(1, Ordering::SeqCst);
            Err("disk on fire")
        })
        .unwrap();

        scheduler.notify();
        sleep(Duration::from_millis(200));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.close().unwrap();
    }

    #[test]
    fn concurrent_notify_and_close_never_refresh_after_close() {
        let (scheduler, count) = counting(Duration::from_millis(5));
        let scheduler = Arc::new(scheduler);

        let notifiers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&scheduler);
                thread::spawn(move || {
                    for _ in 0..200 {
                        s.notify();
                    }
                })
            })
            .collect();

        scheduler.close().unwrap();
        let after_close = count.load(Ordering::SeqCst);
        for n in notifiers {
            n.join().unwrap();
        }
        sleep(Duration::from_millis(50));

        assert_eq!(count.load(Ordering::SeqCst), after_close);
    }
}
