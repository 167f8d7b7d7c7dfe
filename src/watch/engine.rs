//! Event pump and shutdown sequencing.

use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use parking_lot::Mutex;
use tracing::{Span, debug, warn};

use super::debounce::RefreshScheduler;
use super::notifier::{ChangeEvent, EventStream, Notifier};
use crate::error::WatchError;

/// Running background machinery of one watcher: the notifier, the refresh
/// scheduler and the thread pumping notifier events into a handler.
#[derive(Debug)]
pub(crate) struct Engine {
    name: String,
    done: Mutex<Option<Sender<()>>>,
    scheduler: Arc<RefreshScheduler>,
    notifier: Arc<Notifier>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: OnceLock<Result<(), WatchError>>,
}

impl Engine {
    /// Spawn the event pump. `handler` sees every path-level change on the
    /// pump thread and decides whether to poke the scheduler.
    pub(crate) fn start<H>(
        name: &str,
        notifier: Arc<Notifier>,
        events: EventStream,
        scheduler: Arc<RefreshScheduler>,
        mut handler: H,
    ) -> Result<Self, WatchError>
    where
        H: FnMut(ChangeEvent) + Send + 'static,
    {
        let (done_tx, done_rx) = bounded::<()>(0);
        let span = Span::current();

        let pump = thread::Builder::new()
            .name(format!("{name}-events"))
            .spawn(move || {
                let _entered = span.entered();
                pump_events(&events, &done_rx, &mut handler);
            });

        let pump = match pump {
            Ok(handle) => handle,
            Err(e) => {
                let _ = scheduler.close();
                notifier.close();
                return Err(WatchError::SpawnFailed {
                    worker: format!("{name} events"),
                    reason: e.to_string(),
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            done: Mutex::new(Some(done_tx)),
            scheduler,
            notifier,
            pump: Mutex::new(Some(pump)),
            closed: OnceLock::new(),
        })
    }

    /// Tear everything down once; later calls return the first outcome.
    pub(crate) fn close(&self) -> Result<(), WatchError> {
        self.closed.get_or_init(|| self.teardown()).clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get().is_some()
    }

    fn teardown(&self) -> Result<(), WatchError> {
        debug!(watcher = %self.name, "closing");

        // 1. Done signal: the pump exits on its next observation.
        drop(self.done.lock().take());
        // 2. Cancel any pending refresh; waits out one already running.
        let scheduler = self.scheduler.close();
        // 3. Close the notifier, which also ends the event stream.
        self.notifier.close();
        // 4. Wait for the pump.
        let pump = match self.pump.lock().take() {
            Some(handle) => handle.join().map_err(|_| WatchError::WorkerPanicked {
                worker: format!("{} events", self.name),
            }),
            None => Ok(()),
        };

        scheduler.and(pump)
    }
}

fn pump_events<H>(events: &EventStream, done: &Receiver<()>, handler: &mut H)
where
    H: FnMut(ChangeEvent),
{
    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(Ok(event)) => {
                    for change in ChangeEvent::from_notify(event) {
                        handler(change);
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "change notifier error"),
                Err(_) => break,
            },
            recv(done) -> _ => break,
        }
    }
    debug!("event pump stopped");
}
