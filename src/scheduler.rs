//! Periodic timers for panel controls
//!
//! Everything runs on the panel's single event thread. Plugins get a
//! [`Scheduler`] from the host instead of spawning tasks themselves, since a
//! dynamically loaded plugin carries its own copy of the runtime's
//! thread-local state.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Identifies one registered timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Called once per period; `ControlFlow::Break` stops the timer
pub type TimeoutCallback = Box<dyn FnMut() -> ControlFlow<()>>;

pub trait Scheduler {
    /// Run `callback` every `period`, first after one full period
    fn add_timeout(&self, period: Duration, callback: TimeoutCallback) -> TimerId;

    /// Cancel a timeout. Once this returns the callback never runs again.
    ///
    /// Returns false if the timer was unknown or already finished.
    fn remove(&self, id: TimerId) -> bool;
}

/// Callback storage shared between a [`LocalScheduler`] and its task
///
/// Empty while the callback runs and after the timer is removed.
type CallbackSlot = Rc<RefCell<Option<TimeoutCallback>>>;

struct LocalTimer {
    token: CancellationToken,
    callback: CallbackSlot,
}

impl LocalTimer {
    /// Stop the task and drop the callback now, unless it is the one running
    fn cancel(self) {
        self.token.cancel();
        let callback = self.callback.borrow_mut().take();
        drop(callback);
    }
}

/// Scheduler running timeouts as local tasks on the current tokio `LocalSet`
///
/// Callbacks are owned by the scheduler rather than the task, so removing a
/// timer drops its callback before `remove` returns. Code from a plugin
/// library never outlives the control that registered it.
///
/// `add_timeout` must be called from inside a `LocalSet`.
#[derive(Default)]
pub struct LocalScheduler {
    next_id: Cell<u64>,
    timers: Rc<RefCell<HashMap<TimerId, LocalTimer>>>,
}

impl LocalScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers still armed
    #[must_use]
    pub fn active(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Scheduler for LocalScheduler {
    fn add_timeout(&self, period: Duration, callback: TimeoutCallback) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let token = CancellationToken::new();
        let slot: CallbackSlot = Rc::new(RefCell::new(Some(callback)));
        self.timers.borrow_mut().insert(
            id,
            LocalTimer {
                token: token.clone(),
                callback: slot.clone(),
            },
        );

        let timers = Rc::downgrade(&self.timers);
        tokio::task::spawn_local(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        // Taken out while it runs so the callback may remove its own timer
                        let Some(mut callback) = slot.borrow_mut().take() else { break };
                        let flow = callback();

                        if flow.is_break() || token.is_cancelled() {
                            drop(callback);
                            break;
                        }
                        *slot.borrow_mut() = Some(callback);
                    }
                }
            }

            if let Some(timers) = timers.upgrade() {
                let finished = timers.borrow_mut().remove(&id);
                if let Some(timer) = finished {
                    timer.cancel();
                }
            }
            trace!("Timer {:?} finished", id);
        });

        id
    }

    fn remove(&self, id: TimerId) -> bool {
        let removed = self.timers.borrow_mut().remove(&id);
        match removed {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for LocalScheduler {
    fn drop(&mut self) {
        let timers: Vec<LocalTimer> = self.timers.borrow_mut().drain().map(|(_, t)| t).collect();
        for timer in timers {
            timer.cancel();
        }
    }
}

struct ManualTimer {
    period: Duration,
    due: Duration,
    callback: Option<TimeoutCallback>,
}

/// Scheduler driven by hand through [`ManualScheduler::advance`]
///
/// Used by headless hosts and tests where wall-clock time is not wanted.
#[derive(Default)]
pub struct ManualScheduler {
    next_id: Cell<u64>,
    now: Cell<Duration>,
    timers: RefCell<BTreeMap<TimerId, ManualTimer>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Move the clock forward, firing every timeout that falls due in order.
    ///
    /// Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;

        loop {
            let next = self
                .timers
                .borrow()
                .iter()
                .filter(|(_, t)| t.due <= target)
                .min_by_key(|(id, t)| (t.due, **id))
                .map(|(id, t)| (*id, t.due));

            let Some((id, due)) = next else { break };
            self.now.set(due);

            let Some(mut callback) = self
                .timers
                .borrow_mut()
                .get_mut(&id)
                .and_then(|t| t.callback.take())
            else {
                break;
            };

            let flow = callback();
            fired += 1;

            let mut timers = self.timers.borrow_mut();
            match (flow, timers.get_mut(&id)) {
                (ControlFlow::Continue(()), Some(timer)) => {
                    timer.due += timer.period;
                    timer.callback = Some(callback);
                }
                (ControlFlow::Break(()), Some(_)) => {
                    timers.remove(&id);
                }
                // removed from inside its own callback
                (_, None) => {}
            }
        }

        self.now.set(target);
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn add_timeout(&self, period: Duration, callback: TimeoutCallback) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.timers.borrow_mut().insert(
            id,
            ManualTimer {
                period,
                due: self.now.get() + period,
                callback: Some(callback),
            },
        );
        id
    }

    fn remove(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().remove(&id).is_some()
    }
}
