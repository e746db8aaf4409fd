//! Cancellable periodic and jittered timers
//!
//! An interval repeatedly waits for a delay and then dispatches an event of
//! its configured type to the registered callbacks. Fixed intervals always
//! wait the same delay; random intervals draw each delay uniformly from the
//! open range `(min, max)`.
//!
//! Timers are idle after construction. `start` spawns a worker thread, `stop`
//! ends it before any further tick, and `interrupt` restarts the countdown
//! of a running timer (e.g. a heartbeat timeout that was satisfied).
//! Callback errors go to the optional error channel and are logged.

use crate::console::{self, LogLevel, Logger};
use crate::error::AppError;
use crate::events::{Callback, Dispatcher, EventType};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use rand::Rng;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Behaviour shared by fixed and random intervals.
pub trait Interval {
    /// Start the timer; false when it is already running
    fn start(&self) -> bool;

    /// Stop the timer; false when it was not running
    fn stop(&self) -> bool;

    /// Reset the countdown of a running timer; false when not running
    fn interrupt(&self) -> bool;

    fn running(&self) -> bool;

    /// The delay before the next tick (a fresh draw for random intervals)
    fn delay(&self) -> Duration;

    /// Register a callback for the interval's event type
    fn register(&self, callback: Callback);
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Fixed(Duration),
    Random { min: Duration, max: Duration },
}

impl Schedule {
    fn next(&self) -> Duration {
        match *self {
            Schedule::Fixed(delay) => delay,
            Schedule::Random { min, max } => {
                let (lo, hi) = (min.as_nanos() as u64, max.as_nanos() as u64);
                if hi <= lo.saturating_add(1) {
                    return min;
                }
                // Open interval: neither bound is ever drawn
                Duration::from_nanos(rand::thread_rng().gen_range(lo + 1..hi))
            }
        }
    }
}

#[derive(Debug, Default)]
struct TimerState {
    running: bool,
    /// Bumped on every start so an old worker knows it was replaced
    generation: u64,
    /// Bumped on every interrupt
    resets: u64,
}

struct Shared {
    schedule: Schedule,
    etype: EventType,
    state: Mutex<TimerState>,
    wake: Condvar,
    dispatcher: Dispatcher,
    errors: Option<Sender<AppError>>,
    logger: RwLock<Arc<dyn Logger>>,
}

impl Shared {
    fn new(
        schedule: Schedule,
        etype: EventType,
        errors: Option<Sender<AppError>>,
        logger: Arc<dyn Logger>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Shared>| Shared {
            schedule,
            etype,
            state: Mutex::new(TimerState::default()),
            wake: Condvar::new(),
            dispatcher: Dispatcher::new(TickSource {
                shared: weak.clone(),
            }),
            errors,
            logger: RwLock::new(logger),
        })
    }

    fn stale(state: &MutexGuard<'_, TimerState>, generation: u64) -> bool {
        !state.running || state.generation != generation
    }

    fn start(self: &Arc<Self>) -> bool {
        let generation = {
            let mut state = self.state.lock();
            if state.running {
                return false;
            }
            state.running = true;
            state.generation += 1;
            state.generation
        };

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("xkit-interval".to_string())
            .spawn(move || shared.run(generation));

        if let Err(e) = spawned {
            self.logger.read().log(LogLevel::Warn, &format!("could not start interval: {}", e));
            self.state.lock().running = false;
            return false;
        }
        true
    }

    fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        state.running = false;
        self.wake.notify_all();
        true
    }

    fn interrupt(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        state.resets += 1;
        self.wake.notify_all();
        true
    }

    fn running(&self) -> bool {
        self.state.lock().running
    }

    fn run(&self, generation: u64) {
        let mut state = self.state.lock();

        'tick: loop {
            if Self::stale(&state, generation) {
                return;
            }

            let resets = state.resets;
            let deadline = Instant::now() + self.schedule.next();

            loop {
                let timed_out = self.wake.wait_until(&mut state, deadline).timed_out();
                if Self::stale(&state, generation) {
                    return;
                }
                if state.resets != resets {
                    continue 'tick;
                }
                if timed_out || Instant::now() >= deadline {
                    break;
                }
            }

            // Callbacks run without the lock so they may stop or interrupt
            MutexGuard::unlocked(&mut state, || self.fire());
        }
    }

    fn fire(&self) {
        if let Err(err) = self.dispatcher.dispatch(self.etype, Instant::now()) {
            let logger = Arc::clone(&self.logger.read());
            logger.log(LogLevel::Warn, &format!("interval callback failed: {}", err));
            if let Some(errors) = &self.errors {
                if errors.try_send(err).is_err() {
                    logger.log(LogLevel::Debug, "interval error channel is full or closed");
                }
            }
        }
    }
}

/// Source attached to every event an interval dispatches.
///
/// Callbacks can use it to inspect or stop the interval that fired.
#[derive(Clone)]
pub struct TickSource {
    shared: Weak<Shared>,
}

impl TickSource {
    pub fn running(&self) -> bool {
        self.shared.upgrade().map_or(false, |s| s.running())
    }

    pub fn stop(&self) -> bool {
        self.shared.upgrade().map_or(false, |s| s.stop())
    }

    pub fn interrupt(&self) -> bool {
        self.shared.upgrade().map_or(false, |s| s.interrupt())
    }
}

macro_rules! interval_impl {
    ($ty:ty) => {
        impl Interval for $ty {
            fn start(&self) -> bool {
                self.shared.start()
            }

            fn stop(&self) -> bool {
                self.shared.stop()
            }

            fn interrupt(&self) -> bool {
                self.shared.interrupt()
            }

            fn running(&self) -> bool {
                self.shared.running()
            }

            fn delay(&self) -> Duration {
                self.shared.schedule.next()
            }

            fn register(&self, callback: Callback) {
                self.shared.dispatcher.register(self.shared.etype, callback);
            }
        }

        impl $ty {
            /// Log through `logger` instead of the process-wide console
            pub fn with_logger(self, logger: Arc<dyn Logger>) -> Self {
                *self.shared.logger.write() = logger;
                self
            }

            pub fn event_type(&self) -> EventType {
                self.shared.etype
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                self.shared.stop();
            }
        }
    };
}

/// Dispatches an event every `delay`.
pub struct FixedInterval {
    shared: Arc<Shared>,
}

impl FixedInterval {
    pub fn new(delay: Duration, etype: EventType, errors: Option<Sender<AppError>>) -> Self {
        Self {
            shared: Shared::new(Schedule::Fixed(delay), etype, errors, console::shared()),
        }
    }
}

/// Dispatches an event after a random delay in `(min, max)`, redrawn each tick.
pub struct RandomInterval {
    shared: Arc<Shared>,
}

impl RandomInterval {
    pub fn new(min: Duration, max: Duration, etype: EventType, errors: Option<Sender<AppError>>) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            shared: Shared::new(Schedule::Random { min, max }, etype, errors, console::shared()),
        }
    }

    pub fn min(&self) -> Duration {
        match self.shared.schedule {
            Schedule::Random { min, .. } => min,
            Schedule::Fixed(delay) => delay,
        }
    }

    pub fn max(&self) -> Duration {
        match self.shared.schedule {
            Schedule::Random { max, .. } => max,
            Schedule::Fixed(delay) => delay,
        }
    }
}

interval_impl!(FixedInterval);
interval_impl!(RandomInterval);
