#![forbid(unsafe_code)]

//! Countdown over an integer value, driven by host time.
//!
//! The host calls [`CountdownTimer::advance`] with elapsed time (typically
//! once per frame). Every full tick length subtracts `step` from the value
//! through the normal write path, so value hooks observe each tick. When the
//! value reaches zero or below, end hooks fire once and the timer stops.
//!
//! A zero tick length ticks once per `advance` call, including calls with
//! no elapsed time.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use statecell_core::{HookId, HookList};
use tracing::debug;

use crate::config::{TimerConfig, ValueConfig};
use crate::value::ObservableValue;

type EndListener = dyn Fn();

#[derive(Default)]
struct TimerState {
    running: bool,
    elapsed: Duration,
    on_end: HookList<EndListener>,
}

/// Integer countdown with tick and end notifications.
#[derive(Clone)]
pub struct CountdownTimer {
    value: ObservableValue<i64>,
    config: TimerConfig,
    state: Rc<RefCell<TimerState>>,
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CountdownTimer")
            .field("value", &self.value)
            .field("config", &self.config)
            .field("running", &state.running)
            .field("elapsed", &state.elapsed)
            .finish()
    }
}

impl CountdownTimer {
    #[must_use]
    pub fn new(value: ValueConfig<i64>, config: TimerConfig) -> Self {
        Self {
            value: ObservableValue::new(value),
            config,
            state: Rc::new(RefCell::new(TimerState::default())),
        }
    }

    /// The underlying value. Hooks registered on it see every tick.
    #[must_use]
    pub fn value(&self) -> &ObservableValue<i64> {
        &self.value
    }

    #[must_use]
    pub fn config(&self) -> TimerConfig {
        self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Begin counting down from the current value. A value already at or
    /// below zero finishes immediately.
    pub fn start(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.running = true;
            state.elapsed = Duration::ZERO;
        }
        debug!(container = %self.value.name(), "timer started");
        if self.value.value() <= 0 {
            self.finish();
        }
    }

    /// Halt without firing end hooks.
    pub fn stop(&self) {
        let mut state = self.state.borrow_mut();
        state.running = false;
        state.elapsed = Duration::ZERO;
    }

    /// Feed elapsed time. Does nothing while stopped.
    pub fn advance(&self, elapsed: Duration) {
        {
            let mut state = self.state.borrow_mut();
            if !state.running {
                return;
            }
            state.elapsed += elapsed;
        }

        let mut ticked = false;
        loop {
            if self.value.value() <= 0 {
                self.finish();
                return;
            }
            {
                let mut state = self.state.borrow_mut();
                // A hook may have stopped the timer mid-advance.
                if !state.running {
                    return;
                }
                if self.config.tick_length.is_zero() {
                    if ticked {
                        return;
                    }
                    state.elapsed = Duration::ZERO;
                } else if state.elapsed >= self.config.tick_length {
                    state.elapsed -= self.config.tick_length;
                } else {
                    return;
                }
            }
            let step = self.config.step;
            self.value.update(|v| *v = v.saturating_sub(step));
            ticked = true;
        }
    }

    /// Restore the initial value through the write path. Running state is
    /// left alone.
    pub fn reset_timer(&self) {
        self.value.set_value(self.value.initial_value());
    }

    /// Register a hook fired when the countdown reaches zero.
    pub fn on_timer_end(&self, hook: impl Fn() + 'static) -> HookId {
        self.state.borrow_mut().on_end.push(Rc::new(hook))
    }

    pub fn unsubscribe_timer_end(&self, id: HookId) -> bool {
        self.state.borrow_mut().on_end.remove(id)
    }

    /// Stop and reset internal timing. End hooks are kept.
    pub fn initialize(&self) {
        self.value.initialize();
        self.stop();
    }

    fn finish(&self) {
        let hooks = {
            let mut state = self.state.borrow_mut();
            state.running = false;
            state.elapsed = Duration::ZERO;
            state.on_end.snapshot()
        };
        debug!(container = %self.value.name(), "timer finished");
        for hook in &hooks {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn timer(start: i64, step: i64, tick_ms: u64) -> CountdownTimer {
        CountdownTimer::new(
            ValueConfig::new("countdown", start),
            TimerConfig::default()
                .with_step(step)
                .with_tick_length(Duration::from_millis(tick_ms)),
        )
    }

    fn end_counter(t: &CountdownTimer) -> Rc<Cell<u32>> {
        let ends = Rc::new(Cell::new(0u32));
        let ends_clone = Rc::clone(&ends);
        t.on_timer_end(move || ends_clone.set(ends_clone.get() + 1));
        ends
    }

    #[test]
    fn ticks_on_full_intervals() {
        let t = timer(5, 1, 100);
        t.start();
        t.advance(Duration::from_millis(50));
        assert_eq!(t.value().value(), 5);
        t.advance(Duration::from_millis(50));
        assert_eq!(t.value().value(), 4);
        t.advance(Duration::from_millis(250));
        assert_eq!(t.value().value(), 2);
    }

    #[test]
    fn each_tick_fires_value_hooks() {
        let t = timer(3, 1, 10);
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let ticks_clone = Rc::clone(&ticks);
        t.value()
            .after_change(move |v| ticks_clone.borrow_mut().push(*v));

        t.start();
        t.advance(Duration::from_millis(25));
        assert_eq!(*ticks.borrow(), vec![2, 1]);
    }

    #[test]
    fn end_fires_once_and_stops() {
        let t = timer(2, 1, 10);
        let ends = end_counter(&t);

        t.start();
        t.advance(Duration::from_millis(100));
        assert_eq!(t.value().value(), 0);
        assert_eq!(ends.get(), 1);
        assert!(!t.is_running());

        t.advance(Duration::from_millis(100));
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn overshooting_step_finishes() {
        let t = timer(3, 5, 10);
        let ends = end_counter(&t);
        t.start();
        t.advance(Duration::from_millis(10));
        assert_eq!(t.value().value(), -2);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn start_at_zero_finishes_immediately() {
        let t = timer(0, 1, 10);
        let ends = end_counter(&t);
        t.start();
        assert_eq!(ends.get(), 1);
        assert!(!t.is_running());
    }

    #[test]
    fn stopped_timer_ignores_time() {
        let t = timer(5, 1, 10);
        t.advance(Duration::from_secs(1));
        assert_eq!(t.value().value(), 5);

        t.start();
        t.advance(Duration::from_millis(10));
        t.stop();
        t.advance(Duration::from_secs(1));
        assert_eq!(t.value().value(), 4);
    }

    #[test]
    fn hook_can_stop_mid_advance() {
        let t = timer(10, 1, 10);
        let handle = t.clone();
        t.value().after_change(move |v| {
            if *v == 8 {
                handle.stop();
            }
        });
        t.start();
        t.advance(Duration::from_millis(100));
        assert_eq!(t.value().value(), 8);
        assert!(!t.is_running());
    }

    #[test]
    fn zero_tick_length_ticks_once_per_advance() {
        let t = timer(3, 1, 0);
        t.start();
        t.advance(Duration::from_millis(1));
        assert_eq!(t.value().value(), 2);
        t.advance(Duration::from_millis(1));
        assert_eq!(t.value().value(), 1);
    }

    #[test]
    fn zero_tick_length_ticks_without_elapsed_time() {
        let t = timer(3, 1, 0);
        let ends = end_counter(&t);
        t.start();
        t.advance(Duration::ZERO);
        assert_eq!(t.value().value(), 2);
        t.advance(Duration::ZERO);
        t.advance(Duration::ZERO);
        assert_eq!(t.value().value(), 0);
        assert_eq!(ends.get(), 1);
        assert!(!t.is_running());
    }

    #[test]
    fn zero_elapsed_does_not_tick_with_tick_length() {
        let t = timer(3, 1, 10);
        t.start();
        t.advance(Duration::ZERO);
        assert_eq!(t.value().value(), 3);
    }

    #[test]
    fn unsubscribed_end_hook_is_not_called() {
        let t = timer(1, 1, 10);
        let kept = end_counter(&t);
        let dropped = Rc::new(Cell::new(0u32));
        let dropped_clone = Rc::clone(&dropped);
        let id = t.on_timer_end(move || dropped_clone.set(dropped_clone.get() + 1));

        assert!(t.unsubscribe_timer_end(id));
        assert!(!t.unsubscribe_timer_end(id));

        t.start();
        t.advance(Duration::from_millis(10));
        assert_eq!(kept.get(), 1);
        assert_eq!(dropped.get(), 0);
    }

    #[test]
    fn reset_timer_restores_through_hooks() {
        let t = timer(3, 1, 10);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        t.value().after_change(move |v| seen_clone.set(*v));

        t.start();
        t.advance(Duration::from_millis(20));
        t.reset_timer();
        assert_eq!(t.value().value(), 3);
        assert_eq!(seen.get(), 3);
        assert!(t.is_running());
    }

    #[test]
    fn initialize_stops_and_keeps_end_hooks() {
        let t = timer(1, 1, 10);
        let ends = end_counter(&t);
        t.start();
        t.initialize();
        assert!(!t.is_running());

        t.start();
        t.advance(Duration::from_millis(10));
        assert_eq!(ends.get(), 1);
    }
}
