//! Scheduled game callbacks and the match countdown.

use engine_core::{Entity, TimerId, Timers};

use crate::events::{EventQueue, GameEvent};

/// Seconds between a trooper's death and its removal.
pub const TROOPER_REMOVAL_DELAY: f64 = 3.0;

/// Payloads carried by the session's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    RemoveTrooper(Entity),
    MatchSecond,
}

pub type GameTimers = Timers<ScheduledEvent>;

/// One-second countdown with tick and expiry events.
#[derive(Debug, Clone)]
pub struct MatchTimer {
    length: u32,
    remaining: u32,
    pending: Option<TimerId>,
}

impl MatchTimer {
    pub fn new(seconds: u32) -> Self {
        Self {
            length: seconds,
            remaining: seconds,
            pending: None,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Restart the countdown from its full length.
    pub fn start(&mut self, now: f64, timers: &mut GameTimers) {
        self.stop(timers);
        self.remaining = self.length;
        if self.length == 0 {
            return;
        }
        self.pending = Some(timers.schedule(now, 1.0, ScheduledEvent::MatchSecond));
    }

    /// Cancel the pending second, if any.
    pub fn stop(&mut self, timers: &mut GameTimers) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
    }

    /// Handle a due `MatchSecond`. Returns true when the countdown just expired.
    pub fn on_second(&mut self, now: f64, timers: &mut GameTimers, events: &mut EventQueue) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            log::info!("Match timer expired");
            events.push(GameEvent::MatchExpired);
            return true;
        }
        events.push(GameEvent::MatchTick {
            remaining: self.remaining,
        });
        self.pending = Some(timers.schedule(now, 1.0, ScheduledEvent::MatchSecond));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(timer: &mut MatchTimer, timers: &mut GameTimers, events: &mut EventQueue, from: f64, until: f64) -> bool {
        let mut expired = false;
        let mut now = from;
        while now < until {
            now += 0.25;
            for due in timers.drain_due(now) {
                if due == ScheduledEvent::MatchSecond {
                    expired |= timer.on_second(now, timers, events);
                }
            }
        }
        expired
    }

    #[test]
    fn ticks_each_second_then_expires() {
        let mut timers = GameTimers::new();
        let mut events = EventQueue::new();
        let mut timer = MatchTimer::new(3);
        timer.start(0.0, &mut timers);

        assert!(!run(&mut timer, &mut timers, &mut events, 0.0, 2.5));
        assert_eq!(timer.remaining(), 1);
        assert!(run(&mut timer, &mut timers, &mut events, 2.5, 4.0));

        let seen: Vec<_> = events.drain().collect();
        assert_eq!(
            seen,
            vec![
                GameEvent::MatchTick { remaining: 2 },
                GameEvent::MatchTick { remaining: 1 },
                GameEvent::MatchExpired,
            ]
        );
        assert!(!timer.is_running());
        assert!(timers.is_empty());
    }

    #[test]
    fn stopped_timer_never_fires() {
        let mut timers = GameTimers::new();
        let mut events = EventQueue::new();
        let mut timer = MatchTimer::new(2);
        timer.start(0.0, &mut timers);
        timer.stop(&mut timers);
        assert!(!run(&mut timer, &mut timers, &mut events, 0.0, 5.0));
        assert!(events.is_empty());
        assert_eq!(timer.remaining(), 2);
    }
}
