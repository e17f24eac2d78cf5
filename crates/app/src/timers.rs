//! Local timer actuator.
//!
//! Stands in for the external timer/display device: up to four concurrent
//! countdowns driven by a 1 Hz tick. Expired timers ring until a STOP
//! command silences every ringing timer at once.

use tracing::{debug, info, warn};

use tempovox_grammar::{Intent, TimerTarget};

pub const MAX_TIMERS: usize = 4;

#[derive(Debug, Clone)]
struct TimerSlot {
    name: Option<String>,
    remaining_seconds: u32,
    ringing: bool,
}

impl TimerSlot {
    fn display_name(&self, position: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("timer {}", position + 1),
        }
    }
}

/// Countdown state for at most [`MAX_TIMERS`] concurrent timers.
///
/// Targets resolve by display name or by 1-based slot position ("timer
/// one" is the oldest). A command with a missing target is a no-op; the
/// caller gets the operator-visible line and the event is traced.
#[derive(Debug, Default)]
pub struct TimerBank {
    slots: Vec<TimerSlot>,
}

impl TimerBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_timers(&self) -> usize {
        self.slots.len()
    }

    pub fn ringing_timers(&self) -> usize {
        self.slots.iter().filter(|slot| slot.ringing).count()
    }

    pub fn remaining_seconds(&self, position: usize) -> Option<u32> {
        self.slots.get(position).map(|slot| slot.remaining_seconds)
    }

    /// Applies one parsed command. Returns lines for the operator console;
    /// an empty vec means the command was absorbed silently.
    pub fn apply(&mut self, intent: &Intent) -> Vec<String> {
        match intent {
            Intent::Stop => self.silence_all(),
            Intent::Set { name, seconds } => self.set(name.clone(), *seconds),
            Intent::Cancel { target } => self.cancel(target.as_ref()),
            Intent::Adjust { target, seconds } => self.adjust(target, *seconds),
        }
    }

    /// Advances every running countdown by one second. Call at 1 Hz.
    pub fn tick(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for (position, slot) in self.slots.iter_mut().enumerate() {
            if slot.ringing {
                continue;
            }
            slot.remaining_seconds = slot.remaining_seconds.saturating_sub(1);
            if slot.remaining_seconds == 0 {
                slot.ringing = true;
                let label = slot.display_name(position);
                info!(timer = %label, "timer expired, ringing");
                lines.push(format!("ring: \"{label}\" finished"));
            }
        }
        lines
    }

    fn set(&mut self, name: Option<String>, seconds: u32) -> Vec<String> {
        if self.slots.len() >= MAX_TIMERS {
            let label = name.as_deref().unwrap_or("timer");
            warn!(timer = label, "timer limit reached, set refused");
            return vec![format!(
                "err: timer limit reached ({MAX_TIMERS}), \"{label}\" not set"
            )];
        }
        info!(timer = ?name, seconds, "timer set");
        self.slots.push(TimerSlot {
            name,
            remaining_seconds: seconds,
            ringing: false,
        });
        Vec::new()
    }

    fn cancel(&mut self, target: Option<&TimerTarget>) -> Vec<String> {
        match target {
            None => {
                let dropped = self.slots.len();
                self.slots.clear();
                info!(dropped, "all timers cancelled");
                Vec::new()
            }
            Some(target) => match self.resolve(target) {
                Some(position) => {
                    let slot = self.slots.remove(position);
                    info!(timer = %slot.display_name(position), "timer cancelled");
                    Vec::new()
                }
                None => self.missing(target),
            },
        }
    }

    fn adjust(&mut self, target: &TimerTarget, seconds: i64) -> Vec<String> {
        match self.resolve(target) {
            Some(position) => {
                let slot = &mut self.slots[position];
                let remaining = (slot.remaining_seconds as i64 + seconds).max(0);
                slot.remaining_seconds = remaining as u32;
                if remaining > 0 {
                    slot.ringing = false;
                }
                info!(
                    timer = %slot.display_name(position),
                    adjust = seconds,
                    remaining,
                    "timer adjusted"
                );
                Vec::new()
            }
            None => self.missing(target),
        }
    }

    fn silence_all(&mut self) -> Vec<String> {
        let before = self.slots.len();
        self.slots.retain(|slot| !slot.ringing);
        let silenced = before - self.slots.len();
        if silenced > 0 {
            info!(silenced, "ringing timers silenced");
            vec![format!("ok: silenced {silenced} ringing timer(s)")]
        } else {
            debug!("stop with nothing ringing");
            Vec::new()
        }
    }

    fn resolve(&self, target: &TimerTarget) -> Option<usize> {
        match target {
            TimerTarget::Index(n) => {
                let position = (*n as usize).checked_sub(1)?;
                (position < self.slots.len()).then_some(position)
            }
            TimerTarget::Name(name) => self
                .slots
                .iter()
                .position(|slot| slot.name.as_deref() == Some(name.as_str())),
        }
    }

    fn missing(&self, target: &TimerTarget) -> Vec<String> {
        warn!(target = %target, "no timer matching target");
        vec![format!("err: no timer matching \"{target}\"")]
    }
}
