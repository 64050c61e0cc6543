//! Cancellable scheduled tasks on the authoritative clock
//!
//! The session never calls back into an entity directly from a timer. Tasks
//! are plain values tagged with the identity of their owner; destroying an
//! owner cancels everything it scheduled, so a stale task can never fire
//! against a replaced avatar.

use log::debug;

pub type AvatarId = u64;
pub type TimerId = u64;

/// Who a scheduled task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Session,
    Participant(shared::ParticipantId),
    Avatar(AvatarId),
}

/// What happens when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Replace a dead avatar with a fresh one at a new spawn point
    Respawn { avatar: AvatarId },
    /// Tell the dead avatar's owner how many whole seconds remain
    RespawnCountdown { avatar: AvatarId, seconds: u32 },
    /// Try to spawn a participant whose previous spawn attempt found no point
    RetrySpawn { participant: shared::ParticipantId },
    /// Tear the session down and wait for players to ready up again
    RestartMatch,
}

#[derive(Debug, Clone)]
struct Scheduled {
    id: TimerId,
    owner: TimerOwner,
    due: f64,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_id: TimerId,
    pending: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds elapsed on the authoritative clock
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule(&mut self, owner: TimerOwner, delay: f32, task: Task) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Scheduled {
            id,
            owner,
            due: self.now + f64::from(delay.max(0.0)),
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|scheduled| scheduled.id != id);
        self.pending.len() != before
    }

    /// Cancels every task scheduled by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let before = self.pending.len();
        self.pending.retain(|scheduled| scheduled.owner != owner);
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!("Cancelled {} timers owned by {:?}", cancelled, owner);
        }
        cancelled
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, task: &Task) -> bool {
        self.pending.iter().any(|scheduled| &scheduled.task == task)
    }

    /// Remaining delay of the first pending task equal to `task`
    pub fn remaining(&self, task: &Task) -> Option<f64> {
        self.pending
            .iter()
            .find(|scheduled| &scheduled.task == task)
            .map(|scheduled| (scheduled.due - self.now).max(0.0))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Moves the clock forward and returns every task that came due,
    /// earliest first, ties in scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<Task> {
        self.now += f64::from(dt.max(0.0));

        let now = self.now;
        let mut due: Vec<Scheduled> = Vec::new();
        self.pending.retain(|scheduled| {
            if scheduled.due <= now {
                due.push(scheduled.clone());
                false
            } else {
                true
            }
        });

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        due.into_iter().map(|scheduled| scheduled.task).collect()
    }
}
