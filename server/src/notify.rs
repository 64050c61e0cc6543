//! Fan-out of one-shot events to registered observers
//!
//! Observers are registered per participant. Every delivery is stamped with a
//! fresh event id, and each message is handed to a given observer at most once
//! no matter how many routing rules select it. Participants without a
//! registered observer are silently skipped.

use crate::roster::Roster;
use log::debug;
use shared::{AlertColor, ChatChannel, ParticipantId, ServerEvent, MAX_CHAT_LENGTH};
use std::collections::{BTreeSet, HashMap};

/// A sink for events addressed to one participant
pub trait Observer: Send + Sync {
    fn notify(&self, id: u64, event: &ServerEvent);
}

#[derive(Default)]
pub struct NotificationRouter {
    observers: HashMap<ParticipantId, Box<dyn Observer>>,
    next_event_id: u64,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, participant: ParticipantId, observer: Box<dyn Observer>) {
        self.observers.insert(participant, observer);
    }

    pub fn unregister(&mut self, participant: ParticipantId) -> bool {
        self.observers.remove(&participant).is_some()
    }

    fn next_id(&mut self) -> u64 {
        self.next_event_id += 1;
        self.next_event_id
    }

    /// Delivers one event to a set of recipients, each exactly once.
    /// Returns how many observers received it.
    fn deliver(&mut self, recipients: BTreeSet<ParticipantId>, event: &ServerEvent) -> usize {
        let id = self.next_id();
        let mut delivered = 0;
        for participant in recipients {
            if let Some(observer) = self.observers.get(&participant) {
                observer.notify(id, event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Sends an event to every registered observer.
    pub fn publish(&mut self, event: ServerEvent) -> usize {
        let recipients = self.observers.keys().copied().collect();
        self.deliver(recipients, &event)
    }

    /// Sends an event to a single participant's observer, if any.
    pub fn send_to(&mut self, participant: ParticipantId, event: ServerEvent) -> bool {
        self.deliver(BTreeSet::from([participant]), &event) == 1
    }

    /// Shows an alert on every observer's display for `duration` seconds.
    pub fn broadcast(&mut self, text: impl Into<String>, color: AlertColor, duration: f32) -> usize {
        let text = text.into();
        debug!("Alert: {}", text);
        self.publish(ServerEvent::Alert {
            text,
            color,
            duration,
        })
    }

    /// Routes a chat line from `sender` to everyone, or only to the
    /// sender's team. Empty lines are dropped; long lines are truncated.
    pub fn send_chat(
        &mut self,
        roster: &Roster,
        channel: ChatChannel,
        sender: ParticipantId,
        text: &str,
    ) -> usize {
        let text = text.trim();
        if text.is_empty() {
            debug!("Dropping empty chat line from {}", sender);
            return 0;
        }
        let Some(sender_record) = roster.get(sender) else {
            debug!("Dropping chat from unknown participant {}", sender);
            return 0;
        };

        let recipients: BTreeSet<ParticipantId> = roster
            .iter()
            .filter(|participant| match channel {
                ChatChannel::All => true,
                ChatChannel::Team => participant.team == sender_record.team,
            })
            .map(|participant| participant.id)
            .collect();

        let event = ServerEvent::Chat {
            channel,
            sender: sender_record.name.clone(),
            text: text.chars().take(MAX_CHAT_LENGTH).collect(),
        };
        self.deliver(recipients, &event)
    }
}
