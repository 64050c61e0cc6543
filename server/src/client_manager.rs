//! Client connection management and intent queuing for the session server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Connection lifecycle (connect, reconnect, disconnect, timeout)
//! - Per-connection intent buffering in sequence order
//! - Duplicate suppression for intents delivered more than once
//! - Client capacity management and address tracking

use log::{debug, info};
use shared::{IntentRecord, ParticipantId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents a connected client and its pending requests
#[derive(Debug)]
pub struct Client {
    /// Participant id assigned by the server
    pub id: ParticipantId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    pub name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest intent sequence number already handed to the session
    pub last_processed_intent: u32,
    /// Buffered intents waiting to be applied, ordered by sequence
    pub pending_intents: Vec<IntentRecord>,
}

impl Client {
    pub fn new(id: ParticipantId, addr: SocketAddr, name: impl Into<String>) -> Self {
        Self {
            id,
            addr,
            name: name.into(),
            last_seen: Instant::now(),
            last_processed_intent: 0,
            pending_intents: Vec::new(),
        }
    }

    /// Buffers an intent in sequence order.
    ///
    /// Returns false for an intent that was already applied or is already
    /// waiting, so a resent packet is applied only once.
    pub fn add_intent(&mut self, record: IntentRecord) -> bool {
        self.last_seen = Instant::now();

        if record.sequence <= self.last_processed_intent
            || self
                .pending_intents
                .iter()
                .any(|pending| pending.sequence == record.sequence)
        {
            debug!(
                "Dropping duplicate intent {} from client {}",
                record.sequence, self.id
            );
            return false;
        }

        self.pending_intents.push(record);
        // Sort by sequence to handle out-of-order packet delivery
        self.pending_intents.sort_by_key(|pending| pending.sequence);
        true
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Checks if the client has exceeded the connection timeout
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients and their queued intents
pub struct ClientManager {
    clients: HashMap<ParticipantId, Client>,
    /// Next available id for new connections
    next_client_id: ParticipantId,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit.
    /// Client ids start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout: CLIENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, name: &str) -> Option<ParticipantId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, name, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, name));

        Some(client_id)
    }

    /// Removes a client. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &ParticipantId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.name);
            true
        } else {
            false
        }
    }

    /// Finds a client id by network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ParticipantId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, client_id: ParticipantId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Queues an intent for a client. Returns false if the client id is
    /// unknown or the intent is a duplicate.
    pub fn add_intent(&mut self, client_id: ParticipantId, record: IntentRecord) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => client.add_intent(record),
            None => false,
        }
    }

    /// Refreshes a client's activity timestamp
    pub fn touch(&mut self, client_id: ParticipantId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Takes every pending intent, per client in sequence order, and marks
    /// them processed.
    ///
    /// Clients are visited in id order so a tick applies intents
    /// deterministically.
    pub fn drain_intents(&mut self) -> Vec<(ParticipantId, IntentRecord)> {
        let mut ids: Vec<ParticipantId> = self.clients.keys().copied().collect();
        ids.sort_unstable();

        let mut drained = Vec::new();
        for id in ids {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            for record in client.pending_intents.drain(..) {
                client.last_processed_intent = client.last_processed_intent.max(record.sequence);
                drained.push((id, record));
            }
        }
        drained
    }

    /// Removes clients that have been silent longer than the timeout and
    /// returns their ids.
    pub fn check_timeouts(&mut self) -> Vec<ParticipantId> {
        let timeout = self.timeout;
        let timed_out: Vec<ParticipantId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// All client ids and their network addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(ParticipantId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
