//! # Team Shooter Session Server
//!
//! This library provides the authoritative session layer for a team-based
//! multiplayer shooter. It owns the single source of truth for match
//! progression, team composition, scoring, kill-streak announcements, spawn
//! placement, weapon ownership and chat fan-out, and pushes consistent state
//! to every observing client.
//!
//! ## Core Responsibilities
//!
//! ### Match Progression
//! A phase machine moves the session from a ready check with a countdown,
//! through active play, to a win announcement and an automatic restart.
//!
//! ### Combat Resolution
//! Damage, death, kill credit and kill streaks are resolved on the server.
//! Dead avatars are replaced after a respawn delay at a spawn point chosen
//! away from enemies.
//!
//! ### State Broadcasting
//! Continuously-synchronized fields (phase, scores, countdown, health) go out
//! as a snapshot every tick. Discrete happenings (alerts, deaths, chat) go out
//! as one-shot events stamped with an id, so a client can drop duplicates.
//!
//! ## Architecture Design
//!
//! ### Single Thread of Control
//! Every mutation of session state happens inside [`session::Session`], driven
//! from one loop. Client requests are queued per connection and applied at
//! the start of a tick. Timers are plain values in a queue on the session's
//! own clock and are cancelled with the entity that owns them.
//!
//! ### Explicit Collaborators
//! The session never looks anything up globally. The world surface
//! ([`arena::WorldSurface`]) and the per-participant event sinks
//! ([`notify::Observer`]) are handed to it; combat borrows exactly the
//! state it may touch through [`combat::CombatContext`].
//!
//! ### UDP-Based Communication
//! Uses UDP sockets for low-latency communication with clients. Intents are
//! sequence-numbered so resends are applied once.
//!
//! ## Module Organization
//!
//! - `roster`, `streak`: participants, team balancing, ready check, kill streaks
//! - `weapons`, `pickup`: loadouts, switching, ammo, world pickups
//! - `combat`: avatars, damage, death, scoreboard
//! - `spawn`, `arena`: tiered spawn selection and the default world surface
//! - `coordinator`: the match phase machine
//! - `notify`, `timers`: event fan-out and owner-keyed scheduled tasks
//! - `session`: the aggregate tying all of the above together
//! - `client_manager`, `network`: connections, intent queues, the UDP loop
//! - `config`, `error`: command line, match rules, transport errors
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::parse();
//!     let mut server = Server::new(&config).await?;
//!
//!     // Runs until a shutdown message arrives:
//!     // - Accepts connections and queues client intents
//!     // - Applies intents and advances the session at the tick rate
//!     // - Broadcasts a snapshot every tick
//!     // - Drops clients that go silent
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod notify;
pub mod pickup;
pub mod roster;
pub mod session;
pub mod spawn;
pub mod streak;
pub mod timers;
pub mod weapons;
