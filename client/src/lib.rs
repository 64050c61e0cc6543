//! # Team Shooter Terminal Client
//!
//! A thin observer of the authoritative session server. The client holds no
//! game rules of its own: it forwards the player's requests and displays
//! whatever the server replicates.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Turns typed lines into intents:
//! - `/ready`, `/unready`, `/fire`, `/stop`, `/switch`
//! - `/team <message>` for team chat, plain text for everyone
//! - Sequence numbering so the server applies each intent once
//!
//! ### HUD Module (`hud`)
//! The local picture of the session:
//! - Scores, phase and countdown from the latest snapshot
//! - Health, ammo, death and respawn countdown from events
//! - Timed alerts and a bounded chat log
//! - Duplicate event suppression by event id
//!
//! ### Network Module (`network`)
//! Owns the UDP socket, the connect handshake, heartbeats and the main loop
//! multiplexing server packets with terminal input.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", "alice", true).await?;
//!     client.run().await
//! }
//! ```

pub mod hud;
pub mod input;
pub mod network;
