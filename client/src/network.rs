use crate::hud::{headline, Hud};
use crate::input::{parse_line, Command, InputManager, HELP};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Intent, Packet, ServerEvent, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

/// Keeps the server from timing us out while the player is idle
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    name: String,
    client_id: Option<u32>,
    connected: bool,
    ready_on_connect: bool,

    hud: Hud,
    input_manager: InputManager,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        name: &str,
        ready_on_connect: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            name: name.to_string(),
            client_id: None,
            connected: false,
            ready_on_connect,
            hud: Hud::new(),
            input_manager: InputManager::new(),
        })
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {}...", self.name);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            name: self.name.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn send_intent(&mut self, intent: Intent) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            warn!("Not connected yet, dropping {:?}", intent);
            return Ok(());
        }

        let record = self.input_manager.next_record(intent);
        let packet = Packet::Intent {
            sequence: record.sequence,
            intent: record.intent,
        };
        self.send_packet(&packet).await
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                self.input_manager.reset();
                self.hud.set_local_id(client_id);

                if self.ready_on_connect {
                    self.send_intent(Intent::ToggleReady(true)).await?;
                }
            }

            Packet::Snapshot(snapshot) => {
                self.hud.apply_snapshot(snapshot);
            }

            Packet::Event { id, event } => {
                debug!("Event {}: {:?}", id, event);
                if let Some(line) = self.news(id, event) {
                    println!("{}", line);
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
        Ok(())
    }

    /// Applies the event and returns the line it produced. Repeats produce nothing.
    fn news(&mut self, id: u64, event: ServerEvent) -> Option<String> {
        let line = headline(&event);
        if self.hud.apply_event(id, event) {
            line
        } else {
            None
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
        match parse_line(line) {
            Ok(Command::Send(intent)) => self.send_intent(intent).await?,
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Quit) => return Ok(false),
            Err(e) => println!("{}", e),
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut status_interval = interval(Duration::from_secs(2));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => {
                                    if let Err(e) = self.handle_packet(packet).await {
                                        error!("Error handling packet: {}", e);
                                    }
                                }
                                Err(e) => warn!("Dropping undecodable packet ({} bytes): {}", len, e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle_line(&line).await? {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            break;
                        }
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        if let Err(e) = self.send_packet(&Packet::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },

                _ = status_interval.tick() => {
                    self.hud.update(2.0);
                    if self.connected {
                        println!("{}", self.hud.status_line());
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ChatChannel, SessionSnapshot};

    #[tokio::test]
    async fn test_connected_packet_sets_identity() {
        let mut client = Client::new("127.0.0.1:9", "alice", false).await.unwrap();
        assert!(!client.is_connected());

        client
            .handle_packet(Packet::Connected { client_id: 4 })
            .await
            .unwrap();

        assert!(client.is_connected());
        assert_eq!(client.hud().local_id(), Some(4));
    }

    #[tokio::test]
    async fn test_disconnected_packet_clears_identity() {
        let mut client = Client::new("127.0.0.1:9", "alice", false).await.unwrap();
        client
            .handle_packet(Packet::Connected { client_id: 4 })
            .await
            .unwrap();
        client
            .handle_packet(Packet::Disconnected {
                reason: "Server full".to_string(),
            })
            .await
            .unwrap();

        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_snapshot_and_events_reach_hud() {
        let mut client = Client::new("127.0.0.1:9", "alice", false).await.unwrap();
        client
            .handle_packet(Packet::Snapshot(SessionSnapshot {
                tick: 3,
                team_b_score: 2,
                ..Default::default()
            }))
            .await
            .unwrap();
        client
            .handle_packet(Packet::Event {
                id: 1,
                event: ServerEvent::ReadyChanged { ready: true },
            })
            .await
            .unwrap();

        assert_eq!(client.hud().snapshot().team_b_score, 2);
        assert!(client.hud().is_ready());
    }

    #[tokio::test]
    async fn test_news_prints_only_the_applied_event() {
        let mut client = Client::new("127.0.0.1:9", "alice", false).await.unwrap();
        let chat = ServerEvent::Chat {
            channel: ChatChannel::All,
            sender: "bob".to_string(),
            text: "hi".to_string(),
        };

        assert_eq!(client.news(1, chat.clone()).as_deref(), Some("[All] bob: hi"));
        assert_eq!(
            client.news(2, ServerEvent::AmmoChanged { magazine: 5, ammo: 20 }),
            None
        );
        assert_eq!(client.news(1, chat), None);
        assert_eq!(client.hud().chat().count(), 1);
        assert_eq!(client.hud().ammo(), (5, 20));
    }

    #[tokio::test]
    async fn test_quit_line_stops_loop() {
        let mut client = Client::new("127.0.0.1:9", "alice", false).await.unwrap();

        assert!(!client.handle_line("/quit").await.unwrap());
        assert!(client.handle_line("/dance").await.unwrap());
    }
}
