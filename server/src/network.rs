//! Server network layer: UDP transport around the simulation loop

use crate::client_manager::ClientManager;
use crate::config::SimConfig;
use crate::game::Game;
use crate::scheduler::{SchedulerHandle, TickScheduler};
use log::{debug, error, info, warn};
use shared::{decode, encode, EntityId, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { player: EntityId },
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<EntityId>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: Game,
    scheduler: TickScheduler,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    /// Creates a server bound to the given address
    ///
    /// Validates the configuration, builds the game and sets up the
    /// channels between the network tasks and the tick loop.
    pub async fn new(addr: &str, config: SimConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let game = Game::new(config.clone())?;
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_players))),
            game,
            scheduler: TickScheduler::new(config.tick_rate),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Address the socket is actually bound to, useful with port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle that stops the tick loop; `run` returns afterwards.
    pub fn scheduler_handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    /// Read access to the simulation, e.g. for tests and diagnostics
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode(&buffer[0..len]) {
                        Ok(packet) => {
                            if let Err(e) = server_tx.send(ServerMessage::PacketReceived { packet, addr }) {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Malformed packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };
                        let data = match encode(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast: {}", e);
                                continue;
                            }
                        };

                        for (player, addr) in client_addrs {
                            if Some(player) == exclude {
                                continue;
                            }
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to player {}: {}", player, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for player in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { player }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    /// Encodes and sends a packet to a specific address
    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Queues a packet for a single address
    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues a packet for every connected client except `exclude`
    fn broadcast_packet(&self, packet: Packet, exclude: Option<EntityId>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet, exclude }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Applies one inbound packet. Runs between ticks only.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!("Client connecting from {} (version: {})", addr, client_version);
                if client_version != PROTOCOL_VERSION {
                    let reason = format!("Protocol version {} required", PROTOCOL_VERSION);
                    self.send_packet(Packet::Disconnected { reason }, addr);
                    return;
                }

                // Reconnecting from the same address replaces the old player
                let existing = { self.clients.read().await.find_client_by_addr(addr) };
                if let Some(player) = existing {
                    info!("Replacing player {} for {}", player, addr);
                    self.clients.write().await.remove_client(&player);
                    self.game.disconnect(player);
                }

                let mut clients = self.clients.write().await;
                if clients.is_full() {
                    drop(clients);
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    );
                    return;
                }
                let player = self.game.connect();
                clients.add_client(player, addr);
                drop(clients);

                let response = Packet::Connected {
                    player_id: player,
                    tick_rate: self.game.config().tick_rate,
                };
                self.send_packet(response, addr);
            }

            Packet::Input(cmd) => {
                let accepted = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .filter(|player| clients.accept_input(*player, cmd.sequence))
                };
                if let Some(player) = accepted {
                    self.game.submit_input(player, cmd);
                }
            }

            Packet::Disconnect => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    clients.find_client_by_addr(addr).and_then(|player| clients.remove_client(&player))
                };
                if let Some(client) = removed {
                    self.game.disconnect(client.player);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Runs one simulation tick and hands the snapshot to the sender task.
    async fn run_tick(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(snapshot) = self.game.tick()? {
            if snapshot.tick % 60 == 0 {
                debug!("Snapshot {}: {} entities", snapshot.tick, snapshot.entities.len());
            }
            self.broadcast_packet(Packet::Snapshot(snapshot), None);
        }

        // Players that died in this tick lose their connection
        let orphaned = {
            let clients = self.clients.read().await;
            clients.orphaned(|id| self.game.world().is_alive(id))
        };
        for player in orphaned {
            let removed = { self.clients.write().await.remove_client(&player) };
            if let Some(client) = removed {
                self.send_packet(
                    Packet::Disconnected {
                        reason: "Player died".to_string(),
                    },
                    client.addr,
                );
            }
        }
        Ok(())
    }

    /// Main server loop coordinating all operations
    ///
    /// Returns once the scheduler is stopped, or with the fault of the
    /// first tick that failed.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!(
            "Server started: {} Hz simulation, {} Hz snapshots",
            self.game.config().tick_rate,
            self.game.config().send_rate
        );

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { player }) => {
                            info!("Player {} timed out", player);
                            self.game.disconnect(player);
                        }
                        None => {
                            info!("Network channel closed, shutting down");
                            self.scheduler.handle().stop();
                            break;
                        }
                    }
                }

                tick = self.scheduler.next_tick() => {
                    let Some(info) = tick else {
                        info!("Scheduler stopped, shutting down");
                        break;
                    };
                    if info.lateness > self.scheduler.period() {
                        debug!("Tick {} woke {:?} late", info.tick, info.lateness);
                    }
                    if let Err(e) = self.run_tick().await {
                        error!("Tick {} faulted: {}", info.tick, e);
                        self.scheduler.handle().stop();
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }
}
