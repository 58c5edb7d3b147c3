//! Connection bookkeeping for the UDP front-end
//!
//! This module tracks which network address controls which player entity:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Early rejection of stale or duplicated input packets
//! - Capacity enforcement
//!
//! The simulation never sees addresses. It only learns about players
//! through `Game::connect`, `Game::submit_input` and `Game::disconnect`.

use log::info;
use shared::EntityId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client and the player entity it drives
#[derive(Debug)]
pub struct Client {
    /// Player entity assigned by the simulation
    pub player: EntityId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest input sequence forwarded to the simulation
    pub last_sequence: u32,
    /// Inputs dropped because they arrived out of order
    pub dropped_inputs: u64,
}

impl Client {
    /// Creates a client bound to a player, marked as active right now
    ///
    /// No input has been accepted yet, so any first sequence is taken.
    pub fn new(player: EntityId, addr: SocketAddr) -> Self {
        Self {
            player,
            addr,
            last_seen: Instant::now(),
            last_sequence: 0,
            dropped_inputs: 0,
        }
    }

    /// Records an input sequence number
    ///
    /// Returns false when the sequence is not newer than the last one
    /// forwarded, so reordered UDP packets never overwrite fresher input.
    pub fn accept_input(&mut self, sequence: u32) -> bool {
        self.last_seen = Instant::now();
        if self.last_sequence != 0 && sequence <= self.last_sequence {
            self.dropped_inputs += 1;
            return false;
        }
        self.last_sequence = sequence;
        true
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the given duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Maps addresses to player entities and enforces the player limit
pub struct ClientManager {
    clients: HashMap<EntityId, Client>,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    /// Creates a manager with the default client timeout
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DEFAULT_CLIENT_TIMEOUT)
    }

    /// Creates a manager that drops clients silent for longer than `timeout`
    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
            timeout,
        }
    }

    /// Returns true once the player limit is reached
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Registers a connection for an already spawned player
    ///
    /// Returns false if the server is at capacity or the player is
    /// already bound to a connection.
    pub fn add_client(&mut self, player: EntityId, addr: SocketAddr) -> bool {
        if self.is_full() || self.clients.contains_key(&player) {
            return false;
        }
        info!("Client {} bound to player {}", addr, player);
        self.clients.insert(player, Client::new(player, addr));
        true
    }

    /// Removes a client by its player id
    ///
    /// Returns the removed client, or None if the player had no connection.
    pub fn remove_client(&mut self, player: &EntityId) -> Option<Client> {
        let client = self.clients.remove(player)?;
        info!("Client {} for player {} removed", client.addr, client.player);
        Some(client)
    }

    /// Finds the player driven from the given address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<EntityId> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.player)
    }

    /// Refreshes the activity timestamp and filters stale sequences
    ///
    /// Returns false for unknown players and for inputs that are not newer
    /// than the last one accepted.
    pub fn accept_input(&mut self, player: EntityId, sequence: u32) -> bool {
        self.clients
            .get_mut(&player)
            .map_or(false, |client| client.accept_input(sequence))
    }

    /// Marks a client as active without touching its input sequence
    pub fn touch(&mut self, player: EntityId) {
        if let Some(client) = self.clients.get_mut(&player) {
            client.last_seen = Instant::now();
        }
    }

    /// Removes and returns clients that have been silent past the timeout
    pub fn check_timeouts(&mut self) -> Vec<EntityId> {
        let timeout = self.timeout;
        let mut timed_out: Vec<EntityId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.player)
            .collect();
        timed_out.sort_unstable();

        for player in &timed_out {
            self.remove_client(player);
        }
        timed_out
    }

    /// Players whose entity no longer exists, e.g. after dying
    pub fn orphaned(&self, is_alive: impl Fn(EntityId) -> bool) -> Vec<EntityId> {
        let mut orphaned: Vec<EntityId> = self.clients.keys().copied().filter(|id| !is_alive(*id)).collect();
        orphaned.sort_unstable();
        orphaned
    }

    /// All connected players and their addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(EntityId, SocketAddr)> {
        self.clients
            .values()
            .map(|client| (client.player, client.addr))
            .collect()
    }

    /// Returns the number of connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new(EntityId(3), test_addr());
        assert_eq!(client.player, EntityId(3));
        assert_eq!(client.addr, test_addr());
        assert_eq!(client.last_sequence, 0);
    }

    #[test]
    fn test_client_drops_stale_sequences() {
        let mut client = Client::new(EntityId(1), test_addr());
        assert!(client.accept_input(2));
        assert!(!client.accept_input(1));
        assert!(!client.accept_input(2));
        assert!(client.accept_input(5));
        assert_eq!(client.last_sequence, 5);
        assert_eq!(client.dropped_inputs, 2);
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(EntityId(1), test_addr());
        assert!(!client.is_timed_out(Duration::from_secs(1)));
        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);
        assert!(manager.add_client(EntityId(1), test_addr()));
        assert!(manager.is_full());
        assert!(!manager.add_client(EntityId(2), test_addr2()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        manager.add_client(EntityId(1), test_addr());
        let removed = manager.remove_client(&EntityId(1)).unwrap();
        assert_eq!(removed.addr, test_addr());
        assert!(manager.is_empty());
        assert!(manager.remove_client(&EntityId(999)).is_none());
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);
        manager.add_client(EntityId(1), test_addr());
        manager.add_client(EntityId(2), test_addr2());
        assert_eq!(manager.find_client_by_addr(test_addr2()), Some(EntityId(2)));
        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_client_by_addr(unknown), None);
    }

    #[test]
    fn test_accept_input_for_unknown_player() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.accept_input(EntityId(7), 1));
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::with_timeout(4, Duration::from_millis(10));
        manager.add_client(EntityId(1), test_addr());
        manager.add_client(EntityId(2), test_addr2());
        std::thread::sleep(Duration::from_millis(20));
        manager.touch(EntityId(2));
        assert_eq!(manager.check_timeouts(), vec![EntityId(1)]);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_orphaned_players() {
        let mut manager = ClientManager::new(4);
        manager.add_client(EntityId(1), test_addr());
        manager.add_client(EntityId(2), test_addr2());
        assert_eq!(manager.orphaned(|id| id == EntityId(2)), vec![EntityId(1)]);
    }
}
