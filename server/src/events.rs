use shared::{EventKind, GameEvent};

/// Queue of discrete events raised during the current tick.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, tick: u64, kind: EventKind) {
        self.queue.push(GameEvent { tick, kind });
    }

    /// Takes every queued event, leaving the bus empty.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::EntityId;

    #[test]
    fn test_drain_empties_queue() {
        let mut bus = EventBus::new();
        bus.emit(3, EventKind::PlayerJoined { player: EntityId(1) });
        bus.emit(3, EventKind::WaveCompleted { wave: 1 });
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].tick, 3);
        assert!(bus.is_empty());
        assert!(bus.drain().is_empty());
    }
}
