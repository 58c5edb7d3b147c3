//! Types exchanged between the simulation core and the transport layer.
//!
//! Everything in here crosses the process boundary: inbound player commands,
//! outbound snapshots with their events, and the small set of identifiers
//! both sides need to agree on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_TICK_RATE: u32 = 30;
pub const DEFAULT_SEND_RATE: u32 = 15;
pub const WORLD_WIDTH: f32 = 2000.0;
pub const WORLD_HEIGHT: f32 = 2000.0;
pub const MAX_CRAFT_COUNT: u32 = 10;

/// Unique entity identifier. Assigned once and never reused while the
/// server process lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    Projectile,
    Pickup,
    Building,
    ResourceNode,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Player,
        EntityKind::Enemy,
        EntityKind::Projectile,
        EntityKind::Pickup,
        EntityKind::Building,
        EntityKind::ResourceNode,
    ];
}

/// Declares a string-keyed identifier enum with `id`/`parse` helpers.
///
/// Wire requests carry plain strings so the core can reject unknown values
/// with a reason code instead of failing to decode the whole packet.
macro_rules! string_ids {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn id(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }
    };
}

string_ids! {
    /// Inventory items.
    ItemId {
        Wood => "wood",
        Stone => "stone",
        IronOre => "iron_ore",
        Plank => "plank",
        Brick => "brick",
        IronBar => "iron_bar",
        Ammo => "ammo",
        Medkit => "medkit",
    }
}

string_ids! {
    /// Placeable structures, including upgrade tiers.
    StructureId {
        WoodWall => "wood_wall",
        StoneWall => "stone_wall",
        ArrowTower => "arrow_tower",
        CannonTower => "cannon_tower",
        FireTower => "fire_tower",
    }
}

string_ids! {
    /// Crafting recipes.
    RecipeId {
        Planks => "planks",
        Bricks => "bricks",
        IronBar => "iron_bar",
        Ammo => "ammo",
        Medkit => "medkit",
    }
}

string_ids! {
    /// Timed status effects.
    StatusId {
        Burn => "burn",
        Slow => "slow",
        Regen => "regen",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub structure: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftRequest {
    pub recipe: String,
    pub count: u32,
}

/// One client command. At most one is honored per connection per tick.
///
/// Values are untrusted; the core clamps or drops anything out of range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputCommand {
    pub sequence: u32,
    pub target_tick: u64,
    pub move_x: f32,
    pub move_y: f32,
    pub aim_x: f32,
    pub aim_y: f32,
    pub fire: bool,
    pub reload: bool,
    pub use_action: bool,
    pub build: Option<BuildRequest>,
    pub upgrade: Option<EntityId>,
    pub craft: Option<CraftRequest>,
    pub active_slot: Option<u8>,
}

/// Why a player-initiated action was refused. State is never partially
/// changed when one of these is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RejectReason {
    #[error("unknown structure")]
    UnknownStructure,
    #[error("placement is outside the world")]
    OutOfBounds,
    #[error("placement overlaps another entity")]
    Overlapping,
    #[error("cannot afford")]
    CannotAfford,
    #[error("not the owner")]
    NotOwner,
    #[error("no upgrade available")]
    NoUpgrade,
    #[error("unknown building")]
    UnknownBuilding,
    #[error("target is out of reach")]
    TooFar,
    #[error("requester is not an active player")]
    UnknownPlayer,
    #[error("unknown recipe")]
    UnknownRecipe,
    #[error("invalid count")]
    InvalidCount,
    #[error("missing ingredients")]
    MissingIngredients,
    #[error("inventory full")]
    InventoryFull,
    #[error("nothing to harvest in reach")]
    NothingToHarvest,
    #[error("resource node is depleted")]
    NodeDepleted,
    #[error("action on cooldown")]
    OnCooldown,
}

impl RejectReason {
    /// Stable numeric code sent alongside the rejection.
    pub fn code(&self) -> u16 {
        match self {
            RejectReason::UnknownStructure => 100,
            RejectReason::OutOfBounds => 101,
            RejectReason::Overlapping => 102,
            RejectReason::CannotAfford => 103,
            RejectReason::NotOwner => 104,
            RejectReason::NoUpgrade => 105,
            RejectReason::UnknownBuilding => 106,
            RejectReason::TooFar => 107,
            RejectReason::UnknownPlayer => 108,
            RejectReason::UnknownRecipe => 200,
            RejectReason::InvalidCount => 201,
            RejectReason::MissingIngredients => 202,
            RejectReason::InventoryFull => 203,
            RejectReason::NothingToHarvest => 300,
            RejectReason::NodeDepleted => 301,
            RejectReason::OnCooldown => 302,
        }
    }
}

/// Lifecycle of a single wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Intermission before the next wave.
    Idle,
    /// Regular enemies are being spawned on an interval.
    Spawning,
    /// Regulars are out; the boss spawns at its scheduled time.
    BossPending,
    /// Everything is spawned; the wave ends once the field is clear.
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    PlayerJoined {
        player: EntityId,
    },
    PlayerLeft {
        player: EntityId,
    },
    Damage {
        target: EntityId,
        source: Option<EntityId>,
        amount: f32,
        remaining: f32,
    },
    Death {
        entity: EntityId,
        kind: EntityKind,
        x: f32,
        y: f32,
        killer: Option<EntityId>,
    },
    StatusApplied {
        target: EntityId,
        status: StatusId,
    },
    StatusExpired {
        target: EntityId,
        status: StatusId,
    },
    WaveStarted {
        wave: u32,
        enemies: u32,
    },
    BossSpawned {
        wave: u32,
        boss: EntityId,
    },
    WaveCompleted {
        wave: u32,
    },
    WavePhaseChanged {
        wave: u32,
        phase: WavePhase,
    },
    BuildingPlaced {
        building: EntityId,
        owner: EntityId,
        structure: StructureId,
    },
    BuildingUpgraded {
        building: EntityId,
        structure: StructureId,
    },
    Harvested {
        player: EntityId,
        node: EntityId,
        item: ItemId,
        amount: u32,
    },
    NodeDepleted {
        node: EntityId,
    },
    NodeRespawned {
        node: EntityId,
    },
    PickupCollected {
        player: EntityId,
        pickup: EntityId,
        item: Option<ItemId>,
        amount: u32,
    },
    Crafted {
        player: EntityId,
        recipe: RecipeId,
        count: u32,
    },
    Rejected {
        player: EntityId,
        reason: RejectReason,
        code: u16,
    },
}

impl EventKind {
    /// Short type tag for the event.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::PlayerJoined { .. } => "player_joined",
            EventKind::PlayerLeft { .. } => "player_left",
            EventKind::Damage { .. } => "damage",
            EventKind::Death { .. } => "death",
            EventKind::StatusApplied { .. } => "status_applied",
            EventKind::StatusExpired { .. } => "status_expired",
            EventKind::WaveStarted { .. } => "wave_started",
            EventKind::BossSpawned { .. } => "boss_spawned",
            EventKind::WaveCompleted { .. } => "wave_completed",
            EventKind::WavePhaseChanged { .. } => "wave_phase_changed",
            EventKind::BuildingPlaced { .. } => "building_placed",
            EventKind::BuildingUpgraded { .. } => "building_upgraded",
            EventKind::Harvested { .. } => "harvested",
            EventKind::NodeDepleted { .. } => "node_depleted",
            EventKind::NodeRespawned { .. } => "node_respawned",
            EventKind::PickupCollected { .. } => "pickup_collected",
            EventKind::Crafted { .. } => "crafted",
            EventKind::Rejected { .. } => "rejected",
        }
    }

    pub fn rejected(player: EntityId, reason: RejectReason) -> Self {
        EventKind::Rejected {
            player,
            reason,
            code: reason.code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub tick: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub rotation: f32,
    pub radius: f32,
    pub health: Option<f32>,
    pub max_health: Option<f32>,
    pub owner: Option<EntityId>,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time_ms: f64,
    pub entities: Vec<EntitySnapshot>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect { client_version: u32 },
    Input(InputCommand),
    Disconnect,

    Connected { player_id: EntityId, tick_rate: u32 },
    Snapshot(Snapshot),
    Disconnected { reason: String },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("codec error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(packet)?)
}

pub fn decode(data: &[u8]) -> Result<Packet, CodecError> {
    Ok(bincode::deserialize(data)?)
}
