use crate::ai::{self, GoalSelector};
use crate::components::{Health, StatusContainer, WeaponState};
use crate::defs::{self, EnemyDef, EnemyKind, ResourceDef, StructureDef, WeaponDef};
use crate::inventory::{Inventory, ItemStack, Wallet};
use crate::math::Vec2;
use shared::{EntityId, EntityKind, InputCommand, ItemId, StatusId, StructureId};

/// Which side an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Players,
    Hostile,
    Neutral,
}

// Entity representation: common fields plus a kind-specific payload.
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle in radians.
    pub facing: f32,
    pub radius: f32,
    pub alive: bool,
    pub team: Team,
    /// Weak back-reference; always re-resolve through the store.
    pub owner: Option<EntityId>,
    pub data: EntityData,
}

#[derive(Debug)]
pub enum EntityData {
    Player(PlayerData),
    Enemy(EnemyData),
    Projectile(ProjectileData),
    Pickup(PickupData),
    Building(BuildingData),
    ResourceNode(ResourceNodeData),
}

/// Input held between commands; one-shot actions are not repeated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeldInput {
    pub movement: Vec2,
    pub fire: bool,
}

#[derive(Debug)]
pub struct PlayerData {
    pub health: Health,
    pub statuses: StatusContainer,
    pub inventory: Inventory,
    pub wallet: Wallet,
    pub weapon: WeaponState,
    pub harvest_cooldown_ms: f64,
    pub held: HeldInput,
    /// Highest command sequence applied so far.
    pub last_sequence: u32,
    /// `target_tick` of the last applied command.
    pub last_target_tick: u64,
    pub kills: u32,
}

#[derive(Debug)]
pub struct EnemyData {
    pub kind: EnemyKind,
    pub health: Health,
    pub statuses: StatusContainer,
    pub goals: GoalSelector,
    pub target: Option<EntityId>,
    pub speed: f32,
    pub gold_drop: u32,
    pub boss: bool,
}

#[derive(Debug)]
pub struct ProjectileData {
    pub shooter: Option<EntityId>,
    pub dir: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub lifetime_ms: f64,
    pub pierce: u32,
    pub bounces: u32,
    pub hits: Vec<EntityId>,
    pub on_hit: Option<StatusId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickupContents {
    Item(ItemStack),
    Gold(u32),
}

#[derive(Debug)]
pub struct PickupData {
    pub contents: PickupContents,
    pub lifetime_ms: f64,
    /// Player this pickup is flying toward.
    pub reserved_by: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TowerState {
    pub cooldown_ms: f64,
}

#[derive(Debug)]
pub struct BuildingData {
    pub structure: StructureId,
    pub health: Health,
    pub statuses: StatusContainer,
    pub tower: Option<TowerState>,
}

#[derive(Debug)]
pub struct ResourceNodeData {
    pub item: ItemId,
    pub remaining: u32,
    pub capacity: u32,
    pub yield_per_harvest: u32,
    pub respawn_ms: f64,
    /// Ticks spent depleted; elapsed time is `respawn_ticks * dt`.
    pub respawn_ticks: u64,
}

impl ResourceNodeData {
    pub fn is_depleted(&self) -> bool {
        self.remaining == 0
    }
}

impl Entity {
    fn base(pos: Vec2, radius: f32, team: Team, data: EntityData) -> Self {
        Entity {
            // Assigned by `World::spawn`.
            id: EntityId(0),
            pos,
            vel: Vec2::ZERO,
            facing: 0.0,
            radius,
            alive: true,
            team,
            owner: None,
            data,
        }
    }

    pub fn player(pos: Vec2) -> Self {
        let mut inventory = Inventory::new(defs::PLAYER_SLOTS);
        for &(item, amount) in defs::STARTING_ITEMS {
            inventory.add(item, amount);
        }
        Self::base(
            pos,
            defs::PLAYER_RADIUS,
            Team::Players,
            EntityData::Player(PlayerData {
                health: Health::new(defs::PLAYER_MAX_HEALTH).with_hit_invuln(defs::PLAYER_HIT_INVULN_MS),
                statuses: StatusContainer::default(),
                inventory,
                wallet: Wallet::default(),
                weapon: WeaponState::new(defs::PLAYER_MAGAZINE),
                harvest_cooldown_ms: 0.0,
                held: HeldInput::default(),
                last_sequence: 0,
                last_target_tick: 0,
                kills: 0,
            }),
        )
    }

    /// Enemy with the standard goal set for its archetype.
    pub fn enemy(def: &EnemyDef, pos: Vec2, health_scale: f32, rally_point: Vec2) -> Self {
        Self::base(
            pos,
            def.radius,
            Team::Hostile,
            EntityData::Enemy(EnemyData {
                kind: def.kind,
                health: Health::new(def.max_health * health_scale.max(0.1)),
                statuses: StatusContainer::default(),
                goals: ai::standard_goals(def, rally_point),
                target: None,
                speed: def.speed,
                gold_drop: def.gold_drop,
                boss: false,
            }),
        )
    }

    pub fn projectile(shooter: Option<EntityId>, team: Team, pos: Vec2, dir: Vec2, weapon: &WeaponDef) -> Self {
        let dir = dir.normalize();
        let mut entity = Self::base(
            pos,
            weapon.projectile_radius,
            team,
            EntityData::Projectile(ProjectileData {
                shooter,
                dir,
                speed: weapon.projectile_speed,
                damage: weapon.damage,
                lifetime_ms: weapon.lifetime_ms,
                pierce: weapon.pierce,
                bounces: weapon.bounces,
                hits: Vec::new(),
                on_hit: weapon.on_hit,
            }),
        );
        entity.vel = dir * weapon.projectile_speed;
        entity.facing = dir.angle();
        entity.owner = shooter;
        entity
    }

    pub fn pickup(pos: Vec2, contents: PickupContents) -> Self {
        Self::base(
            pos,
            defs::PICKUP_RADIUS,
            Team::Neutral,
            EntityData::Pickup(PickupData {
                contents,
                lifetime_ms: defs::PICKUP_LIFETIME_MS,
                reserved_by: None,
            }),
        )
    }

    pub fn building(def: &StructureDef, pos: Vec2, owner: EntityId) -> Self {
        let mut entity = Self::base(
            pos,
            def.radius,
            Team::Players,
            EntityData::Building(BuildingData {
                structure: def.id,
                health: Health::new(def.max_health),
                statuses: StatusContainer::default(),
                tower: def.tower.map(|_| TowerState { cooldown_ms: 0.0 }),
            }),
        );
        entity.owner = Some(owner);
        entity
    }

    pub fn resource_node(def: &ResourceDef, pos: Vec2) -> Self {
        Self::base(
            pos,
            def.radius,
            Team::Neutral,
            EntityData::ResourceNode(ResourceNodeData {
                item: def.item,
                remaining: def.capacity,
                capacity: def.capacity,
                yield_per_harvest: def.yield_per_harvest,
                respawn_ms: def.respawn_ms,
                respawn_ticks: 0,
            }),
        )
    }

    pub fn kind(&self) -> EntityKind {
        match self.data {
            EntityData::Player(_) => EntityKind::Player,
            EntityData::Enemy(_) => EntityKind::Enemy,
            EntityData::Projectile(_) => EntityKind::Projectile,
            EntityData::Pickup(_) => EntityKind::Pickup,
            EntityData::Building(_) => EntityKind::Building,
            EntityData::ResourceNode(_) => EntityKind::ResourceNode,
        }
    }

    /// Moves under its own velocity and is pushed by collisions.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.data, EntityData::Player(_) | EntityData::Enemy(_))
    }

    /// Blocks dynamic entities without being pushed itself.
    pub fn is_obstacle(&self) -> bool {
        matches!(self.data, EntityData::Building(_) | EntityData::ResourceNode(_))
    }

    /// Takes part in physical overlap at all.
    pub fn is_solid(&self) -> bool {
        self.is_dynamic() || self.is_obstacle()
    }

    pub fn health(&self) -> Option<&Health> {
        match &self.data {
            EntityData::Player(p) => Some(&p.health),
            EntityData::Enemy(e) => Some(&e.health),
            EntityData::Building(b) => Some(&b.health),
            _ => None,
        }
    }

    pub fn health_mut(&mut self) -> Option<&mut Health> {
        match &mut self.data {
            EntityData::Player(p) => Some(&mut p.health),
            EntityData::Enemy(e) => Some(&mut e.health),
            EntityData::Building(b) => Some(&mut b.health),
            _ => None,
        }
    }

    pub fn statuses(&self) -> Option<&StatusContainer> {
        match &self.data {
            EntityData::Player(p) => Some(&p.statuses),
            EntityData::Enemy(e) => Some(&e.statuses),
            EntityData::Building(b) => Some(&b.statuses),
            _ => None,
        }
    }

    pub fn statuses_mut(&mut self) -> Option<&mut StatusContainer> {
        match &mut self.data {
            EntityData::Player(p) => Some(&mut p.statuses),
            EntityData::Enemy(e) => Some(&mut e.statuses),
            EntityData::Building(b) => Some(&mut b.statuses),
            _ => None,
        }
    }

    pub fn is_damageable(&self) -> bool {
        self.health().is_some()
    }

    /// Product of every active status's speed multiplier.
    pub fn speed_multiplier(&self) -> f32 {
        self.statuses()
            .map(|statuses| {
                statuses
                    .ids()
                    .into_iter()
                    .map(|id| defs::status_def(id).speed_multiplier)
                    .product()
            })
            .unwrap_or(1.0)
    }

    pub fn as_player(&self) -> Option<&PlayerData> {
        match &self.data {
            EntityData::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.data {
            EntityData::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_enemy(&self) -> Option<&EnemyData> {
        match &self.data {
            EntityData::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyData> {
        match &mut self.data {
            EntityData::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_building(&self) -> Option<&BuildingData> {
        match &self.data {
            EntityData::Building(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&ResourceNodeData> {
        match &self.data {
            EntityData::ResourceNode(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut ResourceNodeData> {
        match &mut self.data {
            EntityData::ResourceNode(n) => Some(n),
            _ => None,
        }
    }

    /// Edge-to-edge distance to another circle; negative when overlapping.
    pub fn gap_to(&self, pos: Vec2, radius: f32) -> f32 {
        self.pos.distance(pos) - self.radius - radius
    }

    /// Client-facing auxiliary flags.
    pub fn flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = self
            .statuses()
            .map(|s| s.ids().into_iter().map(|id| defs::status_def(id).flag.to_string()).collect())
            .unwrap_or_default();
        match &self.data {
            EntityData::Player(p) if p.weapon.is_reloading() => flags.push("reloading".to_string()),
            EntityData::Enemy(e) if e.boss => flags.push("boss".to_string()),
            EntityData::Pickup(p) if p.reserved_by.is_some() => flags.push("reserved".to_string()),
            EntityData::ResourceNode(n) if n.is_depleted() => flags.push("depleted".to_string()),
            _ => {}
        }
        flags
    }
}

/// Accepts a command only if it is newer than the last applied one and does
/// not target a tick older than that command did.
pub fn accepts_sequence(player: &PlayerData, cmd: &InputCommand) -> bool {
    (player.last_sequence == 0 || cmd.sequence > player.last_sequence) && cmd.target_tick >= player.last_target_tick
}
