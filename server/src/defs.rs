//! Static game data: tuning constants and definition tables.

use crate::inventory::{Inventory, Wallet};
use shared::{ItemId, RecipeId, RejectReason, StatusId, StructureId};

pub const PLAYER_RADIUS: f32 = 16.0;
pub const PLAYER_SPEED: f32 = 220.0;
pub const PLAYER_MAX_HEALTH: f32 = 100.0;
pub const PLAYER_HIT_INVULN_MS: f64 = 300.0;
pub const PLAYER_SLOTS: usize = 12;
pub const PLAYER_RELOAD_MS: f64 = 1500.0;
pub const MAX_BUILD_DISTANCE: f32 = 240.0;

pub const HARVEST_REACH: f32 = 40.0;
pub const HARVEST_COOLDOWN_MS: f64 = 400.0;

pub const PICKUP_RADIUS: f32 = 8.0;
pub const PICKUP_MAGNET_RADIUS: f32 = 90.0;
pub const PICKUP_SPEED: f32 = 280.0;
pub const PICKUP_LIFETIME_MS: f64 = 60_000.0;

pub const MEDKIT_REGEN_MS: f64 = 5_000.0;

/// Items every player spawns with.
pub const STARTING_ITEMS: &[(ItemId, u32)] = &[(ItemId::Wood, 20), (ItemId::Stone, 10), (ItemId::Ammo, 60)];

pub fn item_max_stack(item: ItemId) -> u32 {
    match item {
        ItemId::Wood | ItemId::Stone => 99,
        ItemId::IronOre | ItemId::Plank | ItemId::Brick => 50,
        ItemId::IronBar => 25,
        ItemId::Ammo => 200,
        ItemId::Medkit => 5,
    }
}

/// Items plus gold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub items: &'static [(ItemId, u32)],
    pub gold: u32,
}

impl Cost {
    pub fn affordable(&self, inventory: &Inventory, wallet: &Wallet) -> bool {
        wallet.gold >= self.gold && inventory.has_all(self.items)
    }

    /// Charges the full cost or nothing.
    pub fn charge(&self, inventory: &mut Inventory, wallet: &mut Wallet) -> Result<(), RejectReason> {
        if !self.affordable(inventory, wallet) {
            return Err(RejectReason::CannotAfford);
        }
        inventory.remove_all(self.items);
        wallet.spend(self.gold);
        Ok(())
    }
}

/// Everything a shooter needs to spawn a projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponDef {
    pub damage: f32,
    pub cooldown_ms: f64,
    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub lifetime_ms: f64,
    /// Extra targets a projectile may pass through.
    pub pierce: u32,
    /// Reflections off the world edge before despawning.
    pub bounces: u32,
    pub on_hit: Option<StatusId>,
}

pub const PLAYER_WEAPON: WeaponDef = WeaponDef {
    damage: 12.0,
    cooldown_ms: 250.0,
    projectile_speed: 650.0,
    projectile_radius: 4.0,
    lifetime_ms: 1200.0,
    pierce: 0,
    bounces: 0,
    on_hit: None,
};
pub const PLAYER_MAGAZINE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerDef {
    pub range: f32,
    pub weapon: WeaponDef,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureDef {
    pub id: StructureId,
    pub radius: f32,
    pub max_health: f32,
    pub cost: Cost,
    pub upgrade: Option<StructureId>,
    pub tower: Option<TowerDef>,
}

pub fn structure_def(id: StructureId) -> StructureDef {
    match id {
        StructureId::WoodWall => StructureDef {
            id,
            radius: 20.0,
            max_health: 200.0,
            cost: Cost {
                items: &[(ItemId::Wood, 10)],
                gold: 0,
            },
            upgrade: Some(StructureId::StoneWall),
            tower: None,
        },
        StructureId::StoneWall => StructureDef {
            id,
            radius: 20.0,
            max_health: 500.0,
            cost: Cost {
                items: &[(ItemId::Stone, 15), (ItemId::Brick, 2)],
                gold: 0,
            },
            upgrade: None,
            tower: None,
        },
        StructureId::ArrowTower => StructureDef {
            id,
            radius: 22.0,
            max_health: 250.0,
            cost: Cost {
                items: &[(ItemId::Wood, 20), (ItemId::Stone, 10)],
                gold: 0,
            },
            upgrade: Some(StructureId::CannonTower),
            tower: Some(TowerDef {
                range: 320.0,
                weapon: WeaponDef {
                    damage: 10.0,
                    cooldown_ms: 600.0,
                    projectile_speed: 700.0,
                    projectile_radius: 4.0,
                    lifetime_ms: 800.0,
                    pierce: 0,
                    bounces: 0,
                    on_hit: None,
                },
            }),
        },
        StructureId::CannonTower => StructureDef {
            id,
            radius: 24.0,
            max_health: 400.0,
            cost: Cost {
                items: &[(ItemId::Stone, 20), (ItemId::IronBar, 4)],
                gold: 25,
            },
            upgrade: None,
            tower: Some(TowerDef {
                range: 360.0,
                weapon: WeaponDef {
                    damage: 35.0,
                    cooldown_ms: 1500.0,
                    projectile_speed: 500.0,
                    projectile_radius: 8.0,
                    lifetime_ms: 1000.0,
                    pierce: 1,
                    bounces: 0,
                    on_hit: None,
                },
            }),
        },
        StructureId::FireTower => StructureDef {
            id,
            radius: 22.0,
            max_health: 250.0,
            cost: Cost {
                items: &[(ItemId::Stone, 15), (ItemId::IronBar, 2)],
                gold: 10,
            },
            upgrade: None,
            tower: Some(TowerDef {
                range: 260.0,
                weapon: WeaponDef {
                    damage: 6.0,
                    cooldown_ms: 800.0,
                    projectile_speed: 550.0,
                    projectile_radius: 5.0,
                    lifetime_ms: 700.0,
                    pierce: 0,
                    bounces: 0,
                    on_hit: Some(StatusId::Burn),
                },
            }),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusDef {
    pub duration_ms: f64,
    /// Interval of the periodic effect, if any.
    pub pulse_ms: f64,
    pub damage_per_pulse: f32,
    pub heal_per_pulse: f32,
    pub speed_multiplier: f32,
    /// Client-facing flag while active.
    pub flag: &'static str,
}

pub fn status_def(id: StatusId) -> StatusDef {
    match id {
        StatusId::Burn => StatusDef {
            duration_ms: 3000.0,
            pulse_ms: 500.0,
            damage_per_pulse: 4.0,
            heal_per_pulse: 0.0,
            speed_multiplier: 1.0,
            flag: "burning",
        },
        StatusId::Slow => StatusDef {
            duration_ms: 2000.0,
            pulse_ms: 0.0,
            damage_per_pulse: 0.0,
            heal_per_pulse: 0.0,
            speed_multiplier: 0.5,
            flag: "slowed",
        },
        StatusId::Regen => StatusDef {
            duration_ms: MEDKIT_REGEN_MS,
            pulse_ms: 500.0,
            damage_per_pulse: 0.0,
            heal_per_pulse: 5.0,
            speed_multiplier: 1.0,
            flag: "regenerating",
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipeDef {
    pub id: RecipeId,
    pub inputs: &'static [(ItemId, u32)],
    pub output: (ItemId, u32),
}

pub fn recipe_def(id: RecipeId) -> RecipeDef {
    match id {
        RecipeId::Planks => RecipeDef {
            id,
            inputs: &[(ItemId::Wood, 2)],
            output: (ItemId::Plank, 1),
        },
        RecipeId::Bricks => RecipeDef {
            id,
            inputs: &[(ItemId::Stone, 3)],
            output: (ItemId::Brick, 1),
        },
        RecipeId::IronBar => RecipeDef {
            id,
            inputs: &[(ItemId::IronOre, 3)],
            output: (ItemId::IronBar, 1),
        },
        RecipeId::Ammo => RecipeDef {
            id,
            inputs: &[(ItemId::Wood, 1), (ItemId::IronOre, 1)],
            output: (ItemId::Ammo, 10),
        },
        RecipeId::Medkit => RecipeDef {
            id,
            inputs: &[(ItemId::Plank, 2), (ItemId::IronBar, 1)],
            output: (ItemId::Medkit, 1),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Tree,
    Rock,
    IronVein,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceDef {
    pub kind: ResourceKind,
    pub item: ItemId,
    pub radius: f32,
    pub capacity: u32,
    pub yield_per_harvest: u32,
    pub respawn_ms: f64,
}

pub fn resource_def(kind: ResourceKind) -> ResourceDef {
    match kind {
        ResourceKind::Tree => ResourceDef {
            kind,
            item: ItemId::Wood,
            radius: 22.0,
            capacity: 30,
            yield_per_harvest: 5,
            respawn_ms: 20_000.0,
        },
        ResourceKind::Rock => ResourceDef {
            kind,
            item: ItemId::Stone,
            radius: 26.0,
            capacity: 25,
            yield_per_harvest: 4,
            respawn_ms: 30_000.0,
        },
        ResourceKind::IronVein => ResourceDef {
            kind,
            item: ItemId::IronOre,
            radius: 20.0,
            capacity: 15,
            yield_per_harvest: 3,
            respawn_ms: 45_000.0,
        },
    }
}

/// How many of each node the map starts with.
pub const RESOURCE_LAYOUT: &[(ResourceKind, u32)] = &[
    (ResourceKind::Tree, 24),
    (ResourceKind::Rock, 14),
    (ResourceKind::IronVein, 6),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnemyKind {
    Grunt,
    Archer,
    Brute,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeDef {
    /// Edge-to-edge reach.
    pub range: f32,
    pub damage: f32,
    pub cooldown_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangedDef {
    pub range: f32,
    pub weapon: WeaponDef,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyDef {
    pub kind: EnemyKind,
    pub radius: f32,
    pub max_health: f32,
    pub speed: f32,
    pub aggro_radius: f32,
    pub gold_drop: u32,
    pub melee: Option<MeleeDef>,
    pub ranged: Option<RangedDef>,
    /// Marches on the world centre when it has nothing to fight.
    pub siege: bool,
}

pub fn enemy_def(kind: EnemyKind) -> EnemyDef {
    match kind {
        EnemyKind::Grunt => EnemyDef {
            kind,
            radius: 14.0,
            max_health: 40.0,
            speed: 110.0,
            aggro_radius: 300.0,
            gold_drop: 2,
            melee: Some(MeleeDef {
                range: 8.0,
                damage: 8.0,
                cooldown_ms: 800.0,
            }),
            ranged: None,
            siege: false,
        },
        EnemyKind::Archer => EnemyDef {
            kind,
            radius: 13.0,
            max_health: 30.0,
            speed: 95.0,
            aggro_radius: 380.0,
            gold_drop: 3,
            melee: None,
            ranged: Some(RangedDef {
                range: 260.0,
                weapon: WeaponDef {
                    damage: 6.0,
                    cooldown_ms: 1400.0,
                    projectile_speed: 420.0,
                    projectile_radius: 4.0,
                    lifetime_ms: 1000.0,
                    pierce: 0,
                    bounces: 0,
                    on_hit: Some(StatusId::Slow),
                },
            }),
            siege: false,
        },
        EnemyKind::Brute => EnemyDef {
            kind,
            radius: 30.0,
            max_health: 600.0,
            speed: 70.0,
            aggro_radius: 320.0,
            gold_drop: 50,
            melee: Some(MeleeDef {
                range: 12.0,
                damage: 30.0,
                cooldown_ms: 1500.0,
            }),
            ranged: None,
            siege: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossDef {
    pub kind: EnemyKind,
    /// Elapsed wave time at which the boss appears.
    pub at_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveDef {
    pub grunts: u32,
    pub archers: u32,
    pub spawn_interval_ms: f64,
    pub boss: Option<BossDef>,
}

pub const WAVES: &[WaveDef] = &[
    WaveDef {
        grunts: 6,
        archers: 0,
        spawn_interval_ms: 1200.0,
        boss: None,
    },
    WaveDef {
        grunts: 8,
        archers: 3,
        spawn_interval_ms: 1000.0,
        boss: None,
    },
    WaveDef {
        grunts: 10,
        archers: 5,
        spawn_interval_ms: 800.0,
        boss: Some(BossDef {
            kind: EnemyKind::Brute,
            at_ms: 15_000.0,
        }),
    },
];
