#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy decision system that turns ready enemies into step and attack
//! commands.
//!
//! Behaviours are looked up once per enemy type in a [`BehaviorRegistry`]
//! built at startup. A behaviour that fails to decide never halts the tick:
//! the enemy simply idles until its movement timer elapses again.

use std::collections::{BTreeMap, BTreeSet};

use mazecrawl_core::{CellCoord, Command, EnemyId, EnemyView, Event, PlayerPresence};
use rand::SeedableRng;
use tracing::debug;

mod behavior;

pub use behavior::{
    DecisionError, DecisionRng, DecisionView, EnemyBehavior, EnemyMemory, Intent, Pursuit, Wander,
};

/// Behaviours keyed by AI descriptor or enemy type id.
#[derive(Debug)]
pub struct BehaviorRegistry {
    fallback: Box<dyn EnemyBehavior>,
    named: BTreeMap<String, Box<dyn EnemyBehavior>>,
}

impl BehaviorRegistry {
    /// Registry with only a fallback behaviour.
    #[must_use]
    pub fn with_fallback(fallback: Box<dyn EnemyBehavior>) -> Self {
        Self {
            fallback,
            named: BTreeMap::new(),
        }
    }

    /// Registry knowing the built-in descriptors: `wander`, `pursuit`,
    /// `slime` and `boss`. Unknown descriptors wander.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::with_fallback(Box::new(Wander));
        registry.register("wander", Box::new(Wander));
        registry.register("pursuit", Box::new(Pursuit::SLIME));
        registry.register("slime", Box::new(Pursuit::SLIME));
        registry.register("boss", Box::new(Pursuit::BOSS));
        registry
    }

    /// Adds or replaces a named behaviour.
    pub fn register(&mut self, name: impl Into<String>, behavior: Box<dyn EnemyBehavior>) {
        let _ = self.named.insert(name.into(), behavior);
    }

    /// Behaviour for an enemy: its AI descriptor first, then its type id.
    #[must_use]
    pub fn resolve(&self, ai: Option<&str>, type_id: &str) -> &dyn EnemyBehavior {
        ai.and_then(|name| self.named.get(name))
            .or_else(|| self.named.get(type_id))
            .map_or(self.fallback.as_ref(), Box::as_ref)
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Configuration parameters required to construct the enemy system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration seeding the decision random source.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that reacts to time advancing by deciding for every ready enemy.
#[derive(Debug)]
pub struct EnemyAi {
    registry: BehaviorRegistry,
    memory: BTreeMap<EnemyId, EnemyMemory>,
    rng: DecisionRng,
    clock: f64,
}

impl EnemyAi {
    /// Creates the system with the standard behaviours.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, BehaviorRegistry::standard())
    }

    /// Creates the system with a custom behaviour registry.
    #[must_use]
    pub fn with_registry(config: Config, registry: BehaviorRegistry) -> Self {
        Self {
            registry,
            memory: BTreeMap::new(),
            rng: DecisionRng::seed_from_u64(config.rng_seed),
            clock: 0.0,
        }
    }

    /// Consumes world events and immutable views to emit enemy commands.
    ///
    /// Every ready enemy receives exactly one `StepEnemy` command, which
    /// reschedules its timer; attacks additionally emit `EnemyAttack`.
    /// Destinations claimed earlier in the same pass count as blocked.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        enemies: &EnemyView,
        players: &[PlayerPresence],
        dimensions: (u32, u32),
        is_cell_blocked: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(CellCoord) -> bool,
    {
        let mut advanced = false;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.clock += dt.as_secs_f64();
                advanced = true;
            }
        }
        if !advanced {
            return;
        }

        let (columns, rows) = dimensions;
        let mut claimed: BTreeSet<CellCoord> = BTreeSet::new();
        for enemy in enemies.iter().filter(|enemy| enemy.ready) {
            let passable = |cell: CellCoord| !claimed.contains(&cell) && !is_cell_blocked(cell);
            let view = DecisionView::new(columns, rows, self.clock, players, &passable);
            let behavior = self.registry.resolve(enemy.ai.as_deref(), &enemy.type_id);
            let memory = self.memory.entry(enemy.id).or_default();
            let intent = match behavior.decide(enemy, &view, memory, &mut self.rng) {
                Ok(intent) => intent,
                Err(error) => {
                    debug!(enemy = enemy.id.get(), %error, "enemy decision failed, idling");
                    Intent::Idle
                }
            };

            match intent {
                Intent::Move(heading) => {
                    if let Some(next) = view.neighbour(enemy.cell, heading) {
                        let _ = claimed.insert(next);
                    }
                    out.push(Command::StepEnemy {
                        enemy: enemy.id,
                        heading: Some(heading),
                    });
                }
                Intent::Attack(target) => {
                    out.push(Command::EnemyAttack {
                        enemy: enemy.id,
                        target,
                    });
                    out.push(Command::StepEnemy {
                        enemy: enemy.id,
                        heading: None,
                    });
                }
                Intent::Idle => out.push(Command::StepEnemy {
                    enemy: enemy.id,
                    heading: None,
                }),
            }
        }

        let live: BTreeSet<EnemyId> = enemies.iter().map(|enemy| enemy.id).collect();
        self.memory.retain(|id, _| live.contains(id));
    }
}
