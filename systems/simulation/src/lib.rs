#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-rate tick loop that owns the world and drives every system.
//!
//! Sessions talk to the loop through buffered requests. Each session keeps at
//! most one pending input; a newer input replaces an unconsumed older one.
//! Everything else runs in a fixed order inside [`Simulation::tick`]:
//!
//! 1. session joins and departures, in arrival order
//! 2. the clock advances
//! 3. enemies decide and act
//! 4. buffered player inputs and equipment requests
//! 5. rotation interpolation and fog reveal
//! 6. frames for every player whose throttle allows one

use std::{collections::BTreeMap, time::Duration};

use anyhow::Result as AnyResult;
use mazecrawl_core::{Command, Event, PlayerInput, PlayerSnapshot, SessionId, Slot};
use mazecrawl_rendering::{Frame, Projector, ProjectorSettings, Viewer};
use mazecrawl_system_enemy_ai::{Config as EnemyAiConfig, EnemyAi};
use mazecrawl_world::{self as world, query, World};
use tracing::debug;

mod scene;

pub use scene::WorldScene;

/// Salt separating the decision stream from the generation stream.
const DECISION_STREAM: u64 = 0x6d61_7a65_6372_6177;

#[derive(Clone, Debug)]
enum Lifecycle {
    Join {
        session: SessionId,
        restore: Option<PlayerSnapshot>,
    },
    Leave {
        session: SessionId,
    },
}

/// Frame produced for one session during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDelivery {
    /// Session the frame belongs to.
    pub session: SessionId,
    /// Projected view.
    pub frame: Frame,
}

/// Everything a tick produced for the session layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Tick index after the tick ran.
    pub tick: u64,
    /// World events in emission order.
    pub events: Vec<Event>,
    /// Frames to deliver, in session order.
    pub frames: Vec<FrameDelivery>,
}

impl TickReport {
    /// Snapshots of sessions that left during the tick.
    pub fn departures(&self) -> impl Iterator<Item = (&SessionId, &PlayerSnapshot)> {
        self.events.iter().filter_map(|event| match event {
            Event::PlayerLeft { session, snapshot } => Some((session, snapshot)),
            _ => None,
        })
    }

    /// Events addressed to a single session.
    pub fn events_for<'a>(&'a self, session: &'a SessionId) -> impl Iterator<Item = &'a Event> {
        self.events
            .iter()
            .filter(move |event| event_session(event) == Some(session))
    }
}

/// Session owning a player-facing event.
#[must_use]
pub fn event_session(event: &Event) -> Option<&SessionId> {
    match event {
        Event::PlayerJoined { session, .. }
        | Event::PlayerLeft { session, .. }
        | Event::PlayerMoved { session, .. }
        | Event::PlayerTurned { session, .. }
        | Event::MoveRejected { session, .. }
        | Event::ToolBroken { session, .. }
        | Event::EquipmentChanged { session, .. }
        | Event::LoreRevealed { session, .. }
        | Event::ItemPickedUp { session, .. }
        | Event::ItemStowed { session, .. }
        | Event::ItemDropped { session, .. }
        | Event::ContainerLooted { session, .. }
        | Event::InteractionRejected { session, .. } => Some(session),
        Event::EnemyAttackIntended { target, .. } => Some(target),
        Event::TimeAdvanced { .. }
        | Event::EnemyMoved { .. }
        | Event::WallDamaged { .. }
        | Event::HitSpark { .. }
        | Event::WallBroken { .. } => None,
    }
}

/// Authoritative simulation loop.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    enemy_ai: EnemyAi,
    projector: Projector,
    tick_duration: Duration,
    lifecycle: Vec<Lifecycle>,
    pending_inputs: BTreeMap<SessionId, PlayerInput>,
    pending_requests: Vec<Command>,
}

impl Simulation {
    /// Wraps a generated world. Fails when the render settings are invalid.
    pub fn new(world: World) -> AnyResult<Self> {
        let config = query::config(&world);
        let projector = Projector::new(ProjectorSettings::from_config(&config.render)?);
        let tick_duration = config.tick.tick_duration();
        let enemy_ai = EnemyAi::new(EnemyAiConfig::new(query::seed(&world) ^ DECISION_STREAM));
        Ok(Self {
            world,
            enemy_ai,
            projector,
            tick_duration,
            lifecycle: Vec::new(),
            pending_inputs: BTreeMap::new(),
            pending_requests: Vec::new(),
        })
    }

    /// Replaces the enemy decision system, e.g. with a custom behaviour registry.
    #[must_use]
    pub fn with_enemy_ai(mut self, enemy_ai: EnemyAi) -> Self {
        self.enemy_ai = enemy_ai;
        self
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Simulated duration of one tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Current floor-line bias of item billboards.
    #[must_use]
    pub fn floor_bias(&self) -> f32 {
        self.projector.floor_bias()
    }

    /// Adjusts the floor-line bias of item billboards while running.
    pub fn set_floor_bias(&mut self, bias: f32) {
        self.projector.set_floor_bias(bias);
        debug!(bias = self.projector.floor_bias(), "floor bias adjusted");
    }

    /// Queues a session arrival, optionally restoring persisted state.
    pub fn session_joined(&mut self, session: SessionId, restore: Option<PlayerSnapshot>) {
        self.lifecycle.push(Lifecycle::Join { session, restore });
    }

    /// Queues a session departure. Its buffered input is discarded.
    pub fn session_left(&mut self, session: SessionId) {
        let _ = self.pending_inputs.remove(&session);
        self.pending_requests
            .retain(|command| request_session(command) != Some(&session));
        self.lifecycle.push(Lifecycle::Leave { session });
    }

    /// Buffers the session's input for the next tick.
    ///
    /// Returns the unconsumed input this one replaced, if any.
    pub fn submit(&mut self, session: SessionId, input: PlayerInput) -> Option<PlayerInput> {
        let replaced = self.pending_inputs.insert(session, input);
        if let Some(previous) = replaced {
            debug!(?previous, ?input, "pending input overwritten");
        }
        replaced
    }

    /// Queues moving an inventory item into an equipment slot.
    pub fn request_equip(&mut self, session: SessionId, slot: Slot, item: impl Into<String>) {
        self.pending_requests.push(Command::Equip {
            session,
            slot,
            item: item.into(),
        });
    }

    /// Queues moving an equipped item back into the backpack.
    pub fn request_unequip(&mut self, session: SessionId, slot: Slot) {
        self.pending_requests.push(Command::Unequip { session, slot });
    }

    /// Queues dropping an inventory item next to the player.
    pub fn request_drop(&mut self, session: SessionId, item: impl Into<String>) {
        self.pending_requests.push(Command::DropItem {
            session,
            item: item.into(),
        });
    }

    /// Runs one tick with the configured tick duration.
    pub fn tick(&mut self) -> TickReport {
        self.tick_with(self.tick_duration)
    }

    /// Runs one tick advancing the clock by `dt`.
    pub fn tick_with(&mut self, dt: Duration) -> TickReport {
        let mut events = Vec::new();

        for change in std::mem::take(&mut self.lifecycle) {
            let command = match change {
                Lifecycle::Join { session, restore } => Command::JoinSession { session, restore },
                Lifecycle::Leave { session } => Command::LeaveSession { session },
            };
            world::apply(&mut self.world, command, &mut events);
        }

        let time_start = events.len();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);
        let time_events = events[time_start..].to_vec();
        self.run_enemies(&time_events, &mut events);

        for (session, input) in std::mem::take(&mut self.pending_inputs) {
            world::apply(
                &mut self.world,
                Command::ApplyInput { session, input },
                &mut events,
            );
        }
        for command in std::mem::take(&mut self.pending_requests) {
            world::apply(&mut self.world, command, &mut events);
        }

        world::apply(&mut self.world, Command::RefreshPlayers { dt }, &mut events);

        let frames = self.emit_frames();
        TickReport {
            tick: query::tick_index(&self.world),
            events,
            frames,
        }
    }

    fn run_enemies(&mut self, time_events: &[Event], events: &mut Vec<Event>) {
        let enemy_view = query::enemy_view(&self.world);
        let presence = query::player_presence(&self.world);
        let grid = query::grid(&self.world);
        let dimensions = (grid.columns(), grid.rows());
        let mut commands = Vec::new();
        let state = &self.world;
        self.enemy_ai.handle(
            time_events,
            &enemy_view,
            &presence,
            dimensions,
            |cell| query::is_cell_blocked(state, cell),
            &mut commands,
        );
        for command in commands {
            world::apply(&mut self.world, command, events);
        }
    }

    fn emit_frames(&mut self) -> Vec<FrameDelivery> {
        let due: Vec<SessionId> = query::players(&self.world)
            .iter()
            .map(|player| player.session().clone())
            .filter(|session| query::frame_due(&self.world, session))
            .collect();
        if due.is_empty() {
            return Vec::new();
        }

        let elapsed_ms = (query::clock(&self.world) * 1000.0) as u64;
        let frames: Vec<FrameDelivery> = {
            let scene = WorldScene::new(&self.world);
            due.iter()
                .filter_map(|session| {
                    let player = query::player(&self.world, session)?;
                    let viewer = Viewer::new(player.position(), player.angle());
                    Some(FrameDelivery {
                        session: session.clone(),
                        frame: self.projector.project(&scene, viewer, elapsed_ms),
                    })
                })
                .collect()
        };

        let mut ignored = Vec::new();
        for delivery in &frames {
            world::apply(
                &mut self.world,
                Command::RecordFrameEmitted {
                    session: delivery.session.clone(),
                },
                &mut ignored,
            );
        }
        frames
    }
}

fn request_session(command: &Command) -> Option<&SessionId> {
    match command {
        Command::Equip { session, .. }
        | Command::Unequip { session, .. }
        | Command::DropItem { session, .. } => Some(session),
        _ => None,
    }
}
