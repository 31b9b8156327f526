use mazecrawl_core::{CellCoord, EnemyId, EnemySnapshot, Heading, PlayerPresence, SessionId};
use rand::{seq::SliceRandom, Rng};
use rand_chacha::ChaCha8Rng;

/// Random source handed to behaviours.
pub type DecisionRng = ChaCha8Rng;

/// What an enemy wants to do on the current tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Step one tile along the heading.
    Move(Heading),
    /// Strike the player owned by the session.
    Attack(SessionId),
    /// Stay in place until the timer elapses again.
    Idle,
}

/// Failure inside a behaviour; the enemy idles for the tick instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The enemy reported a cell outside the grid.
    #[error("enemy {0:?} stands outside the grid")]
    OutsideGrid(EnemyId),
    /// The chosen step could not be expressed as a heading.
    #[error("no heading leads from {from:?} toward {toward:?}")]
    NoHeading {
        /// Cell the enemy occupies.
        from: CellCoord,
        /// Cell the enemy tried to approach.
        toward: CellCoord,
    },
}

/// Per-instance state kept between decisions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnemyMemory {
    /// World clock at which an idle roam may start again.
    pub roam_ready_at: f64,
}

/// Read-only surroundings offered to a behaviour.
pub struct DecisionView<'a> {
    columns: u32,
    rows: u32,
    clock: f64,
    players: &'a [PlayerPresence],
    passable: &'a dyn Fn(CellCoord) -> bool,
}

impl<'a> DecisionView<'a> {
    /// Creates a view over a grid of the given dimensions.
    #[must_use]
    pub fn new(
        columns: u32,
        rows: u32,
        clock: f64,
        players: &'a [PlayerPresence],
        passable: &'a dyn Fn(CellCoord) -> bool,
    ) -> Self {
        Self {
            columns,
            rows,
            clock,
            players,
            passable,
        }
    }

    /// Simulated seconds since generation.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Whether the cell lies on the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Cell one step along the heading, if it stays on the grid.
    #[must_use]
    pub fn neighbour(&self, cell: CellCoord, heading: Heading) -> Option<CellCoord> {
        let (dx, dy) = heading.delta();
        cell.offset(dx, dy, self.columns, self.rows)
    }

    /// Whether a step along the heading would currently succeed.
    #[must_use]
    pub fn can_step(&self, cell: CellCoord, heading: Heading) -> bool {
        self.neighbour(cell, heading)
            .is_some_and(|next| (self.passable)(next))
    }

    /// Closest connected player by Euclidean distance, ties going to the
    /// first player listed.
    #[must_use]
    pub fn nearest_player(&self, cell: CellCoord) -> Option<(&'a PlayerPresence, f64)> {
        let players: &'a [PlayerPresence] = self.players;
        let mut best: Option<(&'a PlayerPresence, u64)> = None;
        for player in players {
            let distance = player.cell.distance_squared(cell);
            if best.map_or(true, |(_, current)| distance < current) {
                best = Some((player, distance));
            }
        }
        best.map(|(player, squared)| (player, (squared as f64).sqrt()))
    }
}

/// Decision capability attached to enemy types.
pub trait EnemyBehavior: std::fmt::Debug {
    /// Chooses the intent of a ready enemy.
    fn decide(
        &self,
        enemy: &EnemySnapshot,
        view: &DecisionView<'_>,
        memory: &mut EnemyMemory,
        rng: &mut DecisionRng,
    ) -> Result<Intent, DecisionError>;
}

/// Keeps walking the current heading, turning to a random open heading
/// when blocked and idling when boxed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wander;

impl EnemyBehavior for Wander {
    fn decide(
        &self,
        enemy: &EnemySnapshot,
        view: &DecisionView<'_>,
        _memory: &mut EnemyMemory,
        rng: &mut DecisionRng,
    ) -> Result<Intent, DecisionError> {
        if !view.contains(enemy.cell) {
            return Err(DecisionError::OutsideGrid(enemy.id));
        }
        if view.can_step(enemy.cell, enemy.heading) {
            return Ok(Intent::Move(enemy.heading));
        }
        let open: Vec<Heading> = Heading::ALL
            .into_iter()
            .filter(|heading| view.can_step(enemy.cell, *heading))
            .collect();
        Ok(open.choose(rng).map_or(Intent::Idle, |heading| Intent::Move(*heading)))
    }
}

/// Hunts the nearest player inside the aggro radius and roams on a
/// randomised cooldown otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pursuit {
    /// Distance at which the enemy strikes instead of moving.
    pub melee_range: f64,
    /// Distance within which the enemy closes in.
    pub aggro_radius: f64,
    /// Bounds of the pause between idle roams, in seconds.
    pub roam_cooldown: (f64, f64),
}

impl Pursuit {
    /// Small, twitchy hunters.
    pub const SLIME: Pursuit = Pursuit {
        melee_range: 1.0,
        aggro_radius: 8.0,
        roam_cooldown: (0.5, 2.0),
    };

    /// Bosses notice players from further away and roam more lazily.
    pub const BOSS: Pursuit = Pursuit {
        melee_range: 1.0,
        aggro_radius: 12.0,
        roam_cooldown: (0.8, 2.2),
    };

    fn approach(&self, from: CellCoord, toward: CellCoord) -> Result<Heading, DecisionError> {
        let gap_x = i64::from(toward.column()) - i64::from(from.column());
        let gap_y = i64::from(toward.row()) - i64::from(from.row());
        // Close the larger gap first so pursuers do not drift diagonally.
        let delta = if gap_x.abs() >= gap_y.abs() {
            (signum(gap_x), 0)
        } else {
            (0, signum(gap_y))
        };
        Heading::from_delta(delta.0, delta.1).ok_or(DecisionError::NoHeading { from, toward })
    }

    fn roam(&self, view: &DecisionView<'_>, memory: &mut EnemyMemory, rng: &mut DecisionRng) -> Intent {
        if view.clock() < memory.roam_ready_at {
            return Intent::Idle;
        }
        let (low, high) = self.roam_cooldown;
        let pause = if high > low { rng.gen_range(low..high) } else { low };
        memory.roam_ready_at = view.clock() + pause;
        let choices = [
            Some(Heading::East),
            Some(Heading::West),
            Some(Heading::South),
            Some(Heading::North),
            None,
        ];
        match choices.choose(rng).copied().flatten() {
            Some(heading) => Intent::Move(heading),
            None => Intent::Idle,
        }
    }
}

impl EnemyBehavior for Pursuit {
    fn decide(
        &self,
        enemy: &EnemySnapshot,
        view: &DecisionView<'_>,
        memory: &mut EnemyMemory,
        rng: &mut DecisionRng,
    ) -> Result<Intent, DecisionError> {
        if !view.contains(enemy.cell) {
            return Err(DecisionError::OutsideGrid(enemy.id));
        }
        if let Some((target, distance)) = view.nearest_player(enemy.cell) {
            if distance <= self.melee_range {
                return Ok(Intent::Attack(target.session.clone()));
            }
            if distance <= self.aggro_radius {
                return self.approach(enemy.cell, target.cell).map(Intent::Move);
            }
        }
        Ok(self.roam(view, memory, rng))
    }
}

fn signum(value: i64) -> i32 {
    match value {
        v if v > 0 => 1,
        v if v < 0 => -1,
        _ => 0,
    }
}
