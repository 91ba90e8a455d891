#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Kinetic Grid simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

pub mod config;

use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, SimulationConfig};

/// Label shown by hosts describing the multi-agent stepping rule.
pub const ALGORITHM_LABEL: &str = "PIBT";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Requests that the one-shot fault wave be seeded at the provided cell.
    ///
    /// Only the first request has any effect; later requests are reported as
    /// [`Event::FaultInjectionIgnored`].
    InjectFault {
        /// Cell the pointer event resolved to.
        cell: CellCoord,
    },
    /// Requests that a new agent be placed on the grid.
    ///
    /// Worlds populate themselves from their configuration; this command sets
    /// up hand-placed agents for controlled scenarios.
    SpawnAgent {
        /// Cell the agent starts on.
        cell: CellCoord,
        /// Cell the agent initially travels toward.
        goal: CellCoord,
        /// Initial stepping priority of the agent.
        priority: u32,
    },
    /// Replaces an agent's goal and discards its remaining path.
    AssignGoal {
        /// Identifier of the agent receiving the goal.
        agent_id: AgentId,
        /// Cell the agent should travel toward.
        goal: CellCoord,
    },
    /// Stores a freshly planned path for an agent.
    AssignPath {
        /// Identifier of the agent receiving the path.
        agent_id: AgentId,
        /// Cells to traverse, excluding the agent's current cell.
        path: Vec<CellCoord>,
    },
    /// Requests that an agent advance a single cell.
    StepAgent {
        /// Identifier of the agent attempting to move.
        agent_id: AgentId,
        /// Cell the agent moves into.
        to: CellCoord,
    },
    /// Discards an agent's remaining path so it is recomputed next tick.
    AbandonPath {
        /// Identifier of the agent whose path is discarded.
        agent_id: AgentId,
    },
    /// Advances an agent's priority by one, wrapping around the priority ring.
    RotatePriority {
        /// Identifier of the agent whose priority rotates.
        agent_id: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the frame.
        dt: Duration,
    },
    /// Confirms that an agent was placed on the grid.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent_id: AgentId,
        /// Cell the agent occupies.
        cell: CellCoord,
        /// Goal the agent starts out with.
        goal: CellCoord,
    },
    /// Reports that an agent placement request was rejected.
    AgentSpawnRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: SpawnError,
    },
    /// Confirms that an agent received a new goal.
    GoalAssigned {
        /// Identifier of the agent.
        agent_id: AgentId,
        /// Newly assigned goal cell.
        goal: CellCoord,
    },
    /// Confirms that an agent moved between two adjacent cells.
    AgentAdvanced {
        /// Identifier of the agent that moved.
        agent_id: AgentId,
        /// Cell the agent occupied before moving.
        from: CellCoord,
        /// Cell the agent occupies after moving.
        to: CellCoord,
    },
    /// Reports that a step request was rejected by the world.
    AgentStepRejected {
        /// Identifier of the agent that attempted to move.
        agent_id: AgentId,
        /// Cell the agent attempted to enter.
        to: CellCoord,
        /// Specific reason the step failed.
        reason: StepError,
    },
    /// Confirms that the fault wave was seeded.
    FaultInjected {
        /// Seed cell of the wave.
        cell: CellCoord,
    },
    /// Reports that a fault trigger arrived after the wave was already seeded.
    FaultInjectionIgnored {
        /// Cell the ignored trigger named.
        cell: CellCoord,
    },
    /// Announces that an agent became permanently faulted.
    AgentFaulted {
        /// Identifier of the faulted agent.
        agent_id: AgentId,
        /// Cell the agent is anchored to.
        cell: CellCoord,
    },
    /// Announces that the wave expanded by one ring.
    WaveAdvanced {
        /// Radius reached by the wave.
        radius: u32,
        /// Cells flooded by this ring, in discovery order.
        cells: Vec<CellCoord>,
    },
    /// Announces that the wave exceeded its maximum radius and stopped.
    WaveSettled {
        /// Radius counter at the moment the wave stopped.
        radius: u32,
    },
}

/// Reasons an agent placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The requested cell or goal lies outside the grid.
    OutOfBounds,
    /// Another agent already occupies the requested cell.
    Occupied,
}

/// Reasons a step request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepError {
    /// No agent with the provided identifier exists.
    UnknownAgent,
    /// The agent is faulted and permanently anchored.
    Faulted,
    /// The destination is not a 4-neighbour of the agent's cell.
    NotAdjacent,
    /// The destination lies outside the grid.
    OutOfBounds,
    /// Another agent occupies the destination.
    Occupied,
}

/// Cardinal directions on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Order in which neighbours are expanded by searches and floods.
    pub const EXPANSION_ORDER: [Direction; 4] = [
        Direction::South,
        Direction::East,
        Direction::North,
        Direction::West,
    ];

    /// Column and row offset of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed: the fault wave and pointer events are free to
/// address cells beyond the agent grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Cell reached by a single step in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dc, dr) = direction.offset();
        Self {
            column: self.column.saturating_add(dc),
            row: self.row.saturating_add(dr),
        }
    }

    /// The four orthogonal neighbours in [`Direction::EXPANSION_ORDER`].
    #[must_use]
    pub fn neighbors(self) -> [CellCoord; 4] {
        Direction::EXPANSION_ORDER.map(|direction| self.step(direction))
    }

    /// Returns `true` when the two cells share an edge.
    #[must_use]
    pub fn is_adjacent_to(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Dimensions of the rectangular agent grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    columns: u32,
    rows: u32,
}

impl GridDimensions {
    /// Creates a new grid description.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        u32::try_from(cell.column()).map_or(false, |column| column < self.columns)
            && u32::try_from(cell.row()).map_or(false, |row| row < self.rows)
    }

    /// Row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Eases `t` in and out with the cubic smoothstep curve, clamping to `[0, 1]`.
#[must_use]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fractional cell-space position used to draw an agent between cells.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualPosition {
    /// Column expressed in fractional cells.
    pub column: f32,
    /// Row expressed in fractional cells.
    pub row: f32,
}

impl VisualPosition {
    /// Creates a visual position from fractional cell coordinates.
    #[must_use]
    pub const fn new(column: f32, row: f32) -> Self {
        Self { column, row }
    }

    /// Position resting exactly on a cell.
    #[must_use]
    pub fn at_cell(cell: CellCoord) -> Self {
        Self::new(cell.column() as f32, cell.row() as f32)
    }

    /// Eased position between two cells for the provided motion progress.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord, progress: f32) -> Self {
        let ease = smoothstep(progress);
        let from = Self::at_cell(from);
        let to = Self::at_cell(to);
        Self::new(
            from.column + (to.column - from.column) * ease,
            from.row + (to.row - from.row) * ease,
        )
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Current stepping priority; higher values act first.
    pub priority: u32,
    /// Grid cell currently occupied by the agent.
    pub cell: CellCoord,
    /// Cell the agent occupied before its latest move.
    pub previous_cell: CellCoord,
    /// Motion progress from `previous_cell` to `cell` in `[0, 1]`.
    pub progress: f32,
    /// Cell the agent is travelling toward.
    pub goal: CellCoord,
    /// Remaining cells to traverse, excluding `cell`.
    pub path: Vec<CellCoord>,
    /// Whether the agent has been caught by the fault wave.
    pub faulted: bool,
    /// Position captured at the moment the agent faulted.
    pub frozen_position: Option<VisualPosition>,
}

impl AgentSnapshot {
    /// Reports whether the agent stands on its goal.
    #[must_use]
    pub fn at_goal(&self) -> bool {
        self.cell == self.goal
    }

    /// Position the agent should be drawn at this frame.
    #[must_use]
    pub fn visual_position(&self) -> VisualPosition {
        self.frozen_position.unwrap_or_else(|| {
            VisualPosition::between(self.previous_cell, self.cell, self.progress)
        })
    }
}

/// Read-only snapshot describing all agents on the grid.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the agent with the provided identifier.
    #[must_use]
    pub fn get(&self, agent_id: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent_id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Transient visual ring spawned when the wave floods a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveRing {
    /// Cell the ring is drawn on.
    pub cell: CellCoord,
    /// Simulation clock reading when the ring was spawned.
    pub born_at: Duration,
}

/// Lifecycle stage of the fault wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveStatus {
    /// No fault has been injected yet.
    Dormant,
    /// The wave is expanding one ring per interval.
    Spreading {
        /// Radius reached so far.
        radius: u32,
    },
    /// The wave exceeded its maximum radius and no longer expands.
    Settled {
        /// Radius counter when the wave stopped.
        radius: u32,
    },
}

/// Read-only view into the fault wave.
#[derive(Clone, Copy, Debug)]
pub struct WaveView<'a> {
    status: WaveStatus,
    seed: Option<CellCoord>,
    processed: &'a HashSet<CellCoord>,
    frontier: &'a [CellCoord],
    rings: &'a [WaveRing],
}

impl<'a> WaveView<'a> {
    /// Captures a new wave view backed by the provided storage.
    #[must_use]
    pub fn new(
        status: WaveStatus,
        seed: Option<CellCoord>,
        processed: &'a HashSet<CellCoord>,
        frontier: &'a [CellCoord],
        rings: &'a [WaveRing],
    ) -> Self {
        Self {
            status,
            seed,
            processed,
            frontier,
            rings,
        }
    }

    /// Lifecycle stage of the wave.
    #[must_use]
    pub const fn status(&self) -> WaveStatus {
        self.status
    }

    /// Cell the wave was seeded from, if it has been triggered.
    #[must_use]
    pub const fn seed(&self) -> Option<CellCoord> {
        self.seed
    }

    /// Reports whether the wave has flooded the provided cell.
    #[must_use]
    pub fn is_processed(&self, cell: CellCoord) -> bool {
        self.processed.contains(&cell)
    }

    /// Every cell the wave has ever flooded.
    #[must_use]
    pub fn processed(&self) -> &'a HashSet<CellCoord> {
        self.processed
    }

    /// Cells at the current radius.
    #[must_use]
    pub fn frontier(&self) -> &'a [CellCoord] {
        self.frontier
    }

    /// Every ring spawned so far, oldest first.
    #[must_use]
    pub fn rings(&self) -> &'a [WaveRing] {
        self.rings
    }
}
