#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Kinetic Grid simulation.

pub mod placement;
pub mod search;
mod wave;

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use kinetic_grid_core::{
    AgentId, CellCoord, Command, ConfigError, Event, GridDimensions, SimulationConfig, SpawnError,
    StepError, VisualPosition,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::wave::{FaultWave, WaveLimits};

/// Represents the authoritative Kinetic Grid world state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    grid: GridDimensions,
    agents: Vec<Agent>,
    occupancy: OccupancyGrid,
    wave: FaultWave,
    clock: Duration,
    /// Motion progress granted by the latest tick; steps committed in the
    /// same frame start from it.
    frame_motion: f32,
    next_agent_id: u32,
}

impl World {
    /// Creates a world populated according to the default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SimulationConfig::default())
    }

    /// Creates a world from a validated configuration.
    ///
    /// Agents receive distinct random start cells and random goals drawn from a
    /// `ChaCha8Rng` seeded with [`SimulationConfig::seed`], so equal
    /// configurations produce identical worlds.
    pub fn from_config(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulationConfig) -> Self {
        let grid = config.grid();
        let mut world = Self {
            grid,
            agents: Vec::new(),
            occupancy: OccupancyGrid::new(grid),
            wave: FaultWave::new(),
            clock: Duration::ZERO,
            frame_motion: 0.0,
            next_agent_id: 0,
            config,
        };
        world.generate_agents();
        world
    }

    fn generate_agents(&mut self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let count = self.config.agent_count;
        let attempts = self.config.free_cell_attempts;
        let mut occupied: HashSet<CellCoord> = HashSet::new();

        for index in 0..count {
            let start = placement::random_free_cell(&mut rng, self.grid, attempts, |cell| {
                occupied.contains(&cell)
            });
            let _ = occupied.insert(start);
            let goal = placement::random_free_cell(&mut rng, self.grid, attempts, |cell| {
                occupied.contains(&cell)
            });

            if !self.occupancy.can_enter(start) {
                tracing::warn!(?start, "agent placement fell back onto an occupied cell");
            }
            let _ = self.insert_agent(start, goal, count - index);
        }

        tracing::debug!(agents = self.agents.len(), "generated agents");
    }

    fn insert_agent(&mut self, cell: CellCoord, goal: CellCoord, priority: u32) -> AgentId {
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = self.next_agent_id.saturating_add(1);
        self.agents.push(Agent::new(id, cell, goal, priority));
        self.occupancy.occupy(id, cell);
        id
    }

    fn agent_mut(&mut self, agent_id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|agent| agent.id == agent_id)
    }

    fn active_agent_mut(&mut self, agent_id: AgentId) -> Option<&mut Agent> {
        self.agent_mut(agent_id).filter(|agent| !agent.faulted)
    }

    fn priority_ring(&self) -> u32 {
        u32::try_from(self.agents.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(3)
            .max(1)
    }

    fn wave_limits(&self) -> WaveLimits {
        WaveLimits {
            step: self.config.wave_step(),
            max_radius: self.config.wave_max_radius,
            clip: self.config.clip_wave_to_grid.then_some(self.grid),
        }
    }

    fn spread_contagion(&mut self, out_events: &mut Vec<Event>) {
        for agent in self.agents.iter_mut().filter(|agent| !agent.faulted) {
            if self.wave.is_processed(agent.cell) || self.wave.is_processed(agent.previous_cell) {
                agent.fault();
                tracing::debug!(
                    agent = agent.id.get(),
                    cell = ?agent.cell,
                    "agent caught by fault wave"
                );
                out_events.push(Event::AgentFaulted {
                    agent_id: agent.id,
                    cell: agent.cell,
                });
            }
        }
    }

    fn step_agent(&mut self, agent_id: AgentId, to: CellCoord) -> Result<CellCoord, StepError> {
        let grid = self.grid;
        let motion = self.frame_motion;
        let occupant = self.occupancy.occupant(to);
        let agent = self.agent_mut(agent_id).ok_or(StepError::UnknownAgent)?;

        if agent.faulted {
            return Err(StepError::Faulted);
        }
        if !grid.contains(to) {
            return Err(StepError::OutOfBounds);
        }
        if !agent.cell.is_adjacent_to(to) {
            return Err(StepError::NotAdjacent);
        }
        if occupant.is_some_and(|other| other != agent_id) {
            return Err(StepError::Occupied);
        }

        let from = agent.advance(to, motion);
        self.occupancy.vacate(from);
        self.occupancy.occupy(agent_id, to);
        Ok(from)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            let first_new_event = out_events.len();
            let limits = world.wave_limits();
            world.wave.advance(dt, world.clock, limits, out_events);
            if let Some(Event::WaveSettled { radius }) = out_events[first_new_event..].last() {
                tracing::info!(radius, "fault wave settled");
            }

            if world.wave.is_seeded() {
                world.spread_contagion(out_events);
            }

            let tick = world.config.tick_interval().as_secs_f32();
            world.frame_motion = if tick > 0.0 {
                (dt.as_secs_f32() / tick).min(1.0)
            } else {
                0.0
            };
            let delta = world.frame_motion;
            for agent in world.agents.iter_mut().filter(|agent| !agent.faulted) {
                agent.progress = (agent.progress + delta).min(1.0);
            }
        }
        Command::InjectFault { cell } => {
            if !world.wave.seed(cell, world.clock) {
                tracing::debug!(?cell, "fault already injected, ignoring trigger");
                out_events.push(Event::FaultInjectionIgnored { cell });
                return;
            }

            tracing::info!(?cell, clock = ?world.clock, "fault injected");
            out_events.push(Event::FaultInjected { cell });

            for agent in world
                .agents
                .iter_mut()
                .filter(|agent| !agent.faulted && agent.cell == cell)
            {
                agent.fault();
                out_events.push(Event::AgentFaulted {
                    agent_id: agent.id,
                    cell,
                });
            }
        }
        Command::SpawnAgent {
            cell,
            goal,
            priority,
        } => {
            if !world.grid.contains(cell) || !world.grid.contains(goal) {
                out_events.push(Event::AgentSpawnRejected {
                    cell,
                    reason: SpawnError::OutOfBounds,
                });
                return;
            }
            if !world.occupancy.can_enter(cell) {
                out_events.push(Event::AgentSpawnRejected {
                    cell,
                    reason: SpawnError::Occupied,
                });
                return;
            }

            let agent_id = world.insert_agent(cell, goal, priority);
            out_events.push(Event::AgentSpawned {
                agent_id,
                cell,
                goal,
            });
        }
        Command::AssignGoal { agent_id, goal } => {
            if let Some(agent) = world.active_agent_mut(agent_id) {
                agent.goal = goal;
                agent.path.clear();
                out_events.push(Event::GoalAssigned { agent_id, goal });
            }
        }
        Command::AssignPath { agent_id, path } => {
            if let Some(agent) = world.active_agent_mut(agent_id) {
                agent.path = path.into();
            }
        }
        Command::StepAgent { agent_id, to } => match world.step_agent(agent_id, to) {
            Ok(from) => out_events.push(Event::AgentAdvanced { agent_id, from, to }),
            Err(reason) => {
                tracing::warn!(agent = agent_id.get(), ?to, ?reason, "step rejected");
                out_events.push(Event::AgentStepRejected {
                    agent_id,
                    to,
                    reason,
                });
            }
        },
        Command::AbandonPath { agent_id } => {
            if let Some(agent) = world.active_agent_mut(agent_id) {
                agent.path.clear();
            }
        }
        Command::RotatePriority { agent_id } => {
            let ring = world.priority_ring();
            if let Some(agent) = world.active_agent_mut(agent_id) {
                agent.priority = (agent.priority + 1) % ring;
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use kinetic_grid_core::{
        AgentId, AgentSnapshot, AgentView, CellCoord, GridDimensions, SimulationConfig, WaveView,
    };

    /// Configuration the world was created from.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Dimensions of the agent grid.
    #[must_use]
    pub fn grid(world: &World) -> GridDimensions {
        world.grid
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Captures a read-only view of every agent on the grid.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                priority: agent.priority,
                cell: agent.cell,
                previous_cell: agent.previous_cell,
                progress: agent.progress,
                goal: agent.goal,
                path: agent.path.iter().copied().collect(),
                faulted: agent.faulted,
                frozen_position: agent.frozen_position,
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Exposes a read-only view of the fault wave.
    #[must_use]
    pub fn wave_view(world: &World) -> WaveView<'_> {
        world.wave.view()
    }

    /// Returns the agent standing on the provided cell, if any.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<AgentId> {
        world.occupancy.occupant(cell)
    }

    /// Number of agents caught by the fault wave.
    #[must_use]
    pub fn faulted_count(world: &World) -> usize {
        world.agents.iter().filter(|agent| agent.faulted).count()
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    priority: u32,
    cell: CellCoord,
    previous_cell: CellCoord,
    progress: f32,
    goal: CellCoord,
    path: VecDeque<CellCoord>,
    faulted: bool,
    frozen_position: Option<VisualPosition>,
}

impl Agent {
    fn new(id: AgentId, cell: CellCoord, goal: CellCoord, priority: u32) -> Self {
        Self {
            id,
            priority,
            cell,
            previous_cell: cell,
            progress: 1.0,
            goal,
            path: VecDeque::new(),
            faulted: false,
            frozen_position: None,
        }
    }

    /// Moves onto `to` starting at `progress`, returning the vacated cell.
    fn advance(&mut self, to: CellCoord, progress: f32) -> CellCoord {
        let from = self.cell;
        self.previous_cell = from;
        self.cell = to;
        self.progress = progress;
        if self.path.front() == Some(&to) {
            let _ = self.path.pop_front();
        } else {
            self.path.clear();
        }
        from
    }

    fn fault(&mut self) {
        self.faulted = true;
        self.path.clear();
        self.frozen_position = Some(VisualPosition::between(
            self.previous_cell,
            self.cell,
            self.progress,
        ));
    }
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    grid: GridDimensions,
    cells: Vec<Option<AgentId>>,
}

impl OccupancyGrid {
    fn new(grid: GridDimensions) -> Self {
        Self {
            grid,
            cells: vec![None; grid.cell_count()],
        }
    }

    fn occupant(&self, cell: CellCoord) -> Option<AgentId> {
        self.grid
            .index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    fn can_enter(&self, cell: CellCoord) -> bool {
        self.occupant(cell).is_none()
    }

    fn occupy(&mut self, agent_id: AgentId, cell: CellCoord) {
        if let Some(slot) = self.grid.index(cell).and_then(|index| self.cells.get_mut(index)) {
            *slot = Some(agent_id);
        }
    }

    fn vacate(&mut self, cell: CellCoord) {
        if let Some(slot) = self.grid.index(cell).and_then(|index| self.cells.get_mut(index)) {
            *slot = None;
        }
    }
}
