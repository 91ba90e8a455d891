#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Priority-ordered multi-agent stepping system.
//!
//! Every tick interval the system snapshots all agents, lets each non-faulted
//! agent plan and claim its next cell in descending priority order, and emits
//! the resulting commands. Cells claimed earlier in the tick, together with
//! the cells of faulted agents, are off limits to agents acting later, so no
//! two agents ever end a tick on the same cell.

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use kinetic_grid_core::{
    AgentId, AgentSnapshot, AgentView, CellCoord, Command, Event, GridDimensions,
};
use kinetic_grid_world::{placement, search};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the stepping system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    tick_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided step cadence and seed.
    #[must_use]
    pub const fn new(tick_interval: Duration, rng_seed: u64) -> Self {
        Self {
            tick_interval,
            rng_seed,
        }
    }
}

/// Pure system that emits goal, path, and step commands once per tick interval.
#[derive(Debug)]
pub struct Stepping {
    tick_interval: Duration,
    accumulator: Duration,
    rng: ChaCha8Rng,
}

impl Stepping {
    /// Creates a new stepping system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tick_interval: config.tick_interval,
            accumulator: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes world events and the agent snapshot to emit stepping commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        agent_view: &AgentView,
        grid: GridDimensions,
        out: &mut Vec<Command>,
    ) {
        if self.tick_interval.is_zero() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        if self.accumulator < self.tick_interval {
            return;
        }
        self.accumulator = Duration::ZERO;

        self.plan(agent_view, grid, out);
    }

    fn plan(&mut self, agent_view: &AgentView, grid: GridDimensions, out: &mut Vec<Command>) {
        let mut agents: Vec<WorkingAgent> = agent_view.iter().map(WorkingAgent::from).collect();
        let mut reserved: HashSet<CellCoord> = agents
            .iter()
            .filter(|agent| agent.faulted)
            .map(|agent| agent.cell)
            .collect();

        let mut order: Vec<usize> = (0..agents.len())
            .filter(|&index| !agents[index].faulted)
            .collect();
        order.sort_by(|&left, &right| agents[right].priority.cmp(&agents[left].priority));

        let mut moves = 0usize;
        for index in order {
            let agent_id = agents[index].id;

            if agents[index].at_goal {
                let goal = placement::random_cell(&mut self.rng, grid);
                agents[index].goal = goal;
                agents[index].path.clear();
                out.push(Command::AssignGoal { agent_id, goal });
            }

            if agents[index].path.is_empty() {
                let start = agents[index].cell;
                let goal = agents[index].goal;
                let planned = search::find_path(grid, start, goal, |cell| {
                    cell != start
                        && (reserved.contains(&cell) || occupied_by_other(&agents, agent_id, cell))
                });
                match planned {
                    Some(path) if path.len() > 1 => {
                        let remaining = path[1..].to_vec();
                        agents[index].path = remaining.iter().copied().collect();
                        out.push(Command::AssignPath {
                            agent_id,
                            path: remaining,
                        });
                    }
                    Some(_) => {}
                    None => {
                        tracing::trace!(agent = agent_id.get(), ?start, ?goal, "no path this tick");
                    }
                }
            }

            let mut moved = false;
            if let Some(next) = agents[index].path.front().copied() {
                if !reserved.contains(&next) && !occupied_by_other(&agents, agent_id, next) {
                    let agent = &mut agents[index];
                    agent.cell = next;
                    let _ = agent.path.pop_front();
                    let _ = reserved.insert(next);
                    out.push(Command::StepAgent { agent_id, to: next });
                    moved = true;
                    moves += 1;
                } else {
                    agents[index].path.clear();
                    out.push(Command::AbandonPath { agent_id });
                }
            }

            if !moved {
                let _ = reserved.insert(agents[index].cell);
            }
            out.push(Command::RotatePriority { agent_id });
        }

        tracing::debug!(agents = agents.len(), moves, "planned step");
    }
}

fn occupied_by_other(agents: &[WorkingAgent], agent_id: AgentId, cell: CellCoord) -> bool {
    agents
        .iter()
        .any(|other| other.id != agent_id && other.cell == cell)
}

#[derive(Clone, Debug)]
struct WorkingAgent {
    id: AgentId,
    priority: u32,
    cell: CellCoord,
    goal: CellCoord,
    at_goal: bool,
    path: VecDeque<CellCoord>,
    faulted: bool,
}

impl From<&AgentSnapshot> for WorkingAgent {
    fn from(snapshot: &AgentSnapshot) -> Self {
        Self {
            id: snapshot.id,
            priority: snapshot.priority,
            cell: snapshot.cell,
            goal: snapshot.goal,
            at_goal: snapshot.at_goal(),
            path: snapshot.path.iter().copied().collect(),
            faulted: snapshot.faulted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: u32, priority: u32, cell: CellCoord, goal: CellCoord) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            priority,
            cell,
            previous_cell: cell,
            progress: 1.0,
            goal,
            path: Vec::new(),
            faulted: false,
            frozen_position: None,
        }
    }

    fn stepping() -> Stepping {
        Stepping::new(Config::new(Duration::from_millis(450), 1))
    }

    fn tick(dt: Duration) -> Vec<Event> {
        vec![Event::TimeAdvanced { dt }]
    }

    #[test]
    fn waits_for_tick_interval() {
        let mut system = stepping();
        let view = AgentView::from_snapshots(vec![snapshot(
            0,
            1,
            CellCoord::new(0, 0),
            CellCoord::new(3, 0),
        )]);
        let grid = GridDimensions::new(5, 5);
        let mut out = Vec::new();

        system.handle(&tick(Duration::from_millis(300)), &view, grid, &mut out);
        assert!(out.is_empty());

        system.handle(&tick(Duration::from_millis(150)), &view, grid, &mut out);
        assert!(!out.is_empty());

        out.clear();
        system.handle(&tick(Duration::from_millis(300)), &view, grid, &mut out);
        assert!(out.is_empty(), "accumulator resets to zero after a step");
    }

    #[test]
    fn ignores_batches_without_time() {
        let mut system = stepping();
        let view = AgentView::default();
        let mut out = Vec::new();
        system.handle(
            &[Event::FaultInjected {
                cell: CellCoord::new(0, 0),
            }],
            &view,
            GridDimensions::new(3, 3),
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn higher_priority_claims_contested_cell() {
        let mut system = stepping();
        let grid = GridDimensions::new(3, 1);
        let view = AgentView::from_snapshots(vec![
            snapshot(0, 1, CellCoord::new(0, 0), CellCoord::new(1, 0)),
            snapshot(1, 5, CellCoord::new(2, 0), CellCoord::new(1, 0)),
        ]);
        let mut out = Vec::new();
        system.handle(&tick(Duration::from_millis(450)), &view, grid, &mut out);

        assert_eq!(
            out,
            vec![
                Command::AssignPath {
                    agent_id: AgentId::new(1),
                    path: vec![CellCoord::new(1, 0)],
                },
                Command::StepAgent {
                    agent_id: AgentId::new(1),
                    to: CellCoord::new(1, 0),
                },
                Command::RotatePriority {
                    agent_id: AgentId::new(1),
                },
                Command::RotatePriority {
                    agent_id: AgentId::new(0),
                },
            ]
        );
    }

    #[test]
    fn blocked_next_cell_abandons_path() {
        let mut system = stepping();
        let grid = GridDimensions::new(3, 1);
        let mut leader = snapshot(0, 1, CellCoord::new(0, 0), CellCoord::new(2, 0));
        leader.path = vec![CellCoord::new(1, 0), CellCoord::new(2, 0)];
        let mut faulted = snapshot(1, 9, CellCoord::new(1, 0), CellCoord::new(1, 0));
        faulted.faulted = true;
        let view = AgentView::from_snapshots(vec![leader, faulted]);
        let mut out = Vec::new();
        system.handle(&tick(Duration::from_millis(450)), &view, grid, &mut out);

        assert_eq!(
            out,
            vec![
                Command::AbandonPath {
                    agent_id: AgentId::new(0),
                },
                Command::RotatePriority {
                    agent_id: AgentId::new(0),
                },
            ]
        );
    }

    #[test]
    fn agent_at_goal_draws_new_goal() {
        let mut system = stepping();
        let grid = GridDimensions::new(4, 4);
        let view = AgentView::from_snapshots(vec![snapshot(
            0,
            1,
            CellCoord::new(2, 2),
            CellCoord::new(2, 2),
        )]);
        let mut out = Vec::new();
        system.handle(&tick(Duration::from_millis(450)), &view, grid, &mut out);

        match out.first() {
            Some(Command::AssignGoal { agent_id, goal }) => {
                assert_eq!(*agent_id, AgentId::new(0));
                assert!(grid.contains(*goal));
            }
            other => panic!("expected goal assignment, got {other:?}"),
        }
        assert_eq!(
            out.last(),
            Some(&Command::RotatePriority {
                agent_id: AgentId::new(0)
            })
        );
    }
}
