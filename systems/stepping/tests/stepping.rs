use std::{collections::HashSet, time::Duration};

use kinetic_grid_core::{AgentId, CellCoord, Command, Event, SimulationConfig};
use kinetic_grid_system_stepping::{Config, Stepping};
use kinetic_grid_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(50);

struct Harness {
    world: World,
    stepping: Stepping,
}

impl Harness {
    fn new(config: SimulationConfig) -> Self {
        let stepping = Stepping::new(Config::new(config.tick_interval(), config.seed ^ 0x5eed));
        let world = World::from_config(config).expect("valid configuration");
        Self { world, stepping }
    }

    fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        events
    }

    fn frame(&mut self, dt: Duration) -> Vec<Event> {
        let mut log = Vec::new();
        let mut events = self.apply(Command::Tick { dt });

        while !events.is_empty() {
            log.extend(events.iter().cloned());
            let view = query::agent_view(&self.world);
            let grid = query::grid(&self.world);
            let mut commands = Vec::new();
            self.stepping.handle(&events, &view, grid, &mut commands);

            events.clear();
            for command in commands {
                events.extend(self.apply(command));
            }
        }

        log
    }

    fn spawn(&mut self, cell: CellCoord, goal: CellCoord, priority: u32) -> AgentId {
        match self
            .apply(Command::SpawnAgent {
                cell,
                goal,
                priority,
            })
            .as_slice()
        {
            [Event::AgentSpawned { agent_id, .. }] => *agent_id,
            other => panic!("spawn failed: {other:?}"),
        }
    }
}

fn assert_no_shared_cells(world: &World) {
    let view = query::agent_view(world);
    let cells: HashSet<CellCoord> = view.iter().map(|agent| agent.cell).collect();
    assert_eq!(cells.len(), view.len(), "two agents share a cell");
}

#[test]
fn agents_never_share_cells() {
    let mut harness = Harness::new(SimulationConfig {
        seed: 17,
        ..SimulationConfig::default()
    });

    for _ in 0..400 {
        let events = harness.frame(FRAME);
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, Event::AgentStepRejected { .. })),
            "world rejected a planned step"
        );
        assert_no_shared_cells(&harness.world);
    }
}

#[test]
fn crowded_grid_keeps_agents_apart() {
    let mut harness = Harness::new(SimulationConfig {
        columns: 4,
        rows: 4,
        agent_count: 12,
        seed: 3,
        ..SimulationConfig::default()
    });

    for _ in 0..200 {
        let _ = harness.frame(FRAME);
        assert_no_shared_cells(&harness.world);
    }
}

#[test]
fn agents_make_progress_toward_goals() {
    let mut harness = Harness::new(SimulationConfig {
        seed: 8,
        ..SimulationConfig::default()
    });

    let mut advanced = 0usize;
    for _ in 0..100 {
        advanced += harness
            .frame(FRAME)
            .iter()
            .filter(|event| matches!(event, Event::AgentAdvanced { .. }))
            .count();
    }
    assert!(advanced > 0, "no agent moved in five seconds");
}

#[test]
fn lone_agent_walks_straight_to_goal() {
    let mut harness = Harness::new(SimulationConfig {
        agent_count: 0,
        ..SimulationConfig::default()
    });
    let agent_id = harness.spawn(CellCoord::new(0, 0), CellCoord::new(5, 0), 1);

    let mut columns = vec![0];
    for _ in 0..5 {
        for event in harness.frame(Duration::from_millis(450)) {
            if let Event::AgentAdvanced { to, .. } = event {
                columns.push(to.column());
                assert_eq!(to.row(), 0);
            }
        }
    }

    assert_eq!(columns, vec![0, 1, 2, 3, 4, 5]);
    let view = query::agent_view(&harness.world);
    assert_eq!(
        view.get(agent_id).map(|agent| agent.cell),
        Some(CellCoord::new(5, 0))
    );
}

#[test]
fn faulted_agents_never_move() {
    let mut harness = Harness::new(SimulationConfig {
        seed: 21,
        ..SimulationConfig::default()
    });

    let _ = harness.frame(Duration::from_millis(450));
    let target = query::agent_view(&harness.world)
        .iter()
        .next()
        .map(|agent| agent.cell)
        .expect("agents generated");
    let _ = harness.apply(Command::InjectFault { cell: target });

    let mut frozen: Vec<(AgentId, CellCoord)> = Vec::new();
    for _ in 0..300 {
        let _ = harness.frame(FRAME);
        for (agent_id, cell) in &frozen {
            let view = query::agent_view(&harness.world);
            assert_eq!(view.get(*agent_id).map(|agent| agent.cell), Some(*cell));
        }
        frozen = query::agent_view(&harness.world)
            .iter()
            .filter(|agent| agent.faulted)
            .map(|agent| (agent.id, agent.cell))
            .collect();
        assert_no_shared_cells(&harness.world);
    }

    assert_eq!(
        query::faulted_count(&harness.world),
        8,
        "an unbounded wave eventually reaches every agent"
    );
}

#[test]
fn blocked_agent_waits_without_error() {
    let mut harness = Harness::new(SimulationConfig {
        columns: 3,
        rows: 1,
        agent_count: 0,
        wave_max_radius: 0,
        ..SimulationConfig::default()
    });
    let walker = harness.spawn(CellCoord::new(0, 0), CellCoord::new(2, 0), 1);
    let _ = harness.spawn(CellCoord::new(1, 0), CellCoord::new(1, 0), 0);
    let _ = harness.apply(Command::InjectFault {
        cell: CellCoord::new(1, 0),
    });

    for _ in 0..20 {
        let _ = harness.frame(FRAME);
    }

    let view = query::agent_view(&harness.world);
    assert_eq!(
        view.get(walker).map(|agent| agent.cell),
        Some(CellCoord::new(0, 0))
    );
}
