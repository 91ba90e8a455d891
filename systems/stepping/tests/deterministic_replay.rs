use std::time::Duration;

use kinetic_grid_core::{AgentId, CellCoord, Command, Event, SimulationConfig};
use kinetic_grid_system_stepping::{Config, Stepping};
use kinetic_grid_world::{self as world, query, World};

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(scripted_frames());
    let second = replay(scripted_frames());

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, Event::AgentAdvanced { .. })));
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, Event::AgentFaulted { .. })));
}

#[test]
fn different_seeds_diverge() {
    let baseline = replay_with_seed(scripted_frames(), 1);
    let other = replay_with_seed(scripted_frames(), 2);
    assert_ne!(baseline.agents, other.agents);
}

fn replay(frames: Vec<Frame>) -> ReplayOutcome {
    replay_with_seed(frames, 0x0bad_cafe)
}

fn replay_with_seed(frames: Vec<Frame>, seed: u64) -> ReplayOutcome {
    let config = SimulationConfig {
        seed,
        ..SimulationConfig::default()
    };
    let mut stepping = Stepping::new(Config::new(config.tick_interval(), seed.rotate_left(17)));
    let mut world = World::from_config(config).expect("valid configuration");
    let mut log = Vec::new();

    for frame in frames {
        if let Some(cell) = frame.fault {
            world::apply(&mut world, Command::InjectFault { cell }, &mut log);
        }

        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: frame.dt }, &mut events);
        process_stepping(&mut world, &mut stepping, events, &mut log);
    }

    let agents = query::agent_view(&world)
        .into_vec()
        .into_iter()
        .map(|snapshot| AgentState {
            id: snapshot.id,
            cell: snapshot.cell,
            goal: snapshot.goal,
            priority: snapshot.priority,
            faulted: snapshot.faulted,
        })
        .collect();

    ReplayOutcome {
        agents,
        events: log,
    }
}

fn process_stepping(
    world: &mut World,
    stepping: &mut Stepping,
    pending_events: Vec<Event>,
    log: &mut Vec<Event>,
) {
    let mut events = pending_events;

    loop {
        if events.is_empty() {
            break;
        }
        log.extend(events.iter().cloned());

        let agent_view = query::agent_view(world);
        let mut commands = Vec::new();
        stepping.handle(&events, &agent_view, query::grid(world), &mut commands);

        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

struct Frame {
    dt: Duration,
    fault: Option<CellCoord>,
}

fn scripted_frames() -> Vec<Frame> {
    (0..240)
        .map(|index| Frame {
            dt: Duration::from_millis(if index % 3 == 0 { 33 } else { 17 }),
            fault: (index == 120).then_some(CellCoord::new(6, 5)),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AgentState {
    id: AgentId,
    cell: CellCoord,
    goal: CellCoord,
    priority: u32,
    faulted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ReplayOutcome {
    agents: Vec<AgentState>,
    events: Vec<Event>,
}
