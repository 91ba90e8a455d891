//! Frame driver that wires the world, the stepping system, and scene composition.

use std::time::Duration;

use kinetic_grid_core::{CellCoord, Command, ConfigError, Event, SimulationConfig, ALGORITHM_LABEL};
use kinetic_grid_rendering::{
    visuals::IndicatorBlender, AgentPresentation, HoverPresentation, RingPresentation, Scene,
    StatusPanel,
};
use kinetic_grid_system_stepping::{Config as SteppingConfig, Stepping};
use kinetic_grid_world::{self as world, query, World};

/// Owns the authoritative world together with the systems that drive it.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    stepping: Stepping,
    blender: IndicatorBlender,
}

impl Simulation {
    /// Builds the world described by `config` and a stepping system seeded from it.
    pub(crate) fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let stepping = Stepping::new(SteppingConfig::new(
            config.tick_interval(),
            stepping_seed(config.seed),
        ));
        let world = World::from_config(config)?;

        Ok(Self {
            world,
            stepping,
            blender: IndicatorBlender::new(),
        })
    }

    /// Read access to the world for queries.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Advances the simulation by one frame and returns every event it produced.
    ///
    /// A fault requested for this frame is injected before time advances, then
    /// stepping commands are pumped through the world until none remain.
    pub(crate) fn advance(&mut self, dt: Duration, fault: Option<CellCoord>) -> Vec<Event> {
        let mut log = Vec::new();
        if let Some(cell) = fault {
            world::apply(&mut self.world, Command::InjectFault { cell }, &mut log);
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let grid = query::grid(&self.world);
        while !events.is_empty() {
            let agent_view = query::agent_view(&self.world);
            let mut commands = Vec::new();
            self.stepping.handle(&events, &agent_view, grid, &mut commands);
            log.append(&mut events);

            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }

        log
    }

    /// Summary shown in the status overlay.
    pub(crate) fn status(&self) -> StatusPanel {
        StatusPanel {
            agents: query::agent_view(&self.world).len(),
            faulted: query::faulted_count(&self.world),
            algorithm: ALGORITHM_LABEL,
        }
    }

    /// Writes the current world state into the scene.
    ///
    /// Indicator colors advance by one blending step per call, so this should
    /// run exactly once per rendered frame.
    pub(crate) fn populate_scene(&mut self, scene: &mut Scene, hovered: Option<CellCoord>) {
        let grid = scene.grid;
        let agent_view = query::agent_view(&self.world);
        let count = agent_view.len();

        scene.agents.clear();
        for (index, agent) in agent_view.iter().enumerate() {
            let indicator = self.blender.blend(index, count, agent.faulted);
            scene.agents.push(AgentPresentation::new(
                agent.id,
                grid.visual_to_world(agent.visual_position()),
                indicator,
                agent.faulted,
            ));
        }

        let rings = query::wave_view(&self.world).rings();
        if rings.len() < scene.rings.len() {
            scene.rings.clear();
        }
        let known = scene.rings.len();
        scene.rings.extend(
            rings
                .iter()
                .skip(known)
                .map(|ring| RingPresentation::new(grid.cell_to_world(ring.cell), ring.born_at)),
        );

        scene.hover = hovered.map(|cell| HoverPresentation {
            cell,
            position: grid.cell_to_world(cell),
        });
        scene.clock = query::clock(&self.world);
        scene.status = self.status();
    }
}

fn stepping_seed(seed: u64) -> u64 {
    seed.rotate_left(17) ^ 0x7374_6570
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_grid_rendering::GridPresentation;

    const FRAME: Duration = Duration::from_millis(50);

    fn config() -> SimulationConfig {
        SimulationConfig {
            seed: 5,
            ..SimulationConfig::default()
        }
    }

    fn scene(simulation: &Simulation) -> Scene {
        let config = query::config(simulation.world());
        let grid = GridPresentation::new(config.columns, config.rows, config.cell_size)
            .expect("valid grid");
        Scene::new(grid, config.ring_lifetime(), simulation.status())
    }

    #[test]
    fn advancing_moves_agents_once_per_tick_interval() {
        let mut simulation = Simulation::new(config()).expect("valid configuration");
        let mut moved = 0;
        for _ in 0..40 {
            moved += simulation
                .advance(FRAME, None)
                .iter()
                .filter(|event| matches!(event, Event::AgentAdvanced { .. }))
                .count();
        }
        assert!(moved > 0, "agents never moved");

        let rejected = simulation
            .advance(FRAME, None)
            .into_iter()
            .any(|event| matches!(event, Event::AgentStepRejected { .. }));
        assert!(!rejected);
    }

    #[test]
    fn injected_fault_is_reported_and_spreads() {
        let mut simulation = Simulation::new(config()).expect("valid configuration");
        let events = simulation.advance(FRAME, Some(CellCoord::new(3, 3)));
        assert!(events.contains(&Event::FaultInjected {
            cell: CellCoord::new(3, 3)
        }));

        for _ in 0..20 {
            let _ = simulation.advance(FRAME, None);
        }
        let wave = query::wave_view(simulation.world());
        assert!(wave.is_processed(CellCoord::new(4, 3)));
        assert!(wave.is_processed(CellCoord::new(3, 2)));
    }

    #[test]
    fn populate_scene_mirrors_world_state() {
        let mut simulation = Simulation::new(config()).expect("valid configuration");
        let _ = simulation.advance(FRAME, Some(CellCoord::new(0, 0)));
        for _ in 0..4 {
            let _ = simulation.advance(FRAME, None);
        }

        let mut scene = scene(&simulation);
        simulation.populate_scene(&mut scene, Some(CellCoord::new(2, 1)));

        assert_eq!(scene.agents.len(), 8);
        assert_eq!(scene.rings.len(), query::wave_view(simulation.world()).rings().len());
        assert_eq!(scene.clock, query::clock(simulation.world()));
        assert_eq!(scene.hover.map(|hover| hover.cell), Some(CellCoord::new(2, 1)));
        assert_eq!(scene.status.agents, 8);

        simulation.populate_scene(&mut scene, None);
        assert!(scene.hover.is_none());
    }

    #[test]
    fn rings_are_appended_without_duplicates() {
        let mut simulation = Simulation::new(config()).expect("valid configuration");
        let mut scene = scene(&simulation);
        let _ = simulation.advance(FRAME, Some(CellCoord::new(6, 5)));
        simulation.populate_scene(&mut scene, None);
        assert_eq!(scene.rings.len(), 1);

        let _ = simulation.advance(Duration::from_millis(100), None);
        simulation.populate_scene(&mut scene, None);
        simulation.populate_scene(&mut scene, None);
        assert_eq!(scene.rings.len(), 5);
    }
}
