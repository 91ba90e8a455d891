#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Kinetic Grid simulation.

mod config;
mod simulation;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use kinetic_grid_core::{CellCoord, Event, SimulationConfig};
use kinetic_grid_rendering::{
    visuals, FrameInput, FrameSimulationBreakdown, GridPresentation, Presentation,
    RenderingBackend, Scene,
};
use kinetic_grid_rendering_macroquad::MacroquadBackend;
use kinetic_grid_world::query;

use crate::{config::Overrides, simulation::Simulation};

const WINDOW_TITLE: &str = "Kinetic Grid";

/// Command line arguments for the simulation.
#[derive(Parser, Debug)]
#[command(name = "kinetic-grid")]
#[command(about = "Multi-agent grid simulation with an injectable fault wave")]
struct Args {
    /// TOML configuration file; defaults to ./kinetic-grid.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for agent placement and goal reassignment
    #[arg(long)]
    seed: Option<u64>,

    /// Number of agents placed on the grid
    #[arg(long)]
    agents: Option<u32>,

    /// Number of grid columns
    #[arg(long)]
    columns: Option<u32>,

    /// Number of grid rows
    #[arg(long)]
    rows: Option<u32>,

    /// Run without a window for a fixed number of frames
    #[arg(long)]
    headless: bool,

    /// Frames simulated in headless mode
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Fixed frame delta in milliseconds used in headless mode
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Cell that receives the fault in headless mode, as COL,ROW
    #[arg(long, value_parser = parse_cell)]
    fault: Option<CellCoord>,

    /// Headless frame on which the fault is injected
    #[arg(long, default_value_t = 0)]
    fault_frame: u32,

    /// Synchronise presentation with the display refresh rate
    #[arg(long, overrides_with = "no_vsync")]
    vsync: bool,

    /// Render as fast as possible
    #[arg(long, overrides_with = "vsync")]
    no_vsync: bool,

    /// Log frame timing once per second
    #[arg(long)]
    show_fps: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let overrides = Overrides {
        seed: args.seed,
        agents: args.agents,
        columns: args.columns,
        rows: args.rows,
    };
    let config = config::load(args.config.as_deref(), overrides)?;
    tracing::info!(
        columns = config.columns,
        rows = config.rows,
        agents = config.agent_count,
        seed = config.seed,
        headless = args.headless,
        "starting kinetic grid"
    );

    if args.headless {
        run_headless(config, &args)
    } else {
        run_windowed(config, &args)
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COL,ROW but found `{value}`"))?;
    let column = column
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(CellCoord::new(column, row))
}

fn run_headless(config: SimulationConfig, args: &Args) -> Result<()> {
    let dt = Duration::from_millis(args.frame_ms);
    let mut simulation = Simulation::new(config).context("failed to build simulation")?;
    let mut summary = HeadlessSummary::default();
    let mut next_report = Duration::from_secs(1);

    for frame in 0..args.frames {
        let fault = args.fault.filter(|_| frame == args.fault_frame);
        summary.record(&simulation.advance(dt, fault));

        let clock = query::clock(simulation.world());
        if clock >= next_report {
            tracing::info!(
                clock = ?clock,
                moves = summary.moves,
                faulted = query::faulted_count(simulation.world()),
                wave = ?query::wave_view(simulation.world()).status(),
                "headless progress"
            );
            next_report = next_report.saturating_add(Duration::from_secs(1));
        }
    }

    tracing::info!(
        frames = args.frames,
        moves = summary.moves,
        goals = summary.goals,
        rejected = summary.rejected,
        "headless run finished"
    );
    for line in simulation.status().lines() {
        println!("{line}");
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
struct HeadlessSummary {
    moves: usize,
    goals: usize,
    rejected: usize,
}

impl HeadlessSummary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentAdvanced { .. } => self.moves += 1,
                Event::GoalAssigned { .. } => self.goals += 1,
                Event::AgentStepRejected { .. } => self.rejected += 1,
                _ => {}
            }
        }
    }
}

fn run_windowed(config: SimulationConfig, args: &Args) -> Result<()> {
    let grid = GridPresentation::new(config.columns, config.rows, config.cell_size)?;
    let ring_lifetime = config.ring_lifetime();
    let mut simulation = Simulation::new(config).context("failed to build simulation")?;

    let mut scene = Scene::new(grid, ring_lifetime, simulation.status());
    simulation.populate_scene(&mut scene, None);
    let presentation = Presentation::new(WINDOW_TITLE, visuals::BACKGROUND, scene);

    let backend = MacroquadBackend::new()
        .with_vsync(args.vsync || !args.no_vsync)
        .with_show_fps(args.show_fps);

    backend.run(
        presentation,
        move |dt: Duration, input: FrameInput, scene: &mut Scene| {
            let hovered = input
                .cursor_world_space
                .map(|point| scene.grid.world_to_cell(point));
            let fault = hovered.filter(|_| input.click);

            let simulation_start = Instant::now();
            let _ = simulation.advance(dt, fault);
            let simulation_time = simulation_start.elapsed();

            let population_start = Instant::now();
            simulation.populate_scene(scene, hovered);

            FrameSimulationBreakdown {
                simulation: simulation_time,
                scene_population: population_start.elapsed(),
            }
        },
    )
}
