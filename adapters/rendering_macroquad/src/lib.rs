#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Kinetic Grid.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, so the adapter depends on macroquad without its default `audio`
//! feature.
//!
//! The floor is drawn top-down: world space is centred on the window and
//! scaled so the agent grid plus a margin fits the shorter screen axis.

use anyhow::Result;
use glam::Vec2;
use kinetic_grid_rendering::{
    visuals, AgentPresentation, Color, FrameInput, FrameSimulationBreakdown, GridPresentation,
    HoverPresentation, Presentation, RenderingBackend, Scene,
};
use macroquad::input::{
    is_key_pressed, is_mouse_button_pressed, mouse_position, KeyCode, MouseButton,
};
use std::time::{Duration, Instant};

const GRID_MARGIN_CELLS: f32 = 2.0;
const STATUS_FONT_SIZE: u16 = 14;
const STATUS_MARGIN: f32 = 40.0;

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the render loop.
    quit_requested: bool,
    /// `F` toggles periodic frame timing logs.
    toggle_fps: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            toggle_fps: is_key_pressed(KeyCode::F),
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameBreakdown {
    frame: Duration,
    simulation: Duration,
    scene_population: Duration,
    render: Duration,
}

#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    simulation_accum: Duration,
    scene_population_accum: Duration,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    avg_simulation: Duration,
    avg_scene_population: Duration,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns averages once one second has elapsed.
    fn record_frame(&mut self, breakdown: FrameBreakdown) -> Option<FpsMetrics> {
        self.elapsed += breakdown.frame;
        self.frames = self.frames.saturating_add(1);
        self.simulation_accum += breakdown.simulation;
        self.scene_population_accum += breakdown.scene_population;
        self.render_accum += breakdown.render;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames.max(1);
        let metrics = FpsMetrics {
            per_second: self.frames as f32 / seconds,
            avg_simulation: self.simulation_accum / frames,
            avg_scene_population: self.scene_population_accum / frames,
            avg_render: self.render_accum / frames,
        };
        *self = Self::default();
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameSimulationBreakdown + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 1100,
            window_height: 760,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        tracing::info!(?swap_interval, "opening macroquad window");

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let mut show_fps = show_fps;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    tracing::info!("quit requested");
                    break;
                }
                if keyboard.toggle_fps {
                    show_fps = !show_fps;
                }

                macroquad::window::clear_background(background);

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let metrics_before =
                    SceneMetrics::from_grid(&scene.grid, screen_width, screen_height);
                let frame_input = gather_frame_input(&metrics_before, screen_width, screen_height);

                let simulation_breakdown = update_scene(frame_dt, frame_input, &mut scene);

                let metrics = SceneMetrics::from_grid(&scene.grid, screen_width, screen_height);
                let render_start = Instant::now();
                draw_backdrop(&metrics, scene.grid.cell_size);
                draw_rings(&scene, &metrics);
                if let Some(hover) = scene.hover {
                    draw_hover(hover, &metrics, scene.grid.cell_size);
                }
                draw_agents(&scene.agents, &metrics, scene.grid.cell_size);
                draw_status(&scene.status.lines(), screen_width, screen_height);
                let render_duration = render_start.elapsed();

                let fps_metrics = fps_counter.record_frame(FrameBreakdown {
                    frame: frame_dt,
                    simulation: simulation_breakdown.simulation,
                    scene_population: simulation_breakdown.scene_population,
                    render: render_duration,
                });
                if show_fps {
                    if let Some(metrics) = fps_metrics {
                        tracing::info!(
                            fps = metrics.per_second,
                            sim_ms = metrics.avg_simulation.as_secs_f64() * 1_000.0,
                            scene_ms = metrics.avg_scene_population.as_secs_f64() * 1_000.0,
                            render_ms = metrics.avg_render.as_secs_f64() * 1_000.0,
                            "frame timings"
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Mapping between world space and screen pixels for the current window size.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    scale: f32,
    center: Vec2,
}

impl SceneMetrics {
    fn from_grid(grid: &GridPresentation, screen_width: f32, screen_height: f32) -> Self {
        let margin = GRID_MARGIN_CELLS * 2.0 * grid.cell_size;
        let world_width = grid.width() + margin;
        let world_height = grid.height() + margin;
        let scale = if world_width <= f32::EPSILON || world_height <= f32::EPSILON {
            1.0
        } else {
            (screen_width / world_width).min(screen_height / world_height)
        };

        Self {
            scale,
            center: Vec2::new(screen_width * 0.5, screen_height * 0.5),
        }
    }

    fn world_to_screen(&self, point: Vec2) -> Vec2 {
        self.center + point * self.scale
    }

    fn screen_to_world(&self, point: Vec2) -> Option<Vec2> {
        if self.scale <= f32::EPSILON {
            return None;
        }
        Some((point - self.center) / self.scale)
    }
}

fn gather_frame_input(metrics: &SceneMetrics, screen_width: f32, screen_height: f32) -> FrameInput {
    let (cursor_x, cursor_y) = mouse_position();
    let click = is_mouse_button_pressed(MouseButton::Left);
    gather_frame_input_from_observations(
        metrics,
        Vec2::new(cursor_x, cursor_y),
        Vec2::new(screen_width, screen_height),
        click,
    )
}

fn gather_frame_input_from_observations(
    metrics: &SceneMetrics,
    cursor_position: Vec2,
    screen_size: Vec2,
    click: bool,
) -> FrameInput {
    let inside = cursor_position.x >= 0.0
        && cursor_position.y >= 0.0
        && cursor_position.x < screen_size.x
        && cursor_position.y < screen_size.y;
    if !inside {
        return FrameInput::default();
    }

    let cursor_world_space = metrics.screen_to_world(cursor_position);
    FrameInput {
        click: click && cursor_world_space.is_some(),
        cursor_world_space,
    }
}

fn draw_backdrop(metrics: &SceneMetrics, cell_size: f32) {
    let extent = visuals::BACKDROP_HALF_EXTENT as f32 * cell_size;
    let thickness = 1.0;
    for offset in -visuals::BACKDROP_HALF_EXTENT..=visuals::BACKDROP_HALF_EXTENT {
        let color = to_macroquad_color(visuals::backdrop_line_color(offset));
        let along = offset as f32 * cell_size;

        let start = metrics.world_to_screen(Vec2::new(along, -extent));
        let end = metrics.world_to_screen(Vec2::new(along, extent));
        macroquad::shapes::draw_line(start.x, start.y, end.x, end.y, thickness, color);

        let start = metrics.world_to_screen(Vec2::new(-extent, along));
        let end = metrics.world_to_screen(Vec2::new(extent, along));
        macroquad::shapes::draw_line(start.x, start.y, end.x, end.y, thickness, color);
    }
}

fn draw_rings(scene: &Scene, metrics: &SceneMetrics) {
    for (position, pulse) in scene.visible_rings() {
        let size = visuals::RING_SCALE * pulse * scene.grid.cell_size;
        let color = visuals::FAULT.with_alpha(visuals::RING_OPACITY * pulse);
        fill_square(metrics, position, size, color);
    }
}

fn draw_hover(hover: HoverPresentation, metrics: &SceneMetrics, cell_size: f32) {
    fill_square(
        metrics,
        hover.position,
        visuals::HOVER_SIZE * cell_size,
        visuals::HOVER,
    );
}

fn draw_agents(agents: &[AgentPresentation], metrics: &SceneMetrics, cell_size: f32) {
    for agent in agents {
        let at = |dx: f32, dy: f32| agent.position + Vec2::new(dx, dy) * cell_size;

        fill_square(metrics, agent.position, 0.7 * cell_size, visuals::AGENT_BASE);
        for (dx, dy) in [(-0.26, -0.26), (0.26, -0.26), (-0.26, 0.26), (0.26, 0.26)] {
            fill_circle(metrics, at(dx, dy), 0.055 * cell_size, visuals::AGENT_WHEEL);
        }
        fill_square(metrics, agent.position, 0.58 * cell_size, visuals::AGENT_TOP);
        fill_rect(
            metrics,
            at(0.0, -0.305),
            Vec2::new(0.35, 0.035) * cell_size,
            visuals::AGENT_STRIPE,
        );
        fill_circle(metrics, agent.position, 0.07 * cell_size, visuals::AGENT_DOME);
        fill_circle(metrics, agent.position, 0.05 * cell_size, agent.indicator);
    }
}

fn draw_status(lines: &[String], screen_width: f32, screen_height: f32) {
    let color = to_macroquad_color(visuals::STATUS_TEXT);
    let line_height = f32::from(STATUS_FONT_SIZE) * 2.0;
    let top = screen_height - STATUS_MARGIN - line_height * (lines.len() as f32 - 1.0);
    for (index, line) in lines.iter().enumerate() {
        let upper = line.to_uppercase();
        let dimensions = macroquad::text::measure_text(&upper, None, STATUS_FONT_SIZE, 1.0);
        let x = screen_width - STATUS_MARGIN - dimensions.width;
        let y = top + line_height * index as f32;
        let _ = macroquad::text::draw_text(&upper, x, y, f32::from(STATUS_FONT_SIZE), color);
    }
}

fn fill_square(metrics: &SceneMetrics, center: Vec2, size: f32, color: Color) {
    fill_rect(metrics, center, Vec2::splat(size), color);
}

fn fill_rect(metrics: &SceneMetrics, center: Vec2, size: Vec2, color: Color) {
    let top_left = metrics.world_to_screen(center - size * 0.5);
    let scaled = size * metrics.scale;
    macroquad::shapes::draw_rectangle(
        top_left.x,
        top_left.y,
        scaled.x,
        scaled.y,
        to_macroquad_color(color),
    );
}

fn fill_circle(metrics: &SceneMetrics, center: Vec2, radius: f32, color: Color) {
    let screen = metrics.world_to_screen(center);
    macroquad::shapes::draw_circle(
        screen.x,
        screen.y,
        radius * metrics.scale,
        to_macroquad_color(color),
    );
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
