#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Kinetic Grid adapters.

pub mod visuals;

use anyhow::Result as AnyResult;
use glam::Vec2;
use kinetic_grid_core::{AgentId, CellCoord, VisualPosition};
use std::{error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Creates an opaque color from hue, saturation, and lightness in `0.0..=1.0`.
    #[must_use]
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let hue = hue.rem_euclid(1.0);
        let saturation = saturation.clamp(0.0, 1.0);
        let lightness = lightness.clamp(0.0, 1.0);

        if saturation <= f32::EPSILON {
            return Self::new(lightness, lightness, lightness, 1.0);
        }

        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;

        Self::new(
            hue_to_channel(p, q, hue + 1.0 / 3.0),
            hue_to_channel(p, q, hue),
            hue_to_channel(p, q, hue - 1.0 / 3.0),
            1.0,
        )
    }

    /// Moves every channel towards `target` by the provided fraction.
    #[must_use]
    pub fn lerp(self, target: Color, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        Self {
            red: self.red + (target.red - self.red) * amount,
            green: self.green + (target.green - self.green) * amount,
            blue: self.blue + (target.blue - self.blue) * amount,
            alpha: self.alpha + (target.alpha - self.alpha) * amount,
        }
    }

    /// Returns the same color with its alpha channel replaced.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self {
            red: self.red,
            green: self.green,
            blue: self.blue,
            alpha,
        }
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Cursor position expressed in world units, if the cursor is over the window.
    pub cursor_world_space: Option<Vec2>,
    /// Whether the primary pointer button was pressed on this frame.
    pub click: bool,
}

/// Describes the agent grid and its mapping onto world space.
///
/// World space places the grid centre at the origin with one cell spanning
/// `cell_size` units, so cell `(c, r)` is drawn at
/// `((c - (columns - 1) / 2) * cell_size, (r - (rows - 1) / 2) * cell_size)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPresentation {
    /// Number of columns contained in the grid.
    pub columns: u32,
    /// Number of rows contained in the grid.
    pub rows: u32,
    /// Side length of a single cell expressed in world units.
    pub cell_size: f32,
}

impl GridPresentation {
    /// Creates a new grid presentation, rejecting degenerate dimensions.
    pub fn new(columns: u32, rows: u32, cell_size: f32) -> Result<Self, RenderingError> {
        if columns == 0 || rows == 0 {
            return Err(RenderingError::InvalidGridExtent { columns, rows });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(RenderingError::InvalidCellSize { cell_size });
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
        })
    }

    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    /// Cell-space offset that centres the grid on the origin.
    #[must_use]
    pub fn origin_offset(&self) -> Vec2 {
        Vec2::new(
            -(self.columns as f32 - 1.0) / 2.0,
            -(self.rows as f32 - 1.0) / 2.0,
        )
    }

    /// World-space centre of the provided cell.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec2 {
        self.visual_to_world(VisualPosition::at_cell(cell))
    }

    /// World-space position of a fractional cell-space position.
    #[must_use]
    pub fn visual_to_world(&self, position: VisualPosition) -> Vec2 {
        (Vec2::new(position.column, position.row) + self.origin_offset()) * self.cell_size
    }

    /// Cell nearest to the provided world-space point.
    ///
    /// Points beyond the grid map to cells outside it.
    #[must_use]
    pub fn world_to_cell(&self, point: Vec2) -> CellCoord {
        let cell = (point / self.cell_size - self.origin_offset()).round();
        CellCoord::new(cell.x as i32, cell.y as i32)
    }
}

/// Snapshot describing an agent to be drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentPresentation {
    /// Identifier of the agent.
    pub id: AgentId,
    /// World-space centre of the agent.
    pub position: Vec2,
    /// Blended color of the agent's status light.
    pub indicator: Color,
    /// Whether the agent has been caught by the fault wave.
    pub faulted: bool,
}

impl AgentPresentation {
    /// Creates a new agent descriptor.
    #[must_use]
    pub const fn new(id: AgentId, position: Vec2, indicator: Color, faulted: bool) -> Self {
        Self {
            id,
            position,
            indicator,
            faulted,
        }
    }
}

/// Fault wave ring spawned on a flooded cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingPresentation {
    /// World-space centre of the flooded cell.
    pub position: Vec2,
    /// Simulation clock reading when the ring was spawned.
    pub born_at: Duration,
}

impl RingPresentation {
    /// Creates a new ring descriptor.
    #[must_use]
    pub const fn new(position: Vec2, born_at: Duration) -> Self {
        Self { position, born_at }
    }
}

/// Highlight drawn under the cell the cursor hovers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoverPresentation {
    /// Hovered cell, possibly outside the grid.
    pub cell: CellCoord,
    /// World-space centre of the hovered cell.
    pub position: Vec2,
}

/// Text overlay summarising the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusPanel {
    /// Number of agents on the grid.
    pub agents: usize,
    /// Number of agents caught by the fault wave.
    pub faulted: usize,
    /// Label of the multi-agent stepping rule.
    pub algorithm: &'static str,
}

impl StatusPanel {
    /// Lines of text shown in the overlay, top to bottom.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let status = if self.faulted == 0 { "NOMINAL" } else { "FAULT" };
        let mut lines = vec![
            format!("Sys.Status: [ {status} ]"),
            format!("Algorithm: [ {} ]", self.algorithm),
            format!("Agents: [ {} ]", self.agents),
        ];
        if self.faulted > 0 {
            lines.push(format!("Faulted: [ {} ]", self.faulted));
        } else {
            lines.push(String::from("> Click grid to inject fault"));
        }
        lines
    }
}

/// Scene description consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Grid drawn beneath the agents.
    pub grid: GridPresentation,
    /// Agents drawn this frame in identifier order.
    pub agents: Vec<AgentPresentation>,
    /// Every ring the wave has spawned, oldest first.
    pub rings: Vec<RingPresentation>,
    /// Hover highlight, if the cursor is over the floor.
    pub hover: Option<HoverPresentation>,
    /// Simulation clock used to age rings.
    pub clock: Duration,
    /// Window during which a ring stays visible.
    pub ring_lifetime: Duration,
    /// Status overlay.
    pub status: StatusPanel,
}

impl Scene {
    /// Creates an empty scene for the provided grid.
    #[must_use]
    pub fn new(grid: GridPresentation, ring_lifetime: Duration, status: StatusPanel) -> Self {
        Self {
            grid,
            agents: Vec::new(),
            rings: Vec::new(),
            hover: None,
            clock: Duration::ZERO,
            ring_lifetime,
            status,
        }
    }

    /// Rings visible at the current clock paired with their pulse intensity.
    pub fn visible_rings(&self) -> impl Iterator<Item = (Vec2, f32)> + '_ {
        self.rings.iter().filter_map(|ring| {
            let age = self.clock.checked_sub(ring.born_at)?;
            visuals::ring_pulse(age, self.ring_lifetime).map(|pulse| (ring.position, pulse))
        })
    }
}

/// Describes how the adapter should present the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title displayed by the window chrome.
    pub window_title: String,
    /// Color used to clear the frame before drawing.
    pub clear_color: Color,
    /// Scene drawn on the first frame.
    pub scene: Scene,
}

impl Presentation {
    /// Creates a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Time spent by the update callback, reported back to the backend for metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSimulationBreakdown {
    /// Time spent advancing the world and systems.
    pub simulation: Duration,
    /// Time spent translating world state into the scene.
    pub scene_population: Duration,
}

/// Trait implemented by rendering backends.
pub trait RenderingBackend {
    /// Runs the backend until the window is closed.
    ///
    /// `update_scene` is invoked once per frame with the elapsed frame time and
    /// the gathered input, and mutates the scene before it is drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameSimulationBreakdown + 'static;
}

/// Errors raised while constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// The grid has no columns or no rows.
    InvalidGridExtent {
        /// Column count that was provided.
        columns: u32,
        /// Row count that was provided.
        rows: u32,
    },
    /// The cell size was zero, negative, or not finite.
    InvalidCellSize {
        /// Cell size that was provided.
        cell_size: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGridExtent { columns, rows } => {
                write!(f, "grid must have at least one cell (received {columns}x{rows})")
            }
            Self::InvalidCellSize { cell_size } => {
                write!(f, "cell_size must be positive (received {cell_size})")
            }
        }
    }
}

impl Error for RenderingError {}
