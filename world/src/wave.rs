//! Breadth-first fault flood seeded from a single cell.

use std::{collections::HashSet, time::Duration};

use kinetic_grid_core::{CellCoord, Event, GridDimensions, WaveRing, WaveStatus, WaveView};

/// Timing and extent limits applied while the wave advances.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WaveLimits {
    pub(crate) step: Duration,
    pub(crate) max_radius: u32,
    pub(crate) clip: Option<GridDimensions>,
}

/// One-shot flood that expands by one Manhattan ring per step interval.
#[derive(Clone, Debug, Default)]
pub(crate) struct FaultWave {
    seed: Option<CellCoord>,
    processed: HashSet<CellCoord>,
    frontier: Vec<CellCoord>,
    rings: Vec<WaveRing>,
    radius: u32,
    timer: Duration,
    active: bool,
}

impl FaultWave {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_seeded(&self) -> bool {
        self.seed.is_some()
    }

    /// Seeds the flood at `cell`, returning `false` if it was already seeded.
    pub(crate) fn seed(&mut self, cell: CellCoord, now: Duration) -> bool {
        if self.is_seeded() {
            return false;
        }

        self.seed = Some(cell);
        self.processed.clear();
        let _ = self.processed.insert(cell);
        self.frontier = vec![cell];
        self.rings = vec![WaveRing { cell, born_at: now }];
        self.radius = 0;
        self.timer = Duration::ZERO;
        self.active = true;
        true
    }

    /// Accumulates `dt` and floods the next ring once the step interval elapses.
    pub(crate) fn advance(
        &mut self,
        dt: Duration,
        now: Duration,
        limits: WaveLimits,
        out_events: &mut Vec<Event>,
    ) {
        if !self.active {
            return;
        }

        self.timer = self.timer.saturating_add(dt);
        if self.timer < limits.step {
            return;
        }
        self.timer = Duration::ZERO;
        self.radius = self.radius.saturating_add(1);

        if self.radius > limits.max_radius {
            self.active = false;
            out_events.push(Event::WaveSettled {
                radius: self.radius,
            });
            return;
        }

        let mut next_frontier = Vec::new();
        for cell in &self.frontier {
            for neighbor in cell.neighbors() {
                if let Some(grid) = limits.clip {
                    if !grid.contains(neighbor) {
                        continue;
                    }
                }
                if !self.processed.insert(neighbor) {
                    continue;
                }
                next_frontier.push(neighbor);
                self.rings.push(WaveRing {
                    cell: neighbor,
                    born_at: now,
                });
            }
        }

        self.frontier = next_frontier;
        out_events.push(Event::WaveAdvanced {
            radius: self.radius,
            cells: self.frontier.clone(),
        });
    }

    pub(crate) fn is_processed(&self, cell: CellCoord) -> bool {
        self.processed.contains(&cell)
    }

    pub(crate) fn status(&self) -> WaveStatus {
        match (self.seed, self.active) {
            (None, _) => WaveStatus::Dormant,
            (Some(_), true) => WaveStatus::Spreading {
                radius: self.radius,
            },
            (Some(_), false) => WaveStatus::Settled {
                radius: self.radius,
            },
        }
    }

    pub(crate) fn view(&self) -> WaveView<'_> {
        WaveView::new(
            self.status(),
            self.seed,
            &self.processed,
            &self.frontier,
            &self.rings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(80);

    fn limits(max_radius: u32) -> WaveLimits {
        WaveLimits {
            step: STEP,
            max_radius,
            clip: None,
        }
    }

    #[test]
    fn timer_must_reach_step_before_expanding() {
        let mut wave = FaultWave::new();
        assert!(wave.seed(CellCoord::new(0, 0), Duration::ZERO));
        let mut events = Vec::new();

        wave.advance(Duration::from_millis(79), STEP, limits(40), &mut events);
        assert!(events.is_empty());
        assert_eq!(wave.view().frontier(), &[CellCoord::new(0, 0)]);

        wave.advance(Duration::from_millis(1), STEP, limits(40), &mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(wave.status(), WaveStatus::Spreading { radius: 1 });
    }

    #[test]
    fn timer_resets_instead_of_carrying_remainder() {
        let mut wave = FaultWave::new();
        assert!(wave.seed(CellCoord::new(0, 0), Duration::ZERO));
        let mut events = Vec::new();

        wave.advance(Duration::from_millis(150), STEP, limits(40), &mut events);
        wave.advance(Duration::from_millis(10), STEP, limits(40), &mut events);
        assert_eq!(wave.status(), WaveStatus::Spreading { radius: 1 });
    }

    #[test]
    fn frontier_preserves_discovery_order() {
        let mut wave = FaultWave::new();
        let seed = CellCoord::new(3, 3);
        assert!(wave.seed(seed, Duration::ZERO));
        let mut events = Vec::new();
        wave.advance(STEP, STEP, limits(40), &mut events);

        assert_eq!(wave.view().frontier(), &seed.neighbors());
        assert_eq!(
            events,
            vec![Event::WaveAdvanced {
                radius: 1,
                cells: seed.neighbors().to_vec(),
            }]
        );
        let births: Vec<Duration> = wave.view().rings().iter().map(|ring| ring.born_at).collect();
        assert_eq!(births, vec![Duration::ZERO, STEP, STEP, STEP, STEP]);
    }

    #[test]
    fn wave_settles_once_radius_exceeds_maximum() {
        let mut wave = FaultWave::new();
        assert!(wave.seed(CellCoord::new(0, 0), Duration::ZERO));
        let mut events = Vec::new();

        wave.advance(STEP, STEP, limits(1), &mut events);
        wave.advance(STEP, STEP * 2, limits(1), &mut events);
        assert_eq!(events.last(), Some(&Event::WaveSettled { radius: 2 }));
        assert_eq!(wave.status(), WaveStatus::Settled { radius: 2 });

        let processed = wave.view().processed().len();
        events.clear();
        wave.advance(STEP, STEP * 3, limits(1), &mut events);
        assert!(events.is_empty());
        assert_eq!(wave.view().processed().len(), processed);
    }

    #[test]
    fn second_seed_is_refused() {
        let mut wave = FaultWave::new();
        assert!(wave.seed(CellCoord::new(1, 1), Duration::ZERO));
        assert!(!wave.seed(CellCoord::new(5, 5), Duration::from_secs(1)));
        assert_eq!(wave.view().seed(), Some(CellCoord::new(1, 1)));
        assert!(!wave.is_processed(CellCoord::new(5, 5)));
    }
}
