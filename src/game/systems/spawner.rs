use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::constants::obstacle;
use crate::game::difficulty::SpawnSettings;
use crate::game::state::{
    EntityId, GapOscillation, GapPulse, ObstaclePair, PlayField, SpecialPair,
};

/// Timer-driven obstacle generator
///
/// The first pair appears on the first tick; after that one pair is
/// spawned every `settings.interval` seconds.
#[derive(Debug, Clone)]
pub struct ObstacleSpawner {
    settings: SpawnSettings,
    /// Chance that a new pair is a special one (0 disables)
    special_chance: f32,
    /// Seconds until the next spawn
    until_next: f32,
    next_id: EntityId,
    rng: StdRng,
}

impl ObstacleSpawner {
    pub fn new(settings: SpawnSettings, rng: StdRng) -> Self {
        Self {
            settings,
            special_chance: 0.0,
            until_next: 0.0,
            next_id: 1,
            rng,
        }
    }

    pub fn with_seed(settings: SpawnSettings, seed: u64) -> Self {
        Self::new(settings, StdRng::seed_from_u64(seed))
    }

    pub fn with_special_chance(mut self, chance: f32) -> Self {
        self.special_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn settings(&self) -> SpawnSettings {
        self.settings
    }

    /// Advance the timer; returns the pairs spawned during this tick
    pub fn tick(&mut self, dt: f32, field: &PlayField) -> Vec<ObstaclePair> {
        let mut spawned = Vec::new();
        self.until_next -= dt;
        // A long frame may owe more than one pair
        while self.until_next <= 0.0 {
            spawned.push(self.spawn(field));
            self.until_next += self.settings.interval;
        }
        spawned
    }

    /// Create one pair at the leading edge with a random gap center
    pub fn spawn(&mut self, field: &PlayField) -> ObstaclePair {
        let (low, high) = field.gap_center_range(self.settings.gap);
        let gap_center = if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        };

        let id = self.next_id;
        self.next_id += 1;

        let mut pair = ObstaclePair::new(
            id,
            field.width + obstacle::WIDTH,
            gap_center,
            self.settings.gap,
            self.settings.speed,
        );

        if self.special_chance > 0.0 && self.rng.gen::<f32>() < self.special_chance {
            pair.special = Some(self.pick_special(gap_center, low, high));
        }

        pair
    }

    /// One of the four special kinds, uniformly
    fn pick_special(&mut self, gap_center: f32, low: f32, high: f32) -> SpecialPair {
        match self.rng.gen_range(0..4) {
            0 => {
                // Keep the swing inside the allowed band
                let room = (gap_center - low).min(high - gap_center);
                SpecialPair::Moving(GapOscillation {
                    base_center: gap_center,
                    amplitude: obstacle::MOVING_GAP_AMPLITUDE.min(room),
                    period: obstacle::MOVING_GAP_PERIOD,
                    elapsed: 0.0,
                })
            }
            1 => SpecialPair::Sizing(GapPulse {
                base_height: self.settings.gap,
                growth: obstacle::SIZING_GAP_GROWTH,
                period: obstacle::SIZING_GAP_PERIOD,
                elapsed: 0.0,
            }),
            2 => SpecialPair::Ghost,
            _ => SpecialPair::Reward { collected: false },
        }
    }
}

/// Move every pair and drop those past the trailing edge
///
/// Returns how many pairs were removed.
pub fn advance_obstacles(obstacles: &mut Vec<ObstaclePair>, dt: f32) -> usize {
    for pair in obstacles.iter_mut() {
        pair.advance(dt);
    }
    let before = obstacles.len();
    obstacles.retain(|p| !p.is_off_screen());
    before - obstacles.len()
}
