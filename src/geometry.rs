//! Geometry and jitter utilities.
//!
//! Pure helpers shared by the motion synthesizer and the scheduler, plus the
//! injectable uniform-integer source every random draw goes through.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform integer generator. `uniform(lo, hi)` is inclusive of both bounds.
pub trait RandomSource {
    fn uniform(&mut self, lo: i64, hi: i64) -> i64;
}

/// `RandomSource` backed by a seedable standard RNG.
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a source seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a source with a fixed seed (deterministic tests).
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }
}

/// A point in device pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = (i64::from(other.x) - i64::from(self.x)) as f64;
        let dy = (i64::from(other.y) - i64::from(self.y)) as f64;
        (dx * dx + dy * dy).sqrt() as f32
    }
}

/// Axis-aligned rectangle built from two arbitrary corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Rect {
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Width floored at 8px so degenerate rectangles still produce motion.
    pub fn width(&self) -> i32 {
        span(self.min_x, self.max_x)
    }

    /// Height floored at 8px.
    pub fn height(&self) -> i32 {
        span(self.min_y, self.max_y)
    }

    pub fn center(&self) -> Point {
        Point::new(
            midpoint(self.min_x, self.max_x),
            midpoint(self.min_y, self.max_y),
        )
    }

    pub fn clamp_point(&self, p: Point) -> Point {
        Point::new(
            clamp_int(p.x, self.min_x, self.max_x),
            clamp_int(p.y, self.min_y, self.max_y),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }
}

fn span(lo: i32, hi: i32) -> i32 {
    to_i32(i64::from(hi) - i64::from(lo)).max(8)
}

fn midpoint(a: i32, b: i32) -> i32 {
    to_i32((i64::from(a) + i64::from(b)) / 2)
}

/// Narrow to `i32`, saturating at the type's bounds.
pub fn to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Clamp to `[lo, hi]`. When `lo > hi` the lower bound wins.
pub fn clamp_int(val: i32, lo: i32, hi: i32) -> i32 {
    val.min(hi).max(lo)
}

/// Jitter spread for a base value: `round(base * pct / 100)`, half-up.
pub fn jitter_delta(base: i32, pct: i32) -> i32 {
    let delta = (i64::from(base) * i64::from(pct) + 50) / 100;
    delta.unsigned_abs().min(i32::MAX as u64) as i32
}

/// Symmetric percentage jitter around `base`, clamped to `[lo, hi]`.
pub fn jitter(rng: &mut dyn RandomSource, base: i32, pct: i32, lo: i32, hi: i32) -> i32 {
    let delta = i64::from(jitter_delta(base, pct));
    let value = i64::from(base) + rng.uniform(-delta, delta);
    value.clamp(i64::from(lo), i64::from(hi).max(i64::from(lo))) as i32
}

/// `base` moved by a uniform offset in `[-spread, spread]`.
pub fn random_around(rng: &mut dyn RandomSource, base: i32, spread: i32) -> i32 {
    let spread = i64::from(spread).abs();
    to_i32(i64::from(base) + rng.uniform(-spread, spread))
}

/// A point offset independently on each axis, then clamped into `bounds`.
pub fn point_around(
    rng: &mut dyn RandomSource,
    center: Point,
    spread_x: i32,
    spread_y: i32,
    bounds: &Rect,
) -> Point {
    let x = random_around(rng, center.x, spread_x);
    let y = random_around(rng, center.y, spread_y);
    bounds.clamp_point(Point::new(x, y))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::RandomSource;

    /// Always returns the lower bound.
    pub struct MinRandom;

    impl RandomSource for MinRandom {
        fn uniform(&mut self, lo: i64, _hi: i64) -> i64 {
            lo
        }
    }

    /// Always returns the upper bound.
    pub struct MaxRandom;

    impl RandomSource for MaxRandom {
        fn uniform(&mut self, _lo: i64, hi: i64) -> i64 {
            hi
        }
    }

    /// Returns the midpoint of the requested range.
    pub struct MidRandom;

    impl RandomSource for MidRandom {
        fn uniform(&mut self, lo: i64, hi: i64) -> i64 {
            lo + (hi - lo) / 2
        }
    }
}
