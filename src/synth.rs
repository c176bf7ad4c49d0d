//! Motion synthesizer.
//!
//! Turns a `GestureConfig` plus a random source into one concrete swipe or
//! tap. All jitter is resolved here, at generation time; the executor only
//! replays already-resolved values.

use crate::config::GestureConfig;
use crate::geometry::{clamp_int, jitter, point_around, to_i32, Point, RandomSource, Rect};

/// Shortest and longest swipe duration the synthesizer emits.
pub const MIN_SWIPE_MS: i32 = 80;
pub const MAX_SWIPE_MS: i32 = 2000;

/// Number of presses in a like tap.
pub const LIKE_TAP_COUNT: u32 = 2;

/// Fully resolved timing for one gesture execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOptions {
    pub screen_w: i32,
    pub screen_h: i32,
    pub delay_hover: u32,
    pub delay_press: u32,
    /// Interval between curve steps.
    pub delay_interval: u32,
    /// Gap between repeated presses of a tap.
    pub delay_inter_tap: u32,
    /// Cooldown after the last press of a tap.
    pub delay_release: u32,
    /// Delay before re-asserting the release; 0 disables it.
    pub delay_double_check: u32,
    /// Bezier bend, percent of the swipe distance.
    pub curve_strength: u32,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            screen_w: 1080,
            screen_h: 2248,
            delay_hover: 20,
            delay_press: 20,
            delay_interval: 10,
            delay_inter_tap: 0,
            delay_release: 20,
            delay_double_check: 20,
            curve_strength: 15,
        }
    }
}

/// Intermediate swipe geometry, kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeGeometry {
    pub rect: Rect,
    /// Target path length in pixels.
    pub target_len: i32,
    /// Start point as drawn, before its positional jitter.
    pub start_anchor: Point,
    /// Start point after positional jitter.
    pub start: Point,
    /// End point before its positional jitter.
    pub end_anchor: Point,
    pub end: Point,
}

/// One concrete swipe ready for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeAction {
    pub start: Point,
    pub end: Point,
    pub duration_ms: u32,
    pub options: ActionOptions,
    pub geometry: SwipeGeometry,
}

/// One concrete tap ready for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapAction {
    pub point: Point,
    pub count: u32,
    pub options: ActionOptions,
}

fn jitter_ms(rng: &mut dyn RandomSource, base: i32, pct: i32, lo: i32, hi: i32) -> u32 {
    jitter(rng, base, pct, lo, hi).max(0) as u32
}

/// Resolve the per-swipe delays and curve strength.
pub fn swipe_options(config: &GestureConfig, rng: &mut dyn RandomSource) -> ActionOptions {
    let pct = config.delay_jitter_percent;
    ActionOptions {
        screen_w: config.screen_w,
        screen_h: config.screen_h,
        delay_hover: jitter_ms(rng, config.delay_hover, pct, 0, 5000),
        delay_press: jitter_ms(rng, config.delay_press, pct, 0, 5000),
        delay_interval: jitter_ms(rng, config.delay_interval, pct, 1, 200).max(2),
        curve_strength: jitter_ms(rng, config.curve_strength, pct, 0, 100),
        delay_double_check: jitter_ms(rng, config.double_check, pct, 0, 5000),
        delay_inter_tap: 0,
        delay_release: 0,
    }
}

/// Resolve the per-tap delays.
pub fn tap_options(config: &GestureConfig, rng: &mut dyn RandomSource) -> ActionOptions {
    let pct = config.delay_jitter_percent;
    ActionOptions {
        screen_w: config.screen_w,
        screen_h: config.screen_h,
        delay_hover: jitter_ms(rng, config.delay_hover, pct, 0, 2000),
        delay_press: jitter_ms(rng, config.delay_press, pct, 0, 2000),
        delay_inter_tap: jitter_ms(
            rng,
            config.double_tap_interval_ms,
            config.double_tap_interval_jitter_percent,
            20,
            1200,
        ),
        delay_double_check: jitter_ms(rng, config.double_check, pct, 0, 2000),
        ..ActionOptions::default()
    }
}

/// Target swipe length: rectangle height scaled by the jittered length
/// factor, which is bounded to `[0.2, 1.2]`; never shorter than 8px.
pub fn target_length(config: &GestureConfig, rect: &Rect, rng: &mut dyn RandomSource) -> i32 {
    let len_pct = config.length_percent as f32 / 100.0;
    let len_jit = config.length_jitter_percent as f32 / 100.0;
    let draw = rng.uniform(-100, 100) as f32 / 100.0;
    let factor = (len_pct * (1.0 + draw * len_jit)).clamp(0.2, 1.2);
    ((rect.height() as f32 * factor) as i32).max(8)
}

/// Swipe geometry. Start sits low enough in the rectangle that the full
/// target length fits above it, so the gesture always travels upward.
pub fn swipe_geometry(config: &GestureConfig, rng: &mut dyn RandomSource) -> SwipeGeometry {
    let rect = config.rect();
    let box_w = rect.width();
    let box_h = rect.height();
    let jitter_x = clamp_int(box_w / 10, 4, 28);
    let jitter_y = clamp_int(box_h / 10, 4, 28);

    let target_len = target_length(config, &rect, rng);

    let start_y_min = rect.min_y.saturating_add(target_len).min(rect.max_y);
    let sx = rng.uniform(i64::from(rect.min_x), i64::from(rect.max_x)) as i32;
    let sy = rng.uniform(i64::from(start_y_min), i64::from(rect.max_y)) as i32;
    let start_anchor = Point::new(sx, sy);
    let start = point_around(rng, start_anchor, jitter_x, jitter_y, &rect);

    let drift_x = i64::from(clamp_int(box_w / 3, 6, 60));
    let ex = to_i32(i64::from(start.x) + rng.uniform(-drift_x, drift_x));
    let end_anchor = rect.clamp_point(Point::new(ex, start.y.saturating_sub(target_len)));
    let end = point_around(rng, end_anchor, jitter_x, jitter_y, &rect);

    SwipeGeometry {
        rect,
        target_len,
        start_anchor,
        start,
        end_anchor,
        end,
    }
}

/// Swipe duration: base plus 0.06ms per pixel travelled, with a
/// percentage swing (at least 10ms), bounded to `[80, 2000]`.
pub fn swipe_duration(
    config: &GestureConfig,
    start: Point,
    end: Point,
    rng: &mut dyn RandomSource,
) -> u32 {
    let base = i64::from(config.duration) + (start.distance_to(end) * 0.06) as i64;
    let swing = ((base as f64 * f64::from(config.duration_jitter_percent) / 100.0) as i64).max(10);
    let value = base + rng.uniform(-swing, swing);
    value.clamp(i64::from(MIN_SWIPE_MS), i64::from(MAX_SWIPE_MS)) as u32
}

/// Synthesize one concrete swipe.
pub fn synthesize_swipe(config: &GestureConfig, rng: &mut dyn RandomSource) -> SwipeAction {
    let options = swipe_options(config, rng);
    let geometry = swipe_geometry(config, rng);
    let duration_ms = swipe_duration(config, geometry.start, geometry.end, rng);

    SwipeAction {
        start: geometry.start,
        end: geometry.end,
        duration_ms,
        options,
        geometry,
    }
}

/// Synthesize one like tap near the centre of the swipe rectangle.
pub fn synthesize_like(config: &GestureConfig, rng: &mut dyn RandomSource) -> TapAction {
    let rect = config.rect();
    let spread_x = clamp_int(rect.width() / 6, 6, 40);
    let spread_y = clamp_int(rect.height() / 6, 6, 40);
    let point = point_around(rng, rect.center(), spread_x, spread_y, &rect);
    debug_assert!(rect.contains(point));

    TapAction {
        point,
        count: LIKE_TAP_COUNT,
        options: tap_options(config, rng),
    }
}
