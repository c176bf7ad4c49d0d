//! Gesture executor.
//!
//! A gesture is compiled into a `GesturePlan`, an ordered list of frames each
//! preceded by a wait. A `GestureCursor` replays the plan one step at a time
//! so the control loop never blocks on inter-frame delays.

use crate::geometry::{Point, RandomSource};
use crate::protocol::{map_to_protocol, saturate, Frame};
use crate::synth::{ActionOptions, SwipeAction, TapAction};
use crate::transport::{ActivitySink, HidTransport};

/// Step interval used when a plan is built with a zero interval.
const FALLBACK_STEP_MS: u32 = 10;

/// One frame and the wait that precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    pub wait_ms: u32,
    pub frame: Frame,
}

/// Ordered frame sequence for one gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GesturePlan {
    steps: Vec<PlannedStep>,
    /// Quiet period after the last frame before the gesture counts as done.
    settle_ms: u32,
}

impl GesturePlan {
    fn push(&mut self, wait_ms: u32, frame: Frame) {
        self.steps.push(PlannedStep { wait_ms, frame });
    }

    #[cfg(test)]
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[cfg(test)]
    pub fn settle_ms(&self) -> u32 {
        self.settle_ms
    }

    /// Time from the first frame until the gesture completes.
    pub fn total_ms(&self) -> u64 {
        let waits: u64 = self.steps.iter().skip(1).map(|s| u64::from(s.wait_ms)).sum();
        waits + u64::from(self.settle_ms)
    }
}

fn to_protocol(p: Point, opts: &ActionOptions) -> (u16, u16) {
    (
        map_to_protocol(p.x, opts.screen_w),
        map_to_protocol(p.y, opts.screen_h),
    )
}

/// Tap: hover at the target, then `count` press/release pairs separated by
/// the inter-tap gap, then the release cooldown. With a double-check delay a
/// redundant release follows the cooldown.
pub fn plan_tap(tap: &TapAction) -> GesturePlan {
    let opts = &tap.options;
    let (x, y) = to_protocol(tap.point, opts);
    let count = tap.count.max(1);
    let mut plan = GesturePlan::default();

    plan.push(0, Frame::hover(x, y));
    for i in 0..count {
        let wait = if i == 0 {
            opts.delay_hover
        } else {
            opts.delay_inter_tap
        };
        plan.push(wait, Frame::contact(x, y));
        plan.push(opts.delay_press, Frame::hover(x, y));
    }

    if opts.delay_double_check > 0 {
        plan.push(
            opts.delay_release + opts.delay_double_check,
            Frame::hover(x, y),
        );
    } else {
        plan.settle_ms = opts.delay_release;
    }

    plan
}

/// Quadratic Bezier control point: segment midpoint pushed perpendicular to
/// the dominant axis by `distance * curve_strength / 100`.
pub fn control_point(
    from: (i64, i64),
    to: (i64, i64),
    curve_strength: u32,
    negative: bool,
) -> (i64, i64) {
    let (x1, y1) = from;
    let (x2, y2) = to;
    let mid = ((x1 + x2) / 2, (y1 + y2) / 2);
    let dist = (((x2 - x1) as f64).powi(2) + ((y2 - y1) as f64).powi(2)).sqrt();
    let mut offset = (dist * f64::from(curve_strength) / 100.0) as i64;
    if negative {
        offset = -offset;
    }

    if (x2 - x1).abs() < (y2 - y1).abs() {
        (mid.0 + offset, mid.1)
    } else {
        (mid.0, mid.1 + offset)
    }
}

/// Point at parameter `t` on the quadratic curve `p0 -> c -> p1`.
pub fn bezier_point(p0: (i64, i64), c: (i64, i64), p1: (i64, i64), t: f32) -> (i64, i64) {
    let u = 1.0 - t;
    let tt = t * t;
    let uu = u * u;
    let x = uu * p0.0 as f32 + 2.0 * u * t * c.0 as f32 + tt * p1.0 as f32;
    let y = uu * p0.1 as f32 + 2.0 * u * t * c.1 as f32 + tt * p1.1 as f32;
    (x as i64, y as i64)
}

/// Swipe: hover and press at the start, walk the curve in
/// `max(2, duration / interval)` contact steps, release at the end, then an
/// optional redundant release. The bend direction is drawn from `rng`.
pub fn plan_swipe(swipe: &SwipeAction, rng: &mut dyn RandomSource) -> GesturePlan {
    let opts = &swipe.options;
    let (sx, sy) = to_protocol(swipe.start, opts);
    let (ex, ey) = to_protocol(swipe.end, opts);
    let p0 = (i64::from(sx), i64::from(sy));
    let p1 = (i64::from(ex), i64::from(ey));

    let negative = rng.uniform(0, 1) == 0;
    let ctrl = control_point(p0, p1, opts.curve_strength, negative);

    let step_ms = if opts.delay_interval == 0 {
        FALLBACK_STEP_MS
    } else {
        opts.delay_interval
    };
    let steps = (swipe.duration_ms / step_ms).max(2);

    let mut plan = GesturePlan::default();
    plan.push(0, Frame::hover(sx, sy));
    plan.push(opts.delay_hover, Frame::contact(sx, sy));

    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let (cx, cy) = bezier_point(p0, ctrl, p1, t);
        let wait = if i == 1 { opts.delay_press } else { step_ms };
        plan.push(wait, Frame::contact(saturate(cx), saturate(cy)));
    }

    plan.push(step_ms, Frame::hover(ex, ey));
    if opts.delay_double_check > 0 {
        plan.push(opts.delay_double_check, Frame::hover(ex, ey));
    }

    plan
}

/// Progress of a cursor after one advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    /// The next step is not due yet.
    Waiting { due_at: u64 },
    /// A step was emitted and more remain.
    Emitted { next_due_at: u64 },
    /// The last step was emitted.
    Finished,
}

/// Replays a plan against a transport, one step per advance.
#[derive(Debug, Clone)]
pub struct GestureCursor {
    plan: GesturePlan,
    index: usize,
    due_at: u64,
    finished: bool,
}

impl GestureCursor {
    /// Start a cursor whose first step is due `plan[0].wait_ms` after `now`.
    pub fn start(plan: GesturePlan, now: u64) -> Self {
        let first_wait = plan.steps.first().map_or(0, |s| u64::from(s.wait_ms));
        let finished = plan.is_empty() && plan.settle_ms == 0;
        let due_at = if plan.is_empty() {
            now + u64::from(plan.settle_ms)
        } else {
            now + first_wait
        };
        Self {
            plan,
            index: 0,
            due_at,
            finished,
        }
    }

    /// Absolute time of the next step or of completion, while unfinished.
    pub fn due_at(&self) -> Option<u64> {
        (!self.finished).then_some(self.due_at)
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Frames emitted so far.
    #[cfg(test)]
    pub fn emitted(&self) -> usize {
        self.index
    }

    /// Emit the next step if it is due. Sends to a disconnected transport
    /// are no-ops but still consume the step so timing completes.
    pub fn advance(
        &mut self,
        now: u64,
        transport: &mut dyn HidTransport,
        activity: &dyn ActivitySink,
    ) -> CursorStatus {
        if self.finished {
            return CursorStatus::Finished;
        }
        if now < self.due_at {
            return CursorStatus::Waiting {
                due_at: self.due_at,
            };
        }

        let Some(step) = self.plan.steps.get(self.index).copied() else {
            // settle period elapsed
            self.finished = true;
            return CursorStatus::Finished;
        };

        if transport.is_connected() && transport.send_frame(step.frame) {
            activity.notify_activity();
        }
        self.index += 1;

        let next_wait = match self.plan.steps.get(self.index) {
            Some(next) => next.wait_ms,
            None if self.plan.settle_ms > 0 => self.plan.settle_ms,
            None => {
                self.finished = true;
                return CursorStatus::Finished;
            }
        };
        self.due_at = now + u64::from(next_wait);
        CursorStatus::Emitted {
            next_due_at: self.due_at,
        }
    }
}
