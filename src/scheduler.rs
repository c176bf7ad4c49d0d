//! Temporal scheduler.
//!
//! A tick-driven state machine deciding when swipes happen and whether a like
//! tap is slotted into the gap between two swipes. Gestures run through a
//! `GestureCursor`, so a tick never blocks: it emits at most one frame.

use crate::config::GestureConfig;
use crate::executor::{plan_swipe, plan_tap, CursorStatus, GestureCursor};
use crate::geometry::{jitter, RandomSource};
use crate::network::NetworkReadiness;
use crate::synth::{synthesize_like, synthesize_swipe};
use crate::transport::{ActivitySink, HidTransport};
use tracing::{debug, info};

/// Longest sleep between ticks while nothing is due.
pub const IDLE_POLL_MS: u64 = 100;

/// Slack a due like needs before the next swipe to still fire.
const LIKE_SLACK_MS: u64 = 40;

/// Earliest a like may be placed, relative to now.
const LIKE_LEAD_MS: u64 = 20;

/// Narrowest usable like window.
const MIN_WINDOW_MS: u64 = 20;

/// Extra room beyond both edge buffers an interval needs to hold a like.
const LIKE_ROOM_MS: u64 = 120;

/// Scheduler state for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Disabled or not ready; no timers set.
    Idle,
    /// A next swipe time is set.
    Armed,
    /// A gesture is being emitted.
    Executing,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "Idle",
            SchedulerState::Armed => "Armed",
            SchedulerState::Executing => "Executing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Swipe,
    Like,
}

/// Which window a like was placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeWindow {
    /// After the previous swipe ended.
    Trailing,
    /// Before the next swipe starts.
    Leading,
}

/// A resolved like placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikePlacement {
    pub window: LikeWindow,
    pub at: u64,
}

/// Timers and guard owned by the scheduler. Times are milliseconds on the
/// daemon's monotonic clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleState {
    pub next_swipe_at: Option<u64>,
    pub next_like_at: Option<u64>,
    pub last_swipe_ended_at: Option<u64>,
    pub swipe_in_flight: bool,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// Disabled or not ready; timers were cleared.
    Suspended,
    /// A new swipe time was chosen.
    Scheduled {
        next_swipe_at: u64,
        next_like_at: Option<u64>,
    },
    /// Nothing due.
    Idle,
    /// A gesture began and its first frame was emitted.
    Started(GestureKind),
    /// An in-flight gesture emitted a frame.
    Stepped(GestureKind),
    /// An in-flight gesture is between frames.
    Waiting(GestureKind),
    /// The last frame of a gesture was emitted.
    Completed(GestureKind),
}

struct ActiveGesture {
    kind: GestureKind,
    cursor: GestureCursor,
}

/// Swipe and like scheduler.
pub struct Scheduler<R: RandomSource> {
    rng: R,
    state: ScheduleState,
    active: Option<ActiveGesture>,
}

impl<R: RandomSource> Scheduler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            state: ScheduleState::default(),
            active: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.active.is_some() {
            SchedulerState::Executing
        } else if self.state.next_swipe_at.is_some() {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    pub fn schedule(&self) -> &ScheduleState {
        &self.state
    }

    #[cfg(test)]
    pub fn active_gesture(&self) -> Option<GestureKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    /// Drop the pending swipe so the next tick reschedules with fresh config.
    pub fn reset_next_swipe(&mut self) {
        self.state.next_swipe_at = None;
        self.state.next_like_at = None;
    }

    fn suspend(&mut self) {
        self.state.next_swipe_at = None;
        self.state.next_like_at = None;
    }

    /// Uniform interval between swipes, `[min, max] * 1000` ms. A max below
    /// min behaves as max = min.
    pub fn random_interval_ms(&mut self, config: &GestureConfig) -> u64 {
        let min = i64::from(config.interval_min_sec.max(0));
        let max = i64::from(config.interval_max_sec).max(min);
        (self.rng.uniform(min, max) as u64) * 1000
    }

    /// Pick the next swipe time and try to slot a like before it.
    pub fn schedule_next(&mut self, now: u64, config: &GestureConfig, connected: bool) -> u64 {
        let next = now + self.random_interval_ms(config);
        self.state.next_swipe_at = Some(next);
        let like = self.schedule_like(now, config, connected);

        debug!(
            "Next swipe in {}ms, like: {}",
            next - now,
            like.map_or_else(|| "none".to_string(), |l| format!("{:?} +{}ms", l.window, l.at - now))
        );
        next
    }

    /// Place at most one like between the previous and the next swipe,
    /// keeping at least the minimum edge buffer from both.
    pub fn schedule_like(
        &mut self,
        now: u64,
        config: &GestureConfig,
        connected: bool,
    ) -> Option<LikePlacement> {
        self.state.next_like_at = None;

        if !config.double_tap_enabled || !connected {
            return None;
        }
        let next = self.state.next_swipe_at?;
        if next <= now {
            return None;
        }

        let edge_min = config.double_tap_edge_min_ms.max(0) as u64;
        let edge_max = (config.double_tap_edge_max_ms.max(0) as u64).max(edge_min);
        if next - now <= edge_min + edge_max + LIKE_ROOM_MS {
            return None;
        }

        let probability = jitter(
            &mut self.rng,
            config.double_tap_prob_percent,
            config.double_tap_prob_jitter_percent,
            0,
            100,
        );
        if self.rng.uniform(0, 99) >= i64::from(probability) {
            return None;
        }

        let earliest = now + LIKE_LEAD_MS;
        let latest = next - edge_min;
        let mut windows: Vec<(LikeWindow, u64, u64)> = Vec::with_capacity(2);

        if let Some(last) = self.state.last_swipe_ended_at {
            let a = (last + edge_min).max(earliest);
            let b = last + edge_max;
            if b > earliest && a + MIN_WINDOW_MS < b && a < latest {
                let b = b.min(latest);
                if b > a + MIN_WINDOW_MS {
                    windows.push((LikeWindow::Trailing, a, b));
                }
            }
        }

        let a = if next > edge_max {
            next - edge_max
        } else {
            earliest
        };
        let b = latest;
        if b > now + LIKE_SLACK_MS && b > a + MIN_WINDOW_MS {
            let a = a.max(earliest);
            if b > a + MIN_WINDOW_MS {
                windows.push((LikeWindow::Leading, a, b));
            }
        }

        if windows.is_empty() {
            return None;
        }

        let pick = self.rng.uniform(0, windows.len() as i64 - 1) as usize;
        let (window, a, b) = windows[pick.min(windows.len() - 1)];
        let at = self.rng.uniform(a as i64, b as i64) as u64;
        self.state.next_like_at = Some(at);
        Some(LikePlacement { window, at })
    }

    fn start_gesture(
        &mut self,
        kind: GestureKind,
        now: u64,
        config: &GestureConfig,
        transport: &mut dyn HidTransport,
        activity: &dyn ActivitySink,
    ) -> TickEvent {
        let plan = match kind {
            GestureKind::Swipe => {
                let swipe = synthesize_swipe(config, &mut self.rng);
                let plan = plan_swipe(&swipe, &mut self.rng);
                info!(
                    "Swipe ({},{}) -> ({},{}) over {}ms, {} frames in {}ms",
                    swipe.start.x,
                    swipe.start.y,
                    swipe.end.x,
                    swipe.end.y,
                    swipe.duration_ms,
                    plan.len(),
                    plan.total_ms()
                );
                plan
            }
            GestureKind::Like => {
                let tap = synthesize_like(config, &mut self.rng);
                let plan = plan_tap(&tap);
                info!(
                    "Like tap at ({},{}), {} frames in {}ms",
                    tap.point.x,
                    tap.point.y,
                    plan.len(),
                    plan.total_ms()
                );
                plan
            }
        };

        let mut cursor = GestureCursor::start(plan, now);
        self.state.swipe_in_flight = true;
        match cursor.advance(now, transport, activity) {
            CursorStatus::Finished => self.finish_gesture(kind, now, config, transport),
            _ => {
                self.active = Some(ActiveGesture { kind, cursor });
                TickEvent::Started(kind)
            }
        }
    }

    fn finish_gesture(
        &mut self,
        kind: GestureKind,
        now: u64,
        config: &GestureConfig,
        transport: &dyn HidTransport,
    ) -> TickEvent {
        self.active = None;
        self.state.swipe_in_flight = false;
        if kind == GestureKind::Swipe {
            self.state.last_swipe_ended_at = Some(now);
            self.schedule_next(now, config, transport.is_connected());
        }
        TickEvent::Completed(kind)
    }

    /// Advance the state machine by one step at `now`.
    pub fn tick(
        &mut self,
        now: u64,
        config: &GestureConfig,
        transport: &mut dyn HidTransport,
        network: &dyn NetworkReadiness,
        activity: &dyn ActivitySink,
    ) -> TickEvent {
        if let Some(active) = self.active.as_mut() {
            let kind = active.kind;
            return match active.cursor.advance(now, transport, activity) {
                CursorStatus::Waiting { .. } => TickEvent::Waiting(kind),
                CursorStatus::Emitted { .. } => TickEvent::Stepped(kind),
                CursorStatus::Finished => self.finish_gesture(kind, now, config, transport),
            };
        }

        if !config.enabled || !network.is_network_ready() || !transport.is_connected() {
            if self.state.next_swipe_at.is_some() {
                debug!("Scheduling suspended");
            }
            self.suspend();
            return TickEvent::Suspended;
        }

        let Some(next_swipe) = self.state.next_swipe_at else {
            let next_swipe_at = self.schedule_next(now, config, true);
            return TickEvent::Scheduled {
                next_swipe_at,
                next_like_at: self.state.next_like_at,
            };
        };

        if let Some(like_at) = self.state.next_like_at {
            if now >= like_at && now + LIKE_SLACK_MS < next_swipe {
                self.state.next_like_at = None;
                return self.start_gesture(GestureKind::Like, now, config, transport, activity);
            }
        }

        if now >= next_swipe {
            return self.start_gesture(GestureKind::Swipe, now, config, transport, activity);
        }

        TickEvent::Idle
    }

    /// Absolute time the next tick should run.
    pub fn next_wakeup(&self, now: u64) -> u64 {
        if let Some(due) = self.active.as_ref().and_then(|a| a.cursor.due_at()) {
            return due;
        }

        [self.state.next_swipe_at, self.state.next_like_at]
            .into_iter()
            .flatten()
            .filter(|&t| t > now)
            .fold(now + IDLE_POLL_MS, u64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::test_support::{MaxRandom, MinRandom};
    use crate::geometry::SeededRandom;
    use crate::protocol::ContactState;
    use crate::transport::{NoActivity, RecordingTransport};
    use proptest::prelude::*;
    use std::sync::atomic::AtomicBool;

    fn config() -> GestureConfig {
        GestureConfig {
            interval_min_sec: 5,
            interval_max_sec: 5,
            ..GestureConfig::default()
        }
    }

    fn ready() -> AtomicBool {
        AtomicBool::new(true)
    }

    /// Tick until the current gesture completes, returning the completion time.
    fn run_gesture<R: RandomSource>(
        scheduler: &mut Scheduler<R>,
        mut now: u64,
        config: &GestureConfig,
        transport: &mut RecordingTransport,
    ) -> u64 {
        while scheduler.active_gesture().is_some() {
            now = scheduler.next_wakeup(now).max(now);
            scheduler.tick(now, config, transport, &ready(), &NoActivity);
        }
        now
    }

    #[test]
    fn test_interval_fixed_range() {
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(3));
        for _ in 0..32 {
            assert_eq!(scheduler.random_interval_ms(&config()), 5000);
        }
    }

    #[test]
    fn test_interval_max_below_min() {
        let cfg = GestureConfig {
            interval_min_sec: 10,
            interval_max_sec: 3,
            ..GestureConfig::default()
        };
        let mut scheduler = Scheduler::new(MaxRandom);
        assert_eq!(scheduler.random_interval_ms(&cfg), 10_000);
    }

    #[test]
    fn test_first_tick_schedules() {
        let mut scheduler = Scheduler::new(MaxRandom);
        let mut transport = RecordingTransport::connected();

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let event = scheduler.tick(1000, &config(), &mut transport, &ready(), &NoActivity);
        assert!(matches!(
            event,
            TickEvent::Scheduled {
                next_swipe_at: 6000,
                ..
            }
        ));
        assert_eq!(scheduler.state(), SchedulerState::Armed);
        assert!(transport.frames.is_empty());
    }

    #[test]
    fn test_not_ready_clears_timers() {
        let mut scheduler = Scheduler::new(MinRandom);
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &config(), &mut transport, &ready(), &NoActivity);
        assert!(scheduler.schedule().next_swipe_at.is_some());

        let offline = AtomicBool::new(false);
        let event = scheduler.tick(10, &config(), &mut transport, &offline, &NoActivity);
        assert_eq!(event, TickEvent::Suspended);
        assert_eq!(scheduler.schedule().next_swipe_at, None);
        assert_eq!(scheduler.schedule().next_like_at, None);

        scheduler.tick(20, &config(), &mut transport, &ready(), &NoActivity);
        assert!(scheduler.schedule().next_swipe_at.is_some());

        let mut disconnected = RecordingTransport::default();
        let event = scheduler.tick(30, &config(), &mut disconnected, &ready(), &NoActivity);
        assert_eq!(event, TickEvent::Suspended);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_disabled_clears_timers() {
        let mut scheduler = Scheduler::new(MinRandom);
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &config(), &mut transport, &ready(), &NoActivity);

        let disabled = GestureConfig {
            enabled: false,
            ..config()
        };
        assert_eq!(
            scheduler.tick(5, &disabled, &mut transport, &ready(), &NoActivity),
            TickEvent::Suspended
        );
        assert_eq!(*scheduler.schedule(), ScheduleState::default());
    }

    #[test]
    fn test_swipe_runs_to_completion_and_reschedules() {
        let cfg = GestureConfig {
            double_tap_enabled: false,
            ..config()
        };
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(11));
        let mut transport = RecordingTransport::connected();

        scheduler.tick(0, &cfg, &mut transport, &ready(), &NoActivity);
        assert_eq!(scheduler.tick(4999, &cfg, &mut transport, &ready(), &NoActivity), TickEvent::Idle);

        let event = scheduler.tick(5000, &cfg, &mut transport, &ready(), &NoActivity);
        assert_eq!(event, TickEvent::Started(GestureKind::Swipe));
        assert!(scheduler.schedule().swipe_in_flight);
        assert_eq!(scheduler.state(), SchedulerState::Executing);
        assert_eq!(transport.frames.len(), 1);
        assert_eq!(transport.frames[0].state, ContactState::Hover);

        let end = run_gesture(&mut scheduler, 5000, &cfg, &mut transport);
        assert!(!scheduler.schedule().swipe_in_flight);
        assert_eq!(scheduler.schedule().last_swipe_ended_at, Some(end));
        assert_eq!(scheduler.schedule().next_swipe_at, Some(end + 5000));
        assert!(end > 5000);

        let states: Vec<ContactState> = transport.frames.iter().map(|f| f.state).collect();
        assert_eq!(states[1], ContactState::Contact);
        assert_eq!(*states.last().unwrap(), ContactState::Hover);
        assert!(states.len() >= 2 + 2 + 1);
    }

    #[test]
    fn test_gesture_completes_after_link_drop() {
        let cfg = GestureConfig {
            double_tap_enabled: false,
            ..config()
        };
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(5));
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &cfg, &mut transport, &ready(), &NoActivity);
        scheduler.tick(5000, &cfg, &mut transport, &ready(), &NoActivity);

        transport.connected = false;
        let end = run_gesture(&mut scheduler, 5000, &cfg, &mut transport);
        assert_eq!(transport.frames.len(), 1);
        assert_eq!(scheduler.schedule().last_swipe_ended_at, Some(end));

        // the next idle tick notices the dead link
        assert_eq!(
            scheduler.tick(end + 1, &cfg, &mut transport, &ready(), &NoActivity),
            TickEvent::Suspended
        );
    }

    #[test]
    fn test_no_new_gesture_while_in_flight() {
        let cfg = config();
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(9));
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &cfg, &mut transport, &ready(), &NoActivity);
        scheduler.tick(5000, &cfg, &mut transport, &ready(), &NoActivity);
        assert_eq!(scheduler.active_gesture(), Some(GestureKind::Swipe));

        // a like that is due and the next swipe both in the past
        scheduler.state.next_like_at = Some(5001);
        scheduler.state.next_swipe_at = Some(5001);
        for now in 5001..5020 {
            let event = scheduler.tick(now, &cfg, &mut transport, &ready(), &NoActivity);
            assert!(!matches!(event, TickEvent::Started(_)), "started {:?} at {}", event, now);
            assert_eq!(scheduler.active_gesture(), Some(GestureKind::Swipe));
        }
    }

    #[test]
    fn test_like_fires_before_swipe() {
        let cfg = config();
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(21));
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &cfg, &mut transport, &ready(), &NoActivity);
        scheduler.state.next_like_at = Some(2000);

        assert_eq!(scheduler.tick(1999, &cfg, &mut transport, &ready(), &NoActivity), TickEvent::Idle);
        assert_eq!(
            scheduler.tick(2000, &cfg, &mut transport, &ready(), &NoActivity),
            TickEvent::Started(GestureKind::Like)
        );
        assert_eq!(scheduler.schedule().next_like_at, None);

        let end = run_gesture(&mut scheduler, 2000, &cfg, &mut transport);
        // likes do not move the swipe timer
        assert_eq!(scheduler.schedule().next_swipe_at, Some(5000));
        assert_eq!(scheduler.schedule().last_swipe_ended_at, None);
        assert!(end < 5000);

        let presses = transport
            .frames
            .iter()
            .filter(|f| f.state == ContactState::Contact)
            .count();
        assert_eq!(presses, 2);
    }

    #[test]
    fn test_like_needs_slack_before_swipe() {
        let cfg = config();
        let mut scheduler = Scheduler::new(SeededRandom::from_seed(2));
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &cfg, &mut transport, &ready(), &NoActivity);
        scheduler.state.next_like_at = Some(4970);

        assert_eq!(scheduler.tick(4970, &cfg, &mut transport, &ready(), &NoActivity), TickEvent::Idle);
        assert_eq!(
            scheduler.tick(5000, &cfg, &mut transport, &ready(), &NoActivity),
            TickEvent::Started(GestureKind::Swipe)
        );
    }

    #[test]
    fn test_double_tap_disabled_never_schedules_like() {
        let cfg = GestureConfig {
            double_tap_enabled: false,
            double_tap_prob_percent: 100,
            ..config()
        };
        let mut scheduler = Scheduler::new(MinRandom);
        scheduler.state.next_swipe_at = Some(60_000);
        scheduler.state.last_swipe_ended_at = Some(0);
        assert_eq!(scheduler.schedule_like(0, &cfg, true), None);
        assert_eq!(scheduler.schedule().next_like_at, None);
    }

    #[test]
    fn test_like_skipped_when_disconnected() {
        let mut scheduler = Scheduler::new(MinRandom);
        scheduler.state.next_swipe_at = Some(60_000);
        assert_eq!(scheduler.schedule_like(0, &config(), false), None);
    }

    #[test]
    fn test_like_needs_room() {
        // edge 400 + 1200 + 120 = 1720
        let mut scheduler = Scheduler::new(MinRandom);
        scheduler.state.next_swipe_at = Some(1720);
        assert_eq!(scheduler.schedule_like(0, &config(), true), None);

        scheduler.state.next_swipe_at = Some(1721);
        assert!(scheduler.schedule_like(0, &config(), true).is_some());
    }

    #[test]
    fn test_like_probability_gate() {
        // MaxRandom draws 99, above any probability below 100
        let mut scheduler = Scheduler::new(MaxRandom);
        scheduler.state.next_swipe_at = Some(10_000);
        assert_eq!(scheduler.schedule_like(0, &config(), true), None);

        let certain = GestureConfig {
            double_tap_prob_percent: 100,
            double_tap_prob_jitter_percent: 0,
            ..config()
        };
        assert!(scheduler.schedule_like(0, &certain, true).is_some());
    }

    #[test]
    fn test_like_windows_min_random() {
        // MinRandom always picks the first window and its lower edge.
        let mut scheduler = Scheduler::new(MinRandom);
        scheduler.state.last_swipe_ended_at = Some(0);
        scheduler.state.next_swipe_at = Some(5000);
        let like = scheduler.schedule_like(0, &config(), true).unwrap();
        assert_eq!(like, LikePlacement { window: LikeWindow::Trailing, at: 400 });

        // Without a previous swipe only the leading window exists.
        scheduler.state.last_swipe_ended_at = None;
        let like = scheduler.schedule_like(0, &config(), true).unwrap();
        assert_eq!(like, LikePlacement { window: LikeWindow::Leading, at: 3800 });
        assert_eq!(scheduler.schedule().next_like_at, Some(3800));
    }

    #[test]
    fn test_next_wakeup() {
        let mut scheduler = Scheduler::new(MinRandom);
        assert_eq!(scheduler.next_wakeup(0), IDLE_POLL_MS);

        scheduler.state.next_swipe_at = Some(50);
        assert_eq!(scheduler.next_wakeup(0), 50);

        scheduler.state.next_like_at = Some(30);
        assert_eq!(scheduler.next_wakeup(0), 30);

        // stale timers fall back to the idle poll
        assert_eq!(scheduler.next_wakeup(60), 60 + IDLE_POLL_MS);
    }

    #[test]
    fn test_reset_next_swipe() {
        let mut scheduler = Scheduler::new(MinRandom);
        let mut transport = RecordingTransport::connected();
        scheduler.tick(0, &config(), &mut transport, &ready(), &NoActivity);
        scheduler.reset_next_swipe();
        assert_eq!(scheduler.schedule().next_swipe_at, None);
        assert!(matches!(
            scheduler.tick(100, &config(), &mut transport, &ready(), &NoActivity),
            TickEvent::Scheduled { next_swipe_at: 5100, .. }
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn prop_interval_within_bounds(
            min in 1i32..=120,
            max in 0i32..=300,
            seed in any::<u64>(),
        ) {
            let cfg = GestureConfig {
                interval_min_sec: min,
                interval_max_sec: max,
                ..GestureConfig::default()
            };
            let mut scheduler = Scheduler::new(SeededRandom::from_seed(seed));
            let interval = scheduler.random_interval_ms(&cfg);
            let hi = max.max(min) as u64 * 1000;
            prop_assert!(interval >= min as u64 * 1000 && interval <= hi);
            prop_assert_eq!(interval % 1000, 0);
        }

        #[test]
        fn prop_like_never_collides(
            now in 0u64..1_000_000,
            ended_ago in proptest::option::of(0u64..5000),
            interval in 0u64..60_000,
            edge_min in 100i32..=2000,
            edge_extra in 50i32..=3000,
            prob in 0i32..=100,
            seed in any::<u64>(),
        ) {
            let cfg = GestureConfig {
                double_tap_prob_percent: prob,
                double_tap_edge_min_ms: edge_min,
                double_tap_edge_max_ms: edge_min + edge_extra,
                ..GestureConfig::default()
            };
            let mut scheduler = Scheduler::new(SeededRandom::from_seed(seed));
            let next = now + interval;
            let last = ended_ago.map(|ago| now.saturating_sub(ago));
            scheduler.state.next_swipe_at = Some(next);
            scheduler.state.last_swipe_ended_at = last;

            let placed = scheduler.schedule_like(now, &cfg, true);
            let edge_min = edge_min as u64;
            let edge_max = (edge_min as i32 + edge_extra) as u64;

            if interval <= edge_min + edge_max + 120 {
                prop_assert!(placed.is_none());
            }
            prop_assert_eq!(placed.map(|p| p.at), scheduler.schedule().next_like_at);

            if let Some(like) = placed {
                prop_assert!(like.at >= now + 20);
                prop_assert!(next - like.at >= edge_min);
                match like.window {
                    LikeWindow::Trailing => {
                        let last = last.unwrap();
                        prop_assert!(like.at - last >= edge_min);
                        prop_assert!(like.at - last <= edge_max);
                    }
                    LikeWindow::Leading => {
                        prop_assert!(next - like.at <= edge_max);
                    }
                }
            }
        }

        #[test]
        fn prop_at_most_one_gesture_in_flight(seed in any::<u64>(), steps in 50usize..400) {
            let cfg = GestureConfig {
                interval_min_sec: 1,
                interval_max_sec: 2,
                double_tap_prob_percent: 100,
                double_tap_edge_min_ms: 100,
                double_tap_edge_max_ms: 150,
                ..GestureConfig::default()
            };
            let mut scheduler = Scheduler::new(SeededRandom::from_seed(seed));
            let mut transport = RecordingTransport::connected();
            let mut now = 0;
            let mut in_flight: Option<GestureKind> = None;

            for _ in 0..steps {
                match scheduler.tick(now, &cfg, &mut transport, &ready(), &NoActivity) {
                    TickEvent::Started(kind) => {
                        prop_assert!(in_flight.is_none(), "{:?} started during {:?}", kind, in_flight);
                        in_flight = Some(kind);
                    }
                    TickEvent::Completed(kind) => {
                        prop_assert_eq!(in_flight, Some(kind));
                        in_flight = None;
                    }
                    _ => {}
                }
                prop_assert_eq!(scheduler.schedule().swipe_in_flight, in_flight.is_some());
                now = scheduler.next_wakeup(now).max(now + 1);
            }
        }
    }
}
