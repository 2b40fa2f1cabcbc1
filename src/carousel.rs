use std::time::{Duration as StdDuration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Home,
    Charts,
    Log,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Home, Panel::Charts, Panel::Log];

    pub fn next(self) -> Self {
        match self {
            Panel::Home => Panel::Charts,
            Panel::Charts => Panel::Log,
            Panel::Log => Panel::Home,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Home => Panel::Log,
            Panel::Charts => Panel::Home,
            Panel::Log => Panel::Charts,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Panel::Home => "Home",
            Panel::Charts => "Charts",
            Panel::Log => "Log",
        }
    }
}

/// Secondary panels that sit above the rotation and suspend swiping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Settings,
    Add,
    Edit,
}

pub trait PanelNavigator {
    fn go(&mut self, panel: Panel, animated: bool);
    fn can_swipe_now(&self) -> bool;
    /// Live drag offset as a fraction of the viewport width.
    fn swipe_delta(&mut self, ratio: f64);
    fn swipe_end(&mut self, ratio: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Horizontal movement (cells) ignored before a drag starts.
    pub noise_cells: f64,
    /// Vertical movement (rows) treated as scroll intent.
    pub vertical_abort_cells: f64,
    /// Rows are roughly twice as tall as columns are wide.
    pub row_aspect: f64,
    pub commit_ratio: f64,
    pub animation_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            noise_cells: 2.0,
            vertical_abort_cells: 1.0,
            row_aspect: 2.0,
            commit_ratio: 0.2,
            animation_ms: 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// Started inside a protected region; ignored until release.
    Ignored,
    Tracking {
        origin: (f64, f64),
    },
    DraggingHorizontal {
        origin: (f64, f64),
        dx: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Nothing,
    Tracking,
    DragStarted,
    Dragging,
    Committed,
    SnappedBack,
    Aborted,
}

/// Single-pointer swipe recognizer driving a `PanelNavigator`.
#[derive(Debug, Clone)]
pub struct SwipeGesture {
    config: GestureConfig,
    state: GestureState,
}

impl SwipeGesture {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn touch_start(
        &mut self,
        touches: usize,
        at: (f64, f64),
        in_protected_region: bool,
        nav: &mut impl PanelNavigator,
    ) -> GestureOutcome {
        if touches > 1 {
            return self.abort(nav);
        }
        if !matches!(self.state, GestureState::Idle) {
            return GestureOutcome::Nothing;
        }
        if in_protected_region {
            self.state = GestureState::Ignored;
            return GestureOutcome::Nothing;
        }
        if !nav.can_swipe_now() {
            return GestureOutcome::Nothing;
        }

        self.state = GestureState::Tracking { origin: at };
        GestureOutcome::Tracking
    }

    pub fn touch_move(
        &mut self,
        touches: usize,
        at: (f64, f64),
        viewport_width: f64,
        nav: &mut impl PanelNavigator,
    ) -> GestureOutcome {
        let origin = match self.state {
            GestureState::Idle | GestureState::Ignored => return GestureOutcome::Nothing,
            GestureState::Tracking { origin } | GestureState::DraggingHorizontal { origin, .. } => origin,
        };
        if touches > 1 || !nav.can_swipe_now() {
            return self.abort(nav);
        }

        let dx = at.0 - origin.0;
        let dy = (at.1 - origin.1) * self.config.row_aspect;
        let vertical_intent = dy.abs() > self.config.vertical_abort_cells * self.config.row_aspect
            && dy.abs() > dx.abs();
        if vertical_intent {
            return self.abort(nav);
        }

        let ratio = drag_ratio(dx, viewport_width);
        match self.state {
            GestureState::Tracking { .. } => {
                if dx.abs() > self.config.noise_cells && dx.abs() > dy.abs() {
                    self.state = GestureState::DraggingHorizontal { origin, dx };
                    nav.swipe_delta(ratio);
                    GestureOutcome::DragStarted
                } else {
                    GestureOutcome::Tracking
                }
            }
            GestureState::DraggingHorizontal { .. } => {
                self.state = GestureState::DraggingHorizontal { origin, dx };
                nav.swipe_delta(ratio);
                GestureOutcome::Dragging
            }
            GestureState::Idle | GestureState::Ignored => GestureOutcome::Nothing,
        }
    }

    pub fn touch_end(
        &mut self,
        at: (f64, f64),
        viewport_width: f64,
        nav: &mut impl PanelNavigator,
    ) -> GestureOutcome {
        if matches!(self.state, GestureState::DraggingHorizontal { .. }) && !nav.can_swipe_now() {
            return self.abort(nav);
        }

        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        let GestureState::DraggingHorizontal { origin, .. } = state else {
            return GestureOutcome::Nothing;
        };

        let ratio = drag_ratio(at.0 - origin.0, viewport_width);
        nav.swipe_end(ratio);
        if ratio.abs() > self.config.commit_ratio {
            GestureOutcome::Committed
        } else {
            GestureOutcome::SnappedBack
        }
    }

    /// Drops the gesture, snapping back if a drag had begun.
    pub fn abort(&mut self, nav: &mut impl PanelNavigator) -> GestureOutcome {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::DraggingHorizontal { .. } => {
                nav.swipe_end(0.0);
                GestureOutcome::Aborted
            }
            GestureState::Tracking { .. } => GestureOutcome::Aborted,
            GestureState::Idle | GestureState::Ignored => GestureOutcome::Nothing,
        }
    }
}

fn drag_ratio(dx: f64, viewport_width: f64) -> f64 {
    if viewport_width <= 0.0 {
        return 0.0;
    }
    (dx / viewport_width).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SlideAnimation {
    from: f64,
    started: Instant,
    duration: StdDuration,
}

impl SlideAnimation {
    fn offset_at(&self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return None;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - progress).powi(3);
        Some(self.from * (1.0 - eased))
    }
}

/// The three rotating panels plus the overlay stack.
///
/// `offset` is where the current panel sits, in viewport widths; positive
/// values reveal the previous panel on the left.
#[derive(Debug, Clone)]
pub struct PanelTrack {
    current: Panel,
    overlay: Option<Overlay>,
    offset: f64,
    animation: Option<SlideAnimation>,
    commit_ratio: f64,
    animation_duration: StdDuration,
}

impl PanelTrack {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            current: Panel::Home,
            overlay: None,
            offset: 0.0,
            animation: None,
            commit_ratio: config.commit_ratio,
            animation_duration: StdDuration::from_millis(config.animation_ms),
        }
    }

    pub fn current(&self) -> Panel {
        self.current
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        self.overlay = Some(overlay);
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn offset_at(&self, now: Instant) -> f64 {
        match &self.animation {
            Some(animation) => animation.offset_at(now).unwrap_or(0.0),
            None => self.offset,
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|animation| animation.offset_at(now).is_some())
    }

    /// Drops a finished animation. Returns whether the track still moves.
    pub fn settle(&mut self, now: Instant) -> bool {
        if let Some(animation) = &self.animation {
            if animation.offset_at(now).is_none() {
                self.animation = None;
                self.offset = 0.0;
            }
        }
        self.animation.is_some()
    }

    fn animate_from(&mut self, from: f64) {
        self.offset = from;
        self.animation = Some(SlideAnimation {
            from,
            started: Instant::now(),
            duration: self.animation_duration,
        });
    }
}

impl PanelNavigator for PanelTrack {
    fn go(&mut self, panel: Panel, animated: bool) {
        if panel == self.current {
            return;
        }
        let from = if panel == self.current.next() { 1.0 } else { -1.0 };
        self.current = panel;
        if animated {
            self.animate_from(from);
        } else {
            self.offset = 0.0;
            self.animation = None;
        }
    }

    fn can_swipe_now(&self) -> bool {
        self.overlay.is_none()
    }

    fn swipe_delta(&mut self, ratio: f64) {
        self.animation = None;
        self.offset = ratio.clamp(-1.0, 1.0);
    }

    fn swipe_end(&mut self, ratio: f64) {
        let ratio = ratio.clamp(-1.0, 1.0);
        let from = if ratio < -self.commit_ratio {
            self.current = self.current.next();
            1.0 + ratio
        } else if ratio > self.commit_ratio {
            self.current = self.current.prev();
            ratio - 1.0
        } else {
            ratio
        };
        log::debug!("swipe released at {ratio:.2}, now on {}", self.current.title());
        self.animate_from(from);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration as StdDuration, Instant};

    use super::{
        GestureConfig, GestureOutcome, GestureState, Overlay, Panel, PanelNavigator, PanelTrack,
        SwipeGesture,
    };

    const WIDTH: f64 = 100.0;

    fn setup() -> (SwipeGesture, PanelTrack) {
        let config = GestureConfig::default();
        (SwipeGesture::new(config), PanelTrack::new(&config))
    }

    fn drag(gesture: &mut SwipeGesture, track: &mut PanelTrack, from_x: f64, to_x: f64) -> GestureOutcome {
        gesture.touch_start(1, (from_x, 10.0), false, track);
        let mid = (from_x + to_x) / 2.0;
        gesture.touch_move(1, (mid, 10.0), WIDTH, track);
        gesture.touch_move(1, (to_x, 10.0), WIDTH, track);
        gesture.touch_end((to_x, 10.0), WIDTH, track)
    }

    #[test]
    fn left_swipes_rotate_forward_and_wrap() {
        let (mut gesture, mut track) = setup();
        let mut seen = Vec::new();
        for _ in 0..3 {
            assert_eq!(drag(&mut gesture, &mut track, 80.0, 50.0), GestureOutcome::Committed);
            seen.push(track.current());
        }
        assert_eq!(seen, vec![Panel::Charts, Panel::Log, Panel::Home]);
    }

    #[test]
    fn right_swipe_rotates_backward() {
        let (mut gesture, mut track) = setup();
        assert_eq!(drag(&mut gesture, &mut track, 20.0, 45.0), GestureOutcome::Committed);
        assert_eq!(track.current(), Panel::Log);
    }

    #[test]
    fn short_drag_snaps_back() {
        let (mut gesture, mut track) = setup();
        assert_eq!(drag(&mut gesture, &mut track, 50.0, 35.0), GestureOutcome::SnappedBack);
        assert_eq!(track.current(), Panel::Home);
    }

    #[test]
    fn release_animation_starts_from_drag_offset() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (80.0, 10.0), false, &mut track);
        gesture.touch_move(1, (50.0, 10.0), WIDTH, &mut track);
        let before = Instant::now();
        assert!((track.offset_at(before) + 0.3).abs() < 1e-9);

        gesture.touch_end((50.0, 10.0), WIDTH, &mut track);
        assert_eq!(track.current(), Panel::Charts);
        let started = track.offset_at(Instant::now());
        assert!(started <= 0.7 + 1e-9 && started > 0.5, "offset was {started}");
    }

    #[test]
    fn protected_region_ignores_whole_gesture() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (80.0, 10.0), true, &mut track);
        assert_eq!(gesture.state(), GestureState::Ignored);
        assert_eq!(
            gesture.touch_move(1, (10.0, 10.0), WIDTH, &mut track),
            GestureOutcome::Nothing
        );
        assert_eq!(gesture.touch_end((10.0, 10.0), WIDTH, &mut track), GestureOutcome::Nothing);
        assert_eq!(track.current(), Panel::Home);
        assert_eq!(gesture.state(), GestureState::Idle);
    }

    #[test]
    fn second_touch_aborts_and_snaps_back() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (80.0, 10.0), false, &mut track);
        gesture.touch_move(1, (40.0, 10.0), WIDTH, &mut track);
        assert_eq!(
            gesture.touch_move(2, (30.0, 10.0), WIDTH, &mut track),
            GestureOutcome::Aborted
        );
        assert_eq!(gesture.touch_end((30.0, 10.0), WIDTH, &mut track), GestureOutcome::Nothing);
        assert_eq!(track.current(), Panel::Home);
    }

    #[test]
    fn vertical_movement_is_scroll_intent() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (50.0, 5.0), false, &mut track);
        assert_eq!(
            gesture.touch_move(1, (51.0, 9.0), WIDTH, &mut track),
            GestureOutcome::Aborted
        );
        assert_eq!(gesture.state(), GestureState::Idle);
    }

    #[test]
    fn overlay_disables_swiping_mid_gesture() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (80.0, 10.0), false, &mut track);
        gesture.touch_move(1, (60.0, 10.0), WIDTH, &mut track);
        track.open_overlay(Overlay::Settings);
        assert_eq!(
            gesture.touch_move(1, (40.0, 10.0), WIDTH, &mut track),
            GestureOutcome::Aborted
        );
        assert_eq!(track.current(), Panel::Home);

        assert_eq!(
            gesture.touch_start(1, (80.0, 10.0), false, &mut track),
            GestureOutcome::Nothing
        );
    }

    #[test]
    fn overlay_opened_before_release_snaps_back() {
        let (mut gesture, mut track) = setup();
        gesture.touch_start(1, (80.0, 10.0), false, &mut track);
        gesture.touch_move(1, (50.0, 10.0), WIDTH, &mut track);
        track.open_overlay(Overlay::Settings);

        assert_eq!(
            gesture.touch_end((50.0, 10.0), WIDTH, &mut track),
            GestureOutcome::Aborted
        );
        assert_eq!(track.current(), Panel::Home);
        assert_eq!(gesture.state(), GestureState::Idle);
        let settled = Instant::now() + StdDuration::from_secs(1);
        assert_eq!(track.offset_at(settled), 0.0);
    }

    #[test]
    fn go_without_animation_lands_immediately() {
        let (_, mut track) = setup();
        track.go(Panel::Log, false);
        assert_eq!(track.current(), Panel::Log);
        assert_eq!(track.offset_at(Instant::now()), 0.0);
        assert!(!track.settle(Instant::now()));
    }
}
