//! Bottom sheet motion: drag tracking, release resolution and the settle animation.
//!
//! The committed [`PanelState`] is the only authoritative value. The rendered
//! height is presentation state: it follows the finger while dragging and eases
//! toward the committed target afterwards, clamped to `[collapsed, full]`.
//!
//! Offsets and velocities use screen coordinates, so a positive `offset_y` or
//! `velocity_y` means the finger moved down (the panel shrinks).

use crate::config::toml_config::PanelConfig;
use crate::domain::model::PanelState;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelMetrics {
    pub viewport_height: f64,
    pub top_inset: f64,
}

impl PanelMetrics {
    pub fn new(viewport_height: f64, top_inset: f64) -> Self {
        Self {
            viewport_height,
            top_inset,
        }
    }
}

/// Canonical heights a panel settles to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapHeights {
    pub collapsed: f64,
    pub partial: f64,
    pub full: f64,
}

impl SnapHeights {
    pub fn from_metrics(metrics: PanelMetrics, tuning: &PanelConfig) -> Self {
        let full = (metrics.viewport_height - metrics.top_inset).max(0.0);
        let collapsed = full * tuning.collapsed_ratio;
        let partial = (metrics.viewport_height * tuning.partial_ratio).clamp(collapsed, full);
        Self {
            collapsed,
            partial,
            full,
        }
    }

    pub fn target(&self, state: PanelState) -> f64 {
        match state {
            PanelState::Collapsed => self.collapsed,
            PanelState::Partial => self.partial,
            PanelState::Full => self.full,
        }
    }

    pub fn clamp(&self, height: f64) -> f64 {
        if height.is_nan() {
            return self.collapsed;
        }
        height.clamp(self.collapsed, self.full)
    }

    /// Nearest snap point by absolute distance. Exact ties go to the larger state.
    pub fn nearest(&self, height: f64) -> PanelState {
        let mut best = PanelState::Full;
        let mut best_distance = (self.full - height).abs();
        for state in [PanelState::Partial, PanelState::Collapsed] {
            let distance = (self.target(state) - height).abs();
            if distance < best_distance {
                best = state;
                best_distance = distance;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSample {
    pub offset_y: f64,
    pub timestamp_ms: f64,
}

/// Release velocity estimate over a trailing time window.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    samples: VecDeque<DragSample>,
    window_ms: f64,
}

impl GestureTracker {
    pub fn new(window_ms: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_ms,
        }
    }

    pub fn push(&mut self, offset_y: f64, timestamp_ms: f64) {
        if !offset_y.is_finite() || !timestamp_ms.is_finite() {
            return;
        }
        self.samples.push_back(DragSample {
            offset_y,
            timestamp_ms,
        });
        // 保留視窗內的樣本，外加一個視窗外的基準點
        while self.samples.len() > 2 {
            let newest = self.samples[self.samples.len() - 1].timestamp_ms;
            if newest - self.samples[1].timestamp_ms >= self.window_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn offset_y(&self) -> f64 {
        self.samples.back().map(|s| s.offset_y).unwrap_or(0.0)
    }

    /// px/s; zero for degenerate gestures (fewer than two samples or no elapsed time).
    pub fn velocity_y(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let elapsed_ms = last.timestamp_ms - first.timestamp_ms;
        if elapsed_ms <= 0.0 {
            return 0.0;
        }
        (last.offset_y - first.offset_y) / elapsed_ms * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SettleAnimation {
    from: f64,
    to: f64,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl SettleAnimation {
    fn value(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0);
        let eased = 1.0 - (1.0 - t).powi(3);
        self.from + (self.to - self.from) * eased
    }

    fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    start_state: PanelState,
    start_height: f64,
    tracker: GestureTracker,
}

/// Pure release resolution: fling first, nearest snap otherwise.
pub fn resolve_release(
    heights: &SnapHeights,
    fling_velocity: f64,
    start_state: PanelState,
    release_height: f64,
    velocity_y: f64,
) -> PanelState {
    let velocity_y = if velocity_y.is_finite() { velocity_y } else { 0.0 };
    if velocity_y > fling_velocity {
        start_state.collapsed()
    } else if velocity_y < -fling_velocity {
        start_state.expanded()
    } else {
        heights.nearest(heights.clamp(release_height))
    }
}

pub struct PanelMotionController {
    tuning: PanelConfig,
    metrics: PanelMetrics,
    heights: SnapHeights,
    state: PanelState,
    rendered_height: f64,
    drag: Option<ActiveDrag>,
    animation: Option<SettleAnimation>,
}

impl PanelMotionController {
    pub fn new(metrics: PanelMetrics, tuning: PanelConfig, initial: PanelState) -> Self {
        let heights = SnapHeights::from_metrics(metrics, &tuning);
        Self {
            rendered_height: heights.target(initial),
            tuning,
            metrics,
            heights,
            state: initial,
            drag: None,
            animation: None,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn rendered_height(&self) -> f64 {
        self.rendered_height
    }

    pub fn heights(&self) -> SnapHeights {
        self.heights
    }

    pub fn metrics(&self) -> PanelMetrics {
        self.metrics
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// The single transition entry point. Ends any drag and animates toward the new target.
    pub fn set_state(&mut self, next: PanelState) {
        if self.drag.take().is_some() {
            tracing::debug!("panel drag superseded by set_state({})", next);
        }
        if next != self.state {
            tracing::debug!("panel {} -> {}", self.state, next);
        }
        self.state = next;
        self.start_settle();
    }

    fn start_settle(&mut self) {
        let to = self.heights.target(self.state);
        if (to - self.rendered_height).abs() < f64::EPSILON || self.tuning.animation_ms <= 0.0 {
            self.rendered_height = to;
            self.animation = None;
            return;
        }
        self.animation = Some(SettleAnimation {
            from: self.rendered_height,
            to,
            elapsed_ms: 0.0,
            duration_ms: self.tuning.animation_ms,
        });
    }

    /// Advances the settle animation and returns the rendered height.
    pub fn tick(&mut self, dt_ms: f64) -> f64 {
        if let Some(animation) = self.animation.as_mut() {
            animation.elapsed_ms += dt_ms.max(0.0);
            self.rendered_height = animation.value();
            if animation.is_finished() {
                self.animation = None;
            }
        }
        self.rendered_height
    }

    /// Starts tracking a gesture. A new start supersedes any drag or animation in flight.
    pub fn begin_drag(&mut self, timestamp_ms: f64) {
        self.animation = None;
        let mut tracker = GestureTracker::new(self.tuning.velocity_window_ms);
        tracker.push(0.0, timestamp_ms);
        self.drag = Some(ActiveDrag {
            start_state: self.state,
            start_height: self.rendered_height,
            tracker,
        });
    }

    /// Follows the finger. `offset_y` is cumulative since `begin_drag`.
    pub fn drag_to(&mut self, offset_y: f64, timestamp_ms: f64) -> f64 {
        if let Some(drag) = self.drag.as_mut() {
            drag.tracker.push(offset_y, timestamp_ms);
            self.rendered_height = self.heights.clamp(drag.start_height - drag.tracker.offset_y());
        }
        self.rendered_height
    }

    /// Ends the gesture using the tracked velocity.
    pub fn end_drag(&mut self, offset_y: f64, timestamp_ms: f64) -> PanelState {
        let velocity_y = match self.drag.as_mut() {
            Some(drag) => {
                drag.tracker.push(offset_y, timestamp_ms);
                drag.tracker.velocity_y()
            }
            None => 0.0,
        };
        self.end_drag_with_velocity(offset_y, velocity_y)
    }

    /// Ends the gesture with a platform-supplied release velocity (px/s).
    pub fn end_drag_with_velocity(&mut self, offset_y: f64, velocity_y: f64) -> PanelState {
        let (start_state, start_height) = match self.drag.take() {
            Some(drag) => (drag.start_state, drag.start_height),
            None => (self.state, self.rendered_height),
        };
        let offset_y = if offset_y.is_finite() { offset_y } else { 0.0 };
        let release_height = self.heights.clamp(start_height - offset_y);
        self.rendered_height = release_height;

        let next = resolve_release(
            &self.heights,
            self.tuning.fling_velocity,
            start_state,
            release_height,
            velocity_y,
        );
        tracing::debug!(
            offset_y,
            velocity_y,
            release_height,
            "gesture resolved {} -> {}",
            start_state,
            next
        );
        self.set_state(next);
        next
    }

    /// Pointer cancel: return to the committed state.
    pub fn cancel_drag(&mut self) {
        if self.drag.is_some() {
            let state = self.state;
            self.set_state(state);
        }
    }

    /// Tapping the handle while collapsed promotes straight to partial.
    pub fn tap_handle(&mut self) -> PanelState {
        if self.state == PanelState::Collapsed && self.drag.is_none() {
            self.set_state(PanelState::Partial);
        }
        self.state
    }

    /// Viewport resize or orientation change.
    pub fn set_metrics(&mut self, metrics: PanelMetrics) {
        self.metrics = metrics;
        self.heights = SnapHeights::from_metrics(metrics, &self.tuning);
        if let Some(drag) = self.drag.as_mut() {
            drag.start_height = self.heights.clamp(drag.start_height);
            self.rendered_height = self.heights.clamp(drag.start_height - drag.tracker.offset_y());
        } else {
            self.animation = None;
            self.rendered_height = self.heights.target(self.state);
        }
    }

    /// 0.0 at the collapsed height, ramping to 1.0 above the visibility threshold.
    pub fn content_opacity(&self) -> f64 {
        let threshold = self.tuning.content_visibility_threshold_px;
        let above = self.rendered_height - self.heights.collapsed - threshold;
        if threshold <= 0.0 {
            return if above >= 0.0 { 1.0 } else { 0.0 };
        }
        (above / threshold).clamp(0.0, 1.0)
    }

    /// Content that is (almost) off-screen must not receive input.
    pub fn is_content_inert(&self) -> bool {
        self.rendered_height < self.heights.collapsed + self.tuning.content_visibility_threshold_px
    }
}
