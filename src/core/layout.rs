//! Responsive composition: side-by-side sidebar + map on wide viewports, a
//! full-bleed map under the draggable panel on narrow ones.

use crate::config::toml_config::LayoutConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Status bar / notch area the full panel must stay below.
    pub top_inset: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, top_inset: f64) -> Self {
        Self {
            width,
            height,
            top_inset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Map fills the viewport; the panel floats over it.
    Stacked,
    /// Persistent sidebar next to the map. The panel is not used.
    SideBySide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutRegions {
    Stacked { map: Rect },
    SideBySide { sidebar: Rect, map: Rect },
}

pub struct ResponsiveLayoutSwitch {
    config: LayoutConfig,
    viewport: Viewport,
    mode: LayoutMode,
}

impl ResponsiveLayoutSwitch {
    pub fn new(config: LayoutConfig, viewport: Viewport) -> Self {
        let mode = Self::mode_for(&config, viewport.width);
        Self {
            config,
            viewport,
            mode,
        }
    }

    fn mode_for(config: &LayoutConfig, width: f64) -> LayoutMode {
        if width >= config.wide_breakpoint_px {
            LayoutMode::SideBySide
        } else {
            LayoutMode::Stacked
        }
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_stacked(&self) -> bool {
        self.mode == LayoutMode::Stacked
    }

    /// Re-evaluates the width predicate. Returns the new mode only when it flipped.
    pub fn on_viewport_change(&mut self, viewport: Viewport) -> Option<LayoutMode> {
        self.viewport = viewport;
        let mode = Self::mode_for(&self.config, viewport.width);
        if mode == self.mode {
            return None;
        }
        tracing::info!(width = viewport.width, "layout {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Some(mode)
    }

    pub fn regions(&self) -> LayoutRegions {
        let Viewport { width, height, .. } = self.viewport;
        match self.mode {
            LayoutMode::Stacked => LayoutRegions::Stacked {
                map: Rect {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                },
            },
            LayoutMode::SideBySide => {
                let sidebar_width = self.config.sidebar_width_px.min(width);
                LayoutRegions::SideBySide {
                    sidebar: Rect {
                        x: 0.0,
                        y: 0.0,
                        width: sidebar_width,
                        height,
                    },
                    map: Rect {
                        x: sidebar_width,
                        y: 0.0,
                        width: width - sidebar_width,
                        height,
                    },
                }
            }
        }
    }
}

/// What the stacked overlay hosts. Independent of the panel's height state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayView {
    #[default]
    Results,
    Filters,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRouter {
    current: OverlayView,
}

impl OverlayRouter {
    pub fn current(&self) -> OverlayView {
        self.current
    }

    pub fn show(&mut self, view: OverlayView) {
        self.current = view;
    }

    pub fn toggle(&mut self) -> OverlayView {
        self.current = match self.current {
            OverlayView::Results => OverlayView::Filters,
            OverlayView::Filters => OverlayView::Results,
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch(width: f64) -> ResponsiveLayoutSwitch {
        ResponsiveLayoutSwitch::new(LayoutConfig::default(), Viewport::new(width, 800.0, 0.0))
    }

    #[test]
    fn test_breakpoint_selects_mode() {
        assert_eq!(switch(375.0).mode(), LayoutMode::Stacked);
        assert_eq!(switch(767.9).mode(), LayoutMode::Stacked);
        assert_eq!(switch(768.0).mode(), LayoutMode::SideBySide);
        assert_eq!(switch(1440.0).mode(), LayoutMode::SideBySide);
    }

    #[test]
    fn test_viewport_change_reports_only_flips() {
        let mut layout = switch(375.0);
        assert_eq!(layout.on_viewport_change(Viewport::new(414.0, 800.0, 0.0)), None);
        // 橫向旋轉
        assert_eq!(
            layout.on_viewport_change(Viewport::new(896.0, 414.0, 0.0)),
            Some(LayoutMode::SideBySide)
        );
        assert_eq!(layout.viewport().height, 414.0);
        assert_eq!(
            layout.on_viewport_change(Viewport::new(414.0, 896.0, 0.0)),
            Some(LayoutMode::Stacked)
        );
    }

    #[test]
    fn test_side_by_side_regions_split_width() {
        let layout = switch(1000.0);
        match layout.regions() {
            LayoutRegions::SideBySide { sidebar, map } => {
                assert_eq!(sidebar.width, 380.0);
                assert_eq!(map.x, 380.0);
                assert_eq!(map.width, 620.0);
            }
            other => panic!("expected side-by-side, got {:?}", other),
        }
    }

    #[test]
    fn test_overlay_router_toggles() {
        let mut router = OverlayRouter::default();
        assert_eq!(router.current(), OverlayView::Results);
        assert_eq!(router.toggle(), OverlayView::Filters);
        router.show(OverlayView::Results);
        assert_eq!(router.current(), OverlayView::Results);
    }
}
