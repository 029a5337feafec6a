//! Outside-dismiss detection for the detail panel.
//!
//! Floating overlays opened from controls inside the panel (dropdowns,
//! confirmations, date and tree pickers) render outside the panel boundary.
//! A click landing right after an interaction with one of them must not be
//! mistaken for an outside click.

use std::time::{Duration, Instant};

use crate::config::DismissConfig;

/// Where a pointer event landed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerTarget {
    /// Inside the panel's own content boundary.
    pub in_panel: bool,
    /// Class names of the target and its ancestors, innermost first.
    pub class_chain: Vec<String>,
}

impl PointerTarget {
    pub fn inside_panel() -> Self {
        Self {
            in_panel: true,
            class_chain: Vec::new(),
        }
    }

    pub fn outside() -> Self {
        Self::default()
    }

    pub fn overlay(class: &str) -> Self {
        Self {
            in_panel: false,
            class_chain: vec![class.to_string()],
        }
    }
}

/// Decides whether a pointer interaction closes the panel.
///
/// Time is passed in explicitly so that policies stay deterministic.
pub trait DismissPolicy {
    /// The panel became visible.
    fn panel_opened(&mut self, at: Instant);

    /// A pointer-down was observed anywhere in the document.
    fn pointer_down(&mut self, target: &PointerTarget, at: Instant);

    /// A click was observed; returns true if the panel should close.
    fn should_dismiss(&mut self, target: &PointerTarget, at: Instant) -> bool;
}

#[derive(Debug, Clone)]
pub struct OutsideClickGuard {
    suppression: Duration,
    listener_delay: Duration,
    overlay_classes: Vec<String>,
    opened_at: Option<Instant>,
    overlay_touched_at: Option<Instant>,
}

impl OutsideClickGuard {
    pub fn new(config: &DismissConfig) -> Self {
        Self {
            suppression: config.suppression(),
            listener_delay: config.listener_delay(),
            overlay_classes: config.overlay_classes.clone(),
            opened_at: None,
            overlay_touched_at: None,
        }
    }

    /// Component libraries prefix their class names (`ant-select-dropdown`),
    /// so a configured class also matches as a `-`-separated suffix.
    pub fn is_overlay(&self, target: &PointerTarget) -> bool {
        target.class_chain.iter().any(|class| {
            self.overlay_classes.iter().any(|overlay| {
                class == overlay
                    || class
                        .strip_suffix(overlay.as_str())
                        .is_some_and(|prefix| prefix.ends_with('-'))
            })
        })
    }

    /// Whether a recent overlay interaction still suppresses dismissal.
    pub fn is_suppressed(&self, at: Instant) -> bool {
        self.overlay_touched_at
            .is_some_and(|touched| at.saturating_duration_since(touched) <= self.suppression)
    }

    fn is_listening(&self, at: Instant) -> bool {
        self.opened_at
            .is_some_and(|opened| at.saturating_duration_since(opened) >= self.listener_delay)
    }
}

impl DismissPolicy for OutsideClickGuard {
    fn panel_opened(&mut self, at: Instant) {
        self.opened_at = Some(at);
        self.overlay_touched_at = None;
    }

    fn pointer_down(&mut self, target: &PointerTarget, at: Instant) {
        if self.is_overlay(target) {
            self.overlay_touched_at = Some(at);
        }
    }

    fn should_dismiss(&mut self, target: &PointerTarget, at: Instant) -> bool {
        if !self.is_listening(at) {
            return false;
        }
        let suppressed = self.is_suppressed(at);
        // Any evaluated click consumes the overlay flag.
        self.overlay_touched_at = None;
        !suppressed && !target.in_panel && !self.is_overlay(target)
    }
}
