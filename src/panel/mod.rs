//! Entity detail panel: the edit state machine, tabs and badges, previous/next
//! navigation and outside-click dismissal.

pub mod controller;
pub mod dismiss;
pub mod navigator;

pub use controller::{Badge, DetailPanel, PanelMode, PanelView, PanelWidth, TabData, TabState, TabView};
pub use dismiss::{DismissPolicy, OutsideClickGuard, PointerTarget};
pub use navigator::SequenceNavigator;
