#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, DeclutterConfig, PolicyConfig, RenderConfig};
pub use ir::{
    Camera, GeoPoint, LabelCandidate, LabelSlot, LayoutMode, ObstacleScope, PlacementOrder,
    ScreenPoint, StickyState, Viewport,
};
pub use layout::{LabelLayout, LabelPlacement, LayoutParams, compute_label_layout};
pub use parser::{ParsedScene, Scene, SceneError, parse_scene};
pub use theme::Theme;
