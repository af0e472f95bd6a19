use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigFile;
use crate::ir::{Camera, LabelCandidate, StickyState, Viewport};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene: {0}")]
    Json5(#[from] json5::Error),
    #[error("viewport must be at least 1x1 pixels, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("scene has no camera frames")]
    NoFrames,
    #[error("duplicate candidate id `{0}`")]
    DuplicateId(String),
}

/// A viewport, a camera path and the candidates shown along it.
#[derive(Debug, Clone)]
pub struct Scene {
    pub viewport: Viewport,
    pub frames: Vec<Camera>,
    pub candidates: Vec<LabelCandidate>,
    pub forced: BTreeSet<String>,
    /// State the first frame starts from; empty unless the scene supplies one.
    pub sticky: StickyState,
}

#[derive(Debug)]
pub struct ParsedScene {
    pub scene: Scene,
    /// Inline `config` block, overlaid on top of any config file.
    pub config: Option<ConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneFile {
    viewport: Viewport,
    #[serde(default)]
    camera: Option<Camera>,
    #[serde(default)]
    frames: Vec<Camera>,
    #[serde(default)]
    candidates: Vec<LabelCandidate>,
    #[serde(default)]
    forced: Vec<String>,
    #[serde(default)]
    sticky: Option<StickyState>,
    #[serde(default)]
    config: Option<ConfigFile>,
}

pub fn parse_scene(input: &str) -> Result<ParsedScene, SceneError> {
    let file: SceneFile = json5::from_str(input)?;

    if file.viewport.is_degenerate() {
        return Err(SceneError::InvalidViewport {
            width: file.viewport.width,
            height: file.viewport.height,
        });
    }

    let mut frames = file.frames;
    if let Some(camera) = file.camera {
        frames.insert(0, camera);
    }
    if frames.is_empty() {
        return Err(SceneError::NoFrames);
    }
    for (index, frame) in frames.iter().enumerate() {
        if !frame.zoom.is_finite() {
            tracing::warn!(frame = index, "camera zoom is not finite; labels stay hidden");
        }
    }

    let mut seen = HashSet::with_capacity(file.candidates.len());
    for candidate in &file.candidates {
        if !seen.insert(candidate.id.as_str()) {
            return Err(SceneError::DuplicateId(candidate.id.clone()));
        }
        let has_screen = candidate
            .screen
            .is_some_and(|p| p.x.is_finite() && p.y.is_finite());
        let has_coordinate =
            candidate.coordinate.lon.is_finite() && candidate.coordinate.lat.is_finite();
        if !has_screen && !has_coordinate {
            tracing::warn!(
                id = %candidate.id,
                "candidate has no finite position and will never be labeled"
            );
        }
    }

    let mut forced = BTreeSet::new();
    for id in file.forced {
        if !seen.contains(id.as_str()) {
            tracing::warn!(id = %id, "forced id does not match any candidate");
        }
        forced.insert(id);
    }

    Ok(ParsedScene {
        scene: Scene {
            viewport: file.viewport,
            frames,
            candidates: file.candidates,
            forced,
            sticky: file.sticky.unwrap_or_default(),
        },
        config: file.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LabelSlot;

    const BASIC: &str = r#"
    // two cafes near the center
    {
      viewport: { width: 390, height: 844 },
      camera: { center: { lon: 13.405, lat: 52.52 }, zoom: 14.5 },
      frames: [{ center: { lon: 13.41, lat: 52.52 }, zoom: 15 }],
      forced: ['b'],
      candidates: [
        { id: 'a', title: 'Cafe Alpha', coordinate: { lon: 13.405, lat: 52.52 }, rating: 4.5 },
        { id: 'b', title: 'Bakery', coordinate: { lon: 13.406, lat: 52.521 }, priority: 3,
          markerZone: { width: 24, height: 32, offsetY: -16 } },
      ],
      sticky: { enabled: true, visible: ['a'], slots: { a: 'below-right' } },
      config: { placementOrder: 'ranked', policy: { lowZoomMax: 4 } },
    }
    "#;

    #[test]
    fn parses_json5_scene() {
        let parsed = parse_scene(BASIC).unwrap();
        let scene = &parsed.scene;
        assert_eq!(scene.viewport, Viewport::new(390.0, 844.0));
        assert_eq!(scene.frames.len(), 2);
        assert_eq!(scene.frames[0].zoom, 14.5);
        assert_eq!(scene.candidates.len(), 2);
        assert_eq!(scene.candidates[0].rating, 4.5);
        assert!(scene.candidates[1].marker_zone.is_some());
        assert!(scene.forced.contains("b"));
        assert!(scene.sticky.enabled);
        assert_eq!(scene.sticky.slots.get("a"), Some(&LabelSlot::BelowRight));
        assert!(parsed.config.is_some());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let input = r#"{
          viewport: { width: 100, height: 100 },
          camera: { center: { lon: 0, lat: 0 }, zoom: 14 },
          candidates: [
            { id: 'x', coordinate: { lon: 0, lat: 0 } },
            { id: 'x', coordinate: { lon: 1, lat: 0 } },
          ],
        }"#;
        assert!(matches!(parse_scene(input), Err(SceneError::DuplicateId(id)) if id == "x"));
    }

    #[test]
    fn rejects_scene_without_frames() {
        let input = "{ viewport: { width: 100, height: 100 } }";
        assert!(matches!(parse_scene(input), Err(SceneError::NoFrames)));
    }

    #[test]
    fn rejects_degenerate_viewport() {
        let input = "{ viewport: { width: 0, height: 100 }, camera: { center: { lon: 0, lat: 0 }, zoom: 14 } }";
        assert!(matches!(
            parse_scene(input),
            Err(SceneError::InvalidViewport { .. })
        ));
    }

    #[test]
    fn syntax_errors_surface() {
        let err = parse_scene("{ viewport: ").unwrap_err();
        assert!(matches!(err, SceneError::Json5(_)));
        assert!(err.to_string().starts_with("invalid scene"));
    }
}
