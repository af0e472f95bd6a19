use std::collections::BTreeSet;

use map_label_declutter::config::{Config, ConfigFile, apply_config_file};
use map_label_declutter::{
    Camera, LabelCandidate, LabelLayout, LayoutParams, StickyState, Viewport, compute_label_layout,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutRequest {
    candidates: Vec<LabelCandidate>,
    camera: Camera,
    viewport: Viewport,
    #[serde(default)]
    sticky: StickyState,
    #[serde(default)]
    forced: BTreeSet<String>,
    #[serde(default)]
    config: Option<ConfigFile>,
}

fn run_request(request: LayoutRequest) -> LabelLayout {
    let mut config = Config::default();
    if let Some(overrides) = request.config {
        apply_config_file(&mut config, overrides);
    }
    compute_label_layout(&LayoutParams {
        candidates: &request.candidates,
        camera: request.camera,
        viewport: request.viewport,
        config: &config.declutter,
        sticky: &request.sticky,
        forced: &request.forced,
    })
}

/// Lay out one frame. Takes and returns JSON; feed the result back as the
/// next request's `sticky` via `stickyFromLayout`.
#[wasm_bindgen(js_name = layoutLabels)]
pub fn layout_labels(request_json: &str) -> Result<String, JsValue> {
    let request: LayoutRequest =
        serde_json::from_str(request_json).map_err(|error| JsValue::from_str(&error.to_string()))?;
    let layout = run_request(request);
    serde_json::to_string(&layout).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen(js_name = stickyFromLayout)]
pub fn sticky_from_layout(layout_json: &str) -> Result<String, JsValue> {
    let layout: LabelLayout =
        serde_json::from_str(layout_json).map_err(|error| JsValue::from_str(&error.to_string()))?;
    serde_json::to_string(&StickyState::from_layout(&layout))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}
