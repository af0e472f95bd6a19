use crate::ir::{Camera, Viewport};
use crate::layout::{LabelLayout, LabelPlacement};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDump {
    pub viewport: Viewport,
    pub frames: Vec<FrameDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDump {
    pub index: usize,
    pub camera: Camera,
    pub enabled: bool,
    pub budget: usize,
    pub hash: String,
    pub ids: Vec<String>,
    pub stats: FrameStats,
    pub placements: Vec<LabelPlacement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub candidates: usize,
    pub projected: usize,
    pub placed: usize,
    pub hidden: usize,
    pub rejected_by_collision: usize,
    pub forced_placed: usize,
    pub evicted: usize,
}

impl FrameDump {
    pub fn from_layout(index: usize, camera: Camera, layout: &LabelLayout) -> Self {
        FrameDump {
            index,
            camera,
            enabled: layout.enabled,
            budget: layout.budget,
            hash: layout.hash.clone(),
            ids: layout.ids.clone(),
            stats: FrameStats {
                candidates: layout.candidate_count,
                projected: layout.projected_count,
                placed: layout.placements.len(),
                hidden: layout.hidden_count,
                rejected_by_collision: layout.rejected_by_collision,
                forced_placed: layout.forced_placed,
                evicted: layout.evicted,
            },
            placements: layout.placements.clone(),
        }
    }
}

impl SceneDump {
    pub fn from_frames<'a>(
        viewport: Viewport,
        frames: impl IntoIterator<Item = (usize, Camera, &'a LabelLayout)>,
    ) -> Self {
        SceneDump {
            viewport,
            frames: frames
                .into_iter()
                .map(|(index, camera, layout)| FrameDump::from_layout(index, camera, layout))
                .collect(),
        }
    }
}

pub fn write_scene_dump(path: Option<&Path>, dump: &SceneDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), dump)?;
        }
        None => {
            println!("{}", serde_json::to_string_pretty(dump)?);
        }
    }
    Ok(())
}
