use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub marker_color: String,
    pub obstacle_color: String,
    pub label_text_color: String,
    pub label_halo_color: String,
    pub forced_label_color: String,
    pub collision_box_color: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            background: "#F4F1EA".to_string(),
            marker_color: "#D9453B".to_string(),
            obstacle_color: "#D9453B33".to_string(),
            label_text_color: "#1C2430".to_string(),
            label_halo_color: "#FFFFFF".to_string(),
            forced_label_color: "#1F5FD6".to_string(),
            collision_box_color: "#7A8AA6".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            background: "#1B1F27".to_string(),
            marker_color: "#FF7A59".to_string(),
            obstacle_color: "#FF7A5933".to_string(),
            label_text_color: "#E8ECF3".to_string(),
            label_halo_color: "#1B1F27".to_string(),
            forced_label_color: "#7FB2FF".to_string(),
            collision_box_color: "#5B6B86".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
