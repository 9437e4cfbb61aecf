use serde::{Deserialize, Serialize};

const CELLERY_PALETTE: [&str; 12] = [
    "#3F51B5", "#009688", "#FF9800", "#9C27B0", "#4CAF50", "#2196F3", "#795548", "#E91E63",
    "#CDDC39", "#00BCD4", "#673AB7", "#FFC107",
];

const DARK_PALETTE: [&str; 12] = [
    "#7986CB", "#4DB6AC", "#FFB74D", "#BA68C8", "#81C784", "#64B5F6", "#A1887F", "#F06292",
    "#DCE775", "#4DD0E1", "#9575CD", "#FFD54F",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub help_font_size: f32,
    /// Colors handed out to cells and component types in order of first use.
    pub palette: Vec<String>,
    pub system_color: String,
    pub error_color: String,
    pub unknown_color: String,
    pub text_color: String,
    pub secondary_text_color: String,
    pub action_color: String,
    pub legend_background: String,
    pub legend_border: String,
    pub background: String,
}

impl Theme {
    pub fn cellery() -> Self {
        Self {
            font_family: "Roboto, Helvetica, Arial, sans-serif".to_string(),
            font_size: 12.0,
            help_font_size: 11.0,
            palette: CELLERY_PALETTE.iter().map(|c| c.to_string()).collect(),
            system_color: "#9E9E9E".to_string(),
            error_color: "#F44336".to_string(),
            unknown_color: "#71736F".to_string(),
            text_color: "#212121".to_string(),
            secondary_text_color: "#757575".to_string(),
            action_color: "#757575".to_string(),
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#E0E0E0".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Roboto, Helvetica, Arial, sans-serif".to_string(),
            font_size: 12.0,
            help_font_size: 11.0,
            palette: DARK_PALETTE.iter().map(|c| c.to_string()).collect(),
            system_color: "#BDBDBD".to_string(),
            error_color: "#EF5350".to_string(),
            unknown_color: "#8D8F8B".to_string(),
            text_color: "#F5F5F5".to_string(),
            secondary_text_color: "#B0BEC5".to_string(),
            action_color: "#B0BEC5".to_string(),
            legend_background: "#263238".to_string(),
            legend_border: "#37474F".to_string(),
            background: "#1E272C".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::cellery()
    }
}
