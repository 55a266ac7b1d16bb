use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{RiskError, RiskResult};
use crate::output::pdf::{max_line_chars, FOOTER_FONT_SIZE, TITLE_FONT_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model_path: PathBuf,
    pub reference_path: PathBuf,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub footer: String,
    pub chart_width_px: u32,
    pub chart_height_px: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Cardiac Risk Prediction Report".to_string(),
            footer: "Generated with an AI-assisted cardiac risk model. For clinical decision support only.".to_string(),
            chart_width_px: 640,
            chart_height_px: 480,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> RiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.resolve_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        config.validate()?;
        Ok(config)
    }

    /// Relative data paths are taken relative to the config file.
    fn resolve_paths(&mut self, base: &Path) {
        if self.model_path.is_relative() {
            self.model_path = base.join(&self.model_path);
        }
        if self.reference_path.is_relative() {
            self.reference_path = base.join(&self.reference_path);
        }
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(RiskError::Validation(
                "model_path must be specified".to_string()
            ));
        }

        if self.reference_path.as_os_str().is_empty() {
            return Err(RiskError::Validation(
                "reference_path must be specified".to_string()
            ));
        }

        self.report.validate()
    }
}

impl ReportConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if self.title.trim().is_empty() {
            return Err(RiskError::Validation(
                "Report title must not be empty".to_string()
            ));
        }

        if !self.title.is_ascii() || !self.footer.is_ascii() {
            return Err(RiskError::Validation(
                "Report title and footer must be ASCII (PDF base fonts)".to_string()
            ));
        }

        // Title and footer are single lines.
        for (name, text, font_size) in [
            ("title", &self.title, TITLE_FONT_SIZE),
            ("footer", &self.footer, FOOTER_FONT_SIZE),
        ] {
            let limit = max_line_chars(font_size);
            if text.chars().count() > limit {
                return Err(RiskError::Validation(format!(
                    "Report {} must be at most {} characters, got {}",
                    name,
                    limit,
                    text.chars().count()
                )));
            }
        }

        // Keep charts legible and the raster buffers bounded.
        for (name, value) in [("chart_width_px", self.chart_width_px), ("chart_height_px", self.chart_height_px)] {
            if !(160..=2400).contains(&value) {
                return Err(RiskError::Validation(
                    format!("{} must be between 160 and 2400, got {}", name, value)
                ));
            }
        }

        Ok(())
    }
}
