//! Video clip analysis

use super::MediaAnalyzer;
use crate::types::{AssetMetadata, AssetRole, EnhancementNeeds, MediaKind};

/// Frame height below which a clip is flagged for upscaling
const MIN_FRAME_HEIGHT: u32 = 720;

pub struct VideoAnalyzer;

impl MediaAnalyzer for VideoAnalyzer {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn prompt_focus(&self) -> &'static str {
        "Analyze this video clip. Describe its scenes, pacing, camera movement, subject \
         and visual style. Report duration, frame size and any shake, noise or color \
         problems. Rate technical quality on a 0-10 scale and judge whether the footage \
         can be cut directly into the requested piece."
    }

    fn infer_format(&self, extension: &str) -> Option<&'static str> {
        match extension {
            "mp4" | "m4v" => Some("mp4"),
            "mov" => Some("mov"),
            "webm" => Some("webm"),
            "mkv" => Some("mkv"),
            "avi" => Some("avi"),
            "gif" => Some("gif"),
            _ => None,
        }
    }

    fn default_role(&self) -> AssetRole {
        AssetRole::Primary
    }

    fn base_tools(&self) -> &'static [&'static str] {
        &["video_editor"]
    }

    fn refine_enhancements(&self, metadata: &AssetMetadata, needs: &mut EnhancementNeeds) {
        if let Some(h) = metadata.height {
            if h.min(metadata.width.unwrap_or(h)) < MIN_FRAME_HEIGHT {
                needs.upscale = true;
            }
        }
        if metadata.quality_score < 5.0 {
            needs.color_correction = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sd_footage_flagged() {
        let metadata = AssetMetadata {
            width: Some(640),
            height: Some(480),
            quality_score: 4.0,
            ..Default::default()
        };
        let mut needs = EnhancementNeeds::default();
        VideoAnalyzer.refine_enhancements(&metadata, &mut needs);
        assert!(needs.upscale);
        assert!(needs.color_correction);
    }

    #[test]
    fn test_vertical_hd_not_upscaled() {
        let metadata = AssetMetadata {
            width: Some(1080),
            height: Some(1920),
            quality_score: 8.0,
            ..Default::default()
        };
        let mut needs = EnhancementNeeds::default();
        VideoAnalyzer.refine_enhancements(&metadata, &mut needs);
        assert!(!needs.any());
    }
}
