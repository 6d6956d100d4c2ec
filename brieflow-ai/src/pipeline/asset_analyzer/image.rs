//! Still-image analysis

use super::MediaAnalyzer;
use crate::types::{AssetMetadata, AssetRole, EnhancementNeeds, MediaKind};

/// Shortest edge below which an image is flagged for upscaling
const MIN_SHORT_EDGE: u32 = 1024;

pub struct ImageAnalyzer;

impl MediaAnalyzer for ImageAnalyzer {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn prompt_focus(&self) -> &'static str {
        "Analyze this image. Report composition, subject, dominant colors, lighting, \
         visual style and mood. Estimate technical quality (sharpness, noise, exposure) \
         on a 0-10 scale and judge how directly the image could serve the request: as \
         final material, as a style reference, or not at all."
    }

    fn infer_format(&self, extension: &str) -> Option<&'static str> {
        match extension {
            "jpg" | "jpeg" => Some("jpeg"),
            "png" => Some("png"),
            "gif" => Some("gif"),
            "webp" => Some("webp"),
            "svg" => Some("svg"),
            "tif" | "tiff" => Some("tiff"),
            "bmp" => Some("bmp"),
            "heic" | "heif" => Some("heic"),
            _ => None,
        }
    }

    fn default_role(&self) -> AssetRole {
        AssetRole::Reference
    }

    fn base_tools(&self) -> &'static [&'static str] {
        &["image_editor"]
    }

    fn refine_enhancements(&self, metadata: &AssetMetadata, needs: &mut EnhancementNeeds) {
        if let (Some(w), Some(h)) = (metadata.width, metadata.height) {
            if w.min(h) < MIN_SHORT_EDGE {
                needs.upscale = true;
            }
        }
        if metadata.quality_score < 4.0 {
            needs.denoise = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_image_needs_upscale() {
        let metadata = AssetMetadata {
            width: Some(800),
            height: Some(600),
            quality_score: 7.0,
            ..Default::default()
        };
        let mut needs = EnhancementNeeds::default();
        ImageAnalyzer.refine_enhancements(&metadata, &mut needs);
        assert!(needs.upscale);
        assert!(!needs.denoise);
    }

    #[test]
    fn test_unknown_dimensions_leave_flags_alone() {
        let metadata = AssetMetadata {
            quality_score: 3.0,
            ..Default::default()
        };
        let mut needs = EnhancementNeeds::default();
        ImageAnalyzer.refine_enhancements(&metadata, &mut needs);
        assert!(!needs.upscale);
        assert!(needs.denoise);
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(ImageAnalyzer.infer_format("jpg"), Some("jpeg"));
        assert_eq!(ImageAnalyzer.infer_format("mp4"), None);
    }
}
