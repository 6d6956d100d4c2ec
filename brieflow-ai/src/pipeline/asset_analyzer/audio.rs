//! Audio analysis

use super::MediaAnalyzer;
use crate::types::{AssetMetadata, AssetRole, EnhancementNeeds, MediaKind};

pub struct AudioAnalyzer;

impl MediaAnalyzer for AudioAnalyzer {
    fn kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn prompt_focus(&self) -> &'static str {
        "Analyze this audio. Identify whether it is music, voice-over, ambience or \
         effects; describe tempo, energy, genre and mood. Report duration and any hiss, \
         clipping or background noise. Rate technical quality on a 0-10 scale. Flag \
         transcription if it contains speech."
    }

    fn infer_format(&self, extension: &str) -> Option<&'static str> {
        match extension {
            "mp3" => Some("mp3"),
            "wav" | "wave" => Some("wav"),
            "flac" => Some("flac"),
            "ogg" | "oga" | "opus" => Some("ogg"),
            "m4a" | "aac" => Some("aac"),
            "aiff" | "aif" => Some("aiff"),
            _ => None,
        }
    }

    fn default_role(&self) -> AssetRole {
        AssetRole::Supporting
    }

    fn base_tools(&self) -> &'static [&'static str] {
        &["audio_editor"]
    }

    fn refine_enhancements(&self, metadata: &AssetMetadata, needs: &mut EnhancementNeeds) {
        if metadata.quality_score < 6.0 {
            needs.audio_cleanup = true;
        }
        // resolution flags do not apply to audio
        needs.upscale = false;
        needs.stabilization = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noisy_audio_needs_cleanup() {
        let metadata = AssetMetadata {
            quality_score: 4.5,
            ..Default::default()
        };
        let mut needs = EnhancementNeeds {
            upscale: true,
            ..Default::default()
        };
        AudioAnalyzer.refine_enhancements(&metadata, &mut needs);
        assert!(needs.audio_cleanup);
        assert!(!needs.upscale);
    }
}
