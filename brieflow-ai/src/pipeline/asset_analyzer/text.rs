//! Text document analysis (scripts, briefs, copy)

use super::MediaAnalyzer;
use crate::types::{AssetMetadata, AssetRole, EnhancementNeeds, MediaKind};

pub struct TextAnalyzer;

impl MediaAnalyzer for TextAnalyzer {
    fn kind(&self) -> MediaKind {
        MediaKind::Text
    }

    fn prompt_focus(&self) -> &'static str {
        "Analyze this text document. Summarize its content and tone, and extract any \
         brand names, taglines, scripts, shot lists or style guidance relevant to the \
         request. Rate its usefulness as source material on a 0-10 scale."
    }

    fn infer_format(&self, extension: &str) -> Option<&'static str> {
        match extension {
            "txt" => Some("txt"),
            "md" | "markdown" => Some("markdown"),
            "pdf" => Some("pdf"),
            "doc" | "docx" => Some("docx"),
            "rtf" => Some("rtf"),
            "srt" | "vtt" => Some("subtitles"),
            "json" => Some("json"),
            _ => None,
        }
    }

    fn default_role(&self) -> AssetRole {
        AssetRole::Reference
    }

    fn base_tools(&self) -> &'static [&'static str] {
        &["copy_editor"]
    }

    fn refine_enhancements(&self, _metadata: &AssetMetadata, needs: &mut EnhancementNeeds) {
        // only transcription-style needs make sense for text
        *needs = EnhancementNeeds {
            transcription: needs.transcription,
            ..Default::default()
        };
    }
}
