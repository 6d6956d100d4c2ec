//! Output-type profiles and platform default tables
//!
//! Lowest two tiers of constraint precedence: a recognized platform's
//! defaults win over the output-type profile.

use crate::types::OutputType;

/// Defaults for one output medium
#[derive(Debug)]
pub struct OutputProfile {
    pub output_type: OutputType,
    pub duration_seconds: Option<f64>,
    pub aspect_ratio: Option<&'static str>,
    pub resolution: &'static str,
    pub format: &'static str,
    pub image_count: Option<u32>,
    pub frame_rate: Option<u32>,
    pub default_style: &'static str,
    /// Direction used when no assets or provider are available
    pub default_direction: &'static str,
}

static IMAGE_PROFILE: OutputProfile = OutputProfile {
    output_type: OutputType::Image,
    duration_seconds: None,
    aspect_ratio: Some("1:1"),
    resolution: "2048x2048",
    format: "png",
    image_count: Some(1),
    frame_rate: None,
    default_style: "clean editorial",
    default_direction: "A single striking composition built around one clear subject, \
        with generous negative space and a restrained palette.",
};

static VIDEO_PROFILE: OutputProfile = OutputProfile {
    output_type: OutputType::Video,
    duration_seconds: Some(30.0),
    aspect_ratio: Some("16:9"),
    resolution: "1920x1080",
    format: "mp4",
    image_count: None,
    frame_rate: Some(30),
    default_style: "clean cinematic",
    default_direction: "Open on a bold hook within the first seconds, build momentum with \
        quick cuts around the subject, and land on a clear closing message.",
};

static AUDIO_PROFILE: OutputProfile = OutputProfile {
    output_type: OutputType::Audio,
    duration_seconds: Some(30.0),
    aspect_ratio: None,
    resolution: "48kHz",
    format: "wav",
    image_count: None,
    frame_rate: None,
    default_style: "polished broadcast",
    default_direction: "Establish the motif early, layer energy through the middle \
        section, and resolve with a memorable ending.",
};

static MIXED_PROFILE: OutputProfile = OutputProfile {
    output_type: OutputType::Mixed,
    duration_seconds: Some(30.0),
    aspect_ratio: Some("16:9"),
    resolution: "1920x1080",
    format: "mp4",
    image_count: Some(3),
    frame_rate: Some(30),
    default_style: "cohesive brand",
    default_direction: "A coordinated set of pieces sharing one visual language, each \
        adapted to its medium while keeping the core message consistent.",
};

pub fn profile_for(output_type: OutputType) -> &'static OutputProfile {
    match output_type {
        OutputType::Image => &IMAGE_PROFILE,
        OutputType::Video => &VIDEO_PROFILE,
        OutputType::Audio => &AUDIO_PROFILE,
        OutputType::Mixed => &MIXED_PROFILE,
    }
}

/// Defaults for one delivery platform
#[derive(Debug)]
pub struct PlatformProfile {
    pub name: &'static str,
    aliases: &'static [&'static str],
    pub aspect_ratio: &'static str,
    pub resolution: &'static str,
    pub format: &'static str,
    pub recommended_duration_seconds: Option<f64>,
    pub max_duration_seconds: Option<f64>,
    pub loudness_lufs: f64,
}

static PLATFORMS: &[PlatformProfile] = &[
    PlatformProfile {
        name: "tiktok",
        aliases: &["tik_tok"],
        aspect_ratio: "9:16",
        resolution: "1080x1920",
        format: "mp4",
        recommended_duration_seconds: Some(15.0),
        max_duration_seconds: Some(600.0),
        loudness_lufs: -14.0,
    },
    PlatformProfile {
        name: "reels",
        aliases: &["instagram_reels", "ig_reels", "reel"],
        aspect_ratio: "9:16",
        resolution: "1080x1920",
        format: "mp4",
        recommended_duration_seconds: Some(15.0),
        max_duration_seconds: Some(90.0),
        loudness_lufs: -14.0,
    },
    PlatformProfile {
        name: "shorts",
        aliases: &["youtube_shorts", "yt_shorts"],
        aspect_ratio: "9:16",
        resolution: "1080x1920",
        format: "mp4",
        recommended_duration_seconds: Some(30.0),
        max_duration_seconds: Some(60.0),
        loudness_lufs: -14.0,
    },
    PlatformProfile {
        name: "youtube",
        aliases: &["yt"],
        aspect_ratio: "16:9",
        resolution: "1920x1080",
        format: "mp4",
        recommended_duration_seconds: None,
        max_duration_seconds: None,
        loudness_lufs: -14.0,
    },
    PlatformProfile {
        name: "instagram_feed",
        aliases: &["instagram", "ig", "ig_feed"],
        aspect_ratio: "4:5",
        resolution: "1080x1350",
        format: "mp4",
        recommended_duration_seconds: Some(30.0),
        max_duration_seconds: Some(60.0),
        loudness_lufs: -14.0,
    },
];

/// Look up a platform by name or alias (case, spaces and dashes ignored)
pub fn platform_for(name: &str) -> Option<&'static PlatformProfile> {
    let key: String = name
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    PLATFORMS
        .iter()
        .find(|p| p.name == key || p.aliases.contains(&key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_aliases() {
        assert_eq!(platform_for("YouTube Shorts").map(|p| p.name), Some("shorts"));
        assert_eq!(platform_for("instagram").map(|p| p.name), Some("instagram_feed"));
        assert_eq!(platform_for("TikTok").map(|p| p.aspect_ratio), Some("9:16"));
        assert!(platform_for("myspace").is_none());
    }

    #[test]
    fn test_only_visual_profiles_have_aspect_ratio() {
        assert!(profile_for(OutputType::Audio).aspect_ratio.is_none());
        assert_eq!(profile_for(OutputType::Video).duration_seconds, Some(30.0));
        assert_eq!(profile_for(OutputType::Image).image_count, Some(1));
    }
}
