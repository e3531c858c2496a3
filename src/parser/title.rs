use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SEASON_AUDIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s+season\s+(\d+)\s+multi\s+audio\s*\[([^\]]*)\]").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTitle {
    pub canonical_title: String,
    pub subtitle: String,
}

/// "<show> Season N Multi Audio [tag]" → ("<show> (Season N)", "Multi Audio [tag]").
/// Anything else passes through untouched with an empty subtitle.
pub fn normalize(source_title: &str) -> NormalizedTitle {
    let Some(caps) = SEASON_AUDIO_RE.captures(source_title) else {
        return NormalizedTitle {
            canonical_title: source_title.to_string(),
            subtitle: String::new(),
        };
    };

    let show = caps[1].trim();
    let season = &caps[2];
    let tag = &caps[3];

    NormalizedTitle {
        canonical_title: format!("{} (Season {})", show, season),
        subtitle: format!("Multi Audio [{}]", tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_input() {
        let t = normalize("Demon Hunter season 2 multi audio [Eng-Jap]");
        assert_eq!(t.canonical_title, "Demon Hunter (Season 2)");
        assert_eq!(t.subtitle, "Multi Audio [Eng-Jap]");
    }

    #[test]
    fn canonical_input_with_padding() {
        let t = normalize("  Solo Leveling   Season 1  Multi Audio [Hindi-Eng-Jap] 1080p ");
        assert_eq!(t.canonical_title, "Solo Leveling (Season 1)");
        assert_eq!(t.subtitle, "Multi Audio [Hindi-Eng-Jap]");
    }

    #[test]
    fn suffix_removed_from_title() {
        let t = normalize("One Piece SEASON 12 MULTI AUDIO [Tam-Tel]");
        assert!(!t.canonical_title.to_lowercase().contains("multi audio"));
        assert_eq!(t.canonical_title, "One Piece (Season 12)");
    }

    #[test]
    fn no_match_is_identity() {
        for title in [
            "Naruto Shippuden Episode 45",
            "Bleach Season 3",
            "Multi Audio [Eng]",
            "",
        ] {
            let t = normalize(title);
            assert_eq!(t.canonical_title, title);
            assert!(t.subtitle.is_empty());
        }
    }

    #[test]
    fn bracket_contents_untouched() {
        let t = normalize("Sky Pirates Season 1 Multi Audio [ Hindi - Eng ] ");
        assert_eq!(t.subtitle, "Multi Audio [ Hindi - Eng ]");
    }

    #[test]
    fn season_digits_kept_verbatim() {
        let t = normalize("Dragon Ball Season 02 Multi Audio [Eng]");
        assert_eq!(t.canonical_title, "Dragon Ball (Season 02)");
    }
}
