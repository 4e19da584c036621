use super::types::{Container, MediaKind, Rendition};
use crate::utils::format_bytes;
use tracing::warn;

const VIDEO_TIERS: [&str; 3] = ["720p", "480p", "360p"];
const MEDIUM_AUDIO_MIN_KBPS: f64 = 128.0;

/// One upstream encoding as reported by the YouTube backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFormat {
    pub has_video: bool,
    pub has_audio: bool,
    pub quality_label: Option<String>,
    /// kbps
    pub audio_bitrate: Option<f64>,
    pub content_length: Option<u64>,
}

impl RawFormat {
    fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    fn bitrate(&self) -> f64 {
        self.audio_bitrate.unwrap_or(0.0)
    }
}

/// Renditions offered when nothing better is known about a YouTube video.
pub fn default_youtube_formats() -> Vec<Rendition> {
    vec![
        youtube_video("720p", None),
        youtube_video("480p", None),
        youtube_audio("high", "High", None),
    ]
}

/// Picks the representative YouTube renditions: video tiers 720p/480p/360p with
/// audio muxed in, then the best audio-only stream and an optional medium one.
pub fn select_youtube_formats(formats: &[RawFormat]) -> Vec<Rendition> {
    if formats.is_empty() {
        warn!("No YouTube formats to select from, using defaults");
        return default_youtube_formats();
    }

    let mut result: Vec<Rendition> = VIDEO_TIERS
        .iter()
        .filter_map(|tier| {
            formats
                .iter()
                .filter(|f| f.has_video && f.has_audio)
                .find(|f| f.quality_label.as_deref() == Some(*tier))
                .map(|f| youtube_video(tier, f.content_length))
        })
        .collect();

    if result.is_empty() {
        result.push(youtube_video("360p", None));
    }

    let audio: Vec<&RawFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();
    let high = audio
        .iter()
        .copied()
        .reduce(|prev, curr| if prev.bitrate() > curr.bitrate() { prev } else { curr });

    match high {
        Some(high) => {
            result.push(youtube_audio("high", "High", high.content_length));

            if high.bitrate() > 0.0 {
                let medium = audio
                    .iter()
                    .find(|f| f.bitrate() < high.bitrate() && f.bitrate() >= MEDIUM_AUDIO_MIN_KBPS);
                if let Some(medium) = medium {
                    result.push(youtube_audio("medium", "Medium", medium.content_length));
                }
            }
        }
        None => result.push(youtube_audio("high", "High", None)),
    }

    result
}

/// Fixed HD video + high audio pair for the page-scraped platforms. Both point at
/// the same `og:video` source, audio is transcoded on download.
pub fn page_formats(id_prefix: &str, video_url: Option<&str>) -> Vec<Rendition> {
    let url = video_url.map(str::to_string);
    vec![
        Rendition::new(
            &format!("{id_prefix}-mp4-hd"),
            Container::Mp4,
            "HD",
            MediaKind::Video,
            format_bytes(None),
        )
        .with_url(url.clone()),
        Rendition::new(
            &format!("{id_prefix}-mp3"),
            Container::Mp3,
            "High",
            MediaKind::Audio,
            format_bytes(None),
        )
        .with_url(url),
    ]
}

fn youtube_video(tier: &str, content_length: Option<u64>) -> Rendition {
    let height = tier.trim_end_matches('p');
    Rendition::new(
        &format!("yt-mp4-{height}"),
        Container::Mp4,
        tier,
        MediaKind::Video,
        format_bytes(content_length),
    )
}

fn youtube_audio(key: &str, label: &str, content_length: Option<u64>) -> Rendition {
    Rendition::new(
        &format!("yt-mp3-{key}"),
        Container::Mp3,
        label,
        MediaKind::Audio,
        format_bytes(content_length),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muxed(label: &str, size: u64) -> RawFormat {
        RawFormat {
            has_video: true,
            has_audio: true,
            quality_label: Some(label.to_string()),
            audio_bitrate: Some(96.0),
            content_length: Some(size),
        }
    }

    fn audio_only(kbps: f64, size: Option<u64>) -> RawFormat {
        RawFormat {
            has_video: false,
            has_audio: true,
            quality_label: None,
            audio_bitrate: Some(kbps),
            content_length: size,
        }
    }

    fn ids(formats: &[Rendition]) -> Vec<&str> {
        formats.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_select_all_video_tiers() {
        let formats = vec![
            muxed("360p", 10 * 1024 * 1024),
            muxed("720p", 30 * 1024 * 1024),
            muxed("480p", 20 * 1024 * 1024),
            audio_only(160.0, Some(4 * 1024 * 1024)),
        ];
        let selected = select_youtube_formats(&formats);

        let video: Vec<&Rendition> = selected.iter().filter(|f| f.kind == MediaKind::Video).collect();
        assert_eq!(video.len(), 3);
        assert_eq!(video[0].quality, "720p");
        assert_eq!(video[0].size, "30 MB");
        assert_eq!(video[1].quality, "480p");
        assert_eq!(video[2].quality, "360p");
        assert!(selected.iter().any(|f| f.kind == MediaKind::Audio));
        assert_eq!(selected.last().unwrap().id, "yt-mp3-high");
        assert_eq!(selected.last().unwrap().size, "4 MB");
    }

    #[test]
    fn test_video_only_streams_are_not_tiers() {
        let formats = vec![
            RawFormat {
                has_video: true,
                has_audio: false,
                quality_label: Some("720p".to_string()),
                ..Default::default()
            },
            muxed("480p", 1024),
        ];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-480", "yt-mp3-high"]);
    }

    #[test]
    fn test_one_entry_per_tier() {
        let formats = vec![muxed("720p", 1024), muxed("720p", 2048)];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-720", "yt-mp3-high"]);
        assert_eq!(selected[0].size, "1 KB");
    }

    #[test]
    fn test_synthetic_entries_when_nothing_matches() {
        let formats = vec![muxed("1080p", 1024)];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-360", "yt-mp3-high"]);
        assert!(selected.iter().all(|f| f.size == "Unknown"));
    }

    #[test]
    fn test_high_and_medium_audio() {
        let formats = vec![
            muxed("360p", 1024),
            audio_only(128.0, Some(2 * 1024 * 1024)),
            audio_only(160.0, Some(3 * 1024 * 1024)),
            audio_only(48.0, None),
        ];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-360", "yt-mp3-high", "yt-mp3-medium"]);
        assert_eq!(selected[1].size, "3 MB");
        assert_eq!(selected[2].quality, "Medium");
        assert_eq!(selected[2].size, "2 MB");
    }

    #[test]
    fn test_no_medium_below_threshold() {
        let formats = vec![muxed("360p", 1024), audio_only(160.0, None), audio_only(70.0, None)];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-360", "yt-mp3-high"]);
    }

    #[test]
    fn test_medium_must_be_strictly_lower() {
        let formats = vec![muxed("360p", 1024), audio_only(160.0, None), audio_only(160.0, None)];
        let selected = select_youtube_formats(&formats);
        assert_eq!(ids(&selected), vec!["yt-mp4-360", "yt-mp3-high"]);
    }

    #[test]
    fn test_empty_list_yields_defaults() {
        let selected = select_youtube_formats(&[]);
        assert_eq!(selected, default_youtube_formats());
        assert_eq!(ids(&selected), vec!["yt-mp4-720", "yt-mp4-480", "yt-mp3-high"]);
    }

    #[test]
    fn test_page_formats() {
        let formats = page_formats("tt", Some("https://cdn.example/v.mp4"));
        assert_eq!(ids(&formats), vec!["tt-mp4-hd", "tt-mp3"]);
        assert_eq!(formats[0].kind, MediaKind::Video);
        assert_eq!(formats[1].kind, MediaKind::Audio);
        assert!(formats.iter().all(|f| f.url.as_deref() == Some("https://cdn.example/v.mp4")));

        let formats = page_formats("fb", None);
        assert!(formats.iter().all(|f| f.url.is_none()));
    }
}
