//! Track identity: the 11-character id embedded in shared video links.

use std::fmt;

/// Number of id characters in every external video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Markers preceding the id in the recognized link shapes.
const ID_MARKERS: [&str; 3] = ["?v=", "/embed/", ".be/"];

/// Opaque external video identifier. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extracts the video id from a pasted link.
///
/// Three link shapes are recognized: a `v=` query parameter, an `/embed/`
/// path segment, and the shortened-domain `.be/` path. The first marker
/// followed by at least [`VIDEO_ID_LEN`] id characters wins; anything else
/// is rejected.
pub fn extract_video_id(link: &str) -> Option<VideoId> {
    ID_MARKERS.iter().find_map(|marker| {
        let at = link.find(marker)?;
        let tail = &link[at + marker.len()..];
        let id: String = tail
            .chars()
            .take_while(|c| is_id_char(*c))
            .take(VIDEO_ID_LEN)
            .collect();
        (id.len() == VIDEO_ID_LEN).then(|| VideoId(id))
    })
}
