//! YouTube link recognition

use url::Url;

/// Extract the video identifier from a YouTube link.
///
/// Accepts `youtube.com` links carrying a `v=` query parameter and `youtu.be`
/// short links, where the identifier is the last non-empty path segment, so a
/// trailing slash is tolerated. The scheme may be omitted. Anything else yields
/// `None`.
pub fn extract_video_id(link: &str) -> Option<String> {
    let link = link.trim();
    let parsed = Url::parse(link)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("https://{}", link)).ok())?;

    let host = parsed.host_str()?.to_ascii_lowercase();
    let is_long = host == "youtube.com" || host.ends_with(".youtube.com");
    let is_short = host == "youtu.be" || host.ends_with(".youtu.be");
    if !is_long && !is_short {
        return None;
    }

    if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        return non_empty(&id);
    }

    if is_short {
        let last = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())?;
        return non_empty(last);
    }

    None
}

fn non_empty(id: &str) -> Option<String> {
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
