use std::collections::HashSet;

/// Comparison key for a media URL.
///
/// Query and fragment are dropped, then the extension of the last path
/// segment, so `a/img.jpg?w=800` and `a/img.webp` collapse while
/// `a/img_1200.jpg` and `a/img_800.jpg` stay distinct.
pub fn media_key(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = &url[..end];
    let segment_start = path.rfind('/').map_or(0, |slash| slash + 1);
    match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..segment_start + dot],
        _ => path,
    }
}

/// Drop later URLs whose key was already seen, keeping first-seen order
pub fn dedupe_media<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for url in urls {
        let url = url.into();
        if seen.insert(media_key(&url).to_string()) {
            unique.push(url);
        }
    }
    unique
}
