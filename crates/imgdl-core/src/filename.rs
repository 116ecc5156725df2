//! Filename derivation for downloaded and proxied images

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Names longer than this fall back to a synthesized name in bulk downloads
pub const DOWNLOAD_NAME_MAX: usize = 200;

/// Same fallback for the proxy endpoint's suggested filename
pub const PROXY_NAME_MAX: usize = 50;

const DEFAULT_EXTENSION: &str = ".jpg";

/// Last path segment of a URL, without query string or fragment.
pub fn url_basename(raw: &str) -> String {
    if let Ok(parsed) = url::Url::parse(raw) {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
    }

    let without_fragment = raw.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    without_query
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Filename used when saving `url` into the download directory.
///
/// Empty or overlong names become `image_<hash>.jpg`, where the hash is
/// derived from the URL alone.
pub fn download_filename(url: &str) -> String {
    let name = url_basename(url);
    let name = if name.is_empty() || name.chars().count() > DOWNLOAD_NAME_MAX {
        hashed_name(url)
    } else {
        name
    };

    let name = sanitize(&with_extension(name));
    if is_usable(&name) {
        name
    } else {
        hashed_name(url)
    }
}

/// Filename suggested to the browser by the proxy endpoint.
pub fn proxy_filename(url: &str) -> String {
    let name = url_basename(url);
    let name = if name.is_empty() || name.chars().count() > PROXY_NAME_MAX {
        random_name()
    } else {
        name
    };

    let name = sanitize(&with_extension(name));
    if is_usable(&name) {
        name
    } else {
        random_name()
    }
}

/// Keep alphanumerics, `.`, `_`, `-` and spaces, then trim whitespace.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split `name` into stem and extension (extension keeps its dot).
///
/// A leading dot does not start an extension, so `.jpg` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

fn with_extension(mut name: String) -> String {
    if !name.contains('.') {
        name.push_str(DEFAULT_EXTENSION);
    }
    name
}

fn is_usable(name: &str) -> bool {
    name.chars().any(|c| c != '.')
}

fn hashed_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("image_{}{}", hasher.finish(), DEFAULT_EXTENSION)
}

fn random_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("image_{}{}", &id[..8], DEFAULT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_drops_query_and_fragment() {
        assert_eq!(url_basename("http://x/photos/a.jpg?w=100#top"), "a.jpg");
        assert_eq!(url_basename("http://x/dir/"), "");
        assert_eq!(url_basename("http://x"), "");
        assert_eq!(url_basename("not a url/b.png?x=1"), "b.png");
    }

    #[test]
    fn trailing_slash_synthesizes_jpg_name() {
        let name = download_filename("http://x/gallery/");
        assert!(name.starts_with("image_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name, download_filename("http://x/gallery/"));
    }

    #[test]
    fn missing_extension_gets_jpg() {
        assert_eq!(download_filename("http://x/photo"), "photo.jpg");
        assert_eq!(download_filename("http://x/photo.png"), "photo.png");
    }

    #[test]
    fn overlong_names_use_each_threshold() {
        let long = "a".repeat(120);
        let url = format!("http://x/{}.jpg", long);
        assert_eq!(download_filename(&url), format!("{}.jpg", long));

        let proxied = proxy_filename(&url);
        assert!(proxied.starts_with("image_"));
        assert_eq!(proxied.len(), "image_".len() + 8 + ".jpg".len());

        let very_long = format!("http://x/{}.jpg", "b".repeat(250));
        assert!(download_filename(&very_long).starts_with("image_"));
    }

    #[test]
    fn sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize(" my\"file<1>.jpg "), "myfile1.jpg");
        assert_eq!(sanitize("photo_01-final copy.png"), "photo_01-final copy.png");
        assert_eq!(download_filename("http://x/%22evil%22.jpg"), "22evil22.jpg");
    }

    #[test]
    fn unusable_names_fall_back() {
        assert_eq!(download_filename("http://x/%3F%3F%3F"), "3F3F3F.jpg");
        let name = download_filename("http://x/....");
        assert!(name.starts_with("image_"));
    }

    #[test]
    fn split_extension_behaves_like_splitext() {
        assert_eq!(split_extension("a.jpg"), ("a", ".jpg"));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
