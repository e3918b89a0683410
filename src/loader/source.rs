use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use reqwest::Url;

use crate::error::LoadError;

/// Where audio bytes come from: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Url(Url),
    File(PathBuf),
}

impl AudioSource {
    /// Parse and sanitize a source reference.
    ///
    /// Accepts `http`/`https` URLs, `file` URLs and plain paths. Anything with
    /// another scheme (`javascript:`, `data:`, ...) is rejected before fetching.
    pub fn parse(src: &str) -> Result<Self, LoadError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(LoadError::InvalidSource("empty source".to_string()));
        }

        let Some(scheme) = url_scheme(src) else {
            return Ok(AudioSource::File(PathBuf::from(src)));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Url::parse(src)
                .map(AudioSource::Url)
                .map_err(|e| LoadError::InvalidSource(format!("{}: {}", src, e))),
            "file" => {
                let url = Url::parse(src)
                    .map_err(|e| LoadError::InvalidSource(format!("{}: {}", src, e)))?;
                url.to_file_path()
                    .map(AudioSource::File)
                    .map_err(|_| LoadError::InvalidSource(format!("{}: not a local path", src)))
            }
            other => Err(LoadError::InvalidSource(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }

    /// Lower-cased file extension, used as a format hint for probing.
    pub fn extension(&self) -> Option<String> {
        let ext = match self {
            AudioSource::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|name| Path::new(name).extension())
                .and_then(|e| e.to_str())
                .map(str::to_string),
            AudioSource::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string),
        };
        ext.filter(|e| !e.is_empty()).map(|e| e.to_ascii_lowercase())
    }
}

impl FromStr for AudioSource {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Url(url) => write!(f, "{}", url),
            AudioSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The URL scheme of `src`, if it has one.
///
/// Single letters are drive prefixes (`C:\music\a.mp3`), not schemes.
fn url_scheme(src: &str) -> Option<&str> {
    let (scheme, _) = src.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && scheme.len() > 1).then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_urls() {
        let source = AudioSource::parse("https://cdn.example.org/previews/219167-lq.ogg").unwrap();
        assert!(matches!(source, AudioSource::Url(_)));
        assert_eq!(source.extension().as_deref(), Some("ogg"));
    }

    #[test]
    fn accepts_plain_and_file_paths() {
        assert_eq!(
            AudioSource::parse("sample-15s.mp3").unwrap(),
            AudioSource::File(PathBuf::from("sample-15s.mp3"))
        );
        assert_eq!(
            AudioSource::parse("  ./audio/Track.WAV ").unwrap().extension().as_deref(),
            Some("wav")
        );
        #[cfg(unix)]
        assert_eq!(
            AudioSource::parse("file:///tmp/a.flac").unwrap(),
            AudioSource::File(PathBuf::from("/tmp/a.flac"))
        );
    }

    #[test]
    fn drive_letters_are_paths() {
        assert!(matches!(
            AudioSource::parse(r"C:\music\a.mp3").unwrap(),
            AudioSource::File(_)
        ));
    }

    #[test]
    fn rejects_unsafe_or_empty_sources() {
        for src in ["", "   ", "javascript:alert(1)", "data:audio/wav;base64,AAAA", "vbscript:x"] {
            assert!(
                matches!(AudioSource::parse(src), Err(LoadError::InvalidSource(_))),
                "{:?} should be rejected",
                src
            );
        }
    }

    #[test]
    fn url_without_extension() {
        let source: AudioSource = "https://example.org/stream".parse().unwrap();
        assert_eq!(source.extension(), None);
        assert_eq!(source.to_string(), "https://example.org/stream");
    }
}
