//! Turning caller input into a `(source, selectors)` request.

use serde::{Deserialize, Serialize};

/// Characters accepted between path segments.
pub const SEPARATORS: [char; 5] = ['.', ',', '|', '/', ' '];

/// A leading segment dropped from paths, so `/proc/uptime` names `uptime`.
const PROC_PREFIX: &str = "proc";

/// A path or selector list as callers send it: one delimited string or a list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum PathSpec {
    Text(String),
    Segments(Vec<String>),
}

impl PathSpec {
    /// Splits into non-empty segments. List elements are split too.
    pub fn segments(&self) -> Vec<String> {
        match self {
            PathSpec::Text(text) => split(text),
            PathSpec::Segments(parts) => parts.iter().flat_map(|p| split(p)).collect(),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(text: &str) -> Self {
        PathSpec::Text(text.to_string())
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(parts: Vec<String>) -> Self {
        PathSpec::Segments(parts)
    }
}

fn split(text: &str) -> Vec<String> {
    text.split(SEPARATORS)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A normalized lookup: which source, and which ids within it.
///
/// Neither field is canonicalized; matching is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub source: String,
    pub selectors: Vec<String>,
}

impl Request {
    pub fn new(source: impl Into<String>, selectors: Vec<String>) -> Self {
        Self {
            source: source.into(),
            selectors: dedup(selectors),
        }
    }

    /// Normalizes the two request styles.
    ///
    /// A non-empty `path` wins: its first segment (after an optional `proc`)
    /// is the source and the rest are selectors. Otherwise `source` is split
    /// the same way, and its trailing segments are appended to `selectors`.
    /// Returns `None` when no source can be identified.
    pub fn normalize(
        path: Option<&PathSpec>,
        source: Option<&PathSpec>,
        selectors: Option<&PathSpec>,
    ) -> Option<Self> {
        let path = path.map(PathSpec::segments).unwrap_or_default();
        if let Some((source, rest)) = split_source(path) {
            return Some(Self::new(source, rest));
        }

        let (source, trailing) = split_source(source.map(PathSpec::segments).unwrap_or_default())?;
        let mut wanted = selectors.map(PathSpec::segments).unwrap_or_default();
        wanted.extend(trailing);
        Some(Self::new(source, wanted))
    }
}

fn split_source(mut segments: Vec<String>) -> Option<(String, Vec<String>)> {
    if segments.first().is_some_and(|s| s == PROC_PREFIX) {
        segments.remove(0);
    }
    if segments.is_empty() {
        return None;
    }
    let rest = segments.split_off(1);
    segments.pop().map(|source| (source, rest))
}

fn dedup(selectors: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(selectors.len());
    for s in selectors {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> PathSpec {
        PathSpec::from(s)
    }

    #[test]
    fn test_path_with_proc_prefix() {
        let req = Request::normalize(Some(&text("/proc/uptime/total")), None, None).unwrap();
        assert_eq!(req, Request::new("uptime", vec!["total".into()]));
    }

    #[test]
    fn test_path_accepts_every_separator() {
        let req = Request::normalize(
            Some(&text("cpuinfo.model_name,bogomips|core_id mhz/cache_size")),
            None,
            None,
        )
        .unwrap();
        assert_eq!(req.source, "cpuinfo");
        assert_eq!(
            req.selectors,
            vec!["model_name", "bogomips", "core_id", "mhz", "cache_size"]
        );
    }

    #[test]
    fn test_path_segments_are_split_too() {
        let spec = PathSpec::from(vec!["proc".to_string(), "cpuinfo/core0".to_string()]);
        let req = Request::normalize(Some(&spec), None, None).unwrap();
        assert_eq!(req, Request::new("cpuinfo", vec!["core0".into()]));
    }

    #[test]
    fn test_path_takes_priority() {
        let req = Request::normalize(
            Some(&text("uptime/idle")),
            Some(&text("meminfo")),
            Some(&text("memfree")),
        )
        .unwrap();
        assert_eq!(req, Request::new("uptime", vec!["idle".into()]));
    }

    #[test]
    fn test_empty_path_falls_back_to_source() {
        let req = Request::normalize(Some(&text("/")), Some(&text("uptime")), None).unwrap();
        assert_eq!(req.source, "uptime");
        assert!(req.selectors.is_empty());
    }

    #[test]
    fn test_source_trailing_segments_follow_selectors() {
        let req = Request::normalize(
            None,
            Some(&text("/proc/cpuinfo/core1")),
            Some(&text("model_name, mhz")),
        )
        .unwrap();
        assert_eq!(req.source, "cpuinfo");
        assert_eq!(req.selectors, vec!["model_name", "mhz", "core1"]);
    }

    #[test]
    fn test_no_source() {
        assert!(Request::normalize(None, None, Some(&text("total"))).is_none());
        assert!(Request::normalize(Some(&text("/proc/")), None, None).is_none());
    }

    #[test]
    fn test_input_is_not_canonicalized() {
        let req = Request::normalize(Some(&text("UpTime/Total")), None, None).unwrap();
        assert_eq!(req, Request::new("UpTime", vec!["Total".into()]));
    }

    #[test]
    fn test_duplicate_selectors_collapse() {
        let req = Request::normalize(Some(&text("uptime/total/idle/total")), None, None).unwrap();
        assert_eq!(req.selectors, vec!["total", "idle"]);
    }
}
