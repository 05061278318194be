//! Version ordering for feed version strings.
//!
//! Feeds publish versions that are not always strict semver (`1.2`, `1.2.3.4`,
//! `1.02.0`). They are parsed leniently into [`semver::Version`]:
//!
//! - missing minor/patch components are padded with zeros
//! - a fourth numeric component becomes leading build metadata
//! - leading zeros are dropped
//!
//! Strings that still fail to parse sort below every parsable version and
//! among themselves lexically. The raw string is always what callers keep.

use std::cmp::Ordering;

use semver::Version;

/// Parse a feed version string, or `None` when it is not version-like.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let split_at = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split_at);

    let parts: Vec<u64> = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }

    let component = |i: usize| parts.get(i).copied().unwrap_or(0);
    let mut normalized = format!("{}.{}.{}", component(0), component(1), component(2));

    match (parts.get(3), suffix.find('+')) {
        (Some(revision), Some(plus)) => {
            normalized.push_str(&suffix[..plus]);
            normalized.push_str(&format!("+{revision}.{}", &suffix[plus + 1..]));
        }
        (Some(revision), None) => {
            normalized.push_str(suffix);
            normalized.push_str(&format!("+{revision}"));
        }
        (None, _) => normalized.push_str(suffix),
    }

    Version::parse(&normalized).ok()
}

/// Total order over raw version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// The highest version of `versions`, as published.
pub fn latest(versions: &[String]) -> Option<&String> {
    versions.iter().max_by(|a, b| compare(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", "1.2.3")]
    #[case("1.2", "1.2.0")]
    #[case("7", "7.0.0")]
    #[case("1.02.0", "1.2.0")]
    #[case("1.2.3.4", "1.2.3+4")]
    #[case("1.2.3.4-beta", "1.2.3-beta+4")]
    #[case("1.2.3.4-beta+abc", "1.2.3-beta+4.abc")]
    #[case("2.0.0-rc.1", "2.0.0-rc.1")]
    fn lenient_parse_normalizes(#[case] raw: &str, #[case] expected: &str) {
        let parsed = parse_lenient(raw).expect("parsable");
        assert_eq!(parsed.to_string(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("latest")]
    #[case("1.x")]
    #[case("1.2.3.4.5")]
    fn lenient_parse_rejects(#[case] raw: &str) {
        assert!(parse_lenient(raw).is_none(), "{raw} should not parse");
    }

    #[rstest]
    #[case("1.10.0", "1.9.0", Ordering::Greater)]
    #[case("2.0.0-beta", "2.0.0", Ordering::Less)]
    #[case("1.2.3.10", "1.2.3.9", Ordering::Greater)]
    #[case("1.0", "0.9.9", Ordering::Greater)]
    #[case("nightly", "0.0.1", Ordering::Less)]
    fn ordering_is_semantic(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare(a, b), expected);
    }

    #[test]
    fn latest_keeps_published_spelling() {
        let versions = vec!["1.9.0".to_string(), "1.10".to_string(), "1.2.0".to_string()];
        assert_eq!(latest(&versions).map(String::as_str), Some("1.10"));
    }

    #[test]
    fn latest_of_nothing_is_none() {
        assert_eq!(latest(&[]), None);
    }
}
