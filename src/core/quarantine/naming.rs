//! Pair tags and quarantine file names.

use regex::Regex;
use std::sync::LazyLock;

/// Role marker for the copy of the file that stayed in place
pub const KEEP_MARKER: &str = "KEPT";

/// Role marker for the file moved out of the tree
pub const DISCARD_MARKER: &str = "GONE";

/// Number of hex characters kept from the pair digest
pub const TAG_LEN: usize = 5;

/// Which side of a reconciled pair a quarantine file stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Kept,
    Discarded,
}

impl Role {
    pub fn marker(&self) -> &'static str {
        match self {
            Role::Kept => KEEP_MARKER,
            Role::Discarded => DISCARD_MARKER,
        }
    }

    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            KEEP_MARKER => Some(Role::Kept),
            DISCARD_MARKER => Some(Role::Discarded),
            _ => None,
        }
    }
}

/// Deterministic tag for a `(kept, discarded)` name pair.
///
/// Order matters: the kept name is always hashed first.
pub fn pair_tag(kept_name: &str, discarded_name: &str) -> String {
    let digest = md5::compute(format!("{}{}", kept_name, discarded_name));
    let mut tag = format!("{:x}", digest);
    tag.truncate(TAG_LEN);
    tag
}

/// `<tag>_<marker>_<name>`
pub fn quarantine_name(tag: &str, role: Role, name: &str) -> String {
    format!("{}_{}_{}", tag, role.marker(), name)
}

/// A quarantine file name split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName<'a> {
    pub tag: &'a str,
    pub role: Role,
    pub original: &'a str,
}

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-f]+)_(KEPT|GONE)_(.+)$").expect("quarantine name pattern is valid")
});

/// Split `<tag>_<marker>_<name>`; the original name is whatever follows the prefix
pub fn parse_quarantine_name(file_name: &str) -> Option<ParsedName<'_>> {
    let captures = NAME_PATTERN.captures(file_name)?;
    let tag = captures.get(1)?.as_str();
    let role = Role::from_marker(captures.get(2)?.as_str())?;
    let original = captures.get(3)?.as_str();

    Some(ParsedName {
        tag,
        role,
        original,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_five_lowercase_hex_chars() {
        let tag = pair_tag("a.jpg", "b.jpg");
        assert_eq!(tag.len(), TAG_LEN);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tag_is_deterministic() {
        assert_eq!(pair_tag("a.jpg", "b.jpg"), pair_tag("a.jpg", "b.jpg"));
    }

    #[test]
    fn tag_matches_md5_prefix_of_concatenation() {
        let expected = format!("{:x}", md5::compute("a.jpgb.jpg"));
        assert_eq!(pair_tag("a.jpg", "b.jpg"), expected[..5]);
    }

    #[test]
    fn tag_depends_on_order() {
        assert_ne!(pair_tag("a.jpg", "b.jpg"), pair_tag("b.jpg", "a.jpg"));
    }

    #[test]
    fn names_carry_role_markers() {
        assert_eq!(quarantine_name("abcde", Role::Kept, "a.jpg"), "abcde_KEPT_a.jpg");
        assert_eq!(
            quarantine_name("abcde", Role::Discarded, "b.jpg"),
            "abcde_GONE_b.jpg"
        );
    }

    #[test]
    fn parse_recovers_original_name() {
        let parsed = parse_quarantine_name("abcde_GONE_b.jpg").unwrap();
        assert_eq!(parsed.tag, "abcde");
        assert_eq!(parsed.role, Role::Discarded);
        assert_eq!(parsed.original, "b.jpg");
    }

    #[test]
    fn parse_keeps_underscores_in_original_name() {
        let parsed = parse_quarantine_name("0f1e2_KEPT_IMG_6652_KEPT_copy.jpg").unwrap();
        assert_eq!(parsed.role, Role::Kept);
        assert_eq!(parsed.original, "IMG_6652_KEPT_copy.jpg");
    }

    #[test]
    fn parse_accepts_tags_of_other_lengths() {
        let parsed = parse_quarantine_name("abcdef12_GONE_x.png").unwrap();
        assert_eq!(parsed.tag, "abcdef12");
        assert_eq!(parsed.original, "x.png");
    }

    #[test]
    fn parse_rejects_unrelated_names() {
        assert!(parse_quarantine_name("holiday.jpg").is_none());
        assert!(parse_quarantine_name("ABCDE_GONE_b.jpg").is_none());
        assert!(parse_quarantine_name("abcde_LOST_b.jpg").is_none());
        assert!(parse_quarantine_name("abcde_GONE_").is_none());
    }

    #[test]
    fn round_trip_through_name() {
        let tag = pair_tag("a.jpg", "b.jpg");
        let name = quarantine_name(&tag, Role::Discarded, "b.jpg");
        let parsed = parse_quarantine_name(&name).unwrap();
        assert_eq!((parsed.tag, parsed.original), (tag.as_str(), "b.jpg"));
    }
}
