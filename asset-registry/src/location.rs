use std::fmt;

/// Canonical form of a logical resource path: forward slashes only, no empty
/// or `.` segments, no leading or trailing separator. `..` folds into the
/// previous segment; unmatched `..` segments stay at the front.
pub fn normalize(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in raw.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            _ => segments.push(seg),
        }
    }
    segments.join("/")
}

/// A normalized logical resource identifier. Equality is by normalized value,
/// so `UI\\Icon`, `/UI//Icon/` and `UI/Icon` are the same location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Location(normalize(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the location climbs above the root it is resolved against.
    pub fn escapes_root(&self) -> bool {
        self.0 == ".." || self.0.starts_with("../")
    }

    /// Last segment; the asset name inside a bundle and the file stem in simulation mode.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Everything before the last segment, empty for single-segment locations.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Location::new(raw)
    }
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        Location::new(raw)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry map key: one loader exists per distinct (location, variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    location: Location,
    variant: Option<String>,
}

impl ResolvedKey {
    /// Blank variants are treated as no variant.
    pub fn new(location: impl Into<Location>, variant: Option<&str>) -> Self {
        let variant = variant
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        ResolvedKey {
            location: location.into(),
            variant,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(v) => write!(f, "{} [{}]", self.location, v),
            None => write!(f, "{}", self.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_canonicalized() {
        assert_eq!(Location::new("UI\\Icons//Play/"), Location::new("UI/Icons/Play"));
        assert_eq!(Location::new("/./UI/Icon").as_str(), "UI/Icon");
        assert!(Location::new("//").is_empty());
    }

    #[test]
    fn parent_segments_fold() {
        assert_eq!(Location::new("UI/../UI/Icon"), Location::new("UI/Icon"));
        assert_eq!(Location::new("UI/Icons/../../Icon").as_str(), "Icon");
        assert!(!Location::new("UI/../Icon").escapes_root());

        let up = Location::new("../Secret");
        assert_eq!(up.as_str(), "../Secret");
        assert!(up.escapes_root());
        assert!(Location::new("UI/../../x").escapes_root());
        assert!(Location::new("..").escapes_root());
        assert_eq!(
            ResolvedKey::new("UI\\..\\UI\\Icon", None),
            ResolvedKey::new("UI/Icon", None)
        );
    }

    #[test]
    fn name_and_parent() {
        let loc = Location::new("UI/Icons/Play");
        assert_eq!(loc.name(), "Play");
        assert_eq!(loc.parent(), "UI/Icons");

        let single = Location::new("Icon");
        assert_eq!(single.name(), "Icon");
        assert_eq!(single.parent(), "");
    }

    #[test]
    fn blank_variant_is_no_variant() {
        let a = ResolvedKey::new("UI/Icon", Some("  "));
        let b = ResolvedKey::new("UI\\Icon", None);
        assert_eq!(a, b);
        assert_ne!(a, ResolvedKey::new("UI/Icon", Some("hd")));
        assert_eq!(ResolvedKey::new("UI/Icon", Some("hd")).to_string(), "UI/Icon [hd]");
    }
}
