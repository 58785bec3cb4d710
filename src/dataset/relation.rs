use super::palette::Rgb;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RelationType {
    Prerequisite,
    Derived,
    Similar,
    Contrast,
    Application,
    Includes,
    #[default]
    Reference,
}

impl RelationType {
    pub const ALL: [Self; 7] = [
        Self::Prerequisite,
        Self::Derived,
        Self::Similar,
        Self::Contrast,
        Self::Application,
        Self::Includes,
        Self::Reference,
    ];

    /// Parses a relation type key. Unknown or missing keys fall back to
    /// [`RelationType::Reference`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::Reference;
        };

        Self::ALL
            .into_iter()
            .find(|relation| relation.key().eq_ignore_ascii_case(raw))
            .unwrap_or(Self::Reference)
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Prerequisite => "prerequisite",
            Self::Derived => "derived",
            Self::Similar => "similar",
            Self::Contrast => "contrast",
            Self::Application => "application",
            Self::Includes => "includes",
            Self::Reference => "reference",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Prerequisite => "Prerequisite",
            Self::Derived => "Derived",
            Self::Similar => "Similar",
            Self::Contrast => "Contrast",
            Self::Application => "Application",
            Self::Includes => "Includes",
            Self::Reference => "Reference",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Self::Prerequisite => Rgb(0xff4444),
            Self::Derived => Rgb(0x44ff44),
            Self::Similar => Rgb(0x4444ff),
            Self::Contrast => Rgb(0xffaa00),
            Self::Application => Rgb(0xff44ff),
            Self::Includes => Rgb(0x44ffff),
            Self::Reference => Rgb(0xaaaaaa),
        }
    }
}

/// Learning state of a knowledge node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeState {
    #[default]
    Default,
    NeedsReview,
    Mastered,
}

impl NodeState {
    pub fn parse(raw: Option<&str>, review_list: bool) -> Self {
        let raw = raw.map(|value| value.trim().to_ascii_lowercase());
        match raw.as_deref() {
            Some("mastered") => Self::Mastered,
            Some("reviewing" | "needs-review" | "needs_review" | "review") => Self::NeedsReview,
            _ if review_list => Self::NeedsReview,
            _ => Self::Default,
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Self::Default => Rgb(0x3b82f6),
            Self::NeedsReview => Rgb(0xf97316),
            Self::Mastered => Rgb(0x22c55e),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "learning",
            Self::NeedsReview => "needs review",
            Self::Mastered => "mastered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_parse_is_case_insensitive_with_reference_fallback() {
        assert_eq!(
            RelationType::parse(Some("Prerequisite")),
            RelationType::Prerequisite
        );
        assert_eq!(RelationType::parse(Some(" includes ")), RelationType::Includes);
        assert_eq!(RelationType::parse(Some("sibling")), RelationType::Reference);
        assert_eq!(RelationType::parse(None), RelationType::Reference);
    }

    #[test]
    fn relation_keys_round_trip() {
        for relation in RelationType::ALL {
            assert_eq!(RelationType::parse(Some(relation.key())), relation);
        }
    }

    #[test]
    fn node_state_accepts_review_aliases() {
        assert_eq!(NodeState::parse(Some("mastered"), false), NodeState::Mastered);
        assert_eq!(NodeState::parse(Some("reviewing"), false), NodeState::NeedsReview);
        assert_eq!(NodeState::parse(None, true), NodeState::NeedsReview);
        assert_eq!(NodeState::parse(Some("learning"), false), NodeState::Default);
        assert_eq!(NodeState::parse(Some("mastered"), true), NodeState::Mastered);
    }
}
