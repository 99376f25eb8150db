//! Tag-based categorization of event titles.
//!
//! Titles following the `@XXX` convention (exactly three uppercase ASCII
//! letters after `@`, then a space or underscore) are split into a category
//! and a subcategory; everything else falls into [`OTHER_CATEGORY`].

use std::sync::LazyLock;

use regex::Regex;

/// Category assigned to titles that do not carry an `@XXX` tag.
pub const OTHER_CATEGORY: &str = "Other";

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Z]{3})[ _](.*)").expect("category pattern is valid")
});

static RECURRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@[A-Z]{3}[ _].*$").expect("recurring pattern is valid")
});

/// Splits a title into `(category, subcategory)`.
///
/// Untagged titles yield `("Other", title)`. The match is a plain ASCII
/// pattern: no locale-aware case folding.
#[must_use]
pub fn categorize(title: &str) -> (String, String) {
    CATEGORY_RE.captures(title).map_or_else(
        || (OTHER_CATEGORY.to_string(), title.to_string()),
        |captures| (captures[1].to_string(), captures[2].to_string()),
    )
}

/// Whether a title is eligible for the recurring-events summary.
///
/// Eligible titles carry at most one `@` and match the `@XXX` convention.
/// A dual-tagged title like `"@ENG @OPS sync"` is still categorized as
/// `ENG` by [`categorize`] but is excluded here; the asymmetry is part of
/// the legacy data contract.
#[must_use]
pub fn is_recurring_candidate(title: &str) -> bool {
    title.matches('@').count() <= 1 && RECURRING_RE.is_match(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_title_splits_into_category_and_subcategory() {
        assert_eq!(categorize("@ENG Fix bug"), ("ENG".into(), "Fix bug".into()));
        assert_eq!(categorize("@OPS_Deploy"), ("OPS".into(), "Deploy".into()));
    }

    #[test]
    fn untagged_title_falls_back_to_other() {
        assert_eq!(categorize("Team sync"), ("Other".into(), "Team sync".into()));
    }

    #[test]
    fn tag_must_be_three_uppercase_ascii_letters() {
        assert_eq!(categorize("@EN Standup").0, "Other");
        assert_eq!(categorize("@ENGX Standup").0, "Other");
        assert_eq!(categorize("@eng Standup").0, "Other");
        // No separator after the tag
        assert_eq!(categorize("@ENGStandup").0, "Other");
    }

    #[test]
    fn tag_must_be_at_start_of_title() {
        assert_eq!(categorize("Weekly @ENG sync").0, "Other");
    }

    #[test]
    fn dual_tagged_title_still_categorizes_by_first_tag() {
        assert_eq!(categorize("@ENG @OPS dual tag").0, "ENG");
    }

    #[test]
    fn recurring_candidate_excludes_multiple_at_signs() {
        assert!(is_recurring_candidate("@ENG Standup"));
        assert!(is_recurring_candidate("@OPS_Deploy"));
        assert!(!is_recurring_candidate("@ENG @OPS dual tag"));
        assert!(!is_recurring_candidate("Team sync"));
        assert!(!is_recurring_candidate("@eng standup"));
    }
}
