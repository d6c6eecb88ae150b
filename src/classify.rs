//! Proximity-based label association.
//!
//! Each candidate symbol is classified independently against the full token
//! sequence: tokens are scanned in extraction order and considered only while
//! strictly nearer than the current best distance, which starts at the
//! resolution-scaled association limit and shrinks with every accepted match.
//!
//! FAT/FDT keyword matches are unconditional category overrides: they replace
//! an already-accepted pole label whenever they beat its distance. The reverse
//! never happens — once a keyword has claimed the candidate, pole-pattern
//! matches are ignored regardless of distance. This asymmetry reproduces the
//! established field behavior and is pinned by a test below.

use tracing::instrument;

use crate::{naming::NamingConfig, CandidateSymbol, Category, TextToken};

/// Association distance of the 300-DPI reference profile, in pixels.
pub const REFERENCE_ASSOCIATION_DISTANCE: f32 = 150.0;

/// Scales the association limit with scan resolution, floored so coarse scans
/// keep a usable search radius (~80 px around 160 DPI, matching the legacy
/// default profile).
pub fn association_distance_for_dpi(dpi: u32) -> f32 {
    (REFERENCE_ASSOCIATION_DISTANCE * dpi as f32 / 300.0).max(40.0)
}

/// Finds the best label for one candidate, or `None` if no token qualifies.
/// Unmatched candidates are dropped by the pipeline, never emitted as
/// "unknown" entities.
#[instrument(level = "trace", skip(tokens, naming))]
pub fn classify_symbol(
    symbol: &CandidateSymbol,
    tokens: &[TextToken],
    naming: &NamingConfig,
    max_association_distance: f32,
) -> Option<(Category, String)> {
    let mut best_label: Option<&str> = None;
    let mut best_category = Category::Pole;
    let mut best_distance = max_association_distance;

    for token in tokens {
        let dist = ((symbol.x - token.cx).powi(2) + (symbol.y - token.cy).powi(2)).sqrt();
        if dist >= best_distance {
            continue;
        }
        if naming.is_fat(&token.text) {
            best_category = Category::Fat;
            best_label = Some(&token.text);
            best_distance = dist;
        } else if naming.is_fdt(&token.text) {
            best_category = Category::Fdt;
            best_label = Some(&token.text);
            best_distance = dist;
        } else if naming.is_pole_label(&token.text) && best_category == Category::Pole {
            best_label = Some(&token.text);
            best_distance = dist;
        }
    }

    best_label.map(|label| (best_category, label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::PolePattern;

    fn naming(pattern: PolePattern) -> NamingConfig {
        NamingConfig::new("FOT", "FDT", pattern).unwrap()
    }

    fn token(text: &str, cx: f32, cy: f32) -> TextToken {
        TextToken {
            text: text.to_string(),
            cx,
            cy,
            confidence: 90.0,
        }
    }

    fn symbol(x: f32, y: f32) -> CandidateSymbol {
        CandidateSymbol { x, y, radius: 12.0 }
    }

    #[test]
    fn fat_keyword_near_circle_classifies_as_fat() {
        let tokens = vec![token("FOT12", 120.0, 100.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsThenLetter),
            150.0,
        );
        assert_eq!(result, Some((Category::Fat, "FOT12".to_string())));
    }

    #[test]
    fn pole_label_depends_on_the_selected_preset() {
        let tokens = vec![token("P-07", 110.0, 100.0)];
        let sym = symbol(100.0, 100.0);

        let result = classify_symbol(&sym, &tokens, &naming(PolePattern::LetterDashDigits), 150.0);
        assert_eq!(result, Some((Category::Pole, "P-07".to_string())));

        // Under digits-only the same token no longer matches; the candidate
        // is dropped instead of being emitted unlabeled.
        let result = classify_symbol(&sym, &tokens, &naming(PolePattern::DigitsOnly), 150.0);
        assert_eq!(result, None);
    }

    #[test]
    fn tokens_beyond_the_association_distance_never_attach() {
        let tokens = vec![token("FOT12", 500.0, 500.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, None);

        // The limit is strict: a token exactly at the limit does not attach.
        let tokens = vec![token("FOT12", 250.0, 100.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, None);
    }

    #[test]
    fn nearest_of_two_pole_labels_wins() {
        let tokens = vec![token("12", 100.0, 180.0), token("34", 100.0, 130.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, Some((Category::Pole, "34".to_string())));
    }

    #[test]
    fn keyword_overrides_accepted_pole_label() {
        // The FDT token is scanned after the pole token and is nearer, so the
        // keyword override replaces the accepted pole label.
        let tokens = vec![token("42", 100.0, 160.0), token("FDT-A", 100.0, 140.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, Some((Category::Fdt, "FDT-A".to_string())));
    }

    #[test]
    fn pole_label_never_displaces_a_keyword_match() {
        // Established asymmetry: once a keyword claims the candidate, an even
        // nearer pole-pattern token is ignored.
        let tokens = vec![token("FDT-A", 100.0, 140.0), token("42", 100.0, 110.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, Some((Category::Fdt, "FDT-A".to_string())));
    }

    #[test]
    fn farther_keyword_loses_to_nearer_accepted_keyword() {
        // The shrinking distance gate still applies between keyword matches.
        let tokens = vec![token("FOT1", 100.0, 120.0), token("FDT2", 100.0, 140.0)];
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &tokens,
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, Some((Category::Fat, "FOT1".to_string())));
    }

    #[test]
    fn no_tokens_means_no_match() {
        let result = classify_symbol(
            &symbol(100.0, 100.0),
            &[],
            &naming(PolePattern::DigitsOnly),
            150.0,
        );
        assert_eq!(result, None);
    }
}
