//! Feature normalization.
//!
//! Category scores are fixed: low/controlled → 0.0, medium/outdoor → 0.5,
//! high/outdoor_adverse → 1.0. Unrecognized labels have already collapsed to
//! the lowest-risk variant while parsing, so this step never fails.

use crate::domain::{FeatureVector, ProjectAttributes};

/// Build the feature vector for a project.
///
/// A negative or NaN height is treated as ground level (0.0).
pub fn normalize(attrs: &ProjectAttributes) -> FeatureVector {
    FeatureVector::new(
        attrs.height_m.max(0.0),
        attrs.complexity.score(),
        attrs.environment.score(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Complexity, Environment};

    #[test]
    fn maps_categories_to_fixed_scores() {
        let attrs = ProjectAttributes::new(4.5, Complexity::Medium, Environment::OutdoorAdverse);
        let f = normalize(&attrs);
        assert_eq!(f, FeatureVector::new(4.5, 0.5, 1.0));
    }

    #[test]
    fn unknown_labels_score_zero() {
        let attrs: ProjectAttributes =
            serde_json::from_str(r#"{"height_m": 1.0, "complexity": "??", "environment": "??"}"#).unwrap();
        let f = normalize(&attrs);
        assert_eq!(f.complexity_score, 0.0);
        assert_eq!(f.environment_score, 0.0);
    }

    #[test]
    fn nan_and_negative_heights_clamp_to_ground() {
        for h in [f64::NAN, -3.0] {
            let f = normalize(&ProjectAttributes::new(h, Complexity::Low, Environment::Controlled));
            assert_eq!(f.height_m, 0.0);
        }
    }
}
