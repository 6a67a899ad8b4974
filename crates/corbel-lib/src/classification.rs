//! Shear-span to depth (a/d) evaluation

use crate::models::{Classification, DesignParameters};

/// Below this a/d the element is a short corbel
pub const SHORT_CORBEL_THRESHOLD: f64 = 1.0;

pub const SHORT_CORBEL_WARNING: &str = "Element classified as a short corbel (a/d < 1.0).";

/// a/d ratio and the classification derived from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryAssessment {
    pub ad_ratio: f64,
    pub classification: Option<Classification>,
}

impl GeometryAssessment {
    pub fn evaluate(params: &DesignParameters) -> Self {
        let ad_ratio = params.a / params.d;
        let classification =
            (ad_ratio < SHORT_CORBEL_THRESHOLD).then_some(Classification::ShortCorbel);
        Self {
            ad_ratio,
            classification,
        }
    }

    pub fn is_short_corbel(&self) -> bool {
        self.classification == Some(Classification::ShortCorbel)
    }

    pub fn warning(&self) -> Option<&'static str> {
        self.is_short_corbel().then_some(SHORT_CORBEL_WARNING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_geometry(a: f64, d: f64) -> DesignParameters {
        DesignParameters {
            a,
            d,
            ..DesignParameters::default()
        }
    }

    #[test]
    fn test_deep_lever_arm_is_short_corbel() {
        let assessment = GeometryAssessment::evaluate(&with_geometry(100.0, 600.0));
        assert!((assessment.ad_ratio - 0.1667).abs() < 1e-4);
        assert!(assessment.is_short_corbel());
        assert_eq!(assessment.warning(), Some(SHORT_CORBEL_WARNING));
    }

    #[test]
    fn test_long_lever_arm_has_no_warning() {
        let assessment = GeometryAssessment::evaluate(&with_geometry(500.0, 300.0));
        assert!((assessment.ad_ratio - 1.6667).abs() < 1e-4);
        assert_eq!(assessment.classification, None);
        assert!(assessment.warning().is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let assessment = GeometryAssessment::evaluate(&with_geometry(400.0, 400.0));
        assert_eq!(assessment.ad_ratio, 1.0);
        assert!(!assessment.is_short_corbel());
    }
}
