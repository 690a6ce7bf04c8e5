// NDVI classification
//
// Two independent scales: the six-step legend scale (category + map color)
// and the coarser four-step badge scale used for inline status badges.

use serde::Serialize;

/// Legend category for an NDVI value
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NdviCategory {
    WaterSoil,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl NdviCategory {
    pub const ALL: [NdviCategory; 6] = [
        NdviCategory::WaterSoil,
        NdviCategory::Poor,
        NdviCategory::Fair,
        NdviCategory::Good,
        NdviCategory::VeryGood,
        NdviCategory::Excellent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NdviCategory::WaterSoil => "Water/Soil",
            NdviCategory::Poor => "Poor",
            NdviCategory::Fair => "Fair",
            NdviCategory::Good => "Good",
            NdviCategory::VeryGood => "Very Good",
            NdviCategory::Excellent => "Excellent",
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            NdviCategory::WaterSoil => "#8B4513",
            NdviCategory::Poor => "#FFEDA0",
            NdviCategory::Fair => "#FED976",
            NdviCategory::Good => "#93C47D",
            NdviCategory::VeryGood => "#38761D",
            NdviCategory::Excellent => "#0B5345",
        }
    }

    /// Inclusive lower bound of the category, `None` for the open bottom bucket
    pub fn lower_bound(&self) -> Option<f64> {
        match self {
            NdviCategory::WaterSoil => None,
            NdviCategory::Poor => Some(0.0),
            NdviCategory::Fair => Some(0.2),
            NdviCategory::Good => Some(0.4),
            NdviCategory::VeryGood => Some(0.6),
            NdviCategory::Excellent => Some(0.8),
        }
    }
}

/// Result of the legend classification
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct NdviClass {
    pub category: NdviCategory,
    pub label: &'static str,
    pub color_hex: &'static str,
}

impl From<NdviCategory> for NdviClass {
    fn from(category: NdviCategory) -> Self {
        Self {
            category,
            label: category.label(),
            color_hex: category.color_hex(),
        }
    }
}

/// Classify on the legend scale. Half-open buckets; NaN falls to the lowest.
pub fn classify(ndvi: f64) -> NdviClass {
    let category = NdviCategory::ALL
        .iter()
        .rev()
        .find(|c| c.lower_bound().map_or(true, |lower| ndvi >= lower))
        .copied()
        .unwrap_or(NdviCategory::WaterSoil);
    category.into()
}

/// Coarse health badge
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthBadge {
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl HealthBadge {
    pub fn label(&self) -> &'static str {
        match self {
            HealthBadge::Poor => "Poor",
            HealthBadge::Moderate => "Moderate",
            HealthBadge::Good => "Good",
            HealthBadge::Excellent => "Excellent",
        }
    }
}

pub fn badge(ndvi: f64) -> HealthBadge {
    if ndvi >= 0.7 {
        HealthBadge::Excellent
    } else if ndvi >= 0.5 {
        HealthBadge::Good
    } else if ndvi >= 0.3 {
        HealthBadge::Moderate
    } else {
        HealthBadge::Poor
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color_hex: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Legend rows from lowest to highest category
pub fn legend() -> Vec<LegendEntry> {
    NdviCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| LegendEntry {
            label: c.label(),
            color_hex: c.color_hex(),
            min: c.lower_bound(),
            max: NdviCategory::ALL.get(i + 1).and_then(|next| next.lower_bound()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_buckets() {
        assert_eq!(classify(-0.5).category, NdviCategory::WaterSoil);
        assert_eq!(classify(0.1).category, NdviCategory::Poor);
        assert_eq!(classify(0.3).category, NdviCategory::Fair);
        assert_eq!(classify(0.5).category, NdviCategory::Good);
        assert_eq!(classify(0.65).category, NdviCategory::VeryGood);
        assert_eq!(classify(0.9).category, NdviCategory::Excellent);
    }

    #[test]
    fn test_classify_boundaries_are_half_open() {
        assert_eq!(classify(0.0).label, "Poor");
        assert_eq!(classify(0.2).label, "Fair");
        assert_eq!(classify(0.4).label, "Good");
        assert_eq!(classify(0.6).label, "Very Good");
        assert_eq!(classify(0.8).label, "Excellent");
        assert_eq!(classify(0.199_999).label, "Poor");
    }

    #[test]
    fn test_classify_out_of_range_and_nan() {
        assert_eq!(classify(-7.0).category, NdviCategory::WaterSoil);
        assert_eq!(classify(3.0).category, NdviCategory::Excellent);
        assert_eq!(classify(f64::NAN).category, NdviCategory::WaterSoil);
        assert_eq!(badge(f64::NAN), HealthBadge::Poor);
    }

    #[test]
    fn test_classify_covers_unit_range() {
        let mut v = -1.0;
        while v <= 1.0 {
            let class = classify(v);
            assert!(NdviCategory::ALL.contains(&class.category));
            assert_eq!(class.color_hex, class.category.color_hex());
            v += 0.01;
        }
    }

    #[test]
    fn test_very_good_color() {
        let class = classify(0.65);
        assert_eq!(class.label, "Very Good");
        assert_eq!(class.color_hex, "#38761D");
    }

    #[test]
    fn test_badge_scale_is_distinct() {
        assert_eq!(badge(0.29), HealthBadge::Poor);
        assert_eq!(badge(0.3), HealthBadge::Moderate);
        assert_eq!(badge(0.5), HealthBadge::Good);
        assert_eq!(badge(0.7), HealthBadge::Excellent);
        // 0.25 is "Fair" on the legend but "Poor" as a badge
        assert_eq!(classify(0.25).label, "Fair");
        assert_eq!(badge(0.25).label(), "Poor");
    }

    #[test]
    fn test_legend_rows() {
        let rows = legend();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].min, None);
        assert_eq!(rows[0].max, Some(0.0));
        assert_eq!(rows[5].label, "Excellent");
        assert_eq!(rows[5].max, None);
    }
}
