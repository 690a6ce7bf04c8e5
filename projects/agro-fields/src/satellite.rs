// Simulated satellite NDVI service
//
// Stands in for a remote Sentinel-style backend: NDVI follows a seasonal
// curve peaking in June with random jitter. Serves as the default analysis
// port for drawn areas as well as the raw NDVI/history/imagery endpoints.

use crate::engine::analysis::{AnalysisRequestPort, NdviReport, NdviZone};
use crate::engine::error::AnalysisError;
use crate::engine::types::{BoundingBox, Polygon};
use chrono::{Datelike, Days, NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const SAMPLE_COUNT: usize = 1000;
const SAMPLE_STD_DEV: f64 = 0.1;
const RETURNED_SAMPLES: usize = 100;
const ZONE_COUNT: usize = 5;
/// Sentinel-2 revisit interval
const REVISIT_DAYS: u64 = 16;

/// Seasonal NDVI baseline for a month (1-12), peaking at 0.8 in June
pub fn season_factor(month: u32) -> f64 {
    0.5 + 0.3 * ((month as f64 - 3.0) * PI / 6.0).sin()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImageryBands {
    #[default]
    TrueColor,
    FalseColor,
    Ndvi,
}

impl fmt::Display for ImageryBands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageryBands::TrueColor => "true-color",
            ImageryBands::FalseColor => "false-color",
            ImageryBands::Ndvi => "ndvi",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NdviHistory {
    pub dates: Vec<NaiveDate>,
    pub ndvi_values: Vec<f64>,
}

pub struct SimulatedSatellite {
    rng: Mutex<fastrand::Rng>,
    delay: Duration,
    image_base_url: String,
}

impl SimulatedSatellite {
    pub fn new(delay: Duration, image_base_url: &str, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            rng: Mutex::new(rng),
            delay,
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut fastrand::Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// NDVI statistics for an acquisition date
    pub fn ndvi_report(&self, date: NaiveDate) -> NdviReport {
        let (values, sampled) = self.with_rng(|rng| {
            let base = (season_factor(date.month()) + uniform(rng, -0.15, 0.15)).clamp(0.05, 0.95);

            let values: Vec<f64> = (0..SAMPLE_COUNT)
                .map(|_| normal(rng, base, SAMPLE_STD_DEV).clamp(0.0, 1.0))
                .collect();

            let mut sampled = values.clone();
            rng.shuffle(&mut sampled);
            sampled.truncate(RETURNED_SAMPLES);
            (values, sampled)
        });

        let average_ndvi = values.iter().sum::<f64>() / values.len() as f64;
        let min_ndvi = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ndvi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        NdviReport {
            average_ndvi,
            min_ndvi,
            max_ndvi,
            ndvi_values: sampled,
            ndvi_image_url: format!(
                "{}/ndvi-images/{}",
                self.image_base_url,
                date.format("%Y-%m-%d")
            ),
            zones: ndvi_zones(&values, min_ndvi, max_ndvi),
        }
    }

    /// One NDVI value per revisit from `start` through `end`
    pub fn historical_ndvi(&self, bbox: &BoundingBox, start: NaiveDate, end: NaiveDate) -> NdviHistory {
        debug!("Historical NDVI for {:?} from {} to {}", bbox, start, end);

        let mut dates = Vec::new();
        let mut ndvi_values = Vec::new();

        self.with_rng(|rng| {
            let mut last = 0.4 + uniform(rng, -0.1, 0.1);
            let mut current = Some(start);

            while let Some(day) = current.filter(|d| *d <= end) {
                let season = season_factor(day.month());
                last = 0.7 * season + 0.3 * last + uniform(rng, -0.05, 0.05) * 0.3;
                last = last.clamp(0.1, 0.9);

                dates.push(day);
                ndvi_values.push(last);
                current = day.checked_add_days(Days::new(REVISIT_DAYS));
            }
        });

        NdviHistory { dates, ndvi_values }
    }

    pub fn imagery_url(&self, bbox: &BoundingBox, date: NaiveDate, bands: ImageryBands) -> String {
        debug!("Imagery request for {:?} on {} ({})", bbox, date, bands);
        format!(
            "{}/satellite-images/{}/{}",
            self.image_base_url,
            bands,
            date.format("%Y-%m-%d")
        )
    }
}

impl AnalysisRequestPort for SimulatedSatellite {
    fn request_analysis(&self, polygon: Polygon) -> BoxFuture<'static, Result<NdviReport, AnalysisError>> {
        debug!("Simulating NDVI analysis for {} vertex polygon", polygon.len());
        let report = self.ndvi_report(Utc::now().date_naive());
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            Ok(report)
        }
        .boxed()
    }
}

fn uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Box-Muller draw from N(mean, std_dev)
fn normal(rng: &mut fastrand::Rng, mean: f64, std_dev: f64) -> f64 {
    let u1 = 1.0 - rng.f64(); // (0, 1]
    let u2 = rng.f64();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Split `[min, max]` into evenly spaced half-open bins; empty bins are skipped
pub fn ndvi_zones(values: &[f64], min: f64, max: f64) -> Vec<NdviZone> {
    if values.is_empty() {
        return Vec::new();
    }

    let step = (max - min) / ZONE_COUNT as f64;
    let mut edges: Vec<f64> = (0..=ZONE_COUNT).map(|i| min + step * i as f64).collect();
    edges[ZONE_COUNT] = max;

    edges
        .windows(2)
        .filter_map(|edge| {
            let (lo, hi) = (edge[0], edge[1]);
            let zone: Vec<f64> = values.iter().copied().filter(|v| *v >= lo && *v < hi).collect();
            if zone.is_empty() {
                return None;
            }
            Some(NdviZone {
                min: lo,
                max: hi,
                average: zone.iter().sum::<f64>() / zone.len() as f64,
                count: zone.len(),
                percentage: zone.len() as f64 / values.len() as f64 * 100.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Coordinate;

    fn satellite() -> SimulatedSatellite {
        SimulatedSatellite::new(Duration::from_millis(1), "https://example.com/", Some(42))
    }

    fn bbox() -> BoundingBox {
        BoundingBox {
            min_lat: 17.0,
            min_lng: 78.0,
            max_lat: 17.01,
            max_lng: 78.01,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_season_factor_peaks_in_june() {
        assert!((season_factor(6) - 0.8).abs() < 1e-9);
        assert!((season_factor(7) - 0.7598).abs() < 1e-4);
        assert!((1..=12).all(|m| season_factor(m) <= season_factor(6)));
        assert!((season_factor(12) - 0.2).abs() < 1e-9);
        assert!((season_factor(3) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_report_statistics_are_consistent() {
        let report = satellite().ndvi_report(date(2024, 7, 15));

        assert!(report.min_ndvi >= 0.0 && report.max_ndvi <= 1.0);
        assert!(report.min_ndvi <= report.average_ndvi && report.average_ndvi <= report.max_ndvi);
        assert_eq!(report.ndvi_values.len(), RETURNED_SAMPLES);
        assert_eq!(report.ndvi_image_url, "https://example.com/ndvi-images/2024-07-15");

        // summer base is at least 0.65, so the mean sits well above it minus noise
        assert!(report.average_ndvi > 0.5, "got {}", report.average_ndvi);
    }

    #[test]
    fn test_zones_cover_all_but_the_maximum() {
        let report = satellite().ndvi_report(date(2024, 1, 10));
        assert!(!report.zones.is_empty() && report.zones.len() <= ZONE_COUNT);

        let counted: usize = report.zones.iter().map(|z| z.count).sum();
        // values equal to the top edge fall outside every half-open bin
        assert!(counted < SAMPLE_COUNT && counted >= SAMPLE_COUNT - 50);
        for zone in &report.zones {
            assert!(zone.min <= zone.average && zone.average < zone.max);
        }
    }

    #[test]
    fn test_ndvi_zones_small_input() {
        let zones = ndvi_zones(&[0.0, 0.1, 0.5, 1.0], 0.0, 1.0);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].count, 2);
        assert_eq!(zones[0].percentage, 50.0);
        assert_eq!(zones[1].count, 1);
        assert!((zones[1].min - 0.4).abs() < 1e-9);

        assert!(ndvi_zones(&[], 0.0, 1.0).is_empty());
        assert!(ndvi_zones(&[0.3, 0.3], 0.3, 0.3).is_empty());
    }

    #[test]
    fn test_seeded_reports_repeat() {
        let a = satellite().ndvi_report(date(2024, 5, 1));
        let b = satellite().ndvi_report(date(2024, 5, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_historical_series_steps_sixteen_days() {
        let history = satellite().historical_ndvi(&bbox(), date(2024, 1, 1), date(2024, 3, 1));
        assert_eq!(
            history.dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 17),
                date(2024, 2, 2),
                date(2024, 2, 18),
            ]
        );
        assert_eq!(history.ndvi_values.len(), 4);
        assert!(history.ndvi_values.iter().all(|v| (0.1..=0.9).contains(v)));
    }

    #[test]
    fn test_historical_series_empty_when_reversed() {
        let history = satellite().historical_ndvi(&bbox(), date(2024, 3, 1), date(2024, 1, 1));
        assert!(history.dates.is_empty());
        assert!(history.ndvi_values.is_empty());

        let single = satellite().historical_ndvi(&bbox(), date(2024, 3, 1), date(2024, 3, 1));
        assert_eq!(single.dates.len(), 1);
    }

    #[test]
    fn test_imagery_url() {
        let s = satellite();
        assert_eq!(
            s.imagery_url(&bbox(), date(2024, 6, 9), ImageryBands::default()),
            "https://example.com/satellite-images/true-color/2024-06-09"
        );
        assert_eq!(
            s.imagery_url(&bbox(), date(2024, 6, 9), ImageryBands::Ndvi),
            "https://example.com/satellite-images/ndvi/2024-06-09"
        );
    }

    #[test]
    fn test_bands_parse_from_kebab_case() {
        let bands: ImageryBands = serde_json::from_str("\"false-color\"").unwrap();
        assert_eq!(bands, ImageryBands::FalseColor);
    }

    #[tokio::test]
    async fn test_port_resolves_after_delay() {
        let polygon = Polygon::try_from(vec![
            Coordinate::new(17.0, 78.0),
            Coordinate::new(17.001, 78.0),
            Coordinate::new(17.0, 78.001),
        ])
        .unwrap();
        let report = satellite().request_analysis(polygon).await.unwrap();
        assert!((0.0..=1.0).contains(&report.average_ndvi));
    }
}
