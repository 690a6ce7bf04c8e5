use crate::engine::drawing::DEFAULT_CLOSE_DISTANCE_M;
use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind to
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Simulated satellite latency per analysis, in milliseconds
    #[arg(long, env = "AGRO_FIELDS_ANALYSIS_DELAY_MS", default_value_t = 2000)]
    pub analysis_delay_ms: u64,

    /// Analyses still running after this many seconds are marked failed
    #[arg(long, env = "AGRO_FIELDS_ANALYSIS_TIMEOUT_SECS", default_value_t = 30)]
    pub analysis_timeout_secs: u64,

    /// Clicking within this many meters of the first vertex closes a boundary
    #[arg(long, env = "AGRO_FIELDS_CLOSE_DISTANCE_M", default_value_t = DEFAULT_CLOSE_DISTANCE_M)]
    pub close_distance_m: f64,

    /// Base URL for generated NDVI and imagery links
    #[arg(
        long,
        env = "AGRO_FIELDS_IMAGERY_BASE_URL",
        default_value = "https://example.com"
    )]
    pub imagery_base_url: String,

    /// Seed for the simulated satellite, for reproducible values
    #[arg(long, env = "AGRO_FIELDS_SEED")]
    pub seed: Option<u64>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "agro-fields",
            "--port",
            "9100",
            "--analysis-delay-ms",
            "5",
            "--analysis-timeout-secs",
            "2",
            "--close-distance-m",
            "12.5",
            "--seed",
            "7",
        ])
        .unwrap();

        assert_eq!(args.port, 9100);
        assert_eq!(args.analysis_delay(), Duration::from_millis(5));
        assert_eq!(args.analysis_timeout(), Duration::from_secs(2));
        assert_eq!(args.close_distance_m, 12.5);
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn test_rejects_bad_host() {
        assert!(Args::try_parse_from(["agro-fields", "--host", "not-an-ip"]).is_err());
    }
}
