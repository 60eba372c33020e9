//! Rate parameters and sample-rate derivation.
//!
//! A telemetry data stream sends `max_msgs_per_cycle` messages per cycle
//! at `max_msgs_per_second`. The cycle period in seconds is their ratio,
//! and the legal sample rates follow from it:
//!
//! - rates of one or more samples per cycle: `k / period` for each factor
//!   `k` of the message count (or every `k` when uneven spacing is allowed)
//! - rates slower than once per cycle: `1 / (n * period)` up to the
//!   maximum seconds per message
//!
//! Rates are kept as display strings (`"2"`, `"1/3"`), matching how they
//! appear in rate columns; [`parse_rate`] also accepts decimals.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

const DEFAULT_MAX_BYTES_PER_SEC: u32 = 56_000;

/// Global rate parameters shared by all data streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateParameters {
    /// Longest allowed interval between two samples, in seconds.
    pub max_seconds_per_msg: u32,
    /// Messages sent per second on every stream.
    pub max_msgs_per_second: u32,
    /// Whether rates that are not evenly spaced within a cycle are offered.
    pub include_uneven: bool,
}

impl Default for RateParameters {
    fn default() -> Self {
        Self {
            max_seconds_per_msg: 1,
            max_msgs_per_second: 1,
            include_uneven: false,
        }
    }
}

impl RateParameters {
    pub fn new(max_seconds_per_msg: u32, max_msgs_per_second: u32) -> Self {
        Self {
            max_seconds_per_msg,
            max_msgs_per_second,
            include_uneven: false,
        }
    }

    pub fn with_uneven(mut self, include_uneven: bool) -> Self {
        self.include_uneven = include_uneven;
        self
    }

    /// Rejects zero values.
    pub fn validate(&self) -> Result<()> {
        check_positive("max seconds per message", self.max_seconds_per_msg)?;
        check_positive("max messages per second", self.max_msgs_per_second)
    }
}

/// Per-stream rate information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInformation {
    /// Rate column name.
    pub rate_name: String,
    /// Data stream name.
    pub stream_name: String,
    pub max_msgs_per_cycle: u32,
    pub max_bytes_per_sec: u32,
    /// Legal sample rates, fastest first.
    pub sample_rates: Vec<String>,
}

impl RateInformation {
    /// Creates rate information with default parameters.
    pub fn new(rate_name: impl Into<String>) -> Self {
        let rate_name = rate_name.into();
        Self {
            stream_name: rate_name.clone(),
            rate_name,
            max_msgs_per_cycle: 1,
            max_bytes_per_sec: DEFAULT_MAX_BYTES_PER_SEC,
            sample_rates: vec!["1".to_string()],
        }
    }

    pub fn with_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        let stream_name = stream_name.into();
        self.stream_name = if stream_name.is_empty() {
            self.rate_name.clone()
        } else {
            stream_name
        };
        self
    }

    pub fn with_max_msgs_per_cycle(mut self, max_msgs_per_cycle: u32) -> Self {
        self.max_msgs_per_cycle = max_msgs_per_cycle;
        self
    }

    pub fn with_max_bytes_per_sec(mut self, max_bytes_per_sec: u32) -> Self {
        self.max_bytes_per_sec = max_bytes_per_sec;
        self
    }

    /// Restores the default stream parameters.
    pub fn set_default_values(&mut self) {
        self.stream_name = self.rate_name.clone();
        self.max_msgs_per_cycle = 1;
        self.max_bytes_per_sec = DEFAULT_MAX_BYTES_PER_SEC;
        self.sample_rates = vec!["1".to_string()];
    }

    /// Recomputes the sample rates from the global parameters.
    pub fn update_sample_rates(&mut self, params: &RateParameters) {
        self.sample_rates = calculate_sample_rates(
            params.max_seconds_per_msg,
            params.max_msgs_per_second,
            self.max_msgs_per_cycle,
            params.include_uneven,
        );
    }

    /// Cycle period in seconds for this stream.
    pub fn period(&self, params: &RateParameters) -> f32 {
        self.max_msgs_per_cycle as f32 / params.max_msgs_per_second as f32
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("max messages per cycle", self.max_msgs_per_cycle)?;
        check_positive("max bytes per second", self.max_bytes_per_sec)
    }
}

fn check_positive(what: &'static str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(SchedulerError::OutOfRange {
            what,
            value: 0,
            min: 1,
            max: i64::from(u32::MAX),
        });
    }
    Ok(())
}

/// Computes the legal sample rates, fastest first.
///
/// # Example
///
/// ```
/// use u_slot::models::calculate_sample_rates;
///
/// // 4 messages per cycle at 4 messages per second: 1 second period.
/// let rates = calculate_sample_rates(3, 4, 4, false);
/// assert_eq!(rates, vec!["4", "2", "1", "1/2", "1/3"]);
/// ```
pub fn calculate_sample_rates(
    max_seconds_per_msg: u32,
    max_msgs_per_second: u32,
    max_msgs_per_cycle: u32,
    include_uneven: bool,
) -> Vec<String> {
    let mut rates = Vec::new();
    if max_msgs_per_second == 0 || max_msgs_per_cycle == 0 {
        return rates;
    }

    let period = f64::from(max_msgs_per_cycle) / f64::from(max_msgs_per_second);

    if include_uneven {
        for cyc in (1..=max_msgs_per_cycle).rev() {
            rates.push(format_rate(f64::from(cyc), period));
        }
    } else {
        // Factor pairs, inserted at a moving index to keep descending order
        let mut index = 0;
        let mut div = 1;
        while div <= max_msgs_per_cycle / div {
            if max_msgs_per_cycle % div == 0 {
                let low = format_rate(f64::from(div), period);
                let high = format_rate(f64::from(max_msgs_per_cycle / div), period);
                if high != low {
                    rates.insert(index, high);
                    index += 1;
                }
                rates.insert(index, low);
            }
            div += 1;
        }
    }

    let mut sec = period * 2.0;
    while sec <= f64::from(max_seconds_per_msg) {
        rates.push(format_rate(1.0, sec));
        sec += period;
    }

    rates
}

/// Formats `samples / seconds` as a whole or decimal number when the
/// division is exact to five places, otherwise as `1/x`.
pub fn format_rate(samples: f64, seconds: f64) -> String {
    let num = (samples * 100_000.0) as i64;
    let den = (seconds * 100_000.0) as i64;
    let rate = if den != 0 && num % den <= 10 {
        format!("{:.5}", samples / seconds)
    } else {
        format!("1/{:.5}", seconds / samples)
    };
    trim_trailing_zeros(&rate)
}

fn trim_trailing_zeros(value: &str) -> String {
    if value.contains('.') {
        value
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        value.to_string()
    }
}

/// Parses a rate string (`"2"`, `"0.25"`, `"1/4"`) into Hz.
pub fn parse_rate(value: &str) -> Result<f32> {
    let invalid = || SchedulerError::InvalidRate(value.to_string());
    let trimmed = value.trim();
    let rate = match trimmed.split_once('/') {
        Some((num, den)) => {
            let num: f32 = num.trim().parse().map_err(|_| invalid())?;
            let den: f32 = den.trim().parse().map_err(|_| invalid())?;
            num / den
        }
        None => trimmed.parse().map_err(|_| invalid())?,
    };
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_information_defaults() {
        let info = RateInformation::new("Rate 1");
        assert_eq!(info.stream_name, "Rate 1");
        assert_eq!(info.max_msgs_per_cycle, 1);
        assert_eq!(info.max_bytes_per_sec, 56_000);
        assert_eq!(info.sample_rates, vec!["1"]);
    }

    #[test]
    fn test_empty_stream_name_falls_back_to_rate_name() {
        let info = RateInformation::new("Rate 1").with_stream_name("");
        assert_eq!(info.stream_name, "Rate 1");
        let info = RateInformation::new("Rate 1").with_stream_name("Stream A");
        assert_eq!(info.stream_name, "Stream A");
    }

    #[test]
    fn test_set_default_values() {
        let mut info = RateInformation::new("r")
            .with_stream_name("s")
            .with_max_msgs_per_cycle(8)
            .with_max_bytes_per_sec(100);
        info.set_default_values();
        assert_eq!(info, RateInformation::new("r"));
    }

    #[test]
    fn test_even_sample_rates() {
        // 1 second period, factors of 6: 6, 3, 2, 1
        let rates = calculate_sample_rates(1, 6, 6, false);
        assert_eq!(rates, vec!["6", "3", "2", "1"]);
    }

    #[test]
    fn test_uneven_sample_rates() {
        let rates = calculate_sample_rates(1, 4, 4, true);
        assert_eq!(rates, vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn test_perfect_square_factor_listed_once() {
        let rates = calculate_sample_rates(1, 4, 4, false);
        assert_eq!(rates, vec!["4", "2", "1"]);
    }

    #[test]
    fn test_sub_hertz_rates() {
        // 2 second period: factors 2/2 and 1/2, then one sample every 4 and 6 seconds
        let rates = calculate_sample_rates(6, 1, 2, false);
        assert_eq!(rates, vec!["1", "1/2", "1/4", "1/6"]);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(4.0, 1.0), "4");
        assert_eq!(format_rate(1.0, 2.0), "1/2");
        assert_eq!(format_rate(1.0, 3.0), "1/3");
        assert_eq!(format_rate(10.0, 1.0), "10");
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("2").unwrap(), 2.0);
        assert_eq!(parse_rate("0.5").unwrap(), 0.5);
        assert_eq!(parse_rate("1/4").unwrap(), 0.25);
        assert!(parse_rate("abc").is_err());
        assert!(parse_rate("1/0").is_err());
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("-1").is_err());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(RateParameters::default().validate().is_ok());
        assert!(RateParameters::new(0, 1).validate().is_err());
        assert!(RateInformation::new("r")
            .with_max_msgs_per_cycle(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_update_sample_rates_and_period() {
        let params = RateParameters::new(1, 2);
        let mut info = RateInformation::new("r").with_max_msgs_per_cycle(4);
        info.update_sample_rates(&params);
        assert!((info.period(&params) - 2.0).abs() < 1e-6);
        // 2 second period: 4/2, 2/2, 1/2
        assert_eq!(info.sample_rates, vec!["2", "1", "1/2"]);
    }
}
