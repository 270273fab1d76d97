use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Min, OrderStatistics};

/// Summary of a sample, e.g. request latencies in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

impl Statistics {
    /// Empty input yields all zeros.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut data = Data::new(samples.to_vec());

        Self {
            count: samples.len(),
            mean: data.mean().unwrap_or(0.0),
            median: data.median(),
            p90: data.quantile(0.90),
            p95: data.quantile(0.95),
            p99: data.quantile(0.99),
            min: data.min(),
            max: data.max(),
            stddev: data.std_dev().unwrap_or(0.0),
        }
    }

    /// Whether every sample lies in `[low, high]`.
    pub fn within(&self, low: f64, high: f64) -> bool {
        self.count == 0 || (self.min >= low && self.max <= high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let samples = vec![70.0, 75.0, 80.0, 85.0, 90.0];
        let stats = Statistics::from_samples(&samples);

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 80.0);
        assert_eq!(stats.median, 80.0);
        assert_eq!(stats.min, 70.0);
        assert_eq!(stats.max, 90.0);
        assert!(stats.within(70.0, 90.0));
        assert!(!stats.within(71.0, 90.0));
    }

    #[test]
    fn test_empty_statistics() {
        let stats = Statistics::from_samples(&[]);

        assert_eq!(stats, Statistics::default());
        assert!(stats.within(70.0, 90.0));
    }
}
