use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::engine::TrialResult;
use crate::error::{BenchError, Result};

/// Aggregate over the durations of repeated, identical trials.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub median: Duration,
}

impl Statistics {
    pub fn from_durations(durations: &[Duration]) -> Self {
        let mut sum = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for &d in durations {
            sum += d;
            min = min.min(d);
            max = max.max(d);
        }
        let mean = if durations.is_empty() {
            Duration::ZERO
        } else {
            sum / durations.len() as u32
        };
        Self {
            count: durations.len(),
            mean,
            min,
            max,
            median: median(durations),
        }
    }

    pub fn mean_secs(&self) -> f64 {
        self.mean.as_secs_f64()
    }

    pub fn min_secs(&self) -> f64 {
        self.min.as_secs_f64()
    }

    pub fn max_secs(&self) -> f64 {
        self.max.as_secs_f64()
    }

    pub fn median_secs(&self) -> f64 {
        self.median.as_secs_f64()
    }
}

/// Middle value of the sorted samples; the mean of the two middle values for
/// an even count and zero for no samples.
pub fn median(durations: &[Duration]) -> Duration {
    let mut sorted = durations.to_vec();
    sorted.sort_unstable();
    let len = sorted.len();
    match len {
        0 => Duration::ZERO,
        _ if len % 2 != 0 => sorted[len / 2],
        _ => (sorted[len / 2 - 1] + sorted[len / 2]) / 2,
    }
}

/// Runs `trial` `repetitions` times and aggregates the durations.
///
/// The first failed trial ends the run: statistics over a partial set of
/// samples would not be comparable. Zero repetitions is a configuration error.
pub async fn run_trials<F, Fut>(repetitions: usize, mut trial: F) -> Result<(Statistics, Vec<TrialResult>)>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = TrialResult>,
{
    if repetitions == 0 {
        return Err(BenchError::Configuration(
            "repetitions must be at least 1".to_string(),
        ));
    }
    let mut results = Vec::with_capacity(repetitions);
    for i in 0..repetitions {
        let result = trial(i).await;
        if let Some(message) = &result.error {
            return Err(BenchError::Trial {
                strategy: result.strategy.to_string(),
                trial: i,
                message: message.clone(),
            });
        }
        results.push(result);
    }

    let durations: Vec<Duration> = results.iter().map(|r| r.elapsed).collect();
    let stats = Statistics::from_durations(&durations);
    if let Some(first) = results.first() {
        info!(
            strategy = %first.strategy,
            batch_count = first.batch_count,
            batch_size = first.batch_size,
            trials = stats.count,
            avg_sec = stats.mean_secs(),
            min_sec = stats.min_secs(),
            max_sec = stats.max_secs(),
            med_sec = stats.median_secs(),
            "trials_complete"
        );
    }
    Ok((stats, results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;

    fn secs(v: &[u64]) -> Vec<Duration> {
        v.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    fn result(elapsed: Duration, error: Option<&str>) -> TrialResult {
        TrialResult {
            strategy: Strategy::ManySeq,
            batch_count: 2,
            batch_size: 3,
            bulk_size: 3,
            elapsed,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn median_rule() {
        assert_eq!(median(&secs(&[1, 2, 3])), Duration::from_secs(2));
        assert_eq!(median(&secs(&[4, 1, 3, 2])), Duration::from_millis(2500));
        assert_eq!(median(&[]), Duration::ZERO);
    }

    #[test]
    fn aggregates() {
        let stats = Statistics::from_durations(&secs(&[5, 1, 4, 2, 3]));
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, Duration::from_secs(1));
        assert_eq!(stats.max, Duration::from_secs(5));
        assert_eq!(stats.mean, Duration::from_secs(3));
        assert_eq!(stats.median, Duration::from_secs(3));
        assert_eq!(stats.mean_secs(), 3.0);
    }

    #[test]
    fn empty_samples_do_not_panic() {
        let stats = Statistics::from_durations(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, Duration::ZERO);
        assert_eq!(stats.median, Duration::ZERO);
        assert_eq!(stats.min, Duration::MAX);
    }

    #[tokio::test]
    async fn run_trials_matches_direct_aggregation() {
        let samples = [7u64, 3, 9, 1, 5];
        let (stats, results) = run_trials(samples.len(), |i| {
            let elapsed = Duration::from_millis(samples[i]);
            async move { result(elapsed, None) }
        })
        .await
        .unwrap();
        assert_eq!(results.len(), 5);

        let direct: Vec<Duration> = samples.iter().map(|ms| Duration::from_millis(*ms)).collect();
        assert_eq!(stats, Statistics::from_durations(&direct));
        assert_eq!(stats.median, Duration::from_millis(5));
        assert_eq!(stats.mean, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn run_trials_needs_a_repetition() {
        let mut calls = 0;
        let err = run_trials(0, |_| {
            calls += 1;
            async { result(Duration::from_millis(1), None) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn run_trials_stops_at_first_failure() {
        let mut calls = 0;
        let err = run_trials(5, |i| {
            calls += 1;
            let error = (i == 1).then_some("row 4 rejected");
            async move { result(Duration::from_millis(1), error) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(err.to_string(), "ManySeq trial 1 failed: row 4 rejected");
    }
}
