//! Best-effort background frame sampler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Ticks at a fixed low rate while a session is open.
///
/// It never reads from the device, so it cannot contend with a snapshot.
/// Each tick is counted; detection hooks would run here.
#[derive(Debug)]
pub struct FrameSampler {
    samples: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl FrameSampler {
    /// Spawn the sampler on the current tokio runtime. A rate of zero
    /// disables sampling.
    pub fn start(session_id: u64, rate_hz: u32) -> Option<Self> {
        if rate_hz == 0 {
            return None;
        }
        let period = Duration::from_secs(1) / rate_hz;
        let samples = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&samples);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(session = session_id, sample = n, "frame sampled");
            }
        });

        Some(Self { samples, task })
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn samples_at_configured_rate() {
        let sampler = FrameSampler::start(1, 5).expect("non-zero rate");
        tokio::time::sleep(Duration::from_millis(1_010)).await;
        let taken = sampler.samples();
        assert!((5..=6).contains(&taken), "took {taken} samples");
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_sampler_no_longer_counts() {
        let sampler = FrameSampler::start(1, 5).expect("non-zero rate");
        tokio::time::sleep(Duration::from_millis(450)).await;
        let samples = Arc::clone(&sampler.samples);
        sampler.stop();
        let at_stop = samples.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(samples.load(Ordering::Relaxed), at_stop);
    }

    #[test]
    fn zero_rate_disables_sampling() {
        assert!(FrameSampler::start(1, 0).is_none());
    }
}
