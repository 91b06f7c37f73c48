//! Batch execution across many targets.
//!
//! A fixed pool of workers pulls indices off a shared counter, runs
//! the pipeline once per target on a fresh driver, and drops each
//! result into its input slot so report order matches input order.
//! Cancellation is cooperative: workers check the flag between items
//! and finish the item they are on.

use crate::config::schema::BatchConfig;
use crate::driver::DriverFactory;
use crate::pipeline::{ContactMethod, PipelineResult, SubmissionPipeline};
use knock_core::profile::SenderProfile;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One completed target within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub url: String,
    pub result: PipelineResult,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Completed items in input order. Targets never started because
    /// of cancellation are absent.
    pub items: Vec<BatchItem>,
    /// Size of the input list, including targets never started.
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

pub struct BatchRunner {
    pipeline: Arc<SubmissionPipeline>,
    factory: Arc<dyn DriverFactory>,
    concurrency: usize,
    start_delay: Duration,
}

impl BatchRunner {
    pub fn new(
        pipeline: Arc<SubmissionPipeline>,
        factory: Arc<dyn DriverFactory>,
        config: &BatchConfig,
    ) -> Self {
        BatchRunner {
            pipeline,
            factory,
            concurrency: config.concurrency.max(1),
            start_delay: Duration::from_millis(config.start_delay_ms),
        }
    }

    pub async fn run(
        &self,
        urls: Vec<String>,
        profile: SenderProfile,
        cancel: Arc<AtomicBool>,
    ) -> BatchReport {
        let total = urls.len();
        if total == 0 {
            return BatchReport::default();
        }
        let urls = Arc::new(urls);
        let profile = Arc::new(profile);
        let next = Arc::new(AtomicUsize::new(0));
        let slots: Arc<Mutex<Vec<Option<BatchItem>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        let workers = self.concurrency.min(total);
        info!(total, workers, "batch started");

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let pipeline = Arc::clone(&self.pipeline);
            let factory = Arc::clone(&self.factory);
            let urls = Arc::clone(&urls);
            let profile = Arc::clone(&profile);
            let next = Arc::clone(&next);
            let slots = Arc::clone(&slots);
            let cancel = Arc::clone(&cancel);
            let delay = self.start_delay;
            handles.push(tokio::spawn(async move {
                let mut first = true;
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= urls.len() {
                        break;
                    }
                    if !first && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                    first = false;
                    let url = urls[index].clone();
                    debug!(worker, index, url = %url, "batch item started");
                    let result = match factory.create().await {
                        Ok(mut driver) => {
                            let result =
                                pipeline.run(driver.as_mut(), &url, profile.as_ref()).await;
                            if let Err(e) = driver.close().await {
                                debug!(error = %e, "driver close failed");
                            }
                            result
                        }
                        Err(e) => PipelineResult::failed(
                            ContactMethod::None,
                            format!("driver start failed: {}", e),
                        ),
                    };
                    slots.lock().unwrap()[index] = Some(BatchItem { index, url, result });
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "batch worker panicked");
            }
        }

        let items: Vec<BatchItem> = slots.lock().unwrap().iter().flatten().cloned().collect();
        let processed = items.len();
        let succeeded = items.iter().filter(|i| i.result.success).count();
        let failed = processed - succeeded;
        let cancelled = cancel.load(Ordering::Relaxed);
        info!(total, processed, succeeded, failed, cancelled, "batch finished");
        BatchReport {
            items,
            total,
            processed,
            succeeded,
            failed,
            cancelled,
        }
    }
}
