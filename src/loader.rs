use crate::batch::batched;
use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{LoadError, Result};
use crate::models::LoadSummary;
use crate::progress::{LoadProgress, NoProgress};
use crate::source::RecordSource;
use crate::store::{GraphStore, Mutation};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub batch_size: usize,
    /// Expected number of input records; only sizes the progress display.
    pub expected_total: Option<u64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            expected_total: None,
        }
    }
}

impl LoadOptions {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    pub fn expected_batches(&self) -> Option<u64> {
        if self.batch_size == 0 {
            return None;
        }
        self.expected_total
            .map(|total| total.div_ceil(self.batch_size as u64))
    }
}

/// Feeds record sources to a graph store one batch at a time.
///
/// Batches are submitted strictly in order and one at a time. A store error
/// aborts the run; batches already submitted stay applied. Cancellation is
/// checked between batches, never during one.
pub struct BulkLoader<'a, S> {
    store: &'a S,
    cancel: CancellationToken,
    progress: Box<dyn LoadProgress>,
}

impl<'a, S: GraphStore> BulkLoader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn LoadProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn load<R: RecordSource>(
        &mut self,
        mutation: &Mutation,
        source: R,
        options: &LoadOptions,
    ) -> Result<LoadSummary> {
        let mut batches = batched(source, options.batch_size)?;
        let start = Instant::now();
        let mut summary = LoadSummary::new(&mutation.name, options.batch_size);

        info!(
            mutation = %mutation.name,
            source = batches.get_ref().name(),
            batch_size = options.batch_size,
            "Starting load"
        );
        self.progress.start(&mutation.name, options.expected_batches());

        loop {
            if self.cancel.is_cancelled() {
                warn!(
                    mutation = %mutation.name,
                    batches = summary.batches_done,
                    "Load cancelled at batch boundary"
                );
                summary.cancelled = true;
                break;
            }

            let Some(chunk) = batches.next() else {
                break;
            };

            let batch_start = Instant::now();
            let batch = summary.batches_done + 1;
            let affected = match self.store.submit(mutation, &chunk).await {
                Ok(affected) => affected,
                Err(source) => {
                    summary.total_time = start.elapsed();
                    self.progress.abandon(&summary);
                    return Err(LoadError::SubmissionFailure {
                        mutation: mutation.name.clone(),
                        batch,
                        source,
                    });
                }
            };

            summary.record_batch(chunk.len(), affected, batch_start.elapsed());
            summary.total_time = start.elapsed();
            debug!(
                mutation = %mutation.name,
                batch,
                rows = chunk.len(),
                ?affected,
                batch_secs = summary.batch_time.as_secs_f64(),
                total_secs = summary.total_time.as_secs_f64(),
                "Batch submitted"
            );
            self.progress.batch_done(&summary);
        }

        summary.malformed = batches.get_ref().malformed();
        summary.total_time = start.elapsed();
        if let Some(err) = batches.get_mut().take_failure() {
            self.progress.abandon(&summary);
            return Err(err);
        }
        self.progress.finish(&summary);

        info!(
            mutation = %summary.mutation,
            batches = summary.batches_done,
            records = summary.records,
            affected = ?summary.affected,
            malformed = summary.malformed,
            duration_secs = summary.total_time.as_secs_f64(),
            "Load complete"
        );

        Ok(summary)
    }
}
