use crate::config::PROGRESS_TICK_MS;
use crate::models::LoadSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Receives progress of a load run. Purely advisory: nothing reported here
/// feeds back into the loader.
pub trait LoadProgress {
    fn start(&mut self, name: &str, expected_batches: Option<u64>);

    fn batch_done(&mut self, summary: &LoadSummary);

    fn finish(&mut self, summary: &LoadSummary);

    fn abandon(&mut self, _summary: &LoadSummary) {}
}

/// Discards all progress.
pub struct NoProgress;

impl LoadProgress for NoProgress {
    fn start(&mut self, _name: &str, _expected_batches: Option<u64>) {}
    fn batch_done(&mut self, _summary: &LoadSummary) {}
    fn finish(&mut self, _summary: &LoadSummary) {}
}

/// Terminal progress bar, or a spinner when the batch count is unknown.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadProgress for BarProgress {
    fn start(&mut self, name: &str, expected_batches: Option<u64>) {
        let bar = match expected_batches {
            Some(total) => make_progress_bar(total, name),
            None => make_spinner(name),
        };
        self.bar = Some(bar);
    }

    fn batch_done(&mut self, summary: &LoadSummary) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(format!(
                "{} records, {:.2}s last batch",
                summary.records,
                summary.batch_time.as_secs_f64()
            ));
        }
    }

    fn finish(&mut self, summary: &LoadSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!(
                "{}: {} records in {} batches ({:.2}s)",
                summary.mutation,
                summary.records,
                summary.batches_done,
                summary.total_time.as_secs_f64()
            ));
        }
    }

    fn abandon(&mut self, summary: &LoadSummary) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!(
                "{}: failed after {} batches",
                summary.mutation, summary.batches_done
            ));
        }
    }
}

pub fn make_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {prefix} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
    pb.set_prefix(msg.to_string());
    pb
}

fn make_progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "    {{spinner:.cyan}} {label:<14} [{{bar:30.cyan/blue}}] {{pos}}/{{len}} batches {{msg}}"
            ))
            .unwrap()
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
    pb
}
