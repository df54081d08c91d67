//! Console rendering of sync events
//!
//! [`ConsoleObserver`] implements the engine's observer port: decisions
//! and completed uploads go through the output formatter (as text lines or
//! JSON events), the upload in flight is shown as an `indicatif` bar on
//! stderr.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use s3putsecure_core::domain::newtypes::{BucketName, SourceRoot};
use s3putsecure_core::domain::record::{
    LocalFileRecord, ProgressSnapshot, RemoteObject, SyncDecision, TransferJob,
};
use s3putsecure_core::ports::ISyncObserver;
use serde_json::json;

use crate::output::OutputFormatter;

const BAR_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:30.cyan/dim}] {bytes}/{total_bytes} {percent:>3}%";

/// Renders engine events on the terminal
pub struct ConsoleObserver {
    formatter: Box<dyn OutputFormatter>,
    bucket: BucketName,
    verbose: bool,
    show_bar: bool,
    simulate: AtomicBool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new(formatter: Box<dyn OutputFormatter>, bucket: BucketName) -> Self {
        Self {
            formatter,
            bucket,
            verbose: false,
            show_bar: true,
            simulate: AtomicBool::new(false),
            bar: Mutex::new(None),
        }
    }

    /// Print per-file match/mismatch detail
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Draw the upload progress bar (off for JSON or quiet output)
    pub fn progress_bar(mut self, show: bool) -> Self {
        self.show_bar = show;
        self
    }

    fn remote_url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    fn new_bar(&self, job: &TransferJob, total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(job.key.to_string());
        bar
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Decision line shown without `-v`
pub fn decision_line(
    record: &LocalFileRecord,
    decision: SyncDecision,
    simulate: bool,
) -> Option<String> {
    if !decision.needs_transfer() {
        return None;
    }
    let verb = if simulate { "Would upload" } else { "Uploading" };
    Some(format!(
        "{verb} {} as {} ({})",
        record.path.display(),
        record.key,
        decision
    ))
}

/// Match/mismatch detail shown with `-v`
pub fn detail_line(
    record: &LocalFileRecord,
    remote: Option<&RemoteObject>,
    url: &str,
) -> Option<String> {
    let remote = remote?;
    match remote.digest.as_deref() {
        Some(stored) if stored == record.digest.as_str() => Some(format!(
            "{} md5 matches {url}, not uploading",
            record.path.display()
        )),
        stored => Some(format!(
            "{} md5 ({}) differs from {url} ({})",
            record.path.display(),
            record.digest,
            stored.unwrap_or("none")
        )),
    }
}

impl ISyncObserver for ConsoleObserver {
    fn run_started(&self, root: &SourceRoot, bucket: &BucketName, simulate: bool) {
        self.simulate.store(simulate, Ordering::Relaxed);
        self.formatter
            .info(&format!("Uploading {root} to s3://{bucket}"));
        self.formatter.event(
            "run_started",
            json!({"source": root.to_string(), "bucket": bucket.as_str(), "simulate": simulate}),
        );
        if simulate {
            self.formatter
                .info("Simulation mode, not actually uploading data.");
        }
    }

    fn file_excluded(&self, path: &Path, pattern: &str) {
        if self.verbose {
            self.formatter.info(&format!(
                "Excluding {} (matches {pattern})",
                path.display()
            ));
        }
        self.formatter.event(
            "excluded",
            json!({"path": path.display().to_string(), "pattern": pattern}),
        );
    }

    fn file_decided(
        &self,
        record: &LocalFileRecord,
        remote: Option<&RemoteObject>,
        decision: SyncDecision,
    ) {
        if self.verbose {
            if let Some(line) = detail_line(record, remote, &self.remote_url(record.key.as_str())) {
                self.formatter.info(&line);
            }
        }
        let simulate = self.simulate.load(Ordering::Relaxed);
        if let Some(line) = decision_line(record, decision, simulate) {
            self.formatter.info(&line);
        }
        self.formatter.event(
            "decision",
            json!({
                "path": record.path.display().to_string(),
                "key": record.key.as_str(),
                "decision": decision,
                "local_md5": record.digest.as_str(),
                "remote_md5": remote.and_then(|r| r.digest.as_deref()),
            }),
        );
    }

    fn encryption_started(&self, job: &TransferJob, description: &str) {
        if self.verbose {
            self.formatter.info(&format!(
                "Encrypting {} ({description})",
                job.source.display()
            ));
        }
    }

    fn upload_started(&self, job: &TransferJob, total_bytes: u64) {
        if !self.show_bar {
            return;
        }
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(self.new_bar(job, total_bytes)) {
                old.finish_and_clear();
            }
        }
    }

    fn upload_progress(&self, snapshot: &ProgressSnapshot) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                bar.set_position(snapshot.bytes_done);
                bar.set_message(format!(
                    "{} {}/s",
                    snapshot.key,
                    HumanBytes(snapshot.rate_bytes_per_sec as u64)
                ));
            }
        }
    }

    fn upload_finished(&self, job: &TransferJob, bytes: u64) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        self.formatter.success(&format!(
            "Uploaded {} ({})",
            self.remote_url(job.key.as_str()),
            HumanBytes(bytes)
        ));
        self.formatter.event(
            "uploaded",
            json!({"key": job.key.as_str(), "bytes": bytes, "encrypted": job.staging.is_some()}),
        );
    }

    fn file_failed(&self, path: &Path, error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
        self.formatter
            .warn(&format!("{}: {error}", path.display()));
        self.formatter.event(
            "failed",
            json!({"path": path.display().to_string(), "error": error}),
        );
    }
}
