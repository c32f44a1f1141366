use indicatif::{ProgressBar, ProgressStyle};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::time::Duration;
use yane_core::model::{ExportFormat, FileId};
use yane_core::{ExportReporter, ScanRecord};

/// CLI progress reporter: one spinner per (scan, format) export while it
/// is requested, polled and archived.
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
    total: Cell<usize>,
    done: Cell<usize>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: RefCell::new(None),
            total: Cell::new(0),
            done: Cell::new(0),
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Some(old) = self.bar.borrow_mut().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }

    fn position(&self) -> String {
        format!("[{}/{}]", self.done.get() + 1, self.total.get())
    }
}

impl ExportReporter for CliReporter {
    fn on_export_start(&self, total_pairs: usize) {
        self.total.set(total_pairs);
        self.done.set(0);
    }

    fn on_export_requested(&self, scan: &ScanRecord, format: ExportFormat, file_id: FileId) {
        self.set_bar(Self::spinner(format!(
            "{} Exporting '{}' as {} (file {})",
            self.position(),
            scan.name,
            format,
            file_id
        )));
    }

    fn on_poll(&self, scan: &ScanRecord, format: ExportFormat, attempt: u32) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_message(format!(
                "{} Waiting for '{}' as {} (check {})",
                self.position(),
                scan.name,
                format,
                attempt
            ));
        }
    }

    fn on_archived(&self, scan: &ScanRecord, format: ExportFormat, entry: &str, bundle: &Path) {
        self.finish_bar();
        self.done.set(self.done.get() + 1);
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} ({}) -> {} in {}",
            scan.name,
            format,
            entry,
            bundle.display()
        );
    }

    fn on_pair_failed(&self, scan: &ScanRecord, format: ExportFormat, error: &str) {
        self.finish_bar();
        self.done.set(self.done.get() + 1);
        eprintln!("  \x1b[31m✗\x1b[0m {} ({}): {}", scan.name, format, error);
    }

    fn on_export_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Export complete: {} archived, {} failed in {:.2}s",
            succeeded, failed, duration_secs
        );
    }

    fn on_manifest_written(&self, path: &Path, entries: usize) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Manifest: {} entries in {}",
            entries,
            path.display()
        );
    }
}
