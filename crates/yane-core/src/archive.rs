//! Per-format zip bundles that accumulate downloaded reports.

use crate::error::{Error, Result};
use crate::model::{ExportFormat, FileId, ScanRecord};
use crate::service::ScanService;
use crate::session::Session;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Deflated,
    Stored,
}

/// Deflate when the codec is compiled in, otherwise store.
#[cfg(feature = "deflate")]
pub const COMPRESSION: CompressionMode = CompressionMode::Deflated;
#[cfg(not(feature = "deflate"))]
pub const COMPRESSION: CompressionMode = CompressionMode::Stored;

impl CompressionMode {
    fn method(self) -> CompressionMethod {
        match self {
            #[cfg(feature = "deflate")]
            CompressionMode::Deflated => CompressionMethod::Deflated,
            #[cfg(not(feature = "deflate"))]
            CompressionMode::Deflated => CompressionMethod::Stored,
            CompressionMode::Stored => CompressionMethod::Stored,
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMode::Deflated => f.write_str("deflated"),
            CompressionMode::Stored => f.write_str("stored"),
        }
    }
}

/// Replaces every character outside `[\w_.)( -]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | ')' | '(' | ' ' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn report_file_name(scan_name: &str, file_id: FileId, format: ExportFormat) -> String {
    sanitize_file_name(&format!("{}_{}.{}", scan_name, file_id, format.extension()))
}

/// One bundle path per distinct requested format, named after the folder and
/// run start. Repeated formats keep their first position.
#[derive(Debug, Clone)]
pub struct BundleSet {
    bundles: Vec<(ExportFormat, PathBuf)>,
}

impl BundleSet {
    pub fn new(
        output_dir: &Path,
        collection: &str,
        run_started: NaiveDateTime,
        formats: &[ExportFormat],
    ) -> Self {
        let stamp = run_started.format("%Y%m%d-%H_%M_%S");
        let collection = sanitize_file_name(collection);
        let mut bundles: Vec<(ExportFormat, PathBuf)> = Vec::with_capacity(formats.len());
        for &format in formats {
            if bundles.iter().any(|(f, _)| *f == format) {
                continue;
            }
            let name = format!("{}_{}-{}.zip", collection, stamp, format);
            bundles.push((format, output_dir.join(name)));
        }
        Self { bundles }
    }

    pub fn path(&self, format: ExportFormat) -> Option<&Path> {
        self.bundles
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, path)| path.as_path())
    }

    pub fn formats(&self) -> impl Iterator<Item = ExportFormat> + '_ {
        self.bundles.iter().map(|(format, _)| *format)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.bundles.iter().map(|(_, path)| path.as_path())
    }
}

/// Downloads a ready export, stages it in `staging_dir`, appends it to
/// `bundle` and removes the staged copy. Returns the entry name.
pub fn download_and_archive<S: ScanService>(
    service: &S,
    session: &Session,
    scan: &ScanRecord,
    file_id: FileId,
    format: ExportFormat,
    bundle: &Path,
    staging_dir: &Path,
) -> Result<String> {
    let payload = service.download(session, scan.id, file_id)?;
    debug!("downloaded {} bytes for file {} of scan {}", payload.len(), file_id, scan.id);

    let staged = staging_dir.join(report_file_name(&scan.name, file_id, format));
    info!("Saving scan results to {}", staged.display());
    fs::write(&staged, &payload)?;

    let appended = append_to_bundle(bundle, &staged, COMPRESSION);
    fs::remove_file(&staged)?;
    appended
}

/// Appends `source` to the zip at `bundle`, creating the bundle if needed.
/// The bundle is opened and closed within this call.
pub fn append_to_bundle(bundle: &Path, source: &Path, mode: CompressionMode) -> Result<String> {
    let entry_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Other(format!("no file name in {}", source.display())))?;

    let modified = fs::metadata(source)?.modified()?;
    let options = SimpleFileOptions::default()
        .compression_method(mode.method())
        .last_modified_time(zip_timestamp(modified))
        .unix_permissions(0o644);

    let mut writer = if bundle.exists() {
        let file = OpenOptions::new().read(true).write(true).open(bundle)?;
        ZipWriter::new_append(file)?
    } else {
        ZipWriter::new(File::create(bundle)?)
    };

    info!(
        "adding file: {} to {} with compression mode '{}'",
        entry_name,
        bundle.display(),
        mode
    );
    writer.start_file(entry_name.as_str(), options)?;
    let mut input = File::open(source)?;
    io::copy(&mut input, &mut writer)?;
    writer.finish()?;

    Ok(entry_name)
}

fn zip_timestamp(time: SystemTime) -> zip::DateTime {
    let local: DateTime<Local> = time.into();
    zip::DateTime::from_date_and_time(
        local.year() as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Weekly (ext) - 1.nessus"), "Weekly (ext) - 1.nessus");
        assert_eq!(sanitize_file_name("a/b\\c:d*e?"), "a_b_c_d_e_");
        assert_eq!(sanitize_file_name("scan#1 @ host"), "scan_1 _ host");
    }

    #[test]
    fn test_report_file_name_uses_format_extension() {
        assert_eq!(
            report_file_name("Web/DMZ", 17, ExportFormat::Csv),
            "Web_DMZ_17.csv"
        );
        assert_eq!(
            report_file_name("Web", 17, ExportFormat::Nessus),
            "Web_17.nessus"
        );
    }

    #[test]
    fn test_bundle_names() {
        let started = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let set = BundleSet::new(
            Path::new("/out"),
            "Weekly Scans",
            started,
            &ExportFormat::ALL,
        );
        assert_eq!(
            set.path(ExportFormat::Nessus).unwrap(),
            Path::new("/out/Weekly Scans_20240305-07_08_09-nessus.zip")
        );
        assert_eq!(
            set.path(ExportFormat::Csv).unwrap(),
            Path::new("/out/Weekly Scans_20240305-07_08_09-csv.zip")
        );
        assert_eq!(set.paths().count(), 2);
    }

    #[test]
    fn test_repeated_formats_share_one_bundle() {
        let started = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let set = BundleSet::new(
            Path::new("/out"),
            "Weekly",
            started,
            &[ExportFormat::Csv, ExportFormat::Nessus, ExportFormat::Csv],
        );
        assert_eq!(
            set.formats().collect::<Vec<_>>(),
            vec![ExportFormat::Csv, ExportFormat::Nessus]
        );
        assert_eq!(set.paths().count(), 2);
    }

    #[test]
    fn test_append_creates_then_extends_bundle() {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("bundle.zip");

        for (name, body) in [("one.csv", "a,b\n"), ("two.csv", "c,d\n")] {
            let source = dir.path().join(name);
            fs::write(&source, body).unwrap();
            let entry = append_to_bundle(&bundle, &source, COMPRESSION).unwrap();
            assert_eq!(entry, name);
        }

        let mut archive = zip::ZipArchive::new(File::open(&bundle).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("two.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "c,d\n");
    }

    #[test]
    fn test_stored_mode_keeps_sizes_equal() {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("stored.zip");
        let source = dir.path().join("report.nessus");
        fs::write(&source, vec![b'x'; 4096]).unwrap();

        append_to_bundle(&bundle, &source, CompressionMode::Stored).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&bundle).unwrap()).unwrap();
        let entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        assert_eq!(entry.size(), 4096);
        assert_eq!(entry.compressed_size(), 4096);
    }
}
