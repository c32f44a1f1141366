pub mod http;
pub mod mock;

pub use http::{validate_url, NessusClient};
pub use mock::MockService;

use crate::error::Result;
use crate::model::{ExportFormat, ExportStatus, FileId, ScanId, ScanListing};
use crate::session::Session;
use secrecy::SecretString;

/// Remote scan-management API consumed by the export workflow.
///
/// Every call except `login` is made on behalf of an explicit session.
pub trait ScanService {
    /// Base address used to build request URLs.
    fn base_url(&self) -> &str;

    fn login(&self, username: &str, password: &SecretString) -> Result<String>;
    fn logout(&self, session: &Session) -> Result<()>;
    fn list_scans(&self, session: &Session) -> Result<ScanListing>;

    /// Returns `None` when the service accepted the call but sent no file id.
    fn request_export(
        &self,
        session: &Session,
        scan_id: ScanId,
        format: ExportFormat,
    ) -> Result<Option<FileId>>;

    fn export_status(&self, session: &Session, scan_id: ScanId, file_id: FileId)
        -> Result<ExportStatus>;

    fn download(&self, session: &Session, scan_id: ScanId, file_id: FileId) -> Result<Vec<u8>>;
}
