use crate::dates::{DateWindow, WindowMatch, DATE_FORMAT};
use crate::error::{Error, Result};
use crate::model::{Folder, FolderId, ScanListing, ScanRecord, ScanStatus};
use tracing::{info, warn};

/// Exact-name lookup of a folder.
pub fn resolve_collection(name: &str, folders: &[Folder]) -> Option<FolderId> {
    folders
        .iter()
        .find(|folder| folder.name == name)
        .map(|folder| folder.id)
}

/// Completed scans of `folder_id` whose modification date the window admits,
/// in listing order. Scans that match but are not completed are skipped with
/// a warning.
pub fn select_scans(
    folder_id: FolderId,
    scans: &[ScanRecord],
    window: &DateWindow,
    policy: WindowMatch,
) -> Vec<ScanRecord> {
    let mut selected = Vec::new();

    for scan in scans.iter().filter(|scan| scan.folder_id == folder_id) {
        let Some(modified) = scan.modified_on() else {
            warn!(
                "scan: {} has an invalid modification date: {}",
                scan.id, scan.last_modification_date
            );
            continue;
        };

        if !window.admits(modified, policy) {
            info!(
                "scan: {} date {} is not within the date range",
                scan.id,
                modified.format(DATE_FORMAT)
            );
            continue;
        }

        if scan.status == ScanStatus::Completed {
            selected.push(scan.clone());
        } else {
            warn!("scan: {} is not completed: {}", scan.id, scan.status);
        }
    }

    selected
}

/// Resolves `folder_name` and selects its scans. A missing folder or an
/// empty working set are both errors.
pub fn locate_scans(
    listing: &ScanListing,
    folder_name: &str,
    window: &DateWindow,
    policy: WindowMatch,
) -> Result<Vec<ScanRecord>> {
    let folder_id = resolve_collection(folder_name, &listing.folders)
        .ok_or_else(|| Error::CollectionNotFound(folder_name.to_string()))?;

    let scans = select_scans(folder_id, &listing.scans, window, policy);
    if scans.is_empty() {
        return Err(Error::NoScans {
            folder: folder_name.to_string(),
            start: window.start.format(DATE_FORMAT).to_string(),
            end: window.end.format(DATE_FORMAT).to_string(),
        });
    }

    info!("{} scan(s) selected from folder {}", scans.len(), folder_name);
    Ok(scans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, Local, NaiveDate, TimeZone};

    fn timestamp_for(date: NaiveDate) -> i64 {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .timestamp()
    }

    fn scan(id: u64, folder_id: u64, status: ScanStatus, date: NaiveDate) -> ScanRecord {
        ScanRecord {
            id,
            name: format!("scan {}", id),
            status,
            folder_id,
            last_modification_date: timestamp_for(date),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_collection_exact_match() {
        let folders = vec![
            Folder { id: 2, name: "Trash".to_string() },
            Folder { id: 5, name: "Weekly Scans".to_string() },
        ];
        assert_eq!(resolve_collection("Weekly Scans", &folders), Some(5));
        assert_eq!(resolve_collection("weekly scans", &folders), None);
        assert_eq!(resolve_collection("Nonexistent", &folders), None);
    }

    #[test]
    fn test_only_completed_scans_in_window() {
        let today = Local::now().date_naive();
        let window = DateWindow::new(today - Days::new(7), today).unwrap();
        let scans = vec![
            scan(42, 5, ScanStatus::Completed, today - Days::new(3)),
            scan(43, 5, ScanStatus::Running, today - Days::new(1)),
        ];

        let selected = select_scans(5, &scans, &window, WindowMatch::Lenient);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 42);
    }

    #[test]
    fn test_other_folders_are_ignored_and_order_is_kept() {
        let window = DateWindow::new(day(2024, 1, 1), day(2024, 1, 31)).unwrap();
        let scans = vec![
            scan(3, 5, ScanStatus::Completed, day(2024, 1, 12)),
            scan(1, 6, ScanStatus::Completed, day(2024, 1, 12)),
            scan(2, 5, ScanStatus::Completed, day(2024, 1, 2)),
        ];

        let ids: Vec<_> = select_scans(5, &scans, &window, WindowMatch::Inclusive)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_inclusive_policy_drops_out_of_window_scans() {
        let window = DateWindow::new(day(2024, 1, 10), day(2024, 1, 20)).unwrap();
        let scans = vec![
            scan(1, 5, ScanStatus::Completed, day(2024, 1, 5)),
            scan(2, 5, ScanStatus::Completed, day(2024, 1, 15)),
            scan(3, 5, ScanStatus::Completed, day(2024, 2, 1)),
        ];

        let inclusive = select_scans(5, &scans, &window, WindowMatch::Inclusive);
        assert_eq!(inclusive.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);

        let lenient = select_scans(5, &scans, &window, WindowMatch::Lenient);
        assert_eq!(lenient.len(), 3);
    }

    #[test]
    fn test_locate_missing_folder() {
        let listing = ScanListing {
            folders: vec![Folder { id: 5, name: "Weekly Scans".to_string() }],
            scans: vec![],
        };
        let window = DateWindow::new(day(2024, 1, 1), day(2024, 1, 2)).unwrap();
        let err = locate_scans(&listing, "Nonexistent", &window, WindowMatch::Lenient).unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound(name) if name == "Nonexistent"));
    }

    #[test]
    fn test_locate_empty_working_set() {
        let listing = ScanListing {
            folders: vec![Folder { id: 5, name: "Weekly Scans".to_string() }],
            scans: vec![scan(43, 5, ScanStatus::Running, day(2024, 1, 1))],
        };
        let window = DateWindow::new(day(2024, 1, 1), day(2024, 1, 2)).unwrap();
        let err = locate_scans(&listing, "Weekly Scans", &window, WindowMatch::Lenient).unwrap_err();
        assert!(matches!(err, Error::NoScans { .. }));
    }
}
