use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::{ScanError, ScanResult};
use crate::results::ScanReport;

/// Writes the report as CSV: the header row, then one row per match.
///
/// Any failure is fatal for the run; results that silently fail to persist
/// would look like a clean scan.
pub fn write_csv(report: &ScanReport, path: &Path) -> ScanResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ScanError::write_failed(path, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| ScanError::write_failed(path, e))?;
    for row in report.rows() {
        writer
            .write_record(&row)
            .map_err(|e| ScanError::write_failed(path, e))?;
    }
    writer.flush().map_err(|e| ScanError::write_failed(path, e))?;

    info!("Results written to: {}", path.display());
    Ok(())
}
