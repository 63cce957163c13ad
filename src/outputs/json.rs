//! JSON snapshot output.
//!
//! Each run writes one file, `{output_dir}/tenders.json`, replacing the
//! previous snapshot. Hebrew text is written as UTF-8, not escaped.

use crate::models::Snapshot;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const SNAPSHOT_FILE: &str = "tenders.json";

/// Write a [`Snapshot`] as pretty-printed JSON.
///
/// Creates `output_dir` if needed and returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_snapshot(
    snapshot: &Snapshot,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = Path::new(output_dir).join(SNAPSHOT_FILE);
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), count = snapshot.total_count, "Wrote tender snapshot");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::models::fixtures::tender;
    use std::collections::BTreeMap;

    fn snapshot(numbers: &[&str]) -> Snapshot {
        let tenders: Vec<_> = numbers
            .iter()
            .map(|n| tender(n, Source::Portal, "2026-11-01"))
            .collect();
        Snapshot {
            last_update: "2026-10-18 09:30".to_string(),
            total_count: tenders.len(),
            sources: BTreeMap::from([("mr.gov.il".to_string(), tenders.len())]),
            note: None,
            tenders,
        }
    }

    #[tokio::test]
    async fn test_write_snapshot_creates_dir_and_keeps_hebrew() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");

        let path = write_snapshot(&snapshot(&["100"]), dir.to_str().unwrap()).await.unwrap();
        assert_eq!(path, dir.join(SNAPSHOT_FILE));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("מכרז לשירותי דוברות 100"));
        assert!(written.contains("\"lastUpdate\": \"2026-10-18 09:30\""));

        let parsed: Snapshot = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.tenders, snapshot(&["100"]).tenders);
    }

    #[tokio::test]
    async fn test_write_snapshot_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        write_snapshot(&snapshot(&["1", "2", "3"]), dir).await.unwrap();
        let path = write_snapshot(&snapshot(&["4"]), dir).await.unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let parsed: Snapshot = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.total_count, 1);
        assert_eq!(parsed.tenders[0].tender_number, "4");
    }
}
