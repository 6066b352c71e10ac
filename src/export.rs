use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::availability::Availabilities;
use crate::traits::Clock;

/// One CSV line: a free slot on a given day.
#[derive(Debug, Serialize)]
struct SlotRow<'a> {
    date: String,
    slot: &'a str,
}

/// Export availabilities to a timestamped CSV file in `output_dir`.
///
/// Rows are `date,slot`, days ascending. Days with no free slot produce no
/// rows.
///
/// # Returns
/// The path to the created CSV file on success.
pub async fn export_to_csv<C: Clock>(
    availabilities: &Availabilities,
    output_dir: &Path,
    clock: &C,
) -> Result<PathBuf> {
    let export_time = clock.now_utc();
    let filename = format!(
        "availabilities_{}.csv",
        export_time.format("%Y%m%d_%H%M%S")
    );
    let output_path = output_dir.join(&filename);

    let path = output_path.clone();
    let slot_count = availabilities.slot_count();
    let availabilities = availabilities.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .context("Failed to create CSV writer")?;

        // Header is written by hand so an export without slots still has one.
        wtr.write_record(["date", "slot"])
            .context("Failed to write CSV header")?;

        for (day, slots) in availabilities.iter() {
            let date = day.format("%Y-%m-%d").to_string();
            for slot in slots {
                wtr.serialize(SlotRow {
                    date: date.clone(),
                    slot,
                })
                .context("Failed to serialize slot row")?;
            }
        }

        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    })
    .await
    .context("CSV export task failed")??;

    tracing::info!("Exported {} slots to {}", slot_count, output_path.display());

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::availability::compute_availabilities;
    use crate::event::Event;
    use crate::traits::MockClock;

    fn clock() -> MockClock {
        MockClock::new(Utc.with_ymd_and_hms(2020, 1, 1, 8, 15, 30).unwrap())
    }

    #[tokio::test]
    async fn test_export_filename_uses_clock() {
        let availabilities =
            compute_availabilities(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), &[]);
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let path = export_to_csv(&availabilities, temp_dir.path(), &clock())
            .await
            .expect("Export should succeed");

        let filename = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(filename, "availabilities_20200101_081530.csv");
    }

    #[tokio::test]
    async fn test_export_empty_availabilities_writes_header_only() {
        let availabilities =
            compute_availabilities(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), &[]);
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let path = export_to_csv(&availabilities, temp_dir.path(), &clock())
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "date,slot\n");
    }

    #[tokio::test]
    async fn test_export_rows_follow_days_and_slots() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let events = vec![
            Event::opening(start, start + chrono::Duration::hours(1)),
            Event::opening(
                start + chrono::Duration::days(2),
                start + chrono::Duration::days(2) + chrono::Duration::minutes(30),
            ),
        ];
        let availabilities =
            compute_availabilities(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), &events);
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let path = export_to_csv(&availabilities, temp_dir.path(), &clock())
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,slot",
                "2020-01-01,9:00",
                "2020-01-01,9:30",
                "2020-01-03,9:00",
            ]
        );
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_fails() {
        let availabilities =
            compute_availabilities(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), &[]);
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("does-not-exist");

        let result = export_to_csv(&availabilities, &missing, &clock()).await;
        assert!(result.is_err());
    }
}
