//! Output persistence for computed reports.
//!
//! Writes the daily series CSV, the JSON summary, and the rendered report
//! document.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::stats::{ConsumptionReport, DailyConsumption};

/// Logs the full report as pretty-printed JSON.
pub fn print_json(report: &ConsumptionReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Writes the gap-free daily series as a CSV file with headers.
pub fn write_daily_csv(path: &Path, daily: &[DailyConsumption]) -> Result<()> {
    debug!(path = %path.display(), rows = daily.len(), "writing daily series CSV");

    let mut writer = csv::Writer::from_path(path)?;
    for day in daily {
        writer.serialize(day)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the whole report as pretty-printed JSON.
pub fn write_summary_json(path: &Path, report: &ConsumptionReport) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!(path = %path.display(), "summary JSON written");
    Ok(())
}

/// Writes the rendered report document.
pub fn write_report_text(path: &Path, document: &str) -> Result<()> {
    fs::write(path, document)?;
    info!(path = %path.display(), "report document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::env;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_daily() -> Vec<DailyConsumption> {
        vec![
            DailyConsumption {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                consumption: 5.0,
                has_data: true,
            },
            DailyConsumption {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                consumption: 0.0,
                has_data: false,
            },
        ]
    }

    #[test]
    fn test_write_daily_csv_headers_and_rows() {
        let path = temp_path("hidro_report_test_daily.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        write_daily_csv(&path, &sample_daily()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,consumption,has_data");
        assert_eq!(lines[1], "2024-01-01,5.0,true");
        assert_eq!(lines[2], "2024-01-02,0.0,false");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_report_text_roundtrip() {
        let path = temp_path("hidro_report_test_doc.md");
        let _ = fs::remove_file(&path);

        write_report_text(&path, "# WATER CONSUMPTION REPORT\n").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# WATER CONSUMPTION REPORT"));

        fs::remove_file(&path).unwrap();
    }
}
