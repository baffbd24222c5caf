use chrono::NaiveDate;
use hidro_report::parser::parse_readings;
use hidro_report::report::{NumberFormat, render_report};
use hidro_report::stats::{AggregateError, ConsumptionReport};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn test_full_pipeline_from_export() {
    // Latin-1 export in the full 20-column layout, rows out of order, one
    // comma-decimal value, one unparsable row, and a gap on 2024-03-03.
    let bytes = include_bytes!("fixtures/export_sample.csv");

    let readings = parse_readings(bytes).expect("failed to parse export");
    assert_eq!(readings.len(), 7); // the "sem leitura" row is dropped

    let report =
        ConsumptionReport::compute(readings, date("2024-03-01"), date("2024-03-05")).unwrap();

    let consumptions: Vec<f64> = report.daily.iter().map(|d| d.consumption).collect();
    assert_eq!(consumptions, vec![12.5, 5.0, 0.0, 12.5, 0.0]);

    let has_data: Vec<bool> = report.daily.iter().map(|d| d.has_data).collect();
    assert_eq!(has_data, vec![true, true, false, true, true]);

    assert_eq!(report.total, 30.0);

    // 12.5 appears on both 03-01 and 03-04; the earliest wins
    let peak = report.peak.as_ref().unwrap();
    assert_eq!(peak.date, date("2024-03-01"));
    assert_eq!(peak.consumption, 12.5);

    // Fri + Mon + Tue vs Sat; the Sunday gap contributes nothing
    assert_eq!(report.split.weekday, 25.0);
    assert_eq!(report.split.weekend, 5.0);
    assert_eq!(report.split.total(), report.total);

    assert_eq!(report.monthly.len(), 1);
    assert_eq!(report.monthly[0].label(), "03/2024");
    assert_eq!(report.monthly[0].mean, 6.0);
}

#[test]
fn test_full_pipeline_renders_report() {
    let bytes = include_bytes!("fixtures/export_sample.csv");
    let readings = parse_readings(bytes).unwrap();
    let report =
        ConsumptionReport::compute(readings, date("2024-03-01"), date("2024-03-05")).unwrap();

    let doc = render_report(&report, &NumberFormat::pt_br());

    assert!(doc.contains("Period: 01/03/2024 to 05/03/2024"));
    assert!(doc.contains("30,00 m³"));
    assert!(doc.contains("12,50 m³, on 01/03/2024"));
    assert!(doc.contains("| 03/03/2024 | 0,00 * |"));
    assert!(doc.contains("| 03/2024 | 6,00 |"));
}

#[test]
fn test_range_outside_readings_reports_empty() {
    let bytes = include_bytes!("fixtures/export_sample.csv");
    let readings = parse_readings(bytes).unwrap();

    let err = ConsumptionReport::compute(readings, date("2024-04-01"), date("2024-04-30"))
        .unwrap_err();
    assert!(matches!(err, AggregateError::EmptyRange { .. }));
}
