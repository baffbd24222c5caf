//! Report document rendering.
//!
//! Turns a computed [`ConsumptionReport`] into the textual report document.
//! The aggregation guarantees a range-complete, date-ordered daily series,
//! so rendering is pure formatting. Number formatting is an explicit
//! parameter instead of process-wide locale state.

use crate::stats::{ConsumptionReport, mean};

/// Decimal formatting rules for rendered quantities.
#[derive(Debug, Clone, Copy)]
pub struct NumberFormat {
    pub decimal: char,
    pub grouping: Option<char>,
}

impl NumberFormat {
    /// `1.234,56` — the convention the reports have always been issued in.
    pub fn pt_br() -> Self {
        Self {
            decimal: ',',
            grouping: Some('.'),
        }
    }

    /// `1234.56`
    pub fn plain() -> Self {
        Self {
            decimal: '.',
            grouping: None,
        }
    }

    /// Formats `value` with two decimal places.
    pub fn format(&self, value: f64) -> String {
        let rounded = format!("{:.2}", value.abs());
        let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

        let mut grouped = String::new();
        if let Some(sep) = self.grouping {
            let digits: Vec<char> = int_part.chars().collect();
            for (i, c) in digits.iter().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(sep);
                }
                grouped.push(*c);
            }
        } else {
            grouped.push_str(int_part);
        }

        let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
        format!("{sign}{grouped}{}{frac_part}", self.decimal)
    }
}

const INTRO: &str = "This report presents the daily water consumption computed from the \
meter readings registered for the period, ordered chronologically. It highlights the days \
of highest demand to support decisions on water usage and operational efficiency.";

/// Renders the report document as markdown.
///
/// Includes the summary paragraph, the weekday/weekend totals, the complete
/// daily table (zero-filled days annotated), and the monthly averages.
pub fn render_report(report: &ConsumptionReport, fmt: &NumberFormat) -> String {
    let period_start = report.start.format("%d/%m/%Y");
    let period_end = report.end.format("%d/%m/%Y");

    let mut doc = String::new();

    doc.push_str("# WATER CONSUMPTION REPORT\n\n");
    doc.push_str(&format!("Period: {period_start} to {period_end}\n\n"));
    doc.push_str(INTRO);
    doc.push_str("\n\n");

    let peak_line = match &report.peak {
        Some(peak) => format!(
            "The highest daily consumption was {} m\u{b3}, on {}.",
            fmt.format(peak.consumption),
            peak.date.format("%d/%m/%Y"),
        ),
        None => "No readings were recorded in the period.".to_string(),
    };

    let monthly_values: Vec<f64> = report.monthly.iter().map(|m| m.mean).collect();
    doc.push_str(&format!(
        "Total consumption for the period was {} m\u{b3}. {} The average monthly \
consumption was {} m\u{b3}. Weekdays accounted for {} m\u{b3} and weekends for {} m\u{b3}.\n\n",
        fmt.format(report.total),
        peak_line,
        fmt.format(mean(&monthly_values)),
        fmt.format(report.split.weekday),
        fmt.format(report.split.weekend),
    ));

    doc.push_str("## Daily consumption\n\n");
    doc.push_str("| Date | Consumption (m\u{b3}) |\n");
    doc.push_str("|------|------------------|\n");
    let mut gap_days = false;
    for day in &report.daily {
        let marker = if day.has_data { "" } else { " *" };
        gap_days |= !day.has_data;
        doc.push_str(&format!(
            "| {} | {}{marker} |\n",
            day.date.format("%d/%m/%Y"),
            fmt.format(day.consumption),
        ));
    }
    if gap_days {
        doc.push_str("\n\\* day without readings, shown as zero\n");
    }
    doc.push('\n');

    doc.push_str("## Monthly averages\n\n");
    doc.push_str("| Month | Average (m\u{b3}) |\n");
    doc.push_str("|-------|--------------|\n");
    for month in &report.monthly {
        doc.push_str(&format!("| {} | {} |\n", month.label(), fmt.format(month.mean)));
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{ConsumptionReport, Reading};
    use chrono::NaiveDateTime;

    fn reading(ts: &str, value: f64) -> Reading {
        Reading {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M").unwrap(),
            value,
        }
    }

    fn sample_report() -> ConsumptionReport {
        ConsumptionReport::compute(
            vec![
                reading("2024-03-01 08:00", 1000.0),
                reading("2024-03-01 20:00", 1012.5),
                reading("2024-03-02 09:00", 1015.0),
                reading("2024-03-02 19:00", 1020.0),
            ],
            "2024-03-01".parse().unwrap(),
            "2024-03-03".parse().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_format_pt_br_grouping() {
        let fmt = NumberFormat::pt_br();
        assert_eq!(fmt.format(1234.5), "1.234,50");
        assert_eq!(fmt.format(1234567.891), "1.234.567,89");
        assert_eq!(fmt.format(12.5), "12,50");
        assert_eq!(fmt.format(0.0), "0,00");
        assert_eq!(fmt.format(-42.0), "-42,00");
    }

    #[test]
    fn test_format_plain() {
        let fmt = NumberFormat::plain();
        assert_eq!(fmt.format(1234.5), "1234.50");
        assert_eq!(fmt.format(-0.001), "0.00");
    }

    #[test]
    fn test_render_contains_summary_figures() {
        let doc = render_report(&sample_report(), &NumberFormat::pt_br());

        assert!(doc.contains("Period: 01/03/2024 to 03/03/2024"));
        // total 17.5, peak 12.5 on 01/03
        assert!(doc.contains("17,50 m³"));
        assert!(doc.contains("12,50 m³, on 01/03/2024"));
    }

    #[test]
    fn test_render_daily_table_annotates_gap_days() {
        let doc = render_report(&sample_report(), &NumberFormat::pt_br());

        // 2024-03-03 had no readings
        assert!(doc.contains("| 03/03/2024 | 0,00 * |"));
        assert!(doc.contains("day without readings"));
        assert!(doc.contains("| 01/03/2024 | 12,50 |"));
    }

    #[test]
    fn test_render_monthly_table() {
        let doc = render_report(&sample_report(), &NumberFormat::plain());
        // 17.5 over 3 days
        assert!(doc.contains("| 03/2024 | 5.83 |"));
    }
}
