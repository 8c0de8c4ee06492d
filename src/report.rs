//! CSV and HTML rendering of track summaries.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::tracks::{TrackAggregator, TrackSummary};

pub const CSV_HEADER: [&str; 5] = ["track id", "label", "time enter", "time exit", "confidence"];

/// CSS class carried by the HTML table.
pub const TABLE_CLASS: &str = "dataframe";

/// Format seconds as `MM:SS`, truncating fractional seconds.
pub fn format_mmss(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

/// Shortest rendering of a 2-decimal confidence, keeping one fractional digit.
pub fn format_confidence(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format!("{:.1}", confidence)
    } else {
        format!("{}", confidence)
    }
}

/// One formatted output row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRow {
    pub track_id: i64,
    pub label: String,
    pub time_enter: String,
    pub time_exit: String,
    pub confidence: String,
}

impl From<&TrackSummary> for SummaryRow {
    fn from(track: &TrackSummary) -> Self {
        Self {
            track_id: track.track_id,
            label: track.label.clone(),
            time_enter: format_mmss(track.enter_ts),
            time_exit: format_mmss(track.exit_ts),
            confidence: format_confidence(track.peak_confidence),
        }
    }
}

impl SummaryRow {
    fn cells(&self) -> [String; 5] {
        [
            self.track_id.to_string(),
            self.label.clone(),
            self.time_enter.clone(),
            self.time_exit.clone(),
            self.confidence.clone(),
        ]
    }
}

/// Per-track summary table, in first-appearance order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn from_tracks(tracks: &TrackAggregator) -> Self {
        Self::from_summaries(tracks.summaries())
    }

    pub fn from_summaries(summaries: &[TrackSummary]) -> Self {
        Self {
            rows: summaries.iter().map(SummaryRow::from).collect(),
        }
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, CSV_HEADER.iter().copied());
        for row in &self.rows {
            let cells = row.cells();
            push_csv_line(&mut out, cells.iter().map(String::as_str));
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "<table border=\"1\" class=\"{}\">", TABLE_CLASS);
        out.push_str("  <thead>\n    <tr style=\"text-align: right;\">\n");
        for name in CSV_HEADER {
            let _ = writeln!(out, "      <th>{}</th>", escape_html(name));
        }
        out.push_str("    </tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            out.push_str("    <tr>\n");
            for cell in row.cells() {
                let _ = writeln!(out, "      <td>{}</td>", escape_html(&cell));
            }
            out.push_str("    </tr>\n");
        }
        out.push_str("  </tbody>\n</table>");
        out
    }

    /// Write the CSV into `dir` under a timestamped file name.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create csv directory {}", dir.display()))?;
        let path = dir.join(csv_file_name());
        std::fs::write(&path, self.to_csv())
            .with_context(|| format!("failed to write csv {}", path.display()))?;
        log::info!("csv written to {}", path.display());
        Ok(path)
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_html())
            .with_context(|| format!("failed to write html table {}", path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `detections_data_YYYYmmdd_HHMMSS.csv` in local time.
pub fn csv_file_name() -> String {
    chrono::Local::now()
        .format("detections_data_%Y%m%d_%H%M%S.csv")
        .to_string()
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(track_id: i64, label: &str, enter: f64, exit: f64, conf: f64) -> TrackSummary {
        TrackSummary {
            track_id,
            label: label.to_string(),
            enter_ts: enter,
            exit_ts: exit,
            peak_confidence: conf,
        }
    }

    #[test]
    fn mmss_truncates_seconds() {
        assert_eq!(format_mmss(75.0), "01:15");
        assert_eq!(format_mmss(0.0), "00:00");
        assert_eq!(format_mmss(3599.9), "59:59");
        assert_eq!(format_mmss(59.99), "00:59");
    }

    #[test]
    fn confidence_keeps_one_fractional_digit() {
        assert_eq!(format_confidence(0.9), "0.9");
        assert_eq!(format_confidence(0.55), "0.55");
        assert_eq!(format_confidence(1.0), "1.0");
    }

    #[test]
    fn csv_has_header_and_one_row_per_track() {
        let table = SummaryTable::from_summaries(&[
            summary(7, "person", 0.5, 3.0, 0.9),
            summary(2, "car", 61.2, 75.0, 0.47),
        ]);
        let csv = table.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "track id,label,time enter,time exit,confidence");
        assert_eq!(lines[1], "7,person,00:00,00:03,0.9");
        assert_eq!(lines[2], "2,car,01:01,01:15,0.47");
        assert_eq!(lines.len() - 1, table.len());
    }

    #[test]
    fn csv_quotes_labels_that_need_it() {
        let table = SummaryTable::from_summaries(&[summary(1, "box, \"large\"", 0.0, 1.0, 0.5)]);
        let csv = table.to_csv();
        assert!(csv.contains("1,\"box, \"\"large\"\"\",00:00,00:01,0.5"));
    }

    #[test]
    fn html_table_carries_class_and_no_index() {
        let table = SummaryTable::from_summaries(&[summary(3, "dog & cat", 5.0, 9.0, 0.8)]);
        let html = table.to_html();
        assert!(html.starts_with("<table border=\"1\" class=\"dataframe\">"));
        assert!(html.contains("<th>track id</th>"));
        assert!(html.contains("<td>dog &amp; cat</td>"));
        assert!(html.contains("<td>00:05</td>"));
        assert_eq!(html.matches("<tr>").count(), 1);
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn empty_table_renders_header_only() {
        let table = SummaryTable::default();
        assert_eq!(table.to_csv(), "track id,label,time enter,time exit,confidence\n");
        assert!(table.to_html().contains("<tbody>\n  </tbody>"));
    }

    #[test]
    fn writes_timestamped_csv() {
        let dir = tempfile::tempdir().unwrap();
        let table = SummaryTable::from_summaries(&[summary(1, "person", 0.0, 2.0, 0.7)]);
        let path = table.write_csv(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("detections_data_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), table.to_csv());
    }
}
