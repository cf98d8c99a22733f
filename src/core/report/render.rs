//! Plain-text report.
//!
//! Layout, in this order: header, frame totals, anomaly count, activity
//! section, emotion section. Histogram lines read `- <name>: <n> occurrences`,
//! with backslashes and line breaks in the name escaped so every entry stays
//! on one line.

use super::summary::RunSummary;
use crate::core::error::ReportError;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const HEADER: &str = "=== Summary Report ===";
const ACTIVITY_SECTION: &str = "Activity summary:";
const EMOTION_SECTION: &str = "Emotion summary:";

static COUNTER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(Total frames seen|Frames analyzed|Anomalies detected|Frames without emotion data): (\d+)$",
    )
    .unwrap()
});
static HISTOGRAM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^- (.*): (\d+) occurrences$").unwrap());

pub fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "{}", HEADER);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total frames seen: {}", summary.total_frames_seen);
    let _ = writeln!(out, "Frames analyzed: {}", summary.total_frames_sampled);
    let _ = writeln!(out, "Anomalies detected: {}", summary.anomaly_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", ACTIVITY_SECTION);
    write_histogram(&mut out, &summary.activity_histogram);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", EMOTION_SECTION);
    write_histogram(&mut out, &summary.emotion_histogram);
    let _ = writeln!(
        out,
        "Frames without emotion data: {}",
        summary.frames_without_emotion
    );

    out
}

fn write_histogram(out: &mut String, histogram: &BTreeMap<String, u64>) {
    for (name, count) in histogram {
        let _ = writeln!(out, "- {}: {} occurrences", escape_name(name), count);
    }
}

fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape_name(escaped: &str) -> Option<String> {
    let mut name = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            name.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => name.push('\\'),
            'n' => name.push('\n'),
            'r' => name.push('\r'),
            _ => return None,
        }
    }
    Some(name)
}

/// Reads a rendered report back. `None` if the header or a counter is missing.
pub fn parse_report(text: &str) -> Option<RunSummary> {
    #[derive(PartialEq)]
    enum Section {
        Preamble,
        Activity,
        Emotion,
    }

    let mut lines = text.lines();
    if lines.next()?.trim() != HEADER {
        return None;
    }

    let mut section = Section::Preamble;
    let mut counters: BTreeMap<String, u64> = BTreeMap::new();
    let mut summary = RunSummary::default();

    for line in lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match line {
            ACTIVITY_SECTION => section = Section::Activity,
            EMOTION_SECTION => section = Section::Emotion,
            _ => {
                if let Some(caps) = COUNTER_LINE.captures(line) {
                    counters.insert(caps[1].to_string(), caps[2].parse().ok()?);
                } else if let Some(caps) = HISTOGRAM_LINE.captures(line) {
                    let count: u64 = caps[2].parse().ok()?;
                    let target = match section {
                        Section::Activity => &mut summary.activity_histogram,
                        Section::Emotion => &mut summary.emotion_histogram,
                        Section::Preamble => continue,
                    };
                    target.insert(unescape_name(&caps[1])?, count);
                }
            }
        }
    }

    summary.total_frames_seen = *counters.get("Total frames seen")?;
    summary.total_frames_sampled = *counters.get("Frames analyzed")?;
    summary.anomaly_count = *counters.get("Anomalies detected")?;
    summary.frames_without_emotion = counters
        .get("Frames without emotion data")
        .copied()
        .unwrap_or(0);
    Some(summary)
}

/// Truncates and rewrites `path`.
pub fn write_report(path: &Path, text: &str) -> Result<(), ReportError> {
    std::fs::write(path, text).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("📝 Report written to {:?}", path);
    Ok(())
}

pub fn write_json_summary(path: &Path, summary: &RunSummary) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("📝 JSON summary written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_summary() -> RunSummary {
        RunSummary {
            total_frames_seen: 400,
            total_frames_sampled: 20,
            anomaly_count: 3,
            activity_histogram: [
                ("normal".to_string(), 15),
                ("anomalous".to_string(), 3),
                ("arms raised".to_string(), 2),
            ]
            .into_iter()
            .collect(),
            emotion_histogram: [("happy".to_string(), 7), ("smile".to_string(), 4)]
                .into_iter()
                .collect(),
            frames_without_emotion: 5,
        }
    }

    #[test]
    fn test_render_section_order() {
        let text = render(&sample_summary());
        let pos = |needle: &str| text.find(needle).unwrap();

        assert!(text.starts_with(HEADER));
        assert!(pos("Total frames seen: 400") < pos("Anomalies detected: 3"));
        assert!(pos("Anomalies detected: 3") < pos(ACTIVITY_SECTION));
        assert!(pos(ACTIVITY_SECTION) < pos(EMOTION_SECTION));
        assert!(text.contains("- arms raised: 2 occurrences"));
        assert!(text.contains("- happy: 7 occurrences"));
    }

    #[test]
    fn test_render_parse_round_trip() {
        let summary = sample_summary();
        let parsed = parse_report(&render(&summary)).unwrap();

        assert_eq!(parsed.activity_histogram, summary.activity_histogram);
        assert_eq!(parsed.emotion_histogram, summary.emotion_histogram);
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_round_trip_empty_histograms() {
        let summary = RunSummary {
            total_frames_seen: 3,
            ..Default::default()
        };
        assert_eq!(parse_report(&render(&summary)).unwrap(), summary);
    }

    #[test]
    fn test_label_with_colon_survives() {
        let mut summary = sample_summary();
        summary
            .activity_histogram
            .insert("pose: crouching".to_string(), 1);
        let parsed = parse_report(&render(&summary)).unwrap();
        assert_eq!(parsed.activity_histogram.get("pose: crouching"), Some(&1));
    }

    #[test]
    fn test_awkward_names_survive() {
        let mut summary = sample_summary();
        for name in ["", "two\nlines", "back\\slash\\n", "cr\r", "x: 3 occurrences"] {
            summary.activity_histogram.insert(name.to_string(), 2);
            summary.emotion_histogram.insert(name.to_string(), 1);
        }

        let text = render(&summary);
        assert_eq!(text.lines().count(), render(&sample_summary()).lines().count() + 10);
        assert_eq!(parse_report(&text).unwrap(), summary);
    }

    #[test]
    fn test_bad_escape_rejected() {
        let text = format!(
            "{}\n\nTotal frames seen: 1\nFrames analyzed: 1\nAnomalies detected: 0\n\n{}\n- a\\q: 1 occurrences\n",
            HEADER, ACTIVITY_SECTION
        );
        assert!(parse_report(&text).is_none());
    }

    proptest! {
        #[test]
        fn prop_render_parse_round_trip(
            activity in proptest::collection::btree_map(any::<String>(), 0u64..10_000, 0..8),
            emotion in proptest::collection::btree_map(any::<String>(), 0u64..10_000, 0..8),
            seen in 0u64..100_000,
            without_emotion in 0u64..100,
        ) {
            let summary = RunSummary {
                total_frames_seen: seen,
                total_frames_sampled: activity.values().sum(),
                anomaly_count: activity.get("anomalous").copied().unwrap_or(0),
                activity_histogram: activity,
                emotion_histogram: emotion,
                frames_without_emotion: without_emotion,
            };
            prop_assert_eq!(parse_report(&render(&summary)), Some(summary));
        }
    }

    #[test]
    fn test_parse_rejects_foreign_text() {
        assert!(parse_report("hello\nworld").is_none());
        assert!(parse_report(&format!("{}\n\nActivity summary:\n", HEADER)).is_none());
    }

    #[test]
    fn test_write_report_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary_report.txt");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        let text = render(&sample_summary());
        write_report(&path, &text).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_write_report_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary_report.txt");
        let err = write_report(&path, "text").unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn test_json_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json_summary(&path, &sample_summary()).unwrap();

        let loaded: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, sample_summary());
    }
}
