//! Pure presentation rules for the module page.
//!
//! Everything here mirrors observable page behavior: the greeting derived
//! from the module heading, the initials badge, and the detection table
//! formatting (two-decimal confidence, local time-of-day timestamps, child
//! rows highlighted).

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

use crate::egui_app::state::DetectionRowView;
use crate::portal::api::Detection;

/// Heading of the detection module; the greeting parses the module name out
/// of the segment after the em-dash.
pub const MODULE_HEADING: &str = "Dronewatch — Child Detection";

/// Label that gets rows highlighted, compared case-insensitively.
const HIGHLIGHT_LABEL: &str = "child";

/// Extract the module name from a heading, taking the segment after the
/// em-dash separator and falling back to the first segment.
pub fn module_name_from_heading(heading: &str) -> String {
    let mut parts = heading.split('—');
    let first = parts.next().unwrap_or_default().trim();
    match parts.next().map(str::trim) {
        Some(second) if !second.is_empty() => second.to_string(),
        _ => first.to_string(),
    }
}

/// Greeting line combining the operator display string with the module name.
pub fn greeting_line(display: &str, heading: &str) -> String {
    let module = module_name_from_heading(heading);
    format!("Welcome, {display} — You opened {module} controls.")
}

/// Header badge: first letters of up to two words, uppercased.
pub fn initials_badge(display: &str) -> String {
    display
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(|ch| ch.to_uppercase())
        .collect()
}

/// Confidence rendered to exactly two decimal places.
pub fn confidence_label(confidence: f64) -> String {
    format!("{confidence:.2}")
}

/// Seconds-since-epoch rendered as a time-of-day string in the given offset.
pub fn timestamp_label(seconds: f64, offset: UtcOffset) -> String {
    const TIME_FORMAT: &[FormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
    if !seconds.is_finite() {
        return "—".to_string();
    }
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp(seconds as i64) else {
        return "—".to_string();
    };
    datetime
        .to_offset(offset)
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| "—".to_string())
}

/// Offset used for timestamp rendering; local when resolvable.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Whether a label gets the highlight treatment.
pub fn is_highlighted(label: &str) -> bool {
    label.eq_ignore_ascii_case(HIGHLIGHT_LABEL)
}

/// Build table rows from a detection list, preserving order.
pub fn detection_rows(detections: &[Detection], offset: UtcOffset) -> Vec<DetectionRowView> {
    detections
        .iter()
        .map(|detection| DetectionRowView {
            label: detection.label.clone(),
            confidence_text: confidence_label(detection.confidence),
            timestamp_text: timestamp_label(detection.timestamp, offset),
            highlighted: is_highlighted(&detection.label),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_prefers_segment_after_em_dash() {
        assert_eq!(
            module_name_from_heading("Dronewatch — Child Detection"),
            "Child Detection"
        );
    }

    #[test]
    fn module_name_falls_back_to_first_segment() {
        assert_eq!(module_name_from_heading("Body Tracking"), "Body Tracking");
        assert_eq!(module_name_from_heading("Thermal — "), "Thermal");
    }

    #[test]
    fn greeting_combines_display_and_module() {
        assert_eq!(
            greeting_line("Dana", MODULE_HEADING),
            "Welcome, Dana — You opened Child Detection controls."
        );
    }

    #[test]
    fn initials_use_up_to_two_words() {
        assert_eq!(initials_badge("dana ortiz"), "DO");
        assert_eq!(initials_badge("Ana Maria Ruiz"), "AM");
        assert_eq!(initials_badge("solo"), "S");
        assert_eq!(initials_badge("dana@example.net"), "D");
        assert_eq!(initials_badge(""), "");
    }

    #[test]
    fn confidence_has_exactly_two_decimals() {
        assert_eq!(confidence_label(0.875), "0.88");
        assert_eq!(confidence_label(0.6), "0.60");
        assert_eq!(confidence_label(1.0), "1.00");
    }

    #[test]
    fn timestamp_renders_time_of_day_in_offset() {
        // 2023-11-14 22:13:20 UTC.
        assert_eq!(timestamp_label(1_700_000_000.0, UtcOffset::UTC), "22:13:20");
        let plus_two = UtcOffset::from_hms(2, 0, 0).unwrap();
        assert_eq!(timestamp_label(1_700_000_000.0, plus_two), "00:13:20");
    }

    #[test]
    fn timestamp_tolerates_garbage() {
        assert_eq!(timestamp_label(f64::NAN, UtcOffset::UTC), "—");
        assert_eq!(timestamp_label(f64::INFINITY, UtcOffset::UTC), "—");
    }

    #[test]
    fn only_child_labels_highlight() {
        assert!(is_highlighted("child"));
        assert!(is_highlighted("Child"));
        assert!(is_highlighted("CHILD"));
        assert!(!is_highlighted("children"));
        assert!(!is_highlighted("adult"));
        assert!(!is_highlighted(""));
    }

    #[test]
    fn rows_preserve_order_and_formatting() {
        let detections = vec![
            Detection {
                label: "adult".into(),
                confidence: 0.62,
                timestamp: 1_700_000_000.0,
            },
            Detection {
                label: "Child".into(),
                confidence: 0.875,
                timestamp: 1_700_000_001.0,
            },
        ];
        let rows = detection_rows(&detections, UtcOffset::UTC);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "adult");
        assert_eq!(rows[0].confidence_text, "0.62");
        assert!(!rows[0].highlighted);
        assert_eq!(rows[1].confidence_text, "0.88");
        assert_eq!(rows[1].timestamp_text, "22:13:21");
        assert!(rows[1].highlighted);
    }
}
