//! Display helpers for result cards.

use crate::models::Difficulty;

/// `95` → `1 hr 35 min`, `120` → `2 hrs`, `15` → `15 min`. `None` renders
/// as an em dash placeholder.
pub fn format_minutes(minutes: Option<u32>) -> String {
    let Some(minutes) = minutes else {
        return "\u{2014}".to_string();
    };

    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours == 0 {
        return format!("{minutes} min");
    }

    let unit = if hours > 1 { "hrs" } else { "hr" };
    if rest == 0 {
        format!("{hours} {unit}")
    } else {
        format!("{hours} {unit} {rest} min")
    }
}

/// Title-cased difficulty for known values; anything else passes through.
pub fn format_difficulty(difficulty: Option<&str>) -> String {
    match difficulty {
        None | Some("") => "Unknown".to_string(),
        Some(raw) => match raw.to_lowercase().parse::<Difficulty>() {
            Ok(known) => capitalize(known.as_str()),
            Err(_) => raw.to_string(),
        },
    }
}

/// Compact counts: `15400` → `15.4K`, `3200000` → `3.2M`.
pub fn format_number(value: Option<u64>) -> String {
    match value {
        None => "0".to_string(),
        Some(v) if v >= 1_000_000 => format!("{:.1}M", v as f64 / 1_000_000.0),
        Some(v) if v >= 1_000 => format!("{:.1}K", v as f64 / 1_000.0),
        Some(v) => v.to_string(),
    }
}

/// Backend tag for display: `resistance_bands` → `Resistance bands`.
pub fn format_tag(tag: &str) -> String {
    capitalize(&tag.trim().replace('_', " "))
}

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes() {
        assert_eq!(format_minutes(Some(95)), "1 hr 35 min");
        assert_eq!(format_minutes(Some(120)), "2 hrs");
        assert_eq!(format_minutes(Some(60)), "1 hr");
        assert_eq!(format_minutes(Some(15)), "15 min");
        assert_eq!(format_minutes(Some(0)), "0 min");
        assert_eq!(format_minutes(None), "—");
    }

    #[test]
    fn difficulty() {
        assert_eq!(format_difficulty(Some("HARD")), "Hard");
        assert_eq!(format_difficulty(Some("easy")), "Easy");
        assert_eq!(format_difficulty(Some("Medium")), "Medium");
        assert_eq!(format_difficulty(Some("brutal")), "brutal");
        assert_eq!(format_difficulty(Some("")), "Unknown");
        assert_eq!(format_difficulty(None), "Unknown");
    }

    #[test]
    fn numbers() {
        assert_eq!(format_number(Some(15_400)), "15.4K");
        assert_eq!(format_number(Some(3_200_000)), "3.2M");
        assert_eq!(format_number(Some(1_000)), "1.0K");
        assert_eq!(format_number(Some(999)), "999");
        assert_eq!(format_number(None), "0");
    }

    #[test]
    fn tags() {
        assert_eq!(format_tag("resistance_bands"), "Resistance bands");
        assert_eq!(format_tag("mat"), "Mat");
        assert_eq!(format_tag("All Levels"), "All Levels");
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("dumbbells"), "Dumbbells");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("é"), "É");
    }
}
