use chrono::{DateTime, FixedOffset, Utc};

/// Whole seconds between `then` and `now`, floored, never negative.
pub fn elapsed_secs(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    let millis = (now - then).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        millis / 1000
    }
}

/// Horário de parede (`HH:MM`) no fuso do painel.
pub fn clock_label(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%H:%M").to_string()
}

pub fn relative_label(now: DateTime<Utc>, then: DateTime<Utc>, offset: FixedOffset) -> String {
    let secs = elapsed_secs(now, then);
    match secs {
        0..=4 => "baru saja".to_string(),
        5..=59 => format!("{} detik lalu", secs),
        60..=3_599 => format!("{} menit lalu", secs / 60),
        3_600..=86_399 => format!("{} jam lalu", secs / 3_600),
        _ => then.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_elapsed_floors_and_clamps() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(elapsed_secs(t0 + Duration::milliseconds(30_999), t0), 30);
        assert_eq!(elapsed_secs(t0 + Duration::seconds(31), t0), 31);
        assert_eq!(elapsed_secs(t0 - Duration::seconds(3), t0), 0);
    }

    #[test]
    fn test_clock_label_uses_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap();
        assert_eq!(clock_label(ts, wib()), "17:05");
    }

    #[test]
    fn test_relative_labels() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(relative_label(t0 + Duration::seconds(2), t0, wib()), "baru saja");
        assert_eq!(relative_label(t0 + Duration::seconds(12), t0, wib()), "12 detik lalu");
        assert_eq!(relative_label(t0 + Duration::minutes(3), t0, wib()), "3 menit lalu");
        assert_eq!(relative_label(t0 + Duration::hours(2), t0, wib()), "2 jam lalu");
        assert_eq!(relative_label(t0 + Duration::days(2), t0, wib()), "01/05/2024 17:00");
    }
}
