use serde::Deserialize;
use time::{Date, Month, Time};

use super::ClassifyError;

/// How readings outside the night window are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Everything outside the night window gets the day label.
    #[default]
    Complement,
    /// Outside the night window, only readings inside the configured morning
    /// window get the day label; the rest get the no-shift label.
    DayWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftLabels {
    pub day: String,
    pub night: String,
    pub no_shift: String,
}

impl Default for ShiftLabels {
    fn default() -> Self {
        Self {
            day: "morning".to_string(),
            night: "night".to_string(),
            no_shift: "noshift".to_string(),
        }
    }
}

/// A `[start, stop)` window in minutes since midnight. `start > stop` means
/// the window runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    start: u16,
    stop: u16,
}

impl ShiftWindow {
    pub fn new(start: Time, stop: Time) -> Self {
        Self {
            start: minutes_since_midnight(start),
            stop: minutes_since_midnight(stop),
        }
    }

    pub fn parse(start: &str, stop: &str) -> Result<Self, ClassifyError> {
        Ok(Self::new(parse_clock_time(start)?, parse_clock_time(stop)?))
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.stop
    }

    /// Equal bounds cover the whole day.
    pub fn contains(&self, minute: u16) -> bool {
        if self.start < self.stop {
            self.start <= minute && minute < self.stop
        } else {
            minute >= self.start || minute < self.stop
        }
    }
}

/// A reading date as stored, plus its parsed calendar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingDate<'a> {
    text: &'a str,
    date: Date,
}

impl<'a> ReadingDate<'a> {
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    pub fn date(&self) -> Date {
        self.date
    }
}

fn minutes_since_midnight(t: Time) -> u16 {
    u16::from(t.hour()) * 60 + u16::from(t.minute())
}

/// Label `date`/`at` with the shift it belongs to, as `"<date> <label>"`.
///
/// The date text is kept as stored, except for the tail of a night window
/// that started the previous evening, which is credited to the previous
/// calendar day. `day_window` is only consulted in [`ShiftMode::DayWindow`];
/// pass `None` for the complement rule.
pub fn classify_shift(
    date: ReadingDate<'_>,
    at: Time,
    night: ShiftWindow,
    day_window: Option<ShiftWindow>,
    labels: &ShiftLabels,
) -> String {
    let current = minutes_since_midnight(at);

    if night.crosses_midnight() {
        if current >= night.start {
            return shift_label(date.as_str(), &labels.night);
        }
        if current < night.stop {
            // Dates come from two-digit years, so there is always a previous day.
            let previous = date.date().previous_day().unwrap_or(date.date());
            return shift_label(&render_reading_date(previous), &labels.night);
        }
    } else if night.start <= current && current < night.stop {
        return shift_label(date.as_str(), &labels.night);
    }

    match day_window {
        Some(day) if !day.contains(current) => shift_label(date.as_str(), &labels.no_shift),
        _ => shift_label(date.as_str(), &labels.day),
    }
}

fn shift_label(date: &str, label: &str) -> String {
    format!("{date} {label}")
}

/// Parse `H:MM` (an extra `:SS` component is ignored).
pub fn parse_clock_time(s: &str) -> Result<Time, ClassifyError> {
    let malformed = || ClassifyError::MalformedTime(s.to_string());

    let mut parts = s.trim().split(':');
    let hour: u8 = parts.next().and_then(|p| p.trim().parse().ok()).ok_or_else(malformed)?;
    let minute: u8 = parts.next().and_then(|p| p.trim().parse().ok()).ok_or_else(malformed)?;
    if let Some(seconds) = parts.next() {
        seconds.trim().parse::<u8>().map_err(|_| malformed())?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }

    Time::from_hms(hour, minute, 0).map_err(|_| malformed())
}

/// Parse `YY/MM/DD` as a date in 2000..=2099.
pub fn parse_reading_date(s: &str) -> Result<ReadingDate<'_>, ClassifyError> {
    let malformed = || ClassifyError::MalformedDate(s.to_string());

    let parts: Vec<&str> = s.trim().split('/').collect();
    let [yy, mm, dd] = parts.as_slice() else {
        return Err(malformed());
    };

    let yy: i32 = yy.trim().parse().map_err(|_| malformed())?;
    if !(0..100).contains(&yy) {
        return Err(malformed());
    }
    let mm: u8 = mm.trim().parse().map_err(|_| malformed())?;
    let dd: u8 = dd.trim().parse().map_err(|_| malformed())?;

    let month = Month::try_from(mm).map_err(|_| malformed())?;
    let date = Date::from_calendar_date(2000 + yy, month, dd).map_err(|_| malformed())?;

    Ok(ReadingDate { text: s.trim(), date })
}

/// Render a date back as unpadded `YY/MM/DD`.
pub fn render_reading_date(date: Date) -> String {
    format!("{}/{}/{}", date.year() % 100, u8::from(date.month()), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn overnight() -> ShiftWindow {
        ShiftWindow::parse("22:00", "06:00").unwrap()
    }

    fn label(date_str: &str, at: &str, night: ShiftWindow) -> String {
        classify_shift(
            parse_reading_date(date_str).unwrap(),
            parse_clock_time(at).unwrap(),
            night,
            None,
            &ShiftLabels::default(),
        )
    }

    #[test]
    fn overnight_window_keeps_date_before_midnight() {
        assert_eq!(label("25/6/10", "23:30", overnight()), "25/6/10 night");
        assert_eq!(label("25/6/10", "22:00", overnight()), "25/6/10 night");
    }

    #[test]
    fn overnight_window_tail_belongs_to_previous_day() {
        assert_eq!(label("25/6/10", "02:00", overnight()), "25/6/9 night");
        assert_eq!(label("25/6/10", "0:00", overnight()), "25/6/9 night");
    }

    #[test]
    fn outside_overnight_window_is_day_shift() {
        assert_eq!(label("25/6/10", "10:00", overnight()), "25/6/10 morning");
        assert_eq!(label("25/6/10", "6:00", overnight()), "25/6/10 morning");
        assert_eq!(label("25/6/10", "21:59", overnight()), "25/6/10 morning");
    }

    #[test]
    fn previous_day_rolls_back_across_month_and_year() {
        assert_eq!(label("25/3/1", "01:00", overnight()), "25/2/28 night");
        assert_eq!(label("24/3/1", "01:00", overnight()), "24/2/29 night");
        assert_eq!(label("25/1/1", "01:00", overnight()), "24/12/31 night");
        assert_eq!(label("0/1/1", "01:00", overnight()), "99/12/31 night");
    }

    #[test]
    fn same_day_window_is_half_open() {
        let window = ShiftWindow::parse("06:00", "14:00").unwrap();
        assert_eq!(label("25/6/10", "06:00", window), "25/6/10 night");
        assert_eq!(label("25/6/10", "13:59", window), "25/6/10 night");
        assert_eq!(label("25/6/10", "14:00", window), "25/6/10 morning");
        assert_eq!(label("25/6/10", "05:59", window), "25/6/10 morning");
    }

    #[test]
    fn empty_window_never_matches() {
        let window = ShiftWindow::parse("08:00", "08:00").unwrap();
        assert!(!window.crosses_midnight());
        assert_eq!(label("25/6/10", "08:00", window), "25/6/10 morning");
    }

    #[test]
    fn day_window_mode_labels_gaps_as_no_shift() {
        let night = ShiftWindow::parse("22:00", "06:00").unwrap();
        let day = ShiftWindow::parse("08:00", "18:00").unwrap();
        let labels = ShiftLabels::default();
        let d = parse_reading_date("25/6/10").unwrap();

        assert_eq!(classify_shift(d, time!(09:00), night, Some(day), &labels), "25/6/10 morning");
        assert_eq!(classify_shift(d, time!(19:30), night, Some(day), &labels), "25/6/10 noshift");
        assert_eq!(classify_shift(d, time!(07:00), night, Some(day), &labels), "25/6/10 noshift");
        assert_eq!(classify_shift(d, time!(03:00), night, Some(day), &labels), "25/6/9 night");
    }

    #[test]
    fn day_window_with_equal_bounds_covers_the_whole_day() {
        let night = ShiftWindow::parse("22:00", "06:00").unwrap();
        let day = ShiftWindow::parse("06:00", "06:00").unwrap();
        let labels = ShiftLabels::default();
        let d = parse_reading_date("25/6/10").unwrap();

        assert_eq!(classify_shift(d, time!(06:00), night, Some(day), &labels), "25/6/10 morning");
        assert_eq!(classify_shift(d, time!(12:00), night, Some(day), &labels), "25/6/10 morning");
        assert_eq!(classify_shift(d, time!(21:59), night, Some(day), &labels), "25/6/10 morning");
    }

    #[test]
    fn padded_date_is_kept_as_stored_unless_rolled_back() {
        assert_eq!(label("25/06/10", "23:30", overnight()), "25/06/10 night");
        assert_eq!(label("25/06/10", "10:00", overnight()), "25/06/10 morning");
        assert_eq!(label("25/06/10", "02:00", overnight()), "25/6/9 night");
    }

    #[test]
    fn custom_labels_are_used_verbatim() {
        let labels = ShiftLabels {
            day: "A".to_string(),
            night: "B".to_string(),
            no_shift: "-".to_string(),
        };
        let d = parse_reading_date("25/6/10").unwrap();
        assert_eq!(classify_shift(d, time!(12:00), overnight(), None, &labels), "25/6/10 A");
        assert_eq!(classify_shift(d, time!(23:00), overnight(), None, &labels), "25/6/10 B");
    }

    #[test]
    fn clock_time_parsing() {
        assert_eq!(parse_clock_time("6:05").unwrap(), time!(06:05));
        assert_eq!(parse_clock_time(" 23:59 ").unwrap(), time!(23:59));
        assert_eq!(parse_clock_time("23:59:30").unwrap(), time!(23:59));
        for bad in ["", "24:00", "12:60", "12", "ab:cd", "1:2:3:4", "-1:00"] {
            assert!(
                matches!(parse_clock_time(bad), Err(ClassifyError::MalformedTime(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn reading_date_parsing() {
        assert_eq!(parse_reading_date("25/6/10").unwrap().date(), date!(2025 - 06 - 10));
        let padded = parse_reading_date(" 25/06/01 ").unwrap();
        assert_eq!(padded.date(), date!(2025 - 06 - 01));
        assert_eq!(padded.as_str(), "25/06/01");
        for bad in ["", "25/6", "25/13/1", "25/2/30", "2025/6/10", "25/6/10/1", "x/6/10"] {
            assert!(
                matches!(parse_reading_date(bad), Err(ClassifyError::MalformedDate(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn rendering_drops_padding_and_century() {
        assert_eq!(render_reading_date(date!(2025 - 03 - 01)), "25/3/1");
        assert_eq!(render_reading_date(date!(2000 - 12 - 31)), "0/12/31");
    }
}
