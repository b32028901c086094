use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// The game day whose completed results are published on `today`.
    /// Results land the morning after, so Friday reports Thursday's games,
    /// Monday reports Sunday's and Tuesday reports Monday's.
    pub fn results_day_for(today: chrono::Weekday) -> Self {
        match today {
            chrono::Weekday::Fri => Weekday::Thursday,
            chrono::Weekday::Mon => Weekday::Sunday,
            chrono::Weekday::Tue => Weekday::Monday,
            other => other.into(),
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Week and game day a run is filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunKey {
    pub week: u32,
    pub day: Weekday,
}

impl RunKey {
    pub fn new(week: u32, day: Weekday) -> Self {
        Self { week, day }
    }

    /// Derive week and day from the calendar. Dates before the season start
    /// count as week 1.
    pub fn detect(today: NaiveDate, season_start: NaiveDate) -> Self {
        let days_since_start = (today - season_start).num_days().max(0) as u32;
        Self {
            week: days_since_start / 7 + 1,
            day: Weekday::results_day_for(today.weekday()),
        }
    }

    /// Explicit values win; missing ones come from [`RunKey::detect`].
    pub fn resolve(
        week: Option<u32>,
        day: Option<Weekday>,
        today: NaiveDate,
        season_start: NaiveDate,
    ) -> Self {
        let detected = Self::detect(today, season_start);
        Self {
            week: week.unwrap_or(detected.week),
            day: day.unwrap_or(detected.day),
        }
    }

    pub fn week_label(&self) -> String {
        format!("Week {}", self.week)
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Week {} {}", self.week, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn season_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 4).unwrap()
    }

    #[rstest]
    #[case(2025, 9, 5, 1, Weekday::Thursday)] // Friday after opener
    #[case(2025, 9, 8, 1, Weekday::Sunday)] // Monday
    #[case(2025, 9, 9, 1, Weekday::Monday)] // Tuesday
    #[case(2025, 10, 6, 5, Weekday::Sunday)]
    #[case(2025, 10, 8, 5, Weekday::Wednesday)]
    fn test_detect(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] week: u32,
        #[case] weekday: Weekday,
    ) {
        let today = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        assert_eq!(RunKey::detect(today, season_start()), RunKey::new(week, weekday));
    }

    #[test]
    fn test_detect_before_season_is_week_one() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        assert_eq!(RunKey::detect(today, season_start()).week, 1);
    }

    #[test]
    fn test_explicit_values_win() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        let key = RunKey::resolve(Some(3), None, today, season_start());
        assert_eq!(key, RunKey::new(3, Weekday::Sunday));

        let key = RunKey::resolve(None, Some(Weekday::Thursday), today, season_start());
        assert_eq!(key, RunKey::new(5, Weekday::Thursday));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunKey::new(5, Weekday::Sunday).to_string(), "Week 5 Sunday");
        assert_eq!(RunKey::new(5, Weekday::Sunday).week_label(), "Week 5");
    }
}
