use chrono::{NaiveDate, Utc};

/// Helper function to format a date as "dd-mm-yyyy".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Days from today until `date`; negative when the date has passed.
pub fn days_until(date: NaiveDate) -> i64 {
    (date - Utc::now().date_naive()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn formats_day_first() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(format_date(date), "30-06-2025");
    }

    #[test]
    fn days_until_signs() {
        let today = Utc::now().date_naive();
        assert_eq!(days_until(today), 0);
        assert_eq!(days_until(today + Duration::days(7)), 7);
        assert_eq!(days_until(today - Duration::days(3)), -3);
    }
}
