use chrono::TimeDelta;

/// Coarse elapsed-time phrase: whole days, else hours, else minutes, else
/// seconds. Values are truncated, never rounded.
pub fn humanize(elapsed: TimeDelta) -> String {
    let elapsed = elapsed.max(TimeDelta::zero());

    let hours = elapsed.num_hours();
    if hours >= 24 {
        return pluralize(hours / 24, "day");
    } else if hours >= 1 {
        return pluralize(hours, "hour");
    }

    let minutes = elapsed.num_minutes();
    if minutes >= 1 {
        return pluralize(minutes, "minute");
    }

    pluralize(elapsed.num_seconds(), "second")
}

// Only counts above one take the plural, so zero reads "0 second".
fn pluralize(count: i64, unit: &str) -> String {
    if count > 1 {
        format!("{} {}s", count, unit)
    } else {
        format!("{} {}", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use test_case::test_case;

    use super::humanize;

    #[test_case(0 => "0 second"; "zero")]
    #[test_case(1 => "1 second"; "one second")]
    #[test_case(45 => "45 seconds"; "seconds")]
    #[test_case(60 => "1 minute"; "exactly a minute")]
    #[test_case(90 => "1 minute"; "truncated minute")]
    #[test_case(3599 => "59 minutes"; "just under an hour")]
    #[test_case(7200 => "2 hours"; "hours")]
    #[test_case(86399 => "23 hours"; "just under a day")]
    #[test_case(90000 => "1 day"; "one day")]
    #[test_case(2 * 86400 => "2 days"; "two days")]
    fn humanize_cascades_through_units(seconds: i64) -> String {
        humanize(TimeDelta::seconds(seconds))
    }

    #[test]
    fn humanize_clamps_negative_elapsed() {
        assert_eq!(humanize(TimeDelta::seconds(-30)), "0 second");
    }

    #[test]
    fn humanize_ignores_sub_second_remainder() {
        assert_eq!(humanize(TimeDelta::milliseconds(1999)), "1 second");
    }
}
