use anyhow::{Context, anyhow};
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;

#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// Whole calendar days between midnight-normalized dates; negative when due
// is in the past.
#[must_use]
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    due.signed_duration_since(today).num_days()
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_date(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    if token.is_empty() {
        return Err(anyhow!("due date expression is empty"));
    }

    match token.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => {
            return today
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| anyhow!("failed to advance to tomorrow"));
        }
        _ => {}
    }

    let rel_re = Regex::new(r"^\+(?P<num>\d+)d$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    if let Some(caps) = rel_re.captures(token) {
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative day count"))?
            .parse()
            .context("invalid relative day count")?;
        return today
            .checked_add_signed(Duration::days(num))
            .ok_or_else(|| anyhow!("relative date out of range: +{num}d"));
    }

    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .map_err(|_| anyhow!("unrecognized due date expression: {input}"))
        .context("supported formats: today, tomorrow, +Nd, YYYY-MM-DD")
}
