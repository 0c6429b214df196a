use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

const ISO_DATE: &str = "%Y-%m-%d";

/// Parses an IANA timezone id; failures are logged and treated as unset.
pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id; using system local time"
      );
      None
    }
  }
}

/// The calendar day `now` falls on, in `tz` or the system zone.
#[must_use]
pub fn local_date(
  now: DateTime<Utc>,
  tz: Option<Tz>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(&tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local).date_naive()
    }
  }
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(ISO_DATE).to_string()
}

/// Resolves a due-date expression against `today`.
///
/// Accepts `YYYY-MM-DD`, `today`, `tomorrow`, `yesterday`, `+Nd`, `+Nw`
/// and weekday names (next occurrence, never today).
#[tracing::instrument(skip(today))]
pub fn parse_due_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "due date cannot be empty"
      ));
    }
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             tomorrow"
          )
        });
    }
    | "yesterday" => {
      return today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             yesterday"
          )
        });
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^\+(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile failure: \
       {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: u64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("w") => num
        .checked_mul(7)
        .ok_or_else(|| {
          anyhow!(
            "relative offset too \
             large: {token}"
          )
        })?,
      | _ => num
    };
    return today
      .checked_add_days(Days::new(days))
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {token}"
        )
      });
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  NaiveDate::parse_from_str(
    token, ISO_DATE
  )
  .with_context(|| {
    format!(
      "unrecognized due date \
       '{token}' (expected \
       YYYY-MM-DD, today, tomorrow, \
       +Nd, +Nw or a weekday)"
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = u64::from(
    from.weekday().num_days_from_monday()
  );
  let target_idx = u64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(delta))
    .unwrap_or(from)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    local_date,
    parse_due_expr,
    parse_timezone
  };

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn named_and_relative_expressions() {
    // 2026-10-14 is a Wednesday.
    let today = date(2026, 10, 14);
    let cases = [
      ("today", date(2026, 10, 14)),
      ("Tomorrow", date(2026, 10, 15)),
      ("yesterday", date(2026, 10, 13)),
      ("+3d", date(2026, 10, 17)),
      ("+2w", date(2026, 10, 28)),
      ("fri", date(2026, 10, 16)),
      ("wednesday", date(2026, 10, 21)),
      ("2026-12-31", date(2026, 12, 31))
    ];
    for (input, expected) in cases {
      assert_eq!(
        parse_due_expr(input, today)
          .expect("parse due"),
        expected,
        "input {input}"
      );
    }
  }

  #[test]
  fn rejects_garbage() {
    let today = date(2026, 10, 14);
    assert!(
      parse_due_expr("", today).is_err()
    );
    assert!(
      parse_due_expr("-3d", today)
        .is_err()
    );
    assert!(
      parse_due_expr("2026-13-01", today)
        .is_err()
    );
  }

  #[test]
  fn local_date_follows_configured_zone() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 14, 23, 30, 0
      )
      .single()
      .expect("valid now");
    let tokyo = parse_timezone(
      "Asia/Tokyo",
      "test"
    );
    assert!(tokyo.is_some());
    assert_eq!(
      local_date(now, tokyo),
      date(2026, 10, 15)
    );
    assert_eq!(
      local_date(
        now,
        parse_timezone("UTC", "test")
      ),
      date(2026, 10, 14)
    );
    assert!(
      parse_timezone("Mars/Base", "test")
        .is_none()
    );
  }
}
