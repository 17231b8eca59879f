//! Send-window matching: is a user due on this invocation?
//!
//! Each trigger independently decides who is due by comparing the user-local
//! wall clock against the configured send time. As long as triggers arrive no
//! more than 2x the tolerance apart, every user lands in exactly one window
//! per day (the sent marker covers the overlap case).

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use wishline_core::error::{Result, WishlineError};

/// True iff `now_utc`, seen from `timezone`, is within `tolerance_minutes`
/// of `send_time` ("HH:MM", 24-hour).
///
/// Fails closed: an unknown timezone or malformed send time is an error, and
/// the caller skips the user rather than guessing.
pub fn in_send_window(
    now_utc: DateTime<Utc>,
    timezone: &str,
    send_time: &str,
    tolerance_minutes: i64,
) -> Result<bool> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| WishlineError::Validation(format!("invalid timezone '{timezone}'")))?;
    let target = parse_send_time(send_time)?;

    let local = now_utc.with_timezone(&tz);
    let local_minutes = (local.hour() * 60 + local.minute()) as i64;

    Ok((local_minutes - target).abs() <= tolerance_minutes)
}

/// Parse "HH:MM" into minutes-of-day.
fn parse_send_time(send_time: &str) -> Result<i64> {
    let malformed =
        || WishlineError::Validation(format!("malformed send time '{send_time}' (want HH:MM)"));
    let (h, m) = send_time.split_once(':').ok_or_else(malformed)?;
    let hours: u32 = h.trim().parse().map_err(|_| malformed())?;
    let minutes: u32 = m.trim().parse().map_err(|_| malformed())?;
    if hours > 23 || minutes > 59 {
        return Err(malformed());
    }
    Ok((hours * 60 + minutes) as i64)
}
