use chrono::{Days, NaiveDate};

/// Streak after a quiz played on `today` (UTC).
///
/// Playing the day after the last quiz extends the streak, a second quiz on the same day keeps
/// it, and anything else (first quiz ever, or a missed day) starts over at 1.
pub fn next_streak(last_quiz_date: Option<NaiveDate>, streak: i32, today: NaiveDate) -> i32 {
    let yesterday = today.checked_sub_days(Days::new(1));

    match last_quiz_date {
        Some(last) if Some(last) == yesterday => streak.saturating_add(1),
        Some(last) if last == today => streak,
        _ => 1,
    }
}
