// Rust guideline compliant 2026-10-19

//! Message templates for the balance-alert service.
//!
//! Renders the five message kinds (low balance, depleted, recovered, daily
//! report, on-demand balance) as Telegram-flavoured HTML. Decisions are made
//! elsewhere; this crate only turns numbers into text.
//!
//! Entry points: [`low_balance_alert`], [`depleted_alert`], [`balance_recovered`],
//! [`daily_report`], [`balance_command`]. Formatters: [`format_usd`],
//! [`format_time_remaining`], [`format_eta`].

use chrono::{DateTime, TimeDelta, Utc};
use domain::{BalanceSnapshot, Runway};

/// Rendered in place of a time or date when the runway is unbounded.
pub const INFINITY: &str = "∞";

/// Largest runway, in seconds, converted to a calendar ETA (about 3000 years).
const MAX_ETA_SECS: f64 = 1.0e11;

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

/// Format a USD amount as `$` + optional sign + grouped two-decimal value.
///
/// `-1800.0` renders as `$-1,800.00`, `2.5` as `$2.50`.
#[must_use]
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${sign}{grouped}.{frac_part}")
}

/// Format a runway as `"{d}d {h}h"`, `"{h}h"`, or [`INFINITY`].
///
/// Hours are shown with one decimal. A runway at or below zero (balance
/// already past the stop point) renders as `"0.0h"`.
#[must_use]
pub fn format_time_remaining(runway: Runway) -> String {
    let hours = match runway {
        Runway::Unbounded => return INFINITY.to_owned(),
        Runway::Finite { hours } if !hours.is_finite() => return INFINITY.to_owned(),
        Runway::Finite { hours } => hours.max(0.0),
    };

    let days = (hours / 24.0).floor();
    let remaining_hours = hours - days * 24.0;
    if days >= 1.0 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "days is a non-negative whole number; saturation is acceptable for display"
        )]
        let days = days as u64;
        format!("{days}d {remaining_hours:.1}h")
    } else {
        format!("{remaining_hours:.1}h")
    }
}

/// Format the wall-clock time at which the runway ends, `"%Y-%m-%d %H:%M UTC"`.
///
/// Returns [`INFINITY`] for an unbounded runway or one too long to map onto
/// the calendar. Negative runways yield a time in the past.
#[must_use]
pub fn format_eta(runway: Runway, now: DateTime<Utc>) -> String {
    let Runway::Finite { hours } = runway else {
        return INFINITY.to_owned();
    };
    let secs = (hours * 3600.0).round();
    if !secs.is_finite() || secs.abs() > MAX_ETA_SECS {
        return INFINITY.to_owned();
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bounded by MAX_ETA_SECS, well inside i64"
    )]
    let secs = secs as i64;
    TimeDelta::try_seconds(secs)
        .and_then(|delta| now.checked_add_signed(delta))
        .map_or_else(
            || INFINITY.to_owned(),
            |eta| eta.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Low-balance alert: balance under the threshold while pods are still spending.
#[must_use]
pub fn low_balance_alert(
    snapshot: &BalanceSnapshot,
    threshold: f64,
    pod_stop_balance: f64,
    now: DateTime<Utc>,
) -> String {
    let runway = snapshot.runway(pod_stop_balance);
    format!(
        "🚨 <b>LOW BALANCE ALERT</b>\n\n\
         💰 Current balance: {balance}\n\
         ⚠️ Threshold: {threshold}\n\
         ⚡️ Spend rate: {spend}/hr\n\
         🛑 Pods stop at: {stop}\n\
         ⏳ Time remaining: ~{remaining}\n\
         🕐 Will run out at: {eta}",
        balance = format_usd(snapshot.balance),
        threshold = format_usd(threshold),
        spend = format_usd(snapshot.spend_per_hr),
        stop = format_usd(pod_stop_balance),
        remaining = format_time_remaining(runway),
        eta = format_eta(runway, now),
    )
}

/// Depleted alert: balance under the threshold and nothing spending.
#[must_use]
pub fn depleted_alert(balance: f64, threshold: f64, pod_stop_balance: f64) -> String {
    format!(
        "🔴 <b>BALANCE DEPLETED - PODS STOPPED</b>\n\n\
         💰 Current balance: {balance}\n\
         ⚠️ Threshold: {threshold}\n\
         🛑 Pod stop balance: {stop}\n\
         ⚡️ Spend rate: $0.00/hr (pods stopped)\n\
         💀 All pods have been shut down due to insufficient balance",
        balance = format_usd(balance),
        threshold = format_usd(threshold),
        stop = format_usd(pod_stop_balance),
    )
}

/// Recovery notice sent once when a streak ends.
#[must_use]
pub fn balance_recovered(balance: f64, recovery_threshold: f64) -> String {
    format!(
        "✅ <b>Balance Recovered</b>\n\n\
         💰 Current balance: {balance}\n\
         📈 Recovery threshold: {recovery}\n\
         🔄 Alerts have been reset",
        balance = format_usd(balance),
        recovery = format_usd(recovery_threshold),
    )
}

/// Scheduled daily summary.
#[must_use]
pub fn daily_report(
    snapshot: &BalanceSnapshot,
    pod_stop_balance: f64,
    now: DateTime<Utc>,
) -> String {
    let runway = snapshot.runway(pod_stop_balance);
    format!(
        "ℹ️ <b>RunPod Daily Balance Report</b>\n\n\
         💰 Balance: {balance}\n\
         ⚡️ Spend rate: {spend}/hr\n\
         🛑 Pods stop at: {stop}\n\
         ⏳ Time remaining: ~{remaining}\n\
         🕐 Will run out at: ~{eta}",
        balance = format_usd(snapshot.balance),
        spend = format_usd(snapshot.spend_per_hr),
        stop = format_usd(pod_stop_balance),
        remaining = format_time_remaining(runway),
        eta = format_eta(runway, now),
    )
}

/// Reply to the `/balance` chat command.
///
/// Runway here is measured to a zero balance, not to the pod-stop balance.
#[must_use]
pub fn balance_command(snapshot: &BalanceSnapshot, now: DateTime<Utc>) -> String {
    match snapshot.runway(0.0) {
        Runway::Unbounded => format!(
            "💰 <b>RunPod Balance</b>\n\n\
             💵 Balance: {balance}\n\
             ⚡️ Spend rate: $0.00/hr\n\
             ⏳ Time remaining: {INFINITY}",
            balance = format_usd(snapshot.balance),
        ),
        runway @ Runway::Finite { .. } => format!(
            "💰 <b>RunPod Balance</b>\n\n\
             💵 Balance: {balance}\n\
             ⚡️ Spend rate: {spend}/hr\n\
             ⏳ Time remaining: ~{remaining}\n\
             🕐 Will run out at: {eta}",
            balance = format_usd(snapshot.balance),
            spend = format_usd(snapshot.spend_per_hr),
            remaining = format_time_remaining(runway),
            eta = format_eta(runway, now),
        ),
    }
}

/// Reply to the `/balance` chat command when the balance could not be fetched.
#[must_use]
pub fn balance_command_error(reason: &str) -> String {
    format!("❌ Error fetching balance: {reason}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn usd_groups_thousands() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(2.5), "$2.50");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(4000.0), "$4,000.00");
    }

    #[test]
    fn usd_keeps_sign_after_dollar() {
        assert_eq!(format_usd(-3.5), "$-3.50");
        assert_eq!(format_usd(-1800.0), "$-1,800.00");
        assert_eq!(format_usd(-0.001), "$0.00");
    }

    #[test]
    fn time_remaining_under_a_day() {
        assert_eq!(format_time_remaining(Runway::Finite { hours: 0.4 }), "0.4h");
        assert_eq!(format_time_remaining(Runway::Finite { hours: 12.5 }), "12.5h");
    }

    #[test]
    fn time_remaining_with_days() {
        assert_eq!(format_time_remaining(Runway::Finite { hours: 24.0 }), "1d 0.0h");
        assert_eq!(format_time_remaining(Runway::Finite { hours: 50.5 }), "2d 2.5h");
    }

    #[test]
    fn time_remaining_exhausted_and_unbounded() {
        assert_eq!(format_time_remaining(Runway::Finite { hours: -360.0 }), "0.0h");
        assert_eq!(format_time_remaining(Runway::Finite { hours: -10.0 }), "0.0h");
        assert_eq!(format_time_remaining(Runway::Unbounded), INFINITY);
        assert_eq!(format_time_remaining(Runway::Finite { hours: f64::NAN }), INFINITY);
    }

    #[test]
    fn eta_adds_runway_to_now() {
        assert_eq!(format_eta(Runway::Finite { hours: 1.5 }, noon()), "2026-03-01 13:30 UTC");
        assert_eq!(format_eta(Runway::Finite { hours: 36.0 }, noon()), "2026-03-03 00:00 UTC");
    }

    #[test]
    fn eta_in_the_past_for_negative_runway() {
        assert_eq!(format_eta(Runway::Finite { hours: -2.0 }, noon()), "2026-03-01 10:00 UTC");
    }

    #[test]
    fn eta_infinite_when_unbounded_or_huge() {
        assert_eq!(format_eta(Runway::Unbounded, noon()), INFINITY);
        assert_eq!(format_eta(Runway::Finite { hours: 1.0e30 }, noon()), INFINITY);
    }

    #[test]
    fn low_balance_alert_fields() {
        let snap = BalanceSnapshot { balance: -3.5, spend_per_hr: 2.5 };
        let text = low_balance_alert(&snap, 20.0, 0.0, noon());
        assert!(text.contains("LOW BALANCE ALERT"));
        assert!(text.contains("$-3.50"));
        assert!(text.contains("$2.50/hr"));
        assert!(text.contains("Threshold: $20.00"));
        assert!(text.contains("Time remaining: ~0.0h"));
    }

    #[test]
    fn low_balance_runway_uses_stop_balance() {
        // (-1800 - -2000) / 5 = 40 h
        let snap = BalanceSnapshot { balance: -1800.0, spend_per_hr: 5.0 };
        let text = low_balance_alert(&snap, -1500.0, -2000.0, noon());
        assert!(text.contains("$-1,800.00"));
        assert!(text.contains("Time remaining: ~1d 16.0h"), "{text}");
        assert!(text.contains("2026-03-03 04:00 UTC"), "{text}");
    }

    #[test]
    fn depleted_alert_mentions_pods_stopped() {
        let text = depleted_alert(-5.0, 20.0, 0.0);
        assert!(text.contains("BALANCE DEPLETED"));
        assert!(text.to_lowercase().contains("pods stopped"));
        assert!(text.contains("$-5.00"));
    }

    #[test]
    fn recovered_shows_recovery_line() {
        let text = balance_recovered(25.0, 22.0);
        assert!(text.contains("Balance Recovered"));
        assert!(text.contains("Recovery threshold: $22.00"));
    }

    #[test]
    fn daily_report_fields() {
        let snap = BalanceSnapshot { balance: 150.0, spend_per_hr: 3.5 };
        let text = daily_report(&snap, 10.0, noon());
        assert!(text.contains("Daily Balance Report"));
        assert!(text.contains("$150.00"));
        assert!(text.contains("Pods stop at: $10.00"));
        // (150 - 10) / 3.5 = 40 h
        assert!(text.contains("~1d 16.0h"), "{text}");
    }

    #[test]
    fn daily_report_unbounded() {
        let snap = BalanceSnapshot { balance: 150.0, spend_per_hr: 0.0 };
        let text = daily_report(&snap, 0.0, noon());
        assert!(text.contains("Time remaining: ~∞"));
        assert!(text.contains("Will run out at: ~∞"));
    }

    #[test]
    fn balance_command_variants() {
        let spending = BalanceSnapshot { balance: 48.0, spend_per_hr: 2.0 };
        let text = balance_command(&spending, noon());
        assert!(text.contains("Time remaining: ~1d 0.0h"), "{text}");
        assert!(text.contains("2026-03-02 12:00 UTC"));

        let idle = BalanceSnapshot { balance: 48.0, spend_per_hr: 0.0 };
        let text = balance_command(&idle, noon());
        assert!(text.contains("$0.00/hr"));
        assert!(text.contains("Time remaining: ∞"));
        assert!(!text.contains("Will run out"));
    }

    #[test]
    fn balance_command_error_text() {
        assert_eq!(balance_command_error("timeout"), "❌ Error fetching balance: timeout");
    }
}
