//! Subscription lifecycle and access-control engine.
//!
//! All date math and state decisions live here as pure functions of
//! (status, dates, now); the database only ever persists what these functions
//! decide. Every gated path — login, route guard, status query — goes through
//! [`evaluate_eligibility`] rather than repeating ad hoc date comparisons.
//!
//! Concurrent billing mutations on the same user are last-write-wins: each
//! mutation is a single UPDATE and no optimistic concurrency token is used.
//! A charge racing a cancel has an undefined final state; this is a known,
//! bounded risk, not something this module papers over.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{DBClient, UserExt};
use crate::error::{ErrorMessage, HttpError};
use crate::models::{SubscriptionStatus, User};

/// Length of the free trial granted on first-touch reader signup.
pub const TRIAL_DAYS: i64 = 3;

/// Default billing period applied by charge/renew when none is given.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Why a subscriber is not eligible for gated content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotActive,
    Expired,
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: Option<IneligibleReason>,
}

impl Eligibility {
    fn granted() -> Self {
        Eligibility {
            eligible: true,
            reason: None,
        }
    }

    fn ineligible(reason: IneligibleReason) -> Self {
        Eligibility {
            eligible: false,
            reason: Some(reason),
        }
    }
}

/// A subscriber is eligible iff status is ACTIVE and the end date, when set,
/// has not passed.
///
/// Pure function; must be re-evaluated on every gated access, never cached
/// beyond request scope.
pub fn evaluate_eligibility(
    status: SubscriptionStatus,
    subscription_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Eligibility {
    if status != SubscriptionStatus::Active {
        return Eligibility::ineligible(IneligibleReason::NotActive);
    }
    match subscription_end {
        Some(end) if end < now => Eligibility::ineligible(IneligibleReason::Expired),
        _ => Eligibility::granted(),
    }
}

/// Whether the lazy ACTIVE → INACTIVE flip is due for this user.
///
/// Only an ACTIVE subscription with an end date in the past needs the write;
/// everything else is a no-op, which is what makes racing readers harmless.
pub fn needs_lazy_expiry(
    status: SubscriptionStatus,
    subscription_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status == SubscriptionStatus::Active
        && subscription_end.map_or(false, |end| end < now)
}

/// New start/end dates produced by a billing event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingOutcome {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Extension policy shared by charge and renew.
///
/// While ACTIVE and unexpired the period extends from the current end date so
/// the subscriber loses no paid time; on lapse (expired, inactive, cancelled)
/// the period restarts from now.
pub fn extend_period(
    status: SubscriptionStatus,
    current_start: Option<DateTime<Utc>>,
    current_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    period_days: i64,
) -> BillingOutcome {
    let active_unexpired = status == SubscriptionStatus::Active
        && current_end.map_or(true, |end| end >= now);

    if active_unexpired {
        let base = current_end.unwrap_or(now);
        BillingOutcome {
            start: current_start.unwrap_or(now),
            end: base + Duration::days(period_days),
        }
    } else {
        BillingOutcome {
            start: now,
            end: now + Duration::days(period_days),
        }
    }
}

/// Start/end window for a brand-new trial subscriber.
pub fn trial_window(now: DateTime<Utc>) -> BillingOutcome {
    BillingOutcome {
        start: now,
        end: now + Duration::days(TRIAL_DAYS),
    }
}

/// Read-triggered expiry: if the user's ACTIVE subscription has lapsed, flip
/// it to INACTIVE and persist, returning the updated user.
///
/// Setting INACTIVE when another request already did so is a no-op write, so
/// concurrent reads racing on the same user all converge on the same state.
pub async fn apply_lazy_expiry(db: &DBClient, user: User) -> Result<User, HttpError> {
    let now = Utc::now();
    if !needs_lazy_expiry(user.subscription_status, user.subscription_end, now) {
        return Ok(user);
    }

    tracing::info!(user_id = %user.id, "subscription lapsed, flipping to inactive");
    db.set_subscription_status(user.id, SubscriptionStatus::Inactive)
        .await
        .map_err(|e| {
            tracing::error!("DB error, applying lazy expiry: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })
}

/// Billing charge: extend-or-restart the period, set ACTIVE, stamp
/// `last_billed_at`. Atomic per user — a single read-modify-write.
pub async fn charge(
    db: &DBClient,
    phone: &str,
    period_days: i64,
) -> Result<User, HttpError> {
    let user = find_subscriber(db, phone).await?;

    let now = Utc::now();
    let outcome = extend_period(
        user.subscription_status,
        user.subscription_start,
        user.subscription_end,
        now,
        period_days,
    );

    db.apply_billing(user.id, outcome.start, outcome.end, Some(now))
        .await
        .map_err(|e| {
            tracing::error!("DB error, applying charge: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })
}

/// Renewal: same extension policy as charge, but `subscription_start` is kept
/// while the subscription is still active and unexpired, and `last_billed_at`
/// is left to the charge path.
pub async fn renew(
    db: &DBClient,
    phone: &str,
    duration_days: i64,
) -> Result<User, HttpError> {
    let user = find_subscriber(db, phone).await?;

    let now = Utc::now();
    let outcome = extend_period(
        user.subscription_status,
        user.subscription_start,
        user.subscription_end,
        now,
        duration_days,
    );

    db.apply_billing(user.id, outcome.start, outcome.end, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, applying renewal: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })
}

/// Explicit unsubscribe. Dates are preserved as an audit trail; only the
/// status flips. Session termination is the caller's concern (the self-service
/// handler clears the cookie).
pub async fn cancel(db: &DBClient, phone: &str) -> Result<User, HttpError> {
    let user = find_subscriber(db, phone).await?;

    db.mark_unsubscribed(user.id).await.map_err(|e| {
        tracing::error!("DB error, cancelling subscription: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })
}

async fn find_subscriber(db: &DBClient, phone: &str) -> Result<User, HttpError> {
    let user = db
        .get_user(None, Some(phone), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting subscriber: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    user.ok_or_else(|| HttpError::not_found(ErrorMessage::SubscriberNotFound.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn active_unexpired_is_eligible() {
        let now = noon();
        let end = Some(now + Duration::days(10));
        let e = evaluate_eligibility(SubscriptionStatus::Active, end, now);
        assert!(e.eligible);
        assert_eq!(e.reason, None);
    }

    #[test]
    fn active_without_end_date_is_eligible() {
        let now = noon();
        let e = evaluate_eligibility(SubscriptionStatus::Active, None, now);
        assert!(e.eligible);
    }

    #[test]
    fn active_expired_is_ineligible() {
        let now = noon();
        let end = Some(now - Duration::days(1));
        let e = evaluate_eligibility(SubscriptionStatus::Active, end, now);
        assert!(!e.eligible);
        assert_eq!(e.reason, Some(IneligibleReason::Expired));
    }

    #[test]
    fn non_active_statuses_are_ineligible() {
        let now = noon();
        let end = Some(now + Duration::days(10));
        for status in [
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Unsubscribe,
            SubscriptionStatus::Renew,
        ] {
            let e = evaluate_eligibility(status, end, now);
            assert!(!e.eligible);
            assert_eq!(e.reason, Some(IneligibleReason::NotActive));
        }
    }

    #[test]
    fn lazy_expiry_fires_exactly_for_lapsed_active() {
        let now = noon();
        let past = Some(now - Duration::hours(1));
        let future = Some(now + Duration::hours(1));

        assert!(needs_lazy_expiry(SubscriptionStatus::Active, past, now));
        assert!(!needs_lazy_expiry(SubscriptionStatus::Active, future, now));
        assert!(!needs_lazy_expiry(SubscriptionStatus::Active, None, now));
        // Already inactive: the flip is a no-op, nothing to write.
        assert!(!needs_lazy_expiry(SubscriptionStatus::Inactive, past, now));
        assert!(!needs_lazy_expiry(SubscriptionStatus::Unsubscribe, past, now));
    }

    #[test]
    fn extension_not_loss() {
        // ACTIVE with 10 days left: charging 30 days lands on old_end + 30,
        // not now + 30.
        let now = noon();
        let start = Some(now - Duration::days(20));
        let end = Some(now + Duration::days(10));

        let outcome = extend_period(SubscriptionStatus::Active, start, end, now, 30);
        assert_eq!(outcome.end, end.unwrap() + Duration::days(30));
        assert_eq!(outcome.start, start.unwrap());
    }

    #[test]
    fn restart_on_lapse() {
        let now = noon();
        let start = Some(now - Duration::days(35));
        let end = Some(now - Duration::days(5));

        let outcome = extend_period(SubscriptionStatus::Inactive, start, end, now, 30);
        assert_eq!(outcome.start, now);
        assert_eq!(outcome.end, now + Duration::days(30));
    }

    #[test]
    fn expired_but_still_marked_active_restarts_too() {
        // Lazy expiry may not have run yet; the date decides, not the label.
        let now = noon();
        let end = Some(now - Duration::seconds(1));

        let outcome = extend_period(SubscriptionStatus::Active, Some(now), end, now, 30);
        assert_eq!(outcome.start, now);
        assert_eq!(outcome.end, now + Duration::days(30));
    }

    #[test]
    fn unsubscribed_restarts_from_now() {
        let now = noon();
        let end = Some(now + Duration::days(300));

        // Even with a far-future end date, a cancelled subscription restarts.
        let outcome = extend_period(SubscriptionStatus::Unsubscribe, Some(now), end, now, 30);
        assert_eq!(outcome.start, now);
        assert_eq!(outcome.end, now + Duration::days(30));
    }

    #[test]
    fn active_with_no_end_extends_from_now() {
        let now = noon();
        let outcome = extend_period(SubscriptionStatus::Active, Some(now), None, now, 30);
        assert_eq!(outcome.end, now + Duration::days(30));
    }

    #[test]
    fn trial_window_is_three_days() {
        let now = noon();
        let w = trial_window(now);
        assert_eq!(w.start, now);
        assert_eq!(w.end, now + Duration::days(3));
    }
}
