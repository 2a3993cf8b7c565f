//! Route-guard decision logic.
//!
//! A protected area maps to a required role and an auth entry point. The
//! decision is a total function of (area, resolved identity) — it always
//! yields allow or a redirect target, never an error. Missing token, invalid
//! token and wrong role all land on the same redirect so the caller learns
//! nothing about which check failed.

use crate::models::UserRole;
use crate::subscription::Eligibility;

/// Protected route prefixes of the application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProtectedArea {
    Reader,
    Writer,
    Admin,
}

impl ProtectedArea {
    /// Role a session must carry to enter this area.
    pub fn required_role(&self) -> UserRole {
        match self {
            ProtectedArea::Reader => UserRole::Reader,
            ProtectedArea::Writer => UserRole::Writer,
            ProtectedArea::Admin => UserRole::Admin,
        }
    }

    /// Where an unauthenticated or mismatched request is sent.
    pub fn auth_entry(&self) -> &'static str {
        match self {
            ProtectedArea::Reader => "/reader/login",
            ProtectedArea::Writer => "/writer/login",
            ProtectedArea::Admin => "/admin/login",
        }
    }
}

/// Renewal flow for readers whose role matches but whose subscription lapsed.
pub const RENEW_ENTRY: &str = "/reader/renew";

/// The identity a guard evaluates: role from the verified session, plus the
/// subscription eligibility computed for reader areas.
#[derive(Debug, Clone, Copy)]
pub struct GuardIdentity {
    pub role: UserRole,
    pub eligibility: Option<Eligibility>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a request may enter `area`.
///
/// `identity` is None when no token was presented or verification failed —
/// both collapse to the same redirect. Reader areas additionally require a
/// positive eligibility check; an eligible role with a lapsed subscription is
/// sent to the renewal flow instead of the login page.
pub fn decide(area: ProtectedArea, identity: Option<&GuardIdentity>) -> GuardDecision {
    let identity = match identity {
        Some(identity) => identity,
        None => return GuardDecision::Redirect(area.auth_entry()),
    };

    if identity.role != area.required_role() {
        return GuardDecision::Redirect(area.auth_entry());
    }

    if area == ProtectedArea::Reader {
        match identity.eligibility {
            Some(e) if e.eligible => GuardDecision::Allow,
            _ => GuardDecision::Redirect(RENEW_ENTRY),
        }
    } else {
        GuardDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionStatus;
    use crate::subscription::evaluate_eligibility;
    use chrono::{Duration, Utc};

    fn eligible() -> Eligibility {
        let now = Utc::now();
        evaluate_eligibility(
            SubscriptionStatus::Active,
            Some(now + Duration::days(1)),
            now,
        )
    }

    fn lapsed() -> Eligibility {
        let now = Utc::now();
        evaluate_eligibility(
            SubscriptionStatus::Active,
            Some(now - Duration::days(1)),
            now,
        )
    }

    #[test]
    fn missing_identity_redirects_to_area_login() {
        assert_eq!(
            decide(ProtectedArea::Admin, None),
            GuardDecision::Redirect("/admin/login")
        );
        assert_eq!(
            decide(ProtectedArea::Writer, None),
            GuardDecision::Redirect("/writer/login")
        );
        assert_eq!(
            decide(ProtectedArea::Reader, None),
            GuardDecision::Redirect("/reader/login")
        );
    }

    #[test]
    fn wrong_role_redirects_to_area_login() {
        let reader = GuardIdentity {
            role: UserRole::Reader,
            eligibility: Some(eligible()),
        };
        assert_eq!(
            decide(ProtectedArea::Admin, Some(&reader)),
            GuardDecision::Redirect("/admin/login")
        );

        let writer = GuardIdentity {
            role: UserRole::Writer,
            eligibility: None,
        };
        assert_eq!(
            decide(ProtectedArea::Reader, Some(&writer)),
            GuardDecision::Redirect("/reader/login")
        );
    }

    #[test]
    fn matching_staff_role_allows() {
        let admin = GuardIdentity {
            role: UserRole::Admin,
            eligibility: None,
        };
        assert_eq!(decide(ProtectedArea::Admin, Some(&admin)), GuardDecision::Allow);

        let writer = GuardIdentity {
            role: UserRole::Writer,
            eligibility: None,
        };
        assert_eq!(decide(ProtectedArea::Writer, Some(&writer)), GuardDecision::Allow);
    }

    #[test]
    fn eligible_reader_allows() {
        let reader = GuardIdentity {
            role: UserRole::Reader,
            eligibility: Some(eligible()),
        };
        assert_eq!(decide(ProtectedArea::Reader, Some(&reader)), GuardDecision::Allow);
    }

    #[test]
    fn lapsed_reader_redirects_to_renewal() {
        let reader = GuardIdentity {
            role: UserRole::Reader,
            eligibility: Some(lapsed()),
        };
        assert_eq!(
            decide(ProtectedArea::Reader, Some(&reader)),
            GuardDecision::Redirect(RENEW_ENTRY)
        );
    }

    #[test]
    fn reader_without_eligibility_check_redirects_to_renewal() {
        let reader = GuardIdentity {
            role: UserRole::Reader,
            eligibility: None,
        };
        assert_eq!(
            decide(ProtectedArea::Reader, Some(&reader)),
            GuardDecision::Redirect(RENEW_ENTRY)
        );
    }
}
