//! Per-request access decisions.

use crate::{Principal, SensitivityClass};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Denial {
    Unauthenticated,
    InsufficientRole,
    Blocked,
    SubscriptionExpired,
}

impl Denial {
    /// HTTP status the boundary reports for this denial.
    pub fn status(&self) -> u16 {
        match self {
            Denial::Unauthenticated => 401,
            Denial::InsufficientRole | Denial::Blocked | Denial::SubscriptionExpired => 403,
        }
    }

    /// User-facing message for the response body.
    pub fn message(&self) -> &'static str {
        match self {
            Denial::Unauthenticated => "Unauthorized",
            Denial::InsufficientRole => "Forbidden",
            Denial::Blocked => "Account is blocked by administrator.",
            Denial::SubscriptionExpired => "Subscription expired. Please contact admin.",
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Denial::Unauthenticated => "unauthenticated",
            Denial::InsufficientRole => "insufficient-role",
            Denial::Blocked => "blocked",
            Denial::SubscriptionExpired => "subscription-expired",
        };
        f.write_str(name)
    }
}

/// Result of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<Denial> {
        match self {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(*denial),
        }
    }
}

/// Decide whether `identity` may reach a route of class `class` at time `now`.
///
/// Depends only on its arguments. Callers must pass the identity as read for
/// the current request; a decision is never reusable across requests because
/// the block flag and the clock both move.
pub fn evaluate(
    identity: Option<&Principal>,
    class: SensitivityClass,
    now: DateTime<Utc>,
) -> Decision {
    if class == SensitivityClass::Public {
        return Decision::Allow;
    }

    let Some(principal) = identity else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    match class {
        SensitivityClass::Public => Decision::Allow,
        SensitivityClass::AdminOnly => {
            if principal.is_administrator() {
                Decision::Allow
            } else {
                Decision::Deny(Denial::InsufficientRole)
            }
        }
        SensitivityClass::StandardGated => {
            // Administrators skip the block and subscription checks entirely.
            if principal.is_administrator() {
                Decision::Allow
            } else if principal.blocked {
                Decision::Deny(Denial::Blocked)
            } else if now > principal.subscription_end {
                Decision::Deny(Denial::SubscriptionExpired)
            } else {
                Decision::Allow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn principal(role: Role, blocked: bool, end_offset: Duration) -> Principal {
        Principal::new(role, blocked, now() + end_offset)
    }

    #[test]
    fn test_public_allows_absent_identity() {
        assert!(evaluate(None, SensitivityClass::Public, now()).is_allowed());
    }

    #[test]
    fn test_absent_identity_is_unauthenticated() {
        for class in [SensitivityClass::StandardGated, SensitivityClass::AdminOnly] {
            assert_eq!(
                evaluate(None, class, now()),
                Decision::Deny(Denial::Unauthenticated)
            );
        }
    }

    #[test]
    fn test_administrator_bypasses_block_and_expiry() {
        for blocked in [false, true] {
            for offset in [Duration::days(-400), Duration::zero(), Duration::days(30)] {
                let admin = principal(Role::Administrator, blocked, offset);
                assert!(
                    evaluate(Some(&admin), SensitivityClass::StandardGated, now()).is_allowed()
                );
                assert!(evaluate(Some(&admin), SensitivityClass::AdminOnly, now()).is_allowed());
            }
        }
    }

    #[test]
    fn test_blocked_wins_over_live_subscription() {
        let user = principal(Role::Standard, true, Duration::days(10));
        assert_eq!(
            evaluate(Some(&user), SensitivityClass::StandardGated, now()),
            Decision::Deny(Denial::Blocked)
        );
    }

    #[test]
    fn test_blocked_and_expired_reports_blocked() {
        let user = principal(Role::Standard, true, Duration::days(-10));
        assert_eq!(
            evaluate(Some(&user), SensitivityClass::StandardGated, now()).denial(),
            Some(Denial::Blocked)
        );
    }

    #[test]
    fn test_expired_subscription() {
        let user = principal(Role::Standard, false, Duration::seconds(-1));
        assert_eq!(
            evaluate(Some(&user), SensitivityClass::StandardGated, now()),
            Decision::Deny(Denial::SubscriptionExpired)
        );
    }

    #[test]
    fn test_live_subscription_allowed() {
        let user = principal(Role::Standard, false, Duration::days(1));
        assert!(evaluate(Some(&user), SensitivityClass::StandardGated, now()).is_allowed());
    }

    #[test]
    fn test_subscription_end_instant_is_still_live() {
        let user = principal(Role::Standard, false, Duration::zero());
        assert!(evaluate(Some(&user), SensitivityClass::StandardGated, now()).is_allowed());
    }

    #[test]
    fn test_standard_user_on_admin_route() {
        for blocked in [false, true] {
            for offset in [Duration::days(-1), Duration::days(1)] {
                let user = principal(Role::Standard, blocked, offset);
                assert_eq!(
                    evaluate(Some(&user), SensitivityClass::AdminOnly, now()),
                    Decision::Deny(Denial::InsufficientRole)
                );
            }
        }
    }

    #[test]
    fn test_trial_window_boundaries() {
        let created = now();
        let user = Principal::new(Role::Standard, false, created + Duration::days(30));

        let day_29 = created + Duration::days(29);
        assert!(evaluate(Some(&user), SensitivityClass::StandardGated, day_29).is_allowed());

        let past_end = created + Duration::days(30) + Duration::seconds(1);
        assert_eq!(
            evaluate(Some(&user), SensitivityClass::StandardGated, past_end).denial(),
            Some(Denial::SubscriptionExpired)
        );
    }

    #[test]
    fn test_reevaluation_sees_block_toggle() {
        let mut user = principal(Role::Standard, false, Duration::days(30));
        assert!(evaluate(Some(&user), SensitivityClass::StandardGated, now()).is_allowed());

        user.blocked = true;
        assert_eq!(
            evaluate(Some(&user), SensitivityClass::StandardGated, now()).denial(),
            Some(Denial::Blocked)
        );
    }

    #[test]
    fn test_denial_status_and_message() {
        assert_eq!(Denial::Unauthenticated.status(), 401);
        assert_eq!(Denial::InsufficientRole.status(), 403);
        assert_eq!(Denial::Blocked.status(), 403);
        assert_eq!(Denial::SubscriptionExpired.status(), 403);
        assert_eq!(
            Denial::Blocked.message(),
            "Account is blocked by administrator."
        );
        assert_eq!(
            serde_json::to_string(&Denial::SubscriptionExpired).unwrap(),
            "\"subscription-expired\""
        );
    }
}
