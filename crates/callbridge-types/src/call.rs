//! Call lifecycle types
//!
//! `CallStatus` carries the transition matrix that protects call rows from
//! late and out-of-order webhook deliveries. `CallDirection` normalizes the
//! direction variants the upstream uses interchangeably.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The call is ringing and has not been answered.
    Ringing,
    /// The call was answered and is in progress.
    Active,
    /// The call completed normally.
    Ended,
    /// The call rang out without an answer.
    Missed,
    /// The callee declined the call.
    Rejected,
    /// The call went to voicemail.
    Voicemail,
}

/// Outcome of checking a proposed status change against the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The change is legal and should be applied.
    Accept,
    /// The proposed status equals the current one; applying it is a no-op.
    Reentry,
    /// The change is illegal; the existing row must be preserved.
    Deny,
}

impl CallStatus {
    /// All statuses, in matrix order.
    pub const ALL: [CallStatus; 6] = [
        CallStatus::Ringing,
        CallStatus::Active,
        CallStatus::Ended,
        CallStatus::Missed,
        CallStatus::Rejected,
        CallStatus::Voicemail,
    ];

    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Ended | CallStatus::Missed | CallStatus::Rejected | CallStatus::Voicemail
        )
    }

    /// Check a proposed transition from `self` to `next`.
    ///
    /// A missing row (no current status) accepts any target status; callers
    /// handle that case before consulting the matrix. Same-state re-entry is
    /// always permitted and idempotent.
    pub fn transition_to(&self, next: CallStatus) -> Transition {
        if *self == next {
            return Transition::Reentry;
        }
        let legal = match self {
            CallStatus::Ringing => true,
            CallStatus::Active => matches!(next, CallStatus::Ended | CallStatus::Voicemail),
            CallStatus::Ended | CallStatus::Missed | CallStatus::Rejected | CallStatus::Voicemail => {
                false
            }
        };
        if legal {
            Transition::Accept
        } else {
            Transition::Deny
        }
    }

    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Active => "active",
            CallStatus::Ended => "ended",
            CallStatus::Missed => "missed",
            CallStatus::Rejected => "rejected",
            CallStatus::Voicemail => "voicemail",
        }
    }

    /// Parse the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ringing" => Some(CallStatus::Ringing),
            "active" => Some(CallStatus::Active),
            "ended" => Some(CallStatus::Ended),
            "missed" => Some(CallStatus::Missed),
            "rejected" => Some(CallStatus::Rejected),
            "voicemail" => Some(CallStatus::Voicemail),
            _ => None,
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a call or message relative to the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    /// Normalize an upstream direction string.
    ///
    /// The upstream delivers several spellings per direction; comparison is
    /// case- and whitespace-insensitive. Unknown values yield `None` and are
    /// logged by the caller.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inbound" | "incoming" | "in" => Some(CallDirection::Inbound),
            "outbound" | "outgoing" | "out" => Some(CallDirection::Outbound),
            _ => None,
        }
    }

    /// Database column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }

    /// Parse the database column representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(CallDirection::Inbound),
            "outbound" => Some(CallDirection::Outbound),
            _ => None,
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ringing_accepts_every_other_status() {
        for next in CallStatus::ALL {
            let expected = if next == CallStatus::Ringing {
                Transition::Reentry
            } else {
                Transition::Accept
            };
            assert_eq!(CallStatus::Ringing.transition_to(next), expected);
        }
    }

    #[test]
    fn test_active_transitions() {
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Ended),
            Transition::Accept
        );
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Voicemail),
            Transition::Accept
        );
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Active),
            Transition::Reentry
        );
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Ringing),
            Transition::Deny
        );
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Missed),
            Transition::Deny
        );
        assert_eq!(
            CallStatus::Active.transition_to(CallStatus::Rejected),
            Transition::Deny
        );
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let terminals = [
            CallStatus::Ended,
            CallStatus::Missed,
            CallStatus::Rejected,
            CallStatus::Voicemail,
        ];
        for from in terminals {
            assert!(from.is_terminal());
            for next in CallStatus::ALL {
                let expected = if from == next {
                    Transition::Reentry
                } else {
                    Transition::Deny
                };
                assert_eq!(from.transition_to(next), expected, "{from} -> {next}");
            }
        }
    }

    #[test]
    fn test_ended_to_ringing_denied_ringing_to_ended_accepted() {
        assert_eq!(
            CallStatus::Ended.transition_to(CallStatus::Ringing),
            Transition::Deny
        );
        assert_eq!(
            CallStatus::Ringing.transition_to(CallStatus::Ended),
            Transition::Accept
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in CallStatus::ALL {
            assert_eq!(CallStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CallStatus::parse("dialing"), None);
    }

    #[test]
    fn test_direction_normalization() {
        assert_eq!(
            CallDirection::normalize("incoming"),
            Some(CallDirection::Inbound)
        );
        assert_eq!(CallDirection::normalize("IN "), Some(CallDirection::Inbound));
        assert_eq!(
            CallDirection::normalize("Outgoing"),
            Some(CallDirection::Outbound)
        );
        assert_eq!(
            CallDirection::normalize("outbound"),
            Some(CallDirection::Outbound)
        );
        assert_eq!(CallDirection::normalize("sideways"), None);
        assert_eq!(CallDirection::normalize(""), None);
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&CallStatus::Voicemail).unwrap();
        assert_eq!(json, "\"voicemail\"");
        let back: CallStatus = serde_json::from_str("\"ringing\"").unwrap();
        assert_eq!(back, CallStatus::Ringing);
    }
}
