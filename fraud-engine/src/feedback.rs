//! Feedback-driven limit adjustment
//!
//! A reviewer's confirmed outcome moves the card's bounds a tenth of the way
//! toward the transaction amount. Raising the outcome tightens the bounds,
//! lowering it relaxes them.

use crate::limits::CardLimits;
use crate::types::{TransactionId, Verdict};
use crate::{Error, Result};

/// Which bounds a correction moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Moves {
    allow: bool,
    manual: bool,
}

fn moves(recorded: Verdict, confirmed: Verdict) -> Moves {
    use crate::types::Verdict::*;
    match (recorded, confirmed) {
        (ManualProcessing, Allowed) | (Allowed, ManualProcessing) => Moves {
            allow: true,
            manual: false,
        },
        (Prohibited, ManualProcessing) | (ManualProcessing, Prohibited) => Moves {
            allow: false,
            manual: true,
        },
        (Prohibited, Allowed) | (Allowed, Prohibited) => Moves {
            allow: true,
            manual: true,
        },
        _ => Moves {
            allow: false,
            manual: false,
        },
    }
}

// bound + (amount - bound) / 10, truncating toward zero
fn nudge(bound: u64, amount: u64) -> i128 {
    let bound = i128::from(bound);
    bound + (i128::from(amount) - bound) / 10
}

/// Compute new limits for a correction
///
/// Pure function of its arguments. Feedback equal to the recorded verdict is
/// a conflict. The result always satisfies `0 <= allow_bound < manual_bound`
/// provided `limits` already did.
pub fn adjust_limits(
    transaction_id: TransactionId,
    recorded: Verdict,
    confirmed: Verdict,
    amount: u64,
    limits: CardLimits,
) -> Result<CardLimits> {
    if recorded == confirmed {
        return Err(Error::FeedbackMatchesVerdict {
            transaction_id,
            feedback: confirmed.to_string(),
        });
    }

    let moves = moves(recorded, confirmed);
    let mut allow = i128::from(limits.allow_bound);
    let mut manual = i128::from(limits.manual_bound);
    if moves.allow {
        allow = nudge(limits.allow_bound, amount);
    }
    if moves.manual {
        manual = nudge(limits.manual_bound, amount);
    }

    // The bound that moved gives way; allow clamps below manual, manual above allow.
    allow = allow.max(0);
    if allow >= manual {
        if moves.allow {
            allow = (manual - 1).max(0);
        }
        if allow >= manual {
            manual = allow + 1;
        }
    }

    Ok(CardLimits::new(to_bound(allow), to_bound(manual)))
}

fn to_bound(value: i128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict::*;

    fn defaults() -> CardLimits {
        CardLimits::new(200, 1500)
    }

    #[test]
    fn test_manual_to_allowed_raises_allow() {
        let limits = adjust_limits(1, ManualProcessing, Allowed, 800, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(260, 1500));
    }

    #[test]
    fn test_prohibited_to_allowed_raises_both() {
        let limits = adjust_limits(1, Prohibited, Allowed, 2000, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(380, 1550));
    }

    #[test]
    fn test_allowed_to_manual_lowers_allow() {
        let limits = adjust_limits(1, Allowed, ManualProcessing, 150, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(195, 1500));
    }

    #[test]
    fn test_prohibited_to_manual_raises_manual() {
        // (1500 - 2000) / 10 = -50, so manual -= -50
        let limits = adjust_limits(1, Prohibited, ManualProcessing, 2000, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(200, 1550));
    }

    #[test]
    fn test_allowed_to_prohibited_lowers_both() {
        let limits = adjust_limits(1, Allowed, Prohibited, 100, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(190, 1360));
    }

    #[test]
    fn test_manual_to_prohibited_lowers_manual() {
        let limits = adjust_limits(1, ManualProcessing, Prohibited, 800, defaults()).unwrap();
        assert_eq!(limits, CardLimits::new(200, 1430));
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        // (205 - 200) / 10 = 0
        let limits = adjust_limits(1, ManualProcessing, Allowed, 205, defaults()).unwrap();
        assert_eq!(limits, defaults());
        // (195 - 200) / 10 = 0, not -1
        let limits = adjust_limits(1, Allowed, ManualProcessing, 195, defaults()).unwrap();
        assert_eq!(limits, defaults());
    }

    #[test]
    fn test_same_outcome_conflicts() {
        for verdict in Verdict::ALL {
            let result = adjust_limits(3, verdict, verdict, 800, defaults());
            assert!(matches!(
                result,
                Err(Error::FeedbackMatchesVerdict { transaction_id: 3, .. })
            ));
        }
    }

    #[test]
    fn test_allow_clamped_below_manual() {
        let tight = CardLimits::new(1000, 1010);
        let limits = adjust_limits(1, ManualProcessing, Allowed, 100_000, tight).unwrap();
        assert_eq!(limits, CardLimits::new(1009, 1010));
    }

    #[test]
    fn test_manual_clamped_above_allow() {
        let tight = CardLimits::new(1000, 1010);
        let limits = adjust_limits(1, ManualProcessing, Prohibited, 1, tight).unwrap();
        assert_eq!(limits, CardLimits::new(1000, 1001));
    }

    #[test]
    fn test_both_moving_keeps_order() {
        let tight = CardLimits::new(0, 1);
        let limits = adjust_limits(1, Prohibited, Allowed, 1_000_000, tight).unwrap();
        assert!(limits.is_consistent());
        let limits = adjust_limits(1, Allowed, Prohibited, 1, tight).unwrap();
        assert!(limits.is_consistent());
    }
}
