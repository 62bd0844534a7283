//! Pre-submission checks for a bet.
//!
//! Validation is pure: callers read the round state and the team balance,
//! then ask [validate] whether the bet may be written. The "already bet this
//! round" lock is not a rule here; resubmitting within a round overwrites.

use planebet_types::RoundState;
use thiserror::Error;

/// Why a bet was refused. Variants are listed in the order they are checked.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BetRejection {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("betting is not active right now")]
    RoundInactive,
    #[error("no plane selected")]
    MissingOutcome,
    #[error("stake must be a positive amount")]
    InvalidStake,
    #[error("stake exceeds current cash")]
    InsufficientFunds,
}

/// Check a prospective bet.
///
/// A stake equal to the whole balance is accepted.
pub fn validate(
    team: Option<&str>,
    round: &RoundState,
    plane: &str,
    stake: f64,
    balance: f64,
) -> Result<(), BetRejection> {
    match team {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(BetRejection::NotAuthenticated),
    }
    if !round.active {
        return Err(BetRejection::RoundInactive);
    }
    if plane.trim().is_empty() {
        return Err(BetRejection::MissingOutcome);
    }
    if !stake.is_finite() || stake <= 0.0 {
        return Err(BetRejection::InvalidStake);
    }
    if stake > balance {
        return Err(BetRejection::InsufficientFunds);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OPEN: RoundState = RoundState {
        active: true,
        round: 1,
    };

    #[test]
    fn accepts_well_formed_bet() {
        assert_eq!(validate(Some("Falcons"), &OPEN, "7", 500.0, 10_000.0), Ok(()));
        assert_eq!(validate(Some("Falcons"), &OPEN, "7", 10_000.0, 10_000.0), Ok(()));
    }

    #[test]
    fn rejections_follow_check_order() {
        let closed = RoundState::inactive(1);
        // Everything wrong: identity wins.
        assert_eq!(
            validate(None, &closed, "", -1.0, 0.0),
            Err(BetRejection::NotAuthenticated)
        );
        assert_eq!(
            validate(Some("  "), &OPEN, "7", 1.0, 1.0),
            Err(BetRejection::NotAuthenticated)
        );
        assert_eq!(
            validate(Some("A"), &closed, "", -1.0, 0.0),
            Err(BetRejection::RoundInactive)
        );
        assert_eq!(
            validate(Some("A"), &OPEN, "   ", -1.0, 0.0),
            Err(BetRejection::MissingOutcome)
        );
        assert_eq!(
            validate(Some("A"), &OPEN, "7", 0.0, 0.0),
            Err(BetRejection::InvalidStake)
        );
        assert_eq!(
            validate(Some("A"), &OPEN, "7", 10.0, 9.99),
            Err(BetRejection::InsufficientFunds)
        );
    }

    #[test]
    fn non_finite_stakes_are_invalid() {
        for stake in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                validate(Some("A"), &OPEN, "7", stake, f64::MAX),
                Err(BetRejection::InvalidStake)
            );
        }
    }

    proptest! {
        #[test]
        fn accepted_only_within_balance(stake in -1_000.0f64..20_000.0, balance in 0.0f64..15_000.0) {
            let result = validate(Some("A"), &OPEN, "3", stake, balance);
            let expected = stake > 0.0 && stake <= balance;
            prop_assert_eq!(result.is_ok(), expected);
        }
    }
}
