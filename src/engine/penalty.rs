// src/engine/penalty.rs

use crate::errors::{AppError, AppResult};
use crate::models::{IncentiveConfig, PenaltyRecord, PenaltyStatus, PenaltyType, UserRole};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const NUCLEAR_PERCENTAGE: Decimal = dec!(100);

/// Resolve the deduction percentage for a new penalty from the current
/// config. The result is frozen onto the record so later config changes
/// never rewrite history.
pub fn resolve_percentage(
    penalty_type: PenaltyType,
    severity: Option<Decimal>,
    config: &IncentiveConfig,
) -> AppResult<Decimal> {
    if let Some(s) = severity {
        if s <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Penalty severity must be greater than zero".to_string(),
            ));
        }
    }

    let pct = match penalty_type {
        // Full forfeiture, zero tolerance.
        PenaltyType::ClientDisrespect => NUCLEAR_PERCENTAGE,
        // Scales with how far below the compliance threshold the user fell,
        // floored at the base. No ceiling here; the additive clamp and the
        // nuclear override happen at aggregation time.
        PenaltyType::ComplianceShortfall => {
            let base = config.compliance_shortfall_base_percentage;
            match severity {
                Some(factor) => (base * factor).max(base),
                None => base,
            }
        }
        PenaltyType::LateArrival => config.late_arrival_percentage,
        PenaltyType::MissedFollowUp => config.missed_follow_up_percentage,
        PenaltyType::UnapprovedAbsence => config.unapproved_absence_percentage,
    };

    Ok(pct)
}

/// Total deduction percentage for a user's month. Only `active` and
/// `resolved` (dispute upheld) records count; `disputed` and `waived` are
/// excluded. A counted nuclear penalty forces exactly 100% regardless of the
/// rest; otherwise additive percentages sum and clamp at the configured
/// ceiling.
pub fn total_percentage(records: &[PenaltyRecord], ceiling: Decimal) -> Decimal {
    let counted = records
        .iter()
        .filter(|p| matches!(p.status, PenaltyStatus::Active | PenaltyStatus::Resolved));

    if counted
        .clone()
        .any(|p| p.penalty_type == PenaltyType::ClientDisrespect)
    {
        return NUCLEAR_PERCENTAGE;
    }

    counted
        .map(|p| p.penalty_percentage)
        .sum::<Decimal>()
        .min(ceiling)
}

/// Number of records currently contributing to the deduction.
pub fn counted(records: &[PenaltyRecord]) -> usize {
    records
        .iter()
        .filter(|p| matches!(p.status, PenaltyStatus::Active | PenaltyStatus::Resolved))
        .count()
}

// ─── Dispute state machine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyAction {
    /// The penalised user contests the record.
    Dispute,
    /// A manager upholds the dispute; the penalty stops counting.
    Waive,
    /// A manager rejects the dispute; the penalty counts again.
    Resolve,
}

/// Single transition table for the penalty lifecycle. Validates both the
/// current state and the acting role; handlers never check these inline.
pub fn transition(
    record: &PenaltyRecord,
    action: PenaltyAction,
    actor_id: uuid::Uuid,
    actor_role: UserRole,
) -> AppResult<PenaltyStatus> {
    match action {
        PenaltyAction::Dispute => {
            if actor_id != record.user_id {
                return Err(AppError::Forbidden(
                    "Only the penalised user may dispute this penalty".to_string(),
                ));
            }
            if record.status != PenaltyStatus::Active {
                return Err(AppError::Precondition(format!(
                    "Penalty can only be disputed while active (current status: {:?})",
                    record.status
                )));
            }
            Ok(PenaltyStatus::Disputed)
        }
        PenaltyAction::Waive | PenaltyAction::Resolve => {
            if actor_role != UserRole::Manager {
                return Err(AppError::Forbidden(
                    "Only a manager may resolve a disputed penalty".to_string(),
                ));
            }
            if record.status != PenaltyStatus::Disputed {
                return Err(AppError::Precondition(format!(
                    "Penalty can only be resolved while disputed (current status: {:?})",
                    record.status
                )));
            }
            Ok(match action {
                PenaltyAction::Waive => PenaltyStatus::Waived,
                _ => PenaltyStatus::Resolved,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn config() -> IncentiveConfig {
        IncentiveConfig {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            review_bonus_per_review: dec!(100),
            streak_bonus_7: dec!(500),
            streak_bonus_14: dec!(1000),
            streak_bonus_30: dec!(2500),
            penalty_ceiling_percentage: dec!(50),
            late_arrival_percentage: dec!(5),
            missed_follow_up_percentage: dec!(10),
            unapproved_absence_percentage: dec!(15),
            compliance_shortfall_base_percentage: dec!(5),
            default_monthly_target: dec!(1000000),
            salary_cap_enabled: true,
            pool_top_share: dec!(20),
            pool_second_share: dec!(12),
            pool_third_share: dec!(8),
            pool_manager_share: dec!(20),
            pool_support_staff_share: dec!(20),
            pool_others_share: dec!(20),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn record(penalty_type: PenaltyType, pct: Decimal, status: PenaltyStatus) -> PenaltyRecord {
        PenaltyRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            month: "2026-01".to_string(),
            penalty_type,
            penalty_percentage: pct,
            severity: None,
            description: None,
            status,
            dispute_reason: None,
            resolution_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flat_types_use_configured_base() {
        let cfg = config();
        assert_eq!(
            resolve_percentage(PenaltyType::LateArrival, None, &cfg).unwrap(),
            dec!(5)
        );
        assert_eq!(
            resolve_percentage(PenaltyType::UnapprovedAbsence, Some(dec!(3)), &cfg).unwrap(),
            dec!(15)
        );
    }

    #[test]
    fn compliance_shortfall_scales_with_severity_floored_at_base() {
        let cfg = config();
        assert_eq!(
            resolve_percentage(PenaltyType::ComplianceShortfall, Some(dec!(4)), &cfg).unwrap(),
            dec!(20)
        );
        // Severity below 1 never drops under the base.
        assert_eq!(
            resolve_percentage(PenaltyType::ComplianceShortfall, Some(dec!(0.5)), &cfg).unwrap(),
            dec!(5)
        );
        assert_eq!(
            resolve_percentage(PenaltyType::ComplianceShortfall, None, &cfg).unwrap(),
            dec!(5)
        );
    }

    #[test]
    fn nuclear_type_is_always_full_forfeiture() {
        let cfg = config();
        assert_eq!(
            resolve_percentage(PenaltyType::ClientDisrespect, None, &cfg).unwrap(),
            dec!(100)
        );
    }

    #[test]
    fn non_positive_severity_is_rejected() {
        let cfg = config();
        assert!(resolve_percentage(PenaltyType::ComplianceShortfall, Some(dec!(0)), &cfg).is_err());
        assert!(resolve_percentage(PenaltyType::LateArrival, Some(dec!(-1)), &cfg).is_err());
    }

    #[test]
    fn active_penalties_sum_additively() {
        let records = vec![
            record(PenaltyType::LateArrival, dec!(10), PenaltyStatus::Active),
            record(PenaltyType::MissedFollowUp, dec!(15), PenaltyStatus::Active),
        ];
        assert_eq!(total_percentage(&records, dec!(50)), dec!(25));
    }

    #[test]
    fn additive_sum_clamps_at_ceiling() {
        let records = vec![
            record(PenaltyType::UnapprovedAbsence, dec!(30), PenaltyStatus::Active),
            record(PenaltyType::UnapprovedAbsence, dec!(30), PenaltyStatus::Resolved),
        ];
        assert_eq!(total_percentage(&records, dec!(50)), dec!(50));
    }

    #[test]
    fn disputed_and_waived_are_excluded() {
        let records = vec![
            record(PenaltyType::LateArrival, dec!(10), PenaltyStatus::Disputed),
            record(PenaltyType::MissedFollowUp, dec!(15), PenaltyStatus::Waived),
            record(PenaltyType::LateArrival, dec!(5), PenaltyStatus::Active),
        ];
        assert_eq!(total_percentage(&records, dec!(50)), dec!(5));
        assert_eq!(counted(&records), 1);
    }

    #[test]
    fn nuclear_overrides_everything_including_ceiling() {
        let records = vec![
            record(PenaltyType::LateArrival, dec!(10), PenaltyStatus::Active),
            record(PenaltyType::ClientDisrespect, dec!(100), PenaltyStatus::Active),
        ];
        assert_eq!(total_percentage(&records, dec!(50)), dec!(100));
    }

    #[test]
    fn disputed_nuclear_does_not_override() {
        let records = vec![
            record(PenaltyType::ClientDisrespect, dec!(100), PenaltyStatus::Disputed),
            record(PenaltyType::LateArrival, dec!(10), PenaltyStatus::Active),
        ];
        assert_eq!(total_percentage(&records, dec!(50)), dec!(10));
    }

    #[test]
    fn total_is_always_within_bounds() {
        let records = vec![
            record(PenaltyType::ComplianceShortfall, dec!(80), PenaltyStatus::Active),
            record(PenaltyType::UnapprovedAbsence, dec!(45), PenaltyStatus::Active),
        ];
        let pct = total_percentage(&records, dec!(50));
        assert!(pct >= Decimal::ZERO && pct <= dec!(100));
        assert_eq!(total_percentage(&[], dec!(50)), dec!(0));
    }

    #[test]
    fn only_the_penalised_user_may_dispute() {
        let rec = record(PenaltyType::LateArrival, dec!(5), PenaltyStatus::Active);
        let err = transition(&rec, PenaltyAction::Dispute, Uuid::new_v4(), UserRole::SalesRep);
        assert!(matches!(err, Err(AppError::Forbidden(_))));

        let next = transition(&rec, PenaltyAction::Dispute, rec.user_id, UserRole::SalesRep);
        assert_eq!(next.unwrap(), PenaltyStatus::Disputed);
    }

    #[test]
    fn dispute_requires_active_status() {
        let mut rec = record(PenaltyType::LateArrival, dec!(5), PenaltyStatus::Waived);
        rec.status = PenaltyStatus::Waived;
        let err = transition(&rec, PenaltyAction::Dispute, rec.user_id, UserRole::SalesRep);
        assert!(matches!(err, Err(AppError::Precondition(_))));
    }

    #[test]
    fn resolution_is_manager_only_and_needs_disputed_state() {
        let rec = record(PenaltyType::LateArrival, dec!(5), PenaltyStatus::Disputed);
        let forbidden = transition(&rec, PenaltyAction::Waive, rec.user_id, UserRole::SalesRep);
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        let waived = transition(&rec, PenaltyAction::Waive, Uuid::new_v4(), UserRole::Manager);
        assert_eq!(waived.unwrap(), PenaltyStatus::Waived);

        let active = record(PenaltyType::LateArrival, dec!(5), PenaltyStatus::Active);
        let precondition = transition(&active, PenaltyAction::Resolve, Uuid::new_v4(), UserRole::Manager);
        assert!(matches!(precondition, Err(AppError::Precondition(_))));
    }
}
