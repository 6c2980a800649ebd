//! Proportional batch output distribution
//!
//! A batch's single output weight is split back to its receptions by wet
//! weight share. A reception's cumulative output is always re-derived by
//! folding every membership row that references it, so repeated or
//! overlapping completions cannot double-count.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Batch, BatchMember, BatchStatus};
use crate::types::round2;
use crate::validation::{
    validate_batch_contributions, validate_output_weight, validate_weight_precision,
    ValidationErrors,
};

/// A member's share fixed at batch creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberAllocation {
    pub reception_id: Uuid,
    pub wet_weight: Decimal,
    pub percentage_of_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAllocation {
    pub total_wet_weight: Decimal,
    pub members: Vec<MemberAllocation>,
}

/// Output assigned to one member at completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberShare {
    pub member_id: Uuid,
    pub reception_id: Uuid,
    pub proportional_output_weight: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchCompletion {
    pub batch_id: Uuid,
    pub total_output_weight: Decimal,
    pub shares: Vec<MemberShare>,
}

impl BatchCompletion {
    /// Receptions whose cumulative output must be recomputed, sorted and
    /// deduplicated so row locks are always taken in the same order
    pub fn affected_receptions(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.shares.iter().map(|s| s.reception_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// What to do when asked to complete a batch that is already completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    #[default]
    RejectCompleted,
    AllowRecompletion,
}

impl CompletionPolicy {
    pub fn from_flag(allow_recompletion: bool) -> Self {
        if allow_recompletion {
            CompletionPolicy::AllowRecompletion
        } else {
            CompletionPolicy::RejectCompleted
        }
    }
}

fn share_of(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        part / total
    }
}

/// Percentages of a new batch. Zero total wet weight yields 0% everywhere.
pub fn allocate_batch(contributions: &[(Uuid, Decimal)]) -> EngineResult<BatchAllocation> {
    validate_batch_contributions(contributions)?;

    let total_wet_weight: Decimal = contributions.iter().map(|(_, weight)| *weight).sum();
    let members = contributions
        .iter()
        .map(|(reception_id, wet_weight)| MemberAllocation {
            reception_id: *reception_id,
            wet_weight: *wet_weight,
            percentage_of_total: round2(share_of(*wet_weight, total_wet_weight) * Decimal::ONE_HUNDRED),
        })
        .collect();

    Ok(BatchAllocation {
        total_wet_weight,
        members,
    })
}

/// Split `total_output_weight` by each member's captured wet weight over the
/// batch's captured total. Stored percentages are not consulted.
///
/// Each share is rounded to two decimals on its own and no remainder is
/// redistributed, so the shares may sum to the output plus or minus up to
/// 0.005 per member. Cumulative outputs inherit that drift.
pub fn distribute_output(
    total_wet_weight: Decimal,
    members: &[BatchMember],
    total_output_weight: Decimal,
) -> Vec<MemberShare> {
    members
        .iter()
        .map(|member| MemberShare {
            member_id: member.id,
            reception_id: member.reception_id,
            proportional_output_weight: round2(
                total_output_weight * share_of(member.wet_weight, total_wet_weight),
            ),
        })
        .collect()
}

/// Work out a batch completion without touching storage
pub fn complete_batch(
    batch: &Batch,
    members: &[BatchMember],
    total_output_weight: Decimal,
    policy: CompletionPolicy,
) -> EngineResult<BatchCompletion> {
    if batch.status == BatchStatus::Completed && policy == CompletionPolicy::RejectCompleted {
        return Err(EngineError::BatchAlreadyCompleted(batch.id));
    }

    let mut errors = ValidationErrors::new();
    if let Err(reason) = validate_output_weight(total_output_weight) {
        errors.push(reason);
    }
    if let Err(reason) = validate_weight_precision(total_output_weight) {
        errors.push(reason);
    }
    for member in members.iter().filter(|m| m.batch_id != batch.id) {
        errors.push(format!(
            "Member {} does not belong to batch {}",
            member.id, batch.id
        ));
    }
    errors.into_result()?;

    Ok(BatchCompletion {
        batch_id: batch.id,
        total_output_weight,
        shares: distribute_output(batch.total_wet_weight, members, total_output_weight),
    })
}

/// Fold every membership row into a cumulative output per reception.
///
/// Rows with no output yet contribute zero but still yield an entry.
pub fn aggregate_output_by_reception<I>(rows: I) -> BTreeMap<Uuid, Decimal>
where
    I: IntoIterator<Item = (Uuid, Option<Decimal>)>,
{
    let mut totals = BTreeMap::new();
    for (reception_id, output) in rows {
        let total = totals.entry(reception_id).or_insert(Decimal::ZERO);
        if let Some(output) = output {
            *total += output;
        }
    }
    totals
}
