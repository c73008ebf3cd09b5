use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::profile::{CoordinatorId, LecturerId, ManagerId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn generate() -> Self {
        Self(format!("CLM-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    ApprovedByCoordinator,
    ReturnedToCoordinator,
    FullyApproved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ApprovedByCoordinator => "approved_by_coordinator",
            Self::ReturnedToCoordinator => "returned_to_coordinator",
            Self::FullyApproved => "fully_approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved_by_coordinator" => Some(Self::ApprovedByCoordinator),
            "returned_to_coordinator" => Some(Self::ReturnedToCoordinator),
            "fully_approved" => Some(Self::FullyApproved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FullyApproved | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Processing,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Processing => "processing",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Some(Self::Unpaid),
            "processing" => Some(Self::Processing),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Who did something and when. Id and timestamp are only ever set together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp<Id> {
    pub actor_id: Id,
    pub at: DateTime<Utc>,
}

impl<Id> Stamp<Id> {
    pub fn new(actor_id: Id, at: DateTime<Utc>) -> Self {
        Self { actor_id, at }
    }
}

/// A lecturer's claim for payment.
///
/// Everything above `status` is fixed when the claim is created; stores only ever write the
/// workflow fields back on update. `version` is bumped by the store on every successful update
/// and is the compare-and-swap token for concurrent reviewers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub lecturer_id: LecturerId,
    pub claim_date: NaiveDate,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub description: String,
    pub department: String,
    pub status: ClaimStatus,
    pub coordinator_approval: Option<Stamp<CoordinatorId>>,
    pub coordinator_notes: Option<String>,
    pub manager_approval: Option<Stamp<ManagerId>>,
    pub manager_notes: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment: Option<Stamp<UserId>>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    pub fn total_amount(&self) -> Decimal {
        self.hours_worked * self.hourly_rate
    }

    pub fn counts_toward_hours_cap(&self) -> bool {
        self.status != ClaimStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{Claim, ClaimId, ClaimStatus, PaymentStatus};
    use crate::domain::profile::LecturerId;

    fn claim(hours: Decimal, rate: Decimal) -> Claim {
        Claim {
            id: ClaimId("CLM-1".to_string()),
            lecturer_id: LecturerId("LEC-1".to_string()),
            claim_date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
            hours_worked: hours,
            hourly_rate: rate,
            description: "Tutorials".to_string(),
            department: "Computer Science".to_string(),
            status: ClaimStatus::Pending,
            coordinator_approval: None,
            coordinator_notes: None,
            manager_approval: None,
            manager_notes: None,
            payment_status: PaymentStatus::Unpaid,
            payment: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn total_amount_is_hours_times_rate() {
        let claim = claim(Decimal::new(125, 1), Decimal::new(25_000, 2));
        assert_eq!(claim.total_amount(), Decimal::new(3_125, 0));
    }

    #[test]
    fn status_storage_encoding_is_stable() {
        let cases = [
            ClaimStatus::Pending,
            ClaimStatus::ApprovedByCoordinator,
            ClaimStatus::ReturnedToCoordinator,
            ClaimStatus::FullyApproved,
            ClaimStatus::Rejected,
        ];

        for status in cases {
            assert_eq!(ClaimStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ClaimStatus::parse("approved_by_manager"), None);
        assert_eq!(PaymentStatus::parse("PROCESSING"), Some(PaymentStatus::Processing));
    }

    #[test]
    fn rejected_claims_do_not_count_toward_cap() {
        let mut claim = claim(Decimal::ONE, Decimal::ONE);
        assert!(claim.counts_toward_hours_cap());
        claim.status = ClaimStatus::Rejected;
        assert!(!claim.counts_toward_hours_cap());
    }
}
