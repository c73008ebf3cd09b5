use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::claim::{Claim, ClaimId, ClaimStatus, PaymentStatus};
use crate::domain::profile::Lecturer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Payroll,
    Financial,
    LecturerClaims,
    CoordinatorReview,
    ManagerReview,
    Invoice,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payroll => "payroll",
            Self::Financial => "financial",
            Self::LecturerClaims => "lecturer_claims",
            Self::CoordinatorReview => "coordinator_review",
            Self::ManagerReview => "manager_review",
            Self::Invoice => "invoice",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Payroll => "Payroll export",
            Self::Financial => "Financial summary",
            Self::LecturerClaims => "My claims",
            Self::CoordinatorReview => "Claims reviewed by coordinator",
            Self::ManagerReview => "Claims approved by manager",
            Self::Invoice => "Claim invoice",
        }
    }

    /// Tera template for the plain-text kinds; payroll is written by the CSV encoder.
    fn template(&self) -> Option<&'static str> {
        match self {
            Self::Payroll => None,
            Self::Financial => Some("financial.txt"),
            Self::Invoice => Some("invoice.txt"),
            Self::LecturerClaims | Self::CoordinatorReview | Self::ManagerReview => {
                Some("claims.txt")
            }
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Payroll => "text/csv",
            _ => "text/plain",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Payroll => "csv",
            _ => "txt",
        }
    }
}

/// One claim joined with the lecturer details a report prints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimReportRow {
    pub claim_id: ClaimId,
    pub lecturer_name: String,
    pub lecturer_email: String,
    pub department: String,
    pub claim_date: NaiveDate,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub total_amount: Decimal,
    pub description: String,
    pub status: ClaimStatus,
    pub payment_status: PaymentStatus,
    pub coordinator_notes: Option<String>,
    pub manager_notes: Option<String>,
}

impl ClaimReportRow {
    pub fn new(claim: &Claim, lecturer: Option<&Lecturer>) -> Self {
        Self {
            claim_id: claim.id.clone(),
            lecturer_name: lecturer
                .map(Lecturer::full_name)
                .unwrap_or_else(|| claim.lecturer_id.0.clone()),
            lecturer_email: lecturer.map(|lecturer| lecturer.email.clone()).unwrap_or_default(),
            department: claim.department.clone(),
            claim_date: claim.claim_date,
            hours_worked: claim.hours_worked,
            hourly_rate: claim.hourly_rate,
            total_amount: claim.total_amount(),
            description: claim.description.clone(),
            status: claim.status,
            payment_status: claim.payment_status,
            coordinator_notes: claim.coordinator_notes.clone(),
            manager_notes: claim.manager_notes.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub claim_count: usize,
    pub approved_unpaid: usize,
    pub paid: usize,
    pub rejected: usize,
    pub total_hours: Decimal,
    pub total_amount: Decimal,
}

impl ReportSummary {
    pub fn from_rows(rows: &[ClaimReportRow]) -> Self {
        rows.iter().fold(Self::default(), |mut summary, row| {
            summary.claim_count += 1;
            summary.total_hours += row.hours_worked;
            summary.total_amount += row.total_amount;
            if row.status == ClaimStatus::Rejected {
                summary.rejected += 1;
            }
            if row.status == ClaimStatus::FullyApproved && row.payment_status != PaymentStatus::Paid
            {
                summary.approved_unpaid += 1;
            }
            if row.payment_status == PaymentStatus::Paid {
                summary.paid += 1;
            }
            summary
        })
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template error: {0}")]
    Template(String),
    #[error("csv error: {0}")]
    Csv(String),
}

pub trait ReportGenerator: Send + Sync {
    fn render(&self, kind: ReportKind, rows: &[ClaimReportRow]) -> Result<Vec<u8>, ReportError>;
}

/// Renders plain-text reports from the templates under `templates/reports` and the payroll
/// export as RFC 4180 CSV.
#[derive(Clone, Debug)]
pub struct TemplateReportGenerator {
    tera: Tera,
}

impl TemplateReportGenerator {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("claims.txt", include_str!("../../../templates/reports/claims.txt.tera")),
            ("financial.txt", include_str!("../../../templates/reports/financial.txt.tera")),
            ("invoice.txt", include_str!("../../../templates/reports/invoice.txt.tera")),
        ])
        .map_err(|error| ReportError::Template(error.to_string()))?;

        Ok(Self { tera })
    }
}

#[derive(Serialize)]
struct RowView<'a> {
    claim_id: &'a str,
    lecturer_name: &'a str,
    lecturer_email: &'a str,
    department: &'a str,
    claim_date: String,
    hours_worked: String,
    hourly_rate: String,
    total_amount: String,
    description: &'a str,
    status: &'static str,
    payment_status: &'static str,
    coordinator_notes: Option<&'a str>,
    manager_notes: Option<&'a str>,
}

#[derive(Serialize)]
struct SummaryView {
    claim_count: usize,
    approved_unpaid: usize,
    paid: usize,
    rejected: usize,
    total_hours: String,
    total_amount: String,
}

#[derive(Serialize)]
struct ReportView<'a> {
    title: &'static str,
    rows: Vec<RowView<'a>>,
    summary: SummaryView,
}

/// Column order of the payroll export.
#[derive(Serialize)]
struct PayrollLine<'a> {
    claim_id: &'a str,
    lecturer: &'a str,
    email: &'a str,
    department: &'a str,
    claim_date: &'a str,
    hours_worked: &'a str,
    hourly_rate: &'a str,
    total_amount: &'a str,
    payment_status: &'static str,
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn render_payroll(rows: &[RowView<'_>]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer
            .write_record(PAYROLL_HEADER)
            .map_err(|error| ReportError::Csv(error.to_string()))?;
    }
    for row in rows {
        writer
            .serialize(PayrollLine {
                claim_id: row.claim_id,
                lecturer: row.lecturer_name,
                email: row.lecturer_email,
                department: row.department,
                claim_date: &row.claim_date,
                hours_worked: &row.hours_worked,
                hourly_rate: &row.hourly_rate,
                total_amount: &row.total_amount,
                payment_status: row.payment_status,
            })
            .map_err(|error| ReportError::Csv(error.to_string()))?;
    }
    writer.flush().map_err(|error| ReportError::Csv(error.to_string()))?;
    writer.into_inner().map_err(|error| ReportError::Csv(error.to_string()))
}

const PAYROLL_HEADER: [&str; 9] = [
    "claim_id",
    "lecturer",
    "email",
    "department",
    "claim_date",
    "hours_worked",
    "hourly_rate",
    "total_amount",
    "payment_status",
];

impl ReportGenerator for TemplateReportGenerator {
    fn render(&self, kind: ReportKind, rows: &[ClaimReportRow]) -> Result<Vec<u8>, ReportError> {
        let summary = ReportSummary::from_rows(rows);
        let view = ReportView {
            title: kind.title(),
            rows: rows
                .iter()
                .map(|row| RowView {
                    claim_id: &row.claim_id.0,
                    lecturer_name: &row.lecturer_name,
                    lecturer_email: &row.lecturer_email,
                    department: &row.department,
                    claim_date: row.claim_date.format("%Y-%m-%d").to_string(),
                    hours_worked: row.hours_worked.normalize().to_string(),
                    hourly_rate: money(row.hourly_rate),
                    total_amount: money(row.total_amount),
                    description: &row.description,
                    status: row.status.as_str(),
                    payment_status: row.payment_status.as_str(),
                    coordinator_notes: row.coordinator_notes.as_deref(),
                    manager_notes: row.manager_notes.as_deref(),
                })
                .collect(),
            summary: SummaryView {
                claim_count: summary.claim_count,
                approved_unpaid: summary.approved_unpaid,
                paid: summary.paid,
                rejected: summary.rejected,
                total_hours: summary.total_hours.normalize().to_string(),
                total_amount: money(summary.total_amount),
            },
        };

        let Some(template) = kind.template() else {
            return render_payroll(&view.rows);
        };
        let context = Context::from_serialize(&view)
            .map_err(|error| ReportError::Template(error.to_string()))?;
        let rendered = self
            .tera
            .render(template, &context)
            .map_err(|error| ReportError::Template(error.to_string()))?;

        Ok(rendered.into_bytes())
    }
}
