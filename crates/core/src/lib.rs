pub mod attachments;
pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod hours_cap;
pub mod lifecycle;
pub mod ports;
pub mod reports;
pub mod service;
pub mod storage;

pub use attachments::{AttachmentReport, DocumentAttachmentManager, SkipReason, Upload};
pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use auth::{Action, IdentityProvider, RequestContext, Role, StaticIdentity, Subject};
pub use domain::claim::{Claim, ClaimId, ClaimStatus, PaymentStatus};
pub use domain::document::{Document, DocumentId};
pub use domain::profile::{Coordinator, Lecturer, LecturerId, Manager, UserId};
pub use errors::{ErrorKind, InterfaceError, ValidationFailure, WorkflowError};
pub use hours_cap::{HoursCapCheck, HoursCapValidator, MonthWindow};
pub use lifecycle::{ClaimLifecycle, CoordinatorVerdict, ManagerVerdict, PaymentOrder};
pub use ports::{ClaimFilter, ClaimOrder, ClaimStore, DocumentStore, ProfileStore, StoreError};
pub use reports::{ReportGenerator, ReportKind, TemplateReportGenerator};
pub use service::{ClaimService, ReportRequest, Stores};
pub use storage::{InMemoryStorageSink, LocalDirectorySink, StorageSink};
