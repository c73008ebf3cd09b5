pub mod engine;
pub mod states;

pub use engine::{ClaimLifecycle, TransitionError};
pub use states::{
    ClaimEvent, CoordinatorVerdict, ManagerVerdict, PaymentEvent, PaymentOrder, PaymentOutcome,
    Review, TransitionOutcome,
};
