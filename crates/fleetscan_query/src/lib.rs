pub mod engine;
pub mod inventory;
pub mod sms;

pub use engine::{evaluate, QueryOutcome};
pub use inventory::{render_and_write, GitActionRequest, InventoryError, RenderOutcome};
pub use sms::{OnboardingFields, SmsClient, SmsError};
