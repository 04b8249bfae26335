pub mod callback;
pub mod runner;

pub use callback::{deliver, CallbackPayload, DeliveryOutcome, HttpNotifier, Notifier, ProgressUpdate};
pub use runner::JobRunner;
