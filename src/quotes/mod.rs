//! Quote submission: turning a cart into `quote_requests` rows.

mod confirmation;
mod memory;
mod message;
mod store;
mod submission;

pub use confirmation::{CancelHandle, ConfirmationDelay, DEFAULT_CONFIRMATION_DELAY};
pub use memory::InMemoryQuoteRequests;
pub use message::{CombinedMessage, build_combined_message};
pub use store::{PgQuoteRequestStore, QuoteRequestStore};
pub use submission::{
    CompensationPolicy, QuoteForm, QuoteSubmission, SubmissionReceipt, SubmissionState,
    SubmitError,
};
