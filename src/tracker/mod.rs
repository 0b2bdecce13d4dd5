//! Task lifecycle: submission, open dispatch, and status aggregation.

pub mod dispatcher;
pub mod status;
pub mod submit;

pub use dispatcher::{DispatchOutcome, OpenDispatcher, OpenRequest, MAX_TASK_ID_LEN};
pub use submit::{SubmitRequest, Submitted, Submitter};
