//! Orchestrator replies turned into hub commands
//!
//! The orchestrator answers in free text that may embed one JSON object.
//! [`ActionPlan::from_reply`] decodes it; a [`Dispatcher`] checks permissions,
//! runs it through the command facade and produces the text reply.

pub mod dispatch;
pub mod plan;

pub use dispatch::{
    AllowList, Dispatcher, PermissionCheck, APOLOGY_REPLY, DENIED_REPLY, DONE_REPLY,
    UNAUTHORIZED_REPLY,
};
pub use plan::{Action, ActionPlan};
