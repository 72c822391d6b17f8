//! `splitticket`: track tickets split into other tickets.
//!
//! A ticket can be split into existing or newly created tickets. The split
//! relationships live in the `ticket_split` table and the source ticket's
//! status follows them: `split` while it has targets, `new` again once a
//! split ticket has none. [`split::SplitReconciler`] is the core; the `st`
//! binary is a thin CLI over it.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod split;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, Result, SplitError, StructuredError};
