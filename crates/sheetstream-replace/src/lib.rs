//! Replace the whole content of a sheet while keeping a backup copy until
//! the new content is in place.
//!
//! The replacement runs as a fixed sequence of [`ReplaceStep`]s. A failure
//! reports the step it stopped at together with the identities involved, and
//! can be turned into a [`ResumePoint`] to finish the work later.

mod error;
mod saga;
mod step;

pub use error::{ReplaceFailure, ResumePoint};
pub use saga::{ReplaceReport, SafeReplace};
pub use step::ReplaceStep;
