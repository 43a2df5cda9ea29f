//! The atomic event model and the scratchpad used to build one per raw
//! payload candidate during enrichment.

mod error;
mod event;
mod scratchpad;

pub use error::AtomicError;
pub use event::{AtomicEvent, SelfDescribingContext, SelfDescribingEvent, ATOMIC_FIELDS};
pub use scratchpad::TemporaryAtomicEvent;
