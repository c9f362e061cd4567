//! Turn event protocol: envelope, typed kinds, and the in-process bus that
//! carries them from the turn worker to a live consumer.

mod bus;
mod envelope;
mod kind;

pub use bus::EventBus;
pub use envelope::Event;
pub use kind::EventKind;
