//! Mailing module - lifecycle, sending and the attempt log

mod attempts;
mod cache;
mod manager;
mod sender;
mod transport;

pub use attempts::AttemptLog;
pub use cache::MailingListCache;
pub use manager::{MailingDetail, MailingInput, MailingManager};
pub use sender::{LaunchOutcome, MailingSender};
pub use transport::{
    LettreTransport, MailTransport, MemoryTransport, OutgoingMail, TransportResponse,
};
