//! Mailcast Core - mailing workflow and account services
//!
//! This crate holds the ownership policy every operation goes through, the
//! mailing lifecycle (create, launch, stop) with its attempt log and listing
//! cache, the recipient directory and message catalog, and the account
//! service behind the API's bearer tokens.

pub mod accounts;
pub mod catalog;
pub mod contact;
pub mod directory;
pub mod mailing;
pub mod policy;
pub mod services;
pub mod stats;
pub mod store;
pub mod validation;

pub use accounts::{AccountService, AccountSettings, Registration, Session, UserDetail};
pub use catalog::{MessageCatalog, MessageInput};
pub use contact::{ContactForm, ContactService};
pub use directory::{RecipientDirectory, RecipientInput};
pub use mailing::{
    AttemptLog, LaunchOutcome, LettreTransport, MailTransport, MailingDetail, MailingInput,
    MailingListCache, MailingManager, MailingSender, MemoryTransport, OutgoingMail,
    TransportResponse,
};
pub use policy::{Action, Actor, ListScope};
pub use services::Services;
pub use stats::StatsService;
pub use store::Repositories;
