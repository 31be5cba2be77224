//! Repository layer for data access

pub mod attempts;
pub mod mailings;
pub mod messages;
pub mod recipients;
pub mod tokens;
pub mod users;

// Repository traits
pub use attempts::AttemptRepository;
pub use mailings::MailingRepository;
pub use messages::MessageRepository;
pub use recipients::RecipientRepository;
pub use tokens::TokenRepository;
pub use users::UserRepository;

// PostgreSQL implementations
pub use attempts::DbAttemptRepository;
pub use mailings::DbMailingRepository;
pub use messages::DbMessageRepository;
pub use recipients::DbRecipientRepository;
pub use tokens::DbTokenRepository;
pub use users::DbUserRepository;
