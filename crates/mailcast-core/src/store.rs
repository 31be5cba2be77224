//! Repository bundle shared by the services

use mailcast_storage::repository::{
    AttemptRepository, DbAttemptRepository, DbMailingRepository, DbMessageRepository,
    DbRecipientRepository, DbTokenRepository, DbUserRepository, MailingRepository,
    MessageRepository, RecipientRepository, TokenRepository, UserRepository,
};
use mailcast_storage::{DatabasePool, MemoryStore};
use std::sync::Arc;

/// One handle per repository, backed either by PostgreSQL or by memory
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub recipients: Arc<dyn RecipientRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub mailings: Arc<dyn MailingRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Repositories {
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            users: Arc::new(DbUserRepository::new(pool.clone())),
            tokens: Arc::new(DbTokenRepository::new(pool.clone())),
            recipients: Arc::new(DbRecipientRepository::new(pool.clone())),
            messages: Arc::new(DbMessageRepository::new(pool.clone())),
            mailings: Arc::new(DbMailingRepository::new(pool.clone())),
            attempts: Arc::new(DbAttemptRepository::new(pool)),
        }
    }

    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            tokens: Arc::new(store.clone()),
            recipients: Arc::new(store.clone()),
            messages: Arc::new(store.clone()),
            mailings: Arc::new(store.clone()),
            attempts: Arc::new(store),
        }
    }
}
