//! Service wiring

use crate::accounts::{AccountService, AccountSettings};
use crate::catalog::MessageCatalog;
use crate::contact::ContactService;
use crate::directory::RecipientDirectory;
use crate::mailing::{AttemptLog, MailTransport, MailingListCache, MailingManager, MailingSender};
use crate::stats::StatsService;
use crate::store::Repositories;
use mailcast_common::Config;
use std::sync::Arc;

/// Every service the API needs, sharing one set of repositories
pub struct Services {
    pub accounts: AccountService,
    pub recipients: RecipientDirectory,
    pub messages: MessageCatalog,
    pub mailings: MailingManager,
    pub sender: MailingSender,
    pub attempts: AttemptLog,
    pub stats: StatsService,
    pub contact: ContactService,
    pub mailing_cache: Arc<MailingListCache>,
}

impl Services {
    pub fn new(repos: Repositories, transport: Arc<dyn MailTransport>, config: &Config) -> Self {
        let cache = Arc::new(MailingListCache::new(config.cache.enabled));
        let attempts = AttemptLog::new(Arc::clone(&repos.attempts));

        Self {
            accounts: AccountService::new(
                Arc::clone(&repos.users),
                Arc::clone(&repos.tokens),
                Arc::clone(&transport),
                AccountSettings::from_config(config),
            ),
            recipients: RecipientDirectory::new(Arc::clone(&repos.recipients)),
            messages: MessageCatalog::new(Arc::clone(&repos.messages))
                .with_mailing_cache(Arc::clone(&cache)),
            mailings: MailingManager::new(
                Arc::clone(&repos.mailings),
                Arc::clone(&repos.messages),
                Arc::clone(&repos.recipients),
                attempts.clone(),
                Arc::clone(&cache),
            ),
            sender: MailingSender::new(
                Arc::clone(&repos.mailings),
                Arc::clone(&repos.messages),
                attempts.clone(),
                Arc::clone(&transport),
                Arc::clone(&cache),
                config.mail.from_address.clone(),
            ),
            attempts,
            stats: StatsService::new(Arc::clone(&repos.mailings), Arc::clone(&repos.recipients)),
            contact: ContactService::new(
                transport,
                config.mail.from_address.clone(),
                config.mail.contact_address.clone(),
            ),
            mailing_cache: cache,
        }
    }
}
