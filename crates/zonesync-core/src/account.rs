//! Account selection
//!
//! Callers pick accounts with a free-text filter: comma-separated tokens,
//! each matching an account's name, numeric provider id or UUID.

use std::sync::Arc;
use uuid::Uuid;

use crate::model::Account;
use crate::traits::AccountRepository;
use crate::Result;

/// Parsed account filter
///
/// An empty filter matches every account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    tokens: Vec<String>,
}

impl AccountFilter {
    /// Split on commas, trim, drop blank tokens
    pub fn parse(filter: Option<&str>) -> Self {
        let tokens = filter
            .map(|f| {
                f.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether any token identifies `account`
    pub fn matches(&self, account: &Account) -> bool {
        self.is_empty() || self.tokens.iter().any(|t| identifies(t, account))
    }
}

/// Whether `identifier` is the account's name, numeric id or UUID
pub fn identifies(identifier: &str, account: &Account) -> bool {
    if account.name() == identifier || account.account_id() == Some(identifier) {
        return true;
    }
    identifier
        .parse::<Uuid>()
        .is_ok_and(|uuid| uuid == account.id())
}

/// Resolves account selections against an [`AccountRepository`]
#[derive(Clone)]
pub struct AccountResolver {
    repository: Arc<dyn AccountRepository>,
}

impl AccountResolver {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Accounts matching `filter`, ordered by name
    pub async fn resolve_accounts(&self, filter: Option<&str>) -> Result<Vec<Account>> {
        let accounts = self.repository.find_accounts_with_filter(filter).await?;
        tracing::debug!(
            filter = filter.unwrap_or(""),
            count = accounts.len(),
            "Resolved accounts"
        );
        Ok(accounts)
    }

    /// The account `identifier` names, if any
    pub async fn resolve_account(&self, identifier: &str) -> Result<Option<Account>> {
        self.repository.find_account_by_identifier(identifier).await
    }

    /// Enabled accounts, ordered by name
    pub async fn enabled_accounts(&self) -> Result<Vec<Account>> {
        self.repository.find_enabled_accounts().await
    }
}

impl std::fmt::Debug for AccountResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CredentialKind;
    use crate::store::MemoryStore;
    use crate::traits::AccountRepository;

    fn account(name: &str, account_id: Option<&str>) -> Account {
        let mut account = Account::new(name, CredentialKind::Env);
        account.set_account_id(account_id.map(str::to_string));
        account
    }

    #[test]
    fn parse_trims_and_drops_blanks() {
        let filter = AccountFilter::parse(Some(" prod , ,123456789012,"));
        assert_eq!(filter.tokens(), &["prod".to_string(), "123456789012".to_string()]);
        assert!(AccountFilter::parse(Some(" , ")).is_empty());
        assert!(AccountFilter::parse(None).is_empty());
    }

    #[test]
    fn tokens_match_name_numeric_id_or_uuid() {
        let prod = account("prod", Some("123456789012"));

        assert!(AccountFilter::parse(Some("prod")).matches(&prod));
        assert!(AccountFilter::parse(Some("123456789012")).matches(&prod));
        assert!(AccountFilter::parse(Some(&prod.id().to_string())).matches(&prod));
        assert!(AccountFilter::parse(Some("staging, prod")).matches(&prod));
        assert!(!AccountFilter::parse(Some("staging")).matches(&prod));
        assert!(AccountFilter::parse(None).matches(&prod));
    }

    #[tokio::test]
    async fn resolver_orders_by_name() {
        let store = Arc::new(MemoryStore::new());
        store.save_account(account("zeta", Some("2"))).await.unwrap();
        store.save_account(account("alpha", Some("1"))).await.unwrap();
        let mut disabled = account("mid", Some("3"));
        disabled.set_enabled(false);
        store.save_account(disabled).await.unwrap();

        let resolver = AccountResolver::new(store);

        let all = resolver.resolve_accounts(None).await.unwrap();
        let names: Vec<_> = all.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);

        let some = resolver.resolve_accounts(Some("2,alpha")).await.unwrap();
        let names: Vec<_> = some.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let enabled = resolver.enabled_accounts().await.unwrap();
        assert_eq!(enabled.len(), 2);

        let found = resolver.resolve_account("3").await.unwrap();
        assert_eq!(found.map(|a| a.name().to_string()), Some("mid".to_string()));
        assert!(resolver.resolve_account("nope").await.unwrap().is_none());
    }
}
