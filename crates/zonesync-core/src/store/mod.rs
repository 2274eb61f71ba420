//! Local mirror implementations
//!
//! Both stores share [`Tables`], which owns the entity rows and enforces the
//! natural-key uniqueness constraints. Rows keep insertion order.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{identifies, AccountFilter};
use crate::model::{Account, ChangeLog, ChangeStatus, HostedZone, RecordKey, RecordSet};
use crate::traits::ChangeSet;
use crate::{Error, Result};

/// Entity rows of one store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    zones: Vec<HostedZone>,
    #[serde(default)]
    record_sets: Vec<RecordSet>,
    #[serde(default)]
    change_logs: Vec<ChangeLog>,
}

impl Tables {
    pub(crate) fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.accounts.len(),
            self.zones.len(),
            self.record_sets.len(),
            self.change_logs.len(),
        )
    }

    // Accounts

    pub(crate) fn accounts_with_filter(&self, filter: &AccountFilter) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name().cmp(b.name()));
        accounts
    }

    pub(crate) fn account_by_identifier(&self, identifier: &str) -> Option<Account> {
        self.accounts_with_filter(&AccountFilter::default())
            .into_iter()
            .find(|a| identifies(identifier, a))
    }

    pub(crate) fn enabled_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.is_enabled())
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name().cmp(b.name()));
        accounts
    }

    pub(crate) fn upsert_account(&mut self, account: Account) {
        match self.accounts.iter_mut().find(|a| a.id() == account.id()) {
            Some(slot) => *slot = account,
            None => self.accounts.push(account),
        }
    }

    /// Remove an account with its zones and their record sets
    pub(crate) fn remove_account(&mut self, id: Uuid) {
        let zone_ids: Vec<Uuid> = self
            .zones
            .iter()
            .filter(|z| z.account_id() == id)
            .map(|z| z.id())
            .collect();
        for zone_id in zone_ids {
            self.remove_zone(zone_id);
        }
        self.accounts.retain(|a| a.id() != id);
    }

    // Zones

    pub(crate) fn zone_by_key(&self, account_id: Uuid, remote_id: &str) -> Option<HostedZone> {
        self.zones
            .iter()
            .find(|z| z.account_id() == account_id && z.remote_id() == remote_id)
            .cloned()
    }

    pub(crate) fn zones_by_account(&self, account_id: Uuid) -> Vec<HostedZone> {
        self.zones
            .iter()
            .filter(|z| z.account_id() == account_id)
            .cloned()
            .collect()
    }

    pub(crate) fn upsert_zone(&mut self, zone: HostedZone) -> Result<()> {
        let duplicate = self.zones.iter().any(|z| {
            z.id() != zone.id()
                && z.account_id() == zone.account_id()
                && z.remote_id() == zone.remote_id()
        });
        if duplicate {
            return Err(Error::conflict(format!(
                "hosted zone {} already exists for account {}",
                zone.remote_id(),
                zone.account_id()
            )));
        }

        match self.zones.iter_mut().find(|z| z.id() == zone.id()) {
            Some(slot) => *slot = zone,
            None => self.zones.push(zone),
        }
        Ok(())
    }

    /// Remove a zone with its record sets
    pub(crate) fn remove_zone(&mut self, id: Uuid) {
        self.record_sets.retain(|r| r.zone_id() != id);
        self.zones.retain(|z| z.id() != id);
    }

    // Record sets

    pub(crate) fn record_by_key(&self, zone_id: Uuid, key: &RecordKey) -> Option<RecordSet> {
        self.record_sets
            .iter()
            .find(|r| r.zone_id() == zone_id && same_key(r, key))
            .cloned()
    }

    pub(crate) fn records_by_zone(&self, zone_id: Uuid) -> Vec<RecordSet> {
        self.record_sets
            .iter()
            .filter(|r| r.zone_id() == zone_id)
            .cloned()
            .collect()
    }

    pub(crate) fn upsert_record(&mut self, record: RecordSet) -> Result<()> {
        let key = record.key();
        let duplicate = self.record_sets.iter().any(|r| {
            r.id() != record.id() && r.zone_id() == record.zone_id() && same_key(r, &key)
        });
        if duplicate {
            return Err(Error::conflict(format!(
                "record set {} already exists in zone {}",
                key,
                record.zone_id()
            )));
        }

        match self.record_sets.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => self.record_sets.push(record),
        }
        Ok(())
    }

    pub(crate) fn remove_record(&mut self, id: Uuid) {
        self.record_sets.retain(|r| r.id() != id);
    }

    // Change log

    pub(crate) fn change_logs_by_plan(&self, plan_id: &str) -> Vec<ChangeLog> {
        self.change_logs
            .iter()
            .filter(|c| c.plan_id() == Some(plan_id))
            .cloned()
            .collect()
    }

    pub(crate) fn change_logs_by_status(&self, status: ChangeStatus) -> Vec<ChangeLog> {
        self.change_logs
            .iter()
            .filter(|c| c.status() == status)
            .cloned()
            .collect()
    }

    pub(crate) fn upsert_change_log(&mut self, entry: ChangeLog) {
        match self.change_logs.iter_mut().find(|c| c.id() == entry.id()) {
            Some(slot) => *slot = entry,
            None => self.change_logs.push(entry),
        }
    }

    /// Apply a batch to a copy and return it; `self` is left untouched
    pub(crate) fn with_changes(&self, changes: ChangeSet) -> Result<Tables> {
        let mut next = self.clone();
        let (zones, record_sets, change_logs) = changes.into_parts();
        for zone in zones {
            next.upsert_zone(zone)?;
        }
        for record in record_sets {
            next.upsert_record(record)?;
        }
        for entry in change_logs {
            next.upsert_change_log(entry);
        }
        Ok(next)
    }
}

fn same_key(record: &RecordSet, key: &RecordKey) -> bool {
    record.name() == key.name
        && record.record_type() == key.record_type
        && record.set_identifier() == key.set_identifier.as_deref()
}
