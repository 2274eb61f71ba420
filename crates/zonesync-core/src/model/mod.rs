//! Local mirror entities
//!
//! Accounts own hosted zones, zones own record sets, and every planned
//! change against a record leaves a [`ChangeLog`] entry.

mod account;
mod change_log;
mod credentials;
mod record_set;
mod zone;

pub use account::Account;
pub use change_log::{ChangeAction, ChangeLog, ChangeStatus};
pub use credentials::CredentialKind;
pub use record_set::{AliasTarget, GeoLocation, RecordKey, RecordSet};
pub use zone::{HostedZone, SourceOfTruth};
