//! Collection and reservation-ledger names used by account
//! provisioning. Every name is realm-relative; the store scopes them to
//! the realm's database.

use tessera_store::LedgerKind;

/// Account records.
pub const ACCOUNTS: &str = "accounts";

/// Provider linkage records, one per account.
pub const ACCOUNT_SECRETS: &str = "account_secrets";

/// Group records accounts may reference.
pub const GROUPS: &str = "groups";

/// Reservations for account ids.
pub const ACCOUNT_IDS: LedgerKind = LedgerKind::new("account id", "index_account_ids");

/// Reservations for email addresses.
pub const EMAILS: LedgerKind = LedgerKind::new("email", "index_emails");

/// Reservations for phone numbers.
pub const PHONES: LedgerKind = LedgerKind::new("phone", "index_phones");
