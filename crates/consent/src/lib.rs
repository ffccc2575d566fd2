//! Consent ledger (event-sourced).
//!
//! One ledger per client holds every consent that client has given, scoped by
//! purpose and recipient, with expiry and revocation. Pure deterministic domain
//! logic: no IO, no clock reads, no storage.

pub mod enforcement;
pub mod event;
pub mod ledger;
pub mod record;

pub use enforcement::{ConsentSummary, ConsentValidation, RENEWAL_WINDOW_DAYS};
pub use event::{
    ConsentEvent, ConsentExpired, ConsentExtended, ConsentGranted, ConsentRevoked, ConsentUpdated,
};
pub use ledger::{
    AGGREGATE_TYPE, ConsentCommand, ConsentLedger, ExpireConsent, ExtendConsent, GrantConsent,
    RevokeConsent, UpdateConsent,
};
pub use record::{ConsentRecord, ConsentStatus, ConsentStatusView, ConsentType};
