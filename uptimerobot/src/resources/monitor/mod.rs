//! Monitor state migration
//!
//! Built from the same converters in `tfplug::convert` as the status page
//! upgrade.

pub mod upgrade;

pub use upgrade::{
    ensure_alert_contact_defaults, lift_alert_contacts, monitor_upgrader, normalize_status_codes,
};
