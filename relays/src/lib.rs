//! # Relays
//!
//! Services that validate a request and hand it to an OS delegate:
//! - `Notify`: desktop notifications and speech ([`NotifyPlugin`])
//! - `User`: text prompts and editing a buffer ([`UserPlugin`])
//! - `Key`: site passphrases from a key-policy file ([`KeyPlugin`])

pub mod deriver;
pub mod key;
pub mod notify;
pub mod policy;
pub mod user;

pub use deriver::{HmacDeriver, PassphraseDeriver};
pub use key::KeyPlugin;
pub use notify::NotifyPlugin;
pub use policy::{KeyPolicy, PolicyError, SitePolicy};
pub use user::UserPlugin;
