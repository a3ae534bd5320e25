//! Wi-Fi provisioning across privilege and platform tiers.

mod descriptor;
mod selector;
mod spec;
mod suggestion;

pub use descriptor::{KeyManagement, NetworkDescriptor, SkipReason};
pub use selector::{
    NetworkProvisioner, Outcome, ProvisioningReport, ProvisioningResult, ProvisioningStrategy,
};
pub use spec::{SecurityType, WifiNetworkSpec};
pub use suggestion::{Passphrase, Suggestion, SuggestionStatus};
