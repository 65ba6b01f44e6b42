//! Active-profile resolution.
//!
//! Maps one enumeration pass plus the stored profile collection to at most
//! one active profile. Collection order is the tie-break: the first
//! enabled profile with an observed identifier pair wins.

use std::collections::HashSet;

use tracing::debug;

use crate::device::DeviceObservation;
use crate::hwid::HwId;
use crate::profile::KeyboardProfile;

/// Normalized identifier pairs for one enumeration pass.
pub fn observed_ids(observations: &[DeviceObservation]) -> HashSet<HwId> {
    observations.iter().map(DeviceObservation::hw_id).collect()
}

/// True if any of the profile's vid_pid entries is currently observed.
fn is_connected(profile: &KeyboardProfile, observed: &HashSet<HwId>) -> bool {
    profile
        .vid_pid
        .iter()
        .filter_map(|entry| HwId::parse_entry(entry))
        .any(|id| observed.contains(&id))
}

fn select(profiles: &[KeyboardProfile], observed: &HashSet<HwId>) -> Option<String> {
    profiles
        .iter()
        .find(|p| p.enabled && is_connected(p, observed))
        .map(|p| p.name.clone())
}

/// Determine the active profile for this cycle, if any.
///
/// Deterministic for unchanged input; disabled profiles are never
/// selected no matter what is plugged in.
pub fn resolve(
    observations: &[DeviceObservation],
    profiles: &[KeyboardProfile],
) -> Option<String> {
    let observed = observed_ids(observations);
    let active = select(profiles, &observed);
    debug!(active = ?active, observed = observed.len(), "Resolved active profile");
    active
}

/// Resolve and recompute every profile's derived `connected`/`active`
/// flags in place.
///
/// `connected` is independent of which profile wins: a disabled or
/// later-in-order profile can be connected without being active.
pub fn refresh_flags(
    profiles: &mut [KeyboardProfile],
    observations: &[DeviceObservation],
) -> Option<String> {
    let observed = observed_ids(observations);
    let active = select(profiles, &observed);

    for profile in profiles.iter_mut() {
        let connected = is_connected(profile, &observed);
        profile.connected = connected;
        profile.active =
            connected && profile.enabled && active.as_deref() == Some(profile.name.as_str());
    }

    active
}
