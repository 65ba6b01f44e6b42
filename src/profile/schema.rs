//! Profile types and collection validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ValidationError;
use crate::hwid::HwId;

/// Maximum serialized size of a profile collection, in bytes.
pub const MAX_CONFIG_BYTES: usize = 1024 * 1024;

/// Maximum number of profiles in a collection.
pub const MAX_PROFILES: usize = 50;

/// Maximum VID/PID entries per profile.
pub const MAX_HWIDS_PER_PROFILE: usize = 10;

/// Maximum length of the name/vendor/product display strings, in characters.
pub const MAX_FIELD_CHARS: usize = 100;

/// A named, user-declared keyboard identity.
///
/// `connected` and `active` are derived per resolution cycle; they are
/// persisted as snapshots of the last cycle and recomputed before any
/// read-side use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardProfile {
    /// Unique display name, the resolver's return value.
    pub name: String,
    /// Disabled profiles are never eligible to become active.
    pub enabled: bool,
    /// True if any vid_pid entry matches a currently observed device.
    pub connected: bool,
    /// True only for the single profile selected by the resolver.
    pub active: bool,
    /// 8-hex-digit OS input-layout identifier (e.g. "00000409").
    pub layout: String,
    /// Informational product string.
    pub product: String,
    /// Informational vendor string.
    pub vendor: String,
    /// Hardware identifier entries, each `VID_XXXX&PID_YYYY`.
    pub vid_pid: Vec<String>,
}

/// Ordered profile sequence; order is the resolver tie-break.
pub type ProfileCollection = Vec<KeyboardProfile>;

/// Validate a candidate collection against every model invariant.
///
/// Checks, in order: serialized byte size, profile count, per-profile
/// string length bounds, the VID/PID entry pattern, the per-profile entry
/// count, the layout identifier shape, and name uniqueness. The first
/// violation encountered is returned; validation never partially applies.
pub fn validate(profiles: &[KeyboardProfile]) -> Result<(), ValidationError> {
    trace!(count = profiles.len(), "Validating profile collection");

    let bytes = serde_json::to_vec(profiles)
        .map_err(|e| ValidationError::Shape(e.to_string()))?
        .len();
    if bytes > MAX_CONFIG_BYTES {
        return Err(ValidationError::Oversize {
            size: bytes,
            max: MAX_CONFIG_BYTES,
        });
    }

    if profiles.len() > MAX_PROFILES {
        return Err(ValidationError::TooManyProfiles {
            count: profiles.len(),
            max: MAX_PROFILES,
        });
    }

    for profile in profiles {
        validate_profile(profile)?;
    }

    let mut seen = HashSet::new();
    for profile in profiles {
        if !seen.insert(profile.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: profile.name.clone(),
            });
        }
    }

    Ok(())
}

fn validate_profile(profile: &KeyboardProfile) -> Result<(), ValidationError> {
    for (field, value) in [
        ("name", &profile.name),
        ("product", &profile.product),
        ("vendor", &profile.vendor),
    ] {
        if value.chars().count() > MAX_FIELD_CHARS {
            return Err(ValidationError::FieldTooLong {
                profile: profile.name.clone(),
                field,
                max: MAX_FIELD_CHARS,
            });
        }
    }

    for entry in &profile.vid_pid {
        if !HwId::is_valid_entry(entry) {
            return Err(ValidationError::BadHwId {
                profile: profile.name.clone(),
                value: entry.clone(),
            });
        }
    }

    if profile.vid_pid.len() > MAX_HWIDS_PER_PROFILE {
        return Err(ValidationError::TooManyHwIds {
            profile: profile.name.clone(),
            count: profile.vid_pid.len(),
            max: MAX_HWIDS_PER_PROFILE,
        });
    }

    if !is_layout_id(&profile.layout) {
        return Err(ValidationError::BadLayout {
            profile: profile.name.clone(),
            value: profile.layout.clone(),
        });
    }

    Ok(())
}

/// True if `s` is an 8-hex-digit layout identifier, in any case.
fn is_layout_id(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Rewrite a validated collection into canonical casing: VID/PID entries
/// and layout identifiers uppercase.
pub fn canonicalize(profiles: &mut [KeyboardProfile]) {
    for profile in profiles {
        profile.layout.make_ascii_uppercase();
        for entry in &mut profile.vid_pid {
            if let Some(canonical) = HwId::canonicalize_entry(entry) {
                *entry = canonical;
            }
        }
    }
}

/// Look up a profile by name.
pub fn find_profile<'a>(
    profiles: &'a [KeyboardProfile],
    name: &str,
) -> Option<&'a KeyboardProfile> {
    profiles.iter().find(|p| p.name == name)
}


#[cfg(test)]
mod tests {
    use super::test_support::profile;
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_collection() {
        let profiles = vec![
            profile("US board", "00000409", &["VID_19F5&PID_3247"]),
            profile("FR board", "0000040C", &["VID_046D&PID_C31C", "VID_1234&PID_5678"]),
        ];
        assert!(validate(&profiles).is_ok());
    }

    #[test]
    fn test_validate_accepts_empty_collection() {
        assert!(validate(&[]).is_ok());
    }

    #[test]
    fn test_validate_rejects_too_many_profiles() {
        let profiles: Vec<_> = (0..=MAX_PROFILES)
            .map(|i| profile(&format!("kb-{i}"), "00000409", &[]))
            .collect();
        assert_eq!(profiles.len(), 51);
        assert!(matches!(
            validate(&profiles),
            Err(ValidationError::TooManyProfiles { count: 51, max: 50 })
        ));
    }

    #[test]
    fn test_validate_rejects_long_name() {
        let long = "x".repeat(MAX_FIELD_CHARS + 1);
        let profiles = vec![profile(&long, "00000409", &[])];
        assert!(matches!(
            validate(&profiles),
            Err(ValidationError::FieldTooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_vid_pid_pattern() {
        let profiles = vec![profile("kb", "00000409", &["1234-5678"])];
        let err = validate(&profiles).unwrap_err();
        assert!(matches!(err, ValidationError::BadHwId { .. }));
        assert!(err.to_string().contains("VID_XXXX&PID_YYYY"));
    }

    #[test]
    fn test_validate_rejects_too_many_vid_pid_entries() {
        let entries: Vec<String> = (0..=MAX_HWIDS_PER_PROFILE)
            .map(|i| format!("VID_{i:04X}&PID_{i:04X}"))
            .collect();
        let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
        let profiles = vec![profile("kb", "00000409", &refs)];
        assert!(matches!(
            validate(&profiles),
            Err(ValidationError::TooManyHwIds { count: 11, max: 10, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_layout() {
        for bad in ["0409", "0000040Z", "", "00000409X"] {
            let profiles = vec![profile("kb", bad, &[])];
            assert!(
                matches!(validate(&profiles), Err(ValidationError::BadLayout { .. })),
                "layout {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let profiles = vec![
            profile("same", "00000409", &[]),
            profile("same", "0000040C", &[]),
        ];
        assert!(matches!(
            validate(&profiles),
            Err(ValidationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_missing_field_fails_deserialization() {
        // Field presence is enforced at the parse boundary.
        let json = r#"[{"name":"kb","enabled":true,"connected":false,"active":false,
                        "layout":"00000409","product":"p","vendor":"v"}]"#;
        assert!(serde_json::from_str::<ProfileCollection>(json).is_err());
    }

    #[test]
    fn test_canonicalize_uppercases_entries_and_layout() {
        let mut profiles = vec![profile("kb", "0000040c", &["vid_19f5&pid_3247"])];
        canonicalize(&mut profiles);
        assert_eq!(profiles[0].layout, "0000040C");
        assert_eq!(profiles[0].vid_pid[0], "VID_19F5&PID_3247");
    }

    #[test]
    fn test_find_profile() {
        let profiles = vec![
            profile("A", "00000409", &[]),
            profile("B", "0000040C", &[]),
        ];
        assert_eq!(find_profile(&profiles, "B").unwrap().layout, "0000040C");
        assert!(find_profile(&profiles, "C").is_none());
    }
}
