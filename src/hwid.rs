//! VID/PID hardware identifier parsing and normalization.
//!
//! Profiles and OS device paths both carry USB vendor/product identifier
//! pairs, in slightly different spellings. This module owns the one
//! canonical form: four uppercase hex digits per side, rendered as
//! `VID_XXXX&PID_YYYY`.

use std::fmt;

/// A normalized vendor/product identifier pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HwId {
    /// Vendor id, 4 uppercase hex digits.
    pub vid: String,
    /// Product id, 4 uppercase hex digits.
    pub pid: String,
}

impl HwId {
    /// Parse a profile entry of the exact form `VID_XXXX&PID_YYYY`.
    ///
    /// Case-insensitive on input; the result is canonical uppercase.
    /// Returns `None` for anything that does not match the full pattern.
    pub fn parse_entry(s: &str) -> Option<Self> {
        let rest = strip_prefix_ignore_case(s, "VID_")?;
        let (vid, rest) = take_hex4(rest)?;
        let rest = strip_prefix_ignore_case(rest, "&PID_")?;
        let (pid, rest) = take_hex4(rest)?;
        if !rest.is_empty() {
            return None;
        }
        Some(Self { vid, pid })
    }

    /// Find a `vid_XXXX&pid_YYYY` sequence anywhere inside a device path
    /// or registry device-id string, in any case.
    ///
    /// HID device paths look like `\\?\hid#vid_19f5&pid_3247#...`; the
    /// keyboard-class registry reports ids like
    /// `HID\VID_19F5&PID_3247\6&...`. Both carry the same embedded pair.
    pub fn find_in(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let mut search = lower.as_str();
        while let Some(at) = search.find("vid_") {
            let tail = &search[at..];
            if let Some(id) = Self::parse_prefix(tail) {
                return Some(id);
            }
            search = &search[at + 4..];
        }
        None
    }

    /// Parse `vid_XXXX&pid_YYYY` at the start of `s`, ignoring any trailing
    /// text after the pair.
    fn parse_prefix(s: &str) -> Option<Self> {
        let rest = strip_prefix_ignore_case(s, "VID_")?;
        let (vid, rest) = take_hex4(rest)?;
        let rest = strip_prefix_ignore_case(rest, "&PID_")?;
        let (pid, _) = take_hex4(rest)?;
        Some(Self { vid, pid })
    }

    /// True if `s` is a well-formed profile entry (`VID_XXXX&PID_YYYY`).
    pub fn is_valid_entry(s: &str) -> bool {
        Self::parse_entry(s).is_some()
    }

    /// Canonical uppercase spelling of a profile entry, if well-formed.
    pub fn canonicalize_entry(s: &str) -> Option<String> {
        Self::parse_entry(s).map(|id| id.to_string())
    }
}

impl fmt::Display for HwId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VID_{}&PID_{}", self.vid, self.pid)
    }
}

/// Strip `prefix` from the start of `s`, ASCII case-insensitively.
fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Take exactly four hex digits from the start of `s`, uppercased.
fn take_hex4(s: &str) -> Option<(String, &str)> {
    let head = s.get(..4)?;
    if head.chars().all(|c| c.is_ascii_hexdigit()) {
        Some((head.to_ascii_uppercase(), &s[4..]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_canonical() {
        let id = HwId::parse_entry("VID_19F5&PID_3247").unwrap();
        assert_eq!(id.vid, "19F5");
        assert_eq!(id.pid, "3247");
        assert_eq!(id.to_string(), "VID_19F5&PID_3247");
    }

    #[test]
    fn test_parse_entry_case_insensitive() {
        let id = HwId::parse_entry("vid_19f5&pid_3247").unwrap();
        assert_eq!(id.to_string(), "VID_19F5&PID_3247");
    }

    #[test]
    fn test_parse_entry_rejects_bad_shapes() {
        assert!(HwId::parse_entry("1234-5678").is_none());
        assert!(HwId::parse_entry("VID_12345&PID_6789").is_none());
        assert!(HwId::parse_entry("VID_123G&PID_6789").is_none());
        assert!(HwId::parse_entry("VID_1234&PID_5678 ").is_none());
        assert!(HwId::parse_entry("PID_1234&VID_5678").is_none());
        assert!(HwId::parse_entry("").is_none());
    }

    #[test]
    fn test_find_in_device_path() {
        let path = r"\\?\hid#vid_19f5&pid_3247&mi_00#8&2f3a&0&0000#{884b96c3}";
        let id = HwId::find_in(path).unwrap();
        assert_eq!(id.to_string(), "VID_19F5&PID_3247");
    }

    #[test]
    fn test_find_in_registry_device_id() {
        let raw = r"HID\VID_046D&PID_C31C&MI_00\6&1A2B3C4D&0&0000";
        let id = HwId::find_in(raw).unwrap();
        assert_eq!(id.to_string(), "VID_046D&PID_C31C");
    }

    #[test]
    fn test_find_in_skips_false_starts() {
        // A stray "vid_" with no pid after it must not mask a later pair.
        let s = r"ACPI\vid_zzzz\HID\vid_0001&pid_0002";
        let id = HwId::find_in(s).unwrap();
        assert_eq!(id.to_string(), "VID_0001&PID_0002");
    }

    #[test]
    fn test_find_in_none() {
        assert!(HwId::find_in(r"ACPI\PNP0303\4&5289e18&0").is_none());
        assert!(HwId::find_in("").is_none());
    }

    #[test]
    fn test_canonicalize_entry() {
        assert_eq!(
            HwId::canonicalize_entry("vid_00ab&pid_cd12").as_deref(),
            Some("VID_00AB&PID_CD12")
        );
        assert!(HwId::canonicalize_entry("VID_00AB").is_none());
    }
}
