//! Fixed-width hierarchical administrative codes.
//!
//! A code is the left-zero-padded concatenation district(2) + municipality(2)
//! + parish(2), optionally extended with section(3) + subsection(2). It is a
//! lookup key into the file-partitioned auxiliary datasets and is never
//! computed arithmetically, which is why it lives in a string: leading zeros
//! are significant.

use std::fmt;

use serde::Serialize;

/// A derived administrative code: 6 digits (parish), or 11 digits when
/// extended with the statistical section and subsection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CompositeCode(String);

impl CompositeCode {
    /// Derive the 6-digit parish code from a raw `Dicofre` value.
    ///
    /// Numeric strings shorter than six characters are left-padded (sources
    /// that store the code as a number drop the leading zero). Anything that
    /// is not 1–6 ASCII digits is malformed and yields no code.
    #[must_use]
    pub fn parish(dicofre: &str) -> Option<Self> {
        let raw = dicofre.trim();
        if raw.is_empty() || raw.len() > 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(format!("{raw:0>6}")))
    }

    /// Build the parish code from already-split numeric levels.
    #[must_use]
    pub fn from_levels(district: u8, municipality: u8, parish: u8) -> Self {
        Self(format!("{district:02}{municipality:02}{parish:02}"))
    }

    /// Extend a parish code with the statistical section (3 digits) and
    /// subsection (2 digits). Only a 6-digit base can be extended.
    #[must_use]
    pub fn with_subsection(&self, section: &str, subsection: &str) -> Option<Self> {
        if self.0.len() != 6 {
            return None;
        }
        let section = pad_digits(section, 3)?;
        let subsection = pad_digits(subsection, 2)?;
        Some(Self(format!("{}{section}{subsection}", self.0)))
    }

    /// District key, 2 digits.
    #[must_use]
    pub fn district_key(&self) -> &str {
        &self.0[..2]
    }

    /// Municipality file key (district + municipality), 4 digits.
    #[must_use]
    pub fn municipality_key(&self) -> &str {
        &self.0[..4]
    }

    /// Parish file key, 6 digits.
    #[must_use]
    pub fn parish_key(&self) -> &str {
        &self.0[..6]
    }

    /// Whether the code carries the section/subsection extension.
    #[must_use]
    pub fn has_subsection(&self) -> bool {
        self.0.len() == 11
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn pad_digits(raw: &str, width: usize) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > width || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{raw:0>width$}"))
}

impl fmt::Display for CompositeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_parish_code_with_padding() {
        assert_eq!(CompositeCode::parish("060401").unwrap().as_str(), "060401");
        // A numeric source dropped the leading zero.
        assert_eq!(CompositeCode::parish("60401").unwrap().as_str(), "060401");
    }

    #[test]
    fn malformed_input_yields_no_code() {
        assert!(CompositeCode::parish("").is_none());
        assert!(CompositeCode::parish("06-04").is_none());
        assert!(CompositeCode::parish("0604011").is_none());
        assert!(CompositeCode::parish("abc").is_none());
    }

    #[test]
    fn extension_is_fixed_width() {
        let code = CompositeCode::parish("060401").unwrap();
        let full = code.with_subsection("1", "1").unwrap();
        assert_eq!(full.as_str(), "06040100101");
        assert!(full.has_subsection());
        // Already extended codes cannot be extended again.
        assert!(full.with_subsection("001", "01").is_none());
    }

    #[test]
    fn keys_slice_the_hierarchy() {
        let code = CompositeCode::parish("060401").unwrap();
        assert_eq!(code.district_key(), "06");
        assert_eq!(code.municipality_key(), "0604");
        assert_eq!(code.parish_key(), "060401");
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = CompositeCode::from_levels(6, 4, 1);
        let b = CompositeCode::parish("060401").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.with_subsection("001", "01"),
            b.with_subsection("001", "01")
        );
    }
}
