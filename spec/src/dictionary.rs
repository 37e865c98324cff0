//! Attribute dictionary index types
//!
//! The [`DictionaryIndex`] is built from the data dictionary JSON
//! (PS3.6 attributes keyed by tag)
//! and the UID registry JSON,
//! and backs every name or tag translation
//! performed by the condition parser and the IOD validator.
//!
//! Name lookup is deliberately lenient:
//! the standard's condition text is inconsistent about attribute names,
//! so the index tolerates embedded tag literals,
//! possessive apostrophe variants,
//! and names which drop the final word
//! (such as _"SOP Class"_ for _"SOP Class UID"_).
use std::collections::HashMap;
use std::io::Read;

use dicom_core::Tag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use snafu::{Backtrace, ResultExt, Snafu};

/// A single record of the attribute dictionary,
/// as found in the data dictionary JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttributeRecord {
    /// The human readable attribute name (e.g. `"Patient's Name"`)
    pub name: String,
    /// The value representation descriptor, as free text
    /// (may be compound, such as `"US or SS"`)
    pub vr: String,
    /// The value multiplicity descriptor (e.g. `"1"`, `"1-n"`)
    pub vm: String,
    /// Extra property flags (e.g. `"RET"` for retired attributes)
    #[serde(default)]
    pub prop: String,
}

/// An error which may occur when building a dictionary index
/// from its JSON sources.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LoadError {
    /// The attribute dictionary JSON could not be read or decoded.
    #[snafu(display("Could not decode attribute dictionary"))]
    DecodeDictionary {
        backtrace: Backtrace,
        source: serde_json::Error,
    },

    /// The UID registry JSON could not be read or decoded.
    #[snafu(display("Could not decode UID registry"))]
    DecodeUids {
        backtrace: Backtrace,
        source: serde_json::Error,
    },

    /// A dictionary key was not a valid `(GGGG,EEEE)` tag.
    #[snafu(display("Invalid attribute tag key `{}`", key))]
    InvalidTagKey { key: String, backtrace: Backtrace },
}

static TAG_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*([0-9A-Fa-f]{4})\s*,\s*([0-9A-Fa-f]{4})\s*\)").expect("invalid tag literal pattern"));

/// Interpret a `(GGGG,EEEE)` literal (hexadecimal, case insensitive).
///
/// Returns `None` if the text is not exactly one tag literal.
pub fn parse_tag_literal(text: &str) -> Option<Tag> {
    let text = text.trim();
    let captures = TAG_LITERAL.captures(text)?;
    let all = captures.get(0)?;
    if all.start() != 0 || all.end() != text.len() {
        return None;
    }
    tag_from_captures(&captures)
}

/// Find the first `(GGGG,EEEE)` literal in free text,
/// returning the tag and the byte range it occupies.
pub(crate) fn find_tag_literal(text: &str) -> Option<(Tag, std::ops::Range<usize>)> {
    let captures = TAG_LITERAL.captures(text)?;
    let all = captures.get(0)?;
    Some((tag_from_captures(&captures)?, all.range()))
}

fn tag_from_captures(captures: &regex::Captures) -> Option<Tag> {
    let group = u16::from_str_radix(&captures[1], 16).ok()?;
    let element = u16::from_str_radix(&captures[2], 16).ok()?;
    Some(Tag(group, element))
}

/// Reduce an attribute name to its canonical lookup form:
/// lowercase, punctuation stripped, whitespace collapsed.
///
/// Hyphens count as word separators,
/// while apostrophes vanish entirely,
/// so `"Patient's Name"` and `"Patients Name"` normalize alike.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '/' {
            pending_space = true;
        }
        // other punctuation (apostrophes, parentheses) is dropped in place
    }
    out
}

/// An immutable index over the attribute dictionary and UID registry.
///
/// Unknown inputs resolve to `None` at lookup time;
/// only construction can fail.
#[derive(Debug, Clone)]
pub struct DictionaryIndex {
    /// tag → dictionary record
    by_tag: HashMap<Tag, AttributeRecord>,
    /// normalized full name → tag
    by_name: HashMap<String, Tag>,
    /// normalized name minus its final word → tag,
    /// `None` when the shortened form is ambiguous
    by_short_name: HashMap<String, Option<Tag>>,
    /// UID → human readable name, merged over all registry categories
    uid_names: HashMap<String, String>,
}

impl DictionaryIndex {
    /// Build an index from the attribute dictionary JSON
    /// (`"(GGGG,EEEE)" → record`)
    /// and the UID registry JSON (`category → {uid → name}`).
    pub fn from_json(dict_info: &str, uid_info: &str) -> Result<Self, LoadError> {
        let entries: HashMap<String, AttributeRecord> =
            serde_json::from_str(dict_info).context(DecodeDictionarySnafu)?;
        let uid_categories: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(uid_info).context(DecodeUidsSnafu)?;
        Self::from_parts(entries, uid_categories)
    }

    /// Build an index by reading both JSON documents from the given sources.
    pub fn from_readers<R, S>(dict_info: R, uid_info: S) -> Result<Self, LoadError>
    where
        R: Read,
        S: Read,
    {
        let entries: HashMap<String, AttributeRecord> =
            serde_json::from_reader(dict_info).context(DecodeDictionarySnafu)?;
        let uid_categories: HashMap<String, HashMap<String, String>> =
            serde_json::from_reader(uid_info).context(DecodeUidsSnafu)?;
        Self::from_parts(entries, uid_categories)
    }

    fn from_parts(
        entries: HashMap<String, AttributeRecord>,
        uid_categories: HashMap<String, HashMap<String, String>>,
    ) -> Result<Self, LoadError> {
        let mut by_tag = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_short_name: HashMap<String, Option<Tag>> = HashMap::new();

        for (key, record) in entries {
            let tag = parse_tag_literal(&key).ok_or_else(|| {
                InvalidTagKeySnafu { key: key.clone() }.build()
            })?;
            let normalized = normalize_name(&record.name);
            if let Some((shortened, _last)) = normalized.rsplit_once(' ') {
                by_short_name
                    .entry(shortened.to_owned())
                    .and_modify(|slot| *slot = None)
                    .or_insert(Some(tag));
            }
            by_name.insert(normalized, tag);
            by_tag.insert(tag, record);
        }

        let mut uid_names = HashMap::new();
        for (_category, uids) in uid_categories {
            uid_names.extend(uids);
        }

        Ok(DictionaryIndex {
            by_tag,
            by_name,
            by_short_name,
            uid_names,
        })
    }

    /// Fetch the dictionary record of an attribute by tag.
    pub fn entry(&self, tag: Tag) -> Option<&AttributeRecord> {
        self.by_tag.get(&tag)
    }

    /// Fetch the human readable name of an attribute by tag.
    pub fn name_of(&self, tag: Tag) -> Option<&str> {
        self.by_tag.get(&tag).map(|record| record.name.as_str())
    }

    /// Resolve free text to an attribute tag.
    ///
    /// The text may be a canonical attribute name,
    /// a name followed by its tag in parentheses
    /// (in which case the literal tag wins),
    /// an apostrophe variant of a name,
    /// or a name missing its final word,
    /// provided that the shortened form is unambiguous.
    pub fn tag_by_name(&self, text: &str) -> Option<Tag> {
        if let Some((tag, _)) = find_tag_literal(text) {
            return Some(tag);
        }
        let normalized = normalize_name(text);
        if normalized.is_empty() {
            return None;
        }
        if let Some(tag) = self.by_name.get(&normalized) {
            return Some(*tag);
        }
        self.by_short_name.get(&normalized).copied().flatten()
    }

    /// Fetch the human readable name of a UID, if registered.
    pub fn uid_name(&self, uid: &str) -> Option<&str> {
        self.uid_names.get(uid.trim()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &str = r#"{
        "(0008,0016)": {"name": "SOP Class UID", "vr": "UI", "vm": "1", "prop": ""},
        "(0008,0060)": {"name": "Modality", "vr": "CS", "vm": "1", "prop": ""},
        "(0010,0010)": {"name": "Patient's Name", "vr": "PN", "vm": "1", "prop": ""},
        "(0010,0040)": {"name": "Patient's Sex", "vr": "CS", "vm": "1", "prop": ""},
        "(0072,0406)": {"name": "Filter-by Operator", "vr": "CS", "vm": "1", "prop": ""}
    }"#;

    const UIDS: &str = r#"{
        "SOP Class": {
            "1.2.840.10008.5.1.4.1.1.2": "CT Image Storage"
        },
        "Transfer Syntax": {
            "1.2.840.10008.1.2.1": "Explicit VR Little Endian"
        }
    }"#;

    fn index() -> DictionaryIndex {
        DictionaryIndex::from_json(DICT, UIDS).expect("fixture dictionary should load")
    }

    #[test]
    fn lookup_by_tag() {
        let index = index();
        let record = index.entry(Tag(0x0008, 0x0060)).expect("Modality entry");
        assert_eq!(record.name, "Modality");
        assert_eq!(record.vr, "CS");
        assert!(index.entry(Tag(0xABCD, 0x1234)).is_none());
    }

    #[test]
    fn lookup_by_exact_name() {
        let index = index();
        assert_eq!(index.tag_by_name("Modality"), Some(Tag(0x0008, 0x0060)));
        assert_eq!(
            index.tag_by_name("Patient's Name"),
            Some(Tag(0x0010, 0x0010))
        );
    }

    #[test]
    fn lookup_tolerates_apostrophe_variants() {
        let index = index();
        assert_eq!(
            index.tag_by_name("Patients Name"),
            Some(Tag(0x0010, 0x0010))
        );
        assert_eq!(index.tag_by_name("Patients Sex"), Some(Tag(0x0010, 0x0040)));
    }

    #[test]
    fn lookup_tolerates_embedded_tag() {
        let index = index();
        assert_eq!(
            index.tag_by_name("Modality (0008,0060)"),
            Some(Tag(0x0008, 0x0060))
        );
        // the literal wins over the name
        assert_eq!(
            index.tag_by_name("Something Else (0008,0016)"),
            Some(Tag(0x0008, 0x0016))
        );
    }

    #[test]
    fn lookup_tolerates_dropped_final_word() {
        let index = index();
        assert_eq!(index.tag_by_name("SOP Class"), Some(Tag(0x0008, 0x0016)));
        // "Patient's" shortens both name and sex entries, so it is ambiguous
        assert_eq!(index.tag_by_name("Patient's"), None);
    }

    #[test]
    fn lookup_hyphenated_name() {
        let index = index();
        assert_eq!(
            index.tag_by_name("Filter-by Operator"),
            Some(Tag(0x0072, 0x0406))
        );
    }

    #[test]
    fn uid_names_are_merged_flat() {
        let index = index();
        assert_eq!(
            index.uid_name("1.2.840.10008.5.1.4.1.1.2"),
            Some("CT Image Storage")
        );
        assert_eq!(
            index.uid_name("1.2.840.10008.1.2.1"),
            Some("Explicit VR Little Endian")
        );
        assert_eq!(index.uid_name("1.2.3"), None);
    }

    #[test]
    fn tag_literal_parsing() {
        assert_eq!(parse_tag_literal("(300A,00E1)"), Some(Tag(0x300A, 0x00E1)));
        assert_eq!(parse_tag_literal("(300a,00e1)"), Some(Tag(0x300A, 0x00E1)));
        assert_eq!(parse_tag_literal("300A,00E1"), None);
        assert_eq!(parse_tag_literal("(300A,00E1) trailing"), None);
    }

    #[test]
    fn malformed_dictionary_fails_construction() {
        let err = DictionaryIndex::from_json("{ not json", "{}").unwrap_err();
        assert!(matches!(err, LoadError::DecodeDictionary { .. }));

        let err = DictionaryIndex::from_json(
            r#"{"bogus": {"name": "X", "vr": "CS", "vm": "1"}}"#,
            "{}",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidTagKey { .. }));
    }
}
