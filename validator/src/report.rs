//! Validation report assembly
//!
//! A report is either fatal
//! (validation could not start, e.g. no SOP Class UID)
//! or a set of per-category tag lists.
//! Tags are deduplicated and kept sorted,
//! so repeated validation of the same data set
//! serializes identically.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dicom_core::Tag;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A diagnostic category of the validation report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    /// A required attribute is absent, or empty where a value is required.
    Missing,
    /// A required attribute is present with zero length.
    Empty,
    /// An attribute is present although its governing condition forbids it.
    NotAllowed,
}

impl Category {
    /// The category name as it appears in the serialized report.
    pub fn label(self) -> &'static str {
        match self {
            Category::Missing => "missing",
            Category::Empty => "empty",
            Category::NotAllowed => "not allowed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The outcome of validating one data set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    fatal: Option<String>,
    categories: BTreeMap<Category, BTreeSet<Tag>>,
}

impl ValidationReport {
    /// Create an empty (conformant) report.
    pub fn new() -> Self {
        ValidationReport::default()
    }

    /// Create a fatal report with the given reason.
    /// A fatal report carries no further diagnostics.
    pub fn fatal(reason: impl Into<String>) -> Self {
        ValidationReport {
            fatal: Some(reason.into()),
            categories: BTreeMap::new(),
        }
    }

    /// The reason validation was aborted, if it was.
    pub fn fatal_reason(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    /// Whether validation was aborted.
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    /// Record one offending attribute.
    pub fn note(&mut self, category: Category, tag: Tag) {
        self.categories.entry(category).or_default().insert(tag);
    }

    /// Whether the given attribute was recorded under the given category.
    pub fn contains(&self, category: Category, tag: Tag) -> bool {
        self.categories
            .get(&category)
            .map(|tags| tags.contains(&tag))
            .unwrap_or(false)
    }

    /// Whether any attribute was recorded under the given category.
    pub fn has_any(&self, category: Category) -> bool {
        self.categories
            .get(&category)
            .map(|tags| !tags.is_empty())
            .unwrap_or(false)
    }

    /// The offending attributes of one category, in tag order.
    pub fn tags(&self, category: Category) -> impl Iterator<Item = Tag> + '_ {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|tags| tags.iter().copied())
    }

    /// Whether the data set passed without any diagnostic.
    pub fn is_conformant(&self) -> bool {
        self.fatal.is_none() && self.categories.values().all(BTreeSet::is_empty)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries = usize::from(self.fatal.is_some())
            + self.categories.values().filter(|tags| !tags.is_empty()).count();
        let mut map = serializer.serialize_map(Some(entries))?;
        if let Some(reason) = &self.fatal {
            map.serialize_entry("fatal", reason)?;
        }
        for (category, tags) in &self.categories {
            if tags.is_empty() {
                continue;
            }
            let rendered: Vec<String> = tags.iter().map(Tag::to_string).collect();
            map.serialize_entry(category.label(), &rendered)?;
        }
        map.end()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.fatal {
            return write!(f, "fatal: {}", reason);
        }
        if self.is_conformant() {
            return f.write_str("no errors");
        }
        let mut first = true;
        for (category, tags) in &self.categories {
            if tags.is_empty() {
                continue;
            }
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}:", category)?;
            for tag in tags {
                write!(f, " {}", tag)?;
            }
        }
        Ok(())
    }
}
