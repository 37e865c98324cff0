//! IOD and module requirement tables
//!
//! These types mirror the two JSON documents
//! derived from PS3.3 and PS3.4:
//! the IOD table maps a SOP Class UID to the modules composing the IOD,
//! and the module table maps a module reference
//! to its attributes and their requirement types.
//!
//! Iteration preserves the declared order of the source documents,
//! so validation output is deterministic.
use std::collections::HashMap;
use std::io::Read;

use dicom_core::Tag;
use serde::Deserialize;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

use crate::dictionary::parse_tag_literal;

/// An error which may occur
/// when loading an IOD or module table from JSON.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LoadError {
    /// The specification JSON could not be read or decoded.
    #[snafu(display("Could not decode specification document"))]
    DecodeSpec {
        backtrace: Backtrace,
        source: serde_json::Error,
    },

    /// An entry of the specification document had an unexpected shape.
    #[snafu(display("Malformed record `{}`", key))]
    MalformedRecord {
        key: String,
        backtrace: Backtrace,
        source: serde_json::Error,
    },

    /// A module usage code was not one of `M`, `C` or `U`.
    #[snafu(display("Unknown usage `{}` in module `{}`", code, key))]
    UnknownUsage {
        key: String,
        code: String,
        backtrace: Backtrace,
    },

    /// An attribute type code was not one of `1`, `1C`, `2`, `2C` or `3`.
    #[snafu(display("Unknown attribute type `{}` for `{}`", code, key))]
    UnknownType {
        key: String,
        code: String,
        backtrace: Backtrace,
    },

    /// An attribute key was not a valid `(GGGG,EEEE)` tag.
    #[snafu(display("Invalid attribute tag key `{}`", key))]
    InvalidTagKey { key: String, backtrace: Backtrace },
}

/// How a module takes part in an IOD.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModuleUsage {
    /// `M`: the module is always included.
    Mandatory,
    /// `C`: the module is included when its condition holds.
    Conditional,
    /// `U`: inclusion is at the discretion of the producer.
    UserOption,
}

impl ModuleUsage {
    /// The single letter code of this usage in the standard.
    pub fn code(self) -> &'static str {
        match self {
            ModuleUsage::Mandatory => "M",
            ModuleUsage::Conditional => "C",
            ModuleUsage::UserOption => "U",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(ModuleUsage::Mandatory),
            "C" => Some(ModuleUsage::Conditional),
            "U" => Some(ModuleUsage::UserOption),
            _ => None,
        }
    }
}

/// The requirement type of an attribute within a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttributeType {
    /// `1`: required, must have a value.
    Type1,
    /// `1C`: required under a condition, must have a value when present.
    Type1C,
    /// `2`: required, may be empty.
    Type2,
    /// `2C`: required under a condition, may be empty.
    Type2C,
    /// `3`: optional.
    Type3,
}

impl AttributeType {
    /// The code of this type in the standard.
    pub fn code(self) -> &'static str {
        match self {
            AttributeType::Type1 => "1",
            AttributeType::Type1C => "1C",
            AttributeType::Type2 => "2",
            AttributeType::Type2C => "2C",
            AttributeType::Type3 => "3",
        }
    }

    /// Whether this type carries a condition.
    pub fn is_conditional(self) -> bool {
        matches!(self, AttributeType::Type1C | AttributeType::Type2C)
    }

    /// Whether a present attribute of this type may be zero length.
    pub fn may_be_empty(self) -> bool {
        !matches!(self, AttributeType::Type1 | AttributeType::Type1C)
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(AttributeType::Type1),
            "1C" => Some(AttributeType::Type1C),
            "2" => Some(AttributeType::Type2),
            "2C" => Some(AttributeType::Type2C),
            "3" => Some(AttributeType::Type3),
            _ => None,
        }
    }
}

/// A module reference within an IOD,
/// together with its usage and optional condition text.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEntry {
    /// How the module takes part in the IOD.
    pub usage: ModuleUsage,
    /// The English condition attached to a `C` usage.
    pub condition_text: Option<String>,
}

/// One IOD: a titled, ordered collection of module references.
#[derive(Debug, Clone, PartialEq)]
pub struct IodDescriptor {
    /// The IOD title as in PS3.3 (e.g. `"CT Image"`).
    pub title: String,
    /// The modules composing the IOD, in declared order,
    /// keyed by module reference (e.g. `"C.7-1"`).
    pub modules: Vec<(String, ModuleEntry)>,
}

/// The IOD table: SOP Class UID → IOD descriptor.
#[derive(Debug, Clone, Default)]
pub struct IodSpec {
    iods: HashMap<String, IodDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawModuleEntry {
    usage: String,
    #[serde(default)]
    cond: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttributeEntry {
    #[serde(rename = "type")]
    typ: String,
    #[serde(default)]
    cond: Option<String>,
}

impl IodSpec {
    /// Load the IOD table from its JSON document.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let doc: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).context(DecodeSpecSnafu)?;
        Self::from_document(doc)
    }

    /// Load the IOD table by reading the JSON document from the given source.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, LoadError> {
        let doc: serde_json::Map<String, serde_json::Value> =
            serde_json::from_reader(source).context(DecodeSpecSnafu)?;
        Self::from_document(doc)
    }

    fn from_document(
        doc: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, LoadError> {
        let mut iods = HashMap::with_capacity(doc.len());
        for (uid, body) in doc {
            let title = body
                .get("title")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let mut modules = Vec::new();
            if let Some(serde_json::Value::Object(raw_modules)) = body.get("modules") {
                for (reference, raw) in raw_modules {
                    let raw: RawModuleEntry = serde_json::from_value(raw.clone())
                        .context(MalformedRecordSnafu { key: reference })?;
                    let usage = ModuleUsage::from_code(&raw.usage).context(UnknownUsageSnafu {
                        key: reference,
                        code: &raw.usage,
                    })?;
                    modules.push((
                        reference.clone(),
                        ModuleEntry {
                            usage,
                            condition_text: raw.cond,
                        },
                    ));
                }
            }
            iods.insert(uid, IodDescriptor { title, modules });
        }
        Ok(IodSpec { iods })
    }

    /// Fetch the IOD selected by the given SOP Class UID.
    pub fn get(&self, sop_class_uid: &str) -> Option<&IodDescriptor> {
        self.iods.get(sop_class_uid.trim())
    }

    /// The number of registered IODs.
    pub fn len(&self) -> usize {
        self.iods.len()
    }

    /// Whether the table holds no IODs.
    pub fn is_empty(&self) -> bool {
        self.iods.is_empty()
    }
}

/// The requirement of one attribute within a module.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRequirement {
    /// The requirement type.
    pub typ: AttributeType,
    /// The English condition attached to a `1C`/`2C` type.
    pub condition_text: Option<String>,
}

/// One module: an ordered collection of attribute requirements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleDescriptor {
    /// The attributes of the module, in declared order.
    pub attributes: Vec<(Tag, AttributeRequirement)>,
}

/// The module table: module reference → module descriptor.
#[derive(Debug, Clone, Default)]
pub struct ModuleSpec {
    modules: HashMap<String, ModuleDescriptor>,
}

impl ModuleSpec {
    /// Load the module table from its JSON document.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let doc: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).context(DecodeSpecSnafu)?;
        Self::from_document(doc)
    }

    /// Load the module table by reading the JSON document from the given source.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, LoadError> {
        let doc: serde_json::Map<String, serde_json::Value> =
            serde_json::from_reader(source).context(DecodeSpecSnafu)?;
        Self::from_document(doc)
    }

    fn from_document(
        doc: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, LoadError> {
        let mut modules = HashMap::with_capacity(doc.len());
        for (reference, body) in doc {
            let mut attributes = Vec::new();
            if let serde_json::Value::Object(raw_attributes) = body {
                for (key, raw) in raw_attributes {
                    let tag = parse_tag_literal(&key)
                        .context(InvalidTagKeySnafu { key: &key })?;
                    let raw: RawAttributeEntry = serde_json::from_value(raw)
                        .context(MalformedRecordSnafu { key: &key })?;
                    let typ = AttributeType::from_code(&raw.typ).context(UnknownTypeSnafu {
                        key: &key,
                        code: &raw.typ,
                    })?;
                    attributes.push((
                        tag,
                        AttributeRequirement {
                            typ,
                            condition_text: raw.cond,
                        },
                    ));
                }
            }
            modules.insert(reference, ModuleDescriptor { attributes });
        }
        Ok(ModuleSpec { modules })
    }

    /// Fetch a module descriptor by its reference.
    pub fn get(&self, reference: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(reference)
    }
}
