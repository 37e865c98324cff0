//! IOD validation
//!
//! The validator resolves the IOD governing a data set
//! through its SOP Class UID,
//! walks the IOD's modules in declared order,
//! decides module inclusion from usage and condition,
//! and classifies every attribute of the included modules
//! against its requirement type.
//!
//! Validation never fails once the SOP class is resolved:
//! specification oddities degrade conservatively
//! and everything else accumulates in the report.
use std::sync::Arc;

use dicom_core::Tag;
use dicom_validator_spec::condition::{Condition, ConditionCache, ConditionKind, ConditionParser};
use dicom_validator_spec::dictionary::DictionaryIndex;
use dicom_validator_spec::iod::{
    AttributeType, IodSpec, ModuleDescriptor, ModuleSpec, ModuleUsage,
};

use crate::dataset::DatasetView;
use crate::eval::{evaluate, ConditionOutcome};
use crate::report::{Category, ValidationReport};

const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);

/// How an attribute stands in the data set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Presence {
    Absent,
    Empty,
    WithValue,
}

/// Validates data sets against preloaded IOD and module tables.
///
/// The validator is immutable with respect to its inputs
/// and may be shared across threads;
/// parsed conditions are memoized internally.
#[derive(Debug)]
pub struct IodValidator<'s> {
    dict: &'s DictionaryIndex,
    iods: &'s IodSpec,
    modules: &'s ModuleSpec,
    cache: ConditionCache,
}

impl<'s> IodValidator<'s> {
    /// Create a validator over the given specification tables.
    pub fn new(dict: &'s DictionaryIndex, iods: &'s IodSpec, modules: &'s ModuleSpec) -> Self {
        IodValidator {
            dict,
            iods,
            modules,
            cache: ConditionCache::new(),
        }
    }

    /// Validate one data set,
    /// producing a categorized report owned by the caller.
    pub fn validate(&self, dataset: &dyn DatasetView) -> ValidationReport {
        let Some(uid) = dataset.value_at(SOP_CLASS_UID, 0) else {
            return ValidationReport::fatal("missing SOP Class UID");
        };
        let uid = uid.trim().trim_end_matches('\0').to_owned();
        let Some(iod) = self.iods.get(&uid) else {
            return ValidationReport::fatal(format!("unknown SOP Class UID {}", uid));
        };
        tracing::debug!(
            sop_class = %self.dict.uid_name(&uid).unwrap_or(&uid),
            title = %iod.title,
            "validating data set"
        );

        let parser = ConditionParser::new(self.dict);
        let mut report = ValidationReport::new();
        for (reference, entry) in &iod.modules {
            let Some(module) = self.modules.get(reference) else {
                tracing::warn!(module = %reference, "module reference not in module table");
                continue;
            };
            match entry.usage {
                ModuleUsage::Mandatory => {
                    self.check_module(&parser, module, dataset, &mut report);
                }
                // attributes of user option modules are never reported
                ModuleUsage::UserOption => {}
                ModuleUsage::Conditional => {
                    let condition = self.module_condition(&parser, entry.condition_text.as_deref());
                    match evaluate(&condition.predicate, dataset) {
                        // undetermined includes the module, conservatively
                        ConditionOutcome::True | ConditionOutcome::Undetermined => {
                            self.check_module(&parser, module, dataset, &mut report);
                        }
                        ConditionOutcome::False => {
                            self.check_excluded_module(module, &condition, dataset, &mut report);
                        }
                    }
                }
            }
        }
        report
    }

    fn module_condition(
        &self,
        parser: &ConditionParser<'_>,
        condition_text: Option<&str>,
    ) -> Arc<Condition> {
        match condition_text {
            Some(text) => self.cache.get_or_parse(parser, text),
            None => {
                // a conditional module without text degrades to user defined
                Arc::new(Condition::user_defined())
            }
        }
    }

    /// Check every attribute of an included module.
    fn check_module(
        &self,
        parser: &ConditionParser<'_>,
        module: &ModuleDescriptor,
        dataset: &dyn DatasetView,
        report: &mut ValidationReport,
    ) {
        for (tag, requirement) in &module.attributes {
            let presence = presence_of(dataset, *tag);
            match requirement.typ {
                AttributeType::Type1 => {
                    self.check_required(*tag, presence, report);
                }
                AttributeType::Type2 => {
                    self.check_required_may_be_empty(*tag, presence, report);
                }
                AttributeType::Type3 => {}
                AttributeType::Type1C | AttributeType::Type2C => {
                    let Some(text) = requirement.condition_text.as_deref() else {
                        continue;
                    };
                    let condition = self.cache.get_or_parse(parser, text);
                    match evaluate(&condition.predicate, dataset) {
                        ConditionOutcome::True => {
                            if requirement.typ == AttributeType::Type1C {
                                self.check_required(*tag, presence, report);
                            } else {
                                self.check_required_may_be_empty(*tag, presence, report);
                            }
                        }
                        ConditionOutcome::False => {
                            if presence != Presence::Absent
                                && !allowed_despite_failed_condition(&condition, dataset)
                            {
                                report.note(Category::NotAllowed, *tag);
                            }
                        }
                        ConditionOutcome::Undetermined => {}
                    }
                }
            }
        }
    }

    fn check_required(&self, tag: Tag, presence: Presence, report: &mut ValidationReport) {
        match presence {
            Presence::WithValue => {}
            Presence::Empty => {
                report.note(Category::Empty, tag);
                report.note(Category::Missing, tag);
            }
            Presence::Absent => report.note(Category::Missing, tag),
        }
    }

    fn check_required_may_be_empty(
        &self,
        tag: Tag,
        presence: Presence,
        report: &mut ValidationReport,
    ) {
        if presence == Presence::Absent {
            report.note(Category::Missing, tag);
        }
    }

    /// A conditional module whose condition does not hold:
    /// attributes present anyway are not allowed,
    /// unless the condition grants optional presence.
    fn check_excluded_module(
        &self,
        module: &ModuleDescriptor,
        condition: &Condition,
        dataset: &dyn DatasetView,
        report: &mut ValidationReport,
    ) {
        if allowed_despite_failed_condition(condition, dataset) {
            return;
        }
        for (tag, _) in &module.attributes {
            if dataset.has(*tag) {
                report.note(Category::NotAllowed, *tag);
            }
        }
    }
}

/// Whether presence remains acceptable when the condition is false:
/// `MU` always allows it,
/// `MC` allows it when the sibling condition holds.
fn allowed_despite_failed_condition(condition: &Condition, dataset: &dyn DatasetView) -> bool {
    match condition.kind {
        ConditionKind::MandatoryOrUser => true,
        ConditionKind::MandatoryOrConditional => condition
            .other_condition
            .as_ref()
            .map(|other| evaluate(other, dataset).is_true())
            .unwrap_or(false),
        ConditionKind::MandatoryOrNotAllowed => false,
        ConditionKind::Mandatory | ConditionKind::UserDefined => true,
    }
}

fn presence_of(dataset: &dyn DatasetView, tag: Tag) -> Presence {
    if !dataset.has(tag) {
        Presence::Absent
    } else if dataset.is_empty(tag) {
        Presence::Empty
    } else {
        Presence::WithValue
    }
}
