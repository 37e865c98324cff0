//! Read-only data set contract
//!
//! The validator consumes data sets through [`DatasetView`],
//! which keeps it independent of any particular DICOM decoder.
//! An implementation for
//! [`InMemDicomObject`](dicom_object::InMemDicomObject)
//! is provided here;
//! file-backed objects reach it through deref
//! (`validator.validate(&*object)`).
use std::borrow::Cow;

use dicom_core::dictionary::DataDictionary;
use dicom_core::value::Value;
use dicom_core::Tag;
use dicom_object::InMemDicomObject;

/// A read-only view over one data set.
///
/// Emptiness distinguishes a missing attribute
/// from one which is present with zero length.
/// Values are observed in their textual form,
/// which is what the standard's conditions compare against.
pub trait DatasetView {
    /// Whether the attribute is in the data set, even empty.
    fn has(&self, tag: Tag) -> bool;

    /// Whether the attribute is in the data set with zero length.
    fn is_empty(&self, tag: Tag) -> bool;

    /// The number of value elements of the attribute,
    /// or 0 if it is absent or empty.
    fn value_count(&self, tag: Tag) -> usize;

    /// The textual form of one value element of the attribute.
    fn value_at(&self, tag: Tag, index: usize) -> Option<Cow<'_, str>>;

    /// The items of a sequence attribute, empty if it is not a sequence.
    fn items(&self, tag: Tag) -> Vec<&dyn DatasetView>;
}

impl<D> DatasetView for InMemDicomObject<D>
where
    D: DataDictionary + Clone,
{
    fn has(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    fn is_empty(&self, tag: Tag) -> bool {
        self.get(tag)
            .map(|e| e.value().multiplicity() == 0)
            .unwrap_or(false)
    }

    fn value_count(&self, tag: Tag) -> usize {
        let Some(element) = self.get(tag) else {
            return 0;
        };
        match element.value() {
            // a single Str may still hold backslash-separated values
            Value::Primitive(value) => match value.multiplicity() as usize {
                0 => 0,
                1 => value.to_str().split('\\').count(),
                n => n,
            },
            other => other.multiplicity() as usize,
        }
    }

    fn value_at(&self, tag: Tag, index: usize) -> Option<Cow<'_, str>> {
        let element = self.get(tag)?;
        match element.value() {
            Value::Primitive(value) => {
                if value.multiplicity() == 0 {
                    return None;
                }
                let joined = value.to_str();
                if index == 0 && !joined.contains('\\') {
                    return Some(joined);
                }
                // multi-valued primitives are joined with a backslash
                joined
                    .split('\\')
                    .nth(index)
                    .map(|v| Cow::Owned(v.to_owned()))
            }
            _ => None,
        }
    }

    fn items(&self, tag: Tag) -> Vec<&dyn DatasetView> {
        self.get(tag)
            .and_then(|e| e.value().items())
            .map(|items| {
                items
                    .iter()
                    .map(|item| item as &dyn DatasetView)
                    .collect()
            })
            .unwrap_or_default()
    }
}
