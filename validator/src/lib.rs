//! This crate validates DICOM data sets against the standard:
//! it resolves the applicable IOD through the SOP Class UID,
//! walks the IOD's modules and their attribute requirements,
//! evaluates the attached conditions against the data set,
//! and produces a categorized [report](ValidationReport).
//!
//! The specification side
//! (dictionary index, IOD and module tables, condition parsing)
//! comes from the `dicom-validator-spec` crate.
//! Data sets are consumed through the read-only [`DatasetView`] contract,
//! which is implemented for
//! [`InMemDicomObject`](dicom_object::InMemDicomObject),
//! so any object read by `dicom-object` can be validated directly.
//!
//! ## Example
//!
//! ```no_run
//! use dicom_validator::IodValidator;
//! use dicom_validator_spec::{DictionaryIndex, IodSpec, ModuleSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dict = DictionaryIndex::from_readers(
//!     std::fs::File::open("dict_info.json")?,
//!     std::fs::File::open("uid_info.json")?,
//! )?;
//! let iods = IodSpec::from_reader(std::fs::File::open("iod_info.json")?)?;
//! let modules = ModuleSpec::from_reader(std::fs::File::open("module_info.json")?)?;
//!
//! let object = dicom_object::open_file("image.dcm")?;
//! let validator = IodValidator::new(&dict, &iods, &modules);
//! let report = validator.validate(&*object);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```
pub mod dataset;
pub mod eval;
pub mod report;
pub mod validator;

pub use crate::dataset::DatasetView;
pub use crate::eval::{evaluate, ConditionOutcome};
pub use crate::report::{Category, ValidationReport};
pub use crate::validator::IodValidator;
