//! Condition evaluation against a data set
//!
//! Evaluation is three-valued:
//! a condition built from text the parser could not fully resolve
//! answers [`Undetermined`](ConditionOutcome::Undetermined),
//! which the validator treats conservatively.
use std::borrow::Cow;

use dicom_validator_spec::condition::{AttributeTest, Operator, Predicate};

use crate::dataset::DatasetView;

/// The outcome of evaluating a condition tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition cannot be decided.
    Undetermined,
}

impl ConditionOutcome {
    fn from_bool(value: bool) -> Self {
        if value {
            ConditionOutcome::True
        } else {
            ConditionOutcome::False
        }
    }

    /// Whether the outcome is [`True`](ConditionOutcome::True).
    pub fn is_true(self) -> bool {
        self == ConditionOutcome::True
    }
}

/// Evaluate a condition tree against a data set.
///
/// This is a pure function of the tree and the attribute values:
/// repeated evaluation returns the same outcome.
pub fn evaluate(predicate: &Predicate, dataset: &dyn DatasetView) -> ConditionOutcome {
    match predicate {
        Predicate::Test(test) => evaluate_test(test, dataset),
        Predicate::AllOf(children) => {
            let mut outcome = ConditionOutcome::True;
            for child in children {
                match evaluate(child, dataset) {
                    ConditionOutcome::False => return ConditionOutcome::False,
                    ConditionOutcome::Undetermined => outcome = ConditionOutcome::Undetermined,
                    ConditionOutcome::True => {}
                }
            }
            outcome
        }
        Predicate::AnyOf(children) => {
            let mut outcome = ConditionOutcome::False;
            for child in children {
                match evaluate(child, dataset) {
                    ConditionOutcome::True => return ConditionOutcome::True,
                    ConditionOutcome::Undetermined => outcome = ConditionOutcome::Undetermined,
                    ConditionOutcome::False => {}
                }
            }
            outcome
        }
        Predicate::Undetermined => ConditionOutcome::Undetermined,
    }
}

fn evaluate_test(test: &AttributeTest, dataset: &dyn DatasetView) -> ConditionOutcome {
    match test.op {
        Operator::Present => ConditionOutcome::from_bool(dataset.has(test.tag)),
        Operator::NotEmpty => {
            ConditionOutcome::from_bool(dataset.has(test.tag) && !dataset.is_empty(test.tag))
        }
        Operator::Absent => ConditionOutcome::from_bool(!dataset.has(test.tag)),
        Operator::EqualTo => match observed_value(test, dataset) {
            Some(actual) => ConditionOutcome::from_bool(
                test.values.iter().any(|v| values_equal(&actual, v)),
            ),
            None => ConditionOutcome::False,
        },
        Operator::NotEqualTo => match observed_value(test, dataset) {
            Some(actual) => ConditionOutcome::from_bool(
                test.values.iter().all(|v| !values_equal(&actual, v)),
            ),
            None => ConditionOutcome::False,
        },
        Operator::GreaterThan => numeric_comparison(test, dataset, |a, b| a > b),
        Operator::LessThan => numeric_comparison(test, dataset, |a, b| a < b),
        Operator::PointsTo => {
            let Some(actual) = dataset.value_at(test.tag, test.index) else {
                return ConditionOutcome::False;
            };
            let Some(expected) = test.values.first() else {
                return ConditionOutcome::False;
            };
            match (pointer_value(&actual), expected.trim().parse::<u32>().ok()) {
                (Some(a), Some(b)) => ConditionOutcome::from_bool(a == b),
                _ => ConditionOutcome::False,
            }
        }
        Operator::Unverifiable => ConditionOutcome::Undetermined,
    }
}

/// The value element under test,
/// with present-but-empty observed as the empty string.
fn observed_value<'a>(
    test: &AttributeTest,
    dataset: &'a dyn DatasetView,
) -> Option<Cow<'a, str>> {
    if !dataset.has(test.tag) {
        return None;
    }
    if dataset.is_empty(test.tag) {
        return Some(Cow::Borrowed(""));
    }
    dataset.value_at(test.tag, test.index)
}

fn numeric_comparison(
    test: &AttributeTest,
    dataset: &dyn DatasetView,
    compare: impl Fn(f64, f64) -> bool,
) -> ConditionOutcome {
    let Some(actual) = dataset.value_at(test.tag, test.index) else {
        return ConditionOutcome::False;
    };
    let Some(expected) = test.values.first() else {
        return ConditionOutcome::False;
    };
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => ConditionOutcome::from_bool(compare(a, b)),
        _ => ConditionOutcome::False,
    }
}

/// Read an attribute tag value as its packed 32-bit form.
/// Accepts both a plain number and the `(GGGG,EEEE)` rendering.
fn pointer_value(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(number) = text.parse::<u32>() {
        return Some(number);
    }
    dicom_validator_spec::dictionary::parse_tag_literal(text)
        .map(|tag| ((tag.group() as u32) << 16) | tag.element() as u32)
}

/// String comparison with whitespace trimmed,
/// falling back to numeric equality when both sides are numbers.
fn values_equal(actual: &str, expected: &str) -> bool {
    let (actual, expected) = (actual.trim(), expected.trim());
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::Tag;
    use std::collections::HashMap;

    /// Minimal map-backed data set for evaluator tests.
    #[derive(Debug, Default)]
    struct TestDataset {
        values: HashMap<Tag, Vec<String>>,
    }

    impl TestDataset {
        fn with(mut self, tag: Tag, values: &[&str]) -> Self {
            self.values
                .insert(tag, values.iter().map(|v| v.to_string()).collect());
            self
        }

        fn with_empty(mut self, tag: Tag) -> Self {
            self.values.insert(tag, Vec::new());
            self
        }
    }

    impl DatasetView for TestDataset {
        fn has(&self, tag: Tag) -> bool {
            self.values.contains_key(&tag)
        }

        fn is_empty(&self, tag: Tag) -> bool {
            self.values.get(&tag).map(Vec::is_empty).unwrap_or(false)
        }

        fn value_count(&self, tag: Tag) -> usize {
            self.values.get(&tag).map(Vec::len).unwrap_or(0)
        }

        fn value_at(&self, tag: Tag, index: usize) -> Option<Cow<'_, str>> {
            self.values
                .get(&tag)?
                .get(index)
                .map(|v| Cow::Borrowed(v.as_str()))
        }

        fn items(&self, _tag: Tag) -> Vec<&dyn DatasetView> {
            Vec::new()
        }
    }

    const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
    const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);

    fn test(op: Operator, index: usize, values: &[&str]) -> Predicate {
        Predicate::Test(AttributeTest {
            tag: IMAGE_TYPE,
            index,
            op,
            values: values.iter().map(|v| v.to_string()).collect(),
        })
    }

    #[test]
    fn presence_operators() {
        let present = TestDataset::default().with(IMAGE_TYPE, &["ORIGINAL"]);
        let empty = TestDataset::default().with_empty(IMAGE_TYPE);
        let absent = TestDataset::default();

        let p = test(Operator::Present, 0, &[]);
        assert_eq!(evaluate(&p, &present), ConditionOutcome::True);
        assert_eq!(evaluate(&p, &empty), ConditionOutcome::True);
        assert_eq!(evaluate(&p, &absent), ConditionOutcome::False);

        let ne = test(Operator::NotEmpty, 0, &[]);
        assert_eq!(evaluate(&ne, &present), ConditionOutcome::True);
        assert_eq!(evaluate(&ne, &empty), ConditionOutcome::False);
        assert_eq!(evaluate(&ne, &absent), ConditionOutcome::False);

        let a = test(Operator::Absent, 0, &[]);
        assert_eq!(evaluate(&a, &present), ConditionOutcome::False);
        assert_eq!(evaluate(&a, &absent), ConditionOutcome::True);
    }

    #[test]
    fn equality_uses_the_indexed_value() {
        let dataset = TestDataset::default().with(IMAGE_TYPE, &["ORIGINAL", "PRIMARY", "GATED"]);
        let eq = test(Operator::EqualTo, 2, &["GATED", "GATED TOMO"]);
        assert_eq!(evaluate(&eq, &dataset), ConditionOutcome::True);
        let eq_wrong_index = test(Operator::EqualTo, 0, &["GATED"]);
        assert_eq!(evaluate(&eq_wrong_index, &dataset), ConditionOutcome::False);
        // absent attribute fails both equality directions
        let absent = TestDataset::default();
        assert_eq!(evaluate(&eq, &absent), ConditionOutcome::False);
        let ne = test(Operator::NotEqualTo, 2, &["GATED"]);
        assert_eq!(evaluate(&ne, &absent), ConditionOutcome::False);
        assert_eq!(evaluate(&ne, &dataset), ConditionOutcome::False);
        let ne2 = test(Operator::NotEqualTo, 2, &["RECON"]);
        assert_eq!(evaluate(&ne2, &dataset), ConditionOutcome::True);
    }

    #[test]
    fn zero_length_literals() {
        let empty = TestDataset::default().with_empty(IMAGE_TYPE);
        let filled = TestDataset::default().with(IMAGE_TYPE, &["X"]);
        let eq_empty = test(Operator::EqualTo, 0, &[""]);
        assert_eq!(evaluate(&eq_empty, &empty), ConditionOutcome::True);
        assert_eq!(evaluate(&eq_empty, &filled), ConditionOutcome::False);
        let ne_empty = test(Operator::NotEqualTo, 0, &[""]);
        assert_eq!(evaluate(&ne_empty, &empty), ConditionOutcome::False);
        assert_eq!(evaluate(&ne_empty, &filled), ConditionOutcome::True);
    }

    #[test]
    fn numeric_comparison_and_equality() {
        let dataset = TestDataset::default().with(NUMBER_OF_FRAMES, &["16"]);
        let gt = Predicate::Test(AttributeTest {
            tag: NUMBER_OF_FRAMES,
            index: 0,
            op: Operator::GreaterThan,
            values: vec!["1".into()],
        });
        assert_eq!(evaluate(&gt, &dataset), ConditionOutcome::True);
        let lt = Predicate::Test(AttributeTest {
            tag: NUMBER_OF_FRAMES,
            index: 0,
            op: Operator::LessThan,
            values: vec!["1".into()],
        });
        assert_eq!(evaluate(&lt, &dataset), ConditionOutcome::False);

        // "016" and "16" are numerically equal
        let eq = Predicate::Test(AttributeTest {
            tag: NUMBER_OF_FRAMES,
            index: 0,
            op: Operator::EqualTo,
            values: vec!["016".into()],
        });
        assert_eq!(evaluate(&eq, &dataset), ConditionOutcome::True);

        // non-numeric comparison operand never holds
        let text = TestDataset::default().with(NUMBER_OF_FRAMES, &["MANY"]);
        assert_eq!(evaluate(&gt, &text), ConditionOutcome::False);
    }

    #[test]
    fn pointer_comparison() {
        let by_number = TestDataset::default().with(NUMBER_OF_FRAMES, &["1581058"]);
        let by_tag_text = TestDataset::default().with(NUMBER_OF_FRAMES, &["(0018,2002)"]);
        let points = Predicate::Test(AttributeTest {
            tag: NUMBER_OF_FRAMES,
            index: 0,
            op: Operator::PointsTo,
            values: vec!["1581058".into()],
        });
        assert_eq!(evaluate(&points, &by_number), ConditionOutcome::True);
        assert_eq!(evaluate(&points, &by_tag_text), ConditionOutcome::True);
        assert_eq!(
            evaluate(&points, &TestDataset::default()),
            ConditionOutcome::False
        );
    }

    #[test]
    fn composite_outcomes() {
        let dataset = TestDataset::default().with(IMAGE_TYPE, &["ORIGINAL"]);
        let yes = test(Operator::Present, 0, &[]);
        let no = test(Operator::Absent, 0, &[]);
        let unknown = Predicate::Undetermined;

        let all = Predicate::AllOf(vec![yes.clone(), no.clone()]);
        assert_eq!(evaluate(&all, &dataset), ConditionOutcome::False);
        let all_unknown = Predicate::AllOf(vec![yes.clone(), unknown.clone()]);
        assert_eq!(evaluate(&all_unknown, &dataset), ConditionOutcome::Undetermined);

        let any = Predicate::AnyOf(vec![no.clone(), yes.clone()]);
        assert_eq!(evaluate(&any, &dataset), ConditionOutcome::True);
        let any_unknown = Predicate::AnyOf(vec![no.clone(), unknown]);
        assert_eq!(evaluate(&any_unknown, &dataset), ConditionOutcome::Undetermined);
        let any_false = Predicate::AnyOf(vec![no.clone(), no]);
        assert_eq!(evaluate(&any_false, &dataset), ConditionOutcome::False);
    }

    #[test]
    fn adding_attributes_never_unsets_a_positive_match() {
        // monotonicity of `=` and `+` under dataset growth
        let smaller = TestDataset::default().with(IMAGE_TYPE, &["ORIGINAL"]);
        let larger = TestDataset::default()
            .with(IMAGE_TYPE, &["ORIGINAL"])
            .with(NUMBER_OF_FRAMES, &["2"]);
        let eq = test(Operator::EqualTo, 0, &["ORIGINAL"]);
        let present = test(Operator::Present, 0, &[]);
        for predicate in [eq, present] {
            assert_eq!(evaluate(&predicate, &smaller), ConditionOutcome::True);
            assert_eq!(evaluate(&predicate, &larger), ConditionOutcome::True);
        }
    }
}
