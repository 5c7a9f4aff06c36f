// src/query/builder.rs

//! Turns a document snapshot and a query kind into a complete script.

use std::sync::Arc;

use thiserror::Error;

use crate::document::DocumentSnapshot;
use crate::query::preamble::Preamble;
use crate::query::templates;
use crate::types::{QueryKind, SlotIndex};

/// The requested kind cannot be built from this snapshot.
///
/// The scheduler only asks for buildable kinds, so seeing one of these at
/// runtime means the scheduler's own bookkeeping is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("test {0} is incomplete; no query can be built for it")]
    IncompleteSlot(SlotIndex),

    #[error("no test is complete; there is nothing to synthesize against")]
    NoCompleteSlots,
}

/// Pure, deterministic query construction.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    preamble: Arc<str>,
}

impl QueryBuilder {
    pub fn new(preamble: &Preamble) -> Self {
        Self {
            preamble: Arc::from(preamble.render()),
        }
    }

    pub fn build(&self, snapshot: &DocumentSnapshot, kind: QueryKind) -> Result<String, BuildError> {
        let body = match kind {
            QueryKind::Simple => simple_query(snapshot.definition_text()),
            QueryKind::PerTest(slot) => {
                if !snapshot.is_complete(slot) {
                    return Err(BuildError::IncompleteSlot(slot));
                }
                let test = snapshot.test(slot);
                per_test_query(
                    &kind.label(),
                    snapshot.definition_text(),
                    test.input.trim(),
                    test.expected.trim(),
                )
            }
            QueryKind::AllTests => {
                let pairs: Vec<(&str, &str)> = snapshot
                    .complete_slots()
                    .into_iter()
                    .map(|s| {
                        let t = snapshot.test(s);
                        (t.input.trim(), t.expected.trim())
                    })
                    .collect();
                if pairs.is_empty() {
                    return Err(BuildError::NoCompleteSlots);
                }
                all_tests_query(snapshot.definition_text(), &pairs)
            }
        };

        let mut script = String::with_capacity(self.preamble.len() + body.len() + 1);
        script.push_str(&self.preamble);
        script.push('\n');
        script.push_str(&body);
        Ok(script)
    }
}

fn simple_query(defns: &str) -> String {
    let name = "simple";
    let goal = templates::eval_goal("q", defns, ",_", "q", "");
    format!(
        ";; simple query\n\n{helper}\n{parse}\n{eval}\n(write\n  {checks})\n",
        helper = templates::LEGAL_SEXP_HELPER,
        parse = templates::parse_definition(name, defns, ",_"),
        eval = templates::two_phase(name, &goal),
        checks = templates::definition_checks(name, defns, &format!("(else (sexp-ans-{name}))")),
    )
}

fn per_test_query(name: &str, defns: &str, input: &str, expected: &str) -> String {
    let goal = templates::eval_goal("q", defns, input, expected, "");
    let otherwise = templates::example_checks(
        name,
        &format!("{input} {expected}"),
        &format!("(else (sexp-ans-{name}))"),
    );
    format!(
        ";; {name} query\n\n{helper}\n{parse}\n{parse_names}\n{eval}\n(write\n  {checks})\n",
        helper = templates::LEGAL_SEXP_HELPER,
        parse = templates::parse_definition(name, defns, ",_"),
        parse_names = templates::parse_with_bound_names(name, defns, input),
        eval = templates::two_phase(name, &goal),
        checks = templates::definition_checks(name, defns, &otherwise),
    )
}

fn all_tests_query(defns: &str, pairs: &[(&str, &str)]) -> String {
    let name = "alltests";
    let inputs = pairs.iter().map(|(i, _)| *i).collect::<Vec<_>>().join(" ");
    let outputs = pairs.iter().map(|(_, o)| *o).collect::<Vec<_>>().join(" ");
    let body = format!("(list {inputs})");
    let expected = format!("(list {outputs})");

    // One conjunctive goal over every example; the answer is the definition
    // itself with the holes bound.
    let goal = templates::eval_goal(
        "defns",
        defns,
        &body,
        &expected,
        &format!("(== `({defns}) defns)\n    "),
    );
    let otherwise = templates::example_checks(
        name,
        &format!("{inputs} {outputs}"),
        &format!("(else (let ((ans (sexp-ans-{name}))) (if (null? ans) 'fail ans)))"),
    );
    format!(
        ";; all-tests query\n\n{helper}\n{parse}\n{parse_names}\n{eval}\n(let ((outcome\n  {checks}))\n  (if (symbol? outcome)\n      (write outcome)\n      (for-each pretty-print (car outcome))))\n",
        helper = templates::LEGAL_SEXP_HELPER,
        parse = templates::parse_definition(name, defns, ",_"),
        parse_names = templates::parse_with_bound_names(name, defns, &body),
        eval = templates::two_phase(name, &goal),
        checks = templates::definition_checks(name, defns, &otherwise),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TestSlot;
    use crate::types::TEST_SLOT_COUNT;

    const DEFN: &str = "(define ,A (lambda ,B ,C))";

    fn builder() -> QueryBuilder {
        QueryBuilder::new(&Preamble::new("/mk/mk-vicare.scm", "/mk/mk.scm", ";; interp"))
    }

    fn snapshot(tests: &[(usize, &str, &str)]) -> DocumentSnapshot {
        let mut slots: [TestSlot; TEST_SLOT_COUNT] = Default::default();
        for (i, input, expected) in tests {
            slots[*i] = TestSlot::new(*input, *expected);
        }
        DocumentSnapshot::new(DEFN, slots)
    }

    fn slot(i: usize) -> SlotIndex {
        SlotIndex::new(i).unwrap()
    }

    #[test]
    fn every_script_starts_with_the_preamble() {
        let snap = snapshot(&[(0, "(f '() '5)", "5")]);
        for kind in [QueryKind::Simple, QueryKind::PerTest(slot(0)), QueryKind::AllTests] {
            let script = builder().build(&snap, kind).unwrap();
            assert!(script.starts_with("(load \"/mk/mk-vicare.scm\")\n(load \"/mk/mk.scm\")\n;; interp\n"));
        }
    }

    #[test]
    fn simple_query_parses_definition_with_wildcard_body() {
        let script = builder().build(&snapshot(&[]), QueryKind::Simple).unwrap();
        assert!(script.contains(&format!("(parseo `(begin {DEFN} ,_))")));
        assert!(script.contains(&format!("(evalo `(begin {DEFN} ,_) q)")));
        assert!(script.contains("'illegal-sexp-in-defn"));
        assert!(script.contains("'parse-error-in-defn"));
        assert!(!script.contains("test/answer"));
    }

    #[test]
    fn per_test_query_uses_that_slot_only() {
        let snap = snapshot(&[(0, "(f '() '5)", "5"), (3, "(f '(a) '6)", "'(a . 6)")]);
        let script = builder().build(&snap, QueryKind::PerTest(slot(3))).unwrap();
        assert!(script.starts_with("(load"));
        assert!(script.contains(";; test-4 query"));
        assert!(script.contains(&format!("(evalo `(begin {DEFN} (f '(a) '6)) '(a . 6))")));
        assert!(script.contains("(extract-nameso"));
        assert!(!script.contains("(f '() '5)"));
    }

    #[test]
    fn per_test_on_incomplete_slot_is_a_build_error() {
        let snap = snapshot(&[(1, "(f 1)", "   ")]);
        let err = builder().build(&snap, QueryKind::PerTest(slot(1))).unwrap_err();
        assert_eq!(err, BuildError::IncompleteSlot(slot(1)));
    }

    #[test]
    fn all_tests_is_one_conjunctive_goal_over_complete_slots() {
        let snap = snapshot(&[
            (0, "(f '() '5)", "5"),
            (2, "(f '(a) '6)", "'(a . 6)"),
            (4, "(f 'ignored)", ""),
        ]);
        let script = builder().build(&snap, QueryKind::AllTests).unwrap();
        let goal = format!("(evalo `(begin {DEFN} (list (f '() '5) (f '(a) '6))) (list 5 '(a . 6)))");
        // Once per search phase, never split per test.
        assert_eq!(script.matches(&goal).count(), 2);
        assert_eq!(script.matches("(evalo ").count(), 2);
        assert!(!script.contains("ignored"));
        assert!(script.contains("'fail"));
    }

    #[test]
    fn all_tests_without_complete_slots_is_a_build_error() {
        let err = builder().build(&snapshot(&[]), QueryKind::AllTests).unwrap_err();
        assert_eq!(err, BuildError::NoCompleteSlots);
    }

    #[test]
    fn output_is_deterministic() {
        let snap = snapshot(&[(0, "(f '() '5)", "5")]);
        let b = builder();
        for kind in QueryKind::all().filter(|k| *k != QueryKind::PerTest(slot(1))) {
            if let Ok(first) = b.build(&snap, kind) {
                assert_eq!(first, b.build(&snap, kind).unwrap());
            }
        }
    }
}
