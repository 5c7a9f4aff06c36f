// src/query/templates.rs

//! Scheme fragments the query builder stitches together.
//!
//! Every query ends by `write`-ing exactly one of:
//! - `illegal-sexp-in-defn` / `parse-error-in-defn`
//! - `illegal-sexp-in-test/answer` / `parse-error-in-test/answer`
//! - `()` when evaluation found no answer
//! - `fail` when the synthesis query found no answer
//! - otherwise the answer itself
//!
//! The classifier depends on these literals.

use crate::document::holes::HOLE_LETTERS;

/// Predicate used by the legality checks in every query.
pub const LEGAL_SEXP_HELPER: &str = "\
(define (barliman-legal-sexp? x)
  (cond
    ((or (symbol? x) (number? x) (boolean? x) (null? x)) #t)
    ((pair? x) (and (barliman-legal-sexp? (car x)) (barliman-legal-sexp? (cdr x))))
    (else #f)))
";

/// `A B C ... Z _`: one logic variable per hole letter plus the wildcard.
pub fn fresh_vars() -> String {
    let mut vars: Vec<String> = HOLE_LETTERS.chars().map(String::from).collect();
    vars.push("_".to_string());
    vars.join(" ")
}

/// Does the definition (followed by `body`) parse?
pub fn parse_definition(name: &str, defns: &str, body: &str) -> String {
    format!(
        "(define parse-ans-{name}\n  (run 1 (q)\n    (fresh ({vars})\n      (parseo `(begin {defns} {body})))))\n",
        vars = fresh_vars(),
    )
}

/// Does `body` parse once the names the definition binds are in scope?
pub fn parse_with_bound_names(name: &str, defns: &str, body: &str) -> String {
    format!(
        "(define parse-with-names-ans-{name}\n  (run 1 (q)\n    (fresh ({vars})\n      (fresh (names dummy-expr)\n        (extract-nameso `({defns}) names)\n        (parseo `((lambda ,names {body}) ,dummy-expr))))))\n",
        vars = fresh_vars(),
    )
}

/// `run 1` over an `evalo` goal, with every hole fresh.
pub fn eval_goal(query_var: &str, defns: &str, body: &str, expected: &str, extra: &str) -> String {
    format!(
        "(run 1 ({query_var})\n  (fresh ({vars})\n    {extra}(evalo `(begin {defns} {body}) {expected})))",
        vars = fresh_vars(),
    )
}

/// Bounded search first; the exhaustive search only if that found nothing.
///
/// The goal text is emitted twice, unchanged; only the search flag differs.
pub fn two_phase(name: &str, goal: &str) -> String {
    format!(
        "(define (sexp-ans-{name})\n  (let ((results-fast\n         (begin\n           (set! allow-incomplete-search? #t)\n           {goal})))\n    (if (null? results-fast)\n        (begin\n          (set! allow-incomplete-search? #f)\n          {goal})\n        results-fast)))\n"
    )
}

/// Definition-level checks, innermost fallback `otherwise`.
pub fn definition_checks(name: &str, defns: &str, otherwise: &str) -> String {
    format!(
        "(cond\n    ((not (barliman-legal-sexp? '({defns}))) 'illegal-sexp-in-defn)\n    ((null? parse-ans-{name}) 'parse-error-in-defn)\n    {otherwise})"
    )
}

/// Example-level checks, slotted after the definition checks.
pub fn example_checks(name: &str, examples: &str, otherwise: &str) -> String {
    format!(
        "((not (barliman-legal-sexp? '({examples}))) 'illegal-sexp-in-test/answer)\n    ((null? parse-with-names-ans-{name}) 'parse-error-in-test/answer)\n    {otherwise}"
    )
}
