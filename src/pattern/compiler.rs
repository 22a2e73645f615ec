//! Lowers a parsed [`crate::ast::Program`] into a [`PatternRegistry`]
//! (spec.md §4.5).
//!
//! Each `alpha_block` yields one [`Pattern`]; each `gamma_block` across
//! all of its `beta_block`s yields one [`Rule`], dispatched on the
//! `gamma_block`'s camelCase key. `from` and `format` are not
//! independent rule kinds (spec.md §3 lists only seven `Rule` variants)
//! — they patch the most recently compiled `pluck`/`cook` rule in the
//! same pattern, which is the reading that keeps the rule count in §3
//! and the key list in §4.5 consistent (see `DESIGN.md`).

use regex::Regex;

use super::{CompiledRegex, ConfidenceMode, Pattern, PatternKind, PatternRegistry, Predicate, PluckSource, Rule};
use crate::ast::{GammaBlock, Program, Value};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};

/// Compile every `alpha_block` in `program` and register the resulting
/// patterns. Never fails as a whole: a pattern whose regex fails to
/// compile, or whose name collides without `prohib`, is dropped with a
/// diagnostic while the rest of the program keeps compiling (spec.md
/// §4.5).
pub fn compile_program(program: &Program, sink: &mut DiagnosticSink) -> PatternRegistry {
    let mut registry = PatternRegistry::new();
    for alpha in &program.alpha_blocks {
        let Some((pattern, prohib)) = compile_alpha_block(alpha, sink) else { continue };
        if let Err(err) = registry.register(pattern, prohib) {
            sink.push(Diagnostic::new(DiagnosticKind::PatternDuplicate, err.to_string()).with_span(alpha.span));
        }
    }
    registry
}

fn compile_alpha_block(alpha: &crate::ast::AlphaBlock, sink: &mut DiagnosticSink) -> Option<(Pattern, bool)> {
    let mut prohib = false;
    let mut confidence_mode = ConfidenceMode::Product;
    if let Some(exec) = &alpha.exec_clause {
        for modifier in &exec.modifiers {
            match modifier.name.as_str() {
                "prohib" => prohib = true,
                "confidenceMode" => {
                    if let Some(Value::Ident { name, .. }) = &modifier.value {
                        if name == "min" {
                            confidence_mode = ConfidenceMode::Min;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut rules = Vec::new();
    for beta in &alpha.beta_blocks {
        for gamma in &beta.gamma_blocks {
            if !compile_gamma_block(gamma, &alpha.name, &mut rules, sink) {
                return None;
            }
        }
    }

    Some((
        Pattern {
            name: alpha.name.clone(),
            kind: PatternKind::from_head(&alpha.name),
            rules,
            threshold: None,
            confidence_mode,
            registration_order: 0,
        },
        prohib,
    ))
}

/// Compile one `gamma_block` into `rules`, or patch the previously
/// pushed rule for `from`/`format`. Returns `false` if a regex failed to
/// compile, which aborts the whole enclosing pattern (spec.md §4.5:
/// "fatal for that pattern only").
fn compile_gamma_block(
    gamma: &GammaBlock,
    pattern_name: &str,
    rules: &mut Vec<Rule>,
    sink: &mut DiagnosticSink,
) -> bool {
    match gamma.key.as_str() {
        "tag" => {
            let name = gamma.qualifier.clone().unwrap_or_else(|| pattern_name.to_string());
            let literals = gamma.value.values.iter().map(Value::as_text).collect();
            rules.push(Rule::Tag { name, literals });
        }
        "pluck" => {
            let target = gamma.qualifier.clone().unwrap_or_else(|| "value".to_string());
            let mut regex_patterns = Vec::new();
            for value in &gamma.value.values {
                let source_text = value.as_text();
                match Regex::new(&source_text) {
                    Ok(regex) => regex_patterns.push(CompiledRegex { source: source_text, regex }),
                    Err(err) => {
                        sink.push(
                            Diagnostic::new(
                                DiagnosticKind::BadRegex,
                                format!("pattern {pattern_name:?} has an invalid regex {source_text:?}: {err}"),
                            )
                            .with_span(gamma.span),
                        );
                        return false;
                    }
                }
            }
            rules.push(Rule::Pluck { target, regex_patterns, source: PluckSource::default() });
        }
        "trap" | "snare" | "scent" => {
            let predicate_name = gamma.qualifier.clone().unwrap_or_else(|| "true".to_string());
            let message = gamma
                .value
                .values
                .iter()
                .find_map(|v| if let Value::String(s) = v { Some(s.clone()) } else { None })
                .unwrap_or_else(|| format!("{} assertion failed", gamma.key));
            let args: Vec<Value> =
                gamma.value.values.iter().filter(|v| !matches!(v, Value::String(_))).cloned().collect();
            let predicate = Predicate { name: predicate_name, args };
            rules.push(match gamma.key.as_str() {
                "trap" => Rule::Trap { predicate, message },
                "snare" => Rule::Snare { predicate, message },
                _ => Rule::Scent { predicate, message },
            });
        }
        "boil" => {
            let reduction =
                gamma.qualifier.clone().unwrap_or_else(|| gamma.value.values.first().map(Value::as_text).unwrap_or_default());
            rules.push(Rule::Boil { reduction });
        }
        "cook" => {
            let target_spec =
                gamma.qualifier.clone().unwrap_or_else(|| gamma.value.values.first().map(Value::as_text).unwrap_or_default());
            rules.push(Rule::Cook { target_spec, format: None });
        }
        "from" => {
            if let Some(Rule::Pluck { source, .. }) = rules.iter_mut().rev().find(|r| matches!(r, Rule::Pluck { .. })) {
                let text = gamma.value.values.first().map(Value::as_text).unwrap_or_default();
                *source = match text.as_str() {
                    "boundary" => PluckSource::Boundary,
                    _ => PluckSource::Joined,
                };
            }
        }
        "format" => {
            if let Some(Rule::Cook { format, .. }) = rules.iter_mut().rev().find(|r| matches!(r, Rule::Cook { .. })) {
                *format = gamma.value.values.first().map(Value::as_text);
            }
        }
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::parser;

    #[test]
    fn compiles_a_tag_and_pluck_pattern() {
        let source = "<Button\n [INIT =\n  {param tag = (val \"[\", \"]\")}\n  {param pluck:button_text = (val \"\\\\[(.+?)\\\\]\")}\n ]\n>";
        let mut sink = DiagnosticSink::new();
        let program = parser::parse(source, false, &mut sink).unwrap();
        let registry = compile_program(&program, &mut sink);
        assert_eq!(registry.len(), 1);
        let pattern = registry.get("Button").unwrap();
        assert_eq!(pattern.rules.len(), 2);
    }

    #[test]
    fn bad_regex_drops_only_its_own_pattern() {
        let source = "<Bad\n [INIT =\n  {param pluck:x = (val \"(\")}\n ]\n>\n<Good\n [INIT =\n  {param tag = (val \"x\")}\n ]\n>";
        let mut sink = DiagnosticSink::new();
        let program = parser::parse(source, false, &mut sink).unwrap();
        let registry = compile_program(&program, &mut sink);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Good").is_some());
        assert!(registry.get("Bad").is_none());
    }

    #[test]
    fn prohib_modifier_replaces_duplicate() {
        let source =
            "<Button\n [INIT =\n  {param tag = (val \"a\")}\n ]\n>\n<Button\n [INIT =\n  {param tag = (val \"b\")}\n ]\n> <EXEC: prohib>";
        let mut sink = DiagnosticSink::new();
        let program = parser::parse(source, false, &mut sink).unwrap();
        let registry = compile_program(&program, &mut sink);
        assert_eq!(registry.len(), 1);
    }
}
