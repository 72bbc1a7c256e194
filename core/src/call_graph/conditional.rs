//! Conditional execution-path analyzer (spec §4.9).
//!
//! Grounded on `original_source/.../conditional_analyzer.py`'s
//! brace-balanced `if`/`switch`/`try-catch` block extraction and fixed
//! probability estimates (0.5 per if-branch, 1/N per switch case, 0.8/0.2
//! for try/catch).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{ExecutionPath, PathStep};

const CALL_SKIP_WORDS: &[&str] = &["if", "for", "while", "catch", "return", "new", "typeof", "instanceof"];

#[derive(Debug, Clone)]
pub struct ConditionalPath {
    pub condition: String,
    pub execution_probability: f64,
    pub function_calls: Vec<String>,
    pub path_type: &'static str,
}

static IF_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"if\s*\(([^)]+)\)\s*\{").unwrap());
static ELSE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^else\s*\{").unwrap());
static SWITCH_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"switch\s*\(([^)]+)\)\s*\{").unwrap());
static TRY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"try\s*\{").unwrap());
static CATCH_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*catch\s*\([^)]*\)\s*\{").unwrap());
static CASE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"case\s+([^:]+):").unwrap());
static DEFAULT_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"default\s*:").unwrap());
static CALL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*\(").unwrap());

/// Extracts `if`/`switch`/`try-catch` conditional branches from a function
/// body and labels each branch's calls with a guard + probability.
pub fn analyze_conditional_paths(body: &str) -> Vec<ConditionalPath> {
    let mut paths = Vec::new();
    paths.extend(analyze_if_statements(body));
    paths.extend(analyze_switch_statements(body));
    paths.extend(analyze_try_catch_blocks(body));
    paths
}

/// Enriches each execution path with the first conditional branch whose
/// calls overlap a pair of consecutive functions on the path (spec §4.9).
pub fn enhance_execution_paths(paths: &[ExecutionPath], body: &str) -> Vec<ExecutionPath> {
    let conditionals = analyze_conditional_paths(body);
    if conditionals.is_empty() {
        return paths.to_vec();
    }

    paths
        .iter()
        .map(|path| {
            let names: Vec<&str> = path.steps.iter().map(|s| s.function.as_str()).collect();
            for i in 0..names.len() {
                let window = &names[i..(i + 2).min(names.len())];
                if let Some(condition) = conditionals
                    .iter()
                    .find(|cp| window.iter().any(|f| cp.function_calls.iter().any(|c| c == f)))
                {
                    let mut enhanced = path.clone();
                    if let Some(first) = enhanced.steps.first_mut() {
                        first.guard = Some(condition.condition.clone());
                        first.probability = Some(condition.execution_probability);
                    }
                    return enhanced;
                }
            }
            path.clone()
        })
        .collect()
}

fn analyze_if_statements(body: &str) -> Vec<ConditionalPath> {
    let mut out = Vec::new();
    for caps in IF_HEADER.captures_iter(body) {
        let condition = caps[1].trim().to_string();
        let whole = caps.get(0).unwrap();
        let brace_pos = whole.end() - 1;
        let Some(then_block) = extract_block(body, brace_pos) else { continue };

        out.push(ConditionalPath {
            condition: condition.clone(),
            execution_probability: 0.5,
            function_calls: extract_calls(&then_block),
            path_type: "if_then",
        });

        let after_then = brace_pos + 1 + then_block.len() + 1;
        let rest = &body[after_then.min(body.len())..];
        let trimmed = rest.trim_start();
        if ELSE_HEADER.is_match(trimmed) {
            let else_brace_offset = trimmed.find('{').unwrap();
            let else_brace_pos = after_then + (rest.len() - trimmed.len()) + else_brace_offset;
            if let Some(else_block) = extract_block(body, else_brace_pos) {
                out.push(ConditionalPath {
                    condition: format!("!({condition})"),
                    execution_probability: 0.5,
                    function_calls: extract_calls(&else_block),
                    path_type: "if_else",
                });
            }
        }
    }
    out
}

fn analyze_switch_statements(body: &str) -> Vec<ConditionalPath> {
    let mut out = Vec::new();
    for caps in SWITCH_HEADER.captures_iter(body) {
        let expr = caps[1].trim().to_string();
        let whole = caps.get(0).unwrap();
        let Some(switch_body) = extract_block(body, whole.end() - 1) else { continue };
        let cases = extract_switch_cases(&switch_body);
        if cases.is_empty() {
            continue;
        }
        let probability = 1.0 / cases.len() as f64;
        for (value, case_body, is_default) in cases {
            let condition = if is_default { "default".to_string() } else { format!("{expr} === {value}") };
            let path_type = if is_default { "switch_default" } else { "switch_case" };
            out.push(ConditionalPath {
                condition,
                execution_probability: probability,
                function_calls: extract_calls(&case_body),
                path_type,
            });
        }
    }
    out
}

fn analyze_try_catch_blocks(body: &str) -> Vec<ConditionalPath> {
    let mut out = Vec::new();
    for m in TRY_HEADER.find_iter(body) {
        let Some(try_block) = extract_block(body, m.end() - 1) else { continue };
        out.push(ConditionalPath {
            condition: "no exception thrown".to_string(),
            execution_probability: 0.8,
            function_calls: extract_calls(&try_block),
            path_type: "try_normal",
        });

        let after_try = m.end() - 1 + 1 + try_block.len() + 1;
        let rest = &body[after_try.min(body.len())..];
        if let Some(catch_caps) = CATCH_HEADER.find(rest) {
            let catch_brace_pos = after_try + catch_caps.end() - 1;
            if let Some(catch_block) = extract_block(body, catch_brace_pos) {
                out.push(ConditionalPath {
                    condition: "exception thrown".to_string(),
                    execution_probability: 0.2,
                    function_calls: extract_calls(&catch_block),
                    path_type: "try_catch",
                });
            }
        }
    }
    out
}

fn extract_switch_cases(switch_body: &str) -> Vec<(String, String, bool)> {
    let mut cases = Vec::new();
    let mut boundaries: Vec<(usize, usize, String, bool)> = Vec::new();

    for caps in CASE_HEADER.captures_iter(switch_body) {
        let whole = caps.get(0).unwrap();
        boundaries.push((whole.start(), whole.end(), caps[1].trim().to_string(), false));
    }
    if let Some(m) = DEFAULT_HEADER.find(switch_body) {
        boundaries.push((m.start(), m.end(), "default".to_string(), true));
    }
    boundaries.sort_by_key(|(start, ..)| *start);

    for (i, (_, body_start, value, is_default)) in boundaries.iter().enumerate() {
        let body_end = boundaries.get(i + 1).map(|(start, ..)| *start).unwrap_or(switch_body.len());
        let case_body = switch_body[*body_start..body_end].trim().to_string();
        cases.push((value.clone(), case_body, *is_default));
    }
    cases
}

fn extract_calls(code: &str) -> Vec<String> {
    CALL_PATTERN
        .captures_iter(code)
        .map(|c| c[1].to_string())
        .filter(|name| !CALL_SKIP_WORDS.contains(&name.as_str()))
        .collect()
}

/// Extracts the balanced-brace content starting at `code[start_pos] == '{'`.
fn extract_block(code: &str, start_pos: usize) -> Option<String> {
    let bytes = code.as_bytes();
    if bytes.get(start_pos) != Some(&b'{') {
        return None;
    }
    let mut depth = 1i32;
    let mut pos = start_pos + 1;
    while pos < bytes.len() && depth > 0 {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        pos += 1;
    }
    if depth == 0 {
        Some(code[start_pos + 1..pos - 1].to_string())
    } else {
        None
    }
}

/// Heuristic complexity score (0.0-1.0) for a condition string.
pub fn condition_complexity_score(condition: &str) -> f64 {
    const INDICATORS: &[&str] = &["&&", "||", "!", "(", ")", "===", "!==", "<", ">", "<=", ">="];
    let mut score = 0.1;
    for indicator in INDICATORS {
        score += condition.matches(indicator).count() as f64 * 0.1;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_if_else_branches_with_fifty_percent_each() {
        let body = "if (x > 0) { positive(); } else { negative(); }";
        let paths = analyze_conditional_paths(body);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].execution_probability, 0.5);
        assert_eq!(paths[1].execution_probability, 0.5);
        assert_eq!(paths[0].function_calls, vec!["positive".to_string()]);
        assert_eq!(paths[1].function_calls, vec!["negative".to_string()]);
    }

    #[test]
    fn switch_cases_split_probability_evenly() {
        let body = "switch (x) { case 1: one(); case 2: two(); default: other(); }";
        let paths = analyze_conditional_paths(body);
        assert_eq!(paths.len(), 3);
        for p in &paths {
            assert!((p.execution_probability - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn try_catch_uses_eighty_twenty_split() {
        let body = "try { doWork(); } catch (e) { handleError(); }";
        let paths = analyze_conditional_paths(body);
        assert_eq!(paths[0].execution_probability, 0.8);
        assert_eq!(paths[1].execution_probability, 0.2);
    }

    #[test]
    fn complexity_score_caps_at_one() {
        let score = condition_complexity_score("a && b || c && d === e !== f < g > h <= i >= j");
        assert_eq!(score, 1.0);
    }
}
