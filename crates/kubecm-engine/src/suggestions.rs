//! Fuzzy matching suggestions for template errors
//!
//! Uses Levenshtein distance to point at the filter, function or variable
//! the author most likely meant.

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// All registered filters in the engine
pub const AVAILABLE_FILTERS: &[&str] = &[
    // Custom kubecm filters
    "toyaml",
    "tojson",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "nindent",
    "indent",
    "required",
    "sha256",
    "trunc",
    "trimprefix",
    "trimsuffix",
    // Built-in MiniJinja filters
    "default",
    "upper",
    "lower",
    "title",
    "capitalize",
    "replace",
    "trim",
    "join",
    "first",
    "last",
    "length",
    "reverse",
    "sort",
    "unique",
    "map",
    "select",
    "reject",
    "dictsort",
    "items",
    "int",
    "float",
    "string",
    "list",
    "bool",
    "urlencode",
];

/// All registered functions in the engine
pub const AVAILABLE_FUNCTIONS: &[&str] = &[
    "fail",
    "coalesce",
    "ternary",
    // Built-in MiniJinja globals
    "range",
    "dict",
];

/// Top-level variables of the data scope
pub const CONTEXT_VARIABLES: &[&str] = &[
    "release",
    "chart",
    "namespace",
    "version",
    "parent",
    "chart_source",
    "vars",
];

/// Candidates within [`MAX_SUGGESTION_DISTANCE`], best first
pub fn find_closest_matches<'a>(input: &str, candidates: &[&'a str], max_results: usize) -> Vec<&'a str> {
    let mut matches: Vec<(usize, &str)> = candidates
        .iter()
        .map(|&candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .collect();

    matches.sort_by_key(|(distance, _)| *distance);
    matches.truncate(max_results);
    matches.into_iter().map(|(_, candidate)| candidate).collect()
}

fn did_you_mean(matches: &[&str]) -> Option<String> {
    if matches.is_empty() {
        return None;
    }
    let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
    Some(format!("Did you mean {}?", quoted.join(" or ")))
}

/// Suggest corrections for an undefined variable
///
/// `defined_vars` are the derived variables evaluated so far.
pub fn suggest_undefined_variable(variable_name: &str, defined_vars: &[String]) -> Option<String> {
    if variable_name == "var" || variable_name.starts_with("var.") {
        return Some(
            "Did you mean `vars`? Derived variables are accessed as `vars.name`".to_string(),
        );
    }

    if let Some(name) = variable_name.strip_prefix("vars.") {
        let name = name.split('.').next().unwrap_or(name);
        let candidates: Vec<&str> = defined_vars.iter().map(String::as_str).collect();
        if let Some(hint) = did_you_mean(&find_closest_matches(name, &candidates, 3)) {
            return Some(hint);
        }
        return Some(format!(
            "`vars.{}` is not defined yet. Variables can only reference variables defined before them.",
            name
        ));
    }

    let head = variable_name.split('.').next().unwrap_or(variable_name);
    if CONTEXT_VARIABLES.contains(&head) {
        return Some(format!(
            "`{}` was not supplied for this deploy. Use `| default(...)` or pass it on the command line.",
            head
        ));
    }

    did_you_mean(&find_closest_matches(head, CONTEXT_VARIABLES, 1))
}

/// Suggest corrections for an unknown filter
pub fn suggest_unknown_filter(filter_name: &str) -> Option<String> {
    did_you_mean(&find_closest_matches(filter_name, AVAILABLE_FILTERS, 3)).or_else(|| {
        Some(format!(
            "Unknown filter `{}`. Common filters: toyaml, tojson, b64encode, quote, default, indent",
            filter_name
        ))
    })
}

/// Suggest corrections for an unknown function
pub fn suggest_unknown_function(func_name: &str) -> Option<String> {
    did_you_mean(&find_closest_matches(func_name, AVAILABLE_FUNCTIONS, 3)).or_else(|| {
        Some(format!(
            "Unknown function `{}`. Available functions: {}",
            func_name,
            AVAILABLE_FUNCTIONS.join(", ")
        ))
    })
}

/// Extract a quoted name from an error message
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    // Pattern: "unknown filter `foo`" or "function 'foo' is unknown"
    let patterns = [('`', '`'), ('\'', '\''), ('"', '"')];

    for (start, end) in patterns {
        if let Some(start_idx) = msg.find(start) {
            let rest = &msg[start_idx + start.len_utf8()..];
            if let Some(end_idx) = rest.find(end) {
                return Some(rest[..end_idx].to_string());
            }
        }
    }
    None
}
