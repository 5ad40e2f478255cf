use std::collections::BTreeMap;

/// Variable name -> value for one job, e.g. one row of the parameter table plus `JOB_NAME`
pub type Bindings = BTreeMap<String, String>;

/// Result of looking up a placeholder key in a set of bindings
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a str),
    Missing,
}

/// Look up a placeholder key. The empty key (`{}`) is never bound.
pub fn lookup<'a>(bindings: &'a Bindings, key: &str) -> Lookup<'a> {
    if key.is_empty() {
        return Lookup::Missing;
    }
    match bindings.get(key) {
        Some(value) => Lookup::Found(value.as_str()),
        None => Lookup::Missing,
    }
}

/// Replace `{key}` with its bound value, leaving anything else untouched
///
/// Safe to run over arbitrary files (shell scripts, JSON, LaTeX): unknown keys are kept as
/// `{key}`, `{}` survives as-is and unbalanced braces are copied literally. A placeholder is
/// the shortest `{...}` run that contains no other brace, so `${HOME}` is only replaced if
/// `HOME` is bound.
///
/// ```
/// use jobmill::template::substitute::{replace_vars, Bindings};
///
/// let mut bindings = Bindings::new();
/// bindings.insert("first".to_string(), "James".to_string());
/// bindings.insert("last".to_string(), "Bond".to_string());
/// assert_eq!(replace_vars("{last}, {first} {last}", &bindings), "Bond, James Bond");
///
/// bindings.remove("first");
/// assert_eq!(replace_vars("{last}, {first} {last}", &bindings), "Bond, {first} Bond");
/// ```
pub fn replace_vars(text: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let key = &after[..end];
                match lookup(bindings, key) {
                    Lookup::Found(value) => out.push_str(value),
                    Lookup::Missing => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            // another '{' first, or no closing brace at all
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
