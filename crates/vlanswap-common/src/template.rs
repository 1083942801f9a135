//! Declarative table templates.
//!
//! Turns free-form command output into rows of fields using a TextFSM-style
//! grammar: a header of `Value` definitions followed by named states whose
//! rules match input lines, capture values and emit records.
//!
//! Supported subset:
//!
//! - `Value [Required|Filldown|Key] NAME (regex)`
//! - States introduced by an unindented name; `Start` is mandatory, an
//!   explicit `EOF` state suppresses the implicit record at end of input
//! - Rules `^regex [-> action]` with `${NAME}` substitution and `$$` for `$`
//! - Actions `Next`, `Continue`, `Error`, optionally joined with `.Record`,
//!   `.NoRecord`, `.Clear` or `.Clearall`, followed by a new state (or `End`)
//!
//! # Example
//!
//! ```
//! use vlanswap_common::template::Template;
//!
//! let template = Template::parse(
//!     "Value PORT (\\S+)\nValue VLAN (\\d+)\n\nStart\n  ^${PORT}\\s+${VLAN}$$ -> Record\n",
//! ).unwrap();
//! let rows = template.parse_text("Gi1/0/1 10\nGi1/0/2 20\n").unwrap();
//! assert_eq!(rows, vec![vec!["Gi1/0/1", "10"], vec!["Gi1/0/2", "20"]]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::trace;

use crate::error::{TemplateError, TemplateResult};

const START_STATE: &str = "Start";
const EOF_STATE: &str = "EOF";
const END_STATE: &str = "End";

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("Invalid regex pattern"));

/// Splits a rule into its regex and the text after the last `->`.
static RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)\s->(.*)$").expect("Invalid regex pattern"));

#[derive(Debug, Clone)]
struct ValueDef {
    name: String,
    pattern: String,
    required: bool,
    filldown: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Next,
    Continue,
    Error,
}

impl LineOp {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "Next" => Some(LineOp::Next),
            "Continue" => Some(LineOp::Continue),
            "Error" => Some(LineOp::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOp {
    NoRecord,
    Record,
    Clear,
    ClearAll,
}

impl RecordOp {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "NoRecord" => Some(RecordOp::NoRecord),
            "Record" => Some(RecordOp::Record),
            "Clear" => Some(RecordOp::Clear),
            "Clearall" => Some(RecordOp::ClearAll),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    line_op: LineOp,
    record_op: RecordOp,
    new_state: Option<String>,
}

/// A compiled table template.
#[derive(Debug, Clone)]
pub struct Template {
    values: Vec<ValueDef>,
    states: HashMap<String, Vec<Rule>>,
}

impl Template {
    /// Compiles template source.
    pub fn parse(source: &str) -> TemplateResult<Self> {
        let mut values: Vec<ValueDef> = Vec::new();
        let mut states: HashMap<String, Vec<Rule>> = HashMap::new();
        let mut current: Option<(String, Vec<Rule>)> = None;
        let mut transitions: Vec<(usize, String)> = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim_end_matches('\r');

            if line.trim_start().starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                if let Some((name, rules)) = current.take() {
                    states.insert(name, rules);
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("Value ") {
                if current.is_some() || !states.is_empty() {
                    return Err(TemplateError::invalid_value(
                        line_no,
                        "Value definitions must precede all states",
                    ));
                }
                let def = parse_value(line_no, rest)?;
                if values.iter().any(|v| v.name == def.name) {
                    return Err(TemplateError::invalid_value(
                        line_no,
                        format!("duplicate value '{}'", def.name),
                    ));
                }
                values.push(def);
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                let name = line.trim();
                if !IDENT_RE.is_match(name) {
                    return Err(TemplateError::invalid_rule(
                        line_no,
                        format!("invalid state name '{}'", name),
                    ));
                }
                if let Some((prev, rules)) = current.take() {
                    states.insert(prev, rules);
                }
                if states.contains_key(name) {
                    return Err(TemplateError::invalid_rule(
                        line_no,
                        format!("duplicate state '{}'", name),
                    ));
                }
                current = Some((name.to_string(), Vec::new()));
                continue;
            }

            let Some((_, rules)) = current.as_mut() else {
                return Err(TemplateError::invalid_rule(line_no, "rule outside of a state"));
            };
            let rule = compile_rule(line_no, line.trim(), &values)?;
            if let Some(state) = &rule.new_state {
                transitions.push((line_no, state.clone()));
            }
            rules.push(rule);
        }
        if let Some((name, rules)) = current.take() {
            states.insert(name, rules);
        }

        if !states.contains_key(START_STATE) {
            return Err(TemplateError::MissingStart);
        }
        for (line, state) in transitions {
            if state != END_STATE && !states.contains_key(&state) {
                return Err(TemplateError::UndefinedState { line, state });
            }
        }

        Ok(Self { values, states })
    }

    /// Returns the value names in declaration order; every row has one
    /// field per name, in the same order.
    pub fn header(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }

    /// Runs the template over `text` and returns the emitted rows.
    pub fn parse_text(&self, text: &str) -> TemplateResult<Vec<Vec<String>>> {
        let mut run = Run::new(self.values.len());
        let mut state = START_STATE;

        'lines: for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            let rules = self.states.get(state).map(Vec::as_slice).unwrap_or(&[]);

            for rule in rules {
                let Some(caps) = rule.regex.captures(line) else {
                    continue;
                };
                for (slot, def) in run.current.iter_mut().zip(&self.values) {
                    if let Some(m) = caps.name(&def.name) {
                        *slot = Some(m.as_str().to_string());
                    }
                }

                if rule.line_op == LineOp::Error {
                    return Err(TemplateError::Rejected {
                        line: index + 1,
                        text: line.to_string(),
                    });
                }
                match rule.record_op {
                    RecordOp::Record => run.record(&self.values),
                    RecordOp::Clear => run.clear(&self.values, false),
                    RecordOp::ClearAll => run.clear(&self.values, true),
                    RecordOp::NoRecord => {}
                }
                if let Some(next) = &rule.new_state {
                    trace!(from = state, to = %next, "State transition");
                    state = next.as_str();
                    if state == END_STATE {
                        break 'lines;
                    }
                }
                if rule.line_op == LineOp::Next {
                    break;
                }
            }
        }

        if state != END_STATE && !self.states.contains_key(EOF_STATE) {
            run.record(&self.values);
        }
        Ok(run.rows)
    }
}

/// Row assembly state for one `parse_text` call.
struct Run {
    current: Vec<Option<String>>,
    rows: Vec<Vec<String>>,
}

impl Run {
    fn new(width: usize) -> Self {
        Self {
            current: vec![None; width],
            rows: Vec::new(),
        }
    }

    fn record(&mut self, defs: &[ValueDef]) {
        let missing_required = defs
            .iter()
            .zip(&self.current)
            .any(|(def, value)| def.required && value.as_deref().map_or(true, str::is_empty));
        if missing_required {
            self.clear(defs, false);
            return;
        }
        if self.current.iter().all(Option::is_none) {
            return;
        }
        self.rows.push(
            self.current
                .iter()
                .map(|value| value.clone().unwrap_or_default())
                .collect(),
        );
        self.clear(defs, false);
    }

    fn clear(&mut self, defs: &[ValueDef], all: bool) {
        for (slot, def) in self.current.iter_mut().zip(defs) {
            if all || !def.filldown {
                *slot = None;
            }
        }
    }
}

fn parse_value(line: usize, rest: &str) -> TemplateResult<ValueDef> {
    let open = rest
        .find('(')
        .ok_or_else(|| TemplateError::invalid_value(line, "missing regex"))?;
    let pattern = rest[open..].trim();
    if !pattern.ends_with(')') {
        return Err(TemplateError::invalid_value(
            line,
            "regex must be enclosed in parentheses",
        ));
    }

    let words: Vec<&str> = rest[..open].split_whitespace().collect();
    let (options, name) = match words.as_slice() {
        [name] => ("", *name),
        [options, name] => (*options, *name),
        _ => return Err(TemplateError::invalid_value(line, "expected [options] NAME (regex)")),
    };
    if !IDENT_RE.is_match(name) {
        return Err(TemplateError::invalid_value(
            line,
            format!("invalid value name '{}'", name),
        ));
    }
    Regex::new(pattern).map_err(|source| TemplateError::Regex { line, source })?;

    let mut def = ValueDef {
        name: name.to_string(),
        pattern: pattern.to_string(),
        required: false,
        filldown: false,
    };
    for option in options.split(',').filter(|o| !o.is_empty()) {
        match option {
            "Required" => def.required = true,
            "Filldown" => def.filldown = true,
            "Key" => {}
            other => {
                return Err(TemplateError::UnsupportedOption {
                    line,
                    option: other.to_string(),
                })
            }
        }
    }
    Ok(def)
}

fn compile_rule(line: usize, text: &str, values: &[ValueDef]) -> TemplateResult<Rule> {
    let (pattern, action) = match RULE_RE.captures(text) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()).trim_end(),
            caps.get(2).map_or("", |m| m.as_str()).trim(),
        ),
        None => (text, ""),
    };
    if !pattern.starts_with('^') {
        return Err(TemplateError::invalid_rule(line, "rule must start with '^'"));
    }

    let expanded = expand_values(line, pattern, values)?;
    let regex = Regex::new(&expanded).map_err(|source| TemplateError::Regex { line, source })?;
    let (line_op, record_op, new_state) = parse_action(line, action)?;
    if line_op == LineOp::Continue && new_state.is_some() {
        return Err(TemplateError::invalid_rule(
            line,
            "Continue can not change state",
        ));
    }

    Ok(Rule {
        regex,
        line_op,
        record_op,
        new_state,
    })
}

fn expand_values(line: usize, pattern: &str, values: &[ValueDef]) -> TemplateResult<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("$$") {
            out.push('$');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::invalid_rule(line, "unterminated '${'"))?;
            let name = &after[..close];
            let def = values.iter().find(|v| v.name == name).ok_or_else(|| {
                TemplateError::invalid_rule(line, format!("unknown value '{}'", name))
            })?;
            out.push_str(&format!("(?P<{}>{}", name, &def.pattern[1..]));
            rest = &after[close + 1..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn parse_action(
    line: usize,
    action: &str,
) -> TemplateResult<(LineOp, RecordOp, Option<String>)> {
    let mut line_op = LineOp::Next;
    let mut record_op = RecordOp::NoRecord;
    let mut new_state = None;

    let mut words = action.split_whitespace();
    let Some(first) = words.next() else {
        return Ok((line_op, record_op, new_state));
    };

    let has_ops = if let Some((l, r)) = first.split_once('.') {
        line_op = LineOp::from_word(l)
            .ok_or_else(|| TemplateError::invalid_rule(line, format!("unknown line action '{}'", l)))?;
        record_op = RecordOp::from_word(r).ok_or_else(|| {
            TemplateError::invalid_rule(line, format!("unknown record action '{}'", r))
        })?;
        true
    } else if let Some(op) = LineOp::from_word(first) {
        line_op = op;
        true
    } else if let Some(op) = RecordOp::from_word(first) {
        record_op = op;
        true
    } else if IDENT_RE.is_match(first) {
        new_state = Some(first.to_string());
        false
    } else {
        return Err(TemplateError::invalid_rule(
            line,
            format!("unknown action '{}'", first),
        ));
    };

    // An Error action may carry a free-text message; nothing else may follow.
    if line_op == LineOp::Error {
        return Ok((line_op, record_op, None));
    }
    if has_ops {
        if let Some(state) = words.next() {
            new_state = Some(state.to_string());
        }
    }
    if let Some(extra) = words.next() {
        return Err(TemplateError::invalid_rule(
            line,
            format!("unexpected '{}' after action", extra),
        ));
    }
    Ok((line_op, record_op, new_state))
}
