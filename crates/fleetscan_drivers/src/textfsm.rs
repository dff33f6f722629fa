//! A deliberately small subset of the TextFSM template grammar: `Value`
//! declarations and `^`-anchored `Rule` lines under a `Start` state. Enough
//! to let operators hand-write a hostname-extraction template without
//! pulling in a full state-machine implementation for a single field.

use regex::Regex;
use std::collections::HashMap;

#[derive(Clone)]
pub struct TextFsmTemplate {
    name: String,
    rules: Vec<Regex>,
}

impl TextFsmTemplate {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, String> {
        let mut values: HashMap<String, String> = HashMap::new();
        let mut rule_lines: Vec<String> = Vec::new();
        let mut in_rules = false;

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("Value ") {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let value_name = parts.next().unwrap_or_default().to_string();
                let pattern = parts
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')');
                values.insert(value_name, pattern.to_string());
                continue;
            }
            if trimmed == "Start" {
                in_rules = true;
                continue;
            }
            if in_rules && trimmed.starts_with('^') {
                let rule = trimmed.trim_end_matches("-> Record").trim();
                rule_lines.push(rule.to_string());
            }
        }

        let mut rules = Vec::with_capacity(rule_lines.len());
        for rule in rule_lines {
            let mut expanded = rule;
            for (value_name, pattern) in &values {
                let placeholder = format!("${{{value_name}}}");
                expanded = expanded.replace(&placeholder, &format!("(?P<{value_name}>{pattern})"));
            }
            let regex = Regex::new(&expanded)
                .map_err(|e| format!("invalid textfsm rule '{expanded}': {e}"))?;
            rules.push(regex);
        }

        Ok(Self {
            name: name.into(),
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply every rule to every line of `text`; return the first non-empty
    /// `Hostname` capture.
    pub fn extract_hostname(&self, text: &str) -> Option<String> {
        for line in text.lines() {
            for rule in &self.rules {
                if let Some(caps) = rule.captures(line) {
                    if let Some(m) = caps.name("Hostname").or_else(|| caps.name("hostname")) {
                        let value = m.as_str().trim();
                        if !value.is_empty() {
                            return Some(value.to_string());
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Value Hostname (\\S+)

Start
  ^${Hostname}\\s+uptime is -> Record
";

    #[test]
    fn extracts_hostname_from_matching_line() {
        let template = TextFsmTemplate::parse("ios_hostname", SAMPLE).unwrap();
        let output = "edge-1 uptime is 3 weeks, 2 days";
        assert_eq!(template.extract_hostname(output), Some("edge-1".to_string()));
    }

    #[test]
    fn returns_none_when_no_line_matches() {
        let template = TextFsmTemplate::parse("ios_hostname", SAMPLE).unwrap();
        assert_eq!(template.extract_hostname("no match here"), None);
    }

    #[test]
    fn first_matching_template_wins_is_caller_responsibility() {
        let template = TextFsmTemplate::parse("ios_hostname", SAMPLE).unwrap();
        assert_eq!(template.name(), "ios_hostname");
    }
}
