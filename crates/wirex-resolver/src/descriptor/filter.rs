use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::container::RuntimeEnvironment;

lazy_static! {
    static ref CLAUSE_REGEX: Regex =
        Regex::new(r"\(\s*(osgi\.(?:os|ws|arch|nl))\s*=\s*([^()]*?)\s*\)").unwrap();
}

/// Host-runtime predicate restricting where a module may resolve.
///
/// Each field is an optional comma separated list of accepted values; a
/// module matches when every present field contains the environment's value
/// (case-insensitive). `*` accepts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformFilter {
    pub os: Option<String>,
    pub ws: Option<String>,
    pub arch: Option<String>,
    pub nl: Option<String>,
}

impl PlatformFilter {
    /// Parse an LDAP-style conjunction such as `(&(osgi.os=linux)(osgi.arch=x86_64))`.
    ///
    /// Only equality clauses over `osgi.os`, `osgi.ws`, `osgi.arch` and
    /// `osgi.nl` combined with `&` are understood.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.contains('|') || trimmed.contains('!') {
            return Err("only conjunctions of equality clauses are supported".to_string());
        }

        let body = match trimmed.strip_prefix("(&") {
            Some(rest) => rest
                .strip_suffix(')')
                .ok_or_else(|| "unbalanced parentheses".to_string())?,
            None => trimmed,
        };

        let mut filter = PlatformFilter::default();
        let mut consumed = 0;
        for caps in CLAUSE_REGEX.captures_iter(body) {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            consumed += whole.chars().filter(|c| !c.is_whitespace()).count();
            let value = Some(caps[2].to_string());
            match &caps[1] {
                "osgi.os" => filter.os = value,
                "osgi.ws" => filter.ws = value,
                "osgi.arch" => filter.arch = value,
                _ => filter.nl = value,
            }
        }

        let expected = body.chars().filter(|c| !c.is_whitespace()).count();
        if consumed == 0 || consumed != expected {
            return Err("unrecognised clause".to_string());
        }

        Ok(filter)
    }

    /// Check the filter against the host-runtime facts
    pub fn matches(&self, env: &RuntimeEnvironment) -> bool {
        accepts(self.os.as_deref(), &env.os)
            && accepts(self.ws.as_deref(), &env.ws)
            && accepts(self.arch.as_deref(), &env.arch)
            && accepts(self.nl.as_deref(), &env.nl)
    }
}

fn accepts(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        None => true,
        Some(values) => values
            .split(',')
            .map(str::trim)
            .any(|v| v == "*" || v.eq_ignore_ascii_case(actual)),
    }
}

impl fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = [
            ("osgi.os", &self.os),
            ("osgi.ws", &self.ws),
            ("osgi.arch", &self.arch),
            ("osgi.nl", &self.nl),
        ]
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("({}={})", key, v)))
        .collect();

        match clauses.len() {
            0 => write!(f, "()"),
            1 => write!(f, "{}", clauses[0]),
            _ => write!(f, "(&{})", clauses.join("")),
        }
    }
}
