use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;

use super::{ArrayMatch, FilterKind, FilterRule};
use crate::condition::{Condition, Scalar};
use crate::params::RawParams;

/// A raw value that could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub param: String,
    pub value: String,
    pub reason: String,
}

impl Rejection {
    fn new(param: &str, value: &str, reason: impl Into<String>) -> Self {
        Self { param: param.to_string(), value: value.to_string(), reason: reason.into() }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignored {}={:?}: {}", self.param, self.value, self.reason)
    }
}

/// Result of compiling one or more rules against the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub condition: Option<Condition>,
    pub rejections: Vec<Rejection>,
    /// Values that were used after adjustment (clamped, truncated)
    pub adjustments: Vec<String>,
    /// Keys of required rules that produced no condition
    pub missing: Vec<String>,
}

impl CompiledFilter {
    fn push(&mut self, condition: Condition) {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
    }

    fn merge(&mut self, other: CompiledFilter) {
        if let Some(condition) = other.condition {
            self.push(condition);
        }
        self.rejections.extend(other.rejections);
        self.adjustments.extend(other.adjustments);
        self.missing.extend(other.missing);
    }
}

/// Compile every rule and AND the results together
pub fn compile_all(rules: &[FilterRule], params: &RawParams, max_text_len: usize) -> CompiledFilter {
    let mut out = CompiledFilter::default();
    for rule in rules {
        out.merge(compile(rule, params, max_text_len));
    }
    out
}

/// Compile one rule. Absent or blank keys produce nothing; unusable values are
/// reported as rejections and never reach the condition.
pub fn compile(rule: &FilterRule, params: &RawParams, max_text_len: usize) -> CompiledFilter {
    let mut out = CompiledFilter::default();

    match &rule.kind {
        FilterKind::Boolean => {
            if let Some(raw) = params.get_trimmed(&rule.param) {
                match parse_bool(raw) {
                    Some(b) => out.push(Condition::eq(&rule.field, Scalar::Bool(b))),
                    None => out.rejections.push(Rejection::new(&rule.param, raw, "expected true or false")),
                }
            }
        }
        FilterKind::ObjectId => {
            if let Some(raw) = params.get_trimmed(&rule.param) {
                match ObjectId::parse_str(raw) {
                    Ok(id) => out.push(Condition::eq(&rule.field, Scalar::ObjectId(id))),
                    Err(e) => out.rejections.push(Rejection::new(&rule.param, raw, e.to_string())),
                }
            }
        }
        FilterKind::Text => {
            if let Some(raw) = params.get_trimmed(&rule.param) {
                compile_text(rule, raw, max_text_len, &mut out);
            }
        }
        FilterKind::NumericRange { min_param, max_param, exact_param } => {
            compile_numeric(rule, params, min_param, max_param, exact_param.as_deref(), &mut out);
        }
        FilterKind::DateRange { from_param, to_param } => {
            compile_dates(rule, params, from_param, to_param, &mut out);
        }
        FilterKind::ArrayMembership { mode, max_items } => {
            compile_array(rule, params, *mode, *max_items, &mut out);
        }
    }

    if rule.required && out.condition.is_none() {
        out.missing.push(rule.param.clone());
    }
    out
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn canonical<'a>(allowed: &'a [String], raw: &str) -> Option<&'a str> {
    allowed.iter().find(|a| a.eq_ignore_ascii_case(raw)).map(String::as_str)
}

fn compile_text(rule: &FilterRule, raw: &str, max_text_len: usize, out: &mut CompiledFilter) {
    if let Some(allowed) = &rule.allowed {
        match canonical(allowed, raw) {
            Some(value) => out.push(Condition::eq(&rule.field, Scalar::Text(value.to_string()))),
            None => out.rejections.push(Rejection::new(
                &rule.param,
                raw,
                format!("expected one of {}", allowed.join(", ")),
            )),
        }
        return;
    }

    let text = truncate_chars(raw, max_text_len);
    if text.len() < raw.len() {
        out.adjustments.push(format!("{} truncated to {} characters", rule.param, max_text_len));
    }
    out.push(Condition::contains_text(&rule.field, text));
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn compile_numeric(
    rule: &FilterRule,
    params: &RawParams,
    min_param: &str,
    max_param: &str,
    exact_param: Option<&str>,
    out: &mut CompiledFilter,
) {
    let mut bound = |param: &str| -> Option<f64> {
        let raw = params.get_trimmed(param)?;
        let Some(n) = parse_number(raw) else {
            out.rejections.push(Rejection::new(param, raw, "not a number"));
            return None;
        };
        let clamped = clamp(n, rule.min, rule.max);
        if clamped != n {
            out.adjustments.push(format!("{}={} clamped to {}", param, raw, clamped));
        }
        Some(clamped)
    };

    let mut min = bound(min_param);
    let mut max = bound(max_param);
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            out.adjustments.push(format!("{} and {} swapped", min_param, max_param));
            std::mem::swap(&mut min, &mut max);
        }
    }

    if let Some(param) = exact_param {
        if let Some(raw) = params.get_trimmed(param) {
            match parse_number(raw) {
                Some(n) if clamp(n, rule.min, rule.max) == n => {
                    out.push(Condition::eq(&rule.field, Scalar::Number(n)));
                }
                Some(_) => out.rejections.push(Rejection::new(param, raw, "out of range")),
                None => out.rejections.push(Rejection::new(param, raw, "not a number")),
            }
        }
    }

    if min.is_some() || max.is_some() {
        out.push(Condition::Range {
            field: rule.field.clone(),
            min: min.map(Scalar::Number),
            max: max.map(Scalar::Number),
        });
    }
}

fn clamp(n: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let n = min.map_or(n, |m| n.max(m));
    max.map_or(n, |m| n.min(m))
}

/// RFC 3339, or a bare `YYYY-MM-DD` taken as the start (or end) of that UTC day
fn parse_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::MIN
    };
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn compile_dates(
    rule: &FilterRule,
    params: &RawParams,
    from_param: &str,
    to_param: &str,
    out: &mut CompiledFilter,
) {
    let mut bound = |param: &str, end_of_day: bool| -> Option<DateTime<Utc>> {
        let raw = params.get_trimmed(param)?;
        let parsed = parse_date(raw, end_of_day);
        if parsed.is_none() {
            out.rejections.push(Rejection::new(param, raw, "not a date"));
        }
        parsed
    };

    let mut from = bound(from_param, false);
    let mut to = bound(to_param, true);
    if let (Some(lo), Some(hi)) = (from, to) {
        if lo > hi {
            out.adjustments.push(format!("{} and {} swapped", from_param, to_param));
            std::mem::swap(&mut from, &mut to);
        }
    }

    if from.is_some() || to.is_some() {
        out.push(Condition::Range {
            field: rule.field.clone(),
            min: from.map(Scalar::Date),
            max: to.map(Scalar::Date),
        });
    }
}

fn compile_array(
    rule: &FilterRule,
    params: &RawParams,
    mode: ArrayMatch,
    max_items: Option<usize>,
    out: &mut CompiledFilter,
) {
    let mut values: Vec<String> = Vec::new();
    let raw_values = params
        .get_all(&rule.param)
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty());

    for raw in raw_values {
        let value = match &rule.allowed {
            Some(allowed) => match canonical(allowed, raw) {
                Some(value) => value.to_string(),
                None => {
                    out.rejections.push(Rejection::new(&rule.param, raw, "not an allowed value"));
                    continue;
                }
            },
            None => raw.to_string(),
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }

    if let Some(cap) = max_items {
        if values.len() > cap {
            out.adjustments.push(format!(
                "{} truncated from {} to {} values",
                rule.param,
                values.len(),
                cap
            ));
            values.truncate(cap);
        }
    }

    let mut scalars: Vec<Scalar> = values.into_iter().map(Scalar::Text).collect();
    match (mode, scalars.len()) {
        (_, 0) => {}
        (ArrayMatch::Any, 1) => {
            if let Some(value) = scalars.pop() {
                out.push(Condition::eq(&rule.field, value));
            }
        }
        (ArrayMatch::Any, _) => out.push(Condition::In { field: rule.field.clone(), values: scalars }),
        (ArrayMatch::All, _) => out.push(Condition::ContainsAll { field: rule.field.clone(), values: scalars }),
    }
}
