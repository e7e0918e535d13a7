//! Label and field selectors applied by the fake API server on list requests
//!
//! Label selectors support the full Kubernetes syntax (`a=b`, `a==b`, `a!=b`,
//! `a in (x,y)`, `a notin (x,y)`, `a`, `!a`) and are evaluated with
//! `kube::core::Selector`. Field selectors support equality and inequality on
//! the fields real servers index: `metadata.name`, `metadata.namespace`, and for
//! Shoots `spec.seedName`, `spec.cloudProfileName` and `status.seedName`.

use crate::{Error, Result};
use kube::core::{Expression, Selector, SelectorExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Parse a label selector string.
pub fn parse_label_selector(selector: &str) -> Result<Selector> {
    let mut expressions = Vec::new();

    for requirement in split_requirements(selector) {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            continue;
        }
        expressions.push(parse_requirement(requirement)?);
    }

    Ok(Selector::from_iter(expressions))
}

fn parse_requirement(requirement: &str) -> Result<Expression> {
    if let Some((key, values)) = requirement.split_once(" notin ") {
        return Ok(Expression::NotIn(key.trim().to_string(), parse_set(requirement, values)?));
    }
    if let Some((key, values)) = requirement.split_once(" in ") {
        return Ok(Expression::In(key.trim().to_string(), parse_set(requirement, values)?));
    }
    if let Some(key) = requirement.strip_prefix('!') {
        return Ok(Expression::DoesNotExist(key.trim().to_string()));
    }
    if let Some((key, value)) = requirement.split_once("!=") {
        return Ok(Expression::NotEqual(key.trim().to_string(), value.trim().to_string()));
    }
    if let Some((key, value)) = requirement
        .split_once("==")
        .or_else(|| requirement.split_once('='))
    {
        return Ok(Expression::Equal(key.trim().to_string(), value.trim().to_string()));
    }
    if requirement.contains(char::is_whitespace) {
        return Err(Error::InvalidRequest(format!(
            "unable to parse requirement: {}",
            requirement
        )));
    }
    Ok(Expression::Exists(requirement.to_string()))
}

fn parse_set(requirement: &str, values: &str) -> Result<BTreeSet<String>> {
    let inner = values
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| {
            Error::InvalidRequest(format!("set values must be parenthesised: {}", requirement))
        })?;

    Ok(inner
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

/// Split on commas that are not inside a parenthesised value set
fn split_requirements(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

/// Whether an object's labels satisfy a label selector string.
pub fn matches_labels(obj: &Value, selector: &str) -> Result<bool> {
    let selector = parse_label_selector(selector)?;
    let labels: BTreeMap<String, String> = obj
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.as_object())
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(selector.matches(&labels))
}

/// Whether an object satisfies a field selector string.
pub fn matches_fields(obj: &Value, selector: &str) -> Result<bool> {
    let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or_default();

    for requirement in selector.split(',') {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            continue;
        }

        let (field, expected, negated) = if let Some((f, v)) = requirement.split_once("!=") {
            (f, v, true)
        } else if let Some((f, v)) = requirement
            .split_once("==")
            .or_else(|| requirement.split_once('='))
        {
            (f, v, false)
        } else {
            return Err(Error::InvalidRequest(format!(
                "invalid field selector: {}",
                requirement
            )));
        };

        let field = field.trim();
        let path = field_path(kind, field).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "field label not supported for {}: {}",
                kind, field
            ))
        })?;

        let actual = path
            .iter()
            .try_fold(obj, |value, segment| value.get(segment))
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if (actual == expected.trim()) == negated {
            return Ok(false);
        }
    }

    Ok(true)
}

fn field_path(kind: &str, field: &str) -> Option<&'static [&'static str]> {
    match (kind, field) {
        (_, "metadata.name") => Some(&["metadata", "name"]),
        (_, "metadata.namespace") => Some(&["metadata", "namespace"]),
        ("Shoot", "spec.seedName") => Some(&["spec", "seedName"]),
        ("Shoot", "spec.cloudProfileName") => Some(&["spec", "cloudProfileName"]),
        ("Shoot", "status.seedName") => Some(&["status", "seedName"]),
        _ => None,
    }
}
