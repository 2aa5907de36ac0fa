use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use crate::slug::slugify;
use crate::timestamp::parse_strict_utc;

/// Fields stored under a current and a legacy key. A row may use one or the other.
const ALIASED_FIELDS: [(&str, &str); 3] = [
    ("publishAt", "publish_at"),
    ("publishedAt", "published_at"),
    ("repoVisibility", "gitRepoPrivate"),
];

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Row index, or `None` for list-level problems.
    pub index: Option<usize>,
    pub field: &'static str,
    pub msg: &'static str,
}

impl ValidationIssue {
    fn row(index: usize, field: &'static str, msg: &'static str) -> Self {
        Self {
            index: Some(index),
            field,
            msg,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

pub fn validate_task_list(list: &Value) -> ValidationReport {
    validate_task_list_at(list, OffsetDateTime::now_utc())
}

/// Collects every violation in a caller-submitted task list.
pub fn validate_task_list_at(list: &Value, now: OffsetDateTime) -> ValidationReport {
    let Some(rows) = list.as_array() else {
        return ValidationReport {
            ok: false,
            errors: vec![ValidationIssue {
                index: None,
                field: "*",
                msg: "body-not-array",
            }],
            warnings: Vec::new(),
        };
    };

    let mut report = ValidationReport::default();
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(row) = row.as_object() else {
            report.errors.push(ValidationIssue::row(index, "*", "row-not-object"));
            continue;
        };

        check_name(index, row, &mut seen_names, &mut seen_slugs, &mut report);
        check_paths(index, row, &mut report);
        check_publish_at(index, row, now, &mut report);

        if let Some(value) = field(row, &["publishedAt", "published_at"])
            && !(value.is_null() || value.is_string())
        {
            report
                .errors
                .push(ValidationIssue::row(index, "publishedAt", "must-be-string-or-null"));
        }

        for key in ["draftPath", "livePath"] {
            if let Some(value) = row.get(key)
                && !(value.is_null() || value.is_string())
            {
                report
                    .errors
                    .push(ValidationIssue::row(index, key, "must-be-string-or-null"));
            }
        }

        for (field_name, alias) in ALIASED_FIELDS {
            if row.contains_key(field_name) && row.contains_key(alias) {
                report
                    .errors
                    .push(ValidationIssue::row(index, field_name, "conflicting-alias"));
            }
        }

        if let Some(value) = field(row, &["repoVisibility", "gitRepoPrivate"])
            && !(value.is_null() || value.is_boolean())
        {
            report.errors.push(ValidationIssue::row(
                index,
                "repoVisibility",
                "must-be-boolean-or-null",
            ));
        }
    }

    if report.errors.is_empty() {
        tracing::debug!(rows = rows.len(), warnings = report.warnings.len(), "task list valid");
    } else {
        tracing::warn!(
            rows = rows.len(),
            errors = report.errors.len(),
            first = ?report.errors.first(),
            "task list invalid"
        );
    }

    report.ok = report.errors.is_empty();
    report
}

fn check_name(
    index: usize,
    row: &Map<String, Value>,
    seen_names: &mut HashSet<String>,
    seen_slugs: &mut HashSet<String>,
    report: &mut ValidationReport,
) {
    let name = text(row, &["name"]);
    if name.is_empty() {
        report.errors.push(ValidationIssue::row(index, "name", "required"));
        return;
    }

    if !seen_names.insert(name.to_lowercase()) {
        report.errors.push(ValidationIssue::row(index, "name", "duplicate-ci"));
    }

    let slug = slugify(&name);
    if slug.is_empty() {
        report
            .errors
            .push(ValidationIssue::row(index, "name", "invalid-after-sanitize"));
    } else if !seen_slugs.insert(slug) {
        report
            .errors
            .push(ValidationIssue::row(index, "name", "duplicate-sanitized"));
    }
}

fn check_paths(index: usize, row: &Map<String, Value>, report: &mut ValidationReport) {
    let draft = text(row, &["draftPath"]);
    if !draft.is_empty() && !within_root(&draft, "drafts") {
        report
            .errors
            .push(ValidationIssue::row(index, "draftPath", "invalid-drafts"));
    }

    let live = text(row, &["livePath"]);
    if !live.is_empty() && !within_root(&live, "projects") {
        report
            .warnings
            .push(ValidationIssue::row(index, "livePath", "invalid-projects"));
    }
}

fn check_publish_at(
    index: usize,
    row: &Map<String, Value>,
    now: OffsetDateTime,
    report: &mut ValidationReport,
) {
    let publish_at = text(row, &["publishAt", "publish_at"]);
    if publish_at.is_empty() {
        report
            .errors
            .push(ValidationIssue::row(index, "publishAt", "required"));
        return;
    }

    match parse_strict_utc(&publish_at) {
        None => report.errors.push(ValidationIssue::row(
            index,
            "publishAt",
            "invalid-iso8601-utc",
        )),
        Some(instant) if instant + Duration::seconds(1) < now => report
            .warnings
            .push(ValidationIssue::row(index, "publishAt", "in-past")),
        Some(_) => {}
    }
}

fn field<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| row.get(*key))
}

/// String value of the first present key, trimmed. Non-strings read as empty.
fn text(row: &Map<String, Value>, keys: &[&str]) -> String {
    field(row, keys)
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn within_root(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}
