//! Adapter over raw ISIS records as dumped by isis2json.
//!
//! A raw record is a JSON object keyed by legacy field tags (`"v100"`,
//! `"v35"`, ...); each tag maps to an array of occurrences, and each
//! occurrence is an object whose `"_"` key holds the main value with any
//! remaining keys as subfields (`"l"` = language, etc.).
//!
//! Field codes are translated into named optional fields here, once, at the
//! input boundary. Downstream code never touches a `v`-tag again.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// One raw record from an isis2json dump, still keyed by field tags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct IsisRecord(pub Map<String, Value>);

impl IsisRecord {
    fn occurrences(&self, tag: &str) -> impl Iterator<Item = &Value> {
        self.0
            .get(tag)
            .and_then(Value::as_array)
            .map(|occurrences| occurrences.iter())
            .into_iter()
            .flatten()
    }

    /// Main value (`"_"`) of the first occurrence of `tag`, if non-empty.
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.occurrences(tag).find_map(occurrence_value)
    }

    /// Like [`first`](Self::first), but a present-and-empty occurrence yields
    /// `Some("")`. Supplement markers rely on presence, not content.
    pub fn first_raw(&self, tag: &str) -> Option<&str> {
        self.occurrences(tag)
            .next()
            .map(|occurrence| occurrence.get("_").and_then(Value::as_str).unwrap_or(""))
    }

    /// Main values of every occurrence of `tag`, empty ones skipped.
    pub fn values(&self, tag: &str) -> Vec<String> {
        self.occurrences(tag)
            .filter_map(occurrence_value)
            .map(str::to_string)
            .collect()
    }

    /// `(subfield, main value)` pairs for multilingual repeatable fields.
    pub fn pairs(&self, tag: &str, subfield: &str) -> Vec<(String, String)> {
        self.occurrences(tag)
            .filter_map(|occurrence| {
                let key = occurrence.get(subfield).and_then(Value::as_str)?;
                let value = occurrence_value(occurrence)?;
                Some((key.to_string(), value.to_string()))
            })
            .collect()
    }

    fn subfields(&self, tag: &str) -> Vec<BTreeMap<String, String>> {
        self.occurrences(tag)
            .filter_map(Value::as_object)
            .map(|occurrence| {
                occurrence
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .collect()
    }
}

fn occurrence_value(occurrence: &Value) -> Option<&str> {
    occurrence
        .get("_")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// One entry of a journal's status history (v51: `a` date, `b` status,
/// `c` reason). The last entry is the journal's current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub date: Option<String>,
    pub status: String,
    pub reason: Option<String>,
}

/// A journal record from the title base, field codes resolved.
#[derive(Debug, Clone, Default)]
pub struct RawJournal {
    pub scielo_issn: Option<String>,
    pub title: Option<String>,
    pub title_iso: Option<String>,
    pub short_title: Option<String>,
    pub acronym: Option<String>,
    pub print_issn: Option<String>,
    pub electronic_issn: Option<String>,
    /// `(language, text)` in occurrence order.
    pub mission: Vec<(String, String)>,
    pub status_history: Vec<StatusEntry>,
    pub subject_areas: Vec<String>,
    pub sponsors: Vec<String>,
    pub wos_subject_areas: Vec<String>,
    pub submission_url: Option<String>,
    pub next_title: Option<String>,
    pub previous_title: Option<String>,
    pub editor_email: Option<String>,
    pub editor_address: Option<String>,
}

impl RawJournal {
    pub fn from_isis(record: &IsisRecord) -> Self {
        // v35 carries the medium of the current ISSN (v935).
        let current_issn = record.first("v935").map(str::to_string);
        let (print_issn, electronic_issn) = match record.first("v35") {
            Some("PRINT") => (current_issn, None),
            Some("ONLIN") => (None, current_issn),
            _ => (None, None),
        };

        let status_history = record
            .subfields("v51")
            .into_iter()
            .filter_map(|occurrence| {
                let status = occurrence.get("b")?.clone();
                Some(StatusEntry {
                    date: occurrence.get("a").cloned(),
                    status,
                    reason: occurrence.get("c").cloned(),
                })
            })
            .collect();

        Self {
            scielo_issn: record.first("v400").map(str::to_string),
            title: record.first("v100").map(str::to_string),
            title_iso: record.first("v151").map(str::to_string),
            short_title: record.first("v150").map(str::to_string),
            acronym: record.first("v68").map(str::to_string),
            print_issn,
            electronic_issn,
            mission: record.pairs("v901", "l"),
            status_history,
            subject_areas: record.values("v441"),
            sponsors: record.values("v140"),
            wos_subject_areas: record.values("v854"),
            submission_url: record.first("v692").map(str::to_string),
            next_title: record.first("v710").map(str::to_string),
            previous_title: record.first("v610").map(str::to_string),
            editor_email: record.first("v64").map(str::to_string),
            editor_address: record.first("v63").map(str::to_string),
        }
    }
}

/// The kind of publication an issue record represents. Derived from the
/// number and supplement labels, never stored in the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Regular,
    Ahead,
    PressRelease,
    Supplement,
}

/// An issue record from the issue base, field codes resolved.
#[derive(Debug, Clone, Default)]
pub struct RawIssue {
    /// ISSN of the parent journal (v35).
    pub journal_issn: Option<String>,
    /// Declared sequence position within the journal (v36), still raw.
    pub order: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub supplement_volume: Option<String>,
    pub supplement_number: Option<String>,
    /// `(language, text)` in occurrence order.
    pub titles: Vec<(String, String)>,
    /// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
    pub publication_date: Option<String>,
    pub start_month: Option<String>,
    pub end_month: Option<String>,
}

impl RawIssue {
    pub fn from_isis(record: &IsisRecord) -> Self {
        // Cover months: v64 is repeatable, occurrence 0 = start, 1 = end.
        let months = record.values("v64");

        Self {
            journal_issn: record.first("v35").map(str::to_string),
            order: record.first("v36").map(str::to_string),
            volume: record.first("v31").map(str::to_string),
            number: record.first("v32").map(str::to_string),
            supplement_volume: record.first_raw("v131").map(str::to_string),
            supplement_number: record.first_raw("v132").map(str::to_string),
            titles: record.pairs("v33", "l"),
            publication_date: record.first("v65").map(str::to_string),
            start_month: months.first().cloned(),
            end_month: months.get(1).cloned(),
        }
    }

    pub fn kind(&self) -> IssueKind {
        let number = self.number.as_deref().unwrap_or("");
        if number.to_lowercase().contains("pr") {
            IssueKind::PressRelease
        } else if number.eq_ignore_ascii_case("ahead") {
            IssueKind::Ahead
        } else if self.supplement_volume.is_some() || self.supplement_number.is_some() {
            IssueKind::Supplement
        } else {
            IssueKind::Regular
        }
    }

    /// Short identity string for log and error messages.
    pub fn label(&self) -> String {
        let mut parts = vec![self
            .journal_issn
            .clone()
            .unwrap_or_else(|| "<no issn>".to_string())];
        if let Some(volume) = &self.volume {
            parts.push(format!("v{volume}"));
        }
        if let Some(number) = &self.number {
            parts.push(format!("n{number}"));
        }
        if let Some(date) = &self.publication_date {
            parts.push(date.clone());
        }
        parts.join(" ")
    }
}

/// Drops ahead-of-print and press-release issues, preserving order.
///
/// Applied identically by the entity-mapping path and the membership-linking
/// path so both see the same universe of issues.
pub fn filter_issues(issues: Vec<RawIssue>) -> Vec<RawIssue> {
    issues
        .into_iter()
        .filter(|issue| !matches!(issue.kind(), IssueKind::Ahead | IssueKind::PressRelease))
        .collect()
}
