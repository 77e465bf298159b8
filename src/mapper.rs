//! Mapping from raw ISIS records to the canonical payload shapes expected
//! by the Kernel API.
//!
//! The transforms are deterministic and total over well-formed records. No
//! payload key ever serializes as `null`: optional groups render as `""`,
//! `[]` or `{}`, except `supplement` and the `contact` sub-keys which are
//! present only when set.

use chrono::format::{parse, Parsed, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::identifier::bundle_id;
use crate::records::{IssueKind, RawIssue, RawJournal};

/// A `{language, value}` pair, used by missions and issue titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageValue {
    pub language: String,
    pub value: String,
}

/// Current lifecycle status of a journal. Serializes to `{}` when the
/// record carries no status history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JournalStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Link to a predecessor or successor title, by name. Serializes to `{}`
/// when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sponsor {
    pub name: String,
}

/// Canonical journal payload, minus its `_id` (the SciELO ISSN), which is
/// carried separately because it doubles as the registry id.
#[derive(Debug, Clone, Serialize)]
pub struct JournalPayload {
    pub mission: Vec<LanguageValue>,
    pub title: String,
    pub title_iso: String,
    pub short_title: String,
    pub acronym: String,
    pub scielo_issn: String,
    pub print_issn: String,
    pub electronic_issn: String,
    pub status: JournalStatus,
    pub subject_areas: Vec<String>,
    pub sponsors: Vec<Sponsor>,
    pub subject_categories: Vec<String>,
    pub online_submission_url: String,
    pub next_journal: TitleLink,
    pub previous_journal: TitleLink,
    pub contact: Contact,
}

/// Canonical issue (bundle) payload, minus its derived `_id`.
#[derive(Debug, Clone, Serialize)]
pub struct BundlePayload {
    pub volume: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplement: Option<String>,
    pub titles: Vec<LanguageValue>,
    /// `[min_month, max_month]` with duplicates collapsed, or empty.
    pub publication_season: Vec<u32>,
}

/// Maps a raw journal record to `(registry id, payload)`.
pub fn journal_as_kernel(journal: &RawJournal) -> Result<(String, JournalPayload), RecordError> {
    let scielo_issn = journal
        .scielo_issn
        .clone()
        .ok_or(RecordError::MissingScieloIssn)?;

    let status = match journal.status_history.last() {
        Some(entry) => JournalStatus {
            status: Some(entry.status.clone()),
            reason: entry.reason.clone(),
        },
        None => JournalStatus::default(),
    };

    let subject_areas = journal
        .subject_areas
        .iter()
        .map(|area| normalize_subject_area(area))
        .collect();

    let payload = JournalPayload {
        mission: journal
            .mission
            .iter()
            .map(|(language, value)| LanguageValue {
                language: language.clone(),
                value: value.clone(),
            })
            .collect(),
        title: journal.title.clone().unwrap_or_default(),
        title_iso: journal.title_iso.clone().unwrap_or_default(),
        short_title: journal.short_title.clone().unwrap_or_default(),
        acronym: journal.acronym.clone().unwrap_or_default(),
        scielo_issn: scielo_issn.clone(),
        print_issn: journal.print_issn.clone().unwrap_or_default(),
        electronic_issn: journal.electronic_issn.clone().unwrap_or_default(),
        status,
        subject_areas,
        sponsors: journal
            .sponsors
            .iter()
            .map(|name| Sponsor { name: name.clone() })
            .collect(),
        subject_categories: journal.wos_subject_areas.clone(),
        online_submission_url: journal.submission_url.clone().unwrap_or_default(),
        next_journal: TitleLink {
            name: journal.next_title.clone(),
        },
        previous_journal: TitleLink {
            name: journal.previous_title.clone(),
        },
        contact: Contact {
            email: journal.editor_email.clone(),
            address: journal.editor_address.clone(),
        },
    };

    Ok((scielo_issn, payload))
}

/// The title base carries one miscategorized subject area; this is the
/// single hard-coded rewrite and must not be generalized.
fn normalize_subject_area(area: &str) -> String {
    let upper = area.to_uppercase();
    if upper == "LINGUISTICS, LETTERS AND ARTS" {
        "LINGUISTIC, LITERATURE AND ARTS".to_string()
    } else {
        upper
    }
}

/// Maps a raw issue record to `(bundle id, payload)`.
pub fn issue_as_kernel(issue: &RawIssue) -> Result<(String, BundlePayload), RecordError> {
    let label = issue.label();

    let supplement = match issue.kind() {
        IssueKind::Supplement => Some(
            issue
                .supplement_volume
                .clone()
                .filter(|label| !label.is_empty())
                .or_else(|| {
                    issue
                        .supplement_number
                        .clone()
                        .filter(|label| !label.is_empty())
                })
                .unwrap_or_else(|| "0".to_string()),
        ),
        _ => None,
    };

    let publication_season = match (&issue.start_month, &issue.end_month) {
        (Some(start), Some(end)) => {
            let mut season = vec![parse_month(start, &label)?, parse_month(end, &label)?];
            season.sort_unstable();
            season.dedup();
            season
        }
        _ => Vec::new(),
    };

    let issn = issue
        .journal_issn
        .as_deref()
        .ok_or_else(|| RecordError::MissingJournalLink {
            record: label.clone(),
        })?;

    let date = issue.publication_date.as_deref().ok_or_else(|| {
        RecordError::MissingPublicationDate {
            record: label.clone(),
        }
    })?;
    let year = publication_year(date).ok_or_else(|| RecordError::UnparseableDate {
        record: label.clone(),
        date: date.to_string(),
    })?;

    let id = bundle_id(
        issn,
        &year.to_string(),
        issue.volume.as_deref(),
        issue.number.as_deref(),
        supplement.as_deref(),
    );

    let payload = BundlePayload {
        volume: issue.volume.clone().unwrap_or_default(),
        number: issue.number.clone().unwrap_or_default(),
        supplement,
        titles: issue
            .titles
            .iter()
            .map(|(language, value)| LanguageValue {
                language: language.clone(),
                value: value.clone(),
            })
            .collect(),
        publication_season,
    };

    Ok((id, payload))
}

fn parse_month(raw: &str, label: &str) -> Result<u32, RecordError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| RecordError::InvalidMonth {
            record: label.to_string(),
            value: raw.to_string(),
        })
}

/// Extracts the publication year, trying the three accepted date formats in
/// order of specificity. The first complete match wins.
fn publication_year(raw: &str) -> Option<i32> {
    for format in ["%Y-%m-%d", "%Y-%m", "%Y"] {
        let mut parsed = Parsed::new();
        if parse(&mut parsed, raw, StrftimeItems::new(format)).is_ok() {
            if let Some(year) = parsed.year {
                return Some(year);
            }
        }
    }
    None
}
