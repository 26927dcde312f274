use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A job posting as handed over by ingestion, plus the enrichment added by curation.
///
/// Input fields tolerate absence (empty string) and numeric JSON values
/// (`"applicants": 42`). `summary`, `match` and `suitability` are only set once
/// curation succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub applicants: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability: Option<u8>,
}

/// Validated output of one curation call. Merged into a `JobRecord`, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationResult {
    pub suitability: u8,
    pub job_summary: String,
    pub match_summary: String,
}

impl JobRecord {
    /// Text submitted to the embedding model: title, description and company
    /// concatenated with no separator.
    pub fn embedding_text(&self) -> String {
        format!("{}{}{}", self.title, self.description, self.company)
    }

    pub fn apply_curation(&mut self, result: CurationResult) {
        self.summary = Some(result.job_summary);
        self.match_summary = Some(result.match_summary);
        self.suitability = Some(result.suitability);
    }

    pub fn is_curated(&self) -> bool {
        self.summary.is_some() && self.match_summary.is_some() && self.suitability.is_some()
    }

    /// All fields keyed by their wire name. Iteration is sorted by name, so two
    /// records compare equal here regardless of how their fields were produced.
    pub fn fields(&self) -> BTreeMap<&'static str, Cow<'_, str>> {
        JobField::ALL
            .iter()
            .map(|field| (field.name(), field.value(self)))
            .collect()
    }
}

/// Named field of a `JobRecord`, used for key-based deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    Id,
    Title,
    Url,
    Location,
    Date,
    Applicants,
    Description,
    Company,
    Summary,
    Match,
    Suitability,
}

impl JobField {
    pub const ALL: [JobField; 11] = [
        JobField::Id,
        JobField::Title,
        JobField::Url,
        JobField::Location,
        JobField::Date,
        JobField::Applicants,
        JobField::Description,
        JobField::Company,
        JobField::Summary,
        JobField::Match,
        JobField::Suitability,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JobField::Id => "id",
            JobField::Title => "title",
            JobField::Url => "url",
            JobField::Location => "location",
            JobField::Date => "date",
            JobField::Applicants => "applicants",
            JobField::Description => "description",
            JobField::Company => "company",
            JobField::Summary => "summary",
            JobField::Match => "match",
            JobField::Suitability => "suitability",
        }
    }

    /// Field value as text; unset enrichment fields read as empty.
    pub fn value(self, job: &JobRecord) -> Cow<'_, str> {
        match self {
            JobField::Id => Cow::Borrowed(&job.id),
            JobField::Title => Cow::Borrowed(&job.title),
            JobField::Url => Cow::Borrowed(&job.url),
            JobField::Location => Cow::Borrowed(&job.location),
            JobField::Date => Cow::Borrowed(&job.date),
            JobField::Applicants => Cow::Borrowed(&job.applicants),
            JobField::Description => Cow::Borrowed(&job.description),
            JobField::Company => Cow::Borrowed(&job.company),
            JobField::Summary => Cow::Borrowed(job.summary.as_deref().unwrap_or("")),
            JobField::Match => Cow::Borrowed(job.match_summary.as_deref().unwrap_or("")),
            JobField::Suitability => job
                .suitability
                .map(|s| Cow::Owned(s.to_string()))
                .unwrap_or(Cow::Borrowed("")),
        }
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown job field '{s}'"))
    }
}

/// Accepts strings, numbers, booleans and null for text fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
