//! Result log types
//!
//! A `ResultLog` is what one remote submission hands back: the ordered list of
//! object changes, plus the transaction digest and any packages it published.
//! Logs are assembled once through `ResultLogBuilder` and are read-only afterwards.

use serde::Serialize;
use std::fmt;

/// Kind of change reported for one object.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Mutated,
    Published,
    Other,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Mutated => write!(f, "mutated"),
            Self::Published => write!(f, "published"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One entry in a result log.
///
/// `identifier` is present iff the record is `Created` with a declared type.
/// The constructors are the only way to build one, so the invariant holds by construction.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChangeRecord {
    kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,
}

impl ChangeRecord {
    pub fn created(declared_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Created,
            declared_type: Some(declared_type.into()),
            identifier: Some(identifier.into()),
        }
    }

    pub fn mutated(declared_type: Option<String>) -> Self {
        Self {
            kind: ChangeKind::Mutated,
            declared_type,
            identifier: None,
        }
    }

    pub fn published() -> Self {
        Self {
            kind: ChangeKind::Published,
            declared_type: None,
            identifier: None,
        }
    }

    /// Transferred, wrapped, deleted and anything else the node reports.
    pub fn other(declared_type: Option<String>) -> Self {
        Self {
            kind: ChangeKind::Other,
            declared_type,
            identifier: None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.kind == ChangeKind::Created
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9}", self.kind)?;
        if let Some(t) = &self.declared_type {
            write!(f, " {}", t)?;
        }
        if let Some(id) = &self.identifier {
            write!(f, " {}", id)?;
        }
        Ok(())
    }
}

/// Ordered change records from a single submission.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ResultLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    records: Vec<ChangeRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    published: Vec<String>,
}

impl ResultLog {
    pub fn builder() -> ResultLogBuilder {
        ResultLogBuilder::default()
    }

    /// Shorthand for a log made only of records (no digest, no packages).
    pub fn from_records(records: Vec<ChangeRecord>) -> Self {
        Self {
            digest: None,
            records,
            published: Vec::new(),
        }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// First package published by this submission, if any.
    pub fn published_package(&self) -> Option<&str> {
        self.published.first().map(|s| s.as_str())
    }

    pub fn find_one_by_type(&self, declared_type: &str) -> Option<&str> {
        crate::lookup::find_one_by_type(self, declared_type)
    }

    pub fn created(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| r.is_created())
    }
}

impl fmt::Display for ResultLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(d) = &self.digest {
            writeln!(f, "digest {}", d)?;
        }
        for pkg in &self.published {
            writeln!(f, "package {}", pkg)?;
        }
        for record in &self.records {
            writeln!(f, "  {}", record)?;
        }
        Ok(())
    }
}

/// Collects records while a submission's response is being decoded.
#[derive(Default, Debug)]
pub struct ResultLogBuilder {
    digest: Option<String>,
    records: Vec<ChangeRecord>,
    published: Vec<String>,
}

impl ResultLogBuilder {
    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn record(mut self, record: ChangeRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn created(self, declared_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        self.record(ChangeRecord::created(declared_type, identifier))
    }

    /// Records a `Published` change in order and remembers the package id.
    pub fn published(mut self, package_id: impl Into<String>) -> Self {
        self.published.push(package_id.into());
        self.record(ChangeRecord::published())
    }

    pub fn build(self) -> ResultLog {
        ResultLog {
            digest: self.digest,
            records: self.records,
            published: self.published,
        }
    }
}
