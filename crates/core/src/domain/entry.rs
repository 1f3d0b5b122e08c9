use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Face,
    Help,
    Interesting,
    Event,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [Self::Face, Self::Help, Self::Interesting, Self::Event];

    /// Command keyword that starts a draft of this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Face => "faces",
            Self::Help => "helps",
            Self::Interesting => "interestings",
            Self::Event => "events",
        }
    }

    /// Value of the remote `kind` field.
    pub fn label(self) -> &'static str {
        match self {
            Self::Face => "New face",
            Self::Help => "Help",
            Self::Interesting => "Interesting",
            Self::Event => "Event",
        }
    }

    pub fn has_body(self) -> bool {
        !matches!(self, Self::Face)
    }

    fn title_field(self) -> &'static str {
        match self {
            Self::Face => "name",
            _ => "title",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("{} entries do not have a body", .0.keyword())]
    BodyNotSupported(EntryKind),
    #[error("`{0}` is not a YYYY-MM-DD date")]
    InvalidDate(String),
}

/// Fields shared by every entry kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub author: String,
    pub title: String,
    pub body: String,
    pub date: String,
    /// Backend-assigned identifier; empty until the first successful create.
    pub id: String,
}

impl Entry {
    pub fn new(author: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            body: String::new(),
            date: now.format(DATE_FORMAT).to_string(),
            id: String::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        !self.id.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Post,
    Patch,
}

impl RequestMethod {
    pub fn is_post(&self) -> bool {
        matches!(self, Self::Post)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WhiteboardItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: String,
    pub kind: String,
    pub author: String,
    pub public: String,
    pub standup_id: i64,
}

/// Body of a create or update call against the whiteboard backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WhiteboardRequest {
    pub utf8: String,
    #[serde(rename = "_method", skip_serializing_if = "RequestMethod::is_post")]
    pub method: RequestMethod,
    pub commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub item: WhiteboardItem,
}

/// A draft of one of the four entry kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryVariant {
    kind: EntryKind,
    entry: Entry,
}

impl EntryVariant {
    pub fn new(kind: EntryKind, entry: Entry) -> Self {
        Self { kind, entry }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn entry_mut(&mut self) -> &mut Entry {
        &mut self.entry
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.entry.title = title.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) -> Result<(), EntryError> {
        if !self.kind.has_body() {
            return Err(EntryError::BodyNotSupported(self.kind));
        }
        self.entry.body = body.into();
        Ok(())
    }

    /// Accepts only zero-padded `YYYY-MM-DD`; the draft is untouched on error.
    pub fn set_date(&mut self, input: &str) -> Result<(), EntryError> {
        let date = parse_entry_date(input.trim())
            .ok_or_else(|| EntryError::InvalidDate(input.to_owned()))?;
        self.entry.date = date.format(DATE_FORMAT).to_string();
        Ok(())
    }

    pub fn validate(&self) -> bool {
        let entry = &self.entry;
        let common = !entry.title.trim().is_empty() && !entry.date.trim().is_empty();
        if self.kind.has_body() {
            common && !entry.body.trim().is_empty()
        } else {
            common
        }
    }

    pub fn render(&self) -> String {
        let entry = &self.entry;
        let mut rendered =
            format!("{}\n  *{}: {}\n", self.kind.keyword(), self.kind.title_field(), entry.title);
        if self.kind.has_body() {
            rendered.push_str(&format!("  *body: {}\n", entry.body));
        }
        rendered.push_str(&format!("  date: {}", entry.date));
        rendered
    }

    pub fn create_request(&self, standup_id: i64) -> WhiteboardRequest {
        WhiteboardRequest {
            utf8: "✓".to_owned(),
            method: RequestMethod::Post,
            commit: format!("Create {}", self.commit_subject()),
            id: None,
            item: self.item(standup_id),
        }
    }

    pub fn update_request(&self, standup_id: i64) -> WhiteboardRequest {
        WhiteboardRequest {
            utf8: "✓".to_owned(),
            method: RequestMethod::Patch,
            commit: format!("Update {}", self.commit_subject()),
            id: Some(self.entry.id.clone()),
            item: self.item(standup_id),
        }
    }

    /// Update once the backend has assigned an id, create before that.
    pub fn submission_request(&self, standup_id: i64) -> WhiteboardRequest {
        if self.entry.is_submitted() {
            self.update_request(standup_id)
        } else {
            self.create_request(standup_id)
        }
    }

    fn commit_subject(&self) -> &'static str {
        match self.kind {
            EntryKind::Face => "New Face",
            other => other.label(),
        }
    }

    fn item(&self, standup_id: i64) -> WhiteboardItem {
        let entry = &self.entry;
        WhiteboardItem {
            title: entry.title.clone(),
            description: self.kind.has_body().then(|| entry.body.clone()),
            date: entry.date.clone(),
            kind: self.kind.label().to_owned(),
            author: entry.author.clone(),
            public: "false".to_owned(),
            standup_id,
        }
    }
}

pub fn parse_entry_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes.iter().enumerate().all(|(index, byte)| index == 4 || index == 7 || byte.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}
