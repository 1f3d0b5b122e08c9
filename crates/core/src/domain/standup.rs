use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::entry::{parse_entry_date, EntryKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standup {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// An entry as the backend reports it when listing a standup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandupItem {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandupItems {
    #[serde(default)]
    pub faces: Vec<StandupItem>,
    #[serde(default)]
    pub helps: Vec<StandupItem>,
    #[serde(default)]
    pub interestings: Vec<StandupItem>,
    #[serde(default)]
    pub events: Vec<StandupItem>,
}

impl StandupItems {
    pub fn is_empty(&self) -> bool {
        EntryKind::ALL.iter().all(|kind| self.category(*kind).is_empty())
    }

    pub fn category(&self, kind: EntryKind) -> &[StandupItem] {
        match kind {
            EntryKind::Face => &self.faces,
            EntryKind::Help => &self.helps,
            EntryKind::Interesting => &self.interestings,
            EntryKind::Event => &self.events,
        }
    }

    fn category_mut(&mut self, kind: EntryKind) -> &mut Vec<StandupItem> {
        match kind {
            EntryKind::Face => &mut self.faces,
            EntryKind::Help => &mut self.helps,
            EntryKind::Interesting => &mut self.interestings,
            EntryKind::Event => &mut self.events,
        }
    }

    /// Drops items dated after `now + num_days` in the user's time zone.
    /// Items whose date does not parse are kept.
    pub fn filter_out_old(&mut self, now: DateTime<Utc>, num_days: i64, time_zone: &str) {
        let Some(cutoff) = cutoff_date(now, num_days, time_zone) else {
            return;
        };
        for kind in EntryKind::ALL {
            self.category_mut(kind).retain(|item| match parse_entry_date(item.date.trim()) {
                Some(date) => date <= cutoff,
                None => true,
            });
        }
    }

    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        for kind in EntryKind::ALL {
            let items = self.category(kind);
            if items.is_empty() {
                continue;
            }
            let mut section = kind.keyword().to_ascii_uppercase();
            for item in items {
                section.push_str(&format!("\n  • *{}*", item.title));
                if let Some(author) = item.author.as_deref().filter(|value| !value.is_empty()) {
                    section.push_str(&format!(" ({author})"));
                }
                if !item.date.is_empty() {
                    section.push_str(&format!(" {}", item.date));
                }
                if let Some(description) =
                    item.description.as_deref().map(str::trim).filter(|value| !value.is_empty())
                {
                    section.push_str(&format!("\n    {description}"));
                }
            }
            sections.push(section);
        }
        sections.join("\n\n")
    }
}

/// Unknown time zone names fall back to UTC.
pub fn resolve_time_zone(name: &str) -> Tz {
    name.trim().parse::<Tz>().unwrap_or(Tz::UTC)
}

fn cutoff_date(now: DateTime<Utc>, num_days: i64, time_zone: &str) -> Option<NaiveDate> {
    let local_today = now.with_timezone(&resolve_time_zone(time_zone)).date_naive();
    let offset = Days::new(num_days.unsigned_abs());
    if num_days >= 0 {
        local_today.checked_add_days(offset)
    } else {
        local_today.checked_sub_days(offset)
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}
