use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Birthday {
    pub id: u64,
    pub owner: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub birthday: NaiveDate,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<u64>,
}

impl Birthday {
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Field values for a birthday that has not been stored yet, or the new
/// values of one being edited. Ids and ownership are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct BirthdayDraft {
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub image: Option<String>,
    pub tags: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Congratulation {
    pub id: u64,
    pub birthday_id: u64,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

/// A birthday with its tags and owner already resolved, as shown in the list.
#[derive(Debug, Clone, Serialize)]
pub struct BirthdayRow {
    #[serde(flatten)]
    pub birthday: Birthday,
    pub full_name: String,
    pub tag_names: Vec<String>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CongratulationRow {
    #[serde(flatten)]
    pub congratulation: Congratulation,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}
