use crate::models::{Birthday, BirthdayDraft, BirthdayRow, Congratulation, Page, Tag};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

const STORAGE_FILE: &str = "birthdays.json";

/// Which page of the birthday list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(usize),
    Last,
}

impl PageNumber {
    /// Parses the `page` query value. `None` means the value is not a page.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") => Some(PageNumber::Number(1)),
            Some("last") => Some(PageNumber::Last),
            Some(value) => value.parse().ok().map(PageNumber::Number),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    next_birthday_id: u64,
    #[serde(default)]
    next_congratulation_id: u64,
    #[serde(default)]
    next_tag_id: u64,
    #[serde(default)]
    birthdays: Vec<Birthday>,
    #[serde(default)]
    congratulations: Vec<Congratulation>,
    #[serde(default)]
    tags: Vec<Tag>,
}

impl Snapshot {
    fn allocate(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    // Older files may lack the counters, so never hand out an id in use.
    fn repair_counters(&mut self) {
        let max_birthday = self.birthdays.iter().map(|b| b.id).max().unwrap_or(0);
        let max_congratulation = self.congratulations.iter().map(|c| c.id).max().unwrap_or(0);
        let max_tag = self.tags.iter().map(|t| t.id).max().unwrap_or(0);
        self.next_birthday_id = self.next_birthday_id.max(max_birthday);
        self.next_congratulation_id = self.next_congratulation_id.max(max_congratulation);
        self.next_tag_id = self.next_tag_id.max(max_tag);
    }

    fn tag_names(&self, ids: &[u64]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.tags.iter().find(|t| t.id == *id))
            .map(|t| t.name.clone())
            .collect()
    }

    fn check_tags(&self, ids: &[u64]) -> Result<()> {
        for id in ids {
            if !self.tags.iter().any(|t| t.id == *id) {
                bail!("Tag {} does not exist", id);
            }
        }
        Ok(())
    }
}

pub struct BirthdayStorage {
    path: Option<PathBuf>,
    data: RwLock<Snapshot>,
}

impl BirthdayStorage {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(STORAGE_FILE);
        let mut snapshot: Snapshot = if path.exists() {
            let data = fs::read_to_string(&path).context("Failed to read storage file")?;
            serde_json::from_str(&data).context("Failed to parse storage file")?
        } else {
            Snapshot::default()
        };
        snapshot.repair_counters();

        Ok(Self {
            path: Some(path),
            data: RwLock::new(snapshot),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(Snapshot::default()),
        }
    }

    pub async fn create_birthday(&self, owner: Option<String>, draft: BirthdayDraft) -> Result<Birthday> {
        let mut data = self.data.write().await;
        data.check_tags(&draft.tags)?;
        let date = draft.birthday.context("Birthday date is required")?;

        let birthday = Birthday {
            id: Snapshot::allocate(&mut data.next_birthday_id),
            owner,
            first_name: draft.first_name,
            last_name: draft.last_name,
            birthday: date,
            image: draft.image,
            tags: draft.tags,
        };
        data.birthdays.push(birthday.clone());
        self.save_to_disk(&data)?;
        debug!(id = birthday.id, "birthday created");
        Ok(birthday)
    }

    /// Replaces the editable fields of a birthday. The owner is kept, and an
    /// absent image in the draft keeps the stored one.
    pub async fn update_birthday(&self, id: u64, draft: BirthdayDraft) -> Result<Option<Birthday>> {
        let mut data = self.data.write().await;
        data.check_tags(&draft.tags)?;
        let date = draft.birthday.context("Birthday date is required")?;

        let Some(birthday) = data.birthdays.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        birthday.first_name = draft.first_name;
        birthday.last_name = draft.last_name;
        birthday.birthday = date;
        if draft.image.is_some() {
            birthday.image = draft.image;
        }
        birthday.tags = draft.tags;
        let updated = birthday.clone();

        self.save_to_disk(&data)?;
        Ok(Some(updated))
    }

    /// Removes a birthday together with its congratulations.
    pub async fn delete_birthday(&self, id: u64) -> Result<Option<Birthday>> {
        let mut data = self.data.write().await;
        let Some(index) = data.birthdays.iter().position(|b| b.id == id) else {
            return Ok(None);
        };
        let removed = data.birthdays.remove(index);
        data.congratulations.retain(|c| c.birthday_id != id);
        self.save_to_disk(&data)?;
        debug!(id, "birthday deleted");
        Ok(Some(removed))
    }

    pub async fn get_birthday(&self, id: u64) -> Result<Option<Birthday>> {
        let data = self.data.read().await;
        Ok(data.birthdays.iter().find(|b| b.id == id).cloned())
    }

    pub async fn get_all_birthdays(&self) -> Result<Vec<Birthday>> {
        let data = self.data.read().await;
        let mut birthdays = data.birthdays.clone();
        birthdays.sort_by_key(|b| b.id);
        Ok(birthdays)
    }

    /// One page of birthdays ordered by id, with tag names resolved in the
    /// same read. Returns `None` when the page does not exist.
    pub async fn list_page(&self, page: PageNumber, page_size: usize) -> Result<Option<Page<BirthdayRow>>> {
        let page_size = page_size.max(1);
        let data = self.data.read().await;

        let mut ordered: Vec<&Birthday> = data.birthdays.iter().collect();
        ordered.sort_by_key(|b| b.id);

        let total = ordered.len();
        // An empty list still has one (empty) page.
        let num_pages = total.div_ceil(page_size).max(1);
        let number = match page {
            PageNumber::Last => num_pages,
            PageNumber::Number(n) if n >= 1 && n <= num_pages => n,
            PageNumber::Number(_) => return Ok(None),
        };

        let items = ordered
            .into_iter()
            .skip((number - 1) * page_size)
            .take(page_size)
            .map(|b| BirthdayRow {
                full_name: b.full_name(),
                tag_names: data.tag_names(&b.tags),
                owner_name: None,
                birthday: b.clone(),
            })
            .collect();

        Ok(Some(Page {
            items,
            number,
            num_pages,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
        }))
    }

    pub async fn add_congratulation(&self, birthday_id: u64, author: String, text: String) -> Result<Congratulation> {
        let mut data = self.data.write().await;
        if !data.birthdays.iter().any(|b| b.id == birthday_id) {
            bail!("Birthday {} does not exist", birthday_id);
        }

        let congratulation = Congratulation {
            id: Snapshot::allocate(&mut data.next_congratulation_id),
            birthday_id,
            author,
            text,
            created_at: Utc::now(),
        };
        data.congratulations.push(congratulation.clone());
        self.save_to_disk(&data)?;
        Ok(congratulation)
    }

    /// Congratulations of one birthday, oldest first.
    pub async fn congratulations_for(&self, birthday_id: u64) -> Result<Vec<Congratulation>> {
        let data = self.data.read().await;
        let mut congratulations: Vec<Congratulation> = data
            .congratulations
            .iter()
            .filter(|c| c.birthday_id == birthday_id)
            .cloned()
            .collect();
        congratulations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(congratulations)
    }

    pub async fn count_congratulations(&self, birthday_id: u64) -> Result<usize> {
        let data = self.data.read().await;
        Ok(data.congratulations.iter().filter(|c| c.birthday_id == birthday_id).count())
    }

    pub async fn add_tag(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Tag name cannot be empty");
        }

        let mut data = self.data.write().await;
        if data.tags.iter().any(|t| t.name == name) {
            bail!("Tag '{}' already exists", name);
        }
        let tag = Tag {
            id: Snapshot::allocate(&mut data.next_tag_id),
            name: name.to_string(),
        };
        data.tags.push(tag.clone());
        self.save_to_disk(&data)?;
        Ok(tag)
    }

    pub async fn get_all_tags(&self) -> Result<Vec<Tag>> {
        let data = self.data.read().await;
        let mut tags = data.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    pub async fn tag_names(&self, ids: &[u64]) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(data.tag_names(ids))
    }

    fn save_to_disk(&self, data: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data).context("Failed to serialize birthdays")?;
        fs::write(path, json).context("Failed to write to storage file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(first_name: &str) -> BirthdayDraft {
        BirthdayDraft {
            first_name: first_name.to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 17),
            ..Default::default()
        }
    }

    #[test]
    fn page_number_parsing() {
        assert_eq!(PageNumber::parse(None), Some(PageNumber::Number(1)));
        assert_eq!(PageNumber::parse(Some("3")), Some(PageNumber::Number(3)));
        assert_eq!(PageNumber::parse(Some("last")), Some(PageNumber::Last));
        assert_eq!(PageNumber::parse(Some("two")), None);
    }

    #[tokio::test]
    async fn list_is_ordered_and_paginated() {
        let storage = BirthdayStorage::in_memory();
        for i in 0..23 {
            storage.create_birthday(None, draft(&format!("Person{i}"))).await.unwrap();
        }

        let first = storage.list_page(PageNumber::Number(1), 10).await.unwrap().unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.num_pages, 3);
        let ids: Vec<u64> = first.items.iter().map(|r| r.birthday.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert!(!first.has_previous);
        assert!(first.has_next);

        let last = storage.list_page(PageNumber::Last, 10).await.unwrap().unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(last.items.len(), 3);

        assert!(storage.list_page(PageNumber::Number(4), 10).await.unwrap().is_none());
        assert!(storage.list_page(PageNumber::Number(0), 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_list_has_a_first_page() {
        let storage = BirthdayStorage::in_memory();
        let page = storage.list_page(PageNumber::Number(1), 10).await.unwrap().unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.num_pages, 1);
    }

    #[tokio::test]
    async fn delete_removes_congratulations() {
        let storage = BirthdayStorage::in_memory();
        let birthday = storage.create_birthday(None, draft("Ann")).await.unwrap();
        storage
            .add_congratulation(birthday.id, "user-1".to_string(), "Happy birthday!".to_string())
            .await
            .unwrap();

        assert!(storage.delete_birthday(birthday.id).await.unwrap().is_some());
        assert!(storage.get_birthday(birthday.id).await.unwrap().is_none());
        assert_eq!(storage.count_congratulations(birthday.id).await.unwrap(), 0);
        assert!(storage.delete_birthday(birthday.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let storage = BirthdayStorage::in_memory();
        let first = storage.create_birthday(None, draft("Ann")).await.unwrap();
        storage.delete_birthday(first.id).await.unwrap();
        let second = storage.create_birthday(None, draft("Ann")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn congratulation_requires_existing_birthday() {
        let storage = BirthdayStorage::in_memory();
        let result = storage
            .add_congratulation(42, "user-1".to_string(), "Hi".to_string())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_keeps_owner_and_image() {
        let storage = BirthdayStorage::in_memory();
        let mut initial = draft("Ann");
        initial.image = Some("ann.png".to_string());
        let birthday = storage
            .create_birthday(Some("owner".to_string()), initial)
            .await
            .unwrap();

        let updated = storage
            .update_birthday(birthday.id, draft("Anna"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.owner.as_deref(), Some("owner"));
        assert_eq!(updated.image.as_deref(), Some("ann.png"));
    }

    #[tokio::test]
    async fn unknown_tags_are_rejected() {
        let storage = BirthdayStorage::in_memory();
        let tag = storage.add_tag("family").await.unwrap();
        let mut tagged = draft("Ann");
        tagged.tags = vec![tag.id];
        let birthday = storage.create_birthday(None, tagged).await.unwrap();
        assert_eq!(storage.tag_names(&birthday.tags).await.unwrap(), vec!["family"]);

        let mut bad = draft("Bob");
        bad.tags = vec![tag.id + 1];
        assert!(storage.create_birthday(None, bad).await.is_err());
        assert!(storage.add_tag("family").await.is_err());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = BirthdayStorage::open(dir.path()).unwrap();
            let birthday = storage.create_birthday(None, draft("Ann")).await.unwrap();
            storage
                .add_congratulation(birthday.id, "user-1".to_string(), "Hi".to_string())
                .await
                .unwrap();
        }

        let reopened = BirthdayStorage::open(dir.path()).unwrap();
        let all = reopened.get_all_birthdays().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(reopened.count_congratulations(all[0].id).await.unwrap(), 1);
        let next = reopened.create_birthday(None, draft("Bob")).await.unwrap();
        assert_eq!(next.id, 2);
    }
}
