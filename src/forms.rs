//! Validation of submitted forms. Each form turns raw submitted strings into
//! typed values or a set of per-field error messages.

use crate::models::{Birthday, BirthdayDraft, Tag};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NAME_MAX_LEN: usize = 20;
pub const COMMENT_MAX_LEN: usize = 2000;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const MAX_AGE_YEARS: i32 = 120;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// Raw values of the birthday create/edit form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BirthdayForm {
    pub first_name: String,
    pub last_name: String,
    pub birthday: String,
    pub tags: Vec<String>,
    #[serde(skip)]
    pub image: Option<UploadedImage>,
}

impl BirthdayForm {
    pub fn from_birthday(birthday: &Birthday) -> Self {
        Self {
            first_name: birthday.first_name.clone(),
            last_name: birthday.last_name.clone(),
            birthday: birthday.birthday.format("%Y-%m-%d").to_string(),
            tags: birthday.tags.iter().map(u64::to_string).collect(),
            image: None,
        }
    }

    /// Checks every field against `today` and the tags that exist. The image
    /// stays in the form; the caller stores it and fills in `draft.image`.
    pub fn validate(&self, known_tags: &[Tag], today: NaiveDate) -> Result<BirthdayDraft, FormErrors> {
        let mut errors = FormErrors::default();

        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            errors.add("first_name", REQUIRED);
        } else if first_name.chars().count() > NAME_MAX_LEN {
            errors.add("first_name", format!("Ensure this value has at most {NAME_MAX_LEN} characters."));
        }

        let last_name = self.last_name.trim();
        if last_name.chars().count() > NAME_MAX_LEN {
            errors.add("last_name", format!("Ensure this value has at most {NAME_MAX_LEN} characters."));
        }

        let birthday = match self.birthday.trim() {
            "" => {
                errors.add("birthday", REQUIRED);
                None
            }
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) if date > today => {
                    errors.add("birthday", "The date cannot be in the future.");
                    None
                }
                Ok(date) if today.year() - date.year() > MAX_AGE_YEARS => {
                    errors.add("birthday", format!("Expected an age of at most {MAX_AGE_YEARS} years."));
                    None
                }
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("birthday", "Enter a valid date (YYYY-MM-DD).");
                    None
                }
            },
        };

        let mut tags = Vec::new();
        for raw in self.tags.iter().filter(|t| !t.is_empty()) {
            match raw.parse::<u64>() {
                Ok(id) if known_tags.iter().any(|t| t.id == id) => {
                    if !tags.contains(&id) {
                        tags.push(id);
                    }
                }
                _ => errors.add("tags", format!("Select a valid choice. {raw} is not one of the available choices.")),
            }
        }

        if let Some(image) = &self.image {
            if image.extension().is_none() {
                errors.add("image", format!("Upload a valid image ({}).", IMAGE_EXTENSIONS.join(", ")));
            } else if image.bytes.len() > MAX_IMAGE_BYTES {
                errors.add("image", "The image is too large.");
            }
        }

        errors.into_result(BirthdayDraft {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birthday,
            image: None,
            tags,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CongratulationForm {
    pub csrf_token: String,
    pub text: String,
}

impl CongratulationForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        } else if text.chars().count() > COMMENT_MAX_LEN {
            errors.add("text", format!("Ensure this value has at most {COMMENT_MAX_LEN} characters."));
        }
        errors.into_result(text.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegistrationForm {
    /// Field checks only; the handler checks that the username is free.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_LEN
            || !username
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                format!("Enter a valid username: up to {USERNAME_MAX_LEN} letters, digits and @/./+/-/_ characters."),
            );
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add("password1", format!("This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."));
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    #[serde(skip_serializing)]
    pub csrf_token: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub next: String,
}

impl LoginForm {
    /// The redirect target after login; only local paths are followed.
    pub fn redirect_target(&self) -> &str {
        let local = self.next.starts_with('/')
            && !self.next.starts_with("//")
            && !self.next.contains('\\')
            && self.next.chars().all(|c| c.is_ascii_graphic());
        if local {
            &self.next
        } else {
            "/"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn tags() -> Vec<Tag> {
        vec![Tag { id: 1, name: "family".to_string() }]
    }

    fn form(first_name: &str, birthday: &str) -> BirthdayForm {
        BirthdayForm {
            first_name: first_name.to_string(),
            birthday: birthday.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_birthday_form() {
        let mut input = form("  Ann ", "1990-05-17");
        input.tags = vec!["1".to_string(), "1".to_string()];
        let draft = input.validate(&tags(), today()).unwrap();
        assert_eq!(draft.first_name, "Ann");
        assert_eq!(draft.birthday, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(draft.tags, vec![1]);
    }

    #[test]
    fn birthday_form_errors() {
        let errors = form("", "").validate(&tags(), today()).unwrap_err();
        assert!(errors.has("first_name"));
        assert!(errors.has("birthday"));

        let errors = form("Ann", "2027-01-01").validate(&tags(), today()).unwrap_err();
        assert!(errors.has("birthday"));

        let errors = form("Ann", "17.05.1990").validate(&tags(), today()).unwrap_err();
        assert!(errors.has("birthday"));

        let errors = form("A".repeat(21).as_str(), "1990-05-17").validate(&tags(), today()).unwrap_err();
        assert!(errors.has("first_name"));

        let mut unknown_tag = form("Ann", "1990-05-17");
        unknown_tag.tags = vec!["7".to_string()];
        assert!(unknown_tag.validate(&tags(), today()).unwrap_err().has("tags"));
    }

    #[test]
    fn image_extension_is_checked() {
        let mut input = form("Ann", "1990-05-17");
        input.image = Some(UploadedImage { file_name: "notes.txt".to_string(), bytes: vec![1] });
        assert!(input.validate(&tags(), today()).unwrap_err().has("image"));

        input.image = Some(UploadedImage { file_name: "Photo.JPG".to_string(), bytes: vec![1] });
        assert!(input.validate(&tags(), today()).is_ok());
    }

    #[test]
    fn congratulation_text() {
        let blank = CongratulationForm { text: "   ".to_string(), ..Default::default() };
        assert!(blank.validate().is_err());
        let ok = CongratulationForm { text: " Happy birthday! ".to_string(), ..Default::default() };
        assert_eq!(ok.validate().unwrap(), "Happy birthday!");

        let longest = CongratulationForm { text: "a".repeat(COMMENT_MAX_LEN), ..Default::default() };
        assert!(longest.validate().is_ok());
        let too_long = CongratulationForm { text: "a".repeat(COMMENT_MAX_LEN + 1), ..Default::default() };
        assert!(too_long.validate().unwrap_err().has("text"));
    }

    #[test]
    fn registration_checks() {
        let mut input = RegistrationForm {
            username: "alice".to_string(),
            password1: "long enough".to_string(),
            password2: "long enough".to_string(),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.password2 = "different".to_string();
        assert!(input.validate().unwrap_err().has("password2"));

        input.username = "bad name!".to_string();
        assert!(input.validate().unwrap_err().has("username"));
    }

    #[test]
    fn login_redirect_is_local() {
        let mut input = LoginForm { next: "/birthday/3/".to_string(), ..Default::default() };
        assert_eq!(input.redirect_target(), "/birthday/3/");
        input.next = "https://example.com/".to_string();
        assert_eq!(input.redirect_target(), "/");
        input.next = "//example.com".to_string();
        assert_eq!(input.redirect_target(), "/");
    }
}
