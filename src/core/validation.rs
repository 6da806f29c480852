use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::core::models::option::OptCreate;
use crate::core::models::poll::{PollCreate, PollUpdate};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 150;
pub const OPTIONS_MIN: usize = 2;
pub const OPTIONS_MAX: usize = 8;
pub const OPTION_TEXT_MIN: usize = 1;
pub const OPTION_TEXT_MAX: usize = 50;
pub const VOTING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    title: String,
    description: Option<String>,
    end_date: DateTime<Utc>,
    options: Vec<String>,
}

impl NewPoll {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollChanges {
    title: String,
    description: Option<String>,
    end_date: DateTime<Utc>,
}

impl PollChanges {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }
}

pub fn validate_create(input: PollCreate, now: DateTime<Utc>) -> Result<NewPoll, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let title = check_title(&mut errors, &input.title);
    let description = check_description(&mut errors, input.description.as_deref());
    check_end_date(&mut errors, input.end_date, now);
    let options = check_options(&mut errors, &input.options);
    errors.finish(NewPoll {
        title,
        description,
        end_date: input.end_date,
        options,
    })
}

pub fn validate_update(input: PollUpdate, now: DateTime<Utc>) -> Result<PollChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let title = check_title(&mut errors, &input.title);
    let description = check_description(&mut errors, input.description.as_deref());
    check_end_date(&mut errors, input.end_date, now);
    errors.finish(PollChanges {
        title,
        description,
        end_date: input.end_date,
    })
}

fn check_title(errors: &mut ValidationErrors, title: &str) -> String {
    let title = title.trim();
    let len = title.chars().count();
    if len < TITLE_MIN {
        errors.push("title", format!("Title must be at least {} characters long", TITLE_MIN));
    } else if len > TITLE_MAX {
        errors.push("title", format!("Title must not exceed {} characters", TITLE_MAX));
    }
    title.to_owned()
}

fn check_description(errors: &mut ValidationErrors, description: Option<&str>) -> Option<String> {
    let description = description.map(str::trim).filter(|d| !d.is_empty())?;
    if description.chars().count() > DESCRIPTION_MAX {
        errors.push("description", format!("Description must not exceed {} characters", DESCRIPTION_MAX));
    }
    Some(description.to_owned())
}

fn check_end_date(errors: &mut ValidationErrors, end_date: DateTime<Utc>, now: DateTime<Utc>) {
    if end_date < now || end_date > now + Duration::days(VOTING_WINDOW_DAYS) {
        errors.push("end_date", format!("End date must be within {} days from today", VOTING_WINDOW_DAYS));
    }
}

fn check_options(errors: &mut ValidationErrors, options: &[OptCreate]) -> Vec<String> {
    if options.len() < OPTIONS_MIN {
        errors.push("options", format!("You must provide at least {} options", OPTIONS_MIN));
    } else if options.len() > OPTIONS_MAX {
        errors.push("options", format!("You cannot provide more than {} options", OPTIONS_MAX));
    }
    let mut seen = HashSet::new();
    let mut duplicated = false;
    let texts: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let text = opt.text.trim();
            let len = text.chars().count();
            if len < OPTION_TEXT_MIN {
                errors.push(format!("options[{}]", i), format!("Each option must be at least {} character long", OPTION_TEXT_MIN));
            } else if len > OPTION_TEXT_MAX {
                errors.push(format!("options[{}]", i), format!("Each option must not exceed {} characters", OPTION_TEXT_MAX));
            }
            duplicated |= !seen.insert(text.to_lowercase());
            text.to_owned()
        })
        .collect();
    if duplicated {
        errors.push("options", "Duplicate options are not allowed");
    }
    texts
}
