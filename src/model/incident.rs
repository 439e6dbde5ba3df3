use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::incident_report::{self, Severity, Status};
use crate::entity::incident_type;
use crate::model::form::{required_text, FormErrors};

pub const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
const TITLE_MAX_CHARS: usize = 200;
const LOCATION_MAX_CHARS: usize = 200;

static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

/// Raw incident report form values, kept as submitted so an invalid form can be
/// rendered again without losing input.
#[derive(Debug, Clone, Default)]
pub struct IncidentForm {
    pub title: String,
    pub description: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub assignee: String,
    pub location: String,
    pub date_occurred: String,
    pub people_involved: String,
    pub witnesses: String,
    pub injuries_occurred: bool,
    pub injury_details: String,
    pub property_damage: bool,
    pub damage_details: String,
    pub immediate_action_taken: String,
    pub resolution_notes: String,
    pub follow_up_required: bool,
    pub follow_up_details: String,
    pub status_change_reason: String,
    pub clear_attachment: bool,
}

/// What the submitting user is allowed to choose from.
pub struct FormContext<'a> {
    pub incident_type_ids: &'a [i32],
    pub user_ids: &'a [i32],
    pub is_staff: bool,
    pub editing: bool,
}

/// Validated incident values ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanIncident {
    pub title: String,
    pub description: String,
    pub incident_type_id: i32,
    pub severity: Severity,
    /// Only present when editing.
    pub status: Option<Status>,
    /// `None` leaves the assignee untouched; only staff submissions set it.
    pub assignee_id: Option<Option<i32>>,
    pub location: String,
    pub date_occurred: Option<DateTime<Utc>>,
    pub people_involved: String,
    pub witnesses: String,
    pub injuries_occurred: bool,
    pub injury_details: String,
    pub property_damage: bool,
    pub damage_details: String,
    pub immediate_action_taken: String,
    pub resolution_notes: String,
    pub follow_up_required: bool,
    pub follow_up_details: String,
    pub status_change_reason: String,
    pub clear_attachment: bool,
}

impl IncidentForm {
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        let title = take("title");
        let description = take("description");
        let incident_type = take("incident_type");
        let severity = take("severity");
        let status = take("status");
        let assignee = take("assignee");
        let location = take("location");
        let date_occurred = take("date_occurred");
        let people_involved = take("people_involved");
        let witnesses = take("witnesses");
        let injuries_occurred = is_checked(&take("injuries_occurred"));
        let injury_details = take("injury_details");
        let property_damage = is_checked(&take("property_damage"));
        let damage_details = take("damage_details");
        let immediate_action_taken = take("immediate_action_taken");
        let resolution_notes = take("resolution_notes");
        let follow_up_required = is_checked(&take("follow_up_required"));
        let follow_up_details = take("follow_up_details");
        let status_change_reason = take("status_change_reason");
        let clear_attachment = is_checked(&take("attachment_clear"));

        Self {
            title,
            description,
            incident_type,
            severity,
            status,
            assignee,
            location,
            date_occurred,
            people_involved,
            witnesses,
            injuries_occurred,
            injury_details,
            property_damage,
            damage_details,
            immediate_action_taken,
            resolution_notes,
            follow_up_required,
            follow_up_details,
            status_change_reason,
            clear_attachment,
        }
    }

    /// Prefills the edit form from a stored report.
    pub fn from_model(model: &incident_report::Model) -> Self {
        Self {
            title: model.title.clone(),
            description: model.description.clone(),
            incident_type: model.incident_type_id.to_string(),
            severity: model.severity.as_str().to_string(),
            status: model.status.as_str().to_string(),
            assignee: model.assignee_id.map(|id| id.to_string()).unwrap_or_default(),
            location: model.location.clone(),
            date_occurred: model.date_occurred.format(DATETIME_INPUT_FORMAT).to_string(),
            people_involved: model.people_involved.clone(),
            witnesses: model.witnesses.clone(),
            injuries_occurred: model.injuries_occurred,
            injury_details: model.injury_details.clone(),
            property_damage: model.property_damage,
            damage_details: model.damage_details.clone(),
            immediate_action_taken: model.immediate_action_taken.clone(),
            resolution_notes: model.resolution_notes.clone(),
            follow_up_required: model.follow_up_required,
            follow_up_details: model.follow_up_details.clone(),
            status_change_reason: String::new(),
            clear_attachment: false,
        }
    }

    pub fn validate(&self, ctx: &FormContext<'_>) -> Result<CleanIncident, FormErrors> {
        let mut errors = FormErrors::default();

        let title = required_text(&mut errors, "title", &self.title, Some(TITLE_MAX_CHARS));
        let description = required_text(&mut errors, "description", &self.description, None);

        let incident_type_id = match self.incident_type.trim() {
            "" => {
                errors.add("incident_type", "This field is required.");
                0
            }
            raw => match raw.parse::<i32>() {
                Ok(id) if ctx.incident_type_ids.contains(&id) => id,
                _ => {
                    errors.add("incident_type", "Select a valid choice.");
                    0
                }
            },
        };

        let severity = match self.severity.trim() {
            "" => {
                errors.add("severity", "This field is required.");
                None
            }
            raw => {
                let parsed = Severity::parse(raw);
                if parsed.is_none() {
                    errors.add("severity", "Select a valid choice.");
                }
                parsed
            }
        };

        let status = if ctx.editing {
            match self.status.trim() {
                "" => {
                    errors.add("status", "This field is required.");
                    None
                }
                raw => {
                    let parsed = Status::parse(raw);
                    if parsed.is_none() {
                        errors.add("status", "Select a valid choice.");
                    }
                    parsed
                }
            }
        } else {
            None
        };

        let assignee_id = if ctx.is_staff {
            match self.assignee.trim() {
                "" => Some(None),
                raw => match raw.parse::<i32>() {
                    Ok(id) if ctx.user_ids.contains(&id) => Some(Some(id)),
                    _ => {
                        errors.add("assignee", "Select a valid choice.");
                        None
                    }
                },
            }
        } else {
            None
        };

        let location = self.location.trim().to_string();
        if location.chars().count() > LOCATION_MAX_CHARS {
            errors.add("location", "Ensure this value has at most 200 characters.");
        }

        let date_occurred = match self.date_occurred.trim() {
            "" => None,
            raw => match parse_datetime_input(raw) {
                Some(dt) => Some(dt),
                None => {
                    errors.add("date_occurred", "Enter a valid date/time.");
                    None
                }
            },
        };

        let (Some(severity), true) = (severity, errors.is_empty()) else {
            return Err(errors);
        };
        if ctx.editing && status.is_none() {
            return Err(errors);
        }

        Ok(CleanIncident {
            title,
            description,
            incident_type_id,
            severity,
            status,
            assignee_id,
            location,
            date_occurred,
            people_involved: self.people_involved.trim().to_string(),
            witnesses: self.witnesses.trim().to_string(),
            injuries_occurred: self.injuries_occurred,
            injury_details: self.injury_details.trim().to_string(),
            property_damage: self.property_damage,
            damage_details: self.damage_details.trim().to_string(),
            immediate_action_taken: self.immediate_action_taken.trim().to_string(),
            resolution_notes: self.resolution_notes.trim().to_string(),
            follow_up_required: self.follow_up_required,
            follow_up_details: self.follow_up_details.trim().to_string(),
            status_change_reason: self.status_change_reason.trim().to_string(),
            clear_attachment: self.clear_attachment,
        })
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim(), "on" | "true" | "1" | "yes")
}

/// Accepts the browser's `datetime-local` value, with or without seconds. The
/// value is taken as UTC.
pub fn parse_datetime_input(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, DATETIME_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Default, Deserialize)]
pub struct IncidentListQuery {
    pub page: Option<u64>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub assignee: Option<String>,
    pub search: Option<String>,
}

/// List filters after dropping blank and unknown values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IncidentFilter {
    pub status: Option<Status>,
    pub severity: Option<Severity>,
    pub assignee_id: Option<i32>,
    pub search: Option<String>,
}

impl From<&IncidentListQuery> for IncidentFilter {
    fn from(query: &IncidentListQuery) -> Self {
        let non_blank = |v: &Option<String>| {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        };
        Self {
            status: non_blank(&query.status).and_then(|s| Status::parse(&s)),
            severity: non_blank(&query.severity).and_then(|s| Severity::parse(&s)),
            assignee_id: non_blank(&query.assignee).and_then(|s| s.parse().ok()),
            search: non_blank(&query.search),
        }
    }
}

impl IncidentFilter {
    /// Query string that reproduces these filters, without the page number.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={}", status.as_str()));
        }
        if let Some(severity) = self.severity {
            parts.push(format!("severity={}", severity.as_str()));
        }
        if let Some(assignee) = self.assignee_id {
            parts.push(format!("assignee={assignee}"));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search={}", urlencoding::encode(search)));
        }
        parts.join("&")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusChangeForm {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentTypeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color_code: String,
}

impl IncidentTypeForm {
    pub fn from_model(model: &incident_type::Model) -> Self {
        Self {
            name: model.name.clone(),
            description: model.description.clone(),
            color_code: model.color_code.clone(),
        }
    }

    /// Name uniqueness is checked against the database by the handler.
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        required_text(&mut errors, "name", &self.name, Some(100));

        let color = self.color_code.trim();
        if !color.is_empty() && !COLOR_CODE.is_match(color) {
            errors.add("color_code", "Enter a hex color such as #FF0000.");
        }
        errors
    }

    pub fn color_or_default(&self) -> String {
        match self.color_code.trim() {
            "" => incident_type::DEFAULT_COLOR.to_string(),
            color => color.to_string(),
        }
    }
}
