//! Askama page templates and the row types they render.

use std::collections::HashMap;

use askama::Template;
use chrono::{DateTime, Utc};

use crate::entity::incident_report::{self, Severity, Status};
use crate::entity::{incident_comment, incident_status_history, incident_type, user};
use crate::model::auth::{RegisterForm, SessionUser};
use crate::model::common::PaginationResponse;
use crate::model::form::{FormErrors, SelectOption};
use crate::model::incident::{IncidentForm, IncidentTypeForm};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn display_time(dt: &DateTime<Utc>) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

// ============================================
// Navigation
// ============================================

#[derive(Clone, Debug, Default)]
pub struct NavUser {
    pub signed_in: bool,
    pub username: String,
    pub is_staff: bool,
}

impl NavUser {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl From<&SessionUser> for NavUser {
    fn from(user: &SessionUser) -> Self {
        Self {
            signed_in: true,
            username: user.username.clone(),
            is_staff: user.is_staff(),
        }
    }
}

// ============================================
// Shared rows
// ============================================

/// Users by id, for rendering names of reporters, assignees and authors.
pub type UserNames = HashMap<i32, user::Model>;

pub fn user_name(users: &UserNames, id: i32) -> String {
    users
        .get(&id)
        .map(user::Model::display_name)
        .unwrap_or_else(|| format!("user #{id}"))
}

#[derive(Clone, Debug)]
pub struct IncidentRow {
    pub id: i32,
    pub title: String,
    pub severity: String,
    pub severity_color: String,
    pub status: String,
    pub status_color: String,
    pub incident_type: String,
    pub reporter: String,
    pub assignee: String,
    pub date_occurred: String,
    pub is_urgent: bool,
}

impl IncidentRow {
    pub fn build(
        model: &incident_report::Model,
        types: &HashMap<i32, incident_type::Model>,
        users: &UserNames,
    ) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            severity: model.severity.label().to_string(),
            severity_color: model.severity.color().to_string(),
            status: model.status.label().to_string(),
            status_color: model.status.color().to_string(),
            incident_type: types
                .get(&model.incident_type_id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            reporter: user_name(users, model.reporter_id),
            assignee: model
                .assignee_id
                .map(|id| user_name(users, id))
                .unwrap_or_else(|| "Unassigned".to_string()),
            date_occurred: display_time(&model.date_occurred),
            is_urgent: model.severity.is_urgent(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CountRow {
    pub key: String,
    pub label: String,
    pub color: String,
    pub count: u64,
}

pub fn status_options(current: &str, include_blank: bool) -> Vec<SelectOption> {
    let mut options = Vec::new();
    if include_blank {
        options.push(SelectOption::new("", "All Statuses", current));
    }
    options.extend(Status::ALL.iter().map(|s| SelectOption::new(s.as_str(), s.label(), current)));
    options
}

pub fn severity_options(current: &str, include_blank: bool) -> Vec<SelectOption> {
    let mut options = Vec::new();
    if include_blank {
        options.push(SelectOption::new("", "All Severities", current));
    } else if current.is_empty() {
        options.push(SelectOption::new("", "---------", current));
    }
    options.extend(Severity::ALL.iter().map(|s| SelectOption::new(s.as_str(), s.label(), current)));
    options
}

pub fn incident_type_options(types: &[incident_type::Model], current: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("", "---------", current)];
    options.extend(types.iter().map(|t| SelectOption::new(t.id.to_string(), t.name.clone(), current)));
    options
}

pub fn user_options(users: &[user::Model], current: &str, blank_label: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("", blank_label, current)];
    options.extend(users.iter().map(|u| SelectOption::new(u.id.to_string(), u.display_name(), current)));
    options
}

// ============================================
// Auth
// ============================================

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: NavUser,
    pub username: String,
    pub next: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub nav: NavUser,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

// ============================================
// Dashboard
// ============================================

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub nav: NavUser,
    pub total_incidents: u64,
    pub urgent_incidents: u64,
    pub my_incidents: u64,
    pub pending_incidents: u64,
    pub status_counts: Vec<CountRow>,
    pub severity_counts: Vec<CountRow>,
    pub recent_incidents: Vec<IncidentRow>,
}

// ============================================
// Incidents
// ============================================

#[derive(Template)]
#[template(path = "incidents/list.html")]
pub struct IncidentListTemplate {
    pub nav: NavUser,
    pub heading: String,
    pub page_path: String,
    pub incidents: PaginationResponse<IncidentRow>,
    pub status_options: Vec<SelectOption>,
    pub severity_options: Vec<SelectOption>,
    pub assignee_options: Vec<SelectOption>,
    pub show_assignee_filter: bool,
    pub search: String,
    pub filter_query: String,
}

pub struct IncidentDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub severity_color: String,
    pub status: String,
    pub status_color: String,
    pub incident_type: String,
    pub incident_type_color: String,
    pub reporter: String,
    pub assignee: String,
    pub location: String,
    pub date_occurred: String,
    pub created_at: String,
    pub updated_at: String,
    pub days_since_reported: i64,
    pub is_urgent: bool,
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
    pub has_attachment: bool,
    pub attachment_name: String,
}

impl IncidentDetail {
    pub fn build(
        model: &incident_report::Model,
        incident_type: Option<&incident_type::Model>,
        users: &UserNames,
    ) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            description: model.description.clone(),
            severity: model.severity.label().to_string(),
            severity_color: model.severity.color().to_string(),
            status: model.status.label().to_string(),
            status_color: model.status.color().to_string(),
            incident_type: incident_type.map(|t| t.name.clone()).unwrap_or_default(),
            incident_type_color: incident_type
                .map(|t| t.color_code.clone())
                .unwrap_or_else(|| incident_type::DEFAULT_COLOR.to_string()),
            reporter: user_name(users, model.reporter_id),
            assignee: model
                .assignee_id
                .map(|id| user_name(users, id))
                .unwrap_or_else(|| "Unassigned".to_string()),
            location: model.location.clone(),
            date_occurred: display_time(&model.date_occurred),
            created_at: display_time(&model.created_at),
            updated_at: model.updated_at.as_ref().map(display_time).unwrap_or_default(),
            days_since_reported: model.days_since_reported(),
            is_urgent: model.severity.is_urgent(),
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
            has_attachment: model.attachment_path.is_some(),
            attachment_name: model.attachment_name.clone().unwrap_or_default(),
        }
    }
}

pub struct CommentRow {
    pub author: String,
    pub comment: String,
    pub created_at: String,
}

impl CommentRow {
    pub fn build(model: &incident_comment::Model, users: &UserNames) -> Self {
        Self {
            author: user_name(users, model.author_id),
            comment: model.comment.clone(),
            created_at: display_time(&model.created_at),
        }
    }
}

pub struct HistoryRow {
    pub old_status: String,
    pub new_status: String,
    pub changed_by: String,
    pub changed_at: String,
    pub reason: String,
}

impl HistoryRow {
    pub fn build(model: &incident_status_history::Model, users: &UserNames) -> Self {
        Self {
            old_status: model.old_status.label().to_string(),
            new_status: model.new_status.label().to_string(),
            changed_by: user_name(users, model.changed_by),
            changed_at: display_time(&model.changed_at),
            reason: model.change_reason.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "incidents/detail.html")]
pub struct IncidentDetailTemplate {
    pub nav: NavUser,
    pub incident: IncidentDetail,
    pub comments: Vec<CommentRow>,
    pub history: Vec<HistoryRow>,
    pub can_modify: bool,
    pub status_options: Vec<SelectOption>,
    pub comment_text: String,
    pub comment_error: String,
}

#[derive(Template)]
#[template(path = "incidents/form.html")]
pub struct IncidentFormTemplate {
    pub nav: NavUser,
    pub is_edit: bool,
    pub action: String,
    pub cancel_url: String,
    pub form: IncidentForm,
    pub errors: FormErrors,
    pub type_options: Vec<SelectOption>,
    pub severity_options: Vec<SelectOption>,
    pub status_options: Vec<SelectOption>,
    pub assignee_options: Vec<SelectOption>,
    pub show_assignee: bool,
    pub has_attachment: bool,
    pub attachment_name: String,
}

#[derive(Template)]
#[template(path = "incidents/confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub nav: NavUser,
    pub id: i32,
    pub title: String,
}

// ============================================
// Incident types
// ============================================

#[derive(Template)]
#[template(path = "incident_types/list.html")]
pub struct IncidentTypeListTemplate {
    pub nav: NavUser,
    pub types: Vec<incident_type::Model>,
    pub can_manage: bool,
}

#[derive(Template)]
#[template(path = "incident_types/form.html")]
pub struct IncidentTypeFormTemplate {
    pub nav: NavUser,
    pub is_edit: bool,
    pub action: String,
    pub form: IncidentTypeForm,
    pub errors: FormErrors,
}

// ============================================
// Errors
// ============================================

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: NavUser,
    pub status: u16,
    pub message: String,
    pub detail: String,
}

impl ErrorTemplate {
    pub fn new(status: u16, message: &str, detail: Option<String>) -> Self {
        Self {
            nav: NavUser::anonymous(),
            status,
            message: message.to_string(),
            detail: detail.unwrap_or_default(),
        }
    }
}
