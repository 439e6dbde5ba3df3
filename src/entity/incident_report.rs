use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incident_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub severity: Severity,
    pub status: Status,
    pub incident_type_id: i32,
    pub reporter_id: i32,
    pub assignee_id: Option<i32>,

    pub location: String,
    pub date_occurred: DateTime<Utc>,
    #[sea_orm(column_type = "Text")]
    pub people_involved: String,
    #[sea_orm(column_type = "Text")]
    pub witnesses: String,
    pub injuries_occurred: bool,
    #[sea_orm(column_type = "Text")]
    pub injury_details: String,
    pub property_damage: bool,
    #[sea_orm(column_type = "Text")]
    pub damage_details: String,
    #[sea_orm(column_type = "Text")]
    pub immediate_action_taken: String,
    #[sea_orm(column_type = "Text")]
    pub resolution_notes: String,
    pub follow_up_required: bool,
    #[sea_orm(column_type = "Text")]
    pub follow_up_details: String,

    // stored file name under the media root, plus the name it was uploaded as
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,

    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// CSS modifier used by the templates.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "success",
            Severity::Medium => "warning",
            Severity::High => "danger",
            Severity::Critical => "dark",
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "open")]
    Open,

    #[sea_orm(string_value = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "resolved")]
    Resolved,

    #[sea_orm(string_value = "closed")]
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Open, Status::InProgress, Status::Resolved, Status::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
            Status::Closed => "closed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
            Status::Closed => "Closed",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Status::Open => "primary",
            Status::InProgress => "warning",
            Status::Resolved => "success",
            Status::Closed => "dark",
        }
    }

    /// Open and in-progress reports still need attention.
    pub fn is_pending(&self) -> bool {
        matches!(self, Status::Open | Status::InProgress)
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::incident_type::Entity",
        from = "Column::IncidentTypeId",
        to = "super::incident_type::Column::Id",
        on_delete = "Restrict"
    )]
    IncidentType,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reporter,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssigneeId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Assignee,

    #[sea_orm(has_many = "super::incident_comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::incident_status_history::Entity")]
    StatusHistory,
}

impl Related<super::incident_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncidentType.def()
    }
}

impl Related<super::incident_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::incident_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let now = Utc::now();
        if insert {
            self.created_at = Set(now);
        } else {
            if self.reporter_id.is_set() {
                return Err(DbErr::Custom("the reporter of an incident report cannot be changed".to_string()));
            }
            self.updated_at = Set(Some(now));
        }
        Ok(self)
    }
}

impl Model {
    pub fn is_visible_to(&self, user_id: i32, is_staff: bool) -> bool {
        is_staff || self.reporter_id == user_id || self.assignee_id == Some(user_id)
    }

    pub fn is_modifiable_by(&self, user_id: i32, is_staff: bool) -> bool {
        is_staff || self.reporter_id == user_id
    }

    pub fn days_since_reported(&self) -> i64 {
        (Utc::now() - self.created_at).num_days()
    }
}
