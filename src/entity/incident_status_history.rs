use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::incident_report::Status;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incident_status_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub incident_id: i32,
    pub old_status: Status,
    pub new_status: Status,
    pub changed_by: i32,
    #[sea_orm(column_type = "Text")]
    pub change_reason: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::incident_report::Entity",
        from = "Column::IncidentId",
        to = "super::incident_report::Column::Id",
        on_delete = "Cascade"
    )]
    Incident,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ChangedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    ChangedByUser,
}

impl Related<super::incident_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangedByUser.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        if !insert {
            return Err(DbErr::Custom("status history is append-only".to_string()));
        }
        self.changed_at = Set(Utc::now());
        Ok(self)
    }
}

impl ActiveModel {
    /// Returns `None` when the status did not actually change.
    pub fn transition(
        incident_id: i32,
        old_status: Status,
        new_status: Status,
        changed_by: i32,
        reason: impl Into<String>,
    ) -> Option<Self> {
        if old_status == new_status {
            return None;
        }

        Some(Self {
            incident_id: Set(incident_id),
            old_status: Set(old_status),
            new_status: Set(new_status),
            changed_by: Set(changed_by),
            change_reason: Set(reason.into()),
            ..Default::default()
        })
    }
}
