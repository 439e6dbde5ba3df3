use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incident_comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub incident_id: i32,
    pub author_id: i32,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub created_at: DateTime<Utc>,
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
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::incident_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

// comments are append-only
#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        if !insert {
            return Err(DbErr::Custom("incident comments cannot be edited".to_string()));
        }
        self.created_at = Set(Utc::now());
        Ok(self)
    }
}

impl ActiveModel {
    pub fn new(incident_id: i32, author_id: i32, comment: impl Into<String>) -> Self {
        Self {
            incident_id: Set(incident_id),
            author_id: Set(author_id),
            comment: Set(comment.into()),
            ..Default::default()
        }
    }
}
