use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm_migration::prelude::*;
use crate::entity::incident_type::{self, Entity as IncidentTypeEntity};

pub const DEFAULT_INCIDENT_TYPES: [(&str, &str, &str); 7] = [
    ("Safety Incident", "Workplace accidents, injuries, near misses", "#dc3545"),
    ("Security Breach", "Unauthorized access, theft, security violations", "#fd7e14"),
    ("Equipment Failure", "Machinery breakdown, equipment malfunction", "#ffc107"),
    ("Environmental Issue", "Spills, contamination, environmental hazards", "#28a745"),
    ("HR Incident", "Workplace harassment, discrimination, misconduct", "#17a2b8"),
    ("IT Security", "Cyber attacks, data breaches, system compromises", "#6f42c1"),
    ("Other", "General incidents not covered by other categories", "#6c757d"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for (name, description, color_code) in DEFAULT_INCIDENT_TYPES {
            let existing = IncidentTypeEntity::find()
                .filter(incident_type::Column::Name.eq(name))
                .one(db)
                .await?;

            if existing.is_some() {
                continue;
            }

            incident_type::ActiveModel {
                name: Set(name.to_string()),
                description: Set(description.to_string()),
                color_code: Set(color_code.to_string()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names: Vec<&str> = DEFAULT_INCIDENT_TYPES.iter().map(|(name, _, _)| *name).collect();
        IncidentTypeEntity::delete_many()
            .filter(incident_type::Column::Name.is_in(names))
            .exec(manager.get_connection())
            .await?;
        Ok(())
    }
}
