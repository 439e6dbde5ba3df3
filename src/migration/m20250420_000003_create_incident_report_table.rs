use sea_orm::Schema;
use sea_orm_migration::prelude::*;
use crate::entity::incident_report::{Column, Entity};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(
                schema
                    .create_table_from_entity(Entity)
                    .if_not_exists()
                    .to_owned()
            )
            .await?;

        // list and dashboard queries filter on ownership and status
        for (name, column) in [
            ("idx_incident_reports_reporter", Column::ReporterId),
            ("idx_incident_reports_assignee", Column::AssigneeId),
            ("idx_incident_reports_status", Column::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Entity)
                        .col(column)
                        .if_not_exists()
                        .to_owned()
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entity).to_owned())
            .await
    }
}
