pub use sea_orm_migration::prelude::*;

mod m20250420_000001_create_user_table;
mod m20250420_000002_create_incident_type_table;
mod m20250420_000003_create_incident_report_table;
mod m20250420_000004_create_incident_comment_table;
mod m20250420_000005_create_incident_status_history_table;
mod m20250420_000006_seed_incident_types;

pub use m20250420_000006_seed_incident_types::DEFAULT_INCIDENT_TYPES;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250420_000001_create_user_table::Migration),
            Box::new(m20250420_000002_create_incident_type_table::Migration),
            Box::new(m20250420_000003_create_incident_report_table::Migration),
            Box::new(m20250420_000004_create_incident_comment_table::Migration),
            Box::new(m20250420_000005_create_incident_status_history_table::Migration),
            Box::new(m20250420_000006_seed_incident_types::Migration),
        ]
    }
}
