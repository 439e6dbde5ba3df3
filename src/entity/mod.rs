pub mod incident_comment;
pub mod incident_report;
pub mod incident_status_history;
pub mod incident_type;
pub mod user;
