use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenv::dotenv;
use tracing::info;

use securelog::api;
use securelog::auth::password::ensure_admin;
use securelog::configuration::Settings;
use securelog::db::init_db;
use securelog::migration::{Migrator, MigratorTrait};
use securelog::telemetry::{get_subscriber, init_subscriber};
use securelog::util::storage::MediaStorage;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber(
        "securelog".into(),
        "info,sqlx=warn".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;

    info!("starting securelog");

    let settings = Settings::from_env()?;

    let db = init_db(&settings).await?;
    info!("running database migrations");
    Migrator::up(&db, None).await?;
    info!("migrations complete");

    if let Some(admin) = &settings.admin {
        ensure_admin(&db, admin, settings.bcrypt_cost).await?;
    }

    let address = (settings.host.clone(), settings.port);
    let storage = Data::new(MediaStorage::new(settings.media_root.clone()));
    let db_data = Data::new(db);
    let settings_data = Data::new(settings);

    info!(host = %address.0, port = address.1, "listening");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db_data.clone())
            .app_data(settings_data.clone())
            .app_data(storage.clone())
            .configure(api::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
