use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod chat;
mod commands;
mod config;
mod controllers;
mod db;
mod middleware;
mod models;
mod security;
mod validation;

use chat::ChatService;
use config::Config;
use db::{ChatDatabase, Database};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

pub struct AppState {
    pub db: Arc<Database>,
    pub chat_db: Arc<ChatDatabase>,
    pub chat: Arc<ChatService>,
    pub config: Config,
}

#[derive(Parser, Debug)]
#[command(name = "petportal-backend", about = "Pet adoption and lost & found portal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Move found pets past the waiting period into adoption
    MoveFoundPets,
    /// Show availability and record counts of both databases
    DbStatus,
    /// Copy main-database tables from one file to another
    Sync {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        /// Report what would be copied without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Create sample users, an admin and pets
    Seed {
        #[arg(long, default_value = "admin123")]
        admin_password: String,
    },
}

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{}: {}", context, e))
}

fn open_main(config: &Config) -> std::io::Result<Database> {
    log::info!("Initializing database at {}", config.database_url);
    Database::new(&config.database_url).map_err(|e| io_error("Failed to initialize database", e))
}

/// SPA fallback handler - serves index.html for client-side routing
async fn spa_fallback(index: web::Data<PathBuf>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(index.as_path())?)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::MoveFoundPets => {
            let db = open_main(&config)?;
            commands::move_found_pets::run(&db).map_err(|e| io_error("move-found-pets failed", e))?;
            Ok(())
        }
        Command::DbStatus => {
            commands::db_status::run(&config.database_url, &config.chat_database_url);
            Ok(())
        }
        Command::Sync {
            source,
            target,
            dry_run,
        } => {
            commands::sync::run(&source, &target, dry_run).map_err(|e| io_error("sync failed", e))?;
            Ok(())
        }
        Command::Seed { admin_password } => {
            let db = open_main(&config)?;
            commands::seed::run(&db, &admin_password).map_err(|e| io_error("seed failed", e))?;
            Ok(())
        }
    }
}

async fn serve(config: Config) -> std::io::Result<()> {
    let port = config.port;

    let db = Arc::new(open_main(&config)?);

    log::info!("Initializing chat database at {}", config.chat_database_url);
    let chat_db = Arc::new(
        ChatDatabase::new(&config.chat_database_url)
            .map_err(|e| io_error("Failed to initialize chat database", e))?,
    );

    let chat = Arc::new(ChatService::new(db.clone(), chat_db.clone()));

    // Drop expired login sessions in the background
    let purge_db = Arc::clone(&db);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purge_db.purge_expired_sessions(Utc::now()) {
                Ok(0) => {}
                Ok(n) => log::info!("Purged {} expired session(s)", n),
                Err(e) => log::error!("Failed to purge expired sessions: {}", e),
            }
        }
    });

    let frontend_dist = PathBuf::from(&config.frontend_dist);
    let serve_frontend = frontend_dist.join("index.html").exists();
    if serve_frontend {
        log::info!("Serving frontend from: {}", frontend_dist.display());
    } else {
        log::warn!(
            "Frontend dist not found in {} - static file serving disabled",
            frontend_dist.display()
        );
    }

    log::info!("Starting PetPortal server on port {}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                chat_db: Arc::clone(&chat_db),
                chat: Arc::clone(&chat),
                config: config.clone(),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::auth::config)
            .configure(controllers::pets::config)
            .configure(controllers::adoption::config)
            .configure(controllers::registrations::config)
            .configure(controllers::dashboard::config)
            .configure(controllers::notifications::config)
            .configure(controllers::admin::config)
            .configure(controllers::chat::config);

        if serve_frontend {
            app = app
                .app_data(web::Data::new(frontend_dist.join("index.html")))
                .service(
                    Files::new("/", frontend_dist.clone())
                        .index_file("index.html")
                        .default_handler(web::to(spa_fallback)),
                );
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
