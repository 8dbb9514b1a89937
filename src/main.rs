mod api;
mod cli;
mod config;
mod db;
mod github;
mod heatmap;
mod icons;
mod ingest;
mod scheduler;

use crate::cli::onboard::run_onboarding;
use crate::cli::{ActivityCommands, Cli, Commands, ConfigCommands, PostCommands};
use crate::config::{Config, StorageBackend};
use crate::db::{NewActivity, Repository};
use crate::heatmap::grid::{HeatmapWindow, bucket_activities};
use crate::heatmap::intensity::Theme;
use crate::ingest::staging::UploadStore;
use crate::ingest::{IngestPipeline, IngestRequest, UploadField};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = load_or_default_config()?;
            if let Some(port) = port {
                config.api_port = port;
            }
            run_service(config).await
        }
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Post { command } => handle_post_command(command).await,
        Commands::Activity { command } => handle_activity_command(command).await,
        Commands::Heatmap {
            months,
            theme,
            owner,
        } => handle_heatmap(months, theme.map(Theme::from), owner),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_dirs()?;
            config.save()?;

            let masked = if key.contains("token") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let repository = db::open_repository(&config)?;

    println!("Folio status");
    println!("- storage: {}", repository.backend_name());
    println!("- db_path: {}", config.db_path.display());
    println!("- upload_dir: {}", config.upload_dir.display());
    println!("- posts: {}", repository.list_posts()?.len());
    println!("- activities: {}", repository.list_activities(None)?.len());
    println!(
        "- profile: {}",
        repository
            .profile()?
            .map(|profile| profile.name)
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "- server: {}",
        if is_port_open(&config) {
            format!("listening on {}:{}", config.api_host, config.api_port)
        } else {
            "not running".to_string()
        }
    );
    println!(
        "- github_sync: {}",
        if config.github_sync_enabled {
            format!("daily at {}", config.github_sync_time)
        } else {
            "disabled".to_string()
        }
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let config = load_or_default_config()?;

    match config.storage {
        StorageBackend::Sqlite => match db::open_repository(&config) {
            Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
            Err(error) => {
                println!("[WARN] SQLite check failed: {error:#}");
                issues.push("db unreachable");
            }
        },
        StorageBackend::Memory => {
            println!("[WARN] memory storage selected; data is lost on restart");
            issues.push("ephemeral storage");
        }
    }

    for (label, dir) in [
        ("upload dir", &config.upload_dir),
        ("staging dir", &config.staging_dir),
    ] {
        if dir.is_dir() {
            println!("[OK] {label} exists: {}", dir.display());
        } else {
            println!("[WARN] {label} missing: {}", dir.display());
            issues.push("upload directories missing");
        }
    }

    if config.staging_dir.starts_with(&config.upload_dir) {
        println!("[WARN] staging dir is inside the served upload dir");
        issues.push("staging dir exposed");
    }

    match config.parse_sync_time() {
        Ok(_) => println!("[OK] github_sync_time format valid: {}", config.github_sync_time),
        Err(error) => {
            println!("[WARN] invalid github_sync_time setting: {error}");
            issues.push("invalid github_sync_time");
        }
    }

    if config.github_sync_enabled {
        if config.github_username.is_none() {
            println!("[WARN] GitHub sync is enabled but github_username is missing");
            issues.push("github username missing");
        }
        if github::has_token(&config) {
            println!("[OK] GitHub token is configured");
        } else {
            println!("[WARN] GitHub sync is enabled but no token is configured");
            issues.push("github token missing");
        }
    } else {
        println!("[OK] GitHub sync disabled");
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn handle_post_command(command: PostCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let repository = db::open_repository(&config)?;

    match command {
        PostCommands::Import { file, image, title } => {
            let store = Arc::new(UploadStore::from_config(&config));
            store
                .prepare()
                .await
                .context("Failed to prepare upload directories")?;

            let mut uploads = store.begin();
            stage_local(&store, &mut uploads, UploadField::Markdown, &file).await?;
            if let Some(image) = image.as_deref() {
                stage_local(&store, &mut uploads, UploadField::Image, image).await?;
            }

            let pipeline = IngestPipeline::new(repository, store);
            let post = pipeline
                .ingest(IngestRequest {
                    uploads,
                    title,
                    owner_id: config.owner_id,
                })
                .await?;

            println!("Post created: #{} {}", post.id, post.title);
            if let Some(url) = post.image_url {
                println!("- image: {url}");
            }
            Ok(())
        }
        PostCommands::List => {
            let posts = repository.list_posts()?;
            if posts.is_empty() {
                println!("No posts yet");
            }
            for post in posts {
                println!(
                    "#{:<4} {}  {}",
                    post.id,
                    post.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    post.title
                );
            }
            Ok(())
        }
    }
}

async fn stage_local(
    store: &UploadStore,
    uploads: &mut ingest::staging::StagedUploads,
    field: UploadField,
    path: &Path,
) -> Result<()> {
    store
        .stage_file(uploads, field, path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(())
}

async fn handle_activity_command(command: ActivityCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let repository = db::open_repository(&config)?;

    match command {
        ActivityCommands::Add { date, count, owner } => {
            let record = repository.create_activity(NewActivity {
                date: parse_date(&date)?,
                count,
                owner_id: owner.unwrap_or(config.owner_id),
            })?;
            println!(
                "Activity recorded: {} = {} (owner {})",
                record.date, record.count, record.owner_id
            );
            Ok(())
        }
        ActivityCommands::SyncGithub { months } => {
            let months = months.unwrap_or(config.heatmap_months);
            let summary = tokio::task::spawn_blocking(move || {
                github::sync_contributions(&config, repository.as_ref(), months)
            })
            .await
            .map_err(|_| anyhow!("GitHub sync task panicked"))??;

            println!(
                "Synced {} day(s) for {} ({} to {}, {} contributions)",
                summary.imported, summary.username, summary.from, summary.to, summary.total
            );
            Ok(())
        }
    }
}

fn handle_heatmap(months: Option<u32>, theme: Option<Theme>, owner: Option<i64>) -> Result<()> {
    let config = load_or_default_config()?;
    let repository = db::open_repository(&config)?;
    let owner_id = owner.unwrap_or(config.owner_id);
    let records = repository.list_activities(Some(owner_id))?;

    let months = months.unwrap_or(config.heatmap_months).clamp(1, 24);
    let window = HeatmapWindow::trailing_months(Local::now().date_naive(), months);
    let grid = bucket_activities(window, &records);

    let rendered = match theme {
        Some(theme) => heatmap::render_ansi(&grid, theme),
        None => heatmap::render_text(&grid),
    };
    println!("{rendered}");

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_dirs()?;
    let repository = db::open_repository(&config)?;

    let shared_config = Arc::new(config);
    let api_config = Arc::clone(&shared_config);
    let api_repository = Arc::clone(&repository);

    let scheduler_enabled = shared_config.github_sync_enabled;
    let scheduler_config = Arc::clone(&shared_config);
    let scheduler_fallback = Arc::clone(&shared_config);
    let scheduler_repository = Arc::clone(&repository);

    info!(storage = repository.backend_name(), "Folio service started");

    tokio::select! {
        scheduler_result = scheduler::run_daily_scheduler(move || {
            Config::load()
                .unwrap_or_else(|_| (*scheduler_fallback).clone())
                .parse_sync_time()
        }, move |_date| {
            let config = Arc::clone(&scheduler_config);
            let repository: Arc<dyn Repository> = Arc::clone(&scheduler_repository);
            async move {
                let runtime_config = Config::load().unwrap_or_else(|_| (*config).clone());
                let months = runtime_config.heatmap_months;
                tokio::task::spawn_blocking(move || {
                    github::sync_contributions(&runtime_config, repository.as_ref(), months)
                })
                .await
                .map_err(|_| anyhow!("GitHub sync task panicked"))??;
                Ok(())
            }
        }), if scheduler_enabled => {
            scheduler_result?;
        }
        api_result = api::run_server(api_config, api_repository) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_dirs()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `folio onboard` first.".to_string())
}

fn is_port_open(config: &Config) -> bool {
    format!("{}:{}", config.api_host, config.api_port)
        .parse::<SocketAddr>()
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(250)).is_ok())
        .unwrap_or(false)
}
