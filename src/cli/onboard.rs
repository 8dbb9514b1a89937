use crate::config::{Config, parse_hhmm};
use crate::db::{self, NewProfile, ProfilePatch};
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to Folio onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let mut config = Config::load().unwrap_or_default();

    println!("\n[1/4] Profile");
    let name: String = Input::with_theme(&theme)
        .with_prompt("  Display name")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("Name must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read display name")?;
    let alias = optional_input(&theme, "  Alias (optional)")?;
    let website = optional_input(&theme, "  Website URL (optional)")?;

    println!("\n[2/4] Server port");
    let port: u16 = Input::with_theme(&theme)
        .with_prompt("  Port for the API server")
        .default(config.api_port)
        .interact_text()
        .context("Failed to read server port")?;
    config.api_port = port;
    println!("  ✓ Server will listen on {}:{port}", config.api_host);

    println!("\n[3/4] GitHub contributions");
    let github_username = optional_input(&theme, "  GitHub username (optional)")?;
    config.github_username = github_username.clone();

    if github_username.is_some() {
        let enable_sync = Confirm::with_theme(&theme)
            .with_prompt("  Sync contributions daily while serving?")
            .default(true)
            .interact()
            .context("Failed to read sync confirmation")?;
        config.github_sync_enabled = enable_sync;

        if enable_sync {
            let sync_time: String = Input::with_theme(&theme)
                .with_prompt("  Daily sync time")
                .default(config.github_sync_time.clone())
                .validate_with(|input: &String| -> std::result::Result<(), &str> {
                    parse_hhmm(input)
                        .map(|_| ())
                        .map_err(|_| "Use HH:MM format (example: 03:00)")
                })
                .interact_text()
                .context("Failed to read sync time")?;
            config.github_sync_time = sync_time;
        }
        println!("  ! Set a token with `folio config set github.token <TOKEN>` or GITHUB_TOKEN");
    }

    println!("\n[4/4] Saving");
    config.ensure_bootstrap_dirs()?;
    config.save()?;

    let github = config
        .github_username
        .as_ref()
        .map(|username| format!("https://github.com/{username}"));
    let repository = db::open_repository(&config)?;
    let profile = match repository.profile()? {
        Some(existing) => repository.update_profile(
            existing.id,
            ProfilePatch {
                name: Some(name),
                alias,
                website,
                github,
                ..ProfilePatch::default()
            },
        )?,
        None => repository.create_profile(
            NewProfile {
                name,
                alias,
                website,
                github,
                ..NewProfile::default()
            },
            config.owner_id,
        )?,
    };
    println!("  ✓ Profile saved for {}", profile.name);

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run `folio serve` to start the site.");
    println!("──────────────────────────────────────────");

    Ok(config)
}

fn optional_input(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read input: {}", prompt.trim()))?;

    Ok(db::blank_to_none(value))
}
