use crate::config::Config;
use crate::db::{NewActivity, Repository};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local, Months, NaiveDate, NaiveTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// GitHub refuses contribution ranges longer than a year.
pub const MAX_SYNC_MONTHS: u32 = 12;

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionCalendar {
    pub total: u64,
    pub days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub username: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub imported: usize,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    user: Option<GraphqlUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlUser {
    contributions_collection: CollectionPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionPayload {
    contribution_calendar: CalendarPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarPayload {
    total_contributions: u64,
    weeks: Vec<WeekPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeekPayload {
    contribution_days: Vec<DayPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayPayload {
    date: NaiveDate,
    contribution_count: u32,
}

pub fn has_token(config: &Config) -> bool {
    resolve_token(config).is_some()
}

pub fn resolve_token(config: &Config) -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            config
                .github_token
                .clone()
                .filter(|value| !value.trim().is_empty())
        })
}

/// Imports the last `months` of contributions for the configured user and
/// replaces the owner's activity records inside that window.
pub fn sync_contributions(
    config: &Config,
    repository: &dyn Repository,
    months: u32,
) -> Result<SyncSummary> {
    let username = config
        .github_username
        .clone()
        .filter(|value| !value.trim().is_empty())
        .context("GitHub username is missing. Set `folio config set github.username <NAME>`.")?;
    let token = resolve_token(config).context(
        "GitHub token is missing. Set `folio config set github.token <TOKEN>` or `GITHUB_TOKEN`.",
    )?;

    let months = months.clamp(1, MAX_SYNC_MONTHS);
    let to = Local::now().date_naive();
    let from = to
        .checked_sub_months(Months::new(months))
        .context("Failed to compute sync window start")?;

    let calendar = fetch_contributions(config, &token, &username, from, to)?;
    let activities = calendar
        .days
        .iter()
        .filter(|day| day.count > 0 && from <= day.date && day.date <= to)
        .map(|day| NewActivity {
            date: day.date,
            count: day.count,
            owner_id: config.owner_id,
        })
        .collect::<Vec<_>>();

    let imported = repository
        .replace_activities(config.owner_id, from, to, &activities)
        .context("Failed to store GitHub contributions")?;

    info!(
        username = %username,
        from = %from,
        to = %to,
        imported,
        total = calendar.total,
        "GitHub contributions synced"
    );

    Ok(SyncSummary {
        username,
        from,
        to,
        imported,
        total: calendar.total,
    })
}

pub fn fetch_contributions(
    config: &Config,
    token: &str,
    username: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<ContributionCalendar> {
    let endpoint = config.github_api_url.clone();
    let timeout_seconds = config.github_timeout_seconds.max(5);
    let token = token.to_string();
    let body = json!({
        "query": CONTRIBUTIONS_QUERY,
        "variables": {
            "login": username,
            "from": day_bound(from, NaiveTime::MIN).to_rfc3339(),
            "to": day_bound(to, end_of_day()).to_rfc3339(),
        }
    });

    let response = std::thread::spawn(move || {
        post_graphql_blocking(&endpoint, timeout_seconds, &token, &body)
    })
    .join()
    .map_err(|_| anyhow!("GitHub worker thread panicked"))??;

    parse_contributions(&response)
}

fn post_graphql_blocking(
    endpoint: &str,
    timeout_seconds: u64,
    token: &str,
    body: &serde_json::Value,
) -> Result<String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("folio/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("bearer {token}"))
            .context("Failed to build Authorization header")?,
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .context("Failed to create GitHub HTTP client")?;

    let response = client
        .post(endpoint)
        .json(body)
        .send()
        .context("GitHub API request failed")?;

    let status = response.status();
    let text = response
        .text()
        .context("Failed to read GitHub response body")?;

    if !status.is_success() {
        bail!("GitHub API error {}: {}", status, text);
    }

    Ok(text)
}

/// Extracts the contribution calendar from a GraphQL response body.
pub fn parse_contributions(body: &str) -> Result<ContributionCalendar> {
    let parsed: GraphqlResponse =
        serde_json::from_str(body).context("Failed to parse GitHub GraphQL response")?;

    if !parsed.errors.is_empty() {
        let messages = parsed
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        bail!("GitHub GraphQL error: {messages}");
    }

    let calendar = parsed
        .data
        .and_then(|data| data.user)
        .map(|user| user.contributions_collection.contribution_calendar)
        .context("GitHub user not found")?;

    let days = calendar
        .weeks
        .into_iter()
        .flat_map(|week| week.contribution_days)
        .map(|day| ContributionDay {
            date: day.date,
            count: day.contribution_count,
        })
        .collect();

    Ok(ContributionCalendar {
        total: calendar.total_contributions,
        days,
    })
}

fn day_bound(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}
