//! Subcommand handlers. Each returns the text to print on success.

use std::str::FromStr;

use anyhow::Context;
use tally_domain::{ApiRequest, HttpMethod, QueryParam};

use crate::app::App;
use crate::cli::Command;

/// Runs `command` against `app`.
///
/// # Errors
///
/// Returns the underlying client error so the caller can format it with
/// `handle_api_error`.
pub async fn run(app: &App, command: Command) -> anyhow::Result<String> {
    match command {
        Command::Login { email, password } => login(app, &email, &password).await,
        Command::Logout => {
            app.sessions.logout().await?;
            Ok("Signed out.".to_string())
        }
        Command::Whoami => whoami(app).await,
        Command::Request {
            method,
            path,
            data,
            query,
        } => request(app, &method, path, data.as_deref(), &query).await,
    }
}

async fn login(app: &App, email: &str, password: &str) -> anyhow::Result<String> {
    let session = app.sessions.login(email, password).await?;
    let user = &session.user;
    Ok(format!(
        "Signed in as {} <{}> ({})",
        display_name(&user.name, &user.email),
        user.email,
        user.role
    ))
}

async fn whoami(app: &App) -> anyhow::Result<String> {
    Ok(match app.sessions.current_user().await? {
        Some(user) => format!(
            "{} <{}> ({})",
            display_name(&user.name, &user.email),
            user.email,
            user.role
        ),
        None => "Not signed in.".to_string(),
    })
}

async fn request(
    app: &App,
    method: &str,
    path: String,
    data: Option<&str>,
    query: &[String],
) -> anyhow::Result<String> {
    let method = HttpMethod::from_str(method)?;
    let mut request = ApiRequest::new(method, path);

    for pair in query {
        let param = QueryParam::parse_pair(pair)?;
        request = request.with_query(param.key, param.value);
    }

    if let Some(raw) = data {
        let body: serde_json::Value =
            serde_json::from_str(raw).context("--data must be valid JSON")?;
        request = request.with_json(&body)?;
    }

    let response = app.client.send(request).await?;
    Ok(pretty_body(&response.body))
}

fn display_name<'a>(name: &'a str, email: &'a str) -> &'a str {
    if name.trim().is_empty() { email } else { name }
}

/// Pretty-prints JSON bodies; anything else is returned as-is.
fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
