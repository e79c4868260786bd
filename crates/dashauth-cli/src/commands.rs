use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use dashauth_core::{
    ApiClient, AuthService, Config, Credentials, GuardDecision, LogNotifier, NavigationKind,
    Navigator, Route, RouteGuard, Router, SessionManager, SessionState,
};

/// Build the client stack with the router starting at `start`
fn connect(config: &Config, start: Route) -> Result<(SessionManager, Arc<Router>)> {
    let router = Arc::new(Router::new(start));
    let tokens = config
        .open_token_store()
        .context("Failed to open token storage")?;
    let api = ApiClient::new(
        &config.api_origin,
        config.timeout(),
        tokens,
        router.clone(),
        Arc::new(LogNotifier),
    )
    .context("Failed to create API client")?;

    let session =
        SessionManager::new(AuthService::new(api)).with_logout_policy(config.logout_policy);
    Ok((session, router))
}

/// Hard redirects mean the browser would reload; tell the user where
/// they would have landed.
fn report_navigation(router: &Router) {
    for nav in router.history() {
        debug!(route = %nav.route, kind = ?nav.kind, "Navigation");
        if nav.kind == NavigationKind::Redirect {
            eprintln!("Redirected to {}", nav.route);
        }
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match last {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

pub async fn login(config: &mut Config, username: Option<String>, remember: bool) -> Result<()> {
    let (session, router) = connect(config, Route::Login)?;

    if let SessionState::Authenticated(user) = session.init().await {
        println!("Already signed in as {}", user.display_name());
        return Ok(());
    }

    let username = match username.or_else(|| std::env::var("DASHAUTH_USERNAME").ok()) {
        Some(username) => username,
        None => prompt_username(config.last_username.as_deref())?,
    };
    let password = match std::env::var("DASHAUTH_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let credentials = Credentials::new(username.clone(), password).remember(remember);
    let result = session.login(&credentials).await;
    report_navigation(&router);
    let user = result.context("Login failed")?;

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {} <{}>", user.display_name(), user.email);
    session.teardown();
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let (session, router) = connect(config, Route::Dashboard)?;

    let result = session.logout().await;
    report_navigation(&router);
    result.context("Logout failed")?;

    println!("Signed out");
    session.teardown();
    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let (session, router) = connect(config, Route::Dashboard)?;

    let state = session.init().await;
    report_navigation(&router);
    match state {
        SessionState::Authenticated(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        _ => bail!("Not signed in. Run `dashauth login` first."),
    }

    session.teardown();
    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let record = config
        .open_token_store()
        .context("Failed to open token storage")?
        .load()
        .context("Failed to read stored tokens")?;

    println!("API origin:     {}", config.api_origin);
    println!("Token backend:  {:?}", config.token_backend);
    println!("Logout policy:  {:?}", config.logout_policy);
    println!(
        "Access token:   {}",
        if record.access_token.is_some() { "stored" } else { "none" }
    );
    println!(
        "Refresh token:  {}",
        if record.refresh_token.is_some() { "stored" } else { "none" }
    );
    match record.minutes_until_expiry() {
        Some(_) if record.is_expired() => println!("Expires:        expired"),
        Some(minutes) if record.needs_refresh() => {
            println!("Expires:        in {} min (refresh due)", minutes)
        }
        Some(minutes) => println!("Expires:        in {} min", minutes),
        None => println!("Expires:        unknown"),
    }
    Ok(())
}

pub async fn open(config: &Config, path: &str) -> Result<()> {
    let route = Route::from_path(path).with_context(|| format!("Unknown route: {}", path))?;
    let (session, router) = connect(config, route)?;

    let state = session.init().await;
    let current = router.current();
    report_navigation(&router);

    match RouteGuard::check(&state, current) {
        GuardDecision::Render if current.is_protected() => {
            let page = RouteGuard::protect(&state, router.as_ref(), |user| {
                format!("{} for {}", current, user.display_name())
            })
            .unwrap_or_else(|| current.to_string());
            println!("Showing {}", page);
        }
        GuardDecision::Render => println!("Showing {}", current),
        GuardDecision::Pending => println!("Session check still running"),
        GuardDecision::Redirect(to) => {
            router.navigate(to);
            println!("Redirected to {}", to);
        }
    }

    session.teardown();
    Ok(())
}
