//! The five pfw commands.
//!
//! Each command writes its user-facing lines to `out`; diagnostics go
//! through `tracing` to stderr.

use std::io::Write;

use pfw_auth_engine::AuthManager;
use pfw_skills::{Installer, Tool};

use crate::app::App;
use crate::error::Result;

// ---------------------------------------------------------------------------
// login
// ---------------------------------------------------------------------------

pub async fn login(app: &App, out: &mut dyn Write) -> Result<()> {
    let session = app.session();
    let manager = AuthManager::new(app.authenticator.clone(), app.browser.clone());

    let mut shown = Ok(());
    let outcome = manager
        .login(&app.base_url, &session, |url| {
            shown = writeln!(out, "Open this URL to log in: {url}")
                .and_then(|()| writeln!(out, "Waiting for the browser to redirect back..."))
                .and_then(|()| out.flush());
        })
        .await?;
    shown?;

    writeln!(out, "Logged in. Token saved to {}.", outcome.token_path.display())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

pub async fn install(app: &App, tool: Tool, out: &mut dyn Write) -> Result<()> {
    let session = app.session();
    let token = session.load()?;
    let machine = session.machine_id()?;
    let whoami = app.whoami.whoami();

    tracing::info!(tool = %tool, machine = %machine, "installing skills");
    let archive = app.server.download_skills(&token, machine, &whoami).await?;

    let installer = Installer::new(app.fs.clone(), app.ids.clone());
    let path = installer.install_for_tool(tool, &archive)?;

    writeln!(out, "Installed skills for {tool} into {}", path.display())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// logout
// ---------------------------------------------------------------------------

pub fn logout(app: &App, clean: bool, out: &mut dyn Write) -> Result<()> {
    let session = app.session();

    if clean {
        if session.clear_all()? {
            writeln!(out, "Removed data at {}.", session.data_dir().display())?;
        } else {
            writeln!(out, "No data found.")?;
        }
    } else if session.clear()? {
        writeln!(out, "Removed token at {}.", session.token_path().display())?;
    } else {
        writeln!(out, "No token found.")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub fn status(app: &App, out: &mut dyn Write) -> Result<()> {
    let session = app.session();
    let home = app.fs.home_dir();

    writeln!(out, "Logged in: {}", yes_no(session.is_logged_in()))?;
    writeln!(out, "Token path: {}", session.token_path().display())?;
    writeln!(out, "Data directory: {}", session.data_dir().display())?;
    writeln!(
        out,
        "Data directory exists: {}",
        yes_no(app.fs.exists(session.data_dir()))
    )?;
    for tool in Tool::ALL {
        writeln!(
            out,
            "Default install path ({tool}): {}",
            tool.install_dir(&home).display()
        )?;
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

pub fn version(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
