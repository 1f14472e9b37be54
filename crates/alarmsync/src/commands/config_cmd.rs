//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use alarmsync_api::Subdomain;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Account, Config};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { force } => init(global, force),

        ConfigCommand::Show => {
            let cfg = config::load(global)?.redacted();
            let path = config::config_file(global);
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# unprintable: {e}")),
                |_| path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_file(global).display());
            Ok(())
        }

        ConfigCommand::Check => {
            let cfg = config::load(global)?;
            let sync = cfg.to_sync_config()?;
            cfg.request_timeout()?;
            if !global.quiet {
                eprintln!(
                    "✓ Configuration valid: {} sensor(s), {} mode, portal {}",
                    sync.sensors.len(),
                    sync.mode,
                    sync.subdomain.base_url()
                );
            }
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            let account = cfg.account()?;
            let password = rpassword::prompt_password(format!(
                "Portal password for {}: ",
                account.username
            ))
            .map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            alarmsync_config::store_password(&account.username, &password)?;
            eprintln!("✓ Password stored in system keyring for '{}'", account.username);
            Ok(())
        }

        ConfigCommand::ClearPassword => {
            let cfg = config::load(global)?;
            let account = cfg.account()?;
            alarmsync_config::delete_password(&account.username)?;
            eprintln!("✓ Keyring entry removed for '{}'", account.username);
            Ok(())
        }
    }
}

// ── Init: interactive wizard ─────────────────────────────────────────

fn init(global: &GlobalOpts, force: bool) -> Result<(), CliError> {
    let path = config::config_file(global);
    eprintln!("alarmsync configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    // Keep sensors and tuning from an existing file.
    let mut cfg = if path.exists() {
        if !force
            && !Confirm::new()
                .with_prompt("A configuration file already exists. Replace the account settings?")
                .default(false)
                .interact()
                .map_err(prompt_err)?
        {
            eprintln!("Aborted; nothing written.");
            return Ok(());
        }
        alarmsync_config::load_config(Some(&path)).unwrap_or_default()
    } else {
        Config::default()
    };

    // 1. Account
    let username: String = Input::new()
        .with_prompt("Portal username (email)")
        .interact_text()
        .map_err(prompt_err)?;

    let fingerprint: String = Input::new()
        .with_prompt("Browser fingerprint")
        .interact_text()
        .map_err(prompt_err)?;

    let regions = &["United States (portal)", "Canada (portal-ca)"];
    let subdomain = match Select::new()
        .with_prompt("Portal region")
        .items(regions)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => Subdomain::Portal,
        _ => Subdomain::PortalCa,
    };

    // 2. Password and where it lives
    let password = rpassword::prompt_password("Portal password: ").map_err(prompt_err)?;
    if username.trim().is_empty() || fingerprint.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "account".into(),
            reason: "username, fingerprint and password cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Don't store (use ALARMSYNC_PASSWORD)",
    ];
    let plaintext = match Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => {
            alarmsync_config::store_password(&username, &password)?;
            eprintln!("   ✓ Password stored in system keyring");
            None
        }
        1 => Some(password),
        _ => None,
    };

    cfg.account = Some(Account {
        username,
        password: plaintext,
        fingerprint,
        subdomain,
    });

    // 3. Write
    config::save_config(&cfg, &path)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    if cfg.sensors.is_empty() {
        eprintln!("  List portal sensors with: alarmsync sensors");
        eprintln!("  then add [[sensors]] tables (name, type, zone) to the file.");
    }
    Ok(())
}
