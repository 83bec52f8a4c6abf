use td_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

/// Prompt for the Gemini API key and store it in the OS keychain.
///
/// Point `[llm.auth]` at it with `service`/`account` afterwards.
pub fn set_secret(service: &str, account: &str) -> anyhow::Result<()> {
    let secret = rpassword::prompt_password_stderr(&format!(
        "API key for {service}/{account} (input hidden): "
    ))?;
    let secret = secret.trim();
    if secret.is_empty() {
        anyhow::bail!("no key entered, keychain left unchanged");
    }

    td_providers::store_in_keychain(service, account, secret)?;

    eprintln!("Stored. Add this to config.toml:");
    eprintln!();
    eprintln!("[llm.auth]");
    eprintln!("service = \"{service}\"");
    eprintln!("account = \"{account}\"");
    Ok(())
}
