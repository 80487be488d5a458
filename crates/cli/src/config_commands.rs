use anyhow::Result;

use meetbridge_config::{
    MeetbridgeConfig, resolve_credential_source,
    validate::{self, Severity},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(config: &MeetbridgeConfig) -> Result<()> {
    let result = validate::validate(config);

    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let mut errors = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = result.diagnostics.len() - errors;

    match resolve_credential_source() {
        Ok(source) => {
            let location = source
                .token_path()
                .map(|p| format!(", token file {}", p.display()))
                .unwrap_or_default();
            eprintln!("  {BOLD}{GREEN}ok{RESET} credentials: {} scheme{location}", source.scheme());
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} credentials: {e}");
            errors += 1;
        },
    }

    eprintln!(
        "  preview features: {}",
        if config.api.enable_preview { "enabled" } else { "disabled" }
    );

    eprintln!();
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
