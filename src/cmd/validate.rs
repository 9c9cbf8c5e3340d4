//! `fanout-balancer validate`: check balancer settings without serving.
//!
//! Resolves flags and config file exactly like `run`, then reports the
//! endpoint list, accepted status floors, and dispatch mode in either
//! human-readable text or machine-readable JSON.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::Settings;
use crate::error::BalancerError;

pub fn execute(args: &ValidateArgs) -> Result<(), BalancerError> {
    let settings = match Settings::resolve(&args.balancer) {
        Ok(settings) => settings,
        Err(e) => {
            match args.format {
                ValidateFormat::Text => eprintln!("\u{2717} configuration is invalid\n\n  {e}"),
                ValidateFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "config_error": e.is_config(),
                        "error": e.to_string(),
                    })
                ),
            }
            return Err(e);
        }
    };

    match args.format {
        ValidateFormat::Text => println!("\u{2713} {}", format_report(&settings)),
        ValidateFormat::Json => println!("{}", report_json(&settings)),
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn report_json(settings: &Settings) -> serde_json::Value {
    serde_json::json!({
        "valid": true,
        "endpoints": settings.endpoints,
        "terminal_responses": settings.classifier.floors().collect::<Vec<_>>(),
        "mode": settings.mode,
        "timeout_ms": settings.timeout.as_millis() as u64,
    })
}

fn format_report(settings: &Settings) -> String {
    use std::fmt::Write;

    let mut report = format!(
        "{} endpoint(s), {} dispatch, terminal statuses {}",
        settings.endpoints.len(),
        settings.mode,
        settings.classifier
    );
    for (index, endpoint) in settings.endpoints.iter().enumerate() {
        // write! to String is infallible
        let _ = write!(report, "\n    #{index} {}", endpoint.trim());
    }
    report
}
