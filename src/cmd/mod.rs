//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`validate`], or [`dummy`]. Each handler
//! lives in its own submodule.

pub mod dummy;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::BalancerError;

pub async fn dispatch(cli: Cli) -> Result<(), BalancerError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Dummy(args)) => dummy::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  fanout-balancer v{version} \u{2014} failover-aware HTTP dispatcher\n\n  \
         No command provided. To get started:\n\n    \
         fanout-balancer run -e http://a:8000,http://b:8000    Serial failover across two upstreams\n    \
         fanout-balancer run -e ... --fanout                   Ask all upstreams at once\n    \
         fanout-balancer dummy                                 Start a test upstream on :8000\n    \
         fanout-balancer --help                                See all commands and options\n"
    );
}
