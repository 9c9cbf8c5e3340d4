use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = fanout_balancer::cli::Cli::parse();
    if let Err(e) = fanout_balancer::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
