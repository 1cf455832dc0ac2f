use anyhow::{Context, Result};
use apprun_client::AppRunClient;
use clap::Parser;

use apprun_deploy::cli::Cli;
use apprun_deploy::observability::init_tracing_with_level;
use apprun_deploy::output::{print_success, set_failed, set_output};
use apprun_deploy::{EnvInputs, Inputs, load_access_key, reconcile};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing_with_level(&cli.log_level);

    if let Err(e) = run(&cli).await {
        set_failed(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }

    let inputs = Inputs::new(&EnvInputs);
    let access_key = load_access_key(&inputs)?;
    let client = AppRunClient::new(&cli.base_url, &access_key)?;
    tracing::debug!(base_url = %client.base_url(), "using AppRun API");

    let outcome = reconcile(&client, &inputs).await?;
    set_output("public_url", &outcome.public_url).context("Failed to write public_url output")?;
    print_success(&format!(
        "Application {} {} at {}",
        outcome.application_id, outcome.action, outcome.public_url
    ));
    Ok(())
}
