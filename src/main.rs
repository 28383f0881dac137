//! Loan approval pipeline - Main Entry Point

use clap::Parser;
use mlops_pipeline::cli::{
    cmd_baseline, cmd_info, cmd_prepare, cmd_report, cmd_request, cmd_serve, prepare_config,
    show_help, Cli, Commands, DataSource,
};
use mlops_pipeline::client::ClientConfig;
use mlops_pipeline::server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlops_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Prepare {
            data,
            target,
            features,
            labels,
            label_column,
            output_dir,
            test_size,
            seed,
            scaler,
            exclude,
        }) => {
            let config = prepare_config(test_size, seed, &scaler, exclude)?;
            let source = match (&data, &target, &features, &labels) {
                (Some(path), Some(target), _, _) => DataSource::Table {
                    path: path.as_path(),
                    target: target.as_str(),
                },
                (_, _, Some(features), Some(labels)) => DataSource::Split {
                    features: features.as_path(),
                    labels: labels.as_path(),
                    label_column: label_column.as_deref(),
                },
                _ => anyhow::bail!("pass either --data with --target, or --features with --labels"),
            };
            cmd_prepare(source, &output_dir, &config)?;
        }
        Some(Commands::Baseline { data_dir, output }) => {
            cmd_baseline(&data_dir, output.as_deref())?;
        }
        Some(Commands::Serve { port, host, data_dir, model }) => {
            let mut config = ServerConfig::default();
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(dir) = data_dir {
                config = config.with_data_dir(dir);
            }
            if let Some(model) = model {
                config = config.with_model_file(model);
            }
            cmd_serve(config).await?;
        }
        Some(Commands::Request { url, records, seed, output }) => {
            let mut config = ClientConfig::default()
                .with_records(records)
                .with_seed(seed)
                .with_output(output);
            if let Some(url) = url {
                config = config.with_url(url);
            }
            cmd_request(&config).await?;
        }
        Some(Commands::Report { file, results }) => {
            cmd_report(&file, results.as_deref())?;
        }
        Some(Commands::Info { data_dir }) => {
            cmd_info(&data_dir)?;
        }
        None => show_help(),
    }

    Ok(())
}
