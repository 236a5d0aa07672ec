// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! burnlink server binary.

use std::path::PathBuf;

use burnlink_server::App;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// burnlink server - one-time secret shares.
#[derive(Parser, Debug)]
#[command(
	name = "burnlink-server",
	about = "One-time secret share server",
	version
)]
struct Args {
	/// Config file to load instead of /etc/burnlink/server.toml
	#[arg(long, env = "BURNLINK_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
	/// Run until interrupted (default)
	#[default]
	Serve,
	/// Delete expired shares once and exit
	Sweep,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let command = args.command.unwrap_or_default();

	if let Command::Version = command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => burnlink_server_config::load_config_with_file(path)?,
		None => burnlink_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		database = %config.database.url,
		pool_size = config.workers.pool_size,
		command = ?command,
		"starting burnlink-server"
	);

	let app = App::build(config).await?;

	match command {
		Command::Sweep => {
			let result = app.sweep_now().await;
			app.shutdown().await;
			let output = result?;
			println!("{}", output.message);
		}
		Command::Serve => {
			app.start_scheduler().await;
			shutdown_signal().await;
			tracing::info!("Received shutdown signal");
			app.shutdown().await;
		}
		Command::Version => {}
	}

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
