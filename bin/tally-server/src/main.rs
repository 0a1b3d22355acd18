// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

// Minimal bootstrap; handlers and state live in the library target.
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tally::Analyzer;
use tally_server::{
    config::{load_server_config, ServerConfig},
    http::build_router,
    AppState,
};
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "tally-server", about = "Heuristic question answering over tabular data")]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
    /// Answer one question against a CSV or JSON file
    Ask { file: PathBuf, question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let cli = Cli::parse();
    let cfg = load_server_config(cli.config.as_deref())?;
    match cli.cmd.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => run_server(cfg, addr).await,
        Command::Ask { file, question } => {
            let analyzer = Analyzer::with_config(cfg.analyzer)?;
            println!("{}", tally_server::ask(&analyzer, &file, &question)?);
            Ok(())
        }
    }
}

async fn run_server(cfg: ServerConfig, addr_override: Option<String>) -> Result<()> {
    info!("tally-server starting");
    let state = AppState::from_config(&cfg)?;
    let app = build_router(state, cfg.body_limit_bytes);
    let addr: SocketAddr = addr_override.unwrap_or(cfg.http_addr).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(error=%e, %addr, "bind failed, using ephemeral");
            tokio::net::TcpListener::bind("127.0.0.1:0").await?
        }
    };
    let local = listener.local_addr()?;
    info!(%local, "api listening");

    tokio::select! { r = axum::serve(listener, app) => r?, _ = tokio::signal::ctrl_c() => {} }
    info!("tally-server shutting down");
    Ok(())
}
