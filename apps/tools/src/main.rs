use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use roster::{
    commands::{
        ADD_COMMAND, LIST_COMMAND, OPTION_DESCRIPTION, OPTION_DISCORD, OPTION_MANAGER,
        OPTION_NAME, OPTION_TYPE, REMOVE_COMMAND,
    },
    handle_command,
    view::render_roster,
    DetachedSurface, RosterContext,
};
use shared::{domain::ChannelId, protocol::CommandInvocation};
use storage::Storage;
use tracing_subscriber::EnvFilter;

/// Offline maintenance of the enterprise roster database. Commands behave
/// like their slash-command counterparts, without touching Discord.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data.sqlite")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Add {
        name: String,
        manager: String,
        /// legal or illegal
        kind: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        discord: Option<String>,
    },
    Remove {
        name: String,
    },
    /// Prints the roster embed as JSON.
    Preview,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    if let Command::Preview = cli.command {
        let enterprises = storage.list_enterprises().await?;
        let embed = render_roster(&enterprises, Utc::now());
        println!("{}", serde_json::to_string_pretty(&embed)?);
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = RosterContext {
        storage,
        display: Arc::new(DetachedSurface),
        display_channel: ChannelId(0),
    };
    let reply = handle_command(&ctx, &invocation(cli.command)).await;
    println!("{}", reply.content);

    // Private replies are the error path of every command.
    Ok(if reply.ephemeral {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn invocation(command: Command) -> CommandInvocation {
    match command {
        Command::List | Command::Preview => CommandInvocation::new(LIST_COMMAND),
        Command::Add {
            name,
            manager,
            kind,
            description,
            discord,
        } => {
            let mut invocation = CommandInvocation::new(ADD_COMMAND)
                .with_option(OPTION_NAME, name)
                .with_option(OPTION_MANAGER, manager)
                .with_option(OPTION_TYPE, kind);
            if let Some(description) = description {
                invocation = invocation.with_option(OPTION_DESCRIPTION, description);
            }
            if let Some(discord) = discord {
                invocation = invocation.with_option(OPTION_DISCORD, discord);
            }
            invocation
        }
        Command::Remove { name } => {
            CommandInvocation::new(REMOVE_COMMAND).with_option(OPTION_NAME, name)
        }
    }
}
