use shared::{
    domain::NewEnterprise,
    error::{CommandError, ErrorCode},
    protocol::{CommandDefinition, CommandInvocation, CommandOptionDefinition, Reply},
};
use tracing::{error, info, warn};

use crate::{
    sync::{synchronize, SyncOutcome},
    view::{echoed_name, render_list},
    RosterContext,
};

pub const ADD_COMMAND: &str = "entreprise-add";
pub const REMOVE_COMMAND: &str = "entreprise-remove";
pub const LIST_COMMAND: &str = "entreprise-list";

pub const OPTION_NAME: &str = "nom";
pub const OPTION_MANAGER: &str = "gerant";
pub const OPTION_TYPE: &str = "type";
pub const OPTION_DESCRIPTION: &str = "description";
pub const OPTION_DISCORD: &str = "discord";

pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition {
            name: ADD_COMMAND.into(),
            description: "Ajouter une entreprise".into(),
            options: vec![
                option(OPTION_NAME, "Nom de l'entreprise", true),
                option(OPTION_MANAGER, "Nom du gérant", true),
                option(OPTION_TYPE, "legal ou illegal", true),
                option(OPTION_DESCRIPTION, "Description", false),
                option(OPTION_DISCORD, "Lien discord", false),
            ],
        },
        CommandDefinition {
            name: REMOVE_COMMAND.into(),
            description: "Supprimer une entreprise".into(),
            options: vec![option(OPTION_NAME, "Nom de l'entreprise", true)],
        },
        CommandDefinition {
            name: LIST_COMMAND.into(),
            description: "Lister les entreprises".into(),
            options: Vec::new(),
        },
    ]
}

fn option(name: &str, description: &str, required: bool) -> CommandOptionDefinition {
    CommandOptionDefinition {
        name: name.into(),
        description: description.into(),
        required,
    }
}

/// Routes an invocation to its handler. Always produces a reply: handler
/// failures become a private message to the invoker.
pub async fn handle_command(ctx: &RosterContext, invocation: &CommandInvocation) -> Reply {
    let result = match invocation.name.as_str() {
        ADD_COMMAND => add_enterprise(ctx, invocation).await,
        REMOVE_COMMAND => remove_enterprise(ctx, invocation).await,
        LIST_COMMAND => list_enterprises(ctx).await,
        other => {
            warn!(command = other, "unknown command");
            Err(CommandError::new(ErrorCode::Validation, "❌ Commande inconnue"))
        }
    };

    result.unwrap_or_else(|err| {
        if err.code != ErrorCode::Validation {
            error!(command = %invocation.name, code = ?err.code, "command failed");
        }
        Reply::from(err)
    })
}

pub async fn add_enterprise(
    ctx: &RosterContext,
    invocation: &CommandInvocation,
) -> Result<Reply, CommandError> {
    let enterprise = NewEnterprise::parse(
        invocation.option(OPTION_NAME).unwrap_or_default(),
        invocation.option(OPTION_MANAGER).unwrap_or_default(),
        invocation.option(OPTION_TYPE).unwrap_or_default(),
        invocation.option(OPTION_DESCRIPTION),
        invocation.option(OPTION_DISCORD),
    )?;

    let created = ctx
        .storage
        .create_enterprise(&enterprise)
        .await
        .map_err(storage_unavailable)?;
    info!(
        enterprise = %created.name,
        id = created.id.0,
        kind = %created.kind,
        invoked_by = ?invocation.invoked_by,
        "enterprise added"
    );

    resync(ctx).await;
    Ok(Reply::public(format!(
        "✅ Entreprise **{}** ajoutée",
        echoed_name(&created.name)
    )))
}

pub async fn remove_enterprise(
    ctx: &RosterContext,
    invocation: &CommandInvocation,
) -> Result<Reply, CommandError> {
    let name = invocation
        .option(OPTION_NAME)
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(CommandError::new(
            ErrorCode::Validation,
            "❌ Le nom de l'entreprise est obligatoire",
        ));
    }

    let removed = ctx
        .storage
        .delete_enterprises_by_name(name)
        .await
        .map_err(storage_unavailable)?;
    info!(
        enterprise = name,
        removed,
        invoked_by = ?invocation.invoked_by,
        "enterprise removed"
    );

    resync(ctx).await;
    Ok(Reply::public(format!(
        "🗑 Entreprise **{}** supprimée",
        echoed_name(name)
    )))
}

/// Does not touch the roster message.
pub async fn list_enterprises(ctx: &RosterContext) -> Result<Reply, CommandError> {
    let enterprises = ctx
        .storage
        .list_enterprises()
        .await
        .map_err(storage_unavailable)?;
    info!(count = enterprises.len(), "enterprises listed");
    Ok(Reply::public(render_list(&enterprises)))
}

/// Synchronization after a mutation is best-effort: the mutation already
/// happened and the command reports it either way.
async fn resync(ctx: &RosterContext) {
    match synchronize(ctx).await {
        Ok(SyncOutcome::Skipped) => {}
        Ok(outcome) => info!(?outcome, "roster synchronized"),
        Err(err) => error!(error = %err, "roster synchronization failed"),
    }
}

fn storage_unavailable(err: anyhow::Error) -> CommandError {
    error!(error = %format!("{err:#}"), "storage operation failed");
    CommandError::new(
        ErrorCode::StorageUnavailable,
        "❌ Erreur interne, réessayez plus tard",
    )
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
