//! Minimal Discord client: REST calls for commands, interaction replies and
//! the roster message, plus a gateway connection delivering READY and
//! INTERACTION_CREATE.

pub mod gateway;
pub mod model;
pub mod rest;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use gateway::{decode_dispatch, GatewayClient, GatewayEvent, DEFAULT_GATEWAY_URL, GUILDS_INTENT};
pub use model::{Interaction, Ready, User};
pub use rest::{DiscordHttp, DEFAULT_API_BASE_URL};
