//! Dispatches connections to rooms by name, creating a room the first time
//! its name is seen. This is a deliberately thin stand-in for the matchmaking
//! and persistence layer a real deployment would have in front of it — it
//! owns nothing beyond the name-to-handle map itself.

use crate::{
    actor::{self, Handle},
    config::RoomConfig,
    room::{self, RoomHandle},
};
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::*;

pub enum RegistryCommand {
    JoinRoom {
        name: String,
        reply: oneshot::Sender<RoomHandle>,
    },
}

pub type RegistryHandle = Handle<RegistryCommand>;

struct Registry {
    config: RoomConfig,
    rooms: HashMap<String, RoomHandle>,
}

/// Spawns the registry actor.
pub fn spawn(config: RoomConfig) -> RegistryHandle {
    let state = Registry {
        config,
        rooms: HashMap::new(),
    };
    actor::spawn(state, |registry, command| Box::pin(handle_command(registry, command)))
}

async fn handle_command(registry: &mut Registry, command: RegistryCommand) {
    match command {
        RegistryCommand::JoinRoom { name, reply } => {
            let handle = registry.rooms.entry(name.clone()).or_insert_with(|| {
                info!(room = %name, "creating new room");
                room::spawn(registry.config)
            });

            if reply.send(handle.clone()).is_err() {
                debug!(room = %name, "join requester went away before the room handle was delivered");
            }
        }
    }
}

/// Asks the registry for (creating if necessary) the room named `name`.
pub async fn join_room(registry: &RegistryHandle, name: &str) -> Option<RoomHandle> {
    let name = name.to_owned();
    actor::ask(registry, |reply| RegistryCommand::JoinRoom { name, reply }).await
}
