//! The event router: what each inbound event does, and who hears about it.
//!
//! Every call to [`Router::route`] runs under one mutex that guards both
//! the connection registry and the room memberships, so joins, leaves and
//! recipient lookups never interleave. The router does no I/O of its own
//! apart from entity gateway calls; it hands back a list of [`Outbound`]
//! events with their recipients already resolved, and the caller fans
//! them out.

use tavern_entity::{EntityGateway, FieldChange};
use tavern_protocol::{
    ClientEvent, ControlKind, DiceKind, EntityRef, PlayerId, Role, RoomName,
    ServerEvent, StatKind, VoiceMode,
};
use tavern_room::MembershipManager;
use tavern_session::{Authenticator, ConnectionRegistry, Identity};
use tavern_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::TavernError;

/// Who generates dice results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiceAuthority {
    /// The relay rolls; any client-supplied result is ignored.
    #[default]
    Server,
    /// The relay trusts the client's result after a range check.
    Client,
}

/// Policy knobs for the router.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub dice_authority: DiceAuthority,
    /// Longest accepted chat message, in characters, after trimming.
    pub max_message_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            dice_authority: DiceAuthority::Server,
            max_message_len: 2000,
        }
    }
}

/// Registry and memberships, always locked together.
#[derive(Debug, Default)]
pub(crate) struct RelayState {
    registry: ConnectionRegistry,
    rooms: MembershipManager,
}

impl RelayState {
    /// Resolves a destination to concrete connections, in ascending order.
    fn recipients(
        &self,
        destination: Destination,
        sender: ConnectionId,
    ) -> Vec<ConnectionId> {
        match destination {
            Destination::Sender => vec![sender],
            Destination::Room(room) => {
                let mut members: Vec<_> =
                    self.rooms.members(room).into_iter().collect();
                members.sort();
                members
            }
            Destination::Everyone => self.registry.connection_ids(),
        }
    }
}

/// Where an outbound event is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Only the connection that sent the inbound event.
    Sender,
    /// Every member of a room.
    Room(RoomName),
    /// Every registered connection, joined or not.
    Everyone,
}

/// One event to deliver, with its recipients resolved at routing time.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub destination: Destination,
    pub recipients: Vec<ConnectionId>,
    pub event: ServerEvent,
}

impl Outbound {
    /// An event for the sender alone.
    pub fn to_sender(sender: ConnectionId, event: ServerEvent) -> Self {
        Self {
            destination: Destination::Sender,
            recipients: vec![sender],
            event,
        }
    }
}

type Reply = (Destination, ServerEvent);

/// Applies relay policy to inbound events.
pub struct Router<E: EntityGateway, A: Authenticator> {
    state: Mutex<RelayState>,
    gateway: E,
    auth: A,
    config: RelayConfig,
}

impl<E: EntityGateway, A: Authenticator> Router<E, A> {
    pub fn new(gateway: E, auth: A, config: RelayConfig) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            gateway,
            auth,
            config,
        }
    }

    pub fn gateway(&self) -> &E {
        &self.gateway
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Records a new live connection. It has no role until it joins.
    pub async fn connect(&self, conn_id: ConnectionId) {
        self.state.lock().await.registry.register(conn_id);
    }

    /// Forgets a connection: drops its identity and every room membership.
    ///
    /// Nobody is notified. Safe to call twice.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Option<Identity> {
        let mut state = self.state.lock().await;
        let left = state.rooms.leave_all(conn_id);
        let identity = state.registry.unregister(conn_id);
        tracing::info!(%conn_id, rooms = left.len(), "connection removed");
        identity
    }

    /// The identity a connection currently holds.
    pub async fn identity(&self, conn_id: ConnectionId) -> Option<Identity> {
        self.state.lock().await.registry.lookup(conn_id).cloned()
    }

    /// Members of a room, in ascending order.
    pub async fn members(&self, room: RoomName) -> Vec<ConnectionId> {
        let mut members: Vec<_> =
            self.state.lock().await.rooms.members(room).into_iter().collect();
        members.sort();
        members
    }

    /// The connection holding the host role, if any.
    pub async fn current_host(&self) -> Option<ConnectionId> {
        self.state.lock().await.registry.current_host()
    }

    /// The connection bound to a player id, if any.
    pub async fn player_connection(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.state.lock().await.registry.player_connection(player_id)
    }

    /// Handles one inbound event and returns what must be sent, and to whom.
    ///
    /// Never fails: invalid events produce an error event for the sender
    /// and nothing else.
    pub async fn route(
        &self,
        sender: ConnectionId,
        event: ClientEvent,
    ) -> Vec<Outbound> {
        let kind = event.kind();
        let mut state = self.state.lock().await;
        tracing::debug!(%sender, event = kind, "routing event");

        let who = state.registry.lookup(sender).cloned();
        let replies = match (event, who) {
            (
                ClientEvent::JoinGame {
                    role,
                    player_id,
                    name,
                    secret,
                },
                _,
            ) => {
                self.on_join(
                    &mut state,
                    sender,
                    role,
                    player_id,
                    name.as_deref(),
                    secret.as_deref(),
                )
                .await
            }
            (ClientEvent::GetConnectedClients, _) => vec![on_query(&state)],
            (_, None) => vec![(
                Destination::Sender,
                ServerEvent::error(403, format!("{kind} requires join_game first")),
            )],
            (
                ClientEvent::SendMessage {
                    message,
                    target_players,
                    voice_mode,
                },
                Some(who),
            ) => self.on_chat(&state, &who, &message, target_players, voice_mode),
            (
                ClientEvent::UpdatePlayerStats {
                    player_id,
                    stat_type,
                    current,
                    max,
                },
                Some(who),
            ) => {
                self.on_stats(&who, player_id, stat_type, current, max)
                    .await
            }
            (
                ClientEvent::DiceRollBroadcast {
                    dice_type,
                    result,
                    entity,
                },
                Some(who),
            ) => self.on_dice(&who, dice_type, result, entity).await,
            (
                ClientEvent::EnvironmentalUpdate {
                    control_type,
                    value,
                    display_value,
                },
                Some(who),
            ) => {
                self.on_environment(&state, &who, control_type, value, &display_value)
                    .await
            }
        };

        replies
            .into_iter()
            .map(|(destination, event)| Outbound {
                recipients: state.recipients(destination, sender),
                destination,
                event,
            })
            .collect()
    }

    async fn on_join(
        &self,
        state: &mut RelayState,
        sender: ConnectionId,
        role: Role,
        player_id: Option<PlayerId>,
        name: Option<&str>,
        secret: Option<&str>,
    ) -> Vec<Reply> {
        let identity = match Identity::from_join(role, player_id, name) {
            Ok(identity) => identity,
            Err(e) => return vec![failure(e.into())],
        };
        if identity.is_host() {
            if let Err(e) = self.auth.authorize_host(secret).await {
                tracing::info!(%sender, error = %e, "host join refused");
                return vec![failure(e.into())];
            }
        }

        // Leave whatever this connection joined before, then rebind.
        state.rooms.leave_all(sender);
        let displaced = match state.registry.set_identity(sender, identity.clone()) {
            Ok(displaced) => displaced,
            Err(e) => {
                tracing::debug!(%sender, error = %e, "join from unknown connection");
                return Vec::new();
            }
        };
        if let Some(stale) = displaced {
            let left = state.rooms.leave_all(stale);
            tracing::info!(%stale, rooms = left.len(), "displaced connection unjoined");
        }

        let rooms = RoomName::for_role(identity.role(), identity.player_id());
        for room in &rooms {
            state.rooms.join(*room, sender);
        }
        tracing::info!(
            %sender,
            role = %identity.role(),
            name = identity.display_name(),
            "joined game"
        );

        vec![(
            Destination::Sender,
            ServerEvent::JoinSuccess {
                role: identity.role(),
                player_id: identity.player_id(),
                rooms,
            },
        )]
    }

    fn on_chat(
        &self,
        state: &RelayState,
        who: &Identity,
        message: &str,
        mut targets: Vec<PlayerId>,
        voice_mode: VoiceMode,
    ) -> Vec<Reply> {
        let text = message.trim();
        if text.is_empty() {
            return vec![message_error(Destination::Sender, "message is empty")];
        }
        if text.chars().count() > self.config.max_message_len {
            return vec![message_error(
                Destination::Sender,
                &format!(
                    "message exceeds {} characters",
                    self.config.max_message_len
                ),
            )];
        }

        let new_message = ServerEvent::NewMessage {
            sender_role: who.role(),
            sender_name: who.display_name().to_owned(),
            sender_player_id: who.player_id(),
            message: text.to_owned(),
            message_type: voice_mode,
        };

        if !who.is_host() {
            if state.rooms.members(RoomName::Host).is_empty() {
                return vec![message_error(
                    Destination::Sender,
                    "the host is not connected",
                )];
            }
            return vec![(Destination::Room(RoomName::Host), new_message)];
        }

        if targets.is_empty() {
            return vec![message_error(
                Destination::Room(RoomName::Host),
                "no target players selected",
            )];
        }
        targets.sort();
        targets.dedup();

        // Only players with a live private room count as reached.
        let (targets, absent): (Vec<PlayerId>, Vec<PlayerId>) =
            targets.into_iter().partition(|id| {
                !state.rooms.members(RoomName::Player(*id)).is_empty()
            });
        if !absent.is_empty() {
            tracing::debug!(?absent, "chat targets not connected");
        }
        if targets.is_empty() {
            return vec![message_error(
                Destination::Room(RoomName::Host),
                "none of the selected players are connected",
            )];
        }

        let mut replies: Vec<Reply> = targets
            .iter()
            .map(|id| {
                (
                    Destination::Room(RoomName::Player(*id)),
                    new_message.clone(),
                )
            })
            .collect();
        replies.push((
            Destination::Room(RoomName::Host),
            ServerEvent::MessageSent {
                target_count: targets.len(),
                target_players: targets,
                message: text.to_owned(),
            },
        ));
        replies
    }

    async fn on_stats(
        &self,
        who: &Identity,
        player_id: PlayerId,
        stat_type: StatKind,
        current: f64,
        max: f64,
    ) -> Vec<Reply> {
        if !who.is_host() {
            return vec![forbidden(who, "only the host can update stats")];
        }

        let change = FieldChange::Vital {
            stat: stat_type,
            current,
            max,
        };
        if let Err(e) = self
            .gateway
            .apply_update(EntityRef::player(player_id), &[change])
            .await
        {
            tracing::debug!(%player_id, error = %e, "stat update rejected");
            return vec![failure(e.into())];
        }

        vec![
            (
                Destination::Room(RoomName::Host),
                ServerEvent::PlayerStatsUpdated {
                    player_id,
                    stat_type,
                    current,
                    max,
                },
            ),
            (
                Destination::Room(RoomName::Player(player_id)),
                ServerEvent::StatsUpdated {
                    player_id,
                    stat_type,
                    current,
                    max,
                },
            ),
        ]
    }

    async fn on_dice(
        &self,
        who: &Identity,
        dice_type: DiceKind,
        result: Option<u32>,
        entity: Option<EntityRef>,
    ) -> Vec<Reply> {
        let value = match (self.config.dice_authority, result) {
            (DiceAuthority::Server, _) => roll(dice_type),
            (DiceAuthority::Client, Some(v)) if dice_type.admits(v) => v,
            (DiceAuthority::Client, Some(v)) => {
                return vec![bad_request(&format!(
                    "{v} is not a face of a {dice_type}"
                ))];
            }
            (DiceAuthority::Client, None) => {
                return vec![bad_request("dice result is required")];
            }
        };

        // Players always roll for their own character.
        let entity = match who.player_id() {
            Some(id) => Some(EntityRef::player(id)),
            None => entity,
        };
        if let Some(target) = entity {
            let change = FieldChange::LastRoll {
                dice: dice_type,
                value,
            };
            if let Err(e) = self.gateway.apply_update(target, &[change]).await {
                tracing::debug!(entity = %target, error = %e, "roll not recorded");
                return vec![failure(e.into())];
            }
        }

        vec![(
            Destination::Everyone,
            ServerEvent::DiceRollResult {
                roller_role: who.role(),
                roller_name: who.display_name().to_owned(),
                player_id: who.player_id(),
                entity,
                dice_type,
                result: value,
            },
        )]
    }

    async fn on_environment(
        &self,
        state: &RelayState,
        who: &Identity,
        control_type: ControlKind,
        value: u8,
        display_value: &str,
    ) -> Vec<Reply> {
        if !who.is_host() {
            return vec![forbidden(who, "only the host can change the environment")];
        }
        let Some(label) = control_type.label(value) else {
            return vec![bad_request(&format!(
                "{value} is outside the {control_type:?} scale"
            ))];
        };

        // Conditions follow the scale label, whatever the host displays.
        let change = FieldChange::Condition {
            control: control_type,
            label: label.to_owned(),
        };
        for player_id in state.registry.player_ids() {
            let target = EntityRef::player(player_id);
            if let Err(e) = self
                .gateway
                .apply_update(target, std::slice::from_ref(&change))
                .await
            {
                tracing::debug!(entity = %target, error = %e, "condition not recorded");
            }
        }

        let display_value = match display_value.trim() {
            "" => label.to_owned(),
            given => given.to_owned(),
        };

        vec![(
            Destination::Room(RoomName::AllPlayers),
            ServerEvent::EnvironmentalChange {
                control_type,
                value,
                display_value,
            },
        )]
    }
}

fn on_query(state: &RelayState) -> Reply {
    let connected_players = state.registry.player_ids();
    (
        Destination::Sender,
        ServerEvent::ConnectedClientsUpdate {
            host_connected: state.registry.current_host().is_some(),
            total_players: connected_players.len(),
            connected_players,
        },
    )
}

/// Uniform roll over the faces of `dice`.
fn roll(dice: DiceKind) -> u32 {
    use rand::Rng;
    rand::rng().random_range(1..=dice.sides())
}

fn failure(err: TavernError) -> Reply {
    (
        Destination::Sender,
        ServerEvent::error(err.code(), err.to_string()),
    )
}

fn bad_request(message: &str) -> Reply {
    (Destination::Sender, ServerEvent::error(400, message))
}

fn forbidden(who: &Identity, message: &str) -> Reply {
    (
        Destination::Sender,
        ServerEvent::error(403, format!("{message} (sender is {})", who.role())),
    )
}

fn message_error(destination: Destination, error: &str) -> Reply {
    (
        destination,
        ServerEvent::MessageError {
            error: error.to_owned(),
        },
    )
}

// =========================================================================
// Tests
// =========================================================================
