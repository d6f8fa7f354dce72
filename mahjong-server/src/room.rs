//! The room state machine: the single logical thread of execution that owns
//! one match end to end. Every inbound client message, timer expiration, and
//! connection lifecycle event is funneled through this actor's inbox and
//! handled one at a time, so state mutation never needs a lock.

use crate::{
    actor::{self, Handle},
    config::RoomConfig,
    connection::{ClientCommand, ClientHandle},
};
use mahjong_core::{
    analysis::{self, ChiOption, SelfKongOption},
    bot,
    messages::{
        ActionType, ChiOptionWire, ClientMessage, ClientRoom, LobbySeat, PaymentResultWire,
        ServerMessage, TaiResultWire, TurnPhase,
    },
    moves,
    scoring,
    state::{ConnectionStatus, GameState, Phase, Player},
    tile::{TileDef, TileId, TileInstance, Wind},
    view,
    wall::Wall,
};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;
use tracing::*;

pub enum RoomCommand {
    Join {
        name: String,
        avatar: String,
        reconnect_token: Option<String>,
        client: ClientHandle,
        reply: oneshot::Sender<Result<usize, String>>,
    },
    Incoming {
        seat: usize,
        message: ClientMessage,
    },
    Disconnected {
        seat: usize,
    },
    ClaimTimeout {
        generation: u64,
    },
    BotTurn {
        generation: u64,
    },
    DisconnectGraceExpired {
        seat: usize,
        generation: u64,
    },
}

pub type RoomHandle = Handle<RoomCommand>;

/// A claim response a seat can make during a claim window, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimResponse {
    Win,
    Kong,
    Pong,
    Chi(usize),
    Pass,
}

struct ClaimWindow {
    /// The discarder for an ordinary discard window; the kong owner whose
    /// promotion is being offered for robbing when `kong_rob` is set.
    discarder: usize,
    discard: TileInstance,
    chi_options: HashMap<usize, Vec<ChiOption>>,
    legal: HashMap<usize, LegalClaims>,
    responses: HashMap<usize, ClaimResponse>,
    pending_humans: HashSet<usize>,
    generation: u64,
    /// Set for a win-only window opened by a promoted self-kong (robbing
    /// the kong). Holds the self-kong to apply if nobody robs it.
    kong_rob: Option<SelfKongOption>,
}

#[derive(Default, Clone, Copy)]
struct LegalClaims {
    win: bool,
    kong: bool,
    pong: bool,
}

enum RoomPhase {
    Lobby,
    Playing,
    ClaimWindow(ClaimWindow),
    EndOfRound,
}

#[derive(Default)]
struct RoundResult {
    winner: Option<usize>,
    self_draw: bool,
    shooter: Option<usize>,
}

struct Seat {
    occupied: bool,
    client: Option<ClientHandle>,
    name: String,
    avatar: String,
    is_ready: bool,
    reconnect_token: Option<String>,
    permanently_bot: bool,
}

impl Seat {
    fn empty() -> Self {
        Self {
            occupied: false,
            client: None,
            name: String::new(),
            avatar: String::new(),
            is_ready: false,
            reconnect_token: None,
            permanently_bot: false,
        }
    }

    /// This seat needs the server to act on its behalf right now: either it
    /// has been handed permanently to the bot policy, or a human is
    /// currently disconnected.
    fn needs_automation(&self) -> bool {
        self.permanently_bot || self.client.is_none()
    }
}

struct Room {
    config: RoomConfig,
    rng: Pcg64Mcg,
    seats: [Seat; 4],
    host: Option<usize>,
    phase: RoomPhase,
    game: Option<GameState>,
    round_result: RoundResult,
    claim_generation: u64,
    bot_generation: u64,
    disconnect_generation: [u64; 4],
    token_counter: u64,
    /// A handle to this room's own inbox, so scheduled timers (claim
    /// windows, bot pacing, disconnect grace) can message the room without
    /// the room needing to thread a handle through every call.
    self_handle: RoomHandle,
}

pub fn spawn(config: RoomConfig) -> RoomHandle {
    let (self_handle, receiver) = actor::channel::<RoomCommand>();
    let state = Room {
        rng: Pcg64Mcg::from_entropy(),
        config,
        seats: std::array::from_fn(|_| Seat::empty()),
        host: None,
        phase: RoomPhase::Lobby,
        game: None,
        round_result: RoundResult::default(),
        claim_generation: 0,
        bot_generation: 0,
        disconnect_generation: [0; 4],
        token_counter: 0,
        self_handle: self_handle.clone(),
    };
    actor::run(state, receiver, |room, command| Box::pin(handle_command(room, command)));
    self_handle
}

/// Asks a room to seat a newly connected client, returning the seat index.
pub async fn join(
    room: &RoomHandle,
    name: String,
    avatar: String,
    reconnect_token: Option<String>,
    client: ClientHandle,
) -> Option<Result<usize, String>> {
    actor::ask(room, |reply| RoomCommand::Join {
        name,
        avatar,
        reconnect_token,
        client,
        reply,
    })
    .await
}

async fn handle_command(room: &mut Room, command: RoomCommand) {
    match command {
        RoomCommand::Join {
            name,
            avatar,
            reconnect_token,
            client,
            reply,
        } => {
            let outcome = handle_join(room, name, avatar, reconnect_token, client);
            let _ = reply.send(outcome);
        }
        RoomCommand::Incoming { seat, message } => handle_incoming(room, seat, message),
        RoomCommand::Disconnected { seat } => handle_disconnected(room, seat),
        RoomCommand::ClaimTimeout { generation } => {
            if let RoomPhase::ClaimWindow(window) = &room.phase {
                if window.generation == generation {
                    resolve_claim_window(room);
                }
            }
        }
        RoomCommand::BotTurn { generation } => {
            if matches!(room.phase, RoomPhase::Playing) && room.bot_generation == generation {
                if let Some(game) = &room.game {
                    let seat = game.current_player;
                    run_bot_turn(room, seat);
                }
            }
        }
        RoomCommand::DisconnectGraceExpired { seat, generation } => {
            if room.disconnect_generation[seat] == generation && room.seats[seat].client.is_none()
            {
                info!(seat, "disconnect grace expired, seat permanently bot-owned");
                room.seats[seat].permanently_bot = true;
                if let Some(game) = &mut room.game {
                    game.players[seat].connection = ConnectionStatus::Bot;
                }
            }
        }
    }
}

fn handle_join(
    room: &mut Room,
    name: String,
    avatar: String,
    reconnect_token: Option<String>,
    client: ClientHandle,
) -> Result<usize, String> {
    if let Some(token) = &reconnect_token {
        if let Some(seat) = room
            .seats
            .iter()
            .position(|s| s.reconnect_token.as_deref() == Some(token.as_str()))
        {
            info!(seat, "client reconnected");
            room.seats[seat].client = Some(client.clone());
            room.seats[seat].permanently_bot = false;
            room.disconnect_generation[seat] += 1;
            if let Some(game) = &mut room.game {
                game.players[seat].connection = ConnectionStatus::HumanConnected;
            }
            broadcast_server_message(room, ServerMessage::PlayerReconnected { player_index: seat });
            send_full_state_to(room, seat);
            return Ok(seat);
        }
    }

    if !matches!(room.phase, RoomPhase::Lobby) {
        return Err("room has already started".to_string());
    }

    let seat = match room.seats.iter().position(|s| !s.occupied) {
        Some(seat) => seat,
        None => return Err("room is full".to_string()),
    };

    room.token_counter += 1;
    let token = format!("room-token-{}", room.token_counter);

    room.seats[seat] = Seat {
        occupied: true,
        client: Some(client.clone()),
        name,
        avatar,
        is_ready: false,
        reconnect_token: Some(token),
        permanently_bot: false,
    };
    if room.host.is_none() {
        room.host = Some(seat);
    }

    broadcast_lobby_state(room);
    Ok(seat)
}

fn handle_incoming(room: &mut Room, seat: usize, message: ClientMessage) {
    match message {
        ClientMessage::Ready { is_ready } => {
            if matches!(room.phase, RoomPhase::Lobby) && room.seats[seat].occupied {
                room.seats[seat].is_ready = is_ready;
                broadcast_lobby_state(room);
            }
        }
        ClientMessage::StartGame => {
            if matches!(room.phase, RoomPhase::Lobby) && room.host == Some(seat) {
                start_game(room);
            }
        }
        ClientMessage::Action {
            action,
            tile_id,
            chi_index,
        } => handle_action(room, seat, action, tile_id, chi_index),
        ClientMessage::NextRound => {
            if matches!(room.phase, RoomPhase::EndOfRound) {
                start_next_round(room);
            }
        }
        ClientMessage::Leave => handle_disconnected(room, seat),
    }
}

fn start_game(room: &mut Room) {
    for seat in room.seats.iter_mut() {
        if !seat.occupied {
            seat.occupied = true;
            seat.permanently_bot = true;
            seat.name = "Bot".to_string();
            seat.avatar = "\u{1F916}".to_string();
            seat.is_ready = true;
        }
    }

    let winds = [Wind::East, Wind::South, Wind::West, Wind::North];
    let players: [Player; 4] = std::array::from_fn(|i| {
        let seat = &room.seats[i];
        let mut player = Player::new(seat.name.clone(), seat.avatar.clone(), winds[i]);
        if seat.permanently_bot {
            player.connection = ConnectionStatus::Bot;
        }
        player
    });

    let mut game = GameState {
        players,
        wall: Wall::shuffled(&mut room.rng),
        current_player: 0,
        round_wind: Wind::East,
        round_number: 1,
        turn_counter: 0,
        last_discard: None,
        last_discarder: None,
        phase: Phase::Waiting,
    };
    if moves::deal_round(&mut game).is_err() {
        error!("failed to deal opening round");
        return;
    }
    room.game = Some(game);
    room.phase = RoomPhase::Playing;

    broadcast_server_message_with(room, |seat| ServerMessage::GameStart {
        state: view::project_for_seat(room.game.as_ref().unwrap(), seat),
    });

    begin_turn(room);
}

/// Starts the current player's turn: notifies a human, or schedules the bot
/// policy to run the whole turn after the pacing delay.
fn begin_turn(room: &mut Room) {
    let Some(game) = &room.game else { return };
    if game.phase != Phase::Playing {
        end_round(room);
        return;
    }
    let seat = game.current_player;

    if room.seats[seat].needs_automation() {
        schedule_bot_turn(room);
    } else {
        send_to(
            room,
            seat,
            ServerMessage::YourTurn {
                phase: TurnPhase::HumanNeedsDraw,
                available_actions: vec![ActionType::Draw],
            },
        );
    }
}

fn schedule_bot_turn(room: &mut Room) {
    room.bot_generation += 1;
    let generation = room.bot_generation;
    let handle = room.self_handle.clone();
    let delay = room.config.bot_think_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = handle.tell(RoomCommand::BotTurn { generation });
    });
}

/// Runs a bot's entire turn synchronously: draw, optional self-kong/win
/// decision, then discard.
fn run_bot_turn(room: &mut Room, seat: usize) {
    let Some(drawn) = draw_for_seat(room, seat) else {
        return;
    };
    let _ = drawn;

    loop {
        let Some(game) = &room.game else { return };
        if game.phase != Phase::Playing {
            end_round(room);
            return;
        }

        let hand_wins = analysis::check_win(&game.players[seat].hand, &game.players[seat].melds);
        if hand_wins {
            declare_win(room, seat, true, None);
            return;
        }

        let self_kong_options = analysis::can_self_kong(&game.players[seat].hand, &game.players[seat].melds);
        let Some(choice) = bot::choose_self_kong(&self_kong_options) else {
            break;
        };
        match choice {
            SelfKongOption::Promote { tile, .. } => {
                open_kong_rob_window(room, seat, choice, tile);
                return;
            }
            SelfKongOption::Concealed { .. } => {
                if perform_self_kong(room, seat, choice).is_none() {
                    return;
                }
            }
        }
    }

    let Some(game) = &room.game else { return };
    let tile_id = bot::choose_discard(&game.players[seat].hand);
    apply_discard(room, seat, tile_id);
}

/// Draws for `seat`, broadcasting the updated state. Returns `None` (and
/// ends the round) if the wall was exhausted.
fn draw_for_seat(room: &mut Room, seat: usize) -> Option<TileId> {
    let game = room.game.as_mut()?;
    match moves::draw(game, seat) {
        Ok(Some(tile_id)) => {
            broadcast_game_state(room);
            Some(tile_id)
        }
        Ok(None) => {
            end_round(room);
            None
        }
        Err(err) => {
            warn!(%err, seat, "rejected draw");
            None
        }
    }
}

fn perform_self_kong(room: &mut Room, seat: usize, option: SelfKongOption) -> Option<TileId> {
    let game = room.game.as_mut()?;
    match moves::self_kong(game, seat, option) {
        Ok(Some(tile_id)) => {
            broadcast_game_state(room);
            Some(tile_id)
        }
        Ok(None) => {
            end_round(room);
            None
        }
        Err(err) => {
            warn!(%err, seat, "rejected self-kong");
            None
        }
    }
}

fn apply_discard(room: &mut Room, seat: usize, tile_id: TileId) {
    let Some(game) = room.game.as_mut() else { return };
    if let Err(err) = moves::discard(game, seat, tile_id) {
        warn!(%err, seat, "rejected discard");
        return;
    }
    broadcast_game_state(room);
    open_claim_window(room, seat);
}

/// Computes legal claims for every other seat and opens the window,
/// auto-resolving bots and no-claim seats immediately.
fn open_claim_window(room: &mut Room, discarder: usize) {
    let Some(game) = &room.game else { return };
    let discard = match game.last_discard {
        Some(discard) => discard,
        None => return,
    };

    let mut chi_options = HashMap::new();
    let mut legal = HashMap::new();
    let mut responses = HashMap::new();
    let mut pending_humans = HashSet::new();

    for seat in 0..4 {
        if seat == discarder {
            continue;
        }
        let player = &game.players[seat];
        let win = analysis::check_win_with_tile(&player.hand, &player.melds, discard);
        let kong = analysis::can_kong(&player.hand, discard.def).is_some();
        let pong = analysis::can_pong(&player.hand, discard.def).is_some();
        let options = analysis::can_all_chi(&player.hand, discard.def, seat, discarder);

        if !options.is_empty() {
            chi_options.insert(seat, options);
        }
        legal.insert(seat, LegalClaims { win, kong, pong });

        let has_any_claim = win || kong || pong || chi_options.contains_key(&seat);
        if !has_any_claim || room.seats[seat].needs_automation() {
            let response = if has_any_claim {
                let available = bot::AvailableClaims {
                    win,
                    kong,
                    pong,
                    chi: chi_options.get(&seat).map(|v| v.as_slice()).unwrap_or(&[]),
                };
                let mut rng = room.rng.clone();
                let choice = bot::decide_claim(&available, player.seat_wind, discard.def, &mut rng);
                room.rng = rng;
                match choice {
                    bot::ClaimChoice::Win => ClaimResponse::Win,
                    bot::ClaimChoice::Kong => ClaimResponse::Kong,
                    bot::ClaimChoice::Pong => ClaimResponse::Pong,
                    bot::ClaimChoice::Chi(index) => ClaimResponse::Chi(index),
                    bot::ClaimChoice::Pass => ClaimResponse::Pass,
                }
            } else {
                ClaimResponse::Pass
            };
            responses.insert(seat, response);
        } else {
            pending_humans.insert(seat);
        }
    }

    room.claim_generation += 1;
    let generation = room.claim_generation;

    for &seat in &pending_humans {
        let mut available_actions = vec![ActionType::Pass];
        let seat_legal = legal[&seat];
        if seat_legal.win {
            available_actions.push(ActionType::Win);
        }
        if seat_legal.kong {
            available_actions.push(ActionType::Kong);
        }
        if seat_legal.pong {
            available_actions.push(ActionType::Pong);
        }
        if let Some(options) = chi_options.get(&seat) {
            if !options.is_empty() {
                available_actions.push(ActionType::Chi);
                send_to(
                    room,
                    seat,
                    ServerMessage::ChiOptions {
                        options: options.iter().copied().map(ChiOptionWire::from).collect(),
                    },
                );
            }
        }
        send_to(
            room,
            seat,
            ServerMessage::ClaimWindow {
                timeout_ms: room.config.claim_window_timeout.as_millis() as u64,
                available_actions,
            },
        );
    }

    room.phase = RoomPhase::ClaimWindow(ClaimWindow {
        discarder,
        discard,
        chi_options,
        legal,
        responses,
        pending_humans: pending_humans.clone(),
        generation,
        kong_rob: None,
    });

    if pending_humans.is_empty() {
        resolve_claim_window(room);
        return;
    }

    let handle = room.self_handle.clone();
    let delay = room.config.claim_window_timeout;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = handle.tell(RoomCommand::ClaimTimeout { generation });
    });
}

/// Opens a win-only claim window for a promoted self-kong: the tile being
/// added to the pong is offered to every other seat exactly as a discard
/// would be, but only a win can claim it. If nobody robs it, `option`
/// completes as an ordinary self-kong.
fn open_kong_rob_window(room: &mut Room, owner: usize, option: SelfKongOption, tile: TileInstance) {
    let Some(game) = &room.game else { return };

    let mut legal = HashMap::new();
    let mut responses = HashMap::new();
    let mut pending_humans = HashSet::new();

    for seat in 0..4 {
        if seat == owner {
            continue;
        }
        let player = &game.players[seat];
        let win = analysis::check_win_with_tile(&player.hand, &player.melds, tile);
        legal.insert(seat, LegalClaims { win, kong: false, pong: false });

        if !win || room.seats[seat].needs_automation() {
            // Bot policy always wins when winnable; otherwise there's
            // nothing this seat can do but pass.
            let response = if win { ClaimResponse::Win } else { ClaimResponse::Pass };
            responses.insert(seat, response);
        } else {
            pending_humans.insert(seat);
        }
    }

    room.claim_generation += 1;
    let generation = room.claim_generation;

    for &seat in &pending_humans {
        send_to(
            room,
            seat,
            ServerMessage::ClaimWindow {
                timeout_ms: room.config.claim_window_timeout.as_millis() as u64,
                available_actions: vec![ActionType::Win, ActionType::Pass],
            },
        );
    }

    room.phase = RoomPhase::ClaimWindow(ClaimWindow {
        discarder: owner,
        discard: tile,
        chi_options: HashMap::new(),
        legal,
        responses,
        pending_humans: pending_humans.clone(),
        generation,
        kong_rob: Some(option),
    });

    if pending_humans.is_empty() {
        resolve_claim_window(room);
        return;
    }

    let handle = room.self_handle.clone();
    let delay = room.config.claim_window_timeout;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = handle.tell(RoomCommand::ClaimTimeout { generation });
    });
}

fn handle_action(
    room: &mut Room,
    seat: usize,
    action: ActionType,
    tile_id: Option<TileId>,
    chi_index: Option<usize>,
) {
    match &room.phase {
        RoomPhase::Playing => handle_playing_action(room, seat, action, tile_id),
        RoomPhase::ClaimWindow(_) => handle_claim_action(room, seat, action, chi_index),
        _ => {}
    }
}

fn handle_playing_action(room: &mut Room, seat: usize, action: ActionType, tile_id: Option<TileId>) {
    let Some(game) = &room.game else { return };
    if seat != game.current_player {
        send_to(room, seat, ServerMessage::Error { message: "not your turn".into() });
        return;
    }

    match action {
        ActionType::Draw => {
            let expects_draw = game.players[seat].hand.len() == game.players[seat].expected_hand_size(false);
            if !expects_draw {
                return;
            }
            if draw_for_seat(room, seat).is_some() {
                offer_post_draw_decision(room, seat);
            }
        }
        ActionType::Win => {
            let wins = analysis::check_win(&game.players[seat].hand, &game.players[seat].melds);
            if wins {
                declare_win(room, seat, true, None);
            } else {
                send_to(room, seat, ServerMessage::Error { message: "hand is not complete".into() });
            }
        }
        ActionType::Kong => {
            let options = analysis::can_self_kong(&game.players[seat].hand, &game.players[seat].melds);
            let chosen = tile_id.and_then(|id| {
                options.into_iter().find(|option| match option {
                    SelfKongOption::Concealed { tiles } => tiles.iter().any(|t| t.id == id),
                    SelfKongOption::Promote { tile, .. } => tile.id == id,
                })
            });
            match chosen {
                Some(option @ SelfKongOption::Promote { tile, .. }) => {
                    open_kong_rob_window(room, seat, option, tile);
                }
                Some(option @ SelfKongOption::Concealed { .. }) => {
                    if perform_self_kong(room, seat, option).is_some() {
                        offer_post_draw_decision(room, seat);
                    }
                }
                None => send_to(room, seat, ServerMessage::Error { message: "no such self-kong is legal".into() }),
            }
        }
        ActionType::Discard => match tile_id {
            Some(tile_id) => apply_discard(room, seat, tile_id),
            None => send_to(room, seat, ServerMessage::Error { message: "discard requires a tile id".into() }),
        },
        _ => {}
    }
}

/// After a draw or self-kong, re-sends `your-turn` with whatever the player
/// may now do: discard, or declare win if the new tile completes the hand.
fn offer_post_draw_decision(room: &mut Room, seat: usize) {
    let Some(game) = &room.game else { return };
    if game.phase != Phase::Playing {
        end_round(room);
        return;
    }
    if room.seats[seat].needs_automation() {
        run_bot_turn(room, seat);
        return;
    }

    let wins = analysis::check_win(&game.players[seat].hand, &game.players[seat].melds);
    let mut available_actions = vec![ActionType::Discard];
    if wins {
        available_actions.push(ActionType::Win);
    }
    if !analysis::can_self_kong(&game.players[seat].hand, &game.players[seat].melds).is_empty() {
        available_actions.push(ActionType::Kong);
    }

    send_to(
        room,
        seat,
        ServerMessage::YourTurn {
            phase: TurnPhase::HumanNeedsDiscard,
            available_actions,
        },
    );
}

fn handle_claim_action(room: &mut Room, seat: usize, action: ActionType, chi_index: Option<usize>) {
    let RoomPhase::ClaimWindow(window) = &mut room.phase else { return };
    if !window.pending_humans.contains(&seat) {
        return;
    }

    let legal = window.legal.get(&seat).copied().unwrap_or_default();
    let response = match action {
        ActionType::Win if legal.win => ClaimResponse::Win,
        ActionType::Kong if legal.kong => ClaimResponse::Kong,
        ActionType::Pong if legal.pong => ClaimResponse::Pong,
        ActionType::Chi => match chi_index {
            Some(index) if window.chi_options.get(&seat).map(|o| index < o.len()).unwrap_or(false) => {
                ClaimResponse::Chi(index)
            }
            _ => {
                send_to(room, seat, ServerMessage::Error { message: "invalid chi selection".into() });
                return;
            }
        },
        ActionType::Pass => ClaimResponse::Pass,
        _ => {
            send_to(room, seat, ServerMessage::Error { message: "that claim is not legal".into() });
            return;
        }
    };

    let RoomPhase::ClaimWindow(window) = &mut room.phase else { return };
    window.responses.insert(seat, response);
    window.pending_humans.remove(&seat);

    if window.pending_humans.is_empty() {
        resolve_claim_window(room);
    }
}

/// Resolves the open claim window by priority: win (closest to discarder
/// first), then kong, then pong, then chi. Any seat that never responded is
/// treated as a pass.
fn resolve_claim_window(room: &mut Room) {
    let RoomPhase::ClaimWindow(window) = std::mem::replace(&mut room.phase, RoomPhase::Playing) else {
        return;
    };

    let discarder = window.discarder;
    let discard = window.discard;
    let kong_rob = window.kong_rob;
    let responses = window.responses;
    let chi_options = window.chi_options;

    let turn_order_distance = |seat: usize| (seat + 4 - discarder) % 4;
    let mut win_candidates: Vec<usize> = responses
        .iter()
        .filter(|(_, r)| matches!(r, ClaimResponse::Win))
        .map(|(&seat, _)| seat)
        .collect();
    win_candidates.sort_by_key(|&seat| turn_order_distance(seat));

    for seat in win_candidates {
        let Some(game) = &room.game else { return };
        if analysis::check_win_with_tile(&game.players[seat].hand, &game.players[seat].melds, discard) {
            if kong_rob.is_some() {
                declare_kong_rob_win(room, seat, discarder, discard);
            } else {
                declare_win(room, seat, false, Some(discarder));
            }
            return;
        }
        send_to(room, seat, ServerMessage::Error { message: "win no longer valid".into() });
    }

    if let Some(option) = kong_rob {
        // Nobody robbed the kong: the promotion it was offering completes.
        if perform_self_kong(room, discarder, option).is_some() {
            offer_post_draw_decision(room, discarder);
        }
        return;
    }

    if let Some((&seat, _)) = responses.iter().find(|(_, r)| matches!(r, ClaimResponse::Kong)) {
        let Some(game) = room.game.as_mut() else { return };
        if let Some(held) = analysis::can_kong(&game.players[seat].hand, discard.def) {
            match moves::claim_kong(game, seat, held) {
                Ok(Some(_)) => {
                    broadcast_game_state(room);
                    offer_post_draw_decision(room, seat);
                    return;
                }
                Ok(None) => {
                    end_round(room);
                    return;
                }
                Err(err) => warn!(%err, seat, "rejected kong claim"),
            }
        }
    }

    if let Some((&seat, _)) = responses.iter().find(|(_, r)| matches!(r, ClaimResponse::Pong)) {
        let Some(game) = room.game.as_mut() else { return };
        if let Some(held) = analysis::can_pong(&game.players[seat].hand, discard.def) {
            if moves::claim_pong(game, seat, held).is_ok() {
                broadcast_game_state(room);
                begin_discard_phase(room, seat);
                return;
            }
        }
    }

    if let Some((&seat, response)) = responses.iter().find(|(_, r)| matches!(r, ClaimResponse::Chi(_))) {
        if let ClaimResponse::Chi(index) = response {
            if let Some(option) = chi_options.get(&seat).and_then(|opts| opts.get(*index)).copied() {
                let Some(game) = room.game.as_mut() else { return };
                if moves::claim_chi(game, seat, option).is_ok() {
                    broadcast_game_state(room);
                    begin_discard_phase(room, seat);
                    return;
                }
            }
        }
    }

    // Everyone passed (or every claim failed validation): advance normally.
    let Some(game) = room.game.as_mut() else { return };
    game.advance_turn();
    room.phase = RoomPhase::Playing;
    begin_turn(room);
}

/// After a claimed pong/chi, the claimer must discard next; if they're a
/// bot, run that discard immediately instead of waiting on a draw.
fn begin_discard_phase(room: &mut Room, seat: usize) {
    room.phase = RoomPhase::Playing;
    if room.seats[seat].needs_automation() {
        let Some(game) = &room.game else { return };
        let tile_id = bot::choose_discard(&game.players[seat].hand);
        apply_discard(room, seat, tile_id);
    } else {
        offer_post_draw_decision(room, seat);
    }
}

/// Ends the round with `winner` as the winner. For a self-draw the winning
/// tile is already in `winner.hand`; for a claimed discard it is pulled out
/// of the discarder's pile first so the scorer sees a complete hand.
fn declare_win(room: &mut Room, winner: usize, self_draw: bool, shooter: Option<usize>) {
    let Some(game) = room.game.as_mut() else { return };
    let result = if self_draw {
        moves::declare_win(game, winner)
    } else {
        moves::claim_win(game, winner)
    };
    if let Err(err) = result {
        warn!(%err, winner, "failed to declare win");
        return;
    }
    room.round_result = RoundResult {
        winner: Some(winner),
        self_draw,
        shooter,
    };
    end_round(room);
}

/// Ends the round with `winner` robbing `kong_owner`'s promoted kong: the
/// tile is pulled out of the owner's hand (it never joins the kong meld)
/// and into the winner's hand before scoring.
fn declare_kong_rob_win(room: &mut Room, winner: usize, kong_owner: usize, tile: TileInstance) {
    let Some(game) = room.game.as_mut() else { return };
    if let Err(err) = moves::rob_kong(game, kong_owner, winner, tile) {
        warn!(%err, winner, "failed to rob kong");
        return;
    }
    room.round_result = RoundResult {
        winner: Some(winner),
        self_draw: false,
        shooter: Some(kong_owner),
    };
    end_round(room);
}

fn end_round(room: &mut Room) {
    room.phase = RoomPhase::EndOfRound;
    let Some(game) = &room.game else { return };

    let (winner_index, tai_result, payment_result) = match room.round_result.winner {
        Some(winner) => {
            let tai = scoring::calculate_tai(&game.players[winner], room.round_result.self_draw, game.round_wind);
            let payments = scoring::calculate_payments(
                winner,
                room.round_result.self_draw,
                room.round_result.shooter,
                tai.base_points,
            );
            (Some(winner), Some(tai), Some(payments))
        }
        None => (None, None, None),
    };

    if let Some(payments) = &payment_result {
        let Some(game) = room.game.as_mut() else { return };
        for (seat, delta) in payments.payments.iter().enumerate() {
            game.players[seat].score += delta;
        }
    }

    let message = match winner_index {
        Some(_) if room.round_result.self_draw => "Self-drawn win".to_string(),
        Some(_) => "Win by discard".to_string(),
        None => "Wall exhausted, round drawn".to_string(),
    };

    broadcast_server_message(
        room,
        ServerMessage::RoundOver {
            winner_index,
            tai_result: tai_result.as_ref().map(TaiResultWire::from),
            payment_result: payment_result.as_ref().map(PaymentResultWire::from),
            message,
        },
    );
}

fn start_next_round(room: &mut Room) {
    let Some(previous_game) = &room.game else { return };
    let dealer = previous_game.dealer_index();
    let dealer_retains = room.round_result.winner == Some(dealer);

    let mut round_wind = previous_game.round_wind;
    let mut round_number = previous_game.round_number;
    let mut winds: [Wind; 4] = std::array::from_fn(|i| previous_game.players[i].seat_wind);

    if !dealer_retains {
        for wind in winds.iter_mut() {
            *wind = wind.next();
        }
        round_number += 1;
        if round_number > 4 {
            round_number = 1;
            round_wind = round_wind.next();
        }
    }

    let scores: [i64; 4] = std::array::from_fn(|i| previous_game.players[i].score);
    let players: [Player; 4] = std::array::from_fn(|i| {
        let mut player = Player::new(
            previous_game.players[i].name.clone(),
            previous_game.players[i].avatar.clone(),
            winds[i],
        );
        player.score = scores[i];
        player.connection = previous_game.players[i].connection;
        player
    });

    let mut game = GameState {
        players,
        wall: Wall::shuffled(&mut room.rng),
        current_player: 0,
        round_wind,
        round_number,
        turn_counter: 0,
        last_discard: None,
        last_discarder: None,
        phase: Phase::Waiting,
    };
    if moves::deal_round(&mut game).is_err() {
        error!("failed to deal next round");
        return;
    }

    room.round_result = RoundResult::default();
    room.game = Some(game);
    room.phase = RoomPhase::Playing;

    broadcast_server_message_with(room, |seat| ServerMessage::GameStart {
        state: view::project_for_seat(room.game.as_ref().unwrap(), seat),
    });
    begin_turn(room);
}

fn handle_disconnected(room: &mut Room, seat: usize) {
    if !room.seats[seat].occupied || room.seats[seat].client.is_none() {
        return;
    }
    room.seats[seat].client = None;

    if matches!(room.phase, RoomPhase::Lobby) {
        broadcast_lobby_state(room);
        return;
    }

    broadcast_server_message(room, ServerMessage::PlayerDisconnected { player_index: seat });

    if let Some(game) = &mut room.game {
        game.players[seat].connection = ConnectionStatus::HumanDisconnected;
        let is_current = game.current_player == seat;
        drop(game);
        if is_current && matches!(room.phase, RoomPhase::Playing) {
            run_bot_turn(room, seat);
        }
    }

    if let RoomPhase::ClaimWindow(window) = &mut room.phase {
        if window.pending_humans.remove(&seat) {
            window.responses.insert(seat, ClaimResponse::Pass);
            if window.pending_humans.is_empty() {
                resolve_claim_window(room);
                return;
            }
        }
    }

    room.disconnect_generation[seat] += 1;
    let generation = room.disconnect_generation[seat];
    let handle = room.self_handle.clone();
    let delay = room.config.disconnect_grace_period;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = handle.tell(RoomCommand::DisconnectGraceExpired { seat, generation });
    });
}

fn send_to(room: &Room, seat: usize, message: ServerMessage) {
    if let Some(client) = &room.seats[seat].client {
        let _ = client.tell(ClientCommand::Send(message));
    }
}

fn send_full_state_to(room: &Room, seat: usize) {
    if let Some(game) = &room.game {
        send_to(room, seat, ServerMessage::GameState {
            state: view::project_for_seat(game, seat),
        });
    }
}

fn broadcast_server_message(room: &Room, message: ServerMessage) {
    for seat in 0..4 {
        send_to(room, seat, message.clone());
    }
}

fn broadcast_server_message_with(room: &Room, build: impl Fn(usize) -> ServerMessage) {
    for seat in 0..4 {
        send_to(room, seat, build(seat));
    }
}

fn broadcast_game_state(room: &Room) {
    broadcast_server_message_with(room, |seat| ServerMessage::GameState {
        state: view::project_for_seat(room.game.as_ref().unwrap(), seat),
    });
}

fn broadcast_lobby_state(room: &Room) {
    let seats = std::array::from_fn(|i| {
        let seat = &room.seats[i];
        if seat.occupied {
            Some(LobbySeat {
                name: seat.name.clone(),
                avatar: seat.avatar.clone(),
                is_ready: seat.is_ready,
                is_bot: seat.permanently_bot,
            })
        } else {
            None
        }
    });
    let message = ServerMessage::RoomState {
        room: ClientRoom {
            seats,
            host_index: room.host,
        },
    };
    broadcast_server_message(room, message);
}
