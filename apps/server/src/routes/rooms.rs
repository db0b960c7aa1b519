//! Room lifecycle HTTP surface: create, join by code, matchmake, stats.
//! Everything that mutates a room goes through that room's command channel;
//! these handlers only reserve seats and mint tokens.

use std::time::SystemTime;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use rand::Rng;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::auth::tokens::mint_player_token;
use crate::bots::BotManager;
use crate::domain::engine::SeatRequest;
use crate::domain::state::{GameConfig, GameId, PlayerProfile, DEFAULT_ROUND_COUNT};
use crate::error::AppError;
use crate::room::worker::RoomHandle;
use crate::state::app_state::AppState;
use crate::utils::join_code;

const MAX_DISPLAY_NAME_LEN: usize = 40;
const MIN_SEATS: usize = 2;
const MAX_SEATS: usize = 8;
const MAX_ROUNDS: u8 = 26;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub display_name: String,
    pub avatar_seed: Option<String>,
    pub color: Option<String>,
    pub user_id: Option<String>,
    pub min_players: Option<usize>,
    pub max_players: Option<usize>,
    pub round_count: Option<u8>,
    #[allow(dead_code)]
    pub is_public: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomResponse {
    game_id: GameId,
    join_code: String,
    player_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinByCodeRequest {
    pub join_code: String,
    pub display_name: String,
    pub avatar_seed: Option<String>,
    pub color: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    game_id: GameId,
    player_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakeRequest {
    pub display_name: String,
    pub avatar_seed: Option<String>,
    pub color: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub user_id: String,
}

fn normalized_display_name(raw: &str) -> Result<String, AppError> {
    let name: String = raw.trim().nfc().collect();
    if name.is_empty() {
        return Err(AppError::validation("displayName must not be empty"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(AppError::validation(format!(
            "displayName longer than {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn fresh_player_id() -> String {
    format!("p_{}", ulid::Ulid::new().to_string().to_lowercase())
}

fn fresh_session_seed() -> String {
    let mut rng = rand::rng();
    format!("{:016x}{:016x}", rng.random::<u64>(), rng.random::<u64>())
}

fn seat_request(
    display_name: String,
    avatar_seed: Option<String>,
    color: Option<String>,
    user_id: Option<String>,
) -> SeatRequest {
    SeatRequest {
        player_id: fresh_player_id(),
        user_id,
        profile: PlayerProfile {
            display_name,
            avatar_seed,
            color,
        },
        is_bot: false,
        spectator: false,
    }
}

fn game_config(
    min_players: Option<usize>,
    max_players: Option<usize>,
    round_count: Option<u8>,
) -> Result<GameConfig, AppError> {
    let min_players = min_players.unwrap_or(MIN_SEATS);
    let max_players = max_players.unwrap_or(4);
    let round_count = round_count.unwrap_or(DEFAULT_ROUND_COUNT);

    if !(MIN_SEATS..=MAX_SEATS).contains(&max_players) {
        return Err(AppError::validation(format!(
            "maxPlayers must be between {MIN_SEATS} and {MAX_SEATS}"
        )));
    }
    if min_players < MIN_SEATS || min_players > max_players {
        return Err(AppError::validation(
            "minPlayers must be at least 2 and no more than maxPlayers",
        ));
    }
    if round_count == 0 || round_count > MAX_ROUNDS {
        return Err(AppError::validation(format!(
            "roundCount must be between 1 and {MAX_ROUNDS}"
        )));
    }

    Ok(GameConfig {
        session_seed: fresh_session_seed(),
        round_count,
        min_players,
        max_players,
    })
}

async fn reserve_and_mint(
    app_state: &AppState,
    handle: &RoomHandle,
    request: SeatRequest,
) -> Result<(String, String), AppError> {
    let seat = handle.reserve(request).await?;
    let token = mint_player_token(
        &app_state.security,
        &seat.player_id,
        &handle.game_id,
        seat.seat_index,
        seat.is_spectator,
        SystemTime::now(),
    )?;
    Ok((seat.player_id, token))
}

/// POST /api/create-room
async fn create_room(
    body: web::Json<CreateRoomRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let display_name = normalized_display_name(&body.display_name)?;
    let config = game_config(body.min_players, body.max_players, body.round_count)?;

    let (handle, join_code) = app_state.registry.create_room(config)?;
    let request = seat_request(display_name, body.avatar_seed, body.color, body.user_id);
    let (_, player_token) = reserve_and_mint(&app_state, &handle, request).await?;

    Ok(HttpResponse::build(StatusCode::CREATED).json(CreateRoomResponse {
        game_id: handle.game_id.clone(),
        join_code,
        player_token,
    }))
}

/// POST /api/join-by-code
async fn join_by_code(
    body: web::Json<JoinByCodeRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let display_name = normalized_display_name(&body.display_name)?;

    let code = body.join_code.trim().to_ascii_uppercase();
    if !join_code::is_well_formed(&code) {
        return Err(AppError::validation("joinCode is not a valid code"));
    }
    let handle = app_state
        .registry
        .room_by_join_code(&code)
        .ok_or_else(|| AppError::room_not_found(format!("no room with code {code}")))?;

    let request = seat_request(display_name, body.avatar_seed, body.color, body.user_id);
    let (_, player_token) = reserve_and_mint(&app_state, &handle, request).await?;

    Ok(HttpResponse::Ok().json(JoinResponse {
        game_id: handle.game_id.clone(),
        player_token,
    }))
}

/// POST /api/matchmake — a public room filled to size with bots, so the game
/// starts immediately.
async fn matchmake(
    body: web::Json<MatchmakeRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let display_name = normalized_display_name(&body.display_name)?;
    let config = game_config(None, None, None)?;
    let seats = config.max_players;

    let (handle, _) = app_state.registry.create_room(config)?;
    let request = seat_request(display_name, body.avatar_seed, body.color, body.user_id);
    let (_, player_token) = reserve_and_mint(&app_state, &handle, request).await?;

    for seat in 1..seats {
        handle.reserve(BotManager::bot_seat_request(seat)).await?;
    }

    Ok(HttpResponse::build(StatusCode::CREATED).json(JoinResponse {
        game_id: handle.game_id.clone(),
        player_token,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsProfile {
    user_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    profile: StatsProfile,
    lifetime: crate::domain::stats::LifetimeStats,
}

/// GET /api/player-stats?userId=…
async fn player_stats(
    query: web::Query<StatsQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.into_inner().user_id;
    let lifetime = app_state
        .store
        .get_player_lifetime(&user_id)
        .await
        .map_err(|e| AppError::db_not_ready(e.to_string()))?
        .ok_or_else(|| AppError::player_not_found(format!("no stats for user {user_id}")))?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        profile: StatsProfile { user_id },
        lifetime,
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/create-room").route(web::post().to(create_room)));
    cfg.service(web::resource("/api/join-by-code").route(web::post().to(join_by_code)));
    cfg.service(web::resource("/api/matchmake").route(web::post().to(matchmake)));
    cfg.service(web::resource("/api/player-stats").route(web::get().to(player_stats)));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};

    use super::*;
    use crate::auth::verify_player_token;
    use crate::config::ServerConfig;
    use crate::persistence::memory::InMemoryStore;

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data(crate::routes::json_config())
                    .configure(crate::routes::configure),
            )
            .await
        };
    }

    fn app_state() -> web::Data<AppState> {
        let config = ServerConfig::for_tests("route-test-secret");
        web::Data::new(AppState::with_store(
            config,
            Arc::new(InMemoryStore::new()),
        ))
    }

    #[actix_web::test]
    async fn create_room_returns_working_credentials() {
        let state = app_state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/create-room")
            .set_json(serde_json::json!({"displayName": "Ada"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let game_id = body["gameId"].as_str().unwrap();
        let join_code = body["joinCode"].as_str().unwrap();
        let token = body["playerToken"].as_str().unwrap();

        assert!(game_id.starts_with("g_"));
        assert_eq!(join_code.len(), join_code::JOIN_CODE_LEN);
        let claims = verify_player_token(&state.security, token).unwrap();
        assert_eq!(claims.game_id, game_id);
        assert_eq!(claims.seat_index, Some(0));
        assert!(state.registry.room(game_id).is_some());
    }

    #[actix_web::test]
    async fn join_by_code_finds_the_room() {
        let state = app_state();
        let app = test_app!(state);

        let create = test::TestRequest::post()
            .uri("/api/create-room")
            .set_json(serde_json::json!({"displayName": "Ada"}))
            .to_request();
        let created: serde_json::Value =
            test::read_body_json(test::call_service(&app, create).await).await;
        let join_code = created["joinCode"].as_str().unwrap();

        let join = test::TestRequest::post()
            .uri("/api/join-by-code")
            .set_json(serde_json::json!({"joinCode": join_code, "displayName": "Grace"}))
            .to_request();
        let resp = test::call_service(&app, join).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["gameId"], created["gameId"]);

        let claims =
            verify_player_token(&state.security, body["playerToken"].as_str().unwrap()).unwrap();
        assert_eq!(claims.seat_index, Some(1));
    }

    #[actix_web::test]
    async fn unknown_join_code_is_not_found() {
        let state = app_state();
        let app = test_app!(state);
        let req = test::TestRequest::post()
            .uri("/api/join-by-code")
            .set_json(serde_json::json!({"joinCode": "ABCDEF", "displayName": "Eve"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "ROOM_NOT_FOUND");
    }

    #[actix_web::test]
    async fn blank_display_name_is_invalid_input() {
        let state = app_state();
        let app = test_app!(state);
        let req = test::TestRequest::post()
            .uri("/api/create-room")
            .set_json(serde_json::json!({"displayName": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_INPUT");
    }

    #[actix_web::test]
    async fn matchmake_fills_the_table_with_bots() {
        let state = app_state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/matchmake")
            .set_json(serde_json::json!({"displayName": "Solo"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let game_id = body["gameId"].as_str().unwrap();
        assert!(state.registry.room(game_id).is_some());
    }

    #[actix_web::test]
    async fn stats_for_unknown_user_is_not_found() {
        let state = app_state();
        let app = test_app!(state);
        let req = test::TestRequest::get()
            .uri("/api/player-stats?userId=u_nobody")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "PLAYER_NOT_FOUND");
    }
}
