//! Minting and verification of HS256 player tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{PlayerClaims, TOKEN_AUDIENCE, TOKEN_ISSUER};
use crate::error::AppError;
use crate::state::security_config::SecurityConfig;

/// Mint a token for `(game_id, player_id)` with the configured TTL.
pub fn mint_player_token(
    security: &SecurityConfig,
    player_id: &str,
    game_id: &str,
    seat_index: Option<u8>,
    is_spectator: bool,
    now: SystemTime,
) -> Result<String, AppError> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::internal("system clock is before the epoch"))?
        .as_secs() as i64;
    let exp = iat + security.token_ttl().as_secs() as i64;

    let claims = PlayerClaims {
        sub: player_id.to_string(),
        game_id: game_id.to_string(),
        seat_index,
        is_spectator,
        iss: TOKEN_ISSUER.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(security.secret()),
    )
    .map_err(|e| AppError::internal(format!("failed to encode player token: {e}")))
}

/// Verify a token: pinned HS256, issuer, audience, and expiry.
pub fn verify_player_token(
    security: &SecurityConfig,
    token: &str,
) -> Result<PlayerClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    decode::<PlayerClaims>(
        token,
        &DecodingKey::from_secret(security.secret()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::unauthorized("token expired")
        }
        jsonwebtoken::errors::ErrorKind::InvalidSignature => {
            AppError::unauthorized("invalid signature")
        }
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => AppError::unauthorized("invalid issuer"),
        jsonwebtoken::errors::ErrorKind::InvalidAudience => {
            AppError::unauthorized("invalid audience")
        }
        _ => AppError::unauthorized("invalid token"),
    })
}

/// Convenience used by the websocket upgrade: the token must also match the
/// game in the URL.
pub fn verify_for_game(
    security: &SecurityConfig,
    token: &str,
    game_id: &str,
) -> Result<PlayerClaims, AppError> {
    let claims = verify_player_token(security, token)?;
    if claims.game_id != game_id {
        return Err(AppError::unauthorized("token was issued for another game"));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig::new(b"test_secret_key_for_testing_purposes_only", ttl())
    }

    fn ttl() -> Duration {
        Duration::from_secs(3_600)
    }

    #[test]
    fn mint_and_verify_round_trip() {
        let security = security();
        let now = SystemTime::now();

        let token =
            mint_player_token(&security, "p1", "g1", Some(2), false, now).unwrap();
        let claims = verify_player_token(&security, &token).unwrap();

        assert_eq!(claims.sub, "p1");
        assert_eq!(claims.game_id, "g1");
        assert_eq!(claims.seat_index, Some(2));
        assert!(!claims.is_spectator);
        assert_eq!(claims.exp, claims.iat + ttl().as_secs() as i64);
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = security();
        let past = SystemTime::now() - Duration::from_secs(2 * ttl().as_secs());

        let token = mint_player_token(&security, "p1", "g1", None, true, past).unwrap();
        let err = verify_player_token(&security, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let minted_with = security();
        let verified_with = SecurityConfig::new(b"a-different-secret", ttl());

        let token =
            mint_player_token(&minted_with, "p1", "g1", None, false, SystemTime::now()).unwrap();
        let err = verify_player_token(&verified_with, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn token_is_bound_to_its_game() {
        let security = security();
        let token =
            mint_player_token(&security, "p1", "g1", Some(0), false, SystemTime::now()).unwrap();

        assert!(verify_for_game(&security, &token, "g1").is_ok());
        let err = verify_for_game(&security, &token, "g2").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }
}
