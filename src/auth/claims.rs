use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Access tokens open the API; refresh tokens only mint new pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. `sub` is the numeric user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn issue(
        user_id: i64,
        kind: TokenKind,
        ttl: Duration,
        issuer: &str,
        audience: &str,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp() as usize,
            iss: issuer.to_string(),
            aud: audience.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expiry_is_issue_time_plus_ttl() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let claims = Claims::issue(7, TokenKind::Refresh, Duration::minutes(30), "iss", "aud", now);
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenKind::Access).unwrap(), "\"access\"");
    }
}
