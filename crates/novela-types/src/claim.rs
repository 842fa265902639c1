use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

/// Claims carried by the session token.
///
/// Only the user id is trusted from the token, everything else (moderator flag,
/// profile) is read from the database when the token is presented.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiClaim {
    pub sub: String,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim for user id, expiry is set when the token is issued
    pub fn for_user(user_id: i64) -> Self {
        ApiClaim {
            sub: user_id.to_string(),
            exp: 0,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = unix_secs(until);
    }

    fn check_validity(&self) -> bool {
        self.exp > unix_secs(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_claim_user_id() {
        let claim = ApiClaim::for_user(42);
        assert_eq!(claim.sub, "42");
        assert_eq!(claim.user_id(), Some(42));

        let bogus = ApiClaim {
            sub: "not-a-number".into(),
            exp: 0,
        };
        assert_eq!(bogus.user_id(), None);
    }

    #[test]
    fn test_validity() {
        let mut claim = ApiClaim::for_user(1);
        assert!(!claim.check_validity());
        claim.set_validity(SystemTime::now() + Duration::from_secs(60));
        assert!(claim.check_validity());
        claim.set_validity(SystemTime::now() - Duration::from_secs(60));
        assert!(!claim.check_validity());
    }
}
