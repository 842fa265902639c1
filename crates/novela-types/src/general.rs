use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

pub const MIN_USERNAME_LEN: usize = 5;
pub const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email)] String);

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn no_whitespace(value: &str, _ctx: &()) -> garde::Result {
    if value.chars().any(char::is_whitespace) {
        Err(garde::Error::new("username cannot contain whitespace"))
    } else {
        Ok(())
    }
}

/// Login name of a user - at least 5 characters, no whitespace
#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct Username(
    #[garde(length(chars, min = 5, max = 64), custom(no_whitespace))]
    String,
);

impl FromStr for Username {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let username = Username(s.to_string());
        username.validate()?;
        Ok(username)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
