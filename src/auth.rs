use std::fmt;

/// Opaque bearer token for the GitLab API.
///
/// Wraps the raw string so it never leaks through `Debug` output or logs.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = Token::from("glpat-secret");
        assert_eq!(token.as_str(), "glpat-secret");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("glpat-secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
    }
}
