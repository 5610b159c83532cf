/// API token with a redacted `Debug` representation so it never leaks
/// into logs.
#[derive(Clone)]
pub struct Token(String);

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_str() {
        let token = Token::from("tok_1234567890");
        assert_eq!(token.as_str(), "tok_1234567890");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("super-secret");
        assert_eq!(format!("{:?}", token), "<redacted>");
    }
}
