use tracing::debug;

/// Optional credentials sent with every joke request. Empty unless explicitly configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub cookie: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    /// Reads `COOKIE` and `AUTH` once, after loading a `.env` file from the working directory or
    /// one of its parents if there is one.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) => debug!("no .env file loaded: {}", e),
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        Self {
            cookie: lookup("COOKIE").filter(|value| !value.is_empty()),
            auth_token: lookup("AUTH").filter(|value| !value.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookie.is_none() && self.auth_token.is_none()
    }

    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = Vec::new();

        if let Some(cookie) = &self.cookie {
            headers.push(("Cookie", cookie.as_str()));
        }
        if let Some(auth_token) = &self.auth_token {
            headers.push(("Authorization", auth_token.as_str()));
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn empty_by_default() {
        let credentials = Credentials::from_lookup(|_| None);

        assert!(credentials.is_empty());
        assert!(credentials.headers().is_empty());
    }

    #[test]
    fn maps_variables_to_headers() {
        let credentials = Credentials::from_lookup(|name| match name {
            "COOKIE" => Some("session=abc".to_string()),
            "AUTH" => Some("Bearer xyz".to_string()),
            _ => None,
        });

        assert_eq!(
            credentials.headers(),
            vec![("Cookie", "session=abc"), ("Authorization", "Bearer xyz")]
        );
    }

    #[test]
    fn blank_variables_are_ignored() {
        let credentials = Credentials::from_lookup(|_| Some(String::new()));

        assert!(credentials.is_empty());
    }
}
