use serde::{Deserialize, Serialize};

/// A synthetic client profile.
///
/// Only `client_id` is required when a roster is read from disk; the profile
/// fields fall back to empty strings so the output schema never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub status: String,
}

impl Client {
    /// Create a client with an id and an empty profile
    pub fn with_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone_number: String::new(),
            date_of_birth: String::new(),
            gender: String::new(),
            occupation: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
            status: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_entry_needs_only_id() {
        let client: Client = serde_json::from_str(r#"{"client_id": "cus-1"}"#).unwrap();
        assert_eq!(client, Client::with_id("cus-1"));
    }
}
