pub mod telegram;

/// A group message as seen by the monitor, independent of the chat client.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    /// Public username of the chat, if it has one
    pub chat_username: Option<String>,
    pub message_id: i32,
    /// Forum topic the message was posted in
    pub topic_id: Option<i32>,
    pub sender_id: Option<u64>,
    /// Display name of the sender
    pub sender_name: String,
    /// The message text
    pub text: String,
}

impl IncomingMessage {
    /// Deep link to the message. Public chats link by username, private
    /// supergroups through `t.me/c/` with the `-100` prefix removed.
    pub fn link(&self) -> String {
        match self.chat_username.as_deref() {
            Some(username) if !username.is_empty() => {
                format!("https://t.me/{}/{}", username, self.message_id)
            }
            _ => {
                let chat = self.chat_id.to_string();
                let internal = chat.strip_prefix("-100").unwrap_or(&chat);
                format!("https://t.me/c/{}/{}", internal, self.message_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(chat_username: Option<&str>) -> IncomingMessage {
        IncomingMessage {
            chat_id: -1001234567890,
            chat_username: chat_username.map(str::to_string),
            message_id: 77,
            topic_id: Some(3),
            sender_id: Some(1),
            sender_name: "Ivan".to_string(),
            text: "hi".to_string(),
        }
    }

    #[test]
    fn test_private_group_link() {
        assert_eq!(message(None).link(), "https://t.me/c/1234567890/77");
    }

    #[test]
    fn test_public_group_link() {
        assert_eq!(
            message(Some("london_exchange")).link(),
            "https://t.me/london_exchange/77"
        );
    }
}
