use std::collections::{BTreeSet, HashMap};

use regex::{Captures, Regex};

use crate::client::ChatClient;

// Slack may append a label after a pipe: `<@U123|jane>`.
const USER_REFERENCE: &str = r"<@([A-Za-z0-9]+)(?:\|[^>]*)?>";
const CHANNEL_REFERENCE: &str = r"<#([A-Za-z0-9]+)(?:\|[^>]*)?>";

/// Rewrites Slack's `<@U123>` and `<#C123>` tokens into `@username` and
/// `#channel` so commands see the names people typed.
pub struct TextNormalizer {
    users: Regex,
    channels: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self { users: Regex::new(USER_REFERENCE)?, channels: Regex::new(CHANNEL_REFERENCE)? })
    }

    pub async fn normalize(&self, chat: &dyn ChatClient, text: &str) -> String {
        let mut user_names = HashMap::new();
        for user_id in referenced_ids(&self.users, text) {
            let user = chat.user_details(&user_id).await;
            user_names.insert(user_id, format!("@{}", user.username));
        }
        let text = replace_ids(&self.users, text, &user_names);

        let mut channel_names = HashMap::new();
        for channel_id in referenced_ids(&self.channels, &text) {
            let channel = chat.channel_details(&channel_id).await;
            channel_names.insert(channel_id, format!("#{}", channel.name));
        }
        replace_ids(&self.channels, &text, &channel_names)
    }
}

fn referenced_ids(pattern: &Regex, text: &str) -> BTreeSet<String> {
    pattern.captures_iter(text).map(|captures| captures[1].to_owned()).collect()
}

fn replace_ids(pattern: &Regex, text: &str, names: &HashMap<String, String>) -> String {
    pattern
        .replace_all(text, |captures: &Captures| {
            names.get(&captures[1]).cloned().unwrap_or_else(|| captures[0].to_owned())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::TextNormalizer;
    use crate::testing::RecordingChat;

    fn chat() -> RecordingChat {
        RecordingChat::default()
            .with_user("U1", "aleung", "Andrew Leung", Some("UTC"))
            .with_user("U2", "jdoe", "Jane Doe", Some("UTC"))
            .with_channel("C9", "standup")
    }

    #[tokio::test]
    async fn replaces_user_and_channel_tokens() {
        let chat = chat();
        let normalizer = TextNormalizer::new().expect("patterns");

        let text = normalizer.normalize(&chat, "wb f <@U2> from <#C9|standup>").await;

        assert_eq!(text, "wb f @jdoe from #standup");
    }

    #[tokio::test]
    async fn repeated_tokens_are_all_replaced_with_one_lookup() {
        let chat = chat();
        let normalizer = TextNormalizer::new().expect("patterns");

        let text = normalizer.normalize(&chat, "<@U1> and <@U2> and <@U1>").await;

        assert_eq!(text, "@aleung and @jdoe and @aleung");
        assert_eq!(chat.lookups(), ["U1", "U2"]);
    }

    #[tokio::test]
    async fn unknown_ids_use_what_the_collaborator_returns() {
        let chat = chat();
        let normalizer = TextNormalizer::new().expect("patterns");

        let text = normalizer.normalize(&chat, "ping <@U404> in <#C404>").await;

        assert_eq!(text, "ping @U404 in #C404");
    }

    #[tokio::test]
    async fn text_without_tokens_is_unchanged() {
        let chat = chat();
        let normalizer = TextNormalizer::new().expect("patterns");

        let text = normalizer.normalize(&chat, "wb b <not a token> @plain #plain").await;

        assert_eq!(text, "wb b <not a token> @plain #plain");
        assert!(chat.lookups().is_empty());
    }
}
