//! Mailbox-relative resource URLs.

use std::fmt;

use crate::config::GraphConfig;

/// Whose mailbox requests are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mailbox {
    /// The signed-in caller (`/me`).
    #[default]
    Me,
    /// A delegated mailbox (`/users/{user}`).
    User(String),
}

impl Mailbox {
    /// Delegated mailbox for `user`; an empty name falls back to `/me`.
    #[must_use]
    pub fn user(user: impl Into<String>) -> Self {
        let user = user.into();
        if user.trim().is_empty() {
            Self::Me
        } else {
            Self::User(user)
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Me => f.write_str("/me"),
            Self::User(user) => write!(f, "/users/{user}"),
        }
    }
}

/// URL builder for one mailbox on one service root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
    mailbox: Mailbox,
}

impl Endpoints {
    /// Binds `mailbox` to the configured service root.
    #[must_use]
    pub fn new(config: &GraphConfig, mailbox: Mailbox) -> Self {
        Self {
            root: config.root().to_string(),
            mailbox,
        }
    }

    /// The bound mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    fn build(&self, path: &str) -> String {
        format!("{}{}{path}", self.root, self.mailbox)
    }

    /// `/messages`
    #[must_use]
    pub fn messages(&self) -> String {
        self.build("/messages")
    }

    /// `/mailFolders/{folder}/messages`
    #[must_use]
    pub fn folder_messages(&self, folder: &str) -> String {
        self.build(&format!("/mailFolders/{folder}/messages"))
    }

    /// Where new drafts are created.
    #[must_use]
    pub fn drafts(&self) -> String {
        self.folder_messages("drafts")
    }

    /// `/messages/{id}`
    #[must_use]
    pub fn message(&self, id: &str) -> String {
        self.build(&format!("/messages/{id}"))
    }

    /// `/messages/{id}/send`
    #[must_use]
    pub fn send_draft(&self, id: &str) -> String {
        self.build(&format!("/messages/{id}/send"))
    }

    /// `/messages/sendMail`
    #[must_use]
    pub fn send_mail(&self) -> String {
        self.build("/messages/sendMail")
    }

    /// `/messages/{id}/attachments`
    #[must_use]
    pub fn attachments(&self, message_id: &str) -> String {
        self.build(&format!("/messages/{message_id}/attachments"))
    }

    /// `/messages/{id}/attachments/createUploadSession`
    #[must_use]
    pub fn upload_session(&self, message_id: &str) -> String {
        self.build(&format!(
            "/messages/{message_id}/attachments/createUploadSession"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://graph.microsoft.com/v1.0";

    #[test]
    fn test_me_paths() {
        let ep = Endpoints::new(&GraphConfig::default(), Mailbox::Me);
        assert_eq!(ep.messages(), format!("{ROOT}/me/messages"));
        assert_eq!(ep.drafts(), format!("{ROOT}/me/mailFolders/drafts/messages"));
        assert_eq!(ep.message("AAMk"), format!("{ROOT}/me/messages/AAMk"));
        assert_eq!(ep.send_draft("AAMk"), format!("{ROOT}/me/messages/AAMk/send"));
        assert_eq!(ep.send_mail(), format!("{ROOT}/me/messages/sendMail"));
    }

    #[test]
    fn test_delegated_paths() {
        let ep = Endpoints::new(&GraphConfig::default(), Mailbox::user("ops@contoso.com"));
        assert_eq!(
            ep.message("42"),
            format!("{ROOT}/users/ops@contoso.com/messages/42")
        );
        assert_eq!(
            ep.upload_session("42"),
            format!("{ROOT}/users/ops@contoso.com/messages/42/attachments/createUploadSession")
        );
    }

    #[test]
    fn test_blank_user_is_me() {
        assert_eq!(Mailbox::user(""), Mailbox::Me);
        assert_eq!(Mailbox::user("a@b.com").to_string(), "/users/a@b.com");
    }
}
