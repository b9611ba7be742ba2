//! Canonical, provider-agnostic webhook events.
//!
//! Every provider module maps its own wire shapes into these types. Two
//! naming rules hold across the whole model:
//!
//! - [`Reference::name`] never carries a `refs/...` prefix.
//! - [`Push::reference`] always carries it.
//!
//! Consumers rely on prefix presence to tell push events apart from ref
//! creation/deletion events, so mappers must keep this asymmetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BRANCH_PREFIX: &str = "refs/heads/";
pub const TAG_PREFIX: &str = "refs/tags/";

/// A normalized webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Push(Push),
    Branch(RefChange),
    Tag(RefChange),
    PullRequest(PullRequestChange),
    /// A delivery the provider module recognizes but which has no canonical
    /// semantics (e.g. GitHub's `ping`).
    Unrecognized(Unrecognized),
}

impl Event {
    pub fn repository(&self) -> &Repository {
        match self {
            Event::Push(e) => &e.repo,
            Event::Branch(e) | Event::Tag(e) => &e.repo,
            Event::PullRequest(e) => &e.repo,
            Event::Unrecognized(e) => &e.repo,
        }
    }

    pub fn sender(&self) -> &User {
        match self {
            Event::Push(e) => &e.sender,
            Event::Branch(e) | Event::Tag(e) => &e.sender,
            Event::PullRequest(e) => &e.sender,
            Event::Unrecognized(e) => &e.sender,
        }
    }

    /// Short name of the variant, used in logs and HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Push(_) => "push",
            Event::Branch(_) => "branch",
            Event::Tag(_) => "tag",
            Event::PullRequest(_) => "pull_request",
            Event::Unrecognized(_) => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub namespace: String,
    pub name: String,
    pub private: bool,
    pub clone: String,
    pub clone_ssh: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Author or committer of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub login: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub date: Option<DateTime<Utc>>,
}

impl Signature {
    /// Builds a signature from a combined `Name <email>` author string.
    ///
    /// Strings that don't follow the pattern are kept whole as the name and
    /// the email is left empty.
    pub fn from_raw(raw: &str) -> Self {
        let (name, email) = split_raw_author(raw);
        Self {
            name,
            email,
            ..Self::default()
        }
    }
}

/// Splits `Name <email>` into its parts.
///
/// ```
/// use scmhook::event::split_raw_author;
///
/// assert_eq!(
///     split_raw_author("Jane Doe <jane@example.com>"),
///     ("Jane Doe".to_string(), "jane@example.com".to_string()),
/// );
/// assert_eq!(split_raw_author("jane"), ("jane".to_string(), String::new()));
/// ```
pub fn split_raw_author(raw: &str) -> (String, String) {
    let parsed = raw
        .trim_end()
        .strip_suffix('>')
        .and_then(|rest| rest.rsplit_once('<'))
        .map(|(name, email)| (name.trim(), email.trim()))
        .filter(|(name, email)| !name.is_empty() && !email.is_empty() && !email.contains('<'));

    match parsed {
        Some((name, email)) => (name.to_string(), email.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub link: String,
    pub author: Signature,
    pub committer: Signature,
}

/// A git reference. `name` is stored without any `refs/...` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    /// Fully qualified ref, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub reference: String,
    pub before: String,
    pub after: String,
    pub commit: Commit,
    pub commits: Vec<Commit>,
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefAction {
    Create,
    Delete,
}

/// A branch or tag being created or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefChange {
    pub action: RefAction,
    #[serde(rename = "ref")]
    pub reference: Reference,
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Open,
    Update,
    Close,
    Reopen,
    Sync,
    Label,
    Unlabel,
    /// The provider sent an action this crate has no mapping for.
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub sha: String,
    /// Provider-specific ref that tracks the pull request head.
    #[serde(rename = "ref")]
    pub reference: String,
    pub source: String,
    pub target: String,
    pub head: Reference,
    pub base: Reference,
    pub link: String,
    pub closed: bool,
    pub merged: bool,
    pub author: User,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestChange {
    pub action: PullRequestAction,
    pub pull_request: PullRequest,
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unrecognized {
    pub event: String,
    pub repo: Repository,
    pub sender: User,
}

/// Strips `refs/heads/` or `refs/tags/` from a ref name.
pub fn trim_ref(reference: &str) -> &str {
    reference
        .strip_prefix(BRANCH_PREFIX)
        .or_else(|| reference.strip_prefix(TAG_PREFIX))
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_raw_author_with_email() {
        let sig = Signature::from_raw("Jane Doe <jane@example.com>");
        assert_eq!(sig.name, "Jane Doe");
        assert_eq!(sig.email, "jane@example.com");
    }

    #[test]
    fn split_raw_author_without_brackets() {
        let sig = Signature::from_raw("jane.doe");
        assert_eq!(sig.name, "jane.doe");
        assert_eq!(sig.email, "");
    }

    #[test]
    fn split_raw_author_keeps_unbalanced_input_whole() {
        for raw in ["Jane <jane@example.com", "<jane@example.com>", "Jane <>", ""] {
            assert_eq!(split_raw_author(raw), (raw.to_string(), String::new()), "{raw:?}");
        }
    }

    #[test]
    fn split_raw_author_trims_whitespace() {
        assert_eq!(
            split_raw_author("  Jane   Doe  < jane@example.com > "),
            ("Jane   Doe".to_string(), "jane@example.com".to_string()),
        );
    }

    #[test]
    fn trim_ref_strips_known_prefixes_only() {
        assert_eq!(trim_ref("refs/heads/main"), "main");
        assert_eq!(trim_ref("refs/tags/v1.0.0"), "v1.0.0");
        assert_eq!(trim_ref("refs/pull/1/head"), "refs/pull/1/head");
        assert_eq!(trim_ref("main"), "main");
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let event = Event::Branch(RefChange {
            action: RefAction::Create,
            reference: Reference {
                name: "feature".into(),
                sha: "abc".into(),
            },
            repo: Repository::default(),
            sender: User::default(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "branch");
        assert_eq!(json["action"], "create");
        assert_eq!(json["ref"]["name"], "feature");
    }
}
