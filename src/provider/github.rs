//! GitHub webhooks.
//!
//! The event type comes from the `X-GitHub-Event` header. Branch and tag
//! transitions come from the explicit `create` and `delete` events; `push`
//! deliveries always map to [`Event::Push`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{nullable, Dispatched};
use crate::{
    error::Error,
    event::{
        trim_ref, Commit, Event, Push, PullRequest, PullRequestAction, PullRequestChange,
        RefAction, RefChange, Reference, Repository, Signature, Unrecognized, User,
    },
};

pub(crate) fn dispatch(event: &str, body: &[u8]) -> Result<Dispatched, Error> {
    match event {
        "push" => parse_push(body),
        "create" => parse_ref_event(body, RefAction::Create),
        "delete" => parse_ref_event(body, RefAction::Delete),
        "pull_request" => parse_pull_request(body).map(Dispatched::Event),
        "ping" => parse_ping(body).map(Dispatched::Event),
        _ => Ok(Dispatched::Unknown),
    }
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    id: u64,
    name: String,
    owner: RawUser,
    #[serde(default)]
    private: bool,
    #[serde(default, deserialize_with = "nullable")]
    clone_url: String,
    #[serde(default, deserialize_with = "nullable")]
    ssh_url: String,
    #[serde(default, deserialize_with = "nullable")]
    html_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    #[serde(default, deserialize_with = "nullable")]
    login: String,
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default, deserialize_with = "nullable")]
    email: String,
    #[serde(default, deserialize_with = "nullable")]
    avatar_url: String,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        Self {
            id: raw.id.to_string(),
            namespace: raw.owner.login,
            name: raw.name,
            private: raw.private,
            clone: raw.clone_url,
            clone_ssh: raw.ssh_url,
            link: raw.html_url,
        }
    }
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            login: raw.login,
            name: raw.name,
            email: raw.email,
            avatar: raw.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, deserialize_with = "nullable")]
    before: String,
    #[serde(default, deserialize_with = "nullable")]
    after: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default, deserialize_with = "nullable")]
    commits: Vec<RawCommit>,
    head_commit: Option<RawCommit>,
    repository: RawRepository,
    sender: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    url: String,
    timestamp: Option<DateTime<Utc>>,
    author: RawCommitUser,
    committer: RawCommitUser,
}

#[derive(Debug, Deserialize)]
struct RawCommitUser {
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default, deserialize_with = "nullable")]
    email: String,
    #[serde(default, deserialize_with = "nullable")]
    username: String,
}

impl RawCommitUser {
    fn into_signature(self, date: Option<DateTime<Utc>>) -> Signature {
        Signature {
            login: self.username,
            name: self.name,
            email: self.email,
            avatar: String::new(),
            date,
        }
    }
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        Self {
            sha: raw.id,
            message: raw.message,
            link: raw.url,
            author: raw.author.into_signature(raw.timestamp),
            committer: raw.committer.into_signature(raw.timestamp),
        }
    }
}

fn parse_push(body: &[u8]) -> Result<Dispatched, Error> {
    let raw: RawPush = serde_json::from_slice(body)?;

    // Ref transitions arrive as separate `create`/`delete` deliveries, so a
    // push always stays a push and keeps its commits.
    let head = if raw.deleted { &raw.before } else { &raw.after };
    let commit = match raw.head_commit {
        Some(head_commit) => Commit::from(head_commit),
        None => Commit {
            sha: head.clone(),
            ..Commit::default()
        },
    };
    Ok(Dispatched::Event(Event::Push(Push {
        commit,
        commits: raw.commits.into_iter().map(Commit::from).collect(),
        reference: raw.reference,
        before: raw.before,
        after: raw.after,
        repo: raw.repository.into(),
        sender: raw.sender.into(),
    })))
}

fn ref_change(
    action: RefAction,
    reference: &str,
    sha: String,
    repo: Repository,
    sender: User,
) -> RefChange {
    RefChange {
        action,
        reference: Reference {
            name: trim_ref(reference).to_string(),
            sha,
        },
        repo,
        sender,
    }
}

#[derive(Debug, Deserialize)]
struct RawRefEvent {
    #[serde(rename = "ref", default, deserialize_with = "nullable")]
    reference: String,
    ref_type: String,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_ref_event(body: &[u8], action: RefAction) -> Result<Dispatched, Error> {
    let raw: RawRefEvent = serde_json::from_slice(body)?;
    let change = ref_change(
        action,
        &raw.reference,
        String::new(),
        raw.repository.into(),
        raw.sender.into(),
    );
    Ok(match raw.ref_type.as_str() {
        "branch" => Dispatched::Event(Event::Branch(change)),
        "tag" => Dispatched::Event(Event::Tag(change)),
        _ => Dispatched::Nothing,
    })
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
    sender: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default, deserialize_with = "nullable")]
    title: String,
    #[serde(default, deserialize_with = "nullable")]
    body: String,
    #[serde(default)]
    state: String,
    #[serde(default, deserialize_with = "nullable")]
    html_url: String,
    #[serde(default, deserialize_with = "nullable")]
    merged: bool,
    user: RawUser,
    head: RawBranch,
    base: RawBranch,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    #[serde(rename = "ref")]
    reference: String,
    sha: String,
}

fn pull_request_action(action: &str) -> PullRequestAction {
    match action {
        "opened" => PullRequestAction::Open,
        "edited" => PullRequestAction::Update,
        "synchronize" => PullRequestAction::Sync,
        "closed" => PullRequestAction::Close,
        "reopened" => PullRequestAction::Reopen,
        "labeled" => PullRequestAction::Label,
        "unlabeled" => PullRequestAction::Unlabel,
        _ => PullRequestAction::Unknown,
    }
}

fn parse_pull_request(body: &[u8]) -> Result<Event, Error> {
    let raw: RawPullRequestPayload = serde_json::from_slice(body)?;
    let pr = raw.pull_request;
    Ok(Event::PullRequest(PullRequestChange {
        action: pull_request_action(&raw.action),
        pull_request: PullRequest {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            sha: pr.head.sha.clone(),
            reference: format!("refs/pull/{}/head", pr.number),
            source: pr.head.reference.clone(),
            target: pr.base.reference.clone(),
            head: Reference {
                name: pr.head.reference,
                sha: pr.head.sha,
            },
            base: Reference {
                name: pr.base.reference,
                sha: pr.base.sha,
            },
            link: pr.html_url,
            closed: pr.state == "closed",
            merged: pr.merged,
            author: pr.user.into(),
            created: pr.created_at,
            updated: pr.updated_at,
        },
        repo: raw.repository.into(),
        sender: raw.sender.into(),
    }))
}

#[derive(Debug, Deserialize)]
struct RawPing {
    repository: Option<RawRepository>,
    #[serde(default)]
    sender: RawUser,
}

fn parse_ping(body: &[u8]) -> Result<Event, Error> {
    let raw: RawPing = serde_json::from_slice(body)?;
    Ok(Event::Unrecognized(Unrecognized {
        event: "ping".to_string(),
        repo: raw.repository.map(Repository::from).unwrap_or_default(),
        sender: raw.sender.into(),
    }))
}
