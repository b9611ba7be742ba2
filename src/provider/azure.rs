use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{nullable, Dispatched};
use crate::{
    classify::{classify, ChangeAction, RefKind, RefState},
    error::Error,
    event::{
        trim_ref, Commit, Event, Push, PullRequest, PullRequestAction, PullRequestChange,
        RefAction, RefChange, Reference, Repository, Signature, User,
    },
};

pub(crate) fn dispatch(event: &str, body: &[u8]) -> Result<Dispatched, Error> {
    match event {
        "git.push" => parse_push(body).map(Dispatched::Event),
        _ if event.starts_with("git.pullrequest.") => {
            parse_pull_request(body, pull_request_action(event)).map(Dispatched::Event)
        }
        _ => Ok(Dispatched::Unknown),
    }
}

fn pull_request_action(event: &str) -> PullRequestAction {
    match event {
        "git.pullrequest.created" => PullRequestAction::Open,
        "git.pullrequest.updated" => PullRequestAction::Update,
        "git.pullrequest.merged" => PullRequestAction::Close,
        _ => PullRequestAction::Unknown,
    }
}

fn is_zero_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b == b'0')
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    id: String,
    name: String,
    #[serde(default)]
    project: RawProject,
    #[serde(default, deserialize_with = "nullable")]
    remote_url: String,
    #[serde(default, deserialize_with = "nullable")]
    ssh_url: String,
    #[serde(default, deserialize_with = "nullable")]
    web_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawProject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    visibility: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    #[serde(default, deserialize_with = "nullable")]
    display_name: String,
    #[serde(default, deserialize_with = "nullable")]
    unique_name: String,
    #[serde(default, deserialize_with = "nullable")]
    image_url: String,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        Self {
            id: raw.id,
            namespace: raw.project.name,
            name: raw.name,
            private: raw.project.visibility != "public",
            link: if raw.web_url.is_empty() {
                raw.remote_url.clone()
            } else {
                raw.web_url
            },
            clone: raw.remote_url,
            clone_ssh: raw.ssh_url,
        }
    }
}

impl From<RawIdentity> for User {
    fn from(raw: RawIdentity) -> Self {
        Self {
            login: raw.unique_name,
            name: raw.display_name,
            email: String::new(),
            avatar: raw.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    resource: RawPush,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPush {
    #[serde(default, deserialize_with = "nullable")]
    ref_updates: Vec<RawRefUpdate>,
    #[serde(default, deserialize_with = "nullable")]
    commits: Vec<RawCommit>,
    repository: RawRepository,
    #[serde(default)]
    pushed_by: RawIdentity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRefUpdate {
    name: String,
    #[serde(default)]
    old_object_id: String,
    #[serde(default)]
    new_object_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommit {
    commit_id: String,
    #[serde(default, deserialize_with = "nullable")]
    comment: String,
    #[serde(default, deserialize_with = "nullable")]
    url: String,
    #[serde(default)]
    author: RawGitUser,
    #[serde(default)]
    committer: RawGitUser,
}

#[derive(Debug, Default, Deserialize)]
struct RawGitUser {
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default, deserialize_with = "nullable")]
    email: String,
    date: Option<DateTime<Utc>>,
}

impl From<RawGitUser> for Signature {
    fn from(raw: RawGitUser) -> Self {
        Self {
            login: String::new(),
            name: raw.name,
            email: raw.email,
            avatar: String::new(),
            date: raw.date,
        }
    }
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        Self {
            sha: raw.commit_id,
            message: raw.comment,
            link: raw.url,
            author: raw.author.into(),
            committer: raw.committer.into(),
        }
    }
}

fn parse_push(body: &[u8]) -> Result<Event, Error> {
    let raw: RawPushPayload = serde_json::from_slice(body)?;
    let push = raw.resource;

    let mut updates = push.ref_updates.into_iter();
    let update = updates.next().ok_or(Error::EmptyChangeset)?;
    let skipped = updates.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Only the first ref update of a push is reported");
    }

    let created = is_zero_id(&update.old_object_id);
    let closed = is_zero_id(&update.new_object_id);
    let classification = {
        let state = RefState::from_qualified(&update.name);
        let old = (!created).then(|| state.clone());
        let new = (!closed).then(|| state.clone());
        classify(old.as_ref(), new.as_ref(), created, closed)
    };
    let repo = Repository::from(push.repository);
    let sender = User::from(push.pushed_by);

    let transition = match classification.action {
        ChangeAction::Create => Some((RefAction::Create, update.new_object_id.clone())),
        ChangeAction::Delete => Some((RefAction::Delete, update.old_object_id.clone())),
        ChangeAction::None => None,
    };
    let ref_change = |action, sha, repo, sender| RefChange {
        action,
        reference: Reference {
            name: trim_ref(&update.name).to_string(),
            sha,
        },
        repo,
        sender,
    };

    Ok(match (classification.kind, transition) {
        (RefKind::Branch, Some((action, sha))) => {
            Event::Branch(ref_change(action, sha, repo, sender))
        }
        (RefKind::Tag, Some((action, sha))) => Event::Tag(ref_change(action, sha, repo, sender)),
        _ => {
            let commits: Vec<Commit> = push.commits.into_iter().map(Commit::from).collect();
            let commit = commits
                .iter()
                .find(|commit| commit.sha == update.new_object_id)
                .or_else(|| commits.first())
                .cloned()
                .unwrap_or_else(|| Commit {
                    sha: update.new_object_id.clone(),
                    ..Commit::default()
                });
            Event::Push(Push {
                reference: update.name,
                before: update.old_object_id,
                after: update.new_object_id,
                commit,
                commits,
                repo,
                sender,
            })
        }
    })
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    resource: RawPullRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    pull_request_id: u64,
    #[serde(default, deserialize_with = "nullable")]
    title: String,
    #[serde(default, deserialize_with = "nullable")]
    description: String,
    #[serde(default)]
    status: String,
    source_ref_name: String,
    target_ref_name: String,
    last_merge_source_commit: Option<RawCommitRef>,
    last_merge_target_commit: Option<RawCommitRef>,
    #[serde(default)]
    created_by: RawIdentity,
    creation_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    url: String,
    #[serde(rename = "_links", default)]
    links: RawLinks,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommitRef {
    commit_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawLinks {
    web: Option<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    href: String,
}

fn commit_id(commit: Option<RawCommitRef>) -> String {
    commit.map(|commit| commit.commit_id).unwrap_or_default()
}

fn parse_pull_request(body: &[u8], action: PullRequestAction) -> Result<Event, Error> {
    let raw: RawPullRequestPayload = serde_json::from_slice(body)?;
    let pr = raw.resource;
    let head = Reference {
        name: trim_ref(&pr.source_ref_name).to_string(),
        sha: commit_id(pr.last_merge_source_commit),
    };
    let base = Reference {
        name: trim_ref(&pr.target_ref_name).to_string(),
        sha: commit_id(pr.last_merge_target_commit),
    };
    let author = User::from(pr.created_by);
    Ok(Event::PullRequest(PullRequestChange {
        action,
        pull_request: PullRequest {
            number: pr.pull_request_id,
            title: pr.title,
            body: pr.description,
            sha: head.sha.clone(),
            reference: format!("refs/pull/{}/merge", pr.pull_request_id),
            source: head.name.clone(),
            target: base.name.clone(),
            head,
            base,
            link: pr.links.web.map(|web| web.href).unwrap_or(pr.url),
            closed: pr.status != "active",
            merged: pr.status == "completed",
            author: author.clone(),
            created: pr.creation_date,
            updated: None,
        },
        repo: pr.repository.into(),
        sender: author,
    }))
}
