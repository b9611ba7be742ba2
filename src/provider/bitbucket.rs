use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{nullable, Dispatched};
use crate::{
    classify::{classify, ChangeAction, RefKind, RefState},
    error::Error,
    event::{
        Commit, Event, Push, PullRequest, PullRequestAction, PullRequestChange, RefAction,
        RefChange, Reference, Repository, Signature, User, BRANCH_PREFIX, TAG_PREFIX,
    },
};

pub(crate) fn dispatch(event: &str, body: &[u8]) -> Result<Dispatched, Error> {
    match event {
        "repo:push" => parse_push(body).map(Dispatched::Event),
        _ if event.starts_with("pullrequest:") => {
            parse_pull_request(body, pull_request_action(event)).map(Dispatched::Event)
        }
        _ => Ok(Dispatched::Unknown),
    }
}

fn pull_request_action(event: &str) -> PullRequestAction {
    match event {
        "pullrequest:created" => PullRequestAction::Open,
        "pullrequest:updated" => PullRequestAction::Sync,
        "pullrequest:fulfilled" | "pullrequest:rejected" => PullRequestAction::Close,
        _ => PullRequestAction::Unknown,
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawLink {
    #[serde(default, deserialize_with = "nullable")]
    href: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawLinks {
    #[serde(default)]
    html: RawLink,
    #[serde(default)]
    avatar: RawLink,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    #[serde(default)]
    uuid: String,
    full_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    links: RawLinks,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    #[serde(default, deserialize_with = "nullable")]
    nickname: String,
    #[serde(default, deserialize_with = "nullable")]
    username: String,
    #[serde(default, deserialize_with = "nullable")]
    display_name: String,
    #[serde(default)]
    links: RawLinks,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        let (namespace, name) = match raw.full_name.split_once('/') {
            Some((namespace, name)) => (namespace.to_string(), name.to_string()),
            None => (String::new(), raw.name),
        };
        Self {
            id: raw.uuid,
            clone: format!("https://bitbucket.org/{}.git", raw.full_name),
            clone_ssh: format!("git@bitbucket.org:{}.git", raw.full_name),
            namespace,
            name,
            private: raw.is_private,
            link: raw.links.html.href,
        }
    }
}

impl RawUser {
    fn login(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            login: raw.login().to_string(),
            name: raw.display_name,
            email: String::new(),
            avatar: raw.links.avatar.href,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    push: RawPush,
    repository: RawRepository,
    #[serde(default)]
    actor: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(default, deserialize_with = "nullable")]
    changes: Vec<RawChange>,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    new: Option<RawRef>,
    old: Option<RawRef>,
    #[serde(default)]
    created: bool,
    #[serde(default)]
    closed: bool,
    #[serde(default, deserialize_with = "nullable")]
    commits: Vec<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    target: Option<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    hash: String,
    #[serde(default, deserialize_with = "nullable")]
    message: String,
    date: Option<DateTime<Utc>>,
    author: Option<RawAuthor>,
    #[serde(default)]
    links: RawLinks,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default, deserialize_with = "nullable")]
    raw: String,
    user: Option<RawUser>,
}

impl RawRef {
    fn state(&self) -> RefState<'_> {
        RefState::new(&self.kind, &self.name)
    }

    fn sha(&self) -> String {
        self.target
            .as_ref()
            .map(|target| target.hash.clone())
            .unwrap_or_default()
    }

    fn qualified(&self) -> String {
        let prefix = if self.kind == "tag" { TAG_PREFIX } else { BRANCH_PREFIX };
        format!("{}{}", prefix, self.name)
    }
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        // Bitbucket only reports the author; it doubles as the committer.
        let mut author = match raw.author {
            Some(author) => {
                let mut sig = Signature::from_raw(&author.raw);
                if let Some(user) = author.user {
                    sig.login = user.login().to_string();
                    sig.avatar = user.links.avatar.href;
                }
                sig
            }
            None => Signature::default(),
        };
        author.date = raw.date;
        Self {
            sha: raw.hash,
            message: raw.message,
            link: raw.links.html.href,
            committer: author.clone(),
            author,
        }
    }
}

fn parse_push(body: &[u8]) -> Result<Event, Error> {
    let raw: RawPushPayload = serde_json::from_slice(body)?;

    let mut changes = raw.push.changes.into_iter();
    let mut change = changes.next().ok_or(Error::EmptyChangeset)?;
    let skipped = changes.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Only the first ref change of a push is reported");
    }

    let classification = {
        let old = change.old.as_ref().map(RawRef::state);
        let new = change.new.as_ref().map(RawRef::state);
        classify(old.as_ref(), new.as_ref(), change.created, change.closed)
    };
    let transition = match classification.action {
        ChangeAction::Create => change.new.take().map(|r| (RefAction::Create, r)),
        ChangeAction::Delete => change.old.take().map(|r| (RefAction::Delete, r)),
        ChangeAction::None => None,
    };
    let repo = Repository::from(raw.repository);
    let sender = User::from(raw.actor);

    Ok(match (classification.kind, transition) {
        (RefKind::Branch, Some((action, r))) => Event::Branch(ref_change(action, r, repo, sender)),
        (RefKind::Tag, Some((action, r))) => Event::Tag(ref_change(action, r, repo, sender)),
        _ => {
            let before = change.old.as_ref().map(RawRef::sha).unwrap_or_default();
            let (reference, after, commit) = match change.new {
                Some(new) => (
                    new.qualified(),
                    new.sha(),
                    new.target.map(Commit::from).unwrap_or_default(),
                ),
                None => (
                    change.old.as_ref().map(RawRef::qualified).unwrap_or_default(),
                    String::new(),
                    Commit::default(),
                ),
            };
            Event::Push(Push {
                reference,
                before,
                after,
                commit,
                commits: change.commits.into_iter().map(Commit::from).collect(),
                repo,
                sender,
            })
        }
    })
}

fn ref_change(action: RefAction, r: RawRef, repo: Repository, sender: User) -> RefChange {
    RefChange {
        action,
        reference: Reference {
            sha: r.sha(),
            name: r.name,
        },
        repo,
        sender,
    }
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    pullrequest: RawPullRequest,
    repository: RawRepository,
    #[serde(default)]
    actor: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    id: u64,
    #[serde(default, deserialize_with = "nullable")]
    title: String,
    #[serde(default, deserialize_with = "nullable")]
    description: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    author: RawUser,
    source: RawEndpoint,
    destination: RawEndpoint,
    #[serde(default)]
    links: RawLinks,
    created_on: Option<DateTime<Utc>>,
    updated_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    branch: RawBranch,
    commit: Option<RawCommitRef>,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitRef {
    hash: String,
}

impl From<RawEndpoint> for Reference {
    fn from(raw: RawEndpoint) -> Self {
        Self {
            name: raw.branch.name,
            sha: raw.commit.map(|commit| commit.hash).unwrap_or_default(),
        }
    }
}

fn parse_pull_request(body: &[u8], action: PullRequestAction) -> Result<Event, Error> {
    let raw: RawPullRequestPayload = serde_json::from_slice(body)?;
    let pr = raw.pullrequest;
    let head = Reference::from(pr.source);
    let base = Reference::from(pr.destination);
    Ok(Event::PullRequest(PullRequestChange {
        action,
        pull_request: PullRequest {
            number: pr.id,
            title: pr.title,
            body: pr.description,
            sha: head.sha.clone(),
            reference: format!("refs/pull-requests/{}/from", pr.id),
            source: head.name.clone(),
            target: base.name.clone(),
            head,
            base,
            link: pr.links.html.href,
            closed: pr.state != "OPEN",
            merged: pr.state == "MERGED",
            author: pr.author.into(),
            created: pr.created_on,
            updated: pr.updated_on,
        },
        repo: raw.repository.into(),
        sender: raw.actor.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_body(changes: serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "push": { "changes": changes },
            "repository": {
                "uuid": "{7e1a2b3c}",
                "full_name": "atlassian/stash-example-plugin",
                "name": "stash-example-plugin",
                "is_private": true
            },
            "actor": { "nickname": "jdoe", "display_name": "Jane Doe" }
        })
        .to_string()
        .into_bytes()
    }

    fn target(hash: &str) -> serde_json::Value {
        serde_json::json!({
            "hash": hash,
            "message": "update README\n",
            "date": "2018-09-12T20:51:22+00:00",
            "author": { "raw": "Jane Doe <jane@example.com>" }
        })
    }

    #[test]
    fn empty_changeset_is_an_error() {
        assert!(matches!(
            dispatch("repo:push", &push_body(serde_json::json!([]))),
            Err(Error::EmptyChangeset)
        ));
    }

    #[test]
    fn tag_creation_is_tag_event() {
        let body = push_body(serde_json::json!([{
            "new": { "type": "tag", "name": "v1.0", "target": target("aaa") },
            "old": null,
            "created": true,
            "closed": false
        }]));
        match dispatch("repo:push", &body).unwrap() {
            Dispatched::Event(Event::Tag(change)) => {
                assert_eq!(change.action, RefAction::Create);
                assert_eq!(change.reference.name, "v1.0");
                assert_eq!(change.reference.sha, "aaa");
                assert_eq!(change.repo.namespace, "atlassian");
                assert_eq!(change.sender.login, "jdoe");
            }
            other => panic!("expected tag event, got {:?}", other),
        }
    }

    #[test]
    fn only_the_first_change_is_classified() {
        let body = push_body(serde_json::json!([
            {
                "new": null,
                "old": { "type": "branch", "name": "stale", "target": target("bbb") },
                "created": false,
                "closed": true
            },
            {
                "new": { "type": "tag", "name": "v2", "target": target("ccc") },
                "old": null,
                "created": true,
                "closed": false
            }
        ]));
        match dispatch("repo:push", &body).unwrap() {
            Dispatched::Event(Event::Branch(change)) => {
                assert_eq!(change.action, RefAction::Delete);
                assert_eq!(change.reference.name, "stale");
                assert_eq!(change.reference.sha, "bbb");
            }
            other => panic!("expected branch event, got {:?}", other),
        }
    }

    #[test]
    fn commit_push_splits_raw_author() {
        let body = push_body(serde_json::json!([{
            "new": { "type": "branch", "name": "master", "target": target("new") },
            "old": { "type": "branch", "name": "master", "target": target("old") },
            "created": false,
            "closed": false
        }]));
        match dispatch("repo:push", &body).unwrap() {
            Dispatched::Event(Event::Push(push)) => {
                assert_eq!(push.reference, "refs/heads/master");
                assert_eq!(push.before, "old");
                assert_eq!(push.after, "new");
                assert_eq!(push.commit.author.name, "Jane Doe");
                assert_eq!(push.commit.author.email, "jane@example.com");
                assert_eq!(push.commit.committer, push.commit.author);
            }
            other => panic!("expected push event, got {:?}", other),
        }
    }

    #[test]
    fn unclassified_removal_keeps_old_ref() {
        let body = push_body(serde_json::json!([{
            "new": null,
            "old": { "type": "branch", "name": "x", "target": target("h") },
            "created": false,
            "closed": false
        }]));
        match dispatch("repo:push", &body).unwrap() {
            Dispatched::Event(Event::Push(push)) => {
                assert_eq!(push.reference, "refs/heads/x");
                assert_eq!(push.before, "h");
                assert_eq!(push.after, "");
            }
            other => panic!("expected push event, got {:?}", other),
        }
    }

    #[test]
    fn null_raw_author_is_tolerated() {
        let body = push_body(serde_json::json!([{
            "new": {
                "type": "branch",
                "name": "master",
                "target": { "hash": "h", "author": { "raw": null } }
            },
            "old": { "type": "branch", "name": "master", "target": target("old") },
            "created": false,
            "closed": false
        }]));
        match dispatch("repo:push", &body).unwrap() {
            Dispatched::Event(Event::Push(push)) => {
                assert_eq!(push.commit.sha, "h");
                assert_eq!(push.commit.author.name, "");
                assert_eq!(push.commit.author.email, "");
            }
            other => panic!("expected push event, got {:?}", other),
        }
    }

    #[test]
    fn pull_request_keys_map_to_actions() {
        assert_eq!(pull_request_action("pullrequest:created"), PullRequestAction::Open);
        assert_eq!(pull_request_action("pullrequest:updated"), PullRequestAction::Sync);
        assert_eq!(pull_request_action("pullrequest:fulfilled"), PullRequestAction::Close);
        assert_eq!(pull_request_action("pullrequest:rejected"), PullRequestAction::Close);
        assert_eq!(pull_request_action("pullrequest:approved"), PullRequestAction::Unknown);
    }

    #[test]
    fn unknown_key_is_reported() {
        assert!(matches!(
            dispatch("repo:fork", b"{}"),
            Ok(Dispatched::Unknown)
        ));
    }
}
