//! Inference of branch/tag creation and deletion from before/after ref state.
//!
//! Some providers only send a generic push envelope holding an "old" and a
//! "new" ref description plus `created`/`closed` flags. [`classify`] turns
//! those into a semantic action without touching any JSON.

use serde::{Deserialize, Serialize};

/// One side of a ref update as described by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefState<'a> {
    /// Provider type tag, e.g. `"branch"`, `"tag"`, `"named_branch"`.
    pub kind: &'a str,
    pub name: &'a str,
}

impl<'a> RefState<'a> {
    pub fn new(kind: &'a str, name: &'a str) -> Self {
        Self { kind, name }
    }

    /// Derives the type tag from a fully qualified ref name.
    pub fn from_qualified(reference: &'a str) -> Self {
        let kind = if reference.starts_with(crate::event::TAG_PREFIX) {
            "tag"
        } else if reference.starts_with(crate::event::BRANCH_PREFIX) {
            "branch"
        } else {
            ""
        };
        Self::new(kind, crate::event::trim_ref(reference))
    }

    fn ref_kind(&self) -> RefKind {
        match self.kind {
            "branch" => RefKind::Branch,
            "tag" => RefKind::Tag,
            _ => RefKind::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Delete,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Classification {
    pub kind: RefKind,
    pub action: ChangeAction,
}

impl Classification {
    pub const PUSH: Self = Self {
        kind: RefKind::None,
        action: ChangeAction::None,
    };
}

/// Classifies a single ref update.
///
/// An ordinary commit push (neither hint applies) always comes back as
/// [`Classification::PUSH`], even though its refs are typed as branches.
pub fn classify(
    old: Option<&RefState<'_>>,
    new: Option<&RefState<'_>>,
    created: bool,
    closed: bool,
) -> Classification {
    let kind = [old, new]
        .iter()
        .flatten()
        .map(|state| state.ref_kind())
        .find(|kind| *kind == RefKind::Branch)
        .or_else(|| {
            [old, new]
                .iter()
                .flatten()
                .map(|state| state.ref_kind())
                .find(|kind| *kind == RefKind::Tag)
        })
        .unwrap_or(RefKind::None);

    let is_ref = |state: &RefState<'_>| state.ref_kind() != RefKind::None;

    if created && new.map_or(false, is_ref) {
        return Classification {
            kind,
            action: ChangeAction::Create,
        };
    }
    if closed && old.map_or(false, is_ref) {
        return Classification {
            kind,
            action: ChangeAction::Delete,
        };
    }
    Classification::PUSH
}
