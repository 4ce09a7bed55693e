//! Field-by-field views over an already-parsed [`Commit`] or [`Tag`],
//! for callers that want to scan a commit's headers (e.g. to walk its
//! parents) without caring about the whole struct.

use bstr::{BStr, BString};
use git_hash::ObjectId;
use git_utils::date::Signature;

use crate::{Commit, Tag};

/// One field of a commit, in header order followed by the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitEntry<'a> {
    Tree(ObjectId),
    Parent(ObjectId),
    Author(&'a Signature),
    Committer(&'a Signature),
    Encoding(&'a BStr),
    GpgSig(&'a BStr),
    ExtraHeader(&'a BStr, &'a BStr),
    Message(&'a BStr),
}

impl Commit {
    /// Iterate over this commit's fields without allocating.
    pub fn iter_entries(&self) -> impl Iterator<Item = CommitEntry<'_>> {
        let tree = std::iter::once(CommitEntry::Tree(self.tree));
        let parents = self.parents.iter().map(|p| CommitEntry::Parent(*p));
        let author = std::iter::once(CommitEntry::Author(&self.author));
        let committer = std::iter::once(CommitEntry::Committer(&self.committer));
        let encoding = self
            .encoding
            .as_ref()
            .map(|e| CommitEntry::Encoding(bstr_ref(e)))
            .into_iter();
        let gpgsig = self
            .gpgsig
            .as_ref()
            .map(|s| CommitEntry::GpgSig(bstr_ref(s)))
            .into_iter();
        let extra = self
            .extra_headers
            .iter()
            .map(|(k, v)| CommitEntry::ExtraHeader(bstr_ref(k), bstr_ref(v)));
        let message = std::iter::once(CommitEntry::Message(bstr_ref(&self.message)));

        tree.chain(parents)
            .chain(author)
            .chain(committer)
            .chain(encoding)
            .chain(gpgsig)
            .chain(extra)
            .chain(message)
    }
}

/// One field of a tag, in header order followed by the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEntry<'a> {
    Target(ObjectId),
    TargetType(crate::ObjectType),
    TagName(&'a BStr),
    Tagger(&'a Signature),
    GpgSig(&'a BStr),
    Message(&'a BStr),
}

impl Tag {
    pub fn iter_entries(&self) -> impl Iterator<Item = TagEntry<'_>> {
        let target = std::iter::once(TagEntry::Target(self.target));
        let target_type = std::iter::once(TagEntry::TargetType(self.target_type));
        let tag_name = std::iter::once(TagEntry::TagName(bstr_ref(&self.tag_name)));
        let tagger = self
            .tagger
            .as_ref()
            .map(TagEntry::Tagger)
            .into_iter();
        let gpgsig = self
            .gpgsig
            .as_ref()
            .map(|s| TagEntry::GpgSig(bstr_ref(s)))
            .into_iter();
        let message = std::iter::once(TagEntry::Message(bstr_ref(&self.message)));

        target
            .chain(target_type)
            .chain(tag_name)
            .chain(tagger)
            .chain(gpgsig)
            .chain(message)
    }
}

fn bstr_ref(b: &BString) -> &BStr {
    b.as_ref()
}
