use serde::{Deserialize, Serialize};

/// Whether a record came from a submission or a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Post,
    Comment,
}

/// An external link found in a record body. `title` stays `None` when the
/// page could not be fetched or carried no usable `<title>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub title: Option<String>,
}

/// One crawled post or comment, serialized as a single NDJSON line.
/// `id` is the platform identifier and the run-global dedup key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub kind: RecordKind,
    pub subreddit: String,
    /// Posts only; comments have no title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    /// `None` for deleted/removed accounts.
    pub author: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    pub links: Vec<Link>,
    /// Comments only: the id of the post they were collected under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}
