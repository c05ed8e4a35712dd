use serde::Deserialize;
use std::fmt;

/// Common response wrapper; `code` 0 means success
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Fields of the view endpoint payload we care about
#[derive(Debug, Clone, Deserialize)]
pub struct ViewData {
    /// Numeric content id used by the comments endpoint
    pub aid: u64,
    pub title: String,
    #[serde(default)]
    pub desc: String,
}

/// Title and description of a video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

impl From<ViewData> for VideoMetadata {
    fn from(view: ViewData) -> Self {
        Self {
            title: view.title,
            description: view.desc,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyPage {
    /// `null` when the video has no comments
    pub replies: Option<Vec<Reply>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Reply {
    pub member: Member,
    pub content: Content,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Member {
    pub uname: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    pub message: String,
}

/// A comment with its 1-based display rank
#[derive(Debug, Clone, PartialEq)]
pub struct RankedComment {
    pub rank: usize,
    pub author: String,
    pub text: String,
}

impl fmt::Display for RankedComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}: {}", self.rank, self.author, self.text)
    }
}
