//! Client for the public web API: video view metadata and hot comments.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;

pub mod models;

pub use models::{RankedComment, VideoMetadata, ViewData};
use models::{Envelope, ReplyPage};

use crate::config::ApiConfig;
use crate::resolver::Bvid;

/// Sort order 2 is the platform's "hot" ranking.
const HOT_SORT: u8 = 2;
/// Comment area type for regular videos.
const VIDEO_REPLY_TYPE: u8 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Unexpected API payload: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Comments as shown to the user: a ranked list, or a placeholder when fetching failed
#[derive(Debug, Clone, PartialEq)]
pub enum CommentSection {
    Ranked(Vec<RankedComment>),
    Unavailable,
}

impl CommentSection {
    pub const PLACEHOLDER: &'static str = "Comments unavailable";
}

impl fmt::Display for CommentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentSection::Ranked(comments) => {
                let lines: Vec<String> = comments.iter().map(|c| c.to_string()).collect();
                f.write_str(&lines.join("\n"))
            }
            CommentSection::Unavailable => f.write_str(Self::PLACEHOLDER),
        }
    }
}

/// Read-only view of the platform API used by the pipeline
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Title and description; any failure ends the run
    async fn fetch_metadata(&self, bvid: &Bvid) -> Result<VideoMetadata, ApiError>;

    /// Top comments in hot order; never fails, degrades to a placeholder
    async fn fetch_comments(&self, bvid: &Bvid, max_comments: usize) -> CommentSection;
}

/// reqwest-backed API client
pub struct BiliApiClient {
    client: Client,
    base_url: String,
}

impl BiliApiClient {
    pub fn new(config: &ApiConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(REFERER, HeaderValue::from_str(&config.referer)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn view_url(&self, bvid: &Bvid) -> String {
        format!("{}/x/web-interface/view?bvid={}", self.base_url, bvid)
    }

    fn reply_url(&self, aid: u64) -> String {
        format!(
            "{}/x/v2/reply?pn=1&type={}&oid={}&sort={}",
            self.base_url, VIDEO_REPLY_TYPE, aid, HOT_SORT
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, ApiError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }

    /// View endpoint payload (title, description, numeric id)
    pub async fn fetch_view(&self, bvid: &Bvid) -> Result<ViewData, ApiError> {
        let body = self.get_text(&self.view_url(bvid)).await?;
        parse_view(&body)
    }

    async fn try_fetch_comments(&self, bvid: &Bvid, max_comments: usize) -> Result<Vec<RankedComment>, ApiError> {
        let view = self.fetch_view(bvid).await?;
        tracing::debug!("Resolved {} to aid {}", bvid, view.aid);

        let body = self.get_text(&self.reply_url(view.aid)).await?;
        parse_replies(&body, max_comments)
    }
}

#[async_trait]
impl VideoApi for BiliApiClient {
    async fn fetch_metadata(&self, bvid: &Bvid) -> Result<VideoMetadata, ApiError> {
        tracing::info!("Fetching metadata for {}", bvid);
        let view = self.fetch_view(bvid).await?;
        Ok(view.into())
    }

    async fn fetch_comments(&self, bvid: &Bvid, max_comments: usize) -> CommentSection {
        tracing::info!("Fetching up to {} comments for {}", max_comments, bvid);

        match self.try_fetch_comments(bvid, max_comments).await {
            Ok(comments) => CommentSection::Ranked(comments),
            Err(e) => {
                tracing::warn!("Failed to fetch comments: {}", e);
                CommentSection::Unavailable
            }
        }
    }
}

/// Unwrap the response envelope; any non-zero code is a failure even on HTTP 200
fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Payload(e.to_string()))?;

    if envelope.code != 0 {
        let message = if envelope.message.is_empty() {
            "unknown error".to_string()
        } else {
            envelope.message
        };
        return Err(ApiError::Api { code: envelope.code, message });
    }

    envelope
        .data
        .ok_or_else(|| ApiError::Payload("missing data field".to_string()))
}

pub fn parse_view(body: &str) -> Result<ViewData, ApiError> {
    unwrap_envelope(body)
}

/// Ranked comments in API order, numbered from 1, at most `max_comments`
pub fn parse_replies(body: &str, max_comments: usize) -> Result<Vec<RankedComment>, ApiError> {
    let page: ReplyPage = unwrap_envelope(body)?;

    Ok(page
        .replies
        .unwrap_or_default()
        .into_iter()
        .take(max_comments)
        .enumerate()
        .map(|(i, reply)| RankedComment {
            rank: i + 1,
            author: reply.member.uname,
            text: reply.content.message,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const VIEW_OK: &str = r#"{
        "code": 0,
        "message": "0",
        "ttl": 1,
        "data": {
            "bvid": "BV1GJ411x7h7",
            "aid": 80433022,
            "title": "【官方 MV】Never Gonna Give You Up",
            "desc": "line one\nline two",
            "owner": {"mid": 1, "name": "someone"}
        }
    }"#;

    fn reply(name: &str, message: &str) -> String {
        format!(r#"{{"member": {{"uname": "{}"}}, "content": {{"message": "{}"}}, "like": 3}}"#, name, message)
    }

    fn replies_body(count: usize) -> String {
        let replies: Vec<String> = (0..count)
            .map(|i| reply(&format!("user{}", i), &format!("comment {}", i)))
            .collect();
        format!(r#"{{"code": 0, "message": "0", "data": {{"replies": [{}]}}}}"#, replies.join(","))
    }

    #[test]
    fn test_parse_view_ok() {
        let view = parse_view(VIEW_OK).unwrap();
        assert_eq!(view.aid, 80433022);

        let metadata: VideoMetadata = view.into();
        assert_eq!(metadata.title, "【官方 MV】Never Gonna Give You Up");
        assert_eq!(metadata.description, "line one\nline two");
    }

    #[test]
    fn test_parse_view_nonzero_code() {
        let body = r#"{"code": -404, "message": "啥都木有", "ttl": 1}"#;
        match parse_view(body) {
            Err(ApiError::Api { code, message }) => {
                assert_eq!(code, -404);
                assert_eq!(message, "啥都木有");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_view_nonzero_code_without_message() {
        let err = parse_view(r#"{"code": -400}"#).unwrap_err();
        assert_eq!(err.to_string(), "API error -400: unknown error");
    }

    #[test]
    fn test_parse_view_garbage() {
        assert!(matches!(parse_view("<html>blocked</html>"), Err(ApiError::Payload(_))));
        assert!(matches!(parse_view(r#"{"code": 0}"#), Err(ApiError::Payload(_))));
    }

    #[test]
    fn test_parse_replies_truncates_in_order() {
        let comments = parse_replies(&replies_body(30), 20).unwrap();
        assert_eq!(comments.len(), 20);
        for (i, comment) in comments.iter().enumerate() {
            assert_eq!(comment.rank, i + 1);
            assert_eq!(comment.author, format!("user{}", i));
            assert_eq!(comment.text, format!("comment {}", i));
        }
    }

    #[test]
    fn test_parse_replies_fewer_than_max() {
        let comments = parse_replies(&replies_body(3), 20).unwrap();
        assert_eq!(comments.len(), 3);
    }

    #[test]
    fn test_parse_replies_null_list() {
        let body = r#"{"code": 0, "message": "0", "data": {"replies": null}}"#;
        assert!(parse_replies(body, 20).unwrap().is_empty());
    }

    #[test]
    fn test_parse_replies_error_code() {
        let body = r#"{"code": 12002, "message": "评论区已关闭"}"#;
        assert!(matches!(parse_replies(body, 20), Err(ApiError::Api { code: 12002, .. })));
    }

    #[test]
    fn test_comment_section_display() {
        let section = CommentSection::Ranked(vec![
            RankedComment {
                rank: 1,
                author: "a".into(),
                text: "first".into(),
            },
            RankedComment {
                rank: 2,
                author: "b".into(),
                text: "second".into(),
            },
        ]);
        assert_eq!(section.to_string(), "1. a: first\n2. b: second");
        assert_eq!(CommentSection::Unavailable.to_string(), CommentSection::PLACEHOLDER);
    }

    #[test]
    fn test_urls() {
        let client = BiliApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        let bvid = Bvid::parse("BV1GJ411x7h7").unwrap();

        assert_eq!(client.view_url(&bvid), "http://127.0.0.1:9/x/web-interface/view?bvid=BV1GJ411x7h7");
        assert_eq!(client.reply_url(42), "http://127.0.0.1:9/x/v2/reply?pn=1&type=1&oid=42&sort=2");
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_comments() {
        // Nothing listens on the discard port
        let client = BiliApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ApiConfig::default()
        })
        .unwrap();
        let bvid = Bvid::parse("BV1GJ411x7h7").unwrap();

        assert_eq!(client.fetch_comments(&bvid, 20).await, CommentSection::Unavailable);
        assert!(client.fetch_metadata(&bvid).await.is_err());
    }

    /// Serves one canned JSON body per connection, in order, and returns the raw request heads
    async fn serve_json(bodies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();

                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());

                let response = format!(
                    concat!(
                        "HTTP/1.1 200 OK\r\n",
                        "Content-Type: application/json\r\n",
                        "Content-Length: {}\r\n",
                        "Connection: close\r\n\r\n{}"
                    ),
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });

        (base_url, handle)
    }

    const VIEW_REQUEST_LINE: &str = "GET /x/web-interface/view?bvid=BV1GJ411x7h7 HTTP/1.1\r\n";

    fn stub_client(base_url: &str) -> BiliApiClient {
        BiliApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..ApiConfig::default()
        })
        .unwrap()
    }

    fn assert_browser_headers(request: &str) {
        let lower = request.to_lowercase();
        assert!(
            lower.contains("\r\nuser-agent: mozilla/5.0"),
            "missing user agent in {:?}",
            request
        );
        assert!(
            lower.contains("\r\nreferer: https://www.bilibili.com/\r\n"),
            "missing referer in {:?}",
            request
        );
    }

    #[tokio::test]
    async fn test_comments_request_sequence() {
        let view = r#"{"code": 0, "data": {"aid": 777, "title": "t", "desc": "d"}}"#;
        let (base_url, server) = serve_json(vec![view.to_string(), replies_body(25)]).await;
        let client = stub_client(&base_url);
        let bvid = Bvid::parse("BV1GJ411x7h7").unwrap();

        let section = client.fetch_comments(&bvid, 20).await;
        let requests = server.await.unwrap();

        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with(VIEW_REQUEST_LINE));
        assert!(requests[1].starts_with("GET /x/v2/reply?pn=1&type=1&oid=777&sort=2 HTTP/1.1\r\n"));
        for request in &requests {
            assert_browser_headers(request);
        }

        match section {
            CommentSection::Ranked(comments) => {
                assert_eq!(comments.len(), 20);
                assert_eq!(comments[0].to_string(), "1. user0: comment 0");
                assert_eq!(comments[19].rank, 20);
            }
            CommentSection::Unavailable => panic!("expected ranked comments"),
        }
    }

    #[tokio::test]
    async fn test_metadata_request_and_error_code() {
        let (base_url, server) = serve_json(vec![
            VIEW_OK.to_string(),
            r#"{"code": -404, "message": "啥都木有"}"#.to_string(),
        ])
        .await;
        let client = stub_client(&base_url);
        let bvid = Bvid::parse("BV1GJ411x7h7").unwrap();

        let metadata = client.fetch_metadata(&bvid).await.unwrap();
        assert_eq!(metadata.title, "【官方 MV】Never Gonna Give You Up");
        assert_eq!(metadata.description, "line one\nline two");

        let err = client.fetch_metadata(&bvid).await.unwrap_err();
        assert!(matches!(err, ApiError::Api { code: -404, .. }));

        let requests = server.await.unwrap();
        for request in &requests {
            assert!(request.starts_with(VIEW_REQUEST_LINE));
            assert_browser_headers(request);
        }
    }
}
