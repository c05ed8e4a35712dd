use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::Bvid;

static EMBEDDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BV[0-9A-Za-z]{10}").expect("valid identifier regex"));

/// One offline way of finding an identifier in user input
pub trait IdStrategy: Send + Sync {
    /// Extract a canonical identifier, or `None` if this strategy does not apply
    fn extract(&self, input: &str) -> Option<Bvid>;

    /// Get the name of this strategy
    fn name(&self) -> &'static str;
}

/// Ordered list used by the resolver; first hit wins
pub fn default_strategies() -> Vec<Box<dyn IdStrategy>> {
    vec![
        Box::new(PatternStrategy),
        Box::new(QueryParamStrategy::default()),
        Box::new(PathSegmentStrategy::default()),
    ]
}

/// Scheme-less input like `www.bilibili.com/video/...` is retried as https.
fn parse_lenient(input: &str) -> Option<Url> {
    let input = input.trim();
    Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{}", input)))
        .ok()
}

/// Canonical identifier anywhere in the string
pub struct PatternStrategy;

impl IdStrategy for PatternStrategy {
    fn extract(&self, input: &str) -> Option<Bvid> {
        EMBEDDED
            .find(input)
            .and_then(|m| Bvid::parse(m.as_str()))
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

/// First value of a query parameter (percent-decoded)
pub struct QueryParamStrategy {
    param: &'static str,
}

impl Default for QueryParamStrategy {
    fn default() -> Self {
        Self { param: "bvid" }
    }
}

impl IdStrategy for QueryParamStrategy {
    fn extract(&self, input: &str) -> Option<Bvid> {
        let url = parse_lenient(input)?;
        let value = url
            .query_pairs()
            .find(|(key, _)| key == self.param)
            .map(|(_, value)| value.into_owned())?;

        Bvid::parse(&value)
    }

    fn name(&self) -> &'static str {
        "query"
    }
}

/// Path segment right after a marker segment such as `video`
pub struct PathSegmentStrategy {
    marker: &'static str,
}

impl Default for PathSegmentStrategy {
    fn default() -> Self {
        Self { marker: "video" }
    }
}

impl IdStrategy for PathSegmentStrategy {
    fn extract(&self, input: &str) -> Option<Bvid> {
        let url = parse_lenient(input)?;
        let segments: Vec<&str> = url.path_segments()?.collect();
        let index = segments.iter().position(|segment| *segment == self.marker)?;
        let candidate = segments.get(index + 1)?;

        // Exactly the identifier; trailing characters in the segment disqualify it
        if candidate.starts_with("BV") && candidate.len() == 12 {
            Bvid::parse(candidate)
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_takes_first_occurrence() {
        let bvid = PatternStrategy.extract("BV1aaaaaaaaa and BV1bbbbbbbbb").unwrap();
        assert_eq!(bvid.as_str(), "BV1aaaaaaaaa");
    }

    #[test]
    fn test_pattern_truncates_longer_run() {
        let bvid = PatternStrategy.extract("xBV1GJ411x7h7abc").unwrap();
        assert_eq!(bvid.as_str(), "BV1GJ411x7h7");
    }

    #[test]
    fn test_query_param() {
        let strategy = QueryParamStrategy::default();
        let bvid = strategy
            .extract("https://www.bilibili.com/festival/2024?bvid=%42V1GJ411x7h7&bvid=BVzzzzzzzzzz")
            .unwrap();
        assert_eq!(bvid.as_str(), "BV1GJ411x7h7");
    }

    #[test]
    fn test_query_param_non_canonical_is_none() {
        let strategy = QueryParamStrategy::default();
        assert!(strategy.extract("https://www.bilibili.com/?bvid=av170001").is_none());
        assert!(strategy.extract("https://www.bilibili.com/?aid=170001").is_none());
    }

    #[test]
    fn test_path_segment() {
        let strategy = PathSegmentStrategy::default();
        let bvid = strategy
            .extract("https://www.bilibili.com/video/BV1GJ411x7h7/?p=3")
            .unwrap();
        assert_eq!(bvid.as_str(), "BV1GJ411x7h7");
    }

    #[test]
    fn test_path_segment_without_scheme() {
        let strategy = PathSegmentStrategy::default();
        let bvid = strategy.extract("www.bilibili.com/video/BV1GJ411x7h7").unwrap();
        assert_eq!(bvid.as_str(), "BV1GJ411x7h7");
    }

    #[test]
    fn test_path_segment_requires_exact_length() {
        let strategy = PathSegmentStrategy::default();
        assert!(strategy.extract("https://www.bilibili.com/video/BV1GJ411x7h7extra").is_none());
        assert!(strategy.extract("https://www.bilibili.com/video/BV1GJ4").is_none());
        assert!(strategy.extract("https://www.bilibili.com/video/").is_none());
        assert!(strategy.extract("https://www.bilibili.com/video").is_none());
        assert!(strategy.extract("https://www.bilibili.com/list/BV1GJ411x7h7").is_none());
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        for input in ["", "::::", "http://[::1", "%%%", "https://"] {
            for strategy in default_strategies() {
                assert!(strategy.extract(input).is_none(), "{} matched {:?}", strategy.name(), input);
            }
        }
    }
}
