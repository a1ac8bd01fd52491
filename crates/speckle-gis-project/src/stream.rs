//! Speckle stream URLs
//!
//! A stream URL names a server and a stream, optionally narrowed to a
//! branch, a commit or a single object:
//!
//! ```text
//! https://speckle.xyz/streams/3073b96e86
//! https://speckle.xyz/streams/3073b96e86/branches/site/massing
//! https://speckle.xyz/streams/3073b96e86/commits/604bea8cc6
//! https://speckle.xyz/streams/3073b96e86/objects/8f2ab1...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{ProjectError, Result};

/// What part of a stream a URL points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StreamTarget {
    Stream,
    Branch(String),
    Commit(String),
    Object(String),
}

/// A parsed stream URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRef {
    /// `scheme://host[:port]`
    pub server_url: String,
    pub stream_id: String,
    pub target: StreamTarget,
}

impl StreamRef {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let url = Url::parse(input)
            .map_err(|e| ProjectError::invalid_stream_url(input, e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ProjectError::invalid_stream_url(
                input,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProjectError::invalid_stream_url(input, "missing host"))?;
        let server_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let position = segments
            .iter()
            .position(|seg| *seg == "streams")
            .ok_or_else(|| ProjectError::invalid_stream_url(input, "no /streams/ segment"))?;
        let stream_id = segments
            .get(position + 1)
            .ok_or_else(|| ProjectError::invalid_stream_url(input, "missing stream id"))?
            .to_string();

        let rest = &segments[position + 2..];
        let target = match rest {
            [] => StreamTarget::Stream,
            ["branches", name @ ..] if !name.is_empty() => StreamTarget::Branch(name.join("/")),
            ["commits", id] => StreamTarget::Commit(id.to_string()),
            ["objects", id] => StreamTarget::Object(id.to_string()),
            _ => {
                return Err(ProjectError::invalid_stream_url(
                    input,
                    format!("unrecognised path after stream id: /{}", rest.join("/")),
                ))
            }
        };

        Ok(Self {
            server_url,
            stream_id,
            target,
        })
    }

    /// Canonical URL of this reference
    pub fn stream_url(&self) -> String {
        let base = format!("{}/streams/{}", self.server_url, self.stream_id);
        match &self.target {
            StreamTarget::Stream => base,
            StreamTarget::Branch(name) => format!("{}/branches/{}", base, name),
            StreamTarget::Commit(id) => format!("{}/commits/{}", base, id),
            StreamTarget::Object(id) => format!("{}/objects/{}", base, id),
        }
    }

    /// Whether both references name the same stream on the same server
    pub fn same_stream(&self, other: &StreamRef) -> bool {
        self.server_url == other.server_url && self.stream_id == other.stream_id
    }
}

impl FromStr for StreamRef {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stream_url())
    }
}

/// Input typed into the "add stream" search box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamQuery {
    /// A pasted stream URL
    Url(StreamRef),
    /// Free text to search the account's streams with
    Search(String),
}

impl StreamQuery {
    /// URLs are recognised by containing `http` and at least three `/`-separated parts
    pub fn parse(query: &str) -> Result<Self> {
        let query = query.trim();
        if query.contains("http") && query.split('/').count() >= 3 {
            StreamRef::parse(query).map(StreamQuery::Url)
        } else {
            Ok(StreamQuery::Search(query.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_only() {
        let r = StreamRef::parse("https://speckle.xyz/streams/3073b96e86").unwrap();
        assert_eq!(r.server_url, "https://speckle.xyz");
        assert_eq!(r.stream_id, "3073b96e86");
        assert_eq!(r.target, StreamTarget::Stream);
        assert_eq!(r.stream_url(), "https://speckle.xyz/streams/3073b96e86");
    }

    #[test]
    fn test_parse_targets() {
        let branch = StreamRef::parse("http://localhost:3000/streams/abc/branches/site/massing").unwrap();
        assert_eq!(branch.server_url, "http://localhost:3000");
        assert_eq!(branch.target, StreamTarget::Branch("site/massing".to_string()));
        assert_eq!(
            branch.stream_url(),
            "http://localhost:3000/streams/abc/branches/site/massing"
        );

        let commit = StreamRef::parse("https://speckle.xyz/streams/abc/commits/604bea8cc6").unwrap();
        assert_eq!(commit.target, StreamTarget::Commit("604bea8cc6".to_string()));

        let object = StreamRef::parse("https://speckle.xyz/streams/abc/objects/ff00").unwrap();
        assert_eq!(object.target, StreamTarget::Object("ff00".to_string()));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(StreamRef::parse("not a url").is_err());
        assert!(StreamRef::parse("ftp://speckle.xyz/streams/abc").is_err());
        assert!(StreamRef::parse("https://speckle.xyz/projects/abc").is_err());
        assert!(StreamRef::parse("https://speckle.xyz/streams/").is_err());
        assert!(StreamRef::parse("https://speckle.xyz/streams/abc/globals/x").is_err());
    }

    #[test]
    fn test_same_stream_ignores_target() {
        let a = StreamRef::parse("https://speckle.xyz/streams/abc").unwrap();
        let b = StreamRef::parse("https://speckle.xyz/streams/abc/branches/main").unwrap();
        let c = StreamRef::parse("https://other.xyz/streams/abc").unwrap();
        assert!(a.same_stream(&b));
        assert!(!a.same_stream(&c));
    }

    #[test]
    fn test_query_parse() {
        assert!(matches!(
            StreamQuery::parse("https://speckle.xyz/streams/abc").unwrap(),
            StreamQuery::Url(_)
        ));
        assert_eq!(
            StreamQuery::parse("  site model ").unwrap(),
            StreamQuery::Search("site model".to_string())
        );
        assert!(StreamQuery::parse("https://speckle.xyz/nothing/here").is_err());
    }
}
