//! Path (+ optional method) rules that bypass authentication.
//!
//! Pattern syntax, segment-wise:
//! - literal segment: must match exactly
//! - `*`: exactly one segment
//! - `**`: any remaining suffix, including none (last segment only)
//!
//! Empty segments are ignored on both sides, so `/a//b/` behaves like `/a/b`.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0}")]
    NotAbsolute(String),
    #[error("'**' is only allowed as the last segment: {0}")]
    InnerMultiWildcard(String),
    #[error("unsupported wildcard in segment '{segment}' of {pattern}")]
    PartialWildcard { pattern: String, segment: String },
    #[error("invalid http method: {0}")]
    InvalidMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    open_suffix: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }

        let parts: Vec<&str> = path_segments(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut open_suffix = false;

        for (i, part) in parts.iter().enumerate() {
            match *part {
                "**" if i + 1 == parts.len() => open_suffix = true,
                "**" => return Err(PatternError::InnerMultiWildcard(pattern.to_string())),
                "*" => segments.push(Segment::Any),
                p if p.contains('*') => {
                    return Err(PatternError::PartialWildcard {
                        pattern: pattern.to_string(),
                        segment: p.to_string(),
                    });
                }
                p => segments.push(Segment::Literal(p.to_string())),
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
            open_suffix,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut path = path_segments(path);

        for segment in &self.segments {
            let Some(actual) = path.next() else {
                return false;
            };
            if let Segment::Literal(expected) = segment {
                if expected != actual {
                    return false;
                }
            }
        }

        self.open_suffix || path.next().is_none()
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A bypass rule. `method: None` means any method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistRule {
    pub pattern: PathPattern,
    pub method: Option<Method>,
}

impl WhitelistRule {
    pub fn any_method(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method: None,
        })
    }

    pub fn with_method(method: Method, pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method: Some(method),
        })
    }

    pub fn matches(&self, path: &str, method: &Method) -> bool {
        if let Some(required) = &self.method {
            if required != method {
                return false;
            }
        }
        self.pattern.matches(path)
    }
}

/// `"/path"` or `"METHOD /path"`. Methods must be written in uppercase.
impl FromStr for WhitelistRule {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(char::is_whitespace) {
            Some((method, pattern)) => {
                if method.is_empty() || method.chars().any(|c| !c.is_ascii_uppercase()) {
                    return Err(PatternError::InvalidMethod(method.to_string()));
                }
                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|_| PatternError::InvalidMethod(method.to_string()))?;
                Self::with_method(method, pattern.trim())
            }
            None => Self::any_method(s),
        }
    }
}

impl fmt::Display for WhitelistRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{} {}", method, self.pattern.as_str()),
            None => f.write_str(self.pattern.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WhitelistMatcher {
    rules: Vec<WhitelistRule>,
}

impl WhitelistMatcher {
    pub fn new(rules: Vec<WhitelistRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[WhitelistRule] {
        &self.rules
    }

    pub fn matches(&self, path: &str, method: &Method) -> bool {
        self.rules.iter().any(|rule| rule.matches(path, method))
    }
}
