use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,
    #[error("invalid character {ch:?} in version {input:?}")]
    InvalidChar { input: String, ch: char },
    #[error("empty segment in version {0:?}")]
    EmptySegment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    /// 去掉前导 0 的数字串，`0` 存为空串；长度不受整数宽度限制
    Number(String),
    /// 统一小写存储，比较时大小写不敏感
    Text(String),
}

impl Segment {
    fn compare(&self, other: &Segment) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            // 文本段（alpha/beta/SNAPSHOT）总是低于任何数字段
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        }
    }
}

static PAD: Segment = Segment::Number(String::new());

/// 点分版本号（插件版本 / 平台版本共用）
///
/// 比较规则：
/// - 分隔符 `.` `-` `_` 以及数字/字母交界处切段
/// - 数字段按数值比较，文本段按小写字典序比较，文本段 < 数字段
/// - 缺失段视为 `0`，因此 `1.0 == 1.0.0`，`1.0-beta < 1.0 < 1.0.1`
///
/// 排序是全序，`Eq`/`Hash` 与 `Ord` 一致（内部段序列去掉了尾部的 0）。
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '.' | '-' | '_')))
        {
            return Err(VersionError::InvalidChar {
                input: raw.to_string(),
                ch,
            });
        }

        let mut segments = Vec::new();
        for token in raw.split(['.', '-', '_']) {
            if token.is_empty() {
                return Err(VersionError::EmptySegment(raw.to_string()));
            }
            split_token(token, &mut segments);
        }

        while segments.last() == Some(&PAD) {
            segments.pop();
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// 原始文本（用于展示与目录名）
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 新版本在前的比较器
    pub fn descending(a: &Version, b: &Version) -> Ordering {
        b.cmp(a)
    }
}

/// 把 `10beta2` 这类 token 按数字/字母交界继续切开
fn split_token(token: &str, out: &mut Vec<Segment>) {
    let bytes = token.as_bytes();
    let mut start = 0usize;
    while start < bytes.len() {
        let numeric = bytes[start].is_ascii_digit();
        let mut end = start + 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() == numeric {
            end += 1;
        }
        let part = &token[start..end];
        if numeric {
            out.push(Segment::Number(part.trim_start_matches('0').to_string()));
        } else {
            out.push(Segment::Text(part.to_ascii_lowercase()));
        }
        start = end;
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&PAD);
            let b = other.segments.get(i).unwrap_or(&PAD);
            match a.compare(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
