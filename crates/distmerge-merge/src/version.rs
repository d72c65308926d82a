//! Game version identifiers and the compatibility thresholds between them.
//!
//! Releases and weekly snapshots use unrelated numbering, so a threshold
//! names both forms of the same point in history: the first snapshot of a
//! release cycle and the release it led to.

use std::str::FromStr;

use crate::error::MergeError;

/// A parsed version identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameVersion {
    /// Pre-classic, classic, indev, infdev, alpha or beta builds.
    Legacy(String),
    /// `1.x[.y]`, or year-based `26.1[.y]`, optionally a pre-release of it.
    Release {
        major: u32,
        minor: u32,
        patch: u32,
        pre: Option<PreRelease>,
    },
    /// Weekly snapshot `YYwWWs`.
    Snapshot { year: u32, week: u32, tag: String },
}

/// Pre-release stages of a release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreRelease {
    Snapshot(u32),
    Pre(u32),
    ReleaseCandidate(u32),
}

/// A point in history expressed in both numbering schemes.
#[derive(Clone, Copy, Debug)]
pub struct Threshold {
    /// First snapshot of the cycle: `(year, week, tag)`.
    pub snapshot: (u32, u32, &'static str),
    /// `(major, minor)` of the release the cycle produced.
    pub release: (u32, u32),
}

/// First 1.8 snapshot.
pub const MC_1_8: Threshold = Threshold {
    snapshot: (14, 2, "a"),
    release: (1, 8),
};

/// First 1.13 snapshot.
pub const MC_1_13: Threshold = Threshold {
    snapshot: (17, 43, "a"),
    release: (1, 13),
};

impl GameVersion {
    /// Whether this version is at or after `threshold`.
    pub fn reaches(&self, threshold: &Threshold) -> bool {
        match self {
            GameVersion::Legacy(_) => false,
            GameVersion::Release { major, minor, .. } => (*major, *minor) >= threshold.release,
            GameVersion::Snapshot { year, week, tag } => {
                let (t_year, t_week, t_tag) = threshold.snapshot;
                (*year, *week, tag.as_str()) >= (t_year, t_week, t_tag)
            }
        }
    }
}

fn number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_legacy(s: &str) -> Option<GameVersion> {
    let lower = s.to_ascii_lowercase();
    if ["rd-", "in-", "inf-", "c0.", "a1.", "b1."]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return Some(GameVersion::Legacy(s.to_string()));
    }
    None
}

fn parse_snapshot(s: &str) -> Option<GameVersion> {
    let (year, rest) = s.split_once('w')?;
    if year.len() != 2 || rest.len() < 3 {
        return None;
    }
    let (week, tag) = rest.split_at(2);
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_lowercase() || b == b'_') {
        return None;
    }
    Some(GameVersion::Snapshot {
        year: number(year)?,
        week: number(week)?,
        tag: tag.to_string(),
    })
}

fn parse_pre_release(lower: &str) -> Option<(&str, Option<PreRelease>)> {
    let stages: [(&str, fn(u32) -> PreRelease); 4] = [
        (" pre-release ", PreRelease::Pre),
        ("-snapshot-", PreRelease::Snapshot),
        ("-pre", PreRelease::Pre),
        ("-rc", PreRelease::ReleaseCandidate),
    ];
    for (marker, stage) in stages {
        if let Some((base, n)) = lower.split_once(marker) {
            return Some((base, Some(stage(number(n)?))));
        }
    }
    Some((lower, None))
}

fn parse_release(s: &str) -> Option<GameVersion> {
    let lower = s.to_ascii_lowercase();
    let (base, pre) = parse_pre_release(&lower)?;
    let parts: Vec<&str> = base.split('.').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let major = number(parts[0])?;
    if major == 0 {
        return None;
    }
    Some(GameVersion::Release {
        major,
        minor: number(parts[1])?,
        patch: match parts.get(2) {
            Some(p) => number(p)?,
            None => 0,
        },
        pre,
    })
}

impl FromStr for GameVersion {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        parse_legacy(s)
            .or_else(|| parse_snapshot(s))
            .or_else(|| parse_release(s))
            .ok_or_else(|| MergeError::InvalidVersion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> GameVersion {
        s.parse().unwrap()
    }

    #[test]
    fn parses_each_form() {
        assert_eq!(
            v("1.12.2"),
            GameVersion::Release {
                major: 1,
                minor: 12,
                patch: 2,
                pre: None
            }
        );
        assert_eq!(
            v("1.14 Pre-Release 3"),
            GameVersion::Release {
                major: 1,
                minor: 14,
                patch: 0,
                pre: Some(PreRelease::Pre(3))
            }
        );
        assert!(matches!(
            v("1.16-rc1"),
            GameVersion::Release {
                pre: Some(PreRelease::ReleaseCandidate(1)),
                ..
            }
        ));
        assert_eq!(
            v("17w43a"),
            GameVersion::Snapshot {
                year: 17,
                week: 43,
                tag: "a".into()
            }
        );
        assert!(matches!(v("b1.7.3"), GameVersion::Legacy(_)));
        assert!(matches!(v("rd-132211"), GameVersion::Legacy(_)));
        assert!(matches!(v("26.1"), GameVersion::Release { major: 26, .. }));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "banana", "1", "1.x", "17w4a", "0.5", "1.2.3.4", "1.14-pre"] {
            assert!(
                matches!(bad.parse::<GameVersion>(), Err(MergeError::InvalidVersion(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn thresholds_compare_within_each_numbering() {
        assert!(!v("1.7.10").reaches(&MC_1_8));
        assert!(v("1.8").reaches(&MC_1_8));
        assert!(v("1.8-pre1").reaches(&MC_1_8));
        assert!(!v("13w49a").reaches(&MC_1_8));
        assert!(v("14w02a").reaches(&MC_1_8));
        assert!(!v("17w18b").reaches(&MC_1_13));
        assert!(v("17w43b").reaches(&MC_1_13));
        assert!(v("24w14a").reaches(&MC_1_13));
        assert!(!v("a1.2.6").reaches(&MC_1_8));
    }
}
