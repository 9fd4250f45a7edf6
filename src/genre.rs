/// The genre module turns playlist membership into genre tags.
///
/// Every word of every playlist a track belongs to becomes a lower-cased genre token. Tokens
/// already on the file are kept, configured removals are dropped from both sides, and the result
/// is written back sorted so that an unchanged input always produces a byte-identical tag.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRules {
    /// Substring replacements applied to playlist names before tokenizing, in key order.
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
    /// Tokens that are never written, and are stripped from files that already carry them.
    #[serde(default)]
    pub removals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreDiff {
    pub current: BTreeSet<String>,
    pub target: BTreeSet<String>,
    /// Tokens stripped from the current genre by a removal rule.
    pub removed: BTreeSet<String>,
    /// Tokens dropped from the playlist derived target by a removal rule.
    pub suppressed: BTreeSet<String>,
    pub genre: String,
    pub changed: bool,
}

impl GenreDiff {
    pub fn compute<S: AsRef<str>>(current_genre: &str, playlist_names: &[S], rules: &GenreRules) -> GenreDiff {
        let removals: BTreeSet<String> = rules.removals.iter().map(|r| r.to_lowercase()).collect();

        let mut target = BTreeSet::new();
        for name in playlist_names {
            let name = apply_replacements(name.as_ref(), &rules.replacements);
            target.extend(tokenize(&name));
        }
        let mut current = tokenize(current_genre);

        let suppressed: BTreeSet<String> = target.intersection(&removals).cloned().collect();
        let removed: BTreeSet<String> = current.intersection(&removals).cloned().collect();
        target.retain(|t| !removals.contains(t));
        current.retain(|t| !removals.contains(t));

        let merged: Vec<&str> = current.union(&target).map(String::as_str).collect();
        let serialized = merged.join(" ");
        let changed = serialized != current_genre || !removed.is_empty();

        GenreDiff {
            genre: if changed { serialized } else { current_genre.to_string() },
            changed,
            current,
            target,
            removed,
            suppressed,
        }
    }

    /// Tokens the playlists contribute that the file did not already carry.
    pub fn added(&self) -> Vec<&str> {
        self.target.difference(&self.current).map(String::as_str).collect()
    }
}

/// Computes the genre tag a file should carry given its current genre and the names of the
/// playlists it belongs to. Returns the new genre and whether it differs from the current one.
pub fn reconcile<S: AsRef<str>>(current_genre: &str, playlist_names: &[S], rules: &GenreRules) -> (String, bool) {
    let diff = GenreDiff::compute(current_genre, playlist_names, rules);
    (diff.genre, diff.changed)
}

pub fn tokenize(s: &str) -> BTreeSet<String> {
    s.split(' ').map(|part| part.trim().to_lowercase()).filter(|part| !part.is_empty()).collect()
}

fn apply_replacements(name: &str, replacements: &BTreeMap<String, String>) -> String {
    let mut name = name.to_string();
    for (needle, replacement) in replacements {
        if needle.is_empty() {
            continue;
        }
        name = name.replace(needle.as_str(), replacement);
    }
    name
}
