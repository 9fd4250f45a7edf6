/// The comment module parses and formats the structured comment we keep in the comment tag of
/// every file: an optional harmonic key and energy annotation, a star rating bar, and whatever
/// free text is left over.
///
/// ```text
/// 6A - Energy 2 - ★★★☆☆ - Free text
/// ```
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const FULL_GLYPH: char = '★';
pub const EMPTY_GLYPH: char = '☆';
pub const MAX_RATING: u32 = 5;

const SEPARATOR: &str = " - ";

static KEY_ENERGY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(([0-9]{1,2}[AB])/?([0-9]{1,2}[AB])?|All) - Energy [0-9]{1,2}\s?-?\s?").unwrap());

// A lone glyph is free text.
static RATING_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[★☆]{2,5}\s?-?\s?").unwrap());

// One whitespace separated token, e.g. 0000041A or 0000000001398B2B.
static GARBAGE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-F0-9]{8,16}$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub key: String,
    pub energy: String,
    pub comment: String,
    pub rating: u32,
}

impl Comment {
    /// Parses a raw comment tag. Anything that doesn't match the grammar ends up in the free text
    /// comment, so this never fails.
    pub fn parse(raw: &str) -> Comment {
        let mut comment = Comment::default();

        let prefix = KEY_ENERGY_REGEX.find(raw).map(|m| m.as_str()).unwrap_or("");
        let parts: Vec<&str> = trim_separators_end(prefix).split(SEPARATOR).collect();
        if let [key, energy] = parts.as_slice() {
            comment.key = key.to_string();
            comment.energy = energy.to_string();
        }
        let rest = &raw[prefix.len()..];

        // The separator trailing the run never holds a glyph, so counting over the whole match is
        // the same as counting over the run.
        let (run, remainder) = match RATING_RUN_REGEX.find(rest) {
            Some(m) => (m.as_str(), format!("{}{}", &rest[..m.start()], &rest[m.end()..])),
            None => ("", rest.to_string()),
        };
        comment.rating = run.chars().filter(|c| *c == FULL_GLYPH).count() as u32;
        comment.comment = trim_separators(&remainder).to_string();

        tracing::trace!("Parsed comment raw={:?} as {:?}", raw, comment);
        comment
    }

    /// Renders the comment back into its tag form: `[Key - Energy][ - Rating][ - Comment]`.
    ///
    /// A rating of 0 or above [`MAX_RATING`] renders no bar at all.
    pub fn format(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if !self.key.is_empty() && !self.energy.is_empty() {
            parts.push(self.key.clone());
            parts.push(self.energy.clone());
        }
        if let Some(bar) = rating_bar(self.rating) {
            parts.push(bar);
        }
        let text = trim_separators(&self.comment);
        if !text.is_empty() {
            parts.push(text.to_string());
        }
        parts.join(SEPARATOR)
    }

    /// Removes every occurrence of each of the supplied strings from the free text.
    pub fn filter<S: AsRef<str>>(&mut self, removals: &[S]) {
        for removal in removals {
            let removal = removal.as_ref();
            if removal.is_empty() {
                continue;
            }
            self.comment = self.comment.replace(removal, "");
        }
    }

    /// Removes the runs of hex encoded numbers some encoders dump into the comment tag. Only whole
    /// tokens are removed; the remaining words are rejoined with single spaces.
    pub fn remove_garbage(&mut self) {
        let tokens: Vec<&str> = self.comment.split_whitespace().collect();
        let kept: Vec<&str> = tokens.iter().copied().filter(|t| !GARBAGE_TOKEN_REGEX.is_match(t)).collect();
        if kept.len() != tokens.len() {
            self.comment = kept.join(" ");
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

pub fn rating_bar(rating: u32) -> Option<String> {
    if rating == 0 || rating > MAX_RATING {
        return None;
    }
    let mut bar = String::new();
    bar.extend(std::iter::repeat(FULL_GLYPH).take(rating as usize));
    bar.extend(std::iter::repeat(EMPTY_GLYPH).take((MAX_RATING - rating) as usize));
    Some(bar)
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '-')
}

fn trim_separators_end(s: &str) -> &str {
    s.trim_end_matches(|c| c == ' ' || c == '-')
}
