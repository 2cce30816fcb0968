//! Fuzzy matching of free-text selections against offered candidates.

use similar::TextDiff;

/// Theme names are longer and more distinctive, so the bar is higher.
pub const THEME_MATCH_THRESHOLD: u8 = 80;
pub const ELEMENT_MATCH_THRESHOLD: u8 = 70;

/// Utterances shorter than this never match by being contained in a name.
const MIN_CONTAINED_LEN: usize = 3;

/// A candidate accepted by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch<'a> {
    pub candidate: &'a str,
    pub index: usize,
    pub score: u8,
}

/// Best-window similarity between two strings, 0-100.
///
/// The shorter string is compared against every equal-length character
/// window of the longer one with a character diff ratio; the best window
/// wins.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    if a_len == 0 || b_len == 0 {
        return 0;
    }
    let (short, long, width) = if a_len <= b_len { (a, b, a_len) } else { (b, a, b_len) };

    // Byte offset of every char boundary, so windows are plain slices.
    let bounds: Vec<usize> = long
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(long.len()))
        .collect();

    let mut best = 0.0_f32;
    for start in 0..bounds.len() - width {
        let window = &long[bounds[start]..bounds[start + width]];
        let ratio = TextDiff::from_chars(short, window).ratio();
        if ratio > best {
            best = ratio;
            if best >= 1.0 {
                break;
            }
        }
    }
    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Picks the candidate a user most plausibly meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    threshold: u8,
}

impl FuzzyMatcher {
    /// Accept scores strictly greater than `threshold`.
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn for_themes() -> Self {
        Self::new(THEME_MATCH_THRESHOLD)
    }

    pub fn for_elements() -> Self {
        Self::new(ELEMENT_MATCH_THRESHOLD)
    }

    pub fn best_match<'a>(&self, utterance: &str, candidates: &'a [String]) -> Option<FuzzyMatch<'a>> {
        self.best_match_by(utterance, candidates, partial_ratio)
    }

    /// Like [`best_match`](Self::best_match) with a custom similarity scorer.
    ///
    /// A case-insensitive exact name wins outright. Otherwise containment in
    /// either direction short-circuits with a score of 100, the longest
    /// contained name first. Remaining ties go to the earlier candidate.
    pub fn best_match_by<'a, F>(
        &self,
        utterance: &str,
        candidates: &'a [String],
        score: F,
    ) -> Option<FuzzyMatch<'a>>
    where
        F: Fn(&str, &str) -> u8,
    {
        let needle = utterance.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let lowered: Vec<String> = candidates.iter().map(|c| c.trim().to_lowercase()).collect();

        let exact = lowered.iter().position(|name| *name == needle);
        let contained = exact.or_else(|| {
            lowered
                .iter()
                .enumerate()
                .filter(|(_, name)| {
                    !name.is_empty()
                        && ((needle.chars().count() >= MIN_CONTAINED_LEN && name.contains(&needle))
                            || needle.contains(name.as_str()))
                })
                // Reversed so `max_by_key` keeps the earliest of equal lengths.
                .rev()
                .max_by_key(|(_, name)| name.chars().count())
                .map(|(index, _)| index)
        });
        if let Some(index) = contained {
            return Some(FuzzyMatch {
                candidate: &candidates[index],
                index,
                score: 100,
            });
        }

        let mut best: Option<FuzzyMatch<'a>> = None;
        for (index, name) in lowered.iter().enumerate() {
            let candidate_score = score(&needle, name);
            if best.map_or(true, |b| candidate_score > b.score) {
                best = Some(FuzzyMatch {
                    candidate: &candidates[index],
                    index,
                    score: candidate_score,
                });
            }
        }

        best.filter(|m| m.score > self.threshold)
    }
}
