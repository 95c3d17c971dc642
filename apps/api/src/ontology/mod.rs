//! Skill Ontology — static equivalence graph used for inexact skill matching.
//!
//! Three tiers of decreasing strength:
//! - exact: synonyms of the canonical key ("reactjs" ≡ "react")
//! - similar: near-equivalents that share an entry's `key ∪ exact ∪ similar` closure;
//!   synonyms inherit every closure their canonical entry's key or exact names sit in
//! - related: inferable skills reached through an entry's `related` set, directly or
//!   through one hop into another entry's full variant set
//!
//! Matching is case- and whitespace-insensitive only. No stemming, no edit distance.
//! Callers check `is_similar` before `is_related`; the two never both hold for a pair.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

mod table;

pub use table::SKILL_ONTOLOGY;

/// Variants and inputs shorter than this never take part in substring resolution.
const MIN_SUBSTRING_LEN: usize = 2;

/// One ontology entry keyed by its canonical skill name.
#[derive(Debug)]
pub struct SkillRelation {
    pub key: &'static str,
    pub exact: &'static [&'static str],
    pub similar: &'static [&'static str],
    pub related: &'static [&'static str],
}

impl SkillRelation {
    /// `key ∪ exact ∪ similar`, the set that defines similarity.
    fn closure(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.key)
            .chain(self.exact.iter().copied())
            .chain(self.similar.iter().copied())
    }

    /// Every string the entry mentions.
    fn variants(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.closure().chain(self.related.iter().copied())
    }
}

/// Strength of a skill-to-skill match, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Similar,
    Related,
}

/// Which of an entry's sets a lookup hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitSet {
    Exact,
    Similar,
    Related,
}

struct OntologyIndex {
    /// normalized key/exact string → first declaring entry, for step (a) of resolution
    exact: HashMap<String, usize>,
    /// normalized string → entries whose `key ∪ exact ∪ similar` names it literally
    closure: HashMap<String, BTreeSet<usize>>,
    /// per entry: every entry whose closure names one of its `key ∪ exact` synonyms
    synonyms: Vec<BTreeSet<usize>>,
    /// similarity entries precomputed for every string the ontology mentions
    similar: HashMap<String, BTreeSet<usize>>,
}

impl OntologyIndex {
    /// Literal closure membership, widened by resolution: a skill that resolves
    /// through an entry's synonyms shares every closure those synonyms belong to,
    /// one that resolves through `similar` joins that entry only, and one that
    /// resolves through `related` gains nothing.
    fn entries_for(&self, normalized: &str) -> BTreeSet<usize> {
        let mut ids = self.closure.get(normalized).cloned().unwrap_or_default();
        match lookup_in(&self.exact, normalized) {
            Some((i, HitSet::Exact)) => ids.extend(self.synonyms[i].iter().copied()),
            Some((i, HitSet::Similar)) => {
                ids.insert(i);
            }
            Some((_, HitSet::Related)) | None => {}
        }
        ids
    }
}

fn index() -> &'static OntologyIndex {
    static INDEX: OnceLock<OntologyIndex> = OnceLock::new();
    INDEX.get_or_init(build_index)
}

fn build_index() -> OntologyIndex {
    let mut exact: HashMap<String, usize> = HashMap::new();
    let mut closure: HashMap<String, BTreeSet<usize>> = HashMap::new();
    for (i, entry) in SKILL_ONTOLOGY.iter().enumerate() {
        for name in std::iter::once(entry.key).chain(entry.exact.iter().copied()) {
            exact.entry(normalize_skill(name)).or_insert(i);
        }
        for name in entry.closure() {
            closure.entry(normalize_skill(name)).or_default().insert(i);
        }
    }

    let synonyms = SKILL_ONTOLOGY
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut ids = BTreeSet::from([i]);
            for name in std::iter::once(entry.key).chain(entry.exact.iter().copied()) {
                if let Some(holders) = closure.get(&normalize_skill(name)) {
                    ids.extend(holders.iter().copied());
                }
            }
            ids
        })
        .collect();

    let mut index = OntologyIndex {
        exact,
        closure,
        synonyms,
        similar: HashMap::new(),
    };

    let mut similar: HashMap<String, BTreeSet<usize>> = HashMap::new();
    for name in SKILL_ONTOLOGY.iter().flat_map(|e| e.variants()) {
        let normalized = normalize_skill(name);
        if !similar.contains_key(&normalized) {
            let ids = index.entries_for(&normalized);
            similar.insert(normalized, ids);
        }
    }
    index.similar = similar;
    index
}

/// Trims, lowercases, and collapses inner whitespace.
pub fn normalize_skill(skill: &str) -> String {
    skill
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True if `needle` occurs in `haystack` delimited by non-alphanumeric characters
/// (or the string ends). "react" is a term of "react developer" and of "react.js",
/// "java" is not a term of "javascript".
pub fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Finds the ontology entry for a skill.
///
/// (a) canonical key or `exact` member, first declared entry wins;
/// (b) otherwise a substring match in either direction against any variant in
///     `key ∪ exact ∪ similar ∪ related`. Entries are visited in declaration order
///     and the first entry with a hit wins. Substrings are term-bounded, so `java`
///     is not found in `javascript`.
pub fn resolve(skill: &str) -> Option<&'static SkillRelation> {
    lookup(&normalize_skill(skill)).map(|(i, _)| &SKILL_ONTOLOGY[i])
}

fn lookup(normalized: &str) -> Option<(usize, HitSet)> {
    lookup_in(&index().exact, normalized)
}

fn lookup_in(exact: &HashMap<String, usize>, normalized: &str) -> Option<(usize, HitSet)> {
    if normalized.is_empty() {
        return None;
    }
    if let Some(first) = exact.get(normalized) {
        return Some((*first, HitSet::Exact));
    }
    if normalized.len() < MIN_SUBSTRING_LEN {
        return None;
    }

    let overlaps = |variant: &str| {
        variant.len() >= MIN_SUBSTRING_LEN
            && (contains_term(normalized, variant) || contains_term(variant, normalized))
    };

    SKILL_ONTOLOGY.iter().enumerate().find_map(|(i, entry)| {
        let hit = if std::iter::once(entry.key)
            .chain(entry.exact.iter().copied())
            .any(overlaps)
        {
            HitSet::Exact
        } else if entry.similar.iter().copied().any(overlaps) {
            HitSet::Similar
        } else if entry.related.iter().copied().any(overlaps) {
            HitSet::Related
        } else {
            return None;
        };
        Some((i, hit))
    })
}

/// Every ontology string that occurs as a whole term of `text`, in declaration order.
pub fn terms_in(text: &str) -> Vec<&'static str> {
    let text = normalize_skill(text);
    let mut found: Vec<&'static str> = Vec::new();
    for variant in SKILL_ONTOLOGY.iter().flat_map(|e| e.variants()) {
        if variant.len() >= MIN_SUBSTRING_LEN
            && !found.contains(&variant)
            && contains_term(&text, variant)
        {
            found.push(variant);
        }
    }
    found
}

/// Entries whose similarity closure holds the skill or one of its synonyms.
fn similar_entries(normalized: &str) -> BTreeSet<usize> {
    if normalized.is_empty() {
        return BTreeSet::new();
    }
    let index = index();
    match index.similar.get(normalized) {
        Some(ids) => ids.clone(),
        None => index.entries_for(normalized),
    }
}

fn similar_to(candidate: &str, target: &str, target_entries: &BTreeSet<usize>) -> bool {
    let candidate = normalize_skill(candidate);
    candidate == target || !similar_entries(&candidate).is_disjoint(target_entries)
}

/// True when the two skills are the same after normalization or share a similarity
/// closure. Symmetric in its arguments.
pub fn is_similar(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_skill(a), normalize_skill(b));
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na == nb || !similar_entries(&na).is_disjoint(&similar_entries(&nb))
}

/// True when one skill is named in the other's related set, or when both reach a
/// shared entry through their related sets. Never true for a similar pair.
pub fn is_related(a: &str, b: &str) -> bool {
    if is_similar(a, b) {
        return false;
    }
    let (na, nb) = (normalize_skill(a), normalize_skill(b));
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    related_one_way(&na, &nb) || related_one_way(&nb, &na)
}

fn related_one_way(from: &str, to: &str) -> bool {
    let to_entries = similar_entries(to);
    for i in similar_entries(from) {
        for related in SKILL_ONTOLOGY[i].related {
            if similar_to(related, to, &to_entries) {
                return true;
            }
            // one hop: the related skill's own entry mentions `to` anywhere
            for hop in similar_entries(&normalize_skill(related)) {
                if hop == i {
                    continue;
                }
                if SKILL_ONTOLOGY[hop]
                    .variants()
                    .any(|variant| similar_to(variant, to, &to_entries))
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Strongest tier at which two skills match, checking similar before related.
pub fn classify(a: &str, b: &str) -> Option<MatchTier> {
    let (na, nb) = (normalize_skill(a), normalize_skill(b));
    if na.is_empty() || nb.is_empty() {
        None
    } else if na == nb {
        Some(MatchTier::Exact)
    } else if is_similar(&na, &nb) {
        Some(MatchTier::Similar)
    } else if is_related(&na, &nb) {
        Some(MatchTier::Related)
    } else {
        None
    }
}
