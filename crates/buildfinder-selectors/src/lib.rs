//! `CandidateSelector` — picks the single "best" build from a ranked
//! candidate list per checksum (spec.md §4.4).
//!
//! Two independent selectors exist because KOJI and PNC expose different
//! candidate shapes: [`select_koji_candidate`] ranks by cache membership,
//! completeness, tags, and import status; [`select_pnc_candidate`] ranks by
//! [`buildfinder_model::PncQuality`] score.

use buildfinder_model::{BuildState, PncQuality};

/// One KOJI candidate build as seen by the selector: just enough shape to
/// apply the spec.md §4.4 tie-break rules, not the full [`buildfinder_model::Build`].
#[derive(Debug, Clone, Copy)]
pub struct KojiCandidate<'a> {
    pub id: i64,
    pub state: BuildState,
    pub tags: &'a [String],
    pub is_import: bool,
}

/// Which spec.md §4.4 rule produced a [`Selection`], for logging/testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    /// Rule 1: a candidate id is already present in the output map.
    AlreadyCached,
    /// Rule 2a: complete, tagged, not an import.
    CompleteTaggedNotImport,
    /// Rule 2b: complete and tagged (import status ignored).
    CompleteTagged,
    /// Rule 2c: complete, no tagged/non-import candidate existed.
    CompleteHighestId,
    /// Rule 3: no complete candidate existed; highest id overall (a warning
    /// condition per spec.md §4.4).
    FallbackHighestId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub chosen_id: i64,
    pub rule: SelectionRule,
}

/// Apply spec.md §4.4's KOJI tie-break rules.
///
/// `already_resolved` reports whether a candidate id is already a key in the
/// Resolver's output map (rule 1 pre-empts every other rule). `candidates`
/// need not be pre-sorted; the highest id within whichever subset a rule
/// selects is always taken.
///
/// # Panics
///
/// Never panics; returns `None` only when `candidates` is empty.
pub fn select_koji_candidate(
    candidates: &[KojiCandidate<'_>],
    already_resolved: impl Fn(i64) -> bool,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let cached: Vec<_> = candidates.iter().filter(|c| already_resolved(c.id)).collect();
    if let Some(max) = cached.iter().map(|c| c.id).max() {
        return Some(Selection {
            chosen_id: max,
            rule: SelectionRule::AlreadyCached,
        });
    }

    let complete: Vec<_> = candidates
        .iter()
        .filter(|c| matches!(c.state, BuildState::Complete))
        .collect();

    if !complete.is_empty() {
        let tagged_not_import: Vec<_> = complete
            .iter()
            .filter(|c| !c.tags.is_empty() && !c.is_import)
            .collect();
        if let Some(max) = tagged_not_import.iter().map(|c| c.id).max() {
            return Some(Selection {
                chosen_id: max,
                rule: SelectionRule::CompleteTaggedNotImport,
            });
        }

        let tagged: Vec<_> = complete.iter().filter(|c| !c.tags.is_empty()).collect();
        if let Some(max) = tagged.iter().map(|c| c.id).max() {
            return Some(Selection {
                chosen_id: max,
                rule: SelectionRule::CompleteTagged,
            });
        }

        let max = complete.iter().map(|c| c.id).max().expect("complete is non-empty");
        return Some(Selection {
            chosen_id: max,
            rule: SelectionRule::CompleteHighestId,
        });
    }

    let max = candidates.iter().map(|c| c.id).max().expect("candidates is non-empty");
    tracing::warn!(
        chosen_id = max,
        "no complete candidate among {} builds; falling back to highest id",
        candidates.len()
    );
    Some(Selection {
        chosen_id: max,
        rule: SelectionRule::FallbackHighestId,
    })
}

/// One PNC candidate artifact as seen by the selector (spec.md §4.4).
#[derive(Debug, Clone, Copy)]
pub struct PncCandidate {
    pub artifact_id: i64,
    pub quality: PncQuality,
    pub has_build_record: bool,
}

/// Apply spec.md §4.4's PNC tie-break: greatest quality score, then "has at
/// least one build record id", then first-in-list.
#[must_use]
pub fn select_pnc_candidate(candidates: &[PncCandidate]) -> Option<i64> {
    candidates
        .iter()
        .enumerate()
        .max_by_key(|(index, c)| {
            // Negate index so "first in list" wins ties (max_by_key keeps the
            // *last* max on equal keys, so we invert position to prefer the
            // earliest one deterministically).
            (c.quality.score(), c.has_build_record, std::cmp::Reverse(*index))
        })
        .map(|(_, c)| c.artifact_id)
}
