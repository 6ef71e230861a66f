use std::fmt;
use std::ops::RangeInclusive;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::app::MoveDetail;
use crate::entities::{dance_move, tag};
use crate::model::TagMatch;

/// Upper bound for any generated combo, whatever length was asked for.
pub const MAX_COMBO_LENGTH: usize = 10;

/// Length drawn when a random combo is requested without an explicit length.
pub const RANDOM_LENGTH_RANGE: RangeInclusive<usize> = 2..=5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("no moves match the selected tags")]
    EmptyPool,
    #[error("combo length must be at least 1")]
    ZeroLength,
    #[error("structured generation requires at least one tag")]
    EmptySequence,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateWarning {
    LengthClamped { requested: usize, max: usize },
    PoolTooSmall { requested: usize, available: usize },
    SlotSkipped { position: usize, tag: String },
}

impl fmt::Display for GenerateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthClamped { requested, max } => {
                write!(f, "requested length {requested} clamped to maximum {max}")
            }
            Self::PoolTooSmall {
                requested,
                available,
            } => write!(
                f,
                "only {available} distinct moves available (requested {requested}); allow repeats for longer combos"
            ),
            Self::SlotSkipped { position, tag } => {
                write!(f, "slot {position} skipped: no move tagged '{tag}'")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RandomRequest {
    pub length: Option<usize>,
    pub allow_repeats: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GeneratedCombo {
    pub moves: Vec<dance_move::Model>,
    pub warnings: Vec<GenerateWarning>,
}

impl GeneratedCombo {
    pub fn move_ids(&self) -> Vec<i64> {
        self.moves.iter().map(|item| item.id).collect()
    }
}

/// Narrows the catalog to the moves carrying the selected tags. Tag names
/// compare case-insensitively; an empty selection keeps every move.
pub fn filter_pool(
    moves: &[MoveDetail],
    selected: &[String],
    tag_match: TagMatch,
) -> Vec<dance_move::Model> {
    let wanted = normalize_tag_names(selected);
    moves
        .iter()
        .filter(|detail| carries_tags(&detail.tags, &wanted, tag_match))
        .map(|detail| detail.dance_move.clone())
        .collect()
}

/// `wanted` holds lowercased names. An empty `wanted` matches everything.
pub fn carries_tags(tags: &[tag::Model], wanted: &[String], tag_match: TagMatch) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let names: Vec<String> = tags.iter().map(|tag| tag.name.to_lowercase()).collect();
    match tag_match {
        TagMatch::Any => wanted.iter().any(|name| names.contains(name)),
        TagMatch::All => wanted.iter().all(|name| names.contains(name)),
    }
}

pub fn normalize_tag_names(selected: &[String]) -> Vec<String> {
    selected
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn generate_random<R: Rng>(
    pool: &[dance_move::Model],
    request: &RandomRequest,
    rng: &mut R,
) -> Result<GeneratedCombo, GenerateError> {
    if pool.is_empty() {
        return Err(GenerateError::EmptyPool);
    }

    let mut warnings = Vec::new();
    let mut length = match request.length {
        Some(0) => return Err(GenerateError::ZeroLength),
        Some(requested) if requested > MAX_COMBO_LENGTH => {
            warnings.push(GenerateWarning::LengthClamped {
                requested,
                max: MAX_COMBO_LENGTH,
            });
            MAX_COMBO_LENGTH
        }
        Some(requested) => requested,
        None => rng.random_range(RANDOM_LENGTH_RANGE),
    };

    let moves = if request.allow_repeats {
        let mut picked = Vec::with_capacity(length);
        for _ in 0..length {
            if let Some(item) = pool.choose(rng) {
                picked.push(item.clone());
            }
        }
        picked
    } else {
        if length > pool.len() {
            warnings.push(GenerateWarning::PoolTooSmall {
                requested: length,
                available: pool.len(),
            });
            length = pool.len();
        }
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(rng);
        shuffled.truncate(length);
        shuffled
    };

    debug!(
        pool = pool.len(),
        length = moves.len(),
        repeats = request.allow_repeats,
        "generated random combo"
    );
    Ok(GeneratedCombo { moves, warnings })
}

/// Fills one slot per tag, in order. A slot whose tag matches no move is
/// left out of the result rather than filled with some other move.
pub fn generate_structured<R: Rng>(
    moves: &[MoveDetail],
    sequence: &[String],
    rng: &mut R,
) -> Result<GeneratedCombo, GenerateError> {
    if sequence.is_empty() {
        return Err(GenerateError::EmptySequence);
    }

    let mut warnings = Vec::new();
    let slots = if sequence.len() > MAX_COMBO_LENGTH {
        warnings.push(GenerateWarning::LengthClamped {
            requested: sequence.len(),
            max: MAX_COMBO_LENGTH,
        });
        &sequence[..MAX_COMBO_LENGTH]
    } else {
        sequence
    };

    let mut picked = Vec::with_capacity(slots.len());
    for (idx, tag_name) in slots.iter().enumerate() {
        let wanted = tag_name.trim().to_lowercase();
        let candidates: Vec<&dance_move::Model> = moves
            .iter()
            .filter(|detail| {
                detail
                    .tags
                    .iter()
                    .any(|tag| tag.name.to_lowercase() == wanted)
            })
            .map(|detail| &detail.dance_move)
            .collect();
        match candidates.choose(rng) {
            Some(item) => picked.push((*item).clone()),
            None => warnings.push(GenerateWarning::SlotSkipped {
                position: idx + 1,
                tag: tag_name.clone(),
            }),
        }
    }

    debug!(
        slots = slots.len(),
        length = picked.len(),
        "generated structured combo"
    );
    Ok(GeneratedCombo {
        moves: picked,
        warnings,
    })
}
