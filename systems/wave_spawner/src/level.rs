//! Level definitions: weighted mob tables, wave schedule and special waves.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use deltaworld_core::MobKind;
use rand::{
    distributions::{Distribution, WeightedError, WeightedIndex},
    seq::SliceRandom,
    Rng,
};
use serde::Deserialize;
use thiserror::Error;

/// Extra parameter that overrides a mob's starting health.
const HP_EXTRA: &str = "hp";

/// Errors raised while loading or validating a level definition.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The level file could not be read.
    #[error("failed to read level file {path}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The level file is not valid TOML or misses a required table.
    #[error("failed to parse level definition")]
    Parse(#[from] toml::de::Error),
    /// A mob name is not registered.
    #[error("unknown mob `{0}`")]
    UnknownMob(String),
    /// The mob weights cannot form a distribution.
    #[error("invalid mob weights")]
    InvalidWeights(#[source] WeightedError),
    /// A wave names a special wave that is not defined.
    #[error("wave {wave} references undefined special wave `{name}`")]
    MissingSpecialWave {
        /// Index of the offending wave.
        wave: usize,
        /// Name that could not be resolved.
        name: String,
    },
    /// A special wave is defined but no wave uses it.
    #[error("special wave `{0}` is never referenced")]
    UnusedSpecialWave(String),
    /// A wave duration is negative or not finite.
    #[error("wave {wave} has an invalid duration")]
    InvalidDuration {
        /// Index of the offending wave.
        wave: usize,
    },
    /// A mob extra names an unsupported parameter.
    #[error("unsupported extra `{param}` for mob `{mob}`")]
    UnknownExtra {
        /// Mob the extra belongs to.
        mob: String,
        /// Parameter name.
        param: String,
    },
    /// A mob extra carries a value outside its valid range.
    #[error("invalid value {value} for extra `{param}` of mob `{mob}`")]
    InvalidExtra {
        /// Mob the extra belongs to.
        mob: String,
        /// Parameter name.
        param: String,
        /// Rejected value.
        value: i64,
    },
}

/// Signals that every wave of the level was already produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("level has no waves left after {waves} waves")]
pub struct WaveExhausted {
    /// Number of waves the level defines.
    pub waves: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLevel {
    mob_probabilities: BTreeMap<String, f64>,
    #[serde(default)]
    mob_extras: BTreeMap<String, BTreeMap<String, i64>>,
    waves: Vec<(RawSelector, f64)>,
    #[serde(default)]
    special_waves: BTreeMap<String, BTreeMap<String, u32>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Count(u32),
    Special(String),
}

/// Composition rule of one wave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaveSelector {
    /// Draw this many mobs from the weighted table.
    Random(u32),
    /// Spawn the named special composition.
    Special(String),
}

/// One entry of the wave schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveEntry {
    /// How the wave is composed.
    pub selector: WaveSelector,
    /// Time before the next wave starts.
    pub duration: Duration,
}

/// Validated level with a cursor over its waves.
#[derive(Clone, Debug)]
pub struct Level {
    mobs: Vec<MobKind>,
    weights: WeightedIndex<f64>,
    hp_overrides: BTreeMap<MobKind, u32>,
    waves: Vec<WaveEntry>,
    special_waves: BTreeMap<String, Vec<(MobKind, u32)>>,
    current_wave: usize,
}

impl Level {
    /// Reads and validates a level file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a level definition.
    pub fn from_toml_str(text: &str) -> Result<Self, LevelError> {
        let raw: RawLevel = toml::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawLevel) -> Result<Self, LevelError> {
        let mut mobs = Vec::with_capacity(raw.mob_probabilities.len());
        let mut weights = Vec::with_capacity(raw.mob_probabilities.len());
        for (name, weight) in &raw.mob_probabilities {
            mobs.push(resolve_mob(name)?);
            weights.push(*weight);
        }
        let weights = WeightedIndex::new(weights).map_err(LevelError::InvalidWeights)?;

        let mut hp_overrides = BTreeMap::new();
        for (name, extras) in &raw.mob_extras {
            let mob = resolve_mob(name)?;
            for (param, value) in extras {
                if param != HP_EXTRA {
                    return Err(LevelError::UnknownExtra {
                        mob: name.clone(),
                        param: param.clone(),
                    });
                }
                let hp = u32::try_from(*value)
                    .ok()
                    .filter(|hp| *hp > 0)
                    .ok_or_else(|| LevelError::InvalidExtra {
                        mob: name.clone(),
                        param: param.clone(),
                        value: *value,
                    })?;
                let _ = hp_overrides.insert(mob, hp);
            }
        }

        let mut special_waves = BTreeMap::new();
        for (name, composition) in &raw.special_waves {
            let mut resolved = Vec::with_capacity(composition.len());
            for (mob, count) in composition {
                resolved.push((resolve_mob(mob)?, *count));
            }
            let _ = special_waves.insert(name.clone(), resolved);
        }

        let mut referenced = BTreeSet::new();
        let mut waves = Vec::with_capacity(raw.waves.len());
        for (index, (selector, seconds)) in raw.waves.into_iter().enumerate() {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|_| LevelError::InvalidDuration { wave: index })?;
            let selector = match selector {
                RawSelector::Count(count) => WaveSelector::Random(count),
                RawSelector::Special(name) => {
                    if !special_waves.contains_key(&name) {
                        return Err(LevelError::MissingSpecialWave { wave: index, name });
                    }
                    let _ = referenced.insert(name.clone());
                    WaveSelector::Special(name)
                }
            };
            waves.push(WaveEntry { selector, duration });
        }

        if let Some(unused) = special_waves.keys().find(|name| !referenced.contains(*name)) {
            return Err(LevelError::UnusedSpecialWave(unused.clone()));
        }

        Ok(Self {
            mobs,
            weights,
            hp_overrides,
            waves,
            special_waves,
            current_wave: 0,
        })
    }

    /// Produces the mobs of the wave under the cursor and advances it.
    pub fn next_wave<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<MobKind>, WaveExhausted> {
        let entry = self.waves.get(self.current_wave).ok_or(WaveExhausted {
            waves: self.waves.len(),
        })?;

        let mobs = match &entry.selector {
            WaveSelector::Random(count) => (0..*count)
                .map(|_| self.mobs[self.weights.sample(rng)])
                .collect(),
            WaveSelector::Special(name) => {
                let mut mobs: Vec<MobKind> = self
                    .special_waves
                    .get(name)
                    .into_iter()
                    .flatten()
                    .flat_map(|(mob, count)| std::iter::repeat(*mob).take(*count as usize))
                    .collect();
                mobs.shuffle(rng);
                mobs
            }
        };

        self.current_wave += 1;
        Ok(mobs)
    }

    /// Index of the next wave to be produced.
    #[must_use]
    pub fn current_wave(&self) -> usize {
        self.current_wave
    }

    /// Number of waves in the schedule.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Schedule entry at `index`.
    #[must_use]
    pub fn wave(&self, index: usize) -> Option<&WaveEntry> {
        self.waves.get(index)
    }

    /// Moves the cursor back by `waves`, stopping at the first wave.
    pub fn rewind(&mut self, waves: usize) {
        self.current_wave = self.current_wave.saturating_sub(waves);
    }

    /// Starting health of `mob` in this level.
    #[must_use]
    pub fn hp_for(&self, mob: MobKind) -> u32 {
        self.hp_overrides
            .get(&mob)
            .copied()
            .unwrap_or_else(|| mob.base_hp())
    }
}

fn resolve_mob(name: &str) -> Result<MobKind, LevelError> {
    MobKind::from_name(name).ok_or_else(|| LevelError::UnknownMob(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extras_override_starting_health() {
        let level = Level::from_toml_str(
            r#"
            waves = [[2, 1.0]]

            [mob_probabilities]
            zombie = 1.0

            [mob_extras.zombie]
            hp = 3
            "#,
        )
        .expect("level is valid");

        assert_eq!(level.hp_for(MobKind::Zombie), 3);
        assert_eq!(level.wave_count(), 1);
    }

    #[test]
    fn negative_durations_are_rejected() {
        let error = Level::from_toml_str(
            r#"
            waves = [[2, -1.0]]

            [mob_probabilities]
            zombie = 1.0
            "#,
        )
        .expect_err("duration is invalid");

        assert!(matches!(error, LevelError::InvalidDuration { wave: 0 }));
    }

    #[test]
    fn rewind_stops_at_the_first_wave() {
        let mut level = Level::from_toml_str(
            r#"
            waves = [[1, 1.0], [1, 1.0], [1, 1.0]]

            [mob_probabilities]
            zombie = 1.0
            "#,
        )
        .expect("level is valid");
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);

        let _ = level.next_wave(&mut rng).expect("wave");
        level.rewind(2);
        assert_eq!(level.current_wave(), 0);
    }
}
