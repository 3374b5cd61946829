//! Workout definitions as served by the coach backend.

use serde::{Deserialize, Deserializer, Serialize};

/// Rest applied after a set when the backend does not configure one.
pub const DEFAULT_REST_SECONDS: u32 = 90;

/// An ordered workout plan. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDefinition {
    /// Backend identifier. Numeric ids are normalised to strings.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Exercises in execution order.
    #[serde(default)]
    pub exercises: Vec<ExerciseSpec>,
}

impl WorkoutDefinition {
    /// A workout needs at least one exercise to be played.
    pub fn is_playable(&self) -> bool {
        !self.exercises.is_empty()
    }

    pub fn exercise(&self, index: usize) -> Option<&ExerciseSpec> {
        self.exercises.get(index)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// One exercise slot of a workout, with its workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    /// Raw set count. Use [`ExerciseSpec::effective_sets`] for playback.
    #[serde(default = "default_sets")]
    pub sets: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Work duration for time-based exercises.
    #[serde(default, alias = "time_seconds", skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default = "default_rest_seconds", deserialize_with = "rest_or_default")]
    pub rest_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExerciseSpec {
    /// Rep-based exercise with the default rest.
    pub fn reps(title: &str, sets: i64, reps: u32) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            sets,
            reps: Some(reps),
            duration_seconds: None,
            rest_seconds: DEFAULT_REST_SECONDS,
            video_url: None,
            notes: None,
        }
    }

    /// Time-based exercise with the default rest.
    pub fn timed(title: &str, sets: i64, seconds: u32) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            sets,
            reps: None,
            duration_seconds: Some(seconds),
            rest_seconds: DEFAULT_REST_SECONDS,
            video_url: None,
            notes: None,
        }
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = rest_seconds;
        self
    }

    /// Set count used by the player; non-positive counts play as a single set.
    pub fn effective_sets(&self) -> u32 {
        u32::try_from(self.sets).ok().filter(|&s| s > 0).unwrap_or(1)
    }

    /// Work duration when the exercise is clock-driven.
    pub fn work_seconds(&self) -> Option<u32> {
        self.duration_seconds.filter(|&s| s > 0)
    }

    pub fn is_time_based(&self) -> bool {
        self.work_seconds().is_some()
    }
}

fn default_sets() -> i64 {
    1
}

fn default_rest_seconds() -> u32 {
    DEFAULT_REST_SECONDS
}

fn rest_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_REST_SECONDS))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
