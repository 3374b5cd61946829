//! Where workout definitions come from.

use crate::{PlayerError, Result};
use async_trait::async_trait;
use gympulse_types::WorkoutDefinition;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read-only access to workout definitions, fetched once per session start.
#[async_trait]
pub trait WorkoutSource: Send + Sync {
    async fn fetch_workout(&self, id: &str) -> Result<WorkoutDefinition>;
}

/// Fetches workouts from the coach backend (`GET {base}/workouts/{id}`).
pub struct HttpWorkoutSource {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpWorkoutSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| PlayerError::InvalidBackendUrl(format!("{}: {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PlayerError::InvalidBackendUrl(raw));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/workouts/{id}` with `id` escaped as a single path segment.
    fn workout_url(&self, id: &str) -> Option<Url> {
        // Url drops "." and ".." segments instead of escaping them.
        if id.is_empty() || id == "." || id == ".." {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push("workouts").push(id);
        Some(url)
    }
}

#[async_trait]
impl WorkoutSource for HttpWorkoutSource {
    async fn fetch_workout(&self, id: &str) -> Result<WorkoutDefinition> {
        let url = self
            .workout_url(id)
            .ok_or_else(|| PlayerError::WorkoutNotFound(id.to_string()))?;
        debug!(target: "gympulse::source", "Fetching workout from {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(PlayerError::WorkoutNotFound(id.to_string())),
            status if !status.is_success() => {
                warn!(target: "gympulse::source", "Backend returned {} for workout {}", status, id);
                return Err(PlayerError::WorkoutFetch(format!("backend returned {}", status)));
            }
            _ => {}
        }

        let workout: WorkoutDefinition = response.json().await?;
        debug!(
            target: "gympulse::source",
            "Fetched workout {} with {} exercises",
            workout.id,
            workout.len()
        );
        Ok(workout)
    }
}

/// Workouts loaded from a local JSON file (an array of workouts).
#[derive(Debug, Default)]
pub struct CatalogWorkoutSource {
    workouts: HashMap<String, WorkoutDefinition>,
}

impl CatalogWorkoutSource {
    pub fn from_workouts(workouts: impl IntoIterator<Item = WorkoutDefinition>) -> Self {
        Self {
            workouts: workouts.into_iter().map(|w| (w.id.clone(), w)).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let workouts: Vec<WorkoutDefinition> = serde_json::from_str(&content)?;
        info!(
            target: "gympulse::source",
            "Loaded {} workouts from {}",
            workouts.len(),
            path.display()
        );
        Ok(Self::from_workouts(workouts))
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

#[async_trait]
impl WorkoutSource for CatalogWorkoutSource {
    async fn fetch_workout(&self, id: &str) -> Result<WorkoutDefinition> {
        self.workouts
            .get(id)
            .cloned()
            .ok_or_else(|| PlayerError::WorkoutNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gympulse_types::ExerciseSpec;
    use std::io::Write;

    #[tokio::test]
    async fn test_catalog_lookup() {
        let source = CatalogWorkoutSource::from_workouts(vec![WorkoutDefinition {
            id: "w1".into(),
            title: "Legs".into(),
            exercises: vec![ExerciseSpec::reps("Squat", 3, 8)],
        }]);

        let workout = source.fetch_workout("w1").await.unwrap();
        assert_eq!(workout.title, "Legs");
        assert!(matches!(
            source.fetch_workout("nope").await,
            Err(PlayerError::WorkoutNotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_catalog_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 3, "title": "Core", "exercises": [{{"title": "Plank", "time_seconds": 60}}]}}]"#
        )
        .unwrap();

        let source = CatalogWorkoutSource::load(file.path()).unwrap();
        assert_eq!(source.len(), 1);
        let workout = source.fetch_workout("3").await.unwrap();
        assert!(workout.exercises[0].is_time_based());
    }

    #[test]
    fn test_catalog_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            CatalogWorkoutSource::load(file.path()),
            Err(PlayerError::Json(_))
        ));
    }

    #[test]
    fn test_http_source_trims_base_url() {
        let source = HttpWorkoutSource::new("http://localhost:8000/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(source.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_workout_url_escapes_id() {
        let source = HttpWorkoutSource::new("http://localhost:8000/api/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            source.workout_url("12").unwrap().as_str(),
            "http://localhost:8000/api/workouts/12"
        );
        assert_eq!(
            source.workout_url("1/../users").unwrap().as_str(),
            "http://localhost:8000/api/workouts/1%2F..%2Fusers"
        );
        assert!(source.workout_url("..").is_none());
        assert!(source.workout_url("").is_none());
    }

    #[test]
    fn test_http_source_rejects_bad_base_url() {
        assert!(matches!(
            HttpWorkoutSource::new("not a url", None, Duration::from_secs(5)),
            Err(PlayerError::InvalidBackendUrl(_))
        ));
    }
}
