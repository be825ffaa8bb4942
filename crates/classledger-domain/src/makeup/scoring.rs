use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MakeUpSuggestion, SubScores};
use crate::catalog::{ScheduledClass, StudentProfile};
use crate::scheduling::StudentSchedulePreferences;
use crate::shared::{DomainError, SuggestionId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionWeights {
    pub content: f64,
    pub schedule: f64,
    pub teacher: f64,
    pub overall: f64,
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            content: 0.35,
            schedule: 0.25,
            teacher: 0.20,
            overall: 0.20,
        }
    }
}

impl SuggestionWeights {
    /// Weights scaled to sum to 1
    pub fn normalized(&self) -> Result<Self, DomainError> {
        let parts = [self.content, self.schedule, self.teacher, self.overall];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::Validation(
                "Suggestion weights must be non-negative numbers".to_string(),
            ));
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return Err(DomainError::Validation(
                "At least one suggestion weight must be positive".to_string(),
            ));
        }
        Ok(Self {
            content: self.content / total,
            schedule: self.schedule / total,
            teacher: self.teacher / total,
            overall: self.overall / total,
        })
    }

    pub fn combine(&self, scores: &SubScores) -> f64 {
        let score = self.content * scores.content_match
            + self.schedule * scores.schedule_match
            + self.teacher * scores.teacher_match
            + self.overall * scores.overall_compatibility;
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub weights: SuggestionWeights,
    pub search_window_days: i64,
    pub max_suggestions: usize,
    pub selection_deadline_days: i64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            weights: SuggestionWeights::default(),
            search_window_days: 14,
            max_suggestions: 5,
            selection_deadline_days: 7,
        }
    }
}

/// Everything known about the student and the class being replaced
pub struct ScoringContext<'a> {
    pub profile: &'a StudentProfile,
    pub preferences: &'a StudentSchedulePreferences,
    pub original: Option<&'a ScheduledClass>,
    pub now: DateTime<Utc>,
}

/// Scores and ranks make-up candidates
#[derive(Debug, Clone)]
pub struct SuggestionScorer {
    weights: SuggestionWeights,
    max_suggestions: usize,
}

impl SuggestionScorer {
    pub fn new(config: &SuggestionConfig) -> Result<Self, DomainError> {
        Ok(Self {
            weights: config.weights.normalized()?,
            max_suggestions: config.max_suggestions,
        })
    }

    pub fn weights(&self) -> &SuggestionWeights {
        &self.weights
    }

    /// Score and rank `candidates`, best first, capped at the configured maximum.
    pub fn suggest(
        &self,
        candidates: &[ScheduledClass],
        ctx: &ScoringContext<'_>,
    ) -> Vec<MakeUpSuggestion> {
        let scored = candidates
            .iter()
            .map(|candidate| self.score(candidate, ctx))
            .collect();
        rank_suggestions(scored, self.max_suggestions)
    }

    pub fn score(&self, candidate: &ScheduledClass, ctx: &ScoringContext<'_>) -> MakeUpSuggestion {
        let scores = SubScores {
            content_match: content_match(candidate, ctx),
            schedule_match: schedule_match(candidate, ctx.preferences),
            teacher_match: teacher_match(candidate, ctx),
            overall_compatibility: overall_compatibility(candidate, ctx),
        };
        let compatibility_score = self.weights.combine(&scores);
        let (benefits, drawbacks) = benefits_and_drawbacks(&scores);

        MakeUpSuggestion {
            id: SuggestionId::new(),
            class_id: candidate.id.clone(),
            teacher_id: candidate.teacher_id.clone(),
            starts_at: candidate.starts_at,
            duration_hours: candidate.duration_hours,
            content_match: scores.content_match,
            schedule_match: scores.schedule_match,
            teacher_match: scores.teacher_match,
            overall_compatibility: scores.overall_compatibility,
            compatibility_score,
            reasoning: reasoning(&scores, compatibility_score),
            benefits,
            drawbacks,
        }
    }
}

/// Sort by score descending, earliest start first on ties, and keep `max`.
pub fn rank_suggestions(mut suggestions: Vec<MakeUpSuggestion>, max: usize) -> Vec<MakeUpSuggestion> {
    suggestions.sort_by(|a, b| {
        b.compatibility_score
            .total_cmp(&a.compatibility_score)
            .then_with(|| a.starts_at.cmp(&b.starts_at))
    });
    suggestions.truncate(max);
    suggestions
}

fn content_match(candidate: &ScheduledClass, ctx: &ScoringContext<'_>) -> f64 {
    let same_unit = ctx
        .original
        .map(|o| o.unit == candidate.unit && o.level == candidate.level)
        .unwrap_or(false);

    if same_unit {
        1.0
    } else if candidate.level == ctx.profile.level {
        0.8
    } else if (candidate.level - ctx.profile.level).abs() == 1 {
        0.5
    } else {
        0.0
    }
}

fn schedule_match(candidate: &ScheduledClass, prefs: &StudentSchedulePreferences) -> f64 {
    if !prefs.has_day_preference() && !prefs.has_time_preference() {
        return 0.5;
    }

    let day = if !prefs.has_day_preference() {
        0.5
    } else if prefs.matches_day(candidate.starts_at) {
        1.0
    } else {
        0.0
    };
    let time = if !prefs.has_time_preference() {
        0.5
    } else if prefs.matches_time(candidate.starts_at) {
        1.0
    } else {
        0.0
    };
    0.5 * day + 0.5 * time
}

fn teacher_match(candidate: &ScheduledClass, ctx: &ScoringContext<'_>) -> f64 {
    let teacher = &candidate.teacher_id;
    if ctx.preferences.avoids_teacher(teacher) {
        0.0
    } else if ctx.preferences.prefers_teacher(teacher) {
        1.0
    } else if ctx.original.map(|o| &o.teacher_id == teacher).unwrap_or(false) {
        0.8
    } else {
        0.5
    }
}

fn overall_compatibility(candidate: &ScheduledClass, ctx: &ScoringContext<'_>) -> f64 {
    let size_fit = if ctx.preferences.fits_class_size(candidate.enrolled + 1) {
        1.0
    } else {
        0.5
    };

    let availability = if candidate.capacity == 0 {
        0.0
    } else {
        candidate.available_seats() as f64 / candidate.capacity as f64
    };

    let lead_hours = (candidate.starts_at - ctx.now).num_minutes() as f64 / 60.0;
    let lead_time = if lead_hours < 24.0 {
        0.5
    } else if lead_hours <= 24.0 * 7.0 {
        1.0
    } else {
        0.7
    };

    ((size_fit + availability + lead_time) / 3.0).clamp(0.0, 1.0)
}

fn benefits_and_drawbacks(scores: &SubScores) -> (Vec<String>, Vec<String>) {
    let mut benefits = Vec::new();
    let mut drawbacks = Vec::new();

    if scores.content_match >= 1.0 {
        benefits.push("Covers the same unit as the missed class".to_string());
    } else if scores.content_match >= 0.8 {
        benefits.push("Same level as the current course".to_string());
    } else {
        drawbacks.push("Different level from the current course".to_string());
    }

    if scores.schedule_match >= 0.75 {
        benefits.push("Fits the preferred schedule".to_string());
    } else if scores.schedule_match <= 0.25 {
        drawbacks.push("Outside the preferred days or times".to_string());
    }

    if scores.teacher_match >= 1.0 {
        benefits.push("Taught by a preferred teacher".to_string());
    } else if scores.teacher_match >= 0.8 {
        benefits.push("Same teacher as the missed class".to_string());
    } else if scores.teacher_match <= 0.0 {
        drawbacks.push("Teacher is on the avoid list".to_string());
    }

    if scores.overall_compatibility >= 0.8 {
        benefits.push("Good class size and seat availability".to_string());
    } else if scores.overall_compatibility < 0.5 {
        drawbacks.push("Few seats left or short notice".to_string());
    }

    (benefits, drawbacks)
}

fn reasoning(scores: &SubScores, compatibility: f64) -> String {
    let factors = [
        ("content", scores.content_match),
        ("schedule", scores.schedule_match),
        ("teacher", scores.teacher_match),
        ("overall fit", scores.overall_compatibility),
    ];
    let strongest = factors
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| *name)
        .unwrap_or("content");

    format!(
        "{:.0}% compatible (content {:.2}, schedule {:.2}, teacher {:.2}, overall {:.2}); strongest match: {}",
        compatibility * 100.0,
        scores.content_match,
        scores.schedule_match,
        scores.teacher_match,
        scores.overall_compatibility,
        strongest
    )
}
