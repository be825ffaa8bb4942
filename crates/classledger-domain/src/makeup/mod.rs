mod aggregate;
mod repository;
mod scoring;
mod value_objects;


pub use aggregate::{MakeUpClass, MakeUpClassRecord};
pub use repository::MakeUpRepository;
pub use scoring::{
    rank_suggestions, ScoringContext, SuggestionConfig, SuggestionScorer, SuggestionWeights,
};
pub use value_objects::{MakeUpStatus, MakeUpSuggestion, SubScores};
