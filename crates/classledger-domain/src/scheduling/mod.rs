mod preferences;
mod repository;

pub use preferences::StudentSchedulePreferences;
pub use repository::PreferenceRepository;
