//! Server-state cache: keyed queries and fire-and-report mutations.

pub mod cache;
pub mod hooks;

pub use cache::{Fetcher, Mutation, MutationFn, Query, QueryCache, QueryKey, QueryState};
pub use hooks::{
    saved_recipes_key, saved_workouts_key, FitnessQueries, RecipeUpload, WorkoutUpload,
};
