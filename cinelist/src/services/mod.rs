//! Business logic for `/add` resolution and catalog updates

pub mod chat_surface;
pub mod committer;
pub mod disambiguation;
pub mod messages;
pub mod provider;
pub mod query_parser;
pub mod resolution;
pub mod scorer;
pub mod selection_store;
pub mod title_normalizer;
pub mod tmdb_client;

pub use chat_surface::{ChatSurface, EventBusSurface};
pub use committer::RegistrationCommitter;
pub use disambiguation::DisambiguationPolicy;
pub use provider::CandidateProvider;
pub use query_parser::QueryParser;
pub use resolution::ResolutionService;
pub use selection_store::SelectionStore;
pub use tmdb_client::TmdbClient;
