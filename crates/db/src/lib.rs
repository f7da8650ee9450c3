pub mod catalog;
pub mod connection;
pub mod fixtures;
pub mod memory;
pub mod migrations;
pub mod store;

pub use catalog::{count_members, load_lexicon, SqlCatalogQuery};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{demo_lexicon, demo_offers, seed_demo_catalog, SeedSummary};
pub use memory::{InMemoryCatalogQuery, InMemoryConversationStore};
pub use store::{ConversationStore, RepositoryError};
