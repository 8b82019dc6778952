//! SeaORM entity models
//!
//! Database entities for Newsdesk

mod api_usage;
mod preference;
mod search_history;

pub use preference::{
    Entity as PreferenceEntity,
    ActiveModel as PreferenceActiveModel,
    Column as PreferenceColumn,
};

pub use search_history::{
    Entity as SearchHistoryEntity,
    ActiveModel as SearchHistoryActiveModel,
    Column as SearchHistoryColumn,
};

pub use api_usage::{
    Entity as ApiUsageEntity,
    ActiveModel as ApiUsageActiveModel,
};
