//! SeaORM entity models
//!
//! Database entities for CardForge

mod flashcard;
mod system_log;

pub use flashcard::{
    Entity as FlashcardEntity,
    Model as Flashcard,
    ActiveModel as FlashcardActiveModel,
    Column as FlashcardColumn,
    FlashcardSource,
};

pub use system_log::{
    Entity as SystemLogEntity,
    Model as SystemLog,
    ActiveModel as SystemLogActiveModel,
    Column as SystemLogColumn,
};
