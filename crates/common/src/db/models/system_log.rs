//! System log entity: failed operations recorded for later diagnosis

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub error_code: String,

    #[sea_orm(column_type = "Text")]
    pub error_message: String,

    /// AI model involved, if any
    #[sea_orm(column_type = "Text", nullable)]
    pub model: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
