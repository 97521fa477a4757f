// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "crawler_config")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub start_url: String,
    pub all_items_sel: String,
    pub title_sel: String,
    pub link_sel: String,
    pub price_sel: String,
    pub use_next_page_button: bool,
    pub next_page_button_sel: Option<String>,
    pub use_url_page_parameter: bool,
    pub url_page_parameter: Option<String>,
    pub use_infinite_scroll: bool,
    pub max_pages: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
