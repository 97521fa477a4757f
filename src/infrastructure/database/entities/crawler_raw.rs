// Copyright (c) 2025 pricewatch
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "crawler_raw")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub config_code: String,
    pub job_id: i64,
    pub title: String,
    pub link: String,
    pub price: Option<f64>,
    pub price_string: Option<String>,
    pub oldprice: Option<f64>,
    pub discount: Option<f64>,
    pub created: ChronoDateTimeWithTimeZone,
    pub modified: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
