// Copyright 2026 yareviews contributors
// SPDX-License-Identifier: MIT

//! Organization info and customer reviews from Yandex Maps.
//!
//! The page is rendered by a real browser. Everything interesting happens in
//! [`session`]: recovering the business id from intercepted network traffic,
//! scrolling until the review list stops growing, switching sort order through
//! an animated popup, and reading each review card field by field.

pub mod config;
pub mod error;
pub mod helpers;
pub mod parser;
pub mod poll;
pub mod renderer;
pub mod selectors;
pub mod session;
pub mod types;

pub use config::{resolve_config, HarvestConfig};
pub use error::{HarvestError, HarvestResult};
pub use parser::ReviewParser;
pub use session::PageSession;
pub use types::{CompanyInfo, ExtractionResult, ParseMode, ReviewRecord, SortMode};
