//! CSS selectors for the organization review page.
//!
//! Markup drift should only ever need a change here (or in the config file),
//! never in the extraction logic.

use serde::{Deserialize, Serialize};

/// Named selector lookup table. Every field is a CSS selector string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    /// Organization name header. Its presence marks a valid page.
    pub org_header: String,
    /// One review card in the repeating list.
    pub review_card: String,
    pub review_author: String,
    /// Element whose inline style carries the avatar URL.
    pub review_avatar: String,
    /// `<meta>` whose `content` is the publication timestamp.
    pub review_date: String,
    pub review_body: String,
    /// Star elements inside a review card.
    pub review_stars: String,
    /// Control that unfolds the owner's reply.
    pub reply_expand: String,
    pub reply_bubble: String,
    /// Summary region holding rating, rating count and stars.
    pub rating_block: String,
    pub rating_text: String,
    pub rating_count: String,
    pub rating_stars: String,
    /// Control that opens the sort popup.
    pub sort_control: String,
    /// One selectable line in the sort popup.
    pub sort_popup_line: String,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            org_header: "h1.orgpage-header-view__header".into(),
            review_card: ".business-reviews-card-view__review".into(),
            review_author: "span[itemprop='name']".into(),
            review_avatar: "div.user-icon-view__icon".into(),
            review_date: "meta[itemprop='datePublished']".into(),
            review_body: ".business-review-view__body".into(),
            review_stars: ".business-review-view__rating span".into(),
            reply_expand: ".business-review-view__comment-expand".into(),
            reply_bubble: ".business-review-comment-content__bubble".into(),
            rating_block: "div.business-summary-rating-badge-view__rating-and-stars".into(),
            rating_text: "div.business-summary-rating-badge-view__rating > span.business-summary-rating-badge-view__rating-text".into(),
            rating_count: "div.business-summary-rating-badge-view__rating-count > span.business-rating-amount-view._summary".into(),
            rating_stars: "div.business-rating-badge-view__stars > span".into(),
            sort_control: ".business-reviews-card-view__ranking div.rating-ranking-view[role='button']".into(),
            sort_popup_line: ".rating-ranking-view__popup-line".into(),
        }
    }
}
