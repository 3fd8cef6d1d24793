//! Field-by-field reading of review cards and the rating summary.
//!
//! Each field is looked up on its own; a missing or unreadable sub-element
//! only empties that field.

use crate::helpers::{avatar_from_style, clean_text, count_stars, normalize_date, parse_count, parse_rating};
use crate::renderer::{NodeRef, RenderContext};
use crate::selectors::SelectorTable;
use crate::types::{CompanyInfo, ReviewRecord};
use tracing::debug;

pub struct RecordExtractor<'a> {
    ctx: &'a dyn RenderContext,
    selectors: &'a SelectorTable,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(ctx: &'a dyn RenderContext, selectors: &'a SelectorTable) -> Self {
        Self { ctx, selectors }
    }

    /// Read one review card.
    ///
    /// Expanding the owner reply clicks inside the card, so this mutates the
    /// page when the card has a reply.
    pub async fn extract(&self, card: &NodeRef) -> ReviewRecord {
        let s = self.selectors;
        ReviewRecord {
            author_name: self.child_text(Some(card), &s.review_author).await,
            avatar_url: self
                .child_attribute(Some(card), &s.review_avatar, "style")
                .await
                .and_then(|style| avatar_from_style(&style)),
            published_date: self
                .child_attribute(Some(card), &s.review_date, "content")
                .await
                .and_then(|content| normalize_date(&content)),
            text: self.child_text(Some(card), &s.review_body).await,
            star_rating: self.review_stars(card).await,
            owner_reply: self.owner_reply(card).await,
        }
    }

    /// Organization name and rating summary of the current page.
    pub async fn company_info(&self) -> CompanyInfo {
        let s = self.selectors;
        let name = self.child_text(None, &s.org_header).await;

        let Some(block) = self.find(None, &s.rating_block).await else {
            debug!("rating summary absent");
            return CompanyInfo {
                name,
                ..CompanyInfo::default()
            };
        };

        let mut parts = Vec::new();
        for node in self.find_all(Some(&block), &s.rating_text).await {
            if let Some(text) = self.ctx.text(&node).await.ok().flatten() {
                parts.push(text);
            }
        }
        let rating_count = self
            .child_text(Some(&block), &s.rating_count)
            .await
            .map(|text| parse_count(&text))
            .unwrap_or(0);
        let classes = self.classes(Some(&block), &s.rating_stars).await;

        CompanyInfo {
            name,
            rating: parse_rating(&parts),
            rating_count,
            star_rating: count_stars(&classes),
        }
    }

    async fn review_stars(&self, card: &NodeRef) -> u8 {
        let classes = self.classes(Some(card), &self.selectors.review_stars).await;
        count_stars(&classes).floor().clamp(0.0, 5.0) as u8
    }

    /// Click the reply toggle, then read the revealed bubble.
    async fn owner_reply(&self, card: &NodeRef) -> Option<String> {
        let toggle = self.find(Some(card), &self.selectors.reply_expand).await?;
        if let Err(e) = self.ctx.click(&toggle).await {
            debug!("reply expand click failed: {e}");
            return None;
        }
        self.child_text(Some(card), &self.selectors.reply_bubble).await
    }

    async fn find(&self, scope: Option<&NodeRef>, selector: &str) -> Option<NodeRef> {
        match self.ctx.query_one(scope, selector).await {
            Ok(node) => node,
            Err(e) => {
                debug!("query {selector} failed: {e}");
                None
            }
        }
    }

    async fn find_all(&self, scope: Option<&NodeRef>, selector: &str) -> Vec<NodeRef> {
        match self.ctx.query_all(scope, selector).await {
            Ok(nodes) => nodes,
            Err(e) => {
                debug!("query {selector} failed: {e}");
                Vec::new()
            }
        }
    }

    async fn child_text(&self, scope: Option<&NodeRef>, selector: &str) -> Option<String> {
        let node = self.find(scope, selector).await?;
        match self.ctx.text(&node).await {
            Ok(text) => clean_text(text),
            Err(e) => {
                debug!("text of {selector} unreadable: {e}");
                None
            }
        }
    }

    async fn child_attribute(
        &self,
        scope: Option<&NodeRef>,
        selector: &str,
        name: &str,
    ) -> Option<String> {
        let node = self.find(scope, selector).await?;
        match self.ctx.attribute(&node, name).await {
            Ok(value) => value,
            Err(e) => {
                debug!("{name} of {selector} unreadable: {e}");
                None
            }
        }
    }

    /// `class` attribute of every match, skipping unreadable ones.
    async fn classes(&self, scope: Option<&NodeRef>, selector: &str) -> Vec<String> {
        let mut classes = Vec::new();
        for node in self.find_all(scope, selector).await {
            if let Ok(Some(class)) = self.ctx.attribute(&node, "class").await {
                classes.push(class);
            }
        }
        classes
    }
}
