//! Scripted in-memory organization page for driving sessions without a browser.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use yareviews::renderer::{NavigationResult, NodeRef, RenderContext, Renderer};
use yareviews::selectors::SelectorTable;
use yareviews::{HarvestConfig, PageSession};

pub const FULL: &str = "business-rating-badge-view__star _full";
pub const HALF: &str = "business-rating-badge-view__star _half";
pub const EMPTY: &str = "business-rating-badge-view__star _empty";

pub fn stars(full: usize, half: usize, empty: usize) -> Vec<String> {
    let mut classes = vec![FULL.to_string(); full];
    classes.extend(vec![HALF.to_string(); half]);
    classes.extend(vec![EMPTY.to_string(); empty]);
    classes
}

#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    pub author: Option<String>,
    pub avatar_style: Option<String>,
    pub date: Option<String>,
    pub body: Option<String>,
    pub stars: Vec<String>,
    pub reply: Option<String>,
}

impl FakeCard {
    /// A card with every field present and five stars.
    pub fn complete(n: usize) -> Self {
        Self {
            author: Some(format!("Author {n}")),
            avatar_style: Some(format!(
                "background-image: url(\"https://avatars.example/get-yapic/{n}/islands-68\")"
            )),
            date: Some("2024-03-05T10:20:30.000Z".to_string()),
            body: Some(format!("  Review body {n}  ")),
            stars: stars(5, 0, 0),
            reply: None,
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeRating {
    pub parts: Vec<String>,
    pub count: Option<String>,
    pub stars: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PopupLine {
    pub aria_label: Option<String>,
    pub text: String,
    /// Card order (indices into `PageState::cards`) after clicking this line.
    pub reorder: Option<Vec<usize>>,
}

impl PopupLine {
    pub fn labeled(text: &str) -> Self {
        Self {
            aria_label: Some(text.to_string()),
            text: text.to_string(),
            reorder: None,
        }
    }

    pub fn reorders(mut self, order: Vec<usize>) -> Self {
        self.reorder = Some(order);
        self
    }
}

/// Everything the fake page renders, plus what was done to it.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub header: Option<String>,
    pub cards: Vec<FakeCard>,
    /// Document order as indices into `cards`.
    pub order: Vec<usize>,
    /// Cards currently rendered, a prefix of `order`.
    pub rendered: usize,
    /// Extra cards rendered per scroll to a card, up to `cards.len()`.
    pub growth: usize,
    pub rating: Option<FakeRating>,
    pub sort_control: bool,
    /// Visibility checks on the sort control that report hidden before it shows.
    pub sort_hidden_checks: u32,
    pub popup_open: bool,
    pub popup: Vec<PopupLine>,
    pub expanded: HashSet<usize>,
    /// One batch per drain, empty once consumed.
    pub log: VecDeque<Vec<String>>,
    pub log_unavailable: bool,
    pub fail_navigation: bool,

    pub visited: Vec<String>,
    pub card_scrolls: usize,
    pub clicks: Vec<String>,
    pub drains: usize,
    pub open_tabs: usize,
    pub closed: bool,
}

impl PageState {
    /// An organization page with `cards`, five rendered up front and five
    /// more per scroll.
    pub fn organization(name: &str, cards: Vec<FakeCard>) -> Self {
        let n = cards.len();
        Self {
            header: Some(name.to_string()),
            order: (0..n).collect(),
            rendered: n.min(5),
            growth: 5,
            cards,
            ..Self::default()
        }
    }

    /// Anything that is not an organization page.
    pub fn not_found() -> Self {
        Self {
            cards: vec![FakeCard::complete(0)],
            order: vec![0],
            rendered: 1,
            ..Self::default()
        }
    }

    pub fn with_rendering(mut self, initial: usize, growth: usize) -> Self {
        self.rendered = initial.min(self.cards.len());
        self.growth = growth;
        self
    }

    pub fn with_rating(mut self, parts: &[&str], count: &str, stars: Vec<String>) -> Self {
        self.rating = Some(FakeRating {
            parts: parts.iter().map(|p| p.to_string()).collect(),
            count: Some(count.to_string()),
            stars,
        });
        self
    }

    pub fn with_sort_popup(mut self, lines: Vec<PopupLine>) -> Self {
        self.sort_control = true;
        self.popup = lines;
        self
    }

    pub fn with_log(mut self, batches: Vec<Vec<String>>) -> Self {
        self.log = batches.into();
        self
    }

    /// Authors of the rendered cards in document order.
    pub fn rendered_authors(&self) -> Vec<Option<String>> {
        self.order
            .iter()
            .take(self.rendered)
            .map(|&i| self.cards[i].author.clone())
            .collect()
    }
}

/// `Network.responseReceived` entry shaped like the Chromium log buffer.
pub fn response_entry(url: &str, status: u16, request_id: &str) -> String {
    serde_json::json!({
        "message": {
            "method": "Network.responseReceived",
            "params": {
                "requestId": request_id,
                "response": { "url": url, "status": status }
            }
        }
    })
    .to_string()
}

pub fn review_fetch(business_id: &str) -> String {
    response_entry(
        &format!(
            "https://yandex.ru/maps/api/business/fetchReviews?ajax=1&businessId={business_id}&page=1"
        ),
        200,
        "1000.42",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Header,
    Card(usize),
    Author(usize),
    Avatar(usize),
    Date(usize),
    Body(usize),
    Star(usize, usize),
    Expand(usize),
    Reply(usize),
    Rating,
    RatingText(usize),
    RatingCount,
    RatingStar(usize),
    Sort,
    Line(usize),
}

impl Node {
    fn to_ref(self) -> NodeRef {
        let id = match self {
            Node::Header => "header".to_string(),
            Node::Card(i) => format!("card:{i}"),
            Node::Author(i) => format!("author:{i}"),
            Node::Avatar(i) => format!("avatar:{i}"),
            Node::Date(i) => format!("date:{i}"),
            Node::Body(i) => format!("body:{i}"),
            Node::Star(i, k) => format!("star:{i}:{k}"),
            Node::Expand(i) => format!("expand:{i}"),
            Node::Reply(i) => format!("reply:{i}"),
            Node::Rating => "rating".to_string(),
            Node::RatingText(k) => format!("rating-text:{k}"),
            Node::RatingCount => "rating-count".to_string(),
            Node::RatingStar(k) => format!("rating-star:{k}"),
            Node::Sort => "sort".to_string(),
            Node::Line(k) => format!("line:{k}"),
        };
        NodeRef::new(id)
    }

    fn parse(node: &NodeRef) -> Result<Node> {
        let parts: Vec<&str> = node.as_str().split(':').collect();
        let num = |i: usize| -> Result<usize> {
            match parts.get(i).and_then(|p| p.parse().ok()) {
                Some(n) => Ok(n),
                None => bail!("malformed node {node}"),
            }
        };
        Ok(match parts[0] {
            "header" => Node::Header,
            "card" => Node::Card(num(1)?),
            "author" => Node::Author(num(1)?),
            "avatar" => Node::Avatar(num(1)?),
            "date" => Node::Date(num(1)?),
            "body" => Node::Body(num(1)?),
            "star" => Node::Star(num(1)?, num(2)?),
            "expand" => Node::Expand(num(1)?),
            "reply" => Node::Reply(num(1)?),
            "rating" => Node::Rating,
            "rating-text" => Node::RatingText(num(1)?),
            "rating-count" => Node::RatingCount,
            "rating-star" => Node::RatingStar(num(1)?),
            "sort" => Node::Sort,
            "line" => Node::Line(num(1)?),
            _ => bail!("unknown node {node}"),
        })
    }
}

fn present<T>(value: &Option<T>, node: Node) -> Vec<Node> {
    value.iter().map(|_| node).collect()
}

pub struct FakePage {
    state: Arc<Mutex<PageState>>,
    selectors: SelectorTable,
}

impl FakePage {
    pub fn new(state: PageState) -> Self {
        Self::shared(Arc::new(Mutex::new(state)))
    }

    pub fn shared(state: Arc<Mutex<PageState>>) -> Self {
        Self {
            state,
            selectors: SelectorTable::default(),
        }
    }

    pub fn state_handle(&self) -> Arc<Mutex<PageState>> {
        Arc::clone(&self.state)
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    fn document_query(&self, st: &PageState, selector: &str) -> Vec<Node> {
        let s = &self.selectors;
        if selector == s.org_header {
            present(&st.header, Node::Header)
        } else if selector == s.review_card {
            st.order.iter().take(st.rendered).map(|&i| Node::Card(i)).collect()
        } else if selector == s.rating_block {
            present(&st.rating, Node::Rating)
        } else if selector == s.sort_control && st.sort_control {
            vec![Node::Sort]
        } else if selector == s.sort_popup_line {
            (0..st.popup.len()).map(Node::Line).collect()
        } else {
            Vec::new()
        }
    }

    fn card_query(&self, st: &PageState, i: usize, selector: &str) -> Vec<Node> {
        let s = &self.selectors;
        let card = &st.cards[i];
        if selector == s.review_author {
            present(&card.author, Node::Author(i))
        } else if selector == s.review_avatar {
            present(&card.avatar_style, Node::Avatar(i))
        } else if selector == s.review_date {
            present(&card.date, Node::Date(i))
        } else if selector == s.review_body {
            present(&card.body, Node::Body(i))
        } else if selector == s.review_stars {
            (0..card.stars.len()).map(|k| Node::Star(i, k)).collect()
        } else if selector == s.reply_expand {
            present(&card.reply, Node::Expand(i))
        } else if selector == s.reply_bubble && st.expanded.contains(&i) {
            present(&card.reply, Node::Reply(i))
        } else {
            Vec::new()
        }
    }

    fn rating_query(&self, rating: &FakeRating, selector: &str) -> Vec<Node> {
        let s = &self.selectors;
        if selector == s.rating_text {
            (0..rating.parts.len()).map(Node::RatingText).collect()
        } else if selector == s.rating_count {
            present(&rating.count, Node::RatingCount)
        } else if selector == s.rating_stars {
            (0..rating.stars.len()).map(Node::RatingStar).collect()
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl RenderContext for FakePage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut st = self.state();
        if st.fail_navigation {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }
        st.visited.push(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 120,
        })
    }

    async fn query_all(&self, scope: Option<&NodeRef>, selector: &str) -> Result<Vec<NodeRef>> {
        let st = self.state();
        let nodes = match scope {
            None => self.document_query(&st, selector),
            Some(scope) => match Node::parse(scope)? {
                Node::Card(i) => self.card_query(&st, i, selector),
                Node::Rating => match &st.rating {
                    Some(rating) => self.rating_query(rating, selector),
                    None => bail!("stale node {scope}"),
                },
                _ => Vec::new(),
            },
        };
        Ok(nodes.into_iter().map(Node::to_ref).collect())
    }

    async fn text(&self, node: &NodeRef) -> Result<Option<String>> {
        let st = self.state();
        Ok(match Node::parse(node)? {
            Node::Header => st.header.clone(),
            Node::Author(i) => st.cards[i].author.clone(),
            Node::Body(i) => st.cards[i].body.clone(),
            Node::Reply(i) => st.cards[i].reply.clone(),
            Node::RatingText(k) => st.rating.as_ref().map(|r| r.parts[k].clone()),
            Node::RatingCount => st.rating.as_ref().and_then(|r| r.count.clone()),
            Node::Line(k) => Some(st.popup[k].text.clone()),
            Node::Sort => Some("По умолчанию".to_string()),
            _ => None,
        })
    }

    async fn attribute(&self, node: &NodeRef, name: &str) -> Result<Option<String>> {
        let st = self.state();
        Ok(match (Node::parse(node)?, name) {
            (Node::Avatar(i), "style") => st.cards[i].avatar_style.clone(),
            (Node::Date(i), "content") => st.cards[i].date.clone(),
            (Node::Star(i, k), "class") => Some(st.cards[i].stars[k].clone()),
            (Node::RatingStar(k), "class") => st.rating.as_ref().map(|r| r.stars[k].clone()),
            (Node::Line(k), "aria-label") => st.popup[k].aria_label.clone(),
            _ => None,
        })
    }

    async fn is_visible(&self, node: &NodeRef) -> Result<bool> {
        let mut st = self.state();
        Ok(match Node::parse(node)? {
            Node::Sort if st.sort_hidden_checks > 0 => {
                st.sort_hidden_checks -= 1;
                false
            }
            Node::Line(_) => st.popup_open,
            _ => true,
        })
    }

    async fn click(&self, node: &NodeRef) -> Result<()> {
        let mut st = self.state();
        st.clicks.push(node.to_string());
        match Node::parse(node)? {
            Node::Sort => st.popup_open = true,
            Node::Line(k) if st.popup_open => {
                if let Some(order) = st.popup[k].reorder.clone() {
                    st.order = order;
                }
                st.popup_open = false;
            }
            Node::Expand(i) => {
                st.expanded.insert(i);
            }
            _ => {}
        }
        Ok(())
    }

    async fn scroll_into_view(&self, node: &NodeRef) -> Result<()> {
        let mut st = self.state();
        if let Node::Card(_) = Node::parse(node)? {
            st.card_scrolls += 1;
            st.rendered = (st.rendered + st.growth).min(st.cards.len());
        }
        Ok(())
    }

    async fn drain_log(&self) -> Result<Vec<String>> {
        let mut st = self.state();
        st.drains += 1;
        if st.log_unavailable {
            bail!("performance log not enabled");
        }
        Ok(st.log.pop_front().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut st = self.state();
        st.closed = true;
        st.open_tabs = st.open_tabs.saturating_sub(1);
        Ok(())
    }
}

/// Hands out tabs onto one shared page.
pub struct FakeRenderer {
    state: Arc<Mutex<PageState>>,
}

impl FakeRenderer {
    pub fn new(state: PageState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state_handle(&self) -> Arc<Mutex<PageState>> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.state.lock().unwrap().open_tabs += 1;
        Ok(Box::new(FakePage::shared(Arc::clone(&self.state))))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.state.lock().unwrap().open_tabs
    }
}

/// A session over `state` with default configuration.
pub fn session(state: PageState) -> (PageSession, Arc<Mutex<PageState>>) {
    session_with(state, HarvestConfig::default())
}

pub fn session_with(state: PageState, config: HarvestConfig) -> (PageSession, Arc<Mutex<PageState>>) {
    let page = FakePage::new(state);
    let handle = page.state_handle();
    (PageSession::new(Box::new(page), Arc::new(config)), handle)
}
