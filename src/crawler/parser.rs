//! Movie page extractor
//!
//! Walks the markup of one movie page as a stream of open/close/text events and
//! pulls out the title, release year, production region, credited people and
//! links to related movies.
//!
//! The page only gives meaning to an element through its context: a link is a
//! director only inside the "attrs" list of a field whose label read "Director",
//! inside the info block. The visitor therefore keeps an explicit stack of
//! [`State`] frames. Each frame is bound to the element depth that opened it and
//! is popped when that element closes, so the stack is balanced after every page
//! no matter which fields were present.
//!
//! Extraction never fails. Anything the visitor doesn't recognize is skipped and
//! the corresponding output field stays `None`.

use crate::model::Role;
use crate::url::celebrity_id_from_href;
use ego_tree::iter::Edge;
use scraper::node::Element;
use scraper::{Html, Node};

/// A person listed in the credits of a movie page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    /// Celebrity id, or the raw href when the link has no recognizable id
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// Everything extracted from one movie page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    pub title: Option<String>,
    pub year: Option<String>,
    pub region: Option<String>,

    /// Credits in page order
    pub credits: Vec<Credit>,

    /// Hrefs found in the related-movies block, verbatim
    pub related_urls: Vec<String>,
}

impl PageExtraction {
    /// Credits listed under the given role, in page order
    pub fn credited_as(&self, role: Role) -> impl Iterator<Item = &Credit> {
        self.credits.iter().filter(move |credit| credit.role == role)
    }

    pub fn directors(&self) -> Vec<&Credit> {
        self.credited_as(Role::Director).collect()
    }

    pub fn scriptwriters(&self) -> Vec<&Credit> {
        self.credited_as(Role::Scriptwriter).collect()
    }

    pub fn actors(&self) -> Vec<&Credit> {
        self.credited_as(Role::Actor).collect()
    }
}

/// Extracts movie data from the markup of a movie page
///
/// # Example
///
/// ```
/// use movie_spider::crawler::extract_page;
///
/// let html = r#"<h1><span property="v:itemreviewed">Alien</span>
///     <span class="year">(1979)</span></h1>"#;
/// let page = extract_page(html);
/// assert_eq!(page.title.as_deref(), Some("Alien"));
/// assert_eq!(page.year.as_deref(), Some("1979"));
/// ```
pub fn extract_page(html: &str) -> PageExtraction {
    visit(html).finish()
}

fn visit(html: &str) -> PageVisitor {
    let document = Html::parse_document(html);
    let mut visitor = PageVisitor::default();

    for edge in document.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => visitor.open(element),
                Node::Text(text) => visitor.text(text),
                _ => {}
            },
            Edge::Close(node) => {
                if node.value().is_element() {
                    visitor.close();
                }
            }
        }
    }

    visitor
}

/// Where the visitor currently is, logically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside the `<div id="info">` metadata block
    Info,
    /// A child span of the info block whose label hasn't been seen yet
    Placeholder,
    /// A field whose `<span class="pl">` label has opened but not been read
    Field,
    /// A field whose label named a credit role
    Role(Role),
    /// A field or label that carries nothing of interest
    Ignorable,
    /// Inside a `<span class="pl">` label, waiting for its text
    Label,
    /// Inside the `<span class="attrs">` list of a role field
    Attrs,
    /// Inside a credit link, waiting for the person's name
    Credit,
    /// The region label was read; the next text is the region value
    Region,
    Title,
    YearHeading,
    /// Inside the related-movies block
    Related,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    state: State,
    depth: usize,
}

#[derive(Debug)]
struct PendingCredit {
    id: String,
    role: Role,
}

/// Recognized texts of a `<span class="pl">` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldLabel {
    Role(Role),
    Region,
    Other,
}

impl FieldLabel {
    fn parse(text: &str) -> Self {
        let label = text
            .trim()
            .trim_end_matches(&[':', '：'][..])
            .trim()
            .to_lowercase();

        match label.as_str() {
            "导演" | "director" | "directors" => Self::Role(Role::Director),
            "编剧" | "writer" | "writers" | "scriptwriter" | "scriptwriters" => {
                Self::Role(Role::Scriptwriter)
            }
            "主演" | "actor" | "actors" | "cast" | "stars" => Self::Role(Role::Actor),
            "制片国家/地区" | "country" | "country/region" | "region" => Self::Region,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Default)]
struct PageVisitor {
    stack: Vec<Frame>,
    depth: usize,
    pending_credit: Option<PendingCredit>,
    year_from_release_date: bool,
    page: PageExtraction,
}

impl PageVisitor {
    fn finish(self) -> PageExtraction {
        if !self.stack.is_empty() {
            tracing::debug!("Extractor finished with {} open frames", self.stack.len());
        }
        self.page
    }

    fn top(&self) -> Option<State> {
        self.stack.last().map(|frame| frame.state)
    }

    fn parent(&self) -> Option<State> {
        self.stack
            .len()
            .checked_sub(2)
            .map(|index| self.stack[index].state)
    }

    fn push(&mut self, state: State) {
        self.stack.push(Frame {
            state,
            depth: self.depth,
        });
    }

    fn replace_top(&mut self, state: State) {
        if let Some(frame) = self.stack.last_mut() {
            frame.state = state;
        }
    }

    fn open(&mut self, element: &Element) {
        self.depth += 1;
        match element.name() {
            "div" => self.open_div(element),
            "span" => self.open_span(element),
            "a" => self.open_link(element),
            _ => {}
        }
    }

    fn open_div(&mut self, element: &Element) {
        if element.id() == Some("info") {
            self.push(State::Info);
        } else if has_class(element, "recommendations-bd") {
            self.push(State::Related);
        }
    }

    fn open_span(&mut self, element: &Element) {
        let property = element.attr("property");

        // The release date can sit on any span, including speculative info fields
        if property == Some("v:initialReleaseDate") {
            if let Some(content) = element.attr("content") {
                self.record_release_date(content);
            }
        }

        let top = self.top();
        if has_class(element, "pl") {
            match top {
                Some(State::Placeholder) => {
                    self.replace_top(State::Field);
                    self.push(State::Label);
                }
                Some(State::Info) => self.push(State::Label),
                _ => {}
            }
        } else if has_class(element, "attrs") {
            self.push(State::Attrs);
        } else if top == Some(State::Info) {
            self.push(State::Placeholder);
        } else if property == Some("v:itemreviewed") {
            self.push(State::Title);
        } else if has_class(element, "year") {
            self.push(State::YearHeading);
        }
    }

    fn open_link(&mut self, element: &Element) {
        let Some(href) = element.attr("href") else {
            return;
        };

        match (self.top(), self.parent()) {
            (Some(State::Attrs), Some(State::Role(role))) => {
                let id = celebrity_id_from_href(href).unwrap_or_else(|| href.to_string());
                self.pending_credit = Some(PendingCredit { id, role });
                self.push(State::Credit);
            }
            (Some(State::Related), _) => self.page.related_urls.push(href.to_string()),
            _ => {}
        }
    }

    fn close(&mut self) {
        while let Some(frame) = self.stack.last() {
            if frame.depth < self.depth {
                break;
            }
            match frame.state {
                State::Field => {
                    tracing::debug!("Info field closed without a label, page has no credits there")
                }
                State::Credit => self.pending_credit = None,
                _ => {}
            }
            self.stack.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn text(&mut self, raw: &str) {
        let text = raw.trim();
        if text.is_empty() {
            return;
        }

        let Some(Frame { state, depth }) = self.stack.last().copied() else {
            return;
        };

        match state {
            State::Label => self.resolve_label(text, depth),
            State::Region => {
                self.page.region = Some(text.to_string());
                self.stack.pop();
            }
            State::Credit => {
                if let Some(pending) = self.pending_credit.take() {
                    self.page.credits.push(Credit {
                        id: pending.id,
                        name: text.to_string(),
                        role: pending.role,
                    });
                }
            }
            State::Title => self.page.title = Some(text.to_string()),
            State::YearHeading => {
                if self.page.year.is_none() {
                    let year = text.trim_matches(&['(', ')', '（', '）'][..]).trim();
                    tracing::debug!("Year found in heading: {}", year);
                    self.page.year = Some(year.to_string());
                }
            }
            _ => {}
        }
    }

    /// Reclassifies the enclosing field once its label text is known
    fn resolve_label(&mut self, text: &str, label_depth: usize) {
        let label = FieldLabel::parse(text);
        let field = self
            .stack
            .len()
            .checked_sub(2)
            .filter(|&index| self.stack[index].state == State::Field);

        match label {
            FieldLabel::Role(role) => {
                if let Some(index) = field {
                    self.stack[index].state = State::Role(role);
                }
            }
            FieldLabel::Region => {
                if let Some(index) = field {
                    self.stack[index].state = State::Ignorable;
                }
                // The value is a sibling of the label, so bind the marker to the label's parent
                let label_index = self.stack.len() - 1;
                self.stack.insert(
                    label_index,
                    Frame {
                        state: State::Region,
                        depth: label_depth.saturating_sub(1),
                    },
                );
            }
            FieldLabel::Other => {
                if let Some(index) = field {
                    self.stack[index].state = State::Ignorable;
                }
            }
        }

        self.replace_top(State::Ignorable);
    }

    fn record_release_date(&mut self, content: &str) {
        if self.year_from_release_date {
            return;
        }
        let content = content.trim();
        let year = match content.get(..4) {
            Some(prefix) if prefix.bytes().all(|b| b.is_ascii_digit()) => prefix,
            _ => content,
        };
        tracing::debug!("Year found in release date: {}", year);
        self.page.year = Some(year.to_string());
        self.year_from_release_date = true;
    }
}

fn has_class(element: &Element, class: &str) -> bool {
    element.classes().any(|name| name == class)
}
