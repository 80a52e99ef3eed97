use std::fmt::Write;

use super::{apply::MetaDocument, normalize::escape_html, MetaTag};

/// Stable identity of a tag within [`HeadTags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagId(u64);

/// An in-memory document head.
///
/// Used on the server to collect the tags for the rendered shell, and
/// anywhere a real DOM is not available.
#[derive(Clone, Debug, Default)]
pub struct HeadTags {
    title: Option<String>,
    tags: Vec<(TagId, MetaTag)>,
    next_id: u64,
}

impl HeadTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<N, V>(tags: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        let mut head = Self::new();
        for (name, value) in tags {
            head.push(MetaTag::new(name, value));
        }
        head
    }

    fn push(&mut self, tag: MetaTag) -> TagId {
        let id = TagId(self.next_id);
        self.next_id += 1;
        self.tags.push((id, tag));
        id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn tags(&self) -> impl Iterator<Item = &MetaTag> {
        self.tags.iter().map(|(_, tag)| tag)
    }

    pub fn ids(&self) -> Vec<TagId> {
        self.tags.iter().map(|(id, _)| *id).collect()
    }

    pub fn pairs(&self) -> Vec<(String, String)> {
        self.tags()
            .map(|tag| (tag.name.clone(), tag.value.clone()))
            .collect()
    }

    fn find(&self, id: TagId) -> Option<&MetaTag> {
        self.tags
            .iter()
            .find_map(|(tag_id, tag)| (*tag_id == id).then_some(tag))
    }

    /// Render the head markup: `charset` first, then the title and the
    /// remaining tags in order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for tag in self.tags().filter(|tag| tag.name == "charset") {
            let _ = write!(out, r#"<meta charset="{}">"#, escape_html(&tag.value));
        }
        if let Some(title) = &self.title {
            let _ = write!(out, "<title>{}</title>", escape_html(title));
        }
        for tag in self.tags().filter(|tag| tag.name != "charset") {
            out.push_str(&render_tag(tag));
        }
        out
    }
}

/// Render a single meta tag, using `property` for Open Graph names.
pub fn render_tag(tag: &MetaTag) -> String {
    let attribute = if tag.name.starts_with("og:") {
        "property"
    } else {
        "name"
    };
    format!(
        r#"<meta {attribute}="{}" content="{}">"#,
        escape_html(&tag.name),
        escape_html(&tag.value),
    )
}

impl MetaDocument for HeadTags {
    type Tag = TagId;

    fn meta_tags(&self) -> Vec<TagId> {
        self.ids()
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn add_meta_tag(&mut self, name: &str, value: &str) {
        self.push(MetaTag::new(name, value));
    }

    fn remove_meta_tag(&mut self, tag: &TagId) {
        self.tags.retain(|(id, _)| id != tag);
    }

    fn is_meta_tag(&self, tag: &TagId, name: &str) -> bool {
        self.find(*tag).is_some_and(|tag| tag.name == name)
    }

    fn meta_tag_value(&self, tag: &TagId) -> String {
        self.find(*tag)
            .map(|tag| tag.value.clone())
            .unwrap_or_default()
    }

    fn set_meta_tag_value(&mut self, tag: &TagId, value: &str) {
        if let Some((_, existing)) = self.tags.iter_mut().find(|(id, _)| id == tag) {
            existing.value = value.to_string();
        }
    }
}
