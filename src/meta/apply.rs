use super::MetaTag;

/// The document head as seen by the metadata engine.
///
/// `Tag` is a handle to an existing meta element; it must stay valid for
/// the other tags while one is removed.
pub trait MetaDocument {
    type Tag;

    fn meta_tags(&self) -> Vec<Self::Tag>;
    fn set_title(&mut self, title: &str);
    fn add_meta_tag(&mut self, name: &str, value: &str);
    fn remove_meta_tag(&mut self, tag: &Self::Tag);
    fn is_meta_tag(&self, tag: &Self::Tag, name: &str) -> bool;
    fn meta_tag_value(&self, tag: &Self::Tag) -> String;
    fn set_meta_tag_value(&mut self, tag: &Self::Tag, value: &str);
}

/// The mutations performed by one [`apply_meta`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetaPatch {
    pub updated: usize,
    pub added: usize,
    pub removed: usize,
}

impl MetaPatch {
    pub fn is_empty(&self) -> bool {
        self.updated == 0 && self.added == 0 && self.removed == 0
    }
}

/// Reconcile the document's meta tags with `tags`.
///
/// Every existing tag is matched against a not yet claimed tag of the
/// same name, preferring one that also carries the same value; matched
/// tags are updated in place when their value differs, unmatched ones are
/// removed and the unclaimed remainder is appended in order.  The
/// `charset` tag belongs to the server shell and is left alone.
pub fn apply_meta<D: MetaDocument>(
    document: &mut D,
    title: Option<&str>,
    tags: &[MetaTag],
) -> MetaPatch {
    let mut patch = MetaPatch::default();
    if let Some(title) = title {
        document.set_title(title);
    }

    let mut pending = tags.iter().map(Some).collect::<Vec<_>>();
    for existing in document.meta_tags() {
        if document.is_meta_tag(&existing, "charset") {
            continue;
        }
        let current = document.meta_tag_value(&existing);
        let named = |tag: &MetaTag| document.is_meta_tag(&existing, &tag.name);
        let found = pending
            .iter()
            .position(|tag| matches!(tag, Some(tag) if named(tag) && tag.value == current))
            .or_else(|| {
                pending
                    .iter()
                    .position(|tag| matches!(tag, Some(tag) if named(tag)))
            });
        match found.and_then(|i| pending[i].take()) {
            Some(tag) => {
                if tag.value != current {
                    document.set_meta_tag_value(&existing, &tag.value);
                    patch.updated += 1;
                }
            }
            None => {
                document.remove_meta_tag(&existing);
                patch.removed += 1;
            }
        }
    }

    for tag in pending.into_iter().flatten() {
        document.add_meta_tag(&tag.name, &tag.value);
        patch.added += 1;
    }
    patch
}
