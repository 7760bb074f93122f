use crate::document::Document;
use crate::item::ComponentItem;
use crate::policy::Rooted;

impl Document<Rooted> {
    /// The single parentless item. More than one is a broken invariant.
    pub fn root(&self) -> Option<&ComponentItem> {
        let mut roots = self.components.iter().filter(|c| c.parent_id().is_none());
        let root = roots.next();
        let extra = roots.count();
        debug_assert_eq!(extra, 0, "rooted document has more than one root");
        if extra > 0 {
            return None;
        }
        root
    }
}
