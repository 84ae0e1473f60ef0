use crate::snapshot::StyleSheetSnapshot;

/// Style sheets that currently belong to replayed nodes.
///
/// Sheets are compared by their rule texts. Registration order is kept and
/// the same sheet may be registered more than once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleSheetRegistry {
    sheets: Vec<StyleSheetSnapshot>,
}

impl StyleSheetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sheet: StyleSheetSnapshot) {
        log::trace!(
            target: "mirror.registry",
            "register sheet with {} rules",
            sheet.css_rules.len()
        );
        self.sheets.push(sheet);
    }

    /// Removes the first sheet equal to `sheet`. Returns whether one was found.
    pub fn unregister(&mut self, sheet: &StyleSheetSnapshot) -> bool {
        match self.sheets.iter().position(|s| s == sheet) {
            Some(index) => {
                self.sheets.remove(index);
                true
            }
            None => {
                log::debug!(target: "mirror.registry", "unregister: sheet not registered");
                false
            }
        }
    }

    pub fn sheets(&self) -> &[StyleSheetSnapshot] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sheets.clear();
    }
}
