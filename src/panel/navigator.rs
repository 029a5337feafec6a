use crate::types::Id;

/// Previous/next navigation over a caller-supplied ordered id list.
///
/// The caller replaces the list whenever its governing filter changes. The
/// only derived state is the position of the current id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceNavigator {
    ids: Vec<Id>,
    current: Option<Id>,
}

impl SequenceNavigator {
    pub fn new(ids: Vec<Id>, current: Id) -> Self {
        Self {
            ids,
            current: Some(current),
        }
    }

    pub fn set_ids(&mut self, ids: Vec<Id>) {
        self.ids = ids;
    }

    pub fn retarget(&mut self, current: Id) {
        self.current = Some(current);
    }

    pub fn current(&self) -> Option<Id> {
        self.current
    }

    pub fn index(&self) -> Option<usize> {
        let current = self.current?;
        self.ids.iter().position(|id| *id == current)
    }

    pub fn has_prev(&self) -> bool {
        self.index().is_some_and(|i| i > 0)
    }

    pub fn has_next(&self) -> bool {
        self.index().is_some_and(|i| i + 1 < self.ids.len())
    }

    /// Move to the previous id and return it, if there is one.
    pub fn prev(&mut self) -> Option<Id> {
        let index = self.index().filter(|i| *i > 0)?;
        let id = self.ids[index - 1];
        self.current = Some(id);
        Some(id)
    }

    pub fn next(&mut self) -> Option<Id> {
        let index = self.index()?;
        let id = *self.ids.get(index + 1)?;
        self.current = Some(id);
        Some(id)
    }
}
