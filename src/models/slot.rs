//! Lazily-loaded association caches.
//!
//! A slot is either unloaded (its content must not be trusted) or loaded with
//! the last known state of the association. Readers only ever see loaded
//! content; [`ToOne::get`] and [`ToMany::get`] return `None` otherwise.

/// Cache for a single associated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ToOne<T> {
    loaded: bool,
    value: Option<Box<T>>,
}

impl<T> Default for ToOne<T> {
    fn default() -> Self {
        Self {
            loaded: false,
            value: None,
        }
    }
}

impl<T> ToOne<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// `None` while unloaded, `Some(None)` when loaded and empty.
    pub fn get(&self) -> Option<Option<&T>> {
        self.loaded.then(|| self.value.as_deref())
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut T> {
        if self.loaded {
            self.value.as_deref_mut()
        } else {
            None
        }
    }

    /// Marks the slot loaded with the given content.
    pub(crate) fn fill(&mut self, value: Option<T>) {
        self.value = value.map(Box::new);
        self.loaded = true;
    }

    /// Removes the cached value, leaving the slot loaded and empty.
    pub(crate) fn take(&mut self) -> Option<T> {
        self.value.take().map(|boxed| *boxed)
    }

    /// Forgets whatever was cached; the next read goes to the store.
    pub fn unload(&mut self) {
        self.loaded = false;
        self.value = None;
    }
}

/// Cache for a collection of associated entities, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToMany<T> {
    loaded: bool,
    values: Vec<T>,
}

impl<T> Default for ToMany<T> {
    fn default() -> Self {
        Self {
            loaded: false,
            values: Vec::new(),
        }
    }
}

impl<T> ToMany<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// `None` while unloaded.
    pub fn get(&self) -> Option<&[T]> {
        self.loaded.then_some(self.values.as_slice())
    }

    pub(crate) fn get_mut(&mut self) -> Option<&mut [T]> {
        if self.loaded {
            Some(self.values.as_mut_slice())
        } else {
            None
        }
    }

    pub(crate) fn fill(&mut self, values: Vec<T>) {
        self.values = values;
        self.loaded = true;
    }

    pub(crate) fn push(&mut self, value: T) {
        self.values.push(value);
    }

    /// Removes and returns the first element matching `pred`.
    pub(crate) fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let index = self.values.iter().position(pred)?;
        Some(self.values.remove(index))
    }

    pub fn unload(&mut self) {
        self.loaded = false;
        self.values.clear();
    }
}
