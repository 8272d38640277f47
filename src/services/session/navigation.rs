/// Cursor over a fixed number of positions (single questions or passage
/// groups). Out-of-range movement is a silent no-op; there is no wraparound.
#[derive(Debug, Clone)]
pub(crate) struct NavigationController {
    current: usize,
    len: usize,
}

impl NavigationController {
    pub(crate) fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    pub(crate) fn current(&self) -> usize {
        self.current
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn next(&mut self) {
        if self.current + 1 < self.len {
            self.current += 1;
        }
    }

    pub(crate) fn previous(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        }
    }

    pub(crate) fn jump_to(&mut self, index: usize) {
        if index < self.len {
            self.current = index;
        }
    }
}
