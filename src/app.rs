#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    #[default]
    Hosts,
    Status,
}

#[derive(Debug, Default)]
pub struct App {
    focus: FocusTarget,
    pub selected_host: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            focus: FocusTarget::Hosts,
            selected_host: 0,
        }
    }

    pub fn focus(&self) -> FocusTarget {
        self.focus
    }

    pub fn set_focus(&mut self, focus: FocusTarget) {
        self.focus = focus;
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            FocusTarget::Hosts => FocusTarget::Status,
            FocusTarget::Status => FocusTarget::Hosts,
        };
    }

    /// Moves the host cursor, wrapping at both ends. Ignored unless the
    /// host list has focus.
    pub fn move_host_selection(&mut self, delta: isize, len: usize) {
        if self.focus != FocusTarget::Hosts || len == 0 {
            return;
        }
        let mut idx = self.selected_host as isize + delta;
        if idx < 0 {
            idx = len as isize - 1;
        } else if idx >= len as isize {
            idx = 0;
        }
        self.selected_host = idx as usize;
    }

    pub fn clamp_host_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected_host = 0;
        } else if self.selected_host >= len {
            self.selected_host = len - 1;
        }
    }
}
