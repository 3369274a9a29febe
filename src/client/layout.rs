/// Side panel visibility. Every flag flips together on toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidePanel {
    pub panel_active: bool,
    pub backdrop_active: bool,
    pub open_button_active: bool,
    pub close_button_active: bool,
    pub container_minimized: bool,
}

impl Default for SidePanel {
    fn default() -> Self {
        Self {
            panel_active: false,
            backdrop_active: false,
            open_button_active: true,
            close_button_active: false,
            container_minimized: false,
        }
    }
}

impl SidePanel {
    pub fn toggle(&mut self) {
        self.panel_active = !self.panel_active;
        self.backdrop_active = !self.backdrop_active;
        self.open_button_active = !self.open_button_active;
        self.close_button_active = !self.close_button_active;
        self.container_minimized = !self.container_minimized;
    }

    pub fn is_open(&self) -> bool {
        self.panel_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_in_lockstep_and_pairs_restore() {
        let initial = SidePanel::default();
        let mut panel = initial;
        panel.toggle();
        assert!(panel.is_open());
        assert!(panel.backdrop_active && panel.close_button_active && panel.container_minimized);
        assert!(!panel.open_button_active);
        panel.toggle();
        assert_eq!(panel, initial);
    }
}
