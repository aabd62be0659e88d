//! A physical display and the workspaces assigned to it (spec.md §3 "Monitor").
use crate::geometry::Rect;
use crate::x::Struts;

/// One monitor. `workspaces` is the ordered list of workspace indices
/// assigned to it; at most one of those is visible at any instant (spec.md §3
/// invariant).
#[derive(Debug, Clone)]
pub struct Monitor {
    /// Integer id, stable for the process lifetime (index into the RandR
    /// CRTC list at connect time)
    pub id: usize,
    /// Position and size in root coordinates
    pub rect: Rect,
    /// Workspace indices assigned to this monitor, in assignment order
    pub workspaces: Vec<usize>,
    /// Reserved edge space from the bar's EWMH struts, if any (spec.md §11.1)
    pub struts: Option<Struts>,
}

impl Monitor {
    /// A freshly discovered monitor with no workspaces assigned yet.
    pub fn new(id: usize, rect: Rect) -> Self {
        Self {
            id,
            rect,
            workspaces: Vec::new(),
            struts: None,
        }
    }

    /// The rectangle the layout engine tiles into: this monitor's rect minus
    /// reserved struts minus the outer gap (spec.md §4.3, GLOSSARY "Usable
    /// rect").
    pub fn usable_rect(&self, gap: u32) -> Rect {
        let s = self.struts.unwrap_or_default();
        let r = Rect::new(
            self.rect.x + s.left as i32,
            self.rect.y + s.top as i32,
            self.rect.w.saturating_sub(s.left + s.right),
            self.rect.h.saturating_sub(s.top + s.bottom),
        );
        r.shrink(gap / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_rect_subtracts_struts_and_gap() {
        let mut m = Monitor::new(0, Rect::new(0, 0, 1000, 800));
        m.struts = Some(Struts {
            top: 20,
            bottom: 0,
            left: 0,
            right: 0,
        });

        let usable = m.usable_rect(10);
        assert_eq!(usable.y, 20 + 5);
        assert_eq!(usable.h, 800 - 20 - 10);
    }
}
