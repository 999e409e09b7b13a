use crate::status::StatusKind;

/// Capability-checked renderer mapping a status kind to styled text.
///
/// Color is opt-in via the `--color` flag; when disabled the renderer is a
/// plain-text passthrough, which is also what tests record against.
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn paint(&self, kind: StatusKind, text: &str) -> String {
        if self.color {
            // force_styling: the flag is the contract, not a tty probe
            kind.style()
                .force_styling(true)
                .apply_to(text)
                .to_string()
        } else {
            text.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_without_color_is_passthrough() {
        let renderer = Renderer::new(false);
        assert_eq!(renderer.paint(StatusKind::Failed, "failed"), "failed");
    }

    #[test]
    fn test_paint_with_color_emits_ansi() {
        let renderer = Renderer::new(true);
        let painted = renderer.paint(StatusKind::Success, "success");
        assert!(painted.contains("\u{1b}["));
        assert!(painted.contains("success"));
    }

    #[test]
    fn test_paint_other_kind_stays_plain() {
        let renderer = Renderer::new(true);
        // `Other` carries no style attributes, so even forced styling
        // produces the bare text.
        assert_eq!(renderer.paint(StatusKind::Other, "manual"), "manual");
    }
}
