use ot::Selection;

use crate::colors::{hsl_to_hex, hue_from_name};
use crate::document_editor::adapter::{EditorAdapter, SelectionMark};

/// Another user editing the same document, as seen by the local editor.
pub struct OtherClient {
    id: String,
    name: String,
    color: String,
    light_color: String,
    selection: Option<Selection>,
    mark: Option<Box<dyn SelectionMark>>,
}

impl OtherClient {
    /// Users without a name are shown under their client id.
    pub fn new(id: &str, name: Option<&str>) -> Self {
        let name = name.unwrap_or(id).to_string();
        let (color, light_color) = colors_for(&name);
        Self {
            id: id.to_string(),
            name,
            color,
            light_color,
            selection: None,
            mark: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Colour of the user's cursor.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Colour of the user's selected text.
    pub fn light_color(&self) -> &str {
        &self.light_color
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_name(&mut self, name: &str) {
        if self.name == name {
            return;
        }
        self.name = name.to_string();
        let (color, light_color) = colors_for(name);
        self.color = color;
        self.light_color = light_color;
    }

    /// Replaces the highlighted selection. `selection` must already be mapped to the local
    /// document.
    pub fn update_selection<A: EditorAdapter>(&mut self, adapter: &mut A, selection: Selection) {
        self.remove_selection();
        let color = if selection.something_selected() {
            &self.light_color
        } else {
            &self.color
        };
        self.mark = Some(adapter.set_other_selection(&selection, color, &self.id));
        self.selection = Some(selection);
    }

    pub fn remove_selection(&mut self) {
        if let Some(mut mark) = self.mark.take() {
            mark.clear();
        }
        self.selection = None;
    }
}

fn colors_for(name: &str) -> (String, String) {
    let hue = hue_from_name(name);
    (hsl_to_hex(hue, 0.75, 0.5), hsl_to_hex(hue, 0.5, 0.9))
}
