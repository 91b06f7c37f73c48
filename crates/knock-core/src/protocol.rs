//! Page snapshot types exchanged between drivers and the heuristics.
//!
//! A driver captures one [`PageSnapshot`] per settled page. Frame 0 is
//! always the top-level document; embedded iframes follow in DOM order.
//! All detection, mapping, and verification logic operates on these
//! types and never talks to a browser directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A settled page: final URL, title, and every reachable frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub frames: Vec<FrameSnapshot>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        PageSnapshot {
            url: url.into(),
            title: String::new(),
            frames: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_frame(mut self, frame: FrameSnapshot) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn frame(&self, index: usize) -> Option<&FrameSnapshot> {
        self.frames.get(index)
    }

    pub fn get_element(&self, target: &ElementRef) -> Option<&Element> {
        self.frames.get(target.frame)?.get_element(target.id)
    }

    /// Visible text of every frame, concatenated in frame order.
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        for frame in &self.frames {
            if !frame.text.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&frame.text);
            }
        }
        out
    }
}

/// One document within a page. `origin` is `"main"` for the top frame,
/// otherwise the iframe's src.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub index: usize,
    pub origin: String,
    pub elements: Vec<Element>,
    /// Rendered body text, used for phrase scanning.
    #[serde(default)]
    pub text: String,
}

impl FrameSnapshot {
    pub fn new(index: usize, origin: impl Into<String>) -> Self {
        FrameSnapshot {
            index,
            origin: origin.into(),
            elements: Vec::new(),
            text: String::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn get_element(&self, id: u32) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Elements whose rect lies inside `rect`, excluding `except`.
    pub fn elements_within<'a>(
        &'a self,
        rect: &'a Rect,
        except: u32,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.id != except && e.rect.is_inside(rect))
    }
}

/// Stable handle to one element within one frame of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub frame: usize,
    pub id: u32,
}

impl ElementRef {
    pub fn new(frame: usize, id: u32) -> Self {
        ElementRef { frame, id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: u32,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub state: ElementState,
}

impl Element {
    pub fn new(id: u32, element_type: impl Into<String>) -> Self {
        Element {
            id,
            element_type: element_type.into(),
            role: None,
            text: None,
            label: None,
            value: None,
            placeholder: None,
            selector: String::new(),
            rect: Rect::default(),
            attributes: HashMap::new(),
            options: Vec::new(),
            state: ElementState::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(SelectOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    pub fn hidden(mut self) -> Self {
        self.state.visible = false;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    pub fn input_type(&self) -> Option<&str> {
        self.attr("type")
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    /// Lowercased identifying text of the element, used by the
    /// vocabulary and synonym matchers. Pulls together name, id,
    /// label, placeholder, aria-label, and class.
    pub fn haystack(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for key in ["name", "id", "aria-label", "class"] {
            if let Some(v) = self.attr(key) {
                parts.push(v);
            }
        }
        if let Some(label) = &self.label {
            parts.push(label);
        }
        if let Some(placeholder) = &self.placeholder {
            parts.push(placeholder);
        }
        parts.join(" ").to_lowercase()
    }
}

/// One entry of a select or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Whether this rect lies fully inside `outer`, with a small
    /// tolerance for borders and padding.
    pub fn is_inside(&self, outer: &Rect) -> bool {
        const TOLERANCE: f64 = 2.0;
        self.x >= outer.x - TOLERANCE
            && self.y >= outer.y - TOLERANCE
            && self.x + self.width <= outer.x + outer.width + TOLERANCE
            && self.y + self.height <= outer.y + outer.height + TOLERANCE
    }

    /// Vertical distance between this rect and `other`, zero when they
    /// overlap vertically.
    pub fn vertical_gap(&self, other: &Rect) -> f64 {
        if self.y + self.height < other.y {
            other.y - (self.y + self.height)
        } else if other.y + other.height < self.y {
            self.y - (other.y + other.height)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElementState {
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub focused: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl Default for ElementState {
    fn default() -> Self {
        ElementState {
            checked: false,
            selected: false,
            disabled: false,
            readonly: false,
            focused: false,
            visible: true,
        }
    }
}

fn default_true() -> bool {
    true
}
