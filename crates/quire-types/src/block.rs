//! Block data model: the atomic content unit of a document tree.
//!
//! A document is a tree of blocks. Each block owns a tagged content payload
//! ([`BlockContent`]), the ordered ids of its children, an open key→value
//! fields map for extension data, and capability restrictions. The
//! `children_ids` array is the single source of truth for child order; any
//! positional view (depth, sibling index) is derived elsewhere and rebuilt
//! when the array changes.
//!
//! ## Wire codes
//!
//! The remote store describes style-ish values as integer codes (text style,
//! alignment, file state, …) or short strings (background color). Every coded
//! enum here exposes `from_code` / `from_str` returning `Option`: an unknown
//! code is a decode failure the caller handles by leaving state untouched,
//! never by panicking or writing a partial value.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::EnumString;

use crate::ids::{BlockId, ObjectId};

// ============================================================================
// Coded enums
// ============================================================================

/// Visual classification of a text block.
///
/// The toggle style is special: toggles fold their descendants, so flipping
/// a block into or out of the toggle class changes the visual shape of the
/// subtree, not just the block itself.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum TextStyle {
    /// Plain paragraph.
    #[default]
    Paragraph = 0,
    Header1 = 1,
    Header2 = 2,
    Header3 = 3,
    Quote = 4,
    Code = 5,
    /// Document title (one per document, rendered by the root).
    Title = 6,
    /// Checkbox line; see `checked` on the content payload.
    Checkbox = 7,
    Bulleted = 8,
    Numbered = 9,
    /// Folds its descendants.
    Toggle = 10,
    Callout = 11,
}

impl TextStyle {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextStyle::Paragraph => "paragraph",
            TextStyle::Header1 => "header1",
            TextStyle::Header2 => "header2",
            TextStyle::Header3 => "header3",
            TextStyle::Quote => "quote",
            TextStyle::Code => "code",
            TextStyle::Title => "title",
            TextStyle::Checkbox => "checkbox",
            TextStyle::Bulleted => "bulleted",
            TextStyle::Numbered => "numbered",
            TextStyle::Toggle => "toggle",
            TextStyle::Callout => "callout",
        }
    }

    /// Whether this style folds its descendants.
    pub fn is_toggle(&self) -> bool {
        matches!(self, TextStyle::Toggle)
    }

    /// Whether this style is a header band (h1–h3).
    pub fn is_header(&self) -> bool {
        matches!(self, TextStyle::Header1 | TextStyle::Header2 | TextStyle::Header3)
    }
}

impl std::fmt::Display for TextStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Horizontal alignment of a block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

impl Alignment {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Background tint, string-coded on the wire (closed palette).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackgroundColor {
    #[default]
    Default,
    Grey,
    Yellow,
    Orange,
    Red,
    Pink,
    Purple,
    Blue,
    Ice,
    Teal,
    Lime,
}

impl BackgroundColor {
    /// Parse a wire color name (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundColor::Default => "default",
            BackgroundColor::Grey => "grey",
            BackgroundColor::Yellow => "yellow",
            BackgroundColor::Orange => "orange",
            BackgroundColor::Red => "red",
            BackgroundColor::Pink => "pink",
            BackgroundColor::Purple => "purple",
            BackgroundColor::Blue => "blue",
            BackgroundColor::Ice => "ice",
            BackgroundColor::Teal => "teal",
            BackgroundColor::Lime => "lime",
        }
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upload lifecycle of a file block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum FileState {
    #[default]
    Empty = 0,
    Uploading = 1,
    Done = 2,
    Error = 3,
}

impl FileState {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Media classification of a file block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum FileKind {
    #[default]
    None = 0,
    File = 1,
    Image = 2,
    Video = 3,
    Audio = 4,
    Pdf = 5,
}

impl FileKind {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Fetch lifecycle of a bookmark block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum BookmarkState {
    #[default]
    Empty = 0,
    Fetching = 1,
    Done = 2,
    Error = 3,
}

impl BookmarkState {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Rendering of a divider block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum DividerStyle {
    #[default]
    Line = 0,
    Dots = 1,
}

impl DividerStyle {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Structural role of a layout block (non-visual wrapper).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum LayoutStyle {
    #[default]
    Row = 0,
    Column = 1,
    Div = 2,
    Header = 3,
}

impl LayoutStyle {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Presentation of a link block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum LinkStyle {
    #[default]
    Page = 0,
    Dataview = 1,
    Dashboard = 2,
    Archive = 3,
}

impl LinkStyle {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}

// ============================================================================
// Content union
// ============================================================================

/// What a block holds: a closed tagged union, one variant per content kind.
///
/// Consumers match exhaustively so adding a variant is a compile-visible
/// change everywhere it matters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    /// Editable text with a style classification.
    Text {
        #[serde(default)]
        text: String,
        #[serde(default)]
        style: TextStyle,
        /// Tick state, meaningful only for the Checkbox style.
        #[serde(default, skip_serializing_if = "is_false")]
        checked: bool,
    },
    /// An uploaded or referenced file.
    File {
        #[serde(default)]
        name: String,
        /// Content hash assigned by the remote store once the upload lands.
        #[serde(default)]
        hash: String,
        #[serde(default)]
        kind: FileKind,
        #[serde(default)]
        state: FileState,
    },
    /// A fetched web bookmark.
    Bookmark {
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        state: BookmarkState,
    },
    /// A horizontal separator.
    Divider {
        #[serde(default)]
        style: DividerStyle,
    },
    /// Invisible structural wrapper (row/column/header band). Layout blocks
    /// are "meta": they group children without adding a visual level.
    Layout {
        #[serde(default)]
        style: LayoutStyle,
    },
    /// A link to another object.
    Link {
        target: ObjectId,
        #[serde(default)]
        style: LinkStyle,
    },
    /// An inline query view over the object graph.
    Dataview {
        #[serde(default)]
        source: Vec<ObjectId>,
        #[serde(default)]
        active_view: String,
    },
    /// Root content of an ordinary document.
    Page,
    /// Root content of a home screen.
    Dashboard,
    /// A standalone icon cell.
    Icon {
        #[serde(default)]
        name: String,
    },
}

impl BlockContent {
    /// Empty paragraph text content.
    pub fn text(text: impl Into<String>) -> Self {
        BlockContent::Text {
            text: text.into(),
            style: TextStyle::Paragraph,
            checked: false,
        }
    }

    /// Text content with an explicit style.
    pub fn styled_text(text: impl Into<String>, style: TextStyle) -> Self {
        BlockContent::Text {
            text: text.into(),
            style,
            checked: false,
        }
    }

    /// Short tag for logging.
    pub fn kind_str(&self) -> &'static str {
        match self {
            BlockContent::Text { .. } => "text",
            BlockContent::File { .. } => "file",
            BlockContent::Bookmark { .. } => "bookmark",
            BlockContent::Divider { .. } => "divider",
            BlockContent::Layout { .. } => "layout",
            BlockContent::Link { .. } => "link",
            BlockContent::Dataview { .. } => "dataview",
            BlockContent::Page => "page",
            BlockContent::Dashboard => "dashboard",
            BlockContent::Icon { .. } => "icon",
        }
    }
}

impl Default for BlockContent {
    fn default() -> Self {
        BlockContent::text("")
    }
}

// ============================================================================
// Restrictions
// ============================================================================

/// Operations the remote store forbids on a block. All false = unrestricted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub edit: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub remove: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub drag: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub drop_on: bool,
}

impl Restrictions {
    /// No restrictions.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether every operation is allowed.
    pub fn is_none(&self) -> bool {
        !(self.edit || self.remove || self.drag || self.drop_on)
    }
}

/// Helper for `#[serde(skip_serializing_if)]` on bool fields.
fn is_false(v: &bool) -> bool {
    !v
}

// ============================================================================
// Block
// ============================================================================

/// One addressable unit of a document.
///
/// `children_ids` is authoritative for child order. Depth and sibling index
/// are not stored here; the tree derives them and rebuilds the derived view
/// whenever `children_ids` changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Remote-assigned id, stable and unique within the document.
    pub id: BlockId,
    /// Content payload.
    pub content: BlockContent,
    /// Ordered ids of direct children, the single source of truth for order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_ids: Vec<BlockId>,
    /// Open extension data (keys unique).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// Forbidden operations.
    #[serde(default, skip_serializing_if = "Restrictions::is_none")]
    pub restrictions: Restrictions,
    /// Background tint.
    #[serde(default)]
    pub background_color: BackgroundColor,
    /// Horizontal alignment.
    #[serde(default)]
    pub align: Alignment,
}

impl Block {
    /// Create a block with the given content and no children.
    pub fn new(id: impl Into<BlockId>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            content,
            children_ids: Vec::new(),
            fields: BTreeMap::new(),
            restrictions: Restrictions::none(),
            background_color: BackgroundColor::Default,
            align: Alignment::Left,
        }
    }

    /// Create a paragraph text block.
    pub fn text(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self::new(id, BlockContent::text(text))
    }

    /// Create a styled text block.
    pub fn styled_text(
        id: impl Into<BlockId>,
        text: impl Into<String>,
        style: TextStyle,
    ) -> Self {
        Self::new(id, BlockContent::styled_text(text, style))
    }

    /// Create a page root block.
    pub fn page(id: impl Into<BlockId>) -> Self {
        Self::new(id, BlockContent::Page)
    }

    /// Builder-style: set children ids.
    pub fn with_children<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BlockId>,
    {
        self.children_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style: set one fields entry.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Merge extension fields, new values winning on key conflicts.
    pub fn merge_fields(&mut self, entries: impl IntoIterator<Item = (String, Value)>) {
        for (k, v) in entries {
            self.fields.insert(k, v);
        }
    }

    /// Whether this block is a non-visual structural wrapper.
    ///
    /// Meta blocks group children without adding an indentation level; the
    /// derived position view lets their children inherit the parent's level.
    pub fn is_meta(&self) -> bool {
        matches!(self.content, BlockContent::Layout { .. })
    }

    /// The text style, if this is a text block.
    pub fn text_style(&self) -> Option<TextStyle> {
        match &self.content {
            BlockContent::Text { style, .. } => Some(*style),
            _ => None,
        }
    }

    /// Whether this block currently folds its descendants.
    pub fn is_toggle(&self) -> bool {
        self.text_style().is_some_and(|s| s.is_toggle())
    }
}

// ============================================================================
// Tests
// ============================================================================
