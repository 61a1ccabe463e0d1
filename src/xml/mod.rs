pub mod adapter;
pub mod path;
pub mod safezone;
pub mod tree;

pub use adapter::XmlAdapter;
pub use path::{NodePath, PathError, ResolvedText, ResolvedTextMut, TextSlot};
pub use safezone::{FormatHint, Profile, SafeZonePattern, TextPosition};
pub use tree::{XmlDocument, XmlElement, XmlNode};
