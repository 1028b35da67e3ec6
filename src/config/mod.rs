//! Site and page configuration, titles and namespaces.

mod namespace;
mod page;
mod site;
mod title;
pub mod utils;

pub use namespace::TitleNamespace;
pub use page::{PageConfig, StaticPageConfig};
pub use site::{DEFAULT_LEGAL_TITLE_CHARS, NamespaceCase, NamespaceInfo, SiteConfig};
pub use title::{Title, TitleError};
pub use utils::InterwikiEntry;
