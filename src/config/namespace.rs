//! Namespace ids.

use serde::{Deserialize, Serialize};

/// A namespace id, as used by MediaWiki.
///
/// Negative ids are virtual namespaces; odd positive ids are talk
/// namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleNamespace(pub i32);

impl TitleNamespace {
    pub const MEDIA: Self = Self(-2);
    pub const SPECIAL: Self = Self(-1);
    pub const MAIN: Self = Self(0);
    pub const TALK: Self = Self(1);
    pub const USER: Self = Self(2);
    pub const USER_TALK: Self = Self(3);
    pub const PROJECT: Self = Self(4);
    pub const PROJECT_TALK: Self = Self(5);
    pub const FILE: Self = Self(6);
    pub const FILE_TALK: Self = Self(7);
    pub const TEMPLATE: Self = Self(10);
    pub const TEMPLATE_TALK: Self = Self(11);
    pub const CATEGORY: Self = Self(14);
    pub const CATEGORY_TALK: Self = Self(15);

    pub fn id(self) -> i32 {
        self.0
    }

    pub fn is_main(self) -> bool {
        self == Self::MAIN
    }

    pub fn is_a_talk_namespace(self) -> bool {
        self.0 > 0 && self.0 % 2 == 1
    }

    pub fn is_user(self) -> bool {
        self == Self::USER
    }

    pub fn is_file(self) -> bool {
        self == Self::FILE
    }

    pub fn is_template(self) -> bool {
        self == Self::TEMPLATE
    }

    pub fn is_category(self) -> bool {
        self == Self::CATEGORY
    }

    pub fn is_special(self) -> bool {
        self == Self::SPECIAL
    }

    pub fn is_media(self) -> bool {
        self == Self::MEDIA
    }

    /// The talk namespace paired with this one, if it has one.
    pub fn talk(self) -> Option<Self> {
        match self.0 {
            n if n < 0 => None,
            n if n % 2 == 1 => Some(self),
            n => Some(Self(n + 1)),
        }
    }

    /// The subject namespace paired with this one.
    pub fn subject(self) -> Self {
        if self.is_a_talk_namespace() {
            Self(self.0 - 1)
        } else {
            self
        }
    }
}

impl From<i32> for TitleNamespace {
    fn from(id: i32) -> Self {
        Self(id)
    }
}
