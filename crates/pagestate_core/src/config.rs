use serde::{Deserialize, Serialize};

/// Number the source gives to its first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBase {
    #[default]
    Zero,
    One,
}

impl PageBase {
    pub fn offset(self) -> u32 {
        match self {
            PageBase::Zero => 0,
            PageBase::One => 1,
        }
    }
}

/// Immutable paging configuration handed to a worker at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingCursorConfig {
    one_time_load: bool,
    page_base: PageBase,
}

impl PagingCursorConfig {
    pub const fn new(one_time_load: bool, page_base: PageBase) -> Self {
        Self {
            one_time_load,
            page_base,
        }
    }

    /// A list that is fetched once and never loads more.
    pub const fn one_time(page_base: PageBase) -> Self {
        Self::new(true, page_base)
    }

    pub fn one_time_load(&self) -> bool {
        self.one_time_load
    }

    pub fn page_base(&self) -> PageBase {
        self.page_base
    }
}
