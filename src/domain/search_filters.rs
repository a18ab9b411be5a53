use serde::{Deserialize, Serialize};

pub const DEFAULT_BOUNDED_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchMode {
    /// A single page of at most `count` results.
    Bounded {
        #[serde(default = "default_bounded_count")]
        count: u32,
    },
    /// Page through results until they run out or the backend ceiling is hit.
    Exhaustive,
}

fn default_bounded_count() -> u32 {
    DEFAULT_BOUNDED_COUNT
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Bounded {
            count: DEFAULT_BOUNDED_COUNT,
        }
    }
}

/// What the caller is looking for. Blank values count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub company_sector: Option<String>,
    #[serde(default)]
    pub company_type: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub additional_titles: Vec<String>,
    #[serde(default)]
    pub mode: FetchMode,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchFilters {
    pub fn job_title(&self) -> Option<&str> {
        present(&self.job_title)
    }

    pub fn region(&self) -> Option<&str> {
        present(&self.region)
    }

    pub fn company_sector(&self) -> Option<&str> {
        present(&self.company_sector)
    }

    pub fn company_type(&self) -> Option<&str> {
        present(&self.company_type)
    }

    pub fn company_size(&self) -> Option<&str> {
        present(&self.company_size)
    }

    pub fn with_job_title(mut self, value: impl Into<String>) -> Self {
        self.job_title = Some(value.into());
        self
    }

    pub fn with_region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    pub fn with_company_sector(mut self, value: impl Into<String>) -> Self {
        self.company_sector = Some(value.into());
        self
    }

    pub fn with_company_type(mut self, value: impl Into<String>) -> Self {
        self.company_type = Some(value.into());
        self
    }

    pub fn with_company_size(mut self, value: impl Into<String>) -> Self {
        self.company_size = Some(value.into());
        self
    }

    pub fn with_additional_title(mut self, value: impl Into<String>) -> Self {
        self.additional_titles.push(value.into());
        self
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }
}
